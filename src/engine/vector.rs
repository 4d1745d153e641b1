use kurbo::Rect;

use crate::color::{DEFAULT_BACKGROUND_COLOR, parse_hex_color};
use crate::dom::DrawingContext;
use crate::error::{AppError, AppResult};
use crate::geom::{Viewport, ViewportParams};

use super::artifact::{ArtifactDelta, VectorDocument, VectorPage};
use super::payload::{
    CreateSessionOptions, ManipulateAction, PageRenderResult, PagesInfo, RenderPageOptions,
    SUPPORTED_FORMAT, SvgDocument, check_artifact_format,
};
use super::raster::rasterize_page;
use super::svg::{render_diff, render_document};
use super::traits::{NativeSession, RenderEngine};

pub const DEFAULT_SESSION_PIXEL_PER_PT: f64 = 3.0;

/// Reference engine over JSON vector artifacts.
#[derive(Debug, Default)]
pub struct VectorEngine;

#[derive(Debug, Clone)]
pub struct VectorSession {
    document: VectorDocument,
    pages_info: PagesInfo,
    pixel_per_pt: f64,
    background_color: String,
    /// What the receiver last got per page index; `None` for never sent.
    last_rendered: Vec<Option<VectorPage>>,
}

impl VectorSession {
    fn new(document: VectorDocument) -> Self {
        let pages_info = document.pages_info();
        Self {
            document,
            pages_info,
            pixel_per_pt: DEFAULT_SESSION_PIXEL_PER_PT,
            background_color: DEFAULT_BACKGROUND_COLOR.to_string(),
            last_rendered: Vec::new(),
        }
    }

    pub fn document(&self) -> &VectorDocument {
        &self.document
    }

    fn replace_document(&mut self, document: VectorDocument) {
        self.pages_info = document.pages_info();
        self.document = document;
    }
}

impl NativeSession for VectorSession {
    fn pages_info(&self) -> &PagesInfo {
        &self.pages_info
    }

    fn pixel_per_pt(&self) -> f64 {
        self.pixel_per_pt
    }

    fn set_pixel_per_pt(&mut self, value: f64) {
        self.pixel_per_pt = value;
    }

    fn background_color(&self) -> &str {
        &self.background_color
    }

    fn set_background_color(&mut self, value: String) {
        self.background_color = value;
    }
}

impl VectorEngine {
    pub fn new() -> Self {
        Self
    }
}

impl RenderEngine for VectorEngine {
    type Session = VectorSession;

    fn create_session(&self, options: Option<CreateSessionOptions>) -> AppResult<VectorSession> {
        let Some(options) = options else {
            return Ok(VectorSession::new(VectorDocument::default()));
        };
        let format = options.format.as_deref().unwrap_or(SUPPORTED_FORMAT);
        match options.artifact_content {
            Some(content) => self.session_from_artifact(&content, format),
            None => {
                check_artifact_format(format)?;
                Ok(VectorSession::new(VectorDocument::default()))
            }
        }
    }

    fn session_from_artifact(&self, artifact: &[u8], decoder: &str) -> AppResult<VectorSession> {
        check_artifact_format(decoder)?;
        let document = VectorDocument::decode(artifact)?;
        log::debug!(
            "created session with {} pages from {} byte artifact",
            document.pages.len(),
            artifact.len()
        );
        Ok(VectorSession::new(document))
    }

    fn reset(&self, session: &mut VectorSession) {
        session.last_rendered.clear();
    }

    fn manipulate_data(
        &self,
        session: &mut VectorSession,
        action: ManipulateAction,
        data: &[u8],
    ) -> AppResult<()> {
        match action {
            ManipulateAction::Reset => {
                let document = VectorDocument::decode(data)?;
                session.replace_document(document);
                session.last_rendered.clear();
            }
            ManipulateAction::Merge => {
                let Some(delta) = ArtifactDelta::decode(data)? else {
                    return Ok(());
                };
                let mut document = session.document.clone();
                document.apply_delta(delta)?;
                session.replace_document(document);
            }
        }
        log::debug!(
            "manipulate {} applied, {} pages",
            action.as_str(),
            session.pages_info.page_count()
        );
        Ok(())
    }

    fn render_page_to_canvas(
        &self,
        session: &mut VectorSession,
        context: &mut dyn DrawingContext,
        options: Option<&RenderPageOptions>,
    ) -> AppResult<PageRenderResult> {
        let page_off = options.map_or(0, |options| options.page_off);
        let page = session.document.pages.get(page_off).ok_or_else(|| {
            AppError::invalid_argument(format!(
                "page offset {page_off} out of range for {} pages",
                session.document.pages.len()
            ))
        })?;

        let viewport = match options.and_then(|options| options.viewport.clone()) {
            Some(viewport) => viewport,
            None => Viewport::new(
                ViewportParams::page(page.width, page.height, session.pixel_per_pt)
                    .with_dont_flip(true),
            )?,
        };
        let background = parse_hex_color(&session.background_color)?;
        let (width, height) = context.canvas_size();
        let frame = rasterize_page(page, &viewport, background, width, height);
        context.put_image_data(&frame, 0, 0)?;

        Ok(PageRenderResult {
            text_content: page.text_content(),
            annotation_list: page.annotation_list(),
        })
    }

    fn render_svg(&self, session: &mut VectorSession) -> AppResult<SvgDocument> {
        let svg = render_document(&session.document, &session.background_color);
        session.last_rendered = session.document.pages.iter().cloned().map(Some).collect();
        Ok(svg)
    }

    fn render_svg_diff(&self, session: &mut VectorSession, window: Rect) -> AppResult<String> {
        let diff = render_diff(
            &session.document,
            &session.last_rendered,
            window,
            &session.background_color,
        );
        session
            .last_rendered
            .resize(session.document.pages.len(), None);
        for index in diff.sent {
            session.last_rendered[index] = Some(session.document.pages[index].clone());
        }
        Ok(diff.fragment)
    }

    fn source_span(&self, session: &VectorSession, path: &[u32]) -> AppResult<Option<String>> {
        Ok(session.document.source_span(path))
    }
}

#[cfg(test)]
mod tests {
    use super::VectorEngine;
    use crate::dom::{Dom, MemoryDom};
    use crate::engine::{
        CreateSessionOptions, ManipulateAction, NativeSession, RenderEngine, RenderPageOptions,
        WHOLE_DOCUMENT,
    };
    use crate::error::AppError;

    const TWO_PAGES: &str = r##"{
        "pages": [
            {"width": 10, "height": 10, "items": [
                {"kind": "rect", "x": 0, "y": 0, "width": 10, "height": 10, "fill": "#000000"},
                {"kind": "text", "x": 1, "y": 8, "size": 4, "content": "hi"}
            ]},
            {"width": 20, "height": 10}
        ],
        "sources": [{"path": [0, 1], "location": "main.typ:1:1"}]
    }"##;

    #[test]
    fn session_from_artifact_rejects_legacy_decoder() {
        let engine = VectorEngine::new();
        let err = engine
            .session_from_artifact(TWO_PAGES.as_bytes(), "ir")
            .expect_err("legacy format must be rejected");
        assert!(matches!(err, AppError::DeprecatedFormat(_)));
    }

    #[test]
    fn create_session_without_options_is_empty() {
        let engine = VectorEngine::new();
        let session = engine.create_session(None).expect("empty session");
        assert_eq!(session.pages_info().page_count(), 0);
        assert_eq!(session.pixel_per_pt(), 3.0);
        assert_eq!(session.background_color(), "#ffffff");
    }

    #[test]
    fn renders_page_into_canvas_and_extracts_text() {
        let engine = VectorEngine::new();
        let mut session = engine
            .create_session(Some(CreateSessionOptions::vector(TWO_PAGES.as_bytes().to_vec())))
            .expect("session should decode");
        session.set_pixel_per_pt(1.0);

        let mut dom = MemoryDom::new();
        let canvas = dom.create_element("canvas");
        dom.set_canvas_size(&canvas, 10, 10);
        let context = dom.context_2d(&canvas).expect("context");
        let result = engine
            .render_page_to_canvas(
                &mut session,
                context,
                Some(&RenderPageOptions {
                    page_off: 0,
                    viewport: None,
                }),
            )
            .expect("page should render");

        assert_eq!(result.text_content.items.len(), 1);
        assert_eq!(result.text_content.items[0].text, "hi");
        let surface = dom.canvas(canvas).expect("surface");
        assert_eq!(surface.pixel(5, 5), Some([0, 0, 0, 255]));
    }

    #[test]
    fn out_of_range_page_offset_is_invalid() {
        let engine = VectorEngine::new();
        let mut session = engine
            .session_from_artifact(TWO_PAGES.as_bytes(), "vector")
            .expect("session");
        let mut dom = MemoryDom::new();
        let canvas = dom.create_element("canvas");
        let context = dom.context_2d(&canvas).expect("context");
        let err = engine
            .render_page_to_canvas(
                &mut session,
                context,
                Some(&RenderPageOptions {
                    page_off: 9,
                    viewport: None,
                }),
            )
            .expect_err("page 9 does not exist");
        assert!(matches!(err, AppError::InvalidArgument(_)));
    }

    #[test]
    fn merge_then_diff_only_reemits_changed_pages() {
        let engine = VectorEngine::new();
        let mut session = engine
            .session_from_artifact(TWO_PAGES.as_bytes(), "vector")
            .expect("session");
        engine.render_svg(&mut session).expect("full render");

        engine
            .manipulate_data(
                &mut session,
                ManipulateAction::Merge,
                br#"{"pages":[{"index":1,"page":{"width":30,"height":10}}]}"#,
            )
            .expect("merge should apply");
        assert_eq!(session.pages_info().page(1).map(|page| page.width), Some(30.0));

        let diff = engine
            .render_svg_diff(&mut session, WHOLE_DOCUMENT)
            .expect("diff should render");
        assert!(diff.contains("data-reuse-from=\"0\""));
        assert!(diff.contains("data-page-width=\"30\""));
    }

    #[test]
    fn reset_action_replaces_document_and_source_map() {
        let engine = VectorEngine::new();
        let mut session = engine
            .session_from_artifact(TWO_PAGES.as_bytes(), "vector")
            .expect("session");
        assert_eq!(
            engine.source_span(&session, &[0, 1]).expect("lookup"),
            Some("main.typ:1:1".to_string())
        );

        engine
            .manipulate_data(&mut session, ManipulateAction::Reset, b"")
            .expect("reset with empty payload");
        assert_eq!(session.pages_info().page_count(), 0);
        assert_eq!(engine.source_span(&session, &[0, 1]).expect("lookup"), None);
    }
}
