use std::future::Future;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::time::Instant;

use kurbo::Rect;

use crate::color::validate_background_color;
use crate::config::RenderConfig;
use crate::dom::Dom;
use crate::engine::{
    AnnotationList, CreateSessionOptions, ManipulateAction, PageInfo, PageRenderResult,
    RenderEngine, RenderPageOptions, SUPPORTED_FORMAT, SvgDocument, TextContent,
    check_artifact_format,
};
use crate::error::{AppError, AppResult};
use crate::geom::{Viewport, ViewportParams};
use crate::perf::PassTimings;
use crate::session::RenderSession;

use super::annotation::AnnotationResolver;
use super::layout::PageLayoutManager;
use super::text_layer::{SpanTextLayer, TextLayerRenderer, rounded_scale};

/// Hook awaited once before the raster pass starts.
pub trait FrameScheduler {
    fn next_frame(&self) -> impl Future<Output = ()>;
}

/// Yields to the runtime once, standing in for an animation frame.
#[derive(Debug, Default, Clone, Copy)]
pub struct NextTick;

impl FrameScheduler for NextTick {
    async fn next_frame(&self) {
        tokio::task::yield_now().await;
    }
}

pub enum RenderSource<'s, E: RenderEngine> {
    /// Caller-owned session; the caller stays responsible for freeing it.
    Session(&'s mut RenderSession<E>),
    /// Raw artifact; a session is created for this call and freed afterwards.
    Artifact { content: Vec<u8>, format: String },
}

impl<E: RenderEngine> RenderSource<'_, E> {
    pub fn artifact(content: Vec<u8>) -> Self {
        Self::Artifact {
            content,
            format: SUPPORTED_FORMAT.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderOptions {
    pub pixel_per_pt: Option<f64>,
    pub background_color: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderReport {
    pub page_count: usize,
    pub canvas_sizes: Vec<(u32, u32)>,
    pub links_rendered: usize,
    pub timings: PassTimings,
}

#[derive(Debug, Clone, PartialEq)]
struct ResolvedOptions {
    session_pixel_per_pt: f64,
    layout_pixel_per_pt: f64,
    background_color: String,
}

/// Hides the container for its lifetime and makes it visible again on drop,
/// whichever way the render exits.
pub struct VisibilityGuard<'d, D: Dom> {
    dom: &'d mut D,
    container: D::Node,
}

impl<'d, D: Dom> VisibilityGuard<'d, D> {
    pub fn hide(dom: &'d mut D, container: &D::Node) -> Self {
        dom.set_style(container, "visibility", "hidden");
        Self {
            dom,
            container: container.clone(),
        }
    }
}

impl<D: Dom> Deref for VisibilityGuard<'_, D> {
    type Target = D;

    fn deref(&self) -> &D {
        self.dom
    }
}

impl<D: Dom> DerefMut for VisibilityGuard<'_, D> {
    fn deref_mut(&mut self) -> &mut D {
        self.dom
    }
}

impl<D: Dom> Drop for VisibilityGuard<'_, D> {
    fn drop(&mut self) {
        self.dom.set_style(&self.container, "visibility", "visible");
    }
}

pub struct RenderDriver<E: RenderEngine, T = SpanTextLayer, F = NextTick> {
    engine: Arc<E>,
    text_layer: T,
    frames: F,
    config: RenderConfig,
}

impl<E: RenderEngine> RenderDriver<E> {
    pub fn new(engine: Arc<E>) -> Self {
        Self::with_parts(
            engine,
            SpanTextLayer::default(),
            NextTick,
            RenderConfig::default(),
        )
    }
}

impl<E, T, F> RenderDriver<E, T, F>
where
    E: RenderEngine,
    T: TextLayerRenderer,
    F: FrameScheduler,
{
    pub fn with_parts(engine: Arc<E>, text_layer: T, frames: F, config: RenderConfig) -> Self {
        Self {
            engine,
            text_layer,
            frames,
            config,
        }
    }

    pub fn with_config(mut self, config: RenderConfig) -> Self {
        self.config = config;
        self
    }

    pub fn engine(&self) -> &Arc<E> {
        &self.engine
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn frames(&self) -> &F {
        &self.frames
    }

    /// Creates a session from vector artifact bytes, or an empty one.
    pub fn create_session(&self, artifact: Option<Vec<u8>>) -> AppResult<RenderSession<E>> {
        self.create_session_with(artifact.map(CreateSessionOptions::vector))
    }

    pub fn create_session_with(
        &self,
        options: Option<CreateSessionOptions>,
    ) -> AppResult<RenderSession<E>> {
        let native = self.engine.create_session(options)?;
        Ok(RenderSession::new(Arc::clone(&self.engine), native))
    }

    pub fn retrieve_pages_info(&self, session: &RenderSession<E>) -> AppResult<Vec<PageInfo>> {
        session.retrieve_pages_info()
    }

    pub fn reset_session(&self, session: &mut RenderSession<E>) -> AppResult<()> {
        session.reset()
    }

    /// Applies a document patch; a missing action means `reset`.
    pub fn manipulate_data(
        &self,
        session: &mut RenderSession<E>,
        action: Option<ManipulateAction>,
        data: &[u8],
    ) -> AppResult<()> {
        session.manipulate_data(action.unwrap_or_default(), data)
    }

    pub fn render_svg_diff(
        &self,
        session: &mut RenderSession<E>,
        window: Option<Rect>,
    ) -> AppResult<String> {
        session.render_svg_diff(window)
    }

    /// Renders the whole document as SVG into `container`.
    pub fn render_svg<D: Dom>(
        &self,
        session: &mut RenderSession<E>,
        dom: &mut D,
        container: &D::Node,
    ) -> AppResult<SvgDocument> {
        let svg = session.render_svg()?;
        dom.set_inner_html(container, &svg.markup);
        dom.set_attribute(container, "data-applied-width", &format!("{}px", svg.width));
        dom.set_attribute(container, "data-applied-height", &format!("{}px", svg.height));
        Ok(svg)
    }

    pub fn render_to_svg<D: Dom>(
        &self,
        dom: &mut D,
        container: &D::Node,
        source: RenderSource<'_, E>,
    ) -> AppResult<SvgDocument> {
        match source {
            RenderSource::Session(session) => self.render_svg(session, dom, container),
            RenderSource::Artifact { content, format } => {
                check_artifact_format(&format)?;
                let mut session = self.session_for_artifact(content, format)?;
                let result = self.render_svg(&mut session, dom, container);
                let released = session.free();
                let svg = result?;
                released?;
                Ok(svg)
            }
        }
    }

    /// Full raster, text and annotation render of every page into `container`.
    pub async fn render<D: Dom>(
        &self,
        dom: &mut D,
        container: &D::Node,
        source: RenderSource<'_, E>,
        options: &RenderOptions,
    ) -> AppResult<RenderReport> {
        if let RenderSource::Artifact { format, .. } = &source {
            check_artifact_format(format)?;
        }
        let resolved = self.resolve_options(options)?;

        match source {
            RenderSource::Session(session) => {
                self.render_in_session(dom, container, session, &resolved).await
            }
            RenderSource::Artifact { content, format } => {
                let mut session = self.session_for_artifact(content, format)?;
                let result = self
                    .render_in_session(dom, container, &mut session, &resolved)
                    .await;
                let released = session.free();
                let report = result?;
                released?;
                Ok(report)
            }
        }
    }

    fn session_for_artifact(
        &self,
        content: Vec<u8>,
        format: String,
    ) -> AppResult<RenderSession<E>> {
        self.create_session_with(Some(CreateSessionOptions {
            format: Some(format),
            artifact_content: Some(content),
        }))
    }

    fn resolve_options(&self, options: &RenderOptions) -> AppResult<ResolvedOptions> {
        if let Some(pixel_per_pt) = options.pixel_per_pt
            && !(pixel_per_pt.is_finite() && pixel_per_pt > 0.0)
        {
            return Err(AppError::InvalidPixelPerPt(pixel_per_pt));
        }
        if let Some(color) = &options.background_color {
            validate_background_color(color)?;
        }

        Ok(ResolvedOptions {
            session_pixel_per_pt: options.pixel_per_pt.unwrap_or(self.config.pixel_per_pt),
            layout_pixel_per_pt: options
                .pixel_per_pt
                .unwrap_or(self.config.layout_pixel_per_pt),
            background_color: options
                .background_color
                .clone()
                .unwrap_or_else(|| self.config.background_color.clone()),
        })
    }

    async fn render_in_session<D: Dom>(
        &self,
        dom: &mut D,
        container: &D::Node,
        session: &mut RenderSession<E>,
        options: &ResolvedOptions,
    ) -> AppResult<RenderReport> {
        if session.page_count()? == 0 {
            return Err(AppError::NoPageFound);
        }
        session.set_pixel_per_pt(options.session_pixel_per_pt)?;
        session.set_background_color(&options.background_color)?;

        let mut timings = PassTimings::default();
        let mut host = VisibilityGuard::hide(dom, container);

        let started = Instant::now();
        let pages = session.retrieve_pages_info()?;
        let layout =
            PageLayoutManager::build(&mut *host, container, &pages, options.layout_pixel_per_pt)?;
        timings.record_layout(started.elapsed());

        let started = Instant::now();
        let results = self.raster_pass(&mut *host, session, &layout).await?;
        layout.reset_layout(&mut *host)?;
        timings.record_display(started.elapsed());

        let (texts, annotations): (Vec<TextContent>, Vec<AnnotationList>) = results
            .into_iter()
            .map(|result| (result.text_content, result.annotation_list))
            .unzip();

        let started = Instant::now();
        self.text_pass(&mut *host, &layout, &texts)?;
        timings.record_text(started.elapsed());

        let started = Instant::now();
        let page_infos = layout.page_infos();
        let links_rendered = AnnotationResolver::new(&page_infos).render_layers(
            &mut *host,
            &layout.annotation_layers(),
            &annotations,
            &mut rand::rng(),
        );
        timings.record_annotation(started.elapsed());

        Ok(RenderReport {
            page_count: layout.len(),
            canvas_sizes: layout
                .pages()
                .iter()
                .map(|page| (page.device_width, page.device_height))
                .collect(),
            links_rendered,
            timings,
        })
    }

    async fn raster_pass<D: Dom>(
        &self,
        dom: &mut D,
        session: &mut RenderSession<E>,
        layout: &PageLayoutManager<D::Node>,
    ) -> AppResult<Vec<PageRenderResult>> {
        self.frames.next_frame().await;

        let engine = Arc::clone(session.engine());
        let mut results = Vec::with_capacity(layout.len());
        for (index, page) in layout.pages().iter().enumerate() {
            let viewport = Viewport::new(
                ViewportParams::page(page.info.width, page.info.height, layout.pixel_per_pt())
                    .with_dont_flip(true),
            )?;
            let options = RenderPageOptions {
                page_off: page.info.page_offset,
                viewport: Some(viewport),
            };
            let context = dom
                .context_2d(&page.layers.canvas)
                .ok_or(AppError::MissingCanvasContext { page: index })?;
            let native = session.native_mut()?;
            results.push(engine.render_page_to_canvas(native, context, Some(&options))?);
            tokio::task::yield_now().await;
        }
        Ok(results)
    }

    fn text_pass<D: Dom>(
        &self,
        dom: &mut D,
        layout: &PageLayoutManager<D::Node>,
        texts: &[TextContent],
    ) -> AppResult<()> {
        let container_width = dom.offset_width(layout.container());
        for (page, content) in layout.pages().iter().zip(texts) {
            let scale = rounded_scale(
                container_width / page.info.width,
                self.config.text_scale_decimals,
            );
            if let Some(parent) = dom.parent(&page.layers.text) {
                dom.set_style(&parent, "--scale-factor", &scale.to_string());
            }
            let viewport =
                Viewport::new(ViewportParams::page(page.info.width, page.info.height, scale))?;
            self.text_layer
                .render_text_layer(dom, &page.layers.text, content, &viewport)?;
        }
        Ok(())
    }
}
