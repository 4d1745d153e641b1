use std::sync::Arc;

use kurbo::Rect;

use crate::dom::DrawingContext;
use crate::error::AppResult;

use super::payload::{
    CreateSessionOptions, ManipulateAction, PageRenderResult, PagesInfo, RenderPageOptions,
    SvgDocument,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbaFrame {
    pub width: u32,
    pub height: u32,
    pub pixels: Arc<[u8]>,
}

impl RgbaFrame {
    pub fn byte_len(&self) -> usize {
        self.pixels.len()
    }

    pub fn pixels_to_vec(&self) -> Vec<u8> {
        self.pixels.as_ref().to_vec()
    }
}

/// Engine-owned per-document state behind a render session.
pub trait NativeSession {
    fn pages_info(&self) -> &PagesInfo;
    fn pixel_per_pt(&self) -> f64;
    fn set_pixel_per_pt(&mut self, value: f64);
    fn background_color(&self) -> &str;
    fn set_background_color(&mut self, value: String);
}

/// The typesetting/rendering engine the pipeline drives.
pub trait RenderEngine: Send + Sync {
    type Session: NativeSession;

    fn create_session(&self, options: Option<CreateSessionOptions>) -> AppResult<Self::Session>;
    fn session_from_artifact(&self, artifact: &[u8], decoder: &str) -> AppResult<Self::Session>;
    fn reset(&self, session: &mut Self::Session);
    fn manipulate_data(
        &self,
        session: &mut Self::Session,
        action: ManipulateAction,
        data: &[u8],
    ) -> AppResult<()>;
    fn render_page_to_canvas(
        &self,
        session: &mut Self::Session,
        context: &mut dyn DrawingContext,
        options: Option<&RenderPageOptions>,
    ) -> AppResult<PageRenderResult>;
    fn render_svg(&self, session: &mut Self::Session) -> AppResult<SvgDocument>;
    fn render_svg_diff(&self, session: &mut Self::Session, window: Rect) -> AppResult<String>;
    fn source_span(&self, session: &Self::Session, path: &[u32]) -> AppResult<Option<String>>;
}
