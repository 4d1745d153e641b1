use std::sync::Arc;

use kurbo::Rect;

use crate::color::validate_background_color;
use crate::engine::{
    ManipulateAction, NativeSession, PageInfo, RenderEngine, SvgDocument, WHOLE_DOCUMENT,
};
use crate::error::{AppError, AppResult};

/// Owning handle to engine-side document state.
///
/// Every accessor fails with [`AppError::SessionReleased`] once [`free`](Self::free)
/// has run. Callers must serialize access to one handle.
pub struct RenderSession<E: RenderEngine> {
    engine: Arc<E>,
    native: Option<E::Session>,
}

impl<E: RenderEngine> RenderSession<E> {
    pub fn new(engine: Arc<E>, native: E::Session) -> Self {
        Self {
            engine,
            native: Some(native),
        }
    }

    pub fn engine(&self) -> &Arc<E> {
        &self.engine
    }

    pub fn is_released(&self) -> bool {
        self.native.is_none()
    }

    pub fn native(&self) -> AppResult<&E::Session> {
        self.native.as_ref().ok_or(AppError::SessionReleased)
    }

    pub fn native_mut(&mut self) -> AppResult<&mut E::Session> {
        self.native.as_mut().ok_or(AppError::SessionReleased)
    }

    pub fn pixel_per_pt(&self) -> AppResult<f64> {
        Ok(self.native()?.pixel_per_pt())
    }

    pub fn set_pixel_per_pt(&mut self, value: f64) -> AppResult<()> {
        if !(value.is_finite() && value > 0.0) {
            return Err(AppError::InvalidPixelPerPt(value));
        }
        self.native_mut()?.set_pixel_per_pt(value);
        Ok(())
    }

    pub fn background_color(&self) -> AppResult<String> {
        Ok(self.native()?.background_color().to_string())
    }

    pub fn set_background_color(&mut self, value: &str) -> AppResult<()> {
        validate_background_color(value)?;
        self.native_mut()?.set_background_color(value.to_string());
        Ok(())
    }

    pub fn page_count(&self) -> AppResult<usize> {
        Ok(self.native()?.pages_info().page_count())
    }

    pub fn retrieve_pages_info(&self) -> AppResult<Vec<PageInfo>> {
        Ok(self.native()?.pages_info().to_vec())
    }

    pub fn doc_width(&self) -> AppResult<f64> {
        Ok(self
            .native()?
            .pages_info()
            .iter()
            .map(|page| page.width)
            .fold(0.0, f64::max))
    }

    pub fn doc_height(&self) -> AppResult<f64> {
        Ok(self
            .native()?
            .pages_info()
            .iter()
            .map(|page| page.height)
            .sum())
    }

    pub fn reset(&mut self) -> AppResult<()> {
        let engine = Arc::clone(&self.engine);
        engine.reset(self.native_mut()?);
        Ok(())
    }

    pub fn manipulate_data(&mut self, action: ManipulateAction, data: &[u8]) -> AppResult<()> {
        let engine = Arc::clone(&self.engine);
        engine.manipulate_data(self.native_mut()?, action, data)
    }

    pub fn get_source_loc(&self, path: &[u32]) -> AppResult<Option<String>> {
        self.engine.source_span(self.native()?, path)
    }

    pub fn render_svg(&mut self) -> AppResult<SvgDocument> {
        let engine = Arc::clone(&self.engine);
        engine.render_svg(self.native_mut()?)
    }

    /// Serializes content inside `window`, or the whole document when `None`.
    pub fn render_svg_diff(&mut self, window: Option<Rect>) -> AppResult<String> {
        let engine = Arc::clone(&self.engine);
        engine.render_svg_diff(self.native_mut()?, window.unwrap_or(WHOLE_DOCUMENT))
    }

    pub fn free(&mut self) -> AppResult<()> {
        match self.native.take() {
            Some(_) => Ok(()),
            None => Err(AppError::SessionReleased),
        }
    }
}

impl<E: RenderEngine> Drop for RenderSession<E> {
    fn drop(&mut self) {
        if self.native.take().is_some() {
            log::debug!("render session dropped without an explicit free");
        }
    }
}

impl<E: RenderEngine> std::fmt::Debug for RenderSession<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderSession")
            .field("released", &self.is_released())
            .finish_non_exhaustive()
    }
}
