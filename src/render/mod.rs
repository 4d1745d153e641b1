mod annotation;
mod driver;
mod layout;
mod queue;
mod text_layer;

#[cfg(test)]
mod tests;

pub use annotation::{
    ANCHOR_ID_PREFIX, ANNOTATION_CLASS, AnnotationResolver, LinkTarget, OverlayBox,
    random_anchor_id,
};
pub use driver::{
    FrameScheduler, NextTick, RenderDriver, RenderOptions, RenderReport, RenderSource,
    VisibilityGuard,
};
pub use layout::{
    DEFAULT_LAYOUT_PIXEL_PER_PT, PageLayers, PageLayout, PageLayoutManager, device_size,
};
pub use queue::RenderQueue;
pub use text_layer::{SpanPlacement, SpanTextLayer, TextLayerRenderer, rounded_scale};
