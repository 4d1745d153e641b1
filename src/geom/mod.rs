mod viewport;

pub use viewport::{
    RawDims, Viewport, ViewportOverrides, ViewportParams, apply_inverse_transform,
    apply_transform,
};
