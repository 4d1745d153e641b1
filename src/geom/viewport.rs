use kurbo::{Affine, Point, Rect};

use crate::error::{AppError, AppResult};

/// Construction parameters for a [`Viewport`].
///
/// `view_box` is `[xmin, ymin, xmax, ymax]` in document points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportParams {
    pub view_box: [f64; 4],
    pub scale: f64,
    pub rotation: i32,
    pub offset_x: f64,
    pub offset_y: f64,
    pub dont_flip: bool,
}

impl ViewportParams {
    pub fn new(view_box: [f64; 4], scale: f64) -> Self {
        Self {
            view_box,
            scale,
            rotation: 0,
            offset_x: 0.0,
            offset_y: 0.0,
            dont_flip: false,
        }
    }

    pub fn page(width_pt: f64, height_pt: f64, scale: f64) -> Self {
        Self::new([0.0, 0.0, width_pt, height_pt], scale)
    }

    pub fn with_rotation(mut self, rotation: i32) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_offset(mut self, offset_x: f64, offset_y: f64) -> Self {
        self.offset_x = offset_x;
        self.offset_y = offset_y;
        self
    }

    pub fn with_dont_flip(mut self, dont_flip: bool) -> Self {
        self.dont_flip = dont_flip;
        self
    }
}

/// Fields a [`Viewport::clone_with`] call may replace. `dont_flip` is not
/// inherited from the source viewport.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ViewportOverrides {
    pub scale: Option<f64>,
    pub rotation: Option<i32>,
    pub offset_x: Option<f64>,
    pub offset_y: Option<f64>,
    pub dont_flip: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawDims {
    pub page_width: f64,
    pub page_height: f64,
    pub page_x: f64,
    pub page_y: f64,
}

/// Affine mapping from document points into a target pixel space.
#[derive(Debug, Clone, PartialEq)]
pub struct Viewport {
    view_box: [f64; 4],
    scale: f64,
    rotation: i32,
    offset_x: f64,
    offset_y: f64,
    transform: Affine,
    width: f64,
    height: f64,
}

impl Viewport {
    pub fn new(params: ViewportParams) -> AppResult<Self> {
        let ViewportParams {
            view_box,
            scale,
            rotation,
            offset_x,
            offset_y,
            dont_flip,
        } = params;

        let center_x = (view_box[2] + view_box[0]) / 2.0;
        let center_y = (view_box[3] + view_box[1]) / 2.0;

        let (rotate_a, rotate_b, mut rotate_c, mut rotate_d) = match rotation.rem_euclid(360) {
            0 => (1.0, 0.0, 0.0, -1.0),
            90 => (0.0, 1.0, 1.0, 0.0),
            180 => (-1.0, 0.0, 0.0, 1.0),
            270 => (0.0, -1.0, -1.0, 0.0),
            _ => return Err(AppError::InvalidRotation(rotation)),
        };
        if dont_flip {
            rotate_c = -rotate_c;
            rotate_d = -rotate_d;
        }

        let extent_x = view_box[2] - view_box[0];
        let extent_y = view_box[3] - view_box[1];
        let (offset_canvas_x, offset_canvas_y, width, height) = if rotate_a == 0.0 {
            (
                (center_y - view_box[1]).abs() * scale + offset_x,
                (center_x - view_box[0]).abs() * scale + offset_y,
                extent_y * scale,
                extent_x * scale,
            )
        } else {
            (
                (center_x - view_box[0]).abs() * scale + offset_x,
                (center_y - view_box[1]).abs() * scale + offset_y,
                extent_x * scale,
                extent_y * scale,
            )
        };

        let transform = Affine::new([
            rotate_a * scale,
            rotate_b * scale,
            rotate_c * scale,
            rotate_d * scale,
            offset_canvas_x - rotate_a * scale * center_x - rotate_c * scale * center_y,
            offset_canvas_y - rotate_b * scale * center_x - rotate_d * scale * center_y,
        ]);

        Ok(Self {
            view_box,
            scale,
            rotation,
            offset_x,
            offset_y,
            transform,
            width,
            height,
        })
    }

    pub fn view_box(&self) -> [f64; 4] {
        self.view_box
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn rotation(&self) -> i32 {
        self.rotation
    }

    pub fn offset(&self) -> (f64, f64) {
        (self.offset_x, self.offset_y)
    }

    pub fn affine(&self) -> Affine {
        self.transform
    }

    pub fn transform(&self) -> [f64; 6] {
        self.transform.as_coeffs()
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn raw_dims(&self) -> RawDims {
        RawDims {
            page_width: self.view_box[2] - self.view_box[0],
            page_height: self.view_box[3] - self.view_box[1],
            page_x: self.view_box[0],
            page_y: self.view_box[1],
        }
    }

    pub fn clone_with(&self, overrides: ViewportOverrides) -> AppResult<Self> {
        Self::new(ViewportParams {
            view_box: self.view_box,
            scale: overrides.scale.unwrap_or(self.scale),
            rotation: overrides.rotation.unwrap_or(self.rotation),
            offset_x: overrides.offset_x.unwrap_or(self.offset_x),
            offset_y: overrides.offset_y.unwrap_or(self.offset_y),
            dont_flip: overrides.dont_flip,
        })
    }

    pub fn convert_to_viewport_point(&self, x: f64, y: f64) -> Point {
        apply_transform(Point::new(x, y), &self.transform)
    }

    /// Maps both corners independently. Under 90/270 degree rotations the
    /// result may have `x0 > x1` or `y0 > y1`; see
    /// [`Viewport::convert_to_viewport_rectangle_normalized`].
    pub fn convert_to_viewport_rectangle(&self, rect: Rect) -> Rect {
        let top_left = apply_transform(Point::new(rect.x0, rect.y0), &self.transform);
        let bottom_right = apply_transform(Point::new(rect.x1, rect.y1), &self.transform);
        Rect::new(top_left.x, top_left.y, bottom_right.x, bottom_right.y)
    }

    pub fn convert_to_viewport_rectangle_normalized(&self, rect: Rect) -> Rect {
        self.convert_to_viewport_rectangle(rect).abs()
    }

    pub fn convert_to_pdf_point(&self, x: f64, y: f64) -> Point {
        apply_inverse_transform(Point::new(x, y), &self.transform)
    }
}

pub fn apply_transform(point: Point, transform: &Affine) -> Point {
    *transform * point
}

/// Solves the 2x2 system directly. A singular transform yields non-finite
/// coordinates instead of an error.
pub fn apply_inverse_transform(point: Point, transform: &Affine) -> Point {
    let m = transform.as_coeffs();
    let det = m[0] * m[3] - m[1] * m[2];
    let x = (point.x * m[3] - point.y * m[2] + m[2] * m[5] - m[4] * m[3]) / det;
    let y = (-point.x * m[1] + point.y * m[0] + m[4] * m[1] - m[5] * m[0]) / det;
    Point::new(x, y)
}

#[cfg(test)]
mod tests {
    use kurbo::Rect;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::{Viewport, ViewportOverrides, ViewportParams};
    use crate::error::AppError;

    const EPS: f64 = 1e-9;

    fn assert_coeffs(actual: [f64; 6], expected: [f64; 6]) {
        for (index, (left, right)) in actual.iter().zip(expected.iter()).enumerate() {
            assert!(
                (left - right).abs() < EPS,
                "coefficient {index}: got {actual:?}, expected {expected:?}"
            );
        }
    }

    fn page_viewport(rotation: i32, dont_flip: bool) -> Viewport {
        Viewport::new(
            ViewportParams::page(600.0, 800.0, 2.0)
                .with_rotation(rotation)
                .with_dont_flip(dont_flip),
        )
        .expect("rotation should be valid")
    }

    #[test]
    fn builds_expected_transform_for_each_right_angle() {
        assert_coeffs(
            page_viewport(0, false).transform(),
            [2.0, 0.0, 0.0, -2.0, 0.0, 1600.0],
        );
        assert_coeffs(
            page_viewport(90, false).transform(),
            [0.0, 2.0, 2.0, 0.0, 0.0, 0.0],
        );
        assert_coeffs(
            page_viewport(180, false).transform(),
            [-2.0, 0.0, 0.0, 2.0, 1200.0, 0.0],
        );
        assert_coeffs(
            page_viewport(270, false).transform(),
            [0.0, -2.0, -2.0, 0.0, 1600.0, 1200.0],
        );
    }

    #[test]
    fn swapped_rotations_swap_device_extents() {
        let upright = page_viewport(0, false);
        assert_eq!((upright.width(), upright.height()), (1200.0, 1600.0));

        let sideways = page_viewport(90, false);
        assert_eq!((sideways.width(), sideways.height()), (1600.0, 1200.0));
    }

    #[test]
    fn dont_flip_negates_the_flip_terms() {
        for rotation in [0, 90, 180, 270] {
            let flipped = page_viewport(rotation, false).transform();
            let unflipped = page_viewport(rotation, true).transform();
            assert_eq!(unflipped[0], flipped[0]);
            assert_eq!(unflipped[1], flipped[1]);
            assert!((unflipped[2] + flipped[2]).abs() < EPS);
            assert!((unflipped[3] + flipped[3]).abs() < EPS);
        }
        assert_coeffs(
            page_viewport(0, true).transform(),
            [2.0, 0.0, 0.0, 2.0, 0.0, 0.0],
        );
    }

    #[test]
    fn rejects_rotation_that_is_not_a_right_angle() {
        let result = Viewport::new(ViewportParams::page(600.0, 800.0, 1.0).with_rotation(45));
        assert!(matches!(result, Err(AppError::InvalidRotation(45))));
    }

    #[test]
    fn normalizes_negative_and_oversized_rotation() {
        assert_coeffs(
            page_viewport(-90, false).transform(),
            page_viewport(270, false).transform(),
        );
        assert_coeffs(
            page_viewport(450, false).transform(),
            page_viewport(90, false).transform(),
        );
    }

    #[test]
    fn inverse_undoes_forward_mapping() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        for _ in 0..500 {
            let x0 = rng.random_range(-200.0..200.0);
            let y0 = rng.random_range(-200.0..200.0);
            let width = rng.random_range(1.0..1000.0);
            let height = rng.random_range(1.0..1000.0);
            let scale = rng.random_range(0.05..8.0);
            let rotation = [0, 90, 180, 270, -90, 360][rng.random_range(0..6usize)];
            let params = ViewportParams::new([x0, y0, x0 + width, y0 + height], scale)
                .with_rotation(rotation)
                .with_offset(rng.random_range(-50.0..50.0), rng.random_range(-50.0..50.0))
                .with_dont_flip(rng.random_bool(0.5));
            let viewport = Viewport::new(params).expect("params should be valid");

            let x = rng.random_range(x0..x0 + width);
            let y = rng.random_range(y0..y0 + height);
            let device = viewport.convert_to_viewport_point(x, y);
            let back = viewport.convert_to_pdf_point(device.x, device.y);
            assert!((back.x - x).abs() < 1e-6, "x: {x} -> {}", back.x);
            assert!((back.y - y).abs() < 1e-6, "y: {y} -> {}", back.y);
        }
    }

    #[test]
    fn zero_scale_inverse_is_not_finite() {
        let viewport =
            Viewport::new(ViewportParams::page(100.0, 100.0, 0.0)).expect("zero scale builds");
        let point = viewport.convert_to_pdf_point(10.0, 10.0);
        assert!(!point.x.is_finite() || !point.y.is_finite());
    }

    #[test]
    fn rectangle_corners_keep_transform_order() {
        let viewport = page_viewport(270, false);
        let rect = viewport.convert_to_viewport_rectangle(Rect::new(0.0, 0.0, 100.0, 50.0));
        assert_eq!(
            (rect.x0, rect.y0, rect.x1, rect.y1),
            (1600.0, 1200.0, 1500.0, 1000.0)
        );

        let normalized =
            viewport.convert_to_viewport_rectangle_normalized(Rect::new(0.0, 0.0, 100.0, 50.0));
        assert_eq!(
            (normalized.x0, normalized.y0, normalized.x1, normalized.y1),
            (1500.0, 1000.0, 1600.0, 1200.0)
        );
    }

    #[test]
    fn clone_with_overrides_selected_fields_only() {
        let base = Viewport::new(
            ViewportParams::page(600.0, 800.0, 2.0)
                .with_offset(5.0, 7.0)
                .with_dont_flip(true),
        )
        .expect("base viewport");
        let scaled = base
            .clone_with(ViewportOverrides {
                scale: Some(1.0),
                ..ViewportOverrides::default()
            })
            .expect("clone should build");

        assert_eq!(scaled.scale(), 1.0);
        assert_eq!(scaled.offset(), (5.0, 7.0));
        assert_eq!(scaled.view_box(), base.view_box());
        assert_eq!(scaled.transform()[3], -1.0, "dont_flip resets on clone");

        let rejected = base.clone_with(ViewportOverrides {
            rotation: Some(30),
            ..ViewportOverrides::default()
        });
        assert!(matches!(rejected, Err(AppError::InvalidRotation(30))));
    }

    #[test]
    fn raw_dims_report_view_box_extent() {
        let viewport =
            Viewport::new(ViewportParams::new([10.0, 20.0, 110.0, 220.0], 3.0)).expect("viewport");
        let dims = viewport.raw_dims();
        assert_eq!(dims.page_width, 100.0);
        assert_eq!(dims.page_height, 200.0);
        assert_eq!(dims.page_x, 10.0);
        assert_eq!(dims.page_y, 20.0);
    }
}
