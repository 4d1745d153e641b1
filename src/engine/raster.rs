use kurbo::Rect;

use crate::color::parse_hex_color;
use crate::geom::Viewport;

use super::artifact::{VectorItem, VectorPage};
use super::traits::RgbaFrame;

/// Paints `page` into a `width`x`height` RGBA frame. Item coordinates are
/// page points measured from the top-left corner.
pub(crate) fn rasterize_page(
    page: &VectorPage,
    viewport: &Viewport,
    background: [u8; 4],
    width: u32,
    height: u32,
) -> RgbaFrame {
    let mut pixels = background.repeat(width as usize * height as usize);

    for item in &page.items {
        let VectorItem::Rect {
            x,
            y,
            width: item_width,
            height: item_height,
            fill,
        } = item
        else {
            continue;
        };
        let Ok(color) = parse_hex_color(fill) else {
            log::warn!("skipping rect with unsupported fill {fill:?}");
            continue;
        };

        let device = viewport.convert_to_viewport_rectangle_normalized(Rect::new(
            *x,
            *y,
            x + item_width,
            y + item_height,
        ));
        let Some((x0, y0, x1, y1)) = clip_to_frame(device, width, height) else {
            continue;
        };
        for row in y0..y1 {
            let start = (row * width as usize + x0) * 4;
            let end = (row * width as usize + x1) * 4;
            for pixel in pixels[start..end].chunks_exact_mut(4) {
                pixel.copy_from_slice(&color);
            }
        }
    }

    RgbaFrame {
        width,
        height,
        pixels: pixels.into(),
    }
}

fn clip_to_frame(rect: Rect, width: u32, height: u32) -> Option<(usize, usize, usize, usize)> {
    if !(rect.x0.is_finite() && rect.y0.is_finite() && rect.x1.is_finite() && rect.y1.is_finite())
    {
        return None;
    }
    let clamp = |value: f64, limit: u32| value.round().clamp(0.0, f64::from(limit)) as usize;
    let x0 = clamp(rect.x0, width);
    let x1 = clamp(rect.x1, width);
    let y0 = clamp(rect.y0, height);
    let y1 = clamp(rect.y1, height);
    (x0 < x1 && y0 < y1).then_some((x0, y0, x1, y1))
}
