use kurbo::Affine;

use crate::dom::Dom;
use crate::engine::TextContent;
use crate::error::AppResult;
use crate::geom::Viewport;

/// Lays out extracted page text as selectable, invisible markup.
pub trait TextLayerRenderer {
    fn render_text_layer<D: Dom>(
        &self,
        dom: &mut D,
        container: &D::Node,
        content: &TextContent,
        viewport: &Viewport,
    ) -> AppResult<()>;
}

/// Absolutely positioned `<span>` per text run, placed in percentages of the
/// page so the layer follows `--scale-factor` on resize.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpanTextLayer {
    pub ascent: f64,
}

impl Default for SpanTextLayer {
    fn default() -> Self {
        Self { ascent: 0.8 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpanPlacement {
    pub left: f64,
    pub top: f64,
    pub font_height: f64,
    pub angle: f64,
}

impl SpanTextLayer {
    pub fn place(&self, run_transform: [f64; 6], viewport: &Viewport) -> SpanPlacement {
        let tx = (viewport.affine() * Affine::new(run_transform)).as_coeffs();
        let font_height = tx[2].hypot(tx[3]);
        let angle = tx[1].atan2(tx[0]);
        let font_ascent = font_height * self.ascent;
        let (left, top) = if angle == 0.0 {
            (tx[4], tx[5] - font_ascent)
        } else {
            (
                tx[4] + font_ascent * angle.sin(),
                tx[5] - font_ascent * angle.cos(),
            )
        };
        SpanPlacement {
            left,
            top,
            font_height,
            angle,
        }
    }
}

impl TextLayerRenderer for SpanTextLayer {
    fn render_text_layer<D: Dom>(
        &self,
        dom: &mut D,
        container: &D::Node,
        content: &TextContent,
        viewport: &Viewport,
    ) -> AppResult<()> {
        dom.clear_children(container);
        let page_width = viewport.width();
        let page_height = viewport.height();
        let scale = viewport.scale();

        for item in &content.items {
            if !item.text.is_empty() {
                let placement = self.place(item.transform, viewport);
                let span = dom.create_child(container, "span");
                dom.set_text_content(&span, &item.text);
                dom.set_attribute(&span, "role", "presentation");
                dom.set_attribute(&span, "dir", &item.dir);
                dom.set_style(
                    &span,
                    "left",
                    &format!("{:.2}%", 100.0 * placement.left / page_width),
                );
                dom.set_style(
                    &span,
                    "top",
                    &format!("{:.2}%", 100.0 * placement.top / page_height),
                );
                dom.set_style(
                    &span,
                    "font-size",
                    &format!(
                        "calc(var(--scale-factor)*{:.2}px)",
                        placement.font_height / scale
                    ),
                );
                if !item.font_name.is_empty() {
                    dom.set_style(&span, "font-family", &item.font_name);
                }
                if placement.angle != 0.0 {
                    dom.set_style(
                        &span,
                        "transform",
                        &format!("rotate({}deg)", placement.angle.to_degrees()),
                    );
                }
            }
            if item.has_eol {
                let br = dom.create_child(container, "br");
                dom.set_attribute(&br, "role", "presentation");
            }
        }
        Ok(())
    }
}

/// Rounds a text-layer scale the way it is published in `--scale-factor`.
pub fn rounded_scale(scale: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (scale * factor).round() / factor
}
