use crate::dom::Dom;
use crate::engine::PageInfo;
use crate::error::{AppError, AppResult};

pub const DEFAULT_LAYOUT_PIXEL_PER_PT: f64 = 2.0;

/// DOM nodes composing one page: a wrapper holding the raster canvas and the
/// semantic overlays (text layer and annotation layer).
#[derive(Debug, Clone, PartialEq)]
pub struct PageLayers<N> {
    pub common: N,
    pub canvas: N,
    pub semantic: N,
    pub text_parent: N,
    pub text: N,
    pub annotation: N,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageLayout<N> {
    pub info: PageInfo,
    pub device_width: u32,
    pub device_height: u32,
    pub layers: PageLayers<N>,
}

/// Per-page layer sets for an ordered page list, addressed by page index.
#[derive(Debug, Clone)]
pub struct PageLayoutManager<N> {
    container: N,
    pixel_per_pt: f64,
    pages: Vec<PageLayout<N>>,
}

pub fn device_size(info: &PageInfo, pixel_per_pt: f64) -> (u32, u32) {
    (
        (info.width.ceil() * pixel_per_pt) as u32,
        (info.height.ceil() * pixel_per_pt) as u32,
    )
}

impl<N: Clone + std::fmt::Debug + PartialEq> PageLayoutManager<N> {
    pub fn build<D>(
        dom: &mut D,
        container: &N,
        pages: &[PageInfo],
        pixel_per_pt: f64,
    ) -> AppResult<Self>
    where
        D: Dom<Node = N>,
    {
        if !(pixel_per_pt.is_finite() && pixel_per_pt > 0.0) {
            return Err(AppError::InvalidPixelPerPt(pixel_per_pt));
        }

        dom.clear_children(container);
        dom.set_style(container, "width", "100%");

        let mut layouts = Vec::with_capacity(pages.len());
        for info in pages {
            let (device_width, device_height) = device_size(info, pixel_per_pt);
            let common = dom.create_child(container, "div");
            let layers = Self::create_layers(dom, container, common, device_width, device_height);
            layouts.push(PageLayout {
                info: *info,
                device_width,
                device_height,
                layers,
            });
        }

        log::debug!("built layout for {} pages", layouts.len());
        Ok(Self {
            container: container.clone(),
            pixel_per_pt,
            pages: layouts,
        })
    }

    fn create_layers<D>(
        dom: &mut D,
        container: &N,
        common: N,
        device_width: u32,
        device_height: u32,
    ) -> PageLayers<N>
    where
        D: Dom<Node = N>,
    {
        let canvas = dom.create_element("canvas");
        let semantic = dom.create_element("div");
        let text = dom.create_element("div");
        let text_parent = dom.create_element("div");
        let annotation = dom.create_element("div");

        // A canvas without a 2d context is left detached.
        if dom.context_2d(&canvas).is_some() {
            let canvas_wrapper = dom.create_element("div");
            dom.set_canvas_size(&canvas, device_width, device_height);
            dom.append_child(&canvas_wrapper, &canvas);
            dom.append_child(&common, &canvas_wrapper);
            dom.set_style(&canvas_wrapper, "position", "absolute");
        }

        dom.append_child(&text_parent, &text);
        dom.set_class_name(&text_parent, "text-layer textLayer");
        let container_width = dom.offset_width(container);
        let (width, height) = overlay_size(container_width, device_width, device_height);
        for node in [&text_parent, &annotation, &common] {
            dom.set_style(node, "width", &px(width));
            dom.set_style(node, "height", &px(height));
        }
        dom.set_style(&text_parent, "position", "absolute");
        dom.set_style(&annotation, "position", "absolute");
        dom.set_style(&common, "position", "relative");
        dom.append_child(&semantic, &text_parent);
        dom.append_child(&semantic, &annotation);
        dom.append_child(&common, &semantic);

        PageLayers {
            common,
            canvas,
            semantic,
            text_parent,
            text,
            annotation,
        }
    }

    /// Rescales overlays and the canvas wrapper to the container's current
    /// width without re-rasterizing.
    pub fn reset_layout<D>(&self, dom: &mut D) -> AppResult<()>
    where
        D: Dom<Node = N>,
    {
        for (index, page) in self.pages.iter().enumerate() {
            let Some(canvas_wrapper) = dom.parent(&page.layers.canvas) else {
                return Err(AppError::LayoutDesync {
                    page: index,
                    canvas_count: self.pages.len(),
                });
            };

            let container_width = dom.offset_width(&self.container);
            let (width, height) =
                overlay_size(container_width, page.device_width, page.device_height);
            for node in [
                &page.layers.text_parent,
                &page.layers.annotation,
                &page.layers.common,
            ] {
                dom.set_style(node, "width", &px(width));
                dom.set_style(node, "height", &px(height));
            }

            let scale = container_width / f64::from(page.device_width);
            dom.set_style(&canvas_wrapper, "transform-origin", "0px 0px");
            dom.set_style(&canvas_wrapper, "transform", &format!("scale({scale})"));
        }
        Ok(())
    }

    pub fn container(&self) -> &N {
        &self.container
    }

    pub fn pixel_per_pt(&self) -> f64 {
        self.pixel_per_pt
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn page(&self, index: usize) -> Option<&PageLayout<N>> {
        self.pages.get(index)
    }

    pub fn pages(&self) -> &[PageLayout<N>] {
        &self.pages
    }

    pub fn page_infos(&self) -> Vec<PageInfo> {
        self.pages.iter().map(|page| page.info).collect()
    }

    pub fn annotation_layers(&self) -> Vec<N> {
        self.pages
            .iter()
            .map(|page| page.layers.annotation.clone())
            .collect()
    }
}

fn overlay_size(container_width: f64, device_width: u32, device_height: u32) -> (f64, f64) {
    let scale = container_width / f64::from(device_width);
    (container_width, f64::from(device_height) * scale)
}

fn px(value: f64) -> String {
    format!("{value}px")
}
