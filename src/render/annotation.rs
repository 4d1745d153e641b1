use rand::Rng;

use crate::dom::Dom;
use crate::engine::{AnnotationBox, AnnotationLink, AnnotationList, LinkAction, PageInfo};

pub const ANNOTATION_CLASS: &str = "typst-annotation";
pub const ANCHOR_ID_PREFIX: &str = "lnk-";

/// Overlay placement as percentages of the page, plus the skew terms of the
/// link's transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayBox {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
    pub skew_x: f64,
    pub skew_y: f64,
}

impl OverlayBox {
    pub fn new(annotation_box: &AnnotationBox, page: &PageInfo) -> Self {
        let [_, skew_y, skew_x, _, x, y] = annotation_box.transform;
        Self {
            left: x / page.width * 100.0,
            top: y / page.height * 100.0,
            width: annotation_box.width / page.width * 100.0,
            height: annotation_box.height / page.height * 100.0,
            skew_x,
            skew_y,
        }
    }

    pub fn css_transform(&self) -> String {
        format!("matrix(1, {}, {}, 1, 0, 0)", self.skew_y, self.skew_x)
    }

    pub fn apply<D: Dom>(&self, dom: &mut D, node: &D::Node) {
        dom.set_class_name(node, ANNOTATION_CLASS);
        dom.set_style(node, "width", &percent(self.width));
        dom.set_style(node, "height", &percent(self.height));
        dom.set_style(node, "left", &percent(self.left));
        dom.set_style(node, "top", &percent(self.top));
        dom.set_style(node, "transform", &self.css_transform());
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LinkTarget {
    External {
        url: String,
    },
    /// Marker to insert into the annotation layer of page `page_index`.
    Internal {
        page_index: usize,
        left: f64,
        top: f64,
    },
    Dangling {
        page_ref: usize,
    },
    Unsupported {
        kind: String,
    },
}

/// Per-link geometry and navigation resolution over one page list.
#[derive(Debug, Clone, Copy)]
pub struct AnnotationResolver<'a> {
    pages: &'a [PageInfo],
}

impl<'a> AnnotationResolver<'a> {
    pub fn new(pages: &'a [PageInfo]) -> Self {
        Self { pages }
    }

    pub fn overlay(&self, link: &AnnotationLink, page_index: usize) -> Option<OverlayBox> {
        self.pages
            .get(page_index)
            .map(|page| OverlayBox::new(&link.annotation_box, page))
    }

    /// `GoTo` markers are placed in the destination page's coordinates.
    pub fn resolve(&self, action: &LinkAction) -> LinkTarget {
        match action {
            LinkAction::Url { url } => LinkTarget::External { url: url.clone() },
            LinkAction::GoTo { x, y, page_ref } => {
                let destination = page_ref
                    .checked_sub(1)
                    .and_then(|index| self.pages.get(index).map(|page| (index, page)));
                match destination {
                    Some((page_index, page)) => LinkTarget::Internal {
                        page_index,
                        left: x / page.width * 100.0,
                        top: y / page.height * 100.0,
                    },
                    None => LinkTarget::Dangling {
                        page_ref: *page_ref,
                    },
                }
            }
            LinkAction::Other { kind } => LinkTarget::Unsupported { kind: kind.clone() },
        }
    }

    /// Clears every annotation layer, then materializes each page's links.
    /// Returns the number of links that produced an overlay.
    pub fn render_layers<D, R>(
        &self,
        dom: &mut D,
        layers: &[D::Node],
        lists: &[AnnotationList],
        rng: &mut R,
    ) -> usize
    where
        D: Dom,
        R: Rng + ?Sized,
    {
        for layer in layers {
            dom.clear_children(layer);
        }

        let mut rendered = 0;
        for (page_index, (layer, list)) in layers.iter().zip(lists).enumerate() {
            if self.pages.get(page_index).is_none() {
                log::error!("page not found for {page_index}");
                continue;
            }
            for link in &list.links {
                if self.render_link(dom, layers, layer, page_index, link, rng) {
                    rendered += 1;
                }
            }
        }
        rendered
    }

    fn render_link<D, R>(
        &self,
        dom: &mut D,
        layers: &[D::Node],
        layer: &D::Node,
        page_index: usize,
        link: &AnnotationLink,
        rng: &mut R,
    ) -> bool
    where
        D: Dom,
        R: Rng + ?Sized,
    {
        let Some(overlay) = self.overlay(link, page_index) else {
            return false;
        };

        let href = match self.resolve(&link.action) {
            LinkTarget::External { url } => url,
            LinkTarget::Internal {
                page_index: destination,
                left,
                top,
            } => {
                let id = random_anchor_id(rng);
                let marker = dom.create_element("div");
                dom.set_class_name(&marker, ANNOTATION_CLASS);
                dom.set_style(&marker, "left", &percent(left));
                dom.set_style(&marker, "top", &percent(top));
                dom.set_id(&marker, &id);
                dom.append_child(&layers[destination], &marker);
                format!("#{id}")
            }
            LinkTarget::Dangling { page_ref } => {
                log::warn!("link on page {page_index} targets missing page {page_ref}");
                return false;
            }
            LinkTarget::Unsupported { kind } => {
                log::warn!("unknown action {kind} on page {page_index}");
                return false;
            }
        };

        let overlay_node = dom.create_element("div");
        overlay.apply(dom, &overlay_node);
        let anchor = dom.create_element("a");
        dom.set_attribute(&anchor, "href", &href);
        if matches!(link.action, LinkAction::Url { .. }) {
            dom.set_attribute(&anchor, "target", "_blank");
        }
        dom.append_child(&anchor, &overlay_node);
        dom.append_child(layer, &anchor);
        true
    }
}

pub fn random_anchor_id<R: Rng + ?Sized>(rng: &mut R) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut value: u64 = rng.random();
    let mut digits = Vec::new();
    loop {
        digits.push(DIGITS[(value % 36) as usize]);
        value /= 36;
        if value == 0 {
            break;
        }
    }
    digits.reverse();
    format!("{ANCHOR_ID_PREFIX}{}", String::from_utf8_lossy(&digits))
}

fn percent(value: f64) -> String {
    format!("{value}%")
}
