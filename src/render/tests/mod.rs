use serde_json::{Value, json};

use crate::dom::{Dom, MemoryDom, NodeId};


/// Builds JSON vector artifacts page by page.
#[derive(Default)]
pub(super) struct ArtifactBuilder {
    pages: Vec<Value>,
    sources: Vec<Value>,
}

impl ArtifactBuilder {
    pub(super) fn new() -> Self {
        Self::default()
    }

    pub(super) fn page(mut self, width: f64, height: f64) -> Self {
        self.pages.push(json!({
            "width": width,
            "height": height,
            "items": [],
            "links": [],
        }));
        self
    }

    pub(super) fn rect(mut self, x: f64, y: f64, width: f64, height: f64, fill: &str) -> Self {
        self.push_item(json!({
            "kind": "rect", "x": x, "y": y, "width": width, "height": height, "fill": fill,
        }));
        self
    }

    pub(super) fn text(mut self, x: f64, y: f64, size: f64, content: &str) -> Self {
        self.push_item(json!({
            "kind": "text", "x": x, "y": y, "size": size, "content": content,
        }));
        self
    }

    pub(super) fn url_link(mut self, x: f64, y: f64, url: &str) -> Self {
        self.push_link(json!({
            "x": x, "y": y, "width": 40.0, "height": 12.0,
            "action": {"t": "Url", "v": {"url": url}},
        }));
        self
    }

    pub(super) fn goto_link(mut self, x: f64, y: f64, page_ref: usize) -> Self {
        self.push_link(json!({
            "x": x, "y": y, "width": 40.0, "height": 12.0,
            "action": {"t": "GoTo", "v": {"x": 10.0, "y": 20.0, "page_ref": page_ref}},
        }));
        self
    }

    pub(super) fn raw_link(mut self, kind: &str) -> Self {
        self.push_link(json!({
            "x": 0.0, "y": 0.0, "width": 1.0, "height": 1.0,
            "action": {"t": kind, "v": {}},
        }));
        self
    }

    pub(super) fn source(mut self, path: &[u32], location: &str) -> Self {
        self.sources.push(json!({"path": path, "location": location}));
        self
    }

    pub(super) fn build(self) -> Vec<u8> {
        serde_json::to_vec(&json!({"pages": self.pages, "sources": self.sources}))
            .expect("artifact should serialize")
    }

    fn last_page(&mut self) -> &mut Value {
        self.pages.last_mut().expect("add a page first")
    }

    fn push_item(&mut self, item: Value) {
        self.last_page()["items"]
            .as_array_mut()
            .expect("items array")
            .push(item);
    }

    fn push_link(&mut self, link: Value) {
        self.last_page()["links"]
            .as_array_mut()
            .expect("links array")
            .push(link);
    }
}

/// Host with a fixed-width mount container.
pub(super) fn host(width: f64) -> (MemoryDom, NodeId) {
    let mut dom = MemoryDom::new();
    let root = dom.root();
    let container = dom.create_child(&root, "div");
    dom.set_layout_width(container, width);
    (dom, container)
}

pub(super) struct RenderedPage {
    pub canvas: NodeId,
    pub text_parent: NodeId,
    pub text: NodeId,
    pub annotation: NodeId,
}

/// Walks the per-page wrappers under `container`.
pub(super) fn rendered_pages(dom: &MemoryDom, container: NodeId) -> Vec<RenderedPage> {
    dom.children(&container)
        .into_iter()
        .map(|common| {
            let canvas = dom.find_by_tag(common, "canvas")[0];
            let text_parent = dom.find_by_class(common, "textLayer")[0];
            let text = dom.children(&text_parent)[0];
            let semantic = dom.parent(&text_parent).expect("semantic layer");
            let annotation = dom.children(&semantic)[1];
            RenderedPage {
                canvas,
                text_parent,
                text,
                annotation,
            }
        })
        .collect()
}
