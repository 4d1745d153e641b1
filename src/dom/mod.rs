use std::fmt::Debug;

use crate::engine::RgbaFrame;
use crate::error::AppResult;

mod memory;

pub(crate) use memory::escape_html;
pub use memory::{CanvasSurface, Element, MemoryDom, NodeId};

/// 2D drawing surface attached to a canvas node.
pub trait DrawingContext {
    fn canvas_size(&self) -> (u32, u32);
    fn put_image_data(&mut self, frame: &RgbaFrame, dx: u32, dy: u32) -> AppResult<()>;
}

/// Page host operations the layout manager and render passes rely on.
pub trait Dom {
    type Node: Clone + Debug + PartialEq;

    fn create_element(&mut self, tag: &str) -> Self::Node;
    fn append_child(&mut self, parent: &Self::Node, child: &Self::Node);
    fn clear_children(&mut self, node: &Self::Node);
    fn parent(&self, node: &Self::Node) -> Option<Self::Node>;
    fn children(&self, node: &Self::Node) -> Vec<Self::Node>;

    fn set_style(&mut self, node: &Self::Node, property: &str, value: &str);
    fn style(&self, node: &Self::Node, property: &str) -> Option<String>;

    fn set_attribute(&mut self, node: &Self::Node, name: &str, value: &str);
    fn attribute(&self, node: &Self::Node, name: &str) -> Option<String>;
    fn remove_attribute(&mut self, node: &Self::Node, name: &str);

    fn set_text_content(&mut self, node: &Self::Node, text: &str);
    fn set_inner_html(&mut self, node: &Self::Node, html: &str);

    /// Rendered width in CSS pixels.
    fn offset_width(&self, node: &Self::Node) -> f64;

    fn set_canvas_size(&mut self, canvas: &Self::Node, width: u32, height: u32);
    fn canvas_size(&self, canvas: &Self::Node) -> Option<(u32, u32)>;
    fn context_2d(&mut self, canvas: &Self::Node) -> Option<&mut dyn DrawingContext>;

    fn set_class_name(&mut self, node: &Self::Node, class_name: &str) {
        self.set_attribute(node, "class", class_name);
    }

    fn set_id(&mut self, node: &Self::Node, id: &str) {
        self.set_attribute(node, "id", id);
    }

    fn create_child(&mut self, parent: &Self::Node, tag: &str) -> Self::Node {
        let node = self.create_element(tag);
        self.append_child(parent, &node);
        node
    }
}
