use std::collections::BTreeMap;
use std::fmt::Write;

use crate::engine::RgbaFrame;
use crate::error::{AppError, AppResult};

use super::{Dom, DrawingContext};

const DEFAULT_CANVAS_SIZE: (u32, u32) = (300, 150);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanvasSurface {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl CanvasSurface {
    fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize * 4],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * 4;
        let mut rgba = [0; 4];
        rgba.copy_from_slice(&self.pixels[offset..offset + 4]);
        Some(rgba)
    }

    pub fn to_frame(&self) -> RgbaFrame {
        RgbaFrame {
            width: self.width,
            height: self.height,
            pixels: self.pixels.clone().into(),
        }
    }
}

impl DrawingContext for CanvasSurface {
    fn canvas_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn put_image_data(&mut self, frame: &RgbaFrame, dx: u32, dy: u32) -> AppResult<()> {
        if frame.byte_len() != frame.width as usize * frame.height as usize * 4 {
            return Err(AppError::invalid_argument(
                "image data length does not match its dimensions",
            ));
        }
        if dx >= self.width || dy >= self.height {
            return Ok(());
        }

        let copy_width = frame.width.min(self.width - dx) as usize;
        let copy_height = frame.height.min(self.height - dy) as usize;
        for row in 0..copy_height {
            let src = row * frame.width as usize * 4;
            let dst = ((dy as usize + row) * self.width as usize + dx as usize) * 4;
            self.pixels[dst..dst + copy_width * 4]
                .copy_from_slice(&frame.pixels[src..src + copy_width * 4]);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub tag: String,
    pub attributes: BTreeMap<String, String>,
    pub styles: Vec<(String, String)>,
    pub children: Vec<NodeId>,
    pub parent: Option<NodeId>,
    pub text: Option<String>,
    pub inner_html: Option<String>,
    pub canvas: Option<CanvasSurface>,
    layout_width: Option<f64>,
}

impl Element {
    fn new(tag: &str) -> Self {
        let canvas = tag
            .eq_ignore_ascii_case("canvas")
            .then(|| CanvasSurface::new(DEFAULT_CANVAS_SIZE.0, DEFAULT_CANVAS_SIZE.1));
        Self {
            tag: tag.to_ascii_lowercase(),
            attributes: BTreeMap::new(),
            styles: Vec::new(),
            children: Vec::new(),
            parent: None,
            text: None,
            inner_html: None,
            canvas,
            layout_width: None,
        }
    }

    pub fn style(&self, property: &str) -> Option<&str> {
        self.styles
            .iter()
            .find(|(name, _)| name == property)
            .map(|(_, value)| value.as_str())
    }

    pub fn class_list(&self) -> impl Iterator<Item = &str> {
        self.attributes
            .get("class")
            .map(|class| class.split_whitespace())
            .into_iter()
            .flatten()
    }
}

/// Arena-backed headless page host.
#[derive(Debug, Clone)]
pub struct MemoryDom {
    nodes: Vec<Element>,
    root: NodeId,
    contexts_enabled: bool,
}

impl Default for MemoryDom {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDom {
    pub fn new() -> Self {
        Self {
            nodes: vec![Element::new("body")],
            root: NodeId(0),
            contexts_enabled: true,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn element(&self, node: NodeId) -> &Element {
        &self.nodes[node.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Pins the rendered width of `node`, as a browser layout pass would.
    pub fn set_layout_width(&mut self, node: NodeId, width: f64) {
        self.nodes[node.0].layout_width = Some(width);
    }

    pub fn disable_canvas_contexts(&mut self) {
        self.contexts_enabled = false;
    }

    pub fn canvas(&self, node: NodeId) -> Option<&CanvasSurface> {
        self.nodes[node.0].canvas.as_ref()
    }

    /// Pre-order walk below `node`, excluding `node` itself.
    pub fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.nodes[node.0].children.iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.nodes[next.0].children.iter().rev().copied());
        }
        out
    }

    pub fn find_by_id(&self, id: &str) -> Option<NodeId> {
        std::iter::once(self.root)
            .chain(self.descendants(self.root))
            .find(|node| self.nodes[node.0].attributes.get("id").map(String::as_str) == Some(id))
    }

    pub fn find_by_class(&self, scope: NodeId, class_name: &str) -> Vec<NodeId> {
        self.descendants(scope)
            .into_iter()
            .filter(|node| {
                self.nodes[node.0]
                    .class_list()
                    .any(|class| class == class_name)
            })
            .collect()
    }

    pub fn find_by_tag(&self, scope: NodeId, tag: &str) -> Vec<NodeId> {
        self.descendants(scope)
            .into_iter()
            .filter(|node| self.nodes[node.0].tag == tag)
            .collect()
    }

    pub fn to_html(&self, node: NodeId) -> String {
        self.to_html_with(node, &mut |_| None)
    }

    /// Serializes `node` as markup. When `canvas_src` yields a URI, a canvas
    /// is written as an `<img>` showing its pixels.
    pub fn to_html_with<F>(&self, node: NodeId, canvas_src: &mut F) -> String
    where
        F: FnMut(&CanvasSurface) -> Option<String>,
    {
        let mut out = String::new();
        self.write_html(node, canvas_src, &mut out);
        out
    }

    fn write_html<F>(&self, node: NodeId, canvas_src: &mut F, out: &mut String)
    where
        F: FnMut(&CanvasSurface) -> Option<String>,
    {
        let element = &self.nodes[node.0];
        let mut tag = element.tag.as_str();
        let mut attributes = element.attributes.clone();

        if let Some(canvas) = &element.canvas {
            attributes.insert("width".to_string(), canvas.width.to_string());
            attributes.insert("height".to_string(), canvas.height.to_string());
            if let Some(src) = canvas_src(canvas) {
                tag = "img";
                attributes.insert("src".to_string(), src);
            }
        }
        if !element.styles.is_empty() {
            let style = element
                .styles
                .iter()
                .map(|(name, value)| format!("{name}: {value}"))
                .collect::<Vec<_>>()
                .join("; ");
            attributes.insert("style".to_string(), style);
        }

        let _ = write!(out, "<{tag}");
        for (name, value) in &attributes {
            let _ = write!(out, " {name}=\"{}\"", escape_html(value));
        }
        out.push('>');
        if tag == "img" {
            return;
        }

        if let Some(html) = &element.inner_html {
            out.push_str(html);
        }
        if let Some(text) = &element.text {
            out.push_str(&escape_html(text));
        }
        for child in &element.children {
            self.write_html(*child, canvas_src, out);
        }
        let _ = write!(out, "</{tag}>");
    }

    fn detach(&mut self, node: NodeId) {
        if let Some(parent) = self.nodes[node.0].parent.take() {
            self.nodes[parent.0].children.retain(|child| *child != node);
        }
    }
}

impl Dom for MemoryDom {
    type Node = NodeId;

    fn create_element(&mut self, tag: &str) -> NodeId {
        self.nodes.push(Element::new(tag));
        NodeId(self.nodes.len() - 1)
    }

    fn append_child(&mut self, parent: &NodeId, child: &NodeId) {
        self.detach(*child);
        self.nodes[child.0].parent = Some(*parent);
        self.nodes[parent.0].children.push(*child);
    }

    fn clear_children(&mut self, node: &NodeId) {
        let children = std::mem::take(&mut self.nodes[node.0].children);
        for child in children {
            self.nodes[child.0].parent = None;
        }
        self.nodes[node.0].text = None;
        self.nodes[node.0].inner_html = None;
    }

    fn parent(&self, node: &NodeId) -> Option<NodeId> {
        self.nodes[node.0].parent
    }

    fn children(&self, node: &NodeId) -> Vec<NodeId> {
        self.nodes[node.0].children.clone()
    }

    fn set_style(&mut self, node: &NodeId, property: &str, value: &str) {
        let styles = &mut self.nodes[node.0].styles;
        match styles.iter_mut().find(|(name, _)| name == property) {
            Some((_, current)) => *current = value.to_string(),
            None => styles.push((property.to_string(), value.to_string())),
        }
    }

    fn style(&self, node: &NodeId, property: &str) -> Option<String> {
        self.nodes[node.0].style(property).map(str::to_string)
    }

    fn set_attribute(&mut self, node: &NodeId, name: &str, value: &str) {
        self.nodes[node.0]
            .attributes
            .insert(name.to_string(), value.to_string());
    }

    fn attribute(&self, node: &NodeId, name: &str) -> Option<String> {
        self.nodes[node.0].attributes.get(name).cloned()
    }

    fn remove_attribute(&mut self, node: &NodeId, name: &str) {
        self.nodes[node.0].attributes.remove(name);
    }

    fn set_text_content(&mut self, node: &NodeId, text: &str) {
        self.clear_children(node);
        self.nodes[node.0].text = Some(text.to_string());
    }

    fn set_inner_html(&mut self, node: &NodeId, html: &str) {
        self.clear_children(node);
        if !html.is_empty() {
            self.nodes[node.0].inner_html = Some(html.to_string());
        }
    }

    fn offset_width(&self, node: &NodeId) -> f64 {
        let element = &self.nodes[node.0];
        if let Some(width) = element.layout_width {
            return width;
        }
        if let Some(width) = element
            .style("width")
            .and_then(|value| value.strip_suffix("px"))
            .and_then(|value| value.trim().parse::<f64>().ok())
        {
            return width;
        }
        element
            .parent
            .map(|parent| self.offset_width(&parent))
            .unwrap_or(0.0)
    }

    fn set_canvas_size(&mut self, canvas: &NodeId, width: u32, height: u32) {
        if let Some(surface) = self.nodes[canvas.0].canvas.as_mut() {
            *surface = CanvasSurface::new(width, height);
        }
    }

    fn canvas_size(&self, canvas: &NodeId) -> Option<(u32, u32)> {
        self.nodes[canvas.0]
            .canvas
            .as_ref()
            .map(|surface| (surface.width, surface.height))
    }

    fn context_2d(&mut self, canvas: &NodeId) -> Option<&mut dyn DrawingContext> {
        if !self.contexts_enabled {
            return None;
        }
        self.nodes[canvas.0]
            .canvas
            .as_mut()
            .map(|surface| surface as &mut dyn DrawingContext)
    }
}

pub(crate) fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}
