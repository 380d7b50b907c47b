//! Arena-backed mutable HTML tree.
//!
//! Parsing is delegated to `scraper` (html5ever); the resulting tree is
//! copied into a flat arena so nodes can be detached and re-attached across
//! fragment boundaries without ownership cycles. Parent/child/sibling links
//! are indices into the arena, with a sentinel for "no node".

use std::fmt::Write;

use quick_xml::escape::escape;

/// Handle to a node in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl NodeId {
    /// Sentinel value for no node.
    pub const NONE: NodeId = NodeId(u32::MAX);

    pub fn is_some(self) -> bool {
        self.0 != u32::MAX
    }

    pub fn is_none(self) -> bool {
        self.0 == u32::MAX
    }
}

#[derive(Debug, Clone)]
pub enum NodeData {
    Document,
    Doctype(String),
    Element {
        name: String,
        attrs: Vec<(String, String)>,
    },
    Text(String),
    Comment(String),
}

#[derive(Debug)]
struct Node {
    data: NodeData,
    parent: NodeId,
    first_child: NodeId,
    last_child: NodeId,
    prev_sibling: NodeId,
    next_sibling: NodeId,
}

impl Node {
    fn new(data: NodeData) -> Self {
        Self {
            data,
            parent: NodeId::NONE,
            first_child: NodeId::NONE,
            last_child: NodeId::NONE,
            prev_sibling: NodeId::NONE,
            next_sibling: NodeId::NONE,
        }
    }
}

/// Elements serialized without a closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta",
    "param", "source", "track", "wbr",
];

/// Elements whose text content is written through unescaped.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

pub struct MarkupTree {
    nodes: Vec<Node>,
    root: NodeId,
}

impl MarkupTree {
    pub fn new() -> Self {
        let mut tree = Self {
            nodes: Vec::new(),
            root: NodeId::NONE,
        };
        tree.root = tree.alloc(Node::new(NodeData::Document));
        tree
    }

    /// Parse an HTML document into a fresh arena.
    pub fn parse(html: &str) -> Self {
        let doc = scraper::Html::parse_document(html);
        let mut tree = Self::new();
        let root = tree.root;
        for child in doc.tree.root().children() {
            tree.copy_from_scraper(root, child);
        }
        tree
    }

    fn copy_from_scraper(
        &mut self,
        parent: NodeId,
        node: ego_tree::NodeRef<'_, scraper::Node>,
    ) {
        let id = match node.value() {
            scraper::Node::Document | scraper::Node::Fragment => {
                // Flatten nested roots into the current parent.
                for child in node.children() {
                    self.copy_from_scraper(parent, child);
                }
                return;
            }
            scraper::Node::Doctype(d) => {
                self.alloc(Node::new(NodeData::Doctype(d.name().to_string())))
            }
            scraper::Node::Comment(c) => {
                self.alloc(Node::new(NodeData::Comment(c.to_string())))
            }
            scraper::Node::Text(t) => self.alloc(Node::new(NodeData::Text(t.to_string()))),
            scraper::Node::Element(e) => {
                let attrs = e
                    .attrs()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect();
                self.alloc(Node::new(NodeData::Element {
                    name: e.name().to_string(),
                    attrs,
                }))
            }
            scraper::Node::ProcessingInstruction(_) => return,
        };
        self.append(parent, id);
        for child in node.children() {
            self.copy_from_scraper(id, child);
        }
    }

    fn alloc(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    fn get(&self, id: NodeId) -> Option<&Node> {
        if id.is_none() {
            return None;
        }
        self.nodes.get(id.0 as usize)
    }

    fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        if id.is_none() {
            return None;
        }
        self.nodes.get_mut(id.0 as usize)
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn data(&self, id: NodeId) -> Option<&NodeData> {
        self.get(id).map(|n| &n.data)
    }

    pub fn parent(&self, id: NodeId) -> NodeId {
        self.get(id).map_or(NodeId::NONE, |n| n.parent)
    }

    pub fn first_child(&self, id: NodeId) -> NodeId {
        self.get(id).map_or(NodeId::NONE, |n| n.first_child)
    }

    pub fn next_sibling(&self, id: NodeId) -> NodeId {
        self.get(id).map_or(NodeId::NONE, |n| n.next_sibling)
    }

    pub fn has_children(&self, id: NodeId) -> bool {
        self.first_child(id).is_some()
    }

    pub fn create_element(&mut self, name: &str, attrs: Vec<(String, String)>) -> NodeId {
        self.alloc(Node::new(NodeData::Element {
            name: name.to_string(),
            attrs,
        }))
    }

    /// Append `child` as the last child of `parent`. The child must already
    /// be detached.
    pub fn append(&mut self, parent: NodeId, child: NodeId) {
        let last = self.get(parent).map_or(NodeId::NONE, |n| n.last_child);

        if let Some(node) = self.get_mut(child) {
            node.parent = parent;
            node.prev_sibling = last;
            node.next_sibling = NodeId::NONE;
        }
        if last.is_some() {
            if let Some(node) = self.get_mut(last) {
                node.next_sibling = child;
            }
        }
        if let Some(node) = self.get_mut(parent) {
            if node.first_child.is_none() {
                node.first_child = child;
            }
            node.last_child = child;
        }
    }

    /// Unlink a node from its parent, keeping its own subtree intact.
    pub fn detach(&mut self, id: NodeId) {
        let (parent, prev, next) = match self.get(id) {
            Some(n) => (n.parent, n.prev_sibling, n.next_sibling),
            None => return,
        };

        if prev.is_some() {
            if let Some(n) = self.get_mut(prev) {
                n.next_sibling = next;
            }
        }
        if next.is_some() {
            if let Some(n) = self.get_mut(next) {
                n.prev_sibling = prev;
            }
        }
        if let Some(p) = self.get_mut(parent) {
            if p.first_child == id {
                p.first_child = next;
            }
            if p.last_child == id {
                p.last_child = prev;
            }
        }
        if let Some(n) = self.get_mut(id) {
            n.parent = NodeId::NONE;
            n.prev_sibling = NodeId::NONE;
            n.next_sibling = NodeId::NONE;
        }
    }

    pub fn element_name(&self, id: NodeId) -> Option<&str> {
        match self.data(id) {
            Some(NodeData::Element { name, .. }) => Some(name.as_str()),
            _ => None,
        }
    }

    pub fn is_element(&self, id: NodeId, name: &str) -> bool {
        self.element_name(id) == Some(name)
    }

    /// Heading level for `<h1>`..`<h6>` elements.
    pub fn heading_level(&self, id: NodeId) -> Option<u8> {
        match self.element_name(id) {
            Some("h1") => Some(1),
            Some("h2") => Some(2),
            Some("h3") => Some(3),
            Some("h4") => Some(4),
            Some("h5") => Some(5),
            Some("h6") => Some(6),
            _ => None,
        }
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        match self.data(id) {
            Some(NodeData::Element { attrs, .. }) => attrs
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.as_str()),
            _ => None,
        }
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        if let Some(node) = self.get_mut(id) {
            if let NodeData::Element { attrs, .. } = &mut node.data {
                if let Some(pair) = attrs.iter_mut().find(|(k, _)| k == name) {
                    pair.1 = value.to_string();
                } else {
                    attrs.push((name.to_string(), value.to_string()));
                }
            }
        }
    }

    pub fn element_attrs(&self, id: NodeId) -> Vec<(String, String)> {
        match self.data(id) {
            Some(NodeData::Element { attrs, .. }) => attrs.clone(),
            _ => Vec::new(),
        }
    }

    /// True when the class attribute contains `class` as a whole field.
    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.attr(id, "class")
            .map(|v| v.split_whitespace().any(|c| c == class))
            .unwrap_or(false)
    }

    /// Whitespace-only text nodes and comments contribute no content.
    pub fn is_blank(&self, id: NodeId) -> bool {
        match self.data(id) {
            Some(NodeData::Comment(_)) => true,
            Some(NodeData::Text(t)) => t.chars().all(char::is_whitespace),
            _ => false,
        }
    }

    /// First direct child element with the given tag name.
    pub fn find_child(&self, parent: NodeId, name: &str) -> NodeId {
        let mut child = self.first_child(parent);
        while child.is_some() {
            if self.is_element(child, name) {
                return child;
            }
            child = self.next_sibling(child);
        }
        NodeId::NONE
    }

    /// Concatenated descendant text.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        match self.data(id) {
            Some(NodeData::Text(t)) => out.push_str(t),
            Some(NodeData::Element { .. }) => {
                let mut child = self.first_child(id);
                while child.is_some() {
                    self.collect_text(child, out);
                    child = self.next_sibling(child);
                }
            }
            _ => {}
        }
    }

    /// Serialize a subtree back to HTML text.
    pub fn serialize(&self, id: NodeId, out: &mut String) -> std::fmt::Result {
        match self.data(id) {
            Some(NodeData::Document) => self.serialize_children(id, out)?,
            Some(NodeData::Doctype(name)) => writeln!(out, "<!DOCTYPE {}>", name)?,
            Some(NodeData::Comment(text)) => write!(out, "<!--{}-->", text)?,
            Some(NodeData::Text(text)) => {
                let parent = self.parent(id);
                let raw = self
                    .element_name(parent)
                    .map(|n| RAW_TEXT_ELEMENTS.contains(&n))
                    .unwrap_or(false);
                if raw {
                    out.push_str(text);
                } else {
                    out.push_str(&escape(text.as_str()));
                }
            }
            Some(NodeData::Element { name, .. }) => {
                if VOID_ELEMENTS.contains(&name.as_str()) {
                    self.write_tag(id, out, true)?;
                } else {
                    self.write_tag(id, out, false)?;
                    self.serialize_children(id, out)?;
                    write!(out, "</{}>", name)?;
                }
            }
            None => {}
        }
        Ok(())
    }

    pub fn serialize_children(&self, id: NodeId, out: &mut String) -> std::fmt::Result {
        let mut child = self.first_child(id);
        while child.is_some() {
            self.serialize(child, out)?;
            child = self.next_sibling(child);
        }
        Ok(())
    }

    /// Write only the opening tag of an element.
    pub fn open_tag(&self, id: NodeId, out: &mut String) -> std::fmt::Result {
        self.write_tag(id, out, false)
    }

    fn write_tag(&self, id: NodeId, out: &mut String, self_close: bool) -> std::fmt::Result {
        if let Some(NodeData::Element { name, attrs }) = self.data(id) {
            write!(out, "<{}", name)?;
            for (k, v) in attrs {
                write!(out, " {}=\"{}\"", k, escape(v.as_str()))?;
            }
            if self_close {
                write!(out, "/>")?;
            } else {
                write!(out, ">")?;
            }
        }
        Ok(())
    }
}

impl Default for MarkupTree {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body_of(tree: &MarkupTree) -> NodeId {
        let html = tree.find_child(tree.root(), "html");
        tree.find_child(html, "body")
    }

    #[test]
    fn parse_builds_document_skeleton() {
        let tree = MarkupTree::parse("<html><head><title>T</title></head><body><p>x</p></body></html>");
        let html = tree.find_child(tree.root(), "html");
        assert!(html.is_some());
        assert!(tree.find_child(html, "head").is_some());
        assert!(tree.find_child(html, "body").is_some());
    }

    #[test]
    fn serialize_escapes_text_and_attributes() {
        let tree = MarkupTree::parse(r#"<html><body><p title="a&quot;b">x &amp; y</p></body></html>"#);
        let body = body_of(&tree);
        let mut out = String::new();
        tree.serialize(body, &mut out).unwrap();
        assert!(out.contains("x &amp; y"), "{out}");
        assert!(out.contains("a&quot;b"), "{out}");
    }

    #[test]
    fn void_elements_self_close() {
        let tree = MarkupTree::parse("<html><body><p>a<br>b</p><img src=\"i.png\"></body></html>");
        let body = body_of(&tree);
        let mut out = String::new();
        tree.serialize(body, &mut out).unwrap();
        assert!(out.contains("<br/>"), "{out}");
        assert!(out.contains("<img src=\"i.png\"/>"), "{out}");
        assert!(!out.contains("</img>"), "{out}");
    }

    #[test]
    fn detach_and_append_move_nodes() {
        let mut tree = MarkupTree::parse("<html><body><p>a</p><p>b</p><p>c</p></body></html>");
        let body = body_of(&tree);
        let first = tree.first_child(body);
        let second = tree.next_sibling(first);

        tree.detach(second);
        let target = tree.create_element("div", Vec::new());
        tree.append(target, second);

        let mut body_out = String::new();
        tree.serialize(body, &mut body_out).unwrap();
        assert!(body_out.contains("<p>a</p>"));
        assert!(body_out.contains("<p>c</p>"));
        assert!(!body_out.contains("<p>b</p>"));

        let mut div_out = String::new();
        tree.serialize(target, &mut div_out).unwrap();
        assert_eq!(div_out, "<div><p>b</p></div>");
    }

    #[test]
    fn class_and_attr_helpers() {
        let mut tree = MarkupTree::parse(r#"<html><body><div class="chapter wide" id="c1">t</div></body></html>"#);
        let body = body_of(&tree);
        let div = tree.find_child(body, "div");
        assert!(tree.has_class(div, "chapter"));
        assert!(tree.has_class(div, "wide"));
        assert!(!tree.has_class(div, "chap"));
        assert_eq!(tree.attr(div, "id"), Some("c1"));

        tree.set_attr(div, "id", "c2");
        assert_eq!(tree.attr(div, "id"), Some("c2"));
        tree.set_attr(div, "data-level", "3");
        assert_eq!(tree.attr(div, "data-level"), Some("3"));
    }

    #[test]
    fn text_content_concatenates_descendants() {
        let tree = MarkupTree::parse("<html><body><h1>Chapter <em>One</em></h1></body></html>");
        let body = body_of(&tree);
        let h1 = tree.find_child(body, "h1");
        assert_eq!(tree.text_content(h1), "Chapter One");
        assert_eq!(tree.heading_level(h1), Some(1));
    }

    #[test]
    fn blank_nodes_detected() {
        let tree = MarkupTree::parse("<html><body>  <!-- note --><p>x</p></body></html>");
        let body = body_of(&tree);
        let mut child = tree.first_child(body);
        let mut blanks = 0;
        let mut elements = 0;
        while child.is_some() {
            if tree.is_blank(child) {
                blanks += 1;
            } else {
                elements += 1;
            }
            child = tree.next_sibling(child);
        }
        assert!(blanks >= 1);
        assert_eq!(elements, 1);
    }
}
