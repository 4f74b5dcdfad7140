use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::PathError;
use crate::ops::Path;

pub type Attrs = BTreeMap<String, String>;

pub const NBSP: char = '\u{a0}';

const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

const BLOCK_TAGS: &[&str] = &[
    "address",
    "article",
    "aside",
    "blockquote",
    "dd",
    "div",
    "dl",
    "dt",
    "figcaption",
    "figure",
    "footer",
    "form",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "header",
    "hr",
    "li",
    "main",
    "nav",
    "ol",
    "p",
    "pre",
    "section",
    "table",
    "tbody",
    "td",
    "tfoot",
    "th",
    "thead",
    "tr",
    "ul",
];

/// Elements whose children are laid out as blocks and may hold both blocks
/// and loose inline content.
const FLOW_CONTAINER_TAGS: &[&str] = &[
    "article",
    "aside",
    "blockquote",
    "dd",
    "div",
    "figure",
    "li",
    "section",
    "td",
    "th",
];

pub fn is_void_tag(tag: &str) -> bool {
    VOID_TAGS.contains(&tag)
}

pub fn is_block_tag(tag: &str) -> bool {
    BLOCK_TAGS.contains(&tag)
}

pub fn is_list_tag(tag: &str) -> bool {
    matches!(tag, "ol" | "ul")
}

pub fn is_heading_tag(tag: &str) -> bool {
    matches!(tag, "h1" | "h2" | "h3" | "h4" | "h5" | "h6")
}

/// Blocks that hold inline content directly and split in two on Enter.
pub fn is_text_block_tag(tag: &str) -> bool {
    matches!(tag, "p" | "pre") || is_heading_tag(tag)
}

pub fn is_flow_container_tag(tag: &str) -> bool {
    FLOW_CONTAINER_TAGS.contains(&tag)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Document {
    #[serde(default)]
    pub children: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum Node {
    Element(ElementNode),
    Text(TextNode),
}

impl Node {
    pub fn text(text: impl Into<String>) -> Self {
        Node::Text(TextNode {
            text: text.into(),
            marks: Marks::default(),
        })
    }

    pub fn styled_text(text: impl Into<String>, marks: Marks) -> Self {
        Node::Text(TextNode {
            text: text.into(),
            marks,
        })
    }

    pub fn element(tag: impl Into<String>, children: Vec<Node>) -> Self {
        Node::Element(ElementNode::new(tag).with_children(children))
    }

    pub fn paragraph(text: impl Into<String>) -> Self {
        Node::element("p", vec![Node::text(text)])
    }

    /// `<p><br></p>`, the caret-holding paragraph left behind when a list goes away.
    pub fn placeholder_paragraph() -> Self {
        Node::element("p", vec![Node::line_break()])
    }

    pub fn line_break() -> Self {
        Node::element("br", Vec::new())
    }

    pub fn as_element(&self) -> Option<&ElementNode> {
        match self {
            Node::Element(el) => Some(el),
            Node::Text(_) => None,
        }
    }

    pub fn as_element_mut(&mut self) -> Option<&mut ElementNode> {
        match self {
            Node::Element(el) => Some(el),
            Node::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&TextNode> {
        match self {
            Node::Text(t) => Some(t),
            Node::Element(_) => None,
        }
    }

    pub fn is_tag(&self, tag: &str) -> bool {
        matches!(self, Node::Element(el) if el.tag == tag)
    }

    pub fn is_block(&self) -> bool {
        matches!(self, Node::Element(el) if is_block_tag(&el.tag))
    }

    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match self {
            Node::Text(t) => out.push_str(&t.text),
            Node::Element(el) => {
                for child in &el.children {
                    child.collect_text(out);
                }
            }
        }
    }

    /// Whether the node renders anything besides line breaks.
    pub fn has_content(&self) -> bool {
        match self {
            Node::Text(t) => !t.text.is_empty(),
            Node::Element(el) => {
                if is_void_tag(&el.tag) {
                    return el.tag != "br";
                }
                if matches!(el.tag.as_str(), "table" | "iframe" | "video" | "audio") {
                    return true;
                }
                el.children.iter().any(Node::has_content)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementNode {
    pub tag: String,
    #[serde(default)]
    pub attrs: Attrs,
    #[serde(default)]
    pub children: Vec<Node>,
}

impl ElementNode {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attrs: Attrs::default(),
            children: Vec::new(),
        }
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    pub fn with_children(mut self, children: Vec<Node>) -> Self {
        self.children = children;
        self
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attr("class").unwrap_or("").split_ascii_whitespace()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes().any(|c| c == class)
    }

    pub fn add_class(&mut self, class: &str) {
        if self.has_class(class) {
            return;
        }
        let next = match self.attr("class") {
            Some(existing) if !existing.trim().is_empty() => format!("{} {class}", existing.trim()),
            _ => class.to_string(),
        };
        self.attrs.insert("class".to_string(), next);
    }

    pub fn remove_class(&mut self, class: &str) {
        let next: Vec<&str> = self.classes().filter(|c| *c != class).collect();
        if next.is_empty() {
            self.attrs.remove("class");
        } else {
            let joined = next.join(" ");
            self.attrs.insert("class".to_string(), joined);
        }
    }

    pub fn element_children(&self) -> impl Iterator<Item = (usize, &ElementNode)> {
        self.children
            .iter()
            .enumerate()
            .filter_map(|(ix, n)| n.as_element().map(|el| (ix, el)))
    }

    pub fn text_content(&self) -> String {
        self.children.iter().map(Node::text_content).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextNode {
    pub text: String,
    #[serde(default)]
    pub marks: Marks,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Marks {
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub italic: bool,
    #[serde(default)]
    pub underline: bool,
    #[serde(default)]
    pub strikethrough: bool,
}

impl Marks {
    pub fn is_plain(&self) -> bool {
        *self == Marks::default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    #[serde(default)]
    pub path: Path,
    pub offset: usize,
}

impl Point {
    pub fn new(path: Path, offset: usize) -> Self {
        Self { path, offset }
    }
}

/// Orders two boundary points the way DOM ranges do.
pub fn compare_points(a: &Point, b: &Point) -> Ordering {
    if a.path == b.path {
        return a.offset.cmp(&b.offset);
    }
    if b.path.starts_with(&a.path) {
        let child = b.path[a.path.len()];
        return if a.offset <= child {
            Ordering::Less
        } else {
            Ordering::Greater
        };
    }
    if a.path.starts_with(&b.path) {
        return compare_points(b, a).reverse();
    }
    a.path.cmp(&b.path)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub anchor: Point,
    pub focus: Point,
}

impl Selection {
    pub fn new(anchor: Point, focus: Point) -> Self {
        Self { anchor, focus }
    }

    pub fn collapsed(point: Point) -> Self {
        Self {
            anchor: point.clone(),
            focus: point,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }

    /// Start and end in document order.
    pub fn ordered(&self) -> (Point, Point) {
        if compare_points(&self.anchor, &self.focus) == Ordering::Greater {
            (self.focus.clone(), self.anchor.clone())
        } else {
            (self.anchor.clone(), self.focus.clone())
        }
    }

    /// Deepest path that contains both ends.
    pub fn common_ancestor(&self) -> Path {
        self.anchor
            .path
            .iter()
            .zip(self.focus.path.iter())
            .take_while(|(a, b)| a == b)
            .map(|(a, _)| *a)
            .collect()
    }
}

impl Document {
    pub fn new(children: Vec<Node>) -> Self {
        Self { children }
    }

    pub fn node(&self, path: &[usize]) -> Option<&Node> {
        let (first, rest) = path.split_first()?;
        let mut node = self.children.get(*first)?;
        for &ix in rest {
            node = match node {
                Node::Element(el) => el.children.get(ix)?,
                Node::Text(_) => return None,
            };
        }
        Some(node)
    }

    pub fn node_mut(&mut self, path: &[usize]) -> Result<&mut Node, PathError> {
        let (first, rest) = path
            .split_first()
            .ok_or_else(|| PathError("Empty path".into()))?;
        let len = self.children.len();
        let mut node = self
            .children
            .get_mut(*first)
            .ok_or_else(|| PathError(format!("Path out of bounds at depth 0: {first} >= {len}")))?;
        for (depth, &ix) in rest.iter().enumerate() {
            node = match node {
                Node::Element(el) => {
                    let len = el.children.len();
                    el.children.get_mut(ix).ok_or_else(|| {
                        PathError(format!(
                            "Path out of bounds at depth {}: {ix} >= {len}",
                            depth + 1
                        ))
                    })?
                }
                Node::Text(_) => {
                    return Err(PathError(format!("Text node at depth {depth} has no children")));
                }
            };
        }
        Ok(node)
    }

    pub fn element(&self, path: &[usize]) -> Option<&ElementNode> {
        self.node(path).and_then(Node::as_element)
    }

    pub fn text(&self, path: &[usize]) -> Option<&TextNode> {
        self.node(path).and_then(Node::as_text)
    }

    /// Children of the node at `parent_path`; the empty path is the region root.
    pub fn children_at(&self, parent_path: &[usize]) -> Option<&[Node]> {
        if parent_path.is_empty() {
            return Some(&self.children);
        }
        match self.node(parent_path)? {
            Node::Element(el) => Some(&el.children),
            Node::Text(_) => None,
        }
    }

    pub fn children_at_mut(&mut self, parent_path: &[usize]) -> Result<&mut Vec<Node>, PathError> {
        if parent_path.is_empty() {
            return Ok(&mut self.children);
        }
        match self.node_mut(parent_path)? {
            Node::Element(el) => Ok(&mut el.children),
            Node::Text(_) => Err(PathError("Text node has no children".into())),
        }
    }

    /// Tag of the node at `path`, with the root reported as `None`.
    pub fn tag_at(&self, path: &[usize]) -> Option<&str> {
        self.element(path).map(|el| el.tag.as_str())
    }

    pub fn text_content(&self) -> String {
        self.children.iter().map(Node::text_content).collect()
    }

    pub fn is_valid_point(&self, point: &Point) -> bool {
        if point.path.is_empty() {
            return point.offset <= self.children.len();
        }
        match self.node(&point.path) {
            Some(Node::Text(t)) => point.offset <= t.text.len() && t.text.is_char_boundary(point.offset),
            Some(Node::Element(el)) => point.offset <= el.children.len(),
            None => false,
        }
    }

    pub(crate) fn insert_node(&mut self, path: &[usize], node: Node) -> Result<(), PathError> {
        let (index, parent_path) = path
            .split_last()
            .ok_or_else(|| PathError("Empty insert path".into()))?;
        let children = self.children_at_mut(parent_path)?;
        if *index > children.len() {
            return Err(PathError(format!(
                "Insert index out of bounds: {index} > {}",
                children.len()
            )));
        }
        children.insert(*index, node);
        Ok(())
    }

    pub(crate) fn remove_node(&mut self, path: &[usize]) -> Result<Node, PathError> {
        let (index, parent_path) = path
            .split_last()
            .ok_or_else(|| PathError("Empty remove path".into()))?;
        let children = self.children_at_mut(parent_path)?;
        if *index >= children.len() {
            return Err(PathError(format!(
                "Remove index out of bounds: {index} >= {}",
                children.len()
            )));
        }
        Ok(children.remove(*index))
    }
}

pub(crate) fn clamp_to_char_boundary(s: &str, mut ix: usize) -> usize {
    ix = ix.min(s.len());
    while ix > 0 && !s.is_char_boundary(ix) {
        ix -= 1;
    }
    ix
}

pub(crate) fn child_path(parent: &[usize], index: usize) -> Path {
    let mut path = parent.to_vec();
    path.push(index);
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compare_points_handles_ancestor_containers() {
        let inside = Point::new(vec![1, 0], 3);
        let before = Point::new(vec![], 1);
        let after = Point::new(vec![], 2);
        assert_eq!(compare_points(&before, &inside), Ordering::Less);
        assert_eq!(compare_points(&after, &inside), Ordering::Greater);
        assert_eq!(compare_points(&inside, &after), Ordering::Less);
        assert_eq!(
            compare_points(&Point::new(vec![0, 2], 0), &Point::new(vec![1], 0)),
            Ordering::Less
        );
    }

    #[test]
    fn class_helpers_keep_other_classes() {
        let mut el = ElementNode::new("div").with_attr("class", "image-caption editable-caption");
        el.remove_class("editable-caption");
        el.add_class("static-caption");
        assert_eq!(el.attr("class"), Some("image-caption static-caption"));
        assert!(el.has_class("image-caption"));
    }
}
