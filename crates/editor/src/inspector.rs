use serde::{Deserialize, Serialize};

use crate::config::FontSizeLabel;
use crate::core::{
    Document, ElementNode, Node, Point, Selection, child_path, is_heading_tag, is_text_block_tag,
};
use crate::edit;
use crate::ops::Path;
use crate::region::EditableRegion;
use crate::style;

/// Walks from `start` toward the root and returns the first element that
/// satisfies `predicate`. The walk stops before `boundary` and never looks at
/// anything outside it.
pub fn closest_ancestor_within(
    doc: &Document,
    start: &[usize],
    boundary: &[usize],
    predicate: impl Fn(&ElementNode) -> bool,
) -> Option<Path> {
    if !start.starts_with(boundary) {
        return None;
    }
    let mut path = start.to_vec();
    while path.len() > boundary.len() {
        if let Some(el) = doc.element(&path) {
            if predicate(el) {
                return Some(path);
            }
        }
        path.pop();
    }
    None
}

/// [`closest_ancestor_within`] bounded by the region root.
pub fn closest_ancestor_matching(
    doc: &Document,
    start: &[usize],
    predicate: impl Fn(&ElementNode) -> bool,
) -> Option<Path> {
    closest_ancestor_within(doc, start, &[], predicate)
}

/// The node a range starting at `point` begins with.
fn node_after(doc: &Document, point: &Point) -> Path {
    match doc.children_at(&point.path) {
        Some(children) if point.offset < children.len() => {
            child_path(&point.path, point.offset)
        }
        _ => point.path.clone(),
    }
}

/// The node a range ending at `point` finishes with.
fn node_before(doc: &Document, point: &Point) -> Path {
    match (doc.children_at(&point.path), point.offset.checked_sub(1)) {
        (Some(children), Some(ix)) if ix < children.len() => {
            child_path(&point.path, ix)
        }
        _ => point.path.clone(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockType {
    Paragraph,
    Heading(u8),
    Blockquote,
}

impl BlockType {
    /// Value as understood by `formatBlock`.
    pub fn command_value(self) -> String {
        match self {
            BlockType::Paragraph => "p".to_string(),
            BlockType::Heading(level) => format!("h{level}"),
            BlockType::Blockquote => "blockquote".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkData {
    pub path: Path,
    pub url: String,
    pub text: String,
}

/// Structural questions about the region at its current selection.
pub struct SelectionInspector<'a> {
    region: &'a EditableRegion,
    selection: Option<Selection>,
    base_font_px: f32,
}

impl<'a> SelectionInspector<'a> {
    pub fn new(region: &'a EditableRegion) -> Self {
        Self {
            region,
            selection: region.live_selection(),
            base_font_px: 16.0,
        }
    }

    pub fn base_font_px(mut self, base_font_px: f32) -> Self {
        self.base_font_px = base_font_px;
        self
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    fn doc(&self) -> &Document {
        self.region.doc()
    }

    fn common_ancestor(&self) -> Option<Path> {
        self.selection.as_ref().map(Selection::common_ancestor)
    }

    fn start(&self) -> Option<Point> {
        self.selection.as_ref().map(|sel| sel.ordered().0)
    }

    fn closest_from_common(&self, predicate: impl Fn(&ElementNode) -> bool) -> Option<Path> {
        let start = self.common_ancestor()?;
        closest_ancestor_matching(self.doc(), &start, predicate)
    }

    pub fn closest_list_item(&self) -> Option<Path> {
        self.closest_from_common(|el| el.tag == "li")
    }

    /// A range whose ends both sit in one blockquote counts as quoted even
    /// when its boundary points are anchored above it (select all).
    pub fn closest_blockquote(&self) -> Option<Path> {
        let is_quote = |el: &ElementNode| el.tag == "blockquote";
        self.closest_from_common(is_quote).or_else(|| {
            let (start, end) = self.selection.as_ref()?.ordered();
            let doc = self.doc();
            let first = closest_ancestor_matching(doc, &node_after(doc, &start), is_quote)?;
            let last = closest_ancestor_matching(doc, &node_before(doc, &end), is_quote)?;
            (first == last).then_some(first)
        })
    }

    pub fn closest_block(&self) -> Option<Path> {
        self.closest_from_common(|el| crate::core::is_block_tag(&el.tag))
    }

    pub fn closest_text_block(&self) -> Option<Path> {
        self.closest_from_common(|el| is_text_block_tag(&el.tag))
    }

    pub fn closest_link(&self) -> Option<Path> {
        let start = self.start()?;
        closest_ancestor_matching(self.doc(), &start.path, |el| el.tag == "a")
    }

    pub fn block_type(&self) -> Option<BlockType> {
        self.selection.as_ref()?;
        if let Some(path) = self.closest_text_block() {
            if let Some(el) = self.doc().element(&path) {
                if is_heading_tag(&el.tag) {
                    let level = el.tag[1..].parse().unwrap_or(1);
                    return Some(BlockType::Heading(level));
                }
            }
        }
        if self.closest_blockquote().is_some() {
            return Some(BlockType::Blockquote);
        }
        Some(BlockType::Paragraph)
    }

    /// Resolves the font-size dropdown label for the current position.
    pub fn current_font_size_label(&self, last_known: FontSizeLabel) -> FontSizeLabel {
        let Some(selection) = self.selection.as_ref() else {
            return last_known;
        };
        let doc = self.doc();
        let (start, _) = selection.ordered();
        let start_is_text = matches!(doc.node(&start.path), Some(Node::Text(_)));
        let start_element: &[usize] = if start_is_text {
            &start.path[..start.path.len() - 1]
        } else {
            &start.path
        };

        // Explicit sizes on the ancestor chain.
        let mut path = start_element.to_vec();
        while !path.is_empty() {
            if let Some(el) = doc.element(&path) {
                if el.tag == "font" {
                    if let Some(size) = el.attr("size").and_then(style::parse_legacy_size) {
                        return FontSizeLabel::from_legacy_size(size);
                    }
                }
                if let Some(px) = style::style_property(el, "font-size")
                    .and_then(|value| style::absolute_font_size_px(&value, self.base_font_px))
                {
                    return FontSizeLabel::from_px(px);
                }
            }
            path.pop();
        }

        if selection.is_collapsed() {
            if let Some(px) = self.preceding_context_px(&start, start_is_text) {
                return FontSizeLabel::from_px(px);
            }
        }

        let anchor = &selection.anchor.path;
        if !anchor.is_empty() {
            let parent = &anchor[..anchor.len() - 1];
            let px = style::computed_font_size_px(doc, parent, self.base_font_px);
            return FontSizeLabel::from_px(px);
        }

        last_known
    }

    /// Computed size of what sits right before a collapsed caret.
    fn preceding_context_px(&self, caret: &Point, in_text: bool) -> Option<f32> {
        let doc = self.doc();
        if in_text {
            let (&ix, parent) = caret.path.split_last()?;
            if caret.offset > 0 {
                return Some(style::computed_font_size_px(doc, parent, self.base_font_px));
            }
            let siblings = doc.children_at(parent)?;
            for sibling_ix in (0..ix).rev() {
                match &siblings[sibling_ix] {
                    Node::Text(t) if !t.text.trim().is_empty() => {
                        return Some(style::computed_font_size_px(doc, parent, self.base_font_px));
                    }
                    Node::Element(_) => {
                        let mut path = parent.to_vec();
                        path.push(sibling_ix);
                        return Some(style::computed_font_size_px(doc, &path, self.base_font_px));
                    }
                    Node::Text(_) => {}
                }
            }
            return None;
        }
        let children = doc.children_at(&caret.path)?;
        let before = caret.offset.checked_sub(1)?;
        match children.get(before)? {
            Node::Text(t) if !t.text.trim().is_empty() => Some(style::computed_font_size_px(
                doc,
                &caret.path,
                self.base_font_px,
            )),
            Node::Element(_) => {
                let mut path = caret.path.clone();
                path.push(before);
                Some(style::computed_font_size_px(doc, &path, self.base_font_px))
            }
            Node::Text(_) => None,
        }
    }

    /// Link under the caret, or the single link a range selection touches.
    pub fn selected_link(&self) -> Option<LinkData> {
        let selection = self.selection.as_ref()?;
        let doc = self.doc();
        let path = if selection.is_collapsed() {
            self.closest_link()?
        } else if let Some(path) = self.closest_from_common(|el| el.tag == "a") {
            path
        } else {
            let (start, end) = edit::selection_text_range(doc, selection)?;
            let mut links: Vec<Path> = Vec::new();
            for (leaf, _) in edit::leaves_in_range(doc, start, end) {
                if let Some(link) = closest_ancestor_matching(doc, &leaf.path, |el| el.tag == "a")
                {
                    if !links.contains(&link) {
                        links.push(link);
                    }
                }
            }
            if links.len() != 1 {
                return None;
            }
            links.pop()?
        };
        let el = doc.element(&path)?;
        Some(LinkData {
            url: el.attr("href").unwrap_or_default().to_string(),
            text: el.text_content(),
            path,
        })
    }
}
