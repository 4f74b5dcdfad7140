use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::core::{Attrs, Document, Marks, Node, Point, Selection, clamp_to_char_boundary};
use crate::error::{EditorError, PathError};

pub type Path = Vec<usize>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Op {
    InsertText {
        #[serde(default)]
        path: Path,
        offset: usize,
        text: String,
    },
    RemoveText {
        #[serde(default)]
        path: Path,
        range: Range<usize>,
    },
    InsertNode {
        #[serde(default)]
        path: Path,
        node: Node,
    },
    RemoveNode {
        #[serde(default)]
        path: Path,
    },
    /// Appends the text leaf at `path` to its left sibling leaf and removes it.
    MergeText {
        #[serde(default)]
        path: Path,
    },
    SetAttrs {
        #[serde(default)]
        path: Path,
        patch: AttrPatch,
    },
    SetMarks {
        #[serde(default)]
        path: Path,
        marks: Marks,
    },
    Retag {
        #[serde(default)]
        path: Path,
        tag: String,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttrPatch {
    #[serde(default)]
    pub set: Attrs,
    #[serde(default)]
    pub remove: Vec<String>,
}

impl AttrPatch {
    pub fn set(name: impl Into<String>, value: impl Into<String>) -> Self {
        let mut patch = AttrPatch::default();
        patch.set.insert(name.into(), value.into());
        patch
    }

    pub fn remove(name: impl Into<String>) -> Self {
        AttrPatch {
            set: Attrs::new(),
            remove: vec![name.into()],
        }
    }

    fn apply(&self, attrs: &mut Attrs) {
        for (k, v) in &self.set {
            attrs.insert(k.clone(), v.clone());
        }
        for key in &self.remove {
            attrs.remove(key);
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(default)]
    pub ops: Vec<Op>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection_after: Option<Selection>,
    #[serde(default)]
    pub meta: TransactionMeta,
}

impl Transaction {
    pub fn new(ops: Vec<Op>) -> Self {
        Self {
            ops,
            selection_after: None,
            meta: TransactionMeta::default(),
        }
    }

    pub fn selection_after(mut self, selection_after: Selection) -> Self {
        self.selection_after = Some(selection_after);
        self
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.meta.source = Some(source.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty() && self.selection_after.is_none()
    }
}

pub(crate) fn apply_op_to(
    doc: &mut Document,
    selection: &mut Option<Selection>,
    op: Op,
) -> Result<(), EditorError> {
    match op {
        Op::InsertText { path, offset, text } => {
            let text_node = text_mut(doc, &path)?;
            let offset = clamp_to_char_boundary(&text_node.text, offset);
            text_node.text.insert_str(offset, &text);
            for_each_point(selection, |point| {
                if point.path == path && point.offset >= offset {
                    point.offset += text.len();
                }
            });
        }
        Op::RemoveText { path, range } => {
            let text_node = text_mut(doc, &path)?;
            let start = clamp_to_char_boundary(&text_node.text, range.start);
            let end = clamp_to_char_boundary(&text_node.text, range.end);
            if start >= end {
                return Ok(());
            }
            text_node.text.replace_range(start..end, "");
            let removed_len = end - start;
            for_each_point(selection, |point| {
                if point.path != path || point.offset <= start {
                    return;
                }
                if point.offset >= end {
                    point.offset -= removed_len;
                } else {
                    point.offset = start;
                }
            });
        }
        Op::InsertNode { path, node } => {
            doc.insert_node(&path, node)?;
            transform_insert_node(selection, &path);
        }
        Op::RemoveNode { path } => {
            doc.remove_node(&path)?;
            transform_remove_node(selection, &path);
        }
        Op::MergeText { path } => {
            let (index, parent_path) = path
                .split_last()
                .ok_or_else(|| PathError("Empty merge path".into()))?;
            let left_index = index
                .checked_sub(1)
                .ok_or_else(|| PathError("Merge target has no left sibling".into()))?;
            let mut left_path = parent_path.to_vec();
            left_path.push(left_index);

            let right = match doc.node(&path) {
                Some(Node::Text(t)) => t.text.clone(),
                _ => return Err(PathError("Merge source is not a text leaf".into()).into()),
            };
            let left = text_mut(doc, &left_path)?;
            let prefix = left.text.len();
            left.text.push_str(&right);
            doc.remove_node(&path)?;

            let depth = parent_path.len();
            for_each_point(selection, |point| {
                if point.path == path {
                    point.path = left_path.clone();
                    point.offset += prefix;
                    return;
                }
                // The gap between the two leaves becomes the join inside the left one.
                if point.path == parent_path && point.offset == *index {
                    *point = Point::new(left_path.clone(), prefix);
                    return;
                }
                shift_after_removal(point, parent_path, depth, *index);
            });
        }
        Op::SetAttrs { path, patch } => {
            let el = doc
                .node_mut(&path)?
                .as_element_mut()
                .ok_or_else(|| PathError("Text has no attrs".into()))?;
            patch.apply(&mut el.attrs);
        }
        Op::SetMarks { path, marks } => {
            text_mut(doc, &path)?.marks = marks;
        }
        Op::Retag { path, tag } => {
            let el = doc
                .node_mut(&path)?
                .as_element_mut()
                .ok_or_else(|| PathError("Text has no tag".into()))?;
            el.tag = tag;
        }
    }
    Ok(())
}

fn text_mut<'a>(
    doc: &'a mut Document,
    path: &[usize],
) -> Result<&'a mut crate::core::TextNode, PathError> {
    match doc.node_mut(path)? {
        Node::Text(t) => Ok(t),
        Node::Element(_) => Err(PathError("Expected text node".into())),
    }
}

fn for_each_point(selection: &mut Option<Selection>, mut f: impl FnMut(&mut Point)) {
    if let Some(selection) = selection.as_mut() {
        f(&mut selection.anchor);
        f(&mut selection.focus);
    }
}

fn transform_insert_node(selection: &mut Option<Selection>, path: &[usize]) {
    let Some((&index, parent_path)) = path.split_last() else {
        return;
    };
    let depth = parent_path.len();
    for_each_point(selection, |point| {
        if point.path == parent_path {
            if point.offset > index {
                point.offset += 1;
            }
            return;
        }
        if point.path.len() > depth && point.path.starts_with(parent_path) {
            if point.path[depth] >= index {
                point.path[depth] += 1;
            }
        }
    });
}

fn transform_remove_node(selection: &mut Option<Selection>, path: &[usize]) {
    let Some((&index, parent_path)) = path.split_last() else {
        return;
    };
    let depth = parent_path.len();
    for_each_point(selection, |point| {
        if point.path.len() > depth
            && point.path.starts_with(parent_path)
            && point.path[depth] == index
        {
            // Inside the removed subtree: collapse onto the gap it left.
            point.path.truncate(depth);
            point.offset = index;
            return;
        }
        shift_after_removal(point, parent_path, depth, index);
    });
}

fn shift_after_removal(point: &mut Point, parent_path: &[usize], depth: usize, index: usize) {
    if point.path == parent_path {
        if point.offset > index {
            point.offset -= 1;
        }
        return;
    }
    if point.path.len() > depth && point.path.starts_with(parent_path) && point.path[depth] > index
    {
        point.path[depth] -= 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc() -> Document {
        Document::new(vec![Node::element(
            "p",
            vec![Node::text("ab"), Node::text(""), Node::text("cd")],
        )])
    }

    #[test]
    fn merge_text_maps_points_into_left_leaf() {
        let mut doc = doc();
        let mut selection = Some(Selection::collapsed(Point::new(vec![0, 2], 1)));
        apply_op_to(&mut doc, &mut selection, Op::MergeText { path: vec![0, 2] }).unwrap();
        apply_op_to(&mut doc, &mut selection, Op::MergeText { path: vec![0, 1] }).unwrap();
        assert_eq!(doc.children[0].text_content(), "abcd");
        assert_eq!(selection.unwrap().focus, Point::new(vec![0, 0], 3));
    }

    #[test]
    fn merge_text_maps_the_boundary_between_leaves_to_the_join() {
        let mut doc = Document::new(vec![Node::element(
            "p",
            vec![Node::text("hello "), Node::text(" z")],
        )]);
        let mut selection = Some(Selection::new(
            Point::new(vec![0], 1),
            Point::new(vec![0], 2),
        ));
        apply_op_to(&mut doc, &mut selection, Op::MergeText { path: vec![0, 1] }).unwrap();
        let selection = selection.unwrap();
        assert_eq!(selection.anchor, Point::new(vec![0, 0], 6));
        assert_eq!(selection.focus, Point::new(vec![0], 1));
    }

    #[test]
    fn removing_an_ancestor_collapses_onto_the_gap() {
        let mut doc = doc();
        let mut selection = Some(Selection::collapsed(Point::new(vec![0, 0], 1)));
        apply_op_to(&mut doc, &mut selection, Op::RemoveNode { path: vec![0] }).unwrap();
        assert_eq!(selection.unwrap().focus, Point::new(vec![], 0));
    }

    #[test]
    fn insert_before_element_offset_shifts_container_points() {
        let mut doc = doc();
        let mut selection = Some(Selection::collapsed(Point::new(vec![0], 2)));
        apply_op_to(
            &mut doc,
            &mut selection,
            Op::InsertNode {
                path: vec![0, 0],
                node: Node::line_break(),
            },
        )
        .unwrap();
        assert_eq!(selection.unwrap().focus, Point::new(vec![0], 3));
    }
}
