use std::cmp::Ordering;

use crate::core::{
    Document, ElementNode, Marks, Node, Point, Selection, TextNode, child_path, compare_points,
    is_flow_container_tag,
};
use crate::ops::{Op, Path};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextLeaf {
    pub path: Path,
    /// Offset of the leaf's first byte in the concatenated document text.
    pub start: usize,
    pub len: usize,
}

impl TextLeaf {
    pub fn end(&self) -> usize {
        self.start + self.len
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bias {
    Forward,
    Backward,
}

pub fn text_leaves(doc: &Document) -> Vec<TextLeaf> {
    fn walk(children: &[Node], path: &mut Vec<usize>, acc: &mut usize, out: &mut Vec<TextLeaf>) {
        for (ix, node) in children.iter().enumerate() {
            path.push(ix);
            match node {
                Node::Text(t) => {
                    out.push(TextLeaf {
                        path: path.clone(),
                        start: *acc,
                        len: t.text.len(),
                    });
                    *acc += t.text.len();
                }
                Node::Element(el) => walk(&el.children, path, acc, out),
            }
            path.pop();
        }
    }

    let mut out = Vec::new();
    walk(&doc.children, &mut Vec::new(), &mut 0, &mut out);
    out
}

pub fn text_leaves_under(doc: &Document, root: &[usize]) -> Vec<TextLeaf> {
    text_leaves(doc)
        .into_iter()
        .filter(|leaf| leaf.path.starts_with(root))
        .collect()
}

pub fn global_offset(doc: &Document, leaves: &[TextLeaf], point: &Point) -> Option<usize> {
    if let Some(Node::Text(_)) = doc.node(&point.path) {
        let leaf = leaves.iter().find(|leaf| leaf.path == point.path)?;
        return Some(leaf.start + point.offset.min(leaf.len));
    }
    if !doc.is_valid_point(point) {
        return None;
    }
    let boundary = child_path(&point.path, point.offset);
    Some(
        leaves
            .iter()
            .filter(|leaf| leaf.path < boundary)
            .map(|leaf| leaf.len)
            .sum(),
    )
}

pub fn point_at_global(leaves: &[TextLeaf], offset: usize, bias: Bias) -> Option<Point> {
    let candidate = match bias {
        Bias::Forward => leaves
            .iter()
            .find(|leaf| leaf.len > 0 && offset >= leaf.start && offset < leaf.end())
            .or_else(|| leaves.iter().rev().find(|leaf| leaf.end() == offset)),
        Bias::Backward => leaves
            .iter()
            .find(|leaf| leaf.len > 0 && offset > leaf.start && offset <= leaf.end())
            .or_else(|| leaves.iter().find(|leaf| leaf.start == offset)),
    };
    let leaf = candidate.or_else(|| leaves.last())?;
    Some(Point::new(
        leaf.path.clone(),
        offset.clamp(leaf.start, leaf.end()) - leaf.start,
    ))
}

/// The selection as a half-open range over the concatenated document text.
pub fn selection_text_range(doc: &Document, selection: &Selection) -> Option<(usize, usize)> {
    let leaves = text_leaves(doc);
    let (start, end) = selection.ordered();
    let start = global_offset(doc, &leaves, &start)?;
    let end = global_offset(doc, &leaves, &end)?;
    Some((start.min(end), start.max(end)))
}

pub fn selection_for_text_range(doc: &Document, start: usize, end: usize) -> Option<Selection> {
    let leaves = text_leaves(doc);
    if start == end {
        return point_at_global(&leaves, start, Bias::Backward).map(Selection::collapsed);
    }
    let anchor = point_at_global(&leaves, start, Bias::Forward)?;
    let focus = point_at_global(&leaves, end, Bias::Backward)?;
    Some(Selection::new(anchor, focus))
}

pub fn selected_text(doc: &Document, selection: &Selection) -> String {
    let Some((start, end)) = selection_text_range(doc, selection) else {
        return String::new();
    };
    let mut out = String::new();
    for leaf in text_leaves(doc) {
        let (s, e) = (start.max(leaf.start), end.min(leaf.end()));
        if s >= e {
            continue;
        }
        if let Some(t) = doc.text(&leaf.path) {
            out.push_str(&t.text[s - leaf.start..e - leaf.start]);
        }
    }
    out
}

/// Leaves that overlap `[start, end)` by at least one byte, with the local range.
pub fn leaves_in_range(
    doc: &Document,
    start: usize,
    end: usize,
) -> Vec<(TextLeaf, std::ops::Range<usize>)> {
    text_leaves(doc)
        .into_iter()
        .filter_map(|leaf| {
            let s = start.max(leaf.start);
            let e = end.min(leaf.end());
            if s >= e {
                return None;
            }
            let local = (s - leaf.start)..(e - leaf.start);
            Some((leaf, local))
        })
        .filter(|(leaf, local)| {
            doc.text(&leaf.path)
                .is_some_and(|t| t.text.is_char_boundary(local.start) && t.text.is_char_boundary(local.end))
        })
        .collect()
}

pub fn all_text_has_mark(
    doc: &Document,
    start: usize,
    end: usize,
    get: impl Fn(&Marks) -> bool,
) -> bool {
    let leaves = leaves_in_range(doc, start, end);
    !leaves.is_empty()
        && leaves
            .iter()
            .all(|(leaf, _)| doc.text(&leaf.path).is_some_and(|t| get(&t.marks)))
}

/// Splits leaves at the range edges and rewrites each covered piece's marks.
pub fn apply_marks_in_range(
    doc: &Document,
    start: usize,
    end: usize,
    apply: &dyn Fn(&Marks) -> Marks,
) -> Vec<Op> {
    let mut ops = Vec::new();
    for (leaf, local) in leaves_in_range(doc, start, end).into_iter().rev() {
        let Some(text) = doc.text(&leaf.path) else {
            continue;
        };
        let next = apply(&text.marks);
        if next == text.marks {
            continue;
        }
        if local.start == 0 && local.end == text.text.len() {
            ops.push(Op::SetMarks {
                path: leaf.path.clone(),
                marks: next,
            });
            continue;
        }
        ops.extend(replace_leaf_piece(&leaf.path, text, local, |middle| {
            Node::styled_text(middle, next.clone())
        }));
    }
    ops
}

/// Replaces the `local` slice of a leaf with `wrap(slice)`, keeping the rest
/// as separate leaves with the original marks.
pub(crate) fn replace_leaf_piece(
    path: &[usize],
    text: &TextNode,
    local: std::ops::Range<usize>,
    wrap: impl FnOnce(String) -> Node,
) -> Vec<Op> {
    let Some((&index, parent)) = path.split_last() else {
        return Vec::new();
    };
    let mut pieces = Vec::new();
    if local.start > 0 {
        pieces.push(Node::styled_text(&text.text[..local.start], text.marks.clone()));
    }
    pieces.push(wrap(text.text[local.clone()].to_string()));
    if local.end < text.text.len() {
        pieces.push(Node::styled_text(&text.text[local.end..], text.marks.clone()));
    }
    let mut ops = vec![Op::RemoveNode {
        path: path.to_vec(),
    }];
    for (i, node) in pieces.into_iter().enumerate() {
        ops.push(Op::InsertNode {
            path: child_path(parent, index + i),
            node,
        });
    }
    ops
}

/// The text leaf whose marks apply at a collapsed caret.
pub fn caret_leaf(doc: &Document, point: &Point) -> Option<Path> {
    match doc.node(&point.path) {
        Some(Node::Text(_)) => Some(point.path.clone()),
        _ => {
            let children = doc.children_at(&point.path)?;
            let before = point.offset.checked_sub(1).and_then(|ix| children.get(ix));
            if let Some(node) = before {
                let path = child_path(&point.path, point.offset - 1);
                return last_leaf_in(node, path);
            }
            let after = children.get(point.offset)?;
            first_leaf_in(after, child_path(&point.path, point.offset))
        }
    }
}

pub fn caret_marks(doc: &Document, point: &Point) -> Marks {
    caret_leaf(doc, point)
        .and_then(|path| doc.text(&path).map(|t| t.marks.clone()))
        .unwrap_or_default()
}

fn first_leaf_in(node: &Node, path: Path) -> Option<Path> {
    match node {
        Node::Text(_) => Some(path),
        Node::Element(el) => el
            .children
            .iter()
            .enumerate()
            .find_map(|(ix, child)| first_leaf_in(child, child_path(&path, ix))),
    }
}

fn last_leaf_in(node: &Node, path: Path) -> Option<Path> {
    match node {
        Node::Text(_) => Some(path),
        Node::Element(el) => el
            .children
            .iter()
            .enumerate()
            .rev()
            .find_map(|(ix, child)| last_leaf_in(child, child_path(&path, ix))),
    }
}

/// Caret position at the very start of the node at `path`.
pub fn start_point_of(doc: &Document, path: &[usize]) -> Point {
    doc.node(path)
        .and_then(|node| first_leaf_in(node, path.to_vec()))
        .map(|leaf| Point::new(leaf, 0))
        .unwrap_or_else(|| Point::new(path.to_vec(), 0))
}

/// Caret position at the very end of the node at `path`.
pub fn end_point_of(doc: &Document, path: &[usize]) -> Point {
    match doc.node(path) {
        Some(node) => match last_leaf_in(node, path.to_vec()) {
            Some(leaf) => {
                let len = doc.text(&leaf).map(|t| t.text.len()).unwrap_or(0);
                Point::new(leaf, len)
            }
            None => {
                let len = node.as_element().map(|el| el.children.len()).unwrap_or(0);
                Point::new(path.to_vec(), len)
            }
        },
        None => Point::new(path.to_vec(), 0),
    }
}

/// Splits a node at a boundary point given relative to it. Both halves keep
/// the node's tag and attributes.
pub fn split_node(node: &Node, rel: &[usize], offset: usize) -> (Node, Node) {
    match node {
        Node::Text(t) => {
            let at = crate::core::clamp_to_char_boundary(&t.text, offset);
            (
                Node::styled_text(&t.text[..at], t.marks.clone()),
                Node::styled_text(&t.text[at..], t.marks.clone()),
            )
        }
        Node::Element(el) => {
            let shell = |children: Vec<Node>| {
                Node::Element(ElementNode {
                    tag: el.tag.clone(),
                    attrs: el.attrs.clone(),
                    children,
                })
            };
            match rel.split_first() {
                None => {
                    let at = offset.min(el.children.len());
                    (
                        shell(el.children[..at].to_vec()),
                        shell(el.children[at..].to_vec()),
                    )
                }
                Some((&ix, rest)) => {
                    let ix = ix.min(el.children.len().saturating_sub(1));
                    let Some(child) = el.children.get(ix) else {
                        return (shell(Vec::new()), shell(Vec::new()));
                    };
                    let (left, right) = split_node(child, rest, offset);
                    let mut before = el.children[..ix].to_vec();
                    let mut after = vec![right];
                    before.push(left);
                    after.extend(el.children[ix + 1..].iter().cloned());
                    (shell(before), shell(after))
                }
            }
        }
    }
}

fn split_half_is_empty(node: &Node) -> bool {
    match node {
        Node::Text(t) => t.text.is_empty(),
        Node::Element(_) => !node.has_content(),
    }
}

/// Ops that insert `nodes` at `point`, plus the collapsed caret after them.
///
/// Block content climbs out of the enclosing text block (splitting it) up to
/// the nearest flow container; inline content lands in the point's container.
pub fn insert_nodes_at(doc: &Document, point: &Point, nodes: Vec<Node>) -> (Vec<Op>, Point) {
    let is_text = matches!(doc.node(&point.path), Some(Node::Text(_)));
    let container: Path = if is_text {
        point.path[..point.path.len() - 1].to_vec()
    } else {
        point.path.clone()
    };

    let has_block = nodes.iter().any(Node::is_block);
    let mut target = container.clone();
    if has_block {
        while let Some(tag) = doc.tag_at(&target) {
            if is_flow_container_tag(tag) {
                break;
            }
            target.pop();
        }
    }

    let count = nodes.len();
    let mut ops = Vec::new();
    if !is_text && target == point.path {
        let offset = point.offset;
        for (i, node) in nodes.into_iter().enumerate() {
            ops.push(Op::InsertNode {
                path: child_path(&target, offset + i),
                node,
            });
        }
        return (ops, Point::new(target, offset + count));
    }

    let depth = target.len();
    let child_ix = point.path[depth];
    let child_path_at = child_path(&target, child_ix);
    let Some(child) = doc.node(&child_path_at) else {
        return (Vec::new(), point.clone());
    };
    let (left, right) = split_node(child, &point.path[depth + 1..], point.offset);

    let mut sequence = Vec::new();
    let left_kept = !split_half_is_empty(&left);
    if left_kept {
        sequence.push(left);
    }
    sequence.extend(nodes);
    if !split_half_is_empty(&right) {
        sequence.push(right);
    }

    ops.push(Op::RemoveNode {
        path: child_path_at,
    });
    for (i, node) in sequence.into_iter().enumerate() {
        ops.push(Op::InsertNode {
            path: child_path(&target, child_ix + i),
            node,
        });
    }
    let caret = Point::new(target, child_ix + usize::from(left_kept) + count);
    (ops, caret)
}

/// Removes everything between two points (in either order), the way a DOM
/// range's `deleteContents` does. Returns the ops and the collapsed point.
pub fn delete_contents(doc: &Document, a: &Point, b: &Point) -> (Vec<Op>, Point) {
    let (start, end) = if compare_points(a, b) == Ordering::Greater {
        (b.clone(), a.clone())
    } else {
        (a.clone(), b.clone())
    };
    if start == end {
        return (Vec::new(), start);
    }

    let mut ops = Vec::new();
    let start_is_text = matches!(doc.node(&start.path), Some(Node::Text(_)));
    let end_is_text = matches!(doc.node(&end.path), Some(Node::Text(_)));
    if start_is_text {
        let len = doc.text(&start.path).map(|t| t.text.len()).unwrap_or(0);
        let stop = if start.path == end.path { end.offset } else { len };
        ops.push(Op::RemoveText {
            path: start.path.clone(),
            range: start.offset..stop,
        });
    }
    if end_is_text && end.path != start.path {
        ops.push(Op::RemoveText {
            path: end.path.clone(),
            range: 0..end.offset,
        });
    }

    let mut contained: Vec<Path> = Vec::new();
    fn collect(
        children: &[Node],
        path: &mut Vec<usize>,
        start: &Point,
        end: &Point,
        out: &mut Vec<Path>,
    ) {
        for (ix, node) in children.iter().enumerate() {
            let before = Point::new(path.clone(), ix);
            let after = Point::new(path.clone(), ix + 1);
            if compare_points(&after, start) != Ordering::Greater
                || compare_points(&before, end) != Ordering::Less
            {
                continue;
            }
            path.push(ix);
            if compare_points(&before, start) != Ordering::Less
                && compare_points(&after, end) != Ordering::Greater
            {
                out.push(path.clone());
            } else if let Node::Element(el) = node {
                collect(&el.children, path, start, end, out);
            }
            path.pop();
        }
    }
    collect(&doc.children, &mut Vec::new(), &start, &end, &mut contained);

    for path in contained.into_iter().rev() {
        ops.push(Op::RemoveNode { path });
    }
    (ops, start)
}

/// Index of the child of `container` that holds `point`, or the child right
/// after it when the point sits in `container` itself.
pub fn child_index_toward(container: &[usize], point: &Point) -> usize {
    if point.path.len() > container.len() {
        point.path[container.len()]
    } else {
        point.offset
    }
}

/// Nearest ancestor-or-self of `path` that is the root or a flow container.
pub fn flow_container_of(doc: &Document, path: &[usize]) -> Path {
    let mut current = path.to_vec();
    loop {
        match doc.node(&current) {
            None if current.is_empty() => return current,
            Some(Node::Element(el)) if is_flow_container_tag(&el.tag) => return current,
            _ => {}
        }
        if current.pop().is_none() {
            return current;
        }
    }
}

/// Maximal run of inline siblings around `index` in the container's children.
pub fn inline_run_around(children: &[Node], index: usize) -> Option<std::ops::Range<usize>> {
    if children.is_empty() {
        return None;
    }
    let index = index.min(children.len() - 1);
    if children[index].is_block() {
        return None;
    }
    let mut start = index;
    while start > 0 && !children[start - 1].is_block() {
        start -= 1;
    }
    let mut end = index + 1;
    while end < children.len() && !children[end].is_block() {
        end += 1;
    }
    Some(start..end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::html::{parse_document, serialize_nodes};

    fn apply(doc: &Document, ops: Vec<Op>) -> Document {
        let mut doc = doc.clone();
        let mut selection = None;
        for op in ops {
            crate::ops::apply_op_to(&mut doc, &mut selection, op).unwrap();
        }
        doc
    }

    #[test]
    fn global_offsets_cover_element_points() {
        let doc = parse_document("<p>ab</p><p>cd</p>");
        let leaves = text_leaves(&doc);
        assert_eq!(global_offset(&doc, &leaves, &Point::new(vec![], 1)), Some(2));
        assert_eq!(global_offset(&doc, &leaves, &Point::new(vec![1, 0], 1)), Some(3));
        assert_eq!(
            point_at_global(&leaves, 2, Bias::Forward),
            Some(Point::new(vec![1, 0], 0))
        );
        assert_eq!(
            point_at_global(&leaves, 2, Bias::Backward),
            Some(Point::new(vec![0, 0], 2))
        );
    }

    #[test]
    fn block_insert_splits_the_paragraph() {
        let doc = parse_document("<p>abcd</p>");
        let (ops, caret) = insert_nodes_at(
            &doc,
            &Point::new(vec![0, 0], 2),
            vec![Node::element("div", vec![Node::text("x")])],
        );
        let doc = apply(&doc, ops);
        assert_eq!(
            serialize_nodes(&doc.children),
            "<p>ab</p><div>x</div><p>cd</p>"
        );
        assert_eq!(caret, Point::new(vec![], 2));
    }

    #[test]
    fn delete_contents_across_blocks() {
        let doc = parse_document("<p>abc</p><p>def</p><p>ghi</p>");
        let (ops, point) = delete_contents(
            &doc,
            &Point::new(vec![0, 0], 1),
            &Point::new(vec![2, 0], 2),
        );
        let doc = apply(&doc, ops);
        assert_eq!(serialize_nodes(&doc.children), "<p>a</p><p>i</p>");
        assert_eq!(point, Point::new(vec![0, 0], 1));
    }
}
