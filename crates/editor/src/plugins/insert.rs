use super::{commit, prepare_insertion_point, require_selection};
use crate::core::{Document, ElementNode, Node, Point, Selection, child_path, is_heading_tag, is_text_block_tag};
use crate::edit;
use crate::error::CommandError;
use crate::html;
use crate::inspector::closest_ancestor_matching;
use crate::ops::{Op, Path, Transaction};
use crate::plugin::{BackendPlugin, CommandSpec};
use crate::region::EditableRegion;

pub struct InsertPlugin;

impl BackendPlugin for InsertPlugin {
    fn id(&self) -> &'static str {
        "insert"
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::new("insertHTML", "Insert HTML", |region, value| {
                insert_html(region, value.unwrap_or_default())
            })
            .description("Replace the selection with parsed markup."),
            CommandSpec::new("insertText", "Insert text", |region, value| {
                insert_text(region, value.unwrap_or_default())
            }),
            CommandSpec::new("insertLineBreak", "Line break", |region, _value| {
                insert_nodes(region, vec![Node::line_break()], "command:insertLineBreak")
            }),
            CommandSpec::new("insertParagraph", "New paragraph", |region, _value| {
                insert_paragraph(region)
            })
            .description("Split the current block at the caret."),
            CommandSpec::new("delete", "Delete backward", |region, _value| {
                delete_backward(region)
            }),
        ]
    }
}

fn insert_nodes(
    region: &mut EditableRegion,
    nodes: Vec<Node>,
    source: &str,
) -> Result<(), CommandError> {
    let point = prepare_insertion_point(region, source)?;
    let mut ops = drop_placeholder_break(region.doc(), &point);
    let (insert, caret) = edit::insert_nodes_at(region.doc(), &point, nodes);
    ops.extend(insert);
    let tx = Transaction::new(ops)
        .selection_after(Selection::collapsed(caret))
        .source(source);
    commit(region, tx)
}

/// Typing into `<p><br></p>` replaces the break that only held the line open.
fn drop_placeholder_break(doc: &Document, point: &Point) -> Vec<Op> {
    let placeholder = doc
        .element(&point.path)
        .is_some_and(|el| point.offset == 0 && el.children.len() == 1 && el.children[0].is_tag("br"));
    if placeholder {
        vec![Op::RemoveNode {
            path: child_path(&point.path, 0),
        }]
    } else {
        Vec::new()
    }
}

fn insert_html(region: &mut EditableRegion, markup: &str) -> Result<(), CommandError> {
    let nodes = html::parse_fragment(markup);
    if nodes.is_empty() {
        return Ok(());
    }
    insert_nodes(region, nodes, "command:insertHTML")
}

fn insert_text(region: &mut EditableRegion, text: &str) -> Result<(), CommandError> {
    if text.is_empty() {
        return Ok(());
    }
    let point = prepare_insertion_point(region, "command:insertText")?;
    let doc = region.doc();

    if doc.text(&point.path).is_some() && !text.contains('\n') {
        let caret = Point::new(point.path.clone(), point.offset + text.len());
        let tx = Transaction::new(vec![Op::InsertText {
            path: point.path,
            offset: point.offset,
            text: text.to_string(),
        }])
        .selection_after(Selection::collapsed(caret))
        .source("command:insertText");
        return commit(region, tx);
    }

    let marks = edit::caret_marks(doc, &point);
    let mut nodes = Vec::new();
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            nodes.push(Node::line_break());
        }
        if !line.is_empty() {
            nodes.push(Node::styled_text(line.trim_end_matches('\r'), marks.clone()));
        }
    }
    let mut ops = drop_placeholder_break(doc, &point);
    let (insert, caret) = edit::insert_nodes_at(doc, &point, nodes);
    ops.extend(insert);
    let tx = Transaction::new(ops)
        .selection_after(Selection::collapsed(caret))
        .source("command:insertText");
    commit(region, tx)
}

fn splittable(el: &ElementNode) -> bool {
    el.tag == "li" || is_text_block_tag(&el.tag)
}

/// An emptied half still needs a line box.
fn ensure_line_box(node: &mut Node) {
    if node.has_content() {
        return;
    }
    if let Some(el) = node.as_element_mut() {
        if !el.children.iter().any(|child| child.is_tag("br")) {
            el.children = vec![Node::line_break()];
        }
    }
}

fn insert_paragraph(region: &mut EditableRegion) -> Result<(), CommandError> {
    let point = prepare_insertion_point(region, "command:insertParagraph")?;
    let doc = region.doc();
    let Some(block_path) = closest_ancestor_matching(doc, &point.path, splittable) else {
        return insert_nodes(region, vec![Node::line_break()], "command:insertParagraph");
    };
    let Some(block) = doc.node(&block_path) else {
        return Err(CommandError::new("Block under the caret is gone"));
    };
    let Some((&block_ix, parent)) = block_path.split_last() else {
        return Err(CommandError::new("Cannot split the region root"));
    };

    let (mut left, mut right) =
        edit::split_node(block, &point.path[block_path.len()..], point.offset);
    ensure_line_box(&mut left);
    let right_empty = !right.has_content();
    ensure_line_box(&mut right);
    if right_empty {
        if let Some(el) = right.as_element_mut() {
            if is_heading_tag(&el.tag) {
                el.tag = "p".to_string();
            }
        }
    }

    let right_path = child_path(parent, block_ix + 1);
    let ops = vec![
        Op::RemoveNode {
            path: block_path.clone(),
        },
        Op::InsertNode {
            path: block_path,
            node: left,
        },
        Op::InsertNode {
            path: right_path.clone(),
            node: right,
        },
    ];
    commit(
        region,
        Transaction::new(ops).source("command:insertParagraph"),
    )?;
    let caret = edit::start_point_of(region.doc(), &right_path);
    region.place_caret(caret);
    Ok(())
}

/// The node right before a collapsed caret, at the caret's own level.
fn node_before(doc: &Document, point: &Point) -> Option<Path> {
    let (parent, index) = match doc.node(&point.path) {
        Some(Node::Text(_)) if point.offset == 0 => {
            let (&ix, parent) = point.path.split_last()?;
            (parent.to_vec(), ix)
        }
        Some(Node::Text(_)) => return None,
        _ => (point.path.clone(), point.offset),
    };
    let ix = index.checked_sub(1)?;
    doc.children_at(&parent)?.get(ix)?;
    Some(child_path(&parent, ix))
}

fn delete_backward(region: &mut EditableRegion) -> Result<(), CommandError> {
    let selection = require_selection(region)?;
    let doc = region.doc();

    if !selection.is_collapsed() {
        let (ops, point) = edit::delete_contents(doc, &selection.anchor, &selection.focus);
        let tx = Transaction::new(ops)
            .selection_after(Selection::collapsed(point))
            .source("command:delete");
        return commit(region, tx);
    }

    let caret = selection.focus;
    if let Some(before) = node_before(doc, &caret) {
        if doc.node(&before).is_some_and(|node| node.is_tag("br")) {
            let tx = Transaction::new(vec![Op::RemoveNode { path: before }]).source("command:delete");
            return commit(region, tx);
        }
    }

    let leaves = edit::text_leaves(doc);
    let Some(offset) = edit::global_offset(doc, &leaves, &caret) else {
        return Ok(());
    };
    let block = closest_ancestor_matching(doc, &caret.path, splittable);
    if let Some(block) = block {
        let block_start = edit::global_offset(doc, &leaves, &edit::start_point_of(doc, &block));
        if block_start == Some(offset) {
            return merge_with_previous_block(region, &block, offset);
        }
    }

    if offset == 0 {
        return Ok(());
    }
    let Some(point) = edit::point_at_global(&leaves, offset, edit::Bias::Backward) else {
        return Ok(());
    };
    let Some(text) = doc.text(&point.path) else {
        return Ok(());
    };
    let prefix = &text.text[..point.offset.min(text.text.len())];
    let Some(ch) = prefix.chars().next_back() else {
        return Ok(());
    };
    let start = point.offset - ch.len_utf8();
    let tx = Transaction::new(vec![Op::RemoveText {
        path: point.path.clone(),
        range: start..point.offset,
    }])
    .selection_after(Selection::collapsed(Point::new(point.path, start)))
    .source("command:delete");
    commit(region, tx)
}

/// Backspace at the start of a block pulls its content into the previous
/// sibling block of the same kind.
fn merge_with_previous_block(
    region: &mut EditableRegion,
    block: &[usize],
    offset: usize,
) -> Result<(), CommandError> {
    let doc = region.doc();
    let Some((&ix, parent)) = block.split_last() else {
        return Ok(());
    };
    let Some(prev_ix) = ix.checked_sub(1) else {
        return Ok(());
    };
    let prev_path = child_path(parent, prev_ix);
    let (Some(prev), Some(current)) = (doc.element(&prev_path), doc.element(block)) else {
        return Ok(());
    };
    let same_kind = (prev.tag == "li") == (current.tag == "li");
    if !splittable(prev) || !same_kind {
        return Ok(());
    }

    let keep = |el: &ElementNode| {
        if Node::Element(el.clone()).has_content() {
            el.children.clone()
        } else {
            Vec::new()
        }
    };
    let mut merged = prev.clone();
    merged.children = keep(prev);
    merged.children.extend(keep(current));
    let mut merged = Node::Element(merged);
    ensure_line_box(&mut merged);

    let ops = vec![
        Op::RemoveNode {
            path: block.to_vec(),
        },
        Op::RemoveNode {
            path: prev_path.clone(),
        },
        Op::InsertNode {
            path: prev_path.clone(),
            node: merged,
        },
    ];
    commit(region, Transaction::new(ops).source("command:delete.merge"))?;
    if !region.select_text_range(offset, offset) {
        region.place_caret(Point::new(prev_path, 0));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::{FormattingBackend, MarkupBackend};

    fn run(region: &mut EditableRegion, command: &str, value: Option<&str>) {
        MarkupBackend::default()
            .apply(region, command, value)
            .unwrap();
    }

    #[test]
    fn insert_html_replaces_the_selection() {
        let mut region = EditableRegion::new("<p>hello world</p>");
        region.select_text("world");
        run(&mut region, "insertHTML", Some("<b>there</b>"));
        assert_eq!(region.html(), "<p>hello <b>there</b></p>");
    }

    #[test]
    fn paragraph_split_moves_the_caret_to_the_new_block() {
        let mut region = EditableRegion::new("<h2>Title</h2>");
        region.place_caret_after("Title");
        run(&mut region, "insertParagraph", None);
        assert_eq!(region.html(), "<h2>Title</h2><p><br></p>");
        run(&mut region, "insertText", Some("body"));
        assert_eq!(region.html(), "<h2>Title</h2><p>body</p>");
    }

    #[test]
    fn delete_removes_one_character() {
        let mut region = EditableRegion::new("<p>abc</p>");
        region.place_caret_after("abc");
        run(&mut region, "delete", None);
        assert_eq!(region.html(), "<p>ab</p>");
    }

    #[test]
    fn delete_at_block_start_merges_blocks() {
        let mut region = EditableRegion::new("<p>ab</p><p>cd</p>");
        region.place_caret_before("cd");
        run(&mut region, "delete", None);
        assert_eq!(region.html(), "<p>abcd</p>");
    }
}
