//! Keyboard-driven restructuring of nested `<ol>`/`<ul>`/`<li>` trees.

use serde::{Deserialize, Serialize};

use crate::core::{Document, ElementNode, Node, Point, Selection, child_path, is_list_tag};
use crate::edit;
use crate::error::EditorError;
use crate::inspector::closest_ancestor_matching;
use crate::ops::{Op, Path, Transaction};
use crate::region::EditableRegion;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ListKey {
    Tab,
    ShiftTab,
    Enter,
    Backspace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ListKeyOutcome {
    /// The key was consumed and the tree restructured (or deliberately left alone).
    Handled,
    /// Let the native default run, then resync on a deferred tick.
    NativeThenResync,
    /// Let the native default run.
    Native,
    /// The caret is not in a list; the key is not ours.
    NotInList,
}

impl ListKeyOutcome {
    pub fn prevents_default(self) -> bool {
        matches!(self, ListKeyOutcome::Handled)
    }
}

pub struct ListStructureEditor;

impl ListStructureEditor {
    pub fn handle_key(
        region: &mut EditableRegion,
        key: ListKey,
    ) -> Result<ListKeyOutcome, EditorError> {
        let Some(selection) = region.live_selection() else {
            return Ok(ListKeyOutcome::NotInList);
        };
        let item = closest_list_item(region.doc(), &selection.common_ancestor());

        match key {
            ListKey::Tab | ListKey::ShiftTab => {
                let Some(item) = item else {
                    return Ok(ListKeyOutcome::NotInList);
                };
                if key == ListKey::Tab {
                    indent_list_item(region, &item)?;
                } else {
                    outdent_list_item(region, &item)?;
                }
                Ok(ListKeyOutcome::Handled)
            }
            ListKey::Enter => {
                let Some(item) = item else {
                    let in_list = closest_ancestor_matching(
                        region.doc(),
                        &selection.common_ancestor(),
                        |el| is_list_tag(&el.tag),
                    );
                    return Ok(if in_list.is_some() {
                        ListKeyOutcome::NativeThenResync
                    } else {
                        ListKeyOutcome::NotInList
                    });
                };
                if !item_is_empty(region.doc(), &item) {
                    return Ok(ListKeyOutcome::NativeThenResync);
                }
                if is_nested(region.doc(), &item) {
                    outdent_list_item(region, &item)?;
                } else {
                    exit_list(region, &item)?;
                }
                Ok(ListKeyOutcome::Handled)
            }
            ListKey::Backspace => {
                let Some(item) = item else {
                    return Ok(ListKeyOutcome::NotInList);
                };
                let at_start = selection.is_collapsed() && selection.focus.offset == 0;
                if !at_start || !item_is_empty(region.doc(), &item) {
                    return Ok(ListKeyOutcome::Native);
                }
                if is_nested(region.doc(), &item) {
                    outdent_list_item(region, &item)?;
                } else {
                    remove_top_level_item(region, &item)?;
                }
                Ok(ListKeyOutcome::Handled)
            }
        }
    }
}

pub fn closest_list_item(doc: &Document, start: &[usize]) -> Option<Path> {
    closest_ancestor_matching(doc, start, |el| el.tag == "li")
}

/// Empty means no text besides whitespace and non-breaking spaces.
pub fn item_is_empty(doc: &Document, item: &[usize]) -> bool {
    doc.node(item)
        .is_some_and(|node| node.text_content().trim().is_empty())
}

/// Whether the item's list hangs off another list item.
pub fn is_nested(doc: &Document, item: &[usize]) -> bool {
    item.len() >= 3 && doc.tag_at(&item[..item.len() - 2]) == Some("li")
}

/// Caret at the end of the item's own text, not inside its nested lists.
fn item_end_point(doc: &Document, item: &[usize]) -> Point {
    let Some(el) = doc.element(item) else {
        return Point::new(item.to_vec(), 0);
    };
    let own = el
        .children
        .iter()
        .position(|child| matches!(child, Node::Element(c) if is_list_tag(&c.tag)))
        .unwrap_or(el.children.len());
    for ix in (0..own).rev() {
        let path = child_path(item, ix);
        let point = edit::end_point_of(doc, &path);
        if matches!(doc.node(&point.path), Some(Node::Text(_))) {
            return point;
        }
    }
    // Only a `<br>` holds the line open: start before it so typing replaces it.
    if !el.children[..own].iter().any(Node::has_content) {
        return Point::new(item.to_vec(), 0);
    }
    Point::new(item.to_vec(), own)
}

/// Nests the item under its previous sibling item, reusing a trailing nested
/// list of the same type. Returns `false` when there is nothing to nest under.
pub fn indent_list_item(region: &mut EditableRegion, item: &[usize]) -> Result<bool, EditorError> {
    let doc = region.doc();
    let Some((&item_ix, list_path)) = item.split_last() else {
        return Ok(false);
    };
    let Some(list) = doc.element(list_path) else {
        return Ok(false);
    };
    let Some(node) = list.children.get(item_ix).cloned() else {
        return Ok(false);
    };
    let previous = list.children[..item_ix]
        .iter()
        .enumerate()
        .rev()
        .find_map(|(ix, child)| child.as_element().map(|el| (ix, el)));
    let Some((prev_ix, prev)) = previous.filter(|(_, el)| el.tag == "li") else {
        return Ok(false);
    };

    let prev_path = child_path(list_path, prev_ix);
    let reuse = prev
        .children
        .iter()
        .enumerate()
        .rev()
        .find_map(|(ix, child)| child.as_element().map(|el| (ix, el)))
        .filter(|(_, el)| el.tag == list.tag);

    let mut ops = vec![Op::RemoveNode {
        path: item.to_vec(),
    }];
    let moved_path = match reuse {
        Some((nested_ix, nested)) => {
            let path = child_path(&child_path(&prev_path, nested_ix), nested.children.len());
            ops.push(Op::InsertNode {
                path: path.clone(),
                node,
            });
            path
        }
        None => {
            let nested_path = child_path(&prev_path, prev.children.len());
            ops.push(Op::InsertNode {
                path: nested_path.clone(),
                node: Node::Element(ElementNode::new(list.tag.clone()).with_children(vec![node])),
            });
            child_path(&nested_path, 0)
        }
    };

    region.apply(Transaction::new(ops).source("list.indent"))?;
    let caret = item_end_point(region.doc(), &moved_path);
    region.place_caret(caret);
    Ok(true)
}

/// Moves a nested item out to its ancestor's list, right after the ancestor
/// item. Returns `false` for top-level items.
pub fn outdent_list_item(region: &mut EditableRegion, item: &[usize]) -> Result<bool, EditorError> {
    let doc = region.doc();
    if !is_nested(doc, item) {
        return Ok(false);
    }
    let list_path = &item[..item.len() - 1];
    let parent_item = &item[..item.len() - 2];
    let Some((&parent_ix, outer_list)) = parent_item.split_last() else {
        return Ok(false);
    };
    let Some(node) = doc.node(item).cloned() else {
        return Ok(false);
    };
    let siblings_left = doc
        .element(list_path)
        .map(|list| list.element_children().count().saturating_sub(1))
        .unwrap_or(0);

    let mut ops = vec![Op::RemoveNode {
        path: item.to_vec(),
    }];
    if siblings_left == 0 {
        ops.push(Op::RemoveNode {
            path: list_path.to_vec(),
        });
    }
    let moved_path = child_path(outer_list, parent_ix + 1);
    ops.push(Op::InsertNode {
        path: moved_path.clone(),
        node,
    });

    region.apply(Transaction::new(ops).source("list.outdent"))?;
    let caret = item_end_point(region.doc(), &moved_path);
    region.place_caret(caret);
    Ok(true)
}

/// Enter on an empty top-level item: drop it and continue in a paragraph
/// after the list. A list left without items becomes that paragraph.
fn exit_list(region: &mut EditableRegion, item: &[usize]) -> Result<(), EditorError> {
    let Some((&item_ix, list_path)) = item.split_last() else {
        return Ok(());
    };
    let Some((&list_ix, list_parent)) = list_path.split_last() else {
        return Ok(());
    };
    let others = other_items(region.doc(), list_path, item_ix);

    let (ops, paragraph_path) = if others.is_empty() {
        (
            vec![
                Op::RemoveNode {
                    path: list_path.to_vec(),
                },
                Op::InsertNode {
                    path: list_path.to_vec(),
                    node: Node::placeholder_paragraph(),
                },
            ],
            list_path.to_vec(),
        )
    } else {
        let paragraph_path = child_path(list_parent, list_ix + 1);
        (
            vec![
                Op::RemoveNode {
                    path: item.to_vec(),
                },
                Op::InsertNode {
                    path: paragraph_path.clone(),
                    node: Node::placeholder_paragraph(),
                },
            ],
            paragraph_path,
        )
    };
    let tx = Transaction::new(ops)
        .selection_after(Selection::collapsed(Point::new(paragraph_path, 0)))
        .source("list.exit");
    region.apply(tx)
}

fn other_items(doc: &Document, list_path: &[usize], item_ix: usize) -> Vec<usize> {
    doc.element(list_path)
        .map(|list| {
            list.element_children()
                .filter(|(ix, _)| *ix != item_ix)
                .map(|(ix, _)| ix)
                .collect()
        })
        .unwrap_or_default()
}

/// Backspace on an empty top-level item: remove it; an emptied list turns
/// into a placeholder paragraph.
fn remove_top_level_item(region: &mut EditableRegion, item: &[usize]) -> Result<(), EditorError> {
    let Some((&item_ix, list_path)) = item.split_last() else {
        return Ok(());
    };
    let remaining = other_items(region.doc(), list_path, item_ix);

    if remaining.is_empty() {
        let ops = vec![
            Op::RemoveNode {
                path: list_path.to_vec(),
            },
            Op::InsertNode {
                path: list_path.to_vec(),
                node: Node::placeholder_paragraph(),
            },
        ];
        let tx = Transaction::new(ops)
            .selection_after(Selection::collapsed(Point::new(list_path.to_vec(), 0)))
            .source("list.remove_item");
        return region.apply(tx);
    }

    region.apply(
        Transaction::new(vec![Op::RemoveNode {
            path: item.to_vec(),
        }])
        .source("list.remove_item"),
    )?;
    let caret = match remaining.iter().rev().find(|ix| **ix < item_ix) {
        Some(&prev) => item_end_point(region.doc(), &child_path(list_path, prev)),
        None => {
            let next = remaining.first().map_or(0, |ix| ix - 1);
            edit::start_point_of(region.doc(), &child_path(list_path, next))
        }
    };
    region.place_caret(caret);
    Ok(())
}
