use serde_json::Value;

use super::{commit, require_selection};
use crate::core::{ElementNode, Node, Point, Selection, child_path, is_list_tag, is_text_block_tag};
use crate::edit;
use crate::error::CommandError;
use crate::inspector::{SelectionInspector, closest_ancestor_matching};
use crate::list_editor::{closest_list_item, indent_list_item, outdent_list_item};
use crate::ops::{Op, Path, Transaction};
use crate::plugin::{BackendPlugin, CommandSpec, QuerySpec};
use crate::region::EditableRegion;

pub struct ListPlugin;

impl BackendPlugin for ListPlugin {
    fn id(&self) -> &'static str {
        "list"
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::new("insertOrderedList", "Numbered list", |region, _value| {
                toggle_list(region, "ol")
            }),
            CommandSpec::new("insertUnorderedList", "Bulleted list", |region, _value| {
                toggle_list(region, "ul")
            }),
            CommandSpec::new("indent", "Indent", |region, _value| {
                with_list_item(region, |region, item| {
                    indent_list_item(region, item).map_err(CommandError::from)
                })
            })
            .description("Nest the current list item under the previous one."),
            CommandSpec::new("outdent", "Outdent", |region, _value| {
                with_list_item(region, |region, item| {
                    outdent_list_item(region, item).map_err(CommandError::from)
                })
            })
            .description("Move the current list item one level out."),
        ]
    }

    fn queries(&self) -> Vec<QuerySpec> {
        ["insertOrderedList", "insertUnorderedList"]
            .into_iter()
            .zip(["ol", "ul"])
            .map(|(id, tag)| {
                QuerySpec::new(id, move |region| Ok(Value::Bool(in_list_of(region, tag))))
            })
            .collect()
    }
}

/// A selection spanning several items has the list as its common ancestor,
/// so the item holding the start decides.
fn selected_list_item(region: &EditableRegion) -> Option<Path> {
    let inspector = SelectionInspector::new(region);
    inspector.closest_list_item().or_else(|| {
        let (start, _) = inspector.selection()?.ordered();
        closest_list_item(region.doc(), &start.path)
    })
}

fn in_list_of(region: &EditableRegion, tag: &str) -> bool {
    let Some(item) = selected_list_item(region) else {
        return false;
    };
    region.doc().tag_at(&item[..item.len() - 1]) == Some(tag)
}

fn with_list_item(
    region: &mut EditableRegion,
    f: impl FnOnce(&mut EditableRegion, &[usize]) -> Result<bool, CommandError>,
) -> Result<(), CommandError> {
    require_selection(region)?;
    let Some(item) = selected_list_item(region) else {
        return Ok(());
    };
    f(region, &item).map(|_| ())
}

fn list_element(tag: &str, items: Vec<Node>) -> Node {
    Node::Element(ElementNode::new(tag).with_children(items))
}

fn item_element(mut children: Vec<Node>) -> Node {
    if children.is_empty() {
        children.push(Node::line_break());
    }
    Node::Element(ElementNode::new("li").with_children(children))
}

fn toggle_list(region: &mut EditableRegion, tag: &str) -> Result<(), CommandError> {
    let selection = require_selection(region)?;
    let text_range = edit::selection_text_range(region.doc(), &selection);
    let item = selected_list_item(region);

    let (tx, fallback) = match item {
        Some(item) => {
            let list_path = item[..item.len() - 1].to_vec();
            if region.doc().tag_at(&list_path) == Some(tag) {
                unlist_item(region, &item)?
            } else {
                let tx = Transaction::new(vec![Op::Retag {
                    path: list_path,
                    tag: tag.to_string(),
                }]);
                (tx, None)
            }
        }
        None => match wrap_in_list(region, &selection, tag) {
            Some(result) => result,
            None => return Ok(()),
        },
    };
    commit(region, tx.source(format!("command:list.{tag}")))?;

    // The text is untouched, so the selection survives as a text range.
    let restored = text_range.is_some_and(|(start, end)| region.select_text_range(start, end));
    if !restored {
        if let Some(point) = fallback {
            region.place_caret(point);
        }
    }
    Ok(())
}

/// Turns one item into a paragraph, splitting its list around it.
fn unlist_item(
    region: &EditableRegion,
    item: &[usize],
) -> Result<(Transaction, Option<Point>), CommandError> {
    let doc = region.doc();
    let Some((&item_ix, list_path)) = item.split_last() else {
        return Err(CommandError::new("Invalid list item path"));
    };
    let Some((&list_ix, parent)) = list_path.split_last() else {
        return Err(CommandError::new("Invalid list path"));
    };
    let (Some(list), Some(li)) = (doc.element(list_path), doc.element(item)) else {
        return Err(CommandError::new("List item is gone"));
    };

    let has_items = |nodes: &[Node]| nodes.iter().any(|node| node.as_element().is_some());
    let before = &list.children[..item_ix];
    let after = &list.children[item_ix + 1..];

    let (inline, nested): (Vec<Node>, Vec<Node>) = li
        .children
        .iter()
        .cloned()
        .partition(|child| !matches!(child, Node::Element(el) if is_list_tag(&el.tag)));
    let mut paragraph = ElementNode::new("p").with_children(inline);
    if paragraph.children.is_empty() {
        paragraph.children.push(Node::line_break());
    }

    let mut replacement = Vec::new();
    if has_items(before) {
        replacement.push(list_element(&list.tag, before.to_vec()));
    }
    let paragraph_ix = list_ix + replacement.len();
    replacement.push(Node::Element(paragraph));
    replacement.extend(nested);
    if has_items(after) {
        replacement.push(list_element(&list.tag, after.to_vec()));
    }

    let mut ops = vec![Op::RemoveNode {
        path: list_path.to_vec(),
    }];
    for (i, node) in replacement.into_iter().enumerate() {
        ops.push(Op::InsertNode {
            path: child_path(parent, list_ix + i),
            node,
        });
    }
    let caret = Point::new(child_path(parent, paragraph_ix), 0);
    Ok((
        Transaction::new(ops).selection_after(Selection::collapsed(caret.clone())),
        Some(caret),
    ))
}

fn listable_block(el: &ElementNode) -> bool {
    is_text_block_tag(&el.tag) || (el.tag == "div" && !el.children.iter().any(Node::is_block))
}

/// Wraps the selected blocks, or the inline run at the caret, into a new list.
fn wrap_in_list(
    region: &EditableRegion,
    selection: &Selection,
    tag: &str,
) -> Option<(Transaction, Option<Point>)> {
    let doc = region.doc();
    let (start, end) = selection.ordered();
    let first = closest_ancestor_matching(doc, &start.path, listable_block);
    let last = closest_ancestor_matching(doc, &end.path, listable_block);

    let (container, range, items): (Path, _, Vec<Node>) = match (first, last) {
        (Some(first), Some(last)) if first[..first.len() - 1] == last[..last.len() - 1] => {
            let container = first[..first.len() - 1].to_vec();
            let (a, b) = (first[first.len() - 1], last[last.len() - 1]);
            let range = a.min(b)..a.max(b) + 1;
            let children = doc.children_at(&container)?;
            let items = children[range.clone()]
                .iter()
                .filter_map(|node| match node {
                    Node::Element(el) if listable_block(el) => {
                        Some(item_element(el.children.clone()))
                    }
                    Node::Text(t) if t.text.trim().is_empty() => None,
                    other => Some(item_element(vec![other.clone()])),
                })
                .collect();
            (container, range, items)
        }
        (Some(block), _) => {
            let container = block[..block.len() - 1].to_vec();
            let ix = block[block.len() - 1];
            let el = doc.element(&block)?;
            (container, ix..ix + 1, vec![item_element(el.children.clone())])
        }
        (None, _) => {
            let container = edit::flow_container_of(doc, &start.path);
            let children = doc.children_at(&container)?;
            let index = edit::child_index_toward(&container, &start);
            let range = edit::inline_run_around(children, index)?;
            let items = vec![item_element(children[range.clone()].to_vec())];
            (container, range, items)
        }
    };

    let mut ops: Vec<Op> = range
        .clone()
        .rev()
        .map(|ix| Op::RemoveNode {
            path: child_path(&container, ix),
        })
        .collect();
    let list_path = child_path(&container, range.start);
    ops.push(Op::InsertNode {
        path: list_path.clone(),
        node: list_element(tag, items),
    });
    let caret = Point::new(child_path(&list_path, 0), 0);
    Some((
        Transaction::new(ops).selection_after(Selection::collapsed(caret.clone())),
        Some(caret),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::{FormattingBackend, MarkupBackend};

    #[test]
    fn toggling_twice_restores_the_paragraph() {
        let mut region = EditableRegion::new("<p>one</p>");
        region.place_caret_after("on");
        let mut backend = MarkupBackend::default();

        backend.apply(&mut region, "insertUnorderedList", None).unwrap();
        assert_eq!(region.html(), "<ul><li>one</li></ul>");
        assert!(backend.query_state(&region, "insertUnorderedList").unwrap());

        backend.apply(&mut region, "insertUnorderedList", None).unwrap();
        assert_eq!(region.html(), "<p>one</p>");
    }

    #[test]
    fn unlisting_a_middle_item_splits_the_list() {
        let mut region = EditableRegion::new("<ol><li>a</li><li>b</li><li>c</li></ol>");
        region.place_caret_after("b");
        MarkupBackend::default()
            .apply(&mut region, "insertOrderedList", None)
            .unwrap();
        assert_eq!(
            region.html(),
            "<ol><li>a</li></ol><p>b</p><ol><li>c</li></ol>"
        );
    }

    #[test]
    fn switching_list_type_retags() {
        let mut region = EditableRegion::new("<ol><li>a</li></ol>");
        region.place_caret_after("a");
        MarkupBackend::default()
            .apply(&mut region, "insertUnorderedList", None)
            .unwrap();
        assert_eq!(region.html(), "<ul><li>a</li></ul>");
    }
}
