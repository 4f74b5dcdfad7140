use serde_json::Value;

use super::{commit, require_selection};
use crate::core::{ElementNode, Node, Point, Selection};
use crate::edit;
use crate::error::CommandError;
use crate::inspector::closest_ancestor_matching;
use crate::ops::{AttrPatch, Op, Transaction};
use crate::plugin::{BackendPlugin, CommandSpec, QuerySpec};
use crate::region::EditableRegion;
use crate::style;

pub struct FontSizePlugin;

impl BackendPlugin for FontSizePlugin {
    fn id(&self) -> &'static str {
        "font_size"
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::new("fontSize", "Font size", |region, value| {
                let size = value
                    .and_then(style::parse_legacy_size)
                    .ok_or_else(|| CommandError::new("fontSize expects a size from 1 to 7"))?;
                set_font_size(region, size)
            })
            .description("Wrap the selection in <font size=N>."),
        ]
    }

    fn queries(&self) -> Vec<QuerySpec> {
        vec![QuerySpec::new("fontSize", |region| {
            Ok(current_legacy_size(region)
                .map(|size| Value::String(size.to_string()))
                .unwrap_or(Value::Null))
        })]
    }
}

fn font_element(size: u8, children: Vec<Node>) -> Node {
    Node::Element(
        ElementNode::new("font")
            .with_attr("size", size.to_string())
            .with_children(children),
    )
}

fn set_font_size(region: &mut EditableRegion, size: u8) -> Result<(), CommandError> {
    let selection = require_selection(region)?;
    let doc = region.doc();
    let range = edit::selection_text_range(doc, &selection).filter(|(s, e)| s < e);
    let Some((start, end)) = range else {
        return set_font_size_at_caret(region, &selection.focus, size);
    };

    let mut ops = Vec::new();
    for (leaf, local) in edit::leaves_in_range(doc, start, end).into_iter().rev() {
        let Some(text) = doc.text(&leaf.path) else {
            continue;
        };
        let whole = local.start == 0 && local.end == text.text.len();
        let parent = &leaf.path[..leaf.path.len() - 1];
        let sole_font_child = doc
            .element(parent)
            .is_some_and(|el| el.tag == "font" && el.children.len() == 1);
        if whole && sole_font_child {
            ops.push(Op::SetAttrs {
                path: parent.to_vec(),
                patch: AttrPatch::set("size", size.to_string()),
            });
            continue;
        }
        let marks = text.marks.clone();
        ops.extend(edit::replace_leaf_piece(&leaf.path, text, local, |middle| {
            font_element(size, vec![Node::styled_text(middle, marks)])
        }));
    }
    commit(region, Transaction::new(ops).source("command:fontSize"))?;
    region.select_text_range(start, end);
    Ok(())
}

fn set_font_size_at_caret(
    region: &mut EditableRegion,
    caret: &Point,
    size: u8,
) -> Result<(), CommandError> {
    let doc = region.doc();
    let marks = edit::caret_marks(doc, caret);

    if let Some(text) = doc.text(&caret.path) {
        let parent = &caret.path[..caret.path.len() - 1];
        let in_empty_font = text.text.is_empty()
            && doc
                .element(parent)
                .is_some_and(|el| el.tag == "font" && el.children.len() == 1);
        if in_empty_font {
            let tx = Transaction::new(vec![Op::SetAttrs {
                path: parent.to_vec(),
                patch: AttrPatch::set("size", size.to_string()),
            }]);
            return commit(region, tx.source("command:fontSize"));
        }
    }

    let pending = font_element(size, vec![Node::styled_text("", marks)]);
    let (ops, after) = edit::insert_nodes_at(doc, caret, vec![pending]);
    // The caret goes inside the new element, on its empty leaf.
    let Some(font_ix) = after.offset.checked_sub(1) else {
        return Err(CommandError::new("Could not place the caret"));
    };
    let mut leaf = after.path.clone();
    leaf.push(font_ix);
    leaf.push(0);
    let tx = Transaction::new(ops)
        .selection_after(Selection::collapsed(Point::new(leaf, 0)))
        .source("command:fontSize");
    commit(region, tx)
}

/// Size of the closest `<font>` around the selection start, or the computed
/// pixel size mapped onto the legacy scale.
pub(crate) fn current_legacy_size(region: &EditableRegion) -> Option<u8> {
    let selection = region.live_selection()?;
    let (start, _) = selection.ordered();
    let doc = region.doc();
    let font = closest_ancestor_matching(doc, &start.path, |el| {
        el.tag == "font" && el.attr("size").and_then(style::parse_legacy_size).is_some()
    });
    if let Some(path) = font {
        return doc
            .element(&path)
            .and_then(|el| el.attr("size"))
            .and_then(style::parse_legacy_size);
    }
    let element_path = match doc.node(&start.path) {
        Some(Node::Text(_)) => &start.path[..start.path.len() - 1],
        _ => &start.path[..],
    };
    let px = style::computed_font_size_px(doc, element_path, 16.0);
    Some(style::px_to_legacy_size(px))
}
