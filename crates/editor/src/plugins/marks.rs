use serde_json::Value;

use super::{commit, require_selection};
use crate::core::{Marks, Node, Point, Selection};
use crate::edit;
use crate::error::CommandError;
use crate::ops::{Op, Transaction};
use crate::plugin::{BackendPlugin, CommandSpec, QuerySpec};
use crate::region::EditableRegion;

type MarkGetter = fn(&Marks) -> bool;
type MarkSetter = fn(&mut Marks, bool);

const MARKS: [(&str, &str, MarkGetter, MarkSetter); 4] = [
    (
        "bold",
        "Bold",
        |m: &Marks| m.bold,
        |m: &mut Marks, v: bool| m.bold = v,
    ),
    (
        "italic",
        "Italic",
        |m: &Marks| m.italic,
        |m: &mut Marks, v: bool| m.italic = v,
    ),
    (
        "underline",
        "Underline",
        |m: &Marks| m.underline,
        |m: &mut Marks, v: bool| m.underline = v,
    ),
    (
        "strikeThrough",
        "Strikethrough",
        |m: &Marks| m.strikethrough,
        |m: &mut Marks, v: bool| m.strikethrough = v,
    ),
];

pub struct MarksPlugin;

impl BackendPlugin for MarksPlugin {
    fn id(&self) -> &'static str {
        "marks"
    }

    fn commands(&self) -> Vec<CommandSpec> {
        let mut commands: Vec<CommandSpec> = MARKS
            .iter()
            .map(|&(id, label, get, set)| {
                let source = format!("command:{id}");
                CommandSpec::new(id, label, move |region, _value| {
                    toggle_mark(region, get, set, &source)
                })
            })
            .collect();
        commands.push(
            CommandSpec::new("removeFormat", "Clear formatting", |region, _value| {
                remove_format(region)
            })
            .description("Remove bold, italic, underline and strikethrough from the selection."),
        );
        commands
    }

    fn queries(&self) -> Vec<QuerySpec> {
        MARKS
            .iter()
            .map(|&(id, _, get, _)| {
                QuerySpec::new(id, move |region| Ok(Value::Bool(mark_state(region, get))))
            })
            .collect()
    }
}

/// Whether the mark applies at the caret, or to every selected character.
fn mark_state(region: &EditableRegion, get: MarkGetter) -> bool {
    let Some(selection) = region.live_selection() else {
        return false;
    };
    let doc = region.doc();
    if !selection.is_collapsed() {
        if let Some((start, end)) = edit::selection_text_range(doc, &selection) {
            if start < end {
                return edit::all_text_has_mark(doc, start, end, get);
            }
        }
    }
    get(&edit::caret_marks(doc, &selection.focus))
}

fn toggle_mark(
    region: &mut EditableRegion,
    get: MarkGetter,
    set: MarkSetter,
    source: &str,
) -> Result<(), CommandError> {
    let selection = require_selection(region)?;
    let range = edit::selection_text_range(region.doc(), &selection).filter(|(s, e)| s < e);
    let Some((start, end)) = range else {
        return toggle_mark_at_caret(region, &selection.focus, get, set, source);
    };

    let target = !edit::all_text_has_mark(region.doc(), start, end, get);
    let ops = edit::apply_marks_in_range(region.doc(), start, end, &|marks: &Marks| {
        let mut next = marks.clone();
        set(&mut next, target);
        next
    });
    commit(region, Transaction::new(ops).source(source))?;
    region.select_text_range(start, end);
    Ok(())
}

/// Leaves an empty leaf carrying the toggled marks at the caret, so the next
/// typed text picks them up.
fn toggle_mark_at_caret(
    region: &mut EditableRegion,
    caret: &Point,
    get: MarkGetter,
    set: MarkSetter,
    source: &str,
) -> Result<(), CommandError> {
    let doc = region.doc();
    let mut marks = edit::caret_marks(doc, caret);
    let target = !get(&marks);
    set(&mut marks, target);

    let tx = match doc.text(&caret.path) {
        Some(text) if text.text.is_empty() => Transaction::new(vec![Op::SetMarks {
            path: caret.path.clone(),
            marks,
        }])
        .selection_after(Selection::collapsed(caret.clone())),
        Some(text) => {
            let Some((&index, parent)) = caret.path.split_last() else {
                return Err(CommandError::new("Caret is outside the editable region"));
            };
            let (left, right) = text.text.split_at(caret.offset.min(text.text.len()));
            let pieces = vec![
                Node::styled_text(left, text.marks.clone()),
                Node::styled_text("", marks),
                Node::styled_text(right, text.marks.clone()),
            ];
            let mut ops = vec![Op::RemoveNode {
                path: caret.path.clone(),
            }];
            for (i, node) in pieces.into_iter().enumerate() {
                let mut path = parent.to_vec();
                path.push(index + i);
                ops.push(Op::InsertNode { path, node });
            }
            let mut pending = parent.to_vec();
            pending.push(index + 1);
            Transaction::new(ops).selection_after(Selection::collapsed(Point::new(pending, 0)))
        }
        None => {
            let mut path = caret.path.clone();
            path.push(caret.offset);
            Transaction::new(vec![Op::InsertNode {
                path: path.clone(),
                node: Node::styled_text("", marks),
            }])
            .selection_after(Selection::collapsed(Point::new(path, 0)))
        }
    };
    commit(region, tx.source(source))
}

fn remove_format(region: &mut EditableRegion) -> Result<(), CommandError> {
    let selection = require_selection(region)?;
    let Some((start, end)) =
        edit::selection_text_range(region.doc(), &selection).filter(|(s, e)| s < e)
    else {
        return Ok(());
    };
    let ops = edit::apply_marks_in_range(region.doc(), start, end, &|_: &Marks| Marks::default());
    commit(region, Transaction::new(ops).source("command:removeFormat"))?;
    region.select_text_range(start, end);
    Ok(())
}
