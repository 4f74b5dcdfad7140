mod block;
mod font;
mod insert;
mod list;
mod marks;

pub use block::BlockPlugin;
pub(crate) use block::{unwrap_blockquote, wrap_in_blockquote};
pub use font::FontSizePlugin;
pub use insert::InsertPlugin;
pub use list::ListPlugin;
pub use marks::MarksPlugin;

use crate::core::{Point, Selection};
use crate::edit;
use crate::error::CommandError;
use crate::ops::Transaction;
use crate::region::EditableRegion;

fn require_selection(region: &EditableRegion) -> Result<Selection, CommandError> {
    region
        .live_selection()
        .ok_or_else(|| CommandError::new("No selection in the editable region"))
}

fn commit(region: &mut EditableRegion, tx: Transaction) -> Result<(), CommandError> {
    region.apply(tx).map_err(CommandError::from)
}

/// Collapsed insertion point for content commands. A range selection is
/// deleted first; with no selection the end of the document is used.
fn prepare_insertion_point(
    region: &mut EditableRegion,
    source: &str,
) -> Result<Point, CommandError> {
    let Some(selection) = region.live_selection() else {
        return Ok(region.end_of_document());
    };
    if selection.is_collapsed() {
        return Ok(selection.focus);
    }
    let (ops, point) = edit::delete_contents(region.doc(), &selection.anchor, &selection.focus);
    let tx = Transaction::new(ops)
        .selection_after(Selection::collapsed(point))
        .source(source);
    commit(region, tx)?;
    region
        .live_selection()
        .map(|sel| sel.focus)
        .ok_or_else(|| CommandError::new("Selection lost while deleting contents"))
}
