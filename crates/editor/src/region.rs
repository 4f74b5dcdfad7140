use serde::{Deserialize, Serialize};

use crate::config::EditorConfig;
use crate::core::{Document, Point, Selection};
use crate::edit;
use crate::error::EditorError;
use crate::html;
use crate::normalize::{NormalizePass, core_passes};
use crate::ops::{Transaction, apply_op_to};

/// The subtree the user edits. Every path handed to the region is relative to
/// its root, so nothing outside it can be addressed.
pub struct EditableRegion {
    doc: Document,
    selection: Option<Selection>,
    editable: bool,
    focused: bool,
    destroyed: bool,
    epoch: u64,
    revision: u64,
    last_html: String,
    max_normalize_iterations: usize,
    passes: Vec<Box<dyn NormalizePass>>,
}

impl EditableRegion {
    pub fn new(html: &str) -> Self {
        Self::with_config(html, &EditorConfig::default())
    }

    pub fn with_config(html: &str, config: &EditorConfig) -> Self {
        let mut region = Self {
            doc: Document::default(),
            selection: None,
            editable: true,
            focused: false,
            destroyed: false,
            epoch: 0,
            revision: 0,
            last_html: String::new(),
            max_normalize_iterations: config.max_normalize_iterations.max(1),
            passes: core_passes(),
        };
        region.replace_document(html::parse_document(html));
        region
    }

    pub fn doc(&self) -> &Document {
        &self.doc
    }

    /// Serialized content as of the last commit.
    pub fn html(&self) -> &str {
        &self.last_html
    }

    pub fn plain_text(&self) -> String {
        self.doc.text_content()
    }

    pub fn is_editable(&self) -> bool {
        self.editable
    }

    pub fn set_editable(&mut self, editable: bool) {
        self.editable = editable;
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    pub fn focus(&mut self) {
        self.focused = true;
    }

    pub fn blur(&mut self) {
        self.focused = false;
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    pub fn destroy(&mut self) {
        self.destroyed = true;
        self.focused = false;
        self.selection = None;
    }

    /// Bumped whenever the content is replaced wholesale.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Bumped on every committed transaction.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// The selection as last set, without validation.
    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    /// The selection if both ends still resolve inside the region.
    pub fn live_selection(&self) -> Option<Selection> {
        let selection = self.selection.as_ref()?;
        if self.destroyed
            || !self.doc.is_valid_point(&selection.anchor)
            || !self.doc.is_valid_point(&selection.focus)
        {
            return None;
        }
        Some(selection.clone())
    }

    pub fn set_selection(&mut self, selection: Option<Selection>) {
        self.selection = selection;
    }

    pub fn place_caret(&mut self, point: Point) {
        self.selection = Some(Selection::collapsed(point));
    }

    pub fn select_all(&mut self) {
        let start = Point::new(Vec::new(), 0);
        let end = Point::new(Vec::new(), self.doc.children.len());
        self.selection = Some(Selection::new(start, end));
    }

    /// Selects the first occurrence of `needle` in the region's text.
    pub fn select_text(&mut self, needle: &str) -> bool {
        let Some((start, end)) = self.find_text(needle) else {
            return false;
        };
        self.select_text_range(start, end)
    }

    /// Collapses the caret right after the first occurrence of `needle`.
    pub fn place_caret_after(&mut self, needle: &str) -> bool {
        let Some((_, end)) = self.find_text(needle) else {
            return false;
        };
        self.select_text_range(end, end)
    }

    /// Collapses the caret right before the first occurrence of `needle`.
    pub fn place_caret_before(&mut self, needle: &str) -> bool {
        let Some((start, _)) = self.find_text(needle) else {
            return false;
        };
        let leaves = edit::text_leaves(&self.doc);
        match edit::point_at_global(&leaves, start, edit::Bias::Forward) {
            Some(point) => {
                self.place_caret(point);
                true
            }
            None => false,
        }
    }

    fn find_text(&self, needle: &str) -> Option<(usize, usize)> {
        if needle.is_empty() {
            return None;
        }
        let start = self.doc.text_content().find(needle)?;
        Some((start, start + needle.len()))
    }

    pub fn select_text_range(&mut self, start: usize, end: usize) -> bool {
        match edit::selection_for_text_range(&self.doc, start, end) {
            Some(selection) => {
                self.selection = Some(selection);
                true
            }
            None => false,
        }
    }

    /// Collapsed point after the last child of the root.
    pub fn end_of_document(&self) -> Point {
        Point::new(Vec::new(), self.doc.children.len())
    }

    /// Applies a transaction to a scratch copy, normalizes, then commits both
    /// document and selection at once.
    pub fn apply(&mut self, tx: Transaction) -> Result<(), EditorError> {
        if self.destroyed {
            return Err(EditorError::RegionDestroyed);
        }
        let mut doc = self.doc.clone();
        let mut selection = self.selection.clone();

        for op in tx.ops {
            apply_op_to(&mut doc, &mut selection, op)?;
        }
        if let Some(sel) = tx.selection_after {
            selection = Some(sel);
        }
        self.normalize(&mut doc, &mut selection)?;

        self.doc = doc;
        self.selection = selection;
        self.revision += 1;
        self.last_html = html::serialize_document(&self.doc);
        tracing::trace!(
            source = tx.meta.source.as_deref().unwrap_or("unknown"),
            revision = self.revision,
            "applied transaction"
        );
        Ok(())
    }

    fn normalize(
        &self,
        doc: &mut Document,
        selection: &mut Option<Selection>,
    ) -> Result<(), EditorError> {
        for _ in 0..self.max_normalize_iterations {
            let mut changed = false;
            for pass in &self.passes {
                let ops = pass.run(doc);
                if ops.is_empty() {
                    continue;
                }
                changed = true;
                for op in ops {
                    apply_op_to(doc, selection, op)?;
                }
            }
            if !changed {
                return Ok(());
            }
        }
        Err(EditorError::NormalizeDidNotConverge)
    }

    /// Replaces the content. Starts a new epoch, so pending async work
    /// captured against the old content is rejected.
    pub fn load_html(&mut self, html: &str) {
        self.replace_document(html::parse_document(html));
    }

    fn replace_document(&mut self, mut doc: Document) {
        let mut selection = None;
        if let Err(err) = self.normalize(&mut doc, &mut selection) {
            tracing::warn!(error = %err, "loaded content did not normalize");
        }
        self.doc = doc;
        self.selection = None;
        self.epoch += 1;
        self.revision += 1;
        self.last_html = html::serialize_document(&self.doc);
    }

    /// Whether the empty-state placeholder shows (`data-empty`).
    pub fn placeholder_visible(&self) -> bool {
        !self.focused && self.doc.text_content().trim().is_empty()
    }

    pub fn word_count(&self) -> usize {
        self.doc.text_content().split_whitespace().count()
    }

    pub fn character_count(&self) -> usize {
        self.doc.text_content().chars().count()
    }
}

/// A saved selection together with the epoch it was captured in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionSnapshot {
    selection: Selection,
    epoch: u64,
}

impl SelectionSnapshot {
    /// `None` when the region has no usable selection.
    pub fn capture(region: &EditableRegion) -> Option<Self> {
        Some(Self {
            selection: region.live_selection()?,
            epoch: region.epoch(),
        })
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn is_collapsed(&self) -> bool {
        self.selection.is_collapsed()
    }

    /// Puts the snapshot back as the region's selection. A snapshot from an
    /// earlier epoch, or one that no longer resolves, is stale.
    pub fn restore(&self, region: &mut EditableRegion) -> Result<(), EditorError> {
        if region.is_destroyed() {
            return Err(EditorError::RegionDestroyed);
        }
        if region.epoch() != self.epoch
            || !region.doc().is_valid_point(&self.selection.anchor)
            || !region.doc().is_valid_point(&self.selection.focus)
        {
            return Err(EditorError::StaleSelection);
        }
        region.set_selection(Some(self.selection.clone()));
        Ok(())
    }
}
