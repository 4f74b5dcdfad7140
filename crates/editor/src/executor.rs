//! Explicit formatting commands and the insertion helpers layered on them.

use serde::{Deserialize, Serialize};

use crate::config::FontSizeLabel;
use crate::core::{Document, ElementNode, Node, Point, Selection, child_path};
use crate::edit;
use crate::editor::RichTextEditor;
use crate::error::{CommandError, EditorError, LinkError, LinkField};
use crate::html::{escape_attribute, escape_text};
use crate::inspector::SelectionInspector;
use crate::ops::{Op, Path, Transaction};
use crate::plugin::FormattingBackend;
use crate::plugins::{unwrap_blockquote, wrap_in_blockquote};
use crate::region::SelectionSnapshot;
use crate::style;

/// State of the link dialog between opening and submitting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkModal {
    pub open: bool,
    pub url: String,
    pub text: String,
    /// Whether the dialog edits a link that is already in the document.
    pub editing: bool,
    /// Field highlighted after a rejected submit.
    pub flagged: Option<LinkField>,
    #[serde(skip)]
    snapshot: Option<SelectionSnapshot>,
}

/// Handed out when an image read starts; redeemed when the data arrives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageReadTicket {
    pub id: u64,
    pub epoch: u64,
    pub file_name: String,
}

/// Adds a scheme to bare hosts. Anything that already names a scheme, or is
/// a relative reference, is left alone.
pub fn normalize_link_url(url: &str, default_scheme: &str) -> String {
    let url = url.trim();
    let has_scheme = url.split_once("://").is_some_and(|(scheme, _)| {
        !scheme.is_empty()
            && scheme
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
    });
    let lower = url.to_ascii_lowercase();
    let keep = has_scheme
        || lower.starts_with("mailto:")
        || lower.starts_with("tel:")
        || url.starts_with(['/', '#', '?']);
    if keep {
        url.to_string()
    } else {
        format!("{default_scheme}{url}")
    }
}

pub fn link_markup(href: &str, text: &str, target: &str) -> String {
    format!(
        r#"<a href="{}" target="{}" rel="noopener noreferrer">{}</a>"#,
        escape_attribute(href),
        escape_attribute(target),
        escape_text(text)
    )
}

/// Captioned image container. Edit mode adds the remove button and makes
/// the caption editable.
pub fn image_container_markup(
    image_id: &str,
    src: &str,
    file_name: &str,
    edit_mode: bool,
    caption_placeholder: &str,
) -> String {
    let id = escape_attribute(image_id);
    let remove_button = if edit_mode {
        format!(
            r#"<button type="button" class="remove-inline-image editor-only" data-remove-image="{id}" title="Remove image">×</button>"#
        )
    } else {
        String::new()
    };
    let caption_class = if edit_mode {
        "image-caption editable-caption"
    } else {
        "image-caption static-caption"
    };
    let caption_editable = if edit_mode {
        r#" contenteditable="true""#
    } else {
        ""
    };
    let placeholder = escape_attribute(caption_placeholder);
    format!(
        concat!(
            r#"<div class="inline-image-container" data-image-id="{id}">"#,
            r#"<div class="image-wrapper"><img src="{src}" alt="{alt}" class="inline-uploaded-image">{button}</div>"#,
            r#"<div class="image-caption-container"><div class="{class}"{editable} data-placeholder="{placeholder}"></div></div>"#,
            r#"</div>"#
        ),
        id = id,
        src = escape_attribute(src),
        alt = escape_attribute(file_name),
        button = remove_button,
        class = caption_class,
        editable = caption_editable,
        placeholder = placeholder,
    )
}

pub fn table_markup(rows: usize, cols: usize) -> String {
    let mut markup = String::from(r#"<table border="1">"#);
    for _ in 0..rows {
        markup.push_str("<tr>");
        for _ in 0..cols {
            markup.push_str("<td>&nbsp;</td>");
        }
        markup.push_str("</tr>");
    }
    markup.push_str("</table>");
    markup
}

impl<B: FormattingBackend> RichTextEditor<B> {
    /// Runs one formatting command. The toolbar is reconciled and the field
    /// mirrored afterwards whether or not the command succeeded, so the
    /// controls show what actually happened.
    pub fn execute(&mut self, command: &str, value: Option<&str>) -> Result<(), CommandError> {
        if self.region.is_destroyed() {
            return Err(CommandError::new("Editable region has been destroyed"));
        }
        self.region.focus();

        let result = match command {
            "quote" | "blockquote" => self.toggle_blockquote(),
            _ => self.backend.apply(&mut self.region, command, value),
        };
        if let Err(err) = &result {
            tracing::warn!(command, error = %err, "formatting command rejected");
        } else if command == "fontSize" {
            if let Some(size) = value.and_then(style::parse_legacy_size) {
                self.last_font_size = FontSizeLabel::from_legacy_size(size);
            }
        }
        self.after_mutation();
        result
    }

    fn toggle_blockquote(&mut self) -> Result<(), CommandError> {
        let quote = SelectionInspector::new(&self.region).closest_blockquote();
        match quote {
            Some(path) => unwrap_blockquote(&mut self.region, &path),
            None => wrap_in_blockquote(&mut self.region),
        }
    }

    pub fn increase_font_size(&mut self) -> Result<(), CommandError> {
        self.step_font_size(1)
    }

    pub fn decrease_font_size(&mut self) -> Result<(), CommandError> {
        self.step_font_size(-1)
    }

    fn step_font_size(&mut self, delta: i8) -> Result<(), CommandError> {
        let current = self
            .backend
            .query_value(&self.region, "fontSize")
            .ok()
            .flatten()
            .and_then(|value| style::parse_legacy_size(&value))
            .unwrap_or(3);
        let next = current.saturating_add_signed(delta).clamp(1, 7);
        self.execute("fontSize", Some(&next.to_string()))
    }

    /// Opens the link dialog. The selection is snapshotted so it survives
    /// the round trip; a link under the caret is selected whole and its
    /// values prefill the fields.
    pub fn open_link_modal(&mut self) -> &LinkModal {
        self.region.focus();
        let link = SelectionInspector::new(&self.region).selected_link();
        let mut modal = LinkModal {
            open: true,
            ..LinkModal::default()
        };

        let selected_text = self
            .region
            .live_selection()
            .map(|selection| edit::selected_text(self.region.doc(), &selection).trim().to_string())
            .unwrap_or_default();

        match link {
            // Caret or selection inside one link: edit that link in place.
            Some(link) if self.selection_within(&link.path) => {
                if let Some((&ix, parent)) = link.path.split_last() {
                    self.region.set_selection(Some(Selection::new(
                        Point::new(parent.to_vec(), ix),
                        Point::new(parent.to_vec(), ix + 1),
                    )));
                }
                modal.url = link.url;
                modal.text = link.text;
                modal.editing = true;
            }
            Some(link) => {
                modal.url = link.url;
                modal.text = selected_text;
            }
            None => modal.text = selected_text,
        }
        modal.snapshot = SelectionSnapshot::capture(&self.region);
        self.link_modal = modal;
        &self.link_modal
    }

    fn selection_within(&self, path: &[usize]) -> bool {
        self.region.live_selection().is_some_and(|selection| {
            selection.anchor.path.starts_with(path) && selection.focus.path.starts_with(path)
        })
    }

    /// Validates and inserts the link at the snapshotted selection, falling
    /// back to the end of the document.
    pub fn submit_link(&mut self, url: &str, text: &str) -> Result<(), LinkError> {
        let (url, text) = (url.trim(), text.trim());
        let empty = if url.is_empty() {
            Some(LinkField::Url)
        } else if text.is_empty() {
            Some(LinkField::Text)
        } else {
            None
        };
        if let Some(field) = empty {
            self.link_modal.flagged = Some(field);
            self.link_modal.url = url.to_string();
            self.link_modal.text = text.to_string();
            return Err(LinkError { field });
        }

        let href = normalize_link_url(url, &self.config.default_scheme);
        let markup = link_markup(&href, text, &self.config.link_target);

        self.region.focus();
        self.restore_link_selection();
        if let Err(err) = self
            .backend
            .apply(&mut self.region, "insertHTML", Some(&markup))
        {
            tracing::warn!(error = %err, "link insertion rejected");
        }
        self.link_modal = LinkModal::default();
        self.after_mutation();
        Ok(())
    }

    fn restore_link_selection(&mut self) {
        let restored = match self.link_modal.snapshot.take() {
            Some(snapshot) => match snapshot.restore(&mut self.region) {
                Ok(()) => true,
                Err(err) => {
                    tracing::warn!(error = %err, "link selection is stale, inserting at the end");
                    false
                }
            },
            None => false,
        };
        if !restored {
            let end = self.region.end_of_document();
            self.region.place_caret(end);
        }
    }

    /// Dismisses the dialog and puts the snapshotted selection back.
    pub fn close_link_modal(&mut self) {
        if let Some(snapshot) = self.link_modal.snapshot.take() {
            if let Err(err) = snapshot.restore(&mut self.region) {
                tracing::debug!(error = %err, "selection not restored on close");
            }
        }
        self.link_modal = LinkModal::default();
    }

    /// Starts an image insertion. The ticket records the region epoch so a
    /// read that finishes after the content was replaced is rejected.
    pub fn begin_image_insert(
        &mut self,
        file_name: &str,
        mime: &str,
    ) -> Result<ImageReadTicket, EditorError> {
        if self.region.is_destroyed() {
            return Err(EditorError::RegionDestroyed);
        }
        if !mime.starts_with("image/") {
            return Err(EditorError::NotAnImage(mime.to_string()));
        }
        let id = self.next_image_id;
        self.next_image_id += 1;
        Ok(ImageReadTicket {
            id,
            epoch: self.region.epoch(),
            file_name: file_name.to_string(),
        })
    }

    /// Inserts the image for a finished read and selects the caption
    /// placeholder. Returns the new image id.
    pub fn complete_image_insert(
        &mut self,
        ticket: &ImageReadTicket,
        data_url: &str,
    ) -> Result<String, EditorError> {
        if self.region.is_destroyed() {
            tracing::warn!(ticket = ticket.id, "image read finished after the region was destroyed");
            return Err(EditorError::RegionDestroyed);
        }
        let current = self.region.epoch();
        if ticket.epoch != current {
            tracing::warn!(ticket = ticket.id, ticket.epoch, current, "stale image read rejected");
            return Err(EditorError::StaleMutation {
                ticket: ticket.epoch,
                current,
            });
        }

        let image_id = format!("img-{}", ticket.id);
        let edit_mode = self.region.is_editable();
        let container = image_container_markup(
            &image_id,
            data_url,
            &ticket.file_name,
            edit_mode,
            &self.config.caption_placeholder,
        );
        self.region.focus();

        // Never nest the image inside a link: it goes in its own block just
        // before the link.
        let link = SelectionInspector::new(&self.region).closest_link();
        let markup = match link.as_deref().and_then(|path| path.split_last()) {
            Some((&ix, parent)) => {
                self.region.place_caret(Point::new(parent.to_vec(), ix));
                format!("<div>{container}</div>")
            }
            None => format!("{container}<div><br></div>"),
        };
        let inserted = self
            .backend
            .apply(&mut self.region, "insertHTML", Some(&markup))
            .map_err(EditorError::from)
            .and_then(|()| {
                if edit_mode {
                    self.fill_caption_placeholder(&image_id)
                } else {
                    Ok(())
                }
            });
        if let Err(err) = &inserted {
            tracing::warn!(ticket = ticket.id, error = %err, "image insertion rejected");
        }
        self.after_mutation();
        inserted.map(|()| image_id)
    }

    fn fill_caption_placeholder(&mut self, image_id: &str) -> Result<(), EditorError> {
        let caption = find_in_image(self.region.doc(), image_id, |el| el.has_class("image-caption"));
        let Some(caption) = caption else {
            return Ok(());
        };
        let leaf = child_path(&caption, 0);
        let placeholder = self.config.caption_placeholder.clone();
        let len = placeholder.len();
        let tx = Transaction::new(vec![Op::InsertNode {
            path: leaf.clone(),
            node: Node::text(placeholder),
        }])
        .selection_after(Selection::new(Point::new(leaf.clone(), 0), Point::new(leaf, len)))
        .source("image.caption");
        self.region.apply(tx)
    }

    /// Removes an image container and the spacer line after it.
    pub fn remove_inline_image(&mut self, image_id: &str) -> bool {
        let Some(path) = find_image_container(self.region.doc(), image_id) else {
            return false;
        };
        let Some((&ix, parent)) = path.split_last() else {
            return false;
        };
        let spacer = child_path(parent, ix + 1);
        let mut ops = Vec::new();
        let is_spacer = self.region.doc().element(&spacer).is_some_and(|el| {
            el.tag == "div" && el.children.len() == 1 && el.children[0].is_tag("br")
        });
        if is_spacer {
            ops.push(Op::RemoveNode { path: spacer });
        }
        ops.push(Op::RemoveNode { path });
        if let Err(err) = self
            .region
            .apply(Transaction::new(ops).source("image.remove"))
        {
            tracing::warn!(image_id, error = %err, "image removal failed");
            return false;
        }
        self.region.focus();
        self.after_mutation();
        true
    }

    pub fn insert_table(&mut self, rows: usize, cols: usize) -> Result<(), CommandError> {
        let rows = if rows == 0 { self.config.table_rows } else { rows };
        let cols = if cols == 0 { self.config.table_cols } else { cols };
        self.execute("insertHTML", Some(&table_markup(rows, cols)))
    }
}

fn find_image_container(doc: &Document, image_id: &str) -> Option<Path> {
    fn walk(nodes: &[Node], path: &mut Vec<usize>, image_id: &str) -> Option<Path> {
        for (ix, node) in nodes.iter().enumerate() {
            let Node::Element(el) = node else {
                continue;
            };
            path.push(ix);
            if el.has_class("inline-image-container") && el.attr("data-image-id") == Some(image_id)
            {
                return Some(path.clone());
            }
            if let Some(found) = walk(&el.children, path, image_id) {
                return Some(found);
            }
            path.pop();
        }
        None
    }
    walk(&doc.children, &mut Vec::new(), image_id)
}

/// First element matching `predicate` inside the image container `image_id`.
fn find_in_image(
    doc: &Document,
    image_id: &str,
    predicate: impl Fn(&ElementNode) -> bool,
) -> Option<Path> {
    let container = find_image_container(doc, image_id)?;
    let mut stack = vec![container];
    while let Some(path) = stack.pop() {
        let el = doc.element(&path)?;
        if predicate(el) {
            return Some(path);
        }
        for (ix, _) in el.element_children().collect::<Vec<_>>().into_iter().rev() {
            stack.push(child_path(&path, ix));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_hosts_get_a_scheme() {
        assert_eq!(normalize_link_url("example.com", "https://"), "https://example.com");
        assert_eq!(normalize_link_url("http://a.b", "https://"), "http://a.b");
        assert_eq!(normalize_link_url("mailto:x@y.z", "https://"), "mailto:x@y.z");
        assert_eq!(normalize_link_url("/about", "https://"), "/about");
    }

    #[test]
    fn link_values_are_escaped() {
        assert_eq!(
            link_markup("https://a.b/?x=1&y=\"2\"", "<b>", "_blank"),
            r#"<a href="https://a.b/?x=1&amp;y=&quot;2&quot;" target="_blank" rel="noopener noreferrer">&lt;b&gt;</a>"#
        );
    }

    #[test]
    fn tables_hold_nbsp_cells() {
        assert_eq!(
            table_markup(1, 2),
            r#"<table border="1"><tr><td>&nbsp;</td><td>&nbsp;</td></tr></table>"#
        );
    }
}
