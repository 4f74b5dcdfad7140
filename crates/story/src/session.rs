use std::path::Path;

use anyhow::{Context as _, Result, anyhow, bail};
use freespace_editor::{EditorEvent, EventOutcome, KeyInput, RichTextEditor};
use serde::Deserialize;

/// A scripted editing session: starting markup plus the steps to replay.
#[derive(Debug, Deserialize)]
pub struct Session {
    #[serde(default)]
    pub initial: String,
    pub steps: Vec<Step>,
}

impl Session {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading session {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("parsing session {}", path.display()))
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    SelectAll,
    SelectText {
        text: String,
    },
    CaretAfter {
        text: String,
    },
    CaretBefore {
        text: String,
    },
    /// Dispatches an event the way the host would, then emulates the
    /// default action for key presses the editor let through.
    Event {
        event: EditorEvent,
    },
    /// Key down, default action, key up.
    Press {
        key: KeyInput,
    },
    Type {
        text: String,
    },
    Execute {
        command: String,
        #[serde(default)]
        value: Option<String>,
    },
    FontSize {
        delta: i8,
    },
    Link {
        url: String,
        text: String,
    },
    Image {
        file_name: String,
        #[serde(default = "default_mime")]
        mime: String,
        data_url: String,
    },
    RemoveImage {
        id: String,
    },
    Table {
        #[serde(default)]
        rows: usize,
        #[serde(default)]
        cols: usize,
    },
    Load {
        html: String,
    },
    Tick,
}

fn default_mime() -> String {
    "image/png".to_string()
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Step::SelectAll => "select_all",
            Step::SelectText { .. } => "select_text",
            Step::CaretAfter { .. } => "caret_after",
            Step::CaretBefore { .. } => "caret_before",
            Step::Event { .. } => "event",
            Step::Press { .. } => "press",
            Step::Type { .. } => "type",
            Step::Execute { .. } => "execute",
            Step::FontSize { .. } => "font_size",
            Step::Link { .. } => "link",
            Step::Image { .. } => "image",
            Step::RemoveImage { .. } => "remove_image",
            Step::Table { .. } => "table",
            Step::Load { .. } => "load",
            Step::Tick => "tick",
        }
    }
}

fn require(found: bool, what: &str, text: &str) -> Result<()> {
    if !found {
        bail!("{what}: `{text}` not found in the region");
    }
    Ok(())
}

/// Runs one step. Returns a short note for the report when the step has
/// something to say beyond the resulting state.
pub fn run_step(editor: &mut RichTextEditor, step: &Step) -> Result<Option<String>> {
    match step {
        Step::SelectAll => {
            editor.region_mut().select_all();
            editor.handle_event(EditorEvent::MouseUp);
        }
        Step::SelectText { text } => {
            require(editor.region_mut().select_text(text), "select_text", text)?;
            editor.handle_event(EditorEvent::MouseUp);
        }
        Step::CaretAfter { text } => {
            require(editor.region_mut().place_caret_after(text), "caret_after", text)?;
            editor.handle_event(EditorEvent::MouseUp);
        }
        Step::CaretBefore { text } => {
            require(editor.region_mut().place_caret_before(text), "caret_before", text)?;
            editor.handle_event(EditorEvent::MouseUp);
        }
        Step::Event { event } => return dispatch(editor, event.clone()),
        Step::Press { key } => {
            let note = dispatch(editor, EditorEvent::KeyDown(*key))?;
            editor.handle_event(EditorEvent::KeyUp);
            return Ok(note);
        }
        Step::Type { text } => {
            for c in text.chars() {
                let key = KeyInput::plain(freespace_editor::Key::Char(c));
                dispatch(editor, EditorEvent::KeyDown(key))?;
            }
            editor.handle_event(EditorEvent::KeyUp);
        }
        Step::Execute { command, value } => {
            editor.execute(command, value.as_deref())?;
        }
        Step::FontSize { delta } => {
            for _ in 0..delta.unsigned_abs() {
                if *delta > 0 {
                    editor.increase_font_size()?;
                } else {
                    editor.decrease_font_size()?;
                }
            }
        }
        Step::Link { url, text } => {
            let modal = editor.open_link_modal();
            let prefill = format!("prefill url={:?} text={:?}", modal.url, modal.text);
            if let Err(err) = editor.submit_link(url, text) {
                editor.close_link_modal();
                return Ok(Some(format!("{prefill}; rejected: {err}")));
            }
            return Ok(Some(prefill));
        }
        Step::Image {
            file_name,
            mime,
            data_url,
        } => {
            let ticket = editor.begin_image_insert(file_name, mime)?;
            let id = editor.complete_image_insert(&ticket, data_url)?;
            return Ok(Some(format!("inserted {id}")));
        }
        Step::RemoveImage { id } => {
            if !editor.remove_inline_image(id) {
                return Err(anyhow!("no image with id `{id}`"));
            }
        }
        Step::Table { rows, cols } => {
            editor.insert_table(*rows, *cols)?;
        }
        Step::Load { html } => editor.load_html(html),
        Step::Tick => {
            let ran = editor.run_deferred();
            return Ok(Some(format!("{ran} deferred task(s)")));
        }
    }
    Ok(None)
}

fn dispatch(editor: &mut RichTextEditor, event: EditorEvent) -> Result<Option<String>> {
    let key = match &event {
        EditorEvent::KeyDown(key) => Some(*key),
        _ => None,
    };
    match editor.handle_event(event) {
        EventOutcome::Continue => {
            if let Some(key) = key {
                editor.perform_native_default(key)?;
            }
            Ok(None)
        }
        EventOutcome::Handled => Ok(Some("default prevented".to_string())),
        EventOutcome::ImagePending(ticket) => Ok(Some(format!(
            "image read pending: {} (ticket {})",
            ticket.file_name, ticket.id
        ))),
    }
}
