use serde::{Deserialize, Serialize};

use crate::config::{EditorConfig, EnterBehavior, FontSizeLabel};
use crate::deferred::{DeferredQueue, DeferredTask};
use crate::error::CommandError;
use crate::executor::{ImageReadTicket, LinkModal};
use crate::list_editor::{ListKey, ListKeyOutcome, ListStructureEditor};
use crate::persistence::{self, HiddenField};
use crate::plugin::{FormattingBackend, MarkupBackend};
use crate::region::EditableRegion;
use crate::toolbar::{ReconcileReport, Toolbar};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Key {
    Char(char),
    Tab,
    Enter,
    Backspace,
    Escape,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyInput {
    pub key: Key,
    #[serde(default)]
    pub ctrl: bool,
    #[serde(default)]
    pub meta: bool,
    #[serde(default)]
    pub shift: bool,
    #[serde(default)]
    pub alt: bool,
}

impl KeyInput {
    pub fn plain(key: Key) -> Self {
        Self {
            key,
            ctrl: false,
            meta: false,
            shift: false,
            alt: false,
        }
    }

    pub fn with_shift(mut self) -> Self {
        self.shift = true;
        self
    }

    pub fn with_ctrl(mut self) -> Self {
        self.ctrl = true;
        self
    }

    pub fn with_meta(mut self) -> Self {
        self.meta = true;
        self
    }

    /// Ctrl on most platforms, Cmd on macOS.
    pub fn is_shortcut(&self) -> bool {
        self.ctrl || self.meta
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClipboardItem {
    pub mime: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClipboardData {
    #[serde(default)]
    pub items: Vec<ClipboardItem>,
    #[serde(default)]
    pub text: Option<String>,
}

impl ClipboardData {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            items: vec![ClipboardItem {
                mime: "text/plain".to_string(),
            }],
            text: Some(text.into()),
        }
    }

    pub fn image(mime: impl Into<String>) -> Self {
        Self {
            items: vec![ClipboardItem { mime: mime.into() }],
            text: None,
        }
    }

    fn first_image(&self) -> Option<&ClipboardItem> {
        self.items.iter().find(|item| item.mime.starts_with("image/"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EditorEvent {
    Input,
    KeyUp,
    MouseUp,
    Focus,
    Blur,
    /// Document-wide; only acted on when the region holds focus.
    SelectionChange { region_is_active: bool },
    KeyDown(KeyInput),
    Paste(ClipboardData),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventOutcome {
    /// The host should run its default action.
    Continue,
    /// The editor handled the event; the default action is suppressed.
    Handled,
    /// A pasted image is being read; hand the data URL to
    /// `complete_image_insert` with this ticket.
    ImagePending(ImageReadTicket),
}

impl EventOutcome {
    pub fn default_prevented(&self) -> bool {
        !matches!(self, EventOutcome::Continue)
    }
}

/// One editor widget: its region, toolbar, form field and backend. Two
/// editors on a page are two values and never see each other.
pub struct RichTextEditor<B: FormattingBackend = MarkupBackend> {
    pub(crate) region: EditableRegion,
    pub(crate) backend: B,
    pub(crate) toolbar: Toolbar,
    pub(crate) field: HiddenField,
    pub(crate) config: EditorConfig,
    pub(crate) last_font_size: FontSizeLabel,
    pub(crate) link_modal: LinkModal,
    pub(crate) deferred: DeferredQueue,
    pub(crate) next_image_id: u64,
}

impl RichTextEditor<MarkupBackend> {
    /// Seeds the region from the hidden field's current value.
    pub fn new(hidden_value: &str) -> Self {
        Self::with_config(hidden_value, EditorConfig::default())
    }

    pub fn with_config(hidden_value: &str, config: EditorConfig) -> Self {
        Self::with_backend(hidden_value, config, MarkupBackend::default())
    }
}

impl<B: FormattingBackend> RichTextEditor<B> {
    pub fn with_backend(hidden_value: &str, config: EditorConfig, backend: B) -> Self {
        let config = config.with_defaults();
        let initial = if hidden_value.trim().is_empty() {
            ""
        } else {
            hidden_value
        };
        let region = EditableRegion::with_config(initial, &config);
        let mut deferred = DeferredQueue::default();
        deferred.schedule(config.initial_sync_delay_ms, DeferredTask::Resync);

        Self {
            region,
            backend,
            toolbar: Toolbar::standard(),
            field: HiddenField::new(hidden_value),
            last_font_size: config.default_font_size,
            config,
            link_modal: LinkModal::default(),
            deferred,
            next_image_id: 1,
        }
    }

    pub fn with_toolbar(mut self, toolbar: Toolbar) -> Self {
        self.toolbar = toolbar;
        self
    }

    pub fn region(&self) -> &EditableRegion {
        &self.region
    }

    /// Direct access for hosts that move the caret themselves.
    pub fn region_mut(&mut self) -> &mut EditableRegion {
        &mut self.region
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn toolbar(&self) -> &Toolbar {
        &self.toolbar
    }

    pub fn field(&self) -> &HiddenField {
        &self.field
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn last_font_size(&self) -> FontSizeLabel {
        self.last_font_size
    }

    pub fn link_modal(&self) -> &LinkModal {
        &self.link_modal
    }

    pub fn deferred(&self) -> &DeferredQueue {
        &self.deferred
    }

    pub fn handle_event(&mut self, event: EditorEvent) -> EventOutcome {
        if self.region.is_destroyed() {
            return EventOutcome::Continue;
        }
        match event {
            EditorEvent::Input => {
                self.after_mutation();
                EventOutcome::Continue
            }
            EditorEvent::KeyUp | EditorEvent::MouseUp => {
                self.reconcile();
                EventOutcome::Continue
            }
            EditorEvent::Focus => {
                self.region.focus();
                self.reconcile();
                EventOutcome::Continue
            }
            EditorEvent::Blur => {
                self.region.blur();
                EventOutcome::Continue
            }
            EditorEvent::SelectionChange { region_is_active } => {
                if region_is_active {
                    self.reconcile();
                }
                EventOutcome::Continue
            }
            EditorEvent::KeyDown(key) => self.key_down(key),
            EditorEvent::Paste(data) => self.paste(data),
        }
    }

    fn key_down(&mut self, input: KeyInput) -> EventOutcome {
        if input.is_shortcut() {
            let command = match input.key {
                Key::Char(c) => match c.to_ascii_lowercase() {
                    'b' => Some("bold"),
                    'i' => Some("italic"),
                    'u' => Some("underline"),
                    _ => None,
                },
                _ => None,
            };
            return match command {
                Some(command) => {
                    // Failures are logged by execute; the shortcut is still consumed.
                    let _ = self.execute(command, None);
                    EventOutcome::Handled
                }
                None => EventOutcome::Continue,
            };
        }

        let list_key = match input.key {
            Key::Tab if input.shift => ListKey::ShiftTab,
            Key::Tab => ListKey::Tab,
            Key::Enter if !input.shift => ListKey::Enter,
            Key::Backspace => ListKey::Backspace,
            _ => return EventOutcome::Continue,
        };

        let outcome = match ListStructureEditor::handle_key(&mut self.region, list_key) {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::warn!(key = ?list_key, error = %err, "list edit failed");
                return EventOutcome::Continue;
            }
        };
        match outcome {
            ListKeyOutcome::Handled => {
                self.after_mutation();
                EventOutcome::Handled
            }
            ListKeyOutcome::NativeThenResync => {
                self.deferred
                    .schedule(self.config.resync_delay_ms, DeferredTask::Resync);
                EventOutcome::Continue
            }
            ListKeyOutcome::NotInList
                if list_key == ListKey::Enter
                    && self.config.enter_behavior == EnterBehavior::DoubleLineBreak =>
            {
                self.region.focus();
                if let Err(err) = self
                    .backend
                    .apply(&mut self.region, "insertHTML", Some("<br><br>"))
                {
                    tracing::warn!(error = %err, "line break insertion rejected");
                }
                self.after_mutation();
                EventOutcome::Handled
            }
            ListKeyOutcome::Native | ListKeyOutcome::NotInList => EventOutcome::Continue,
        }
    }

    fn paste(&mut self, data: ClipboardData) -> EventOutcome {
        if let Some(item) = data.first_image() {
            let subtype = item.mime.trim_start_matches("image/").to_string();
            let millis = web_time::SystemTime::now()
                .duration_since(web_time::UNIX_EPOCH)
                .map(|d| d.as_millis())
                .unwrap_or_default();
            let file_name = format!("pasted-image-{millis}.{subtype}");
            return match self.begin_image_insert(&file_name, &item.mime) {
                Ok(ticket) => EventOutcome::ImagePending(ticket),
                Err(err) => {
                    tracing::warn!(error = %err, "pasted image rejected");
                    EventOutcome::Handled
                }
            };
        }

        // Formatting is dropped on purpose; only the plain text goes in.
        if let Some(text) = data.text.as_deref().filter(|text| !text.is_empty()) {
            self.region.focus();
            if let Err(err) = self.backend.apply(&mut self.region, "insertText", Some(text)) {
                tracing::warn!(error = %err, "paste rejected");
            }
        }
        self.after_mutation();
        EventOutcome::Handled
    }

    /// Emulates the host's default action for a key the editor let through,
    /// then fires the `input` that would follow it.
    pub fn perform_native_default(&mut self, input: KeyInput) -> Result<(), CommandError> {
        if self.region.is_destroyed() {
            return Err(CommandError::new("Editable region has been destroyed"));
        }
        let text;
        let (command, value) = match input.key {
            Key::Enter if input.shift => ("insertLineBreak", None),
            Key::Enter => ("insertParagraph", None),
            Key::Backspace => ("delete", None),
            Key::Char(c) if !input.is_shortcut() => {
                text = c.to_string();
                ("insertText", Some(text.as_str()))
            }
            _ => return Ok(()),
        };
        let result = self.backend.apply(&mut self.region, command, value);
        self.handle_event(EditorEvent::Input);
        result
    }

    /// Runs everything scheduled for the next tick. Returns how many tasks ran.
    pub fn run_deferred(&mut self) -> usize {
        let tasks = self.deferred.drain();
        for entry in &tasks {
            match entry.task {
                DeferredTask::Resync => {
                    if self.region.is_destroyed() {
                        continue;
                    }
                    tracing::debug!(delay_ms = entry.delay_ms, "deferred resync");
                    self.after_mutation();
                }
            }
        }
        tasks.len()
    }

    pub fn reconcile(&mut self) -> ReconcileReport {
        let report = self.toolbar.reconcile(
            &self.region,
            &self.backend,
            &mut self.last_font_size,
            self.config.base_font_px,
        );
        if !report.is_empty() {
            tracing::debug!(changed = report.changed.len(), "toolbar reconciled");
        }
        report
    }

    pub fn mirror(&mut self) -> bool {
        if self.region.is_destroyed() {
            return false;
        }
        self.field.mirror(&self.region)
    }

    /// Reconcile then mirror, the tail of every mutation.
    pub(crate) fn after_mutation(&mut self) {
        self.reconcile();
        self.mirror();
    }

    /// Cleans the mirrored markup for submission and stores it in the field.
    pub fn publish(&mut self) -> String {
        self.mirror();
        let cleaned =
            persistence::clean_for_publish(self.field.value(), &self.config.caption_placeholder);
        self.field.set_value(cleaned.clone());
        cleaned
    }

    /// Tears the region down. Pending async work is rejected from here on.
    pub fn destroy(&mut self) {
        self.region.destroy();
        self.deferred.drain();
        self.link_modal = LinkModal::default();
    }

    pub fn load_html(&mut self, html: &str) {
        self.region.load_html(html);
        self.after_mutation();
    }

    pub fn placeholder_visible(&self) -> bool {
        self.region.placeholder_visible()
    }

    pub fn word_count(&self) -> usize {
        self.region.word_count()
    }

    pub fn character_count(&self) -> usize {
        self.region.character_count()
    }

    pub fn to_html(&self) -> String {
        self.region.html().to_string()
    }

    pub fn to_plain_text(&self) -> String {
        self.region.plain_text()
    }
}
