//! Toolbar controls and the reconciliation that keeps them in step with the
//! formatting at the selection.

use serde::{Deserialize, Serialize};

use crate::config::FontSizeLabel;
use crate::core::Node;
use crate::html;
use crate::inspector::SelectionInspector;
use crate::plugin::FormattingBackend;
use crate::region::EditableRegion;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlKind {
    /// A button that shows an active state.
    Toggle,
    /// A dropdown that shows the current value.
    Select,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolbarControl {
    pub command: String,
    pub kind: ControlKind,
    pub active: bool,
    pub value: Option<String>,
}

impl ToolbarControl {
    pub fn toggle(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            kind: ControlKind::Toggle,
            active: false,
            value: None,
        }
    }

    pub fn select(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            kind: ControlKind::Select,
            active: false,
            value: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormattingState {
    Flag(bool),
    Choice(Option<String>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlChange {
    pub command: String,
    pub state: FormattingState,
}

/// What one reconciliation pass wrote. Controls already showing the derived
/// state are left out.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileReport {
    pub changed: Vec<ControlChange>,
}

impl ReconcileReport {
    pub fn is_empty(&self) -> bool {
        self.changed.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Toolbar {
    controls: Vec<ToolbarControl>,
}

impl Toolbar {
    pub fn new(controls: Vec<ToolbarControl>) -> Self {
        Self { controls }
    }

    /// The stock set: inline marks, lists, quote, font size and block type.
    pub fn standard() -> Self {
        let toggles = [
            "bold",
            "italic",
            "underline",
            "strikeThrough",
            "insertOrderedList",
            "insertUnorderedList",
            "quote",
        ];
        let mut controls: Vec<ToolbarControl> =
            toggles.into_iter().map(ToolbarControl::toggle).collect();
        controls.push(ToolbarControl::select("fontSize"));
        controls.push(ToolbarControl::select("formatBlock"));
        Self::new(controls)
    }

    /// Reads controls from toolbar markup: every element with a
    /// `data-command` attribute, where `<select>` elements become dropdowns.
    pub fn discover(markup: &str) -> Self {
        fn walk(nodes: &[Node], out: &mut Vec<ToolbarControl>) {
            for node in nodes {
                let Node::Element(el) = node else {
                    continue;
                };
                if let Some(command) = el.attr("data-command") {
                    out.push(if el.tag == "select" {
                        ToolbarControl::select(command)
                    } else {
                        ToolbarControl::toggle(command)
                    });
                }
                walk(&el.children, out);
            }
        }

        let mut controls = Vec::new();
        walk(&html::parse_fragment(markup), &mut controls);
        Self::new(controls)
    }

    pub fn controls(&self) -> &[ToolbarControl] {
        &self.controls
    }

    pub fn control(&self, command: &str) -> Option<&ToolbarControl> {
        self.controls.iter().find(|c| c.command == command)
    }

    pub fn is_active(&self, command: &str) -> bool {
        self.control(command).is_some_and(|c| c.active)
    }

    pub fn value(&self, command: &str) -> Option<&str> {
        self.control(command).and_then(|c| c.value.as_deref())
    }

    /// Derives every control's state from the selection and writes only the
    /// ones that differ. `last_font_size` is read as the fallback and updated
    /// with whatever the font-size dropdown ends up showing.
    pub fn reconcile<B: FormattingBackend + ?Sized>(
        &mut self,
        region: &EditableRegion,
        backend: &B,
        last_font_size: &mut FontSizeLabel,
        base_font_px: f32,
    ) -> ReconcileReport {
        let inspector = SelectionInspector::new(region).base_font_px(base_font_px);
        let has_selection = inspector.selection().is_some();
        let mut report = ReconcileReport::default();

        for control in &mut self.controls {
            let state = match control.command.as_str() {
                "quote" | "blockquote" => {
                    FormattingState::Flag(inspector.closest_blockquote().is_some())
                }
                "fontSize" => {
                    let label = inspector.current_font_size_label(*last_font_size);
                    *last_font_size = label;
                    FormattingState::Choice(Some(label.legacy_size().to_string()))
                }
                "formatBlock" => FormattingState::Choice(
                    inspector.block_type().map(|block| block.command_value()),
                ),
                _ if !has_selection => FormattingState::Flag(false),
                command => match backend.query_state(region, command) {
                    Ok(state) => FormattingState::Flag(state),
                    Err(err) => {
                        tracing::debug!(command, error = %err, "state query failed");
                        FormattingState::Flag(false)
                    }
                },
            };

            let changed = match &state {
                FormattingState::Flag(active) => control.active != *active,
                FormattingState::Choice(value) => control.value != *value,
            };
            if !changed {
                continue;
            }
            match &state {
                FormattingState::Flag(active) => control.active = *active,
                FormattingState::Choice(value) => control.value = value.clone(),
            }
            report.changed.push(ControlChange {
                command: control.command.clone(),
                state,
            });
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discovery_finds_buttons_and_dropdowns() {
        let toolbar = Toolbar::discover(
            r#"<div><button data-command="bold">B</button><span>|</span><select data-command="fontSize"><option value="3">Normal</option></select></div>"#,
        );
        let kinds: Vec<_> = toolbar
            .controls()
            .iter()
            .map(|c| (c.command.as_str(), c.kind))
            .collect();
        assert_eq!(
            kinds,
            vec![("bold", ControlKind::Toggle), ("fontSize", ControlKind::Select)]
        );
    }
}
