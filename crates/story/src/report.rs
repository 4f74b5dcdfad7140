use anyhow::Result;
use freespace_editor::{ControlKind, RichTextEditor};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ControlState {
    pub command: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

/// What a reader of the page would see after one step.
#[derive(Debug, Serialize)]
pub struct StepReport {
    pub step: usize,
    pub action: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub controls: Vec<ControlState>,
    pub font_size: &'static str,
    pub field: String,
    pub words: usize,
    pub placeholder: bool,
}

impl StepReport {
    pub fn capture(
        step: usize,
        action: &'static str,
        note: Option<String>,
        editor: &RichTextEditor,
    ) -> Self {
        let controls = editor
            .toolbar()
            .controls()
            .iter()
            .map(|control| match control.kind {
                ControlKind::Toggle => ControlState {
                    command: control.command.clone(),
                    active: Some(control.active),
                    value: None,
                },
                ControlKind::Select => ControlState {
                    command: control.command.clone(),
                    active: None,
                    value: control.value.clone(),
                },
            })
            .collect();
        Self {
            step,
            action,
            note,
            controls,
            font_size: editor.last_font_size().label(),
            field: editor.field().value().to_string(),
            words: editor.word_count(),
            placeholder: editor.placeholder_visible(),
        }
    }

    pub fn print(&self, json: bool) -> Result<()> {
        if json {
            println!("{}", serde_json::to_string(self)?);
            return Ok(());
        }

        let active: Vec<&str> = self
            .controls
            .iter()
            .filter(|c| c.active == Some(true))
            .map(|c| c.command.as_str())
            .collect();
        let values: Vec<String> = self
            .controls
            .iter()
            .filter_map(|c| c.value.as_ref().map(|v| format!("{}={v}", c.command)))
            .collect();

        println!("#{} {}", self.step, self.action);
        if let Some(note) = &self.note {
            println!("  note:     {note}");
        }
        println!("  active:   [{}]", active.join(", "));
        println!("  values:   [{}] ({})", values.join(", "), self.font_size);
        println!("  field:    {}", self.field);
        Ok(())
    }
}
