use serde::{Deserialize, Serialize};

pub const CAPTION_PLACEHOLDER: &str = "Add a caption (optional)...";

/// Labels offered by the font-size dropdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum FontSizeLabel {
    #[serde(rename = "small")]
    Small,
    #[default]
    #[serde(rename = "normal")]
    Normal,
    #[serde(rename = "normal+")]
    NormalPlus,
    #[serde(rename = "large")]
    Large,
}

impl FontSizeLabel {
    /// Maps a pixel size onto the label set. Fractions are dropped first, so
    /// 16.8px still reads as "normal".
    pub fn from_px(px: f32) -> Self {
        let px = px.trunc();
        if px <= 12.0 {
            FontSizeLabel::Small
        } else if px <= 16.0 {
            FontSizeLabel::Normal
        } else if px <= 18.0 {
            FontSizeLabel::NormalPlus
        } else {
            FontSizeLabel::Large
        }
    }

    pub fn from_legacy_size(size: u8) -> Self {
        match size {
            0..=2 => FontSizeLabel::Small,
            3 | 4 => FontSizeLabel::Normal,
            5 => FontSizeLabel::NormalPlus,
            _ => FontSizeLabel::Large,
        }
    }

    /// The `<font size>` value the dropdown option carries.
    pub fn legacy_size(self) -> u8 {
        match self {
            FontSizeLabel::Small => 2,
            FontSizeLabel::Normal => 4,
            FontSizeLabel::NormalPlus => 5,
            FontSizeLabel::Large => 6,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            FontSizeLabel::Small => "small",
            FontSizeLabel::Normal => "normal",
            FontSizeLabel::NormalPlus => "normal+",
            FontSizeLabel::Large => "large",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EnterBehavior {
    /// Enter outside a list inserts `<br><br>`.
    #[default]
    DoubleLineBreak,
    /// Enter outside a list is left to the host's paragraph split.
    Native,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub max_normalize_iterations: usize,
    pub base_font_px: f32,
    pub default_font_size: FontSizeLabel,
    pub resync_delay_ms: u64,
    pub initial_sync_delay_ms: u64,
    pub enter_behavior: EnterBehavior,
    pub caption_placeholder: String,
    pub link_target: String,
    pub default_scheme: String,
    pub table_rows: usize,
    pub table_cols: usize,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            max_normalize_iterations: 100,
            base_font_px: 16.0,
            default_font_size: FontSizeLabel::Normal,
            resync_delay_ms: 10,
            initial_sync_delay_ms: 100,
            enter_behavior: EnterBehavior::DoubleLineBreak,
            caption_placeholder: CAPTION_PLACEHOLDER.to_string(),
            link_target: "_blank".to_string(),
            default_scheme: "https://".to_string(),
            table_rows: 3,
            table_cols: 3,
        }
    }
}

impl EditorConfig {
    /// Repairs zero or blank values left by partial config files.
    pub fn with_defaults(mut self) -> Self {
        let defaults = EditorConfig::default();
        if self.max_normalize_iterations == 0 {
            self.max_normalize_iterations = defaults.max_normalize_iterations;
        }
        if self.base_font_px <= 0.0 || !self.base_font_px.is_finite() {
            self.base_font_px = defaults.base_font_px;
        }
        if self.caption_placeholder.trim().is_empty() {
            self.caption_placeholder = defaults.caption_placeholder;
        }
        if self.default_scheme.trim().is_empty() {
            self.default_scheme = defaults.default_scheme;
        }
        if self.table_rows == 0 {
            self.table_rows = defaults.table_rows;
        }
        if self.table_cols == 0 {
            self.table_cols = defaults.table_cols;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn px_thresholds_follow_label_scheme() {
        assert_eq!(FontSizeLabel::from_px(12.0), FontSizeLabel::Small);
        assert_eq!(FontSizeLabel::from_px(12.9), FontSizeLabel::Small);
        assert_eq!(FontSizeLabel::from_px(16.0), FontSizeLabel::Normal);
        assert_eq!(FontSizeLabel::from_px(17.0), FontSizeLabel::NormalPlus);
        assert_eq!(FontSizeLabel::from_px(18.0), FontSizeLabel::NormalPlus);
        assert_eq!(FontSizeLabel::from_px(20.0), FontSizeLabel::Large);
    }

    #[test]
    fn partial_config_is_repaired() {
        let config: EditorConfig =
            serde_json::from_str(r#"{"table_rows": 0, "enter_behavior": "native"}"#).unwrap();
        let config = config.with_defaults();
        assert_eq!(config.table_rows, 3);
        assert_eq!(config.enter_behavior, EnterBehavior::Native);
        assert_eq!(config.resync_delay_ms, 10);
    }
}
