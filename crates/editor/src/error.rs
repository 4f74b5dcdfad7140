use std::fmt;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathError(pub String);

impl fmt::Display for PathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandError {
    message: String,
}

impl CommandError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for CommandError {}

impl From<EditorError> for CommandError {
    fn from(value: EditorError) -> Self {
        match value {
            EditorError::Command(err) => err,
            other => CommandError::new(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryError {
    message: String,
}

impl QueryError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for QueryError {}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditorError {
    #[error("invalid path: {0}")]
    InvalidPath(String),
    #[error("normalization did not converge")]
    NormalizeDidNotConverge,
    #[error("selection snapshot no longer resolves in the editable region")]
    StaleSelection,
    #[error("editable region has been destroyed")]
    RegionDestroyed,
    #[error("mutation from epoch {ticket} rejected, region is at epoch {current}")]
    StaleMutation { ticket: u64, current: u64 },
    #[error("`{0}` is not an image payload")]
    NotAnImage(String),
    #[error(transparent)]
    Command(#[from] CommandError),
}

impl From<PathError> for EditorError {
    fn from(value: PathError) -> Self {
        EditorError::InvalidPath(value.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkField {
    Url,
    Text,
}

/// Rejected link submission; the flagged field gets the transient highlight.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("link {field:?} must not be empty")]
pub struct LinkError {
    pub field: LinkField,
}
