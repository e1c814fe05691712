//! Error types for sqlshelf.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("File '{0}' already exists")]
    Duplicate(String),

    #[error("Invalid file name '{name}': {reason}")]
    InvalidFileName { name: String, reason: String },

    #[error("Upload exceeds the {limit} byte limit")]
    UploadTooLarge { limit: u64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cannot open database '{name}': {message}")]
    Open { name: String, message: String },

    #[error("No database selected")]
    NotSelected,

    #[error("Invalid index {index}: {count} database(s) available")]
    InvalidIndex { index: String, count: usize },

    #[error("No databases uploaded")]
    Empty,

    #[error("Statement rejected: {0}")]
    Rejected(String),

    #[error("Query failed: {0}")]
    Query(String),
}

impl CoreError {
    /// Stable tag for the transport layer.
    pub fn kind(&self) -> &'static str {
        match self {
            CoreError::Duplicate(_) => "duplicate",
            CoreError::InvalidFileName { .. } => "invalid_file_name",
            CoreError::UploadTooLarge { .. } => "upload_too_large",
            CoreError::Io(_) => "io",
            CoreError::Open { .. } => "open",
            CoreError::NotSelected => "not_selected",
            CoreError::InvalidIndex { .. } => "invalid_index",
            CoreError::Empty => "empty",
            CoreError::Rejected(_) => "rejected",
            CoreError::Query(_) => "query",
        }
    }

    /// Whether the user can fix this by changing their input.
    pub fn is_user_error(&self) -> bool {
        !matches!(self, CoreError::Io(_))
    }

    pub(crate) fn invalid_name(name: &str, reason: &str) -> Self {
        CoreError::InvalidFileName {
            name: name.to_string(),
            reason: reason.to_string(),
        }
    }
}
