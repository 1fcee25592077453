//! JSON encoding for task payloads, error bodies and the on-disk task file.

use serde::{Deserialize, Serialize};

use crate::task::Task;

/// Error type for codec encode/decode operations.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Serialization or deserialization failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Error payload returned by the HTTP API: `{"error": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Human-readable failure reason.
    pub error: String,
}

impl ErrorBody {
    /// Creates an error body with the given message.
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// Top-level shape of a persisted task file: `{"tasks": [...]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskFile {
    /// All persisted tasks.
    #[serde(default)]
    pub tasks: Vec<Task>,
}

/// Encodes a task file as pretty-printed JSON.
///
/// # Errors
///
/// Returns [`CodecError::Json`] if serialization fails.
pub fn encode_file(file: &TaskFile) -> Result<String, CodecError> {
    Ok(serde_json::to_string_pretty(file)?)
}

/// Decodes a task file from JSON text.
///
/// # Errors
///
/// Returns [`CodecError::Json`] if the text is not a valid task file.
pub fn decode_file(text: &str) -> Result<TaskFile, CodecError> {
    Ok(serde_json::from_str(text)?)
}
