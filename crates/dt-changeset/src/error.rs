// error.rs — Error types for the changeset subsystem.

use thiserror::Error;

/// Errors that can occur while constructing or handling change requests.
#[derive(Debug, Error)]
pub enum ChangeSetError {
    /// A request field failed validation. Nothing was processed.
    #[error("invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// Why a diff could not be parsed structurally.
///
/// This never escapes the analyzer: it is turned into `parse_error = true`
/// metadata so a reviewer always sees something.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {message}")]
pub struct ParseFailure {
    /// 1-based line number in the diff where parsing stopped.
    pub line: usize,
    pub message: String,
}

impl ParseFailure {
    pub(crate) fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}
