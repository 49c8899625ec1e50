// error.rs — Error types for the archive subsystem.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while writing or reading archived artifacts.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// A file I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to serialize or deserialize an artifact (malformed JSON).
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The change id cannot be used as an archive directory name.
    #[error("invalid change id: '{0}'")]
    InvalidChangeId(String),

    /// The decision journal has been tampered with: hash chain is broken.
    #[error("integrity check failed at line {line}: expected hash {expected}, got {actual}")]
    IntegrityViolation {
        line: usize,
        expected: String,
        actual: String,
    },
}

impl ArchiveError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ArchiveError::IoError {
            path: path.into(),
            source,
        }
    }
}
