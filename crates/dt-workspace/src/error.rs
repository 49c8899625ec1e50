// error.rs — Error types for the workspace subsystem.
//
// Per-file apply failures are not errors: they are recorded in ApplyDetails.
// WorkspaceError covers the staging checkout itself (copy-in, copy-back,
// cleanup), where a failure means the apply cannot be trusted.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during workspace operations.
#[derive(Debug, Error)]
pub enum WorkspaceError {
    /// A file I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl WorkspaceError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        WorkspaceError::IoError {
            path: path.into(),
            source,
        }
    }
}
