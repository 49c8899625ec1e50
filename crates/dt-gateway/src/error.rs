// error.rs — Error types for the gateway.
//
// Only caller-contract violations and infrastructure failures end up here.
// Parse degradation and per-file apply failures are data, not errors.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during gateway operations.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// A required input was missing or malformed.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// No pending review exists for this id (never registered, already
    /// decided, or abandoned).
    #[error("unknown review id: {0}")]
    UnknownReview(String),

    /// A mutex guarding coordinator state was poisoned by a panic.
    #[error("lock poisoned: {0}")]
    LockPoisoned(String),

    /// The project config file could not be read or parsed.
    #[error("invalid config at {path}: {source}")]
    Config {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The change request failed validation.
    #[error("change request error: {0}")]
    ChangeSet(#[from] dt_changeset::ChangeSetError),

    /// A staging checkout operation failed.
    #[error("workspace error: {0}")]
    Workspace(#[from] dt_workspace::WorkspaceError),

    /// Writing to the archive or journal failed.
    #[error("archive error: {0}")]
    Archive(#[from] dt_archive::ArchiveError),

    /// Serialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl<T> From<std::sync::PoisonError<T>> for GatewayError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        GatewayError::LockPoisoned(e.to_string())
    }
}
