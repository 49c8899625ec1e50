//! # dt-workspace
//!
//! Applies parsed patches to directories.
//!
//! - [`apply_patch_set`] rebuilds each file from hunk data, positionally,
//!   recording a [`dt_changeset::FileOutcome`] per file.
//! - [`apply_removals_fallback`] handles diffs that do not parse: it only
//!   performs the removals it can find.
//! - [`StagingCheckout`] is the throwaway copy a patch is applied to before
//!   the result is copied back onto the live tree.

pub mod apply;
pub mod error;
pub mod staging;

pub use apply::{apply_patch_set, apply_removals_fallback, UNKNOWN_PATH};
pub use error::WorkspaceError;
pub use staging::{CopyBackReport, StagingCheckout};
