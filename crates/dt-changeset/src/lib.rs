//! # dt-changeset
//!
//! The change pipeline's data model and deterministic preprocessing.
//!
//! An agent submits a [`ChangeRequest`] (summary + unified diff). The
//! pipeline normalizes the diff ([`normalize_diff`]), summarizes it for a
//! reviewer ([`analyze_diff`]) and fingerprints it ([`compute_change_id`]),
//! producing a [`PreprocessedChange`]. Parsing into a [`PatchSet`] is strict;
//! analysis falls back to heuristics instead of failing.
//!
//! [`ApplyDetails`] is the per-file result model shared by the applier and
//! the archive.

pub mod analyze;
pub mod change_id;
pub mod error;
pub mod normalize;
pub mod outcome;
pub mod patch;
pub mod preprocess;
pub mod request;

pub use analyze::{analyze_diff, parse_structured, summarize, DiffMetadata, FileSummary};
pub use change_id::{compute_change_id, CHANGE_ID_LEN};
pub use error::{ChangeSetError, ParseFailure};
pub use normalize::normalize_diff;
pub use outcome::{ApplyAction, ApplyDetails, FailureReason, FileOutcome};
pub use patch::{Hunk, HunkLine, LineKind, PatchSet, PatchedFile, DEV_NULL};
pub use preprocess::{preprocess_request, PreprocessedChange};
pub use request::ChangeRequest;
