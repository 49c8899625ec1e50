//! # dt-archive
//!
//! Persistent audit trail for change requests.
//!
//! - [`ChangeArchive`] keeps one directory per change id holding the
//!   request, the normalized diff, apply details, the human decision and,
//!   for approved changes, an [`ApplySummary`].
//! - [`DecisionJournal`] is an append-only JSONL log of every registration,
//!   decision, apply and abandonment, hash-chained for tamper detection.

pub mod archive;
pub mod error;
pub mod hasher;
pub mod journal;
pub mod record;

pub use archive::{
    ChangeArchive, APPLY_DETAILS_FILE, APPLY_SUMMARY_FILE, DECISION_FILE, DIFF_FILE, REQUEST_FILE,
};
pub use error::ArchiveError;
pub use journal::{DecisionJournal, JournalAction, JournalEvent};
pub use record::{ApplySummary, DecisionRecord};
