// preprocess.rs — The deterministic pre-approval pipeline.
//
//   ChangeRequest ─ normalize ─▶ analyze ─▶ fingerprint ─▶ PreprocessedChange
//
// Every step is a pure function of the request, so the same request always
// produces the same PreprocessedChange (and the same change_id).

use serde::{Deserialize, Serialize};

use crate::analyze::{analyze_diff, DiffMetadata};
use crate::change_id::compute_change_id;
use crate::normalize::normalize_diff;
use crate::request::ChangeRequest;

/// A change that has been normalized, analyzed and fingerprinted, ready to
/// be shown to a human.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreprocessedChange {
    pub summary: String,
    /// The normalized diff.
    pub unified_diff: String,
    pub metadata: DiffMetadata,
}

impl PreprocessedChange {
    /// The fingerprint, if preprocessing assigned one.
    pub fn change_id(&self) -> Option<&str> {
        self.metadata.change_id.as_deref()
    }
}

/// Run the pipeline on a validated request.
pub fn preprocess_request(req: &ChangeRequest) -> PreprocessedChange {
    let diff = normalize_diff(req.unified_diff());
    let mut metadata = analyze_diff(&diff);
    let change_id = compute_change_id(req.summary(), &diff);
    tracing::info!(
        change_id = %change_id,
        files = metadata.num_files,
        parse_error = metadata.parse_error,
        "preprocessed change request"
    );
    metadata.change_id = Some(change_id);
    PreprocessedChange {
        summary: req.summary().to_string(),
        unified_diff: diff,
        metadata,
    }
}
