// record.rs — Records written alongside an archived change.

use chrono::{DateTime, Utc};
use dt_changeset::ApplyDetails;
use serde::{Deserialize, Serialize};

/// A human's decision on a pending review (`decision.json`).
///
/// Written before any apply step runs, so a crash mid-apply still leaves the
/// decision on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub review_id: String,
    pub approved: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
    pub decided_at: DateTime<Utc>,
}

impl DecisionRecord {
    pub fn new(review_id: impl Into<String>, approved: bool, feedback: Option<String>) -> Self {
        Self {
            review_id: review_id.into(),
            approved,
            feedback,
            decided_at: Utc::now(),
        }
    }
}

/// Totals for an approved change (`apply_summary.json`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplySummary {
    pub change_id: String,
    pub summary: String,
    pub files_applied: usize,
    pub files_failed: usize,
    pub applied_at: DateTime<Utc>,
}

impl ApplySummary {
    pub fn from_details(
        change_id: impl Into<String>,
        summary: impl Into<String>,
        details: &ApplyDetails,
    ) -> Self {
        Self {
            change_id: change_id.into(),
            summary: summary.into(),
            files_applied: details.applied_count(),
            files_failed: details.failed_count(),
            applied_at: Utc::now(),
        }
    }
}
