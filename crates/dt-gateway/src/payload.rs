// payload.rs — Types exchanged with the protocol adapter around a review.

use std::path::PathBuf;

use dt_changeset::{ApplyDetails, DiffMetadata, PreprocessedChange};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::GatewayError;

/// What the human is asked to send back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ReviewResponse {
    /// `true` applies the change, `false` rejects it.
    pub approved: bool,
    /// Optional note recorded with the decision.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
}

impl ReviewResponse {
    /// JSON Schema the adapter forwards with the review request.
    pub fn schema() -> Result<serde_json::Value, GatewayError> {
        Ok(serde_json::to_value(schemars::schema_for!(ReviewResponse))?)
    }
}

/// Everything a reviewer needs to decide on a change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewPayload {
    /// Equal to the change id; pass it back to `resolve_review`.
    pub review_id: String,
    pub message: String,
    pub summary: String,
    pub unified_diff: String,
    pub metadata: DiffMetadata,
    pub elicitation_schema: serde_json::Value,
    pub reply_instructions: String,
}

impl ReviewPayload {
    pub(crate) fn new(
        review_id: &str,
        pre: &PreprocessedChange,
        elicitation_schema: serde_json::Value,
    ) -> Self {
        let files = pre.metadata.num_files;
        Self {
            review_id: review_id.to_string(),
            message: format!(
                "Please review change request id {review_id} ({files} file{}): {}",
                if files == 1 { "" } else { "s" },
                pre.summary
            ),
            summary: pre.summary.clone(),
            unified_diff: pre.unified_diff.clone(),
            metadata: pre.metadata.clone(),
            elicitation_schema,
            reply_instructions: format!(
                "Reply with review_id \"{review_id}\" and approved=true to apply the change, \
                 or approved=false to reject it. Optional feedback is archived with the decision."
            ),
        }
    }
}

/// Terminal state of a reviewed change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    Applied,
    Rejected,
}

/// Result of resolving a review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewOutcome {
    pub status: ReviewStatus,
    /// Archive entry for the change.
    pub archived_to: PathBuf,
    /// Per-file results; present only when the change was applied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apply_details: Option<ApplyDetails>,
}
