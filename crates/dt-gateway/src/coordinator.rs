// coordinator.rs — Pending-review state machine.
//
//   preprocess ──▶ build_review_payload ──▶ pending ──resolve_review──▶ applied
//                                             │                    └──▶ rejected
//                                             └──abandon_review──▶ (dropped)
//
// The pending map is keyed by change id. A decision claims its entry by
// removing it under the map lock, so two decisions racing for the same id
// cannot both observe it. A decision that fails puts the entry back. Pending
// reviews live in memory only and are lost on restart.

use std::collections::HashMap;
use std::sync::Mutex;

use dt_archive::{ApplySummary, ChangeArchive, DecisionJournal, DecisionRecord, JournalAction};
use dt_changeset::{compute_change_id, preprocess_request, ChangeRequest, PreprocessedChange};

use crate::apply::{apply_preprocessed_change, ApplyResult};
use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::payload::{ReviewOutcome, ReviewPayload, ReviewResponse, ReviewStatus};

/// Coordinates preprocessing, human review and application of changes for
/// one repository.
///
/// All methods take `&self`; share it across threads behind an `Arc`.
pub struct ReviewCoordinator {
    config: GatewayConfig,
    archive: ChangeArchive,
    pending: Mutex<HashMap<String, PreprocessedChange>>,
    journal: Mutex<DecisionJournal>,
    /// Serializes stage/apply/copy-back against the repository.
    apply_lock: Mutex<()>,
}

impl ReviewCoordinator {
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        std::fs::create_dir_all(&config.archive_root).map_err(|source| GatewayError::Io {
            path: config.archive_root.clone(),
            source,
        })?;
        let journal = DecisionJournal::open(&config.journal_path)?;
        Ok(Self {
            archive: ChangeArchive::new(&config.archive_root),
            config,
            pending: Mutex::new(HashMap::new()),
            journal: Mutex::new(journal),
            apply_lock: Mutex::new(()),
        })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn archive(&self) -> &ChangeArchive {
        &self.archive
    }

    /// Validate an adapter payload (`{"summary", "unified_diff"}`) and run
    /// the preprocessing pipeline on it.
    pub fn preprocess(&self, payload: serde_json::Value) -> Result<PreprocessedChange, GatewayError> {
        let request = ChangeRequest::from_json(payload)?;
        Ok(preprocess_request(&request))
    }

    /// Register `pre` as pending review and build what the reviewer sees.
    ///
    /// Registering the same change id again replaces the earlier entry.
    pub fn build_review_payload(
        &self,
        pre: PreprocessedChange,
    ) -> Result<ReviewPayload, GatewayError> {
        let review_id = pre
            .change_id()
            .ok_or_else(|| {
                GatewayError::InvalidInput("preprocessed change has no metadata.change_id".into())
            })?
            .to_string();

        let payload = ReviewPayload::new(&review_id, &pre, ReviewResponse::schema()?);
        let replaced = self.pending.lock()?.insert(review_id.clone(), pre).is_some();
        self.record_event(&review_id, JournalAction::ReviewRegistered, None)?;

        tracing::info!(review_id = %review_id, replaced, "review registered");
        Ok(payload)
    }

    /// Handle the human's decision on a pending review.
    ///
    /// The decision is archived before anything else happens. A rejection
    /// leaves the working tree untouched; an approval applies the change
    /// through a staging checkout and archives an [`ApplySummary`].
    ///
    /// The entry is claimed under the map lock for the duration of the call.
    /// If any step fails it is put back, so the review can be resolved again.
    pub fn resolve_review(
        &self,
        review_id: &str,
        approved: bool,
        feedback: Option<String>,
    ) -> Result<ReviewOutcome, GatewayError> {
        let pre = self
            .pending
            .lock()?
            .remove(review_id)
            .ok_or_else(|| GatewayError::UnknownReview(review_id.to_string()))?;

        match self.decide(review_id, &pre, approved, feedback) {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                tracing::warn!(review_id, error = %e, "decision failed, review stays pending");
                self.pending
                    .lock()?
                    .entry(review_id.to_string())
                    .or_insert(pre);
                Err(e)
            }
        }
    }

    /// Apply a preprocessed change without a review round trip.
    pub fn apply_approved(&self, pre: &PreprocessedChange) -> Result<ApplyResult, GatewayError> {
        self.apply_locked(pre)
    }

    /// A registered change that has not been decided yet.
    pub fn pending_review(
        &self,
        change_id: &str,
    ) -> Result<Option<PreprocessedChange>, GatewayError> {
        Ok(self.pending.lock()?.get(change_id).cloned())
    }

    /// Ids of all pending reviews, sorted.
    pub fn pending_ids(&self) -> Result<Vec<String>, GatewayError> {
        let mut ids: Vec<String> = self.pending.lock()?.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }

    /// Drop a pending review without a decision (e.g. the reviewer never
    /// answered). Nothing is written to the archive entry.
    pub fn abandon_review(&self, review_id: &str) -> Result<PreprocessedChange, GatewayError> {
        let pre = self
            .pending
            .lock()?
            .remove(review_id)
            .ok_or_else(|| GatewayError::UnknownReview(review_id.to_string()))?;
        self.record_event(review_id, JournalAction::Abandoned, None)?;
        tracing::info!(review_id, "review abandoned");
        Ok(pre)
    }

    fn decide(
        &self,
        review_id: &str,
        pre: &PreprocessedChange,
        approved: bool,
        feedback: Option<String>,
    ) -> Result<ReviewOutcome, GatewayError> {
        let decision = DecisionRecord::new(review_id, approved, feedback);
        self.archive.write_decision(review_id, &decision)?;
        let action = if approved {
            JournalAction::Approved
        } else {
            JournalAction::Rejected
        };
        let detail = decision
            .feedback
            .as_ref()
            .map(|f| serde_json::json!({ "feedback": f }));
        self.record_event(review_id, action, detail)?;

        if !approved {
            tracing::info!(review_id, "review rejected");
            return Ok(ReviewOutcome {
                status: ReviewStatus::Rejected,
                archived_to: self.archive.entry_dir(review_id)?,
                apply_details: None,
            });
        }

        tracing::info!(review_id, "review approved, applying");
        let result = self.apply_locked(pre)?;
        let summary = ApplySummary::from_details(review_id, &pre.summary, &result.details);
        self.archive.write_apply_summary(review_id, &summary)?;

        Ok(ReviewOutcome {
            status: ReviewStatus::Applied,
            archived_to: result.archived_to,
            apply_details: Some(result.details),
        })
    }

    fn apply_locked(&self, pre: &PreprocessedChange) -> Result<ApplyResult, GatewayError> {
        let _guard = self.apply_lock.lock()?;
        let result = apply_preprocessed_change(pre, &self.config)?;

        let change_id = pre
            .change_id()
            .map(str::to_string)
            .unwrap_or_else(|| compute_change_id(&pre.summary, &pre.unified_diff));
        let detail = serde_json::json!({
            "applied": result.details.applied_count(),
            "failed": result.details.failed_count(),
        });
        // Not fatal: the tree has already changed.
        if let Err(e) = self.record_event(&change_id, JournalAction::Applied, Some(detail)) {
            tracing::error!(change_id = %change_id, error = %e, "failed to journal apply");
        }
        Ok(result)
    }

    fn record_event(
        &self,
        change_id: &str,
        action: JournalAction,
        detail: Option<serde_json::Value>,
    ) -> Result<(), GatewayError> {
        self.journal.lock()?.record(change_id, action, detail)?;
        Ok(())
    }
}
