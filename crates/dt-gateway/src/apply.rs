// apply.rs — Stage, apply, archive, copy back.
//
// The live tree is never patched directly. The repository is copied into a
// staging checkout, the patch is applied there, the artifacts are archived,
// and only then is the result copied back. Callers must serialize calls for
// the same repository (ReviewCoordinator holds a lock for this).

use std::path::PathBuf;

use dt_archive::ChangeArchive;
use dt_changeset::{compute_change_id, ApplyDetails, PatchSet, PreprocessedChange};
use dt_workspace::{apply_patch_set, apply_removals_fallback, StagingCheckout};
use serde::{Deserialize, Serialize};

use crate::config::GatewayConfig;
use crate::error::GatewayError;

/// Result of applying a preprocessed change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyResult {
    /// Processing completed; see `details` for per-file outcomes.
    pub applied: bool,
    /// Archive entry holding the request, diff and details.
    pub archived_to: PathBuf,
    pub details: ApplyDetails,
}

/// Apply `pre` to `config.repo_root` via a staging checkout and archive the
/// request, the diff and the per-file details.
pub fn apply_preprocessed_change(
    pre: &PreprocessedChange,
    config: &GatewayConfig,
) -> Result<ApplyResult, GatewayError> {
    let change_id = match pre.change_id() {
        Some(id) => id.to_string(),
        None => compute_change_id(&pre.summary, &pre.unified_diff),
    };
    let archive = ChangeArchive::new(&config.archive_root);
    let archived_to = archive.ensure_entry(&change_id)?;

    let checkout = StagingCheckout::create(
        &config.repo_root,
        &config.staging_root,
        &config.staging_excludes,
        &config.protected_paths(),
    )?;

    let (applied, details) = match PatchSet::parse(&pre.unified_diff) {
        Ok(patch) => apply_patch_set(&patch, checkout.path()),
        Err(failure) => (
            true,
            apply_removals_fallback(&pre.unified_diff, checkout.path(), &failure),
        ),
    };

    archive.write_request(&change_id, pre)?;
    archive.write_diff(&change_id, &pre.unified_diff)?;
    archive.write_apply_details(&change_id, &details)?;

    if applied {
        let report = checkout.copy_back(&details)?;
        tracing::info!(
            change_id = %change_id,
            applied = details.applied_count(),
            failed = details.failed_count(),
            written = report.written.len(),
            removed = report.removed.len(),
            "change applied"
        );
    }
    checkout.discard()?;

    Ok(ApplyResult {
        applied,
        archived_to,
        details,
    })
}
