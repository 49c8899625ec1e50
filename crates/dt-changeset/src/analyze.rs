// analyze.rs — Structural metadata about a diff, for human reviewers.
//
// `analyze_diff` never fails. It first tries a structural parse; if that
// fails it falls back to counting well-known markers in the raw text. The
// fallback is deliberately crude but deterministic, and flags itself with
// `parse_error = true` so nobody mistakes it for the real thing.

use serde::{Deserialize, Serialize};

use crate::error::ParseFailure;
use crate::patch::PatchSet;

/// Per-file summary shown to reviewers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSummary {
    pub path: String,
    pub is_new: bool,
    pub is_deleted: bool,
    pub hunks: usize,
}

/// Metadata attached to every preprocessed change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffMetadata {
    pub num_files: usize,
    pub files: Vec<FileSummary>,
    pub adds: usize,
    pub deletes: usize,
    pub modifies: usize,
    /// True when the counts come from the heuristic fallback.
    pub parse_error: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_parse_error: Option<String>,
    /// Content fingerprint; filled in by preprocessing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_id: Option<String>,
}

/// Parse the diff structurally and summarize it.
pub fn parse_structured(diff: &str) -> Result<DiffMetadata, ParseFailure> {
    let patch = PatchSet::parse(diff)?;
    Ok(summarize(&patch))
}

/// Summarize an already-parsed patch set.
pub fn summarize(patch: &PatchSet) -> DiffMetadata {
    let mut meta = DiffMetadata::default();
    for file in &patch.files {
        let is_new = file.is_added_file();
        let is_deleted = file.is_removed_file();
        if is_new {
            meta.adds += 1;
        } else if is_deleted {
            meta.deletes += 1;
        } else {
            meta.modifies += 1;
        }
        meta.files.push(FileSummary {
            path: file.path().to_string(),
            is_new,
            is_deleted,
            hunks: file.hunks.len(),
        });
    }
    meta.num_files = meta.files.len();
    meta
}

/// Metadata for any text. Falls back to heuristics when parsing fails.
pub fn analyze_diff(diff: &str) -> DiffMetadata {
    match parse_structured(diff) {
        Ok(meta) => meta,
        Err(failure) => {
            tracing::warn!(error = %failure, "diff did not parse, using heuristic metadata");
            heuristic_metadata(diff, &failure)
        }
    }
}

/// Marker-counting approximation used when the structural parse fails.
fn heuristic_metadata(diff: &str, failure: &ParseFailure) -> DiffMetadata {
    let adds = diff.matches("+++ b/").count() + diff.matches("+++ ").count();
    let deletes = diff.matches("/dev/null").count() + diff.matches("deleted file mode").count();
    let modifies = diff
        .matches("diff --git")
        .count()
        .saturating_sub(adds)
        .saturating_sub(deletes);

    let files: Vec<FileSummary> = diff
        .lines()
        .filter(|line| line.starts_with("diff --git"))
        .filter_map(|line| {
            let parts: Vec<&str> = line.split_whitespace().collect();
            (parts.len() >= 3).then(|| FileSummary {
                path: parts[parts.len() - 1].to_string(),
                is_new: false,
                is_deleted: false,
                hunks: 0,
            })
        })
        .collect();

    DiffMetadata {
        num_files: files.len(),
        files,
        adds,
        deletes,
        modifies,
        parse_error: true,
        raw_parse_error: Some(failure.to_string()),
        change_id: None,
    }
}
