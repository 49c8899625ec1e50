// outcome.rs — Per-file results of applying a patch.
//
// Applying never aborts on a single file: each file gets a FileOutcome that
// says whether it was applied and, if not, why. ApplyDetails is what ends up
// in `apply_details.json`.

use serde::{Deserialize, Serialize};

/// What happened to a file that was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplyAction {
    Removed,
    AddedOrModified,
}

/// Why a file was not applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// Removal of a file that does not exist.
    FileNotFound,
    /// Reading, reconstructing or writing the file failed.
    HunkApplyError,
    /// No usable path could be derived for the file.
    CouldNotParsePath,
}

/// Result for a single file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileOutcome {
    pub path: String,
    pub applied: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<ApplyAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<FailureReason>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FileOutcome {
    pub fn applied(path: impl Into<String>, action: ApplyAction) -> Self {
        Self {
            path: path.into(),
            applied: true,
            action: Some(action),
            reason: None,
            error: None,
        }
    }

    pub fn failed(path: impl Into<String>, reason: FailureReason) -> Self {
        Self {
            path: path.into(),
            applied: false,
            action: None,
            reason: Some(reason),
            error: None,
        }
    }

    /// Attach the underlying error text.
    pub fn with_error(mut self, error: impl ToString) -> Self {
        self.error = Some(error.to_string());
        self
    }
}

/// Outcomes for every file in a patch, in patch order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyDetails {
    pub files: Vec<FileOutcome>,
    /// Set when the diff could not be parsed and only removals were attempted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_parse_error: Option<String>,
}

impl ApplyDetails {
    pub fn applied_count(&self) -> usize {
        self.files.iter().filter(|f| f.applied).count()
    }

    pub fn failed_count(&self) -> usize {
        self.files.len() - self.applied_count()
    }

    /// Paths whose outcome was a removal.
    pub fn removed_paths(&self) -> impl Iterator<Item = &str> {
        self.files
            .iter()
            .filter(|f| f.action == Some(ApplyAction::Removed))
            .map(|f| f.path.as_str())
    }
}
