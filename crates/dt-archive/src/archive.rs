// archive.rs — Fingerprint-keyed artifact directories.
//
// Layout, one directory per change id:
//
//   <archive_root>/<change_id>/
//     request.json         PreprocessedChange
//     diff.patch           normalized diff, verbatim
//     apply_details.json   ApplyDetails
//     decision.json        DecisionRecord
//     apply_summary.json   ApplySummary (approved changes only)
//
// Files are written or overwritten; entries are never deleted here.

use std::fs;
use std::path::{Path, PathBuf};

use dt_changeset::{ApplyDetails, PreprocessedChange};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::ArchiveError;
use crate::record::{ApplySummary, DecisionRecord};

pub const REQUEST_FILE: &str = "request.json";
pub const DIFF_FILE: &str = "diff.patch";
pub const APPLY_DETAILS_FILE: &str = "apply_details.json";
pub const DECISION_FILE: &str = "decision.json";
pub const APPLY_SUMMARY_FILE: &str = "apply_summary.json";

/// Root of the change archive.
#[derive(Debug, Clone)]
pub struct ChangeArchive {
    root: PathBuf,
}

impl ChangeArchive {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory for `change_id`. Does not create it.
    pub fn entry_dir(&self, change_id: &str) -> Result<PathBuf, ArchiveError> {
        let valid = !change_id.is_empty()
            && change_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(ArchiveError::InvalidChangeId(change_id.to_string()));
        }
        Ok(self.root.join(change_id))
    }

    /// Create the entry directory if needed and return it.
    pub fn ensure_entry(&self, change_id: &str) -> Result<PathBuf, ArchiveError> {
        let dir = self.entry_dir(change_id)?;
        fs::create_dir_all(&dir).map_err(|e| ArchiveError::io(&dir, e))?;
        Ok(dir)
    }

    pub fn write_request(
        &self,
        change_id: &str,
        pre: &PreprocessedChange,
    ) -> Result<PathBuf, ArchiveError> {
        self.write_json(change_id, REQUEST_FILE, pre)
    }

    pub fn write_diff(&self, change_id: &str, diff: &str) -> Result<PathBuf, ArchiveError> {
        let path = self.ensure_entry(change_id)?.join(DIFF_FILE);
        fs::write(&path, diff).map_err(|e| ArchiveError::io(&path, e))?;
        Ok(path)
    }

    pub fn write_apply_details(
        &self,
        change_id: &str,
        details: &ApplyDetails,
    ) -> Result<PathBuf, ArchiveError> {
        self.write_json(change_id, APPLY_DETAILS_FILE, details)
    }

    pub fn write_decision(
        &self,
        change_id: &str,
        decision: &DecisionRecord,
    ) -> Result<PathBuf, ArchiveError> {
        self.write_json(change_id, DECISION_FILE, decision)
    }

    pub fn write_apply_summary(
        &self,
        change_id: &str,
        summary: &ApplySummary,
    ) -> Result<PathBuf, ArchiveError> {
        self.write_json(change_id, APPLY_SUMMARY_FILE, summary)
    }

    pub fn read_request(&self, change_id: &str) -> Result<PreprocessedChange, ArchiveError> {
        self.read_json(change_id, REQUEST_FILE)
    }

    pub fn read_diff(&self, change_id: &str) -> Result<String, ArchiveError> {
        let path = self.entry_dir(change_id)?.join(DIFF_FILE);
        fs::read_to_string(&path).map_err(|e| ArchiveError::io(&path, e))
    }

    pub fn read_apply_details(&self, change_id: &str) -> Result<ApplyDetails, ArchiveError> {
        self.read_json(change_id, APPLY_DETAILS_FILE)
    }

    pub fn read_decision(&self, change_id: &str) -> Result<DecisionRecord, ArchiveError> {
        self.read_json(change_id, DECISION_FILE)
    }

    pub fn read_apply_summary(&self, change_id: &str) -> Result<ApplySummary, ArchiveError> {
        self.read_json(change_id, APPLY_SUMMARY_FILE)
    }

    fn write_json<T: Serialize>(
        &self,
        change_id: &str,
        name: &str,
        value: &T,
    ) -> Result<PathBuf, ArchiveError> {
        let path = self.ensure_entry(change_id)?.join(name);
        let json = serde_json::to_string_pretty(value)?;
        fs::write(&path, json).map_err(|e| ArchiveError::io(&path, e))?;
        tracing::debug!(change_id, file = name, "archived artifact");
        Ok(path)
    }

    fn read_json<T: DeserializeOwned>(&self, change_id: &str, name: &str) -> Result<T, ArchiveError> {
        let path = self.entry_dir(change_id)?.join(name);
        let json = fs::read_to_string(&path).map_err(|e| ArchiveError::io(&path, e))?;
        Ok(serde_json::from_str(&json)?)
    }
}
