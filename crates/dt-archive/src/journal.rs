// journal.rs — Append-only, hash-chained decision journal.
//
// One JSON object per line. Each event carries the SHA-256 of the previous
// raw line in `previous_hash`, so inserting, removing or editing a line
// breaks the chain and `verify_chain` reports where.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ArchiveError;
use crate::hasher;

/// What happened to a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JournalAction {
    /// The change was registered as pending review.
    ReviewRegistered,
    /// A human approved the change.
    Approved,
    /// A human rejected the change.
    Rejected,
    /// The change was applied to the working tree.
    Applied,
    /// The pending review was dropped without a decision.
    Abandoned,
}

/// A single journal line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEvent {
    pub event_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub change_id: String,
    pub action: JournalAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<serde_json::Value>,
    /// Hash of the previous line; `None` for the first event.
    pub previous_hash: Option<String>,
}

impl JournalEvent {
    pub fn new(change_id: impl Into<String>, action: JournalAction) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            change_id: change_id.into(),
            action,
            detail: None,
            previous_hash: None,
        }
    }

    pub fn with_detail(mut self, detail: serde_json::Value) -> Self {
        self.detail = Some(detail);
        self
    }
}

/// Writer for the journal file.
pub struct DecisionJournal {
    writer: BufWriter<File>,
    path: PathBuf,
    last_hash: Option<String>,
}

impl DecisionJournal {
    /// Open (or create) the journal, recovering the chain head from any
    /// existing content.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ArchiveError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ArchiveError::io(parent, e))?;
        }

        let last_hash = if path.exists() {
            Self::read_last_hash(&path)?
        } else {
            None
        };

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| ArchiveError::io(&path, e))?;

        Ok(Self {
            writer: BufWriter::new(file),
            path,
            last_hash,
        })
    }

    /// Link `event` to the chain and append it. Flushes after every line.
    pub fn append(&mut self, event: &mut JournalEvent) -> Result<(), ArchiveError> {
        event.previous_hash = self.last_hash.clone();
        let json = serde_json::to_string(event)?;

        writeln!(self.writer, "{json}").map_err(|e| ArchiveError::io(&self.path, e))?;
        self.writer
            .flush()
            .map_err(|e| ArchiveError::io(&self.path, e))?;

        self.last_hash = Some(hasher::hash_str(&json));
        Ok(())
    }

    /// Convenience for `append` with a fresh event.
    pub fn record(
        &mut self,
        change_id: &str,
        action: JournalAction,
        detail: Option<serde_json::Value>,
    ) -> Result<(), ArchiveError> {
        let mut event = JournalEvent::new(change_id, action);
        event.detail = detail;
        self.append(&mut event)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All events, oldest first. Blank lines are skipped.
    pub fn read_all(path: impl AsRef<Path>) -> Result<Vec<JournalEvent>, ArchiveError> {
        let mut events = Vec::new();
        for (_, line) in Self::lines(path.as_ref())? {
            events.push(serde_json::from_str(&line)?);
        }
        Ok(events)
    }

    /// Check every `previous_hash` link. Returns `Ok(true)` for an intact
    /// chain and `IntegrityViolation` at the first broken link.
    pub fn verify_chain(path: impl AsRef<Path>) -> Result<bool, ArchiveError> {
        let mut previous_hash: Option<String> = None;

        for (line_no, line) in Self::lines(path.as_ref())? {
            let event: JournalEvent = serde_json::from_str(&line)?;
            if event.previous_hash != previous_hash {
                return Err(ArchiveError::IntegrityViolation {
                    line: line_no,
                    expected: previous_hash.unwrap_or_else(|| "None".to_string()),
                    actual: event.previous_hash.unwrap_or_else(|| "None".to_string()),
                });
            }
            // Hash the raw line; re-serializing could reorder fields.
            previous_hash = Some(hasher::hash_str(&line));
        }

        Ok(true)
    }

    fn read_last_hash(path: &Path) -> Result<Option<String>, ArchiveError> {
        Ok(Self::lines(path)?
            .pop()
            .map(|(_, line)| hasher::hash_str(&line)))
    }

    /// Non-blank lines with their 1-based line numbers.
    fn lines(path: &Path) -> Result<Vec<(usize, String)>, ArchiveError> {
        let file = File::open(path).map_err(|e| ArchiveError::io(path, e))?;
        let mut out = Vec::new();
        for (idx, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|e| ArchiveError::io(path, e))?;
            if !line.trim().is_empty() {
                out.push((idx + 1, line));
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn append_and_read_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("journal.jsonl");
        {
            let mut journal = DecisionJournal::open(&path).unwrap();
            journal
                .record("abc123def456", JournalAction::ReviewRegistered, None)
                .unwrap();
            let mut event = JournalEvent::new("abc123def456", JournalAction::Rejected)
                .with_detail(serde_json::json!({ "feedback": "not appropriate" }));
            journal.append(&mut event).unwrap();
        }

        let events = DecisionJournal::read_all(&path).unwrap();
        assert_eq!(events.len(), 2);
        assert!(events[0].previous_hash.is_none());
        assert!(events[1].previous_hash.is_some());
        assert_eq!(events[1].action, JournalAction::Rejected);
        assert_eq!(events[1].detail.as_ref().unwrap()["feedback"], "not appropriate");
    }

    #[test]
    fn chain_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/journal.jsonl");
        for action in [JournalAction::ReviewRegistered, JournalAction::Approved] {
            let mut journal = DecisionJournal::open(&path).unwrap();
            journal.record("abc123def456", action, None).unwrap();
        }
        assert!(DecisionJournal::verify_chain(&path).unwrap());
    }

    #[test]
    fn tampering_is_detected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("journal.jsonl");
        {
            let mut journal = DecisionJournal::open(&path).unwrap();
            for id in ["aaa", "bbb", "ccc"] {
                journal.record(id, JournalAction::Applied, None).unwrap();
            }
        }

        let text = fs::read_to_string(&path).unwrap();
        fs::write(&path, text.replacen("\"bbb\"", "\"zzz\"", 1)).unwrap();

        match DecisionJournal::verify_chain(&path) {
            Err(ArchiveError::IntegrityViolation { line, .. }) => assert_eq!(line, 3),
            other => panic!("expected integrity violation, got {other:?}"),
        }
    }
}
