// request.rs — The change request an agent submits.
//
// A ChangeRequest is immutable once constructed and is always validated:
// both `ChangeRequest::new` and deserialization go through the same checks,
// so an adapter handing us raw JSON cannot smuggle in a malformed request.

use serde::{Deserialize, Serialize};

use crate::error::ChangeSetError;

/// Minimum summary length, in characters.
pub const SUMMARY_MIN_CHARS: usize = 10;

/// Maximum summary length, in characters.
pub const SUMMARY_MAX_CHARS: usize = 2000;

/// Header prefixes a unified diff may start with (after leading whitespace).
const DIFF_HEADERS: &[&str] = &["diff --git", "--- ", "*** "];

/// A request to change files, described by a summary and a unified diff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawChangeRequest")]
pub struct ChangeRequest {
    summary: String,
    unified_diff: String,
}

/// Unvalidated wire form of a [`ChangeRequest`].
#[derive(Deserialize)]
struct RawChangeRequest {
    summary: String,
    unified_diff: String,
}

impl TryFrom<RawChangeRequest> for ChangeRequest {
    type Error = ChangeSetError;

    fn try_from(raw: RawChangeRequest) -> Result<Self, Self::Error> {
        ChangeRequest::new(raw.summary, raw.unified_diff)
    }
}

impl ChangeRequest {
    /// Validate and build a change request.
    ///
    /// The summary must be 10–2000 characters and not blank; the diff must be
    /// non-empty and start with `diff --git`, `--- ` or `*** `.
    pub fn new(
        summary: impl Into<String>,
        unified_diff: impl Into<String>,
    ) -> Result<Self, ChangeSetError> {
        let summary = summary.into();
        let unified_diff = unified_diff.into();
        validate_summary(&summary)?;
        validate_diff(&unified_diff)?;
        Ok(Self {
            summary,
            unified_diff,
        })
    }

    /// Build a request from an adapter payload (`{"summary": .., "unified_diff": ..}`).
    pub fn from_json(payload: serde_json::Value) -> Result<Self, ChangeSetError> {
        Ok(serde_json::from_value(payload)?)
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    pub fn unified_diff(&self) -> &str {
        &self.unified_diff
    }
}

fn validate_summary(summary: &str) -> Result<(), ChangeSetError> {
    let chars = summary.chars().count();
    if chars < SUMMARY_MIN_CHARS {
        return Err(ChangeSetError::Validation {
            field: "summary",
            reason: format!("must be at least {SUMMARY_MIN_CHARS} characters, got {chars}"),
        });
    }
    if chars > SUMMARY_MAX_CHARS {
        return Err(ChangeSetError::Validation {
            field: "summary",
            reason: format!("must be at most {SUMMARY_MAX_CHARS} characters, got {chars}"),
        });
    }
    if summary.trim().is_empty() {
        return Err(ChangeSetError::Validation {
            field: "summary",
            reason: "must not be blank".to_string(),
        });
    }
    Ok(())
}

fn validate_diff(diff: &str) -> Result<(), ChangeSetError> {
    if diff.is_empty() {
        return Err(ChangeSetError::Validation {
            field: "unified_diff",
            reason: "must not be empty".to_string(),
        });
    }
    let start = diff.trim_start();
    if !DIFF_HEADERS.iter().any(|header| start.starts_with(header)) {
        return Err(ChangeSetError::Validation {
            field: "unified_diff",
            reason: "does not look like a unified diff".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIFF: &str = "--- a/x.txt\n+++ b/x.txt\n@@ -1 +1 @@\n-a\n+b\n";

    #[test]
    fn accepts_well_formed_request() {
        let req = ChangeRequest::new("Rename the greeting", DIFF).unwrap();
        assert_eq!(req.summary(), "Rename the greeting");
        assert_eq!(req.unified_diff(), DIFF);
    }

    #[test]
    fn rejects_non_diff_text() {
        let err = ChangeRequest::new("short but valid", "this is not a diff").unwrap_err();
        assert!(matches!(
            err,
            ChangeSetError::Validation {
                field: "unified_diff",
                ..
            }
        ));
    }

    #[test]
    fn accepts_leading_whitespace_before_header() {
        assert!(ChangeRequest::new("Indented diff header", "\n  diff --git a/x b/x\n").is_ok());
        assert!(ChangeRequest::new("Context dialect diff", "*** a.txt\n--- b.txt\n").is_ok());
    }

    #[test]
    fn rejects_short_long_and_blank_summaries() {
        assert!(ChangeRequest::new("too short", DIFF).is_err());
        assert!(ChangeRequest::new("x".repeat(SUMMARY_MAX_CHARS + 1), DIFF).is_err());
        assert!(ChangeRequest::new(" ".repeat(12), DIFF).is_err());
        assert!(ChangeRequest::new("x".repeat(SUMMARY_MAX_CHARS), DIFF).is_ok());
    }

    #[test]
    fn rejects_empty_diff() {
        let err = ChangeRequest::new("A perfectly fine summary", "").unwrap_err();
        assert!(err.to_string().contains("must not be empty"));
    }

    #[test]
    fn deserialization_revalidates() {
        let bad = serde_json::json!({ "summary": "ok summary here", "unified_diff": "nope" });
        assert!(ChangeRequest::from_json(bad).is_err());

        let good = serde_json::json!({ "summary": "ok summary here", "unified_diff": DIFF });
        let req = ChangeRequest::from_json(good).unwrap();
        assert_eq!(req.unified_diff(), DIFF);
    }
}
