// patch.rs — Unified diff model and structural parser.
//
// A PatchSet is the parsed form of a (normalized) unified diff: one
// PatchedFile per file section, each holding its hunks. Parsing is strict:
// anything that does not fit the git or plain unified dialect is reported as
// a ParseFailure and callers fall back to heuristics instead of guessing.
//
// Accepted input:
//   diff --git a/X b/Y          (optional; starts a git file section)
//   new file mode / deleted file mode / index / rename / similarity lines
//   --- X                        (source header)
//   +++ Y                        (target header)
//   @@ -a,b +c,d @@ section      (hunk header; ",b" / ",d" default to 1)
//   ' ' / '-' / '+' / '\' lines  (hunk body; an empty line is context)

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ParseFailure;

/// Placeholder path for the missing side of an added or removed file.
pub const DEV_NULL: &str = "/dev/null";

/// The role of one line inside a hunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineKind {
    /// Present in both source and target.
    Context,
    /// Present only in the target.
    Added,
    /// Present only in the source.
    Removed,
}

/// One line of a hunk body, without its leading marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HunkLine {
    pub kind: LineKind,
    pub value: String,
}

impl HunkLine {
    pub fn context(value: impl Into<String>) -> Self {
        Self {
            kind: LineKind::Context,
            value: value.into(),
        }
    }

    pub fn added(value: impl Into<String>) -> Self {
        Self {
            kind: LineKind::Added,
            value: value.into(),
        }
    }

    pub fn removed(value: impl Into<String>) -> Self {
        Self {
            kind: LineKind::Removed,
            value: value.into(),
        }
    }
}

/// A contiguous block of changes within one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hunk {
    /// 1-based first source line (0 for an empty source range).
    pub source_start: usize,
    pub source_length: usize,
    /// 1-based first target line (0 for an empty target range).
    pub target_start: usize,
    pub target_length: usize,
    /// Text after the closing `@@`, if any (usually a function name).
    pub section_header: Option<String>,
    pub lines: Vec<HunkLine>,
}

impl Hunk {
    /// Build a hunk from its source start and body, deriving the ranges.
    pub fn from_lines(source_start: usize, lines: Vec<HunkLine>) -> Self {
        let source_length = lines
            .iter()
            .filter(|l| l.kind != LineKind::Added)
            .count();
        let target_length = lines
            .iter()
            .filter(|l| l.kind != LineKind::Removed)
            .count();
        Self {
            source_start,
            source_length,
            target_start: if target_length == 0 { 0 } else { source_start.max(1) },
            target_length,
            section_header: None,
            lines,
        }
    }
}

/// All changes to a single file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchedFile {
    /// Source label as written in the diff (e.g. `a/src/lib.rs` or `/dev/null`).
    pub source_file: String,
    /// Target label as written in the diff (e.g. `b/src/lib.rs` or `/dev/null`).
    pub target_file: String,
    pub hunks: Vec<Hunk>,
}

impl PatchedFile {
    pub fn new(source_file: impl Into<String>, target_file: impl Into<String>) -> Self {
        Self {
            source_file: source_file.into(),
            target_file: target_file.into(),
            hunks: Vec::new(),
        }
    }

    /// Repository-relative path this section applies to.
    ///
    /// `a/` and `b/` prefixes are stripped; for added or removed files the
    /// side that is not `/dev/null` wins.
    pub fn path(&self) -> &str {
        let source = self.source_file.as_str();
        let target = self.target_file.as_str();
        if let Some(rest) = source.strip_prefix("a/") {
            if target.starts_with("b/") || target == DEV_NULL {
                return rest;
            }
        }
        if source == DEV_NULL {
            return target.strip_prefix("b/").unwrap_or(target);
        }
        source
    }

    /// True if this section creates the file.
    pub fn is_added_file(&self) -> bool {
        if self.source_file == DEV_NULL {
            return true;
        }
        matches!(self.hunks.as_slice(), [h] if h.source_start == 0 && h.source_length == 0)
    }

    /// True if this section deletes the file.
    pub fn is_removed_file(&self) -> bool {
        if self.target_file == DEV_NULL {
            return true;
        }
        matches!(self.hunks.as_slice(), [h] if h.target_start == 0 && h.target_length == 0)
    }
}

/// A parsed unified diff: file sections in diff order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchSet {
    pub files: Vec<PatchedFile>,
}

impl PatchSet {
    /// Parse diff text. Empty input (or input without any file section)
    /// yields an empty patch set.
    pub fn parse(text: &str) -> Result<Self, ParseFailure> {
        Parser::default().run(text)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl From<Vec<PatchedFile>> for PatchSet {
    fn from(files: Vec<PatchedFile>) -> Self {
        Self { files }
    }
}

fn git_header_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^diff --git (?P<source>a/\S.*?) (?P<target>b/\S.*)$")
            .expect("git header regex is valid")
    })
}

fn hunk_header_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^@@ -(\d+)(?:,(\d+))? \+(\d+)(?:,(\d+))? @@[ ]?(.*)$")
            .expect("hunk header regex is valid")
    })
}

/// Strip an optional tab-separated timestamp from a `---`/`+++` label.
fn header_label(rest: &str) -> &str {
    rest.split('\t').next().unwrap_or(rest).trim_end()
}

/// Parser state for one pass over the diff text.
#[derive(Default)]
struct Parser {
    files: Vec<PatchedFile>,
    /// The current section was opened by a `diff --git` header.
    in_git_section: bool,
    /// Source label from a `---` line still waiting for its `+++`.
    pending_source: Option<String>,
    /// The current section has seen its `+++` line and may take hunks.
    headers_complete: bool,
}

impl Parser {
    fn run(mut self, text: &str) -> Result<PatchSet, ParseFailure> {
        let lines: Vec<&str> = text.lines().collect();
        let mut idx = 0;

        while idx < lines.len() {
            let line = lines[idx];
            let line_no = idx + 1;
            idx += 1;

            if line.starts_with("diff --git") {
                self.start_git_section(line, line_no)?;
            } else if line.starts_with("new file mode") {
                self.current_git_file(line_no, "unexpected new file mode")?
                    .source_file = DEV_NULL.to_string();
            } else if line.starts_with("deleted file mode") {
                self.current_git_file(line_no, "unexpected deleted file mode")?
                    .target_file = DEV_NULL.to_string();
            } else if line.starts_with("Binary files ") || line.starts_with("GIT binary patch") {
                return Err(ParseFailure::new(line_no, "binary diffs are not supported"));
            } else if let Some(rest) = line.strip_prefix("--- ") {
                self.source_header(header_label(rest), line_no)?;
            } else if let Some(rest) = line.strip_prefix("+++ ") {
                self.target_header(header_label(rest), line_no)?;
            } else if line.starts_with("@@") {
                idx = self.hunk(&lines, idx - 1)?;
            }
            // Anything else (index lines, mode changes, preamble text) is ignored.
        }

        if self.pending_source.is_some() {
            return Err(ParseFailure::new(
                lines.len(),
                "unexpected end of diff: source header without target header",
            ));
        }

        Ok(PatchSet { files: self.files })
    }

    fn start_git_section(&mut self, line: &str, line_no: usize) -> Result<(), ParseFailure> {
        let caps = git_header_re()
            .captures(line)
            .ok_or_else(|| ParseFailure::new(line_no, format!("malformed git header: {line}")))?;
        self.files
            .push(PatchedFile::new(&caps["source"], &caps["target"]));
        self.in_git_section = true;
        self.pending_source = None;
        self.headers_complete = false;
        Ok(())
    }

    fn current_git_file(
        &mut self,
        line_no: usize,
        message: &str,
    ) -> Result<&mut PatchedFile, ParseFailure> {
        if !self.in_git_section || self.headers_complete {
            return Err(ParseFailure::new(line_no, message));
        }
        self.files
            .last_mut()
            .ok_or_else(|| ParseFailure::new(line_no, message))
    }

    fn source_header(&mut self, label: &str, line_no: usize) -> Result<(), ParseFailure> {
        if self.in_git_section && !self.headers_complete {
            let expected = self
                .files
                .last()
                .map(|f| f.source_file.as_str())
                .unwrap_or_default();
            if label != expected {
                return Err(ParseFailure::new(
                    line_no,
                    format!("source header {label} does not match git header {expected}"),
                ));
            }
        } else {
            // A plain (non-git) section starts at its `---` line.
            self.in_git_section = false;
            self.headers_complete = false;
        }
        self.pending_source = Some(label.to_string());
        Ok(())
    }

    fn target_header(&mut self, label: &str, line_no: usize) -> Result<(), ParseFailure> {
        let Some(source) = self.pending_source.take() else {
            return Err(ParseFailure::new(
                line_no,
                format!("target without source: +++ {label}"),
            ));
        };

        if self.in_git_section {
            let expected = self
                .files
                .last()
                .map(|f| f.target_file.as_str())
                .unwrap_or_default();
            if label != expected {
                return Err(ParseFailure::new(
                    line_no,
                    format!("target header {label} does not match git header {expected}"),
                ));
            }
        } else {
            self.files.push(PatchedFile::new(source, label));
        }
        self.headers_complete = true;
        Ok(())
    }

    /// Parse the hunk whose header is at `start`; returns the index of the
    /// first line after the hunk body.
    fn hunk(&mut self, lines: &[&str], start: usize) -> Result<usize, ParseFailure> {
        let header = lines[start];
        let header_no = start + 1;

        let in_section = self.headers_complete || (self.in_git_section && self.pending_source.is_none());
        let file = match self.files.last_mut() {
            Some(file) if in_section => file,
            _ => return Err(ParseFailure::new(header_no, "unexpected hunk found")),
        };

        let caps = hunk_header_re()
            .captures(header)
            .ok_or_else(|| ParseFailure::new(header_no, format!("malformed hunk header: {header}")))?;
        let number = |i: usize, default: usize| -> Result<usize, ParseFailure> {
            match caps.get(i) {
                Some(m) => m
                    .as_str()
                    .parse()
                    .map_err(|_| ParseFailure::new(header_no, "hunk range out of bounds")),
                None => Ok(default),
            }
        };
        let source_start = number(1, 0)?;
        let source_length = number(2, 1)?;
        let target_start = number(3, 0)?;
        let target_length = number(4, 1)?;
        let section_header = caps
            .get(5)
            .map(|m| m.as_str().trim())
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        let mut body = Vec::new();
        let mut seen_source = 0;
        let mut seen_target = 0;
        let mut idx = start + 1;

        while seen_source < source_length || seen_target < target_length {
            let Some(&line) = lines.get(idx) else {
                return Err(ParseFailure::new(lines.len(), "hunk is shorter than expected"));
            };
            let line_no = idx + 1;
            idx += 1;

            let (kind, value) = match line.chars().next() {
                None => (LineKind::Context, ""),
                Some(' ') => (LineKind::Context, &line[1..]),
                Some('-') => (LineKind::Removed, &line[1..]),
                Some('+') => (LineKind::Added, &line[1..]),
                Some('\\') => continue,
                Some(_) => {
                    return Err(ParseFailure::new(
                        line_no,
                        format!("hunk diff line expected: {line}"),
                    ))
                }
            };
            match kind {
                LineKind::Context => {
                    seen_source += 1;
                    seen_target += 1;
                }
                LineKind::Removed => seen_source += 1,
                LineKind::Added => seen_target += 1,
            }
            if seen_source > source_length || seen_target > target_length {
                return Err(ParseFailure::new(line_no, "hunk is longer than expected"));
            }
            body.push(HunkLine {
                kind,
                value: value.to_string(),
            });
        }

        // A trailing "\ No newline at end of file" belongs to this hunk.
        while lines.get(idx).is_some_and(|l| l.starts_with('\\')) {
            idx += 1;
        }

        file.hunks.push(Hunk {
            source_start,
            source_length,
            target_start,
            target_length,
            section_header,
            lines: body,
        });
        Ok(idx)
    }
}
