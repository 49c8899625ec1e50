// apply.rs — Positional patch application against a directory.
//
// Each file in the patch is handled independently; a failure on one file is
// recorded in its FileOutcome and never stops the others. File contents are
// rebuilt from hunk data alone, walking a cursor over the original lines:
//
//   original:  l1 l2 l3 l4 l5
//   hunk @3:   ' 'l3  '-'l4  '+'x
//   result:    l1 l2 l3 x l5
//
// There is no conflict detection. Hunks are applied at their declared
// positions even if the file has drifted since the diff was made.
//
// Files are handled as byte lines, so content that is not valid UTF-8 passes
// through unchanged. Paths that go through a symlink are refused.

use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use dt_changeset::{
    ApplyAction, ApplyDetails, FailureReason, FileOutcome, LineKind, ParseFailure, PatchSet,
    PatchedFile,
};

/// How far back the removal fallback looks for a `--- a/` header.
const FALLBACK_LOOKBACK: usize = 19;

/// Path recorded when the removal fallback cannot find a source header.
pub const UNKNOWN_PATH: &str = "unknown";

/// Apply every file in `patch` to `target_dir`.
///
/// The boolean is `true` once processing has completed, even if some files
/// failed; per-file success lives in the returned details.
pub fn apply_patch_set(patch: &PatchSet, target_dir: &Path) -> (bool, ApplyDetails) {
    let mut details = ApplyDetails::default();
    for file in &patch.files {
        let outcome = apply_file(file, target_dir);
        tracing::debug!(
            path = %outcome.path,
            applied = outcome.applied,
            reason = ?outcome.reason,
            "file processed"
        );
        details.files.push(outcome);
    }
    (true, details)
}

/// Removal-only application for diffs that do not parse.
///
/// Every `+++ /dev/null` line is paired with the nearest preceding
/// `--- a/<path>` header (within 19 lines) and that path is removed.
pub fn apply_removals_fallback(
    diff: &str,
    target_dir: &Path,
    failure: &ParseFailure,
) -> ApplyDetails {
    tracing::warn!(error = %failure, "diff did not parse, applying removals only");
    let lines: Vec<&str> = diff.lines().collect();
    let mut details = ApplyDetails {
        files: Vec::new(),
        fallback_parse_error: Some(failure.to_string()),
    };

    for (idx, line) in lines.iter().enumerate() {
        if !line.starts_with("+++ /dev/null") {
            continue;
        }
        let lower = idx.saturating_sub(FALLBACK_LOOKBACK);
        let source = lines[lower..idx]
            .iter()
            .rev()
            .find_map(|l| l.strip_prefix("--- a/"))
            .map(|rest| rest.split('\t').next().unwrap_or(rest).trim_end())
            .filter(|path| !path.is_empty());

        let outcome = match source {
            Some(path) => match resolve_target(target_dir, path) {
                Some(_) if through_symlink(target_dir, Path::new(path)) => {
                    tracing::warn!(path, "refusing path through a symlink");
                    FileOutcome::failed(path, FailureReason::CouldNotParsePath)
                }
                Some(dest) => remove_file(path, &dest),
                None => FileOutcome::failed(path, FailureReason::CouldNotParsePath),
            },
            None => FileOutcome::failed(UNKNOWN_PATH, FailureReason::CouldNotParsePath),
        };
        tracing::debug!(path = %outcome.path, applied = outcome.applied, "fallback removal");
        details.files.push(outcome);
    }
    details
}

/// Join a patch-relative path onto `root`, refusing anything that could
/// escape it.
pub(crate) fn resolve_target(root: &Path, relative: &str) -> Option<PathBuf> {
    let rel = Path::new(relative);
    if relative.is_empty() || rel.is_absolute() {
        return None;
    }
    let confined = rel
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    confined.then(|| root.join(rel))
}

/// Whether `root/rel`, or any directory between `root` and it, is a symlink.
pub(crate) fn through_symlink(root: &Path, rel: &Path) -> bool {
    let mut current = root.to_path_buf();
    rel.components().any(|c| {
        current.push(c);
        fs::symlink_metadata(&current).is_ok_and(|m| m.file_type().is_symlink())
    })
}

fn apply_file(file: &PatchedFile, target_dir: &Path) -> FileOutcome {
    let path = file.path();
    let Some(dest) = resolve_target(target_dir, path) else {
        tracing::warn!(path, "refusing path outside target directory");
        return FileOutcome::failed(path, FailureReason::CouldNotParsePath);
    };
    if through_symlink(target_dir, Path::new(path)) {
        tracing::warn!(path, "refusing path through a symlink");
        return FileOutcome::failed(path, FailureReason::CouldNotParsePath);
    }

    if file.is_removed_file() {
        return remove_file(path, &dest);
    }

    if let Some(parent) = dest.parent() {
        if let Err(e) = fs::create_dir_all(parent) {
            return io_failure(path, &e);
        }
    }

    let original = match fs::read(&dest) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => Vec::new(),
        Err(e) => return io_failure(path, &e),
    };
    let original = split_lines(&original);

    let mut content = rebuild(&original, file).join(&b'\n');
    content.push(b'\n');

    match fs::write(&dest, content) {
        Ok(()) => FileOutcome::applied(path, ApplyAction::AddedOrModified),
        Err(e) => io_failure(path, &e),
    }
}

/// Split on `\n`, dropping a trailing `\r` from each line and the empty
/// piece after a final newline.
fn split_lines(bytes: &[u8]) -> Vec<&[u8]> {
    let body = bytes.strip_suffix(b"\n").unwrap_or(bytes);
    if bytes.is_empty() {
        return Vec::new();
    }
    body.split(|b| *b == b'\n')
        .map(|line| line.strip_suffix(b"\r").unwrap_or(line))
        .collect()
}

/// Rebuild a file's lines from its original lines and the hunks.
fn rebuild<'a>(original: &[&'a [u8]], file: &'a PatchedFile) -> Vec<&'a [u8]> {
    let mut out = Vec::with_capacity(original.len());
    let mut cursor = 0;

    for hunk in &file.hunks {
        let start = hunk.source_start.saturating_sub(1);
        while cursor < start && cursor < original.len() {
            out.push(original[cursor]);
            cursor += 1;
        }
        for line in &hunk.lines {
            match line.kind {
                LineKind::Context => {
                    out.push(line.value.as_bytes());
                    cursor += 1;
                }
                LineKind::Added => out.push(line.value.as_bytes()),
                LineKind::Removed => cursor += 1,
            }
        }
    }

    if cursor < original.len() {
        out.extend_from_slice(&original[cursor..]);
    }
    out
}

fn remove_file(path: &str, dest: &Path) -> FileOutcome {
    match fs::remove_file(dest) {
        Ok(()) => FileOutcome::applied(path, ApplyAction::Removed),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            FileOutcome::failed(path, FailureReason::FileNotFound)
        }
        Err(e) => io_failure(path, &e),
    }
}

fn io_failure(path: &str, err: &std::io::Error) -> FileOutcome {
    match err.kind() {
        ErrorKind::PermissionDenied => {
            tracing::warn!(path, error = %err, "could not apply file");
        }
        _ => tracing::error!(path, error = %err, kind = ?err.kind(), "unexpected I/O failure"),
    }
    FileOutcome::failed(path, FailureReason::HunkApplyError).with_error(err)
}
