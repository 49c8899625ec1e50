// review_flow.rs — End-to-end review scenarios against a real directory.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use dt_archive::{DecisionJournal, JournalAction};
use dt_changeset::{preprocess_request, ApplyAction, ChangeRequest, FailureReason};
use dt_gateway::{GatewayConfig, GatewayError, ReviewCoordinator, ReviewStatus};
use tempfile::tempdir;
use tracing_subscriber::EnvFilter;

const HELLO_DIFF: &str = "\
diff --git a/hello.txt b/hello.txt
index 0000000..e69de29
--- a/hello.txt
+++ b/hello.txt
@@ -0,0 +1,2 @@
+Hello world
+This is a test
";

const DELETE_MISSING_DIFF: &str = "\
diff --git a/missing.txt b/missing.txt
deleted file mode 100644
index e69de29..0000000
--- a/missing.txt
+++ /dev/null
@@ -1 +0,0 @@
-gone
";

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn coordinator(repo: &Path) -> ReviewCoordinator {
    init_tracing();
    ReviewCoordinator::new(GatewayConfig::for_project(repo)).unwrap()
}

fn submit(coord: &ReviewCoordinator, summary: &str, diff: &str) -> String {
    let pre = coord
        .preprocess(serde_json::json!({ "summary": summary, "unified_diff": diff }))
        .unwrap();
    coord.build_review_payload(pre).unwrap().review_id
}

/// Every file outside `.determined/`, with its contents.
fn snapshot(root: &Path) -> BTreeMap<String, Vec<u8>> {
    fn walk(dir: &Path, root: &Path, out: &mut BTreeMap<String, Vec<u8>>) {
        for entry in fs::read_dir(dir).unwrap() {
            let path = entry.unwrap().path();
            if path.file_name().unwrap() == ".determined" {
                continue;
            }
            if path.is_dir() {
                walk(&path, root, out);
            } else {
                let rel = path.strip_prefix(root).unwrap().to_string_lossy().into_owned();
                out.insert(rel, fs::read(&path).unwrap());
            }
        }
    }
    let mut out = BTreeMap::new();
    walk(root, root, &mut out);
    out
}

#[test]
fn approved_addition_lands_in_repo_and_archive() {
    let repo = tempdir().unwrap();
    let coord = coordinator(repo.path());

    let pre = coord
        .preprocess(serde_json::json!({
            "summary": "Add hello file for tests",
            "unified_diff": HELLO_DIFF,
        }))
        .unwrap();
    assert!(pre.metadata.adds >= 1);
    assert!(!pre.metadata.parse_error);

    let payload = coord.build_review_payload(pre).unwrap();
    assert!(payload.summary.starts_with("Add hello file"));
    assert_eq!(payload.elicitation_schema["properties"]["approved"]["type"], "boolean");

    let outcome = coord.resolve_review(&payload.review_id, true, None).unwrap();
    assert_eq!(outcome.status, ReviewStatus::Applied);
    assert_eq!(
        fs::read_to_string(repo.path().join("hello.txt")).unwrap(),
        "Hello world\nThis is a test\n"
    );
    let details = outcome.apply_details.unwrap();
    assert_eq!(details.files[0].action, Some(ApplyAction::AddedOrModified));

    for name in [
        "request.json",
        "diff.patch",
        "apply_details.json",
        "decision.json",
        "apply_summary.json",
    ] {
        assert!(outcome.archived_to.join(name).is_file(), "missing {name}");
    }
    let summary = coord.archive().read_apply_summary(&payload.review_id).unwrap();
    assert_eq!((summary.files_applied, summary.files_failed), (1, 0));
    assert!(coord.archive().read_decision(&payload.review_id).unwrap().approved);
}

#[test]
fn deleting_missing_file_reports_file_not_found() {
    let repo = tempdir().unwrap();
    let coord = coordinator(repo.path());
    let review_id = submit(&coord, "Remove the missing file", DELETE_MISSING_DIFF);

    let outcome = coord.resolve_review(&review_id, true, None).unwrap();
    assert_eq!(outcome.status, ReviewStatus::Applied);
    let details = outcome.apply_details.unwrap();
    assert_eq!(details.files.len(), 1);
    assert_eq!(details.files[0].path, "missing.txt");
    assert!(!details.files[0].applied);
    assert_eq!(details.files[0].reason, Some(FailureReason::FileNotFound));
}

#[test]
fn rejection_records_feedback_and_leaves_tree_alone() {
    let repo = tempdir().unwrap();
    fs::write(repo.path().join("keep.txt"), "untouched\n").unwrap();
    let coord = coordinator(repo.path());
    let before = snapshot(repo.path());

    let review_id = submit(&coord, "Try and reject change", HELLO_DIFF);
    let outcome = coord
        .resolve_review(&review_id, false, Some("not appropriate".to_string()))
        .unwrap();

    assert_eq!(outcome.status, ReviewStatus::Rejected);
    assert!(outcome.apply_details.is_none());
    let decision: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(outcome.archived_to.join("decision.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(decision["approved"], false);
    assert_eq!(decision["feedback"], "not appropriate");
    assert_eq!(decision["review_id"], review_id.as_str());

    assert!(!outcome.archived_to.join("apply_summary.json").exists());
    assert_eq!(snapshot(repo.path()), before);
}

#[test]
fn second_decision_for_same_review_fails() {
    let repo = tempdir().unwrap();
    let coord = coordinator(repo.path());
    let review_id = submit(&coord, "Add hello file for tests", HELLO_DIFF);

    coord.resolve_review(&review_id, true, None).unwrap();
    match coord.resolve_review(&review_id, true, None) {
        Err(GatewayError::UnknownReview(id)) => assert_eq!(id, review_id),
        other => panic!("expected UnknownReview, got {other:?}"),
    }
}

#[test]
fn unknown_review_id_fails() {
    let repo = tempdir().unwrap();
    let coord = coordinator(repo.path());
    assert!(matches!(
        coord.resolve_review("nope", true, None),
        Err(GatewayError::UnknownReview(_))
    ));
}

#[test]
fn review_payload_requires_change_id() {
    let repo = tempdir().unwrap();
    let coord = coordinator(repo.path());
    let mut pre = preprocess_request(&ChangeRequest::new("Add hello file for tests", HELLO_DIFF).unwrap());
    pre.metadata.change_id = None;

    assert!(matches!(
        coord.build_review_payload(pre),
        Err(GatewayError::InvalidInput(_))
    ));
    assert!(coord.pending_ids().unwrap().is_empty());
}

#[test]
fn racing_decisions_apply_once() {
    let repo = tempdir().unwrap();
    let coord = Arc::new(coordinator(repo.path()));
    let review_id = submit(&coord, "Add hello file for tests", HELLO_DIFF);

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let coord = Arc::clone(&coord);
            let id = review_id.clone();
            std::thread::spawn(move || coord.resolve_review(&id, true, None).is_ok())
        })
        .collect();
    let successes = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|ok| *ok)
        .count();

    assert_eq!(successes, 1);
    assert_eq!(
        fs::read_to_string(repo.path().join("hello.txt")).unwrap(),
        "Hello world\nThis is a test\n"
    );
}

#[test]
fn one_unreadable_file_does_not_block_the_rest() {
    let repo = tempdir().unwrap();
    fs::create_dir(repo.path().join("blocked")).unwrap();
    fs::write(repo.path().join("latin1.txt"), b"caf\xe9\nx\n").unwrap();
    let coord = coordinator(repo.path());
    let diff = "\
--- a/blocked
+++ b/blocked
@@ -1 +1,2 @@
 x
+y
--- a/latin1.txt
+++ b/latin1.txt
@@ -2 +2,2 @@
 x
+y
--- a/a.txt
+++ b/a.txt
@@ -0,0 +1 @@
+fresh
";
    let pre = coord
        .preprocess(serde_json::json!({ "summary": "Touch three files at once", "unified_diff": diff }))
        .unwrap();

    let result = coord.apply_approved(&pre).unwrap();
    assert!(result.applied);
    assert_eq!(result.details.files[0].reason, Some(FailureReason::HunkApplyError));
    assert_eq!(result.details.files[1].action, Some(ApplyAction::AddedOrModified));
    assert_eq!(result.details.files[2].action, Some(ApplyAction::AddedOrModified));
    assert_eq!(fs::read_to_string(repo.path().join("a.txt")).unwrap(), "fresh\n");
    assert_eq!(fs::read(repo.path().join("latin1.txt")).unwrap(), b"caf\xe9\nx\ny\n".to_vec());
    assert!(repo.path().join("blocked").is_dir());
}

#[test]
fn failed_approval_stays_pending_and_can_be_retried() {
    init_tracing();
    let repo = tempdir().unwrap();
    let blocker = repo.path().join("blocker");
    fs::write(&blocker, "not a directory\n").unwrap();
    let mut config = GatewayConfig::for_project(repo.path());
    config.staging_root = blocker.join("staging");
    let coord = ReviewCoordinator::new(config).unwrap();
    let review_id = submit(&coord, "Add hello file for tests", HELLO_DIFF);

    assert!(matches!(
        coord.resolve_review(&review_id, true, None),
        Err(GatewayError::Workspace(_))
    ));
    assert_eq!(coord.pending_ids().unwrap(), vec![review_id.clone()]);
    assert!(!repo.path().join("hello.txt").exists());

    fs::remove_file(&blocker).unwrap();
    let outcome = coord.resolve_review(&review_id, true, None).unwrap();
    assert_eq!(outcome.status, ReviewStatus::Applied);
    assert!(coord.pending_ids().unwrap().is_empty());
    assert!(outcome.archived_to.join("apply_summary.json").is_file());
    assert_eq!(
        fs::read_to_string(repo.path().join("hello.txt")).unwrap(),
        "Hello world\nThis is a test\n"
    );
}

#[cfg(unix)]
#[test]
fn symlinked_paths_are_refused_and_left_intact() {
    use std::os::unix::fs::symlink;

    let repo = tempdir().unwrap();
    let outside = tempdir().unwrap();
    fs::write(repo.path().join("real.txt"), "l1\nl2\nl3\nl4\n").unwrap();
    symlink(repo.path().join("real.txt"), repo.path().join("link.txt")).unwrap();
    symlink(outside.path(), repo.path().join("shared")).unwrap();
    let coord = coordinator(repo.path());
    let diff = "\
--- a/link.txt
+++ b/link.txt
@@ -2 +2 @@
-l2
+L2
--- a/shared/new.txt
+++ b/shared/new.txt
@@ -0,0 +1 @@
+escaped
";
    let review_id = submit(&coord, "Edit through two symlinks", diff);

    let details = coord
        .resolve_review(&review_id, true, None)
        .unwrap()
        .apply_details
        .unwrap();
    assert!(details
        .files
        .iter()
        .all(|f| f.reason == Some(FailureReason::CouldNotParsePath)));
    assert_eq!(
        fs::read_to_string(repo.path().join("real.txt")).unwrap(),
        "l1\nl2\nl3\nl4\n"
    );
    assert!(!outside.path().join("new.txt").exists());
}

#[test]
fn in_repo_archive_and_journal_survive_applies() {
    init_tracing();
    let repo = tempdir().unwrap();
    let mut config = GatewayConfig::for_project(repo.path());
    config.archive_root = repo.path().join("reviews");
    config.journal_path = repo.path().join("journal.jsonl");
    let coord = ReviewCoordinator::new(config).unwrap();

    let first = submit(&coord, "Add hello file for tests", HELLO_DIFF);
    coord.resolve_review(&first, true, None).unwrap();
    // A change that tries to overwrite the journal itself.
    let clobber = "--- a/journal.jsonl\n+++ b/journal.jsonl\n@@ -1 +1 @@\n-x\n+bogus\n";
    let second = submit(&coord, "Rewrite the journal file", clobber);
    coord.resolve_review(&second, true, None).unwrap();

    let journal = &coord.config().journal_path;
    assert!(DecisionJournal::verify_chain(journal).unwrap());
    assert_eq!(DecisionJournal::read_all(journal).unwrap().len(), 6);
    assert!(repo.path().join("reviews").join(&first).join("decision.json").is_file());
    assert!(coord.archive().read_decision(&second).unwrap().approved);
}

#[test]
fn modification_and_removal_propagate_to_repo() {
    let repo = tempdir().unwrap();
    fs::write(repo.path().join("data.txt"), "OLD LINE\nkeep\n").unwrap();
    fs::write(repo.path().join("obsolete.txt"), "bye\n").unwrap();
    let coord = coordinator(repo.path());
    let diff = "\
diff --git a/data.txt b/data.txt
index e69de29..b9e1234 100644
--- a/data.txt
+++ b/data.txt
@@ -1 +1 @@
-OLD LINE
+NEW LINE
diff --git a/obsolete.txt b/obsolete.txt
deleted file mode 100644
--- a/obsolete.txt
+++ /dev/null
@@ -1 +0,0 @@
-bye
";
    let review_id = submit(&coord, "Update data and drop obsolete file", diff);

    coord.resolve_review(&review_id, true, None).unwrap();
    assert_eq!(
        fs::read_to_string(repo.path().join("data.txt")).unwrap(),
        "NEW LINE\nkeep\n"
    );
    assert!(!repo.path().join("obsolete.txt").exists());
}

#[test]
fn journal_records_the_whole_flow() {
    let repo = tempdir().unwrap();
    let coord = coordinator(repo.path());
    let applied = submit(&coord, "Add hello file for tests", HELLO_DIFF);
    coord.resolve_review(&applied, true, None).unwrap();
    let rejected = submit(&coord, "Remove the missing file", DELETE_MISSING_DIFF);
    coord.resolve_review(&rejected, false, None).unwrap();

    let path = &coord.config().journal_path;
    assert!(DecisionJournal::verify_chain(path).unwrap());
    let actions: Vec<JournalAction> = DecisionJournal::read_all(path)
        .unwrap()
        .into_iter()
        .map(|e| e.action)
        .collect();
    assert_eq!(
        actions,
        vec![
            JournalAction::ReviewRegistered,
            JournalAction::Approved,
            JournalAction::Applied,
            JournalAction::ReviewRegistered,
            JournalAction::Rejected,
        ]
    );
}
