//! Tests for the snapshot engine
//!
//! These tests verify:
//! - Repository initialization layout
//! - Commit/restore round-trips over nested working trees
//! - Ignore pattern semantics (glob, substring, comments)
//! - Snapshot index bookkeeping

use std::fs;
use std::path::Path;

use nutelladb::snapshot::{IgnoreList, Repository, SnapshotIndex};
use nutelladb::NutellaError;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_repo() -> (TempDir, Repository) {
    let temp_dir = TempDir::new().unwrap();
    let repo = Repository::init(temp_dir.path()).unwrap();
    (temp_dir, repo)
}

fn write_file(root: &Path, rel: &str, contents: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, contents).unwrap();
}

fn read_file(root: &Path, rel: &str) -> String {
    fs::read_to_string(root.join(rel)).unwrap()
}

// =============================================================================
// Initialization Tests
// =============================================================================

#[test]
fn test_init_layout() {
    let (temp, _repo) = setup_repo();
    let repo_dir = temp.path().join(".nutella");

    assert!(repo_dir.join("objects").is_dir());
    assert!(repo_dir.join("refs").is_dir());
    assert_eq!(
        fs::read_to_string(repo_dir.join("HEAD")).unwrap(),
        "ref: refs/heads/main\n"
    );
    assert_eq!(
        fs::read_to_string(repo_dir.join("snapshots.json")).unwrap(),
        "{}"
    );
}

#[test]
fn test_init_is_idempotent() {
    let (temp, repo) = setup_repo();

    write_file(temp.path(), "data.txt", "keep");
    let commit = repo.commit("first").unwrap();

    // Re-initializing must not clobber existing history
    let repo = Repository::init(temp.path()).unwrap();
    assert_eq!(repo.snapshots().len(), 1);
    assert!(repo.snapshots().contains_commit(&commit));
}

#[test]
fn test_open_missing_repository() {
    let temp_dir = TempDir::new().unwrap();
    let err = Repository::open(temp_dir.path()).unwrap_err();
    assert!(matches!(err, NutellaError::RepositoryNotFound(_)));
}

// =============================================================================
// Commit Tests
// =============================================================================

#[test]
fn test_commit_records_snapshot_entry() {
    let (temp, repo) = setup_repo();
    write_file(temp.path(), "hello.txt", "world");

    let commit = repo.commit("first").unwrap();

    let index = repo.snapshots();
    assert_eq!(index.len(), 1);
    let entry = index.entries().values().next().unwrap();
    assert_eq!(entry.commit, commit);
    assert_eq!(entry.message, "first");
    // RFC3339 timestamps parse back
    assert!(chrono::DateTime::parse_from_rfc3339(&entry.timestamp).is_ok());
}

#[test]
fn test_commit_rejects_empty_message() {
    let (_temp, repo) = setup_repo();
    assert!(matches!(
        repo.commit("").unwrap_err(),
        NutellaError::EmptyCommitMessage
    ));
    assert!(matches!(
        repo.commit("   ").unwrap_err(),
        NutellaError::EmptyCommitMessage
    ));
}

#[test]
fn test_commits_sorted_by_time() {
    let (temp, repo) = setup_repo();

    write_file(temp.path(), "a.txt", "1");
    let first = repo.commit("first").unwrap();
    write_file(temp.path(), "a.txt", "2");
    let second = repo.commit("second").unwrap();

    let index = repo.snapshots();
    let sorted = index.sorted_by_time();
    assert_eq!(sorted.len(), 2);
    assert_eq!(sorted[0].1.commit, first);
    assert_eq!(sorted[1].1.commit, second);
}

#[test]
fn test_identical_trees_share_objects() {
    let (temp, repo) = setup_repo();
    write_file(temp.path(), "same.txt", "unchanged");

    let first = repo.commit("first").unwrap();
    let after_first = count_loose_objects(temp.path());
    let second = repo.commit("second").unwrap();
    let after_second = count_loose_objects(temp.path());

    // The blob and tree deduplicate; only the new commit object lands
    assert_ne!(first, second);
    assert_eq!(after_second, after_first + 1);
    assert_eq!(repo.snapshots().len(), 2);
}

fn count_loose_objects(root: &Path) -> usize {
    let objects = root.join(".nutella/objects");
    let mut count = 0;
    for entry in fs::read_dir(objects).unwrap() {
        let entry = entry.unwrap();
        if entry.path().is_dir() && entry.file_name() != "pack" {
            count += fs::read_dir(entry.path()).unwrap().count();
        }
    }
    count
}

// =============================================================================
// Restore Tests
// =============================================================================

#[test]
fn test_commit_then_restore_single_file() {
    let (temp, repo) = setup_repo();
    write_file(temp.path(), "hello.txt", "world");

    let commit = repo.commit("first").unwrap();
    fs::remove_file(temp.path().join("hello.txt")).unwrap();

    repo.restore(&commit).unwrap();

    assert_eq!(read_file(temp.path(), "hello.txt"), "world");
    assert_eq!(repo.snapshots().len(), 1);
}

#[test]
fn test_restore_nested_tree_is_byte_identical() {
    let (temp, repo) = setup_repo();

    write_file(temp.path(), "top.txt", "top-level");
    write_file(temp.path(), "a/one.txt", "first nested");
    write_file(temp.path(), "a/b/two.txt", "deeper nested");
    write_file(temp.path(), "c/three.bin", "third");

    let commit = repo.commit("layered").unwrap();

    // Wreck the working tree completely
    fs::remove_dir_all(temp.path().join("a")).unwrap();
    write_file(temp.path(), "top.txt", "scribbled over");
    write_file(temp.path(), "new-junk.txt", "should vanish");

    repo.restore(&commit).unwrap();

    assert_eq!(read_file(temp.path(), "top.txt"), "top-level");
    assert_eq!(read_file(temp.path(), "a/one.txt"), "first nested");
    assert_eq!(read_file(temp.path(), "a/b/two.txt"), "deeper nested");
    assert_eq!(read_file(temp.path(), "c/three.bin"), "third");
    assert!(!temp.path().join("new-junk.txt").exists());
}

#[test]
fn test_restore_removes_files_created_after_commit() {
    let (temp, repo) = setup_repo();
    write_file(temp.path(), "original.txt", "yes");

    let commit = repo.commit("baseline").unwrap();
    write_file(temp.path(), "later/deep/file.txt", "no");

    repo.restore(&commit).unwrap();

    assert!(temp.path().join("original.txt").exists());
    assert!(!temp.path().join("later").exists());
}

#[test]
fn test_restore_unknown_commit() {
    let (_temp, repo) = setup_repo();
    let err = repo.restore(&"ab".repeat(20)).unwrap_err();
    assert!(matches!(err, NutellaError::ObjectNotFound(_)));
}

#[test]
fn test_restore_preserves_repository_dir() {
    let (temp, repo) = setup_repo();
    write_file(temp.path(), "f.txt", "data");

    let commit = repo.commit("first").unwrap();
    repo.restore(&commit).unwrap();

    // History is intact after the clean+restore cycle
    assert_eq!(repo.snapshots().len(), 1);
    assert!(temp.path().join(".nutella/objects").is_dir());
}

// =============================================================================
// Ignore Pattern Tests
// =============================================================================

#[test]
fn test_ignore_list_matching() {
    let ignores = IgnoreList::from_patterns(&["*.log", "tmp"]);

    // Glob match
    assert!(ignores.matches("debug.log"));
    // Substring match, including mid-path
    assert!(ignores.matches("tmp"));
    assert!(ignores.matches("tmp/scratch.txt"));
    assert!(ignores.matches("nested/tmp/file"));

    assert!(!ignores.matches("keep.txt"));
}

#[test]
fn test_ignore_file_parsing() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(
        temp_dir.path().join(".nutignore"),
        "# comment line\n\n  *.log  \ntmp\n",
    )
    .unwrap();

    let ignores = IgnoreList::load(temp_dir.path()).unwrap();
    assert!(ignores.matches("x.log"));
    assert!(ignores.matches("tmp/y"));
    assert!(!ignores.matches("# comment line"));
}

#[test]
fn test_missing_ignore_file_means_no_rules() {
    let temp_dir = TempDir::new().unwrap();
    let ignores = IgnoreList::load(temp_dir.path()).unwrap();
    assert!(ignores.is_empty());
    assert!(!ignores.matches("anything"));
}

#[test]
fn test_commit_skips_ignored_paths() {
    let (temp, repo) = setup_repo();
    fs::write(temp.path().join(".nutignore"), "*.log\nscratch\n").unwrap();

    write_file(temp.path(), "keep.txt", "kept");
    write_file(temp.path(), "noisy.log", "dropped");
    write_file(temp.path(), "scratch/wip.txt", "dropped");

    let commit = repo.commit("selective").unwrap();

    // Wipe everything, then restore: ignored paths never made it in
    fs::remove_file(temp.path().join("keep.txt")).unwrap();
    fs::remove_file(temp.path().join("noisy.log")).unwrap();
    fs::remove_dir_all(temp.path().join("scratch")).unwrap();

    repo.restore(&commit).unwrap();

    assert!(temp.path().join("keep.txt").exists());
    assert!(!temp.path().join("noisy.log").exists());
    assert!(!temp.path().join("scratch").exists());
}

#[test]
fn test_restore_leaves_ignored_paths_in_place() {
    let (temp, repo) = setup_repo();
    fs::write(temp.path().join(".nutignore"), "*.log\n").unwrap();

    write_file(temp.path(), "tracked.txt", "v1");
    let commit = repo.commit("baseline").unwrap();

    // An ignored file created after the commit survives the clean
    write_file(temp.path(), "local.log", "untouched");
    repo.restore(&commit).unwrap();

    assert_eq!(read_file(temp.path(), "local.log"), "untouched");
    assert_eq!(read_file(temp.path(), "tracked.txt"), "v1");
    // The ignore file itself is preserved too
    assert!(temp.path().join(".nutignore").exists());
}

// =============================================================================
// Snapshot Index Tests
// =============================================================================

#[test]
fn test_index_survives_corrupt_file() {
    let temp_dir = TempDir::new().unwrap();
    let repo_dir = temp_dir.path().join(".nutella");
    fs::create_dir_all(&repo_dir).unwrap();
    fs::write(repo_dir.join("snapshots.json"), "not json at all").unwrap();

    let index = SnapshotIndex::load(&repo_dir);
    assert!(index.is_empty());
}

#[test]
fn test_index_record_and_reload() {
    let temp_dir = TempDir::new().unwrap();
    let repo_dir = temp_dir.path().join(".nutella");
    fs::create_dir_all(&repo_dir).unwrap();

    let mut index = SnapshotIndex::load(&repo_dir);
    let key = index.record(&"ab".repeat(20), "a message");
    index.save().unwrap();

    let reloaded = SnapshotIndex::load(&repo_dir);
    assert_eq!(reloaded.len(), 1);
    assert!(reloaded.entries().contains_key(&key));
    assert!(reloaded.contains_commit(&"ab".repeat(20)));
}
