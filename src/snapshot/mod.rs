//! Snapshot Engine Module
//!
//! Captures a working directory as a commit tree in the object store and
//! restores it later.
//!
//! ## Responsibilities
//! - Walk the working tree, honoring `.nutignore` rules
//! - Produce blob/tree/commit objects through the object store
//! - Record each commit in the snapshot index (`snapshots.json`)
//! - Restore by cleaning the tree and re-materializing a commit

mod ignore;
mod index;
mod repo;

pub use ignore::IgnoreList;
pub use index::{SnapshotEntry, SnapshotIndex, SNAPSHOTS_FILE};
pub use repo::{Repository, IGNORE_FILE, REPO_DIR};
