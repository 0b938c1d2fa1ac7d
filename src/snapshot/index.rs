//! Snapshot index (`snapshots.json`)
//!
//! An append-only record of commits, keyed by a freshly generated uuid:
//! `{uuid: {"commit", "message", "timestamp"}}`, timestamps in RFC3339.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;

/// Index file name inside the repository directory
pub const SNAPSHOTS_FILE: &str = "snapshots.json";

/// One recorded snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotEntry {
    pub commit: String,
    pub message: String,
    pub timestamp: String,
}

/// The snapshot index of one repository
pub struct SnapshotIndex {
    path: PathBuf,
    entries: BTreeMap<String, SnapshotEntry>,
}

impl SnapshotIndex {
    /// Load the index from a repository directory. A missing or unreadable
    /// file starts an empty index (entries are advisory history; the commit
    /// objects are the truth).
    pub fn load(repo_dir: &Path) -> Self {
        let path = repo_dir.join(SNAPSHOTS_FILE);
        let entries = fs::read(&path)
            .ok()
            .and_then(|data| serde_json::from_slice(&data).ok())
            .unwrap_or_default();
        Self { path, entries }
    }

    /// Persist the index
    pub fn save(&self) -> Result<()> {
        let data = serde_json::to_vec_pretty(&self.entries)?;
        fs::write(&self.path, data)?;
        Ok(())
    }

    /// Append an entry for a commit under a fresh uuid, stamped now.
    /// Returns the generated key.
    pub fn record(&mut self, commit: &str, message: &str) -> String {
        let key = Uuid::new_v4().to_string();
        self.entries.insert(
            key.clone(),
            SnapshotEntry {
                commit: commit.to_string(),
                message: message.to_string(),
                timestamp: Utc::now().to_rfc3339(),
            },
        );
        key
    }

    pub fn entries(&self) -> &BTreeMap<String, SnapshotEntry> {
        &self.entries
    }

    /// Entries ordered by timestamp, oldest first. Unparsable timestamps
    /// fall back to string comparison.
    pub fn sorted_by_time(&self) -> Vec<(&str, &SnapshotEntry)> {
        let mut list: Vec<(&str, &SnapshotEntry)> = self
            .entries
            .iter()
            .map(|(k, v)| (k.as_str(), v))
            .collect();

        list.sort_by(|(_, a), (_, b)| {
            let ta = DateTime::parse_from_rfc3339(&a.timestamp);
            let tb = DateTime::parse_from_rfc3339(&b.timestamp);
            match (ta, tb) {
                (Ok(ta), Ok(tb)) => ta.cmp(&tb),
                _ => a.timestamp.cmp(&b.timestamp),
            }
        });

        list
    }

    /// Whether any entry references the given commit id
    pub fn contains_commit(&self, commit: &str) -> bool {
        self.entries.values().any(|e| e.commit == commit)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
