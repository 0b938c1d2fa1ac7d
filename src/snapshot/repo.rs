//! Snapshot repository
//!
//! Captures and restores a working directory as a commit tree. The
//! repository root is always explicit; nothing here changes the process
//! working directory.
//!
//! ## Repository Layout
//! ```text
//! <root>/.nutella/
//!   HEAD                      "ref: refs/heads/main\n"
//!   objects/<xx>/<38-hex>     zlib-compressed framed objects
//!   objects/pack/             packfiles
//!   refs/
//!   snapshots.json            {uuid: {commit, message, timestamp}}
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::config::DeltaPolicy;
use crate::error::{NutellaError, Result};
use crate::objects::{split_frame, ObjectKind, ObjectStore, PackSummary};

use super::ignore::IgnoreList;
use super::index::SnapshotIndex;

/// Repository metadata directory name, at the working-tree root
pub const REPO_DIR: &str = ".nutella";

/// Ignore file name, preserved across restores
pub const IGNORE_FILE: &str = super::ignore::IGNORE_FILE;

const HEAD_CONTENTS: &str = "ref: refs/heads/main\n";

const MODE_FILE: &str = "100644";
const MODE_DIR: &str = "40000";
const MODE_DIR_ALT: &str = "040000";

/// A snapshot repository over one working directory
#[derive(Debug)]
pub struct Repository {
    root: PathBuf,
    store: ObjectStore,
}

impl Repository {
    /// Initialize the repository layout under `root` (idempotent) and
    /// return a handle.
    pub fn init(root: &Path) -> Result<Self> {
        Self::init_with_policy(root, DeltaPolicy::default())
    }

    /// Initialize with explicit delta tunables
    pub fn init_with_policy(root: &Path, policy: DeltaPolicy) -> Result<Self> {
        let repo_dir = root.join(REPO_DIR);
        fs::create_dir_all(repo_dir.join("objects"))?;
        fs::create_dir_all(repo_dir.join("refs"))?;

        let head = repo_dir.join("HEAD");
        if !head.is_file() {
            fs::write(head, HEAD_CONTENTS)?;
        }
        let snapshots = repo_dir.join(super::index::SNAPSHOTS_FILE);
        if !snapshots.is_file() {
            fs::write(snapshots, b"{}")?;
        }

        info!(root = %root.display(), "initialized snapshot repository");

        Ok(Self {
            store: ObjectStore::with_policy(&repo_dir.join("objects"), policy),
            root: root.to_path_buf(),
        })
    }

    /// Open an existing repository
    pub fn open(root: &Path) -> Result<Self> {
        Self::open_with_policy(root, DeltaPolicy::default())
    }

    /// Open an existing repository with explicit delta tunables
    pub fn open_with_policy(root: &Path, policy: DeltaPolicy) -> Result<Self> {
        let repo_dir = root.join(REPO_DIR);
        if !repo_dir.is_dir() {
            return Err(NutellaError::RepositoryNotFound(
                root.display().to_string(),
            ));
        }
        Ok(Self {
            store: ObjectStore::with_policy(&repo_dir.join("objects"), policy),
            root: root.to_path_buf(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn store(&self) -> &ObjectStore {
        &self.store
    }

    fn repo_dir(&self) -> PathBuf {
        self.root.join(REPO_DIR)
    }

    // =========================================================================
    // Commit
    // =========================================================================

    /// Snapshot the working tree: walk it honoring ignore rules, write the
    /// blob/tree objects, create the commit object, and append a snapshot
    /// entry. Returns the commit id.
    pub fn commit(&self, message: &str) -> Result<String> {
        if message.trim().is_empty() {
            return Err(NutellaError::EmptyCommitMessage);
        }

        let ignores = IgnoreList::load(&self.root)?;
        let tree_id = self.write_tree(Path::new(""), &ignores)?;

        let content = format!("tree {}\n\n{}\n", tree_id, message);
        let commit_id = self
            .store
            .write_object(ObjectKind::Commit, content.as_bytes())?;

        let mut index = SnapshotIndex::load(&self.repo_dir());
        index.record(&commit_id, message);
        index.save()?;

        info!(commit = %commit_id, "recorded snapshot");

        Ok(commit_id)
    }

    /// Write a tree object for one directory, recursing into subtrees.
    /// Entries are emitted in readdir order, not sorted.
    fn write_tree(&self, rel_dir: &Path, ignores: &IgnoreList) -> Result<String> {
        let full_dir = self.root.join(rel_dir);
        let mut payload = Vec::new();

        for entry in fs::read_dir(&full_dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if name == REPO_DIR {
                continue;
            }

            let rel = if rel_dir.as_os_str().is_empty() {
                PathBuf::from(&name)
            } else {
                rel_dir.join(&name)
            };
            if ignores.matches(&rel.to_string_lossy()) {
                continue;
            }

            let (mode, id) = if entry.file_type()?.is_dir() {
                (MODE_DIR, self.write_tree(&rel, ignores)?)
            } else {
                let content = fs::read(entry.path())?;
                (MODE_FILE, self.store.write_blob(&content)?)
            };

            // Entry: "<mode> <name>\0<raw-sha-20>"
            payload.extend_from_slice(mode.as_bytes());
            payload.push(b' ');
            payload.extend_from_slice(name.as_bytes());
            payload.push(0);
            let raw = hex::decode(&id)
                .map_err(|e| NutellaError::CorruptObject(format!("bad object id {}: {}", id, e)))?;
            payload.extend_from_slice(&raw);
        }

        self.store.write_object(ObjectKind::Tree, &payload)
    }

    // =========================================================================
    // Restore
    // =========================================================================

    /// Restore the working tree to a commit: clean the root (keeping the
    /// repository directory, the ignore file, and ignored paths), then
    /// re-materialize the commit's tree.
    pub fn restore(&self, commit_id: &str) -> Result<()> {
        let framed = self.store.read(commit_id)?;
        let (_header, payload) = split_frame(&framed)?;

        // First line of the commit body: "tree <id>"
        let body = std::str::from_utf8(payload)
            .map_err(|_| NutellaError::CorruptObject("non-UTF8 commit body".to_string()))?;
        let first_line = body.lines().next().unwrap_or("");
        let tree_id = first_line.strip_prefix("tree ").ok_or_else(|| {
            NutellaError::CorruptObject(format!("commit {} has no tree reference", commit_id))
        })?;

        let ignores = IgnoreList::load(&self.root)?;
        self.clean_working_dir(&ignores)?;
        self.restore_tree(tree_id, Path::new(""), &ignores)?;

        info!(commit = %commit_id, "restored working tree");

        Ok(())
    }

    /// Delete every top-level entry except the repository directory, the
    /// ignore file, and anything matching an ignore pattern.
    fn clean_working_dir(&self, ignores: &IgnoreList) -> Result<()> {
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if name == REPO_DIR || name == IGNORE_FILE || ignores.matches(&name) {
                continue;
            }
            if entry.file_type()?.is_dir() {
                fs::remove_dir_all(entry.path())?;
            } else {
                fs::remove_file(entry.path())?;
            }
        }
        Ok(())
    }

    /// Re-materialize one tree object at `rel_dir`, depth first
    fn restore_tree(&self, tree_id: &str, rel_dir: &Path, ignores: &IgnoreList) -> Result<()> {
        let framed = self.store.read(tree_id)?;
        let (_header, body) = split_frame(&framed)?;

        for entry in parse_tree_entries(body)? {
            let rel = if rel_dir.as_os_str().is_empty() {
                PathBuf::from(&entry.name)
            } else {
                rel_dir.join(&entry.name)
            };
            if ignores.matches(&rel.to_string_lossy()) {
                continue;
            }

            let dest = self.root.join(&rel);
            match entry.mode.as_str() {
                MODE_FILE => {
                    let blob = self.store.read(&entry.id)?;
                    let (_h, content) = split_frame(&blob)?;
                    if let Some(parent) = dest.parent() {
                        fs::create_dir_all(parent)?;
                    }
                    fs::write(dest, content)?;
                }
                MODE_DIR | MODE_DIR_ALT => {
                    fs::create_dir_all(&dest)?;
                    self.restore_tree(&entry.id, &rel, ignores)?;
                }
                other => {
                    warn!(mode = other, name = %entry.name, "skipping tree entry with unknown mode");
                }
            }
        }

        Ok(())
    }

    // =========================================================================
    // History & maintenance
    // =========================================================================

    /// The snapshot index of this repository
    pub fn snapshots(&self) -> SnapshotIndex {
        SnapshotIndex::load(&self.repo_dir())
    }

    /// Compile loose objects into a packfile
    pub fn pack(&self) -> Result<Option<PackSummary>> {
        self.store.pack()
    }
}

struct TreeEntry {
    mode: String,
    name: String,
    id: String,
}

/// Parse concatenated `<mode> <name>\0<raw-sha-20>` entries
fn parse_tree_entries(body: &[u8]) -> Result<Vec<TreeEntry>> {
    let mut entries = Vec::new();
    let mut i = 0;

    while i < body.len() {
        let space = body[i..]
            .iter()
            .position(|&b| b == b' ')
            .ok_or_else(|| NutellaError::CorruptObject("tree entry missing mode".to_string()))?;
        let mode = std::str::from_utf8(&body[i..i + space])
            .map_err(|_| NutellaError::CorruptObject("non-UTF8 tree mode".to_string()))?
            .to_string();
        i += space + 1;

        let nul = body[i..]
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| NutellaError::CorruptObject("tree entry missing name".to_string()))?;
        let name = String::from_utf8_lossy(&body[i..i + nul]).into_owned();
        i += nul + 1;

        if i + 20 > body.len() {
            return Err(NutellaError::CorruptObject(
                "tree entry truncated before sha".to_string(),
            ));
        }
        let id = hex::encode(&body[i..i + 20]);
        i += 20;

        entries.push(TreeEntry { mode, name, id });
    }

    Ok(entries)
}
