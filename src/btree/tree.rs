//! B-tree handle and metadata
//!
//! The tree itself is a thin handle: an id allocator, the current root id,
//! and the pager. All node state lives on disk; `metadata.json` records
//! what is needed to find it again.

use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::{NutellaError, Result};

use super::{Node, Pager};

/// Persistent metadata for one B-tree (`metadata.json`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(super) struct Metadata {
    pub root_id: u64,
    pub order: usize,
    pub next_id: u64,
    pub db_id: String,
    pub page_dir: PathBuf,
}

/// A persistent ordered map backed by one JSON file per node.
///
/// ## Concurrency
/// - `meta`: RwLock, exclusive for id allocation and root swaps, shared
///   for reads (single active writer per tree; readers may run in parallel)
/// - node pages: write-through file I/O, no in-memory cache
#[derive(Debug)]
pub struct BTree {
    pub(super) meta: RwLock<Metadata>,
    pub(super) pager: Pager,
}

impl BTree {
    /// Create a new tree of the given order with an empty leaf root
    ///
    /// The order is validated (`>= 3`) and frozen for the life of the tree.
    pub fn create(order: usize, collection: &str, page_dir: &Path) -> Result<Self> {
        if order < 3 {
            return Err(NutellaError::OrderTooSmall(order));
        }

        let pager = Pager::open(page_dir)?;

        let root = Node::new_leaf(1);
        pager.save(&root)?;

        let tree = BTree {
            meta: RwLock::new(Metadata {
                root_id: root.id,
                order,
                next_id: 2,
                db_id: collection.to_string(),
                page_dir: page_dir.to_path_buf(),
            }),
            pager,
        };
        tree.save_metadata()?;

        Ok(tree)
    }

    /// Load an existing tree from its page directory
    ///
    /// The on-disk `page_dir` and `db_id` fields are rebound to the supplied
    /// values so a relocated database keeps working.
    pub fn load(collection: &str, page_dir: &Path) -> Result<Self> {
        let metadata_path = page_dir.join("metadata.json");
        let data = fs::read(&metadata_path)?;
        let mut meta: Metadata = serde_json::from_slice(&data).map_err(|e| {
            NutellaError::NodeCorrupt(format!("{}: {}", metadata_path.display(), e))
        })?;

        meta.page_dir = page_dir.to_path_buf();
        meta.db_id = collection.to_string();

        Ok(BTree {
            pager: Pager::open(page_dir)?,
            meta: RwLock::new(meta),
        })
    }

    /// The tree order `t` (fixed at creation)
    pub fn order(&self) -> usize {
        self.meta.read().order
    }

    /// The current root node id
    pub fn root_id(&self) -> u64 {
        self.meta.read().root_id
    }

    /// Swap the root and persist metadata immediately
    pub(super) fn set_root(&self, id: u64) -> Result<()> {
        self.meta.write().root_id = id;
        self.save_metadata()
    }

    /// Allocate a fresh node id
    pub(super) fn allocate_id(&self) -> u64 {
        let mut meta = self.meta.write();
        let id = meta.next_id;
        meta.next_id += 1;
        id
    }

    /// Write `metadata.json` for this tree
    pub fn save_metadata(&self) -> Result<()> {
        let meta = self.meta.read();
        let path = meta.page_dir.join("metadata.json");
        let data = serde_json::to_vec_pretty(&*meta)?;
        fs::write(path, data)?;
        Ok(())
    }

    /// Persist metadata and release the handle
    pub fn close(&self) -> Result<()> {
        self.save_metadata()
    }

    /// Load the root node, recreating an empty leaf root if the page file
    /// has gone missing. Used by the mutation paths.
    pub(super) fn load_root_or_recreate(&self) -> Result<Node> {
        let root_id = self.root_id();
        match self.pager.try_load(root_id)? {
            Some(node) => Ok(node),
            None => {
                tracing::warn!(root_id, "root page missing, recreating empty root");
                let root = Node::new_leaf(root_id);
                self.pager.save(&root)?;
                Ok(root)
            }
        }
    }
}
