//! Collection handles
//!
//! A collection is a named B-tree inside a database directory. Handles are
//! cheap to share (`Arc`) and safe to reopen.

use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::btree::{BTree, KeyValue};
use crate::error::Result;

/// Subdirectory holding a collection's node pages
const PAGES_DIR: &str = "pages";

/// A named, B-tree-backed collection
#[derive(Debug)]
pub struct Collection {
    name: String,
    order: usize,
    base_dir: PathBuf,
    btree: BTree,
}

impl Collection {
    /// Create a fresh collection of the given order under `base_dir`
    pub(super) fn create(name: &str, order: usize, base_dir: &Path) -> Result<Self> {
        let btree = BTree::create(order, name, &base_dir.join(PAGES_DIR))?;
        Ok(Self {
            name: name.to_string(),
            order,
            base_dir: base_dir.to_path_buf(),
            btree,
        })
    }

    /// Load an existing collection from `base_dir`
    pub(super) fn load(name: &str, base_dir: &Path) -> Result<Self> {
        let btree = BTree::load(name, &base_dir.join(PAGES_DIR))?;
        Ok(Self {
            name: name.to_string(),
            order: btree.order(),
            base_dir: base_dir.to_path_buf(),
            btree,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn order(&self) -> usize {
        self.order
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Insert or replace a key-value pair
    pub fn insert(&self, key: &str, value: Value) -> Result<()> {
        self.btree.insert(key, value)
    }

    /// Look up a key
    pub fn find(&self, key: &str) -> Result<Option<Value>> {
        self.btree.find(key)
    }

    /// Every entry, keys ascending
    pub fn find_all(&self) -> Result<Vec<KeyValue>> {
        self.btree.find_all()
    }

    /// Replace the value of an existing key; `false` when absent
    pub fn update(&self, key: &str, value: Value) -> Result<bool> {
        self.btree.update(key, value)
    }

    /// Update an existing key, inserting instead when it is absent
    pub fn upsert(&self, key: &str, value: Value) -> Result<()> {
        if !self.btree.update(key, value.clone())? {
            self.btree.insert(key, value)?;
        }
        Ok(())
    }

    /// Delete a key; `true` when it was present
    pub fn delete(&self, key: &str) -> Result<bool> {
        self.btree.delete(key)
    }

    /// Run the structural repair walk over the backing tree
    pub fn repair(&self) -> Result<()> {
        self.btree.repair_tree()
    }

    /// Persist tree metadata
    pub fn close(&self) -> Result<()> {
        self.btree.close()
    }
}
