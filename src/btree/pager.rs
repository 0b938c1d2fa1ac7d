//! Node page I/O
//!
//! Each node lives in its own JSON file under the tree's page directory.
//! All writes are write-through: a saved node is durable before the call
//! returns, so a crash never loses an acknowledged mutation (though it can
//! leave sibling pages inconsistent, which the delete path self-heals).

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{NutellaError, Result};

use super::Node;

/// File-backed page store for one B-tree
#[derive(Debug)]
pub struct Pager {
    page_dir: PathBuf,
}

impl Pager {
    /// Create a pager rooted at `page_dir`, creating the directory if needed
    pub fn open(page_dir: &Path) -> Result<Self> {
        fs::create_dir_all(page_dir)?;
        Ok(Self {
            page_dir: page_dir.to_path_buf(),
        })
    }

    /// Path of the page file for a node id
    pub fn page_path(&self, id: u64) -> PathBuf {
        self.page_dir.join(format!("page_{}.json", id))
    }

    /// Whether the page file for a node exists
    pub fn exists(&self, id: u64) -> bool {
        self.page_path(id).is_file()
    }

    /// Persist a node to its page file
    pub fn save(&self, node: &Node) -> Result<()> {
        let data = serde_json::to_vec_pretty(node)?;
        fs::write(self.page_path(node.id), data)?;
        Ok(())
    }

    /// Load a node; a missing page file is an error
    pub fn load(&self, id: u64) -> Result<Node> {
        let path = self.page_path(id);
        let data = fs::read(&path)?;
        serde_json::from_slice(&data)
            .map_err(|e| NutellaError::NodeCorrupt(format!("{}: {}", path.display(), e)))
    }

    /// Load a node, mapping a missing page file to `None`
    pub fn try_load(&self, id: u64) -> Result<Option<Node>> {
        let path = self.page_path(id);
        let data = match fs::read(&path) {
            Ok(d) => d,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let node = serde_json::from_slice(&data)
            .map_err(|e| NutellaError::NodeCorrupt(format!("{}: {}", path.display(), e)))?;
        Ok(Some(node))
    }

    /// Delete a node's page file; already-gone files are not an error
    pub fn remove(&self, id: u64) -> Result<()> {
        match fs::remove_file(self.page_path(id)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
