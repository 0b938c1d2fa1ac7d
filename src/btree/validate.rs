//! Structural validation
//!
//! Read-only counterpart to `repair_tree`: walks the tree and verifies the
//! node invariants, reporting the first violation found.

use crate::error::{NutellaError, Result};

use super::{BTree, Node};

impl BTree {
    /// Verify the structural invariants of the whole tree:
    /// - keys strictly ascending within every node
    /// - internal nodes carry exactly one more child than keys
    /// - every node holds at most `2t - 1` keys, and every non-root node
    ///   at least `t - 1`
    pub fn validate(&self) -> Result<()> {
        let root = match self.pager.try_load(self.root_id())? {
            Some(node) => node,
            // No root page: an empty tree is trivially valid
            None => return Ok(()),
        };
        self.validate_node(&root, true)
    }

    fn validate_node(&self, node: &Node, is_root: bool) -> Result<()> {
        let order = self.order();

        for pair in node.keys.windows(2) {
            if pair[0].key >= pair[1].key {
                return Err(NutellaError::NodeCorrupt(format!(
                    "node {}: keys not strictly ascending",
                    node.id
                )));
            }
        }

        if node.keys.len() > 2 * order - 1 {
            return Err(NutellaError::NodeCorrupt(format!(
                "node {}: {} keys exceeds maximum {}",
                node.id,
                node.keys.len(),
                2 * order - 1
            )));
        }
        if !is_root && node.keys.len() < order - 1 {
            return Err(NutellaError::NodeCorrupt(format!(
                "node {}: {} keys below minimum {}",
                node.id,
                node.keys.len(),
                order - 1
            )));
        }

        if node.is_leaf {
            if !node.children.is_empty() {
                return Err(NutellaError::NodeCorrupt(format!(
                    "node {}: leaf with children",
                    node.id
                )));
            }
            return Ok(());
        }

        if node.children.len() != node.keys.len() + 1 {
            return Err(NutellaError::NodeCorrupt(format!(
                "node {}: {} children for {} keys",
                node.id,
                node.children.len(),
                node.keys.len()
            )));
        }

        for &child_id in &node.children {
            let child = self.pager.load(child_id)?;
            self.validate_node(&child, false)?;
        }

        Ok(())
    }
}
