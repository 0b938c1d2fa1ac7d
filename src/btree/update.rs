//! In-place value updates

use serde_json::Value;

use crate::error::Result;

use super::{BTree, Node};

impl BTree {
    /// Replace the value of an existing key.
    ///
    /// Returns `false` (without modifying the tree) when the key is absent;
    /// the caller decides whether to insert instead.
    pub fn update(&self, key: &str, value: Value) -> Result<bool> {
        let root = match self.pager.try_load(self.root_id())? {
            Some(node) => node,
            None => return Ok(false),
        };
        self.update_in(root, key, value)
    }

    fn update_in(&self, mut node: Node, key: &str, value: Value) -> Result<bool> {
        let index = node.lower_bound(key);

        if node.is_match(index, key) {
            node.keys[index].value = value;
            self.pager.save(&node)?;
            return Ok(true);
        }
        if node.is_leaf || index >= node.children.len() {
            return Ok(false);
        }

        let child = self.pager.load(node.children[index])?;
        self.update_in(child, key, value)
    }
}
