//! B-tree lookup and full scans

use serde_json::Value;

use crate::error::Result;

use super::{BTree, KeyValue, Node};

impl BTree {
    /// Look up a key. Returns `None` when the key is absent.
    pub fn find(&self, key: &str) -> Result<Option<Value>> {
        let root = match self.pager.try_load(self.root_id())? {
            Some(node) => node,
            // A missing root page means an empty tree
            None => return Ok(None),
        };
        self.find_in(root, key)
    }

    fn find_in(&self, node: Node, key: &str) -> Result<Option<Value>> {
        let index = node.lower_bound(key);

        if node.is_match(index, key) {
            return Ok(Some(node.keys[index].value.clone()));
        }
        if node.is_leaf || index >= node.children.len() {
            return Ok(None);
        }

        let child = self.pager.load(node.children[index])?;
        self.find_in(child, key)
    }

    /// In-order traversal of every entry, keys strictly ascending
    pub fn find_all(&self) -> Result<Vec<KeyValue>> {
        let mut result = Vec::new();
        if let Some(root) = self.pager.try_load(self.root_id())? {
            self.collect_in_order(&root, &mut result)?;
        }
        Ok(result)
    }

    fn collect_in_order(&self, node: &Node, out: &mut Vec<KeyValue>) -> Result<()> {
        if node.is_leaf {
            out.extend(node.keys.iter().cloned());
            return Ok(());
        }

        // Interleave children and separators: child[0], key[0], child[1], ...
        for (i, kv) in node.keys.iter().enumerate() {
            let child = self.pager.load(node.children[i])?;
            self.collect_in_order(&child, out)?;
            out.push(kv.clone());
        }
        if let Some(&last) = node.children.last() {
            let child = self.pager.load(last)?;
            self.collect_in_order(&child, out)?;
        }

        Ok(())
    }
}
