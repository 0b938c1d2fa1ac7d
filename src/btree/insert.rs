//! B-tree insertion
//!
//! Pre-emptive split descent: any full child is split before it is entered,
//! so there is always room at the leaf. An exact key match anywhere on the
//! path replaces the value in place.

use serde_json::Value;

use crate::error::Result;

use super::{BTree, KeyValue, Node};

impl BTree {
    /// Insert or replace a key-value pair
    pub fn insert(&self, key: &str, value: Value) -> Result<()> {
        let order = self.order();
        let root = self.load_root_or_recreate()?;

        if root.keys.len() == 2 * order - 1 {
            // Root is full: grow a new root above it, then split
            let mut new_root = Node::new_internal(self.allocate_id(), vec![root.id]);
            let mut old_root = root;
            self.split_child(&mut new_root, 0, &mut old_root)?;
            self.set_root(new_root.id)?;
            return self.insert_non_full(new_root, key, value);
        }

        self.insert_non_full(root, key, value)
    }

    /// Split the full `child` at `parent.children[index]`.
    ///
    /// Promotes the middle key into the parent at `index` and moves the
    /// upper half of keys (and children, if internal) into a fresh node at
    /// `index + 1`. Both halves end up with exactly `t - 1` keys.
    pub(super) fn split_child(
        &self,
        parent: &mut Node,
        index: usize,
        child: &mut Node,
    ) -> Result<()> {
        let order = self.order();

        let mut upper = child.keys.split_off(order - 1);
        let middle = upper.remove(0);

        let mut sibling = Node {
            id: self.allocate_id(),
            is_leaf: child.is_leaf,
            keys: upper,
            children: Vec::new(),
        };
        if !child.is_leaf {
            sibling.children = child.children.split_off(order);
        }

        parent.children.insert(index + 1, sibling.id);
        parent.keys.insert(index, middle);

        self.pager.save(parent)?;
        self.pager.save(child)?;
        self.pager.save(&sibling)?;

        Ok(())
    }

    /// Insert into a subtree whose root is known not to be full
    fn insert_non_full(&self, mut node: Node, key: &str, value: Value) -> Result<()> {
        let order = self.order();
        let index = node.lower_bound(key);

        if node.is_match(index, key) {
            node.keys[index].value = value;
            return self.pager.save(&node);
        }

        if node.is_leaf {
            node.keys.insert(
                index,
                KeyValue {
                    key: key.to_string(),
                    value,
                },
            );
            return self.pager.save(&node);
        }

        if index >= node.children.len() {
            return Err(crate::error::NutellaError::NodeCorrupt(format!(
                "node {}: no child at descent position {}",
                node.id, index
            )));
        }
        let mut child = self.pager.load(node.children[index])?;

        if child.keys.len() == 2 * order - 1 {
            self.split_child(&mut node, index, &mut child)?;

            // The promoted middle key now sits at `index`; decide which half
            // the key belongs to (or whether it equals the middle itself).
            if key > node.keys[index].key.as_str() {
                child = self.pager.load(node.children[index + 1])?;
            } else if key == node.keys[index].key {
                node.keys[index].value = value;
                return self.pager.save(&node);
            }
            // Otherwise `child` is already the truncated lower half.
        }

        self.insert_non_full(child, key, value)
    }
}
