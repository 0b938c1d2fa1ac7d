//! B-tree deletion and structural repair
//!
//! Classical delete: a key found in an internal node is replaced by its
//! in-order predecessor, which is then deleted from the child subtree; any
//! child entered with fewer than `t` keys is first topped up by
//! `ensure_min_keys` (borrow from a sibling, else merge).
//!
//! Every node dereference on this path tolerates a missing page file: the
//! dangling reference is pruned, the repaired parent is saved, and the
//! operation continues. Missing pages are logged as warnings, never
//! surfaced. `repair_tree` runs the same pruning walk on demand.

use tracing::warn;

use crate::error::Result;

use super::{BTree, KeyValue, Node};

impl BTree {
    /// Delete a key. Returns `true` when the key was present.
    pub fn delete(&self, key: &str) -> Result<bool> {
        let root = match self.pager.try_load(self.root_id())? {
            Some(node) => node,
            // No root page: the tree is empty
            None => return Ok(false),
        };

        let deleted = self.delete_from(root, key)?;

        // If the delete emptied an internal root, promote its sole child.
        if let Some(mut root) = self.pager.try_load(self.root_id())? {
            if root.keys.is_empty() && !root.is_leaf {
                if let Some(&child) = root.children.first() {
                    let old_root = root.id;
                    self.set_root(child)?;
                    self.pager.remove(old_root)?;
                } else {
                    warn!(node = root.id, "internal root lost all children, demoting to leaf");
                    root.is_leaf = true;
                    self.pager.save(&root)?;
                }
            }
        }

        Ok(deleted)
    }

    fn delete_from(&self, mut node: Node, key: &str) -> Result<bool> {
        let order = self.order();
        let index = node.lower_bound(key);

        // Case 1: the key lives in this node
        if node.is_match(index, key) {
            if node.is_leaf {
                node.keys.remove(index);
                self.pager.save(&node)?;
                return Ok(true);
            }

            // Internal node: swap in the in-order predecessor, then delete
            // the predecessor from the child subtree.
            if index < node.children.len() && !self.pager.exists(node.children[index]) {
                warn!(
                    node = node.id,
                    child = node.children[index],
                    "missing child page under deleted key, pruning entry"
                );
                node.keys.remove(index);
                node.children.remove(index);
                self.pager.save(&node)?;
                return Ok(true);
            }

            let pred = match self.predecessor(&node, index)? {
                Some(kv) => kv,
                None => {
                    warn!(node = node.id, key, "no predecessor available, dropping key in place");
                    node.keys.remove(index);
                    if index < node.children.len() {
                        node.children.remove(index);
                    }
                    self.pager.save(&node)?;
                    return Ok(true);
                }
            };

            node.keys[index] = pred.clone();
            self.pager.save(&node)?;

            let child = match self.pager.try_load(node.children[index])? {
                Some(c) => c,
                None => {
                    warn!(node = node.id, "predecessor child vanished, pruning entry");
                    node.keys.remove(index);
                    node.children.remove(index);
                    self.pager.save(&node)?;
                    return Ok(true);
                }
            };

            if child.keys.len() < order {
                if self.ensure_min_keys(&mut node, index)? {
                    // Restructuring may have moved the separator or merged
                    // the child; re-resolve against the repaired parent.
                    self.delete_from(node, &pred.key)?;
                } else {
                    self.delete_from(child, &pred.key)?;
                }
                return Ok(true);
            }

            self.delete_from(child, &pred.key)?;
            return Ok(true);
        }

        // Case 2: the key is not in this node
        if node.is_leaf {
            return Ok(false);
        }
        if index >= node.children.len() {
            return Ok(false);
        }

        let child = match self.pager.try_load(node.children[index])? {
            Some(c) => c,
            None => {
                warn!(
                    node = node.id,
                    child = node.children[index],
                    "missing child page on descent, pruning reference"
                );
                node.children.remove(index);
                if index < node.keys.len() {
                    node.keys.remove(index);
                }
                self.pager.save(&node)?;
                return Ok(false);
            }
        };

        if child.keys.len() < order {
            if self.ensure_min_keys(&mut node, index)? {
                // Indices may be stale after a borrow or merge; restart the
                // descent from the repaired parent.
                return self.delete_from(node, key);
            }
            // Nothing to borrow or merge; descend into the child as-is
            return self.delete_from(child, key);
        }

        self.delete_from(child, key)
    }

    /// Rightmost key of the subtree left of `node.keys[index]`.
    ///
    /// Returns `None` when the subtree is structurally unusable; callers
    /// treat that as a repair situation.
    fn predecessor(&self, node: &Node, index: usize) -> Result<Option<KeyValue>> {
        if index >= node.children.len() {
            return Ok(None);
        }

        let mut current = match self.pager.try_load(node.children[index])? {
            Some(c) => c,
            None => return Ok(None),
        };

        while !current.is_leaf {
            let Some(&last) = current.children.last() else {
                return Ok(None);
            };
            match self.pager.try_load(last)? {
                Some(next) => current = next,
                // The rightmost child is gone; this node's last key is the
                // best predecessor still reachable.
                None => return Ok(current.keys.last().cloned()),
            }
        }

        Ok(current.keys.last().cloned())
    }

    /// Bring `parent.children[index]` up to at least `t` keys.
    ///
    /// Preference order: borrow from the left sibling, borrow from the
    /// right sibling, merge with a sibling. Missing sibling pages are
    /// pruned from the parent instead of faulting.
    ///
    /// Returns `true` when the parent was restructured in any way, so the
    /// caller knows its child indices are stale.
    pub(super) fn ensure_min_keys(&self, parent: &mut Node, index: usize) -> Result<bool> {
        let order = self.order();

        if index >= parent.children.len() {
            return Ok(false);
        }
        if !self.pager.exists(parent.children[index]) {
            warn!(node = parent.id, child = parent.children[index], "pruning missing child");
            parent.children.remove(index);
            if index < parent.keys.len() {
                parent.keys.remove(index);
            }
            self.pager.save(parent)?;
            return Ok(true);
        }

        let mut child = self.pager.load(parent.children[index])?;
        if child.keys.len() >= order {
            return Ok(false);
        }

        // Borrow from the left sibling
        if index > 0 {
            if !self.pager.exists(parent.children[index - 1]) {
                warn!(node = parent.id, "pruning missing left sibling");
                parent.children.remove(index - 1);
                if index - 1 < parent.keys.len() {
                    parent.keys.remove(index - 1);
                }
                self.pager.save(parent)?;
                return Ok(true);
            }

            let mut left = self.pager.load(parent.children[index - 1])?;
            if left.keys.len() >= order {
                // Parent separator drops into the child; the sibling's last
                // key takes its place (and its last child moves over).
                child.keys.insert(0, parent.keys[index - 1].clone());
                parent.keys[index - 1] = left.keys.remove(left.keys.len() - 1);
                if !child.is_leaf && !left.children.is_empty() {
                    let moved = left.children.remove(left.children.len() - 1);
                    child.children.insert(0, moved);
                }

                self.pager.save(parent)?;
                self.pager.save(&child)?;
                self.pager.save(&left)?;
                return Ok(true);
            }
        }

        // Borrow from the right sibling
        if index + 1 < parent.children.len() {
            if !self.pager.exists(parent.children[index + 1]) {
                warn!(node = parent.id, "pruning missing right sibling");
                parent.children.remove(index + 1);
                if index < parent.keys.len() {
                    parent.keys.remove(index);
                }
                self.pager.save(parent)?;
                return Ok(true);
            }

            let mut right = self.pager.load(parent.children[index + 1])?;
            if right.keys.len() >= order {
                child.keys.push(parent.keys[index].clone());
                parent.keys[index] = right.keys.remove(0);
                if !child.is_leaf && !right.children.is_empty() {
                    child.children.push(right.children.remove(0));
                }

                self.pager.save(parent)?;
                self.pager.save(&child)?;
                self.pager.save(&right)?;
                return Ok(true);
            }
        }

        // Neither sibling can spare a key: merge
        if index > 0 {
            let mut left = self.pager.load(parent.children[index - 1])?;
            self.merge_nodes(parent, index - 1, &mut left, child)
        } else if index + 1 < parent.children.len() {
            let right = self.pager.load(parent.children[index + 1])?;
            self.merge_nodes(parent, index, &mut child, right)
        } else {
            // Only child of its parent; nothing to borrow or merge
            Ok(false)
        }
    }

    /// Merge `right` into `left` around `parent.keys[sep_index]`, removing
    /// the separator and the right child pointer, and deleting the right
    /// node's page file. Returns `true` when the merge happened.
    fn merge_nodes(
        &self,
        parent: &mut Node,
        sep_index: usize,
        left: &mut Node,
        right: Node,
    ) -> Result<bool> {
        if sep_index >= parent.keys.len() {
            warn!(node = parent.id, sep_index, "merge skipped, separator out of range");
            return Ok(false);
        }

        left.keys.push(parent.keys.remove(sep_index));
        left.keys.extend(right.keys);
        if !left.is_leaf {
            left.children.extend(right.children);
        }

        if sep_index + 1 < parent.children.len() {
            parent.children.remove(sep_index + 1);
        } else {
            parent.children.truncate(sep_index + 1);
        }

        self.pager.save(parent)?;
        self.pager.save(left)?;
        self.pager.remove(right.id)?;

        Ok(true)
    }

    /// Walk the whole tree from the root, pruning references to missing
    /// pages and restoring the separator-count invariant. A missing root is
    /// recreated as an empty leaf.
    pub fn repair_tree(&self) -> Result<()> {
        let root = match self.pager.try_load(self.root_id())? {
            Some(node) => node,
            None => {
                warn!(root = self.root_id(), "root page missing, recreating empty root");
                let root = Node::new_leaf(self.root_id());
                return self.pager.save(&root);
            }
        };
        self.repair_node(root)
    }

    fn repair_node(&self, mut node: Node) -> Result<()> {
        if node.is_leaf {
            return self.pager.save(&node);
        }

        let mut children = Vec::with_capacity(node.children.len());
        let mut keys = Vec::with_capacity(node.keys.len());

        for (i, &child_id) in node.children.iter().enumerate() {
            if !self.pager.exists(child_id) {
                warn!(node = node.id, child = child_id, "dropping missing child during repair");
                continue;
            }

            children.push(child_id);
            if i > 0 && i - 1 < node.keys.len() {
                keys.push(node.keys[i - 1].clone());
            }

            if let Some(child) = self.pager.try_load(child_id)? {
                if let Err(e) = self.repair_node(child) {
                    warn!(child = child_id, error = %e, "failed to repair subtree");
                }
            }
        }

        // An internal node carries exactly one separator fewer than children.
        if !children.is_empty() && keys.len() >= children.len() {
            keys.truncate(children.len() - 1);
        }

        node.children = children;
        node.keys = keys;
        if node.children.is_empty() {
            node.is_leaf = true;
        }

        self.pager.save(&node)
    }
}
