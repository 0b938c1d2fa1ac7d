//! B-tree node definitions
//!
//! A node is one page on disk: an ordered run of key-value entries plus,
//! for internal nodes, one child pointer per gap.

use serde::{Deserialize, Serialize};

/// A single key-value entry. Keys compare lexicographically as byte
/// sequences; values are arbitrary JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyValue {
    pub key: String,
    pub value: serde_json::Value,
}

/// One B-tree node, persisted as `page_<id>.json`.
///
/// Invariants:
/// - `keys` are strictly ascending
/// - internal nodes have `children.len() == keys.len() + 1`
/// - leaves have no children
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: u64,
    pub is_leaf: bool,
    pub keys: Vec<KeyValue>,
    pub children: Vec<u64>,
}

impl Node {
    /// Create an empty leaf node
    pub fn new_leaf(id: u64) -> Self {
        Node {
            id,
            is_leaf: true,
            keys: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Create an internal node with the given children
    pub fn new_internal(id: u64, children: Vec<u64>) -> Self {
        Node {
            id,
            is_leaf: false,
            keys: Vec::new(),
            children,
        }
    }

    /// Index of the first key >= `key` (the descent position for `key`)
    pub fn lower_bound(&self, key: &str) -> usize {
        self.keys
            .partition_point(|kv| kv.key.as_str() < key)
    }

    /// Whether the key at `index` is an exact match for `key`
    pub fn is_match(&self, index: usize, key: &str) -> bool {
        index < self.keys.len() && self.keys[index].key == key
    }
}
