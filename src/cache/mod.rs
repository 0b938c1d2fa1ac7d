//! LRU Cache Module
//!
//! An in-memory read/write-through acceleration layer addressable by
//! `(collection, key)`, with one recency order and one size bound shared
//! across all collections, and an optional JSON checkpoint.

mod lru;

pub use lru::{Cache, CACHE_FILE};
