//! Multi-collection LRU cache
//!
//! Entries from every collection share one recency order and one global
//! size bound; the victim is always the least recently touched entry,
//! whichever collection it belongs to.
//!
//! ## Concurrency
//! A single RwLock guards the whole cache. Lookups take it exclusively
//! too: a hit promotes the entry to the front, which mutates recency.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use lru::LruCache;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{NutellaError, Result};

/// Checkpoint file name
pub const CACHE_FILE: &str = "cache.json";

type CacheKey = (String, String);

struct CacheState {
    /// Recency list + map; eviction is driven manually so the collection
    /// bookkeeping stays exact
    entries: LruCache<CacheKey, Value>,

    /// Registered collections → live entry count. A collection appears
    /// here while it is registered, even when it holds no entries.
    collections: HashMap<String, usize>,

    max_size: usize,
}

/// Serializable value-only view (`cache.json`)
#[derive(Serialize, Deserialize)]
struct CacheCheckpoint {
    max_size: usize,
    cache_data: BTreeMap<String, BTreeMap<String, Value>>,
}

/// The LRU cache, keyed by `(collection, key)`
pub struct Cache {
    state: RwLock<CacheState>,
    /// When set, every mutation checkpoints to `<dir>/cache.json`
    persist_dir: Option<PathBuf>,
}

impl Cache {
    /// A purely in-memory cache with the given global bound
    pub fn new(max_size: usize) -> Self {
        Self {
            state: RwLock::new(CacheState {
                entries: LruCache::unbounded(),
                collections: HashMap::new(),
                max_size,
            }),
            persist_dir: None,
        }
    }

    /// A cache that checkpoints to `<dir>/cache.json` after each mutation.
    /// Writes the initial (empty) checkpoint immediately.
    pub fn persistent(max_size: usize, dir: &Path) -> Result<Self> {
        let cache = Self {
            state: RwLock::new(CacheState {
                entries: LruCache::unbounded(),
                collections: HashMap::new(),
                max_size,
            }),
            persist_dir: Some(dir.to_path_buf()),
        };
        cache.save(dir)?;
        Ok(cache)
    }

    /// Rebuild a cache from `<dir>/cache.json`. The recency order of the
    /// rebuilt entries is unspecified. The cache keeps checkpointing to
    /// the same directory.
    pub fn load(dir: &Path) -> Result<Self> {
        let data = fs::read(dir.join(CACHE_FILE))?;
        let checkpoint: CacheCheckpoint = serde_json::from_slice(&data)?;

        let mut entries = LruCache::unbounded();
        let mut collections = HashMap::new();
        for (collection, items) in checkpoint.cache_data {
            collections.insert(collection.clone(), items.len());
            for (key, value) in items {
                entries.put((collection.clone(), key), value);
            }
        }

        Ok(Self {
            state: RwLock::new(CacheState {
                entries,
                collections,
                max_size: checkpoint.max_size,
            }),
            persist_dir: Some(dir.to_path_buf()),
        })
    }

    // =========================================================================
    // Core operations
    // =========================================================================

    /// Insert or refresh an entry, then evict from the tail until the
    /// global bound holds
    pub fn insert(&self, collection: &str, key: &str, value: Value) -> Result<()> {
        {
            let mut state = self.state.write();
            let cache_key = (collection.to_string(), key.to_string());

            if state.entries.contains(&cache_key) {
                // Refresh value and recency; size is unchanged
                state.entries.put(cache_key, value);
            } else {
                state.entries.put(cache_key, value);
                *state
                    .collections
                    .entry(collection.to_string())
                    .or_insert(0) += 1;
                while state.entries.len() > state.max_size {
                    evict_lru(&mut state);
                }
            }
        }
        self.checkpoint()
    }

    /// Look up an entry, promoting it to most recent on a hit
    pub fn find(&self, collection: &str, key: &str) -> Result<Value> {
        let mut state = self.state.write();
        state
            .entries
            .get(&(collection.to_string(), key.to_string()))
            .cloned()
            .ok_or_else(|| NutellaError::KeyNotFound {
                collection: collection.to_string(),
                key: key.to_string(),
            })
    }

    /// Refresh an existing entry; errors when the key is absent
    pub fn update(&self, collection: &str, key: &str, value: Value) -> Result<()> {
        {
            let mut state = self.state.write();
            let cache_key = (collection.to_string(), key.to_string());
            if !state.entries.contains(&cache_key) {
                return Err(NutellaError::KeyNotFound {
                    collection: collection.to_string(),
                    key: key.to_string(),
                });
            }
            state.entries.put(cache_key, value);
        }
        self.checkpoint()
    }

    /// Remove an entry; an emptied collection bucket is dropped
    pub fn delete(&self, collection: &str, key: &str) -> Result<()> {
        {
            let mut state = self.state.write();
            if !state.collections.contains_key(collection) {
                return Err(NutellaError::CollectionNotFound(collection.to_string()));
            }
            if state
                .entries
                .pop(&(collection.to_string(), key.to_string()))
                .is_none()
            {
                return Err(NutellaError::KeyNotFound {
                    collection: collection.to_string(),
                    key: key.to_string(),
                });
            }
            release_collection_slot(&mut state, collection);
        }
        self.checkpoint()
    }

    /// Register an empty collection bucket; errors when it already exists
    pub fn add_collection(&self, collection: &str) -> Result<()> {
        {
            let mut state = self.state.write();
            if state.collections.contains_key(collection) {
                return Err(NutellaError::CollectionExists(collection.to_string()));
            }
            state.collections.insert(collection.to_string(), 0);
        }
        self.checkpoint()
    }

    /// Drop every entry and collection bucket
    pub fn clear(&self) -> Result<()> {
        {
            let mut state = self.state.write();
            state.entries.clear();
            state.collections.clear();
        }
        self.checkpoint()
    }

    // =========================================================================
    // Introspection
    // =========================================================================

    /// Keys currently cached for one collection
    pub fn keys(&self, collection: &str) -> Vec<String> {
        let state = self.state.read();
        state
            .entries
            .iter()
            .filter(|((c, _), _)| c.as_str() == collection)
            .map(|((_, k), _)| k.clone())
            .collect()
    }

    /// Every registered collection name
    pub fn collections(&self) -> Vec<String> {
        let state = self.state.read();
        let mut names: Vec<String> = state.collections.keys().cloned().collect();
        names.sort();
        names
    }

    /// Total entry count across all collections
    pub fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn max_size(&self) -> usize {
        self.state.read().max_size
    }

    /// Change the global bound, trimming from the tail when shrinking
    pub fn set_max_size(&self, max_size: usize) -> Result<()> {
        {
            let mut state = self.state.write();
            state.max_size = max_size;
            while state.entries.len() > state.max_size {
                evict_lru(&mut state);
            }
        }
        self.checkpoint()
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    /// Write the value-only view to `<dir>/cache.json`
    pub fn save(&self, dir: &Path) -> Result<()> {
        let state = self.state.read();

        let mut cache_data: BTreeMap<String, BTreeMap<String, Value>> = state
            .collections
            .keys()
            .map(|c| (c.clone(), BTreeMap::new()))
            .collect();
        for ((collection, key), value) in state.entries.iter() {
            cache_data
                .entry(collection.clone())
                .or_default()
                .insert(key.clone(), value.clone());
        }

        let checkpoint = CacheCheckpoint {
            max_size: state.max_size,
            cache_data,
        };
        let data = serde_json::to_vec_pretty(&checkpoint)?;
        fs::write(dir.join(CACHE_FILE), data)?;
        Ok(())
    }

    fn checkpoint(&self) -> Result<()> {
        match &self.persist_dir {
            Some(dir) => self.save(dir),
            None => Ok(()),
        }
    }
}

/// Evict the least recently used entry and release its collection slot
fn evict_lru(state: &mut CacheState) {
    if let Some(((collection, _key), _value)) = state.entries.pop_lru() {
        release_collection_slot(state, &collection);
    }
}

fn release_collection_slot(state: &mut CacheState, collection: &str) {
    if let Some(count) = state.collections.get_mut(collection) {
        *count = count.saturating_sub(1);
        if *count == 0 {
            state.collections.remove(collection);
        }
    }
}
