//! Configuration for NutellaDB
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

/// Main configuration for a NutellaDB instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Directory under which databases are created
    pub root_dir: PathBuf,

    /// Default B-tree order for new collections (minimum 3)
    pub default_order: usize,

    // -------------------------------------------------------------------------
    // Delta Compression Configuration
    // -------------------------------------------------------------------------
    /// Tunables for the object store's delta encoder
    pub delta: DeltaPolicy,

    // -------------------------------------------------------------------------
    // Cache Configuration
    // -------------------------------------------------------------------------
    /// Max number of entries across all collections in the LRU cache
    pub cache_max_size: usize,

    /// Checkpoint the cache to cache.json after every mutation
    pub cache_persistent: bool,
}

/// Thresholds governing when a blob is stored as a delta against a similar
/// base, and how deep a delta chain may grow before reads reject it.
#[derive(Debug, Clone, Copy)]
pub struct DeltaPolicy {
    /// Minimum sampled-byte similarity for a base candidate (exclusive)
    pub similarity_threshold: f64,

    /// Store a delta only if `|delta| < benefit_ratio * |content|`
    pub benefit_ratio: f64,

    /// Maximum delta-chain depth tolerated during reads
    pub max_chain_depth: usize,
}

impl Default for DeltaPolicy {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.6,
            benefit_ratio: 0.9,
            max_chain_depth: 64,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from("./files"),
            default_order: 3,
            delta: DeltaPolicy::default(),
            cache_max_size: 10,
            cache_persistent: true,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn root_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.root_dir = dir.into();
        self
    }

    pub fn default_order(mut self, order: usize) -> Self {
        self.config.default_order = order;
        self
    }

    pub fn similarity_threshold(mut self, threshold: f64) -> Self {
        self.config.delta.similarity_threshold = threshold;
        self
    }

    pub fn delta_benefit_ratio(mut self, ratio: f64) -> Self {
        self.config.delta.benefit_ratio = ratio;
        self
    }

    pub fn max_delta_chain_depth(mut self, depth: usize) -> Self {
        self.config.delta.max_chain_depth = depth;
        self
    }

    pub fn cache_max_size(mut self, size: usize) -> Self {
        self.config.cache_max_size = size;
        self
    }

    pub fn cache_persistent(mut self, persistent: bool) -> Self {
        self.config.cache_persistent = persistent;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
