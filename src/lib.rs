//! # NutellaDB
//!
//! An embedded key-value database with:
//! - Persistent per-collection B-trees (one JSON page per node)
//! - Content-addressed snapshots with delta compression
//! - A multi-collection LRU cache
//! - Self-healing against missing B-tree pages
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      CLI Driver                              │
//! │                (thin clap front-end)                         │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                     Database                                 │
//! │          (manifest + collection registry)                    │
//! └───────┬─────────────────────────────────────┬───────────────┘
//!         │                                     │
//!         ▼                                     ▼
//!  ┌─────────────┐                       ┌─────────────┐
//!  │   B-tree    │                       │  Snapshot   │
//!  │ (per-coll.) │                       │   Engine    │
//!  └─────────────┘                       └──────┬──────┘
//!         ▲                                     │
//!         │                                     ▼
//!  ┌─────────────┐                       ┌─────────────┐
//!  │  LRU Cache  │                       │   Object    │
//!  │ (optional)  │                       │    Store    │
//!  └─────────────┘                       └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod btree;
pub mod cache;
pub mod database;
pub mod objects;
pub mod snapshot;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use config::{Config, DeltaPolicy};
pub use database::{Collection, Database};
pub use error::{NutellaError, Result};
pub use snapshot::Repository;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of NutellaDB
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
