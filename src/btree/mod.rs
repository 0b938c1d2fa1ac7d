//! Persistent B-tree Module
//!
//! An ordered map `string → JSON value` of configurable order `t`, stored
//! as one JSON file per node plus a metadata file.
//!
//! ## Responsibilities
//! - Classical split/merge/borrow maintenance under order `t`
//! - Write-through persistence: every mutated node hits disk before return
//! - Self-healing deletes: missing node files are pruned, not fatal
//! - On-demand structural repair (`repair_tree`)
//!
//! ## Page Directory Layout
//! ```text
//! <pages>/
//!   metadata.json      {"root_id","order","next_id","db_id","page_dir"}
//!   page_<id>.json     {"id","is_leaf","keys":[{"key","value"}],"children":[..]}
//! ```

mod delete;
mod find;
mod insert;
mod node;
mod pager;
mod tree;
mod update;
mod validate;

pub use node::{KeyValue, Node};
pub use pager::Pager;
pub use tree::BTree;
