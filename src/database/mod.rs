//! Database & Manifest Module
//!
//! Binds a database identifier to named collections and the B-trees that
//! back them.
//!
//! ## Directory Layout
//! ```text
//! <root>/<db-id>/
//!   manifest.json            {"db_id", "collections": {name: name}}
//!   .nutella/                snapshot repository (see snapshot module)
//!   <collection>/pages/      B-tree pages (see btree module)
//! ```

mod collection;
mod db;
mod manifest;

pub use collection::Collection;
pub use db::{generate_db_id, list_databases, Database};
pub use manifest::{Manifest, MANIFEST_FILE};
