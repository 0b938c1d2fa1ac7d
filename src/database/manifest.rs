//! Database manifest (`manifest.json`)
//!
//! Binds a database id to its collections. Collection names map to their
//! subdirectory names (currently always identical).

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{NutellaError, Result};

/// Manifest file name inside a database directory
pub const MANIFEST_FILE: &str = "manifest.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub db_id: String,
    pub collections: BTreeMap<String, String>,
}

impl Manifest {
    pub fn new(db_id: &str) -> Self {
        Self {
            db_id: db_id.to_string(),
            collections: BTreeMap::new(),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read(path)?;
        serde_json::from_slice(&data).map_err(|e| {
            NutellaError::Serialization(format!("{}: {}", path.display(), e))
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let data = serde_json::to_vec_pretty(self)?;
        fs::write(path, data)?;
        Ok(())
    }
}
