//! Database handles
//!
//! A database is a directory with a manifest, one subdirectory per
//! collection, and a snapshot repository. Collections are loaded lazily
//! and cached process-locally behind shared handles.
//!
//! ## Concurrency
//! - `manifest`: RwLock, exclusive for collection creation and close,
//!   shared for lookups
//! - `collections`: RwLock over the handle cache, double-checked on the
//!   load path so two readers racing on the same name share one handle

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::info;
use uuid::Uuid;

use crate::error::{NutellaError, Result};
use crate::snapshot::Repository;

use super::collection::Collection;
use super::manifest::{Manifest, MANIFEST_FILE};

/// An open database
#[derive(Debug)]
pub struct Database {
    base_dir: PathBuf,
    manifest_path: PathBuf,
    manifest: RwLock<Manifest>,
    collections: RwLock<HashMap<String, Arc<Collection>>>,
}

impl Database {
    /// Create a database directory with an empty manifest and an
    /// initialized snapshot repository. Opening an existing directory
    /// loads its manifest instead of clobbering it.
    pub fn create(base_dir: &Path, db_id: &str) -> Result<Self> {
        fs::create_dir_all(base_dir)?;
        let manifest_path = base_dir.join(MANIFEST_FILE);

        let manifest = if manifest_path.is_file() {
            Manifest::load(&manifest_path)?
        } else {
            let manifest = Manifest::new(db_id);
            manifest.save(&manifest_path)?;
            manifest
        };

        Repository::init(base_dir)?;

        info!(db = db_id, dir = %base_dir.display(), "database ready");

        Ok(Self {
            base_dir: base_dir.to_path_buf(),
            manifest_path,
            manifest: RwLock::new(manifest),
            collections: RwLock::new(HashMap::new()),
        })
    }

    /// Open an existing database by its directory
    pub fn load(base_dir: &Path) -> Result<Self> {
        let manifest_path = base_dir.join(MANIFEST_FILE);
        if !manifest_path.is_file() {
            return Err(NutellaError::DatabaseNotFound(
                base_dir.display().to_string(),
            ));
        }
        let manifest = Manifest::load(&manifest_path)?;

        Ok(Self {
            base_dir: base_dir.to_path_buf(),
            manifest_path,
            manifest: RwLock::new(manifest),
            collections: RwLock::new(HashMap::new()),
        })
    }

    /// The database id from the manifest
    pub fn id(&self) -> String {
        self.manifest.read().db_id.clone()
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Create a collection backed by a new B-tree of the given order.
    /// Rejects duplicate names.
    pub fn create_collection(&self, name: &str, order: usize) -> Result<Arc<Collection>> {
        let mut manifest = self.manifest.write();
        if manifest.collections.contains_key(name) {
            return Err(NutellaError::CollectionExists(name.to_string()));
        }

        let dir = self.base_dir.join(name);
        fs::create_dir_all(&dir)?;
        let collection = Arc::new(Collection::create(name, order, &dir)?);

        manifest
            .collections
            .insert(name.to_string(), name.to_string());
        manifest.save(&self.manifest_path)?;

        self.collections
            .write()
            .insert(name.to_string(), Arc::clone(&collection));

        info!(collection = name, order, "created collection");

        Ok(collection)
    }

    /// Get a handle to a collection, loading its B-tree on first access
    pub fn collection(&self, name: &str) -> Result<Arc<Collection>> {
        // Fast path: already loaded
        if let Some(collection) = self.collections.read().get(name) {
            return Ok(Arc::clone(collection));
        }

        let subdir = self
            .manifest
            .read()
            .collections
            .get(name)
            .cloned()
            .ok_or_else(|| NutellaError::CollectionNotFound(name.to_string()))?;

        let mut cache = self.collections.write();
        // Another thread may have loaded it while we waited for the lock
        if let Some(collection) = cache.get(name) {
            return Ok(Arc::clone(collection));
        }

        let collection = Arc::new(Collection::load(name, &self.base_dir.join(&subdir))?);
        cache.insert(name.to_string(), Arc::clone(&collection));

        Ok(collection)
    }

    /// Every collection name in the manifest
    pub fn collection_names(&self) -> Vec<String> {
        self.manifest.read().collections.keys().cloned().collect()
    }

    /// The snapshot repository rooted at this database's directory
    pub fn repository(&self) -> Result<Repository> {
        Repository::open(&self.base_dir)
    }

    /// Close every loaded collection and persist the manifest
    pub fn close(&self) -> Result<()> {
        let collections = self.collections.write();
        for collection in collections.values() {
            collection.close()?;
        }
        self.manifest.read().save(&self.manifest_path)
    }
}

/// Direct subdirectories of `root` that contain a manifest file
pub fn list_databases(root: &Path) -> Result<Vec<String>> {
    let entries = match fs::read_dir(root) {
        Ok(e) => e,
        // A missing root means no databases yet
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut ids = Vec::new();
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        if entry.path().join(MANIFEST_FILE).is_file() {
            ids.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    ids.sort();
    Ok(ids)
}

/// Generate a short database id of the form `db_<uuid-prefix>`
pub fn generate_db_id() -> String {
    let uuid = Uuid::new_v4().to_string();
    let prefix = uuid.split('-').next().unwrap_or(&uuid).to_string();
    format!("db_{}", prefix)
}
