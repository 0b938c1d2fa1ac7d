//! Pack files
//!
//! Compiles all loose objects into a single packfile plus a parallel index.
//!
//! ## File Format
//! ```text
//! pack-<YYYYMMDD-HHMMSS>.pack
//! ┌────────┬──────────────┬──────────────┬──────────────────────────┐
//! │ "PACK" │ version (u32 │ count (u32   │ loose object bytes, in   │
//! │        │ BE, = 2)     │ BE)          │ id order, concatenated   │
//! └────────┴──────────────┴──────────────┴──────────────────────────┘
//!
//! pack-<YYYYMMDD-HHMMSS>.idx, per object:
//! ┌─────────────────────┬─────────────────────┐
//! │ sha (40 ASCII hex)  │ offset (u64 BE)     │
//! └─────────────────────┴─────────────────────┘
//! ```
//!
//! Loose objects are left in place; packing does not prune them.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use tracing::info;

use crate::error::Result;

use super::ObjectStore;

/// Pack header magic
pub const PACK_MAGIC: &[u8; 4] = b"PACK";

/// Pack format version
pub const PACK_VERSION: u32 = 2;

/// Byte length of the pack header (`magic + version + count`)
pub const PACK_HEADER_SIZE: u64 = 12;

/// Result of a packing run
#[derive(Debug)]
pub struct PackSummary {
    pub name: String,
    pub object_count: usize,
    pub pack_path: PathBuf,
    pub index_path: PathBuf,
}

impl ObjectStore {
    /// Compile every loose object into a new packfile.
    ///
    /// Returns `None` when there are no loose objects to pack.
    pub fn pack(&self) -> Result<Option<PackSummary>> {
        let ids = self.loose_object_ids()?;
        if ids.is_empty() {
            return Ok(None);
        }

        let name = format!("pack-{}", chrono::Local::now().format("%Y%m%d-%H%M%S"));
        let pack_dir = self.objects_dir().join("pack");
        fs::create_dir_all(&pack_dir)?;

        let pack_path = pack_dir.join(format!("{}.pack", name));
        let index_path = pack_dir.join(format!("{}.idx", name));

        let mut pack = BufWriter::new(File::create(&pack_path)?);
        let mut index = BufWriter::new(File::create(&index_path)?);

        pack.write_all(PACK_MAGIC)?;
        pack.write_all(&PACK_VERSION.to_be_bytes())?;
        pack.write_all(&(ids.len() as u32).to_be_bytes())?;

        let mut offset = PACK_HEADER_SIZE;
        for id in &ids {
            // Raw on-disk (compressed) bytes, copied verbatim
            let raw = fs::read(self.path_for(id)?)?;
            pack.write_all(&raw)?;

            index.write_all(id.as_bytes())?;
            index.write_all(&offset.to_be_bytes())?;

            offset += raw.len() as u64;
        }

        pack.flush()?;
        index.flush()?;

        info!(objects = ids.len(), pack = %pack_path.display(), "packed loose objects");

        Ok(Some(PackSummary {
            name,
            object_count: ids.len(),
            pack_path,
            index_path,
        }))
    }
}
