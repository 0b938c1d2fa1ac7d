//! Loose object store
//!
//! Writes and reads immutable framed objects under
//! `<objects>/<id[0..2]>/<id[2..]>`, zlib-compressed on disk. Blob writes
//! try delta compression against a similar existing blob first; reads
//! resolve delta chains transparently.
//!
//! ## Concurrency
//! Content addressing makes the store lock-free: the same bytes always
//! land at the same path, so racing writers are idempotent.

use std::collections::HashSet;
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use tracing::debug;

use crate::config::DeltaPolicy;
use crate::error::{NutellaError, Result};

use super::delta::{apply_delta, compute_delta};
use super::object::{frame, frame_delta, object_id, split_frame, ObjectKind};

/// Sample count per side for the similarity score
const SIMILARITY_SAMPLES: usize = 100;

/// Content smaller than this never participates in similarity scoring
const MIN_SIMILARITY_LEN: usize = 10;

/// A content-addressed store rooted at one `objects/` directory
#[derive(Debug)]
pub struct ObjectStore {
    objects_dir: PathBuf,
    policy: DeltaPolicy,
}

impl ObjectStore {
    /// Open a store with the default delta policy
    pub fn new(objects_dir: &Path) -> Self {
        Self::with_policy(objects_dir, DeltaPolicy::default())
    }

    /// Open a store with explicit delta tunables
    pub fn with_policy(objects_dir: &Path, policy: DeltaPolicy) -> Self {
        Self {
            objects_dir: objects_dir.to_path_buf(),
            policy,
        }
    }

    pub fn objects_dir(&self) -> &Path {
        &self.objects_dir
    }

    /// Loose path for an object id (`ab/cdef...`)
    pub(super) fn path_for(&self, id: &str) -> Result<PathBuf> {
        if id.len() != 40 || !id.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(NutellaError::CorruptObject(format!(
                "malformed object id '{}'",
                id
            )));
        }
        Ok(self.objects_dir.join(&id[..2]).join(&id[2..]))
    }

    /// Whether a loose object with this id exists
    pub fn contains(&self, id: &str) -> bool {
        self.path_for(id).map(|p| p.is_file()).unwrap_or(false)
    }

    /// Write a non-blob object (tree, commit). Framed, hashed, deduplicated,
    /// never delta-compressed.
    pub fn write_object(&self, kind: ObjectKind, payload: &[u8]) -> Result<String> {
        let framed = frame(kind, payload);
        let id = object_id(&framed);
        if !self.contains(&id) {
            self.write_loose(&id, &framed)?;
        }
        Ok(id)
    }

    /// Write file content as a blob, possibly stored as a delta against a
    /// similar existing blob.
    ///
    /// Returns the id under which the content is retrievable: the blob id
    /// when stored whole, the delta object's id otherwise.
    pub fn write_blob(&self, content: &[u8]) -> Result<String> {
        let framed = frame(ObjectKind::Blob, content);
        let id = object_id(&framed);
        if self.contains(&id) {
            return Ok(id);
        }

        if let Some((base_id, base_content)) = self.find_similar_base(content)? {
            let delta = compute_delta(&base_content, content);
            if (delta.len() as f64) < self.policy.benefit_ratio * content.len() as f64 {
                let framed_delta = frame_delta(&base_id, &delta);
                let delta_id = object_id(&framed_delta);
                if !self.contains(&delta_id) {
                    self.write_loose(&delta_id, &framed_delta)?;
                }
                debug!(base = %base_id, delta = %delta_id, "stored blob as delta");
                return Ok(delta_id);
            }
        }

        self.write_loose(&id, &framed)?;
        Ok(id)
    }

    /// Read an object's framed bytes, resolving delta chains of any depth.
    ///
    /// Delta objects are reconstructed against their base and returned
    /// re-framed with the base's kind and the reconstructed length. A
    /// cycle, or a chain deeper than the configured bound, is rejected as
    /// corrupt.
    pub fn read(&self, id: &str) -> Result<Vec<u8>> {
        let mut visited = HashSet::new();
        self.read_resolved(id, &mut visited)
    }

    /// Read an object and split off its header: `(kind, payload)`
    pub fn read_payload(&self, id: &str) -> Result<(ObjectKind, Vec<u8>)> {
        let framed = self.read(id)?;
        let (header, payload) = split_frame(&framed)?;
        let kind = super::object::header_kind(header)?;
        Ok((kind, payload.to_vec()))
    }

    fn read_resolved(&self, id: &str, visited: &mut HashSet<String>) -> Result<Vec<u8>> {
        if visited.len() > self.policy.max_chain_depth {
            return Err(NutellaError::CorruptObject(format!(
                "delta chain deeper than {}",
                self.policy.max_chain_depth
            )));
        }
        if !visited.insert(id.to_string()) {
            return Err(NutellaError::CorruptObject(format!(
                "delta chain cycle at {}",
                id
            )));
        }

        let framed = self.read_loose(id)?;
        let (header, payload) = split_frame(&framed)?;
        if !header.starts_with("delta ") {
            return Ok(framed);
        }

        // Header: "delta <base-id> <delta-len>"
        let mut fields = header.split_whitespace();
        fields.next();
        let base_id = fields
            .next()
            .ok_or_else(|| NutellaError::CorruptObject(format!("bad delta header '{}'", header)))?;
        let declared: usize = fields
            .next()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| NutellaError::CorruptObject(format!("bad delta header '{}'", header)))?;
        if declared != payload.len() {
            return Err(NutellaError::CorruptObject(format!(
                "delta length mismatch: header says {}, payload is {}",
                declared,
                payload.len()
            )));
        }

        let base_framed = self.read_resolved(base_id, visited)?;
        let (base_header, base_content) = split_frame(&base_framed)?;
        let base_kind = super::object::header_kind(base_header)?;

        let content = apply_delta(base_content, payload)?;
        Ok(frame(base_kind, &content))
    }

    // =========================================================================
    // Similarity search
    // =========================================================================

    /// Find the most similar existing loose blob to use as a delta base.
    ///
    /// Candidates are whole blobs whose content length lies within
    /// `[len/2, 2*len]`; the winner must score strictly above the
    /// configured threshold. Unreadable candidates are skipped.
    fn find_similar_base(&self, content: &[u8]) -> Result<Option<(String, Vec<u8>)>> {
        let mut best: Option<(String, Vec<u8>)> = None;
        let mut best_score = self.policy.similarity_threshold;

        for id in self.loose_object_ids()? {
            let framed = match self.read_loose(&id) {
                Ok(f) => f,
                Err(_) => continue,
            };
            let Ok((header, payload)) = split_frame(&framed) else {
                continue;
            };
            if !header.starts_with("blob ") {
                continue;
            }
            if payload.len() < content.len() / 2 || payload.len() > content.len() * 2 {
                continue;
            }

            let score = sampled_similarity(payload, content);
            if score > best_score {
                best_score = score;
                best = Some((id, payload.to_vec()));
            }
        }

        Ok(best)
    }

    /// Enumerate loose object ids (`??/<38-hex>`), skipping the pack dir
    pub(super) fn loose_object_ids(&self) -> Result<Vec<String>> {
        let mut ids = Vec::new();

        let entries = match fs::read_dir(&self.objects_dir) {
            Ok(e) => e,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(ids),
            Err(e) => return Err(e.into()),
        };

        for entry in entries {
            let entry = entry?;
            let prefix = entry.file_name().to_string_lossy().into_owned();
            if prefix == "pack" || prefix.len() != 2 || !entry.path().is_dir() {
                continue;
            }
            for file in fs::read_dir(entry.path())? {
                let file = file?;
                let rest = file.file_name().to_string_lossy().into_owned();
                if rest.len() == 38 && file.path().is_file() {
                    ids.push(format!("{}{}", prefix, rest));
                }
            }
        }

        ids.sort();
        Ok(ids)
    }

    // =========================================================================
    // Loose file I/O
    // =========================================================================

    fn write_loose(&self, id: &str, framed: &[u8]) -> Result<()> {
        let path = self.path_for(id)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(framed)?;
        let compressed = encoder.finish()?;

        fs::write(path, compressed)?;
        Ok(())
    }

    pub(super) fn read_loose(&self, id: &str) -> Result<Vec<u8>> {
        let path = self.path_for(id)?;
        let compressed = match fs::read(&path) {
            Ok(d) => d,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(NutellaError::ObjectNotFound(id.to_string()))
            }
            Err(e) => return Err(e.into()),
        };

        let mut decoder = ZlibDecoder::new(compressed.as_slice());
        let mut framed = Vec::new();
        decoder
            .read_to_end(&mut framed)
            .map_err(|e| NutellaError::CorruptObject(format!("{}: {}", id, e)))?;
        Ok(framed)
    }
}

/// Fraction of equal byte samples between two contents.
///
/// Samples up to 100 offsets from each side at stride `max(1, len/100)` and
/// compares every sampled pair.
fn sampled_similarity(a: &[u8], b: &[u8]) -> f64 {
    if a.len() < MIN_SIMILARITY_LEN || b.len() < MIN_SIMILARITY_LEN {
        return 0.0;
    }

    let step_a = (a.len() / SIMILARITY_SAMPLES).max(1);
    let step_b = (b.len() / SIMILARITY_SAMPLES).max(1);
    let limit_a = a.len().min(SIMILARITY_SAMPLES * step_a);
    let limit_b = b.len().min(SIMILARITY_SAMPLES * step_b);

    let mut comparisons = 0u64;
    let mut matches = 0u64;

    let mut i = 0;
    while i < limit_a {
        let mut j = 0;
        while j < limit_b {
            comparisons += 1;
            if a[i] == b[j] {
                matches += 1;
            }
            j += step_b;
        }
        i += step_a;
    }

    if comparisons == 0 {
        0.0
    } else {
        matches as f64 / comparisons as f64
    }
}
