//! Object framing and identity
//!
//! Every object is framed as `<kind> <decimal-size>\0<payload>` and
//! addressed by the SHA-1 of the framed bytes (40 hex characters).

use sha1::{Digest, Sha1};

use crate::error::{NutellaError, Result};

/// The four kinds of content-addressed object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Blob,
    Tree,
    Commit,
    Delta,
}

impl ObjectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectKind::Blob => "blob",
            ObjectKind::Tree => "tree",
            ObjectKind::Commit => "commit",
            ObjectKind::Delta => "delta",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "blob" => Ok(ObjectKind::Blob),
            "tree" => Ok(ObjectKind::Tree),
            "commit" => Ok(ObjectKind::Commit),
            "delta" => Ok(ObjectKind::Delta),
            other => Err(NutellaError::CorruptObject(format!(
                "unknown object kind '{}'",
                other
            ))),
        }
    }
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Frame a payload as `<kind> <size>\0<payload>`
pub fn frame(kind: ObjectKind, payload: &[u8]) -> Vec<u8> {
    let header = format!("{} {}\0", kind.as_str(), payload.len());
    let mut framed = Vec::with_capacity(header.len() + payload.len());
    framed.extend_from_slice(header.as_bytes());
    framed.extend_from_slice(payload);
    framed
}

/// Frame delta bytes as `delta <base-id> <delta-len>\0<delta-bytes>`
pub fn frame_delta(base_id: &str, delta: &[u8]) -> Vec<u8> {
    let header = format!("delta {} {}\0", base_id, delta.len());
    let mut framed = Vec::with_capacity(header.len() + delta.len());
    framed.extend_from_slice(header.as_bytes());
    framed.extend_from_slice(delta);
    framed
}

/// SHA-1 of the framed bytes, as 40 lowercase hex characters
pub fn object_id(framed: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(framed);
    hex::encode(hasher.finalize())
}

/// Split framed bytes at the header terminator into `(header, payload)`
pub fn split_frame(framed: &[u8]) -> Result<(&str, &[u8])> {
    let nul = framed
        .iter()
        .position(|&b| b == 0)
        .ok_or_else(|| NutellaError::CorruptObject("missing header terminator".to_string()))?;
    let header = std::str::from_utf8(&framed[..nul])
        .map_err(|_| NutellaError::CorruptObject("non-UTF8 object header".to_string()))?;
    Ok((header, &framed[nul + 1..]))
}

/// The kind token of a frame header (`"blob 42"` → `Blob`)
pub fn header_kind(header: &str) -> Result<ObjectKind> {
    let token = header
        .split(' ')
        .next()
        .ok_or_else(|| NutellaError::CorruptObject("empty object header".to_string()))?;
    ObjectKind::parse(token)
}
