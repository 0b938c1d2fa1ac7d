//! Content-Addressed Object Store Module
//!
//! Immutable blob/tree/commit/delta objects identified by the SHA-1 of
//! their framed bytes, zlib-compressed on disk.
//!
//! ## Responsibilities
//! - Uniform framing: `<kind> <decimal-size>\0<payload>`
//! - Loose object layout: `<objects>/<id[0..2]>/<id[2..]>`
//! - Similarity-driven delta compression for blobs
//! - Transparent delta-chain resolution on read (cycle/depth bounded)
//! - Packfile compilation with a simple (sha, offset) index

mod delta;
mod object;
mod pack;
mod store;

pub use delta::{apply_delta, compute_delta};
pub use object::{frame, frame_delta, header_kind, object_id, split_frame, ObjectKind};
pub use pack::{PackSummary, PACK_HEADER_SIZE, PACK_MAGIC, PACK_VERSION};
pub use store::ObjectStore;
