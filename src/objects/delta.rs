//! Delta codec
//!
//! Encodes one byte sequence as edits against a base sequence.
//!
//! ## Wire Format
//! ```text
//! ┌──────────────┬────────────────┬──────────────────────────────┐
//! │ base size    │ target size    │ instructions ...             │
//! │ (u32 LE)     │ (u32 LE)       │                              │
//! └──────────────┴────────────────┴──────────────────────────────┘
//! ```
//!
//! ### Instructions
//! - **Copy** (command byte with MSB set): bits 0..3 flag up to 4 offset
//!   bytes, bits 4..6 flag up to 3 size bytes, both LSB first. A decoded
//!   size of 0 means 65536. `offset + size` must stay within the base.
//! - **Insert** (command byte 1..=127): the command byte is the literal
//!   length; that many bytes follow. Command byte 0 is reserved and
//!   rejects the stream.

use crate::error::{NutellaError, Result};

/// Shortest base match worth a copy instruction
const MIN_COPY: usize = 4;

/// Longest literal run per insert instruction
const MAX_INSERT: usize = 127;

/// Longest copy expressible in 3 size bytes
const MAX_COPY: usize = 0xFF_FFFF;

/// Encode `target` as a delta against `base`.
///
/// A straightforward longest-match-per-position scan: at each target
/// position the best base match of at least `MIN_COPY` bytes becomes a
/// copy; everything else accumulates into literal runs. Any encoder whose
/// output decodes to `target` is conformant; this one is the baseline.
pub fn compute_delta(base: &[u8], target: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(16);
    out.extend_from_slice(&(base.len() as u32).to_le_bytes());
    out.extend_from_slice(&(target.len() as u32).to_le_bytes());

    let mut pos = 0;
    let mut literal_start = 0;

    while pos < target.len() {
        let (offset, len) = longest_match(base, &target[pos..]);
        if len >= MIN_COPY {
            push_literals(&mut out, &target[literal_start..pos]);
            let len = len.min(MAX_COPY);
            push_copy(&mut out, offset, len);
            pos += len;
            literal_start = pos;
        } else {
            pos += 1;
        }
    }
    push_literals(&mut out, &target[literal_start..]);

    out
}

/// Longest common run between `tail` and any position in `base`
fn longest_match(base: &[u8], tail: &[u8]) -> (usize, usize) {
    let mut best_offset = 0;
    let mut best_len = 0;

    for start in 0..base.len() {
        let limit = (base.len() - start).min(tail.len());
        let mut len = 0;
        while len < limit && base[start + len] == tail[len] {
            len += 1;
        }
        if len > best_len {
            best_len = len;
            best_offset = start;
        }
    }

    (best_offset, best_len)
}

fn push_copy(out: &mut Vec<u8>, offset: usize, size: usize) {
    let mut cmd = 0x80u8;
    let mut tail = [0u8; 7];
    let mut n = 0;

    let mut remaining = offset;
    for bit in 0..4 {
        if remaining > 0 || bit == 0 {
            tail[n] = (remaining & 0xFF) as u8;
            n += 1;
            remaining >>= 8;
            cmd |= 1 << bit;
        }
    }

    let mut remaining = size;
    for bit in 0..3 {
        if remaining > 0 || bit == 0 {
            tail[n] = (remaining & 0xFF) as u8;
            n += 1;
            remaining >>= 8;
            cmd |= 1 << (bit + 4);
        }
    }

    out.push(cmd);
    out.extend_from_slice(&tail[..n]);
}

fn push_literals(out: &mut Vec<u8>, mut data: &[u8]) {
    while !data.is_empty() {
        let chunk = data.len().min(MAX_INSERT);
        out.push(chunk as u8);
        out.extend_from_slice(&data[..chunk]);
        data = &data[chunk..];
    }
}

/// Apply a delta to `base`, reconstructing the target bytes
pub fn apply_delta(base: &[u8], delta: &[u8]) -> Result<Vec<u8>> {
    if delta.len() < 8 {
        return Err(NutellaError::CorruptObject("delta too short".to_string()));
    }

    let base_size = u32::from_le_bytes([delta[0], delta[1], delta[2], delta[3]]) as usize;
    if base_size != base.len() {
        return Err(NutellaError::CorruptObject(format!(
            "delta base size mismatch: expected {}, got {}",
            base_size,
            base.len()
        )));
    }
    let target_size = u32::from_le_bytes([delta[4], delta[5], delta[6], delta[7]]) as usize;

    let mut out = Vec::with_capacity(target_size);
    let mut i = 8;

    while i < delta.len() {
        let cmd = delta[i];
        i += 1;

        if cmd == 0 {
            return Err(NutellaError::CorruptObject(
                "delta command 0 is reserved".to_string(),
            ));
        }

        if cmd & 0x80 != 0 {
            // Copy from base
            let mut offset = 0usize;
            let mut size = 0usize;

            for bit in 0..4 {
                if cmd & (1 << bit) != 0 {
                    let byte = *delta.get(i).ok_or_else(|| {
                        NutellaError::CorruptObject("truncated copy offset".to_string())
                    })?;
                    offset |= (byte as usize) << (bit * 8);
                    i += 1;
                }
            }
            for bit in 0..3 {
                if cmd & (1 << (bit + 4)) != 0 {
                    let byte = *delta.get(i).ok_or_else(|| {
                        NutellaError::CorruptObject("truncated copy size".to_string())
                    })?;
                    size |= (byte as usize) << (bit * 8);
                    i += 1;
                }
            }
            if size == 0 {
                size = 0x10000;
            }

            if offset + size > base.len() {
                return Err(NutellaError::CorruptObject(format!(
                    "copy out of range: offset={}, size={}, base={}",
                    offset,
                    size,
                    base.len()
                )));
            }
            out.extend_from_slice(&base[offset..offset + size]);
        } else {
            // Inline literal
            let size = cmd as usize;
            if i + size > delta.len() {
                return Err(NutellaError::CorruptObject(format!(
                    "truncated insert: size={}, remaining={}",
                    size,
                    delta.len() - i
                )));
            }
            out.extend_from_slice(&delta[i..i + size]);
            i += size;
        }
    }

    if out.len() != target_size {
        return Err(NutellaError::CorruptObject(format!(
            "delta output size mismatch: expected {}, got {}",
            target_size,
            out.len()
        )));
    }

    Ok(out)
}
