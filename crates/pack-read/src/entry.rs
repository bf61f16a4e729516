//! Object header decoding.
//!
//! Every object in the pack starts with a variable-length header packing
//! the object type and its uncompressed destination size into a base-128
//! encoding whose first byte carries only 4 size bits:
//!
//! ```text
//! +---------+  bit 7: continuation
//! |c t t t s|  bits 4-6: type code (1 commit, 2 tree, 3 blob, 4 tag,
//! |  s s s  |            6 ofs-delta, 7 ref-delta; 0 and 5 reserved)
//! +---------+  bits 0-3: size bits 0-3
//! ```
//!
//! Continuation bytes contribute 7 size bits each, starting at bit 4.
//! Delta entries are followed by their base reference (a back-distance
//! varint for ofs-delta, a 20-byte digest for ref-delta) before the
//! compressed payload begins.

use pack_digest::{Digest, DIGEST_LEN};

use crate::{EntryKind, PackError};

/// A decoded object header.
#[derive(Debug, Clone)]
pub struct EntryHeader {
    pub kind: EntryKind,
    /// Declared uncompressed size of the payload. For delta entries this is
    /// the size of the delta stream, not of the final object.
    pub size: usize,
    /// Absolute pack offset where the compressed payload begins.
    pub payload_offset: u64,
    /// Bytes consumed by the header, including any base reference.
    pub header_len: usize,
}

/// Decode the object header found at `entry_offset`. `data` must start at
/// that offset and extend to the end of the pack.
pub fn parse_entry_header(data: &[u8], entry_offset: u64) -> Result<EntryHeader, PackError> {
    let mut pos = 0usize;
    let mut byte = take(data, &mut pos, entry_offset)?;

    let code = (byte >> 4) & 0x07;
    let mut size = (byte & 0x0f) as usize;
    let mut shift = 4u32;

    while byte & 0x80 != 0 {
        byte = take(data, &mut pos, entry_offset)?;
        if shift >= usize::BITS {
            return Err(PackError::CorruptObject {
                offset: entry_offset,
                reason: "object size varint too long".into(),
            });
        }
        size |= ((byte & 0x7f) as usize) << shift;
        shift += 7;
    }

    let kind = match code {
        1 => EntryKind::Commit,
        2 => EntryKind::Tree,
        3 => EntryKind::Blob,
        4 => EntryKind::Tag,
        6 => {
            let distance = read_base_distance(data, &mut pos, entry_offset)?;
            if distance == 0 || distance > entry_offset {
                return Err(PackError::CorruptObject {
                    offset: entry_offset,
                    reason: format!("base distance {distance} points outside the pack"),
                });
            }
            EntryKind::OfsDelta {
                base_offset: entry_offset - distance,
            }
        }
        7 => {
            if pos + DIGEST_LEN > data.len() {
                return Err(PackError::Truncated {
                    what: "ref-delta base digest",
                    offset: entry_offset + pos as u64,
                });
            }
            let base = Digest::from_bytes(&data[pos..pos + DIGEST_LEN])?;
            pos += DIGEST_LEN;
            EntryKind::RefDelta { base }
        }
        code => {
            return Err(PackError::UnknownObjectType {
                offset: entry_offset,
                code,
            })
        }
    };

    Ok(EntryHeader {
        kind,
        size,
        payload_offset: entry_offset + pos as u64,
        header_len: pos,
    })
}

/// Decode an ofs-delta back-distance at `pos`, advancing it.
///
/// This is not the plain base-128 decoder used for sizes: before each
/// continuation byte is ORed in, the accumulator is incremented by one and
/// shifted. `0x05` decodes to 5; `0x85 0x02` decodes to `((5+1)<<7)|2 = 770`.
pub fn read_base_distance(
    data: &[u8],
    pos: &mut usize,
    entry_offset: u64,
) -> Result<u64, PackError> {
    let mut byte = take(data, pos, entry_offset)?;
    let mut distance = (byte & 0x7f) as u64;
    while byte & 0x80 != 0 {
        byte = take(data, pos, entry_offset)?;
        distance = distance
            .checked_add(1)
            .and_then(|d| d.checked_shl(7))
            .ok_or_else(|| PackError::CorruptObject {
                offset: entry_offset,
                reason: "base distance varint too long".into(),
            })?
            | (byte & 0x7f) as u64;
    }
    Ok(distance)
}

fn take(data: &[u8], pos: &mut usize, entry_offset: u64) -> Result<u8, PackError> {
    if *pos >= data.len() {
        return Err(PackError::Truncated {
            what: "object header",
            offset: entry_offset + *pos as u64,
        });
    }
    let byte = data[*pos];
    *pos += 1;
    Ok(byte)
}
