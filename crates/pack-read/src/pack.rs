//! Pack file reading and object resolution.
//!
//! A pack file is a 12-byte header (`PACK`, version, entry count), a
//! sequence of compressed object entries, and a trailing 20-byte checksum.
//! [`PackReader`] pairs a pack with its index and reconstructs objects,
//! walking delta chains back to a direct base.

use std::io::Read;
use std::path::{Path, PathBuf};

use flate2::bufread::ZlibDecoder;
use memmap2::Mmap;
use pack_digest::Digest;

use crate::entry::{parse_entry_header, EntryHeader};
use crate::index::IndexFile;
use crate::{
    delta, EntryKind, ObjectKind, PackError, ResolvedObject, MAX_DELTA_DEPTH, PACK_HEADER_SIZE,
    PACK_SIGNATURE, PACK_TRAILER_LEN,
};

/// The pack file's own header. Informational: object decoding never needs
/// it, and an entry count that disagrees with the index is surfaced through
/// reporting rather than treated as fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackHeader {
    pub version: u32,
    pub entry_count: u32,
}

/// A memory-mapped pack file paired with its index.
///
/// Nothing is mutated after open, so a shared `&PackReader` is safe across
/// concurrent readers; every access is an independent bounds-checked slice
/// of the mapping, never a shared cursor.
#[derive(Debug)]
pub struct PackReader {
    data: Mmap,
    header: PackHeader,
    index: IndexFile,
    pack_path: PathBuf,
}

impl PackReader {
    /// Open a pack file and its companion index.
    pub fn open(pack_path: impl AsRef<Path>, idx_path: impl AsRef<Path>) -> Result<Self, PackError> {
        let pack_path = pack_path.as_ref().to_path_buf();
        let file = std::fs::File::open(&pack_path)?;
        let data = unsafe { Mmap::map(&file)? };

        if data.len() < PACK_HEADER_SIZE + PACK_TRAILER_LEN as usize {
            return Err(PackError::Truncated {
                what: "pack header",
                offset: data.len() as u64,
            });
        }
        if &data[0..4] != PACK_SIGNATURE {
            return Err(PackError::CorruptObject {
                offset: 0,
                reason: "bad PACK signature".into(),
            });
        }
        let header = PackHeader {
            version: u32::from_be_bytes([data[4], data[5], data[6], data[7]]),
            entry_count: u32::from_be_bytes([data[8], data[9], data[10], data[11]]),
        };

        let index = IndexFile::open(idx_path)?;

        Ok(Self {
            data,
            header,
            index,
            pack_path,
        })
    }

    pub fn header(&self) -> &PackHeader {
        &self.header
    }

    pub fn index(&self) -> &IndexFile {
        &self.index
    }

    pub fn path(&self) -> &Path {
        &self.pack_path
    }

    /// Total pack file length in bytes.
    pub fn pack_len(&self) -> u64 {
        self.data.len() as u64
    }

    /// Raw pack bytes (used for checksum and CRC verification).
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Decode the object header at a pack offset.
    pub fn entry_header_at(&self, offset: u64) -> Result<EntryHeader, PackError> {
        let start = offset as usize;
        if start >= self.data.len() {
            return Err(PackError::Truncated {
                what: "object header",
                offset,
            });
        }
        parse_entry_header(&self.data[start..], offset)
    }

    /// Resolve the object stored at a pack offset.
    ///
    /// Delta chains are collected iteratively (innermost delta first) and
    /// applied in reverse once the direct base is reached, so chain depth
    /// costs heap, not call stack. Depth is capped at [`MAX_DELTA_DEPTH`].
    pub fn resolve_at(&self, offset: u64) -> Result<ResolvedObject, PackError> {
        // (entry offset, decompressed delta stream), innermost first
        let mut chain: Vec<(u64, Vec<u8>)> = Vec::new();
        let mut current = offset;

        loop {
            if chain.len() > MAX_DELTA_DEPTH {
                return Err(PackError::DeltaChainTooDeep {
                    offset,
                    max_depth: MAX_DELTA_DEPTH,
                });
            }

            let entry = self.entry_header_at(current)?;
            let payload = self.inflate(entry.payload_offset, entry.size, current)?;

            match entry.kind {
                EntryKind::OfsDelta { base_offset } => {
                    chain.push((current, payload));
                    current = base_offset;
                }
                EntryKind::RefDelta { base } => {
                    chain.push((current, payload));
                    current = self.index.offset_of(&base)?;
                }
                EntryKind::Commit => return self.apply_chain(ObjectKind::Commit, payload, &chain),
                EntryKind::Tree => return self.apply_chain(ObjectKind::Tree, payload, &chain),
                EntryKind::Blob => return self.apply_chain(ObjectKind::Blob, payload, &chain),
                EntryKind::Tag => return self.apply_chain(ObjectKind::Tag, payload, &chain),
            }
        }
    }

    /// Resolve the object for the given digest.
    pub fn resolve(&self, digest: &Digest) -> Result<ResolvedObject, PackError> {
        let offset = self.index.offset_of(digest)?;
        self.resolve_at(offset)
    }

    /// Resolve the first object whose digest matches a hex prefix.
    pub fn resolve_for(&self, prefix: &str) -> Result<ResolvedObject, PackError> {
        let offset = self.index.offset_for_prefix(prefix)?;
        self.resolve_at(offset)
    }

    /// Byte span an object occupies in the pack: the gap to the next
    /// greater offset, or to the start of the trailing checksum for the
    /// offset-maximal entry.
    pub fn packed_size_at(&self, offset: u64) -> Result<u64, PackError> {
        let end = self.pack_len() - PACK_TRAILER_LEN;
        let mut next = end;
        let mut seen = false;
        for i in 0..self.index.entry_count() {
            let other = self.index.offset_at_index(i);
            if other == offset {
                seen = true;
            } else if other > offset && other < next {
                next = other;
            }
        }
        if !seen {
            return Err(PackError::NotFound(format!("offset {offset:#x}")));
        }
        // An index may carry any offset; only ones inside the object region
        // have a span to measure.
        if offset >= end {
            return Err(PackError::CorruptObject {
                offset,
                reason: "indexed offset lies past the object region".into(),
            });
        }
        Ok(next - offset)
    }

    /// Packed byte size of the entry for a digest.
    pub fn packed_size_for(&self, digest: &Digest) -> Result<u64, PackError> {
        let offset = self.index.offset_of(digest)?;
        self.packed_size_at(offset)
    }

    /// Apply collected delta streams, innermost last, to the direct base.
    fn apply_chain(
        &self,
        kind: ObjectKind,
        base: Vec<u8>,
        chain: &[(u64, Vec<u8>)],
    ) -> Result<ResolvedObject, PackError> {
        let mut data = base;
        for (delta_offset, stream) in chain.iter().rev() {
            // The stream's declared base size is informational, but a
            // disagreement with the actual base means the chain is broken.
            let declared = delta::parse_header(stream, *delta_offset)?.base_size;
            if declared != data.len() {
                return Err(PackError::CorruptDelta {
                    offset: *delta_offset,
                    reason: format!(
                        "base size mismatch: declared {declared}, resolved base is {} bytes",
                        data.len()
                    ),
                });
            }
            data = delta::apply(&data, stream, *delta_offset)?;
        }
        Ok(ResolvedObject { kind, data })
    }

    /// Inflate exactly `expected` bytes of zlib data starting at
    /// `payload_offset`.
    fn inflate(
        &self,
        payload_offset: u64,
        expected: usize,
        entry_offset: u64,
    ) -> Result<Vec<u8>, PackError> {
        let start = payload_offset as usize;
        if start > self.data.len() {
            return Err(PackError::Truncated {
                what: "object payload",
                offset: payload_offset,
            });
        }

        let mut decoder = ZlibDecoder::new(&self.data[start..]);
        // The declared size is untrusted until the stream backs it, so the
        // pre-allocation is capped and the limit keeps a corrupt size field
        // from inflating unbounded data.
        let mut buf = Vec::with_capacity(expected.min(1 << 16));
        decoder
            .by_ref()
            .take((expected as u64).saturating_add(1))
            .read_to_end(&mut buf)
            .map_err(|e| PackError::CorruptObject {
                offset: entry_offset,
                reason: format!("zlib inflate failed: {e}"),
            })?;

        if buf.len() != expected {
            return Err(PackError::CorruptObject {
                offset: entry_offset,
                reason: format!(
                    "decompressed {} bytes, header declares {expected}",
                    buf.len()
                ),
            });
        }
        Ok(buf)
    }
}
