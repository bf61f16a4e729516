//! Index file reading and lookup.
//!
//! Two layouts are supported. The v2 layout starts with the `\377tOc`
//! signature and a version word:
//!
//! ```text
//! Header:  \377tOc (4 bytes) | version (4 bytes BE, <= 2)
//! Fanout:  256 × 4-byte BE cumulative counts (last = total entries)
//! Digests: N × 20-byte sorted digests
//! CRC32:   N × 4-byte CRC of the raw pack entry bytes
//! Offsets: N × 4-byte BE pack offsets
//! Trailer: 20-byte pack checksum | 20-byte index checksum
//! ```
//!
//! Anything else is read as the legacy v1 layout, where the four signature
//! bytes already belong to the fan-out table and each entry is a 4-byte
//! offset followed by the 20-byte digest:
//!
//! ```text
//! Fanout:  256 × 4-byte BE cumulative counts
//! Entries: N × (4-byte BE offset, 20-byte digest)
//! Trailer: as above
//! ```

use std::path::{Path, PathBuf};

use memmap2::Mmap;
use pack_digest::{Digest, DIGEST_LEN};

use crate::table::{IndexLayout, TableSpec, WORD};
use crate::{PackError, INDEX_MAX_VERSION, INDEX_SIGNATURE};

/// The two checksums stored after the last table.
///
/// They are carried for reporting; the core does not verify them on open
/// (see [`PackReader::verify_checksum`](crate::pack::PackReader::verify_checksum)
/// for the explicit check).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexTrailer {
    /// Checksum of the referenced pack file.
    pub pack_checksum: Digest,
    /// Checksum of the index file itself (excluding this field).
    pub index_checksum: Digest,
}

/// One logical index entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexEntry {
    pub digest: Digest,
    pub offset: u64,
    /// Entry CRC; only present in v2 indexes.
    pub crc: Option<u32>,
}

/// Everything reported by [`IndexFile::summary`].
#[derive(Debug, Clone)]
pub struct IndexSummary {
    pub version: u32,
    pub entry_count: u32,
    /// Named table regions in file order.
    pub tables: Vec<(&'static str, TableSpec)>,
    pub trailer_start: u64,
    pub trailer: IndexTrailer,
}

/// A memory-mapped index file with its table layout resolved.
#[derive(Debug)]
pub struct IndexFile {
    data: Mmap,
    version: u32,
    entry_count: u32,
    layout: IndexLayout,
    trailer: IndexTrailer,
    path: PathBuf,
}

impl IndexFile {
    /// Open and validate an index file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PackError> {
        let path = path.as_ref().to_path_buf();
        let file = std::fs::File::open(&path)?;
        let data = unsafe { Mmap::map(&file)? };
        Self::from_mmap(data, path)
    }

    fn from_mmap(data: Mmap, path: PathBuf) -> Result<Self, PackError> {
        // Even an empty v1 index needs a fan-out table and a trailer.
        if data.len() < 1024 + 2 * DIGEST_LEN {
            return Err(PackError::Truncated {
                what: "index fan-out table",
                offset: data.len() as u64,
            });
        }

        let (version, header_size) = if data[0..4] == INDEX_SIGNATURE {
            let version = be_u32(&data, 4);
            if version > INDEX_MAX_VERSION {
                return Err(PackError::UnsupportedVersion(version));
            }
            (version, 8u64)
        } else {
            // No signature: the first fan-out word starts at byte 0.
            (1, 0u64)
        };

        // The 256th fan-out value is the total entry count.
        let fan_out = TableSpec::new(header_size, WORD, 256);
        let count_pos = fan_out.offset_of(255) as usize;
        if count_pos + 4 > data.len() {
            return Err(PackError::Truncated {
                what: "index fan-out table",
                offset: count_pos as u64,
            });
        }
        let entry_count = be_u32(&data, count_pos);

        let layout = IndexLayout::new(version, header_size, entry_count as u64);
        let trailer_start = layout.trailer_start();
        if trailer_start + 2 * DIGEST_LEN as u64 > data.len() as u64 {
            return Err(PackError::Truncated {
                what: "index tables",
                offset: trailer_start,
            });
        }

        let trailer = IndexTrailer {
            pack_checksum: digest_at(&data, trailer_start as usize)?,
            index_checksum: digest_at(&data, trailer_start as usize + DIGEST_LEN)?,
        };

        Ok(Self {
            data,
            version,
            entry_count,
            layout,
            trailer,
            path,
        })
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn entry_count(&self) -> u32 {
        self.entry_count
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn trailer(&self) -> &IndexTrailer {
        &self.trailer
    }

    /// Raw index bytes (used for checksum verification).
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Digest of entry `i`, in digest-sorted file order.
    pub fn digest_at_index(&self, i: u32) -> Digest {
        debug_assert!(i < self.entry_count);
        let pos = match &self.layout {
            IndexLayout::V1 { combined, .. } => combined.offset_of(i as u64) + WORD,
            IndexLayout::V2 { digests, .. } => digests.offset_of(i as u64),
        } as usize;
        // Table bounds were validated against the file length at open time.
        let mut bytes = [0u8; DIGEST_LEN];
        bytes.copy_from_slice(&self.data[pos..pos + DIGEST_LEN]);
        Digest::from(bytes)
    }

    /// Pack offset of entry `i`.
    pub fn offset_at_index(&self, i: u32) -> u64 {
        debug_assert!(i < self.entry_count);
        let pos = match &self.layout {
            IndexLayout::V1 { combined, .. } => combined.offset_of(i as u64),
            IndexLayout::V2 { offsets, .. } => offsets.offset_of(i as u64),
        } as usize;
        be_u32(&self.data, pos) as u64
    }

    /// Entry CRC of entry `i`; `None` for v1 indexes, which carry no CRCs.
    pub fn crc_at_index(&self, i: u32) -> Option<u32> {
        debug_assert!(i < self.entry_count);
        match &self.layout {
            IndexLayout::V1 { .. } => None,
            IndexLayout::V2 { crcs, .. } => {
                Some(be_u32(&self.data, crcs.offset_of(i as u64) as usize))
            }
        }
    }

    /// All digests in file (ascending) order.
    pub fn digests(&self) -> Vec<Digest> {
        (0..self.entry_count).map(|i| self.digest_at_index(i)).collect()
    }

    /// All pack offsets in digest order.
    pub fn offsets(&self) -> Vec<u64> {
        (0..self.entry_count).map(|i| self.offset_at_index(i)).collect()
    }

    /// All entry CRCs in digest order, or `None` for a v1 index.
    pub fn crcs(&self) -> Option<Vec<u32>> {
        match &self.layout {
            IndexLayout::V1 { .. } => None,
            IndexLayout::V2 { .. } => {
                Some((0..self.entry_count).flat_map(|i| self.crc_at_index(i)).collect())
            }
        }
    }

    /// Iterate over all entries in digest order.
    pub fn entries(&self) -> IndexIter<'_> {
        IndexIter { index: self, pos: 0 }
    }

    /// Exact lookup: pack offset for a digest.
    ///
    /// Binary search over the sorted digest column.
    pub fn offset_of(&self, digest: &Digest) -> Result<u64, PackError> {
        let mut low = 0u32;
        let mut high = self.entry_count;
        while low < high {
            let mid = low + (high - low) / 2;
            match self.digest_at_index(mid).cmp(digest) {
                std::cmp::Ordering::Less => low = mid + 1,
                std::cmp::Ordering::Greater => high = mid,
                std::cmp::Ordering::Equal => return Ok(self.offset_at_index(mid)),
            }
        }
        Err(PackError::NotFound(digest.to_hex()))
    }

    /// Pack offset of the first entry whose digest starts with `prefix`
    /// (hex, case-insensitive).
    pub fn offset_for_prefix(&self, prefix: &str) -> Result<u64, PackError> {
        for i in 0..self.entry_count {
            if self.digest_at_index(i).matches_hex_prefix(prefix) {
                return Ok(self.offset_at_index(i));
            }
        }
        Err(PackError::NotFound(prefix.to_string()))
    }

    /// Digest of the entry stored at the given pack offset.
    pub fn digest_for_offset(&self, offset: u64) -> Result<Digest, PackError> {
        for i in 0..self.entry_count {
            if self.offset_at_index(i) == offset {
                return Ok(self.digest_at_index(i));
            }
        }
        Err(PackError::NotFound(format!("offset {offset:#x}")))
    }

    /// Structured report of the index: version, table boundaries, trailer.
    pub fn summary(&self) -> IndexSummary {
        IndexSummary {
            version: self.version,
            entry_count: self.entry_count,
            tables: self.layout.regions(),
            trailer_start: self.layout.trailer_start(),
            trailer: self.trailer,
        }
    }
}

/// Iterator over [`IndexEntry`] values in digest order.
pub struct IndexIter<'a> {
    index: &'a IndexFile,
    pos: u32,
}

impl Iterator for IndexIter<'_> {
    type Item = IndexEntry;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.index.entry_count {
            return None;
        }
        let i = self.pos;
        self.pos += 1;
        Some(IndexEntry {
            digest: self.index.digest_at_index(i),
            offset: self.index.offset_at_index(i),
            crc: self.index.crc_at_index(i),
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.index.entry_count - self.pos) as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for IndexIter<'_> {}

fn be_u32(data: &[u8], pos: usize) -> u32 {
    u32::from_be_bytes([data[pos], data[pos + 1], data[pos + 2], data[pos + 3]])
}

fn digest_at(data: &[u8], pos: usize) -> Result<Digest, PackError> {
    if pos + DIGEST_LEN > data.len() {
        return Err(PackError::Truncated {
            what: "index trailer",
            offset: pos as u64,
        });
    }
    Ok(Digest::from_bytes(&data[pos..pos + DIGEST_LEN])?)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use pack_digest::hasher::Hasher;
    use std::io::Write;

    pub(crate) fn make_digest(first: u8, last: u8) -> Digest {
        let mut bytes = [0u8; 20];
        bytes[0] = first;
        bytes[19] = last;
        Digest::from_bytes(&bytes).unwrap()
    }

    fn fan_out_for(entries: &[(Digest, u64, u32)]) -> [u32; 256] {
        let mut fan_out = [0u32; 256];
        for (digest, _, _) in entries {
            fan_out[digest.first_byte() as usize] += 1;
        }
        for i in 1..256 {
            fan_out[i] += fan_out[i - 1];
        }
        fan_out
    }

    /// Build a v2 index in memory. Entries are (digest, offset, crc).
    pub(crate) fn build_v2_index(entries: &[(Digest, u64, u32)], pack_checksum: &[u8; 20]) -> Vec<u8> {
        let mut sorted: Vec<_> = entries.to_vec();
        sorted.sort_by(|a, b| a.0.cmp(&b.0));

        let mut buf = Vec::new();
        buf.extend_from_slice(&INDEX_SIGNATURE);
        buf.extend_from_slice(&2u32.to_be_bytes());
        for count in fan_out_for(&sorted) {
            buf.extend_from_slice(&count.to_be_bytes());
        }
        for (digest, _, _) in &sorted {
            buf.extend_from_slice(digest.as_bytes());
        }
        for (_, _, crc) in &sorted {
            buf.extend_from_slice(&crc.to_be_bytes());
        }
        for (_, offset, _) in &sorted {
            buf.extend_from_slice(&(*offset as u32).to_be_bytes());
        }
        buf.extend_from_slice(pack_checksum);
        let checksum = Hasher::digest(&buf).unwrap();
        buf.extend_from_slice(checksum.as_bytes());
        buf
    }

    /// Build a legacy v1 index in memory. Entries are (digest, offset).
    pub(crate) fn build_v1_index(entries: &[(Digest, u64)], pack_checksum: &[u8; 20]) -> Vec<u8> {
        let mut sorted: Vec<_> = entries.to_vec();
        sorted.sort_by(|a, b| a.0.cmp(&b.0));

        let with_crc: Vec<_> = sorted.iter().map(|&(d, o)| (d, o, 0)).collect();
        let mut buf = Vec::new();
        for count in fan_out_for(&with_crc) {
            buf.extend_from_slice(&count.to_be_bytes());
        }
        for (digest, offset) in &sorted {
            buf.extend_from_slice(&(*offset as u32).to_be_bytes());
            buf.extend_from_slice(digest.as_bytes());
        }
        buf.extend_from_slice(pack_checksum);
        let checksum = Hasher::digest(&buf).unwrap();
        buf.extend_from_slice(checksum.as_bytes());
        buf
    }

    pub(crate) fn write_index(dir: &Path, data: &[u8]) -> PathBuf {
        let path = dir.join("test.idx");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(data).unwrap();
        path
    }

    #[test]
    fn open_v2_and_look_up() {
        let dir = tempfile::tempdir().unwrap();
        let entries = vec![
            (make_digest(0x00, 0x01), 12, 0x111),
            (make_digest(0x7f, 0x01), 200, 0x222),
            (make_digest(0xff, 0x01), 300, 0x333),
        ];
        let data = build_v2_index(&entries, &[0u8; 20]);
        let idx = IndexFile::open(write_index(dir.path(), &data)).unwrap();

        assert_eq!(idx.version(), 2);
        assert_eq!(idx.entry_count(), 3);
        for (digest, offset, _) in &entries {
            assert_eq!(idx.offset_of(digest).unwrap(), *offset);
        }
    }

    #[test]
    fn open_v1_and_look_up() {
        let dir = tempfile::tempdir().unwrap();
        let entries = vec![
            (make_digest(0x10, 0x01), 12),
            (make_digest(0x20, 0x02), 90),
        ];
        let data = build_v1_index(&entries, &[0u8; 20]);
        let idx = IndexFile::open(write_index(dir.path(), &data)).unwrap();

        assert_eq!(idx.version(), 1);
        assert_eq!(idx.entry_count(), 2);
        assert_eq!(idx.offset_of(&make_digest(0x10, 0x01)).unwrap(), 12);
        assert_eq!(idx.offset_of(&make_digest(0x20, 0x02)).unwrap(), 90);
        assert_eq!(idx.crcs(), None);
        assert_eq!(idx.crc_at_index(0), None);
    }

    #[test]
    fn version_3_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut data = build_v2_index(&[], &[0u8; 20]);
        data[4..8].copy_from_slice(&3u32.to_be_bytes());
        let err = IndexFile::open(write_index(dir.path(), &data)).unwrap_err();
        assert!(matches!(err, PackError::UnsupportedVersion(3)));
    }

    #[test]
    fn truncated_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let data = build_v2_index(&[(make_digest(0xab, 0x01), 12, 0)], &[0u8; 20]);
        let err =
            IndexFile::open(write_index(dir.path(), &data[..data.len() - 30])).unwrap_err();
        assert!(matches!(err, PackError::Truncated { .. }));
    }

    #[test]
    fn listings_are_digest_ordered() {
        let dir = tempfile::tempdir().unwrap();
        let entries = vec![
            (make_digest(0xff, 0x01), 100, 1),
            (make_digest(0x00, 0x01), 200, 2),
            (make_digest(0x55, 0x01), 300, 3),
        ];
        let data = build_v2_index(&entries, &[0u8; 20]);
        let idx = IndexFile::open(write_index(dir.path(), &data)).unwrap();

        let digests = idx.digests();
        assert_eq!(digests[0], make_digest(0x00, 0x01));
        assert_eq!(digests[1], make_digest(0x55, 0x01));
        assert_eq!(digests[2], make_digest(0xff, 0x01));
        // offsets and crcs follow the same order
        assert_eq!(idx.offsets(), vec![200, 300, 100]);
        assert_eq!(idx.crcs(), Some(vec![2, 3, 1]));

        let collected: Vec<_> = idx.entries().collect();
        assert_eq!(collected.len(), 3);
        assert_eq!(collected[0].digest, digests[0]);
        assert_eq!(collected[0].offset, 200);
        assert_eq!(collected[0].crc, Some(2));
    }

    #[test]
    fn prefix_lookup_finds_first_match() {
        let dir = tempfile::tempdir().unwrap();
        let entries = vec![
            (make_digest(0xab, 0x01), 100, 0),
            (make_digest(0xab, 0x02), 200, 0),
            (make_digest(0xac, 0x01), 300, 0),
        ];
        let data = build_v2_index(&entries, &[0u8; 20]);
        let idx = IndexFile::open(write_index(dir.path(), &data)).unwrap();

        assert_eq!(idx.offset_for_prefix("ab").unwrap(), 100);
        assert_eq!(idx.offset_for_prefix("AC").unwrap(), 300);
        let err = idx.offset_for_prefix("dead").unwrap_err();
        assert!(matches!(err, PackError::NotFound(_)));
    }

    #[test]
    fn digest_for_offset_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let entries = vec![
            (make_digest(0x01, 0x01), 100, 0),
            (make_digest(0x02, 0x01), 250, 0),
        ];
        let data = build_v2_index(&entries, &[0u8; 20]);
        let idx = IndexFile::open(write_index(dir.path(), &data)).unwrap();

        assert_eq!(idx.digest_for_offset(250).unwrap(), make_digest(0x02, 0x01));
        assert!(matches!(
            idx.digest_for_offset(123).unwrap_err(),
            PackError::NotFound(_)
        ));
    }

    #[test]
    fn missing_digest_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let data = build_v2_index(&[(make_digest(0xab, 0x01), 12, 0)], &[0u8; 20]);
        let idx = IndexFile::open(write_index(dir.path(), &data)).unwrap();
        let err = idx.offset_of(&make_digest(0xab, 0x02)).unwrap_err();
        assert!(matches!(err, PackError::NotFound(_)));
    }

    #[test]
    fn summary_reports_contiguous_tables() {
        let dir = tempfile::tempdir().unwrap();
        let data = build_v2_index(
            &[
                (make_digest(0x11, 0x01), 12, 7),
                (make_digest(0x99, 0x02), 48, 8),
            ],
            &[0xaa; 20],
        );
        let idx = IndexFile::open(write_index(dir.path(), &data)).unwrap();
        let summary = idx.summary();

        assert_eq!(summary.version, 2);
        assert_eq!(summary.entry_count, 2);
        assert_eq!(summary.tables.len(), 4);
        for pair in summary.tables.windows(2) {
            assert_eq!(pair[0].1.end(), pair[1].1.start);
        }
        // tables exhaust the file up to the trailer
        assert_eq!(
            summary.trailer_start,
            (data.len() - 2 * DIGEST_LEN) as u64
        );
        assert_eq!(summary.trailer.pack_checksum.as_bytes(), &[0xaa; 20]);

        // entry count agrees with per-table derivation
        for (name, spec) in &summary.tables {
            if *name != "fan_out" {
                assert_eq!(spec.size() / spec.entry_size, 2);
            }
        }
    }

    #[test]
    fn empty_v2_index() {
        let dir = tempfile::tempdir().unwrap();
        let data = build_v2_index(&[], &[0u8; 20]);
        let idx = IndexFile::open(write_index(dir.path(), &data)).unwrap();
        assert_eq!(idx.entry_count(), 0);
        assert_eq!(idx.entries().count(), 0);
        assert!(idx.offset_for_prefix("ab").is_err());
    }
}
