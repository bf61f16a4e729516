//! Index table regions.
//!
//! An index file is a sequence of contiguous fixed-stride tables followed by
//! a trailer. Each region is described once at open time and never changes.

use pack_digest::DIGEST_LEN;

/// Stride of the 4-byte big-endian integers used throughout the index.
pub const WORD: u64 = 4;

/// Number of fan-out buckets (one per leading digest byte).
pub const FAN_OUT_ENTRIES: u64 = 256;

/// A contiguous fixed-stride region of the index file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableSpec {
    /// Byte offset of the region within the index file.
    pub start: u64,
    /// Bytes per entry.
    pub entry_size: u64,
    /// Number of entries.
    pub entries: u64,
}

impl TableSpec {
    pub fn new(start: u64, entry_size: u64, entries: u64) -> Self {
        Self {
            start,
            entry_size,
            entries,
        }
    }

    /// Total byte size of the region.
    pub fn size(&self) -> u64 {
        self.entry_size * self.entries
    }

    /// Byte offset one past the region; the next table starts here.
    pub fn end(&self) -> u64 {
        self.start + self.size()
    }

    /// Byte offset of entry `i`.
    pub fn offset_of(&self, i: u64) -> u64 {
        self.start + i * self.entry_size
    }
}

/// Table layout of an index file, fixed by its version.
#[derive(Debug, Clone, Copy)]
pub enum IndexLayout {
    /// Legacy layout: fan-out, then N × (4-byte offset, 20-byte digest).
    V1 {
        fan_out: TableSpec,
        combined: TableSpec,
    },
    /// Fan-out/CRC layout: fan-out, digests, CRCs, offsets.
    V2 {
        fan_out: TableSpec,
        digests: TableSpec,
        crcs: TableSpec,
        offsets: TableSpec,
    },
}

impl IndexLayout {
    /// Compute the layout for `entries` objects after a header of
    /// `header_size` bytes (8 for v2, 0 for v1).
    pub fn new(version: u32, header_size: u64, entries: u64) -> Self {
        let fan_out = TableSpec::new(header_size, WORD, FAN_OUT_ENTRIES);
        if version == 1 {
            let combined = TableSpec::new(fan_out.end(), WORD + DIGEST_LEN as u64, entries);
            Self::V1 { fan_out, combined }
        } else {
            let digests = TableSpec::new(fan_out.end(), DIGEST_LEN as u64, entries);
            let crcs = TableSpec::new(digests.end(), WORD, entries);
            let offsets = TableSpec::new(crcs.end(), WORD, entries);
            Self::V2 {
                fan_out,
                digests,
                crcs,
                offsets,
            }
        }
    }

    /// Byte offset of the trailer (two 20-byte digests) after the last table.
    pub fn trailer_start(&self) -> u64 {
        match self {
            Self::V1 { combined, .. } => combined.end(),
            Self::V2 { offsets, .. } => offsets.end(),
        }
    }

    /// The fan-out table region.
    pub fn fan_out(&self) -> &TableSpec {
        match self {
            Self::V1 { fan_out, .. } | Self::V2 { fan_out, .. } => fan_out,
        }
    }

    /// Named table regions in file order, for reporting.
    pub fn regions(&self) -> Vec<(&'static str, TableSpec)> {
        match *self {
            Self::V1 { fan_out, combined } => {
                vec![("fan_out", fan_out), ("offset", combined)]
            }
            Self::V2 {
                fan_out,
                digests,
                crcs,
                offsets,
            } => vec![
                ("fan_out", fan_out),
                ("digest", digests),
                ("crc", crcs),
                ("offset", offsets),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_arithmetic() {
        let t = TableSpec::new(8, 4, 256);
        assert_eq!(t.size(), 1024);
        assert_eq!(t.end(), 1032);
        assert_eq!(t.offset_of(255), 8 + 255 * 4);
    }

    #[test]
    fn v2_tables_are_contiguous() {
        let layout = IndexLayout::new(2, 8, 7);
        let regions = layout.regions();
        assert_eq!(regions.len(), 4);
        for pair in regions.windows(2) {
            assert_eq!(pair[0].1.end(), pair[1].1.start);
        }
        assert_eq!(layout.trailer_start(), regions.last().unwrap().1.end());
    }

    #[test]
    fn v1_tables_are_contiguous() {
        let layout = IndexLayout::new(1, 0, 3);
        let regions = layout.regions();
        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0].1.start, 0);
        assert_eq!(regions[0].1.end(), regions[1].1.start);
        // combined entries are offset + digest wide
        assert_eq!(regions[1].1.entry_size, 24);
        assert_eq!(layout.trailer_start(), 1024 + 3 * 24);
    }

    #[test]
    fn entry_counts_agree_across_tables() {
        let layout = IndexLayout::new(2, 8, 42);
        for (name, spec) in layout.regions() {
            if name == "fan_out" {
                continue;
            }
            assert_eq!(spec.size() / spec.entry_size, 42, "table {name}");
        }
    }
}
