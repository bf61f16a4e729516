//! Checksum and CRC verification, and whole-pack iteration.
//!
//! The core never verifies anything on open; these are explicit operations
//! a caller invokes when it wants the guarantees.

use pack_digest::hasher::Hasher;
use pack_digest::{Digest, DIGEST_LEN};

use crate::pack::PackReader;
use crate::{PackError, ResolvedObject};

impl PackReader {
    /// Verify the pack's trailing checksum against its content.
    pub fn verify_checksum(&self) -> Result<(), PackError> {
        let data = self.data();
        let content = &data[..data.len() - DIGEST_LEN];
        let stored = Digest::from_bytes(&data[data.len() - DIGEST_LEN..])?;

        let mut hasher = Hasher::new();
        hasher.update(content);
        let computed = hasher.finalize()?;

        if computed != stored {
            return Err(PackError::ChecksumMismatch { stored, computed });
        }
        Ok(())
    }

    /// Verify the index's own trailing checksum.
    pub fn verify_index_checksum(&self) -> Result<(), PackError> {
        let data = self.index().data();
        let content = &data[..data.len() - DIGEST_LEN];
        let stored = self.index().trailer().index_checksum;

        let mut hasher = Hasher::new();
        hasher.update(content);
        let computed = hasher.finalize()?;

        if computed != stored {
            return Err(PackError::ChecksumMismatch { stored, computed });
        }
        Ok(())
    }

    /// Verify every entry's CRC against the raw pack bytes it spans.
    ///
    /// Returns the number of entries checked, or `None` for a v1 index,
    /// which carries no CRC table.
    pub fn verify_crcs(&self) -> Result<Option<u32>, PackError> {
        if self.index().version() < 2 {
            return Ok(None);
        }

        let mut checked = 0;
        for entry in self.index().entries() {
            let span = self.packed_size_at(entry.offset)?;
            let start = entry.offset as usize;
            let end = start + span as usize;
            if end > self.data().len() {
                return Err(PackError::Truncated {
                    what: "pack entry",
                    offset: entry.offset,
                });
            }

            let mut hasher = crc32fast::Hasher::new();
            hasher.update(&self.data()[start..end]);
            let computed = hasher.finalize();

            // crcs are always present in a v2 index
            let stored = entry.crc.unwrap_or_default();
            if computed != stored {
                return Err(PackError::CrcMismatch {
                    digest: entry.digest,
                    stored,
                    computed,
                });
            }
            checked += 1;
        }
        Ok(Some(checked))
    }

    /// Iterate over every object in the pack, resolving each in digest order.
    pub fn objects(&self) -> ObjectIter<'_> {
        ObjectIter { pack: self, pos: 0 }
    }
}

/// Iterator resolving all objects of a pack in index order.
pub struct ObjectIter<'a> {
    pack: &'a PackReader,
    pos: u32,
}

impl Iterator for ObjectIter<'_> {
    type Item = Result<(Digest, ResolvedObject), PackError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.pack.index().entry_count() {
            return None;
        }
        let digest = self.pack.index().digest_at_index(self.pos);
        let offset = self.pack.index().offset_at_index(self.pos);
        self.pos += 1;
        Some(self.pack.resolve_at(offset).map(|obj| (digest, obj)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.pack.index().entry_count() - self.pos) as usize;
        (remaining, Some(remaining))
    }
}
