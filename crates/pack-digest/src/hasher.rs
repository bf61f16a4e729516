//! Streaming SHA-1 computation with collision detection.

use crate::{Digest, DigestError};

/// Incremental SHA-1 hasher.
///
/// Wraps `sha1-checked` so that a detected collision attack surfaces as an
/// error instead of a silently wrong identity.
pub struct Hasher {
    inner: Box<sha1_checked::Sha1>,
}

impl Hasher {
    pub fn new() -> Self {
        use digest::Digest as _;
        Self {
            inner: Box::new(sha1_checked::Sha1::new()),
        }
    }

    /// Feed data into the hasher.
    pub fn update(&mut self, data: &[u8]) {
        use digest::Digest as _;
        self.inner.update(data);
    }

    /// Finalize and return the digest.
    pub fn finalize(self) -> Result<Digest, DigestError> {
        let result = self.inner.try_finalize();
        if result.has_collision() {
            return Err(DigestError::Collision);
        }
        Digest::from_bytes(result.hash().as_slice())
    }

    /// Hash a byte slice in one call.
    pub fn digest(data: &[u8]) -> Result<Digest, DigestError> {
        let mut h = Self::new();
        h.update(data);
        h.finalize()
    }

    /// Hash an object the way the store identifies it: `"{kind} {len}\0{content}"`.
    pub fn hash_object(kind: &str, data: &[u8]) -> Result<Digest, DigestError> {
        let mut h = Self::new();
        h.update(format!("{} {}\0", kind, data.len()).as_bytes());
        h.update(data);
        h.finalize()
    }
}

impl Default for Hasher {
    fn default() -> Self {
        Self::new()
    }
}

impl std::io::Write for Hasher {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_of_empty_input() {
        let d = Hasher::digest(b"").unwrap();
        assert_eq!(d.to_hex(), "da39a3ee5e6b4b0d3255bfef95601890afd80709");
    }

    #[test]
    fn incremental_matches_one_shot() {
        let mut h = Hasher::new();
        h.update(b"hello, ");
        h.update(b"world");
        assert_eq!(h.finalize().unwrap(), Hasher::digest(b"hello, world").unwrap());
    }

    #[test]
    fn hash_object_matches_known_blob() {
        // `echo -n "" | git hash-object --stdin`
        let d = Hasher::hash_object("blob", b"").unwrap();
        assert_eq!(d.to_hex(), "e69de29bb2d1d6434b8b29ae775ad8c2e48c5391");
    }

    #[test]
    fn hash_object_known_content() {
        // `echo "Hello, World!" | git hash-object --stdin`
        let d = Hasher::hash_object("blob", b"Hello, World!\n").unwrap();
        assert_eq!(d.to_hex(), "8ab686eafeb1f44702738c8b0f24f2567c36da6d");
    }

    #[test]
    fn write_impl_feeds_hasher() {
        use std::io::Write;
        let mut h = Hasher::new();
        h.write_all(b"abc").unwrap();
        let via_write = h.finalize().unwrap();
        assert_eq!(via_write, Hasher::digest(b"abc").unwrap());
    }
}
