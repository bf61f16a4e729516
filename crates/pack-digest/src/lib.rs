//! Content digests for the pack object store.
//!
//! Objects in a pack are addressed by a fixed-width 20-byte SHA-1 digest.
//! This crate provides the [`Digest`] type, hex encoding/decoding, and a
//! streaming [`Hasher`](hasher::Hasher) for recomputing object identities.

mod error;
pub mod hasher;
pub mod hex;

use std::fmt;
use std::str::FromStr;

pub use error::DigestError;

/// Width of a digest in bytes.
pub const DIGEST_LEN: usize = 20;

/// A fixed-width content identifier — the SHA-1 of an object's content.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Digest([u8; DIGEST_LEN]);

impl Digest {
    /// The null digest (all zeros).
    pub const NULL: Self = Self([0u8; DIGEST_LEN]);

    /// Create a digest from raw bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DigestError> {
        if bytes.len() != DIGEST_LEN {
            return Err(DigestError::InvalidLength {
                expected: DIGEST_LEN,
                actual: bytes.len(),
            });
        }
        let mut arr = [0u8; DIGEST_LEN];
        arr.copy_from_slice(bytes);
        Ok(Self(arr))
    }

    /// Parse a digest from its 40-character hex representation.
    pub fn from_hex(s: &str) -> Result<Self, DigestError> {
        let mut arr = [0u8; DIGEST_LEN];
        hex::decode(s, &mut arr)?;
        Ok(Self(arr))
    }

    /// The raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }

    /// The lowercase hex representation.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    /// First byte of the digest (the fan-out bucket).
    pub fn first_byte(&self) -> u8 {
        self.0[0]
    }

    /// True for the all-zeros digest.
    pub fn is_null(&self) -> bool {
        self.0.iter().all(|&b| b == 0)
    }

    /// Whether this digest's hex form starts with the given hex prefix.
    ///
    /// The comparison is case-insensitive; an odd-length prefix matches on
    /// the half nibble like `git rev-parse` abbreviations do.
    pub fn matches_hex_prefix(&self, prefix: &str) -> bool {
        let hex = self.to_hex();
        prefix.len() <= hex.len()
            && hex.as_bytes()[..prefix.len()]
                .iter()
                .zip(prefix.bytes())
                .all(|(&a, b)| a == b.to_ascii_lowercase())
    }
}

impl From<[u8; DIGEST_LEN]> for Digest {
    fn from(bytes: [u8; DIGEST_LEN]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", &self.to_hex()[..8])
    }
}

impl FromStr for Digest {
    type Err = DigestError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}
