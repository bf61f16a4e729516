//! Read-only decoding of pack files and their companion indexes.
//!
//! A pack pair consists of a bulk `.pack` file holding zlib-compressed,
//! optionally delta-encoded objects, and an `.idx` file mapping content
//! digests to byte offsets in the pack. This crate parses both index
//! layouts (legacy v1 and the fan-out/CRC v2 variant), decodes object
//! headers and delta instruction streams, and reconstructs original
//! object bytes, including recursive base resolution for delta chains.
//!
//! Writing or mutating packs is out of scope; everything here is
//! write-once at open time and read-many afterwards.

pub mod delta;
pub mod entry;
pub mod index;
pub mod pack;
pub mod table;
pub mod verify;

use pack_digest::Digest;

/// Errors that can occur while decoding a pack pair.
#[derive(Debug, thiserror::Error)]
pub enum PackError {
    #[error("unsupported index version {0}")]
    UnsupportedVersion(u32),

    #[error("unknown object type code {code} at offset {offset}")]
    UnknownObjectType { offset: u64, code: u8 },

    #[error("not found in index: {0}")]
    NotFound(String),

    #[error("corrupt object at offset {offset}: {reason}")]
    CorruptObject { offset: u64, reason: String },

    #[error("corrupt delta at offset {offset}: {reason}")]
    CorruptDelta { offset: u64, reason: String },

    #[error("delta chain deeper than {max_depth} starting at offset {offset}")]
    DeltaChainTooDeep { offset: u64, max_depth: usize },

    #[error("truncated {what} at offset {offset}")]
    Truncated { what: &'static str, offset: u64 },

    #[error("checksum mismatch: stored {stored}, computed {computed}")]
    ChecksumMismatch { stored: Digest, computed: Digest },

    #[error("crc mismatch for {digest}: stored {stored:#010x}, computed {computed:#010x}")]
    CrcMismatch {
        digest: Digest,
        stored: u32,
        computed: u32,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Digest(#[from] pack_digest::DigestError),
}

/// Kind of a fully resolved object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Commit,
    Tree,
    Blob,
    Tag,
}

impl ObjectKind {
    /// The kind name as used in object hashing (`"{kind} {len}\0..."`).
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Commit => "commit",
            Self::Tree => "tree",
            Self::Blob => "blob",
            Self::Tag => "tag",
        }
    }
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Kind of a raw pack entry, before delta resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Commit,
    Tree,
    Blob,
    Tag,
    /// Delta whose base lives earlier in the same pack.
    OfsDelta { base_offset: u64 },
    /// Delta referencing its base by digest.
    RefDelta { base: Digest },
}

impl EntryKind {
    /// The object kind, for non-delta entries.
    pub fn to_object_kind(self) -> Option<ObjectKind> {
        match self {
            Self::Commit => Some(ObjectKind::Commit),
            Self::Tree => Some(ObjectKind::Tree),
            Self::Blob => Some(ObjectKind::Blob),
            Self::Tag => Some(ObjectKind::Tag),
            Self::OfsDelta { .. } | Self::RefDelta { .. } => None,
        }
    }

    pub fn is_delta(&self) -> bool {
        matches!(self, Self::OfsDelta { .. } | Self::RefDelta { .. })
    }

    /// Short name for reports.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Commit => "commit",
            Self::Tree => "tree",
            Self::Blob => "blob",
            Self::Tag => "tag",
            Self::OfsDelta { .. } => "ofs-delta",
            Self::RefDelta { .. } => "ref-delta",
        }
    }
}

/// A fully resolved object: direct payloads decompressed, delta chains applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedObject {
    pub kind: ObjectKind,
    pub data: Vec<u8>,
}

impl ResolvedObject {
    /// Destination byte length of the reconstructed object.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Pack file constants.
pub const PACK_SIGNATURE: &[u8; 4] = b"PACK";
pub const PACK_HEADER_SIZE: usize = 12;

/// Index v2 constants. A file not starting with this signature is read as
/// the legacy v1 layout.
pub const INDEX_SIGNATURE: [u8; 4] = [0xff, 0x74, 0x4f, 0x63]; // "\377tOc"
pub const INDEX_MAX_VERSION: u32 = 2;

/// Trailing pack checksum length; the last object's byte span ends here.
pub const PACK_TRAILER_LEN: u64 = 20;

/// Maximum delta chain depth before resolution bails out.
pub const MAX_DELTA_DEPTH: usize = 64;
