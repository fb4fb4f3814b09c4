//! Packfile parsing and delta resolution.
//!
//! This crate implements the parts of git's packfile format this
//! implementation needs: the incoming pack stream on a clone is never
//! written to disk as a `.pack`/`.idx` pair, so there is no persisted
//! index, multi-pack-index, bitmap, or repack/push machinery here — just
//! entry header parsing, delta application, and the in-memory streaming
//! parser in [`stream`].

pub mod delta;
pub mod entry;
pub mod stream;

pub use stream::{ParsedPack, ResolvedObject};

use git_hash::ObjectId;
use git_object::ObjectType;

/// Errors that can occur during pack operations.
#[derive(Debug, thiserror::Error)]
pub enum PackError {
    #[error("invalid pack header: {0}")]
    InvalidHeader(String),

    #[error("invalid delta at offset {offset}: {reason}")]
    InvalidDelta { offset: u64, reason: String },

    #[error("delta base not found: {0}")]
    MissingBase(ObjectId),

    #[error("pack checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: ObjectId, actual: ObjectId },

    #[error("corrupt pack entry at offset {0}")]
    CorruptEntry(u64),

    #[error("unsupported pack version: {0}")]
    UnsupportedVersion(u32),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Object(#[from] git_object::ObjectError),

    #[error(transparent)]
    Hash(#[from] git_hash::HashError),
}

/// Type of a packed object entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackEntryType {
    Commit,
    Tree,
    Blob,
    Tag,
    /// Delta with offset to base in same pack.
    OfsDelta { base_offset: u64 },
    /// Delta referencing base by OID.
    RefDelta { base_oid: ObjectId },
}

impl PackEntryType {
    /// Convert a non-delta pack entry type to an ObjectType.
    pub fn to_object_type(self) -> Option<ObjectType> {
        match self {
            Self::Commit => Some(ObjectType::Commit),
            Self::Tree => Some(ObjectType::Tree),
            Self::Blob => Some(ObjectType::Blob),
            Self::Tag => Some(ObjectType::Tag),
            Self::OfsDelta { .. } | Self::RefDelta { .. } => None,
        }
    }

    /// Type number as used in pack entry headers.
    pub fn type_number(&self) -> u8 {
        match self {
            Self::Commit => 1,
            Self::Tree => 2,
            Self::Blob => 3,
            Self::Tag => 4,
            Self::OfsDelta { .. } => 6,
            Self::RefDelta { .. } => 7,
        }
    }
}

/// Pack format constants.
pub const PACK_SIGNATURE: &[u8; 4] = b"PACK";
pub const PACK_VERSION: u32 = 2;
pub const PACK_HEADER_SIZE: usize = 12;
