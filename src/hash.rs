// created = "2026-10-17"
// modified = "2026-10-17"
// driver = "Isaac Clayton"

//! Content hashing for deduplication.
//!
//! Content hashes address chunks in the [`ChunkLog`](crate::crdt::chunk_log::ChunkLog)
//! and bucket elements in the [`OrSet`](crate::crdt::or_set::OrSet). They are
//! fast and weak: 32 bits, no resistance against an adversary, and no
//! collision detection in the chunk store. Two distinct chunks with the same
//! digest are treated as the same chunk.
//!
//! The digest is part of the persisted format (hashes are map keys in every
//! export), so [`Fnv1a`] is the default and changing it breaks compatibility
//! with existing checkpoints. The [`ContentHasher`] trait keeps the choice in
//! one place so it can be audited or swapped deliberately.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;

/// FNV-1a 32-bit offset basis.
pub const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;

/// FNV-1a 32-bit prime.
pub const FNV_PRIME: u32 = 0x0100_0193;

/// A 32-bit content digest.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentHash(pub u32);

/// A digest function over byte content.
pub trait ContentHasher: Clone + Default + Send + Sync {
    /// Digest a byte slice.
    fn digest(&self, bytes: &[u8]) -> ContentHash;
}

/// FNV-1a, 32-bit. The wire-compatible default.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Fnv1a;

impl ContentHasher for Fnv1a {
    fn digest(&self, bytes: &[u8]) -> ContentHash {
        return ContentHash(fnv1a(bytes));
    }
}

/// The first four bytes of a blake3 digest, big-endian.
///
/// Same width as [`Fnv1a`], so it drops into every structure unchanged, but
/// its exports are not interchangeable with FNV-1a exports.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Blake3Prefix;

impl ContentHasher for Blake3Prefix {
    fn digest(&self, bytes: &[u8]) -> ContentHash {
        let mut hasher = blake3::Hasher::new();
        hasher.update(bytes);
        let result = hasher.finalize();
        let b = result.as_bytes();
        return ContentHash(u32::from_be_bytes([b[0], b[1], b[2], b[3]]));
    }
}

/// Compute the FNV-1a 32-bit digest of a byte slice.
pub fn fnv1a(bytes: &[u8]) -> u32 {
    let mut hash = FNV_OFFSET_BASIS;
    for byte in bytes {
        hash ^= *byte as u32;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    return hash;
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return write!(f, "{:08x}", self.0);
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return write!(f, "ContentHash({:08x})", self.0);
    }
}

/// Error returned when a content hash string is not 1 to 8 hex digits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseHashError(pub String);

impl fmt::Display for ParseHashError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return write!(f, "invalid content hash `{}`", self.0);
    }
}

impl std::error::Error for ParseHashError {}

impl FromStr for ContentHash {
    type Err = ParseHashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || s.len() > 8 {
            return Err(ParseHashError(s.to_string()));
        }
        return u32::from_str_radix(s, 16)
            .map(ContentHash)
            .map_err(|_| ParseHashError(s.to_string()));
    }
}

impl Serialize for ContentHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        return serializer.collect_str(self);
    }
}

impl<'de> Deserialize<'de> for ContentHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        return s.parse().map_err(serde::de::Error::custom);
    }
}
