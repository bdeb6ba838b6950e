// created = "2026-10-17"
// modified = "2026-10-17"
// driver = "Isaac Clayton"

//! Content-addressed, append-only chunk log.
//!
//! Appended bytes are split into fixed-size chunks. Each chunk is stored
//! once under its content hash, and the log keeps the order in which hashes
//! were first seen so content can be reassembled.
//!
//! Merge is the union of the chunk stores. Hashes the receiver has not seen
//! are appended to its order list in the other log's order, so the order
//! list is local to each replica and is not part of the replicated state.
//!
//! Hashes are 32-bit and weak. Two distinct chunks with the same digest are
//! stored as one, and nothing detects it.

use std::collections::BTreeMap;

use rustc_hash::FxHashSet;
use serde::Deserialize;
use serde::Serialize;

use crate::crdt::Crdt;
use crate::crdt::tag::ReplicaId;
use crate::error::Result;
use crate::hash::ContentHash;
use crate::hash::ContentHasher;
use crate::hash::Fnv1a;

/// Persisted form of a [`ChunkLog`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkLogState {
    pub replica_id: ReplicaId,
    pub chunk_size: usize,
    pub chunks: BTreeMap<ContentHash, Vec<u8>>,
    pub order: Vec<ContentHash>,
}

/// A deduplicating chunk store.
#[derive(Clone, Debug)]
pub struct ChunkLog<H: ContentHasher = Fnv1a> {
    replica: ReplicaId,
    chunk_size: usize,
    chunks: BTreeMap<ContentHash, Vec<u8>>,
    /// Every stored hash exactly once, in first-seen order.
    order: Vec<ContentHash>,
    hasher: H,
}

impl ChunkLog<Fnv1a> {
    /// Create an empty log owned by `replica`. A chunk size of 0 is raised
    /// to 1.
    pub fn new(replica: impl Into<ReplicaId>, chunk_size: usize) -> ChunkLog<Fnv1a> {
        return ChunkLog::with_hasher(replica, chunk_size, Fnv1a);
    }

    /// Rebuild a log from its persisted form.
    pub fn import(state: ChunkLogState) -> ChunkLog<Fnv1a> {
        return ChunkLog::import_with_hasher(state, Fnv1a);
    }

    /// Parse a log from JSON.
    pub fn from_json(json: &str) -> Result<ChunkLog<Fnv1a>> {
        let state: ChunkLogState = serde_json::from_str(json)?;
        return Ok(ChunkLog::import(state));
    }
}

impl<H: ContentHasher> ChunkLog<H> {
    /// Create an empty log with a specific content hasher.
    pub fn with_hasher(replica: impl Into<ReplicaId>, chunk_size: usize, hasher: H) -> ChunkLog<H> {
        return ChunkLog {
            replica: replica.into(),
            chunk_size: chunk_size.max(1),
            chunks: BTreeMap::new(),
            order: Vec::new(),
            hasher,
        };
    }

    /// The replica owning this instance.
    pub fn replica(&self) -> &ReplicaId {
        return &self.replica;
    }

    /// Maximum number of bytes per chunk.
    pub fn chunk_size(&self) -> usize {
        return self.chunk_size;
    }

    /// Number of distinct chunks stored.
    pub fn len(&self) -> usize {
        return self.chunks.len();
    }

    /// Check if no chunk is stored.
    pub fn is_empty(&self) -> bool {
        return self.chunks.is_empty();
    }

    /// Digest bytes with this log's hasher.
    pub fn hash_bytes(&self, bytes: &[u8]) -> ContentHash {
        return self.hasher.digest(bytes);
    }

    /// Split `bytes` into chunks, store the unseen ones, and return the hash
    /// of every chunk in order, repeats included.
    pub fn append(&mut self, bytes: &[u8]) -> Vec<ContentHash> {
        let mut hashes = Vec::with_capacity(bytes.len().div_ceil(self.chunk_size));
        for chunk in bytes.chunks(self.chunk_size) {
            let hash = self.hasher.digest(chunk);
            self.store(hash, chunk);
            hashes.push(hash);
        }
        return hashes;
    }

    /// The bytes of one chunk.
    pub fn get_chunk(&self, hash: &ContentHash) -> Option<&[u8]> {
        return self.chunks.get(hash).map(|c| c.as_slice());
    }

    /// Check whether a chunk is stored.
    pub fn contains(&self, hash: &ContentHash) -> bool {
        return self.chunks.contains_key(hash);
    }

    /// Every stored hash, in first-seen order.
    pub fn hashes(&self) -> &[ContentHash] {
        return &self.order;
    }

    /// Hashes stored here but absent from `other`, in this log's order.
    pub fn get_missing<O: ContentHasher>(&self, other: &ChunkLog<O>) -> Vec<ContentHash> {
        return self
            .order
            .iter()
            .filter(|h| !other.contains(h))
            .copied()
            .collect();
    }

    /// Concatenate every stored chunk in order.
    ///
    /// Each distinct chunk appears once, so content with repeated chunks
    /// does not reassemble byte-for-byte.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        for hash in &self.order {
            if let Some(chunk) = self.chunks.get(hash) {
                bytes.extend_from_slice(chunk);
            }
        }
        return bytes;
    }

    /// Drop the oldest chunks until at most `max_chunks` remain, returning
    /// the evicted hashes oldest first.
    ///
    /// Eviction is local. A later merge with a log that still holds an
    /// evicted chunk brings it back.
    pub fn evict_oldest(&mut self, max_chunks: usize) -> Vec<ContentHash> {
        if self.order.len() <= max_chunks {
            return Vec::new();
        }
        let excess = self.order.len() - max_chunks;
        let evicted: Vec<ContentHash> = self.order.drain(..excess).collect();
        for hash in &evicted {
            self.chunks.remove(hash);
        }
        tracing::debug!(
            replica = %self.replica,
            evicted = evicted.len(),
            remaining = self.order.len(),
            "evicted chunks"
        );
        return evicted;
    }

    /// Snapshot the full state.
    pub fn export(&self) -> ChunkLogState {
        return ChunkLogState {
            replica_id: self.replica.clone(),
            chunk_size: self.chunk_size,
            chunks: self.chunks.clone(),
            order: self.order.clone(),
        };
    }

    /// Rebuild a log from its persisted form with a specific hasher.
    ///
    /// Order entries without a chunk, and repeated entries, are dropped.
    /// Chunks missing from the order list are appended in hash order.
    pub fn import_with_hasher(state: ChunkLogState, hasher: H) -> ChunkLog<H> {
        let mut seen = FxHashSet::default();
        let mut order: Vec<ContentHash> = state
            .order
            .into_iter()
            .filter(|h| state.chunks.contains_key(h) && seen.insert(*h))
            .collect();
        order.extend(state.chunks.keys().filter(|h| !seen.contains(*h)).copied());

        return ChunkLog {
            replica: state.replica_id,
            chunk_size: state.chunk_size.max(1),
            chunks: state.chunks,
            order,
            hasher,
        };
    }

    /// Serialize the full state as JSON.
    pub fn to_json(&self) -> Result<String> {
        return Ok(serde_json::to_string(&self.export())?);
    }

    fn store(&mut self, hash: ContentHash, chunk: &[u8]) {
        if self.chunks.contains_key(&hash) {
            return;
        }
        self.chunks.insert(hash, chunk.to_vec());
        self.order.push(hash);
    }
}

impl<H: ContentHasher> Crdt for ChunkLog<H> {
    fn merge(&mut self, other: &Self) {
        for hash in &other.order {
            if let Some(chunk) = other.chunks.get(hash) {
                self.store(*hash, chunk);
            }
        }
    }
}

/// Two logs are equal when they store the same chunks.
impl<H: ContentHasher> PartialEq for ChunkLog<H> {
    fn eq(&self, other: &Self) -> bool {
        return self.chunks == other.chunks;
    }
}
