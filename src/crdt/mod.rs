// created = "2026-10-17"
// modified = "2026-10-17"
// driver = "Isaac Clayton"

//! State-based CRDT primitives.
//!
//! | Primitive | Holds | Merge |
//! |-----------|-------|-------|
//! | [`OrSet`](or_set::OrSet) | byte strings | union of tagged adds and tombstones |
//! | [`LwwRegister`](lww::LwwRegister) | one scored value | keep the dominant (score, timestamp) |
//! | [`Sequence`](sequence::Sequence) | an ordered byte string | union of nodes, sticky tombstones |
//! | [`ChunkLog`](chunk_log::ChunkLog) | content-addressed chunks | union of chunks |
//!
//! Every primitive is a plain synchronous value owned by one replica. Merge
//! reads the other instance and mutates only the receiver, so instances
//! built on different threads can be merged in any order.

pub mod chunk_log;
pub mod lww;
pub mod or_set;
pub mod sequence;
pub mod tag;

/// A CRDT is a data type with a merge operator that is commutative,
/// associative, and idempotent.
pub trait Crdt {
    /// Merge another instance into this one.
    fn merge(&mut self, other: &Self);
}
