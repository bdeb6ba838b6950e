// created = "2026-10-17"
// modified = "2026-10-17"
// driver = "Isaac Clayton"

//! Replica identifiers, tags, and per-replica clocks.
//!
//! A [`ReplicaTag`] names one local operation: the replica that performed it
//! and that replica's counter at the time. Tags are unique as long as replica
//! ids are, and no coordination is needed to mint them.
//!
//! Tags are totally ordered by `(replica, counter)`: replica ids compare
//! lexicographically, and tags of one replica compare by counter. The
//! sequence CRDT orders concurrent siblings by this comparator, descending.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;

/// An opaque replica identifier.
#[derive(Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReplicaId(String);

impl ReplicaId {
    /// Create a replica id.
    pub fn new(id: impl Into<String>) -> ReplicaId {
        return ReplicaId(id.into());
    }

    /// Borrow the id as a string.
    pub fn as_str(&self) -> &str {
        return &self.0;
    }
}

impl From<&str> for ReplicaId {
    fn from(id: &str) -> Self {
        return ReplicaId(id.to_string());
    }
}

impl From<String> for ReplicaId {
    fn from(id: String) -> Self {
        return ReplicaId(id);
    }
}

impl fmt::Display for ReplicaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return f.write_str(&self.0);
    }
}

impl fmt::Debug for ReplicaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return write!(f, "ReplicaId({})", self.0);
    }
}

/// A unique operation tag: `(replica, counter)`.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ReplicaTag {
    /// The replica that minted this tag.
    pub replica: ReplicaId,
    /// The replica's counter when the tag was minted.
    pub counter: u64,
}

impl ReplicaTag {
    /// Create a tag.
    pub fn new(replica: impl Into<ReplicaId>, counter: u64) -> ReplicaTag {
        return ReplicaTag { replica: replica.into(), counter };
    }
}

impl PartialOrd for ReplicaTag {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        return Some(self.cmp(other));
    }
}

impl Ord for ReplicaTag {
    fn cmp(&self, other: &Self) -> Ordering {
        // Replica first, then counter
        return self
            .replica
            .cmp(&other.replica)
            .then(self.counter.cmp(&other.counter));
    }
}

impl fmt::Display for ReplicaTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return write!(f, "{}:{}", self.replica, self.counter);
    }
}

impl fmt::Debug for ReplicaTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return write!(f, "ReplicaTag({}:{})", self.replica, self.counter);
    }
}

/// Error returned when a tag string is not `replica:counter`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseTagError(pub String);

impl fmt::Display for ParseTagError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return write!(f, "invalid replica tag `{}`", self.0);
    }
}

impl std::error::Error for ParseTagError {}

impl FromStr for ReplicaTag {
    type Err = ParseTagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Split at the last colon so replica ids may contain colons.
        let (replica, counter) = s.rsplit_once(':').ok_or_else(|| ParseTagError(s.to_string()))?;
        let counter = counter.parse::<u64>().map_err(|_| ParseTagError(s.to_string()))?;
        return Ok(ReplicaTag::new(replica, counter));
    }
}

impl Serialize for ReplicaTag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        return serializer.collect_str(self);
    }
}

impl<'de> Deserialize<'de> for ReplicaTag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        return s.parse().map_err(serde::de::Error::custom);
    }
}

/// A per-replica Lamport counter that mints [`ReplicaTag`]s.
///
/// The clock is a field of the primitive that owns it, never shared, so
/// two replicas in one process can not collide on tags.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReplicaClock {
    replica: ReplicaId,
    counter: u64,
}

impl ReplicaClock {
    /// Create a clock starting at 0.
    pub fn new(replica: impl Into<ReplicaId>) -> ReplicaClock {
        return ReplicaClock { replica: replica.into(), counter: 0 };
    }

    /// Create a clock with a specific counter, e.g. when importing state.
    pub fn with_counter(replica: impl Into<ReplicaId>, counter: u64) -> ReplicaClock {
        return ReplicaClock { replica: replica.into(), counter };
    }

    /// The replica this clock mints tags for.
    #[inline]
    pub fn replica(&self) -> &ReplicaId {
        return &self.replica;
    }

    /// The current counter (the counter of the last minted tag).
    #[inline]
    pub fn counter(&self) -> u64 {
        return self.counter;
    }

    /// Increment the counter and mint a tag.
    #[inline]
    pub fn tick(&mut self) -> ReplicaTag {
        self.counter += 1;
        return ReplicaTag {
            replica: self.replica.clone(),
            counter: self.counter,
        };
    }

    /// Advance the counter to at least `counter`.
    #[inline]
    pub fn observe(&mut self, counter: u64) {
        self.counter = self.counter.max(counter);
    }
}
