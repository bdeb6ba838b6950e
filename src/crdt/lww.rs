// created = "2026-10-17"
// modified = "2026-10-17"
// driver = "Isaac Clayton"

//! Last-writer-wins register holding one scored value.
//!
//! Values are ordered by score, then by timestamp: a strictly higher score
//! wins, and equal scores fall back to the later timestamp. When both are
//! equal the source replica and then the value bytes decide, so two
//! replicas always pick the same winner whichever way they merge. A write
//! that does not strictly dominate the current value is ignored.
//!
//! An unset register is the bottom element; any value dominates it.

use std::cmp::Ordering;

use serde::Deserialize;
use serde::Serialize;

use crate::crdt::Crdt;
use crate::crdt::tag::ReplicaId;
use crate::error::Result;

/// The value held by a register, with the stamp that orders it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LwwEntry {
    pub value: Vec<u8>,
    pub score: f64,
    pub timestamp: u64,
    pub source: ReplicaId,
}

impl LwwEntry {
    /// Compare two entries by (score, timestamp, source, value).
    fn rank(&self, other: &LwwEntry) -> Ordering {
        return self
            .score
            .total_cmp(&other.score)
            .then(self.timestamp.cmp(&other.timestamp))
            .then_with(|| self.source.cmp(&other.source))
            .then_with(|| self.value.cmp(&other.value));
    }
}

/// Persisted form of an [`LwwRegister`]. Unset registers have a null value
/// and source, score 0, and timestamp 0.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LwwState {
    pub replica_id: ReplicaId,
    pub value: Option<Vec<u8>>,
    pub score: f64,
    pub timestamp: u64,
    pub source: Option<ReplicaId>,
}

/// A last-writer-wins register.
#[derive(Clone, Debug)]
pub struct LwwRegister {
    replica: ReplicaId,
    entry: Option<LwwEntry>,
}

impl LwwRegister {
    /// Create an unset register owned by `replica`.
    pub fn new(replica: impl Into<ReplicaId>) -> LwwRegister {
        return LwwRegister {
            replica: replica.into(),
            entry: None,
        };
    }

    /// The replica owning this instance.
    pub fn replica(&self) -> &ReplicaId {
        return &self.replica;
    }

    /// Write a value if `(score, timestamp)` dominates the current one.
    ///
    /// Returns whether the write took effect. Non-finite scores are
    /// rejected.
    pub fn set(&mut self, value: &[u8], score: f64, timestamp: u64) -> bool {
        if !score.is_finite() {
            tracing::warn!(replica = %self.replica, score, "rejecting non-finite register score");
            return false;
        }
        let candidate = LwwEntry {
            value: value.to_vec(),
            // Fold -0.0 into 0.0 so the two compare equal.
            score: score + 0.0,
            timestamp,
            source: self.replica.clone(),
        };
        return self.offer(candidate);
    }

    /// Write a value stamped with the current wall-clock time in milliseconds.
    pub fn set_now(&mut self, value: &[u8], score: f64) -> bool {
        let now = chrono::Utc::now().timestamp_millis().max(0) as u64;
        return self.set(value, score, now);
    }

    /// The current value, if any.
    pub fn get(&self) -> Option<&[u8]> {
        return self.entry.as_ref().map(|e| e.value.as_slice());
    }

    /// The full current entry, if any.
    pub fn entry(&self) -> Option<&LwwEntry> {
        return self.entry.as_ref();
    }

    /// The score of the current value.
    pub fn score(&self) -> Option<f64> {
        return self.entry.as_ref().map(|e| e.score);
    }

    /// The timestamp of the current value.
    pub fn timestamp(&self) -> Option<u64> {
        return self.entry.as_ref().map(|e| e.timestamp);
    }

    /// The replica that wrote the current value.
    pub fn source(&self) -> Option<&ReplicaId> {
        return self.entry.as_ref().map(|e| &e.source);
    }

    /// Check if the register has never been written.
    pub fn is_empty(&self) -> bool {
        return self.entry.is_none();
    }

    /// Snapshot the full state.
    pub fn export(&self) -> LwwState {
        return match &self.entry {
            Some(entry) => LwwState {
                replica_id: self.replica.clone(),
                value: Some(entry.value.clone()),
                score: entry.score,
                timestamp: entry.timestamp,
                source: Some(entry.source.clone()),
            },
            None => LwwState {
                replica_id: self.replica.clone(),
                value: None,
                score: 0.0,
                timestamp: 0,
                source: None,
            },
        };
    }

    /// Rebuild a register from its persisted form.
    pub fn import(state: LwwState) -> LwwRegister {
        let entry = match state.value {
            Some(value) if state.score.is_finite() => Some(LwwEntry {
                value,
                score: state.score,
                timestamp: state.timestamp,
                source: state.source.unwrap_or_else(|| state.replica_id.clone()),
            }),
            _ => None,
        };
        return LwwRegister {
            replica: state.replica_id,
            entry,
        };
    }

    /// Serialize the full state as JSON.
    pub fn to_json(&self) -> Result<String> {
        return Ok(serde_json::to_string(&self.export())?);
    }

    /// Parse a register from JSON.
    pub fn from_json(json: &str) -> Result<LwwRegister> {
        let state: LwwState = serde_json::from_str(json)?;
        return Ok(LwwRegister::import(state));
    }

    fn offer(&mut self, candidate: LwwEntry) -> bool {
        let wins = match &self.entry {
            Some(current) => candidate.rank(current) == Ordering::Greater,
            None => true,
        };
        if wins {
            self.entry = Some(candidate);
        }
        return wins;
    }
}

impl Crdt for LwwRegister {
    fn merge(&mut self, other: &Self) {
        if let Some(entry) = &other.entry {
            self.offer(entry.clone());
        }
    }
}

/// Two registers are equal when they hold the same entry.
impl PartialEq for LwwRegister {
    fn eq(&self, other: &Self) -> bool {
        return self.entry == other.entry;
    }
}
