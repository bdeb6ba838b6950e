// created = "2026-10-17"
// modified = "2026-10-17"
// driver = "Isaac Clayton"

//! Observed-remove set of byte strings.
//!
//! Every `add` mints a fresh [`ReplicaTag`] for the value. A `remove`
//! tombstones only the tags this replica has observed for that value, so an
//! add made concurrently somewhere else (a tag the remover never saw)
//! survives the merge. A value is present iff at least one of its tags is
//! not tombstoned.
//!
//! Entries are bucketed by content hash. Within a bucket, entries are matched
//! by content, so two values whose digests collide stay distinct.
//!
//! Merge is the union of tagged entries and the union of tombstones, followed
//! by dropping every entry whose tag is tombstoned. Tombstones are kept
//! forever; nothing bounds their growth.

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;
use smallvec::SmallVec;

use crate::crdt::Crdt;
use crate::crdt::tag::ReplicaClock;
use crate::crdt::tag::ReplicaId;
use crate::crdt::tag::ReplicaTag;
use crate::error::Result;
use crate::hash::ContentHash;
use crate::hash::ContentHasher;
use crate::hash::Fnv1a;

/// One add: a value and the tag it was added under.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaggedValue {
    pub tag: ReplicaTag,
    pub value: Vec<u8>,
}

/// Entries sharing a content hash, sorted by tag.
type Bucket = SmallVec<[TaggedValue; 2]>;

/// Persisted form of an [`OrSet`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrSetState {
    pub replica_id: ReplicaId,
    pub counter: u64,
    pub elements: BTreeMap<ContentHash, Vec<TaggedValue>>,
    pub tombstones: Vec<ReplicaTag>,
}

/// An observed-remove set of byte strings.
#[derive(Clone, Debug)]
pub struct OrSet<H: ContentHasher = Fnv1a> {
    clock: ReplicaClock,
    elements: BTreeMap<ContentHash, Bucket>,
    tombstones: BTreeSet<ReplicaTag>,
    hasher: H,
}

impl OrSet<Fnv1a> {
    /// Create an empty set owned by `replica`.
    pub fn new(replica: impl Into<ReplicaId>) -> OrSet<Fnv1a> {
        return OrSet::with_hasher(replica, Fnv1a);
    }

    /// Rebuild a set from its persisted form.
    pub fn import(state: OrSetState) -> OrSet<Fnv1a> {
        return OrSet::import_with_hasher(state, Fnv1a);
    }

    /// Parse a set from JSON.
    pub fn from_json(json: &str) -> Result<OrSet<Fnv1a>> {
        let state: OrSetState = serde_json::from_str(json)?;
        return Ok(OrSet::import(state));
    }
}

impl<H: ContentHasher> OrSet<H> {
    /// Create an empty set with a specific content hasher.
    pub fn with_hasher(replica: impl Into<ReplicaId>, hasher: H) -> OrSet<H> {
        return OrSet {
            clock: ReplicaClock::new(replica),
            elements: BTreeMap::new(),
            tombstones: BTreeSet::new(),
            hasher,
        };
    }

    /// The replica owning this instance.
    pub fn replica(&self) -> &ReplicaId {
        return self.clock.replica();
    }

    /// Add a value under a fresh tag and return the tag.
    pub fn add(&mut self, value: &[u8]) -> ReplicaTag {
        let tag = self.clock.tick();
        let hash = self.hasher.digest(value);
        let bucket = self.elements.entry(hash).or_default();
        insert_sorted(bucket, TaggedValue { tag: tag.clone(), value: value.to_vec() });
        return tag;
    }

    /// Tombstone every tag this replica currently observes for `value`.
    /// Returns the number of tags removed.
    pub fn remove(&mut self, value: &[u8]) -> usize {
        let hash = self.hasher.digest(value);
        let Some(bucket) = self.elements.get_mut(&hash) else {
            return 0;
        };

        let mut removed = 0;
        bucket.retain(|entry| {
            if entry.value != value {
                return true;
            }
            self.tombstones.insert(entry.tag.clone());
            removed += 1;
            return false;
        });

        if bucket.is_empty() {
            self.elements.remove(&hash);
        }
        return removed;
    }

    /// Check whether a value has at least one live tag.
    pub fn contains(&self, value: &[u8]) -> bool {
        let hash = self.hasher.digest(value);
        return match self.elements.get(&hash) {
            Some(bucket) => bucket
                .iter()
                .any(|e| e.value == value && !self.tombstones.contains(&e.tag)),
            None => false,
        };
    }

    /// Live tags of a value.
    pub fn tags_of(&self, value: &[u8]) -> Vec<ReplicaTag> {
        let hash = self.hasher.digest(value);
        let Some(bucket) = self.elements.get(&hash) else {
            return Vec::new();
        };
        return bucket
            .iter()
            .filter(|e| e.value == value && !self.tombstones.contains(&e.tag))
            .map(|e| e.tag.clone())
            .collect();
    }

    /// Distinct live values, sorted by content.
    pub fn values(&self) -> Vec<Vec<u8>> {
        let mut distinct = BTreeSet::new();
        for bucket in self.elements.values() {
            for entry in bucket {
                if !self.tombstones.contains(&entry.tag) {
                    distinct.insert(entry.value.as_slice());
                }
            }
        }
        return distinct.into_iter().map(|v| v.to_vec()).collect();
    }

    /// Number of distinct live values.
    pub fn len(&self) -> usize {
        return self.values().len();
    }

    /// Check if no value is live.
    pub fn is_empty(&self) -> bool {
        return self.elements.values().all(|bucket| {
            bucket.iter().all(|e| self.tombstones.contains(&e.tag))
        });
    }

    /// Number of tombstoned tags held.
    pub fn tombstone_count(&self) -> usize {
        return self.tombstones.len();
    }

    /// Snapshot the full state.
    pub fn export(&self) -> OrSetState {
        return OrSetState {
            replica_id: self.clock.replica().clone(),
            counter: self.clock.counter(),
            elements: self
                .elements
                .iter()
                .map(|(hash, bucket)| (*hash, bucket.to_vec()))
                .collect(),
            tombstones: self.tombstones.iter().cloned().collect(),
        };
    }

    /// Rebuild a set from its persisted form, rehashing every value.
    pub fn import_with_hasher(state: OrSetState, hasher: H) -> OrSet<H> {
        let mut counter = state.counter;
        let mut set = OrSet {
            clock: ReplicaClock::new(state.replica_id),
            elements: BTreeMap::new(),
            tombstones: state.tombstones.into_iter().collect(),
            hasher,
        };

        for entry in state.elements.into_values().flatten() {
            if entry.tag.replica == *set.clock.replica() {
                counter = counter.max(entry.tag.counter);
            }
            set.insert_entry(entry);
        }
        for tag in &set.tombstones {
            if tag.replica == *set.clock.replica() {
                counter = counter.max(tag.counter);
            }
        }

        set.clock.observe(counter);
        return set;
    }

    /// Serialize the full state as JSON.
    pub fn to_json(&self) -> Result<String> {
        return Ok(serde_json::to_string(&self.export())?);
    }

    fn insert_entry(&mut self, entry: TaggedValue) {
        if self.tombstones.contains(&entry.tag) {
            return;
        }
        let hash = self.hasher.digest(&entry.value);
        let bucket = self.elements.entry(hash).or_default();
        if bucket.iter().any(|e| e.tag == entry.tag) {
            return;
        }
        insert_sorted(bucket, entry);
    }

    fn collect_garbage(&mut self) {
        let tombstones = &self.tombstones;
        self.elements.retain(|_, bucket| {
            bucket.retain(|e| !tombstones.contains(&e.tag));
            return !bucket.is_empty();
        });
    }
}

impl<H: ContentHasher> Crdt for OrSet<H> {
    fn merge(&mut self, other: &Self) {
        for bucket in other.elements.values() {
            for entry in bucket {
                self.insert_entry(entry.clone());
            }
        }
        for tag in &other.tombstones {
            if !self.tombstones.contains(tag) {
                self.tombstones.insert(tag.clone());
            }
        }
        self.collect_garbage();
    }
}

/// Two sets are equal when they hold the same replicated state, whichever
/// replica owns them.
impl<H: ContentHasher> PartialEq for OrSet<H> {
    fn eq(&self, other: &Self) -> bool {
        return self.elements == other.elements && self.tombstones == other.tombstones;
    }
}

fn insert_sorted(bucket: &mut Bucket, entry: TaggedValue) {
    let index = bucket.partition_point(|e| e.tag < entry.tag);
    bucket.insert(index, entry);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::ContentHash;

    /// A hasher that sends everything to one bucket.
    #[derive(Clone, Default)]
    struct Colliding;

    impl ContentHasher for Colliding {
        fn digest(&self, _bytes: &[u8]) -> ContentHash {
            return ContentHash(7);
        }
    }

    #[test]
    fn empty_set() {
        let set = OrSet::new("a");
        assert!(set.is_empty());
        assert_eq!(set.len(), 0);
        assert!(!set.contains(b"x"));
        assert!(set.values().is_empty());
    }

    #[test]
    fn add_and_contains() {
        let mut set = OrSet::new("a");
        let tag = set.add(b"x");
        assert_eq!(tag, ReplicaTag::new("a", 1));
        assert!(set.contains(b"x"));
        assert!(!set.contains(b"y"));
        assert_eq!(set.values(), vec![b"x".to_vec()]);
    }

    #[test]
    fn empty_value_is_a_value() {
        let mut set = OrSet::new("a");
        set.add(b"");
        assert!(set.contains(b""));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn duplicate_adds_get_distinct_tags() {
        let mut set = OrSet::new("a");
        set.add(b"x");
        set.add(b"x");
        assert_eq!(set.tags_of(b"x").len(), 2);
        assert_eq!(set.values().len(), 1);
    }

    #[test]
    fn remove_tombstones_all_observed_tags() {
        let mut set = OrSet::new("a");
        set.add(b"x");
        set.add(b"x");
        assert_eq!(set.remove(b"x"), 2);
        assert!(!set.contains(b"x"));
        assert_eq!(set.tombstone_count(), 2);
        assert_eq!(set.remove(b"x"), 0);
    }

    #[test]
    fn readd_after_remove() {
        let mut set = OrSet::new("a");
        set.add(b"x");
        set.remove(b"x");
        set.add(b"x");
        assert!(set.contains(b"x"));
    }

    #[test]
    fn colliding_values_stay_distinct() {
        let mut set = OrSet::with_hasher("a", Colliding);
        set.add(b"x");
        set.add(b"y");
        assert_eq!(set.len(), 2);
        set.remove(b"x");
        assert!(!set.contains(b"x"));
        assert!(set.contains(b"y"));
    }

    #[test]
    fn merge_unions_adds() {
        let mut a = OrSet::new("a");
        let mut b = OrSet::new("b");
        a.add(b"x");
        b.add(b"y");
        a.merge(&b);
        assert_eq!(a.values(), vec![b"x".to_vec(), b"y".to_vec()]);
    }

    #[test]
    fn merge_propagates_removes_of_observed_tags() {
        let mut a = OrSet::new("a");
        a.add(b"x");
        let mut b = OrSet::new("b");
        b.merge(&a);
        b.remove(b"x");
        a.merge(&b);
        assert!(!a.contains(b"x"));
    }

    #[test]
    fn unobserved_add_wins_over_concurrent_remove() {
        let mut r1 = OrSet::new("r1");
        let mut r2 = OrSet::new("r2");

        r1.add(b"x");
        r2.add(b"x");
        r2.remove(b"x");
        assert!(!r2.contains(b"x"));

        r2.merge(&r1);
        assert!(r2.contains(b"x"));
        assert_eq!(r2.tags_of(b"x"), vec![ReplicaTag::new("r1", 1)]);
    }

    #[test]
    fn merge_is_idempotent() {
        let mut a = OrSet::new("a");
        a.add(b"x");
        a.add(b"y");
        a.remove(b"y");
        let before = a.clone();
        let copy = a.clone();
        a.merge(&copy);
        assert_eq!(a, before);
    }

    #[test]
    fn export_import_preserves_state() {
        let mut a = OrSet::new("a");
        a.add(b"x");
        a.add(b"y");
        a.remove(b"y");

        let json = a.to_json().unwrap();
        let mut back = OrSet::from_json(&json).unwrap();
        assert_eq!(back, a);
        assert_eq!(back.export(), a.export());

        // The imported clock continues past existing tags.
        assert_eq!(back.add(b"z"), ReplicaTag::new("a", 3));
    }

    #[test]
    fn export_uses_wire_field_names() {
        let mut a = OrSet::new("a");
        a.add(b"x");
        let json: serde_json::Value = serde_json::from_str(&a.to_json().unwrap()).unwrap();
        assert_eq!(json["replicaId"], "a");
        assert_eq!(json["counter"], 1);
        let hash = crate::hash::fnv1a(b"x");
        let key = format!("{:08x}", hash);
        assert_eq!(json["elements"][key.as_str()][0]["tag"], "a:1");
        assert!(json["tombstones"].as_array().unwrap().is_empty());
    }

    #[test]
    fn from_json_rejects_malformed_input() {
        assert!(OrSet::from_json("{").is_err());
        assert!(OrSet::from_json("{\"replicaId\": 3}").is_err());
    }
}
