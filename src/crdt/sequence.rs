// created = "2026-10-17"
// modified = "2026-10-17"
// driver = "Isaac Clayton"

//! Replicated Growable Array (RGA) over bytes.
//!
//! Every byte is a node `{ id, byte, after_id, removed }`. A node is inserted
//! after an existing node (or after the ROOT sentinel), so the nodes form a
//! tree rooted at ROOT. The logical sequence is the depth-first walk of that
//! tree, with siblings ordered by descending id, filtered to nodes that are
//! not removed.
//!
//! Key properties:
//!
//! 1. **Order-free merge**: the tree shape depends only on which nodes exist,
//!    never on the order they arrived in, so every replica that has seen the
//!    same nodes walks them in the same order.
//!
//! 2. **Sticky tombstones**: removal only flips `removed` to true. Merge
//!    propagates that direction and never the other.
//!
//! 3. **Fixed tie-break**: concurrent inserts after the same anchor are
//!    ordered by descending id, replica first and then counter. A local
//!    insert lands directly after its anchor unless the anchor already has
//!    children from a replica with a larger id, which stay in front of it.
//!
//! Complexity: position lookups walk the tree, O(n). Merging a node is a
//! hash lookup plus a sorted insert among its siblings.

use rustc_hash::FxHashMap;
use rustc_hash::FxHashSet;
use serde::Deserialize;
use serde::Serialize;
use smallvec::SmallVec;

use crate::crdt::Crdt;
use crate::crdt::tag::ReplicaClock;
use crate::crdt::tag::ReplicaId;
use crate::crdt::tag::ReplicaTag;
use crate::error::Result;

/// Wire name of the sentinel every sequence is anchored to.
pub const ROOT: &str = "ROOT";

/// One byte of the sequence.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: ReplicaTag,
    pub byte: u8,
    /// The node this one was inserted after; `None` is ROOT.
    #[serde(with = "anchor")]
    pub after_id: Option<ReplicaTag>,
    pub removed: bool,
}

/// Persisted form of a [`Sequence`]. Nodes are listed in document order,
/// tombstones included.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SequenceState {
    pub replica_id: ReplicaId,
    pub counter: u64,
    pub nodes: Vec<Node>,
}

/// Sibling ids, sorted descending.
type Siblings = SmallVec<[ReplicaTag; 2]>;

/// A replicated byte sequence.
#[derive(Clone, Debug)]
pub struct Sequence {
    clock: ReplicaClock,
    nodes: FxHashMap<ReplicaTag, Node>,
    /// Children of ROOT.
    roots: Siblings,
    /// Children of every other node that has any.
    children: FxHashMap<ReplicaTag, Siblings>,
    /// Number of nodes not removed.
    live: usize,
}

impl Sequence {
    /// Create an empty sequence owned by `replica`.
    pub fn new(replica: impl Into<ReplicaId>) -> Sequence {
        return Sequence {
            clock: ReplicaClock::new(replica),
            nodes: FxHashMap::default(),
            roots: SmallVec::new(),
            children: FxHashMap::default(),
            live: 0,
        };
    }

    /// The replica owning this instance.
    pub fn replica(&self) -> &ReplicaId {
        return self.clock.replica();
    }

    /// Number of visible bytes.
    pub fn len(&self) -> usize {
        return self.live;
    }

    /// Check if no byte is visible.
    pub fn is_empty(&self) -> bool {
        return self.live == 0;
    }

    /// Number of nodes, tombstones included.
    pub fn node_count(&self) -> usize {
        return self.nodes.len();
    }

    /// Check whether a node id is known, removed or not.
    pub fn contains_id(&self, id: &ReplicaTag) -> bool {
        return self.nodes.contains_key(id);
    }

    /// Insert a byte after the visible byte at `position - 1`.
    ///
    /// Positions past the end append. Existing siblings with a larger id
    /// keep their place ahead of the new byte, so it can land later than
    /// `position` after a merge.
    pub fn insert(&mut self, position: usize, byte: u8) -> ReplicaTag {
        let after_id = match position.min(self.live) {
            0 => None,
            clamped => self.live_at(clamped - 1).map(|n| n.id.clone()),
        };
        let id = self.clock.tick();
        self.integrate(Node {
            id: id.clone(),
            byte,
            after_id,
            removed: false,
        });
        return id;
    }

    /// Append a byte at the end.
    pub fn append(&mut self, byte: u8) -> ReplicaTag {
        return self.insert(self.live, byte);
    }

    /// Append every byte of a slice.
    pub fn extend(&mut self, bytes: &[u8]) {
        let mut after_id = self.live_at(self.live.wrapping_sub(1)).map(|n| n.id.clone());
        for byte in bytes {
            let id = self.clock.tick();
            self.integrate(Node {
                id: id.clone(),
                byte: *byte,
                after_id,
                removed: false,
            });
            after_id = Some(id);
        }
    }

    /// Tombstone the byte at `position`. Out-of-range positions are ignored.
    /// Returns whether a byte was removed.
    pub fn remove(&mut self, position: usize) -> bool {
        let Some(id) = self.live_at(position).map(|n| n.id.clone()) else {
            return false;
        };
        return self.tombstone(&id);
    }

    /// The visible byte at `position`.
    pub fn get(&self, position: usize) -> Option<u8> {
        return self.live_at(position).map(|n| n.byte);
    }

    /// The visible bytes, in order.
    pub fn to_bytes(&self) -> Vec<u8> {
        return self.walk().filter(|n| !n.removed).map(|n| n.byte).collect();
    }

    /// Snapshot the full state.
    pub fn export(&self) -> SequenceState {
        return SequenceState {
            replica_id: self.clock.replica().clone(),
            counter: self.clock.counter(),
            nodes: self.walk().cloned().collect(),
        };
    }

    /// Rebuild a sequence from its persisted form.
    ///
    /// Nodes may be listed in any order. Nodes whose anchor chain does not
    /// reach ROOT are dropped.
    pub fn import(state: SequenceState) -> Sequence {
        let mut seq = Sequence::new(state.replica_id);
        seq.clock.observe(state.counter);
        for node in state.nodes {
            seq.apply_remote(&node);
        }
        seq.prune_unreachable();
        return seq;
    }

    /// Serialize the full state as JSON.
    pub fn to_json(&self) -> Result<String> {
        return Ok(serde_json::to_string(&self.export())?);
    }

    /// Parse a sequence from JSON.
    pub fn from_json(json: &str) -> Result<Sequence> {
        let state: SequenceState = serde_json::from_str(json)?;
        return Ok(Sequence::import(state));
    }

    /// Walk every node in document order, tombstones included.
    fn walk(&self) -> Walk<'_> {
        let mut stack = Vec::with_capacity(self.roots.len());
        stack.extend(self.roots.iter().rev());
        return Walk { seq: self, stack };
    }

    /// The visible node at `position`.
    fn live_at(&self, position: usize) -> Option<&Node> {
        if position >= self.live {
            return None;
        }
        return self.walk().filter(|n| !n.removed).nth(position);
    }

    /// Add a node that is not yet known, placing it among its siblings.
    fn integrate(&mut self, node: Node) {
        let siblings = match &node.after_id {
            Some(after) => self.children.entry(after.clone()).or_default(),
            None => &mut self.roots,
        };
        // Descending: skip every sibling with a larger id.
        let index = siblings.partition_point(|s| *s > node.id);
        siblings.insert(index, node.id.clone());

        self.clock.observe(node.id.counter);
        if !node.removed {
            self.live += 1;
        }
        self.nodes.insert(node.id.clone(), node);
    }

    fn tombstone(&mut self, id: &ReplicaTag) -> bool {
        let Some(node) = self.nodes.get_mut(id) else {
            return false;
        };
        if node.removed {
            return false;
        }
        node.removed = true;
        self.live -= 1;
        return true;
    }

    fn apply_remote(&mut self, node: &Node) {
        if self.nodes.contains_key(&node.id) {
            if node.removed {
                self.tombstone(&node.id);
            }
            return;
        }
        self.integrate(node.clone());
    }

    /// Drop nodes that the walk from ROOT never reaches.
    fn prune_unreachable(&mut self) {
        let reachable: FxHashSet<ReplicaTag> = self.walk().map(|n| n.id.clone()).collect();
        if reachable.len() == self.nodes.len() {
            return;
        }
        tracing::warn!(
            replica = %self.clock.replica(),
            dropped = self.nodes.len() - reachable.len(),
            "dropping sequence nodes with no path to ROOT"
        );
        self.nodes.retain(|id, _| reachable.contains(id));
        self.children.retain(|id, _| reachable.contains(id));
        self.live = self.nodes.values().filter(|n| !n.removed).count();
    }
}

impl Crdt for Sequence {
    fn merge(&mut self, other: &Self) {
        // Parents come before children in document order.
        for node in other.walk() {
            self.apply_remote(node);
        }
    }
}

/// Two sequences are equal when they hold the same nodes.
impl PartialEq for Sequence {
    fn eq(&self, other: &Self) -> bool {
        return self.nodes == other.nodes;
    }
}

/// Depth-first, pre-order walk over the node tree.
struct Walk<'a> {
    seq: &'a Sequence,
    stack: Vec<&'a ReplicaTag>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<&'a Node> {
        while let Some(id) = self.stack.pop() {
            let Some(node) = self.seq.nodes.get(id) else {
                continue;
            };
            if let Some(children) = self.seq.children.get(id) {
                self.stack.extend(children.iter().rev());
            }
            return Some(node);
        }
        return None;
    }
}

mod anchor {
    use serde::Deserialize;
    use serde::Deserializer;
    use serde::Serializer;

    use super::ROOT;
    use crate::crdt::tag::ReplicaTag;

    pub fn serialize<S: Serializer>(after: &Option<ReplicaTag>, serializer: S) -> Result<S::Ok, S::Error> {
        return match after {
            Some(tag) => serializer.collect_str(tag),
            None => serializer.serialize_str(ROOT),
        };
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<ReplicaTag>, D::Error> {
        let s = String::deserialize(deserializer)?;
        if s == ROOT {
            return Ok(None);
        }
        return s.parse().map(Some).map_err(serde::de::Error::custom);
    }
}
