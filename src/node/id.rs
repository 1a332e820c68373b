//! Node ID: assigned by the topology on insertion.

use serde::{Deserialize, Serialize};

/// A unique, stable identifier for a node in a [`Topology`](crate::Topology).
///
/// IDs are handed out in increasing order by `Topology::add_node` and are
/// never reused within one topology, so a stale `NodeId` can only ever
/// resolve to "not found".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(u64);

impl NodeId {
    #[inline]
    pub fn new(id: u64) -> Self {
        NodeId(id)
    }

    /// Return the underlying integer.
    #[inline]
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "N{}", self.0)
    }
}
