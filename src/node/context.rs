//! `NodeContext`: the handle a behavior uses to act on the world.

use crate::error::{SimError, SimResult};
use crate::geometry::Point;
use crate::message::{Message, Payload};
use crate::properties::PropertyValue;
use crate::time::Round;
use crate::topology::Topology;

use super::id::NodeId;
use super::state::{Color, Node};

/// Mutable view of the topology, bound to one node.
///
/// A context is created by the topology for the duration of a single
/// behavior callback. Operations that can fail because the node has
/// been removed in the meantime (by its own behavior, or by a listener)
/// return [`SimError::NodeNotFound`].
pub struct NodeContext<'a> {
    topology: &'a mut Topology,
    id: NodeId,
}

impl<'a> NodeContext<'a> {
    pub(crate) fn new(topology: &'a mut Topology, id: NodeId) -> Self {
        NodeContext { topology, id }
    }

    /// The node this context is bound to.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// The current round.
    pub fn round(&self) -> Round {
        self.topology.time()
    }

    pub fn node(&self) -> SimResult<&Node> {
        self.topology.node(self.id).ok_or(SimError::NodeNotFound(self.id))
    }

    pub fn location(&self) -> SimResult<Point> {
        self.node().map(Node::location)
    }

    pub fn direction(&self) -> SimResult<f64> {
        self.node().map(Node::direction)
    }

    /// Out-neighbors of this node, as of the last link update.
    pub fn neighbors(&self) -> Vec<NodeId> {
        self.topology.neighbors(self.id)
    }

    /// Nodes currently within sensing range.
    pub fn sensed_nodes(&self) -> Vec<NodeId> {
        self.topology.sensed_nodes(self.id)
    }

    // ── Mailbox ───────────────────────────────────────────

    pub fn mailbox(&self) -> SimResult<&[Message]> {
        self.node().map(Node::mailbox)
    }

    /// Remove and return every message in the mailbox.
    pub fn take_mailbox(&mut self) -> SimResult<Vec<Message>> {
        let node = self.topology.node_mut(self.id)?;
        Ok(std::mem::take(&mut node.mailbox))
    }

    pub fn clear_mailbox(&mut self) -> SimResult<()> {
        self.topology.node_mut(self.id)?.mailbox.clear();
        Ok(())
    }

    // ── Messaging ─────────────────────────────────────────

    /// Queue a message for `destination`. It is dropped at delivery time
    /// if no link lets this node reach `destination`.
    pub fn send(&mut self, destination: NodeId, payload: Payload) -> SimResult<()> {
        self.enqueue(Some(destination), payload, false)
    }

    /// Queue a message for every node that is an out-neighbor at
    /// delivery time.
    pub fn send_all(&mut self, payload: Payload) -> SimResult<()> {
        self.enqueue(None, payload, false)
    }

    /// Like [`send`](Self::send), but the message waits in the queue
    /// until a link to `destination` exists instead of being dropped.
    pub fn send_retry(&mut self, destination: NodeId, payload: Payload) -> SimResult<()> {
        self.enqueue(Some(destination), payload, true)
    }

    fn enqueue(&mut self, destination: Option<NodeId>, payload: Payload, retry: bool) -> SimResult<()> {
        if let Some(dest) = destination {
            if !self.topology.contains_node(dest) {
                return Err(SimError::NodeNotFound(dest));
            }
        }
        let message = Message::new(self.id, destination, payload, self.round(), retry);
        self.topology.node_mut(self.id)?.send_queue.push_back(message);
        Ok(())
    }

    // ── Movement ──────────────────────────────────────────

    pub fn move_to(&mut self, location: Point) -> SimResult<()> {
        self.topology.move_node(self.id, location)
    }

    /// Move `distance` along the current direction.
    pub fn move_by(&mut self, distance: f64) -> SimResult<()> {
        let node = self.node()?;
        let target = node.location().translated(node.direction(), distance);
        self.move_to(target)
    }

    pub fn set_direction(&mut self, direction: f64) -> SimResult<()> {
        self.topology.set_direction(self.id, direction)
    }

    /// Turn to face `target`.
    pub fn set_direction_toward(&mut self, target: Point) -> SimResult<()> {
        let heading = self.location()?.heading_to(&target);
        self.set_direction(heading)
    }

    // ── Appearance & properties ───────────────────────────

    pub fn set_color(&mut self, color: Option<Color>) -> SimResult<()> {
        self.topology.set_node_color(self.id, color)
    }

    pub fn property(&self, key: &str) -> Option<&PropertyValue> {
        self.topology.node(self.id)?.properties().get(key)
    }

    /// Set a property on this node, notifying property listeners.
    pub fn set_property(&mut self, key: &str, value: impl Into<PropertyValue>) -> SimResult<()> {
        self.topology.set_node_property(self.id, key, value.into()).map(|_| ())
    }

    // ── Escape hatches ────────────────────────────────────

    pub fn topology(&self) -> &Topology {
        self.topology
    }

    /// Full mutable access to the topology. The node's own behavior is
    /// detached while its callback runs, so `Topology::behavior` returns
    /// `None` for [`id`](Self::id).
    pub fn topology_mut(&mut self) -> &mut Topology {
        self.topology
    }
}
