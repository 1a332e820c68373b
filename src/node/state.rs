//! `Node`: the per-agent state owned by the topology.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::geometry::Point;
use crate::message::Message;
use crate::properties::Properties;

use super::behavior::Behavior;
use super::id::NodeId;

/// Communication range given to nodes that do not set one.
pub const DEFAULT_COMMUNICATION_RANGE: f64 = 100.0;

/// Sensing range given to nodes that do not set one (sensing disabled).
pub const DEFAULT_SENSING_RANGE: f64 = 0.0;

// ── Color ─────────────────────────────────────────────────────────────

/// An RGB display color. Purely visual; the core never reads it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const RED: Color = Color::rgb(220, 50, 47);
    pub const GREEN: Color = Color::rgb(133, 153, 0);
    pub const BLUE: Color = Color::rgb(38, 139, 210);
    pub const ORANGE: Color = Color::rgb(203, 75, 22);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Color { r, g, b }
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

// ── Node ──────────────────────────────────────────────────────────────

/// A simulated node.
///
/// A `Node` is built detached (builder style), then handed to
/// `Topology::add_node`, which assigns its [`NodeId`] and takes
/// ownership. Once inside a topology, every state change that other
/// parties may observe (movement, properties, color) goes through the
/// topology or a [`NodeContext`](super::NodeContext) so that listeners
/// are notified.
pub struct Node {
    pub(crate) location: Point,
    pub(crate) direction: f64,
    pub(crate) communication_range: f64,
    pub(crate) sensing_range: f64,
    pub(crate) wireless_enabled: bool,
    pub(crate) color: Option<Color>,
    pub(crate) icon_size: u32,
    pub(crate) properties: Properties,
    /// Messages delivered to this node and not yet consumed.
    pub(crate) mailbox: Vec<Message>,
    /// Outgoing messages waiting for the message engine.
    pub(crate) send_queue: VecDeque<Message>,
    pub(crate) behavior: Option<Box<dyn Behavior>>,
}

impl Node {
    /// A passive node at the origin with default ranges.
    pub fn new() -> Self {
        Node {
            location: Point::ORIGIN,
            direction: 0.0,
            communication_range: DEFAULT_COMMUNICATION_RANGE,
            sensing_range: DEFAULT_SENSING_RANGE,
            wireless_enabled: true,
            color: None,
            icon_size: 8,
            properties: Properties::new(),
            mailbox: Vec::new(),
            send_queue: VecDeque::new(),
            behavior: None,
        }
    }

    /// A passive node at `(x, y)`.
    pub fn at(x: f64, y: f64) -> Self {
        Node::new().with_location(Point::new(x, y))
    }

    // ── Builder ───────────────────────────────────────────

    pub fn with_location(mut self, location: Point) -> Self {
        self.location = location;
        self
    }

    pub fn with_direction(mut self, direction: f64) -> Self {
        self.direction = direction;
        self
    }

    pub fn with_communication_range(mut self, range: f64) -> Self {
        self.communication_range = range;
        self
    }

    pub fn with_sensing_range(mut self, range: f64) -> Self {
        self.sensing_range = range;
        self
    }

    pub fn with_wireless(mut self, enabled: bool) -> Self {
        self.wireless_enabled = enabled;
        self
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = Some(color);
        self
    }

    pub fn with_icon_size(mut self, size: u32) -> Self {
        self.icon_size = size;
        self
    }

    /// Attach the behavior that drives this node.
    pub fn with_behavior(mut self, behavior: impl Behavior) -> Self {
        self.behavior = Some(Box::new(behavior));
        self
    }

    pub fn with_boxed_behavior(mut self, behavior: Box<dyn Behavior>) -> Self {
        self.behavior = Some(behavior);
        self
    }

    // ── Accessors ─────────────────────────────────────────

    pub fn location(&self) -> Point {
        self.location
    }

    /// Heading in radians on the XY plane.
    pub fn direction(&self) -> f64 {
        self.direction
    }

    pub fn communication_range(&self) -> f64 {
        self.communication_range
    }

    pub fn sensing_range(&self) -> f64 {
        self.sensing_range
    }

    pub fn is_wireless_enabled(&self) -> bool {
        self.wireless_enabled
    }

    pub fn color(&self) -> Option<Color> {
        self.color
    }

    pub fn icon_size(&self) -> u32 {
        self.icon_size
    }

    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    /// Messages delivered and not yet consumed, oldest first.
    pub fn mailbox(&self) -> &[Message] {
        &self.mailbox
    }

    /// Messages waiting for the next delivery phase, oldest first.
    pub fn send_queue(&self) -> impl Iterator<Item = &Message> {
        self.send_queue.iter()
    }

    pub fn has_behavior(&self) -> bool {
        self.behavior.is_some()
    }

    /// Euclidean distance to another node.
    pub fn distance(&self, other: &Node) -> f64 {
        self.location.distance(&other.location)
    }

    /// Capture the serializable part of this node's state.
    pub fn snapshot(&self, id: NodeId) -> NodeSnapshot {
        NodeSnapshot {
            id,
            location: self.location,
            direction: self.direction,
            communication_range: self.communication_range,
            sensing_range: self.sensing_range,
            wireless_enabled: self.wireless_enabled,
            color: self.color,
            icon_size: self.icon_size,
        }
    }

    /// Rebuild a passive node from a snapshot.
    pub fn from_snapshot(snapshot: &NodeSnapshot) -> Self {
        let mut node = Node::new()
            .with_location(snapshot.location)
            .with_direction(snapshot.direction)
            .with_communication_range(snapshot.communication_range)
            .with_sensing_range(snapshot.sensing_range)
            .with_wireless(snapshot.wireless_enabled)
            .with_icon_size(snapshot.icon_size);
        node.color = snapshot.color;
        node
    }
}

impl Default for Node {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("location", &self.location)
            .field("communication_range", &self.communication_range)
            .field("sensing_range", &self.sensing_range)
            .field("wireless_enabled", &self.wireless_enabled)
            .field("mailbox", &self.mailbox.len())
            .field("send_queue", &self.send_queue.len())
            .field("has_behavior", &self.behavior.is_some())
            .finish()
    }
}

/// Plain-data view of a node, as read by serializers and trace tooling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSnapshot {
    pub id: NodeId,
    pub location: Point,
    pub direction: f64,
    pub communication_range: f64,
    pub sensing_range: f64,
    pub wireless_enabled: bool,
    pub color: Option<Color>,
    pub icon_size: u32,
}
