//! Links between nodes.
//!
//! A [`Link`] connects an ordered `(source, destination)` pair of nodes.
//! Links have their own identity ([`LinkId`]): the topology is a
//! multigraph, so several links may join the same pair. Endpoints are
//! referenced by [`NodeId`] and resolved through the topology.

use serde::{Deserialize, Serialize};

use crate::node::{Color, NodeId};
use crate::properties::Properties;

/// A unique identifier for a link, assigned by the topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LinkId(u64);

impl LinkId {
    #[inline]
    pub fn new(id: u64) -> Self {
        LinkId(id)
    }

    #[inline]
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for LinkId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "L{}", self.0)
    }
}

/// Whether a link can be traversed in one or both directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Orientation {
    Directed,
    Undirected,
}

/// How a link came to exist.
///
/// `Wired` links are created and removed explicitly. `Wireless` links
/// are derived every round by the link resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LinkMode {
    Wired,
    Wireless,
}

/// A link between two nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    pub(crate) source: NodeId,
    pub(crate) destination: NodeId,
    pub(crate) orientation: Orientation,
    pub(crate) mode: LinkMode,
    pub(crate) color: Option<Color>,
    pub(crate) width: u32,
    pub(crate) properties: Properties,
}

impl Link {
    /// A wired, undirected link between `a` and `b`.
    pub fn undirected(a: NodeId, b: NodeId) -> Self {
        Link::new(a, b, Orientation::Undirected, LinkMode::Wired)
    }

    /// A wired, directed link from `source` to `destination`.
    pub fn directed(source: NodeId, destination: NodeId) -> Self {
        Link::new(source, destination, Orientation::Directed, LinkMode::Wired)
    }

    pub fn new(source: NodeId, destination: NodeId, orientation: Orientation, mode: LinkMode) -> Self {
        Link {
            source,
            destination,
            orientation,
            mode,
            color: None,
            width: 1,
            properties: Properties::new(),
        }
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = Some(color);
        self
    }

    pub fn with_width(mut self, width: u32) -> Self {
        self.width = width;
        self
    }

    pub fn source(&self) -> NodeId {
        self.source
    }

    pub fn destination(&self) -> NodeId {
        self.destination
    }

    pub fn endpoints(&self) -> (NodeId, NodeId) {
        (self.source, self.destination)
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn mode(&self) -> LinkMode {
        self.mode
    }

    pub fn is_directed(&self) -> bool {
        self.orientation == Orientation::Directed
    }

    pub fn is_wireless(&self) -> bool {
        self.mode == LinkMode::Wireless
    }

    pub fn color(&self) -> Option<Color> {
        self.color
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    /// Whether `node` is one of the endpoints.
    pub fn touches(&self, node: NodeId) -> bool {
        self.source == node || self.destination == node
    }

    /// The endpoint opposite `node`, if `node` is an endpoint.
    pub fn other_end(&self, node: NodeId) -> Option<NodeId> {
        if self.source == node {
            Some(self.destination)
        } else if self.destination == node {
            Some(self.source)
        } else {
            None
        }
    }

    /// Whether a message may travel `from → to` over this link.
    pub fn allows(&self, from: NodeId, to: NodeId) -> bool {
        match self.orientation {
            Orientation::Directed => self.source == from && self.destination == to,
            Orientation::Undirected => {
                (self.source == from && self.destination == to)
                    || (self.source == to && self.destination == from)
            }
        }
    }

    /// Whether this link joins `a` and `b` in either order.
    pub fn joins(&self, a: NodeId, b: NodeId) -> bool {
        (self.source == a && self.destination == b) || (self.source == b && self.destination == a)
    }

    pub fn snapshot(&self, id: LinkId) -> LinkSnapshot {
        LinkSnapshot {
            id,
            source: self.source,
            destination: self.destination,
            orientation: self.orientation,
            mode: self.mode,
            color: self.color,
            width: self.width,
        }
    }
}

/// Plain-data view of a link, as read by serializers and trace tooling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkSnapshot {
    pub id: LinkId,
    pub source: NodeId,
    pub destination: NodeId,
    pub orientation: Orientation,
    pub mode: LinkMode,
    pub color: Option<Color>,
    pub width: u32,
}

impl LinkSnapshot {
    /// Rebuild a link (without identity) from a snapshot.
    pub fn to_link(&self) -> Link {
        let mut link = Link::new(self.source, self.destination, self.orientation, self.mode)
            .with_width(self.width);
        link.color = self.color;
        link
    }
}
