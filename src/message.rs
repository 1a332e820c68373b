//! Messages exchanged between nodes.

use serde::{Deserialize, Serialize};

use crate::node::NodeId;
use crate::properties::PropertyValue;
use crate::time::Round;

// ── Payload ───────────────────────────────────────────────────────────

/// Content carried by a [`Message`].
///
/// `Text` exists for readable tests and examples, `Data` for real
/// protocol use, `Value` for sharing the same typed values behaviors
/// keep in property bags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Payload {
    Empty,
    Text(String),
    Data(Vec<u8>),
    Value(PropertyValue),
}

impl Payload {
    pub fn text(s: impl Into<String>) -> Self {
        Payload::Text(s.into())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Payload::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl std::fmt::Display for Payload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Payload::Empty => write!(f, "Empty"),
            Payload::Text(s) => {
                if s.chars().count() > 32 {
                    let head: String = s.chars().take(32).collect();
                    write!(f, "Text(\"{}…\")", head)
                } else {
                    write!(f, "Text({:?})", s)
                }
            }
            Payload::Data(d) => write!(f, "Data({} bytes)", d.len()),
            Payload::Value(v) => write!(f, "Value({})", v),
        }
    }
}

// ── Message ───────────────────────────────────────────────────────────

/// A message from one node to another, or to all of its neighbors.
///
/// Messages are created by `NodeContext::send*`, wait in the sender's
/// send-queue until the message engine drains it, and then sit in the
/// recipient's mailbox until behavior code consumes them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub(crate) sender: NodeId,
    pub(crate) destination: Option<NodeId>,
    pub(crate) payload: Payload,
    pub(crate) sent_at: Round,
    /// Keep retrying until a link to the destination exists.
    pub(crate) retry: bool,
}

impl Message {
    pub(crate) fn new(
        sender: NodeId,
        destination: Option<NodeId>,
        payload: Payload,
        sent_at: Round,
        retry: bool,
    ) -> Self {
        Message {
            sender,
            destination,
            payload,
            sent_at,
            retry,
        }
    }

    pub fn sender(&self) -> NodeId {
        self.sender
    }

    /// The addressee, or `None` for a broadcast.
    pub fn destination(&self) -> Option<NodeId> {
        self.destination
    }

    pub fn is_broadcast(&self) -> bool {
        self.destination.is_none()
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn into_payload(self) -> Payload {
        self.payload
    }

    /// The round during which the sender queued this message.
    pub fn sent_at(&self) -> Round {
        self.sent_at
    }

    pub fn is_retry(&self) -> bool {
        self.retry
    }
}

impl std::fmt::Display for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.destination {
            Some(to) => write!(f, "[{} {} → {}] {}", self.sent_at, self.sender, to, self.payload),
            None => write!(f, "[{} {} → *] {}", self.sent_at, self.sender, self.payload),
        }
    }
}
