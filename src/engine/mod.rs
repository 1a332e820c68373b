//! Message engines: move messages from send-queues to mailboxes.
//!
//! The topology calls its engine once per round, at the start of the
//! delivery phase. An engine drains the send-queues through
//! [`Topology::drain_send_queues`], decides when and whether each message
//! reaches its recipient, and hands it over with [`Topology::deliver`].
//!
//! | Engine | Latency | Ordering |
//! |---|---|---|
//! | [`SyncMessageEngine`] | one round | enqueue order |
//! | [`AsyncMessageEngine`] | exponential, configurable mean | FIFO per link, or none |

use std::any::Any;

use serde::Serialize;

use crate::message::Message;
use crate::node::NodeId;
use crate::topology::Topology;

pub mod asynchronous;
pub mod sync;

pub use asynchronous::{AsyncMessageEngine, DeliveryOrder};
pub use sync::SyncMessageEngine;

/// Counters kept by every engine since construction or the last reset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeliveryStats {
    /// Messages placed in a mailbox (one per recipient for broadcasts).
    pub delivered: u64,
    /// Messages lost because no link reached the recipient.
    pub dropped: u64,
    /// Times a retry message was kept back for lack of a link.
    pub retried: u64,
}

/// What happened to one message in one delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    /// No link, sent with retry: kept for a later round.
    Retried,
    /// No link (or recipient gone): lost.
    Dropped,
}

impl DeliveryStats {
    pub fn record(&mut self, outcome: DeliveryOutcome) {
        match outcome {
            DeliveryOutcome::Delivered => self.delivered += 1,
            DeliveryOutcome::Retried => self.retried += 1,
            DeliveryOutcome::Dropped => self.dropped += 1,
        }
    }
}

/// A pluggable message-delivery policy.
pub trait MessageEngine: Any {
    /// Run one round of delivery against `topology`.
    fn process_messages(&mut self, topology: &mut Topology);

    /// Forget all in-flight messages and counters.
    fn reset(&mut self);

    fn stats(&self) -> DeliveryStats;

    /// Messages accepted from send-queues but not yet delivered.
    fn in_flight(&self) -> usize {
        0
    }

    fn name(&self) -> &'static str;

    fn as_any(&self) -> &dyn Any;
}

/// Try to hand `message` to `recipient` over a currently existing link.
///
/// Shared by both engines so that drop and retry accounting is identical.
pub(crate) fn attempt(topology: &mut Topology, message: &Message, recipient: NodeId) -> DeliveryOutcome {
    if topology.contains_node(recipient) && topology.has_out_link(message.sender(), recipient) {
        if topology.deliver(recipient, message.clone()) {
            return DeliveryOutcome::Delivered;
        }
    } else if message.is_retry()
        && topology.contains_node(recipient)
        && topology.contains_node(message.sender())
    {
        return DeliveryOutcome::Retried;
    }
    tracing::debug!(
        sender = %message.sender(),
        recipient = %recipient,
        round = %topology.time(),
        "no link to recipient, message dropped"
    );
    DeliveryOutcome::Dropped
}
