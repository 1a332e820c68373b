//! `Sink`: records all received messages for test assertions.

use crate::message::{Message, Payload};
use crate::time::Round;

use crate::node::behavior::Behavior;
use crate::node::context::NodeContext;
use crate::node::id::NodeId;

/// A behavior that records every message it receives.
///
/// Messages are moved into `received`, so the mailbox stays empty.
/// `Sink` never sends anything. This makes it the usual receiving end in
/// tests that check delivery counts, ordering and payloads.
#[derive(Debug, Clone, Default)]
pub struct Sink {
    /// All messages received, in delivery order: `(round, sender, payload)`.
    pub received: Vec<(Round, NodeId, Payload)>,
}

impl Sink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Payload texts in delivery order, skipping non-text payloads.
    pub fn texts(&self) -> Vec<&str> {
        self.received.iter().filter_map(|(_, _, p)| p.as_text()).collect()
    }
}

impl Behavior for Sink {
    fn on_message(&mut self, ctx: &mut NodeContext<'_>, message: &Message) -> anyhow::Result<()> {
        self.received
            .push((ctx.round(), message.sender(), message.payload().clone()));
        ctx.clear_mailbox()?;
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}
