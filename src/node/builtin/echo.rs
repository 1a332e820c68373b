//! `Echo`: replies to every received message.

use crate::message::Message;

use crate::node::behavior::Behavior;
use crate::node::context::NodeContext;

/// A behavior that sends every message back to its sender.
///
/// Replies use `send_retry`, so an echo is never lost just because the
/// reverse link does not exist yet (asymmetric wireless ranges). The
/// mailbox is cleared after each reply.
#[derive(Debug, Clone, Default)]
pub struct Echo {
    pub echo_count: u64,
}

impl Echo {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Behavior for Echo {
    fn on_message(&mut self, ctx: &mut NodeContext<'_>, message: &Message) -> anyhow::Result<()> {
        if ctx.topology().contains_node(message.sender()) {
            ctx.send_retry(message.sender(), message.payload().clone())?;
            self.echo_count += 1;
        }
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
