//! `Beacon`: broadcasts a payload every few rounds.

use crate::message::Payload;

use crate::node::behavior::Behavior;
use crate::node::context::NodeContext;

/// Broadcasts `payload` to all out-neighbors every `period` rounds,
/// starting with the first round after `on_start`.
#[derive(Debug, Clone)]
pub struct Beacon {
    payload: Payload,
    period: u64,
    countdown: u64,
    pub sent: u64,
}

impl Beacon {
    /// `period` is clamped to at least 1.
    pub fn new(payload: Payload, period: u64) -> Self {
        let period = period.max(1);
        Beacon {
            payload,
            period,
            countdown: 1,
            sent: 0,
        }
    }

    pub fn period(&self) -> u64 {
        self.period
    }
}

impl Behavior for Beacon {
    fn on_start(&mut self, _ctx: &mut NodeContext<'_>) -> anyhow::Result<()> {
        self.countdown = 1;
        Ok(())
    }

    fn on_clock(&mut self, ctx: &mut NodeContext<'_>) -> anyhow::Result<()> {
        ctx.clear_mailbox()?;
        self.countdown -= 1;
        if self.countdown == 0 {
            self.countdown = self.period;
            ctx.send_all(self.payload.clone())?;
            self.sent += 1;
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}
