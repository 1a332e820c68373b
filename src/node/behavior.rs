//! `Behavior` trait: the algorithm code attached to a node.

use std::any::Any;

use crate::message::Message;

use super::context::NodeContext;
use super::id::NodeId;

/// Trait implemented by every node algorithm.
///
/// All callbacks default to doing nothing, so a behavior only overrides
/// the hooks it cares about. Every callback receives a [`NodeContext`]
/// bound to the node it drives; all side effects (sending, moving,
/// property changes) go through it so that the topology can keep its
/// listeners informed.
///
/// Callbacks return `anyhow::Result` so behavior code can use `?` on
/// anything. An error aborts the current round and is returned from
/// `Topology::tick` wrapped in [`SimError::Behavior`](crate::SimError).
///
/// # Example
///
/// ```rust
/// use topsim::node::{Behavior, NodeContext};
/// use topsim::message::{Message, Payload};
///
/// #[derive(Default)]
/// struct Counter { received: u32 }
///
/// impl Behavior for Counter {
///     fn on_clock(&mut self, ctx: &mut NodeContext<'_>) -> anyhow::Result<()> {
///         ctx.send_all(Payload::text("tick"))?;
///         Ok(())
///     }
///     fn on_message(&mut self, _ctx: &mut NodeContext<'_>, _msg: &Message) -> anyhow::Result<()> {
///         self.received += 1;
///         Ok(())
///     }
///     fn as_any(&self) -> &dyn std::any::Any { self }
///     fn as_any_mut(&mut self) -> &mut dyn std::any::Any { self }
/// }
/// ```
pub trait Behavior: Any {
    /// Called once, right after the node has been added to a topology.
    fn on_init(&mut self, _ctx: &mut NodeContext<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called when the simulation starts or restarts, and on insertion
    /// into an already running topology.
    fn on_start(&mut self, _ctx: &mut NodeContext<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_pre_clock(&mut self, _ctx: &mut NodeContext<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_clock(&mut self, _ctx: &mut NodeContext<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_post_clock(&mut self, _ctx: &mut NodeContext<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called once per message delivered to this node, in delivery order.
    /// The message is already in the mailbox when this runs.
    fn on_message(&mut self, _ctx: &mut NodeContext<'_>, _message: &Message) -> anyhow::Result<()> {
        Ok(())
    }

    /// `other` entered this node's sensing range.
    fn on_sensing_in(&mut self, _ctx: &mut NodeContext<'_>, _other: NodeId) -> anyhow::Result<()> {
        Ok(())
    }

    /// `other` left this node's sensing range.
    fn on_sensing_out(&mut self, _ctx: &mut NodeContext<'_>, _other: NodeId) -> anyhow::Result<()> {
        Ok(())
    }

    /// The node was selected through `Topology::select_node`.
    fn on_selection(&mut self, _ctx: &mut NodeContext<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Downcast support, required for `Topology::behavior::<T>()`.
    fn as_any(&self) -> &dyn Any;
    /// Mutable downcast support.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}
