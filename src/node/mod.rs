//! Nodes: the autonomous agents of a simulation.
//!
//! A [`Node`] holds the state the topology needs (location, ranges,
//! mailbox, send-queue, properties). Algorithm code is attached to it as
//! a boxed [`Behavior`], and acts on the world only through the
//! [`NodeContext`] handed to each callback.
//!
//! # Module structure
//!
//! | Sub-module | Contents |
//! |---|---|
//! | [`id`] | [`NodeId`] newtype |
//! | [`state`] | [`Node`], [`NodeSnapshot`], [`Color`] |
//! | [`behavior`] | [`Behavior`] trait |
//! | [`context`] | [`NodeContext`] |
//! | [`builtin`] | [`Beacon`], [`Sink`], [`Echo`], [`RandomWalker`] |

pub mod behavior;
pub mod builtin;
pub mod context;
pub mod id;
pub mod state;

// Flat re-exports so external callers can use `topsim::node::NodeId` etc.
pub use behavior::Behavior;
pub use builtin::{Beacon, Echo, RandomWalker, Sink};
pub use context::NodeContext;
pub use id::NodeId;
pub use state::{Color, Node, NodeSnapshot, DEFAULT_COMMUNICATION_RANGE, DEFAULT_SENSING_RANGE};
