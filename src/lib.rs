//! # topsim: round-based topology simulation
//!
//! A deterministic simulator for distributed and mobile-network
//! algorithms. Nodes live at points in space, carry user-defined
//! behaviors, exchange messages over wired or range-derived wireless
//! links, and advance in lock-step rounds. No threads, no wall-clock
//! time: a run is reproducible from its setup and seeds.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                  Topology                    │ ← nodes, links, listeners
//! │  ┌──────────────┐   ┌─────────────────────┐  │
//! │  │  Scheduler   │   │    LinkResolver     │  │ ← wireless links
//! │  │  rounds,     │   │  euclidean/toroidal │  │
//! │  │  clock lstn. │   └─────────────────────┘  │
//! │  └──────────────┘   ┌─────────────────────┐  │
//! │  ┌──────────────┐   │   MessageEngine     │  │ ← send-queues → mailboxes
//! │  │  Node        │   │   sync / async      │  │
//! │  │  + Behavior  │   └─────────────────────┘  │
//! │  └──────────────┘                            │
//! └──────────────────────────────────────────────┘
//!           │ TopologyEvent
//!           ▼
//!   Listeners, TraceRecorder
//! ```
//!
//! ## Quick start
//!
//! ```rust
//! use topsim::{Node, Topology};
//! use topsim::message::Payload;
//! use topsim::node::{Beacon, Sink};
//!
//! let mut topo = Topology::new();
//! let a = topo.add_node(Node::at(0.0, 0.0).with_behavior(Beacon::new(Payload::text("hi"), 1))).unwrap();
//! let b = topo.add_node(Node::at(40.0, 0.0).with_behavior(Sink::new())).unwrap();
//! assert!(topo.has_out_link(a, b));
//!
//! topo.start().unwrap();
//! topo.run(5).unwrap();
//! assert_eq!(topo.behavior::<Sink>(b).unwrap().received.len(), 4);
//! ```

pub mod builder;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod geometry;
pub mod link;
pub mod message;
pub mod node;
pub mod properties;
pub mod resolver;
pub mod scheduler;
pub mod time;
pub mod topology;
pub mod trace;

// Re-exports for convenience.
pub use builder::TopologyBuilder;
pub use config::SimulationConfig;
pub use engine::{AsyncMessageEngine, DeliveryOrder, DeliveryStats, MessageEngine, SyncMessageEngine};
pub use error::{SimError, SimResult};
pub use event::{FnListener, Listener, ListenerCategory, ListenerId, TopologyEvent};
pub use geometry::Point;
pub use link::{Link, LinkId, LinkMode, Orientation};
pub use message::{Message, Payload};
pub use node::{Behavior, Node, NodeContext, NodeId};
pub use properties::{PropertyOwner, PropertyValue};
pub use resolver::{EuclideanResolver, LinkResolver, ToroidalResolver};
pub use scheduler::{ClockListener, FnClockListener, Phase, RunState};
pub use time::Round;
pub use topology::Topology;
pub use trace::{Trace, TraceRecorder};
