//! Fluent builder for topology setup.
//!
//! Hides the boilerplate of creating a topology, installing its
//! policies, registering listeners and wiring up nodes, while keeping
//! node IDs under the caller's control.

use tracing::debug;

use crate::config::{MessagingConfig, ResolverConfig, SimulationConfig};
use crate::engine::{DeliveryOrder, MessageEngine};
use crate::error::SimResult;
use crate::event::{Listener, ListenerCategory};
use crate::geometry::Point;
use crate::link::Link;
use crate::node::{Behavior, Node, NodeId};
use crate::properties::PropertyValue;
use crate::resolver::LinkResolver;
use crate::scheduler::ClockListener;
use crate::topology::Topology;

/// Fluent builder for a [`Topology`].
///
/// Node defaults (ranges, wireless flag) are captured when a node is
/// declared, so set them before the nodes they should apply to.
///
/// # Example
/// ```rust
/// use topsim::builder::TopologyBuilder;
/// use topsim::message::Payload;
/// use topsim::node::{Beacon, Sink};
///
/// let topo = TopologyBuilder::new()
///     .communication_range(50.0)
///     .node_with(0, 0.0, 0.0, Beacon::new(Payload::text("hi"), 2))
///     .node_with(1, 30.0, 0.0, Sink::new())
///     .node_at(2, 500.0, 0.0)
///     .link(1, 2)
///     .run(10)
///     .unwrap();
///
/// assert_eq!(topo.link_count(), 2);
/// ```
pub struct TopologyBuilder {
    config: SimulationConfig,
    resolver: Option<Box<dyn LinkResolver>>,
    engine: Option<Box<dyn MessageEngine>>,
    nodes: Vec<(NodeId, Node)>,
    links: Vec<Link>,
    properties: Vec<(String, PropertyValue)>,
    listeners: Vec<(ListenerCategory, Box<dyn Listener>)>,
    clock_listeners: Vec<(u64, Box<dyn ClockListener>)>,
    start: bool,
}

impl TopologyBuilder {
    pub fn new() -> Self {
        Self::from_config(SimulationConfig::default())
    }

    /// Start from a loaded configuration.
    pub fn from_config(config: SimulationConfig) -> Self {
        TopologyBuilder {
            config,
            resolver: None,
            engine: None,
            nodes: Vec::new(),
            links: Vec::new(),
            properties: Vec::new(),
            listeners: Vec::new(),
            clock_listeners: Vec::new(),
            start: false,
        }
    }

    // ── Policies ──────────────────────────────────────────────

    /// Enable or disable wireless link derivation.
    pub fn wireless(mut self, enabled: bool) -> Self {
        self.config.wireless = enabled;
        self
    }

    pub fn euclidean(mut self) -> Self {
        self.config.resolver = ResolverConfig::Euclidean;
        self.resolver = None;
        self
    }

    /// Measure wireless distances on a `width × height` torus.
    pub fn toroidal(mut self, width: f64, height: f64) -> Self {
        self.config.resolver = ResolverConfig::Toroidal { width, height };
        self.resolver = None;
        self
    }

    /// Install a custom link resolver.
    pub fn resolver(mut self, resolver: impl LinkResolver + 'static) -> Self {
        self.resolver = Some(Box::new(resolver));
        self
    }

    pub fn sync_messaging(mut self) -> Self {
        self.config.messaging = MessagingConfig::Sync;
        self.engine = None;
        self
    }

    /// Delay messages by exponentially distributed whole rounds.
    pub fn async_messaging(mut self, mean_delay: f64, order: DeliveryOrder, seed: u64) -> Self {
        self.config.messaging = MessagingConfig::Async { mean_delay, order, seed };
        self.engine = None;
        self
    }

    /// Install a custom message engine.
    pub fn engine(mut self, engine: impl MessageEngine) -> Self {
        self.engine = Some(Box::new(engine));
        self
    }

    // ── Node defaults ─────────────────────────────────────────

    pub fn communication_range(mut self, range: f64) -> Self {
        self.config.node.communication_range = range;
        self
    }

    pub fn sensing_range(mut self, range: f64) -> Self {
        self.config.node.sensing_range = range;
        self
    }

    // ── Nodes and links ───────────────────────────────────────

    /// Register a fully configured node.
    pub fn node(mut self, id: u64, node: Node) -> Self {
        self.nodes.push((NodeId::new(id), node));
        self
    }

    /// Register a passive node at `(x, y)` with the current defaults.
    pub fn node_at(self, id: u64, x: f64, y: f64) -> Self {
        let node = self.config.node.node().with_location(Point::new(x, y));
        self.node(id, node)
    }

    /// Register a node at `(x, y)` driven by `behavior`.
    pub fn node_with(self, id: u64, x: f64, y: f64, behavior: impl Behavior) -> Self {
        let node = self
            .config
            .node
            .node()
            .with_location(Point::new(x, y))
            .with_behavior(behavior);
        self.node(id, node)
    }

    /// Add an undirected wired link.
    pub fn link(mut self, a: u64, b: u64) -> Self {
        self.links.push(Link::undirected(NodeId::new(a), NodeId::new(b)));
        self
    }

    /// Add a directed wired link.
    pub fn directed_link(mut self, source: u64, destination: u64) -> Self {
        self.links
            .push(Link::directed(NodeId::new(source), NodeId::new(destination)));
        self
    }

    /// Add an arbitrary link.
    pub fn custom_link(mut self, link: Link) -> Self {
        self.links.push(link);
        self
    }

    // ── Observers ─────────────────────────────────────────────

    pub fn property(mut self, key: &str, value: impl Into<PropertyValue>) -> Self {
        self.properties.push((key.to_string(), value.into()));
        self
    }

    /// Subscribe a listener before any node is added, so it sees every
    /// `NodeAdded`.
    pub fn listener(mut self, category: ListenerCategory, listener: impl Listener) -> Self {
        self.listeners.push((category, Box::new(listener)));
        self
    }

    /// Register a clock listener firing every `period` rounds.
    pub fn clock_listener(mut self, period: u64, listener: impl ClockListener) -> Self {
        self.clock_listeners.push((period, Box::new(listener)));
        self
    }

    /// Start the simulation once the topology is built.
    pub fn started(mut self) -> Self {
        self.start = true;
        self
    }

    // ── Build ─────────────────────────────────────────────────

    /// Build the topology.
    ///
    /// Policies are installed first, then properties and listeners, then
    /// nodes in declaration order, then links and clock listeners.
    pub fn build(self) -> SimResult<Topology> {
        let mut topology = Topology::new();
        self.config.apply(&mut topology)?;
        if let Some(resolver) = self.resolver {
            debug!(resolver = resolver.name(), "custom link resolver installed");
            topology.resolver = resolver;
        }
        if let Some(engine) = self.engine {
            debug!(engine = engine.name(), "custom message engine installed");
            topology.engine = engine;
        }

        for (key, value) in self.properties {
            topology.set_property(&key, value)?;
        }
        for (category, listener) in self.listeners {
            topology.subscribe_boxed(category, listener);
        }
        for (id, node) in self.nodes {
            topology.add_node_with_id(id, node)?;
        }
        for link in self.links {
            topology.add_link(link)?;
        }
        for (period, listener) in self.clock_listeners {
            topology.scheduler.add_listener(listener, period)?;
        }
        if self.start {
            topology.start()?;
        }

        debug!(
            nodes = topology.node_count(),
            links = topology.link_count(),
            "topology built"
        );
        Ok(topology)
    }

    /// Build, start, and run for `rounds` rounds.
    pub fn run(self, rounds: u64) -> SimResult<Topology> {
        let mut topology = self.started().build()?;
        topology.run(rounds)?;
        Ok(topology)
    }
}

impl Default for TopologyBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::engine::AsyncMessageEngine;
    use crate::error::SimError;
    use crate::event::{FnListener, TopologyEvent};
    use crate::link::{LinkMode, Orientation};
    use crate::message::Payload;
    use crate::node::{Beacon, Sink};
    use crate::scheduler::{FnClockListener, RunState};
    use crate::time::Round;

    #[test]
    fn test_builder_basic() {
        let topo = TopologyBuilder::new()
            .node_at(0, 0.0, 0.0)
            .node_at(1, 50.0, 0.0)
            .node_at(2, 500.0, 0.0)
            .build()
            .unwrap();

        assert_eq!(topo.node_count(), 3);
        assert_eq!(topo.run_state(), RunState::Stopped);
        // Default range 100: only 0 and 1 see each other.
        assert_eq!(topo.link_count(), 1);
        let id = topo.get_link(NodeId::new(0), NodeId::new(1), false).unwrap();
        let link = topo.link(id).unwrap();
        assert_eq!(link.mode, LinkMode::Wireless);
        assert_eq!(link.orientation, Orientation::Undirected);
    }

    #[test]
    fn test_builder_wired_links_without_wireless() {
        let topo = TopologyBuilder::new()
            .wireless(false)
            .node_at(0, 0.0, 0.0)
            .node_at(1, 1.0, 0.0)
            .node_at(2, 2.0, 0.0)
            .link(0, 1)
            .directed_link(2, 1)
            .build()
            .unwrap();

        assert!(!topo.is_wireless_enabled());
        assert_eq!(topo.link_count(), 2);
        assert!(topo.has_out_link(NodeId::new(1), NodeId::new(0)));
        assert!(topo.has_out_link(NodeId::new(2), NodeId::new(1)));
        assert!(!topo.has_out_link(NodeId::new(1), NodeId::new(2)));
    }

    #[test]
    fn test_builder_node_defaults_apply_in_order() {
        let topo = TopologyBuilder::new()
            .wireless(false)
            .node_at(0, 0.0, 0.0)
            .communication_range(20.0)
            .sensing_range(5.0)
            .node_at(1, 0.0, 0.0)
            .build()
            .unwrap();

        let n0 = topo.node(NodeId::new(0)).unwrap();
        let n1 = topo.node(NodeId::new(1)).unwrap();
        assert_eq!(n0.communication_range(), crate::node::DEFAULT_COMMUNICATION_RANGE);
        assert_eq!(n1.communication_range(), 20.0);
        assert_eq!(n1.sensing_range(), 5.0);
    }

    #[test]
    fn test_builder_from_config() {
        let config = SimulationConfig::from_toml_str(
            r#"
            [node]
            communication-range = 30.0

            [resolver]
            kind = "toroidal"
            width = 100.0
            height = 100.0

            [messaging]
            mode = "async"
            mean-delay = 1.5
            seed = 3
            "#,
        )
        .unwrap();

        let topo = TopologyBuilder::from_config(config)
            .node_at(0, 5.0, 50.0)
            .node_at(1, 95.0, 50.0)
            .build()
            .unwrap();

        assert_eq!(topo.link_resolver().name(), "toroidal");
        let engine = topo.message_engine_as::<AsyncMessageEngine>().unwrap();
        assert_eq!(engine.mean_delay(), 1.5);
        // 10 apart around the torus edge.
        assert!(topo.get_link(NodeId::new(0), NodeId::new(1), false).is_some());
    }

    #[test]
    fn test_builder_listener_sees_every_node() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let topo = TopologyBuilder::new()
            .wireless(false)
            .listener(
                ListenerCategory::Topology,
                FnListener(move |_round: Round, event: &TopologyEvent| {
                    sink.borrow_mut().push(event.node());
                    Ok(())
                }),
            )
            .node_at(4, 0.0, 0.0)
            .node_at(7, 0.0, 0.0)
            .build()
            .unwrap();

        assert_eq!(topo.node_count(), 2);
        assert_eq!(*seen.borrow(), vec![Some(NodeId::new(4)), Some(NodeId::new(7))]);
    }

    #[test]
    fn test_builder_properties_and_clock_listener() {
        let topo = TopologyBuilder::new()
            .property("label", "grid")
            .clock_listener(
                2,
                FnClockListener(|t: &mut Topology| {
                    let count = t.properties().get("ticks").and_then(|v| v.as_number()).unwrap_or(0.0);
                    t.set_property("ticks", PropertyValue::from(count + 1.0))?;
                    Ok(())
                }),
            )
            .run(6)
            .unwrap();

        assert_eq!(topo.properties().get("label").and_then(|v| v.as_text()), Some("grid"));
        assert_eq!(topo.properties().get("ticks").and_then(|v| v.as_number()), Some(3.0));
        assert_eq!(topo.time(), Round::new(6));
    }

    #[test]
    fn test_builder_run_delivers_beacons() {
        let topo = TopologyBuilder::new()
            .node_with(0, 0.0, 0.0, Beacon::new(Payload::text("ping"), 1))
            .node_with(1, 10.0, 0.0, Sink::new())
            .run(3)
            .unwrap();

        let sink = topo.behavior::<Sink>(NodeId::new(1)).unwrap();
        assert_eq!(sink.texts(), vec!["ping", "ping"]);
        assert_eq!(topo.run_state(), RunState::Running);
    }

    #[test]
    fn test_builder_errors() {
        let err = TopologyBuilder::new()
            .node_at(1, 0.0, 0.0)
            .node_at(1, 5.0, 0.0)
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, SimError::DuplicateNode(_)));

        let err = TopologyBuilder::new()
            .node_at(0, 0.0, 0.0)
            .link(0, 9)
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, SimError::EndpointMissing { .. }));

        let err = TopologyBuilder::new().toroidal(-1.0, 10.0).build().err().unwrap();
        assert!(matches!(err, SimError::InvalidConfig(_)));
    }
}
