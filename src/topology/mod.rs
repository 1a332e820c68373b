//! `Topology`: owns nodes, links, policies and listeners.
//!
//! The topology is the single owner of all simulation state. Nodes and
//! links live in ID-keyed arenas; links refer to their endpoints by
//! [`NodeId`] and a per-node incidence index makes neighborhood queries
//! cheap. Every mutation that others may observe emits a
//! [`TopologyEvent`] to the listeners of its category before returning.
//!
//! # Module structure
//!
//! | Sub-module | Contents |
//! |---|---|
//! | (this) | arenas, mutation, queries, properties, listeners, callback dispatch |
//! | [`wireless`] | wireless-link reconciliation and sensing |
//! | `scheduler` | round loop (`tick`, `run`, `start`, ...) |
//!
//! A `Topology` is single-threaded and not reentrant: callbacks receive
//! `&mut Topology` (through [`NodeContext`]) and may mutate it, but must
//! not call [`tick`](Topology::tick).

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, trace};

use crate::engine::{MessageEngine, SyncMessageEngine};
use crate::error::{SimError, SimResult};
use crate::event::{Listener, ListenerCategory, ListenerId, ListenerRegistry, TopologyEvent};
use crate::geometry::Point;
use crate::link::{Link, LinkId, LinkMode};
use crate::message::Message;
use crate::node::{Behavior, Color, Node, NodeContext, NodeId};
use crate::properties::{Properties, PropertyOwner, PropertyValue};
use crate::resolver::{EuclideanResolver, LinkResolver};
use crate::scheduler::{Phase, Scheduler};

pub mod wireless;


/// The simulated world.
pub struct Topology {
    pub(crate) nodes: BTreeMap<NodeId, Node>,
    /// Node IDs in registration order.
    pub(crate) order: Vec<NodeId>,
    next_node_id: u64,
    pub(crate) links: BTreeMap<LinkId, Link>,
    next_link_id: u64,
    /// Links touching each node, keyed by node.
    incident: BTreeMap<NodeId, BTreeSet<LinkId>>,
    /// The wireless link (if any) joining each unordered pair `(lo, hi)`.
    pub(crate) wireless: BTreeMap<(NodeId, NodeId), LinkId>,
    pub(crate) resolver: Box<dyn LinkResolver>,
    pub(crate) engine: Box<dyn MessageEngine>,
    pub(crate) scheduler: Scheduler,
    listeners: ListenerRegistry,
    properties: Properties,
    pub(crate) wireless_enabled: bool,
    /// `(observer, observed)` pairs within sensing range.
    pub(crate) sensed: BTreeSet<(NodeId, NodeId)>,
    selected: Option<NodeId>,
    /// Messages delivered during the current delivery phase, awaiting
    /// `on_message` dispatch.
    pub(crate) delivered: Vec<(NodeId, Message)>,
}

impl Topology {
    /// An empty topology with the Euclidean resolver, the synchronous
    /// message engine and wireless links enabled.
    pub fn new() -> Self {
        Topology {
            nodes: BTreeMap::new(),
            order: Vec::new(),
            next_node_id: 0,
            links: BTreeMap::new(),
            next_link_id: 0,
            incident: BTreeMap::new(),
            wireless: BTreeMap::new(),
            resolver: Box::new(EuclideanResolver),
            engine: Box::new(SyncMessageEngine::new()),
            scheduler: Scheduler::new(),
            listeners: ListenerRegistry::default(),
            properties: Properties::new(),
            wireless_enabled: true,
            sensed: BTreeSet::new(),
            selected: None,
            delivered: Vec::new(),
        }
    }

    // ── Nodes ─────────────────────────────────────────────────────

    /// Insert a node and return its freshly assigned ID.
    ///
    /// Fires `NodeAdded`, derives the node's wireless links, then runs
    /// its behavior's `on_init` (and `on_start` if the simulation is
    /// running).
    pub fn add_node(&mut self, node: Node) -> SimResult<NodeId> {
        let id = NodeId::new(self.next_node_id);
        self.insert_node(id, node)?;
        Ok(id)
    }

    /// Insert a node under a caller-chosen ID. Used by replay and
    /// deserializers; later `add_node` calls never reuse `id`.
    pub fn add_node_with_id(&mut self, id: NodeId, node: Node) -> SimResult<()> {
        if self.nodes.contains_key(&id) {
            return Err(SimError::DuplicateNode(id));
        }
        self.insert_node(id, node)
    }

    fn insert_node(&mut self, id: NodeId, mut node: Node) -> SimResult<()> {
        self.next_node_id = self.next_node_id.max(id.raw().saturating_add(1));
        node.mailbox.clear();
        node.send_queue.clear();
        let snapshot = node.snapshot(id);
        self.nodes.insert(id, node);
        self.order.push(id);
        self.incident.insert(id, BTreeSet::new());
        debug!(node = %id, location = %snapshot.location, "node added");

        self.emit(TopologyEvent::NodeAdded { node: snapshot })?;
        if self.wireless_enabled {
            self.reconcile_node(id)?;
        }
        self.invoke(id, Phase::Init, |b, ctx| b.on_init(ctx))?;
        if self.scheduler.is_running() && self.contains_node(id) {
            self.invoke(id, Phase::Start, |b, ctx| b.on_start(ctx))?;
        }
        Ok(())
    }

    /// Remove a node together with every incident link.
    ///
    /// Fires one `LinkRemoved` per incident link, then `NodeRemoved`.
    pub fn remove_node(&mut self, id: NodeId) -> SimResult<Node> {
        if !self.nodes.contains_key(&id) {
            return Err(SimError::NodeNotFound(id));
        }
        let incident: Vec<LinkId> = self
            .incident
            .get(&id)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default();
        for link in incident {
            // A listener may have removed it already.
            if self.links.contains_key(&link) {
                self.remove_link(link)?;
            }
        }

        let node = self.nodes.remove(&id).ok_or(SimError::NodeNotFound(id))?;
        self.order.retain(|n| *n != id);
        self.incident.remove(&id);
        self.sensed.retain(|(a, b)| *a != id && *b != id);
        if self.selected == Some(id) {
            self.selected = None;
        }
        debug!(node = %id, "node removed");
        self.emit(TopologyEvent::NodeRemoved { node: node.snapshot(id) })?;
        Ok(node)
    }

    /// Remove every node (and therefore every link), in registration order.
    pub fn clear(&mut self) -> SimResult<()> {
        for id in self.order.clone() {
            if self.contains_node(id) {
                self.remove_node(id)?;
            }
        }
        Ok(())
    }

    pub fn contains_node(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> SimResult<&mut Node> {
        self.nodes.get_mut(&id).ok_or(SimError::NodeNotFound(id))
    }

    /// Node IDs in registration order.
    pub fn nodes(&self) -> Vec<NodeId> {
        self.order.clone()
    }

    /// Iterate over nodes in registration order.
    pub fn iter_nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.order
            .iter()
            .filter_map(move |id| self.nodes.get(id).map(|n| (*id, n)))
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Downcast a node's behavior for inspection.
    ///
    /// Returns `None` if the node does not exist, has no behavior, the
    /// behavior has another type, or it is currently executing.
    pub fn behavior<T: Behavior>(&self, id: NodeId) -> Option<&T> {
        self.nodes.get(&id)?.behavior.as_ref()?.as_any().downcast_ref::<T>()
    }

    pub fn behavior_mut<T: Behavior>(&mut self, id: NodeId) -> Option<&mut T> {
        self.nodes
            .get_mut(&id)?
            .behavior
            .as_mut()?
            .as_any_mut()
            .downcast_mut::<T>()
    }

    /// Attach (or replace) the behavior of an existing node. `on_init`
    /// is not called.
    pub fn set_behavior(&mut self, id: NodeId, behavior: impl Behavior) -> SimResult<()> {
        self.node_mut(id)?.behavior = Some(Box::new(behavior));
        Ok(())
    }

    // ── Node state ────────────────────────────────────────────────

    /// Move a node. Fires `NodeMoved` when the location changes. Wireless
    /// links follow at the next reconciliation.
    pub fn move_node(&mut self, id: NodeId, to: Point) -> SimResult<()> {
        let node = self.node_mut(id)?;
        let from = node.location;
        if from == to {
            return Ok(());
        }
        node.location = to;
        trace!(node = %id, %from, %to, "node moved");
        self.emit(TopologyEvent::NodeMoved { node: id, from, to })
    }

    pub fn set_direction(&mut self, id: NodeId, direction: f64) -> SimResult<()> {
        self.node_mut(id)?.direction = direction;
        Ok(())
    }

    pub fn set_node_color(&mut self, id: NodeId, color: Option<Color>) -> SimResult<()> {
        self.node_mut(id)?.color = color;
        Ok(())
    }

    pub fn set_communication_range(&mut self, id: NodeId, range: f64) -> SimResult<()> {
        self.node_mut(id)?.communication_range = range;
        Ok(())
    }

    pub fn set_sensing_range(&mut self, id: NodeId, range: f64) -> SimResult<()> {
        self.node_mut(id)?.sensing_range = range;
        Ok(())
    }

    /// Toggle wireless participation of one node. Its wireless links are
    /// updated at the next reconciliation.
    pub fn set_node_wireless(&mut self, id: NodeId, enabled: bool) -> SimResult<()> {
        self.node_mut(id)?.wireless_enabled = enabled;
        Ok(())
    }

    /// Mark a node as selected: fires `NodeSelected`, then calls the
    /// behavior's `on_selection`.
    pub fn select_node(&mut self, id: NodeId) -> SimResult<()> {
        if !self.contains_node(id) {
            return Err(SimError::NodeNotFound(id));
        }
        self.selected = Some(id);
        self.emit(TopologyEvent::NodeSelected { node: id })?;
        self.invoke(id, Phase::Selection, |b, ctx| b.on_selection(ctx))
    }

    pub fn selected_node(&self) -> Option<NodeId> {
        self.selected
    }

    // ── Links ─────────────────────────────────────────────────────

    /// Insert a wired link. Both endpoints must exist; wireless links
    /// cannot be added by hand. Fires `LinkAdded`.
    pub fn add_link(&mut self, link: Link) -> SimResult<LinkId> {
        if link.mode == LinkMode::Wireless {
            return Err(SimError::WirelessLinkRequested {
                source_node: link.source,
                destination: link.destination,
            });
        }
        for endpoint in [link.source, link.destination] {
            if !self.contains_node(endpoint) {
                return Err(SimError::EndpointMissing {
                    source_node: link.source,
                    destination: link.destination,
                    missing: endpoint,
                });
            }
        }
        self.insert_link(link)
    }

    pub(crate) fn insert_link(&mut self, link: Link) -> SimResult<LinkId> {
        let id = LinkId::new(self.next_link_id);
        self.next_link_id += 1;
        for endpoint in [link.source, link.destination] {
            self.incident.entry(endpoint).or_default().insert(id);
        }
        if link.mode == LinkMode::Wireless {
            self.wireless.insert(pair_key(link.source, link.destination), id);
        }
        let snapshot = link.snapshot(id);
        self.links.insert(id, link);
        trace!(link = %id, source = %snapshot.source, destination = %snapshot.destination, "link added");
        self.emit(TopologyEvent::LinkAdded { link: snapshot })?;
        Ok(id)
    }

    /// Remove a link (wired or wireless). Fires `LinkRemoved`.
    ///
    /// A removed wireless link comes back at the next reconciliation if
    /// the resolver still hears the pair.
    pub fn remove_link(&mut self, id: LinkId) -> SimResult<Link> {
        let link = self.links.remove(&id).ok_or(SimError::LinkNotFound(id))?;
        for endpoint in [link.source, link.destination] {
            if let Some(set) = self.incident.get_mut(&endpoint) {
                set.remove(&id);
            }
        }
        if link.mode == LinkMode::Wireless {
            let key = pair_key(link.source, link.destination);
            if self.wireless.get(&key) == Some(&id) {
                self.wireless.remove(&key);
            }
        }
        trace!(link = %id, "link removed");
        self.emit(TopologyEvent::LinkRemoved { link: link.snapshot(id) })?;
        Ok(link)
    }

    pub fn link(&self, id: LinkId) -> Option<&Link> {
        self.links.get(&id)
    }

    /// Link IDs in creation order.
    pub fn links(&self) -> Vec<LinkId> {
        self.links.keys().copied().collect()
    }

    pub fn iter_links(&self) -> impl Iterator<Item = (LinkId, &Link)> {
        self.links.iter().map(|(id, l)| (*id, l))
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    /// Links touching `id`, in creation order.
    pub fn incident_links(&self, id: NodeId) -> Vec<LinkId> {
        self.incident
            .get(&id)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Find a link from `a` to `b`.
    ///
    /// With `directed_only`, only a `Directed` link `a → b` matches.
    /// Otherwise any link that lets `a` reach `b` does, undirected ones
    /// first.
    pub fn get_link(&self, a: NodeId, b: NodeId, directed_only: bool) -> Option<LinkId> {
        let candidates = self.incident.get(&a)?;
        let mut fallback = None;
        for id in candidates {
            let link = &self.links[id];
            if directed_only {
                if link.is_directed() && link.source == a && link.destination == b {
                    return Some(*id);
                }
                continue;
            }
            if !link.allows(a, b) {
                continue;
            }
            if !link.is_directed() {
                return Some(*id);
            }
            fallback.get_or_insert(*id);
        }
        fallback
    }

    /// An undirected link joining `a` and `b`, in either argument order.
    pub fn common_link_with(&self, a: NodeId, b: NodeId) -> Option<LinkId> {
        self.incident
            .get(&a)?
            .iter()
            .copied()
            .find(|id| {
                let link = &self.links[id];
                !link.is_directed() && link.joins(a, b)
            })
    }

    /// Whether some link currently lets `from` reach `to`.
    pub fn has_out_link(&self, from: NodeId, to: NodeId) -> bool {
        self.incident
            .get(&from)
            .map(|set| set.iter().any(|id| self.links[id].allows(from, to)))
            .unwrap_or(false)
    }

    /// Distinct nodes reachable from `id` over one link (directed links
    /// count outward only), in link-creation order. Empty for unknown IDs.
    pub fn neighbors(&self, id: NodeId) -> Vec<NodeId> {
        self.collect_adjacent(id, |link, other| link.allows(id, other))
    }

    /// Distinct nodes that can reach `id` over one link.
    pub fn in_neighbors(&self, id: NodeId) -> Vec<NodeId> {
        self.collect_adjacent(id, |link, other| link.allows(other, id))
    }

    fn collect_adjacent(&self, id: NodeId, keep: impl Fn(&Link, NodeId) -> bool) -> Vec<NodeId> {
        let mut out = Vec::new();
        let Some(set) = self.incident.get(&id) else {
            return out;
        };
        for link_id in set {
            let link = &self.links[link_id];
            if let Some(other) = link.other_end(id) {
                if keep(link, other) && !out.contains(&other) {
                    out.push(other);
                }
            }
        }
        out
    }

    pub fn set_link_color(&mut self, id: LinkId, color: Option<Color>) -> SimResult<()> {
        self.links.get_mut(&id).ok_or(SimError::LinkNotFound(id))?.color = color;
        Ok(())
    }

    pub fn set_link_width(&mut self, id: LinkId, width: u32) -> SimResult<()> {
        self.links.get_mut(&id).ok_or(SimError::LinkNotFound(id))?.width = width;
        Ok(())
    }

    // ── Policies ──────────────────────────────────────────────────

    pub fn set_link_resolver(&mut self, resolver: impl LinkResolver + 'static) {
        debug!(resolver = resolver.name(), "link resolver replaced");
        self.resolver = Box::new(resolver);
    }

    pub fn link_resolver(&self) -> &dyn LinkResolver {
        self.resolver.as_ref()
    }

    /// Replace the message engine. Messages in flight in the old engine
    /// are discarded; send-queues are kept.
    pub fn set_message_engine(&mut self, engine: impl MessageEngine) {
        debug!(engine = engine.name(), "message engine replaced");
        self.engine = Box::new(engine);
    }

    pub fn message_engine(&self) -> &dyn MessageEngine {
        self.engine.as_ref()
    }

    /// Downcast the message engine.
    pub fn message_engine_as<T: MessageEngine>(&self) -> Option<&T> {
        self.engine.as_any().downcast_ref::<T>()
    }

    // ── Engine interface ──────────────────────────────────────────

    /// Empty every send-queue, in node registration order.
    pub fn drain_send_queues(&mut self) -> Vec<Message> {
        let mut out = Vec::new();
        for id in &self.order {
            if let Some(node) = self.nodes.get_mut(id) {
                out.extend(node.send_queue.drain(..));
            }
        }
        out
    }

    /// Put `message` in `recipient`'s mailbox and schedule its
    /// `on_message` callback. Returns `false` if `recipient` is gone.
    pub fn deliver(&mut self, recipient: NodeId, message: Message) -> bool {
        let Some(node) = self.nodes.get_mut(&recipient) else {
            return false;
        };
        node.mailbox.push(message.clone());
        self.delivered.push((recipient, message));
        true
    }

    /// Return a message to the back of its sender's send-queue. Returns
    /// `false` if the sender is gone.
    pub fn requeue(&mut self, message: Message) -> bool {
        match self.nodes.get_mut(&message.sender) {
            Some(node) => {
                node.send_queue.push_back(message);
                true
            }
            None => false,
        }
    }

    /// Pending outgoing messages across all nodes.
    pub fn queued_messages(&self) -> usize {
        self.nodes.values().map(|n| n.send_queue.len()).sum()
    }

    // ── Properties ────────────────────────────────────────────────

    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    /// Set a topology-level property. Returns the previous value.
    pub fn set_property(&mut self, key: &str, value: PropertyValue) -> SimResult<Option<PropertyValue>> {
        let old = self.properties.set(key, value.clone());
        self.property_changed(PropertyOwner::Topology, key, old, Some(value))
    }

    pub fn remove_property(&mut self, key: &str) -> SimResult<Option<PropertyValue>> {
        let old = self.properties.remove(key);
        self.property_changed(PropertyOwner::Topology, key, old, None)
    }

    pub fn set_node_property(&mut self, id: NodeId, key: &str, value: PropertyValue) -> SimResult<Option<PropertyValue>> {
        let old = self.node_mut(id)?.properties.set(key, value.clone());
        self.property_changed(PropertyOwner::Node(id), key, old, Some(value))
    }

    pub fn remove_node_property(&mut self, id: NodeId, key: &str) -> SimResult<Option<PropertyValue>> {
        let old = self.node_mut(id)?.properties.remove(key);
        self.property_changed(PropertyOwner::Node(id), key, old, None)
    }

    pub fn set_link_property(&mut self, id: LinkId, key: &str, value: PropertyValue) -> SimResult<Option<PropertyValue>> {
        let link = self.links.get_mut(&id).ok_or(SimError::LinkNotFound(id))?;
        let old = link.properties.set(key, value.clone());
        self.property_changed(PropertyOwner::Link(id), key, old, Some(value))
    }

    pub fn remove_link_property(&mut self, id: LinkId, key: &str) -> SimResult<Option<PropertyValue>> {
        let link = self.links.get_mut(&id).ok_or(SimError::LinkNotFound(id))?;
        let old = link.properties.remove(key);
        self.property_changed(PropertyOwner::Link(id), key, old, None)
    }

    /// Fire `PropertyChanged` unless the value is unchanged.
    fn property_changed(
        &mut self,
        owner: PropertyOwner,
        key: &str,
        old: Option<PropertyValue>,
        new: Option<PropertyValue>,
    ) -> SimResult<Option<PropertyValue>> {
        if old != new {
            self.emit(TopologyEvent::PropertyChanged {
                owner,
                key: key.to_owned(),
                old: old.clone(),
                new,
            })?;
        }
        Ok(old)
    }

    // ── Listeners ─────────────────────────────────────────────────

    pub fn subscribe(&mut self, category: ListenerCategory, listener: impl Listener) -> ListenerId {
        self.listeners.subscribe(category, Box::new(listener))
    }

    pub fn subscribe_boxed(&mut self, category: ListenerCategory, listener: Box<dyn Listener>) -> ListenerId {
        self.listeners.subscribe(category, listener)
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> Option<Box<dyn Listener>> {
        self.listeners.unsubscribe(id)
    }

    /// Downcast a registered listener.
    pub fn listener<T: Listener>(&self, id: ListenerId) -> Option<&T> {
        self.listeners.get(id)?.as_any().downcast_ref::<T>()
    }

    pub fn listener_mut<T: Listener>(&mut self, id: ListenerId) -> Option<&mut T> {
        self.listeners.get_mut(id)?.as_any_mut().downcast_mut::<T>()
    }

    pub(crate) fn emit(&mut self, event: TopologyEvent) -> SimResult<()> {
        let category = event.category();
        if self.listeners.is_empty(category) {
            return Ok(());
        }
        let round = self.time();
        self.listeners
            .dispatch(round, &event)
            .map_err(|source| SimError::Listener {
                round,
                category,
                event: event.kind(),
                source,
            })
    }

    // ── Callback dispatch ─────────────────────────────────────────

    /// Run one behavior callback of node `id`.
    ///
    /// The behavior is detached from the node for the duration of the
    /// call so that the callback can borrow the whole topology mutably,
    /// then re-attached if the node still exists. Nodes without a
    /// behavior are skipped.
    pub(crate) fn invoke<F>(&mut self, id: NodeId, phase: Phase, f: F) -> SimResult<()>
    where
        F: FnOnce(&mut dyn Behavior, &mut NodeContext<'_>) -> anyhow::Result<()>,
    {
        let Some(mut behavior) = self.nodes.get_mut(&id).and_then(|n| n.behavior.take()) else {
            return Ok(());
        };
        let result = {
            let mut ctx = NodeContext::new(self, id);
            f(behavior.as_mut(), &mut ctx)
        };
        if let Some(node) = self.nodes.get_mut(&id) {
            if node.behavior.is_none() {
                node.behavior = Some(behavior);
            }
        }
        result.map_err(|source| SimError::Behavior {
            round: self.time(),
            node: id,
            phase,
            source,
        })
    }
}

impl Default for Topology {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Topology {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Topology")
            .field("round", &self.time())
            .field("nodes", &self.nodes.len())
            .field("links", &self.links.len())
            .field("resolver", &self.resolver.name())
            .field("engine", &self.engine.name())
            .field("wireless_enabled", &self.wireless_enabled)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

/// Order-independent key for an unordered node pair.
pub(crate) fn pair_key(a: NodeId, b: NodeId) -> (NodeId, NodeId) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}
