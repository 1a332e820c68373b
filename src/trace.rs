//! Trace recording and replay.
//!
//! A [`TraceRecorder`] subscribes to every listener category of a
//! topology and appends each event, tagged with its round, to a
//! [`Trace`]. Traces export to and import from JSON lines, hash
//! deterministically, and can be [`replay`]ed into a fresh topology
//! through the public mutation API alone.
//!
//! Replay rebuilds *structure*: nodes (as passive snapshots), their
//! movements, wired links and properties. Wireless links are not copied;
//! they are re-derived by the target topology's resolver at every round
//! boundary, which reproduces the recorded links when the resolver and
//! node ranges match.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::io::{self, BufRead, Write};
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::SimResult;
use crate::event::{Listener, ListenerCategory, TopologyEvent};
use crate::link::{LinkId, LinkMode};
use crate::node::Node;
use crate::properties::PropertyOwner;
use crate::time::Round;
use crate::topology::Topology;

// ── Hash utility ──────────────────────────────────────────────────────

/// Combine two u64 hashes deterministically.
pub fn hash_combine(a: u64, b: u64) -> u64 {
    let mut h = a;
    h = h.wrapping_mul(0x517cc1b727220a95);
    h = h.wrapping_add(b);
    h ^= h >> 32;
    h
}

/// Hash a byte slice deterministically (FNV-1a).
pub fn hash_bytes(data: &[u8]) -> u64 {
    let mut h: u64 = 0xcbf29ce484222325;
    for &b in data {
        h ^= b as u64;
        h = h.wrapping_mul(0x100000001b3);
    }
    h
}

// ── Trace ─────────────────────────────────────────────────────────────

/// One recorded event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEntry {
    pub round: Round,
    pub event: TopologyEvent,
}

/// An append-only sequence of topology events.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Trace {
    entries: Vec<TraceEntry>,
}

impl Trace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, round: Round, event: TopologyEvent) {
        self.entries.push(TraceEntry { round, event });
    }

    pub fn entries(&self) -> &[TraceEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Deterministic hash of the whole trace.
    pub fn hash(&self) -> u64 {
        let mut h: u64 = 0;
        for entry in &self.entries {
            h = hash_combine(h, entry.round.get());
            // Serializing plain-data events cannot fail.
            let bytes = serde_json::to_vec(&entry.event).unwrap_or_default();
            h = hash_combine(h, hash_bytes(&bytes));
        }
        h
    }

    // ── Export / Import ───────────────────────────────────────────

    /// Write the trace as JSON lines, one entry per line, after a
    /// `#`-prefixed header.
    pub fn export<W: Write>(&self, w: &mut W) -> io::Result<()> {
        writeln!(w, "# TOPSIM TRACE v1")?;
        writeln!(w, "# entries: {}", self.entries.len())?;
        for entry in &self.entries {
            serde_json::to_writer(&mut *w, entry)?;
            writeln!(w)?;
        }
        Ok(())
    }

    pub fn export_to_file(&self, path: &str) -> io::Result<()> {
        let mut f = io::BufWriter::new(std::fs::File::create(path)?);
        self.export(&mut f)?;
        f.flush()
    }

    /// Read a trace written by [`export`](Self::export). Blank and
    /// `#`-prefixed lines are skipped.
    pub fn import<R: BufRead>(r: R) -> io::Result<Self> {
        let mut entries = Vec::new();
        for line in r.lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            entries.push(serde_json::from_str(line)?);
        }
        Ok(Trace { entries })
    }

    pub fn import_from_file(path: &str) -> io::Result<Self> {
        let f = std::fs::File::open(path)?;
        Self::import(io::BufReader::new(f))
    }
}

// ── Recorder ──────────────────────────────────────────────────────────

/// A listener that records every event it receives into a shared trace.
///
/// Clones share the same trace, which is how one recorder can sit in
/// several listener categories at once.
#[derive(Debug, Clone, Default)]
pub struct TraceRecorder {
    trace: Rc<RefCell<Trace>>,
}

impl TraceRecorder {
    /// Subscribe a recorder to every category of `topology`.
    pub fn attach(topology: &mut Topology) -> Self {
        let recorder = TraceRecorder::default();
        for category in ListenerCategory::ALL {
            topology.subscribe(category, recorder.clone());
        }
        recorder
    }

    /// A copy of everything recorded so far.
    pub fn trace(&self) -> Trace {
        self.trace.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.trace.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.trace.borrow().is_empty()
    }
}

impl Listener for TraceRecorder {
    fn on_event(&mut self, round: Round, event: &TopologyEvent) -> anyhow::Result<()> {
        self.trace.borrow_mut().push(round, event.clone());
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

// ── Replay ────────────────────────────────────────────────────────────

/// Apply the structural events of `trace` to `topology`.
///
/// Node IDs are preserved; wired link IDs are remapped. Lifecycle events
/// and wireless link events are skipped. Wireless links are refreshed
/// whenever the round changes and once at the end.
pub fn replay(trace: &Trace, topology: &mut Topology) -> SimResult<()> {
    let mut links: BTreeMap<LinkId, LinkId> = BTreeMap::new();
    let mut round: Option<Round> = None;

    for entry in trace.entries() {
        if round.is_some_and(|r| r != entry.round) && topology.is_wireless_enabled() {
            topology.update_wireless_links()?;
        }
        round = Some(entry.round);

        match &entry.event {
            TopologyEvent::NodeAdded { node } => {
                topology.add_node_with_id(node.id, Node::from_snapshot(node))?;
            }
            TopologyEvent::NodeRemoved { node } => {
                topology.remove_node(node.id)?;
            }
            TopologyEvent::NodeMoved { node, to, .. } => {
                topology.move_node(*node, *to)?;
            }
            TopologyEvent::LinkAdded { link } if link.mode == LinkMode::Wired => {
                let id = topology.add_link(link.to_link())?;
                links.insert(link.id, id);
            }
            TopologyEvent::LinkRemoved { link } if link.mode == LinkMode::Wired => {
                if let Some(id) = links.remove(&link.id) {
                    topology.remove_link(id)?;
                }
            }
            TopologyEvent::NodeSelected { node } => {
                topology.select_node(*node)?;
            }
            TopologyEvent::PropertyChanged { owner, key, new, .. } => {
                replay_property(topology, &links, *owner, key, new.clone())?;
            }
            _ => {}
        }
    }

    if topology.is_wireless_enabled() {
        topology.update_wireless_links()?;
    }
    debug!(entries = trace.len(), nodes = topology.node_count(), links = topology.link_count(), "trace replayed");
    Ok(())
}

fn replay_property(
    topology: &mut Topology,
    links: &BTreeMap<LinkId, LinkId>,
    owner: PropertyOwner,
    key: &str,
    value: Option<crate::properties::PropertyValue>,
) -> SimResult<()> {
    match (owner, value) {
        (PropertyOwner::Topology, Some(v)) => topology.set_property(key, v).map(|_| ()),
        (PropertyOwner::Topology, None) => topology.remove_property(key).map(|_| ()),
        (PropertyOwner::Node(id), Some(v)) => topology.set_node_property(id, key, v).map(|_| ()),
        (PropertyOwner::Node(id), None) => topology.remove_node_property(id, key).map(|_| ()),
        // Properties of wireless links cannot be carried over.
        (PropertyOwner::Link(old), value) => match (links.get(&old), value) {
            (Some(id), Some(v)) => topology.set_link_property(*id, key, v).map(|_| ()),
            (Some(id), None) => topology.remove_link_property(*id, key).map(|_| ()),
            (None, _) => Ok(()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;
    use crate::link::{Link, Orientation};
    use crate::node::{NodeId, RandomWalker};
    use crate::properties::PropertyValue;

    fn record_run() -> (Topology, Trace) {
        let mut topo = Topology::new();
        let recorder = TraceRecorder::attach(&mut topo);
        for i in 0..6u64 {
            let node = Node::at(20.0 * i as f64, 50.0)
                .with_communication_range(35.0 + 5.0 * i as f64)
                .with_behavior(RandomWalker::new(4.0, 150.0, 150.0, i).unwrap());
            topo.add_node(node).unwrap();
        }
        let wired = topo.add_link(Link::directed(NodeId::new(0), NodeId::new(5))).unwrap();
        topo.set_link_property(wired, "cost", PropertyValue::Number(3.0)).unwrap();
        topo.add_link(Link::undirected(NodeId::new(1), NodeId::new(4))).unwrap();
        topo.set_node_property(NodeId::new(2), "role", PropertyValue::from("leader")).unwrap();

        topo.start().unwrap();
        topo.run(15).unwrap();
        topo.remove_node(NodeId::new(4)).unwrap();
        topo.run(15).unwrap();
        (topo, recorder.trace())
    }

    fn shapes(topo: &Topology) -> Vec<(NodeId, NodeId, bool, bool)> {
        let mut v: Vec<_> = topo
            .iter_links()
            .map(|(_, l)| {
                (
                    l.source(),
                    l.destination(),
                    l.orientation() == Orientation::Directed,
                    l.is_wireless(),
                )
            })
            .collect();
        v.sort();
        v
    }

    #[test]
    fn test_recorded_trace_is_deterministic() {
        let (_, a) = record_run();
        let (_, b) = record_run();
        assert!(!a.is_empty());
        assert_eq!(a.hash(), b.hash());
    }

    #[test]
    fn test_export_import_preserves_trace() {
        let (_, trace) = record_run();
        let mut buf = Vec::new();
        trace.export(&mut buf).unwrap();
        assert!(String::from_utf8_lossy(&buf).starts_with("# TOPSIM TRACE v1"));

        let imported = Trace::import(buf.as_slice()).unwrap();
        assert_eq!(imported, trace);
        assert_eq!(imported.hash(), trace.hash());
    }

    #[test]
    fn test_import_rejects_garbage() {
        let err = Trace::import("# header\n{not json}\n".as_bytes()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_replay_rebuilds_structure() {
        let (original, trace) = record_run();
        let mut copy = Topology::new();
        replay(&trace, &mut copy).unwrap();

        assert_eq!(copy.nodes(), original.nodes());
        for id in original.nodes() {
            assert_eq!(
                copy.node(id).unwrap().location(),
                original.node(id).unwrap().location()
            );
        }
        assert_eq!(shapes(&copy), shapes(&original));

        let wired = copy.get_link(NodeId::new(0), NodeId::new(5), true).unwrap();
        assert_eq!(
            copy.link(wired).unwrap().properties().get("cost"),
            Some(&PropertyValue::Number(3.0))
        );
        assert_eq!(
            copy.node(NodeId::new(2)).unwrap().properties().get("role"),
            Some(&PropertyValue::from("leader"))
        );
    }

    #[test]
    fn test_replay_of_moves_updates_wireless() {
        let mut source = Topology::new();
        let recorder = TraceRecorder::attach(&mut source);
        let a = source.add_node(Node::at(0.0, 0.0)).unwrap();
        let b = source.add_node(Node::at(500.0, 0.0)).unwrap();
        source.tick().unwrap();
        source.move_node(b, Point::new(30.0, 0.0)).unwrap();
        source.tick().unwrap();
        let trace = recorder.trace();
        assert_eq!(recorder.len(), trace.len());

        let mut copy = Topology::new();
        replay(&trace, &mut copy).unwrap();
        assert!(copy.get_link(a, b, false).is_some());
        assert_eq!(copy.time(), Round::ZERO);
    }
}
