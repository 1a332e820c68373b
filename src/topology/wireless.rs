//! Wireless-link reconciliation and sensing.
//!
//! Wireless links are never stored as user intent: they are recomputed
//! from the link resolver. For each unordered pair of wireless-enabled
//! nodes the resolver is asked both ways and the pair ends up with
//!
//! | `a` hears... | link |
//! |---|---|
//! | both ways | one undirected wireless link |
//! | one way | one directed wireless link, speaker → listener |
//! | neither | none |
//!
//! A pair whose answer did not change keeps its link (same [`LinkId`]),
//! so listeners see exactly one add or remove per transition.

use std::collections::BTreeSet;

use tracing::debug;

use crate::error::SimResult;
use crate::link::{Link, LinkId, LinkMode, Orientation};
use crate::node::NodeId;
use crate::scheduler::Phase;

use super::{pair_key, Topology};

/// Normalized description of a wireless link: undirected links use the
/// ordered pair key, directed links their real direction.
type Shape = (NodeId, NodeId, Orientation);

impl Topology {
    /// Recompute every wireless link from the current resolver.
    ///
    /// Runs automatically once per round while wireless is enabled; call
    /// it directly after bulk moves to refresh links mid-round.
    pub fn update_wireless_links(&mut self) -> SimResult<()> {
        let ids = self.order.clone();
        for (i, &a) in ids.iter().enumerate() {
            for &b in &ids[i + 1..] {
                self.reconcile_pair(a, b)?;
            }
        }
        Ok(())
    }

    /// Reconcile every pair involving `id`.
    pub(crate) fn reconcile_node(&mut self, id: NodeId) -> SimResult<()> {
        for other in self.order.clone() {
            if other != id {
                self.reconcile_pair(id, other)?;
            }
        }
        Ok(())
    }

    fn reconcile_pair(&mut self, a: NodeId, b: NodeId) -> SimResult<()> {
        let wanted = self.desired_shape(a, b);
        let key = pair_key(a, b);
        let current: Option<(LinkId, Shape)> = self.wireless.get(&key).and_then(|id| {
            self.links.get(id).map(|l| (*id, shape_of(l.source, l.destination, l.orientation)))
        });

        if current.map(|(_, s)| s) == wanted {
            return Ok(());
        }
        if let Some((id, _)) = current {
            debug!(link = %id, a = %a, b = %b, "wireless link lost");
            self.remove_link(id)?;
        }
        if let Some((source, destination, orientation)) = wanted {
            let id = self.insert_link(Link::new(source, destination, orientation, LinkMode::Wireless))?;
            debug!(link = %id, %source, %destination, ?orientation, "wireless link formed");
        }
        Ok(())
    }

    fn desired_shape(&self, a: NodeId, b: NodeId) -> Option<Shape> {
        let (na, nb) = (self.nodes.get(&a)?, self.nodes.get(&b)?);
        if !na.is_wireless_enabled() || !nb.is_wireless_enabled() {
            return None;
        }
        let ab = self.resolver.is_heard_by(na, nb);
        let ba = if self.resolver.is_symmetric() {
            ab
        } else {
            self.resolver.is_heard_by(nb, na)
        };
        match (ab, ba) {
            (true, true) => Some(shape_of(a, b, Orientation::Undirected)),
            (true, false) => Some((a, b, Orientation::Directed)),
            (false, true) => Some((b, a, Orientation::Directed)),
            (false, false) => None,
        }
    }

    pub fn is_wireless_enabled(&self) -> bool {
        self.wireless_enabled
    }

    /// Stop deriving wireless links and remove every existing one.
    pub fn disable_wireless(&mut self) -> SimResult<()> {
        self.wireless_enabled = false;
        let existing: Vec<LinkId> = self.wireless.values().copied().collect();
        for id in existing {
            if self.links.contains_key(&id) {
                self.remove_link(id)?;
            }
        }
        Ok(())
    }

    /// Resume deriving wireless links, recomputing them immediately.
    pub fn enable_wireless(&mut self) -> SimResult<()> {
        self.wireless_enabled = true;
        self.update_wireless_links()
    }

    /// Wireless links currently in the topology.
    pub fn wireless_links(&self) -> Vec<LinkId> {
        self.links
            .iter()
            .filter(|(_, l)| l.mode == LinkMode::Wireless)
            .map(|(id, _)| *id)
            .collect()
    }

    // ── Sensing ───────────────────────────────────────────────────

    /// Nodes within `id`'s sensing range as of the last update.
    pub fn sensed_nodes(&self, id: NodeId) -> Vec<NodeId> {
        self.sensed
            .range((id, NodeId::new(0))..=(id, NodeId::new(u64::MAX)))
            .map(|(_, other)| *other)
            .collect()
    }

    /// Recompute sensing sets and notify behaviors of changes:
    /// `on_sensing_out` for lost pairs, then `on_sensing_in` for new ones.
    pub(crate) fn update_sensing(&mut self) -> SimResult<()> {
        let mut now = BTreeSet::new();
        for (a, na) in &self.nodes {
            if na.sensing_range() <= 0.0 {
                continue;
            }
            for (b, nb) in &self.nodes {
                if a != b && na.distance(nb) < na.sensing_range() {
                    now.insert((*a, *b));
                }
            }
        }
        if now == self.sensed {
            return Ok(());
        }
        let lost: Vec<(NodeId, NodeId)> = self.sensed.difference(&now).copied().collect();
        let gained: Vec<(NodeId, NodeId)> = now.difference(&self.sensed).copied().collect();
        self.sensed = now;

        for (observer, other) in lost {
            if self.contains_node(observer) {
                self.invoke(observer, Phase::SensingOut, |b, ctx| b.on_sensing_out(ctx, other))?;
            }
        }
        for (observer, other) in gained {
            if self.contains_node(observer) {
                self.invoke(observer, Phase::SensingIn, |b, ctx| b.on_sensing_in(ctx, other))?;
            }
        }
        Ok(())
    }
}

fn shape_of(source: NodeId, destination: NodeId, orientation: Orientation) -> Shape {
    match orientation {
        Orientation::Undirected => {
            let (lo, hi) = pair_key(source, destination);
            (lo, hi, orientation)
        }
        Orientation::Directed => (source, destination, orientation),
    }
}
