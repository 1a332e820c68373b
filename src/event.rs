//! Topology events and listener fan-out.
//!
//! Every observable change to a [`Topology`](crate::Topology) is
//! described by a [`TopologyEvent`]. Listeners subscribe to one
//! [`ListenerCategory`] and are invoked synchronously, at the point of
//! mutation, in registration order.
//!
//! A listener returning an error aborts the fan-out: later listeners of
//! the same event are not called and the error is surfaced to the caller
//! of the mutating operation (or of `tick`).

use std::any::Any;

use serde::{Deserialize, Serialize};

use crate::geometry::Point;
use crate::link::LinkSnapshot;
use crate::node::{NodeId, NodeSnapshot};
use crate::properties::{PropertyOwner, PropertyValue};
use crate::time::Round;

// ── Categories ────────────────────────────────────────────────────────

/// The listener lists a topology maintains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ListenerCategory {
    /// `NodeAdded` / `NodeRemoved`.
    Topology,
    /// `LinkAdded` / `LinkRemoved`.
    Connectivity,
    /// `NodeMoved`.
    Movement,
    /// `NodeSelected`.
    Selection,
    /// `PropertyChanged`.
    Property,
    /// `Started` / `Paused` / `Resumed` / `Reset`.
    Lifecycle,
}

impl ListenerCategory {
    pub const ALL: [ListenerCategory; 6] = [
        ListenerCategory::Topology,
        ListenerCategory::Connectivity,
        ListenerCategory::Movement,
        ListenerCategory::Selection,
        ListenerCategory::Property,
        ListenerCategory::Lifecycle,
    ];

    fn index(self) -> usize {
        match self {
            ListenerCategory::Topology => 0,
            ListenerCategory::Connectivity => 1,
            ListenerCategory::Movement => 2,
            ListenerCategory::Selection => 3,
            ListenerCategory::Property => 4,
            ListenerCategory::Lifecycle => 5,
        }
    }
}

impl std::fmt::Display for ListenerCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ListenerCategory::Topology => "topology",
            ListenerCategory::Connectivity => "connectivity",
            ListenerCategory::Movement => "movement",
            ListenerCategory::Selection => "selection",
            ListenerCategory::Property => "property",
            ListenerCategory::Lifecycle => "lifecycle",
        };
        f.write_str(name)
    }
}

// ── Events ────────────────────────────────────────────────────────────

/// An observable change to a topology.
///
/// Events carry owned snapshots rather than references so that
/// listeners can store them (trace recording) without borrowing the
/// topology.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TopologyEvent {
    NodeAdded { node: NodeSnapshot },
    NodeRemoved { node: NodeSnapshot },
    LinkAdded { link: LinkSnapshot },
    LinkRemoved { link: LinkSnapshot },
    NodeMoved { node: NodeId, from: Point, to: Point },
    NodeSelected { node: NodeId },
    PropertyChanged {
        owner: PropertyOwner,
        key: String,
        old: Option<PropertyValue>,
        new: Option<PropertyValue>,
    },
    Started,
    Paused,
    Resumed,
    Reset,
}

/// Discriminant of a [`TopologyEvent`], used in error reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    NodeAdded,
    NodeRemoved,
    LinkAdded,
    LinkRemoved,
    NodeMoved,
    NodeSelected,
    PropertyChanged,
    Started,
    Paused,
    Resumed,
    Reset,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}

impl TopologyEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            TopologyEvent::NodeAdded { .. } => EventKind::NodeAdded,
            TopologyEvent::NodeRemoved { .. } => EventKind::NodeRemoved,
            TopologyEvent::LinkAdded { .. } => EventKind::LinkAdded,
            TopologyEvent::LinkRemoved { .. } => EventKind::LinkRemoved,
            TopologyEvent::NodeMoved { .. } => EventKind::NodeMoved,
            TopologyEvent::NodeSelected { .. } => EventKind::NodeSelected,
            TopologyEvent::PropertyChanged { .. } => EventKind::PropertyChanged,
            TopologyEvent::Started => EventKind::Started,
            TopologyEvent::Paused => EventKind::Paused,
            TopologyEvent::Resumed => EventKind::Resumed,
            TopologyEvent::Reset => EventKind::Reset,
        }
    }

    /// The listener list this event is dispatched to.
    pub fn category(&self) -> ListenerCategory {
        match self {
            TopologyEvent::NodeAdded { .. } | TopologyEvent::NodeRemoved { .. } => {
                ListenerCategory::Topology
            }
            TopologyEvent::LinkAdded { .. } | TopologyEvent::LinkRemoved { .. } => {
                ListenerCategory::Connectivity
            }
            TopologyEvent::NodeMoved { .. } => ListenerCategory::Movement,
            TopologyEvent::NodeSelected { .. } => ListenerCategory::Selection,
            TopologyEvent::PropertyChanged { .. } => ListenerCategory::Property,
            TopologyEvent::Started
            | TopologyEvent::Paused
            | TopologyEvent::Resumed
            | TopologyEvent::Reset => ListenerCategory::Lifecycle,
        }
    }

    /// The node this event is about, if any.
    pub fn node(&self) -> Option<NodeId> {
        match self {
            TopologyEvent::NodeAdded { node } | TopologyEvent::NodeRemoved { node } => Some(node.id),
            TopologyEvent::NodeMoved { node, .. } | TopologyEvent::NodeSelected { node } => {
                Some(*node)
            }
            TopologyEvent::PropertyChanged {
                owner: PropertyOwner::Node(id),
                ..
            } => Some(*id),
            _ => None,
        }
    }
}

impl std::fmt::Display for TopologyEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TopologyEvent::NodeAdded { node } => write!(f, "NodeAdded({} at {})", node.id, node.location),
            TopologyEvent::NodeRemoved { node } => write!(f, "NodeRemoved({})", node.id),
            TopologyEvent::LinkAdded { link } => {
                write!(f, "LinkAdded({} {} ↔ {} {:?})", link.id, link.source, link.destination, link.mode)
            }
            TopologyEvent::LinkRemoved { link } => {
                write!(f, "LinkRemoved({} {} ↔ {})", link.id, link.source, link.destination)
            }
            TopologyEvent::NodeMoved { node, to, .. } => write!(f, "NodeMoved({} → {})", node, to),
            TopologyEvent::NodeSelected { node } => write!(f, "NodeSelected({})", node),
            TopologyEvent::PropertyChanged { owner, key, .. } => {
                write!(f, "PropertyChanged({}.{})", owner, key)
            }
            other => write!(f, "{}", other.kind()),
        }
    }
}

// ── Listeners ─────────────────────────────────────────────────────────

/// A subscriber to topology events.
///
/// Listeners are called synchronously and must not block. Returning an
/// error aborts the remaining fan-out and propagates to the caller.
pub trait Listener: Any {
    fn on_event(&mut self, round: Round, event: &TopologyEvent) -> anyhow::Result<()>;

    /// Downcast support, required for `Topology::listener::<T>()`.
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Adapts a closure into a [`Listener`].
pub struct FnListener<F>(pub F);

impl<F> Listener for FnListener<F>
where
    F: FnMut(Round, &TopologyEvent) -> anyhow::Result<()> + 'static,
{
    fn on_event(&mut self, round: Round, event: &TopologyEvent) -> anyhow::Result<()> {
        (self.0)(round, event)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Handle returned on subscription, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerId(u64);

impl std::fmt::Display for ListenerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Per-category subscriber lists, in registration order.
#[derive(Default)]
pub(crate) struct ListenerRegistry {
    lists: [Vec<(ListenerId, Box<dyn Listener>)>; 6],
    next_id: u64,
}

impl ListenerRegistry {
    pub(crate) fn subscribe(&mut self, category: ListenerCategory, listener: Box<dyn Listener>) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.lists[category.index()].push((id, listener));
        id
    }

    pub(crate) fn unsubscribe(&mut self, id: ListenerId) -> Option<Box<dyn Listener>> {
        for list in self.lists.iter_mut() {
            if let Some(pos) = list.iter().position(|(lid, _)| *lid == id) {
                return Some(list.remove(pos).1);
            }
        }
        None
    }

    pub(crate) fn get(&self, id: ListenerId) -> Option<&dyn Listener> {
        self.lists
            .iter()
            .flat_map(|list| list.iter())
            .find(|(lid, _)| *lid == id)
            .map(|(_, l)| l.as_ref())
    }

    pub(crate) fn get_mut(&mut self, id: ListenerId) -> Option<&mut dyn Listener> {
        for list in self.lists.iter_mut() {
            if let Some((_, l)) = list.iter_mut().find(|(lid, _)| *lid == id) {
                return Some(l.as_mut());
            }
        }
        None
    }

    pub(crate) fn is_empty(&self, category: ListenerCategory) -> bool {
        self.lists[category.index()].is_empty()
    }

    pub(crate) fn len(&self) -> usize {
        self.lists.iter().map(Vec::len).sum()
    }

    /// Deliver `event` to every listener of its category, stopping at the
    /// first failure.
    pub(crate) fn dispatch(&mut self, round: Round, event: &TopologyEvent) -> anyhow::Result<()> {
        for (_, listener) in self.lists[event.category().index()].iter_mut() {
            listener.on_event(round, event)?;
        }
        Ok(())
    }
}
