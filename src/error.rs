//! Structured error types for the simulator.
//!
//! All fallible public APIs return `Result<T, SimError>`. Three families
//! exist:
//!
//! - **structural** errors: a mutation referenced a node or link that is
//!   not (or is already) part of the topology;
//! - **configuration** errors: a resolver, engine or scenario parameter
//!   was rejected at construction time;
//! - **callback** errors: a behavior, listener or clock listener returned
//!   an error. These carry the round and phase so that headless runs can
//!   stop with full context.
//!
//! Lost messages are not errors; engines count them instead.

use thiserror::Error;

use crate::event::{EventKind, ListenerCategory};
use crate::link::LinkId;
use crate::node::NodeId;
use crate::scheduler::{ClockListenerId, Phase};
use crate::time::Round;

/// The top-level error type.
#[derive(Debug, Error)]
pub enum SimError {
    // ── Structural errors ─────────────────────────────────

    /// A node ID was referenced but is not part of the topology.
    #[error("node {0} not found")]
    NodeNotFound(NodeId),

    /// A link ID was referenced but is not part of the topology.
    #[error("link {0} not found")]
    LinkNotFound(LinkId),

    /// Attempted to insert a node under an ID that is already in use.
    #[error("node {0} already exists")]
    DuplicateNode(NodeId),

    /// Attempted to create a link whose endpoint is not in the topology.
    #[error("cannot link {source_node} -> {destination}: endpoint {missing} is not in the topology")]
    EndpointMissing {
        source_node: NodeId,
        destination: NodeId,
        missing: NodeId,
    },

    /// Wireless links are derived by the link resolver only.
    #[error("wireless link {source_node} -> {destination} cannot be added explicitly")]
    WirelessLinkRequested { source_node: NodeId, destination: NodeId },

    // ── Configuration errors ──────────────────────────────

    /// A parameter was rejected at construction time.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A scenario file could not be read.
    #[error("cannot read configuration {path}: {source}")]
    ConfigRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A scenario file could not be parsed.
    #[error("cannot parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    // ── Callback errors ───────────────────────────────────

    /// A node behavior callback failed.
    #[error("behavior of node {node} failed in {phase} at {round}")]
    Behavior {
        round: Round,
        node: NodeId,
        phase: Phase,
        #[source]
        source: anyhow::Error,
    },

    /// A topology listener failed while handling an event.
    #[error("{category} listener failed on {event} at {round}")]
    Listener {
        round: Round,
        category: ListenerCategory,
        event: EventKind,
        #[source]
        source: anyhow::Error,
    },

    /// A periodic clock listener failed.
    #[error("clock listener {listener} failed at {round}")]
    ClockListener {
        round: Round,
        listener: ClockListenerId,
        #[source]
        source: anyhow::Error,
    },
}

impl SimError {
    /// Whether this error reports a structural misuse of the topology.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            SimError::NodeNotFound(_)
                | SimError::LinkNotFound(_)
                | SimError::DuplicateNode(_)
                | SimError::EndpointMissing { .. }
                | SimError::WirelessLinkRequested { .. }
        )
    }

    /// Whether this error was raised by user callback code.
    pub fn is_callback(&self) -> bool {
        matches!(
            self,
            SimError::Behavior { .. } | SimError::Listener { .. } | SimError::ClockListener { .. }
        )
    }

    /// The round during which a callback error happened, if any.
    pub fn round(&self) -> Option<Round> {
        match self {
            SimError::Behavior { round, .. }
            | SimError::Listener { round, .. }
            | SimError::ClockListener { round, .. } => Some(*round),
            _ => None,
        }
    }
}

/// Convenience alias for `Result<T, SimError>`.
pub type SimResult<T> = Result<T, SimError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_node_not_found() {
        let e = SimError::NodeNotFound(NodeId::new(5));
        assert_eq!(e.to_string(), "node N5 not found");
        assert!(e.is_structural());
        assert!(!e.is_callback());
    }

    #[test]
    fn test_error_display_endpoint_missing() {
        let e = SimError::EndpointMissing {
            source_node: NodeId::new(1),
            destination: NodeId::new(9),
            missing: NodeId::new(9),
        };
        let s = e.to_string();
        assert!(s.contains("N1 -> N9"));
        assert!(s.contains("endpoint N9"));
    }

    #[test]
    fn test_behavior_error_carries_context() {
        let e = SimError::Behavior {
            round: Round::new(12),
            node: NodeId::new(3),
            phase: Phase::Clock,
            source: anyhow::anyhow!("boom"),
        };
        assert_eq!(e.round(), Some(Round::new(12)));
        assert!(e.is_callback());
        let s = e.to_string();
        assert!(s.contains("N3"));
        assert!(s.contains("R12"));
        let source = std::error::Error::source(&e).map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("boom"));
    }

    #[test]
    fn test_error_is_std_error() {
        let e: Box<dyn std::error::Error> = Box::new(SimError::InvalidConfig("mean".into()));
        assert_eq!(e.to_string(), "invalid configuration: mean");
    }
}
