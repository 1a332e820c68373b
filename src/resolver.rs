//! Wireless connectivity policies.
//!
//! A [`LinkResolver`] answers one question: can `to` hear `from`? The
//! topology asks it for every pair of wireless-enabled nodes once per
//! round and derives the set of wireless links from the answers.

use crate::error::{SimError, SimResult};
use crate::node::Node;

/// Decides whether a wireless transmission from one node reaches another.
///
/// Implementations must be pure: the answer may depend only on the two
/// nodes and on immutable configuration held by the resolver.
pub trait LinkResolver {
    /// Whether `to` can hear a transmission from `from`.
    fn is_heard_by(&self, from: &Node, to: &Node) -> bool;

    /// Return `true` if `is_heard_by(a, b) == is_heard_by(b, a)` for every
    /// pair, letting the topology skip the reverse query.
    fn is_symmetric(&self) -> bool {
        false
    }

    fn name(&self) -> &'static str;
}

/// Distance-based resolver: `to` hears `from` when both are wireless and
/// `to` is strictly within `from`'s communication range.
///
/// Asymmetric whenever ranges differ.
#[derive(Debug, Clone, Copy, Default)]
pub struct EuclideanResolver;

impl LinkResolver for EuclideanResolver {
    fn is_heard_by(&self, from: &Node, to: &Node) -> bool {
        from.is_wireless_enabled()
            && to.is_wireless_enabled()
            && from.distance(to) < from.communication_range()
    }

    fn name(&self) -> &'static str {
        "euclidean"
    }
}

/// Like [`EuclideanResolver`] but on a `width × height` torus: distances
/// are measured along the shorter way around each axis.
#[derive(Debug, Clone, Copy)]
pub struct ToroidalResolver {
    width: f64,
    height: f64,
}

impl ToroidalResolver {
    pub fn new(width: f64, height: f64) -> SimResult<Self> {
        if !(width.is_finite() && width > 0.0 && height.is_finite() && height > 0.0) {
            return Err(SimError::InvalidConfig(format!(
                "torus dimensions must be positive, got {} x {}",
                width, height
            )));
        }
        Ok(ToroidalResolver { width, height })
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }
}

impl LinkResolver for ToroidalResolver {
    fn is_heard_by(&self, from: &Node, to: &Node) -> bool {
        from.is_wireless_enabled()
            && to.is_wireless_enabled()
            && from.location().toroidal_distance(&to.location(), self.width, self.height)
                < from.communication_range()
    }

    fn name(&self) -> &'static str {
        "toroidal"
    }
}
