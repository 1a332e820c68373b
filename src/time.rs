/// Discrete simulation time.
///
/// A `Round` counts completed clock ticks. Time never advances on its
/// own: only `Topology::tick` moves it forward, one round at a time.

use serde::{Deserialize, Serialize};

/// A round number in simulation time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Round(u64);

impl Round {
    /// The first round of every simulation.
    pub const ZERO: Round = Round(0);

    #[inline]
    pub fn new(round: u64) -> Self {
        Round(round)
    }

    /// Return the raw round number.
    #[inline]
    pub fn get(self) -> u64 {
        self.0
    }

    /// The round immediately after this one.
    ///
    /// Saturates at `u64::MAX`; a simulation will never get there.
    #[inline]
    pub fn next(self) -> Round {
        Round(self.0.saturating_add(1))
    }

    /// The round `delay` rounds after this one, saturating.
    #[inline]
    pub fn after(self, delay: u64) -> Round {
        Round(self.0.saturating_add(delay))
    }

    /// Number of rounds elapsed since `earlier`, or `None` if `earlier`
    /// lies in the future.
    #[inline]
    pub fn since(self, earlier: Round) -> Option<u64> {
        self.0.checked_sub(earlier.0)
    }
}

impl From<u64> for Round {
    fn from(round: u64) -> Self {
        Round(round)
    }
}

impl std::fmt::Display for Round {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "R{}", self.0)
    }
}
