//! `AsyncMessageEngine`: random per-message delays.

use std::any::Any;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Exp};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::{SimError, SimResult};
use crate::message::Message;
use crate::node::NodeId;
use crate::topology::Topology;

use super::{attempt, DeliveryOutcome, DeliveryStats, MessageEngine};

/// Ordering guarantee between messages of the same `(sender, recipient)`
/// pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryOrder {
    /// Never overtake an earlier message on the same pair.
    #[default]
    Fifo,
    /// Independent delays; messages may arrive out of order.
    NonFifo,
}

#[derive(Debug, Clone)]
struct InFlight {
    message: Message,
    recipient: NodeId,
    remaining: u64,
}

/// Delays each message by `floor(X)` rounds, `X ~ Exp(1 / mean_delay)`.
///
/// A message whose delay has elapsed is delivered only if a link from
/// its sender to its recipient exists at that moment; otherwise it is
/// dropped, or kept (and retried every round) when sent with retry.
/// Broadcasts are expanded to the sender's out-neighbors when the
/// engine picks them up.
///
/// The RNG is seeded, so a run is reproducible given the same topology
/// and seed.
#[derive(Debug, Clone)]
pub struct AsyncMessageEngine {
    mean_delay: f64,
    order: DeliveryOrder,
    seed: u64,
    distribution: Exp<f64>,
    rng: ChaCha8Rng,
    in_flight: Vec<InFlight>,
    stats: DeliveryStats,
}

impl AsyncMessageEngine {
    /// `mean_delay` is in rounds and must be finite and positive.
    pub fn new(mean_delay: f64, order: DeliveryOrder, seed: u64) -> SimResult<Self> {
        if !(mean_delay.is_finite() && mean_delay > 0.0) {
            return Err(SimError::InvalidConfig(format!(
                "mean delay must be finite and positive, got {}",
                mean_delay
            )));
        }
        let distribution = Exp::new(1.0 / mean_delay)
            .map_err(|e| SimError::InvalidConfig(format!("mean delay {}: {}", mean_delay, e)))?;
        Ok(AsyncMessageEngine {
            mean_delay,
            order,
            seed,
            distribution,
            rng: ChaCha8Rng::seed_from_u64(seed),
            in_flight: Vec::new(),
            stats: DeliveryStats::default(),
        })
    }

    pub fn mean_delay(&self) -> f64 {
        self.mean_delay
    }

    pub fn order(&self) -> DeliveryOrder {
        self.order
    }

    fn draw_delay(&mut self, sender: NodeId, recipient: NodeId) -> u64 {
        let draw = self.distribution.sample(&mut self.rng).floor() as u64;
        match self.order {
            DeliveryOrder::NonFifo => draw,
            DeliveryOrder::Fifo => self
                .in_flight
                .iter()
                .filter(|f| f.message.sender() == sender && f.recipient == recipient)
                .map(|f| f.remaining)
                .fold(draw, u64::max),
        }
    }

    fn accept(&mut self, message: Message, recipient: NodeId) {
        let remaining = self.draw_delay(message.sender(), recipient);
        trace!(sender = %message.sender(), recipient = %recipient, remaining, "message in flight");
        self.in_flight.push(InFlight {
            message,
            recipient,
            remaining,
        });
    }
}

impl MessageEngine for AsyncMessageEngine {
    fn process_messages(&mut self, topology: &mut Topology) {
        for message in topology.drain_send_queues() {
            match message.destination() {
                Some(dest) => self.accept(message, dest),
                None => {
                    for dest in topology.neighbors(message.sender()) {
                        self.accept(message.clone(), dest);
                    }
                }
            }
        }

        // Pending order is acceptance order, which keeps equal-deadline
        // messages of one pair in FIFO order.
        let pending = std::mem::take(&mut self.in_flight);
        for mut flight in pending {
            if flight.remaining > 0 {
                flight.remaining -= 1;
                self.in_flight.push(flight);
                continue;
            }
            let outcome = attempt(topology, &flight.message, flight.recipient);
            self.stats.record(outcome);
            if outcome == DeliveryOutcome::Retried {
                self.in_flight.push(flight);
            }
        }
    }

    fn reset(&mut self) {
        self.rng = ChaCha8Rng::seed_from_u64(self.seed);
        self.in_flight.clear();
        self.stats = DeliveryStats::default();
    }

    fn stats(&self) -> DeliveryStats {
        self.stats
    }

    fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    fn name(&self) -> &'static str {
        match self.order {
            DeliveryOrder::Fifo => "async-fifo",
            DeliveryOrder::NonFifo => "async",
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_non_positive_mean() {
        for mean in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                AsyncMessageEngine::new(mean, DeliveryOrder::Fifo, 1),
                Err(SimError::InvalidConfig(_))
            ));
        }
    }

    #[test]
    fn test_fifo_delay_never_below_pending() {
        let mut engine = AsyncMessageEngine::new(5.0, DeliveryOrder::Fifo, 7).unwrap();
        let (a, b) = (NodeId::new(0), NodeId::new(1));
        let mut last = 0;
        for _ in 0..200 {
            let d = engine.draw_delay(a, b);
            assert!(d >= last);
            last = d;
            engine.in_flight.push(InFlight {
                message: Message::new(a, Some(b), crate::message::Payload::Empty, crate::time::Round::ZERO, false),
                recipient: b,
                remaining: d,
            });
        }
    }

    #[test]
    fn test_mean_delay_is_roughly_respected() {
        let mut engine = AsyncMessageEngine::new(4.0, DeliveryOrder::NonFifo, 99).unwrap();
        let n = 5_000;
        let total: u64 = (0..n).map(|_| engine.draw_delay(NodeId::new(0), NodeId::new(1))).sum();
        let mean = total as f64 / n as f64;
        // floor(Exp(mean 4)) has mean ~3.52.
        assert!((3.0..4.0).contains(&mean), "mean {}", mean);
    }
}
