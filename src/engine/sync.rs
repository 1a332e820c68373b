//! `SyncMessageEngine`: one round of latency, no reordering.

use std::any::Any;

use crate::topology::Topology;

use super::{attempt, DeliveryOutcome, DeliveryStats, MessageEngine};

/// Delivers every queued message at the start of the next round.
///
/// Send-queues are drained in node registration order, each queue in
/// FIFO order, so messages from the same sender arrive in the order they
/// were sent. A broadcast goes to the sender's out-neighbors as they are
/// at delivery time.
#[derive(Debug, Clone, Default)]
pub struct SyncMessageEngine {
    stats: DeliveryStats,
}

impl SyncMessageEngine {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MessageEngine for SyncMessageEngine {
    fn process_messages(&mut self, topology: &mut Topology) {
        for message in topology.drain_send_queues() {
            match message.destination() {
                Some(dest) => {
                    let outcome = attempt(topology, &message, dest);
                    self.stats.record(outcome);
                    if outcome == DeliveryOutcome::Retried {
                        topology.requeue(message);
                    }
                }
                None => {
                    for dest in topology.neighbors(message.sender()) {
                        self.stats.record(attempt(topology, &message, dest));
                    }
                }
            }
        }
    }

    fn reset(&mut self) {
        self.stats = DeliveryStats::default();
    }

    fn stats(&self) -> DeliveryStats {
        self.stats
    }

    fn name(&self) -> &'static str {
        "sync"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
