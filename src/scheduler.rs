//! Round-based scheduler.
//!
//! The [`Scheduler`] owns the round counter, the run state and the
//! periodic clock listeners of one topology. The round loop itself is
//! implemented on [`Topology`] (`tick`, `run`, `start`, ...) because
//! every phase needs mutable access to the whole topology.
//!
//! ```text
//!   tick()
//!     ├─ advance clock-listener countdowns
//!     ├─ (a) message engine → mailboxes → on_message
//!     ├─ (b) on_pre_clock   ┐
//!     ├─ (c) on_clock       ├ every node, registration order
//!     ├─ (d) on_post_clock  ┘
//!     ├─ (e) wireless reconciliation, sensing
//!     ├─ (f) due clock listeners
//!     └─ round += 1
//! ```

use std::any::Any;

use tracing::{debug, trace};

use crate::engine::{MessageEngine, SyncMessageEngine};
use crate::error::{SimError, SimResult};
use crate::event::TopologyEvent;
use crate::time::Round;
use crate::topology::Topology;

// ── Phase & state ─────────────────────────────────────────────────────

/// The callback being executed when a behavior failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Init,
    Start,
    Message,
    PreClock,
    Clock,
    PostClock,
    SensingIn,
    SensingOut,
    Selection,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Phase::Init => "on_init",
            Phase::Start => "on_start",
            Phase::Message => "on_message",
            Phase::PreClock => "on_pre_clock",
            Phase::Clock => "on_clock",
            Phase::PostClock => "on_post_clock",
            Phase::SensingIn => "on_sensing_in",
            Phase::SensingOut => "on_sensing_out",
            Phase::Selection => "on_selection",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunState {
    /// Never started (or built but not yet launched).
    #[default]
    Stopped,
    Running,
    Paused,
}

// ── Clock listeners ───────────────────────────────────────────────────

/// A periodic callback invoked at the end of every `period`-th round.
pub trait ClockListener: Any {
    fn on_clock(&mut self, topology: &mut Topology) -> anyhow::Result<()>;

    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Adapts a closure into a [`ClockListener`].
pub struct FnClockListener<F>(pub F);

impl<F> ClockListener for FnClockListener<F>
where
    F: FnMut(&mut Topology) -> anyhow::Result<()> + 'static,
{
    fn on_clock(&mut self, topology: &mut Topology) -> anyhow::Result<()> {
        (self.0)(topology)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClockListenerId(u64);

impl std::fmt::Display for ClockListenerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "C{}", self.0)
    }
}

struct ClockEntry {
    id: ClockListenerId,
    period: u64,
    countdown: u64,
    /// `None` while the listener is executing.
    listener: Option<Box<dyn ClockListener>>,
}

// ── Scheduler ─────────────────────────────────────────────────────────

/// Round counter, run state and clock-listener registry.
#[derive(Default)]
pub struct Scheduler {
    round: Round,
    state: RunState,
    entries: Vec<ClockEntry>,
    next_id: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn round(&self) -> Round {
        self.round
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == RunState::Running
    }

    /// Number of registered clock listeners.
    pub fn listener_count(&self) -> usize {
        self.entries.len()
    }

    /// Register `listener` to run every `period` rounds. The first call
    /// happens at the end of round `period - 1`.
    pub fn add_listener(&mut self, listener: Box<dyn ClockListener>, period: u64) -> SimResult<ClockListenerId> {
        if period == 0 {
            return Err(SimError::InvalidConfig(
                "clock listener period must be at least 1".into(),
            ));
        }
        let id = ClockListenerId(self.next_id);
        self.next_id += 1;
        self.entries.push(ClockEntry {
            id,
            period,
            countdown: period,
            listener: Some(listener),
        });
        Ok(id)
    }

    pub fn remove_listener(&mut self, id: ClockListenerId) -> Option<Box<dyn ClockListener>> {
        let pos = self.entries.iter().position(|e| e.id == id)?;
        self.entries.remove(pos).listener
    }

    pub fn listener<T: ClockListener>(&self, id: ClockListenerId) -> Option<&T> {
        self.entries
            .iter()
            .find(|e| e.id == id)?
            .listener
            .as_ref()?
            .as_any()
            .downcast_ref::<T>()
    }

    /// Decrement every countdown; return the listeners that became due,
    /// in registration order, with their countdown reset to the period.
    pub(crate) fn advance_countdowns(&mut self) -> Vec<ClockListenerId> {
        let mut due = Vec::new();
        for entry in self.entries.iter_mut() {
            entry.countdown = entry.countdown.saturating_sub(1);
            if entry.countdown == 0 {
                entry.countdown = entry.period;
                due.push(entry.id);
            }
        }
        due
    }

    /// Zero the round counter and restore every countdown.
    pub(crate) fn reset_time(&mut self) {
        self.round = Round::ZERO;
        for entry in self.entries.iter_mut() {
            entry.countdown = entry.period;
        }
    }

    pub(crate) fn increment(&mut self) {
        self.round = self.round.next();
    }

    pub(crate) fn set_state(&mut self, state: RunState) {
        self.state = state;
    }

    fn take_listener(&mut self, id: ClockListenerId) -> Option<Box<dyn ClockListener>> {
        self.entries.iter_mut().find(|e| e.id == id)?.listener.take()
    }

    fn restore_listener(&mut self, id: ClockListenerId, listener: Box<dyn ClockListener>) {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.id == id) {
            entry.listener = Some(listener);
        }
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("round", &self.round)
            .field("state", &self.state)
            .field("clock_listeners", &self.entries.len())
            .finish()
    }
}

// ── Execution control ─────────────────────────────────────────────────

impl Topology {
    /// The current round.
    pub fn time(&self) -> Round {
        self.scheduler.round()
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn run_state(&self) -> RunState {
        self.scheduler.state()
    }

    /// Register a periodic clock listener. `period == 0` is rejected.
    pub fn add_clock_listener(
        &mut self,
        listener: impl ClockListener,
        period: u64,
    ) -> SimResult<ClockListenerId> {
        self.scheduler.add_listener(Box::new(listener), period)
    }

    pub fn remove_clock_listener(&mut self, id: ClockListenerId) -> Option<Box<dyn ClockListener>> {
        self.scheduler.remove_listener(id)
    }

    /// Execute one round.
    ///
    /// Not reentrant: calling `tick` from inside a callback of the same
    /// topology runs a nested round and breaks the phase order.
    pub fn tick(&mut self) -> SimResult<()> {
        let round = self.time();
        trace!(%round, "tick");
        let due = self.scheduler.advance_countdowns();

        // (a) delivery
        self.process_messages();
        let delivered = std::mem::take(&mut self.delivered);
        for (recipient, message) in delivered {
            if self.contains_node(recipient) {
                self.invoke(recipient, Phase::Message, |b, ctx| b.on_message(ctx, &message))?;
            }
        }

        // (b) (c) (d)
        for phase in [Phase::PreClock, Phase::Clock, Phase::PostClock] {
            for id in self.order.clone() {
                if !self.contains_node(id) {
                    continue;
                }
                self.invoke(id, phase, |b, ctx| match phase {
                    Phase::PreClock => b.on_pre_clock(ctx),
                    Phase::PostClock => b.on_post_clock(ctx),
                    _ => b.on_clock(ctx),
                })?;
            }
        }

        // (e)
        if self.wireless_enabled {
            self.update_wireless_links()?;
        }
        self.update_sensing()?;

        // (f)
        for id in due {
            let Some(mut listener) = self.scheduler.take_listener(id) else {
                continue;
            };
            let result = listener.on_clock(self);
            self.scheduler.restore_listener(id, listener);
            result.map_err(|source| SimError::ClockListener { round, listener: id, source })?;
        }

        self.scheduler.increment();
        Ok(())
    }

    /// Tick up to `max_rounds` times while the simulation is running.
    /// Returns the number of rounds executed; stops early when a
    /// callback pauses the simulation.
    pub fn run(&mut self, max_rounds: u64) -> SimResult<u64> {
        let mut executed = 0;
        while executed < max_rounds && self.scheduler.is_running() {
            self.tick()?;
            executed += 1;
        }
        debug!(executed, round = %self.time(), "run finished");
        Ok(executed)
    }

    /// Switch to `Running`, fire `Started` and call `on_start` on every
    /// node. Does nothing if already running.
    pub fn start(&mut self) -> SimResult<()> {
        if self.scheduler.is_running() {
            return Ok(());
        }
        self.scheduler.set_state(RunState::Running);
        self.emit(TopologyEvent::Started)?;
        self.start_all()
    }

    pub fn pause(&mut self) -> SimResult<()> {
        if self.scheduler.state() != RunState::Running {
            return Ok(());
        }
        self.scheduler.set_state(RunState::Paused);
        self.emit(TopologyEvent::Paused)
    }

    pub fn resume(&mut self) -> SimResult<()> {
        if self.scheduler.state() != RunState::Paused {
            return Ok(());
        }
        self.scheduler.set_state(RunState::Running);
        self.emit(TopologyEvent::Resumed)
    }

    /// Zero the round counter and restore every clock-listener countdown.
    /// Registrations are kept.
    pub fn reset_time(&mut self) {
        self.scheduler.reset_time();
    }

    /// Reset time, empty every mailbox and send-queue, reset the message
    /// engine, fire `Reset` and call `on_start` on every node.
    pub fn restart(&mut self) -> SimResult<()> {
        self.scheduler.reset_time();
        for node in self.nodes.values_mut() {
            node.mailbox.clear();
            node.send_queue.clear();
        }
        self.delivered.clear();
        self.engine.reset();
        self.emit(TopologyEvent::Reset)?;
        self.start_all()
    }

    fn start_all(&mut self) -> SimResult<()> {
        for id in self.order.clone() {
            if self.contains_node(id) {
                self.invoke(id, Phase::Start, |b, ctx| b.on_start(ctx))?;
            }
        }
        Ok(())
    }

    fn process_messages(&mut self) {
        let placeholder: Box<dyn MessageEngine> = Box::new(SyncMessageEngine::new());
        let mut engine = std::mem::replace(&mut self.engine, placeholder);
        engine.process_messages(self);
        self.engine = engine;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Counter {
        calls: Vec<Round>,
    }

    impl ClockListener for Counter {
        fn on_clock(&mut self, topology: &mut Topology) -> anyhow::Result<()> {
            self.calls.push(topology.time());
            Ok(())
        }
        fn as_any(&self) -> &dyn Any {
            self
        }
        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    #[test]
    fn test_zero_period_rejected() {
        let mut sched = Scheduler::new();
        let r = sched.add_listener(Box::new(Counter::default()), 0);
        assert!(matches!(r, Err(SimError::InvalidConfig(_))));
    }

    #[test]
    fn test_countdowns_fire_on_period() {
        let mut sched = Scheduler::new();
        let every = sched.add_listener(Box::new(Counter::default()), 1).unwrap();
        let third = sched.add_listener(Box::new(Counter::default()), 3).unwrap();

        let fired: Vec<Vec<ClockListenerId>> = (0..6).map(|_| sched.advance_countdowns()).collect();
        assert_eq!(fired[0], vec![every]);
        assert_eq!(fired[2], vec![every, third]);
        assert_eq!(fired[5], vec![every, third]);
        assert_eq!(fired[4], vec![every]);
    }

    #[test]
    fn test_clock_listener_period_in_topology() {
        let mut topo = Topology::new();
        let id = topo.add_clock_listener(Counter::default(), 3).unwrap();
        for _ in 0..9 {
            topo.tick().unwrap();
        }
        let counter = topo.scheduler().listener::<Counter>(id).unwrap();
        assert_eq!(counter.calls, vec![Round::new(2), Round::new(5), Round::new(8)]);
        assert_eq!(topo.time(), Round::new(9));
    }

    #[test]
    fn test_reset_time_restores_countdowns() {
        let mut topo = Topology::new();
        let id = topo.add_clock_listener(Counter::default(), 3).unwrap();
        topo.tick().unwrap();
        topo.tick().unwrap();
        topo.reset_time();
        assert_eq!(topo.time(), Round::ZERO);

        // Two more rounds would have fired the listener without the reset.
        topo.tick().unwrap();
        topo.tick().unwrap();
        assert!(topo.scheduler().listener::<Counter>(id).unwrap().calls.is_empty());
        topo.tick().unwrap();
        assert_eq!(topo.scheduler().listener::<Counter>(id).unwrap().calls, vec![Round::new(2)]);
    }

    #[test]
    fn test_clock_listener_error_reports_round() {
        let mut topo = Topology::new();
        let id = topo
            .add_clock_listener(
                FnClockListener(|t: &mut Topology| {
                    anyhow::ensure!(t.time() < Round::new(1), "late");
                    Ok(())
                }),
                1,
            )
            .unwrap();
        topo.tick().unwrap();
        match topo.tick() {
            Err(SimError::ClockListener { round, listener, .. }) => {
                assert_eq!(round, Round::new(1));
                assert_eq!(listener, id);
            }
            other => panic!("unexpected: {:?}", other),
        }
        // The listener survives its own failure.
        assert_eq!(topo.scheduler().listener_count(), 1);
    }

    #[test]
    fn test_run_only_ticks_while_running() {
        let mut topo = Topology::new();
        assert_eq!(topo.run(5).unwrap(), 0);
        topo.start().unwrap();
        assert_eq!(topo.run(5).unwrap(), 5);
        topo.pause().unwrap();
        assert_eq!(topo.run_state(), RunState::Paused);
        assert_eq!(topo.run(5).unwrap(), 0);
        topo.resume().unwrap();
        assert_eq!(topo.run(2).unwrap(), 2);
        assert_eq!(topo.time(), Round::new(7));
    }

    #[test]
    fn test_pause_from_clock_listener_stops_run() {
        let mut topo = Topology::new();
        topo.add_clock_listener(
            FnClockListener(|t: &mut Topology| {
                if t.time() == Round::new(3) {
                    t.pause()?;
                }
                Ok(())
            }),
            1,
        )
        .unwrap();
        topo.start().unwrap();
        assert_eq!(topo.run(100).unwrap(), 4);
        assert_eq!(topo.time(), Round::new(4));
    }
}
