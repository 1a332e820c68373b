//! `RandomWalker`: seeded random movement.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::error::{SimError, SimResult};
use crate::geometry::Point;

use crate::node::behavior::Behavior;
use crate::node::context::NodeContext;

/// Moves `speed` units per round, turning by a random angle in
/// `[-max_turn, max_turn]` before each step. Positions are clamped to a
/// `width × height` area anchored at the origin; a walker that hits an
/// edge turns around.
///
/// Seeded, so two walkers built with the same seed walk the same path.
#[derive(Debug, Clone)]
pub struct RandomWalker {
    speed: f64,
    max_turn: f64,
    width: f64,
    height: f64,
    seed: u64,
    rng: ChaCha8Rng,
    pub steps: u64,
}

impl RandomWalker {
    /// `speed` must be finite and non-negative; `width` and `height`
    /// finite and positive.
    pub fn new(speed: f64, width: f64, height: f64, seed: u64) -> SimResult<Self> {
        if !speed.is_finite() || speed < 0.0 {
            return Err(SimError::InvalidConfig(format!("walker speed must be finite and >= 0, got {}", speed)));
        }
        if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
            return Err(SimError::InvalidConfig(format!(
                "walker area must be finite and non-empty, got {} x {}",
                width, height
            )));
        }
        Ok(RandomWalker {
            speed,
            max_turn: std::f64::consts::FRAC_PI_4,
            width,
            height,
            seed,
            rng: ChaCha8Rng::seed_from_u64(seed),
            steps: 0,
        })
    }

    pub fn with_max_turn(mut self, radians: f64) -> SimResult<Self> {
        if !radians.is_finite() {
            return Err(SimError::InvalidConfig(format!("walker max turn must be finite, got {}", radians)));
        }
        self.max_turn = radians.abs();
        Ok(self)
    }

    fn clamp(&self, p: Point) -> (Point, bool) {
        let x = p.x.clamp(0.0, self.width);
        let y = p.y.clamp(0.0, self.height);
        let bounced = x != p.x || y != p.y;
        (Point::with_z(x, y, p.z), bounced)
    }
}

impl Behavior for RandomWalker {
    fn on_start(&mut self, _ctx: &mut NodeContext<'_>) -> anyhow::Result<()> {
        self.rng = ChaCha8Rng::seed_from_u64(self.seed);
        self.steps = 0;
        Ok(())
    }

    fn on_clock(&mut self, ctx: &mut NodeContext<'_>) -> anyhow::Result<()> {
        ctx.clear_mailbox()?;
        let turn = if self.max_turn > 0.0 {
            self.rng.gen_range(-self.max_turn..=self.max_turn)
        } else {
            0.0
        };
        let heading = ctx.direction()? + turn;
        let target = ctx.location()?.translated(heading, self.speed);
        let (target, bounced) = self.clamp(target);
        ctx.set_direction(if bounced { heading + std::f64::consts::PI } else { heading })?;
        ctx.move_to(target)?;
        self.steps += 1;
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Node;
    use crate::topology::Topology;

    fn walk(seed: u64) -> Vec<Point> {
        let mut topo = Topology::new();
        let id = topo
            .add_node(Node::at(50.0, 50.0).with_behavior(RandomWalker::new(5.0, 100.0, 100.0, seed).unwrap()))
            .unwrap();
        (0..20)
            .map(|_| {
                topo.tick().unwrap();
                topo.node(id).unwrap().location()
            })
            .collect()
    }

    #[test]
    fn test_same_seed_same_path() {
        assert_eq!(walk(3), walk(3));
        assert_ne!(walk(3), walk(4));
    }

    #[test]
    fn test_walker_stays_in_area() {
        let mut topo = Topology::new();
        let id = topo
            .add_node(Node::at(1.0, 1.0).with_behavior(RandomWalker::new(10.0, 20.0, 20.0, 11).unwrap()))
            .unwrap();
        for _ in 0..200 {
            topo.tick().unwrap();
            let p = topo.node(id).unwrap().location();
            assert!((0.0..=20.0).contains(&p.x) && (0.0..=20.0).contains(&p.y));
        }
        assert_eq!(topo.behavior::<RandomWalker>(id).unwrap().steps, 200);
    }

    #[test]
    fn test_invalid_walker_rejected() {
        let bad = [
            RandomWalker::new(1.0, -5.0, 10.0, 0),
            RandomWalker::new(1.0, 10.0, f64::NAN, 0),
            RandomWalker::new(1.0, 0.0, 10.0, 0),
            RandomWalker::new(f64::INFINITY, 10.0, 10.0, 0),
            RandomWalker::new(-1.0, 10.0, 10.0, 0),
            RandomWalker::new(1.0, 10.0, 10.0, 0).and_then(|w| w.with_max_turn(f64::INFINITY)),
            RandomWalker::new(1.0, 10.0, 10.0, 0).and_then(|w| w.with_max_turn(f64::NAN)),
        ];
        for result in bad {
            assert!(matches!(result, Err(SimError::InvalidConfig(_))));
        }
        assert!(RandomWalker::new(0.0, 10.0, 10.0, 0).and_then(|w| w.with_max_turn(-1.0)).is_ok());
    }

    #[test]
    fn test_walker_drains_mailbox() {
        let mut topo = Topology::new();
        let walker = RandomWalker::new(0.0, 100.0, 100.0, 5).unwrap();
        let w = topo.add_node(Node::at(50.0, 50.0).with_behavior(walker)).unwrap();
        let beacon = crate::node::Beacon::new(crate::message::Payload::text("ping"), 1);
        topo.add_node(Node::at(60.0, 50.0).with_behavior(beacon)).unwrap();
        topo.start().unwrap();
        topo.run(5).unwrap();
        assert!(topo.node(w).unwrap().mailbox().is_empty());
        assert_eq!(topo.message_engine().stats().delivered, 4);
    }
}
