//! topsim demo CLI
//!
//! Runs a headless random-walk scenario: a stationary sink in the middle
//! of the area, a few stationary beacons broadcasting periodically, and
//! a crowd of random walkers whose movement keeps reshaping the wireless
//! links between them.
//!
//! # Example
//!
//! ```bash
//! # Defaults: 20 nodes, 200 rounds, synchronous messaging
//! topsim --seed 42
//!
//! # Scenario file plus a trace dump
//! RUST_LOG=topsim=debug topsim --config scenarios/random_walk.toml -n 30 -r 500 --trace run.jsonl
//! ```

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::info;
use tracing_subscriber::EnvFilter;

use topsim::config::ResolverConfig;
use topsim::node::{Beacon, RandomWalker, Sink};
use topsim::{ListenerCategory, NodeId, Payload, SimulationConfig, TopologyBuilder, TraceRecorder};

/// topsim demo
///
/// Deterministic for a given seed and configuration.
#[derive(Parser, Debug)]
#[command(name = "topsim")]
#[command(version, about, long_about = None)]
struct Args {
    /// Scenario file (TOML). Command-line values fill in the rest.
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Number of nodes, sink and beacons included
    #[arg(short = 'n', long, default_value = "20")]
    nodes: u64,

    /// Number of beacons among the nodes
    #[arg(short = 'b', long, default_value = "3")]
    beacons: u64,

    /// Rounds between two beacon broadcasts
    #[arg(long, default_value = "5")]
    beacon_period: u64,

    /// Rounds to simulate
    #[arg(short = 'r', long, default_value = "200")]
    rounds: u64,

    /// Walker speed in units per round
    #[arg(long, default_value = "4.0")]
    speed: f64,

    /// Area width, unless the scenario uses a torus
    #[arg(long, default_value = "400.0")]
    width: f64,

    /// Area height, unless the scenario uses a torus
    #[arg(long, default_value = "300.0")]
    height: f64,

    /// Random seed for placement and walkers. When omitted, a random seed is used.
    #[arg(long)]
    seed: Option<u64>,

    /// Write the event trace to this file as JSON lines
    #[arg(long)]
    trace: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn,topsim=info")),
        )
        .init();

    let args = Args::parse();
    anyhow::ensure!(args.nodes > args.beacons, "need more nodes than beacons (one node is the sink)");

    let config = match &args.config {
        Some(path) => SimulationConfig::load(path)?,
        None => SimulationConfig::default(),
    };
    let (width, height) = match config.resolver {
        ResolverConfig::Toroidal { width, height } => (width, height),
        ResolverConfig::Euclidean => (args.width, args.height),
    };
    anyhow::ensure!(width > 0.0 && height > 0.0, "area must be non-empty, got {} x {}", width, height);
    anyhow::ensure!(args.beacon_period > 0, "beacon period must be at least 1");
    let seed = args.seed.unwrap_or_else(rand::random);

    info!(
        nodes = args.nodes,
        beacons = args.beacons,
        rounds = args.rounds,
        width,
        height,
        seed,
        messaging = ?config.messaging,
        "starting simulation"
    );

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut builder = TopologyBuilder::from_config(config).node_with(0, width / 2.0, height / 2.0, Sink::new());
    for id in 1..args.nodes {
        let (x, y) = (rng.gen_range(0.0..width), rng.gen_range(0.0..height));
        builder = if id <= args.beacons {
            let payload = Payload::text(format!("beacon-{}", id));
            builder.node_with(id, x, y, Beacon::new(payload, args.beacon_period))
        } else {
            let walker = RandomWalker::new(args.speed, width, height, rng.gen())?;
            builder.node_with(id, x, y, walker)
        };
    }

    let recorder = args.trace.as_ref().map(|_| TraceRecorder::default());
    if let Some(recorder) = &recorder {
        for category in ListenerCategory::ALL {
            builder = builder.listener(category, recorder.clone());
        }
    }
    let mut topology = builder.build().context("building topology")?;

    topology.start()?;
    let executed = topology.run(args.rounds)?;

    let stats = topology.message_engine().stats();
    let received = topology
        .behavior::<Sink>(NodeId::new(0))
        .map(|sink| sink.received.len())
        .unwrap_or(0);

    println!("═══════════════════════════════════════════════════════");
    println!("  topsim: random walk + beacons");
    println!("═══════════════════════════════════════════════════════");
    println!("  rounds executed    {}", executed);
    println!("  nodes              {}", topology.node_count());
    println!("  links              {} ({} wireless)", topology.link_count(), topology.wireless_links().len());
    println!("  engine             {}", topology.message_engine().name());
    println!("  delivered          {}", stats.delivered);
    println!("  dropped            {}", stats.dropped);
    println!("  retried            {}", stats.retried);
    println!("  in flight          {}", topology.message_engine().in_flight());
    println!("  sink received      {}", received);

    if let (Some(path), Some(recorder)) = (&args.trace, recorder) {
        let trace = recorder.trace();
        let file = path.to_string_lossy();
        trace
            .export_to_file(&file)
            .with_context(|| format!("writing trace to {}", file))?;
        println!("  trace              {} events, hash {:016x} → {}", trace.len(), trace.hash(), file);
    }

    Ok(())
}
