//! # VOIDGROW Simulation
//!
//! Headless run of the expansion engine against in-memory worlds.
//!
//! ```bash
//! # data/ holds world.toml, expansion.toml and biome_rules.toml
//! voidgrow_sim data 32
//!
//! # more detail
//! RUST_LOG=voidgrow_expansion=debug voidgrow_sim
//! ```
//!
//! A player thread keeps asking for tiles on the frontier, one at a time,
//! while the world loop ticks on its own thread. The ledger is saved to
//! `<data>/save/ledger.json`, so a second run continues where the first
//! stopped.

use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{bounded, Sender};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use voidgrow::core::{LedgerStore, TierId};
use voidgrow::expansion::{
    EnqueueResult, ExpansionConfig, ExpansionEvent, ExpansionHandle, ExpansionManager, ExpansionRequest, Requester,
};
use voidgrow::rules::{BiomeRuleResolver, RuleSet, TierRegistry};
use voidgrow::{
    BuiltWorld, EventBus, HostError, HostResult, SharedSnapshot, WorldEvent, WorldLoop, WorldLoopConfig, WorldSetup,
};

const DEFAULT_REQUESTS: usize = 16;
const EVENT_CAPACITY: usize = 4096;
const POLL_INTERVAL: Duration = Duration::from_millis(10);
/// Give up waiting on the world after this many polls.
const MAX_POLLS: u32 = 6000;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

fn main() {
    init_tracing();
    if let Err(err) = run() {
        error!("voidgrow_sim failed: {err}");
        std::process::exit(1);
    }
}

fn run() -> HostResult<()> {
    let mut args = std::env::args().skip(1);
    let data_dir = PathBuf::from(args.next().unwrap_or_else(|| "data".to_owned()));
    let requests = args
        .next()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(DEFAULT_REQUESTS);

    let setup = WorldSetup::from_file(&data_dir.join("world.toml"))?;
    let BuiltWorld {
        palette,
        categories,
        main,
        sources,
    } = setup.build()?;

    let expansion_path = data_dir.join("expansion.toml");
    let config = ExpansionConfig::from_file(&expansion_path)?;
    let loop_config = WorldLoopConfig::from_file(&expansion_path)?;

    let rules_path = data_dir.join("biome_rules.toml");
    let tiers = TierRegistry::from_file(&rules_path)?;
    let pooled: Vec<TierId> = tiers.iter().filter(|t| t.pooled).map(|t| t.id.clone()).collect();
    let rules = RuleSet::from_file(&rules_path, &tiers)?;
    let mut resolver = BiomeRuleResolver::new(tiers);
    resolver.install(rules);

    let store = LedgerStore::new(data_dir.join("save").join("ledger.json"));
    let ledger = store.load_or_default();
    let world_id = config.world_id.clone();
    let manager = ExpansionManager::new(config, setup.seed, ledger, resolver, categories, palette);

    let bus = EventBus::new(EVENT_CAPACITY);
    let events = bus.receiver();
    let mut world = WorldLoop::new(manager, main, sources, bus.hooks(), Some(store), loop_config);
    let seeded = world.start();
    info!("Queued {seeded} starting tiles");

    let (shutdown_tx, shutdown_rx) = bounded(1);
    let handle = world.handle();
    let snapshot = world.snapshot();
    let player = thread::Builder::new()
        .name("player".to_owned())
        .spawn(move || play(&handle, &snapshot, &world_id, &pooled, requests, &shutdown_tx))
        .map_err(|source| HostError::Io {
            path: "player thread".to_owned(),
            source,
        })?;

    world.run(&shutdown_rx)?;
    if player.join().is_err() {
        warn!("Player thread panicked");
    }

    let final_snapshot = world.snapshot().read();
    let mut expanded = 0;
    let mut cascades = 0;
    let mut notices = 0;
    for event in events.drain() {
        match event {
            WorldEvent::Expansion(ExpansionEvent::TileExpanded { .. }) => expanded += 1,
            WorldEvent::Expansion(ExpansionEvent::StructureCascade { .. }) => cascades += 1,
            WorldEvent::Notice { .. } => notices += 1,
            WorldEvent::MarkerConsumed(_) | WorldEvent::MobsSeeded { .. } => {}
        }
    }

    println!("═══════════════════════════════════════════════════════════════════");
    println!("                      VOIDGROW SIMULATION");
    println!("═══════════════════════════════════════════════════════════════════");
    println!("  Ticks:            {}", final_snapshot.tick);
    println!("  Playable tiles:   {}", final_snapshot.ledger.occupied_count);
    println!("  Frontier tiles:   {}", final_snapshot.ledger.frontier.len());
    println!("  Completed:        {}", final_snapshot.stats.completed);
    println!("  Failed:           {}", final_snapshot.stats.failed);
    println!("  Rejected:         {}", final_snapshot.stats.rejected);
    println!("  Cascaded:         {}", final_snapshot.stats.cascaded);
    println!("  Events:           {expanded} expanded, {cascades} cascades, {notices} notices");
    println!("  Stored tiles:     {}", world.main().stored_tiles());
    println!("═══════════════════════════════════════════════════════════════════");
    Ok(())
}

/// Polls until the world has nothing queued or running.
fn wait_for_idle(snapshot: &SharedSnapshot, after_tick: u64) -> bool {
    for _ in 0..MAX_POLLS {
        let current = snapshot.read();
        if current.tick > after_tick && current.queued == 0 && current.active.is_none() {
            return true;
        }
        thread::sleep(POLL_INTERVAL);
    }
    false
}

/// Requests `count` frontier tiles, cycling through the pooled tiers, then
/// asks the world loop to stop.
fn play(
    handle: &ExpansionHandle,
    snapshot: &SharedSnapshot,
    world_id: &str,
    tiers: &[TierId],
    count: usize,
    shutdown: &Sender<()>,
) {
    let player = Requester::player(1, "sim");
    let mut issued = 0;

    if wait_for_idle(snapshot, 0) && !tiers.is_empty() {
        while issued < count {
            let current = snapshot.read();
            let Some(&tile) = current.ledger.expandable.get(issued % current.ledger.expandable.len().max(1)) else {
                warn!("Nothing left to expand");
                break;
            };
            let tier = tiers[issued % tiers.len()].clone();
            let request = ExpansionRequest::new(world_id, tier, tile).with_requester(player.clone());
            match handle.enqueue(request) {
                EnqueueResult::Accepted => info!("Requested {tile}"),
                EnqueueResult::Rejected(reason) => warn!("Request for {tile} refused: {reason}"),
            }
            issued += 1;
            // One full tick must pass after the send before idle means done.
            if !wait_for_idle(snapshot, current.tick + 1) {
                warn!("World did not settle; stopping early");
                break;
            }
        }
    }

    info!("Issued {issued} requests; shutting down");
    // The loop also stops if this sender is dropped.
    let _ = shutdown.send(());
}
