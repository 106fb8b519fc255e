//! End-to-end runs of the world loop on in-memory worlds.

use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use crossbeam_channel::bounded;
use voidgrow::core::{BlockPos, CategoryId, LedgerStore, PlayableAreaLedger, TileCoord, VoxelState};
use voidgrow::expansion::{
    EnqueueResult, ExpansionConfig, ExpansionEvent, ExpansionManager, ExpansionRequest, OriginMarker, Requester,
    RequesterNotice, TickOutcome,
};
use voidgrow::rules::{BiomeRuleResolver, RuleSet, TierRegistry};
use voidgrow::{
    BusHooks, EventBus, EventReceiver, MemorySources, MemoryWorld, WorldEvent, WorldLoop, WorldLoopConfig, WorldSetup,
};

const SETUP: &str = r#"
    seed = 4242
    min_y = 0
    max_y = 24

    [[block]]
    name = "bedrock"
    class = "bedrock"
    [[block]]
    name = "stone"
    [[block]]
    name = "dirt"
    [[block]]
    name = "grass_block"
    [[block]]
    name = "sand"
    [[block]]
    name = "tall_grass"
    class = "foliage"

    [[category]]
    id = "plains"
    tags = ["is_common"]
    [category.terrain]
    foliage = "tall_grass"
    foliage_chance = 50

    [[category]]
    id = "desert"
    tags = ["is_common", "hot"]
    [category.terrain]
    subsurface = "sand"
    surface = "sand"

    [[structure]]
    category = "plains"
    id = "village"
    start = [2, 0]
    min = [1, 0]
    max = [2, 0]
"#;

const RULES: &str = r#"
    [[tier]]
    id = "copper"
    legacy_tags = ["is_common"]

    [[rule]]
    id = "plains_sheep"
    allow = ["plains"]
    tier = "copper"
    [[rule.spawn]]
    entity = "sheep"
    weight = 4
    min_group = 2
    max_group = 3
"#;

const EXPANSION: &str = r#"
    layers_per_tick = 6

    [start_area]
    radius = 1
    category = "plains"

    [world_loop]
    tick_interval_ms = 1
    autosave_every = 4
"#;

type MemoryLoop = WorldLoop<MemoryWorld, MemorySources, BusHooks>;

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("voidgrow_loop_{name}_{}.json", std::process::id()))
}

fn build(ledger: PlayableAreaLedger, store: Option<LedgerStore>) -> (MemoryLoop, EventReceiver) {
    let setup = WorldSetup::from_toml_str(SETUP).unwrap();
    let built = setup.build().unwrap();
    let tiers = TierRegistry::from_toml_str(RULES).unwrap();
    let rules = RuleSet::from_toml_str(RULES, &tiers).unwrap();
    let mut resolver = BiomeRuleResolver::new(tiers);
    resolver.install(rules);

    let config = ExpansionConfig::from_toml_str(EXPANSION).unwrap();
    let loop_config = WorldLoopConfig::from_toml_str(EXPANSION).unwrap();
    let manager = ExpansionManager::new(config, setup.seed, ledger, resolver, built.categories, built.palette);

    let bus = EventBus::new(256);
    let events = bus.receiver();
    let world = WorldLoop::new(manager, built.main, built.sources, bus.hooks(), store, loop_config);
    (world, events)
}

#[test]
fn test_starting_area_and_village_cascade() {
    let (mut world, events) = build(PlayableAreaLedger::new(), None);
    assert_eq!(world.start(), 9);
    assert_eq!(world.snapshot().read().queued, 9);

    world.run_until_idle(10_000);

    let snapshot = world.snapshot().read();
    // Eight ring tiles plus the anchor, plus the village's far half.
    assert_eq!(snapshot.ledger.occupied_count, 10);
    assert_eq!(snapshot.stats.completed, 10);
    assert_eq!(snapshot.stats.cascaded, 1);
    assert_eq!(snapshot.queued, 0);
    assert!(snapshot.active.is_none());

    let ledger = world.manager().ledger();
    let meta = ledger.meta(TileCoord::new(2, 0)).unwrap();
    assert!(meta.structure_triggered);
    assert_eq!(meta.triggering_tile, Some(TileCoord::new(1, 0)));

    let main = world.main();
    assert_eq!(main.tile_category(TileCoord::new(-1, 1)), Some(&CategoryId::from("plains")));
    assert_ne!(main.voxel(BlockPos::new(5, 0, 5)), VoxelState::AIR);
    assert!(!main.is_pinned(TileCoord::new(0, 0)));

    let events = events.drain();
    let expanded = events
        .iter()
        .filter(|e| matches!(e, WorldEvent::Expansion(ExpansionEvent::TileExpanded { .. })))
        .count();
    let cascades = events
        .iter()
        .filter(|e| matches!(e, WorldEvent::Expansion(ExpansionEvent::StructureCascade { .. })))
        .count();
    assert_eq!(expanded, 10);
    assert_eq!(cascades, 1);
    assert!(events.iter().any(|e| matches!(
        e,
        WorldEvent::MobsSeeded { spawns, .. } if spawns.iter().any(|s| s.entity == "sheep")
    )));
}

#[test]
fn test_restart_keeps_ledger_and_rng() {
    let path = temp_path("restart");
    let store = LedgerStore::new(&path);
    let (mut world, _events) = build(PlayableAreaLedger::new(), Some(store.clone()));
    world.start();
    world.run_until_idle(10_000);
    world.save().unwrap();
    let reloaded = store.load().unwrap();
    assert_eq!(reloaded.occupied_count(), 10);
    assert_eq!(reloaded.rng_state(), world.manager().ledger().rng_state());

    // Pooled requests draw from the ledger RNG.
    let handle = world.handle();
    for x in [-2, 3] {
        let request = ExpansionRequest::new("overworld", "copper", TileCoord::new(x, 0));
        assert_eq!(handle.enqueue(request), EnqueueResult::Accepted);
    }
    world.run_until_idle(10_000);
    let picked: Vec<_> = [-2, 3]
        .into_iter()
        .map(|x| world.manager().ledger().meta(TileCoord::new(x, 0)).unwrap().category.clone())
        .collect();

    let (mut resumed, _events) = build(reloaded, None);
    assert_eq!(resumed.start(), 0);

    let handle = resumed.handle();
    for x in [-2, 3] {
        let request = ExpansionRequest::new("overworld", "copper", TileCoord::new(x, 0));
        assert_eq!(handle.enqueue(request), EnqueueResult::Accepted);
    }
    resumed.run_until_idle(10_000);
    let repicked: Vec<_> = [-2, 3]
        .into_iter()
        .map(|x| resumed.manager().ledger().meta(TileCoord::new(x, 0)).unwrap().category.clone())
        .collect();
    assert_eq!(picked, repicked);

    let _ = std::fs::remove_file(path);
}

#[test]
fn test_autosave_only_when_dirty() {
    let path = temp_path("autosave");
    let _ = std::fs::remove_file(&path);
    let (mut world, _events) = build(PlayableAreaLedger::new(), Some(LedgerStore::new(&path)));

    world.start();
    for _ in 0..4 {
        world.step();
    }
    // The first autosave lands on tick 4, after initialize dirtied the ledger.
    assert!(path.exists());
    assert!(!world.manager().ledger().is_dirty());

    world.run_until_idle(10_000);
    world.save().unwrap();
    let saved = LedgerStore::new(&path).load().unwrap();
    assert_eq!(saved.occupied_count(), 10);

    let _ = std::fs::remove_file(path);
}

#[test]
fn test_player_request_reaches_requester() {
    let (mut world, events) = build(PlayableAreaLedger::new(), None);
    world.start();
    world.run_until_idle(10_000);
    events.drain();

    let player = Requester::player(7, "ada");
    let marker = OriginMarker {
        id: 11,
        tile: TileCoord::new(0, 0),
    };
    let request = ExpansionRequest::new("overworld", "copper", TileCoord::new(0, 2))
        .with_category("desert")
        .with_requester(player.clone())
        .with_origin_marker(marker.clone());
    assert_eq!(world.handle().enqueue(request), EnqueueResult::Accepted);
    assert_eq!(world.step(), TickOutcome::Started(TileCoord::new(0, 2)));
    world.run_until_idle(10_000);

    let events = events.drain();
    assert!(events.contains(&WorldEvent::MarkerConsumed(marker)));
    assert!(events.contains(&WorldEvent::Notice {
        requester: player,
        notice: RequesterNotice::Completed {
            tile: TileCoord::new(0, 2),
            category: "desert".into(),
        },
    }));
}

#[test]
fn test_run_until_shutdown_from_another_thread() {
    let (mut world, _events) = build(PlayableAreaLedger::new(), None);
    world.start();
    let snapshot = world.snapshot();
    let (shutdown_tx, shutdown_rx) = bounded(1);

    let watcher = thread::spawn(move || {
        for _ in 0..5_000 {
            let current = snapshot.read();
            if current.stats.completed >= 10 && current.queued == 0 && current.active.is_none() {
                break;
            }
            thread::sleep(Duration::from_millis(2));
        }
        shutdown_tx.send(()).unwrap();
        snapshot.read()
    });

    world.run(&shutdown_rx).unwrap();
    let seen = watcher.join().unwrap();
    assert_eq!(seen.ledger.occupied_count, 10);
    assert!(world.ticks() >= seen.tick);
}
