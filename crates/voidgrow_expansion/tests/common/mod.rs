//! Test worlds and fixtures shared by the integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};

use voidgrow_core::{BlockPalette, BlockPos, CategoryId, PlayableAreaLedger, TileCoord, VoxelClass, VoxelState};
use voidgrow_expansion::{
    ExpansionConfig, ExpansionEvent, ExpansionHooks, ExpansionManager, HeightRange, MainWorld, OriginMarker,
    RequesterNotice, Requester, SourceWorld, SourceWorlds, StructureInstance, StructureRef, TickOutcome,
    WorldEnv, WorldError,
};
use voidgrow_rules::{BiomeRuleResolver, CategoryRegistry, MobSpawnRule, RuleSet, TierRegistry};

pub const HEIGHT: HeightRange = HeightRange { min_y: 0, max_y: 8 };

pub const TIERS: &str = r#"
    [[tier]]
    id = "copper"
    legacy_tags = ["is_common"]

    [[tier]]
    id = "gold"
"#;

pub const RULES: &str = r##"
    [[rule]]
    id = "desert_gold"
    priority = 10
    tag = "hot"
    tier = "gold"
    weight = 2
    [[rule.replace]]
    match = "dirt"
    with = "sand"
    [[rule.replace]]
    match = "water"
    with = "sand"

    [[rule]]
    id = "plains_copper"
    allow = ["plains"]
    tier = "copper"
    weight = 3
    [[rule.replace]]
    match = "#logs"
    with = "stone"
    [[rule.spawn]]
    entity = "sheep"
    weight = 4
"##;

pub fn palette() -> BlockPalette {
    let mut palette = BlockPalette::new();
    for (name, class) in [
        ("stone", VoxelClass::Solid),
        ("dirt", VoxelClass::Solid),
        ("sand", VoxelClass::Solid),
        ("oak_log", VoxelClass::Solid),
        ("planks", VoxelClass::Solid),
        ("tall_grass", VoxelClass::Foliage),
        ("water", VoxelClass::Liquid),
        ("bedrock", VoxelClass::Bedrock),
    ] {
        palette.register(name, class).unwrap();
    }
    palette.tag("logs", "oak_log");
    palette
}

pub fn state(name: &str) -> VoxelState {
    palette().state(name).unwrap()
}

/// Layered terrain every source tile shares.
pub fn source_layer(y: i32) -> VoxelState {
    match y {
        0 => state("bedrock"),
        1..=3 => state("stone"),
        4 => state("dirt"),
        5 => state("oak_log"),
        6 => state("tall_grass"),
        _ => VoxelState::AIR,
    }
}

pub fn categories() -> CategoryRegistry {
    let mut registry = CategoryRegistry::new();
    registry.register("plains", ["is_common"]);
    registry.register("desert", ["hot"]);
    registry.register("meadow", ["is_common"]);
    registry
}

pub fn resolver() -> BiomeRuleResolver {
    let tiers = TierRegistry::from_toml_str(TIERS).unwrap();
    let rules = RuleSet::from_toml_str(RULES, &tiers).unwrap();
    let mut resolver = BiomeRuleResolver::new(tiers);
    resolver.install(rules);
    resolver
}

#[derive(Default)]
pub struct FakeMain {
    pub voxels: HashMap<BlockPos, VoxelState>,
    pub pinned: HashSet<TileCoord>,
    pub categories: HashMap<TileCoord, CategoryId>,
    pub resent: Vec<TileCoord>,
    pub structures: HashMap<String, BlockPos>,
    /// Number of writes to allow before every write fails.
    pub writes_left: Option<usize>,
    pub writes: usize,
}

impl FakeMain {
    pub fn voxel(&self, pos: BlockPos) -> VoxelState {
        self.voxels.get(&pos).copied().unwrap_or(VoxelState::AIR)
    }
}

impl MainWorld for FakeMain {
    fn height_range(&self) -> HeightRange {
        HEIGHT
    }

    fn get_voxel(&self, pos: BlockPos) -> Result<VoxelState, WorldError> {
        if !HEIGHT.contains(pos.y) {
            return Err(WorldError::OutOfBounds(pos));
        }
        Ok(self.voxel(pos))
    }

    fn set_voxel(&mut self, pos: BlockPos, state: VoxelState) -> Result<(), WorldError> {
        if let Some(left) = self.writes_left.as_mut() {
            if *left == 0 {
                return Err(WorldError::Engine("disk full".to_owned()));
            }
            *left -= 1;
        }
        self.writes += 1;
        self.voxels.insert(pos, state);
        Ok(())
    }

    fn set_tile_category(&mut self, tile: TileCoord, category: &CategoryId) -> Result<(), WorldError> {
        self.categories.insert(tile, category.clone());
        Ok(())
    }

    fn force_load(&mut self, tile: TileCoord, pinned: bool) -> Result<(), WorldError> {
        if pinned {
            self.pinned.insert(tile);
        } else {
            self.pinned.remove(&tile);
        }
        Ok(())
    }

    fn mark_dirty_for_resend(&mut self, tile: TileCoord) {
        self.resent.push(tile);
    }

    fn find_nearest_structure(&self, tag: &str, _origin: BlockPos, _radius: u32) -> Option<BlockPos> {
        self.structures.get(tag).copied()
    }
}

#[derive(Default)]
pub struct FakeSource {
    /// Overrides `HEIGHT` when set.
    pub height: Option<HeightRange>,
    pub pinned: HashSet<TileCoord>,
    pub starts: HashMap<TileCoord, Vec<StructureInstance>>,
    pub references: HashMap<TileCoord, Vec<StructureRef>>,
    pub broken: HashSet<TileCoord>,
}

impl FakeSource {
    pub fn add_structure(&mut self, instance: StructureInstance) {
        for tile in instance.footprint.tiles() {
            if tile != instance.start_tile {
                let refs = self.references.entry(tile).or_default();
                refs.push(StructureRef {
                    structure: instance.structure.clone(),
                    starts: vec![instance.start_tile],
                });
            }
        }
        self.starts.entry(instance.start_tile).or_default().push(instance);
    }
}

impl SourceWorld for FakeSource {
    fn height_range(&self) -> HeightRange {
        self.height.unwrap_or(HEIGHT)
    }

    fn get_voxel(&mut self, pos: BlockPos) -> Result<VoxelState, WorldError> {
        if !self.height_range().contains(pos.y) {
            return Err(WorldError::OutOfBounds(pos));
        }
        Ok(source_layer(pos.y))
    }

    fn force_load(&mut self, tile: TileCoord, pinned: bool) -> Result<(), WorldError> {
        if pinned {
            self.pinned.insert(tile);
        } else {
            self.pinned.remove(&tile);
        }
        Ok(())
    }

    fn structure_starts(&mut self, tile: TileCoord) -> Result<Vec<StructureInstance>, WorldError> {
        if self.broken.contains(&tile) {
            return Err(WorldError::NotLoaded(tile));
        }
        Ok(self.starts.get(&tile).cloned().unwrap_or_default())
    }

    fn structure_references(&mut self, tile: TileCoord) -> Result<Vec<StructureRef>, WorldError> {
        if self.broken.contains(&tile) {
            return Err(WorldError::NotLoaded(tile));
        }
        Ok(self.references.get(&tile).cloned().unwrap_or_default())
    }
}

#[derive(Default)]
pub struct FakeSources(pub HashMap<CategoryId, FakeSource>);

impl SourceWorlds for FakeSources {
    fn source(&mut self, category: &CategoryId) -> Option<&mut dyn SourceWorld> {
        self.0.get_mut(category).map(|s| s as &mut dyn SourceWorld)
    }
}

#[derive(Default)]
pub struct RecordingHooks {
    pub events: Vec<ExpansionEvent>,
    pub notices: Vec<(Requester, RequesterNotice)>,
    pub consumed: Vec<OriginMarker>,
    pub seeded: Vec<(TileCoord, CategoryId, Vec<MobSpawnRule>)>,
}

impl ExpansionHooks for RecordingHooks {
    fn broadcast(&mut self, event: ExpansionEvent) {
        self.events.push(event);
    }

    fn notify_requester(&mut self, requester: &Requester, notice: RequesterNotice) {
        self.notices.push((requester.clone(), notice));
    }

    fn consume_origin_marker(&mut self, marker: &OriginMarker) {
        self.consumed.push(marker.clone());
    }

    fn seed_mobs(
        &mut self,
        tile: TileCoord,
        category: &CategoryId,
        _tier: &voidgrow_core::TierId,
        spawns: &[MobSpawnRule],
    ) {
        self.seeded.push((tile, category.clone(), spawns.to_vec()));
    }
}

/// A manager plus everything it needs to tick.
pub struct Harness {
    pub manager: ExpansionManager,
    pub main: FakeMain,
    pub sources: FakeSources,
    pub hooks: RecordingHooks,
}

impl Harness {
    /// Plains and meadow sources, `(0, 0)` already playable.
    pub fn new(config: ExpansionConfig) -> Self {
        let mut ledger = PlayableAreaLedger::new();
        ledger.initialize(TileCoord::new(0, 0));
        ledger.add_tile(TileCoord::new(0, 0));
        Self::with_ledger(config, ledger)
    }

    pub fn with_ledger(config: ExpansionConfig, ledger: PlayableAreaLedger) -> Self {
        let manager = ExpansionManager::new(config, 0xC0FFEE, ledger, resolver(), categories(), palette());
        let mut sources = FakeSources::default();
        sources.0.insert("plains".into(), FakeSource::default());
        sources.0.insert("meadow".into(), FakeSource::default());
        Self {
            manager,
            main: FakeMain::default(),
            sources,
            hooks: RecordingHooks::default(),
        }
    }

    pub fn source_mut(&mut self, category: &str) -> &mut FakeSource {
        self.sources.0.get_mut(&CategoryId::from(category)).unwrap()
    }

    pub fn tick(&mut self) -> TickOutcome {
        let mut env = WorldEnv {
            main: &mut self.main,
            sources: &mut self.sources,
            hooks: &mut self.hooks,
        };
        self.manager.tick(&mut env)
    }

    /// Ticks until idle; returns every outcome seen.
    pub fn run_until_idle(&mut self) -> Vec<TickOutcome> {
        let mut outcomes = Vec::new();
        for _ in 0..10_000 {
            let outcome = self.tick();
            if outcome == TickOutcome::Idle {
                return outcomes;
            }
            outcomes.push(outcome);
        }
        panic!("manager never went idle");
    }
}
