//! # In-Memory Worlds
//!
//! Reference implementations of the collaborator traits. The main world
//! starts as void; source worlds generate layered terrain on first touch,
//! seeded per tile with `ChaCha8Rng`, so the same seed always produces the
//! same terrain regardless of access order.

use std::collections::{HashMap, HashSet};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use voidgrow_core::{BlockPos, CategoryId, TileCoord, VoxelState, TILE_SIZE};
use voidgrow_expansion::{
    HeightRange, MainWorld, SourceWorld, SourceWorlds, StructureInstance, StructureRef, WorldError,
};

const COLUMN_AREA: usize = (TILE_SIZE * TILE_SIZE) as usize;

/// Voxel storage for one tile.
#[derive(Clone, Debug)]
struct TileVoxels {
    voxels: Vec<VoxelState>,
}

impl TileVoxels {
    fn new(height: HeightRange) -> Self {
        Self {
            voxels: vec![VoxelState::AIR; height.height() as usize * COLUMN_AREA],
        }
    }

    #[allow(clippy::cast_sign_loss)]
    fn index(height: HeightRange, pos: BlockPos) -> usize {
        let lx = pos.x.rem_euclid(TILE_SIZE) as usize;
        let lz = pos.z.rem_euclid(TILE_SIZE) as usize;
        height.min_y.abs_diff(pos.y) as usize * COLUMN_AREA + lz * TILE_SIZE as usize + lx
    }

    fn get(&self, height: HeightRange, pos: BlockPos) -> VoxelState {
        self.voxels[Self::index(height, pos)]
    }

    fn set(&mut self, height: HeightRange, pos: BlockPos, state: VoxelState) {
        let index = Self::index(height, pos);
        self.voxels[index] = state;
    }
}

fn check_bounds(height: HeightRange, pos: BlockPos) -> Result<(), WorldError> {
    if height.contains(pos.y) {
        Ok(())
    } else {
        Err(WorldError::OutOfBounds(pos))
    }
}

// =============================================================================
// MAIN WORLD
// =============================================================================

/// A void main world held entirely in memory.
#[derive(Clone, Debug)]
pub struct MemoryWorld {
    height: HeightRange,
    tiles: HashMap<TileCoord, TileVoxels>,
    categories: HashMap<TileCoord, CategoryId>,
    pinned: HashSet<TileCoord>,
    resend: Vec<TileCoord>,
    structures: Vec<(String, BlockPos)>,
}

impl MemoryWorld {
    /// Creates an empty world.
    #[must_use]
    pub fn new(height: HeightRange) -> Self {
        Self {
            height,
            tiles: HashMap::new(),
            categories: HashMap::new(),
            pinned: HashSet::new(),
            resend: Vec::new(),
            structures: Vec::new(),
        }
    }

    /// Declares a structure findable by `find_nearest_structure`.
    pub fn add_structure(&mut self, tag: impl Into<String>, pos: BlockPos) {
        self.structures.push((tag.into(), pos));
    }

    /// Category tag of a tile, if set.
    #[must_use]
    pub fn tile_category(&self, tile: TileCoord) -> Option<&CategoryId> {
        self.categories.get(&tile)
    }

    /// Returns true if the tile is pinned.
    #[must_use]
    pub fn is_pinned(&self, tile: TileCoord) -> bool {
        self.pinned.contains(&tile)
    }

    /// Number of tiles holding voxel data.
    #[must_use]
    pub fn stored_tiles(&self) -> usize {
        self.tiles.len()
    }

    /// Takes the tiles waiting to be re-sent to clients.
    pub fn drain_resend(&mut self) -> Vec<TileCoord> {
        std::mem::take(&mut self.resend)
    }

    /// Reads a voxel without bounds errors (out of range reads as air).
    #[must_use]
    pub fn voxel(&self, pos: BlockPos) -> VoxelState {
        if !self.height.contains(pos.y) {
            return VoxelState::AIR;
        }
        self.tiles
            .get(&pos.tile())
            .map_or(VoxelState::AIR, |t| t.get(self.height, pos))
    }
}

impl MainWorld for MemoryWorld {
    fn height_range(&self) -> HeightRange {
        self.height
    }

    fn get_voxel(&self, pos: BlockPos) -> Result<VoxelState, WorldError> {
        check_bounds(self.height, pos)?;
        Ok(self.voxel(pos))
    }

    fn set_voxel(&mut self, pos: BlockPos, state: VoxelState) -> Result<(), WorldError> {
        check_bounds(self.height, pos)?;
        let height = self.height;
        self.tiles
            .entry(pos.tile())
            .or_insert_with(|| TileVoxels::new(height))
            .set(height, pos, state);
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
        self.resend.push(tile);
    }

    fn find_nearest_structure(&self, tag: &str, origin: BlockPos, radius: u32) -> Option<BlockPos> {
        let limit = u64::from(radius) * u64::from(radius);
        self.structures
            .iter()
            .filter(|(t, _)| t == tag)
            .map(|(_, pos)| {
                let dx = u64::from(pos.x.abs_diff(origin.x));
                let dz = u64::from(pos.z.abs_diff(origin.z));
                (dx * dx + dz * dz, *pos)
            })
            .filter(|(dist, _)| *dist <= limit)
            .min_by_key(|(dist, pos)| (*dist, pos.x, pos.z))
            .map(|(_, pos)| pos)
    }
}

// =============================================================================
// SOURCE WORLDS
// =============================================================================

/// Layer recipe for a generated source world.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TerrainProfile {
    /// Lowest surface Y.
    pub base_height: i32,
    /// Extra surface height, drawn per column in `0..=amplitude`.
    pub amplitude: i32,
    /// Bottom layer.
    pub bedrock: VoxelState,
    /// Deep fill.
    pub filler: VoxelState,
    /// The three layers under the surface.
    pub subsurface: VoxelState,
    /// Top layer.
    pub surface: VoxelState,
    /// Placed on top of the surface.
    pub foliage: Option<VoxelState>,
    /// Percent of columns with foliage.
    pub foliage_chance: u32,
    /// Trunk block for trees.
    pub log: Option<VoxelState>,
    /// Percent of columns with a tree trunk.
    pub tree_chance: u32,
}

/// A generator-backed world for one category.
#[derive(Clone, Debug)]
pub struct MemorySourceWorld {
    seed: u64,
    height: HeightRange,
    profile: TerrainProfile,
    tiles: HashMap<TileCoord, TileVoxels>,
    pinned: HashSet<TileCoord>,
    starts: HashMap<TileCoord, Vec<StructureInstance>>,
    references: HashMap<TileCoord, Vec<StructureRef>>,
}

impl MemorySourceWorld {
    /// Creates a source world. Nothing is generated until first touch.
    #[must_use]
    pub fn new(seed: u64, height: HeightRange, profile: TerrainProfile) -> Self {
        Self {
            seed,
            height,
            profile,
            tiles: HashMap::new(),
            pinned: HashSet::new(),
            starts: HashMap::new(),
            references: HashMap::new(),
        }
    }

    /// Registers a structure: its start in `start_tile`, references in
    /// every other footprint tile.
    pub fn declare_structure(&mut self, instance: StructureInstance) {
        for tile in instance.footprint.tiles() {
            if tile == instance.start_tile {
                continue;
            }
            self.references.entry(tile).or_default().push(StructureRef {
                structure: instance.structure.clone(),
                starts: vec![instance.start_tile],
            });
        }
        self.starts.entry(instance.start_tile).or_default().push(instance);
    }

    /// Number of tiles generated so far.
    #[must_use]
    pub fn generated_tiles(&self) -> usize {
        self.tiles.len()
    }

    /// Returns true if the tile is pinned.
    #[must_use]
    pub fn is_pinned(&self, tile: TileCoord) -> bool {
        self.pinned.contains(&tile)
    }

    fn tile(&mut self, tile: TileCoord) -> &TileVoxels {
        let (seed, height, profile) = (self.seed, self.height, &self.profile);
        self.tiles
            .entry(tile)
            .or_insert_with(|| generate(seed, height, profile, tile))
    }
}

fn generate(seed: u64, height: HeightRange, profile: &TerrainProfile, tile: TileCoord) -> TileVoxels {
    let mut rng = ChaCha8Rng::seed_from_u64(seed ^ tile.mix());
    let mut voxels = TileVoxels::new(height);
    if height.is_empty() {
        return voxels;
    }
    let top = height.max_y - 1;

    for lz in 0..TILE_SIZE {
        for lx in 0..TILE_SIZE {
            let surface = (profile.base_height + rng.gen_range(0..=profile.amplitude.max(0))).clamp(height.min_y, top);
            let has_tree = profile.log.is_some() && rng.gen_range(0..100) < profile.tree_chance;
            let has_foliage = profile.foliage.is_some() && rng.gen_range(0..100) < profile.foliage_chance;

            for y in height.min_y..=surface {
                let state = if y == height.min_y {
                    profile.bedrock
                } else if y < surface - 3 {
                    profile.filler
                } else if y < surface {
                    profile.subsurface
                } else {
                    profile.surface
                };
                voxels.set(height, tile.block_at(lx, y, lz), state);
            }

            let above = (surface + 1)..=(surface + 3).min(top);
            match (has_tree, profile.log, profile.foliage) {
                (true, Some(log), _) => {
                    for y in above {
                        voxels.set(height, tile.block_at(lx, y, lz), log);
                    }
                }
                (false, _, Some(foliage)) if has_foliage && surface < top => {
                    voxels.set(height, tile.block_at(lx, surface + 1, lz), foliage);
                }
                _ => {}
            }
        }
    }
    voxels
}

impl SourceWorld for MemorySourceWorld {
    fn height_range(&self) -> HeightRange {
        self.height
    }

    fn get_voxel(&mut self, pos: BlockPos) -> Result<VoxelState, WorldError> {
        check_bounds(self.height, pos)?;
        let height = self.height;
        Ok(self.tile(pos.tile()).get(height, pos))
    }

    fn force_load(&mut self, tile: TileCoord, pinned: bool) -> Result<(), WorldError> {
        if pinned {
            self.tile(tile);
            self.pinned.insert(tile);
        } else {
            self.pinned.remove(&tile);
        }
        Ok(())
    }

    fn structure_starts(&mut self, tile: TileCoord) -> Result<Vec<StructureInstance>, WorldError> {
        Ok(self.starts.get(&tile).cloned().unwrap_or_default())
    }

    fn structure_references(&mut self, tile: TileCoord) -> Result<Vec<StructureRef>, WorldError> {
        Ok(self.references.get(&tile).cloned().unwrap_or_default())
    }
}

/// Source worlds keyed by category.
#[derive(Clone, Debug, Default)]
pub struct MemorySources {
    worlds: HashMap<CategoryId, MemorySourceWorld>,
}

impl MemorySources {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the world for `category`.
    pub fn insert(&mut self, category: impl Into<CategoryId>, world: MemorySourceWorld) {
        self.worlds.insert(category.into(), world);
    }

    /// The world for `category`.
    pub fn get_mut(&mut self, category: &CategoryId) -> Option<&mut MemorySourceWorld> {
        self.worlds.get_mut(category)
    }

    /// Number of source worlds.
    #[must_use]
    pub fn len(&self) -> usize {
        self.worlds.len()
    }

    /// Returns true if there are no source worlds.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.worlds.is_empty()
    }
}

impl SourceWorlds for MemorySources {
    fn source(&mut self, category: &CategoryId) -> Option<&mut dyn SourceWorld> {
        self.worlds
            .get_mut(category)
            .map(|w| w as &mut dyn SourceWorld)
    }
}
