//! # World Collaborators
//!
//! The engine never owns voxel storage. The host implements these traits
//! for its main world and for each per-category source world, and hands
//! them in on every tick through `WorldEnv`.

use voidgrow_core::{BlockPos, CategoryId, TileCoord, VoxelState};

use crate::error::WorldError;
use crate::hooks::ExpansionHooks;

/// Inclusive-exclusive vertical extent `[min_y, max_y)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct HeightRange {
    /// Lowest buildable Y.
    pub min_y: i32,
    /// One past the highest buildable Y.
    pub max_y: i32,
}

impl HeightRange {
    /// Creates a range. `max_y` below `min_y` yields an empty range.
    #[must_use]
    pub const fn new(min_y: i32, max_y: i32) -> Self {
        Self {
            min_y,
            max_y: if max_y < min_y { min_y } else { max_y },
        }
    }

    /// Number of Y layers.
    #[inline]
    #[must_use]
    pub const fn height(self) -> u32 {
        self.max_y.abs_diff(self.min_y)
    }

    /// Returns true if the range holds no layers.
    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.max_y <= self.min_y
    }

    /// Returns true if `y` is inside the range.
    #[inline]
    #[must_use]
    pub const fn contains(self, y: i32) -> bool {
        y >= self.min_y && y < self.max_y
    }

    /// Overlap of two ranges (possibly empty).
    #[must_use]
    pub fn intersect(self, other: Self) -> Self {
        Self::new(self.min_y.max(other.min_y), self.max_y.min(other.max_y))
    }
}

/// Inclusive rectangle of tiles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TileRect {
    /// Smallest corner.
    pub min: TileCoord,
    /// Largest corner (inclusive).
    pub max: TileCoord,
}

impl TileRect {
    /// Rectangle spanning two corners in any order.
    #[must_use]
    pub fn new(a: TileCoord, b: TileCoord) -> Self {
        Self {
            min: TileCoord::new(a.x.min(b.x), a.z.min(b.z)),
            max: TileCoord::new(a.x.max(b.x), a.z.max(b.z)),
        }
    }

    /// Smallest rectangle covering a block-space bounding box.
    #[must_use]
    pub fn from_block_bounds(min: BlockPos, max: BlockPos) -> Self {
        Self::new(min.tile(), max.tile())
    }

    /// Single-tile rectangle.
    #[must_use]
    pub const fn single(tile: TileCoord) -> Self {
        Self {
            min: tile,
            max: tile,
        }
    }

    /// Returns true if the tile lies in the rectangle.
    #[must_use]
    pub const fn contains(&self, tile: TileCoord) -> bool {
        tile.x >= self.min.x && tile.x <= self.max.x && tile.z >= self.min.z && tile.z <= self.max.z
    }

    /// Tiles in row-major order (z outer, x inner).
    pub fn tiles(&self) -> impl Iterator<Item = TileCoord> + '_ {
        (self.min.z..=self.max.z)
            .flat_map(move |z| (self.min.x..=self.max.x).map(move |x| TileCoord::new(x, z)))
    }
}

/// A multi-tile feature whose start lives in one tile.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct StructureInstance {
    /// Structure type id.
    pub structure: String,
    /// Tile holding the structure's start record.
    pub start_tile: TileCoord,
    /// Tiles the structure covers.
    pub footprint: TileRect,
}

/// A tile's pointer to structures whose start lives elsewhere.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct StructureRef {
    /// Structure type id.
    pub structure: String,
    /// Tiles holding the referenced starts.
    pub starts: Vec<TileCoord>,
}

/// The shared world players live in.
pub trait MainWorld {
    /// Vertical extent of the world.
    fn height_range(&self) -> HeightRange;

    /// Reads one voxel.
    ///
    /// # Errors
    ///
    /// Returns error if the tile is not loaded or `pos` is out of bounds.
    fn get_voxel(&self, pos: BlockPos) -> Result<VoxelState, WorldError>;

    /// Writes one voxel.
    ///
    /// # Errors
    ///
    /// Returns error if the tile is not loaded or `pos` is out of bounds.
    fn set_voxel(&mut self, pos: BlockPos, state: VoxelState) -> Result<(), WorldError>;

    /// Tags a tile's columns with a category.
    ///
    /// # Errors
    ///
    /// Returns error if the tile is not loaded.
    fn set_tile_category(&mut self, tile: TileCoord, category: &CategoryId) -> Result<(), WorldError>;

    /// Pins (`true`) or unpins (`false`) a tile in memory.
    ///
    /// # Errors
    ///
    /// Returns error if the tile cannot be loaded.
    fn force_load(&mut self, tile: TileCoord, pinned: bool) -> Result<(), WorldError>;

    /// Schedules the tile for re-send to connected clients.
    fn mark_dirty_for_resend(&mut self, tile: TileCoord);

    /// Nearest structure with `tag` within `radius` voxels of `origin`.
    fn find_nearest_structure(&self, tag: &str, origin: BlockPos, radius: u32) -> Option<BlockPos>;
}

/// A generator-backed world for one category. Read-only to the engine.
pub trait SourceWorld {
    /// Vertical extent of the world.
    fn height_range(&self) -> HeightRange;

    /// Reads one voxel, generating the tile if needed.
    ///
    /// # Errors
    ///
    /// Returns error if generation fails or `pos` is out of bounds.
    fn get_voxel(&mut self, pos: BlockPos) -> Result<VoxelState, WorldError>;

    /// Pins (`true`) or unpins (`false`) a tile in memory.
    ///
    /// # Errors
    ///
    /// Returns error if the tile cannot be generated.
    fn force_load(&mut self, tile: TileCoord, pinned: bool) -> Result<(), WorldError>;

    /// Structures whose start record lives in `tile`, in generator order.
    ///
    /// # Errors
    ///
    /// Returns error if the tile's structure data cannot be produced.
    fn structure_starts(&mut self, tile: TileCoord) -> Result<Vec<StructureInstance>, WorldError>;

    /// Structures that cover `tile` but start elsewhere.
    ///
    /// # Errors
    ///
    /// Returns error if the tile's structure data cannot be produced.
    fn structure_references(&mut self, tile: TileCoord) -> Result<Vec<StructureRef>, WorldError>;
}

/// Lookup of source worlds by category.
pub trait SourceWorlds {
    /// The source world for `category`, if one exists.
    fn source(&mut self, category: &CategoryId) -> Option<&mut dyn SourceWorld>;
}

/// Everything the engine touches outside its own state during one tick.
pub struct WorldEnv<'a> {
    /// The main world.
    pub main: &'a mut dyn MainWorld,
    /// Source worlds by category.
    pub sources: &'a mut dyn SourceWorlds,
    /// Notification sinks.
    pub hooks: &'a mut dyn ExpansionHooks,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_height_intersection() {
        let a = HeightRange::new(-64, 320);
        let b = HeightRange::new(0, 256);
        assert_eq!(a.intersect(b), HeightRange::new(0, 256));
        assert_eq!(a.intersect(b).height(), 256);
        assert!(HeightRange::new(0, 10).intersect(HeightRange::new(20, 30)).is_empty());
    }

    #[test]
    fn test_rect_row_major() {
        let rect = TileRect::new(TileCoord::new(1, 1), TileCoord::new(0, 0));
        let tiles: Vec<TileCoord> = rect.tiles().collect();
        assert_eq!(
            tiles,
            [
                TileCoord::new(0, 0),
                TileCoord::new(1, 0),
                TileCoord::new(0, 1),
                TileCoord::new(1, 1)
            ]
        );
        assert!(rect.contains(TileCoord::new(1, 0)));
        assert!(!rect.contains(TileCoord::new(2, 0)));
    }

    #[test]
    fn test_rect_from_block_bounds() {
        let rect = TileRect::from_block_bounds(BlockPos::new(-1, 0, 5), BlockPos::new(31, 40, 17));
        assert_eq!(rect.min, TileCoord::new(-1, 0));
        assert_eq!(rect.max, TileCoord::new(1, 1));
    }
}
