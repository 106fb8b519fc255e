//! # Tile Coordinates
//!
//! The world grid is organized into fixed-footprint tiles (chunks).
//! A tile is `TILE_SIZE` x `TILE_SIZE` voxels on X/Z and spans the full
//! height of whatever world it belongs to.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Tile width/depth in voxels.
pub const TILE_SIZE: i32 = 16;

/// Tile coordinate (identifies a chunk column in the world grid).
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct TileCoord {
    /// X coordinate (in tiles, not voxels).
    pub x: i32,
    /// Z coordinate (in tiles, not voxels).
    pub z: i32,
}

impl TileCoord {
    /// Creates a new tile coordinate.
    #[inline]
    #[must_use]
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Converts voxel coordinates to the tile containing them.
    #[inline]
    #[must_use]
    pub const fn from_block_pos(block_x: i32, block_z: i32) -> Self {
        Self {
            x: block_x.div_euclid(TILE_SIZE),
            z: block_z.div_euclid(TILE_SIZE),
        }
    }

    /// Returns true if every voxel of the tile has an `i32` block coordinate.
    ///
    /// Tiles outside this range exist on the grid but can never be filled.
    #[inline]
    #[must_use]
    pub const fn in_block_range(self) -> bool {
        const MIN: i32 = i32::MIN / TILE_SIZE;
        const MAX: i32 = i32::MAX / TILE_SIZE;
        self.x >= MIN && self.x <= MAX && self.z >= MIN && self.z <= MAX
    }

    /// Returns the voxel X coordinate of the tile's origin (corner).
    ///
    /// Only meaningful for tiles `in_block_range`.
    #[inline]
    #[must_use]
    pub const fn min_block_x(self) -> i32 {
        self.x.wrapping_mul(TILE_SIZE)
    }

    /// Returns the voxel Z coordinate of the tile's origin.
    #[inline]
    #[must_use]
    pub const fn min_block_z(self) -> i32 {
        self.z.wrapping_mul(TILE_SIZE)
    }

    /// The orthogonal neighbours (+X, -X, +Z, -Z) that exist on the grid.
    ///
    /// Diagonals are never neighbours for adjacency purposes. Tiles on the
    /// `i32` edge have fewer than four.
    pub fn neighbors(self) -> impl Iterator<Item = Self> {
        [(1, 0), (-1, 0), (0, 1), (0, -1)]
            .into_iter()
            .filter_map(move |(dx, dz)| Some(Self::new(self.x.checked_add(dx)?, self.z.checked_add(dz)?)))
    }

    /// Returns the voxel position at local offsets within this tile.
    ///
    /// Only meaningful for tiles `in_block_range`.
    #[inline]
    #[must_use]
    pub const fn block_at(self, local_x: i32, y: i32, local_z: i32) -> BlockPos {
        BlockPos::new(
            self.min_block_x().wrapping_add(local_x),
            y,
            self.min_block_z().wrapping_add(local_z),
        )
    }

    /// Mixes the coordinate into a single well-distributed 64-bit value.
    #[must_use]
    pub const fn mix(self) -> u64 {
        let packed = ((self.x as u32 as u64) << 32) | (self.z as u32 as u64);
        crate::rng::mix64(packed)
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.x, self.z)
    }
}

/// A voxel position in world space.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockPos {
    /// World X.
    pub x: i32,
    /// World Y.
    pub y: i32,
    /// World Z.
    pub z: i32,
}

impl BlockPos {
    /// Creates a new voxel position.
    #[inline]
    #[must_use]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// The tile containing this position.
    #[inline]
    #[must_use]
    pub const fn tile(self) -> TileCoord {
        TileCoord::from_block_pos(self.x, self.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_block_pos_negative() {
        assert_eq!(TileCoord::from_block_pos(-1, -16), TileCoord::new(-1, -1));
        assert_eq!(TileCoord::from_block_pos(-17, 15), TileCoord::new(-2, 0));
        assert_eq!(TileCoord::from_block_pos(16, 31), TileCoord::new(1, 1));
    }

    #[test]
    fn test_neighbors_are_orthogonal() {
        let n: Vec<_> = TileCoord::new(3, -2).neighbors().collect();
        assert_eq!(n.len(), 4);
        for t in n {
            let dist = (t.x - 3).abs() + (t.z + 2).abs();
            assert_eq!(dist, 1);
        }
    }

    #[test]
    fn test_neighbors_stop_at_grid_edge() {
        let corner: Vec<_> = TileCoord::new(i32::MAX, i32::MIN).neighbors().collect();
        assert_eq!(corner, [TileCoord::new(i32::MAX - 1, i32::MIN), TileCoord::new(i32::MAX, i32::MIN + 1)]);
    }

    #[test]
    fn test_block_range_edges() {
        assert!(TileCoord::new(0, 0).in_block_range());
        let max = i32::MAX / TILE_SIZE;
        let min = i32::MIN / TILE_SIZE;
        assert!(TileCoord::new(max, min).in_block_range());
        assert!(!TileCoord::new(max + 1, 0).in_block_range());
        assert!(!TileCoord::new(0, min - 1).in_block_range());
        assert!(!TileCoord::new(i32::MAX, 0).in_block_range());

        assert_eq!(TileCoord::new(max, 0).block_at(15, 0, 0).x, i32::MAX);
        assert_eq!(TileCoord::new(min, 0).block_at(0, 0, 0).x, i32::MIN);
    }

    #[test]
    fn test_block_at_round_trips_to_tile() {
        let tile = TileCoord::new(-4, 7);
        let pos = tile.block_at(15, 64, 0);
        assert_eq!(pos.tile(), tile);
        assert_eq!(pos, BlockPos::new(-49, 64, 112));
    }

    #[test]
    fn test_mix_distinguishes_swapped_axes() {
        assert_ne!(TileCoord::new(1, 2).mix(), TileCoord::new(2, 1).mix());
    }
}
