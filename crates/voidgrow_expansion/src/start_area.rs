//! Seed region of a fresh world.
//!
//! The region is a `(2r+1)²` square of tiles around an anchor. Tiles are
//! listed ring by ring from the anchor outward, each ring walked clockwise
//! from its north-west corner, so the center is always filled first.

use voidgrow_core::{BlockPos, TileCoord};

use crate::config::StartAreaConfig;
use crate::world::MainWorld;

/// Anchor and radius of the seed region.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StartArea {
    /// Center tile.
    pub anchor: TileCoord,
    /// Radius in tiles.
    pub radius: u32,
}

impl StartArea {
    /// Centers the region on the nearest tagged structure, or the origin.
    #[must_use]
    pub fn locate(main: &dyn MainWorld, config: &StartAreaConfig) -> Self {
        let origin = BlockPos::new(0, 0, 0);
        let anchor = config
            .structure_tag
            .as_deref()
            .and_then(|tag| {
                let found = main.find_nearest_structure(tag, origin, config.search_radius);
                if found.is_none() {
                    tracing::info!(
                        "No '{tag}' structure within {} blocks; starting at the origin",
                        config.search_radius
                    );
                }
                found
            })
            .map_or(TileCoord::new(0, 0), BlockPos::tile);

        Self {
            anchor,
            radius: config.radius,
        }
    }

    /// Number of tiles in the region.
    #[must_use]
    pub fn len(&self) -> usize {
        let side = 2 * self.radius as usize + 1;
        side * side
    }

    /// Always false: the anchor is part of the region.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Tiles in ring order.
    #[must_use]
    pub fn tiles(&self) -> Vec<TileCoord> {
        let mut tiles = Vec::with_capacity(self.len());
        tiles.push(self.anchor);

        let (ax, az) = (self.anchor.x, self.anchor.z);
        for r in 1..=i32::try_from(self.radius).unwrap_or(i32::MAX) {
            // North edge west to east, then east, south, west edges.
            for x in (ax - r)..(ax + r) {
                tiles.push(TileCoord::new(x, az - r));
            }
            for z in (az - r)..(az + r) {
                tiles.push(TileCoord::new(ax + r, z));
            }
            for x in ((ax - r + 1)..=(ax + r)).rev() {
                tiles.push(TileCoord::new(x, az + r));
            }
            for z in ((az - r + 1)..=(az + r)).rev() {
                tiles.push(TileCoord::new(ax - r, z));
            }
        }
        tiles
    }
}
