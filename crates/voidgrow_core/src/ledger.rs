//! # Playable-Area Ledger
//!
//! The authoritative record of which tiles of the main world have been
//! filled, where each one came from, and the persistent random stream used
//! to pick categories.
//!
//! ## Invariants
//!
//! - `occupied` only grows
//! - every tile with metadata is occupied
//! - metadata is written once per tile
//! - `rng_state == 0` means "not yet seeded"

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::ids::{CategoryId, TierId};
use crate::rng;
use crate::tile::TileCoord;

/// Provenance of one filled tile.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileMeta {
    /// Category the tile was copied from.
    pub category: CategoryId,
    /// Tier of the request that filled it.
    pub tier: TierId,
    /// True if the tile was pulled in to complete a structure.
    pub structure_triggered: bool,
    /// The tile whose expansion triggered the structure cascade.
    pub triggering_tile: Option<TileCoord>,
}

/// Read-only diagnostic view of the ledger.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LedgerSnapshot {
    /// Number of playable tiles.
    pub occupied_count: usize,
    /// Playable tiles with at least one non-playable neighbour.
    pub frontier: Vec<TileCoord>,
    /// Non-playable tiles that may be expanded into right now.
    pub expandable: Vec<TileCoord>,
}

/// The persistent playable-area state of one world.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PlayableAreaLedger {
    pub(crate) initialized: bool,
    pub(crate) anchor_tile: TileCoord,
    pub(crate) occupied: HashSet<TileCoord>,
    pub(crate) rng_state: u64,
    pub(crate) tile_meta: HashMap<TileCoord, TileMeta>,
    pub(crate) dirty: bool,
}

impl PlayableAreaLedger {
    /// Creates an empty, uninitialized ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the seed region's center. Only the first call has any effect.
    ///
    /// Returns true if the ledger was initialized by this call.
    pub fn initialize(&mut self, anchor: TileCoord) -> bool {
        if self.initialized {
            return false;
        }
        self.initialized = true;
        self.anchor_tile = anchor;
        self.dirty = true;
        true
    }

    /// Returns true once the anchor tile has been set.
    #[inline]
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// The seed region's center, if initialized.
    #[inline]
    #[must_use]
    pub fn anchor_tile(&self) -> Option<TileCoord> {
        self.initialized.then_some(self.anchor_tile)
    }

    /// Returns true if the tile has been filled.
    #[inline]
    #[must_use]
    pub fn is_playable(&self, tile: TileCoord) -> bool {
        self.occupied.contains(&tile)
    }

    /// True iff the tile is not playable and an orthogonal neighbour is.
    #[must_use]
    pub fn can_expand_into(&self, tile: TileCoord) -> bool {
        !self.is_playable(tile) && tile.neighbors().any(|n| self.is_playable(n))
    }

    /// Adds a tile to the playable area.
    ///
    /// Returns true if the tile was not already playable.
    pub fn add_tile(&mut self, tile: TileCoord) -> bool {
        let added = self.occupied.insert(tile);
        if added {
            self.dirty = true;
        }
        added
    }

    /// Records provenance for a tile. Write-once.
    ///
    /// Ignored (returns false) when `tier` is empty, the tile is not
    /// playable, or metadata was already recorded.
    pub fn record_meta(
        &mut self,
        tile: TileCoord,
        category: CategoryId,
        tier: TierId,
        structure_triggered: bool,
        triggering_tile: Option<TileCoord>,
    ) -> bool {
        if tier.is_empty() || !self.is_playable(tile) || self.tile_meta.contains_key(&tile) {
            return false;
        }
        self.tile_meta.insert(
            tile,
            TileMeta {
                category,
                tier,
                structure_triggered,
                triggering_tile,
            },
        );
        self.dirty = true;
        true
    }

    /// Provenance of a tile, if recorded.
    #[must_use]
    pub fn meta(&self, tile: TileCoord) -> Option<&TileMeta> {
        self.tile_meta.get(&tile)
    }

    /// Draws the next value in `0..bound` from the persistent stream.
    ///
    /// The first draw seeds the stream from `world_seed ^ mix(anchor)`.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::ZeroBound` if `bound == 0`. The stream is not
    /// advanced in that case.
    pub fn next_deterministic_int(&mut self, world_seed: u64, bound: u32) -> CoreResult<u32> {
        let (value, state) = self.peek_deterministic_int(world_seed, bound)?;
        self.advance_rng(state);
        Ok(value)
    }

    /// Computes the next draw without advancing the stream.
    ///
    /// Returns the value and the stream state that follows it. Hand that
    /// state to `advance_rng` once the draw is actually used.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::ZeroBound` if `bound == 0`.
    pub fn peek_deterministic_int(&self, world_seed: u64, bound: u32) -> CoreResult<(u32, u64)> {
        if bound == 0 {
            return Err(CoreError::ZeroBound);
        }
        let mut state = if self.rng_state == 0 {
            rng::derive_seed(world_seed, self.anchor_tile.mix())
        } else {
            self.rng_state
        };
        let mut value = rng::next_u64(&mut state);
        if state == 0 {
            // The counter wrapped onto the sentinel; step past it.
            value = rng::next_u64(&mut state);
        }
        // The remainder is < bound <= u32::MAX.
        #[allow(clippy::cast_possible_truncation)]
        let reduced = (value % u64::from(bound)) as u32;
        Ok((reduced, state))
    }

    /// Moves the stream to a state returned by `peek_deterministic_int`.
    pub fn advance_rng(&mut self, state: u64) {
        if state != self.rng_state {
            self.rng_state = state;
            self.dirty = true;
        }
    }

    /// Current raw RNG state (0 = not yet seeded).
    #[inline]
    #[must_use]
    pub fn rng_state(&self) -> u64 {
        self.rng_state
    }

    /// Number of playable tiles.
    #[inline]
    #[must_use]
    pub fn occupied_count(&self) -> usize {
        self.occupied.len()
    }

    /// Iterates playable tiles in no particular order.
    pub fn occupied(&self) -> impl Iterator<Item = TileCoord> + '_ {
        self.occupied.iter().copied()
    }

    /// Playable tiles with at least one non-playable neighbour, sorted.
    #[must_use]
    pub fn frontier_tiles(&self) -> Vec<TileCoord> {
        let mut frontier: Vec<TileCoord> = self
            .occupied
            .iter()
            .copied()
            .filter(|t| t.neighbors().any(|n| !self.is_playable(n)))
            .collect();
        frontier.sort_unstable();
        frontier
    }

    /// Non-playable tiles adjacent to the playable area, sorted.
    #[must_use]
    pub fn expandable_tiles(&self) -> Vec<TileCoord> {
        let candidates: HashSet<TileCoord> = self
            .occupied
            .iter()
            .flat_map(|t| t.neighbors())
            .filter(|n| !self.is_playable(*n))
            .collect();
        let mut expandable: Vec<TileCoord> = candidates.into_iter().collect();
        expandable.sort_unstable();
        expandable
    }

    /// Builds a diagnostic snapshot.
    #[must_use]
    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            occupied_count: self.occupied.len(),
            frontier: self.frontier_tiles(),
            expandable: self.expandable_tiles(),
        }
    }

    /// Returns true if the ledger changed since the last save.
    #[inline]
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Clears the dirty flag after a successful save.
    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }
}
