//! # Structure-Completion Search
//!
//! When a tile is revealed, any structure touching it should be revealed
//! whole. This is a breadth-first flood over tile space, following the
//! source world's structure starts and references, bounded by a structure
//! cap and a tile cap.
//!
//! Visit order is deterministic: starts in generator order, references
//! sorted by `(structure id, start tile)`, footprints walked row-major.

use std::collections::{HashSet, VecDeque};

use voidgrow_core::TileCoord;

use crate::config::StructureSearchConfig;
use crate::world::{SourceWorld, StructureInstance};

/// Tiles to reveal, plus why the search stopped.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StructureSearchResult {
    /// Tiles to enqueue, in discovery order. Never contains the trigger.
    pub tiles: Vec<TileCoord>,
    /// Distinct structures discovered.
    pub structures_found: usize,
    /// An undiscovered structure was left out because of `max_structures`.
    pub hit_structure_cap: bool,
    /// A tile was left out because of `max_tiles`.
    pub hit_tile_cap: bool,
}

impl StructureSearchResult {
    /// Returns true if there is nothing to enqueue.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }
}

/// Finds the tiles needed to complete every structure touching `trigger`.
///
/// `is_spawned` reports tiles that are already playable; they are never
/// returned and never explored further. Fetch failures skip the tile.
pub fn find_structure_tiles(
    source: &mut dyn SourceWorld,
    trigger: TileCoord,
    is_spawned: impl Fn(TileCoord) -> bool,
    config: &StructureSearchConfig,
) -> StructureSearchResult {
    let mut result = StructureSearchResult::default();
    if !config.enabled || config.max_structures == 0 || config.max_tiles == 0 {
        return result;
    }

    let mut queue = VecDeque::from([trigger]);
    let mut processed: HashSet<TileCoord> = HashSet::new();
    let mut discovered: HashSet<(String, TileCoord)> = HashSet::new();
    let mut queued: HashSet<TileCoord> = HashSet::from([trigger]);

    'search: while let Some(tile) = queue.pop_front() {
        if !processed.insert(tile) {
            continue;
        }

        for instance in structures_touching(source, tile) {
            let key = (instance.structure.clone(), instance.start_tile);
            if discovered.contains(&key) {
                continue;
            }
            if discovered.len() >= config.max_structures {
                result.hit_structure_cap = true;
                break 'search;
            }
            discovered.insert(key);

            for covered in instance.footprint.tiles() {
                if queued.contains(&covered) || is_spawned(covered) {
                    continue;
                }
                if result.tiles.len() >= config.max_tiles {
                    result.hit_tile_cap = true;
                    break 'search;
                }
                queued.insert(covered);
                result.tiles.push(covered);
                queue.push_back(covered);
            }
        }
    }

    result.tiles.truncate(config.max_tiles);
    result.tiles.retain(|t| *t != trigger);
    result.structures_found = discovered.len();

    if !result.tiles.is_empty() {
        tracing::debug!(
            "Structure search from {trigger}: {} structures, {} tiles (structure cap: {}, tile cap: {})",
            result.structures_found,
            result.tiles.len(),
            result.hit_structure_cap,
            result.hit_tile_cap
        );
    }
    result
}

/// Structures starting in `tile`, then structures referenced from it.
fn structures_touching(source: &mut dyn SourceWorld, tile: TileCoord) -> Vec<StructureInstance> {
    let mut found = match source.structure_starts(tile) {
        Ok(starts) => starts,
        Err(err) => {
            tracing::debug!("Skipping structure starts of {tile}: {err}");
            Vec::new()
        }
    };

    let references = match source.structure_references(tile) {
        Ok(refs) => refs,
        Err(err) => {
            tracing::debug!("Skipping structure references of {tile}: {err}");
            return found;
        }
    };

    let mut pointers: Vec<(String, TileCoord)> = references
        .into_iter()
        .flat_map(|r| {
            let structure = r.structure;
            r.starts.into_iter().map(move |s| (structure.clone(), s))
        })
        .collect();
    pointers.sort_unstable();
    pointers.dedup();

    for (structure, start) in pointers {
        match source.structure_starts(start) {
            Ok(starts) => {
                found.extend(
                    starts
                        .into_iter()
                        .filter(|s| s.structure == structure && s.start_tile == start),
                );
            }
            Err(err) => {
                tracing::debug!("Skipping referenced {structure} start at {start}: {err}");
            }
        }
    }
    found
}
