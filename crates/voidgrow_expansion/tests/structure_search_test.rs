//! Bounded structure-completion search.

mod common;

use common::FakeSource;
use voidgrow_core::TileCoord;
use voidgrow_expansion::{find_structure_tiles, StructureInstance, StructureRef, StructureSearchConfig, TileRect};

fn hut(start: TileCoord) -> StructureInstance {
    StructureInstance {
        structure: "hut".to_owned(),
        start_tile: start,
        footprint: TileRect::single(start),
    }
}

/// Trigger `(0, 0)` references five single-tile huts at `(1..=5, 0)`.
fn five_huts() -> FakeSource {
    let mut source = FakeSource::default();
    let starts: Vec<TileCoord> = (1..=5).rev().map(|x| TileCoord::new(x, 0)).collect();
    for start in &starts {
        source.starts.insert(*start, vec![hut(*start)]);
    }
    source.references.insert(
        TileCoord::new(0, 0),
        vec![StructureRef {
            structure: "hut".to_owned(),
            starts,
        }],
    );
    source
}

fn config(max_structures: usize, max_tiles: usize) -> StructureSearchConfig {
    StructureSearchConfig {
        enabled: true,
        max_structures,
        max_tiles,
    }
}

#[test]
fn test_structure_cap_terminates() {
    let mut source = five_huts();
    let result = find_structure_tiles(&mut source, TileCoord::new(0, 0), |_| false, &config(2, 4));
    assert_eq!(result.tiles, [TileCoord::new(1, 0), TileCoord::new(2, 0)]);
    assert_eq!(result.structures_found, 2);
    assert!(result.hit_structure_cap);
    assert!(!result.hit_tile_cap);
}

#[test]
fn test_tile_cap_terminates() {
    let mut source = five_huts();
    let result = find_structure_tiles(&mut source, TileCoord::new(0, 0), |_| false, &config(8, 4));
    assert_eq!(result.tiles.len(), 4);
    assert_eq!(result.tiles[3], TileCoord::new(4, 0));
    assert_eq!(result.structures_found, 5);
    assert!(result.hit_tile_cap);
    assert!(!result.hit_structure_cap);
}

#[test]
fn test_uncapped_finds_everything() {
    let mut source = five_huts();
    let result = find_structure_tiles(&mut source, TileCoord::new(0, 0), |_| false, &config(8, 32));
    assert_eq!(result.tiles.len(), 5);
    assert!(!result.hit_tile_cap && !result.hit_structure_cap);
}

#[test]
fn test_disabled_returns_nothing() {
    let mut source = five_huts();
    let mut cfg = config(8, 32);
    cfg.enabled = false;
    let result = find_structure_tiles(&mut source, TileCoord::new(0, 0), |_| false, &cfg);
    assert!(result.is_empty());
    assert_eq!(result.structures_found, 0);
}

#[test]
fn test_spawned_tiles_are_skipped() {
    let mut source = five_huts();
    let spawned = [TileCoord::new(2, 0), TileCoord::new(3, 0)];
    let result = find_structure_tiles(
        &mut source,
        TileCoord::new(0, 0),
        |t| spawned.contains(&t),
        &config(8, 32),
    );
    assert_eq!(
        result.tiles,
        [TileCoord::new(1, 0), TileCoord::new(4, 0), TileCoord::new(5, 0)]
    );
}

#[test]
fn test_chain_is_followed_and_trigger_excluded() {
    let mut source = FakeSource::default();
    // A covers (0,0)-(1,0); B starts in (1,0) and covers (1,0)-(1,2).
    source.add_structure(StructureInstance {
        structure: "wall".to_owned(),
        start_tile: TileCoord::new(0, 0),
        footprint: TileRect::new(TileCoord::new(0, 0), TileCoord::new(1, 0)),
    });
    source.add_structure(StructureInstance {
        structure: "tower".to_owned(),
        start_tile: TileCoord::new(1, 0),
        footprint: TileRect::new(TileCoord::new(1, 0), TileCoord::new(1, 2)),
    });

    let result = find_structure_tiles(&mut source, TileCoord::new(0, 0), |_| false, &config(8, 32));
    assert_eq!(
        result.tiles,
        [TileCoord::new(1, 0), TileCoord::new(1, 1), TileCoord::new(1, 2)]
    );
    assert!(!result.tiles.contains(&TileCoord::new(0, 0)));
    assert_eq!(result.structures_found, 2);
}

#[test]
fn test_fetch_failure_is_skipped() {
    let mut source = five_huts();
    source.broken.insert(TileCoord::new(3, 0));
    let result = find_structure_tiles(&mut source, TileCoord::new(0, 0), |_| false, &config(8, 32));
    assert_eq!(
        result.tiles,
        [TileCoord::new(1, 0), TileCoord::new(2, 0), TileCoord::new(4, 0), TileCoord::new(5, 0)]
    );
    assert_eq!(result.structures_found, 4);
}
