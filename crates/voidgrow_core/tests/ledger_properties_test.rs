//! # Ledger Property Tests
//!
//! Randomized checks of the adjacency invariant and of RNG persistence.

use std::collections::HashSet;

use proptest::prelude::*;
use voidgrow_core::{PlayableAreaLedger, TileCoord};

fn arb_tiles() -> impl Strategy<Value = Vec<(i32, i32)>> {
    prop::collection::vec((-6i32..6, -6i32..6), 0..40)
}

proptest! {
    #[test]
    fn prop_can_expand_into_matches_definition(tiles in arb_tiles(), candidate in (-8i32..8, -8i32..8)) {
        let mut ledger = PlayableAreaLedger::new();
        let occupied: HashSet<TileCoord> =
            tiles.iter().map(|&(x, z)| TileCoord::new(x, z)).collect();
        for tile in &occupied {
            ledger.add_tile(*tile);
        }

        let t = TileCoord::new(candidate.0, candidate.1);
        let expected = !occupied.contains(&t)
            && [(1, 0), (-1, 0), (0, 1), (0, -1)]
                .iter()
                .any(|(dx, dz)| occupied.contains(&TileCoord::new(t.x + dx, t.z + dz)));
        prop_assert_eq!(ledger.can_expand_into(t), expected);
    }

    #[test]
    fn prop_expandable_tiles_all_admissible(tiles in arb_tiles()) {
        let mut ledger = PlayableAreaLedger::new();
        for &(x, z) in &tiles {
            ledger.add_tile(TileCoord::new(x, z));
        }
        for tile in ledger.expandable_tiles() {
            prop_assert!(ledger.can_expand_into(tile));
        }
        for tile in ledger.frontier_tiles() {
            prop_assert!(ledger.is_playable(tile));
        }
    }

    #[test]
    fn prop_rng_survives_save_reload(seed in any::<u64>(), split in 0usize..16) {
        let bounds: Vec<u32> = (1..=16).collect();

        let mut straight = PlayableAreaLedger::new();
        straight.initialize(TileCoord::new(1, -1));
        let expected: Vec<u32> = bounds
            .iter()
            .map(|b| straight.next_deterministic_int(seed, *b).unwrap())
            .collect();

        let mut ledger = PlayableAreaLedger::new();
        ledger.initialize(TileCoord::new(1, -1));
        let mut actual: Vec<u32> = bounds[..split]
            .iter()
            .map(|b| ledger.next_deterministic_int(seed, *b).unwrap())
            .collect();
        let mut reloaded = PlayableAreaLedger::from_json(&ledger.to_json().unwrap()).unwrap();
        actual.extend(
            bounds[split..]
                .iter()
                .map(|b| reloaded.next_deterministic_int(seed, *b).unwrap()),
        );

        prop_assert_eq!(expected, actual);
    }
}
