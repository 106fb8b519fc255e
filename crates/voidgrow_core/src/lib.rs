//! # VOIDGROW Core
//!
//! Shared types for the chunk-expansion engine.
//!
//! ## Design Principles
//!
//! 1. **Single writer**: Ledger mutation happens on the world-update thread only
//! 2. **Monotonic**: The playable area only ever grows
//! 3. **Deterministic**: The ledger RNG is a persisted SplitMix64 stream
//!
//! ## Core Components
//!
//! - `TileCoord`: Identifies one chunk column of the world grid
//! - `VoxelState` / `BlockPalette`: Voxel values and their classification
//! - `PlayableAreaLedger`: Occupied tiles, provenance metadata, RNG state
//! - `LedgerStore`: JSON persistence with graceful fallback
//!
//! ## Example
//!
//! ```rust,ignore
//! use voidgrow_core::{PlayableAreaLedger, TileCoord};
//!
//! let mut ledger = PlayableAreaLedger::new();
//! ledger.initialize(TileCoord::new(0, 0));
//! ledger.add_tile(TileCoord::new(0, 0));
//!
//! assert!(ledger.can_expand_into(TileCoord::new(1, 0)));
//! assert!(!ledger.can_expand_into(TileCoord::new(1, 1)));
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod error;
pub mod ids;
pub mod ledger;
pub mod persistence;
pub mod rng;
pub mod tile;
pub mod voxel;

pub use error::{CoreError, CoreResult};
pub use ids::{CategoryId, TierId};
pub use ledger::{LedgerSnapshot, PlayableAreaLedger, TileMeta};
pub use persistence::{LedgerRecord, LedgerStore, LEDGER_FORMAT_VERSION};
pub use tile::{BlockPos, TileCoord, TILE_SIZE};
pub use voxel::{BlockPalette, VoxelClass, VoxelState};
