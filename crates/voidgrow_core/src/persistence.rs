//! # Ledger Persistence
//!
//! The ledger is saved as one self-describing JSON record per world.
//!
//! ## Format
//!
//! ```text
//! {
//!   "version": 1,
//!   "initialized": true,
//!   "anchor_tile": { "x": 0, "z": 0 },
//!   "occupied": [ { "x": 0, "z": 0 }, ... ],          // sorted
//!   "rng_state": 12345,                                // default 0
//!   "tile_meta": [ { "tile": {..}, "category": "plains", "tier": "copper",
//!                    "structure_triggered": false,
//!                    "triggering_tile": null }, ... ]  // default []
//! }
//! ```
//!
//! ## Failure Policy
//!
//! A ledger that cannot be read is replaced by an empty, uninitialized one.
//! The world becomes re-initializable instead of refusing to start.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::ids::{CategoryId, TierId};
use crate::ledger::{PlayableAreaLedger, TileMeta};
use crate::tile::TileCoord;

/// Current ledger record format version.
pub const LEDGER_FORMAT_VERSION: u32 = 1;

fn default_version() -> u32 {
    LEDGER_FORMAT_VERSION
}

/// One persisted `tile_meta` entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileMetaRecord {
    /// Tile the metadata belongs to.
    pub tile: TileCoord,
    /// Category the tile was copied from.
    pub category: CategoryId,
    /// Tier of the filling request.
    pub tier: TierId,
    /// True if pulled in by a structure cascade.
    #[serde(default)]
    pub structure_triggered: bool,
    /// Tile that triggered the cascade.
    #[serde(default)]
    pub triggering_tile: Option<TileCoord>,
}

/// Serialized form of a `PlayableAreaLedger`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerRecord {
    /// Format version.
    #[serde(default = "default_version")]
    pub version: u32,
    /// Whether the anchor has been set.
    #[serde(default)]
    pub initialized: bool,
    /// Seed region center.
    #[serde(default)]
    pub anchor_tile: TileCoord,
    /// Playable tiles, sorted.
    #[serde(default)]
    pub occupied: Vec<TileCoord>,
    /// RNG state; 0 means reseed lazily.
    #[serde(default)]
    pub rng_state: u64,
    /// Per-tile provenance, sorted by tile.
    #[serde(default)]
    pub tile_meta: Vec<TileMetaRecord>,
}

impl From<&PlayableAreaLedger> for LedgerRecord {
    fn from(ledger: &PlayableAreaLedger) -> Self {
        let mut occupied: Vec<TileCoord> = ledger.occupied.iter().copied().collect();
        occupied.sort_unstable();

        let mut tile_meta: Vec<TileMetaRecord> = ledger
            .tile_meta
            .iter()
            .map(|(tile, meta)| TileMetaRecord {
                tile: *tile,
                category: meta.category.clone(),
                tier: meta.tier.clone(),
                structure_triggered: meta.structure_triggered,
                triggering_tile: meta.triggering_tile,
            })
            .collect();
        tile_meta.sort_unstable_by_key(|m| m.tile);

        Self {
            version: LEDGER_FORMAT_VERSION,
            initialized: ledger.initialized,
            anchor_tile: ledger.anchor_tile,
            occupied,
            rng_state: ledger.rng_state,
            tile_meta,
        }
    }
}

impl LedgerRecord {
    /// Rebuilds a ledger from the record.
    ///
    /// Metadata for tiles missing from `occupied` is dropped so the
    /// `occupied ⊇ keys(tile_meta)` invariant holds for hand-edited files.
    ///
    /// # Errors
    ///
    /// Returns error if the record was written by a newer format version.
    pub fn into_ledger(self) -> CoreResult<PlayableAreaLedger> {
        if self.version > LEDGER_FORMAT_VERSION {
            return Err(CoreError::UnsupportedVersion {
                found: self.version,
                supported: LEDGER_FORMAT_VERSION,
            });
        }

        let mut ledger = PlayableAreaLedger {
            initialized: self.initialized,
            anchor_tile: self.anchor_tile,
            occupied: self.occupied.into_iter().collect(),
            rng_state: self.rng_state,
            ..PlayableAreaLedger::default()
        };

        for entry in self.tile_meta {
            if !ledger.occupied.contains(&entry.tile) {
                tracing::warn!("Dropping metadata for unoccupied tile {}", entry.tile);
                continue;
            }
            ledger.tile_meta.insert(
                entry.tile,
                TileMeta {
                    category: entry.category,
                    tier: entry.tier,
                    structure_triggered: entry.structure_triggered,
                    triggering_tile: entry.triggering_tile,
                },
            );
        }

        Ok(ledger)
    }
}

impl PlayableAreaLedger {
    /// Serializes the ledger to its JSON record.
    ///
    /// # Errors
    ///
    /// Returns error if serialization fails.
    pub fn to_json(&self) -> CoreResult<String> {
        Ok(serde_json::to_string_pretty(&LedgerRecord::from(self))?)
    }

    /// Parses a ledger from its JSON record.
    ///
    /// # Errors
    ///
    /// Returns error if the JSON is malformed or from a newer version.
    pub fn from_json(json: &str) -> CoreResult<Self> {
        let record: LedgerRecord = serde_json::from_str(json)?;
        record.into_ledger()
    }
}

/// File-backed ledger storage.
#[derive(Clone, Debug)]
pub struct LedgerStore {
    path: PathBuf,
}

impl LedgerStore {
    /// Creates a store writing to `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the ledger file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes the ledger and clears its dirty flag.
    ///
    /// The record is written to a sibling temp file first and renamed over
    /// the old one, so a crash mid-write never leaves a truncated ledger.
    ///
    /// # Errors
    ///
    /// Returns error if serialization or file operations fail.
    pub fn save(&self, ledger: &mut PlayableAreaLedger) -> CoreResult<()> {
        let json = ledger.to_json()?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        ledger.mark_clean();
        tracing::debug!(
            "Saved ledger ({} tiles) to {}",
            ledger.occupied_count(),
            self.path.display()
        );
        Ok(())
    }

    /// Reads the ledger.
    ///
    /// # Errors
    ///
    /// Returns error if the file is missing, unreadable, or corrupt.
    pub fn load(&self) -> CoreResult<PlayableAreaLedger> {
        let json = fs::read_to_string(&self.path)?;
        PlayableAreaLedger::from_json(&json)
    }

    /// Reads the ledger, falling back to an empty one on any failure.
    #[must_use]
    pub fn load_or_default(&self) -> PlayableAreaLedger {
        if !self.path.exists() {
            tracing::info!("No ledger at {}, starting empty", self.path.display());
            return PlayableAreaLedger::new();
        }
        match self.load() {
            Ok(ledger) => {
                tracing::info!(
                    "Loaded ledger with {} tiles from {}",
                    ledger.occupied_count(),
                    self.path.display()
                );
                ledger
            }
            Err(err) => {
                tracing::warn!(
                    "Failed to load ledger from {} ({err}); resetting to empty",
                    self.path.display()
                );
                PlayableAreaLedger::new()
            }
        }
    }
}
