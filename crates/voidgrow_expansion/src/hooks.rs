//! # Expansion Hooks
//!
//! Outbound notifications. The manager calls these on the world thread in
//! this order after a successful copy:
//!
//! ```text
//! seed_mobs ─> broadcast(TileExpanded) ─> notify_requester(Completed) ─> consume_origin_marker
//! ```

use voidgrow_core::{CategoryId, TierId, TileCoord};
use voidgrow_rules::MobSpawnRule;

use crate::request::{OriginMarker, RejectReason, Requester};

/// World-wide announcements.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExpansionEvent {
    /// A tile became playable.
    TileExpanded {
        /// The new tile.
        tile: TileCoord,
        /// Category it was copied from.
        category: CategoryId,
        /// Request tier.
        tier: TierId,
        /// Display name of the requester.
        requester: String,
        /// Pulled in by a structure cascade.
        structure_triggered: bool,
    },
    /// A structure search queued extra tiles.
    StructureCascade {
        /// Tile whose expansion triggered the search.
        trigger: TileCoord,
        /// Structures discovered.
        structures: usize,
        /// Tiles queued.
        tiles: usize,
    },
}

/// Messages for the requester alone.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RequesterNotice {
    /// The request was refused at admission.
    Rejected {
        /// Requested tile.
        tile: TileCoord,
        /// Why.
        reason: RejectReason,
    },
    /// The tile was filled.
    Completed {
        /// Filled tile.
        tile: TileCoord,
        /// Category copied.
        category: CategoryId,
    },
    /// The request was admitted but could not be carried out.
    Failed {
        /// Requested tile.
        tile: TileCoord,
        /// Human-readable cause.
        message: String,
    },
}

/// Sinks for expansion notifications. All methods have no-op defaults.
pub trait ExpansionHooks {
    /// Announces an event to everyone.
    fn broadcast(&mut self, event: ExpansionEvent) {
        let _ = event;
    }

    /// Tells one requester how their request went.
    fn notify_requester(&mut self, requester: &Requester, notice: RequesterNotice) {
        let _ = (requester, notice);
    }

    /// Removes the marker that triggered a completed request.
    fn consume_origin_marker(&mut self, marker: &OriginMarker) {
        let _ = marker;
    }

    /// Populates a freshly revealed tile. Called once per tile.
    fn seed_mobs(&mut self, tile: TileCoord, category: &CategoryId, tier: &TierId, spawns: &[MobSpawnRule]) {
        let _ = (tile, category, tier, spawns);
    }
}

/// Hooks that drop everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopHooks;

impl ExpansionHooks for NoopHooks {}
