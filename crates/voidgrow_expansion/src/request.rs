//! Expansion requests and admission outcomes.

use std::fmt;

use voidgrow_core::{CategoryId, TierId, TileCoord};

/// Who asked for an expansion.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Requester {
    /// Player id, if a player asked.
    pub id: Option<u64>,
    /// Display name ("server" for engine-initiated requests).
    pub name: String,
}

impl Requester {
    /// A player requester.
    #[must_use]
    pub fn player(id: u64, name: impl Into<String>) -> Self {
        Self {
            id: Some(id),
            name: name.into(),
        }
    }

    /// The engine itself (starting area, structure cascades).
    #[must_use]
    pub fn server() -> Self {
        Self {
            id: None,
            name: "server".to_owned(),
        }
    }
}

/// The in-world item or block that triggered a request. Consumed on success.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct OriginMarker {
    /// Host-defined marker id.
    pub id: u64,
    /// Tile the marker sits in.
    pub tile: TileCoord,
}

/// A request to fill one tile.
///
/// De-duplication identity is `target_tile`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExpansionRequest {
    /// World the request targets.
    pub world_id: String,
    /// Marker to consume on success.
    pub origin_marker: Option<OriginMarker>,
    /// Request tier.
    pub tier: TierId,
    /// Tile to fill.
    pub target_tile: TileCoord,
    /// Category to copy; `None` draws from the tier's pool.
    pub category: Option<CategoryId>,
    /// Who asked.
    pub requester: Requester,
    /// Skip the adjacency check.
    pub force: bool,
    /// Pulled in to complete a structure.
    pub structure_triggered: bool,
    /// Tile whose expansion caused the cascade.
    pub triggering_tile: Option<TileCoord>,
}

impl ExpansionRequest {
    /// A plain request for `target_tile` at `tier`.
    #[must_use]
    pub fn new(world_id: impl Into<String>, tier: impl Into<TierId>, target_tile: TileCoord) -> Self {
        Self {
            world_id: world_id.into(),
            origin_marker: None,
            tier: tier.into(),
            target_tile,
            category: None,
            requester: Requester::server(),
            force: false,
            structure_triggered: false,
            triggering_tile: None,
        }
    }

    /// Pins the category instead of drawing from the pool.
    #[must_use]
    pub fn with_category(mut self, category: impl Into<CategoryId>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Sets the requester.
    #[must_use]
    pub fn with_requester(mut self, requester: Requester) -> Self {
        self.requester = requester;
        self
    }

    /// Sets the origin marker.
    #[must_use]
    pub fn with_origin_marker(mut self, marker: OriginMarker) -> Self {
        self.origin_marker = Some(marker);
        self
    }

    /// Skips the adjacency check.
    #[must_use]
    pub fn forced(mut self) -> Self {
        self.force = true;
        self
    }

    /// Marks the request as a structure cascade from `trigger`.
    #[must_use]
    pub fn cascade_from(mut self, trigger: TileCoord) -> Self {
        self.force = true;
        self.structure_triggered = true;
        self.triggering_tile = Some(trigger);
        self
    }
}

/// Why a request was not admitted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RejectReason {
    /// The tile is already playable.
    AlreadySpawned,
    /// No orthogonal neighbour is playable.
    NotAdjacent,
    /// A request for the tile is queued or running.
    InProgress,
    /// The cross-thread inbox is full.
    InboxFull,
    /// The world thread is gone.
    Shutdown,
    /// The request names a different world.
    WrongWorld,
    /// The tile's block coordinates do not fit in `i32`.
    OutOfBounds,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::AlreadySpawned => "already spawned",
            Self::NotAdjacent => "not adjacent",
            Self::InProgress => "in progress",
            Self::InboxFull => "inbox full",
            Self::Shutdown => "shut down",
            Self::WrongWorld => "wrong world",
            Self::OutOfBounds => "outside the world",
        })
    }
}

/// Admission result.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[must_use]
pub enum EnqueueResult {
    /// Queued (or, through a handle, handed to the world thread).
    Accepted,
    /// Not admitted.
    Rejected(RejectReason),
}

impl EnqueueResult {
    /// Returns true for `Accepted`.
    #[inline]
    #[must_use]
    pub const fn is_accepted(self) -> bool {
        matches!(self, Self::Accepted)
    }
}
