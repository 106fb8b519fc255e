//! # Expansion Error Types
//!
//! Admission problems are not errors (see `RejectReason`). Everything here
//! aborts one request and nothing else.

use thiserror::Error;
use voidgrow_core::{BlockPos, CategoryId, CoreError, TierId, TileCoord};

/// Errors raised by a world collaborator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorldError {
    /// The tile is not resident and could not be loaded.
    #[error("tile {0} is not loaded")]
    NotLoaded(TileCoord),

    /// The position is outside the world's height range.
    #[error("position ({}, {}, {}) is out of bounds", .0.x, .0.y, .0.z)]
    OutOfBounds(BlockPos),

    /// Any other engine-side failure.
    #[error("engine error: {0}")]
    Engine(String),
}

/// Errors that abort an expansion request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExpansionError {
    /// The category is not registered.
    #[error("unknown category: {0}")]
    UnknownCategory(CategoryId),

    /// No category can be drawn for the tier.
    #[error("tier {0} has no categories to pick from")]
    EmptyPool(TierId),

    /// No source world exists for the category.
    #[error("no source world for category {0}")]
    NoSourceWorld(CategoryId),

    /// A world collaborator failed mid-copy.
    #[error(transparent)]
    World(#[from] WorldError),

    /// A ledger operation failed.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Invalid configuration file.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for expansion operations.
pub type ExpansionResult<T> = Result<T, ExpansionError>;
