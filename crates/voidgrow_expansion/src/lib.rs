//! # VOIDGROW Expansion Engine
//!
//! Grows the playable area of the main world one tile at a time by copying
//! terrain out of per-category source worlds.
//!
//! ## Request Lifecycle
//!
//! ```text
//! ┌───────────┐  enqueue   ┌──────────┐  tick (idle)  ┌────────┐  tick (done)  ┌───────────┐
//! │ Requested │──────────> │ Admitted │─────────────> │ Active │─────────────> │ Completed │
//! └───────────┘            └──────────┘               └────────┘               └───────────┘
//!       │ already spawned /      │ unknown category /     │ world error
//!       │ not adjacent /         │ empty pool             │
//!       ▼ in progress            ▼                        ▼
//!   Rejected                   Failed                   Failed
//! ```
//!
//! ## Core Components
//!
//! - `ExpansionManager`: Owns the ledger and resolver, admits and runs requests
//! - `ExpansionHandle`: Cloneable, thread-safe way to reach the manager
//! - `TileCopyJob`: Copies one tile, a few layers per tick
//! - `find_structure_tiles`: Finds tiles needed to show whole structures
//!
//! ## Example
//!
//! ```rust,ignore
//! let mut manager = ExpansionManager::new(config, seed, ledger, resolver, categories, palette);
//! manager.place_starting_area(&world);
//!
//! loop {
//!     let mut env = WorldEnv { main: &mut world, sources: &mut sources, hooks: &mut hooks };
//!     manager.tick(&mut env);
//! }
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod copy_job;
pub mod error;
pub mod handle;
pub mod hooks;
pub mod manager;
pub mod request;
pub mod start_area;
pub mod structure_search;
pub mod world;

pub use config::{ExpansionConfig, StartAreaConfig, StructureSearchConfig};
pub use copy_job::{compile_replacements, CompiledReplacement, CopyProgress, TileCopyJob};
pub use error::{ExpansionError, ExpansionResult, WorldError};
pub use handle::{ExpansionHandle, ManagerCommand};
pub use hooks::{ExpansionEvent, ExpansionHooks, NoopHooks, RequesterNotice};
pub use manager::{ExpansionManager, ExpansionStats, TickOutcome};
pub use request::{EnqueueResult, ExpansionRequest, OriginMarker, RejectReason, Requester};
pub use start_area::StartArea;
pub use structure_search::{find_structure_tiles, StructureSearchResult};
pub use world::{
    HeightRange, MainWorld, SourceWorld, SourceWorlds, StructureInstance, StructureRef, TileRect,
    WorldEnv,
};
