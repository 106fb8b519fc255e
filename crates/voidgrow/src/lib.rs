//! # VOIDGROW
//!
//! Host runtime tying the engine crates to a running world.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                             VOIDGROW HOST                               │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌─────────────────┐     ┌─────────────────┐     ┌─────────────────┐    │
//! │  │ voidgrow_core   │     │ voidgrow_rules  │     │ setup (TOML)    │    │
//! │  │  • Ledger       │────>│  • Tiers        │<────│  • Palette      │    │
//! │  │  • Persistence  │     │  • Rule resolver│     │  • Categories   │    │
//! │  └────────┬────────┘     └────────┬────────┘     └────────┬────────┘    │
//! │           │                       │                       │             │
//! │           ▼                       ▼                       ▼             │
//! │  ┌───────────────────────────────────────────────────────────────────┐  │
//! │  │ world_loop: ExpansionManager + MemoryWorld + MemorySources        │  │
//! │  └─────────────┬──────────────────────────────────────┬──────────────┘  │
//! │                │ BusHooks                             │ SharedSnapshot  │
//! │                ▼                                      ▼                 │
//! │         events (channel)                      readers (any thread)      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - `events`: Expansion notifications as a bounded channel
//! - `memory`: In-memory main and source worlds
//! - `setup`: Palette, categories and worlds from TOML
//! - `world_loop`: Tick, autosave and snapshot publishing

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod error;
pub mod events;
pub mod memory;
pub mod setup;
pub mod world_loop;

pub use voidgrow_core as core;
pub use voidgrow_expansion as expansion;
pub use voidgrow_rules as rules;

pub use error::{HostError, HostResult};
pub use events::{BusHooks, EventBus, EventReceiver, WorldEvent};
pub use memory::{MemorySourceWorld, MemorySources, MemoryWorld, TerrainProfile};
pub use setup::{BuiltWorld, WorldSetup};
pub use world_loop::{SharedSnapshot, WorldLoop, WorldLoopConfig, WorldSnapshot};
