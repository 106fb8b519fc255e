//! # World Loop
//!
//! The single world-update thread.
//!
//! ```text
//! every tick:
//! ┌─────────────────────────────────────────────────────────────┐
//! │ 1. manager.tick()   drain inbox, advance the copy job       │
//! │ 2. autosave         every N ticks, only if the ledger dirty │
//! │ 3. publish          refresh the shared diagnostic snapshot  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Other threads never touch the manager. They send requests through an
//! `ExpansionHandle` and read the `SharedSnapshot`.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError};
use parking_lot::RwLock;
use serde::Deserialize;
use voidgrow_core::{LedgerSnapshot, LedgerStore, TileCoord};
use voidgrow_expansion::{
    ExpansionHandle, ExpansionHooks, ExpansionManager, ExpansionStats, MainWorld, SourceWorlds, TickOutcome,
    WorldEnv,
};

use crate::error::{HostError, HostResult};

/// Loop timing and persistence settings (`[world_loop]` table).
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WorldLoopConfig {
    /// Milliseconds between ticks in `run`.
    pub tick_interval_ms: u64,
    /// Save the ledger every this many ticks (0 disables autosave).
    pub autosave_every: u64,
    /// Refresh the snapshot every this many ticks.
    pub snapshot_every: u64,
}

impl Default for WorldLoopConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 50,
            autosave_every: 200,
            snapshot_every: 1,
        }
    }
}

#[derive(Default, Deserialize)]
struct LoopFile {
    #[serde(default)]
    world_loop: WorldLoopConfig,
}

impl WorldLoopConfig {
    /// Reads the `[world_loop]` table of a TOML document; other tables are
    /// ignored.
    ///
    /// # Errors
    ///
    /// Returns error if the document is not valid TOML.
    pub fn from_toml_str(text: &str) -> HostResult<Self> {
        let file: LoopFile = toml::from_str(text).map_err(|e| HostError::Config {
            path: "<inline>".to_owned(),
            message: e.to_string(),
        })?;
        Ok(file.world_loop)
    }

    /// Reads the `[world_loop]` table of a file.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> HostResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| HostError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text).map_err(|err| match err {
            HostError::Config { message, .. } => HostError::Config {
                path: path.display().to_string(),
                message,
            },
            other => other,
        })
    }
}

/// What readers outside the world thread can see.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WorldSnapshot {
    /// Ticks run so far.
    pub tick: u64,
    /// Ledger diagnostics.
    pub ledger: LedgerSnapshot,
    /// Manager counters.
    pub stats: ExpansionStats,
    /// Requests waiting behind the active one.
    pub queued: usize,
    /// Tile being copied right now.
    pub active: Option<TileCoord>,
    /// Generation of the installed rule set.
    pub rules_generation: u64,
}

/// Read-mostly snapshot shared between threads.
#[derive(Clone, Debug, Default)]
pub struct SharedSnapshot(Arc<RwLock<WorldSnapshot>>);

impl SharedSnapshot {
    /// Copies out the latest snapshot.
    #[must_use]
    pub fn read(&self) -> WorldSnapshot {
        self.0.read().clone()
    }

    /// Ticks run at the time of the last publish.
    #[must_use]
    pub fn tick(&self) -> u64 {
        self.0.read().tick
    }

    fn publish(&self, snapshot: WorldSnapshot) {
        *self.0.write() = snapshot;
    }
}

/// Owns the manager and the worlds and drives them.
pub struct WorldLoop<M, S, H> {
    manager: ExpansionManager,
    main: M,
    sources: S,
    hooks: H,
    store: Option<LedgerStore>,
    config: WorldLoopConfig,
    tick: u64,
    snapshot: SharedSnapshot,
}

impl<M: MainWorld, S: SourceWorlds, H: ExpansionHooks> WorldLoop<M, S, H> {
    /// Assembles a loop. Without a store the ledger lives in memory only.
    #[must_use]
    pub fn new(
        manager: ExpansionManager,
        main: M,
        sources: S,
        hooks: H,
        store: Option<LedgerStore>,
        config: WorldLoopConfig,
    ) -> Self {
        let this = Self {
            manager,
            main,
            sources,
            hooks,
            store,
            config,
            tick: 0,
            snapshot: SharedSnapshot::default(),
        };
        this.publish();
        this
    }

    /// Queues the starting area if the world is new.
    pub fn start(&mut self) -> usize {
        let queued = self.manager.place_starting_area(&self.main);
        self.publish();
        queued
    }

    /// Runs one tick.
    pub fn step(&mut self) -> TickOutcome {
        let outcome = {
            let mut env = WorldEnv {
                main: &mut self.main,
                sources: &mut self.sources,
                hooks: &mut self.hooks,
            };
            self.manager.tick(&mut env)
        };
        self.tick += 1;

        if self.config.autosave_every > 0 && self.tick % self.config.autosave_every == 0 {
            self.autosave();
        }
        let committed = matches!(outcome, TickOutcome::Completed(_) | TickOutcome::Failed(_));
        if committed || self.tick % self.config.snapshot_every.max(1) == 0 {
            self.publish();
        }
        outcome
    }

    /// Steps until the manager is idle or `max_ticks` have run. Returns the
    /// number of ticks taken.
    pub fn run_until_idle(&mut self, max_ticks: u64) -> u64 {
        let mut ticks = 0;
        while ticks < max_ticks {
            let outcome = self.step();
            ticks += 1;
            if outcome == TickOutcome::Idle && self.manager.is_idle() {
                break;
            }
        }
        self.publish();
        ticks
    }

    /// Ticks on a fixed interval until `shutdown` fires or disconnects,
    /// then saves.
    ///
    /// # Errors
    ///
    /// Returns error if the final save fails.
    pub fn run(&mut self, shutdown: &Receiver<()>) -> HostResult<()> {
        let interval = Duration::from_millis(self.config.tick_interval_ms.max(1));
        tracing::info!("World loop running at {}ms per tick", interval.as_millis());
        loop {
            match shutdown.recv_timeout(interval) {
                Err(RecvTimeoutError::Timeout) => {
                    self.step();
                }
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        tracing::info!("World loop stopping after {} ticks", self.tick);
        self.publish();
        self.save()
    }

    /// Writes the ledger now, dirty or not.
    ///
    /// # Errors
    ///
    /// Returns error if the store cannot write the file.
    pub fn save(&mut self) -> HostResult<()> {
        if let Some(store) = &self.store {
            store.save(self.manager.ledger_mut())?;
        }
        Ok(())
    }

    fn autosave(&mut self) {
        let Some(store) = &self.store else {
            return;
        };
        if !self.manager.ledger().is_dirty() {
            return;
        }
        if let Err(err) = store.save(self.manager.ledger_mut()) {
            // Stays dirty, so the next autosave retries.
            tracing::warn!("Autosave to {} failed: {err}", store.path().display());
        }
    }

    fn publish(&self) {
        self.snapshot.publish(WorldSnapshot {
            tick: self.tick,
            ledger: self.manager.ledger_snapshot(),
            stats: self.manager.stats(),
            queued: self.manager.queue_len(),
            active: self.manager.active_tile(),
            rules_generation: self.manager.rules_generation(),
        });
    }

    /// A reader for the snapshot.
    #[must_use]
    pub fn snapshot(&self) -> SharedSnapshot {
        self.snapshot.clone()
    }

    /// A request handle for other threads.
    #[must_use]
    pub fn handle(&self) -> ExpansionHandle {
        self.manager.handle()
    }

    /// Ticks run so far.
    #[inline]
    #[must_use]
    pub fn ticks(&self) -> u64 {
        self.tick
    }

    /// The manager.
    #[must_use]
    pub fn manager(&self) -> &ExpansionManager {
        &self.manager
    }

    /// The main world.
    #[must_use]
    pub fn main(&self) -> &M {
        &self.main
    }

    /// The source worlds.
    pub fn sources_mut(&mut self) -> &mut S {
        &mut self.sources
    }

    /// The hooks.
    #[must_use]
    pub fn hooks(&self) -> &H {
        &self.hooks
    }

    /// Takes the loop apart.
    #[must_use]
    pub fn into_parts(self) -> (ExpansionManager, M, S, H) {
        (self.manager, self.main, self.sources, self.hooks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_reads_only_its_table() {
        let config = WorldLoopConfig::from_toml_str(
            "layers_per_tick = 4\n[world_loop]\nautosave_every = 10\n[start_area]\nradius = 2\n",
        )
        .unwrap();
        assert_eq!(config.autosave_every, 10);
        assert_eq!(config.tick_interval_ms, 50);
        assert_eq!(WorldLoopConfig::from_toml_str("").unwrap(), WorldLoopConfig::default());
    }

    #[test]
    fn test_shared_snapshot_clones_see_updates() {
        let shared = SharedSnapshot::default();
        let reader = shared.clone();
        shared.publish(WorldSnapshot {
            tick: 7,
            ..WorldSnapshot::default()
        });
        assert_eq!(reader.tick(), 7);
        assert_eq!(reader.read().queued, 0);
    }
}
