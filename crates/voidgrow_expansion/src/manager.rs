//! # Chunk-Expansion Manager
//!
//! The world thread's view of expansion. Owns the ledger, the resolver and
//! the registries; admits requests, runs one copy job at a time, and
//! commits results to the ledger.
//!
//! ## Tick Anatomy
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │ 1. DRAIN INBOX                                                   │
//! │    ├─ Enqueue requests from handles (rejections → requester)     │
//! │    ├─ Install rule sets                                          │
//! │    └─ Apply budget changes                                       │
//! │                                                                  │
//! │ 2a. ACTIVE JOB                                                   │
//! │    ├─ Copy up to `layers_per_tick` layers                        │
//! │    └─ On completion: commit or fail                              │
//! │                                                                  │
//! │ 2b. IDLE                                                         │
//! │    ├─ Pop next request                                           │
//! │    └─ Pick category, resolve, start job                          │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Commit Order
//!
//! `add_tile` → `record_meta` → `seed_mobs` (first reveal only) →
//! structure search → `TileExpanded` → requester notice → marker consumed.
//! A pool pick only previews the ledger RNG; the stream advances at commit,
//! so a failed job never touches the ledger.
//!
//! ## Admission
//!
//! Checked in order: world id, block range, already spawned, in progress,
//! not adjacent. Forced requests skip only the adjacency check.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use crossbeam_channel::{bounded, Receiver, Sender};
use voidgrow_core::{BlockPalette, CategoryId, LedgerSnapshot, PlayableAreaLedger, TierId, TileCoord};
use voidgrow_rules::{BiomeRuleResolver, CategoryRegistry, ResolvedCategory, RuleSet};

use crate::config::ExpansionConfig;
use crate::copy_job::{compile_replacements, TileCopyJob};
use crate::error::{ExpansionError, ExpansionResult, WorldError};
use crate::handle::{ExpansionHandle, ManagerCommand};
use crate::hooks::{ExpansionEvent, ExpansionHooks, RequesterNotice};
use crate::request::{EnqueueResult, ExpansionRequest, RejectReason, Requester};
use crate::start_area::StartArea;
use crate::structure_search::find_structure_tiles;
use crate::world::{MainWorld, WorldEnv};

/// Running counters since the manager was created.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExpansionStats {
    /// Requests admitted to the queue.
    pub accepted: u64,
    /// Requests refused at admission.
    pub rejected: u64,
    /// Tiles filled.
    pub completed: u64,
    /// Admitted requests that did not complete.
    pub failed: u64,
    /// Cascade requests admitted by structure searches.
    pub cascaded: u64,
}

/// What one `tick` did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// Nothing queued, nothing running.
    Idle,
    /// A job was started for the tile.
    Started(TileCoord),
    /// The running job advanced.
    Progressed(TileCoord),
    /// The tile was committed to the ledger.
    Completed(TileCoord),
    /// The request for the tile was dropped.
    Failed(TileCoord),
}

/// The request currently being copied.
#[derive(Debug)]
struct ActiveJob {
    request: ExpansionRequest,
    category: CategoryId,
    resolved: Arc<ResolvedCategory>,
    /// Ledger RNG state after the pool pick, applied on commit.
    rng_state: Option<u64>,
    job: TileCopyJob,
}

/// Expansion engine for one world.
pub struct ExpansionManager {
    config: ExpansionConfig,
    layers_per_tick: u32,
    world_seed: u64,
    ledger: PlayableAreaLedger,
    resolver: BiomeRuleResolver,
    categories: CategoryRegistry,
    palette: Arc<BlockPalette>,
    queue: VecDeque<ExpansionRequest>,
    in_flight: HashSet<TileCoord>,
    active: Option<ActiveJob>,
    inbox: Receiver<ManagerCommand>,
    sender: Sender<ManagerCommand>,
    stats: ExpansionStats,
}

impl ExpansionManager {
    /// Creates a manager around a loaded (or fresh) ledger.
    #[must_use]
    pub fn new(
        config: ExpansionConfig,
        world_seed: u64,
        ledger: PlayableAreaLedger,
        resolver: BiomeRuleResolver,
        categories: CategoryRegistry,
        palette: BlockPalette,
    ) -> Self {
        let (sender, inbox) = bounded(config.inbox_capacity.max(1));
        tracing::info!(
            "Expansion manager for '{}' ready: {} playable tiles, {} categories, {} layers/tick",
            config.world_id,
            ledger.occupied_count(),
            categories.len(),
            config.layers_per_tick
        );
        Self {
            layers_per_tick: config.layers_per_tick.max(1),
            config,
            world_seed,
            ledger,
            resolver,
            categories,
            palette: Arc::new(palette),
            queue: VecDeque::new(),
            in_flight: HashSet::new(),
            active: None,
            inbox,
            sender,
            stats: ExpansionStats::default(),
        }
    }

    /// A new handle for other threads.
    #[must_use]
    pub fn handle(&self) -> ExpansionHandle {
        ExpansionHandle::new(self.sender.clone())
    }

    /// The ledger.
    #[must_use]
    pub fn ledger(&self) -> &PlayableAreaLedger {
        &self.ledger
    }

    /// Mutable ledger access for persistence.
    pub fn ledger_mut(&mut self) -> &mut PlayableAreaLedger {
        &mut self.ledger
    }

    /// Diagnostic view of the playable area.
    #[must_use]
    pub fn ledger_snapshot(&self) -> LedgerSnapshot {
        self.ledger.snapshot()
    }

    /// Counters since creation.
    #[must_use]
    pub fn stats(&self) -> ExpansionStats {
        self.stats
    }

    /// The configuration the manager was built with.
    #[must_use]
    pub fn config(&self) -> &ExpansionConfig {
        &self.config
    }

    /// Registered categories.
    #[must_use]
    pub fn categories(&self) -> &CategoryRegistry {
        &self.categories
    }

    /// Current copy budget.
    #[must_use]
    pub fn layers_per_tick(&self) -> u32 {
        self.layers_per_tick
    }

    /// Changes the copy budget (clamped to at least 1).
    pub fn set_layers_per_tick(&mut self, layers: u32) {
        self.layers_per_tick = layers.max(1);
        tracing::info!("Copy budget set to {} layers/tick", self.layers_per_tick);
    }

    /// Swaps the rule set. Returns the new generation.
    pub fn install_rules(&mut self, rules: RuleSet) -> u64 {
        self.resolver.install(rules)
    }

    /// Generation of the installed rule set (0 = none).
    #[must_use]
    pub fn rules_generation(&self) -> u64 {
        self.resolver.generation()
    }

    /// Requests waiting to start.
    #[must_use]
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Tile being copied right now.
    #[must_use]
    pub fn active_tile(&self) -> Option<TileCoord> {
        self.active.as_ref().map(|a| a.request.target_tile)
    }

    /// Returns true if nothing is queued or running.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.active.is_none() && self.queue.is_empty()
    }

    /// Returns true if a request for the tile is queued or running.
    #[must_use]
    pub fn is_in_flight(&self, tile: TileCoord) -> bool {
        self.in_flight.contains(&tile)
    }

    /// Admits a request. Must be called on the world thread.
    pub fn enqueue(&mut self, request: ExpansionRequest) -> EnqueueResult {
        let tile = request.target_tile;
        let verdict = if request.world_id != self.config.world_id {
            Some(RejectReason::WrongWorld)
        } else if !tile.in_block_range() {
            Some(RejectReason::OutOfBounds)
        } else if self.ledger.is_playable(tile) {
            Some(RejectReason::AlreadySpawned)
        } else if self.in_flight.contains(&tile) {
            Some(RejectReason::InProgress)
        } else if !request.force && !self.ledger.can_expand_into(tile) {
            Some(RejectReason::NotAdjacent)
        } else {
            None
        };

        if let Some(reason) = verdict {
            self.stats.rejected += 1;
            tracing::debug!(
                "Rejected expansion of {tile} for {}: {reason}",
                request.requester.name
            );
            return EnqueueResult::Rejected(reason);
        }

        tracing::debug!(
            "Queued expansion of {tile} (tier {}, {})",
            request.tier,
            request.requester.name
        );
        self.in_flight.insert(tile);
        self.queue.push_back(request);
        self.stats.accepted += 1;
        EnqueueResult::Accepted
    }

    /// Lays out the seed region of a fresh world.
    ///
    /// Does nothing if the ledger is already initialized. Returns the number
    /// of seed requests admitted.
    pub fn place_starting_area(&mut self, main: &dyn MainWorld) -> usize {
        if self.ledger.is_initialized() {
            return 0;
        }

        let start = self.config.start_area.clone();
        let area = StartArea::locate(main, &start);
        self.ledger.initialize(area.anchor);

        if start.category.is_none() {
            let pool = self.resolver.weighted_pool(&self.categories, &start.tier);
            if pool.is_empty() {
                tracing::warn!(
                    "Starting area has no category and tier {} has an empty pool; seed tiles will fail",
                    start.tier
                );
            }
        }

        let mut admitted = 0;
        for tile in area.tiles() {
            let mut request = ExpansionRequest::new(self.config.world_id.clone(), start.tier.clone(), tile).forced();
            request.category.clone_from(&start.category);
            if self.enqueue(request).is_accepted() {
                admitted += 1;
            }
        }
        tracing::info!(
            "Starting area anchored at {}: {admitted} seed tiles queued",
            area.anchor
        );
        admitted
    }

    /// Runs one world-thread step.
    pub fn tick(&mut self, env: &mut WorldEnv<'_>) -> TickOutcome {
        self.drain_inbox(&mut *env.hooks);

        if let Some(active) = self.active.as_mut() {
            let tile = active.request.target_tile;
            let progress = active.job.tick(env, self.layers_per_tick);
            if !progress.done {
                return TickOutcome::Progressed(tile);
            }

            let Some(active) = self.active.take() else {
                return TickOutcome::Idle;
            };
            if progress.success {
                self.commit(active, env);
                return TickOutcome::Completed(tile);
            }
            let err = active
                .job
                .failure()
                .cloned()
                .unwrap_or_else(|| WorldError::Engine("copy aborted".to_owned()).into());
            self.fail(&active.request, &err, &mut *env.hooks);
            return TickOutcome::Failed(tile);
        }

        let Some(request) = self.queue.pop_front() else {
            return TickOutcome::Idle;
        };
        let tile = request.target_tile;
        match self.start_job(request, env) {
            Ok(active) => {
                tracing::info!(
                    "Expanding {tile} with {} (tier {})",
                    active.category,
                    active.request.tier
                );
                self.active = Some(active);
                TickOutcome::Started(tile)
            }
            Err((request, err)) => {
                self.fail(&request, &err, &mut *env.hooks);
                TickOutcome::Failed(tile)
            }
        }
    }

    fn drain_inbox(&mut self, hooks: &mut dyn ExpansionHooks) {
        while let Ok(command) = self.inbox.try_recv() {
            match command {
                ManagerCommand::Enqueue(request) => {
                    let tile = request.target_tile;
                    let requester = request.requester.clone();
                    if let EnqueueResult::Rejected(reason) = self.enqueue(request) {
                        hooks.notify_requester(&requester, RequesterNotice::Rejected { tile, reason });
                    }
                }
                ManagerCommand::InstallRules(rules) => {
                    self.install_rules(rules);
                }
                ManagerCommand::SetLayersPerTick(layers) => self.set_layers_per_tick(layers),
            }
        }
    }

    /// Picks the category, resolves it and builds the job. Hands the
    /// request back on failure.
    fn start_job(
        &mut self,
        request: ExpansionRequest,
        env: &mut WorldEnv<'_>,
    ) -> Result<ActiveJob, (ExpansionRequest, ExpansionError)> {
        match self.prepare(&request, env) {
            Ok((category, resolved, rng_state)) => {
                let replacements = compile_replacements(&resolved.replacements, &self.palette);
                let tile = request.target_tile;
                let job = TileCopyJob::new(tile, tile, category.clone(), replacements, Arc::clone(&self.palette));
                Ok(ActiveJob {
                    request,
                    category,
                    resolved,
                    rng_state,
                    job,
                })
            }
            Err(err) => Err((request, err)),
        }
    }

    /// Resolves the request without touching the ledger. A pool pick comes
    /// back with the RNG state to commit once the tile is filled.
    fn prepare(
        &mut self,
        request: &ExpansionRequest,
        env: &mut WorldEnv<'_>,
    ) -> ExpansionResult<(CategoryId, Arc<ResolvedCategory>, Option<u64>)> {
        let (category, rng_state) = match &request.category {
            Some(category) => (category.clone(), None),
            None => {
                let (category, state) = self.pick_category(&request.tier)?;
                (category, Some(state))
            }
        };
        let resolved = self
            .resolver
            .resolve(&self.categories, &category)
            .ok_or_else(|| ExpansionError::UnknownCategory(category.clone()))?;
        if env.sources.source(&category).is_none() {
            return Err(ExpansionError::NoSourceWorld(category));
        }
        Ok((category, resolved, rng_state))
    }

    /// Draws a category from the tier's pool with a preview of the ledger's
    /// RNG. Returns the pick and the stream state that follows it.
    fn pick_category(&mut self, tier: &TierId) -> ExpansionResult<(CategoryId, u64)> {
        let pool = self.resolver.weighted_pool(&self.categories, tier);
        if pool.is_empty() {
            return Err(ExpansionError::EmptyPool(tier.clone()));
        }
        let (roll, state) = self.ledger.peek_deterministic_int(self.world_seed, pool.roll_bound())?;
        let category = pool
            .select(roll)
            .cloned()
            .ok_or_else(|| ExpansionError::EmptyPool(tier.clone()))?;
        Ok((category, state))
    }

    fn commit(&mut self, active: ActiveJob, env: &mut WorldEnv<'_>) {
        let ActiveJob {
            request,
            category,
            resolved,
            rng_state,
            ..
        } = active;
        let tile = request.target_tile;

        self.in_flight.remove(&tile);
        if let Some(state) = rng_state {
            self.ledger.advance_rng(state);
        }
        self.ledger.add_tile(tile);
        let first_reveal = self.ledger.record_meta(
            tile,
            category.clone(),
            request.tier.clone(),
            request.structure_triggered,
            request.triggering_tile,
        );
        if first_reveal {
            env.hooks.seed_mobs(tile, &category, &request.tier, &resolved.mob_spawns);
        }

        if !request.structure_triggered {
            self.cascade(tile, &category, &request.tier, env);
        }

        env.hooks.broadcast(ExpansionEvent::TileExpanded {
            tile,
            category: category.clone(),
            tier: request.tier.clone(),
            requester: request.requester.name.clone(),
            structure_triggered: request.structure_triggered,
        });
        env.hooks.notify_requester(
            &request.requester,
            RequesterNotice::Completed {
                tile,
                category: category.clone(),
            },
        );
        if let Some(marker) = &request.origin_marker {
            env.hooks.consume_origin_marker(marker);
        }

        self.stats.completed += 1;
        tracing::info!("Tile {tile} is now playable ({category})");
    }

    /// Queues the rest of every structure touching `tile`.
    fn cascade(&mut self, tile: TileCoord, category: &CategoryId, tier: &TierId, env: &mut WorldEnv<'_>) {
        let Some(source) = env.sources.source(category) else {
            return;
        };
        let ledger = &self.ledger;
        let found = find_structure_tiles(
            source,
            tile,
            |t| ledger.is_playable(t),
            &self.config.structure_search,
        );
        if found.is_empty() {
            return;
        }

        let mut queued = 0;
        for target in &found.tiles {
            let request = ExpansionRequest::new(self.config.world_id.clone(), tier.clone(), *target)
                .with_category(category.clone())
                .with_requester(Requester::server())
                .cascade_from(tile);
            if self.enqueue(request).is_accepted() {
                queued += 1;
            }
        }
        self.stats.cascaded += queued;

        if queued > 0 {
            env.hooks.broadcast(ExpansionEvent::StructureCascade {
                trigger: tile,
                structures: found.structures_found,
                tiles: usize::try_from(queued).unwrap_or(usize::MAX),
            });
        }
    }

    fn fail(&mut self, request: &ExpansionRequest, err: &ExpansionError, hooks: &mut dyn ExpansionHooks) {
        let tile = request.target_tile;
        self.in_flight.remove(&tile);
        self.stats.failed += 1;
        tracing::warn!("Expansion of {tile} failed: {err}");
        hooks.notify_requester(
            &request.requester,
            RequesterNotice::Failed {
                tile,
                message: err.to_string(),
            },
        );
    }
}

impl std::fmt::Debug for ExpansionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpansionManager")
            .field("world_id", &self.config.world_id)
            .field("layers_per_tick", &self.layers_per_tick)
            .field("occupied", &self.ledger.occupied_count())
            .field("queued", &self.queue.len())
            .field("active", &self.active_tile())
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}
