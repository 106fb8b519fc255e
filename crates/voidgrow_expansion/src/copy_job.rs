//! # Tile-Copy Job
//!
//! Copies one tile from a source world into the main world, a bounded
//! number of Y layers per tick.
//!
//! ## Phases
//!
//! ```text
//! Pending ──pin tiles──> Copying ──> PostProcessing ──> Finishing ──> Done
//!    │                      │               │               │
//!    └──────────────────────┴───── error ───┴───────────────┴──> Done (failed)
//! ```
//!
//! ## Additive Copy
//!
//! Only replaceable target voxels (air, liquid, bedrock, barrier, structure
//! void) are overwritten. Anything else a player built survives, and is
//! skipped again during post-processing. Writes already made when an error
//! hits are left in place.
//!
//! ## Post-Processing
//!
//! Replacements run over the full target column. Layers the source world
//! does not cover were never copied; their non-replaceable voxels are
//! treated as preserved.

use std::collections::HashSet;
use std::sync::Arc;

use voidgrow_core::{BlockPalette, CategoryId, TileCoord, VoxelClass, VoxelState, TILE_SIZE};
use voidgrow_rules::{BlockMatcher, ReplacementRule};

use crate::error::{ExpansionError, ExpansionResult};
use crate::world::{HeightRange, MainWorld, SourceWorld, WorldEnv};

/// Voxels per horizontal layer of one tile.
const LAYER_AREA: usize = (TILE_SIZE * TILE_SIZE) as usize;

#[derive(Clone, Debug, PartialEq, Eq)]
enum CompiledMatcher {
    Ids(HashSet<u16>),
    Exact(u16),
}

/// A replacement rule resolved against the block palette.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompiledReplacement {
    matcher: CompiledMatcher,
    replacement: VoxelState,
}

impl CompiledReplacement {
    /// Returns true if the rule applies to `state`. Meta bits are ignored.
    #[inline]
    #[must_use]
    pub fn matches(&self, state: VoxelState) -> bool {
        match &self.matcher {
            CompiledMatcher::Ids(ids) => ids.contains(&state.id),
            CompiledMatcher::Exact(id) => *id == state.id,
        }
    }

    /// Voxel written in place of a match.
    #[inline]
    #[must_use]
    pub fn replacement(&self) -> VoxelState {
        self.replacement
    }
}

/// Resolves block names and tags. Rules naming unknown blocks or tags are
/// dropped with a warning; order is preserved.
#[must_use]
pub fn compile_replacements(rules: &[ReplacementRule], palette: &BlockPalette) -> Vec<CompiledReplacement> {
    let mut compiled = Vec::with_capacity(rules.len());
    for rule in rules {
        let Some(replacement) = palette.state(&rule.replacement) else {
            tracing::warn!("Replacement block '{}' is not registered; rule skipped", rule.replacement);
            continue;
        };
        let matcher = match &rule.matcher {
            BlockMatcher::Tag(tag) => match palette.tag_members(tag) {
                Some(ids) => CompiledMatcher::Ids(ids.clone()),
                None => {
                    tracing::warn!("Block tag '#{tag}' is not registered; rule skipped");
                    continue;
                }
            },
            BlockMatcher::Exact(name) => match palette.id(name) {
                Some(id) => CompiledMatcher::Exact(id),
                None => {
                    tracing::warn!("Block '{name}' is not registered; rule skipped");
                    continue;
                }
            },
        };
        compiled.push(CompiledReplacement {
            matcher,
            replacement,
        });
    }
    compiled
}

/// Result of one `tick`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CopyProgress {
    /// No more ticks needed.
    pub done: bool,
    /// Only meaningful when `done`.
    pub success: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Pending,
    Copying,
    PostProcessing,
    Finishing,
    Done,
}

/// Incremental copy of one tile.
#[derive(Debug)]
pub struct TileCopyJob {
    source_tile: TileCoord,
    target_tile: TileCoord,
    category: CategoryId,
    replacements: Vec<CompiledReplacement>,
    palette: Arc<BlockPalette>,
    phase: Phase,
    /// Layers copied from the source (main range ∩ source range).
    range: HeightRange,
    /// The main world's full column, walked by post-processing.
    column: HeightRange,
    cursor: i32,
    /// One flag per voxel in the copy range: true if the target held
    /// something non-replaceable.
    preserved: Vec<bool>,
    source_pinned: bool,
    target_pinned: bool,
    success: bool,
    failure: Option<ExpansionError>,
}

impl TileCopyJob {
    /// Creates a job. Nothing is touched until the first `tick`.
    #[must_use]
    pub fn new(
        source_tile: TileCoord,
        target_tile: TileCoord,
        category: CategoryId,
        replacements: Vec<CompiledReplacement>,
        palette: Arc<BlockPalette>,
    ) -> Self {
        Self {
            source_tile,
            target_tile,
            category,
            replacements,
            palette,
            phase: Phase::Pending,
            range: HeightRange::new(0, 0),
            column: HeightRange::new(0, 0),
            cursor: 0,
            preserved: Vec::new(),
            source_pinned: false,
            target_pinned: false,
            success: false,
            failure: None,
        }
    }

    /// Tile being filled.
    #[inline]
    #[must_use]
    pub fn target_tile(&self) -> TileCoord {
        self.target_tile
    }

    /// Category being copied.
    #[must_use]
    pub fn category(&self) -> &CategoryId {
        &self.category
    }

    /// Returns true once the job needs no more ticks.
    #[inline]
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.phase == Phase::Done
    }

    /// The error that aborted the job, if any.
    #[must_use]
    pub fn failure(&self) -> Option<&ExpansionError> {
        self.failure.as_ref()
    }

    /// Advances the job by up to `max_layers` layers (at least one).
    pub fn tick(&mut self, env: &mut WorldEnv<'_>, max_layers: u32) -> CopyProgress {
        if self.phase == Phase::Done {
            return self.progress();
        }

        match self.advance(env, max_layers.max(1)) {
            Ok(true) => {
                self.release(env);
                self.phase = Phase::Done;
                self.success = true;
                tracing::debug!("Copied tile {} from {}", self.target_tile, self.category);
            }
            Ok(false) => {}
            Err(err) => {
                tracing::warn!(
                    "Copy of tile {} ({}) aborted at y={}: {err}",
                    self.target_tile,
                    self.category,
                    self.cursor
                );
                self.release(env);
                self.phase = Phase::Done;
                self.failure = Some(err);
            }
        }
        self.progress()
    }

    fn progress(&self) -> CopyProgress {
        CopyProgress {
            done: self.phase == Phase::Done,
            success: self.success,
        }
    }

    /// Returns `Ok(true)` once every phase has run.
    fn advance(&mut self, env: &mut WorldEnv<'_>, max_layers: u32) -> ExpansionResult<bool> {
        let Some(source) = env.sources.source(&self.category) else {
            return Err(ExpansionError::NoSourceWorld(self.category.clone()));
        };
        let main = &mut *env.main;

        if self.phase == Phase::Pending {
            main.force_load(self.target_tile, true)?;
            self.target_pinned = true;
            source.force_load(self.source_tile, true)?;
            self.source_pinned = true;

            self.column = main.height_range();
            self.range = self.column.intersect(source.height_range());
            self.cursor = self.range.min_y;
            self.preserved = vec![false; self.range.height() as usize * LAYER_AREA];
            self.phase = Phase::Copying;
        }

        let mut budget = max_layers;
        loop {
            match self.phase {
                Phase::Copying if self.cursor >= self.range.max_y => {
                    self.cursor = self.column.min_y;
                    self.phase = if self.replacements.is_empty() {
                        Phase::Finishing
                    } else {
                        Phase::PostProcessing
                    };
                }
                Phase::PostProcessing if self.cursor >= self.column.max_y => {
                    self.phase = Phase::Finishing;
                }
                Phase::Copying | Phase::PostProcessing if budget == 0 => return Ok(false),
                Phase::Copying => {
                    self.copy_layer(main, source, self.cursor)?;
                    self.cursor += 1;
                    budget -= 1;
                }
                Phase::PostProcessing => {
                    self.post_process_layer(main, self.cursor)?;
                    self.cursor += 1;
                    budget -= 1;
                }
                Phase::Finishing => {
                    main.set_tile_category(self.target_tile, &self.category)?;
                    main.mark_dirty_for_resend(self.target_tile);
                    return Ok(true);
                }
                Phase::Pending | Phase::Done => return Ok(false),
            }
        }
    }

    fn copy_layer(&mut self, main: &mut dyn MainWorld, source: &mut dyn SourceWorld, y: i32) -> ExpansionResult<()> {
        let base = self.layer_offset(y);
        for lz in 0..TILE_SIZE {
            for lx in 0..TILE_SIZE {
                let target_pos = self.target_tile.block_at(lx, y, lz);
                let existing = main.get_voxel(target_pos)?;
                if !self.palette.is_replaceable(existing) {
                    self.preserved[base + local_index(lx, lz)] = true;
                    continue;
                }

                let mut copied = source.get_voxel(self.source_tile.block_at(lx, y, lz))?;
                if self.palette.class(copied) == VoxelClass::Foliage {
                    copied = copied.persistent();
                }
                if copied != existing {
                    main.set_voxel(target_pos, copied)?;
                }
            }
        }
        Ok(())
    }

    fn post_process_layer(&mut self, main: &mut dyn MainWorld, y: i32) -> ExpansionResult<()> {
        let copied = self.range.contains(y);
        let base = if copied { self.layer_offset(y) } else { 0 };
        for lz in 0..TILE_SIZE {
            for lx in 0..TILE_SIZE {
                if copied && self.preserved[base + local_index(lx, lz)] {
                    continue;
                }
                let pos = self.target_tile.block_at(lx, y, lz);
                let current = main.get_voxel(pos)?;
                if !copied && !self.palette.is_replaceable(current) {
                    continue;
                }
                if let Some(rule) = self.replacements.iter().find(|r| r.matches(current)) {
                    if rule.replacement() != current {
                        main.set_voxel(pos, rule.replacement())?;
                    }
                }
            }
        }
        Ok(())
    }

    fn layer_offset(&self, y: i32) -> usize {
        self.range.min_y.abs_diff(y) as usize * LAYER_AREA
    }

    /// Unpins whatever this job pinned. Unpin failures are only logged.
    fn release(&mut self, env: &mut WorldEnv<'_>) {
        if self.target_pinned {
            if let Err(err) = env.main.force_load(self.target_tile, false) {
                tracing::debug!("Unpinning target tile {} failed: {err}", self.target_tile);
            }
            self.target_pinned = false;
        }
        if self.source_pinned {
            if let Some(source) = env.sources.source(&self.category) {
                if let Err(err) = source.force_load(self.source_tile, false) {
                    tracing::debug!("Unpinning source tile {} failed: {err}", self.source_tile);
                }
            }
            self.source_pinned = false;
        }
        self.preserved = Vec::new();
    }
}

#[inline]
fn local_index(lx: i32, lz: i32) -> usize {
    (lz * TILE_SIZE + lx) as usize
}
