//! # Voxels and the Block Palette
//!
//! A voxel is a compact `(id, meta)` pair, the same shape the engine stores
//! in its chunk sections. What an id *means* (its name, whether copying may
//! overwrite it, which tags it carries) lives in the `BlockPalette`, which
//! the host builds once before the engine starts.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// A single voxel value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct VoxelState {
    /// Block type ID (index into the palette).
    pub id: u16,
    /// Block metadata (orientation, growth stage, flags).
    pub meta: u16,
}

impl VoxelState {
    /// Air voxel (empty).
    pub const AIR: Self = Self { id: 0, meta: 0 };

    /// Metadata bit marking foliage as player-placed so it never decays.
    pub const PERSISTENT: u16 = 1 << 15;

    /// Creates a voxel with the given ID.
    #[inline]
    #[must_use]
    pub const fn new(id: u16) -> Self {
        Self { id, meta: 0 }
    }

    /// Creates a voxel with ID and metadata.
    #[inline]
    #[must_use]
    pub const fn with_meta(id: u16, meta: u16) -> Self {
        Self { id, meta }
    }

    /// Returns a copy with the persistent-foliage flag set.
    #[inline]
    #[must_use]
    pub const fn persistent(self) -> Self {
        Self {
            id: self.id,
            meta: self.meta | Self::PERSISTENT,
        }
    }

    /// Returns true if the persistent-foliage flag is set.
    #[inline]
    #[must_use]
    pub const fn is_persistent(self) -> bool {
        self.meta & Self::PERSISTENT != 0
    }
}

/// How the copy job treats a voxel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoxelClass {
    /// Empty space.
    Air,
    /// Water, lava and other fluids.
    Liquid,
    /// Bedrock-equivalent floor blocks.
    Bedrock,
    /// Invisible barrier blocks.
    Barrier,
    /// Structure-void placeholder.
    StructureVoid,
    /// Leaves and other blocks subject to decay.
    Foliage,
    /// Everything else.
    #[default]
    Solid,
}

impl VoxelClass {
    /// Returns true if copied terrain may overwrite a voxel of this class.
    #[inline]
    #[must_use]
    pub const fn is_replaceable(self) -> bool {
        matches!(
            self,
            Self::Air | Self::Liquid | Self::Bedrock | Self::Barrier | Self::StructureVoid
        )
    }
}

/// Block registry owned by the host configuration layer.
///
/// Id 0 is always `air`.
#[derive(Clone, Debug)]
pub struct BlockPalette {
    names: Vec<String>,
    classes: Vec<VoxelClass>,
    by_name: HashMap<String, u16>,
    tags: HashMap<String, HashSet<u16>>,
}

impl Default for BlockPalette {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockPalette {
    /// Creates a palette containing only `air`.
    #[must_use]
    pub fn new() -> Self {
        let mut by_name = HashMap::new();
        by_name.insert("air".to_owned(), 0);
        Self {
            names: vec!["air".to_owned()],
            classes: vec![VoxelClass::Air],
            by_name,
            tags: HashMap::new(),
        }
    }

    /// Registers a block and returns its id.
    ///
    /// # Errors
    ///
    /// Returns error if the name is taken or the palette is full.
    pub fn register(&mut self, name: &str, class: VoxelClass) -> CoreResult<u16> {
        if self.by_name.contains_key(name) {
            return Err(CoreError::DuplicateBlock(name.to_owned()));
        }
        let id = u16::try_from(self.names.len()).map_err(|_| CoreError::PaletteFull)?;
        self.names.push(name.to_owned());
        self.classes.push(class);
        self.by_name.insert(name.to_owned(), id);
        Ok(id)
    }

    /// Adds `block` to `tag`. Unknown block names are ignored.
    pub fn tag(&mut self, tag: &str, block: &str) -> &mut Self {
        if let Some(&id) = self.by_name.get(block) {
            self.tags.entry(tag.to_owned()).or_default().insert(id);
        }
        self
    }

    /// Looks up a block id by name.
    #[must_use]
    pub fn id(&self, name: &str) -> Option<u16> {
        self.by_name.get(name).copied()
    }

    /// Looks up a default voxel state by block name.
    #[must_use]
    pub fn state(&self, name: &str) -> Option<VoxelState> {
        self.id(name).map(VoxelState::new)
    }

    /// Returns the name registered for `id`.
    #[must_use]
    pub fn name(&self, id: u16) -> Option<&str> {
        self.names.get(usize::from(id)).map(String::as_str)
    }

    /// Classifies a voxel. Unregistered ids are treated as solid.
    #[must_use]
    pub fn class(&self, state: VoxelState) -> VoxelClass {
        self.classes
            .get(usize::from(state.id))
            .copied()
            .unwrap_or_default()
    }

    /// Returns the set of ids carrying `tag`, if the tag exists.
    #[must_use]
    pub fn tag_members(&self, tag: &str) -> Option<&HashSet<u16>> {
        self.tags.get(tag)
    }

    /// Returns true if the voxel's block carries `tag`.
    #[must_use]
    pub fn has_tag(&self, state: VoxelState, tag: &str) -> bool {
        self.tags
            .get(tag)
            .is_some_and(|members| members.contains(&state.id))
    }

    /// Returns true if copied terrain may overwrite this voxel.
    #[inline]
    #[must_use]
    pub fn is_replaceable(&self, state: VoxelState) -> bool {
        self.class(state).is_replaceable()
    }

    /// Number of registered blocks, including air.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Always false: the palette contains at least air.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
