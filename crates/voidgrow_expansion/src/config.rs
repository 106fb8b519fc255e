//! # Expansion Configuration
//!
//! Loaded once at startup from TOML. Every field has a default, so an empty
//! file is a valid configuration.
//!
//! ```toml
//! world_id = "overworld"
//! layers_per_tick = 8
//! inbox_capacity = 1024
//!
//! [structure_search]
//! enabled = true
//! max_structures = 8
//! max_tiles = 32
//!
//! [start_area]
//! radius = 1
//! tier = "local"
//! category = "plains"
//! structure_tag = "village"
//! search_radius = 512
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use voidgrow_core::{CategoryId, TierId};

use crate::error::{ExpansionError, ExpansionResult};

/// Bounds for the structure-completion search.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StructureSearchConfig {
    /// Master switch; when off the search returns nothing.
    pub enabled: bool,
    /// Most structures to pull in per trigger tile.
    pub max_structures: usize,
    /// Most extra tiles to pull in per trigger tile.
    pub max_tiles: usize,
}

impl Default for StructureSearchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_structures: 8,
            max_tiles: 32,
        }
    }
}

/// How the seed region of a fresh world is laid out.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StartAreaConfig {
    /// Seed square radius in tiles (0 = just the anchor).
    pub radius: u32,
    /// Tier recorded for seed tiles.
    pub tier: TierId,
    /// Category for seed tiles; `None` draws from the tier's pool.
    pub category: Option<CategoryId>,
    /// Center the seed region on the nearest structure with this tag.
    pub structure_tag: Option<String>,
    /// Search radius in voxels for `structure_tag`.
    pub search_radius: u32,
}

impl Default for StartAreaConfig {
    fn default() -> Self {
        Self {
            radius: 1,
            tier: TierId::from(voidgrow_rules::LOCAL_TIER),
            category: None,
            structure_tag: None,
            search_radius: 512,
        }
    }
}

/// Engine configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpansionConfig {
    /// World the engine expands; stamped on engine-generated requests.
    pub world_id: String,
    /// Horizontal voxel layers copied per tick.
    pub layers_per_tick: u32,
    /// Capacity of the cross-thread command inbox.
    pub inbox_capacity: usize,
    /// Structure-completion bounds.
    pub structure_search: StructureSearchConfig,
    /// Seed region layout.
    pub start_area: StartAreaConfig,
}

impl Default for ExpansionConfig {
    fn default() -> Self {
        Self {
            world_id: "overworld".to_owned(),
            layers_per_tick: 8,
            inbox_capacity: 1024,
            structure_search: StructureSearchConfig::default(),
            start_area: StartAreaConfig::default(),
        }
    }
}

impl ExpansionConfig {
    /// Parses a configuration document.
    ///
    /// # Errors
    ///
    /// Returns error if the TOML is malformed.
    pub fn from_toml_str(text: &str) -> ExpansionResult<Self> {
        let mut config: Self =
            toml::from_str(text).map_err(|e| ExpansionError::InvalidConfig(e.to_string()))?;
        config.layers_per_tick = config.layers_per_tick.max(1);
        config.inbox_capacity = config.inbox_capacity.max(1);
        Ok(config)
    }

    /// Reads and parses a configuration file.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> ExpansionResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            ExpansionError::InvalidConfig(format!("{}: {e}", path.display()))
        })?;
        Self::from_toml_str(&text)
    }
}
