//! # World Setup
//!
//! Builds the owned registries (block palette, categories) and the
//! reference source worlds from one TOML document, before the engine
//! starts.
//!
//! ```toml
//! seed = 1234
//! min_y = -16
//! max_y = 48
//!
//! [[block]]
//! name = "oak_log"
//! class = "solid"
//! tags = ["logs"]
//!
//! [[category]]
//! id = "plains"
//! tags = ["is_common"]
//! [category.terrain]
//! surface = "grass_block"
//! foliage = "tall_grass"
//!
//! [[structure]]
//! category = "plains"
//! id = "village"
//! start = [3, 0]
//! min = [2, -1]
//! max = [4, 1]
//!
//! [[landmark]]
//! tag = "village"
//! pos = [40, 0, -20]
//! ```

use std::path::Path;

use serde::Deserialize;
use voidgrow_core::{rng, BlockPalette, BlockPos, CategoryId, TileCoord, VoxelClass, VoxelState};
use voidgrow_expansion::{HeightRange, StructureInstance, TileRect};
use voidgrow_rules::CategoryRegistry;

use crate::error::{HostError, HostResult};
use crate::memory::{MemorySourceWorld, MemorySources, MemoryWorld, TerrainProfile};

#[derive(Clone, Debug, Deserialize)]
struct BlockDef {
    name: String,
    #[serde(default)]
    class: VoxelClass,
    #[serde(default)]
    tags: Vec<String>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
struct TerrainDef {
    base_height: i32,
    amplitude: i32,
    bedrock: String,
    filler: String,
    subsurface: String,
    surface: String,
    foliage: Option<String>,
    foliage_chance: u32,
    log: Option<String>,
    tree_chance: u32,
}

impl Default for TerrainDef {
    fn default() -> Self {
        Self {
            base_height: 8,
            amplitude: 3,
            bedrock: "bedrock".to_owned(),
            filler: "stone".to_owned(),
            subsurface: "dirt".to_owned(),
            surface: "grass_block".to_owned(),
            foliage: None,
            foliage_chance: 0,
            log: None,
            tree_chance: 0,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
struct CategoryDef {
    id: String,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    terrain: TerrainDef,
}

#[derive(Clone, Debug, Deserialize)]
struct StructureDef {
    category: String,
    id: String,
    start: [i32; 2],
    min: [i32; 2],
    max: [i32; 2],
}

#[derive(Clone, Debug, Deserialize)]
struct LandmarkDef {
    tag: String,
    pos: [i32; 3],
}

fn default_seed() -> u64 {
    0x5EED
}

fn default_min_y() -> i32 {
    -16
}

fn default_max_y() -> i32 {
    48
}

/// Parsed world description.
#[derive(Clone, Debug, Deserialize)]
pub struct WorldSetup {
    /// World seed (ledger RNG and terrain).
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Lowest Y of every world.
    #[serde(default = "default_min_y")]
    pub min_y: i32,
    /// One past the highest Y of every world.
    #[serde(default = "default_max_y")]
    pub max_y: i32,
    #[serde(default, rename = "block")]
    blocks: Vec<BlockDef>,
    #[serde(default, rename = "category")]
    categories: Vec<CategoryDef>,
    #[serde(default, rename = "structure")]
    structures: Vec<StructureDef>,
    #[serde(default, rename = "landmark")]
    landmarks: Vec<LandmarkDef>,
}

/// Everything the engine needs from the host, ready to use.
pub struct BuiltWorld {
    /// Block palette.
    pub palette: BlockPalette,
    /// Category registry.
    pub categories: CategoryRegistry,
    /// The (void) main world.
    pub main: MemoryWorld,
    /// One source world per category.
    pub sources: MemorySources,
}

impl WorldSetup {
    /// Parses a setup document.
    ///
    /// # Errors
    ///
    /// Returns error if the TOML does not match the schema.
    pub fn from_toml_str(text: &str) -> HostResult<Self> {
        toml::from_str(text).map_err(|e| HostError::Config {
            path: "<inline>".to_owned(),
            message: e.to_string(),
        })
    }

    /// Reads and parses a setup file.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> HostResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| HostError::Io {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&text).map_err(|e| HostError::Config {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Vertical extent shared by all worlds.
    #[must_use]
    pub fn height(&self) -> HeightRange {
        HeightRange::new(self.min_y, self.max_y)
    }

    /// Builds the palette, registry and worlds.
    ///
    /// # Errors
    ///
    /// Returns error for duplicate block names or terrain naming unknown
    /// blocks.
    pub fn build(&self) -> HostResult<BuiltWorld> {
        let mut palette = BlockPalette::new();
        for block in &self.blocks {
            palette.register(&block.name, block.class)?;
        }
        for block in &self.blocks {
            for tag in &block.tags {
                palette.tag(tag, &block.name);
            }
        }

        let height = self.height();
        let mut categories = CategoryRegistry::new();
        let mut sources = MemorySources::new();
        for def in &self.categories {
            categories.register(def.id.as_str(), def.tags.iter().map(String::as_str));
            let profile = terrain_profile(&palette, &def.terrain)?;
            let seed = rng::derive_seed(self.seed, category_salt(&def.id));
            sources.insert(def.id.as_str(), MemorySourceWorld::new(seed, height, profile));
        }

        for def in &self.structures {
            let category = CategoryId::from(def.category.as_str());
            let Some(source) = sources.get_mut(&category) else {
                tracing::warn!("Structure '{}' names unknown category {category}; skipped", def.id);
                continue;
            };
            source.declare_structure(StructureInstance {
                structure: def.id.clone(),
                start_tile: TileCoord::new(def.start[0], def.start[1]),
                footprint: TileRect::new(
                    TileCoord::new(def.min[0], def.min[1]),
                    TileCoord::new(def.max[0], def.max[1]),
                ),
            });
        }

        let mut main = MemoryWorld::new(height);
        for landmark in &self.landmarks {
            let [x, y, z] = landmark.pos;
            main.add_structure(landmark.tag.as_str(), BlockPos::new(x, y, z));
        }

        tracing::info!(
            "World setup: {} blocks, {} categories, {} structures",
            palette.len(),
            categories.len(),
            self.structures.len()
        );
        Ok(BuiltWorld {
            palette,
            categories,
            main,
            sources,
        })
    }
}

/// Stable per-category salt so each source world gets its own terrain.
fn category_salt(id: &str) -> u64 {
    id.bytes().fold(0, |h, b| rng::mix64(h ^ u64::from(b)))
}

fn terrain_profile(palette: &BlockPalette, def: &TerrainDef) -> HostResult<TerrainProfile> {
    let block = |name: &str| -> HostResult<VoxelState> {
        palette.state(name).ok_or_else(|| HostError::Config {
            path: "terrain".to_owned(),
            message: format!("unknown block '{name}'"),
        })
    };
    Ok(TerrainProfile {
        base_height: def.base_height,
        amplitude: def.amplitude,
        bedrock: block(&def.bedrock)?,
        filler: block(&def.filler)?,
        subsurface: block(&def.subsurface)?,
        surface: block(&def.surface)?,
        foliage: def.foliage.as_deref().map(block).transpose()?,
        foliage_chance: def.foliage_chance,
        log: def.log.as_deref().map(block).transpose()?,
        tree_chance: def.tree_chance,
    })
}
