//! # Tiers
//!
//! A tier is a named class of expansion request (e.g. copper / gold /
//! diamond) with its own category pool. The `local` tier never pools: it
//! always reuses a category chosen by the caller.
//!
//! ## TOML Format
//!
//! ```toml
//! [[tier]]
//! id = "copper"
//! legacy_tags = ["is_common"]
//!
//! [[tier]]
//! id = "local"
//! pooled = false
//! ```

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use voidgrow_core::{CategoryId, TierId};

use crate::category::CategoryRegistry;
use crate::error::{RuleError, RuleResult};

/// Id of the tier that is always excluded from pooling.
pub const LOCAL_TIER: &str = "local";

fn default_pooled() -> bool {
    true
}

/// One declared tier.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierDef {
    /// Tier id.
    pub id: TierId,
    /// Whether categories of this tier form a weighted pool.
    #[serde(default = "default_pooled")]
    pub pooled: bool,
    /// Category tags granting membership when no rule matches.
    #[serde(default)]
    pub legacy_tags: Vec<String>,
}

#[derive(Deserialize)]
struct TierFile {
    #[serde(default)]
    tier: Vec<TierDef>,
}

/// Ordered set of known tiers.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TierRegistry {
    tiers: Vec<TierDef>,
}

impl TierRegistry {
    /// Creates a registry from tier definitions.
    ///
    /// The `local` tier is forced non-pooled whether declared or not.
    ///
    /// # Errors
    ///
    /// Returns error if two tiers share an id.
    pub fn new(defs: Vec<TierDef>) -> RuleResult<Self> {
        let mut seen = HashSet::new();
        let mut tiers = Vec::with_capacity(defs.len() + 1);
        for mut def in defs {
            if !seen.insert(def.id.clone()) {
                return Err(RuleError::DuplicateTier(def.id.to_string()));
            }
            if def.id.as_str() == LOCAL_TIER {
                def.pooled = false;
            }
            tiers.push(def);
        }
        if !seen.contains(&TierId::from(LOCAL_TIER)) {
            tiers.push(TierDef {
                id: LOCAL_TIER.into(),
                pooled: false,
                legacy_tags: Vec::new(),
            });
        }
        Ok(Self { tiers })
    }

    /// Parses `[[tier]]` tables.
    ///
    /// # Errors
    ///
    /// Returns error on malformed TOML or duplicate ids.
    pub fn from_toml_str(text: &str) -> RuleResult<Self> {
        let file: TierFile = toml::from_str(text)?;
        Self::new(file.tier)
    }

    /// Reads and parses a tier file.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> RuleResult<Self> {
        Self::from_toml_str(&std::fs::read_to_string(path)?)
    }

    /// Looks up a tier.
    #[must_use]
    pub fn get(&self, id: &TierId) -> Option<&TierDef> {
        self.tiers.iter().find(|t| &t.id == id)
    }

    /// Returns true if the tier is registered.
    #[must_use]
    pub fn contains(&self, id: &TierId) -> bool {
        self.get(id).is_some()
    }

    /// Returns true if the tier is registered and pooled.
    #[must_use]
    pub fn is_pooled(&self, id: &TierId) -> bool {
        self.get(id).is_some_and(|t| t.pooled)
    }

    /// Tiers in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &TierDef> {
        self.tiers.iter()
    }

    /// Legacy fallback: first tier (in declaration order) whose tags the
    /// category carries.
    #[must_use]
    pub fn legacy_tier_for(&self, registry: &CategoryRegistry, category: &CategoryId) -> Option<TierId> {
        self.tiers
            .iter()
            .find(|t| t.legacy_tags.iter().any(|tag| registry.has_tag(category, tag)))
            .map(|t| t.id.clone())
    }
}
