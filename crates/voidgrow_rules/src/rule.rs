//! # Biome Rules
//!
//! A rule says "categories matching X belong to tier T with weight W, and
//! get these block replacements and mob spawns".
//!
//! ## TOML Format
//!
//! ```toml
//! [[rule]]
//! id = "temperate"
//! priority = 10
//! tag = "is_temperate"        # optional category tag
//! allow = ["plains", "forest"] # optional; empty = any
//! deny = ["swamp"]
//! tier = "copper"
//! weight = 4
//!
//! [[rule.replace]]
//! match = "#logs"             # "#tag" or exact block name
//! with = "stripped_oak_log"
//!
//! [[rule.spawn]]
//! entity = "sheep"
//! weight = 8
//! min_group = 2
//! max_group = 4
//! ```

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use voidgrow_core::{CategoryId, TierId};

use crate::category::CategoryRegistry;
use crate::error::{RuleError, RuleResult};
use crate::tier::TierRegistry;

/// Selects which voxels a replacement applies to.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum BlockMatcher {
    /// Any block carrying the tag.
    Tag(String),
    /// One block by name.
    Exact(String),
}

impl BlockMatcher {
    /// Parses `"#tag"` or `"block_name"`. Empty names yield `None`.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        match raw.strip_prefix('#') {
            Some(tag) if !tag.is_empty() => Some(Self::Tag(tag.to_owned())),
            Some(_) => None,
            None if raw.is_empty() => None,
            None => Some(Self::Exact(raw.to_owned())),
        }
    }
}

/// Post-processing block replacement.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ReplacementRule {
    /// Which voxels to replace.
    pub matcher: BlockMatcher,
    /// Block name to put in their place.
    pub replacement: String,
}

/// Mob spawn entry applied once when a tile is revealed.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MobSpawnRule {
    /// Entity type name.
    pub entity: String,
    /// Relative weight (at least 1).
    #[serde(default = "default_weight")]
    pub weight: u32,
    /// Smallest group size.
    #[serde(default = "default_group")]
    pub min_group: u32,
    /// Largest group size.
    #[serde(default = "default_group")]
    pub max_group: u32,
}

fn default_weight() -> u32 {
    1
}

fn default_group() -> u32 {
    1
}

/// A validated, immutable biome rule.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BiomeRule {
    /// Unique source id (tie-breaker for equal priorities).
    pub source_id: String,
    /// Higher priorities are consulted first.
    pub priority: i32,
    /// Optional category tag the category must carry.
    pub category_tag: Option<String>,
    /// If non-empty, only these categories match.
    pub allow: BTreeSet<CategoryId>,
    /// These categories never match.
    pub deny: BTreeSet<CategoryId>,
    /// Assigned tier.
    pub tier: TierId,
    /// Pool weight (at least 1).
    pub weight: u32,
    /// Post-processing replacements, in declaration order.
    pub replacements: Vec<ReplacementRule>,
    /// Mob spawns, in declaration order.
    pub mob_spawns: Vec<MobSpawnRule>,
}

impl BiomeRule {
    /// Returns true if the rule applies to `category`.
    #[must_use]
    pub fn matches(&self, registry: &CategoryRegistry, category: &CategoryId) -> bool {
        let tag_ok = self
            .category_tag
            .as_deref()
            .map_or(true, |tag| registry.has_tag(category, tag));
        let allow_ok = self.allow.is_empty() || self.allow.contains(category);
        tag_ok && allow_ok && !self.deny.contains(category)
    }
}

/// Raw replacement entry as written in TOML.
#[derive(Clone, Debug, Deserialize)]
pub struct ReplacementSource {
    /// `"#tag"` or a block name.
    #[serde(rename = "match")]
    pub matcher: String,
    /// Replacement block name.
    #[serde(rename = "with")]
    pub replacement: String,
}

/// Raw rule as written in TOML, before validation.
#[derive(Clone, Debug, Deserialize)]
pub struct RuleSource {
    /// Unique source id.
    pub id: String,
    /// Priority (default 0).
    #[serde(default)]
    pub priority: i32,
    /// Optional category tag.
    #[serde(default)]
    pub tag: Option<String>,
    /// Allow list.
    #[serde(default)]
    pub allow: Vec<String>,
    /// Deny list.
    #[serde(default)]
    pub deny: Vec<String>,
    /// Tier name.
    pub tier: String,
    /// Pool weight (default 1).
    #[serde(default = "default_weight")]
    pub weight: u32,
    /// Replacements.
    #[serde(default)]
    pub replace: Vec<ReplacementSource>,
    /// Mob spawns.
    #[serde(default)]
    pub spawn: Vec<MobSpawnRule>,
}

impl RuleSource {
    /// Validates the raw rule against the known tiers.
    ///
    /// # Errors
    ///
    /// Returns error for an unknown tier, a zero weight, or an empty
    /// replacement matcher/target.
    pub fn validate(self, tiers: &TierRegistry) -> RuleResult<BiomeRule> {
        let tier = TierId::new(self.tier);
        if !tiers.contains(&tier) {
            return Err(RuleError::UnknownTier {
                rule: self.id,
                tier: tier.to_string(),
            });
        }
        if self.weight == 0 || self.spawn.iter().any(|s| s.weight == 0) {
            return Err(RuleError::ZeroWeight { rule: self.id });
        }

        let mut replacements = Vec::with_capacity(self.replace.len());
        for entry in self.replace {
            let Some(matcher) = BlockMatcher::parse(&entry.matcher) else {
                return Err(RuleError::InvalidReplacement {
                    rule: self.id,
                    detail: format!("bad matcher {:?}", entry.matcher),
                });
            };
            let replacement = entry.replacement.trim().to_owned();
            if replacement.is_empty() {
                return Err(RuleError::InvalidReplacement {
                    rule: self.id,
                    detail: "empty replacement block".to_owned(),
                });
            }
            replacements.push(ReplacementRule { matcher, replacement });
        }

        let mob_spawns = self
            .spawn
            .into_iter()
            .map(|mut s| {
                s.max_group = s.max_group.max(s.min_group);
                s
            })
            .collect();

        Ok(BiomeRule {
            source_id: self.id,
            priority: self.priority,
            category_tag: self.tag.filter(|t| !t.is_empty()),
            allow: self.allow.into_iter().map(CategoryId::from).collect(),
            deny: self.deny.into_iter().map(CategoryId::from).collect(),
            tier,
            weight: self.weight,
            replacements,
            mob_spawns,
        })
    }
}

#[derive(Deserialize)]
struct RuleFile {
    #[serde(default)]
    rule: Vec<RuleSource>,
}

/// A complete, sorted, immutable set of rules.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RuleSet {
    rules: Vec<BiomeRule>,
    rejected: Vec<RuleError>,
}

impl RuleSet {
    /// Validates every source; invalid rules are logged and dropped.
    ///
    /// The result is sorted by `(priority desc, source_id asc)`.
    #[must_use]
    pub fn load(sources: Vec<RuleSource>, tiers: &TierRegistry) -> Self {
        let mut rules = Vec::with_capacity(sources.len());
        let mut rejected = Vec::new();
        for source in sources {
            match source.validate(tiers) {
                Ok(rule) => rules.push(rule),
                Err(err) => {
                    tracing::warn!("Dropping biome rule: {err}");
                    rejected.push(err);
                }
            }
        }
        rules.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then_with(|| a.source_id.cmp(&b.source_id))
        });
        tracing::info!(
            "Loaded {} biome rules ({} rejected)",
            rules.len(),
            rejected.len()
        );
        Self { rules, rejected }
    }

    /// Parses `[[rule]]` tables and loads them.
    ///
    /// # Errors
    ///
    /// Returns error only if the document itself is malformed; individual
    /// bad rules are dropped.
    pub fn from_toml_str(text: &str, tiers: &TierRegistry) -> RuleResult<Self> {
        let file: RuleFile = toml::from_str(text)?;
        Ok(Self::load(file.rule, tiers))
    }

    /// Reads and parses a rule file.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or is malformed.
    pub fn from_file(path: &Path, tiers: &TierRegistry) -> RuleResult<Self> {
        Self::from_toml_str(&std::fs::read_to_string(path)?, tiers)
    }

    /// Rules in evaluation order.
    #[must_use]
    pub fn rules(&self) -> &[BiomeRule] {
        &self.rules
    }

    /// Errors for rules dropped during load.
    #[must_use]
    pub fn rejected(&self) -> &[RuleError] {
        &self.rejected
    }

    /// Number of accepted rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns true if no rule was accepted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tier::TierDef;

    fn tiers() -> TierRegistry {
        TierRegistry::new(vec![
            TierDef { id: "copper".into(), pooled: true, legacy_tags: vec![] },
            TierDef { id: "gold".into(), pooled: true, legacy_tags: vec![] },
        ])
        .unwrap()
    }

    #[test]
    fn test_matcher_parse() {
        assert_eq!(BlockMatcher::parse("#logs"), Some(BlockMatcher::Tag("logs".into())));
        assert_eq!(BlockMatcher::parse("stone"), Some(BlockMatcher::Exact("stone".into())));
        assert_eq!(BlockMatcher::parse("#"), None);
        assert_eq!(BlockMatcher::parse("  "), None);
    }

    #[test]
    fn test_unknown_tier_dropped_without_aborting_others() {
        let text = r#"
            [[rule]]
            id = "good"
            tier = "copper"

            [[rule]]
            id = "bad"
            tier = "mythril"

            [[rule]]
            id = "also_good"
            tier = "gold"
        "#;
        let set = RuleSet::from_toml_str(text, &tiers()).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(
            set.rejected(),
            &[RuleError::UnknownTier { rule: "bad".into(), tier: "mythril".into() }]
        );
    }

    #[test]
    fn test_sort_priority_desc_then_id_asc() {
        let text = r#"
            [[rule]]
            id = "b"
            priority = 5
            tier = "copper"

            [[rule]]
            id = "a"
            priority = 5
            tier = "copper"

            [[rule]]
            id = "z"
            priority = 9
            tier = "copper"

            [[rule]]
            id = "low"
            priority = -3
            tier = "copper"
        "#;
        let set = RuleSet::from_toml_str(text, &tiers()).unwrap();
        let order: Vec<&str> = set.rules().iter().map(|r| r.source_id.as_str()).collect();
        assert_eq!(order, ["z", "a", "b", "low"]);
    }

    #[test]
    fn test_zero_weight_and_bad_replacement_rejected() {
        let text = r##"
            [[rule]]
            id = "zero"
            tier = "copper"
            weight = 0

            [[rule]]
            id = "bad_replace"
            tier = "copper"
            [[rule.replace]]
            match = "#"
            with = "stone"
        "##;
        let set = RuleSet::from_toml_str(text, &tiers()).unwrap();
        assert!(set.is_empty());
        assert_eq!(set.rejected().len(), 2);
    }

    #[test]
    fn test_matches_tag_allow_deny() {
        let mut reg = CategoryRegistry::new();
        reg.register("plains", ["temperate"]);
        reg.register("forest", ["temperate"]);
        reg.register("desert", ["hot"]);

        let text = r#"
            [[rule]]
            id = "temperate"
            tag = "temperate"
            deny = ["forest"]
            tier = "copper"
        "#;
        let set = RuleSet::from_toml_str(text, &tiers()).unwrap();
        let rule = &set.rules()[0];
        assert!(rule.matches(&reg, &"plains".into()));
        assert!(!rule.matches(&reg, &"forest".into()));
        assert!(!rule.matches(&reg, &"desert".into()));
    }

    #[test]
    fn test_spawn_group_normalized() {
        let text = r#"
            [[rule]]
            id = "r"
            tier = "copper"
            [[rule.spawn]]
            entity = "sheep"
            min_group = 4
            max_group = 2
        "#;
        let set = RuleSet::from_toml_str(text, &tiers()).unwrap();
        let spawn = &set.rules()[0].mob_spawns[0];
        assert_eq!((spawn.min_group, spawn.max_group), (4, 4));
        assert_eq!(spawn.weight, 1);
    }
}
