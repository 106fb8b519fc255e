//! # Biome Rule Resolver
//!
//! ## State Machine
//!
//! ```text
//! Unloaded ──install(rules)──> Loaded(gen 1) ──install(rules)──> Loaded(gen 2) ...
//! ```
//!
//! Resolutions and pools are cached per `(generation, registry identity)`.
//! Installing a rule set or handing in a different category registry
//! drops every cached value.
//!
//! ## Threading
//!
//! The resolver is owned by the world-update thread. Rule files may be
//! parsed anywhere (`RuleSet` is `Send`), but `install` must run on the
//! owning thread, which makes it impossible to swap rules under a
//! resolution in progress.

use std::collections::HashMap;
use std::sync::Arc;

use voidgrow_core::{CategoryId, TierId};

use crate::category::CategoryRegistry;
use crate::pool::WeightedPool;
use crate::rule::{MobSpawnRule, ReplacementRule, RuleSet};
use crate::tier::TierRegistry;

/// Resolution result for one category.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResolvedCategory {
    /// Tier from the highest-priority match, or the legacy tag fallback.
    pub tier: Option<TierId>,
    /// Pool weight (at least 1).
    pub weight: u32,
    /// Replacements from every matching rule, in rule order.
    pub replacements: Vec<ReplacementRule>,
    /// Spawns from every matching rule, in rule order.
    pub mob_spawns: Vec<MobSpawnRule>,
}

#[derive(Debug)]
enum ResolverState {
    Unloaded,
    Loaded { generation: u64, rules: RuleSet },
}

/// Resolves categories against the installed rule set.
#[derive(Debug)]
pub struct BiomeRuleResolver {
    tiers: TierRegistry,
    state: ResolverState,
    cache_key: Option<(u64, u64)>,
    resolved: HashMap<CategoryId, Option<Arc<ResolvedCategory>>>,
    pools: HashMap<TierId, Arc<WeightedPool>>,
}

impl BiomeRuleResolver {
    /// Creates an unloaded resolver.
    #[must_use]
    pub fn new(tiers: TierRegistry) -> Self {
        Self {
            tiers,
            state: ResolverState::Unloaded,
            cache_key: None,
            resolved: HashMap::new(),
            pools: HashMap::new(),
        }
    }

    /// Replaces the rule set and bumps the generation.
    ///
    /// Returns the new generation.
    pub fn install(&mut self, rules: RuleSet) -> u64 {
        let generation = self.generation() + 1;
        tracing::info!(
            "Installing {} biome rules as generation {generation}",
            rules.len()
        );
        self.state = ResolverState::Loaded { generation, rules };
        self.invalidate();
        generation
    }

    /// Current generation (0 while unloaded).
    #[must_use]
    pub fn generation(&self) -> u64 {
        match &self.state {
            ResolverState::Unloaded => 0,
            ResolverState::Loaded { generation, .. } => *generation,
        }
    }

    /// Returns true once a rule set has been installed.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        matches!(self.state, ResolverState::Loaded { .. })
    }

    /// Known tiers.
    #[must_use]
    pub fn tiers(&self) -> &TierRegistry {
        &self.tiers
    }

    /// Resolves a category.
    ///
    /// Returns `None` iff the category is not registered.
    pub fn resolve(
        &mut self,
        registry: &CategoryRegistry,
        category: &CategoryId,
    ) -> Option<Arc<ResolvedCategory>> {
        self.sync_cache(registry);
        if let Some(cached) = self.resolved.get(category) {
            return cached.clone();
        }
        let resolved = self.compute(registry, category).map(Arc::new);
        self.resolved.insert(category.clone(), resolved.clone());
        resolved
    }

    /// Weighted pool of every category resolving to `tier`.
    ///
    /// Non-pooled and unknown tiers always yield an empty pool.
    pub fn weighted_pool(&mut self, registry: &CategoryRegistry, tier: &TierId) -> Arc<WeightedPool> {
        self.sync_cache(registry);
        if let Some(pool) = self.pools.get(tier) {
            return Arc::clone(pool);
        }

        let mut entries = Vec::new();
        if self.tiers.is_pooled(tier) {
            // Registry ids iterate sorted, which fixes the pool order.
            for category in registry.ids() {
                if let Some(resolved) = self.resolve(registry, category) {
                    if resolved.tier.as_ref() == Some(tier) {
                        entries.push((category.clone(), resolved.weight));
                    }
                }
            }
        }
        let pool = Arc::new(WeightedPool::new(entries));
        tracing::debug!(
            "Built pool for tier {tier}: {} categories, total weight {}",
            pool.entries().len(),
            pool.total_weight()
        );
        self.pools.insert(tier.clone(), Arc::clone(&pool));
        pool
    }

    fn compute(&self, registry: &CategoryRegistry, category: &CategoryId) -> Option<ResolvedCategory> {
        if !registry.contains(category) {
            return None;
        }

        let rules = match &self.state {
            ResolverState::Unloaded => &[][..],
            ResolverState::Loaded { rules, .. } => rules.rules(),
        };

        let mut resolved: Option<ResolvedCategory> = None;
        for rule in rules.iter().filter(|r| r.matches(registry, category)) {
            let entry = resolved.get_or_insert_with(|| ResolvedCategory {
                tier: Some(rule.tier.clone()),
                weight: rule.weight.max(1),
                replacements: Vec::new(),
                mob_spawns: Vec::new(),
            });
            entry.replacements.extend(rule.replacements.iter().cloned());
            entry.mob_spawns.extend(rule.mob_spawns.iter().cloned());
        }

        Some(resolved.unwrap_or_else(|| ResolvedCategory {
            tier: self.tiers.legacy_tier_for(registry, category),
            weight: 1,
            replacements: Vec::new(),
            mob_spawns: Vec::new(),
        }))
    }

    fn sync_cache(&mut self, registry: &CategoryRegistry) {
        let key = (self.generation(), registry.identity());
        if self.cache_key != Some(key) {
            self.invalidate();
            self.cache_key = Some(key);
        }
    }

    fn invalidate(&mut self) {
        self.resolved.clear();
        self.pools.clear();
        self.cache_key = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::BlockMatcher;

    const TIERS: &str = r#"
        [[tier]]
        id = "copper"
        legacy_tags = ["is_common"]

        [[tier]]
        id = "gold"
    "#;

    const RULES: &str = r##"
        [[rule]]
        id = "hot_gold"
        priority = 20
        tag = "hot"
        tier = "gold"
        weight = 6
        [[rule.replace]]
        match = "sand"
        with = "red_sand"

        [[rule]]
        id = "everything"
        priority = 0
        deny = ["ocean"]
        tier = "copper"
        weight = 3
        [[rule.replace]]
        match = "#logs"
        with = "stone"
        [[rule.spawn]]
        entity = "sheep"
    "##;

    fn setup() -> (BiomeRuleResolver, CategoryRegistry) {
        let tiers = TierRegistry::from_toml_str(TIERS).unwrap();
        let rules = RuleSet::from_toml_str(RULES, &tiers).unwrap();
        let mut resolver = BiomeRuleResolver::new(tiers);
        resolver.install(rules);

        let mut reg = CategoryRegistry::new();
        reg.register("desert", ["hot"]);
        reg.register("plains", ["is_common"]);
        reg.register("ocean", ["is_common"]);
        reg.register("badlands", ["hot"]);
        (resolver, reg)
    }

    #[test]
    fn test_first_match_wins_lists_concatenate() {
        let (mut resolver, reg) = setup();
        let desert = resolver.resolve(&reg, &"desert".into()).unwrap();
        assert_eq!(desert.tier, Some("gold".into()));
        assert_eq!(desert.weight, 6);
        assert_eq!(desert.replacements.len(), 2);
        assert_eq!(desert.replacements[0].matcher, BlockMatcher::Exact("sand".into()));
        assert_eq!(desert.replacements[1].matcher, BlockMatcher::Tag("logs".into()));
        assert_eq!(desert.mob_spawns.len(), 1);
    }

    #[test]
    fn test_unknown_category_is_none() {
        let (mut resolver, reg) = setup();
        assert!(resolver.resolve(&reg, &"nether".into()).is_none());
    }

    #[test]
    fn test_legacy_fallback_when_no_rule_matches() {
        let (mut resolver, reg) = setup();
        let ocean = resolver.resolve(&reg, &"ocean".into()).unwrap();
        assert_eq!(ocean.tier, Some("copper".into()));
        assert_eq!(ocean.weight, 1);
        assert!(ocean.replacements.is_empty());
    }

    #[test]
    fn test_unloaded_uses_legacy_only() {
        let tiers = TierRegistry::from_toml_str(TIERS).unwrap();
        let mut resolver = BiomeRuleResolver::new(tiers);
        let (_, reg) = setup();
        assert!(!resolver.is_loaded());
        assert_eq!(
            resolver.resolve(&reg, &"desert".into()).unwrap().tier,
            None
        );
        assert_eq!(
            resolver.resolve(&reg, &"plains".into()).unwrap().tier,
            Some("copper".into())
        );
    }

    #[test]
    fn test_pool_sorted_by_category_id() {
        let (mut resolver, reg) = setup();
        let gold = resolver.weighted_pool(&reg, &"gold".into());
        let ids: Vec<&str> = gold.entries().iter().map(|(c, _)| c.as_str()).collect();
        assert_eq!(ids, ["badlands", "desert"]);
        assert_eq!(gold.total_weight(), 12);

        let copper = resolver.weighted_pool(&reg, &"copper".into());
        let ids: Vec<&str> = copper.entries().iter().map(|(c, _)| c.as_str()).collect();
        assert_eq!(ids, ["ocean", "plains"]);
        assert_eq!(copper.total_weight(), 4);
    }

    #[test]
    fn test_local_and_unknown_tiers_never_pool() {
        let (mut resolver, reg) = setup();
        assert!(resolver.weighted_pool(&reg, &crate::LOCAL_TIER.into()).is_empty());
        assert!(resolver.weighted_pool(&reg, &"mythril".into()).is_empty());
    }

    #[test]
    fn test_install_invalidates_cache() {
        let (mut resolver, reg) = setup();
        assert_eq!(resolver.weighted_pool(&reg, &"gold".into()).entries().len(), 2);

        let empty = RuleSet::from_toml_str("", resolver.tiers()).unwrap();
        assert_eq!(resolver.install(empty), 2);
        assert!(resolver.weighted_pool(&reg, &"gold".into()).is_empty());
    }

    #[test]
    fn test_registry_change_invalidates_cache() {
        let (mut resolver, mut reg) = setup();
        assert_eq!(resolver.weighted_pool(&reg, &"gold".into()).entries().len(), 2);
        reg.register("mesa", ["hot"]);
        assert_eq!(resolver.weighted_pool(&reg, &"gold".into()).entries().len(), 3);
    }
}
