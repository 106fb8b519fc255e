//! # VOIDGROW Biome Rules
//!
//! Decides, for every terrain category, which tier it belongs to, how often
//! it is picked, and which post-processing and spawn rules apply.
//!
//! ## Design Principles
//!
//! 1. **Declarative** - All balance data in TOML files
//! 2. **First match wins** - For tier and weight, in `(priority desc, id asc)` order
//! 3. **Everything accumulates** - Replacement and spawn lists from all matches
//! 4. **Generation-keyed caches** - A reload invalidates every resolution
//!
//! ## Example
//!
//! ```rust,ignore
//! use voidgrow_rules::{BiomeRuleResolver, CategoryRegistry, RuleSet, TierRegistry};
//!
//! let tiers = TierRegistry::from_toml_str(TIERS)?;
//! let rules = RuleSet::from_toml_str(RULES, &tiers)?;
//! let mut resolver = BiomeRuleResolver::new(tiers);
//! resolver.install(rules);
//!
//! let pool = resolver.weighted_pool(&categories, &"copper".into());
//! let category = pool.select(roll);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod category;
pub mod error;
pub mod pool;
pub mod resolver;
pub mod rule;
pub mod tier;

pub use category::CategoryRegistry;
pub use error::{RuleError, RuleResult};
pub use pool::WeightedPool;
pub use resolver::{BiomeRuleResolver, ResolvedCategory};
pub use rule::{BiomeRule, BlockMatcher, MobSpawnRule, ReplacementRule, RuleSet, RuleSource};
pub use tier::{TierDef, TierRegistry, LOCAL_TIER};
