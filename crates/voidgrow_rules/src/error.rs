//! # Rule Error Types

use thiserror::Error;

/// Errors that can occur while loading biome rules and tiers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuleError {
    /// The rule file could not be read.
    #[error("failed to read rules: {0}")]
    Io(String),

    /// The rule file is not valid TOML for the expected schema.
    #[error("failed to parse rules: {0}")]
    Parse(String),

    /// A rule names a tier that is not registered.
    #[error("rule {rule} uses unknown tier {tier}")]
    UnknownTier {
        /// Source id of the rejected rule.
        rule: String,
        /// The unrecognized tier name.
        tier: String,
    },

    /// A rule or spawn entry declared a zero weight.
    #[error("rule {rule} has zero weight")]
    ZeroWeight {
        /// Source id of the rejected rule.
        rule: String,
    },

    /// A replacement matcher or target is empty.
    #[error("rule {rule} has an invalid replacement: {detail}")]
    InvalidReplacement {
        /// Source id of the rejected rule.
        rule: String,
        /// What was wrong.
        detail: String,
    },

    /// Two tiers share one id.
    #[error("duplicate tier: {0}")]
    DuplicateTier(String),
}

/// Result type for rule operations.
pub type RuleResult<T> = Result<T, RuleError>;

impl From<toml::de::Error> for RuleError {
    fn from(err: toml::de::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

impl From<std::io::Error> for RuleError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
