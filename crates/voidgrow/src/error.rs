//! # Host Error Types
//!
//! Startup failures. Once the world loop runs, nothing is fatal.

use thiserror::Error;
use voidgrow_core::CoreError;
use voidgrow_expansion::ExpansionError;
use voidgrow_rules::RuleError;

/// Errors raised while assembling or persisting a world.
#[derive(Error, Debug)]
pub enum HostError {
    /// A data file could not be read.
    #[error("cannot read {path}: {source}")]
    Io {
        /// File path.
        path: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// A data file is not valid TOML for its schema.
    #[error("invalid {path}: {message}")]
    Config {
        /// File path.
        path: String,
        /// Parser message.
        message: String,
    },

    /// Tier or rule loading failed.
    #[error(transparent)]
    Rules(#[from] RuleError),

    /// Expansion configuration failed.
    #[error(transparent)]
    Expansion(#[from] ExpansionError),

    /// Ledger or palette failure.
    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Result type for host operations.
pub type HostResult<T> = Result<T, HostError>;
