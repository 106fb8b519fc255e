//! # Core Error Types
//!
//! All errors that can occur in the ledger and its persistence.

use thiserror::Error;

/// Errors that can occur in the core crate.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// `next_deterministic_int` was called with a bound of zero.
    #[error("deterministic int bound must be at least 1")]
    ZeroBound,

    /// Reading or writing the ledger file failed.
    #[error("ledger i/o failed: {0}")]
    Io(String),

    /// The ledger record could not be parsed.
    #[error("corrupt ledger record: {0}")]
    Corrupt(String),

    /// The ledger record was written by a newer format.
    #[error("unsupported ledger format version {found} (max {supported})")]
    UnsupportedVersion {
        /// Version found in the record.
        found: u32,
        /// Highest version this build reads.
        supported: u32,
    },

    /// A block name was registered twice in the palette.
    #[error("duplicate block name: {0}")]
    DuplicateBlock(String),

    /// The palette ran out of ids.
    #[error("block palette is full")]
    PaletteFull,
}

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

impl From<std::io::Error> for CoreError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Corrupt(err.to_string())
    }
}
