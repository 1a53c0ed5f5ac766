//! Error types for the cache
//!
//! Provides unified error handling using thiserror. Cache misses and expiry
//! are not errors; only construction can fail.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Construction-time configuration is invalid
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A cleanup interval was configured outside of a Tokio runtime
    #[error("Cleanup interval requires a running Tokio runtime")]
    NoRuntime,

    /// An environment variable could not be parsed
    #[error("Invalid value for {var}: {value:?}")]
    Env {
        /// Name of the variable
        var: String,
        /// Raw value that failed to parse
        value: String,
    },
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, CacheError>;
