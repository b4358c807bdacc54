//! Error types for the cache primitives
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache crate.
///
/// Misses are never errors: `get` returns `None` and `remove` of an absent
/// key does nothing. Errors are reserved for usage mistakes and file I/O.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Positional arguments were passed to a singleton constructor
    #[error("Positional arguments are not supported by singleton constructors")]
    PositionalArgs,

    /// A required keyword argument was not supplied
    #[error("Missing argument: {0}")]
    MissingArgument(String),

    /// A keyword argument had the wrong type
    #[error("Invalid argument '{name}': expected {expected}")]
    InvalidArgument { name: String, expected: &'static str },

    /// Key cannot be used as a file cache entry name
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// File cache I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// File cache value could not be (de)serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

// == Result Type Alias ==
/// Convenience Result type for the cache crate.
pub type Result<T> = std::result::Result<T, CacheError>;
