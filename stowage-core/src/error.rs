//! Error types for Stowage operations

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Cache SPI operation, used to tag delegate failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheOperation {
    Get,
    Put,
    Remove,
    Clear,
    Size,
}

impl CacheOperation {
    /// Lowercase name used in error messages and log fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheOperation::Get => "get",
            CacheOperation::Put => "put",
            CacheOperation::Remove => "remove",
            CacheOperation::Clear => "clear",
            CacheOperation::Size => "size",
        }
    }
}

impl fmt::Display for CacheOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cache layer errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("Serialization failed in cache {cache_id}: {reason}")]
    Serialization { cache_id: String, reason: String },

    #[error("Delegate {operation} failed in cache {cache_id}: {reason}")]
    DelegateOperation {
        cache_id: String,
        operation: CacheOperation,
        reason: String,
    },

    #[error("Lock poisoned in cache {cache_id}")]
    LockPoisoned { cache_id: String },

    #[error("Timed out after {waited:?} waiting for lock on key {key} in cache {cache_id}")]
    LockTimeout {
        cache_id: String,
        key: String,
        waited: Duration,
    },

    #[error("Attempt to release unacquired lock on key {key} in cache {cache_id}")]
    UnacquiredLock { cache_id: String, key: String },

    #[error("No cache registered for namespace {namespace}")]
    UnknownNamespace { namespace: String },
}

impl CacheError {
    /// Build a delegate failure for the given cache and operation.
    pub fn delegate(
        cache_id: impl Into<String>,
        operation: CacheOperation,
        reason: impl fmt::Display,
    ) -> Self {
        CacheError::DelegateOperation {
            cache_id: cache_id.into(),
            operation,
            reason: reason.to_string(),
        }
    }

    /// Build a serialization failure for the given cache.
    pub fn serialization(cache_id: impl Into<String>, reason: impl fmt::Display) -> Self {
        CacheError::Serialization {
            cache_id: cache_id.into(),
            reason: reason.to_string(),
        }
    }

    /// Build a poisoned-lock failure for the given cache.
    pub fn poisoned(cache_id: impl Into<String>) -> Self {
        CacheError::LockPoisoned {
            cache_id: cache_id.into(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Incompatible options: {option_a} and {option_b}")]
    IncompatibleOptions { option_a: String, option_b: String },

    #[error("Namespace already registered: {namespace}")]
    DuplicateNamespace { namespace: String },
}

/// Master error type for all Stowage errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StowageError {
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type alias for Stowage operations.
pub type StowageResult<T> = Result<T, StowageError>;

/// Result type alias for cache SPI operations.
pub type CacheResult<T> = Result<T, CacheError>;

// =============================================================================
// TESTS
// =============================================================================
