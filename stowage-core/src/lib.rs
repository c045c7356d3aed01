//! Stowage Core - Cache Value, Key, Config and Error Types
//!
//! Pure data structures shared by every Stowage crate. This crate contains
//! ONLY data types - the cache implementations live in stowage-cache.

pub mod config;
pub mod error;
pub mod key;
pub mod value;

pub use config::{CacheConfig, EvictionPolicy, DEFAULT_CACHE_SIZE};
pub use error::{
    CacheError, CacheOperation, CacheResult, ConfigError, StowageError, StowageResult,
};
pub use key::{CacheKey, KeyComponent};
pub use value::{is_hit, CacheValue};
