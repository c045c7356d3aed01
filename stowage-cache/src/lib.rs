//! Stowage Cache - Cache SPI, Decorators and Transactional Buffering
//!
//! Defines the namespace cache abstraction, the decorators that compose on
//! top of the in-memory base store, and the transactional layer that keeps a
//! unit-of-work's cache writes invisible to other sessions until commit.
//!
//! ```
//! use std::sync::Arc;
//! use stowage_cache::{CacheBuilder, CacheRegistry, TransactionalCacheManager};
//! use stowage_core::{CacheConfig, CacheValue};
//!
//! let registry = Arc::new(CacheRegistry::<String, i64>::new());
//! CacheBuilder::new(CacheConfig::new("users"))
//!     .register_into(&registry)
//!     .unwrap();
//!
//! let mut session = TransactionalCacheManager::new(Arc::clone(&registry));
//! assert_eq!(session.get("users", &"alice".to_string()).unwrap(), None);
//! session.put("users", "alice".to_string(), CacheValue::Value(42)).unwrap();
//! session.commit_all().unwrap();
//! ```

pub mod builder;
pub mod cache;
pub mod manager;
pub mod registry;
pub mod transactional;

pub use builder::CacheBuilder;
pub use cache::{
    BlockingCache, Cache, CacheStats, FifoCache, LoggingCache, LruCache, PerpetualCache,
    ScheduledCache, SerializedCache, SharedCache, StoreKey, StoreValue, SynchronizedCache,
};
pub use manager::TransactionalCacheManager;
pub use registry::CacheRegistry;
pub use transactional::{CommitSummary, RollbackReport, TransactionalCache, UnlockFailure};

// Re-export core types so callers need only one import path
pub use stowage_core::{
    CacheConfig, CacheError, CacheKey, CacheResult, CacheValue, EvictionPolicy, KeyComponent,
    StowageError, StowageResult,
};
