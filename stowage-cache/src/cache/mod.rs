//! Cache SPI, the base store and the decorator stack.
//!
//! Every component here implements [`Cache`], so behaviors compose by wrapping:
//! a decorator owns its delegate and forwards to it, adding exactly one
//! concern on the way through.
//!
//! # Layering
//!
//! The builder assembles chains in this order, innermost first:
//!
//! ```text
//! PerpetualCache -> Lru | Fifo -> Scheduled -> Serialized -> Logging -> Synchronized -> Blocking
//! ```
//!
//! Nothing prevents other orders; the chain above is simply the one where each
//! layer sees the values and keys it expects.
//!
//! # Example
//!
//! ```
//! use stowage_cache::cache::{Cache, LoggingCache, LruCache, PerpetualCache, SynchronizedCache};
//! use stowage_core::CacheValue;
//!
//! let cache = SynchronizedCache::new(LoggingCache::new(LruCache::<_, &str>::new(
//!     PerpetualCache::<&str, i32>::new("users"),
//!     2,
//! )));
//! cache.put("alice", CacheValue::Value(1)).unwrap();
//! assert_eq!(cache.get(&"alice").unwrap(), Some(CacheValue::Value(1)));
//! ```

pub mod blocking;
pub mod fifo;
pub mod logging;
pub mod lru;
pub mod perpetual;
pub mod scheduled;
pub mod serialized;
pub mod synchronized;
pub mod traits;

pub use blocking::BlockingCache;
pub use fifo::FifoCache;
pub use logging::{CacheStats, LoggingCache};
pub use lru::LruCache;
pub use perpetual::PerpetualCache;
pub use scheduled::ScheduledCache;
pub use serialized::SerializedCache;
pub use synchronized::SynchronizedCache;
pub use traits::{Cache, SharedCache, StoreKey, StoreValue};
