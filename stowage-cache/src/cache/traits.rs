//! Cache SPI and key/value marker traits.
//!
//! This module defines the contract implemented identically by the base store
//! and by every decorator, so decorators can be stacked in any order.

use std::fmt::Debug;
use std::hash::Hash;
use std::sync::{Arc, RwLock};

use stowage_core::{CacheResult, CacheValue};

/// Marker trait for types usable as cache keys.
///
/// Keys are opaque tokens with equality and hash semantics. `Debug` is used
/// to render keys in log fields and error messages.
pub trait StoreKey: Eq + Hash + Clone + Debug + Send + Sync + 'static {}

impl<T> StoreKey for T where T: Eq + Hash + Clone + Debug + Send + Sync + 'static {}

/// Marker trait for types usable as cache values.
pub trait StoreValue: Clone + Send + Sync + 'static {}

impl<T> StoreValue for T where T: Clone + Send + Sync + 'static {}

/// Cache SPI.
///
/// One instance exists per namespace. Every method takes `&self`: caches are
/// shared across concurrent units-of-work behind an `Arc`, so implementations
/// provide their own interior mutability.
///
/// # Absent vs null
///
/// `get` returns `None` when the key was never stored and
/// `Some(CacheValue::Null)` when a miss was recorded for it.
pub trait Cache<K, V>: Send + Sync {
    /// Identifier of this cache, usually the namespace id.
    fn id(&self) -> &str;

    /// Insert or overwrite the value for a key.
    fn put(&self, key: K, value: CacheValue<V>) -> CacheResult<()>;

    /// Look up a key.
    fn get(&self, key: &K) -> CacheResult<Option<CacheValue<V>>>;

    /// Remove a key, returning what was stored.
    ///
    /// Optional: decorators that cannot evict a single key may fail here,
    /// and callers on the rollback path must tolerate that.
    fn remove(&self, key: &K) -> CacheResult<Option<CacheValue<V>>>;

    /// Delete the stored entry for a key outright.
    ///
    /// Decorators that give `remove` another meaning (such as releasing a
    /// lock) still delete here. Defaults to `remove`.
    fn invalidate(&self, key: &K) -> CacheResult<()> {
        self.remove(key).map(|_| ())
    }

    /// Drop every entry.
    fn clear(&self) -> CacheResult<()>;

    /// Number of stored entries (not the capacity). Informational only.
    fn size(&self) -> CacheResult<usize>;

    /// Lock that external coordinators may acquire around a batch of calls.
    ///
    /// Optional; no component in this crate requires it.
    fn read_write_lock(&self) -> Option<&RwLock<()>> {
        None
    }
}

impl<K, V, C> Cache<K, V> for Box<C>
where
    C: Cache<K, V> + ?Sized,
{
    fn id(&self) -> &str {
        (**self).id()
    }

    fn put(&self, key: K, value: CacheValue<V>) -> CacheResult<()> {
        (**self).put(key, value)
    }

    fn get(&self, key: &K) -> CacheResult<Option<CacheValue<V>>> {
        (**self).get(key)
    }

    fn remove(&self, key: &K) -> CacheResult<Option<CacheValue<V>>> {
        (**self).remove(key)
    }

    fn invalidate(&self, key: &K) -> CacheResult<()> {
        (**self).invalidate(key)
    }

    fn clear(&self) -> CacheResult<()> {
        (**self).clear()
    }

    fn size(&self) -> CacheResult<usize> {
        (**self).size()
    }

    fn read_write_lock(&self) -> Option<&RwLock<()>> {
        (**self).read_write_lock()
    }
}

impl<K, V, C> Cache<K, V> for Arc<C>
where
    C: Cache<K, V> + ?Sized,
{
    fn id(&self) -> &str {
        (**self).id()
    }

    fn put(&self, key: K, value: CacheValue<V>) -> CacheResult<()> {
        (**self).put(key, value)
    }

    fn get(&self, key: &K) -> CacheResult<Option<CacheValue<V>>> {
        (**self).get(key)
    }

    fn remove(&self, key: &K) -> CacheResult<Option<CacheValue<V>>> {
        (**self).remove(key)
    }

    fn invalidate(&self, key: &K) -> CacheResult<()> {
        (**self).invalidate(key)
    }

    fn clear(&self) -> CacheResult<()> {
        (**self).clear()
    }

    fn size(&self) -> CacheResult<usize> {
        (**self).size()
    }

    fn read_write_lock(&self) -> Option<&RwLock<()>> {
        (**self).read_write_lock()
    }
}

/// Shared handle to a namespace cache.
pub type SharedCache<K, V> = Arc<dyn Cache<K, V>>;
