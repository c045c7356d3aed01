//! Per-call mutual exclusion.

use std::sync::{RwLock, RwLockWriteGuard};

use stowage_core::{CacheError, CacheResult, CacheValue};

use super::traits::Cache;

/// Serializes every operation on the delegate behind one lock.
///
/// Each call holds the lock exclusively for its whole duration, which makes
/// compound decorator behavior (an LRU put followed by its eviction, say)
/// atomic with respect to other callers. The lock is also exposed through
/// [`Cache::read_write_lock`] so an external coordinator can hold it across
/// several calls; operations wait while it is held in either mode.
pub struct SynchronizedCache<C> {
    delegate: C,
    lock: RwLock<()>,
}

impl<C> SynchronizedCache<C> {
    /// Wrap a delegate.
    pub fn new(delegate: C) -> Self {
        Self {
            delegate,
            lock: RwLock::new(()),
        }
    }

    /// Borrow the wrapped cache.
    pub fn delegate(&self) -> &C {
        &self.delegate
    }

    fn exclusive(&self, cache_id: &str) -> CacheResult<RwLockWriteGuard<'_, ()>> {
        self.lock
            .write()
            .map_err(|_| CacheError::poisoned(cache_id))
    }
}

impl<C, K, V> Cache<K, V> for SynchronizedCache<C>
where
    C: Cache<K, V>,
{
    fn id(&self) -> &str {
        self.delegate.id()
    }

    fn put(&self, key: K, value: CacheValue<V>) -> CacheResult<()> {
        let _guard = self.exclusive(self.delegate.id())?;
        self.delegate.put(key, value)
    }

    fn get(&self, key: &K) -> CacheResult<Option<CacheValue<V>>> {
        let _guard = self.exclusive(self.delegate.id())?;
        self.delegate.get(key)
    }

    fn remove(&self, key: &K) -> CacheResult<Option<CacheValue<V>>> {
        let _guard = self.exclusive(self.delegate.id())?;
        self.delegate.remove(key)
    }

    fn invalidate(&self, key: &K) -> CacheResult<()> {
        let _guard = self.exclusive(self.delegate.id())?;
        self.delegate.invalidate(key)
    }

    fn clear(&self) -> CacheResult<()> {
        let _guard = self.exclusive(self.delegate.id())?;
        self.delegate.clear()
    }

    fn size(&self) -> CacheResult<usize> {
        let _guard = self.exclusive(self.delegate.id())?;
        self.delegate.size()
    }

    fn read_write_lock(&self) -> Option<&RwLock<()>> {
        Some(&self.lock)
    }
}
