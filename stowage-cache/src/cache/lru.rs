//! Least-recently-used eviction.
//!
//! The decorator keeps its own recency order of the keys it has written and
//! evicts through the delegate, so the decorator and the delegate behave as
//! one logical store.

use std::sync::{Mutex, MutexGuard, PoisonError, RwLock};

use stowage_core::{CacheResult, CacheValue};

use super::traits::{Cache, StoreKey};

struct LruState<K: StoreKey> {
    recency: lru::LruCache<K, ()>,
    capacity: usize,
}

impl<K: StoreKey> LruState<K> {
    /// Pop least recently used keys until at most `capacity` remain.
    fn drain_over(&mut self) -> Vec<K> {
        let mut evicted = Vec::new();
        while self.recency.len() > self.capacity {
            match self.recency.pop_lru() {
                Some((key, ())) => evicted.push(key),
                None => break,
            }
        }
        evicted
    }
}

/// Bounds a delegate to `capacity` live keys, evicting the least recently used.
pub struct LruCache<C, K: StoreKey> {
    delegate: C,
    state: Mutex<LruState<K>>,
}

impl<C, K: StoreKey> LruCache<C, K> {
    /// Wrap a delegate with the given capacity.
    pub fn new(delegate: C, capacity: usize) -> Self {
        Self {
            delegate,
            state: Mutex::new(LruState {
                // Unbounded; `drain_over` enforces the capacity.
                recency: lru::LruCache::unbounded(),
                capacity,
            }),
        }
    }

    /// Borrow the wrapped cache.
    pub fn delegate(&self) -> &C {
        &self.delegate
    }

    /// Current capacity.
    pub fn capacity(&self) -> usize {
        self.lock_state().capacity
    }

    /// Change the capacity, evicting immediately if it shrank.
    pub fn set_capacity<V>(&self, capacity: usize) -> CacheResult<()>
    where
        C: Cache<K, V>,
    {
        let evicted = {
            let mut state = self.lock_state();
            state.capacity = capacity;
            state.drain_over()
        };
        self.evict::<V>(evicted)
    }

    // The order is only advisory, so a poisoned lock is recovered.
    fn lock_state(&self) -> MutexGuard<'_, LruState<K>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn evict<V>(&self, keys: Vec<K>) -> CacheResult<()>
    where
        C: Cache<K, V>,
    {
        for key in keys {
            tracing::trace!(cache_id = self.delegate.id(), key = ?key, "Evicting least recently used key");
            self.delegate.remove(&key)?;
        }
        Ok(())
    }
}

impl<C, K, V> Cache<K, V> for LruCache<C, K>
where
    C: Cache<K, V>,
    K: StoreKey,
{
    fn id(&self) -> &str {
        self.delegate.id()
    }

    fn put(&self, key: K, value: CacheValue<V>) -> CacheResult<()> {
        self.delegate.put(key.clone(), value)?;
        let evicted = {
            let mut state = self.lock_state();
            state.recency.put(key, ());
            state.drain_over()
        };
        self.evict::<V>(evicted)
    }

    fn get(&self, key: &K) -> CacheResult<Option<CacheValue<V>>> {
        self.lock_state().recency.promote(key);
        self.delegate.get(key)
    }

    fn remove(&self, key: &K) -> CacheResult<Option<CacheValue<V>>> {
        self.lock_state().recency.pop(key);
        self.delegate.remove(key)
    }

    fn invalidate(&self, key: &K) -> CacheResult<()> {
        self.lock_state().recency.pop(key);
        self.delegate.invalidate(key)
    }

    fn clear(&self) -> CacheResult<()> {
        self.lock_state().recency.clear();
        self.delegate.clear()
    }

    fn size(&self) -> CacheResult<usize> {
        self.delegate.size()
    }

    fn read_write_lock(&self) -> Option<&RwLock<()>> {
        self.delegate.read_write_lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::PerpetualCache;

    fn lru(capacity: usize) -> LruCache<PerpetualCache<&'static str, i32>, &'static str> {
        LruCache::new(PerpetualCache::new("lru"), capacity)
    }

    #[test]
    fn test_get_protects_from_eviction() {
        let cache = lru(2);
        cache.put("A", CacheValue::Value(1)).unwrap();
        cache.put("B", CacheValue::Value(2)).unwrap();
        cache.get(&"A").unwrap();
        cache.put("C", CacheValue::Value(3)).unwrap();

        let store = cache.delegate();
        assert_eq!(store.get(&"A").unwrap(), Some(CacheValue::Value(1)));
        assert_eq!(store.get(&"B").unwrap(), None);
        assert_eq!(store.get(&"C").unwrap(), Some(CacheValue::Value(3)));
        assert_eq!(store.size().unwrap(), 2);
    }

    #[test]
    fn test_insertion_order_breaks_ties() {
        let cache = lru(3);
        for (i, key) in ["A", "B", "C", "D"].into_iter().enumerate() {
            cache.put(key, CacheValue::Value(i as i32)).unwrap();
        }
        assert_eq!(cache.delegate().get(&"A").unwrap(), None);
        assert_eq!(cache.size().unwrap(), 3);
    }

    #[test]
    fn test_overwrite_refreshes_recency() {
        let cache = lru(2);
        cache.put("A", CacheValue::Value(1)).unwrap();
        cache.put("B", CacheValue::Value(2)).unwrap();
        cache.put("A", CacheValue::Value(10)).unwrap();
        cache.put("C", CacheValue::Value(3)).unwrap();

        assert_eq!(cache.get(&"A").unwrap(), Some(CacheValue::Value(10)));
        assert_eq!(cache.get(&"B").unwrap(), None);
    }

    #[test]
    fn test_null_entries_count_toward_capacity() {
        let cache = lru(1);
        cache.put("A", CacheValue::Null).unwrap();
        cache.put("B", CacheValue::Null).unwrap();
        assert_eq!(cache.get(&"A").unwrap(), None);
        assert_eq!(cache.get(&"B").unwrap(), Some(CacheValue::Null));
    }

    #[test]
    fn test_remove_forgets_key() {
        let cache = lru(2);
        cache.put("A", CacheValue::Value(1)).unwrap();
        cache.put("B", CacheValue::Value(2)).unwrap();
        cache.remove(&"A").unwrap();
        cache.put("C", CacheValue::Value(3)).unwrap();

        // A is gone already, so nothing needs evicting.
        assert_eq!(cache.get(&"B").unwrap(), Some(CacheValue::Value(2)));
        assert_eq!(cache.get(&"C").unwrap(), Some(CacheValue::Value(3)));
    }

    #[test]
    fn test_shrinking_capacity_evicts() {
        let cache = lru(4);
        for (i, key) in ["A", "B", "C", "D"].into_iter().enumerate() {
            cache.put(key, CacheValue::Value(i as i32)).unwrap();
        }
        cache.get(&"A").unwrap();
        cache.set_capacity::<i32>(2).unwrap();

        assert_eq!(cache.capacity(), 2);
        assert_eq!(cache.size().unwrap(), 2);
        assert_eq!(cache.get(&"A").unwrap(), Some(CacheValue::Value(0)));
        assert_eq!(cache.get(&"D").unwrap(), Some(CacheValue::Value(3)));
    }

    #[test]
    fn test_clear_resets_order() {
        let cache = lru(2);
        cache.put("A", CacheValue::Value(1)).unwrap();
        cache.clear().unwrap();
        cache.put("B", CacheValue::Value(2)).unwrap();
        cache.put("C", CacheValue::Value(3)).unwrap();
        assert_eq!(cache.size().unwrap(), 2);
    }

    #[test]
    fn test_invalidate_forgets_key() {
        let cache = lru(2);
        cache.put("A", CacheValue::Value(1)).unwrap();
        cache.put("B", CacheValue::Value(2)).unwrap();
        cache.invalidate(&"A").unwrap();
        cache.put("C", CacheValue::Value(3)).unwrap();

        assert_eq!(cache.delegate().get(&"A").unwrap(), None);
        assert_eq!(cache.get(&"B").unwrap(), Some(CacheValue::Value(2)));
        assert_eq!(cache.size().unwrap(), 2);
    }
}
