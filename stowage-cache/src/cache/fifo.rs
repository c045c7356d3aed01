//! First-in-first-out eviction.

use std::collections::{HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError, RwLock};

use stowage_core::{CacheResult, CacheValue};

use super::traits::{Cache, StoreKey};

/// Insertion order of the live keys.
struct InsertionOrder<K> {
    queue: VecDeque<K>,
    live: HashSet<K>,
}

impl<K: StoreKey> InsertionOrder<K> {
    fn new() -> Self {
        Self {
            queue: VecDeque::new(),
            live: HashSet::new(),
        }
    }

    /// Queue a key unless it is already live; returns the keys pushed out.
    fn admit(&mut self, key: K, capacity: usize) -> Vec<K> {
        if self.live.insert(key.clone()) {
            self.queue.push_back(key);
        }
        let mut evicted = Vec::new();
        while self.queue.len() > capacity {
            match self.queue.pop_front() {
                Some(oldest) => {
                    self.live.remove(&oldest);
                    evicted.push(oldest);
                }
                None => break,
            }
        }
        evicted
    }

    fn forget(&mut self, key: &K) {
        if self.live.remove(key) {
            self.queue.retain(|queued| queued != key);
        }
    }

    fn clear(&mut self) {
        self.queue.clear();
        self.live.clear();
    }
}

/// Bounds a delegate to `capacity` live keys, evicting the oldest insert.
///
/// Reads never change a key's position, and neither does overwriting a key
/// that is already live.
pub struct FifoCache<C, K> {
    delegate: C,
    capacity: usize,
    order: Mutex<InsertionOrder<K>>,
}

impl<C, K: StoreKey> FifoCache<C, K> {
    /// Wrap a delegate with the given capacity.
    pub fn new(delegate: C, capacity: usize) -> Self {
        Self {
            delegate,
            capacity,
            order: Mutex::new(InsertionOrder::new()),
        }
    }

    /// Borrow the wrapped cache.
    pub fn delegate(&self) -> &C {
        &self.delegate
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn lock_order(&self) -> MutexGuard<'_, InsertionOrder<K>> {
        self.order.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<C, K, V> Cache<K, V> for FifoCache<C, K>
where
    C: Cache<K, V>,
    K: StoreKey,
{
    fn id(&self) -> &str {
        self.delegate.id()
    }

    fn put(&self, key: K, value: CacheValue<V>) -> CacheResult<()> {
        self.delegate.put(key.clone(), value)?;
        let evicted = self.lock_order().admit(key, self.capacity);
        for key in evicted {
            tracing::trace!(cache_id = self.delegate.id(), key = ?key, "Evicting oldest key");
            self.delegate.remove(&key)?;
        }
        Ok(())
    }

    fn get(&self, key: &K) -> CacheResult<Option<CacheValue<V>>> {
        self.delegate.get(key)
    }

    fn remove(&self, key: &K) -> CacheResult<Option<CacheValue<V>>> {
        self.lock_order().forget(key);
        self.delegate.remove(key)
    }

    fn invalidate(&self, key: &K) -> CacheResult<()> {
        self.lock_order().forget(key);
        self.delegate.invalidate(key)
    }

    fn clear(&self) -> CacheResult<()> {
        self.lock_order().clear();
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

    fn fifo(capacity: usize) -> FifoCache<PerpetualCache<&'static str, i32>, &'static str> {
        FifoCache::new(PerpetualCache::new("fifo"), capacity)
    }

    #[test]
    fn test_reads_do_not_protect() {
        let cache = fifo(2);
        cache.put("A", CacheValue::Value(1)).unwrap();
        cache.put("B", CacheValue::Value(2)).unwrap();
        cache.get(&"A").unwrap();
        cache.put("C", CacheValue::Value(3)).unwrap();

        assert_eq!(cache.get(&"A").unwrap(), None);
        assert_eq!(cache.get(&"B").unwrap(), Some(CacheValue::Value(2)));
        assert_eq!(cache.get(&"C").unwrap(), Some(CacheValue::Value(3)));
    }

    #[test]
    fn test_overwrite_keeps_position() {
        let cache = fifo(2);
        cache.put("A", CacheValue::Value(1)).unwrap();
        cache.put("B", CacheValue::Value(2)).unwrap();
        cache.put("A", CacheValue::Value(10)).unwrap();
        cache.put("C", CacheValue::Value(3)).unwrap();

        assert_eq!(cache.get(&"A").unwrap(), None);
        assert_eq!(cache.size().unwrap(), 2);
    }

    #[test]
    fn test_remove_frees_slot() {
        let cache = fifo(2);
        cache.put("A", CacheValue::Value(1)).unwrap();
        cache.put("B", CacheValue::Value(2)).unwrap();
        cache.remove(&"A").unwrap();
        cache.put("C", CacheValue::Value(3)).unwrap();

        assert_eq!(cache.get(&"B").unwrap(), Some(CacheValue::Value(2)));
        assert_eq!(cache.capacity(), 2);
    }

    #[test]
    fn test_forgotten_key_leaves_queue_order_intact() {
        let cache = fifo(2);
        cache.put("A", CacheValue::Value(1)).unwrap();
        cache.put("B", CacheValue::Value(2)).unwrap();
        cache.invalidate(&"A").unwrap();
        cache.put("C", CacheValue::Value(3)).unwrap();
        cache.put("D", CacheValue::Value(4)).unwrap();

        assert_eq!(cache.get(&"B").unwrap(), None);
        assert_eq!(cache.get(&"C").unwrap(), Some(CacheValue::Value(3)));
        assert_eq!(cache.get(&"D").unwrap(), Some(CacheValue::Value(4)));
        assert_eq!(cache.size().unwrap(), 2);
    }
}
