//! Hit-ratio telemetry.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use stowage_core::{is_hit, CacheResult, CacheValue};

use super::traits::Cache;

/// Statistics about cache usage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of `get` calls.
    pub requests: u64,
    /// Number of `get` calls that returned a value.
    pub hits: u64,
}

impl CacheStats {
    /// Requests that did not return a value, including recorded nulls.
    pub fn misses(&self) -> u64 {
        self.requests.saturating_sub(self.hits)
    }

    /// Calculate the hit ratio (0.0 to 1.0).
    pub fn hit_ratio(&self) -> f64 {
        if self.requests == 0 {
            0.0
        } else {
            self.hits as f64 / self.requests as f64
        }
    }
}

/// Counts requests and hits and logs the running hit ratio on every read.
pub struct LoggingCache<C> {
    delegate: C,
    requests: AtomicU64,
    hits: AtomicU64,
}

impl<C> LoggingCache<C> {
    /// Wrap a delegate.
    pub fn new(delegate: C) -> Self {
        Self {
            delegate,
            requests: AtomicU64::new(0),
            hits: AtomicU64::new(0),
        }
    }

    /// Borrow the wrapped cache.
    pub fn delegate(&self) -> &C {
        &self.delegate
    }

    /// Snapshot of the counters.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            requests: self.requests.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
        }
    }

    /// Current hit ratio, 0.0 before the first request.
    pub fn hit_ratio(&self) -> f64 {
        self.stats().hit_ratio()
    }
}

impl<C, K, V> Cache<K, V> for LoggingCache<C>
where
    C: Cache<K, V>,
{
    fn id(&self) -> &str {
        self.delegate.id()
    }

    fn put(&self, key: K, value: CacheValue<V>) -> CacheResult<()> {
        self.delegate.put(key, value)
    }

    fn get(&self, key: &K) -> CacheResult<Option<CacheValue<V>>> {
        self.requests.fetch_add(1, Ordering::Relaxed);
        let value = self.delegate.get(key)?;
        if is_hit(&value) {
            self.hits.fetch_add(1, Ordering::Relaxed);
        }
        tracing::debug!(
            cache_id = self.delegate.id(),
            hit_ratio = self.hit_ratio(),
            "Cache hit ratio"
        );
        Ok(value)
    }

    fn remove(&self, key: &K) -> CacheResult<Option<CacheValue<V>>> {
        self.delegate.remove(key)
    }

    fn invalidate(&self, key: &K) -> CacheResult<()> {
        self.delegate.invalidate(key)
    }

    fn clear(&self) -> CacheResult<()> {
        self.delegate.clear()
    }

    fn size(&self) -> CacheResult<usize> {
        self.delegate.size()
    }

    fn read_write_lock(&self) -> Option<&RwLock<()>> {
        self.delegate.read_write_lock()
    }
}
