//! Time-based clearing.

use std::sync::{Mutex, PoisonError, RwLock};
use std::time::{Duration, Instant};

use stowage_core::{CacheResult, CacheValue};

use super::traits::Cache;

/// Clears the whole delegate once `clear_interval` has passed since the last
/// clear. The check runs lazily at the start of each operation; nothing is
/// scheduled in the background.
pub struct ScheduledCache<C> {
    delegate: C,
    clear_interval: Duration,
    last_clear: Mutex<Instant>,
}

impl<C> ScheduledCache<C> {
    /// Wrap a delegate.
    pub fn new(delegate: C, clear_interval: Duration) -> Self {
        Self {
            delegate,
            clear_interval,
            last_clear: Mutex::new(Instant::now()),
        }
    }

    /// Borrow the wrapped cache.
    pub fn delegate(&self) -> &C {
        &self.delegate
    }

    pub fn clear_interval(&self) -> Duration {
        self.clear_interval
    }

    fn clear_when_interval_reset<K, V>(&self) -> CacheResult<bool>
    where
        C: Cache<K, V>,
    {
        let mut last_clear = self.last_clear.lock().unwrap_or_else(PoisonError::into_inner);
        if last_clear.elapsed() <= self.clear_interval {
            return Ok(false);
        }
        self.delegate.clear()?;
        *last_clear = Instant::now();
        tracing::debug!(
            cache_id = self.delegate.id(),
            interval_ms = self.clear_interval.as_millis() as u64,
            "Scheduled cache clear"
        );
        Ok(true)
    }
}

impl<C, K, V> Cache<K, V> for ScheduledCache<C>
where
    C: Cache<K, V>,
{
    fn id(&self) -> &str {
        self.delegate.id()
    }

    fn put(&self, key: K, value: CacheValue<V>) -> CacheResult<()> {
        self.clear_when_interval_reset::<K, V>()?;
        self.delegate.put(key, value)
    }

    fn get(&self, key: &K) -> CacheResult<Option<CacheValue<V>>> {
        if self.clear_when_interval_reset::<K, V>()? {
            return Ok(None);
        }
        self.delegate.get(key)
    }

    fn remove(&self, key: &K) -> CacheResult<Option<CacheValue<V>>> {
        self.clear_when_interval_reset::<K, V>()?;
        self.delegate.remove(key)
    }

    fn invalidate(&self, key: &K) -> CacheResult<()> {
        self.clear_when_interval_reset::<K, V>()?;
        self.delegate.invalidate(key)
    }

    fn clear(&self) -> CacheResult<()> {
        let mut last_clear = self.last_clear.lock().unwrap_or_else(PoisonError::into_inner);
        self.delegate.clear()?;
        *last_clear = Instant::now();
        Ok(())
    }

    fn size(&self) -> CacheResult<usize> {
        self.clear_when_interval_reset::<K, V>()?;
        self.delegate.size()
    }

    fn read_write_lock(&self) -> Option<&RwLock<()>> {
        self.delegate.read_write_lock()
    }
}
