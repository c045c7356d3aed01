//! Per-key read-through locking.
//!
//! A `get` that misses leaves the key locked by the calling thread until that
//! thread stores a value with `put` or gives up with `remove`. Concurrent
//! readers of the same key wait, so only one of them loads the value from the
//! backing source.

use std::collections::HashMap;
use std::sync::{Condvar, Mutex, MutexGuard, RwLock};
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

use stowage_core::{is_hit, CacheError, CacheResult, CacheValue};

use super::traits::{Cache, StoreKey};

/// Serializes loads of the same key across threads.
///
/// Locks are owned by threads and are re-entrant: a thread that already holds
/// a key may `get` it again without waiting. `remove` does not touch the
/// delegate; it only releases the caller's lock. `invalidate` deletes from the
/// delegate and releases the lock if the caller held it.
pub struct BlockingCache<C, K> {
    delegate: C,
    timeout: Option<Duration>,
    locks: Mutex<HashMap<K, ThreadId>>,
    released: Condvar,
}

impl<C, K: StoreKey> BlockingCache<C, K> {
    /// Wrap a delegate. With no timeout, waiters block indefinitely.
    pub fn new(delegate: C, timeout: Option<Duration>) -> Self {
        Self {
            delegate,
            timeout,
            locks: Mutex::new(HashMap::new()),
            released: Condvar::new(),
        }
    }

    /// Borrow the wrapped cache.
    pub fn delegate(&self) -> &C {
        &self.delegate
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Whether the current thread holds the lock on `key`.
    pub fn holds_lock(&self, key: &K) -> bool {
        let me = thread::current().id();
        self.locks
            .lock()
            .map(|locks| locks.get(key) == Some(&me))
            .unwrap_or(false)
    }

    fn lock_table(&self, cache_id: &str) -> CacheResult<MutexGuard<'_, HashMap<K, ThreadId>>> {
        self.locks.lock().map_err(|_| CacheError::poisoned(cache_id))
    }

    fn acquire(&self, cache_id: &str, key: &K) -> CacheResult<()> {
        let me = thread::current().id();
        let started = Instant::now();
        let deadline = self.timeout.map(|timeout| started + timeout);
        let mut locks = self.lock_table(cache_id)?;

        loop {
            match locks.get(key) {
                None => {
                    locks.insert(key.clone(), me);
                    return Ok(());
                }
                Some(owner) if *owner == me => return Ok(()),
                Some(_) => {}
            }

            locks = match deadline {
                None => self
                    .released
                    .wait(locks)
                    .map_err(|_| CacheError::poisoned(cache_id))?,
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        tracing::debug!(cache_id, key = ?key, "Timed out waiting for key lock");
                        return Err(CacheError::LockTimeout {
                            cache_id: cache_id.to_string(),
                            key: format!("{key:?}"),
                            waited: now.duration_since(started),
                        });
                    }
                    self.released
                        .wait_timeout(locks, deadline - now)
                        .map_err(|_| CacheError::poisoned(cache_id))?
                        .0
                }
            };
        }
    }

    /// Release the current thread's lock on `key`. Returns false if it was
    /// not held by this thread.
    fn release(&self, cache_id: &str, key: &K) -> CacheResult<bool> {
        let me = thread::current().id();
        let mut locks = self.lock_table(cache_id)?;
        if locks.get(key) != Some(&me) {
            return Ok(false);
        }
        locks.remove(key);
        drop(locks);
        self.released.notify_all();
        Ok(true)
    }
}

impl<C, K, V> Cache<K, V> for BlockingCache<C, K>
where
    C: Cache<K, V>,
    K: StoreKey,
{
    fn id(&self) -> &str {
        self.delegate.id()
    }

    fn put(&self, key: K, value: CacheValue<V>) -> CacheResult<()> {
        let cache_id = self.delegate.id();
        let stored = self.delegate.put(key.clone(), value);
        self.release(cache_id, &key)?;
        stored
    }

    fn get(&self, key: &K) -> CacheResult<Option<CacheValue<V>>> {
        let cache_id = self.delegate.id();
        self.acquire(cache_id, key)?;
        match self.delegate.get(key) {
            Ok(value) if is_hit(&value) => {
                self.release(cache_id, key)?;
                Ok(value)
            }
            Ok(value) => Ok(value),
            Err(e) => {
                self.release(cache_id, key)?;
                Err(e)
            }
        }
    }

    fn remove(&self, key: &K) -> CacheResult<Option<CacheValue<V>>> {
        let cache_id = self.delegate.id();
        if self.release(cache_id, key)? {
            Ok(None)
        } else {
            Err(CacheError::UnacquiredLock {
                cache_id: cache_id.to_string(),
                key: format!("{key:?}"),
            })
        }
    }

    fn invalidate(&self, key: &K) -> CacheResult<()> {
        let cache_id = self.delegate.id();
        let deleted = self.delegate.invalidate(key);
        self.release(cache_id, key)?;
        deleted
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
