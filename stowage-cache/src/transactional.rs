//! Session-scoped transactional buffer over a shared namespace cache.
//!
//! A [`TransactionalCache`] sits between one unit-of-work and the cache shared
//! by every session. Reads go straight to the shared cache; writes are held
//! back until [`TransactionalCache::commit`], so other sessions never observe
//! state from a unit-of-work that may still roll back.
//!
//! Keys that missed during the unit-of-work are tracked as well. On commit
//! they are stored as [`CacheValue::Null`]; on rollback they are removed. Both
//! paths hand each missed key back to the delegate, which is what releases
//! the per-key lock a [`BlockingCache`](crate::cache::BlockingCache) takes on
//! a miss.

use std::collections::{HashMap, HashSet};
use std::mem;
use std::sync::{Mutex, MutexGuard, PoisonError, RwLock};

use serde::Serialize;
use stowage_core::{is_hit, CacheError, CacheResult, CacheValue};

use crate::cache::{Cache, SharedCache, StoreKey, StoreValue};

struct TxState<K, V> {
    clear_on_commit: bool,
    pending_writes: HashMap<K, CacheValue<V>>,
    missed_keys: HashSet<K>,
}

impl<K, V> Default for TxState<K, V> {
    fn default() -> Self {
        Self {
            clear_on_commit: false,
            pending_writes: HashMap::new(),
            missed_keys: HashSet::new(),
        }
    }
}

/// Outcome of a successful commit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CommitSummary {
    pub cache_id: String,
    /// Whether the shared cache was cleared before flushing.
    pub cleared: bool,
    /// Pending writes stored in the shared cache.
    pub entries_flushed: usize,
    /// Missed keys stored as null.
    pub misses_recorded: usize,
}

/// A delegate `remove` that failed while releasing a missed key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnlockFailure {
    pub cache_id: String,
    pub key: String,
    pub error: CacheError,
}

/// Result of a rollback. Rollback never fails; failed unlocks are reported
/// here instead.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RollbackReport {
    /// Number of keys a `remove` was attempted for.
    pub attempted: usize,
    pub failures: Vec<UnlockFailure>,
}

impl RollbackReport {
    /// True if every unlock succeeded.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Fold another report into this one.
    pub fn merge(&mut self, other: RollbackReport) {
        self.attempted += other.attempted;
        self.failures.extend(other.failures);
    }
}

/// Buffers one unit-of-work's writes and misses for a single namespace.
pub struct TransactionalCache<K, V> {
    delegate: SharedCache<K, V>,
    state: Mutex<TxState<K, V>>,
}

impl<K, V> TransactionalCache<K, V>
where
    K: StoreKey,
    V: StoreValue,
{
    /// Open a buffer over a shared cache.
    pub fn new(delegate: SharedCache<K, V>) -> Self {
        Self {
            delegate,
            state: Mutex::new(TxState::default()),
        }
    }

    /// The shared cache this buffer flushes into.
    pub fn delegate(&self) -> &SharedCache<K, V> {
        &self.delegate
    }

    pub fn pending_count(&self) -> usize {
        self.lock_recovered().pending_writes.len()
    }

    pub fn missed_count(&self) -> usize {
        self.lock_recovered().missed_keys.len()
    }

    pub fn is_clear_pending(&self) -> bool {
        self.lock_recovered().clear_on_commit
    }

    fn lock_state(&self) -> CacheResult<MutexGuard<'_, TxState<K, V>>> {
        self.state
            .lock()
            .map_err(|_| CacheError::poisoned(self.delegate.id()))
    }

    fn lock_recovered(&self) -> MutexGuard<'_, TxState<K, V>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Flush buffered state into the shared cache and reset.
    ///
    /// Steps run in order: clear the shared cache if [`Cache::clear`] was
    /// called, store every pending write, then store `Null` for every missed
    /// key that was not also written. If any step fails, every key already
    /// flushed and every missed key is removed again, the buffer is reset,
    /// and the first error is returned. A clear that already ran cannot be
    /// undone.
    pub fn commit(&self) -> CacheResult<CommitSummary> {
        let TxState {
            clear_on_commit,
            pending_writes,
            missed_keys,
        } = mem::take(&mut *self.lock_state()?);

        let cache_id = self.delegate.id();
        let unwritten: Vec<K> = missed_keys
            .iter()
            .filter(|key| !pending_writes.contains_key(*key))
            .cloned()
            .collect();
        let summary = CommitSummary {
            cache_id: cache_id.to_string(),
            cleared: clear_on_commit,
            entries_flushed: pending_writes.len(),
            misses_recorded: unwritten.len(),
        };

        let mut flushed = Vec::with_capacity(summary.entries_flushed + summary.misses_recorded);
        let outcome = self.flush(clear_on_commit, pending_writes, unwritten, &mut flushed);
        if let Err(error) = outcome {
            tracing::warn!(
                cache_id,
                error = %error,
                flushed = flushed.len(),
                "Commit failed, removing partially flushed entries"
            );
            self.compensate(&flushed, &missed_keys);
            return Err(error);
        }

        tracing::debug!(
            cache_id,
            cleared = summary.cleared,
            entries_flushed = summary.entries_flushed,
            misses_recorded = summary.misses_recorded,
            "Committed transactional cache"
        );
        Ok(summary)
    }

    fn flush(
        &self,
        clear_on_commit: bool,
        pending_writes: HashMap<K, CacheValue<V>>,
        unwritten: Vec<K>,
        flushed: &mut Vec<K>,
    ) -> CacheResult<()> {
        if clear_on_commit {
            self.delegate.clear()?;
        }
        for (key, value) in pending_writes {
            tracing::trace!(cache_id = self.delegate.id(), key = ?key, "Flushing pending write");
            self.delegate.put(key.clone(), value)?;
            flushed.push(key);
        }
        for key in unwritten {
            tracing::trace!(cache_id = self.delegate.id(), key = ?key, "Recording miss");
            self.delegate.put(key.clone(), CacheValue::Null)?;
            flushed.push(key);
        }
        Ok(())
    }

    fn compensate(&self, flushed: &[K], missed_keys: &HashSet<K>) {
        let cache_id = self.delegate.id();
        for key in flushed {
            if let Err(error) = self.delegate.invalidate(key) {
                tracing::warn!(
                    cache_id,
                    key = ?key,
                    error = %error,
                    "Failed to delete entry after failed commit"
                );
            }
        }

        let already: HashSet<&K> = flushed.iter().collect();
        for key in missed_keys.iter().filter(|key| !already.contains(key)) {
            if let Err(error) = self.delegate.remove(key) {
                tracing::warn!(
                    cache_id,
                    key = ?key,
                    error = %error,
                    "Failed to release missed key after failed commit"
                );
            }
        }
    }

    /// Discard buffered writes, release every missed key, and reset.
    ///
    /// Every missed key is visited even when some removals fail.
    pub fn rollback(&self) -> RollbackReport {
        let state = mem::take(&mut *self.lock_recovered());
        let cache_id = self.delegate.id();

        let report = state
            .missed_keys
            .iter()
            .fold(RollbackReport::default(), |mut report, key| {
                report.attempted += 1;
                if let Err(error) = self.delegate.remove(key) {
                    tracing::warn!(
                        cache_id,
                        key = ?key,
                        error = %error,
                        "Failed to release missed key during rollback"
                    );
                    report.failures.push(UnlockFailure {
                        cache_id: cache_id.to_string(),
                        key: format!("{key:?}"),
                        error,
                    });
                }
                report
            });

        tracing::debug!(
            cache_id,
            discarded_writes = state.pending_writes.len(),
            attempted = report.attempted,
            failures = report.failures.len(),
            "Rolled back transactional cache"
        );
        report
    }
}

impl<K, V> Cache<K, V> for TransactionalCache<K, V>
where
    K: StoreKey,
    V: StoreValue,
{
    fn id(&self) -> &str {
        self.delegate.id()
    }

    /// Buffer a write until commit.
    fn put(&self, key: K, value: CacheValue<V>) -> CacheResult<()> {
        self.lock_state()?.pending_writes.insert(key, value);
        Ok(())
    }

    /// Read the shared cache. Buffered writes are not visible here.
    fn get(&self, key: &K) -> CacheResult<Option<CacheValue<V>>> {
        let value = self.delegate.get(key)?;
        let mut state = self.lock_state()?;
        if !is_hit(&value) {
            state.missed_keys.insert(key.clone());
        }
        if state.clear_on_commit {
            return Ok(None);
        }
        Ok(value)
    }

    fn remove(&self, _key: &K) -> CacheResult<Option<CacheValue<V>>> {
        Ok(None)
    }

    /// Schedule a clear of the shared cache for commit and drop pending writes.
    fn clear(&self) -> CacheResult<()> {
        let mut state = self.lock_state()?;
        state.clear_on_commit = true;
        state.pending_writes.clear();
        Ok(())
    }

    fn size(&self) -> CacheResult<usize> {
        self.delegate.size()
    }

    fn read_write_lock(&self) -> Option<&RwLock<()>> {
        self.delegate.read_write_lock()
    }
}


#[cfg(test)]
mod prop_tests {
    use super::*;
    use crate::cache::PerpetualCache;
    use proptest::prelude::*;
    use std::sync::Arc;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_writes_invisible_until_commit(
            seeded in prop::collection::hash_map(0u8..32, any::<i32>(), 0..16),
            writes in prop::collection::hash_map(0u8..32, any::<i32>(), 0..16),
        ) {
            let store: Arc<PerpetualCache<u8, i32>> = Arc::new(PerpetualCache::new("prop"));
            for (key, value) in &seeded {
                store.put(*key, CacheValue::Value(*value)).unwrap();
            }
            let tx = TransactionalCache::new(store.clone() as SharedCache<u8, i32>);

            for (key, value) in &writes {
                tx.put(*key, CacheValue::Value(*value)).unwrap();
                let seen = tx.get(key).unwrap();
                prop_assert_eq!(seen, seeded.get(key).map(|v| CacheValue::Value(*v)));
            }

            tx.commit().unwrap();
            for (key, value) in &writes {
                prop_assert_eq!(store.get(key).unwrap(), Some(CacheValue::Value(*value)));
            }
        }

        #[test]
        fn prop_rollback_leaves_no_misses(
            reads in prop::collection::hash_set(0u8..32, 0..16),
            writes in prop::collection::hash_map(0u8..32, any::<i32>(), 0..16),
        ) {
            let store: Arc<PerpetualCache<u8, i32>> = Arc::new(PerpetualCache::new("prop"));
            let tx = TransactionalCache::new(store.clone() as SharedCache<u8, i32>);
            for key in &reads {
                tx.get(key).unwrap();
            }
            for (key, value) in &writes {
                tx.put(*key, CacheValue::Value(*value)).unwrap();
            }

            let report = tx.rollback();

            prop_assert_eq!(report.attempted, reads.len());
            prop_assert_eq!(store.size().unwrap(), 0);
        }
    }
}
