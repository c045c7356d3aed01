//! Per-unit-of-work routing across namespaces.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::sync::Arc;

use stowage_core::{CacheResult, CacheValue};

use crate::cache::{Cache, StoreKey, StoreValue};
use crate::registry::CacheRegistry;
use crate::transactional::{CommitSummary, RollbackReport, TransactionalCache};

/// Owns one [`TransactionalCache`] per namespace touched by a unit-of-work.
///
/// Buffers are opened lazily on first use. A manager dropped with open
/// buffers rolls them back, so no missed key is left locked.
pub struct TransactionalCacheManager<K: StoreKey, V: StoreValue> {
    registry: Arc<CacheRegistry<K, V>>,
    caches: BTreeMap<String, TransactionalCache<K, V>>,
}

impl<K: StoreKey, V: StoreValue> TransactionalCacheManager<K, V> {
    pub fn new(registry: Arc<CacheRegistry<K, V>>) -> Self {
        Self {
            registry,
            caches: BTreeMap::new(),
        }
    }

    fn transactional_cache(&mut self, namespace: &str) -> CacheResult<&TransactionalCache<K, V>> {
        match self.caches.entry(namespace.to_string()) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let shared = self.registry.get(namespace)?;
                tracing::trace!(namespace, "Opening transactional cache");
                Ok(entry.insert(TransactionalCache::new(shared)))
            }
        }
    }

    /// Read through the namespace's transactional buffer.
    pub fn get(&mut self, namespace: &str, key: &K) -> CacheResult<Option<CacheValue<V>>> {
        self.transactional_cache(namespace)?.get(key)
    }

    /// Buffer a write for the namespace.
    pub fn put(&mut self, namespace: &str, key: K, value: CacheValue<V>) -> CacheResult<()> {
        self.transactional_cache(namespace)?.put(key, value)
    }

    /// Schedule a clear of the namespace for commit.
    pub fn clear(&mut self, namespace: &str) -> CacheResult<()> {
        self.transactional_cache(namespace)?.clear()
    }

    /// Namespaces with an open buffer, sorted.
    pub fn active_namespaces(&self) -> Vec<&str> {
        self.caches.keys().map(String::as_str).collect()
    }

    /// Commit every open buffer in namespace order.
    ///
    /// On the first failure the buffers not yet committed are rolled back and
    /// the error is returned. Buffers already committed stay committed.
    pub fn commit_all(&mut self) -> CacheResult<Vec<CommitSummary>> {
        let caches = std::mem::take(&mut self.caches);
        let mut remaining = caches.into_iter();
        let mut summaries = Vec::new();

        while let Some((namespace, cache)) = remaining.next() {
            match cache.commit() {
                Ok(summary) => summaries.push(summary),
                Err(error) => {
                    tracing::warn!(
                        namespace = %namespace,
                        error = %error,
                        "Commit failed, rolling back remaining namespaces"
                    );
                    let report = rollback_each(remaining.by_ref().map(|(_, cache)| cache));
                    if !report.is_clean() {
                        tracing::warn!(
                            failures = report.failures.len(),
                            "Rollback after failed commit left keys locked"
                        );
                    }
                    return Err(error);
                }
            }
        }
        Ok(summaries)
    }

    /// Roll back every open buffer and merge the reports.
    pub fn rollback_all(&mut self) -> RollbackReport {
        let caches = std::mem::take(&mut self.caches);
        rollback_each(caches.into_values())
    }
}

fn rollback_each<K, V, I>(caches: I) -> RollbackReport
where
    K: StoreKey,
    V: StoreValue,
    I: Iterator<Item = TransactionalCache<K, V>>,
{
    caches.fold(RollbackReport::default(), |mut merged, cache| {
        merged.merge(cache.rollback());
        merged
    })
}

impl<K: StoreKey, V: StoreValue> Drop for TransactionalCacheManager<K, V> {
    fn drop(&mut self) {
        if self.caches.is_empty() {
            return;
        }
        let report = self.rollback_all();
        tracing::debug!(
            attempted = report.attempted,
            failures = report.failures.len(),
            "Rolled back open transactional caches on drop"
        );
    }
}
