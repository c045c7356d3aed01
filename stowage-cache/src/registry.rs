//! Namespace to shared-cache lookup.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use stowage_core::{CacheError, CacheResult, ConfigError, StowageResult};

use crate::cache::{Cache, SharedCache};

/// Thread-safe map from namespace id to the cache shared by every session.
///
/// Caches are registered once at configuration time and live for the
/// lifetime of the registry.
pub struct CacheRegistry<K, V> {
    caches: RwLock<HashMap<String, SharedCache<K, V>>>,
}

impl<K, V> Default for CacheRegistry<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> CacheRegistry<K, V> {
    pub fn new() -> Self {
        Self {
            caches: RwLock::new(HashMap::new()),
        }
    }

    // Registration is insert-only, so a poisoned map is still consistent.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, SharedCache<K, V>>> {
        self.caches.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, SharedCache<K, V>>> {
        self.caches.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a cache under its own id.
    pub fn register(&self, cache: SharedCache<K, V>) -> StowageResult<()> {
        let namespace = cache.id().to_string();
        let mut caches = self.write();
        if caches.contains_key(&namespace) {
            return Err(ConfigError::DuplicateNamespace { namespace }.into());
        }
        tracing::debug!(namespace = %namespace, "Registered cache");
        caches.insert(namespace, cache);
        Ok(())
    }

    /// Look up a namespace.
    pub fn get(&self, namespace: &str) -> CacheResult<SharedCache<K, V>> {
        self.read()
            .get(namespace)
            .cloned()
            .ok_or_else(|| CacheError::UnknownNamespace {
                namespace: namespace.to_string(),
            })
    }

    pub fn contains(&self, namespace: &str) -> bool {
        self.read().contains_key(namespace)
    }

    /// Registered namespace ids, sorted.
    pub fn namespaces(&self) -> Vec<String> {
        let mut namespaces: Vec<String> = self.read().keys().cloned().collect();
        namespaces.sort();
        namespaces
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Clear every registered cache, stopping at the first failure.
    pub fn clear_all(&self) -> CacheResult<()> {
        let caches: Vec<SharedCache<K, V>> = self.read().values().cloned().collect();
        for cache in caches {
            cache.clear()?;
        }
        Ok(())
    }
}
