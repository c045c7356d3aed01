//! In-memory base store.

use std::collections::HashMap;
use std::fmt;
use std::sync::RwLock;

use stowage_core::{CacheError, CacheResult, CacheValue};

use super::traits::{Cache, StoreKey, StoreValue};

/// Hash-map backed cache with no eviction or expiry.
///
/// Every decorator chain bottoms out in one of these.
pub struct PerpetualCache<K, V> {
    id: String,
    store: RwLock<HashMap<K, CacheValue<V>>>,
}

impl<K, V> PerpetualCache<K, V> {
    /// Create an empty store for the given namespace.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            store: RwLock::new(HashMap::new()),
        }
    }

    fn poisoned(&self) -> CacheError {
        CacheError::poisoned(&self.id)
    }
}

impl<K, V> fmt::Debug for PerpetualCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PerpetualCache")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

/// Two stores are the same cache iff they serve the same namespace.
impl<K, V> PartialEq for PerpetualCache<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<K, V> Eq for PerpetualCache<K, V> {}

impl<K, V> Cache<K, V> for PerpetualCache<K, V>
where
    K: StoreKey,
    V: StoreValue,
{
    fn id(&self) -> &str {
        &self.id
    }

    fn put(&self, key: K, value: CacheValue<V>) -> CacheResult<()> {
        let mut store = self.store.write().map_err(|_| self.poisoned())?;
        store.insert(key, value);
        Ok(())
    }

    fn get(&self, key: &K) -> CacheResult<Option<CacheValue<V>>> {
        let store = self.store.read().map_err(|_| self.poisoned())?;
        Ok(store.get(key).cloned())
    }

    fn remove(&self, key: &K) -> CacheResult<Option<CacheValue<V>>> {
        let mut store = self.store.write().map_err(|_| self.poisoned())?;
        Ok(store.remove(key))
    }

    fn clear(&self) -> CacheResult<()> {
        let mut store = self.store.write().map_err(|_| self.poisoned())?;
        store.clear();
        Ok(())
    }

    fn size(&self) -> CacheResult<usize> {
        let store = self.store.read().map_err(|_| self.poisoned())?;
        Ok(store.len())
    }
}
