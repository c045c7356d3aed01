//! Assembles the standard decorator chain from a [`CacheConfig`].

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use stowage_core::{CacheConfig, EvictionPolicy, StowageResult};

use crate::cache::{
    BlockingCache, Cache, FifoCache, LoggingCache, LruCache, PerpetualCache, ScheduledCache,
    SerializedCache, SharedCache, StoreKey, StoreValue, SynchronizedCache,
};
use crate::registry::CacheRegistry;

/// Builds one namespace cache.
///
/// Layers are applied innermost first: base store, eviction, scheduled
/// clear, serialization, logging, synchronization, blocking. Disabled layers
/// are skipped.
#[derive(Debug, Clone)]
pub struct CacheBuilder {
    config: CacheConfig,
}

impl CacheBuilder {
    pub fn new(config: CacheConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Names of the layers the chain will contain, outermost first.
    pub fn layers(&self) -> Vec<&'static str> {
        let config = &self.config;
        let mut layers = Vec::new();
        if config.blocking {
            layers.push("blocking");
        }
        if config.synchronized {
            layers.push("synchronized");
        }
        if config.logging {
            layers.push("logging");
        }
        if config.read_write {
            layers.push("serialized");
        }
        if config.clear_interval.is_some() {
            layers.push("scheduled");
        }
        match config.eviction {
            EvictionPolicy::Lru => layers.push("lru"),
            EvictionPolicy::Fifo => layers.push("fifo"),
            EvictionPolicy::None => {}
        }
        layers.push("perpetual");
        layers
    }

    /// Validate the config and build the chain.
    pub fn build<K, V>(&self) -> StowageResult<SharedCache<K, V>>
    where
        K: StoreKey,
        V: StoreValue + Serialize + DeserializeOwned,
    {
        self.config.validate()?;

        let mut cache: Box<dyn Cache<K, V>> = if self.config.read_write {
            Box::new(SerializedCache::<_, V>::new(self.base::<K, Vec<u8>>()))
        } else {
            self.base::<K, V>()
        };
        if self.config.logging {
            cache = Box::new(LoggingCache::new(cache));
        }
        if self.config.synchronized {
            cache = Box::new(SynchronizedCache::new(cache));
        }
        if self.config.blocking {
            cache = Box::new(BlockingCache::<_, K>::new(
                cache,
                self.config.blocking_timeout,
            ));
        }

        tracing::debug!(
            cache_id = %self.config.id,
            layers = ?self.layers(),
            "Built cache"
        );
        Ok(Arc::from(cache))
    }

    /// Build the chain and register it under its id.
    pub fn register_into<K, V>(&self, registry: &CacheRegistry<K, V>) -> StowageResult<SharedCache<K, V>>
    where
        K: StoreKey,
        V: StoreValue + Serialize + DeserializeOwned,
    {
        let cache = self.build::<K, V>()?;
        registry.register(Arc::clone(&cache))?;
        Ok(cache)
    }

    fn base<K: StoreKey, V: StoreValue>(&self) -> Box<dyn Cache<K, V>> {
        let store = PerpetualCache::<K, V>::new(self.config.id.clone());
        let mut cache: Box<dyn Cache<K, V>> = match self.config.eviction {
            EvictionPolicy::Lru => Box::new(LruCache::<_, K>::new(store, self.config.size)),
            EvictionPolicy::Fifo => Box::new(FifoCache::<_, K>::new(store, self.config.size)),
            EvictionPolicy::None => Box::new(store),
        };
        if let Some(interval) = self.config.clear_interval {
            cache = Box::new(ScheduledCache::new(cache, interval));
        }
        cache
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use stowage_core::{CacheError, CacheValue, ConfigError, StowageError};

    #[test]
    fn test_default_layers() {
        let builder = CacheBuilder::new(CacheConfig::new("users"));
        assert_eq!(
            builder.layers(),
            vec!["synchronized", "logging", "serialized", "lru", "perpetual"]
        );
    }

    #[test]
    fn test_full_layers() {
        let config = CacheConfig::new("users")
            .with_eviction(EvictionPolicy::Fifo)
            .with_clear_interval(Duration::from_secs(60))
            .with_blocking(true);
        assert_eq!(
            CacheBuilder::new(config).layers(),
            vec![
                "blocking",
                "synchronized",
                "logging",
                "serialized",
                "scheduled",
                "fifo",
                "perpetual"
            ]
        );
    }

    #[test]
    fn test_built_chain_evicts() {
        let cache = CacheBuilder::new(CacheConfig::new("users").with_size(2))
            .build::<String, i64>()
            .unwrap();
        cache.put("a".to_string(), CacheValue::Value(1)).unwrap();
        cache.put("b".to_string(), CacheValue::Value(2)).unwrap();
        cache.get(&"a".to_string()).unwrap();
        cache.put("c".to_string(), CacheValue::Value(3)).unwrap();

        assert_eq!(cache.id(), "users");
        assert_eq!(cache.size().unwrap(), 2);
        assert_eq!(cache.get(&"b".to_string()).unwrap(), None);
        assert!(cache.read_write_lock().is_some());
    }

    #[test]
    fn test_plain_chain() {
        let config = CacheConfig::new("plain")
            .with_eviction(EvictionPolicy::None)
            .with_read_write(false)
            .with_logging(false)
            .with_synchronized(false);
        let builder = CacheBuilder::new(config);
        assert_eq!(builder.layers(), vec!["perpetual"]);

        let cache = builder.build::<u32, String>().unwrap();
        cache.put(1, CacheValue::Null).unwrap();
        assert_eq!(cache.get(&1).unwrap(), Some(CacheValue::Null));
        assert!(cache.read_write_lock().is_none());
    }

    #[test]
    fn test_blocking_chain_releases_on_remove() {
        let config = CacheConfig::new("blocking")
            .with_blocking(true)
            .with_blocking_timeout(Duration::from_millis(50));
        let cache = CacheBuilder::new(config).build::<u32, u32>().unwrap();

        assert!(matches!(
            cache.remove(&7),
            Err(CacheError::UnacquiredLock { .. })
        ));
        assert_eq!(cache.get(&7).unwrap(), None);
        assert_eq!(cache.remove(&7).unwrap(), None);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let result = CacheBuilder::new(CacheConfig::new("users").with_size(0)).build::<u32, u32>();
        assert!(matches!(
            result,
            Err(StowageError::Config(ConfigError::InvalidValue { .. }))
        ));
    }

    #[test]
    fn test_register_into() {
        let registry = CacheRegistry::<String, i64>::new();
        let builder = CacheBuilder::new(CacheConfig::new("users"));
        let cache = builder.register_into(&registry).unwrap();

        assert_eq!(registry.get("users").unwrap().id(), cache.id());
        assert!(matches!(
            builder.register_into(&registry),
            Err(StowageError::Config(ConfigError::DuplicateNamespace { .. }))
        ));
    }
}
