//! Defensive copies through serialization.
//!
//! The delegate only ever sees byte payloads. Every read deserializes a fresh
//! value, so callers can mutate what they get back without affecting the
//! store or each other.

use std::marker::PhantomData;
use std::sync::RwLock;

use serde::de::DeserializeOwned;
use serde::Serialize;
use stowage_core::{CacheError, CacheResult, CacheValue};

use super::traits::Cache;

/// Exposes a `Cache<K, Vec<u8>>` as a `Cache<K, V>` by serializing values.
pub struct SerializedCache<C, V> {
    delegate: C,
    _value: PhantomData<fn() -> V>,
}

impl<C, V> SerializedCache<C, V> {
    /// Wrap a byte-valued delegate.
    pub fn new(delegate: C) -> Self {
        Self {
            delegate,
            _value: PhantomData,
        }
    }

    /// Borrow the wrapped cache.
    pub fn delegate(&self) -> &C {
        &self.delegate
    }
}

fn encode<V: Serialize>(cache_id: &str, value: CacheValue<V>) -> CacheResult<CacheValue<Vec<u8>>> {
    value.try_map(|v| serde_json::to_vec(&v).map_err(|e| CacheError::serialization(cache_id, e)))
}

fn decode<V: DeserializeOwned>(
    cache_id: &str,
    bytes: Option<CacheValue<Vec<u8>>>,
) -> CacheResult<Option<CacheValue<V>>> {
    bytes
        .map(|slot| {
            slot.try_map(|b| {
                serde_json::from_slice(&b).map_err(|e| CacheError::serialization(cache_id, e))
            })
        })
        .transpose()
}

impl<C, K, V> Cache<K, V> for SerializedCache<C, V>
where
    C: Cache<K, Vec<u8>>,
    V: Serialize + DeserializeOwned,
{
    fn id(&self) -> &str {
        self.delegate.id()
    }

    fn put(&self, key: K, value: CacheValue<V>) -> CacheResult<()> {
        let encoded = encode(self.delegate.id(), value)?;
        self.delegate.put(key, encoded)
    }

    fn get(&self, key: &K) -> CacheResult<Option<CacheValue<V>>> {
        let bytes = self.delegate.get(key)?;
        decode(self.delegate.id(), bytes)
    }

    fn remove(&self, key: &K) -> CacheResult<Option<CacheValue<V>>> {
        let bytes = self.delegate.remove(key)?;
        decode(self.delegate.id(), bytes)
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::PerpetualCache;
    use serde::{Deserialize, Serializer};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Row {
        id: i64,
        tags: Vec<String>,
    }

    /// Refuses to serialize.
    #[derive(Debug, Clone, Deserialize)]
    struct Opaque;

    impl Serialize for Opaque {
        fn serialize<S: Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
            Err(serde::ser::Error::custom("opaque handles cannot be serialized"))
        }
    }

    fn serialized<V>() -> SerializedCache<PerpetualCache<&'static str, Vec<u8>>, V> {
        SerializedCache::new(PerpetualCache::new("rows"))
    }

    #[test]
    fn test_each_get_is_an_independent_copy() {
        let cache = serialized::<Row>();
        let row = Row {
            id: 1,
            tags: vec!["a".to_string()],
        };
        cache.put("r1", CacheValue::Value(row.clone())).unwrap();

        let mut first = cache.get(&"r1").unwrap().and_then(CacheValue::into_value).unwrap();
        first.tags.push("mutated".to_string());

        let second = cache.get(&"r1").unwrap().and_then(CacheValue::into_value).unwrap();
        assert_eq!(second, row);
        assert_ne!(first, second);
    }

    #[test]
    fn test_delegate_holds_bytes() {
        let cache = serialized::<Row>();
        cache
            .put("r1", CacheValue::Value(Row { id: 7, tags: vec![] }))
            .unwrap();
        let raw = cache.delegate().get(&"r1").unwrap();
        assert!(matches!(raw, Some(CacheValue::Value(ref b)) if !b.is_empty()));
    }

    #[test]
    fn test_null_passes_through_unserialized() {
        let cache = serialized::<Opaque>();
        cache.put("missing", CacheValue::Null).unwrap();

        assert_eq!(cache.delegate().get(&"missing").unwrap(), Some(CacheValue::Null));
        assert!(matches!(cache.get(&"missing").unwrap(), Some(CacheValue::Null)));
    }

    #[test]
    fn test_unserializable_value_fails() {
        let cache = serialized::<Opaque>();
        let result = cache.put("x", CacheValue::Value(Opaque));
        assert!(matches!(result, Err(CacheError::Serialization { .. })));
        assert_eq!(cache.size().unwrap(), 0);
    }

    #[test]
    fn test_corrupt_bytes_fail_on_read() {
        let cache = serialized::<Row>();
        cache
            .delegate()
            .put("bad", CacheValue::Value(b"not json".to_vec()))
            .unwrap();
        let result = cache.get(&"bad");
        assert!(matches!(result, Err(CacheError::Serialization { .. })));
    }

    #[test]
    fn test_remove_returns_decoded_value() {
        let cache = serialized::<i64>();
        cache.put("n", CacheValue::Value(42)).unwrap();
        assert_eq!(cache.remove(&"n").unwrap(), Some(CacheValue::Value(42)));
        assert_eq!(cache.get(&"n").unwrap(), None);
    }
}
