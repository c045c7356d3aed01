//! Stored cache values.
//!
//! A cache slot holds either a real value or an explicit null marker. The
//! null marker records that a key was looked up and produced nothing, which
//! keeps "previously missed" distinct from "never queried" (a `get` that
//! returns `None`).

use serde::{Deserialize, Serialize};

/// Value stored against a key in a cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CacheValue<V> {
    /// A cached result.
    Value(V),
    /// A recorded miss.
    Null,
}

impl<V> CacheValue<V> {
    /// Returns true if this slot holds a real value.
    pub fn is_value(&self) -> bool {
        matches!(self, CacheValue::Value(_))
    }

    /// Returns true if this slot is the null marker.
    pub fn is_null(&self) -> bool {
        matches!(self, CacheValue::Null)
    }

    /// Borrow the inner value, if any.
    pub fn as_value(&self) -> Option<&V> {
        match self {
            CacheValue::Value(v) => Some(v),
            CacheValue::Null => None,
        }
    }

    /// Consume the slot and return the inner value, if any.
    pub fn into_value(self) -> Option<V> {
        match self {
            CacheValue::Value(v) => Some(v),
            CacheValue::Null => None,
        }
    }

    /// Map the inner value, keeping the null marker as is.
    pub fn map<U, F: FnOnce(V) -> U>(self, f: F) -> CacheValue<U> {
        match self {
            CacheValue::Value(v) => CacheValue::Value(f(v)),
            CacheValue::Null => CacheValue::Null,
        }
    }

    /// Fallible map over the inner value.
    pub fn try_map<U, E, F>(self, f: F) -> Result<CacheValue<U>, E>
    where
        F: FnOnce(V) -> Result<U, E>,
    {
        match self {
            CacheValue::Value(v) => f(v).map(CacheValue::Value),
            CacheValue::Null => Ok(CacheValue::Null),
        }
    }
}

impl<V> From<Option<V>> for CacheValue<V> {
    fn from(value: Option<V>) -> Self {
        match value {
            Some(v) => CacheValue::Value(v),
            None => CacheValue::Null,
        }
    }
}

/// Returns true if a lookup result carries a real value.
///
/// Both `None` (never stored) and `Some(CacheValue::Null)` (recorded miss)
/// count as a miss.
pub fn is_hit<V>(lookup: &Option<CacheValue<V>>) -> bool {
    matches!(lookup, Some(CacheValue::Value(_)))
}
