//! Composite cache keys.
//!
//! The query layer builds a key from the statement id, the pagination bounds,
//! the SQL text and every bound parameter. Two keys are equal when every
//! component is equal and in the same order.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// One component of a composite key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyComponent {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Str(String),
    Bytes(Vec<u8>),
}

impl fmt::Display for KeyComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyComponent::Null => f.write_str("null"),
            KeyComponent::Bool(b) => write!(f, "{}", b),
            KeyComponent::Int(i) => write!(f, "{}", i),
            KeyComponent::UInt(u) => write!(f, "{}", u),
            KeyComponent::Str(s) => f.write_str(s),
            KeyComponent::Bytes(b) => write!(f, "0x{}", hex::encode(b)),
        }
    }
}

impl From<&str> for KeyComponent {
    fn from(value: &str) -> Self {
        KeyComponent::Str(value.to_string())
    }
}

impl From<String> for KeyComponent {
    fn from(value: String) -> Self {
        KeyComponent::Str(value)
    }
}

impl From<bool> for KeyComponent {
    fn from(value: bool) -> Self {
        KeyComponent::Bool(value)
    }
}

impl From<i32> for KeyComponent {
    fn from(value: i32) -> Self {
        KeyComponent::Int(i64::from(value))
    }
}

impl From<i64> for KeyComponent {
    fn from(value: i64) -> Self {
        KeyComponent::Int(value)
    }
}

impl From<u32> for KeyComponent {
    fn from(value: u32) -> Self {
        KeyComponent::UInt(u64::from(value))
    }
}

impl From<u64> for KeyComponent {
    fn from(value: u64) -> Self {
        KeyComponent::UInt(value)
    }
}

impl From<usize> for KeyComponent {
    fn from(value: usize) -> Self {
        KeyComponent::UInt(value as u64)
    }
}

impl From<Vec<u8>> for KeyComponent {
    fn from(value: Vec<u8>) -> Self {
        KeyComponent::Bytes(value)
    }
}

impl<T: Into<KeyComponent>> From<Option<T>> for KeyComponent {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(KeyComponent::Null)
    }
}

/// Composite, order-sensitive cache key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    components: Vec<KeyComponent>,
}

impl CacheKey {
    /// Create an empty key.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a key seeded with a statement id and its pagination bounds.
    pub fn for_statement(statement_id: impl Into<String>, offset: u64, limit: u64) -> Self {
        let statement_id: String = statement_id.into();
        let mut key = Self::new();
        key.update(statement_id);
        key.update(offset);
        key.update(limit);
        key
    }

    /// Append one component.
    pub fn update(&mut self, component: impl Into<KeyComponent>) -> &mut Self {
        self.components.push(component.into());
        self
    }

    /// Append every component from an iterator.
    pub fn update_all<I, C>(&mut self, components: I) -> &mut Self
    where
        I: IntoIterator<Item = C>,
        C: Into<KeyComponent>,
    {
        self.components
            .extend(components.into_iter().map(Into::into));
        self
    }

    /// Builder-style variant of [`CacheKey::update`].
    pub fn with(mut self, component: impl Into<KeyComponent>) -> Self {
        self.update(component);
        self
    }

    /// Number of components.
    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    /// The components in insertion order.
    pub fn components(&self) -> &[KeyComponent] {
        &self.components
    }

    /// SHA-256 digest of the components, hex encoded.
    ///
    /// Stable across processes, so it can key entries outside this process.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for component in &self.components {
            match component {
                KeyComponent::Null => hasher.update([0u8]),
                KeyComponent::Bool(b) => {
                    hasher.update([1u8]);
                    hasher.update([u8::from(*b)]);
                }
                KeyComponent::Int(i) => {
                    hasher.update([2u8]);
                    hasher.update(i.to_be_bytes());
                }
                KeyComponent::UInt(u) => {
                    hasher.update([3u8]);
                    hasher.update(u.to_be_bytes());
                }
                KeyComponent::Str(s) => {
                    hasher.update([4u8]);
                    hasher.update((s.len() as u64).to_be_bytes());
                    hasher.update(s.as_bytes());
                }
                KeyComponent::Bytes(b) => {
                    hasher.update([5u8]);
                    hasher.update((b.len() as u64).to_be_bytes());
                    hasher.update(b);
                }
            }
        }
        hex::encode(hasher.finalize())
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.components.len())?;
        for component in &self.components {
            write!(f, ":{}", component)?;
        }
        Ok(())
    }
}
