//! Configuration types

use crate::{ConfigError, StowageResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Default number of live keys for bounded eviction policies.
pub const DEFAULT_CACHE_SIZE: usize = 1024;

/// Eviction policy applied directly above the base store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvictionPolicy {
    /// Least recently used key is evicted first.
    #[default]
    Lru,
    /// Oldest inserted key is evicted first.
    Fifo,
    /// Unbounded.
    None,
}

impl EvictionPolicy {
    /// Returns true if the policy bounds the number of live keys.
    pub fn is_bounded(&self) -> bool {
        !matches!(self, EvictionPolicy::None)
    }
}

impl fmt::Display for EvictionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvictionPolicy::Lru => f.write_str("lru"),
            EvictionPolicy::Fifo => f.write_str("fifo"),
            EvictionPolicy::None => f.write_str("none"),
        }
    }
}

/// Per-namespace cache configuration.
///
/// Describes which decorators wrap the base store of one namespace. Every
/// field except `id` has a default, so a namespace can be declared in JSON
/// with only the options it overrides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Namespace id, also the cache id.
    pub id: String,
    /// Eviction policy.
    pub eviction: EvictionPolicy,
    /// Capacity for bounded eviction policies.
    pub size: usize,
    /// Clear the whole cache when this much time has passed since the last clear.
    pub clear_interval: Option<Duration>,
    /// Hand out serialized copies instead of shared values.
    pub read_write: bool,
    /// Lock keys on miss until a value is supplied.
    pub blocking: bool,
    /// How long a blocked reader waits before failing.
    pub blocking_timeout: Option<Duration>,
    /// Track and log the hit ratio.
    pub logging: bool,
    /// Serialize every operation behind one lock.
    pub synchronized: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            id: String::new(),
            eviction: EvictionPolicy::Lru,
            size: DEFAULT_CACHE_SIZE,
            clear_interval: None,
            read_write: true,
            blocking: false,
            blocking_timeout: None,
            logging: true,
            synchronized: true,
        }
    }
}

impl CacheConfig {
    /// Create a config with default values for the given namespace.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Set the eviction policy.
    pub fn with_eviction(mut self, eviction: EvictionPolicy) -> Self {
        self.eviction = eviction;
        self
    }

    /// Set the capacity.
    pub fn with_size(mut self, size: usize) -> Self {
        self.size = size;
        self
    }

    /// Set the periodic clear interval.
    pub fn with_clear_interval(mut self, interval: Duration) -> Self {
        self.clear_interval = Some(interval);
        self
    }

    /// Enable or disable serialized copies.
    pub fn with_read_write(mut self, enabled: bool) -> Self {
        self.read_write = enabled;
        self
    }

    /// Enable or disable per-key blocking on miss.
    pub fn with_blocking(mut self, enabled: bool) -> Self {
        self.blocking = enabled;
        self
    }

    /// Set the blocking timeout. Only valid together with `blocking`.
    pub fn with_blocking_timeout(mut self, timeout: Duration) -> Self {
        self.blocking_timeout = Some(timeout);
        self
    }

    /// Enable or disable hit-ratio logging.
    pub fn with_logging(mut self, enabled: bool) -> Self {
        self.logging = enabled;
        self
    }

    /// Enable or disable per-call synchronization.
    pub fn with_synchronized(mut self, enabled: bool) -> Self {
        self.synchronized = enabled;
        self
    }

    /// Parse a config from JSON and validate it.
    pub fn from_json(json: &str) -> StowageResult<Self> {
        let config: CacheConfig =
            serde_json::from_str(json).map_err(|e| ConfigError::InvalidValue {
                field: "config".to_string(),
                value: truncate(json, 64),
                reason: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// Validates:
    /// - id is not blank
    /// - size > 0 when the eviction policy is bounded
    /// - clear_interval and blocking_timeout are non-zero
    /// - blocking_timeout is only set when blocking is enabled
    pub fn validate(&self) -> StowageResult<()> {
        if self.id.trim().is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "id".to_string(),
            }
            .into());
        }

        if self.eviction.is_bounded() && self.size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "size".to_string(),
                value: self.size.to_string(),
                reason: format!("must be positive for {} eviction", self.eviction),
            }
            .into());
        }

        if let Some(interval) = self.clear_interval {
            if interval.is_zero() {
                return Err(ConfigError::InvalidValue {
                    field: "clear_interval".to_string(),
                    value: format!("{:?}", interval),
                    reason: "must be positive".to_string(),
                }
                .into());
            }
        }

        if let Some(timeout) = self.blocking_timeout {
            if !self.blocking {
                return Err(ConfigError::IncompatibleOptions {
                    option_a: "blocking_timeout".to_string(),
                    option_b: "blocking = false".to_string(),
                }
                .into());
            }
            if timeout.is_zero() {
                return Err(ConfigError::InvalidValue {
                    field: "blocking_timeout".to_string(),
                    value: format!("{:?}", timeout),
                    reason: "must be positive".to_string(),
                }
                .into());
            }
        }

        Ok(())
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}
