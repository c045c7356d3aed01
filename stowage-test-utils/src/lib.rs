//! Stowage Test Utilities
//!
//! Centralized test infrastructure for the Stowage workspace:
//! - Proptest generators for keys, values, configs and unit-of-work scripts
//! - Fault-injecting and call-recording caches
//! - Test fixtures for common cache chains and registries
//! - Custom assertions for cache-specific validation

// Re-export core types for convenience
pub use stowage_core::{
    is_hit, CacheConfig, CacheError, CacheKey, CacheOperation, CacheResult, CacheValue,
    ConfigError, EvictionPolicy, KeyComponent, StowageError, StowageResult, DEFAULT_CACHE_SIZE,
};

pub use stowage_cache::{
    Cache, CacheBuilder, CacheRegistry, CommitSummary, PerpetualCache, RollbackReport,
    SharedCache, StoreKey, StoreValue, TransactionalCache, TransactionalCacheManager,
};

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

// ============================================================================
// TRACING
// ============================================================================

/// Install a fmt subscriber filtered by `RUST_LOG` (default `warn`).
///
/// Safe to call from every test; once a global subscriber is set, later calls
/// do nothing.
pub fn init_test_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

// ============================================================================
// MOCK CACHES
// ============================================================================

/// In-memory cache whose operations can be made to fail on demand.
pub struct FailingCache<K, V> {
    inner: PerpetualCache<K, V>,
    failing: Mutex<HashSet<CacheOperation>>,
    puts_before_failure: Mutex<Option<usize>>,
    puts: AtomicUsize,
}

impl<K: StoreKey, V: StoreValue> FailingCache<K, V> {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            inner: PerpetualCache::new(id),
            failing: Mutex::new(HashSet::new()),
            puts_before_failure: Mutex::new(None),
            puts: AtomicUsize::new(0),
        }
    }

    /// Make every call of `operation` fail from now on.
    pub fn fail_on(&self, operation: CacheOperation) -> &Self {
        self.failing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(operation);
        self
    }

    /// Let `count` more puts succeed, then fail every later put.
    pub fn fail_after_puts(&self, count: usize) -> &Self {
        self.puts.store(0, Ordering::SeqCst);
        *self
            .puts_before_failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(count);
        self
    }

    /// Stop injecting failures.
    pub fn heal(&self) {
        self.failing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        *self
            .puts_before_failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// The backing store, bypassing failure injection.
    pub fn inner(&self) -> &PerpetualCache<K, V> {
        &self.inner
    }

    fn check(&self, operation: CacheOperation) -> CacheResult<()> {
        let failing = self
            .failing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&operation);
        if failing {
            return Err(CacheError::delegate(
                self.inner.id(),
                operation,
                "injected failure",
            ));
        }
        Ok(())
    }
}

impl<K: StoreKey, V: StoreValue> Cache<K, V> for FailingCache<K, V> {
    fn id(&self) -> &str {
        self.inner.id()
    }

    fn put(&self, key: K, value: CacheValue<V>) -> CacheResult<()> {
        self.check(CacheOperation::Put)?;
        let limit = *self
            .puts_before_failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(limit) = limit {
            if self.puts.fetch_add(1, Ordering::SeqCst) >= limit {
                return Err(CacheError::delegate(
                    self.inner.id(),
                    CacheOperation::Put,
                    "injected failure after put limit",
                ));
            }
        }
        self.inner.put(key, value)
    }

    fn get(&self, key: &K) -> CacheResult<Option<CacheValue<V>>> {
        self.check(CacheOperation::Get)?;
        self.inner.get(key)
    }

    fn remove(&self, key: &K) -> CacheResult<Option<CacheValue<V>>> {
        self.check(CacheOperation::Remove)?;
        self.inner.remove(key)
    }

    fn clear(&self) -> CacheResult<()> {
        self.check(CacheOperation::Clear)?;
        self.inner.clear()
    }

    fn size(&self) -> CacheResult<usize> {
        self.check(CacheOperation::Size)?;
        self.inner.size()
    }
}

/// One call observed by a [`RecordingCache`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedCall<K> {
    Put(K),
    Get(K),
    Remove(K),
    Clear,
    Size,
}

impl<K> RecordedCall<K> {
    pub fn operation(&self) -> CacheOperation {
        match self {
            RecordedCall::Put(_) => CacheOperation::Put,
            RecordedCall::Get(_) => CacheOperation::Get,
            RecordedCall::Remove(_) => CacheOperation::Remove,
            RecordedCall::Clear => CacheOperation::Clear,
            RecordedCall::Size => CacheOperation::Size,
        }
    }
}

/// Forwards to a delegate and records every call in order.
pub struct RecordingCache<C, K> {
    delegate: C,
    calls: Mutex<Vec<RecordedCall<K>>>,
}

impl<C, K: StoreKey> RecordingCache<C, K> {
    pub fn new(delegate: C) -> Self {
        Self {
            delegate,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn delegate(&self) -> &C {
        &self.delegate
    }

    /// Snapshot of the recorded calls.
    pub fn calls(&self) -> Vec<RecordedCall<K>> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of recorded calls of one operation.
    pub fn count(&self, operation: CacheOperation) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|call| call.operation() == operation)
            .count()
    }

    pub fn reset(&self) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn record(&self, call: RecordedCall<K>) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
    }
}

impl<C, K, V> Cache<K, V> for RecordingCache<C, K>
where
    C: Cache<K, V>,
    K: StoreKey,
{
    fn id(&self) -> &str {
        self.delegate.id()
    }

    fn put(&self, key: K, value: CacheValue<V>) -> CacheResult<()> {
        self.record(RecordedCall::Put(key.clone()));
        self.delegate.put(key, value)
    }

    fn get(&self, key: &K) -> CacheResult<Option<CacheValue<V>>> {
        self.record(RecordedCall::Get(key.clone()));
        self.delegate.get(key)
    }

    fn remove(&self, key: &K) -> CacheResult<Option<CacheValue<V>>> {
        self.record(RecordedCall::Remove(key.clone()));
        self.delegate.remove(key)
    }

    fn invalidate(&self, key: &K) -> CacheResult<()> {
        self.record(RecordedCall::Remove(key.clone()));
        self.delegate.invalidate(key)
    }

    fn clear(&self) -> CacheResult<()> {
        self.record(RecordedCall::Clear);
        self.delegate.clear()
    }

    fn size(&self) -> CacheResult<usize> {
        self.record(RecordedCall::Size);
        self.delegate.size()
    }

    fn read_write_lock(&self) -> Option<&std::sync::RwLock<()>> {
        self.delegate.read_write_lock()
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for generating cache keys, values and scripts.

    use super::*;
    use proptest::prelude::*;

    /// One step of a unit-of-work against a single namespace.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum TxOp {
        Get(u8),
        Put(u8, i64),
        Clear,
    }

    /// Generate a key component of any kind.
    pub fn arb_key_component() -> impl Strategy<Value = KeyComponent> {
        prop_oneof![
            Just(KeyComponent::Null),
            any::<bool>().prop_map(KeyComponent::Bool),
            any::<i64>().prop_map(KeyComponent::Int),
            any::<u64>().prop_map(KeyComponent::UInt),
            "[a-z_.]{0,16}".prop_map(KeyComponent::Str),
            prop::collection::vec(any::<u8>(), 0..8).prop_map(KeyComponent::Bytes),
        ]
    }

    /// Generate a statement key with pagination bounds and parameters.
    pub fn arb_cache_key() -> impl Strategy<Value = CacheKey> {
        (
            "[a-z]{1,8}\\.[a-z]{1,12}",
            0u64..1000,
            1u64..500,
            prop::collection::vec(arb_key_component(), 0..6),
        )
            .prop_map(|(statement, offset, limit, params)| {
                let mut key = CacheKey::for_statement(statement, offset, limit);
                key.update_all(params);
                key
            })
    }

    /// Generate either a value from `inner` or a recorded null.
    pub fn arb_cache_value<S>(inner: S) -> impl Strategy<Value = CacheValue<S::Value>>
    where
        S: Strategy,
        S::Value: Clone + std::fmt::Debug,
    {
        prop_oneof![
            1 => Just(CacheValue::Null),
            4 => inner.prop_map(CacheValue::Value),
        ]
    }

    /// Generate an eviction policy.
    pub fn arb_eviction_policy() -> impl Strategy<Value = EvictionPolicy> {
        prop_oneof![
            Just(EvictionPolicy::Lru),
            Just(EvictionPolicy::Fifo),
            Just(EvictionPolicy::None),
        ]
    }

    /// Generate a CacheConfig that passes validation.
    pub fn arb_valid_config() -> impl Strategy<Value = CacheConfig> {
        (
            "[a-z]{1,12}",
            arb_eviction_policy(),
            1usize..4096,
            prop::option::of(1u64..3600),
            any::<bool>(),
            any::<bool>(),
            prop::option::of(1u64..5000),
            any::<bool>(),
            any::<bool>(),
        )
            .prop_map(
                |(
                    id,
                    eviction,
                    size,
                    clear_secs,
                    read_write,
                    blocking,
                    timeout_ms,
                    logging,
                    synchronized,
                )| CacheConfig {
                    id,
                    eviction,
                    size,
                    clear_interval: clear_secs.map(Duration::from_secs),
                    read_write,
                    blocking,
                    blocking_timeout: if blocking {
                        timeout_ms.map(Duration::from_millis)
                    } else {
                        None
                    },
                    logging,
                    synchronized,
                },
            )
    }

    /// Generate one unit-of-work step over a small key space.
    pub fn arb_tx_op() -> impl Strategy<Value = TxOp> {
        prop_oneof![
            4 => (0u8..16).prop_map(TxOp::Get),
            4 => (0u8..16, any::<i64>()).prop_map(|(k, v)| TxOp::Put(k, v)),
            1 => Just(TxOp::Clear),
        ]
    }

    /// Generate a unit-of-work script.
    pub fn arb_tx_script(max_len: usize) -> impl Strategy<Value = Vec<TxOp>> {
        prop::collection::vec(arb_tx_op(), 0..max_len)
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built caches and registries for common testing scenarios.

    use super::*;

    /// Config for a plain, unbounded namespace with no optional layers.
    pub fn plain_config(id: &str) -> CacheConfig {
        CacheConfig::new(id)
            .with_eviction(EvictionPolicy::None)
            .with_read_write(false)
            .with_logging(false)
            .with_synchronized(false)
    }

    /// Config for the default chain with a small LRU bound.
    pub fn standard_config(id: &str, size: usize) -> CacheConfig {
        CacheConfig::new(id).with_size(size)
    }

    /// Config for a blocking namespace.
    pub fn blocking_config(id: &str, timeout: Duration) -> CacheConfig {
        CacheConfig::new(id)
            .with_eviction(EvictionPolicy::None)
            .with_blocking(true)
            .with_blocking_timeout(timeout)
    }

    /// Build a shared cache from a config.
    #[track_caller]
    pub fn build_cache(config: CacheConfig) -> SharedCache<String, i64> {
        match CacheBuilder::new(config).build() {
            Ok(cache) => cache,
            Err(e) => panic!("Failed to build fixture cache: {:?}", e),
        }
    }

    /// Registry with one default-chain cache per namespace.
    #[track_caller]
    pub fn registry_with(namespaces: &[&str]) -> Arc<CacheRegistry<String, i64>> {
        let registry: Arc<CacheRegistry<String, i64>> = Arc::new(CacheRegistry::new());
        for namespace in namespaces {
            if let Err(e) = CacheBuilder::new(CacheConfig::new(*namespace)).register_into(&registry) {
                panic!("Failed to register fixture namespace {}: {:?}", namespace, e);
            }
        }
        registry
    }

    /// Registry holding a single cache.
    #[track_caller]
    pub fn registry_of(cache: SharedCache<String, i64>) -> Arc<CacheRegistry<String, i64>> {
        let registry = Arc::new(CacheRegistry::new());
        if let Err(e) = registry.register(cache) {
            panic!("Failed to register fixture cache: {:?}", e);
        }
        registry
    }

    /// Open a unit-of-work over a registry.
    pub fn session(
        registry: &Arc<CacheRegistry<String, i64>>,
    ) -> TransactionalCacheManager<String, i64> {
        TransactionalCacheManager::new(Arc::clone(registry))
    }

    /// String key helper.
    pub fn key(name: &str) -> String {
        name.to_string()
    }
}

// ============================================================================
// ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Custom assertion functions for cache-specific validation.

    use super::*;
    use std::fmt::Debug;

    /// Assert that a cache holds `expected` for `key`.
    #[track_caller]
    pub fn assert_value<K, V, C>(cache: &C, key: &K, expected: V)
    where
        C: Cache<K, V> + ?Sized,
        K: Debug,
        V: Debug + PartialEq,
    {
        match cache.get(key) {
            Ok(Some(CacheValue::Value(v))) => {
                assert_eq!(v, expected, "Wrong value for key {:?}", key)
            }
            other => panic!("Expected value {:?} for key {:?}, got: {:?}", expected, key, other),
        }
    }

    /// Assert that a cache holds a recorded null for `key`.
    #[track_caller]
    pub fn assert_null_entry<K, V, C>(cache: &C, key: &K)
    where
        C: Cache<K, V> + ?Sized,
        K: Debug,
        V: Debug,
    {
        match cache.get(key) {
            Ok(Some(CacheValue::Null)) => {}
            other => panic!("Expected null entry for key {:?}, got: {:?}", key, other),
        }
    }

    /// Assert that a cache has no entry for `key`.
    #[track_caller]
    pub fn assert_absent<K, V, C>(cache: &C, key: &K)
    where
        C: Cache<K, V> + ?Sized,
        K: Debug,
        V: Debug,
    {
        match cache.get(key) {
            Ok(None) => {}
            other => panic!("Expected no entry for key {:?}, got: {:?}", key, other),
        }
    }

    /// Assert the number of stored entries.
    #[track_caller]
    pub fn assert_size<K, V, C>(cache: &C, expected: usize)
    where
        C: Cache<K, V> + ?Sized,
    {
        match cache.size() {
            Ok(size) => assert_eq!(size, expected, "Wrong size for cache {}", cache.id()),
            Err(e) => panic!("Size failed for cache {}: {:?}", cache.id(), e),
        }
    }

    /// Assert that a rollback released every key.
    #[track_caller]
    pub fn assert_clean_rollback(report: &RollbackReport) {
        assert!(
            report.is_clean(),
            "Rollback left {} of {} keys unreleased: {:?}",
            report.failures.len(),
            report.attempted,
            report.failures
        );
    }

    /// Assert that a CacheResult is an UnknownNamespace error.
    #[track_caller]
    pub fn assert_unknown_namespace<T: Debug>(result: &CacheResult<T>, namespace: &str) {
        match result {
            Err(CacheError::UnknownNamespace { namespace: ns }) => {
                assert_eq!(ns, namespace, "Wrong namespace in UnknownNamespace error")
            }
            other => panic!("Expected UnknownNamespace({}), got: {:?}", namespace, other),
        }
    }

    /// Assert that a CacheResult is a LockTimeout error.
    #[track_caller]
    pub fn assert_lock_timeout<T: Debug>(result: &CacheResult<T>) {
        match result {
            Err(CacheError::LockTimeout { .. }) => {}
            other => panic!("Expected LockTimeout error, got: {:?}", other),
        }
    }

    /// Assert that a CacheResult is an UnacquiredLock error.
    #[track_caller]
    pub fn assert_unacquired_lock<T: Debug>(result: &CacheResult<T>) {
        match result {
            Err(CacheError::UnacquiredLock { .. }) => {}
            other => panic!("Expected UnacquiredLock error, got: {:?}", other),
        }
    }

    /// Assert that a CacheResult is a delegate failure of `operation`.
    #[track_caller]
    pub fn assert_delegate_error<T: Debug>(result: &CacheResult<T>, operation: CacheOperation) {
        match result {
            Err(CacheError::DelegateOperation { operation: op, .. }) => {
                assert_eq!(*op, operation, "Wrong operation in delegate error")
            }
            other => panic!("Expected {} delegate error, got: {:?}", operation, other),
        }
    }

    /// Assert that a StowageResult is a Config error.
    #[track_caller]
    pub fn assert_config_error<T: Debug>(result: &StowageResult<T>) {
        match result {
            Err(StowageError::Config(_)) => {}
            other => panic!("Expected Config error, got: {:?}", other),
        }
    }

    /// Assert that a CacheConfig is valid.
    #[track_caller]
    pub fn assert_config_valid(config: &CacheConfig) {
        match config.validate() {
            Ok(()) => {}
            Err(e) => panic!("Config validation failed: {:?}", e),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
