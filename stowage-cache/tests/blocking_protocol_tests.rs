use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use stowage_core::CacheValue;
use stowage_test_utils::{assertions, fixtures, init_test_tracing, CacheRegistry};

const WAITER_TIMEOUT: Duration = Duration::from_secs(5);

fn blocking_registry(timeout: Duration) -> Arc<CacheRegistry<String, i64>> {
    let cache = fixtures::build_cache(fixtures::blocking_config("users", timeout));
    fixtures::registry_of(cache)
}

/// Spawn a session that reads `key` once started, reporting back when it begins.
fn spawn_reader(
    registry: &Arc<CacheRegistry<String, i64>>,
    key: &str,
) -> (
    mpsc::Receiver<()>,
    thread::JoinHandle<stowage_core::CacheResult<Option<CacheValue<i64>>>>,
) {
    let registry = Arc::clone(registry);
    let key = fixtures::key(key);
    let (started_tx, started_rx) = mpsc::channel();
    let handle = thread::spawn(move || {
        let mut session = fixtures::session(&registry);
        started_tx.send(()).expect("signal start");
        let result = session.get("users", &key);
        session.rollback_all();
        result
    });
    (started_rx, handle)
}

#[test]
fn waiter_sees_value_committed_by_loader() {
    init_test_tracing();
    let registry = blocking_registry(WAITER_TIMEOUT);
    let mut loader = fixtures::session(&registry);

    assert_eq!(loader.get("users", &fixtures::key("k")).expect("get"), None);

    let (started, waiter) = spawn_reader(&registry, "k");
    started.recv().expect("reader started");
    thread::sleep(Duration::from_millis(50));

    loader
        .put("users", fixtures::key("k"), CacheValue::Value(99))
        .expect("put");
    loader.commit_all().expect("commit");

    let seen = waiter.join().expect("reader thread").expect("reader get");
    assert_eq!(seen, Some(CacheValue::Value(99)));
}

#[test]
fn committed_miss_releases_waiter_with_null() {
    let registry = blocking_registry(WAITER_TIMEOUT);
    let mut loader = fixtures::session(&registry);
    loader.get("users", &fixtures::key("k")).expect("get");

    let (started, waiter) = spawn_reader(&registry, "k");
    started.recv().expect("reader started");
    thread::sleep(Duration::from_millis(20));
    loader.commit_all().expect("commit");

    let seen = waiter.join().expect("reader thread").expect("reader get");
    assert_eq!(seen, Some(CacheValue::Null));
}

#[test]
fn rollback_releases_waiter() {
    let registry = blocking_registry(WAITER_TIMEOUT);
    let mut loader = fixtures::session(&registry);
    loader.get("users", &fixtures::key("k")).expect("get");

    let (started, waiter) = spawn_reader(&registry, "k");
    started.recv().expect("reader started");
    thread::sleep(Duration::from_millis(20));
    let report = loader.rollback_all();
    assertions::assert_clean_rollback(&report);

    let seen = waiter.join().expect("reader thread").expect("reader get");
    assert_eq!(seen, None);
}

#[test]
fn waiter_times_out_while_key_is_held() {
    let registry = blocking_registry(Duration::from_millis(50));
    let mut loader = fixtures::session(&registry);
    loader.get("users", &fixtures::key("k")).expect("get");

    let (started, waiter) = spawn_reader(&registry, "k");
    started.recv().expect("reader started");
    let result = waiter.join().expect("reader thread");
    assertions::assert_lock_timeout(&result);

    assertions::assert_clean_rollback(&loader.rollback_all());
}

#[test]
fn dropping_session_releases_held_keys() {
    let registry = blocking_registry(Duration::from_millis(500));
    {
        let mut loader = fixtures::session(&registry);
        loader.get("users", &fixtures::key("k")).expect("get");
    }

    let (started, waiter) = spawn_reader(&registry, "k");
    started.recv().expect("reader started");
    let seen = waiter.join().expect("reader thread").expect("reader get");
    assert_eq!(seen, None);
}

#[test]
fn other_keys_are_not_blocked() {
    let registry = blocking_registry(Duration::from_millis(200));
    let mut loader = fixtures::session(&registry);
    loader.get("users", &fixtures::key("held")).expect("get");

    let (started, waiter) = spawn_reader(&registry, "free");
    started.recv().expect("reader started");
    let seen = waiter.join().expect("reader thread").expect("reader get");
    assert_eq!(seen, None);

    loader.rollback_all();
}
