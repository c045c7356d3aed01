use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;
use std::sync::Arc;
use stowage_cache::{
    Cache, CacheBuilder, CacheRegistry, SharedCache, TransactionalCache, TransactionalCacheManager,
};
use stowage_core::{CacheConfig, CacheKey, CacheValue, EvictionPolicy};

fn bench_cache(config: CacheConfig) -> SharedCache<String, Vec<i64>> {
    CacheBuilder::new(config).build().expect("build cache")
}

fn bench_chain_reads(c: &mut Criterion) {
    let plain = bench_cache(
        CacheConfig::new("plain")
            .with_eviction(EvictionPolicy::None)
            .with_read_write(false)
            .with_logging(false)
            .with_synchronized(false),
    );
    let standard = bench_cache(CacheConfig::new("standard").with_size(4096));
    let row: Vec<i64> = (0..32).collect();
    for i in 0..1024 {
        let key = format!("row-{}", i);
        plain.put(key.clone(), CacheValue::Value(row.clone())).expect("seed");
        standard.put(key, CacheValue::Value(row.clone())).expect("seed");
    }

    c.bench_function("chain/get_plain", |b| {
        let key = "row-512".to_string();
        b.iter(|| black_box(plain.get(black_box(&key)).expect("get")));
    });

    c.bench_function("chain/get_standard", |b| {
        let key = "row-512".to_string();
        b.iter(|| black_box(standard.get(black_box(&key)).expect("get")));
    });

    c.bench_function("chain/put_standard_evicting", |b| {
        let small = bench_cache(CacheConfig::new("small").with_size(64));
        let mut n = 0u64;
        b.iter(|| {
            n += 1;
            small
                .put(format!("row-{}", n), CacheValue::Value(row.clone()))
                .expect("put");
        });
    });
}

fn bench_transactional(c: &mut Criterion) {
    let registry = Arc::new(CacheRegistry::<String, Vec<i64>>::new());
    CacheBuilder::new(CacheConfig::new("users").with_size(8192))
        .register_into(&registry)
        .expect("register");
    let shared = registry.get("users").expect("registered");

    c.bench_function("tx/buffer_and_commit_16", |b| {
        let tx = TransactionalCache::new(Arc::clone(&shared));
        b.iter(|| {
            for i in 0..16i64 {
                let key = CacheKey::for_statement("users.select", 0, 16)
                    .with(i)
                    .to_string();
                tx.get(&key).expect("get");
                tx.put(key, CacheValue::Value(vec![i])).expect("put");
            }
            black_box(tx.commit().expect("commit"));
        });
    });

    c.bench_function("tx/manager_rollback_16", |b| {
        b.iter(|| {
            let mut session = TransactionalCacheManager::new(Arc::clone(&registry));
            for i in 0..16i64 {
                session
                    .get("users", &format!("missing-{}", i))
                    .expect("get");
            }
            black_box(session.rollback_all());
        });
    });
}

criterion_group!(benches, bench_chain_reads, bench_transactional);
criterion_main!(benches);
