//! Cache operation benchmarks.
//!
//! Run with: `cargo bench --bench cache`
//!
//! Compares LRU and LFU, heap and pool payload storage, and the plain store
//! against the sharded one.

use std::hint::black_box;
use std::sync::Arc;
use std::time::Duration;

use criterion::{BatchSize, BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use memkit::cache::{CacheStore, ShardedCacheStore};
use memkit::policy::EvictionPolicy;
use memkit::pool::PoolAllocator;
use memkit::store::PoolStore;

const CAPACITY: usize = 4096;
const TTL: Duration = Duration::from_secs(600);
const VALUE: [u8; 64] = [0x42; 64];

fn keys(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("key:{i:08}")).collect()
}

fn filled(policy: EvictionPolicy, keys: &[String]) -> CacheStore {
    let cache = CacheStore::new(policy, CAPACITY).expect("cache");
    for key in keys {
        cache.set(key, &VALUE, TTL).expect("set");
    }
    cache
}

// ============================================================================
// Get hit
// ============================================================================

fn bench_get_hit(c: &mut Criterion) {
    let mut group = c.benchmark_group("get_hit");
    group.throughput(Throughput::Elements(1));
    let keys = keys(CAPACITY);

    for policy in [EvictionPolicy::Lru, EvictionPolicy::Lfu] {
        let cache = filled(policy, &keys);
        let mut out = [0u8; 64];
        let mut i = 0usize;
        group.bench_function(policy.as_str(), |b| {
            b.iter(|| {
                i = (i + 1) % keys.len();
                black_box(cache.get(&keys[i], &mut out).expect("get"))
            })
        });
    }
    group.finish();
}

// ============================================================================
// Insert with eviction
// ============================================================================

fn bench_insert_evict(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert_evict");
    let fill = keys(CAPACITY);
    let fresh = keys(CAPACITY * 2);

    for policy in [EvictionPolicy::Lru, EvictionPolicy::Lfu] {
        group.bench_function(policy.as_str(), |b| {
            b.iter_batched(
                || filled(policy, &fill),
                |cache| {
                    for key in &fresh[CAPACITY..CAPACITY + 256] {
                        cache.set(key, &VALUE, TTL).expect("set");
                    }
                    cache
                },
                BatchSize::LargeInput,
            );
        });
    }
    group.finish();
}

// ============================================================================
// Payload store
// ============================================================================

fn bench_pool_store(c: &mut Criterion) {
    let mut group = c.benchmark_group("set_delete");
    group.throughput(Throughput::Elements(1));

    let heap = CacheStore::new(EvictionPolicy::Lru, CAPACITY).expect("cache");
    group.bench_function("heap", |b| {
        b.iter(|| {
            heap.set("k", black_box(&VALUE), TTL).expect("set");
            heap.delete("k").expect("delete");
        })
    });

    let allocator = Arc::new(PoolAllocator::with_pool_size(1024 * 1024).expect("allocator"));
    let pooled = CacheStore::with_store(EvictionPolicy::Lru, CAPACITY, PoolStore::new(allocator))
        .expect("cache");
    group.bench_function("pool", |b| {
        b.iter(|| {
            pooled.set("k", black_box(&VALUE), TTL).expect("set");
            pooled.delete("k").expect("delete");
        })
    });
    group.finish();
}

// ============================================================================
// Sharding under threads
// ============================================================================

fn bench_sharded(c: &mut Criterion) {
    let mut group = c.benchmark_group("threaded_mixed");
    let keys = Arc::new(keys(CAPACITY));

    for shards in [1usize, 4, 16] {
        group.bench_with_input(BenchmarkId::from_parameter(shards), &shards, |b, &shards| {
            let cache = Arc::new(
                ShardedCacheStore::new(EvictionPolicy::Lru, CAPACITY, shards).expect("cache"),
            );
            b.iter(|| {
                std::thread::scope(|s| {
                    for t in 0..4 {
                        let cache = Arc::clone(&cache);
                        let keys = Arc::clone(&keys);
                        s.spawn(move || {
                            for i in (t..keys.len()).step_by(16) {
                                let _ = cache.set(&keys[i], &VALUE, TTL);
                                let _ = black_box(cache.get_owned(&keys[(i * 7) % keys.len()]));
                            }
                        });
                    }
                });
            });
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_get_hit,
    bench_insert_evict,
    bench_pool_store,
    bench_sharded
);
criterion_main!(benches);
