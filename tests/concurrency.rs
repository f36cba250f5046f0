// ==============================================
// CONCURRENCY TESTS (integration)
// ==============================================
//
// Many threads hammering shared instances through `Arc`. Every operation is
// linearized by the owning mutex, so after the threads join the structures
// must validate and the counters must add up.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use memkit::cache::{CacheStore, ShardedCacheStore};
use memkit::policy::EvictionPolicy;
use memkit::pool::PoolAllocator;
use memkit::store::PoolStore;

const THREADS: usize = 8;
const OPS: usize = 500;
const TTL: Duration = Duration::from_secs(60);

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[test]
#[cfg_attr(miri, ignore)]
fn allocator_survives_parallel_churn() {
    init_tracing();
    let allocator = Arc::new(PoolAllocator::with_pool_size(4 * 1024 * 1024).unwrap());

    let workers: Vec<_> = (0..THREADS)
        .map(|t| {
            let allocator = Arc::clone(&allocator);
            thread::spawn(move || {
                let mut held = Vec::new();
                for i in 0..OPS {
                    let size = 16 + (t * 31 + i * 7) % 200;
                    if let Ok(handle) = allocator.allocate(size) {
                        allocator.write(&handle, 0, &vec![t as u8; size]).unwrap();
                        held.push(handle);
                    }
                    if i % 3 == 0
                        && let Some(handle) = held.pop()
                    {
                        let mut buf = vec![0u8; handle.len()];
                        allocator.read(&handle, 0, &mut buf).unwrap();
                        assert!(buf.iter().all(|&b| b == t as u8));
                        allocator.free(handle).unwrap();
                    }
                }
                for handle in held {
                    allocator.free(handle).unwrap();
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    allocator.check_invariants().unwrap();
    let stats = allocator.stats();
    assert_eq!(stats.alloc_count, 0);
    assert_eq!(stats.used_size, 0);
    assert_eq!(stats.total_allocs, stats.total_frees);
}

#[test]
#[cfg_attr(miri, ignore)]
fn cache_counters_add_up_under_contention() {
    init_tracing();
    let cache = Arc::new(CacheStore::new(EvictionPolicy::Lfu, 64).unwrap());

    let workers: Vec<_> = (0..THREADS)
        .map(|t| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || {
                for i in 0..OPS {
                    let key = format!("k{}", (t + i) % 96);
                    if i % 2 == 0 {
                        cache.set(&key, key.as_bytes(), TTL).unwrap();
                    } else if let Ok(value) = cache.get_owned(&key) {
                        assert_eq!(value, key.as_bytes());
                    }
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    cache.check_invariants().unwrap();
    let stats = cache.stats();
    assert!(stats.size <= 64);
    assert_eq!(stats.hits + stats.misses, (THREADS * OPS / 2) as u64);
    assert_eq!(stats.insertions + stats.updates, (THREADS * OPS / 2) as u64);
    assert_eq!(stats.insertions - stats.evictions, stats.size as u64);
}

#[test]
#[cfg_attr(miri, ignore)]
fn sharded_pool_backed_cache_returns_every_block() {
    init_tracing();
    let allocator = Arc::new(PoolAllocator::with_pool_size(512 * 1024).unwrap());
    let cache = Arc::new(
        ShardedCacheStore::with_store(
            EvictionPolicy::Lru,
            128,
            4,
            PoolStore::new(Arc::clone(&allocator)),
        )
        .unwrap(),
    );

    let workers: Vec<_> = (0..THREADS)
        .map(|t| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || {
                for i in 0..OPS {
                    let key = format!("t{t}-{}", i % 50);
                    match i % 4 {
                        0 | 1 => cache.set(&key, &[t as u8; 96], TTL).unwrap(),
                        2 => {
                            let _ = cache.get_owned(&key);
                        },
                        _ => {
                            let _ = cache.delete(&key);
                        },
                    }
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    cache.check_invariants().unwrap();
    assert_eq!(allocator.stats().alloc_count, cache.len());

    cache.flush().unwrap();
    assert_eq!(allocator.usage().0, 0);
    allocator.check_invariants().unwrap();
}
