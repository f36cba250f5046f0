#![no_main]

use std::sync::Arc;
use std::time::Duration;

use libfuzzer_sys::fuzz_target;
use memkit::cache::CacheStore;
use memkit::clock::ManualClock;
use memkit::policy::EvictionPolicy;
use memkit::pool::PoolAllocator;
use memkit::store::PoolStore;

// Fuzz arbitrary set/get/delete/advance sequences on a pool-backed CacheStore
//
// Checks capacity, list/index agreement and policy order after every step,
// and that flushing returns every payload block.
fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }

    let policy = if data[0] & 1 == 0 {
        EvictionPolicy::Lru
    } else {
        EvictionPolicy::Lfu
    };
    let max = usize::from(data[0] >> 1) % 8 + 1;
    let clock = ManualClock::new();
    let allocator = Arc::new(PoolAllocator::with_pool_size(64 * 1024).unwrap());
    let cache = CacheStore::builder(max)
        .policy(policy)
        .clock(Arc::new(clock.clone()))
        .store(PoolStore::new(Arc::clone(&allocator)))
        .build()
        .unwrap();

    let mut idx = 1;
    while idx + 1 < data.len() {
        let op = data[idx] % 5;
        let arg = data[idx + 1];
        let key = format!("k{}", arg % 16);

        match op {
            0 | 1 => {
                let ttl = Duration::from_secs(u64::from(arg % 8) + 1);
                let value = vec![arg; usize::from(arg) + 1];
                cache.set(&key, &value, ttl).unwrap();
                assert_eq!(cache.get_owned(&key).unwrap(), value);
            }
            2 => {
                let _ = cache.get_owned(&key);
            }
            3 => {
                let _ = cache.delete(&key);
                assert!(!cache.contains(&key));
            }
            4 => {
                clock.advance(Duration::from_secs(u64::from(arg % 4)));
            }
            _ => unreachable!(),
        }

        assert!(cache.len() <= max);
        cache.check_invariants().unwrap();
        assert_eq!(allocator.stats().alloc_count, cache.len());
        idx += 2;
    }

    cache.flush().unwrap();
    assert_eq!(allocator.usage().0, 0);
});
