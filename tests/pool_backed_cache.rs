// ==============================================
// POOL-BACKED CACHE TESTS (integration)
// ==============================================
//
// A cache built on `PoolStore` must hand every payload block back to its
// allocator, and allocator corruption must reach the cache caller as
// corruption, not as a miss.

use std::sync::Arc;
use std::time::Duration;

use memkit::builder::AllocatorBuilder;
use memkit::cache::CacheStore;
use memkit::error::{CacheError, Status};
use memkit::policy::EvictionPolicy;
use memkit::pool::{PoolAllocator, PoolFlags};
use memkit::store::PoolStore;

const TTL: Duration = Duration::from_secs(60);

fn setup(max: usize, pool_size: usize) -> (Arc<PoolAllocator>, CacheStore<PoolStore>) {
    let allocator = Arc::new(AllocatorBuilder::new().guard_bytes(true).init(pool_size).unwrap());
    let cache = CacheStore::builder(max)
        .store(PoolStore::new(Arc::clone(&allocator)))
        .build()
        .unwrap();
    (allocator, cache)
}

#[test]
fn delete_returns_payload_block() {
    let (allocator, cache) = setup(8, 16 * 1024);
    cache.set("a", &[1u8; 200], TTL).unwrap();
    assert_eq!(allocator.stats().alloc_count, 1);
    assert!(allocator.usage().0 > 200);

    cache.delete("a").unwrap();
    assert_eq!(allocator.usage().0, 0);
}

#[test]
fn eviction_returns_payload_block() {
    let (allocator, cache) = setup(2, 16 * 1024);
    cache.set("a", b"one", TTL).unwrap();
    cache.set("b", b"two", TTL).unwrap();
    cache.set("c", b"three", TTL).unwrap();

    let stats = allocator.stats();
    assert_eq!(stats.alloc_count, 2);
    assert_eq!(stats.total_frees, 1);
    assert_eq!(cache.stats().evictions, 1);
}

#[test]
fn update_swaps_blocks_without_leaking() {
    let (allocator, cache) = setup(4, 16 * 1024);
    cache.set("a", &[1u8; 64], TTL).unwrap();
    cache.set("a", &[2u8; 300], TTL).unwrap();
    assert_eq!(allocator.stats().alloc_count, 1);
    assert_eq!(cache.get_owned("a").unwrap(), vec![2u8; 300]);
}

#[test]
fn flush_and_cleanup_return_everything() {
    let (allocator, cache) = setup(32, 32 * 1024);
    for i in 0..20 {
        cache.set(&format!("k{i}"), &vec![i as u8; 100 + i], TTL).unwrap();
    }
    assert_eq!(allocator.stats().alloc_count, 20);

    cache.flush().unwrap();
    assert_eq!(allocator.usage().0, 0);

    cache.set("again", b"v", TTL).unwrap();
    cache.cleanup().unwrap();
    assert_eq!(allocator.usage().0, 0);
    allocator.check_invariants().unwrap();
}

#[test]
fn exhausted_pool_is_out_of_memory() {
    let (allocator, cache) = setup(64, 1024);
    let big = vec![0u8; 2048];
    assert_eq!(cache.set("big", &big, TTL), Err(CacheError::OutOfMemory));
    assert_eq!(cache.last_status(), Status::OutOfMemory);
    assert!(cache.is_empty());
    assert_eq!(allocator.stats().failed_allocs, 1);
}

#[test]
fn failed_store_on_full_cache_keeps_tail() {
    let (allocator, cache) = setup(1, 1024);
    cache.set("keep", b"small", TTL).unwrap();

    assert_eq!(cache.set("big", &[9u8; 4096], TTL), Err(CacheError::OutOfMemory));
    assert_eq!(cache.get_owned("keep").unwrap(), b"small");
    assert_eq!(cache.stats().evictions, 0);
    assert_eq!(allocator.stats().alloc_count, 1);
}

#[test]
fn full_pool_reuses_evicted_tail_block() {
    // One 200-byte payload with guards fills most of a 512-byte pool.
    let (allocator, cache) = setup(1, 512);
    cache.set("a", &[1u8; 200], TTL).unwrap();
    cache.set("b", &[2u8; 200], TTL).unwrap();

    assert!(!cache.contains("a"));
    assert_eq!(cache.get_owned("b").unwrap(), vec![2u8; 200]);
    assert_eq!(cache.stats().evictions, 1);
    assert_eq!(allocator.stats().alloc_count, 1);
    allocator.check_invariants().unwrap();
}

#[test]
fn release_into_cleaned_up_allocator_is_uninitialized() {
    let (allocator, cache) = setup(4, 4096);
    cache.set("k", b"value", TTL).unwrap();
    allocator.cleanup();

    assert_eq!(cache.delete("k"), Err(CacheError::Uninitialized));
    assert_eq!(cache.last_status(), Status::Uninitialized);
    assert!(cache.is_empty());
    assert_eq!(cache.set("k", b"value", TTL), Err(CacheError::Uninitialized));
}

#[test]
fn growable_pool_backs_a_large_cache() {
    let allocator = Arc::new(
        AllocatorBuilder::new()
            .default_flags(PoolFlags::GROWABLE)
            .init(4096)
            .unwrap(),
    );
    let cache = CacheStore::with_store(
        EvictionPolicy::Lru,
        200,
        PoolStore::new(Arc::clone(&allocator)),
    )
    .unwrap();
    for i in 0..100 {
        cache.set(&format!("k{i}"), &[7u8; 128], TTL).unwrap();
    }
    assert!(allocator.pool_count() > 1);
    assert_eq!(cache.len(), 100);
}

#[test]
fn allocator_corruption_surfaces_through_cache() {
    let (allocator, cache) = setup(8, 16 * 1024);
    cache.set("a", b"payload", TTL).unwrap();

    // Overrun a block the cache does not own; the next allocation walks the
    // directory and finds the damaged guard.
    let stray = allocator.allocate(32).unwrap();
    unsafe { stray.as_ptr().add(stray.len()).write(0) };

    let err = cache.set("b", b"payload", TTL).unwrap_err();
    assert!(err.is_corruption());
    assert_eq!(cache.last_status(), Status::Corruption);
    assert_eq!(allocator.last_status(), Status::Corruption);
    assert!(allocator.stats().corruption_events >= 1);
}
