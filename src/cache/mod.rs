//! Bounded key/value cache with TTL expiry and LRU/LFU eviction.
//!
//! ## Key Components
//!
//! - [`CacheStore`]: one ordered list of entries behind one mutex.
//! - [`ShardedCacheStore`]: several `CacheStore`s selected by key hash.
//! - `CacheCore` (internal): the unsynchronized list + index + payload store.
//!
//! Values are opaque bytes copied in on `set` and out on `get`. Where those
//! bytes live is decided by the [`PayloadStore`](crate::store::PayloadStore)
//! the cache is built with:
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//! use memkit::cache::CacheStore;
//! use memkit::policy::EvictionPolicy;
//! use memkit::pool::PoolAllocator;
//! use memkit::store::PoolStore;
//!
//! let allocator = Arc::new(PoolAllocator::with_pool_size(64 * 1024).unwrap());
//! let cache = CacheStore::with_store(
//!     EvictionPolicy::Lfu,
//!     128,
//!     PoolStore::new(Arc::clone(&allocator)),
//! )
//! .unwrap();
//!
//! cache.set("greeting", b"hello", Duration::from_secs(10)).unwrap();
//! assert_eq!(allocator.stats().alloc_count, 1);
//!
//! cache.delete("greeting").unwrap();
//! assert_eq!(allocator.stats().alloc_count, 0);
//! ```

mod core;
mod entry;
pub mod sharded;
pub mod store;

pub use sharded::ShardedCacheStore;
pub use store::CacheStore;
