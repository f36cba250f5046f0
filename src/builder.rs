//! Builders for allocators and caches.
//!
//! Collects the runtime options in one place and validates them on `build`.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use memkit::builder::{AllocatorBuilder, CacheBuilder};
//! use memkit::policy::EvictionPolicy;
//! use memkit::pool::PoolFlags;
//! use memkit::store::PoolStore;
//!
//! let allocator = AllocatorBuilder::new()
//!     .guard_bytes(true)
//!     .default_flags(PoolFlags::GROWABLE)
//!     .init(16 * 1024)
//!     .unwrap();
//!
//! let cache = CacheBuilder::new(100)
//!     .policy(EvictionPolicy::Lfu)
//!     .store(PoolStore::new(Arc::new(allocator)))
//!     .build()
//!     .unwrap();
//!
//! cache.set("k", b"v", Duration::from_secs(5)).unwrap();
//! assert!(cache.contains("k"));
//! ```

use std::fmt;
use std::sync::Arc;

use crate::cache::{CacheStore, ShardedCacheStore};
use crate::clock::{Clock, SystemClock};
use crate::error::{AllocError, CacheError};
use crate::policy::EvictionPolicy;
use crate::pool::{AllocatorConfig, PoolAllocator, PoolFlags};
use crate::store::{HeapStore, PayloadStore};

// ---------------------------------------------------------------------------
// AllocatorBuilder
// ---------------------------------------------------------------------------

/// Builder for [`PoolAllocator`].
#[derive(Debug, Clone, Copy, Default)]
pub struct AllocatorBuilder {
    config: AllocatorConfig,
}

impl AllocatorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables or disables guard bytes around every payload.
    pub fn guard_bytes(mut self, enabled: bool) -> Self {
        self.config.guard_bytes = enabled;
        self
    }

    /// Flags for the default pool.
    pub fn default_flags(mut self, flags: PoolFlags) -> Self {
        self.config.default_flags = flags;
        self
    }

    /// Builds an uninitialized allocator.
    pub fn build(self) -> PoolAllocator {
        PoolAllocator::new(self.config)
    }

    /// Builds the allocator and creates its default pool.
    pub fn init(self, pool_size: usize) -> Result<PoolAllocator, AllocError> {
        let allocator = self.build();
        allocator.init(pool_size)?;
        Ok(allocator)
    }
}

// ---------------------------------------------------------------------------
// CacheBuilder
// ---------------------------------------------------------------------------

/// Builder for [`CacheStore`] and [`ShardedCacheStore`].
///
/// Defaults: LRU, heap payload storage, system clock.
pub struct CacheBuilder<S = HeapStore> {
    max_entries: usize,
    policy: EvictionPolicy,
    clock: Arc<dyn Clock>,
    store: S,
}

impl CacheBuilder<HeapStore> {
    /// Create a new cache builder with the specified capacity.
    pub fn new(max_entries: usize) -> Self {
        Self {
            max_entries,
            policy: EvictionPolicy::default(),
            clock: Arc::new(SystemClock),
            store: HeapStore,
        }
    }
}

impl<S> CacheBuilder<S> {
    pub fn policy(mut self, policy: EvictionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Parses the policy by name (`"lru"` or `"lfu"`, any case).
    pub fn policy_name(self, name: &str) -> Result<Self, CacheError> {
        Ok(self.policy(name.parse()?))
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Switches the payload store.
    pub fn store<T: PayloadStore>(self, store: T) -> CacheBuilder<T> {
        CacheBuilder {
            max_entries: self.max_entries,
            policy: self.policy,
            clock: self.clock,
            store,
        }
    }
}

impl<S: PayloadStore> CacheBuilder<S> {
    pub fn build(self) -> Result<CacheStore<S>, CacheError> {
        CacheStore::with_clock(self.policy, self.max_entries, self.store, self.clock)
    }
}

impl<S: PayloadStore + Clone> CacheBuilder<S> {
    /// Builds a cache split over `shards` independently locked shards.
    pub fn build_sharded(self, shards: usize) -> Result<ShardedCacheStore<S>, CacheError> {
        ShardedCacheStore::with_clock(
            self.policy,
            self.max_entries,
            shards,
            self.store,
            self.clock,
        )
    }
}

impl<S> fmt::Debug for CacheBuilder<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheBuilder")
            .field("max_entries", &self.max_entries)
            .field("policy", &self.policy)
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}
