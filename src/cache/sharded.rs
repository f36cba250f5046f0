//! Lock-sharded cache: N independent [`CacheStore`]s keyed by hash.
//!
//! ```text
//!   set("user:7") ──► ShardSelector ──► shard 2 ──► shard 2's mutex
//!
//!   ┌───────────┬───────────┬───────────┬───────────┐
//!   │ CacheStore│ CacheStore│ CacheStore│ CacheStore│
//!   │ cap ⌈N/4⌉ │ cap ⌈N/4⌉ │ cap ⌈N/4⌉ │ cap ⌈N/4⌉ │
//!   └───────────┴───────────┴───────────┴───────────┘
//! ```
//!
//! Each shard evicts on its own, so LRU/LFU order holds within a shard but
//! not across shards. A hot shard can evict while others still have room.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::cache::core::validate_capacity;
use crate::cache::store::CacheStore;
use crate::clock::{Clock, SystemClock};
use crate::ds::ShardSelector;
use crate::error::{CacheError, InvariantError, Status};
use crate::limits::MAX_SHARDS;
use crate::metrics::snapshot::CacheStats;
use crate::metrics::traits::MetricsSnapshotProvider;
use crate::policy::EvictionPolicy;
use crate::store::{HeapStore, PayloadStore};

const SHARD_SEED: u64 = 0x6d65_6d6b_6974;

pub struct ShardedCacheStore<S: PayloadStore = HeapStore> {
    shards: Vec<CacheStore<S>>,
    selector: ShardSelector,
    last_status: Mutex<Status>,
}

impl ShardedCacheStore<HeapStore> {
    pub fn new(
        policy: EvictionPolicy,
        max_entries: usize,
        shards: usize,
    ) -> Result<Self, CacheError> {
        Self::with_store(policy, max_entries, shards, HeapStore)
    }
}

impl<S: PayloadStore + Clone> ShardedCacheStore<S> {
    /// Every shard gets a clone of `store`.
    pub fn with_store(
        policy: EvictionPolicy,
        max_entries: usize,
        shards: usize,
        store: S,
    ) -> Result<Self, CacheError> {
        Self::with_clock(policy, max_entries, shards, store, Arc::new(SystemClock))
    }

    pub fn with_clock(
        policy: EvictionPolicy,
        max_entries: usize,
        shards: usize,
        store: S,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, CacheError> {
        validate_capacity(max_entries)?;
        if shards == 0 || shards > MAX_SHARDS {
            return Err(CacheError::InvalidParam("shard count out of range"));
        }
        let per_shard = max_entries.div_ceil(shards);
        let shards = (0..shards)
            .map(|_| CacheStore::with_clock(policy, per_shard, store.clone(), Arc::clone(&clock)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            selector: ShardSelector::new(shards.len(), SHARD_SEED),
            shards,
            last_status: Mutex::new(Status::Success),
        })
    }
}

impl<S: PayloadStore> ShardedCacheStore<S> {
    #[inline]
    fn shard(&self, key: &str) -> &CacheStore<S> {
        &self.shards[self.selector.shard_for_key(key)]
    }

    fn finish<T>(&self, result: Result<T, CacheError>) -> Result<T, CacheError> {
        *self.last_status.lock() = Status::of(&result);
        result
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Capacity of each shard.
    pub fn shard_capacity(&self) -> usize {
        self.shards.first().map_or(0, CacheStore::max_entries)
    }

    /// Total capacity across shards, which may exceed the requested maximum
    /// by up to `shards - 1`.
    pub fn max_entries(&self) -> usize {
        self.shards.iter().map(CacheStore::max_entries).sum()
    }

    pub fn len(&self) -> usize {
        self.shards.iter().map(CacheStore::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.shards.iter().all(CacheStore::is_empty)
    }

    pub fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), CacheError> {
        self.finish(self.shard(key).set(key, value, ttl))
    }

    pub fn get(&self, key: &str, out: &mut [u8]) -> Result<usize, CacheError> {
        self.finish(self.shard(key).get(key, out))
    }

    pub fn get_owned(&self, key: &str) -> Result<Vec<u8>, CacheError> {
        self.finish(self.shard(key).get_owned(key))
    }

    pub fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.finish(self.shard(key).delete(key))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.shard(key).contains(key)
    }

    pub fn ttl_remaining(&self, key: &str) -> Option<Duration> {
        self.shard(key).ttl_remaining(key)
    }

    pub fn purge_expired(&self) -> Result<usize, CacheError> {
        let mut total = 0;
        for shard in &self.shards {
            match shard.purge_expired() {
                Ok(n) => total += n,
                Err(err) => return self.finish(Err(err)),
            }
        }
        self.finish(Ok(total))
    }

    /// Flushes every shard, even past a failing one; returns the first error.
    pub fn flush(&self) -> Result<(), CacheError> {
        let mut first_err = None;
        for shard in &self.shards {
            if let Err(err) = shard.flush() {
                first_err.get_or_insert(err);
            }
        }
        self.finish(first_err.map_or(Ok(()), Err))
    }

    /// Sum of the shard statistics.
    pub fn stats(&self) -> CacheStats {
        self.shards.iter().map(CacheStore::stats).sum()
    }

    pub fn shard_stats(&self) -> Vec<CacheStats> {
        self.shards.iter().map(CacheStore::stats).collect()
    }

    pub fn last_status(&self) -> Status {
        *self.last_status.lock()
    }

    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        for (i, shard) in self.shards.iter().enumerate() {
            shard
                .check_invariants()
                .map_err(|err| InvariantError::new(format!("shard {i}: {err}")))?;
        }
        Ok(())
    }

    pub fn cleanup(self) -> Result<(), CacheError> {
        let mut first_err = None;
        for shard in self.shards {
            if let Err(err) = shard.cleanup() {
                first_err.get_or_insert(err);
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}

impl<S: PayloadStore> fmt::Debug for ShardedCacheStore<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShardedCacheStore")
            .field("shards", &self.shards.len())
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

impl<S: PayloadStore> MetricsSnapshotProvider<CacheStats> for ShardedCacheStore<S> {
    fn snapshot(&self) -> CacheStats {
        self.stats()
    }
}
