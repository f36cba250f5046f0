use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::builder::CacheBuilder;
use crate::cache::core::CacheCore;
use crate::clock::{Clock, SystemClock};
use crate::error::{CacheError, InvariantError, Status};
use crate::metrics::snapshot::CacheStats;
use crate::metrics::traits::MetricsSnapshotProvider;
use crate::policy::EvictionPolicy;
use crate::store::{HeapStore, PayloadStore};

/// Bounded key/value cache behind one mutex.
///
/// Every operation, introspection included, takes the lock. Share the store
/// with `Arc` across threads.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use memkit::cache::CacheStore;
/// use memkit::policy::EvictionPolicy;
///
/// let cache = CacheStore::new(EvictionPolicy::Lru, 2).unwrap();
/// cache.set("a", b"alpha", Duration::from_secs(60)).unwrap();
/// cache.set("b", b"beta", Duration::from_secs(60)).unwrap();
///
/// let mut buf = [0u8; 8];
/// let n = cache.get("a", &mut buf).unwrap();
/// assert_eq!(&buf[..n], b"alpha");
///
/// // "b" is now least recently used and makes room for "c".
/// cache.set("c", b"gamma", Duration::from_secs(60)).unwrap();
/// assert!(!cache.contains("b"));
/// ```
pub struct CacheStore<S: PayloadStore = HeapStore> {
    inner: Mutex<CacheCore<S>>,
}

impl CacheStore<HeapStore> {
    /// Creates a heap-backed cache on the system clock.
    pub fn new(policy: EvictionPolicy, max_entries: usize) -> Result<Self, CacheError> {
        Self::with_store(policy, max_entries, HeapStore)
    }

    pub fn builder(max_entries: usize) -> CacheBuilder<HeapStore> {
        CacheBuilder::new(max_entries)
    }
}

impl<S: PayloadStore> CacheStore<S> {
    /// Creates a cache that keeps its payloads in `store`.
    pub fn with_store(
        policy: EvictionPolicy,
        max_entries: usize,
        store: S,
    ) -> Result<Self, CacheError> {
        Self::with_clock(policy, max_entries, store, Arc::new(SystemClock))
    }

    pub fn with_clock(
        policy: EvictionPolicy,
        max_entries: usize,
        store: S,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, CacheError> {
        let core = CacheCore::new(policy, max_entries, store, clock)?;
        tracing::debug!(%policy, max_entries, "cache store created");
        Ok(Self {
            inner: Mutex::new(core),
        })
    }

    pub fn policy(&self) -> EvictionPolicy {
        self.inner.lock().policy()
    }

    pub fn max_entries(&self) -> usize {
        self.inner.lock().max_entries()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Inserts or replaces `key`, evicting the tail entry if the cache is full.
    pub fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), CacheError> {
        let mut core = self.inner.lock();
        let result = core.set(key, value, ttl);
        core.finish(result)
    }

    /// Copies the value into `out` and returns the number of bytes copied.
    pub fn get(&self, key: &str, out: &mut [u8]) -> Result<usize, CacheError> {
        let mut core = self.inner.lock();
        let result = core.get(key, out);
        core.finish(result)
    }

    pub fn get_owned(&self, key: &str) -> Result<Vec<u8>, CacheError> {
        let mut core = self.inner.lock();
        let result = core.get_owned(key);
        core.finish(result)
    }

    pub fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut core = self.inner.lock();
        let result = core.delete(key);
        core.finish(result)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner.lock().contains(key)
    }

    pub fn ttl_remaining(&self, key: &str) -> Option<Duration> {
        self.inner.lock().ttl_remaining(key)
    }

    pub fn access_count(&self, key: &str) -> Option<u64> {
        self.inner.lock().access_count(key)
    }

    /// Keys from the head of the eviction order to the tail.
    pub fn keys(&self) -> Vec<String> {
        self.inner.lock().keys()
    }

    pub fn purge_expired(&self) -> Result<usize, CacheError> {
        let mut core = self.inner.lock();
        let result = core.purge_expired();
        core.finish(result)
    }

    pub fn flush(&self) -> Result<(), CacheError> {
        let mut core = self.inner.lock();
        let result = core.flush();
        core.finish(result)
    }

    pub fn stats(&self) -> CacheStats {
        self.inner.lock().stats()
    }

    pub fn last_status(&self) -> Status {
        self.inner.lock().last_status()
    }

    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        self.inner.lock().check_invariants()
    }

    /// Runs `f` against the payload store with the cache lock held.
    pub fn with_payload_store<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        f(self.inner.lock().payload_store())
    }

    /// Flushes every entry and drops the store.
    pub fn cleanup(self) -> Result<(), CacheError> {
        let mut core = self.inner.into_inner();
        let result = core.flush();
        tracing::debug!("cache store cleaned up");
        result
    }
}

impl<S: PayloadStore> fmt::Debug for CacheStore<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let core = self.inner.lock();
        f.debug_struct("CacheStore")
            .field("policy", &core.policy())
            .field("len", &core.len())
            .field("max_entries", &core.max_entries())
            .finish_non_exhaustive()
    }
}

impl<S: PayloadStore> MetricsSnapshotProvider<CacheStats> for CacheStore<S> {
    fn snapshot(&self) -> CacheStats {
        self.stats()
    }
}
