//! Single-threaded cache core: ordered entry list, key index, payload store.
//!
//! ## Architecture
//!
//! ```text
//!   ┌──────────────────────────────────────────────────────────────────────┐
//!   │                          CacheCore<S>                                │
//!   │                                                                      │
//!   │   FxHashMap<String, SlotId>          IntrusiveList<Entry<S::Handle>> │
//!   │   ┌──────────┬────────┐                                              │
//!   │   │ "cfg:a"  │ id_2 ──┼──┐    head ──► [id_2] ◄──► [id_0] ◄── tail   │
//!   │   │ "cfg:b"  │ id_0 ──┼──┼──────────────────────────┘  (evicted next)│
//!   │   └──────────┴────────┘  └──────────┘                                │
//!   │                                                                      │
//!   │   Entry { key, payload: S::Handle, size, expiry, access_count }      │
//!   │                      │                                               │
//!   │                      ▼                                               │
//!   │   S: PayloadStore (heap or pool allocator)                           │
//!   └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Operation Flow
//!
//! ```text
//!   set(k, v, ttl)
//!     known k ──► store new payload, swap, release old, count = 1, reposition
//!     new k   ──► full? evict tail ──► store payload ──► push head, count = 1,
//!                 reposition
//!
//!   get(k, out)
//!     missing        ──► miss, NotFound
//!     now >= expiry  ──► remove entry, release payload, miss, NotFound
//!     out too short  ──► BufferTooSmall
//!     otherwise      ──► copy, count += 1, reposition, hit
//! ```
//!
//! Expiry is lazy: nothing runs in the background. `purge_expired` sweeps on
//! demand.

use std::fmt;
use std::mem;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rustc_hash::FxHashMap;

use crate::cache::entry::Entry;
use crate::clock::Clock;
use crate::ds::{IntrusiveList, SlotId};
use crate::error::{CacheError, InvariantError, Status};
use crate::limits::{MAX_ENTRIES, MAX_KEY_LEN, MAX_TTL, MAX_VALUE_LEN, MIN_TTL};
use crate::metrics::metrics_impl::CacheMetrics;
use crate::metrics::snapshot::CacheStats;
use crate::metrics::traits::CacheMetricsRecorder;
use crate::policy::EvictionPolicy;
use crate::store::PayloadStore;

/// Argument checks shared by every `set`.
pub(crate) fn validate_entry(key: &str, value: &[u8], ttl: Duration) -> Result<(), CacheError> {
    if key.is_empty() {
        return Err(CacheError::InvalidParam("key is empty"));
    }
    if key.len() >= MAX_KEY_LEN {
        return Err(CacheError::InvalidParam("key too long"));
    }
    if value.is_empty() {
        return Err(CacheError::InvalidParam("value is empty"));
    }
    if value.len() >= MAX_VALUE_LEN {
        return Err(CacheError::InvalidParam("value too long"));
    }
    if !(MIN_TTL..=MAX_TTL).contains(&ttl) {
        return Err(CacheError::InvalidParam("ttl out of range"));
    }
    Ok(())
}

pub(crate) fn validate_capacity(max_entries: usize) -> Result<(), CacheError> {
    if max_entries == 0 || max_entries > MAX_ENTRIES {
        return Err(CacheError::InvalidParam("max_entries out of range"));
    }
    Ok(())
}

pub struct CacheCore<S: PayloadStore> {
    policy: EvictionPolicy,
    max_entries: usize,
    list: IntrusiveList<Entry<S::Handle>>,
    index: FxHashMap<String, SlotId>,
    store: S,
    clock: Arc<dyn Clock>,
    metrics: CacheMetrics,
    last_status: Status,
}

impl<S: PayloadStore> CacheCore<S> {
    pub fn new(
        policy: EvictionPolicy,
        max_entries: usize,
        store: S,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, CacheError> {
        validate_capacity(max_entries)?;
        Ok(Self {
            policy,
            max_entries,
            list: IntrusiveList::new(),
            index: FxHashMap::default(),
            store,
            clock,
            metrics: CacheMetrics::default(),
            last_status: Status::Success,
        })
    }

    #[inline]
    pub fn policy(&self) -> EvictionPolicy {
        self.policy
    }

    #[inline]
    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.list.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn payload_store(&self) -> &S {
        &self.store
    }

    /// Inserts or replaces `key`.
    pub fn set(&mut self, key: &str, value: &[u8], ttl: Duration) -> Result<(), CacheError> {
        validate_entry(key, value, ttl)?;
        let expiry = self.clock.now() + ttl;

        if let Some(&id) = self.index.get(key) {
            return self.update(id, value, expiry);
        }

        let payload = self.store_for_insert(value)?;
        let id = self
            .list
            .push_front(Entry::new(key.to_owned(), payload, value.len(), expiry));
        self.index.insert(key.to_owned(), id);
        self.policy.reposition(&mut self.list, id);
        self.metrics.record_insert_new();
        tracing::debug!(key, size = value.len(), "cache insert");
        Ok(())
    }

    /// Stores `value` and makes room for it. A failed store evicts nothing,
    /// unless the tail's own block is large enough to take the value.
    fn store_for_insert(&mut self, value: &[u8]) -> Result<S::Handle, CacheError> {
        let full = self.list.len() >= self.max_entries;
        match self.store.store(value) {
            Ok(payload) => {
                if full && let Err(err) = self.evict_tail() {
                    if let Err(release_err) = self.store.release(payload) {
                        tracing::error!(error = %release_err, "failed to release payload after eviction error");
                    }
                    return Err(err);
                }
                Ok(payload)
            },
            Err(CacheError::OutOfMemory)
                if full && self.list.back().is_some_and(|e| e.size >= value.len()) =>
            {
                self.evict_tail()?;
                self.store.store(value)
            },
            Err(err) => Err(err),
        }
    }

    fn update(&mut self, id: SlotId, value: &[u8], expiry: Instant) -> Result<(), CacheError> {
        let payload = self.store.store(value)?;
        let old = match self.list.get_mut(id) {
            Some(entry) => {
                entry.size = value.len();
                entry.expiry = expiry;
                entry.access_count = 1;
                mem::replace(&mut entry.payload, payload)
            },
            None => {
                self.store.release(payload)?;
                return Err(CacheError::NotFound);
            },
        };
        self.policy.reposition(&mut self.list, id);
        self.metrics.record_insert_update();
        self.store.release(old)
    }

    /// Copies the value for `key` into `out` and returns its length.
    pub fn get(&mut self, key: &str, out: &mut [u8]) -> Result<usize, CacheError> {
        let id = self.lookup(key)?;
        let entry = self.list.get(id).ok_or(CacheError::NotFound)?;
        if out.len() < entry.size {
            return Err(CacheError::BufferTooSmall {
                needed: entry.size,
                available: out.len(),
            });
        }
        self.store.load(&entry.payload, out)?;
        let size = entry.size;
        self.record_hit(id);
        Ok(size)
    }

    /// Like [`get`](Self::get) but allocates a buffer of the right size.
    pub fn get_owned(&mut self, key: &str) -> Result<Vec<u8>, CacheError> {
        let id = self.lookup(key)?;
        let entry = self.list.get(id).ok_or(CacheError::NotFound)?;
        let mut out = Vec::new();
        out.try_reserve_exact(entry.size)
            .map_err(|_| CacheError::OutOfMemory)?;
        out.resize(entry.size, 0);
        self.store.load(&entry.payload, &mut out)?;
        self.record_hit(id);
        Ok(out)
    }

    /// Resolves `key` to a live entry, expiring it on the way if needed.
    fn lookup(&mut self, key: &str) -> Result<SlotId, CacheError> {
        if key.is_empty() {
            return Err(CacheError::InvalidParam("key is empty"));
        }
        let Some(&id) = self.index.get(key) else {
            self.metrics.record_get_miss();
            return Err(CacheError::NotFound);
        };
        let now = self.clock.now();
        if self.list.get(id).is_some_and(|e| e.is_expired(now)) {
            self.remove_slot(id)?;
            self.metrics.record_expired_entry();
            self.metrics.record_get_miss();
            tracing::debug!(key, "cache entry expired");
            return Err(CacheError::NotFound);
        }
        Ok(id)
    }

    fn record_hit(&mut self, id: SlotId) {
        if let Some(entry) = self.list.get_mut(id) {
            entry.access_count = entry.access_count.saturating_add(1);
        }
        self.policy.reposition(&mut self.list, id);
        self.metrics.record_get_hit();
    }

    pub fn delete(&mut self, key: &str) -> Result<(), CacheError> {
        if key.is_empty() {
            return Err(CacheError::InvalidParam("key is empty"));
        }
        let id = *self.index.get(key).ok_or(CacheError::NotFound)?;
        self.remove_slot(id)?;
        tracing::debug!(key, "cache delete");
        Ok(())
    }

    /// Whether `key` has a live entry. Does not count as an access.
    pub fn contains(&self, key: &str) -> bool {
        let now = self.clock.now();
        self.entry(key).is_some_and(|e| !e.is_expired(now))
    }

    /// Time left before `key` expires, or `None` if it has no live entry.
    pub fn ttl_remaining(&self, key: &str) -> Option<Duration> {
        let now = self.clock.now();
        self.entry(key)
            .filter(|e| !e.is_expired(now))
            .map(|e| e.expiry - now)
    }

    /// Access count of `key`, expired or not.
    pub fn access_count(&self, key: &str) -> Option<u64> {
        self.entry(key).map(|e| e.access_count)
    }

    fn entry(&self, key: &str) -> Option<&Entry<S::Handle>> {
        self.index.get(key).and_then(|&id| self.list.get(id))
    }

    /// Keys from head (kept longest) to tail (evicted next).
    pub fn keys(&self) -> Vec<String> {
        self.list.iter().map(|e| e.key.clone()).collect()
    }

    /// Removes every expired entry. Returns how many were removed.
    pub fn purge_expired(&mut self) -> Result<usize, CacheError> {
        let now = self.clock.now();
        let expired: Vec<SlotId> = self
            .list
            .iter_entries()
            .filter(|(_, e)| e.is_expired(now))
            .map(|(id, _)| id)
            .collect();
        for &id in &expired {
            let key = self.remove_slot(id)?;
            self.metrics.record_expired_entry();
            tracing::debug!(key = %key, "cache entry expired");
        }
        Ok(expired.len())
    }

    /// Drops every entry and returns all payloads to the store.
    ///
    /// Every payload is released even if some releases fail; the first
    /// failure is returned.
    pub fn flush(&mut self) -> Result<(), CacheError> {
        let mut first_err = None;
        let store = &self.store;
        let count = self.list.len();
        self.list.drain_with(|entry| {
            if let Err(err) = store.release(entry.payload) {
                first_err.get_or_insert(err);
            }
        });
        self.index.clear();
        self.metrics.record_flush();
        tracing::debug!(entries = count, "cache flushed");
        first_err.map_or(Ok(()), Err)
    }

    fn evict_tail(&mut self) -> Result<(), CacheError> {
        let Some(id) = self.list.back_id() else {
            return Ok(());
        };
        let key = self.remove_slot(id)?;
        self.metrics.record_evicted_entry();
        tracing::debug!(key = %key, policy = %self.policy, "cache eviction");
        Ok(())
    }

    /// Unlinks `id`, drops its index entry and releases its payload.
    fn remove_slot(&mut self, id: SlotId) -> Result<String, CacheError> {
        let entry = self.list.remove(id).ok_or(CacheError::NotFound)?;
        self.index.remove(&entry.key);
        self.store.release(entry.payload)?;
        Ok(entry.key)
    }

    pub fn stats(&self) -> CacheStats {
        self.metrics.to_stats(self.list.len(), self.max_entries)
    }

    #[inline]
    pub fn last_status(&self) -> Status {
        self.last_status
    }

    /// Records the outcome of a public operation.
    pub(crate) fn finish<T>(&mut self, result: Result<T, CacheError>) -> Result<T, CacheError> {
        self.last_status = Status::of(&result);
        if let Err(err) = &result
            && err.is_corruption()
        {
            tracing::error!(error = %err, "cache payload storage corrupted");
        }
        result
    }

    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        self.list.check_invariants()?;
        if self.index.len() != self.list.len() {
            return Err(InvariantError::new(format!(
                "index holds {} keys but list holds {} entries",
                self.index.len(),
                self.list.len()
            )));
        }
        if self.list.len() > self.max_entries {
            return Err(InvariantError::new(format!(
                "{} entries exceed max_entries {}",
                self.list.len(),
                self.max_entries
            )));
        }
        for (id, entry) in self.list.iter_entries() {
            if self.index.get(&entry.key) != Some(&id) {
                return Err(InvariantError::new(format!(
                    "key {:?} not indexed to its slot",
                    entry.key
                )));
            }
            if S::len(&entry.payload) != entry.size {
                return Err(InvariantError::new(format!(
                    "key {:?} records {} bytes but payload holds {}",
                    entry.key,
                    entry.size,
                    S::len(&entry.payload)
                )));
            }
            if entry.access_count == 0 {
                return Err(InvariantError::new(format!(
                    "key {:?} has a zero access count",
                    entry.key
                )));
            }
        }
        if !self.policy.is_ordered(&self.list) {
            return Err(InvariantError::new(format!(
                "list order violates {} policy",
                self.policy
            )));
        }
        Ok(())
    }
}

impl<S: PayloadStore> fmt::Debug for CacheCore<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheCore")
            .field("policy", &self.policy)
            .field("max_entries", &self.max_entries)
            .field("len", &self.list.len())
            .field("clock", &self.clock)
            .field("last_status", &self.last_status)
            .finish()
    }
}
