//! # Metrics Trait Hierarchy
//!
//! Recording, snapshotting and export are split into small traits so the
//! allocator and cache only ever write counters, and monitoring code only
//! ever reads them.
//!
//! ## Architecture
//!
//! ```text
//!   ┌─────────────────────────────┐     ┌─────────────────────────────┐
//!   │  AllocatorMetricsRecorder   │     │    CacheMetricsRecorder     │
//!   │  alloc/free/failure         │     │  hit/miss/insert/update     │
//!   │  corruption/pool lifecycle  │     │  evict/expire/clear         │
//!   └──────────────┬──────────────┘     └──────────────┬──────────────┘
//!                  │ (under the owner's lock)          │
//!                  ▼                                   ▼
//!   ┌──────────────────────────────┐    ┌──────────────────────────────┐
//!   │ MetricsSnapshotProvider<S>   │───►│ MetricsExporter<S>           │
//!   │ AllocatorStats / CacheStats  │    │ Prometheus text              │
//!   └──────────────────────────────┘    └──────────────────────────────┘
//! ```
//!
//! Recorders take `&mut self`: counters live inside the state the owning
//! lock already protects, so no atomics are involved.

/// Counters written by the pool allocator.
pub trait AllocatorMetricsRecorder {
    /// A block was handed out; `used_after` is the allocator-wide used size.
    fn record_alloc(&mut self, used_after: usize);
    fn record_free(&mut self);
    fn record_alloc_failure(&mut self);
    fn record_corruption(&mut self);
    fn record_pool_created(&mut self);
    fn record_pool_destroyed(&mut self);
}

/// Counters written by a cache store.
pub trait CacheMetricsRecorder {
    fn record_get_hit(&mut self);
    fn record_get_miss(&mut self);
    fn record_insert_new(&mut self);
    fn record_insert_update(&mut self);
    fn record_evicted_entry(&mut self);
    fn record_expired_entry(&mut self);
    fn record_flush(&mut self);
}

/// Snapshot provider for tests, benches and exporters.
pub trait MetricsSnapshotProvider<S> {
    fn snapshot(&self) -> S;
}

/// Export/publish metrics to production monitoring backends.
pub trait MetricsExporter<S> {
    fn export(&self, snapshot: &S);
}
