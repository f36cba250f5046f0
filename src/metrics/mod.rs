//! Counters, snapshots and export for the allocator and the cache.
//!
//! Recording is always on; the Prometheus exporter is behind the `metrics`
//! feature.

pub mod metrics_impl;
pub mod snapshot;
pub mod traits;

#[cfg(feature = "metrics")]
pub mod exporter;
