pub use crate::builder::{AllocatorBuilder, CacheBuilder};
pub use crate::cache::{CacheStore, ShardedCacheStore};
pub use crate::clock::{Clock, ManualClock, SystemClock};
pub use crate::ds::{IntrusiveList, ShardSelector, SlotArena, SlotId};
pub use crate::error::{AllocError, CacheError, CorruptionKind, InvariantError, Status};
#[cfg(feature = "metrics")]
pub use crate::metrics::exporter::PrometheusTextExporter;
pub use crate::metrics::snapshot::{AllocatorStats, CacheStats};
pub use crate::metrics::traits::{MetricsExporter, MetricsSnapshotProvider};
pub use crate::policy::EvictionPolicy;
pub use crate::pool::{AllocatorConfig, Handle, PoolAllocator, PoolFlags, PoolId};
pub use crate::store::{HeapStore, PayloadStore, PoolStore};
