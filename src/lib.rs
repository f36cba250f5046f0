//! memkit: a pool allocator and a bounded TTL cache with LRU/LFU eviction.
//!
//! The allocator (`pool`) carves fixed arenas into validated, tagged blocks.
//! The cache (`cache`) keeps byte values in a bounded, ordered list and
//! stores their payloads through a `store::PayloadStore`, either on the heap
//! or in a pool allocator.
//!
//! See `DESIGN.md` for internal architecture and invariants.

pub mod builder;
pub mod cache;
pub mod clock;
pub mod ds;
pub mod error;
pub mod limits;
pub mod metrics;
pub mod policy;
pub mod pool;
pub mod prelude;
pub mod store;

pub use crate::cache::{CacheStore, ShardedCacheStore};
pub use crate::error::{AllocError, CacheError, Status};
pub use crate::policy::EvictionPolicy;
pub use crate::pool::PoolAllocator;
