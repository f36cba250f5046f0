//! Build-time limits governing the allocator and cache contracts.
//!
//! These are fixed at compile time. The only runtime knobs are the values
//! passed to `init`/`new` (pool sizes, entry counts), which are validated
//! against these bounds.

use std::time::Duration;

/// Maximum number of pools an allocator may hold at once, default pool included.
pub const MAX_POOLS: usize = 16;

/// Largest arena a single pool may request.
pub const MAX_POOL_SIZE: usize = 1 << 30;

/// Largest single allocation request. Leaves room for a block header and
/// both guards inside a pool of `MAX_POOL_SIZE`.
pub const MAX_ALLOC_SIZE: usize = MAX_POOL_SIZE - 64;

/// Keys must be strictly shorter than this many bytes.
pub const MAX_KEY_LEN: usize = 256;

/// Values must be strictly shorter than this many bytes.
pub const MAX_VALUE_LEN: usize = 1 << 20;

/// Shortest accepted time-to-live.
pub const MIN_TTL: Duration = Duration::from_secs(1);

/// Longest accepted time-to-live.
pub const MAX_TTL: Duration = Duration::from_secs(86_400);

/// Hard ceiling on `max_entries` for a cache store.
pub const MAX_ENTRIES: usize = 1 << 20;

/// Hard ceiling on the shard count of a sharded cache.
pub const MAX_SHARDS: usize = 64;
