//! Pool table, lifecycle and the allocator lock.
//!
//! ## Concurrency Model
//!
//! ```text
//!   Thread 1            Thread 2            Thread 3
//!      │ allocate(64)      │ free(h)           │ stats()
//!      ▼                   ▼                   ▼
//!   ┌──────────────────────────────────────────────────────┐
//!   │               Mutex<AllocatorState>                  │
//!   │  every pool, every counter, the last status          │
//!   │  readers lock too: walks race with splits otherwise  │
//!   └──────────────────────────────────────────────────────┘
//! ```
//!
//! Validation runs inside the critical section, so no mutation can race a
//! corruption check.
//!
//! ## Lifecycle
//!
//! `new` → `init(pool_size)` → operations → `cleanup()` → `init` again.
//! Calling `init` twice without `cleanup` fails with `AlreadyInitialized`;
//! using an allocator before `init` fails with `Uninitialized`.

use parking_lot::Mutex;

use crate::builder::AllocatorBuilder;
use crate::error::{AllocError, InvariantError, Status};
use crate::limits::{MAX_ALLOC_SIZE, MAX_POOL_SIZE, MAX_POOLS};
use crate::metrics::metrics_impl::AllocatorMetrics;
use crate::metrics::snapshot::AllocatorStats;
use crate::metrics::traits::{AllocatorMetricsRecorder, MetricsSnapshotProvider};
use crate::pool::block::{BlockLayout, align_up};
use crate::pool::directory::{Pool, PoolReport};
use crate::pool::{Handle, PoolFlags, PoolId};

/// Runtime allocator options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocatorConfig {
    /// Bracket every payload with guard bytes checked on free and on every
    /// directory walk. Defaults to on in debug and test builds.
    pub guard_bytes: bool,
    /// Flags of the default pool created by `init`.
    pub default_flags: PoolFlags,
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self {
            guard_bytes: cfg!(debug_assertions),
            default_flags: PoolFlags::empty(),
        }
    }
}

#[derive(Debug, Default)]
struct AllocatorState {
    initialized: bool,
    pools: Vec<Pool>,
    next_id: u32,
    metrics: AllocatorMetrics,
    last_status: Status,
}

impl AllocatorState {
    fn used(&self) -> usize {
        self.pools.iter().map(Pool::used).sum()
    }

    fn pool_for_addr(&self, addr: usize) -> Option<usize> {
        self.pools.iter().position(|p| p.offset_of(addr).is_some())
    }

    fn finish<T>(&mut self, result: Result<T, AllocError>) -> Result<T, AllocError> {
        self.last_status = Status::of(&result);
        if let Err(err) = &result
            && err.is_corruption()
        {
            self.metrics.record_corruption();
            tracing::error!(error = %err, "allocator corruption detected");
        }
        result
    }
}

/// Bounded pool allocator. Explicit instance; share it with `Arc`.
#[derive(Debug)]
pub struct PoolAllocator {
    config: AllocatorConfig,
    layout: BlockLayout,
    state: Mutex<AllocatorState>,
}

impl Default for PoolAllocator {
    fn default() -> Self {
        Self::new(AllocatorConfig::default())
    }
}

impl PoolAllocator {
    /// Creates an uninitialized allocator.
    pub fn new(config: AllocatorConfig) -> Self {
        Self {
            config,
            layout: BlockLayout::new(config.guard_bytes),
            state: Mutex::new(AllocatorState::default()),
        }
    }

    pub fn builder() -> AllocatorBuilder {
        AllocatorBuilder::new()
    }

    /// Creates and initializes an allocator with the default configuration.
    pub fn with_pool_size(pool_size: usize) -> Result<Self, AllocError> {
        let allocator = Self::default();
        allocator.init(pool_size)?;
        Ok(allocator)
    }

    #[inline]
    pub fn config(&self) -> AllocatorConfig {
        self.config
    }

    /// Bytes each block costs beyond its payload (header plus guards).
    #[inline]
    pub fn block_overhead(&self) -> usize {
        self.layout.overhead()
    }

    /// Creates the default pool.
    pub fn init(&self, pool_size: usize) -> Result<(), AllocError> {
        let mut state = self.state.lock();
        let result = self.init_locked(&mut state, pool_size);
        state.finish(result)
    }

    fn init_locked(&self, state: &mut AllocatorState, pool_size: usize) -> Result<(), AllocError> {
        if state.initialized {
            return Err(AllocError::AlreadyInitialized);
        }
        let pool = Pool::create(PoolId::DEFAULT, pool_size, self.config.default_flags, self.layout)?;
        tracing::debug!(pool = %pool.id(), size = pool.size(), "allocator initialized");
        state.pools.push(pool);
        state.next_id = 1;
        state.initialized = true;
        state.metrics.record_pool_created();
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.state.lock().initialized
    }

    /// Allocates at least `size` bytes.
    ///
    /// Pools are tried in creation order, each validated in full before it
    /// is searched first-fit.
    pub fn allocate(&self, size: usize) -> Result<Handle, AllocError> {
        let mut state = self.state.lock();
        let result = self.allocate_locked(&mut state, size);
        state.finish(result)
    }

    fn allocate_locked(&self, state: &mut AllocatorState, size: usize) -> Result<Handle, AllocError> {
        if !state.initialized {
            return Err(AllocError::Uninitialized);
        }
        if size == 0 || size > MAX_ALLOC_SIZE {
            return Err(AllocError::InvalidSize(size));
        }
        let aligned = align_up(size).ok_or(AllocError::InvalidSize(size))?;

        for index in 0..state.pools.len() {
            if let Some(handle) = Self::allocate_in(state, index, aligned, size)? {
                return Ok(handle);
            }
        }

        if let Some(index) = self.grow(state, aligned)?
            && let Some(handle) = Self::allocate_in(state, index, aligned, size)?
        {
            return Ok(handle);
        }

        state.metrics.record_alloc_failure();
        tracing::warn!(size, pools = state.pools.len(), "allocation failed: out of memory");
        Err(AllocError::OutOfMemory { requested: size })
    }

    fn allocate_in(
        state: &mut AllocatorState,
        index: usize,
        aligned: usize,
        size: usize,
    ) -> Result<Option<Handle>, AllocError> {
        let pool = &mut state.pools[index];
        let Some(payload) = pool.allocate(aligned)? else {
            return Ok(None);
        };
        let ptr = pool
            .ptr_at(payload)
            .ok_or(AllocError::InvalidParam("payload outside arena"))?;
        tracing::debug!(pool = %pool.id(), offset = payload, size, "allocated");

        let used = state.used();
        state.metrics.record_alloc(used);
        Ok(Some(Handle::new(ptr, size)))
    }

    /// Adds a pool modelled on the largest growable pool, if any and if the
    /// table has room. Returns its index.
    fn grow(&self, state: &mut AllocatorState, aligned: usize) -> Result<Option<usize>, AllocError> {
        if state.pools.len() >= MAX_POOLS {
            return Ok(None);
        }
        let Some(template) = state
            .pools
            .iter()
            .filter(|p| p.flags().contains(PoolFlags::GROWABLE))
            .max_by_key(|p| p.size())
        else {
            return Ok(None);
        };
        let needed = self.layout.footprint(aligned);
        if needed > MAX_POOL_SIZE {
            return Ok(None);
        }
        let size = template.size().max(needed);
        let flags = template.flags();
        match self.create_pool_locked(state, size, flags) {
            Ok(id) => {
                tracing::debug!(pool = %id, size, "grew pool table");
                Ok(Some(state.pools.len() - 1))
            },
            Err(err) => {
                tracing::warn!(error = %err, size, "pool growth failed");
                Ok(None)
            },
        }
    }

    /// Frees a live allocation.
    pub fn free(&self, handle: Handle) -> Result<(), AllocError> {
        self.free_ptr(handle.as_ptr())
    }

    /// Frees by raw payload address. A null pointer is a no-op success.
    pub fn free_ptr(&self, ptr: *mut u8) -> Result<(), AllocError> {
        let mut state = self.state.lock();
        let result = Self::free_locked(&mut state, ptr);
        state.finish(result)
    }

    fn free_locked(state: &mut AllocatorState, ptr: *mut u8) -> Result<(), AllocError> {
        if ptr.is_null() {
            return Ok(());
        }
        if !state.initialized {
            return Err(AllocError::Uninitialized);
        }
        let addr = ptr as usize;
        let index = state
            .pool_for_addr(addr)
            .ok_or(AllocError::InvalidParam("pointer not owned by any pool"))?;

        let pool = &mut state.pools[index];
        let payload = pool
            .offset_of(addr)
            .ok_or(AllocError::InvalidParam("pointer not owned by any pool"))?;
        let (footprint, skipped_merge) = pool.release(payload)?;
        let id = pool.id();
        tracing::debug!(pool = %id, offset = payload, footprint, "freed");

        if let Some(err) = skipped_merge {
            state.metrics.record_corruption();
            tracing::error!(error = %err, "forward coalesce skipped: successor failed validation");
        }
        state.metrics.record_free();
        Ok(())
    }

    /// Copies `data` into a live allocation at `offset`.
    pub fn write(&self, handle: &Handle, offset: usize, data: &[u8]) -> Result<(), AllocError> {
        let mut state = self.state.lock();
        let result = Self::with_payload(&mut state, handle, offset, data.len(), |payload| {
            payload.copy_from_slice(data)
        });
        state.finish(result)
    }

    /// Copies from a live allocation at `offset` into `buf`.
    pub fn read(&self, handle: &Handle, offset: usize, buf: &mut [u8]) -> Result<(), AllocError> {
        let mut state = self.state.lock();
        let result = Self::with_payload(&mut state, handle, offset, buf.len(), |payload| {
            buf.copy_from_slice(payload)
        });
        state.finish(result)
    }

    fn with_payload(
        state: &mut AllocatorState,
        handle: &Handle,
        offset: usize,
        len: usize,
        f: impl FnOnce(&mut [u8]),
    ) -> Result<(), AllocError> {
        if !state.initialized {
            return Err(AllocError::Uninitialized);
        }
        let addr = handle.as_ptr() as usize;
        let index = state
            .pool_for_addr(addr)
            .ok_or(AllocError::InvalidParam("handle not owned by any pool"))?;
        let pool = &mut state.pools[index];
        let payload = pool
            .offset_of(addr)
            .ok_or(AllocError::InvalidParam("handle not owned by any pool"))?;
        let (_, size) = pool.live_block(payload)?;

        let end = offset
            .checked_add(len)
            .filter(|&end| end <= size)
            .ok_or(AllocError::InvalidParam("access past end of allocation"))?;
        f(&mut pool.bytes_mut()[payload + offset..payload + end]);
        Ok(())
    }

    /// Adds a pool. Fails with `PoolTableFull` at [`MAX_POOLS`].
    pub fn create_pool(&self, size: usize, flags: PoolFlags) -> Result<PoolId, AllocError> {
        let mut state = self.state.lock();
        let result = if state.initialized {
            self.create_pool_locked(&mut state, size, flags)
        } else {
            Err(AllocError::Uninitialized)
        };
        state.finish(result)
    }

    fn create_pool_locked(
        &self,
        state: &mut AllocatorState,
        size: usize,
        flags: PoolFlags,
    ) -> Result<PoolId, AllocError> {
        if state.pools.len() >= MAX_POOLS {
            return Err(AllocError::PoolTableFull { max: MAX_POOLS });
        }
        let id = PoolId(state.next_id);
        let pool = Pool::create(id, size, flags, self.layout)?;
        tracing::debug!(pool = %id, size = pool.size(), ?flags, mapped = flags.contains(PoolFlags::PROTECTED), "pool created");
        state.pools.push(pool);
        state.next_id += 1;
        state.metrics.record_pool_created();
        Ok(id)
    }

    /// Releases a pool created with [`create_pool`](Self::create_pool).
    ///
    /// The default pool is only released by [`cleanup`](Self::cleanup).
    /// Live allocations in the pool become invalid; their handles are
    /// rejected afterwards.
    pub fn destroy_pool(&self, id: PoolId) -> Result<(), AllocError> {
        let mut state = self.state.lock();
        let result = Self::destroy_pool_locked(&mut state, id);
        state.finish(result)
    }

    fn destroy_pool_locked(state: &mut AllocatorState, id: PoolId) -> Result<(), AllocError> {
        if !state.initialized {
            return Err(AllocError::Uninitialized);
        }
        if id == PoolId::DEFAULT {
            return Err(AllocError::InvalidParam("the default pool is released by cleanup"));
        }
        let index = state
            .pools
            .iter()
            .position(|p| p.id() == id)
            .ok_or(AllocError::UnknownPool(id))?;
        let pool = state.pools.remove(index);
        if pool.live_blocks() > 0 {
            tracing::warn!(pool = %id, live = pool.live_blocks(), "destroying pool with live allocations");
        }
        tracing::debug!(pool = %id, size = pool.size(), "pool destroyed");
        state.metrics.record_pool_destroyed();
        Ok(())
    }

    /// `(used, total)` bytes across all pools.
    pub fn usage(&self) -> (usize, usize) {
        let state = self.state.lock();
        (state.used(), state.pools.iter().map(Pool::size).sum())
    }

    pub fn pool_count(&self) -> usize {
        self.state.lock().pools.len()
    }

    pub fn stats(&self) -> AllocatorStats {
        let state = self.state.lock();
        state.metrics.to_stats(
            state.pools.iter().map(Pool::size).sum(),
            state.used(),
            state.pools.len(),
            state.pools.iter().map(Pool::live_blocks).sum(),
        )
    }

    /// Per-pool, per-block dump. Fails on the first corrupt pool.
    pub fn dump(&self) -> Result<Vec<PoolReport>, AllocError> {
        let mut state = self.state.lock();
        let result = state.pools.iter().map(Pool::report).collect();
        state.finish(result)
    }

    /// Validates every pool without changing anything.
    pub fn validate(&self) -> Result<(), AllocError> {
        let mut state = self.state.lock();
        let result = state.pools.iter().try_for_each(|p| p.validate().map(|_| ()));
        state.finish(result)
    }

    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        let state = self.state.lock();
        if state.pools.len() > MAX_POOLS {
            return Err(InvariantError::new(format!(
                "{} pools exceed the maximum of {}",
                state.pools.len(),
                MAX_POOLS
            )));
        }
        if state.initialized != !state.pools.is_empty() {
            return Err(InvariantError::new("pool table does not match lifecycle state"));
        }
        state.pools.iter().try_for_each(Pool::check_invariants)
    }

    /// Status of the most recent operation.
    pub fn last_status(&self) -> Status {
        self.state.lock().last_status
    }

    /// Releases every pool and returns to the uninitialized state.
    pub fn cleanup(&self) {
        let mut state = self.state.lock();
        let pools = state.pools.len();
        state.pools.clear();
        state.initialized = false;
        state.next_id = 0;
        state.last_status = Status::Success;
        tracing::debug!(pools, "allocator cleaned up");
    }
}

impl MetricsSnapshotProvider<AllocatorStats> for PoolAllocator {
    fn snapshot(&self) -> AllocatorStats {
        self.stats()
    }
}
