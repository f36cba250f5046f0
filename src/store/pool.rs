use std::sync::Arc;

use crate::error::CacheError;
use crate::pool::{Handle, PoolAllocator};
use crate::store::traits::PayloadStore;

/// Keeps each payload in a block of a shared [`PoolAllocator`].
///
/// The allocator is locked after the cache, never before. Allocator
/// corruption surfaces as [`CacheError::Corruption`]; exhaustion and a full
/// pool table surface as [`CacheError::OutOfMemory`]. An allocator that was
/// cleaned up under the cache reports [`CacheError::Uninitialized`].
#[derive(Debug, Clone)]
pub struct PoolStore {
    allocator: Arc<PoolAllocator>,
}

impl PoolStore {
    pub fn new(allocator: Arc<PoolAllocator>) -> Self {
        Self { allocator }
    }

    pub fn allocator(&self) -> &Arc<PoolAllocator> {
        &self.allocator
    }
}

impl PayloadStore for PoolStore {
    type Handle = Handle;

    fn store(&self, bytes: &[u8]) -> Result<Handle, CacheError> {
        let handle = self.allocator.allocate(bytes.len())?;
        if let Err(err) = self.allocator.write(&handle, 0, bytes) {
            if let Err(free_err) = self.allocator.free(handle) {
                tracing::error!(error = %free_err, "failed to free payload block after write error");
            }
            return Err(err.into());
        }
        Ok(handle)
    }

    fn load(&self, handle: &Handle, out: &mut [u8]) -> Result<(), CacheError> {
        let available = out.len();
        let dst = out.get_mut(..handle.len()).ok_or(CacheError::BufferTooSmall {
            needed: handle.len(),
            available,
        })?;
        self.allocator.read(handle, 0, dst)?;
        Ok(())
    }

    fn release(&self, handle: Handle) -> Result<(), CacheError> {
        self.allocator.free(handle)?;
        Ok(())
    }

    fn len(handle: &Handle) -> usize {
        handle.len()
    }
}
