use crate::error::CacheError;
use crate::store::traits::PayloadStore;

/// Keeps each payload in its own boxed slice on the global heap.
///
/// Allocation failure is reported as [`CacheError::OutOfMemory`] instead of
/// aborting the process.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeapStore;

impl PayloadStore for HeapStore {
    type Handle = Box<[u8]>;

    fn store(&self, bytes: &[u8]) -> Result<Self::Handle, CacheError> {
        let mut buf = Vec::new();
        buf.try_reserve_exact(bytes.len())
            .map_err(|_| CacheError::OutOfMemory)?;
        buf.extend_from_slice(bytes);
        Ok(buf.into_boxed_slice())
    }

    fn load(&self, handle: &Self::Handle, out: &mut [u8]) -> Result<(), CacheError> {
        let available = out.len();
        out.get_mut(..handle.len())
            .ok_or(CacheError::BufferTooSmall {
                needed: handle.len(),
                available,
            })?
            .copy_from_slice(handle);
        Ok(())
    }

    fn release(&self, handle: Self::Handle) -> Result<(), CacheError> {
        drop(handle);
        Ok(())
    }

    fn len(handle: &Self::Handle) -> usize {
        handle.len()
    }
}
