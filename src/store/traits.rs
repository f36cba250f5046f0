//! Storage seam between the cache and the memory that holds its values.
//!
//! The cache owns ordering, expiry and the key index; a payload store owns
//! bytes. Keeping the two apart lets one cache implementation run on the
//! global heap or on a pool allocator without knowing which.

use crate::error::CacheError;

/// Where cache payload bytes live.
///
/// Calls arrive with the cache lock held, so implementations may take their
/// own locks but must never call back into a cache.
pub trait PayloadStore: Send + Sync {
    /// Owned reference to one stored payload.
    type Handle: Send;

    /// Copies `bytes` into fresh storage.
    fn store(&self, bytes: &[u8]) -> Result<Self::Handle, CacheError>;

    /// Copies the payload into the front of `out`.
    ///
    /// Fails with [`CacheError::BufferTooSmall`] when `out` is shorter than
    /// [`len`](Self::len).
    fn load(&self, handle: &Self::Handle, out: &mut [u8]) -> Result<(), CacheError>;

    /// Returns the storage behind `handle`.
    fn release(&self, handle: Self::Handle) -> Result<(), CacheError>;

    /// Payload length in bytes.
    fn len(handle: &Self::Handle) -> usize;
}
