//! Pool-based memory allocator.
//!
//! ## Architecture
//!
//! ```text
//!   ┌──────────────────────────────────────────────────────────────────────┐
//!   │                         PoolAllocator                                │
//!   │                                                                      │
//!   │   Mutex<AllocatorState>  (one lock for every pool)                   │
//!   │   ┌────────────────────────────────────────────────────────────────┐ │
//!   │   │ pools (creation order)                                         │ │
//!   │   │   Pool 0 (default) ── Arena ── [hdr|A][hdr|B free][hdr|C]      │ │
//!   │   │   Pool 1 (growable) ─ Arena ── [hdr|free ................]     │ │
//!   │   │   Pool 2 (protected) Arena ── guard page │ blocks │ guard page │ │
//!   │   └────────────────────────────────────────────────────────────────┘ │
//!   │   metrics, last status                                               │
//!   └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! | Module        | Role                                                   |
//! |---------------|--------------------------------------------------------|
//! | `arena`       | Raw backing memory (the only `unsafe` code)            |
//! | `block`       | Header encoding, tag and guard checks, geometry        |
//! | `directory`   | One pool: validated walk, first fit, split, coalesce   |
//! | `allocator`   | Pool table, lock, lifecycle, stats                     |
//!
//! ## Example
//!
//! ```
//! use memkit::pool::PoolAllocator;
//!
//! let allocator = PoolAllocator::with_pool_size(4096).unwrap();
//! let handle = allocator.allocate(100).unwrap();
//! allocator.write(&handle, 0, b"scratch").unwrap();
//!
//! let mut buf = [0u8; 7];
//! allocator.read(&handle, 0, &mut buf).unwrap();
//! assert_eq!(&buf, b"scratch");
//!
//! allocator.free(handle).unwrap();
//! assert_eq!(allocator.stats().used_size, 0);
//! ```

pub mod allocator;
pub mod arena;
pub mod block;
pub mod directory;

use std::fmt;
use std::ptr::NonNull;

pub use allocator::{AllocatorConfig, PoolAllocator};
pub use directory::{BlockInfo, PoolReport};

/// Identifier of a pool within one allocator. The default pool is
/// [`PoolId::DEFAULT`]; later pools get increasing ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PoolId(pub(crate) u32);

impl PoolId {
    pub const DEFAULT: PoolId = PoolId(0);

    pub fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for PoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

bitflags::bitflags! {
    /// Pool creation flags. The empty set is the default pool kind.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PoolFlags: u32 {
        /// When every pool is exhausted, the allocator may add another pool
        /// modelled on this one.
        const GROWABLE = 1 << 0;
        /// Back the arena with an mmap'd region flanked by inaccessible
        /// guard pages instead of heap memory.
        const PROTECTED = 1 << 1;
    }
}

/// Address of a live allocation.
///
/// A handle is only an address plus the requested length. It stays valid
/// until it is freed or its pool is destroyed; the allocator re-validates the
/// owning block on every operation that takes one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle {
    ptr: NonNull<u8>,
    len: usize,
}

// SAFETY: a handle is an address; dereferencing it is the caller's
// responsibility and all allocator-side access happens under its lock.
unsafe impl Send for Handle {}
unsafe impl Sync for Handle {}

impl Handle {
    pub(crate) fn new(ptr: NonNull<u8>, len: usize) -> Self {
        Self { ptr, len }
    }

    /// Raw payload address.
    ///
    /// Writing through this pointer is only sound while the allocation is
    /// live and no allocator call runs concurrently; prefer
    /// [`PoolAllocator::write`] and [`PoolAllocator::read`].
    #[inline]
    pub fn as_ptr(&self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    /// Requested length in bytes. The block may be larger.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}
