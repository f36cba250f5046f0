//! Raw backing memory for pools.
//!
//! This is the only module in the crate that touches raw memory. Everything
//! above it sees an arena as a bounds-checked `[u8]`.
//!
//! ## Backings
//!
//! ```text
//!   Heap (default pools)
//!   ┌──────────────────────────────────────────────┐
//!   │ std::alloc::alloc_zeroed(len, ARENA_ALIGN)   │
//!   └──────────────────────────────────────────────┘
//!
//!   Mapped (protected pools, unix)
//!   ┌───────────┬──────────────────────────────┬───────────┐
//!   │ PROT_NONE │ PROT_READ | PROT_WRITE       │ PROT_NONE │
//!   │ 1 page    │ len rounded up to pages      │ 1 page    │
//!   └───────────┴──────────────────────────────┴───────────┘
//!               ▲
//!               └── base
//! ```
//!
//! Touching either guard page faults, so a linear overrun off the end of a
//! protected arena cannot silently reach a neighbouring allocation.

use std::alloc::{self, Layout};
use std::ptr::NonNull;

/// Alignment of every arena base. Matches the block alignment so payload
/// offsets that are multiples of it are also aligned addresses.
pub const ARENA_ALIGN: usize = 16;

#[derive(Debug)]
enum Backing {
    Heap { layout: Layout },
    #[cfg(unix)]
    Mapped {
        map_base: NonNull<u8>,
        map_len: usize,
    },
}

/// One contiguous byte region. Never resized.
#[derive(Debug)]
pub struct Arena {
    base: NonNull<u8>,
    len: usize,
    backing: Backing,
}

// SAFETY: the arena exclusively owns its region; all access goes through
// `&self`/`&mut self`, and the allocator serializes those behind its lock.
unsafe impl Send for Arena {}
unsafe impl Sync for Arena {}

impl Arena {
    /// Acquires a zeroed region of `len` bytes from the global allocator.
    pub fn heap(len: usize) -> Option<Self> {
        if len == 0 {
            return None;
        }
        let layout = Layout::from_size_align(len, ARENA_ALIGN).ok()?;
        // SAFETY: layout has non-zero size.
        let raw = unsafe { alloc::alloc_zeroed(layout) };
        let base = NonNull::new(raw)?;
        Some(Self {
            base,
            len,
            backing: Backing::Heap { layout },
        })
    }

    /// Acquires a page-protected region: an anonymous mapping with an
    /// inaccessible guard page on each side. Falls back to [`Arena::heap`]
    /// when mapping is unavailable.
    pub fn protected(len: usize) -> Option<Self> {
        #[cfg(unix)]
        {
            if let Some(arena) = Self::mapped(len) {
                return Some(arena);
            }
            tracing::warn!(len, "mmap unavailable for protected pool, using heap");
        }
        Self::heap(len)
    }

    #[cfg(unix)]
    fn mapped(len: usize) -> Option<Self> {
        if len == 0 {
            return None;
        }
        let page = page_size();
        let body = len.checked_add(page - 1)? & !(page - 1);
        let map_len = body.checked_add(2 * page)?;

        // SAFETY: anonymous private mapping, no file descriptor involved.
        let raw = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                map_len,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
                -1,
                0,
            )
        };
        if raw == libc::MAP_FAILED {
            return None;
        }
        let map_base = NonNull::new(raw.cast::<u8>())?;

        // SAFETY: both guard ranges lie inside the mapping created above.
        let guarded = unsafe {
            let tail = map_base.as_ptr().add(page + body);
            libc::mprotect(raw, page, libc::PROT_NONE) == 0
                && libc::mprotect(tail.cast(), page, libc::PROT_NONE) == 0
        };
        if !guarded {
            // SAFETY: unmapping exactly what was mapped.
            unsafe { libc::munmap(raw, map_len) };
            return None;
        }

        // SAFETY: `page` is inside the mapping and page aligned.
        let base = unsafe { NonNull::new_unchecked(map_base.as_ptr().add(page)) };
        Some(Self {
            base,
            len,
            backing: Backing::Mapped { map_base, map_len },
        })
    }

    /// Usable length in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` when the arena came from an mmap'd, guarded mapping.
    pub fn is_mapped(&self) -> bool {
        !matches!(self.backing, Backing::Heap { .. })
    }

    /// Start address of the usable region.
    #[inline]
    pub fn base(&self) -> NonNull<u8> {
        self.base
    }

    /// Offset of `addr` within this arena, if it lies inside it.
    #[inline]
    pub fn offset_of(&self, addr: usize) -> Option<usize> {
        let start = self.base.as_ptr() as usize;
        (addr >= start && addr < start + self.len).then(|| addr - start)
    }

    /// Address of the byte at `offset`.
    #[inline]
    pub fn ptr_at(&self, offset: usize) -> Option<NonNull<u8>> {
        if offset >= self.len {
            return None;
        }
        // SAFETY: offset is in bounds of the region.
        Some(unsafe { NonNull::new_unchecked(self.base.as_ptr().add(offset)) })
    }

    #[inline]
    pub fn bytes(&self) -> &[u8] {
        // SAFETY: base..base+len is owned, initialized (zeroed or written) memory.
        unsafe { std::slice::from_raw_parts(self.base.as_ptr(), self.len) }
    }

    #[inline]
    pub fn bytes_mut(&mut self) -> &mut [u8] {
        // SAFETY: as above, and `&mut self` guarantees exclusive access.
        unsafe { std::slice::from_raw_parts_mut(self.base.as_ptr(), self.len) }
    }
}

impl Drop for Arena {
    fn drop(&mut self) {
        match self.backing {
            // SAFETY: allocated in `heap` with this exact layout.
            Backing::Heap { layout } => unsafe { alloc::dealloc(self.base.as_ptr(), layout) },
            #[cfg(unix)]
            // SAFETY: unmapping exactly what `mapped` mapped.
            Backing::Mapped { map_base, map_len } => unsafe {
                libc::munmap(map_base.as_ptr().cast(), map_len);
            },
        }
    }
}

#[cfg(unix)]
fn page_size() -> usize {
    // SAFETY: sysconf has no preconditions.
    let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if size <= 0 { 4096 } else { size as usize }
}
