//! A single pool: one arena plus the block directory threaded through it.
//!
//! ## Architecture
//!
//! ```text
//!   arena (Arena, `len` bytes)
//!   ┌──────────────┬──────────────────────┬──────────────┬───────────────┐
//!   │ hdr│ A (used)│ hdr│ B (free)        │ hdr│ C (used)│ hdr│ D (free) │
//!   └──────────────┴──────────────────────┴──────────────┴───────────────┘
//!    0 ──next──────► ──next──────────────► ──next───────► next: none
//! ```
//!
//! Blocks tile the arena: every `next` link equals the end of the current
//! block and the last block ends exactly at the arena length. Any other link
//! value is reported as corruption.
//!
//! ## Operations
//! - `allocate`: validate the whole directory, then first fit with splitting
//! - `release`: validate one block, mark it free, coalesce forward
//! - `validate` / `check_invariants` / `report`: read-only walks
//!
//! Pools are not synchronized; [`PoolAllocator`](super::PoolAllocator) owns
//! them behind its lock.

use std::fmt;
use std::ptr::NonNull;

use crate::error::{AllocError, CorruptionKind, InvariantError};
use crate::limits::MAX_POOL_SIZE;
use crate::pool::arena::Arena;
use crate::pool::block::{BlockHeader, BlockLayout, align_up};
use crate::pool::{PoolFlags, PoolId};

/// One entry of a directory dump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockInfo {
    /// Offset of the block header within the arena.
    pub offset: usize,
    /// Payload bytes.
    pub size: usize,
    pub free: bool,
}

/// Read-only dump of one pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolReport {
    pub id: PoolId,
    pub flags: PoolFlags,
    pub size: usize,
    pub used: usize,
    pub live_blocks: usize,
    pub mapped: bool,
    pub blocks: Vec<BlockInfo>,
}

impl PoolReport {
    /// Largest payload a single allocation could currently get from this pool.
    pub fn largest_free(&self) -> usize {
        self.blocks
            .iter()
            .filter(|b| b.free)
            .map(|b| b.size)
            .max()
            .unwrap_or(0)
    }
}

impl fmt::Display for PoolReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "pool {} flags={:?} size={} used={} live={} mapped={}",
            self.id, self.flags, self.size, self.used, self.live_blocks, self.mapped
        )?;
        for block in &self.blocks {
            writeln!(
                f,
                "  block @{:<8} size={:<8} {}",
                block.offset,
                block.size,
                if block.free { "free" } else { "used" }
            )?;
        }
        Ok(())
    }
}

#[derive(Debug)]
pub struct Pool {
    id: PoolId,
    flags: PoolFlags,
    arena: Arena,
    layout: BlockLayout,
    used: usize,
    live: usize,
}

impl Pool {
    /// Creates a pool whose arena holds one free block spanning all of it.
    ///
    /// The arena is `size` rounded up to the block alignment and never
    /// smaller than one minimal block.
    pub fn create(
        id: PoolId,
        size: usize,
        flags: PoolFlags,
        layout: BlockLayout,
    ) -> Result<Self, AllocError> {
        if size == 0 || size > MAX_POOL_SIZE {
            return Err(AllocError::InvalidSize(size));
        }
        let len = align_up(size)
            .ok_or(AllocError::InvalidSize(size))?
            .max(layout.min_block());

        let arena = if flags.contains(PoolFlags::PROTECTED) {
            Arena::protected(len)
        } else {
            Arena::heap(len)
        }
        .ok_or(AllocError::OutOfMemory { requested: len })?;

        let mut pool = Self {
            id,
            flags,
            arena,
            layout,
            used: 0,
            live: 0,
        };
        BlockHeader::new(len - layout.overhead(), None, true).write(pool.arena.bytes_mut(), 0);
        Ok(pool)
    }

    #[inline]
    pub fn id(&self) -> PoolId {
        self.id
    }

    #[inline]
    pub fn flags(&self) -> PoolFlags {
        self.flags
    }

    /// Arena length.
    #[inline]
    pub fn size(&self) -> usize {
        self.arena.len()
    }

    /// Bytes charged to live blocks, headers and guards included.
    #[inline]
    pub fn used(&self) -> usize {
        self.used
    }

    #[inline]
    pub fn live_blocks(&self) -> usize {
        self.live
    }

    #[inline]
    pub fn layout(&self) -> BlockLayout {
        self.layout
    }

    /// Offset of `addr` inside this pool's arena.
    #[inline]
    pub fn offset_of(&self, addr: usize) -> Option<usize> {
        self.arena.offset_of(addr)
    }

    #[inline]
    pub fn ptr_at(&self, offset: usize) -> Option<NonNull<u8>> {
        self.arena.ptr_at(offset)
    }

    fn corruption(&self, offset: usize, kind: CorruptionKind) -> AllocError {
        AllocError::Corruption {
            pool: self.id,
            offset,
            kind,
        }
    }

    /// Reads the header at `offset` and checks tag, state, bounds, link and,
    /// for used blocks, guards.
    fn checked_header(&self, offset: usize) -> Result<BlockHeader, AllocError> {
        let bytes = self.arena.bytes();
        let header = BlockHeader::read(bytes, offset).map_err(|k| self.corruption(offset, k))?;

        let end = offset
            .checked_add(self.layout.footprint(header.size))
            .filter(|&end| end <= bytes.len())
            .ok_or_else(|| self.corruption(offset, CorruptionKind::OutOfBounds))?;

        let linked = match header.next {
            Some(next) => next == end && next < bytes.len(),
            None => end == bytes.len(),
        };
        if !linked {
            return Err(self.corruption(offset, CorruptionKind::BrokenLink));
        }

        if !header.free {
            self.layout
                .check_guards(bytes, offset, header.size)
                .map_err(|k| self.corruption(offset, k))?;
        }
        Ok(header)
    }

    /// Walks the whole directory. Returns the number of blocks.
    pub fn validate(&self) -> Result<usize, AllocError> {
        let mut count = 0;
        let mut cursor = Some(0);
        while let Some(offset) = cursor {
            cursor = self.checked_header(offset)?.next;
            count += 1;
        }
        Ok(count)
    }

    /// First-fit allocation of `aligned` payload bytes.
    ///
    /// Validates the entire directory before searching it. Returns the
    /// payload offset, or `None` when no free block is large enough.
    pub fn allocate(&mut self, aligned: usize) -> Result<Option<usize>, AllocError> {
        self.validate()?;

        let mut cursor = Some(0);
        while let Some(offset) = cursor {
            let header = self.checked_header(offset)?;
            if header.free && header.size >= aligned {
                self.claim(offset, header, aligned);
                return Ok(Some(self.layout.payload_offset(offset)));
            }
            cursor = header.next;
        }
        Ok(None)
    }

    fn claim(&mut self, offset: usize, header: BlockHeader, aligned: usize) {
        let layout = self.layout;
        let remainder = header.size - aligned;
        let bytes = self.arena.bytes_mut();

        let (size, next) = if remainder >= layout.min_block() {
            let split = offset + layout.footprint(aligned);
            BlockHeader::new(remainder - layout.overhead(), header.next, true).write(bytes, split);
            (aligned, Some(split))
        } else {
            (header.size, header.next)
        };

        BlockHeader::new(size, next, false).write(bytes, offset);
        layout.stamp_guards(bytes, offset, size);

        self.used += layout.footprint(size);
        self.live += 1;
    }

    /// Validates the block owning `payload` and returns its header offset and
    /// payload size. Free blocks are rejected.
    pub fn live_block(&self, payload: usize) -> Result<(usize, usize), AllocError> {
        self.live_header(payload)
            .map(|(block, header)| (block, header.size))
    }

    fn live_header(&self, payload: usize) -> Result<(usize, BlockHeader), AllocError> {
        let block = self
            .layout
            .block_offset(payload)
            .ok_or_else(|| self.corruption(payload, CorruptionKind::OutOfBounds))?;
        let header = self.checked_header(block)?;
        if header.free {
            return Err(AllocError::DoubleFree {
                pool: self.id,
                offset: block,
            });
        }
        Ok((block, header))
    }

    /// Frees the block owning `payload`.
    ///
    /// Returns the footprint released and whether the forward merge was
    /// skipped because the following block failed validation. A damaged
    /// block is left untouched.
    pub fn release(&mut self, payload: usize) -> Result<(usize, Option<AllocError>), AllocError> {
        let (block, header) = self.live_header(payload)?;
        let footprint = self.layout.footprint(header.size);

        BlockHeader::new(header.size, header.next, true).write(self.arena.bytes_mut(), block);
        self.used -= footprint;
        self.live -= 1;

        Ok((footprint, self.coalesce_forward(block).err()))
    }

    /// Merges the free block at `block` with its successor when that one is
    /// free too. Only the following block is considered.
    fn coalesce_forward(&mut self, block: usize) -> Result<bool, AllocError> {
        let header = self.checked_header(block)?;
        let Some(next) = header.next else {
            return Ok(false);
        };
        let successor = self.checked_header(next)?;
        if !successor.free {
            return Ok(false);
        }
        let merged = header.size + self.layout.overhead() + successor.size;
        BlockHeader::new(merged, successor.next, true).write(self.arena.bytes_mut(), block);
        Ok(true)
    }

    pub fn bytes(&self) -> &[u8] {
        self.arena.bytes()
    }

    pub fn bytes_mut(&mut self) -> &mut [u8] {
        self.arena.bytes_mut()
    }

    /// Validated per-block dump.
    pub fn report(&self) -> Result<PoolReport, AllocError> {
        let mut blocks = Vec::new();
        let mut cursor = Some(0);
        while let Some(offset) = cursor {
            let header = self.checked_header(offset)?;
            blocks.push(BlockInfo {
                offset,
                size: header.size,
                free: header.free,
            });
            cursor = header.next;
        }
        Ok(PoolReport {
            id: self.id,
            flags: self.flags,
            size: self.size(),
            used: self.used,
            live_blocks: self.live,
            mapped: self.arena.is_mapped(),
            blocks,
        })
    }

    /// Checks the accounting invariants: blocks tile the arena, `used`
    /// equals the footprint of used blocks and `live` their count.
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        let report = self
            .report()
            .map_err(|e| InvariantError::new(e.to_string()))?;

        let total: usize = report
            .blocks
            .iter()
            .map(|b| self.layout.footprint(b.size))
            .sum();
        if total != self.size() {
            return Err(InvariantError::new(format!(
                "pool {}: blocks cover {} of {} bytes",
                self.id,
                total,
                self.size()
            )));
        }

        let used: usize = report
            .blocks
            .iter()
            .filter(|b| !b.free)
            .map(|b| self.layout.footprint(b.size))
            .sum();
        if used != self.used {
            return Err(InvariantError::new(format!(
                "pool {}: used counter {} but used blocks span {}",
                self.id, self.used, used
            )));
        }

        let live = report.blocks.iter().filter(|b| !b.free).count();
        if live != self.live {
            return Err(InvariantError::new(format!(
                "pool {}: live counter {} but {} used blocks",
                self.id, self.live, live
            )));
        }

        if self.used > self.size() {
            return Err(InvariantError::new(format!(
                "pool {}: used {} exceeds size {}",
                self.id,
                self.used,
                self.size()
            )));
        }
        Ok(())
    }
}
