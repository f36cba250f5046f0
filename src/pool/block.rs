//! Block headers and block geometry.
//!
//! A block is a header, an optional front guard, the payload, and an optional
//! rear guard, laid out back to back inside an arena:
//!
//! ```text
//!   ┌──────────────────────────┬───────────┬──────────────────┬───────────┐
//!   │ BlockHeader (32 bytes)   │ front     │ payload          │ rear      │
//!   │ size | next | state | tag│ guard     │ `size` bytes     │ guard     │
//!   └──────────────────────────┴───────────┴──────────────────┴───────────┘
//!   ▲ block offset                         ▲ payload offset
//! ```
//!
//! Guards are [`GUARD_SIZE`] bytes each when enabled and absent otherwise.
//! The tag is the last header word, so with guards off the byte immediately
//! before a payload still belongs to a checked field.
//!
//! Headers are encoded as little-endian `u64` words directly in the arena
//! bytes. Decoding validates the tag and state word, so a header that has been
//! scribbled over is reported instead of trusted.

use std::mem;

use crate::error::CorruptionKind;

/// Allocation granularity: a pair of machine words.
pub const ALIGNMENT: usize = 2 * mem::size_of::<usize>();

/// Encoded header length.
pub const HEADER_SIZE: usize = 32;

/// Length of each guard region when guard bytes are enabled.
pub const GUARD_SIZE: usize = ALIGNMENT;

/// Smallest payload a block may carry. Splits never leave a smaller sliver.
pub const MIN_PAYLOAD: usize = ALIGNMENT;

/// Marker stored in every header.
pub const BLOCK_TAG: u64 = 0x4B4C_424D_454D_2101;

/// Fill value of the guard before a payload.
pub const FRONT_GUARD: u8 = 0xAB;

/// Fill value of the guard after a payload.
pub const REAR_GUARD: u8 = 0xCD;

const STATE_FREE: u64 = 0x4545_5246_4545_5246;
const STATE_USED: u64 = 0x4445_5355_4445_5355;

const SIZE_AT: usize = 0;
const NEXT_AT: usize = 8;
const STATE_AT: usize = 16;
const TAG_AT: usize = 24;

/// Rounds `value` up to a multiple of [`ALIGNMENT`], or `None` on overflow.
///
/// ```
/// use memkit::pool::block::{align_up, ALIGNMENT};
///
/// assert_eq!(align_up(1), Some(ALIGNMENT));
/// assert_eq!(align_up(ALIGNMENT), Some(ALIGNMENT));
/// assert_eq!(align_up(usize::MAX), None);
/// ```
#[inline]
pub fn align_up(value: usize) -> Option<usize> {
    value
        .checked_add(ALIGNMENT - 1)
        .map(|v| v & !(ALIGNMENT - 1))
}

/// Decoded block header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader {
    pub size: usize,
    pub next: Option<usize>,
    pub free: bool,
}

impl BlockHeader {
    pub fn new(size: usize, next: Option<usize>, free: bool) -> Self {
        Self { size, next, free }
    }

    /// Decodes and validates the header at `offset`.
    pub fn read(bytes: &[u8], offset: usize) -> Result<Self, CorruptionKind> {
        let end = offset
            .checked_add(HEADER_SIZE)
            .ok_or(CorruptionKind::OutOfBounds)?;
        let raw = bytes.get(offset..end).ok_or(CorruptionKind::OutOfBounds)?;

        if word(raw, TAG_AT) != BLOCK_TAG {
            return Err(CorruptionKind::BadTag);
        }
        let free = match word(raw, STATE_AT) {
            STATE_FREE => true,
            STATE_USED => false,
            _ => return Err(CorruptionKind::BadState),
        };
        let size = usize::try_from(word(raw, SIZE_AT)).map_err(|_| CorruptionKind::OutOfBounds)?;
        let next = match word(raw, NEXT_AT) {
            0 => None,
            n => Some(usize::try_from(n).map_err(|_| CorruptionKind::OutOfBounds)?),
        };
        Ok(Self { size, next, free })
    }

    /// Encodes the header at `offset`, (re)writing the tag.
    ///
    /// # Panics
    ///
    /// Panics if the header does not fit; callers only write at offsets
    /// produced by a validated walk.
    pub fn write(&self, bytes: &mut [u8], offset: usize) {
        let raw = &mut bytes[offset..offset + HEADER_SIZE];
        put_word(raw, SIZE_AT, self.size as u64);
        put_word(raw, NEXT_AT, self.next.map_or(0, |n| n as u64));
        put_word(raw, STATE_AT, if self.free { STATE_FREE } else { STATE_USED });
        put_word(raw, TAG_AT, BLOCK_TAG);
    }
}

#[inline]
fn word(raw: &[u8], at: usize) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&raw[at..at + 8]);
    u64::from_le_bytes(buf)
}

#[inline]
fn put_word(raw: &mut [u8], at: usize, value: u64) {
    raw[at..at + 8].copy_from_slice(&value.to_le_bytes());
}

/// Block geometry for one allocator configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockLayout {
    guard: usize,
}

impl BlockLayout {
    pub fn new(guard_bytes: bool) -> Self {
        Self {
            guard: if guard_bytes { GUARD_SIZE } else { 0 },
        }
    }

    #[inline]
    pub fn has_guards(&self) -> bool {
        self.guard > 0
    }

    /// Bytes a block costs beyond its payload.
    #[inline]
    pub fn overhead(&self) -> usize {
        HEADER_SIZE + 2 * self.guard
    }

    /// Smallest block that can exist on its own.
    #[inline]
    pub fn min_block(&self) -> usize {
        self.overhead() + MIN_PAYLOAD
    }

    /// Total bytes occupied by a block with `size` payload bytes.
    #[inline]
    pub fn footprint(&self, size: usize) -> usize {
        self.overhead() + size
    }

    #[inline]
    pub fn payload_offset(&self, block: usize) -> usize {
        block + HEADER_SIZE + self.guard
    }

    /// Block offset for a payload offset, if one could exist there.
    #[inline]
    pub fn block_offset(&self, payload: usize) -> Option<usize> {
        payload.checked_sub(HEADER_SIZE + self.guard)
    }

    /// Stamps both guards of the block at `block`.
    pub fn stamp_guards(&self, bytes: &mut [u8], block: usize, size: usize) {
        if self.guard == 0 {
            return;
        }
        let front = block + HEADER_SIZE;
        bytes[front..front + self.guard].fill(FRONT_GUARD);
        let rear = self.payload_offset(block) + size;
        bytes[rear..rear + self.guard].fill(REAR_GUARD);
    }

    /// Checks both guards of the block at `block`.
    pub fn check_guards(&self, bytes: &[u8], block: usize, size: usize) -> Result<(), CorruptionKind> {
        if self.guard == 0 {
            return Ok(());
        }
        let front = block + HEADER_SIZE;
        let rear = self.payload_offset(block) + size;
        let front_ok = bytes
            .get(front..front + self.guard)
            .is_some_and(|g| g.iter().all(|&b| b == FRONT_GUARD));
        let rear_ok = bytes
            .get(rear..rear + self.guard)
            .is_some_and(|g| g.iter().all(|&b| b == REAR_GUARD));
        if front_ok && rear_ok {
            Ok(())
        } else {
            Err(CorruptionKind::GuardDamaged)
        }
    }
}
