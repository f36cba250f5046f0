//! Error and status types for memkit.
//!
//! ## Key Components
//!
//! - [`Status`]: flat status code shared by both subsystems. Every error maps
//!   to one through `status()`, and each subsystem remembers the status of its
//!   most recent operation (`last_status()`).
//! - [`AllocError`]: failures of the pool allocator.
//! - [`CacheError`]: failures of the cache store.
//! - [`CorruptionKind`]: which structural check failed when an operation
//!   reports corruption.
//! - [`InvariantError`]: returned by `check_invariants` methods.
//!
//! `Corruption` is deliberately its own variant in both enums. Callers must be
//! able to tell a damaged allocator from a benign miss:
//!
//! ```
//! use memkit::error::{CacheError, Status};
//!
//! let miss = CacheError::NotFound;
//! assert!(!miss.is_corruption());
//! assert_eq!(miss.status(), Status::NotFound);
//! ```

use std::fmt;

use thiserror::Error;

use crate::pool::PoolId;

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Status code of an allocator or cache operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Status {
    #[default]
    Success,
    InvalidParam,
    OutOfMemory,
    NotFound,
    Corruption,
    AlreadyInitialized,
    Uninitialized,
    Full,
}

impl Status {
    /// Returns `true` for [`Status::Success`].
    #[inline]
    pub fn is_success(self) -> bool {
        self == Status::Success
    }

    /// Short, stable name used in logs and exported metrics.
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Success => "success",
            Status::InvalidParam => "invalid_param",
            Status::OutOfMemory => "out_of_memory",
            Status::NotFound => "not_found",
            Status::Corruption => "corruption",
            Status::AlreadyInitialized => "already_initialized",
            Status::Uninitialized => "uninitialized",
            Status::Full => "full",
        }
    }

    /// Status of a finished operation.
    pub(crate) fn of<T, E: Into<Status> + Copy>(result: &Result<T, E>) -> Status {
        match result {
            Ok(_) => Status::Success,
            Err(err) => (*err).into(),
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// CorruptionKind
// ---------------------------------------------------------------------------

/// Which structural check failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CorruptionKind {
    /// Header tag does not match the block marker.
    BadTag,
    /// Header state word is neither the free nor the used marker.
    BadState,
    /// A guard byte next to a payload was overwritten.
    GuardDamaged,
    /// A header or payload would lie outside its arena.
    OutOfBounds,
    /// A `next` link does not point at the end of the current block.
    BrokenLink,
}

impl fmt::Display for CorruptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            CorruptionKind::BadTag => "block tag mismatch",
            CorruptionKind::BadState => "invalid block state word",
            CorruptionKind::GuardDamaged => "guard bytes damaged",
            CorruptionKind::OutOfBounds => "block outside arena bounds",
            CorruptionKind::BrokenLink => "block link out of sequence",
        };
        f.write_str(text)
    }
}

// ---------------------------------------------------------------------------
// AllocError
// ---------------------------------------------------------------------------

/// Error returned by [`PoolAllocator`](crate::pool::PoolAllocator) operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AllocError {
    /// Requested size is zero or would overflow header accounting.
    #[error("invalid size {0}")]
    InvalidSize(usize),

    /// Argument has the wrong shape (foreign pointer, out-of-range access).
    #[error("invalid argument: {0}")]
    InvalidParam(&'static str),

    /// No pool can satisfy the request.
    #[error("out of memory: no pool can satisfy {requested} bytes")]
    OutOfMemory { requested: usize },

    /// The pool table already holds the maximum number of pools.
    #[error("pool table full ({max} pools)")]
    PoolTableFull { max: usize },

    /// No pool with this id exists.
    #[error("unknown pool {0}")]
    UnknownPool(PoolId),

    /// The block behind this pointer is already free.
    #[error("double free of block at offset {offset} in pool {pool}")]
    DoubleFree { pool: PoolId, offset: usize },

    #[error("allocator already initialized")]
    AlreadyInitialized,

    #[error("allocator not initialized")]
    Uninitialized,

    /// A structural invariant of a pool is violated. Not recoverable for
    /// that allocator.
    #[error("corruption in pool {pool} at offset {offset}: {kind}")]
    Corruption {
        pool: PoolId,
        offset: usize,
        kind: CorruptionKind,
    },
}

impl AllocError {
    pub fn status(&self) -> Status {
        match self {
            AllocError::InvalidSize(_)
            | AllocError::InvalidParam(_)
            | AllocError::UnknownPool(_)
            | AllocError::DoubleFree { .. } => Status::InvalidParam,
            AllocError::OutOfMemory { .. } => Status::OutOfMemory,
            AllocError::PoolTableFull { .. } => Status::Full,
            AllocError::AlreadyInitialized => Status::AlreadyInitialized,
            AllocError::Uninitialized => Status::Uninitialized,
            AllocError::Corruption { .. } => Status::Corruption,
        }
    }

    #[inline]
    pub fn is_corruption(&self) -> bool {
        matches!(self, AllocError::Corruption { .. })
    }
}

impl From<AllocError> for Status {
    fn from(err: AllocError) -> Self {
        err.status()
    }
}

// ---------------------------------------------------------------------------
// CacheError
// ---------------------------------------------------------------------------

/// Error returned by [`CacheStore`](crate::cache::CacheStore) operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CacheError {
    /// Argument has the wrong shape or is out of its accepted range.
    #[error("invalid argument: {0}")]
    InvalidParam(&'static str),

    /// Output buffer cannot hold the stored payload.
    #[error("buffer too small: need {needed} bytes, have {available}")]
    BufferTooSmall { needed: usize, available: usize },

    /// No live entry for the key (missing or lazily expired).
    #[error("key not found")]
    NotFound,

    /// Payload storage could not be obtained.
    #[error("out of memory")]
    OutOfMemory,

    /// The backing allocator has not been initialized or was cleaned up.
    #[error("payload allocator not initialized")]
    Uninitialized,

    /// The backing allocator reported corruption.
    #[error("payload storage corrupted: {0}")]
    Corruption(AllocError),
}

impl CacheError {
    pub fn status(&self) -> Status {
        match self {
            CacheError::InvalidParam(_) | CacheError::BufferTooSmall { .. } => Status::InvalidParam,
            CacheError::NotFound => Status::NotFound,
            CacheError::OutOfMemory => Status::OutOfMemory,
            CacheError::Uninitialized => Status::Uninitialized,
            CacheError::Corruption(_) => Status::Corruption,
        }
    }

    #[inline]
    pub fn is_corruption(&self) -> bool {
        matches!(self, CacheError::Corruption(_))
    }
}

impl From<CacheError> for Status {
    fn from(err: CacheError) -> Self {
        err.status()
    }
}

impl From<AllocError> for CacheError {
    fn from(err: AllocError) -> Self {
        match err {
            AllocError::Corruption { .. } => CacheError::Corruption(err),
            AllocError::OutOfMemory { .. } | AllocError::PoolTableFull { .. } => {
                CacheError::OutOfMemory
            },
            AllocError::Uninitialized => CacheError::Uninitialized,
            AllocError::InvalidSize(_) | AllocError::InvalidParam(_) | AllocError::AlreadyInitialized => {
                CacheError::InvalidParam("payload rejected by allocator")
            },
            AllocError::DoubleFree { .. } => CacheError::InvalidParam("payload already released"),
            AllocError::UnknownPool(_) => CacheError::InvalidParam("payload pool unknown"),
        }
    }
}

// ---------------------------------------------------------------------------
// InvariantError
// ---------------------------------------------------------------------------

/// Error returned when internal invariants are violated.
///
/// Produced by `check_invariants` on the allocator, its pools, and cache
/// stores. Carries a human-readable description of which invariant failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvariantError(String);

impl InvariantError {
    /// Creates a new `InvariantError` with the given description.
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    /// Returns the error description.
    #[inline]
    pub fn message(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InvariantError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for InvariantError {}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
