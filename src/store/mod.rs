//! Payload storage behind the cache.
//!
//! A cache entry never owns its value bytes directly; it holds a handle from
//! a [`PayloadStore`]. The store decides where the bytes live:
//!
//! | Store         | Backing                                   |
//! |---------------|-------------------------------------------|
//! | [`HeapStore`] | One boxed slice per value (default)       |
//! | [`PoolStore`] | One block per value in a `PoolAllocator`  |

pub mod heap;
pub mod pool;
pub mod traits;

pub use heap::HeapStore;
pub use pool::PoolStore;
pub use traits::PayloadStore;
