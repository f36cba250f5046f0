use std::time::Instant;

use crate::policy::Ranked;

/// One cached value. List links live in the owning `IntrusiveList` node.
#[derive(Debug)]
pub(crate) struct Entry<H> {
    pub key: String,
    pub payload: H,
    pub size: usize,
    pub expiry: Instant,
    pub access_count: u64,
}

impl<H> Entry<H> {
    pub fn new(key: String, payload: H, size: usize, expiry: Instant) -> Self {
        Self {
            key,
            payload,
            size,
            expiry,
            access_count: 1,
        }
    }

    /// Expired once `now` reaches the expiry instant.
    #[inline]
    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.expiry
    }
}

impl<H> Ranked for Entry<H> {
    #[inline]
    fn access_count(&self) -> u64 {
        self.access_count
    }
}
