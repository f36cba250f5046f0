//! Eviction policies.
//!
//! A cache keeps its entries in one list and always evicts the tail. The
//! policy only decides where a touched entry goes after a successful `set`
//! or `get`:
//!
//! | Policy | Touched entry goes to                                   |
//! |--------|---------------------------------------------------------|
//! | LRU    | the head                                                |
//! | LFU    | the slot that keeps access counts non-increasing        |
//!
//! Policies are chosen by name at construction:
//!
//! ```
//! use memkit::policy::EvictionPolicy;
//!
//! assert_eq!("lru".parse::<EvictionPolicy>(), Ok(EvictionPolicy::Lru));
//! assert_eq!("LFU".parse::<EvictionPolicy>(), Ok(EvictionPolicy::Lfu));
//! assert!("arc".parse::<EvictionPolicy>().is_err());
//! ```

pub mod lfu;
pub mod lru;

use std::fmt;
use std::str::FromStr;

use crate::ds::{IntrusiveList, SlotId};
use crate::error::CacheError;

/// List element that carries an access count.
pub trait Ranked {
    fn access_count(&self) -> u64;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EvictionPolicy {
    /// Least recently used.
    #[default]
    Lru,
    /// Least frequently used.
    Lfu,
}

impl EvictionPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            EvictionPolicy::Lru => "lru",
            EvictionPolicy::Lfu => "lfu",
        }
    }

    /// Moves `id` to where this policy wants a just-touched entry.
    pub fn reposition<T: Ranked>(self, list: &mut IntrusiveList<T>, id: SlotId) {
        match self {
            EvictionPolicy::Lru => lru::touch(list, id),
            EvictionPolicy::Lfu => lfu::reposition(list, id),
        }
    }

    /// Whether `list` is in an order this policy can produce.
    pub fn is_ordered<T: Ranked>(self, list: &IntrusiveList<T>) -> bool {
        match self {
            EvictionPolicy::Lru => true,
            EvictionPolicy::Lfu => lfu::is_non_increasing(list),
        }
    }
}

impl FromStr for EvictionPolicy {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("lru") {
            Ok(EvictionPolicy::Lru)
        } else if s.eq_ignore_ascii_case("lfu") {
            Ok(EvictionPolicy::Lfu)
        } else {
            Err(CacheError::InvalidParam("unrecognized eviction policy"))
        }
    }
}

impl fmt::Display for EvictionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_round_trips_display() {
        for policy in [EvictionPolicy::Lru, EvictionPolicy::Lfu] {
            assert_eq!(policy.to_string().parse::<EvictionPolicy>(), Ok(policy));
        }
    }

    #[test]
    fn unknown_name_is_invalid_param() {
        assert_eq!(
            "fifo".parse::<EvictionPolicy>(),
            Err(CacheError::InvalidParam("unrecognized eviction policy"))
        );
        assert!("".parse::<EvictionPolicy>().is_err());
    }
}
