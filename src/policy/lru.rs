//! Recency ordering.
//!
//! ```text
//!   get(B):
//!     head ──► [A] ◄──► [B] ◄──► [C] ◄── tail
//!     head ──► [B] ◄──► [A] ◄──► [C] ◄── tail
//!              MRU                LRU (next eviction)
//! ```

use crate::ds::{IntrusiveList, SlotId};

/// Moves the touched entry to the head.
#[inline]
pub fn touch<T>(list: &mut IntrusiveList<T>, id: SlotId) {
    list.move_to_front(id);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn touched_entry_becomes_head() {
        let mut list = IntrusiveList::new();
        let a = list.push_back('a');
        list.push_back('b');
        let c = list.push_back('c');

        touch(&mut list, c);
        assert_eq!(list.front_id(), Some(c));
        touch(&mut list, a);
        let order: Vec<_> = list.iter().copied().collect();
        assert_eq!(order, vec!['a', 'c', 'b']);
    }
}
