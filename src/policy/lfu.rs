//! Frequency ordering by local insertion sort.
//!
//! The list is kept non-increasing in access count from head to tail. After
//! a touch only the touched entry moves:
//!
//! ```text
//!   counts before get(C):   [A:3] [B:2] [C:2] [D:1]
//!   C's count becomes 3, it moves past strictly smaller counts:
//!                           [A:3] [C:3] [B:2] [D:1]
//!
//!   new entry E (count 1) starts at the head and sinks past strictly
//!   larger counts:          [A:3] [C:3] [B:2] [E:1] [D:1]
//! ```
//!
//! A rising entry stops at the tail end of its new tie group, behind the
//! entries that already held that count. A new or reset entry sinks only
//! past larger counts, so it lands at the head end of the count-1 group.
//! That tie-break falls out of the strict comparisons; nothing else relies
//! on it.

use crate::ds::{IntrusiveList, SlotId};
use crate::policy::Ranked;

/// Re-sorts the single entry `id`.
pub fn reposition<T: Ranked>(list: &mut IntrusiveList<T>, id: SlotId) {
    let Some(count) = list.get(id).map(Ranked::access_count) else {
        return;
    };

    let rank = |list: &IntrusiveList<T>, other: SlotId| list.get(other).map(Ranked::access_count);

    let mut anchor = None;
    let mut cursor = list.prev_id(id);
    while let Some(prev) = cursor {
        if rank(list, prev).is_some_and(|c| c < count) {
            anchor = Some(prev);
            cursor = list.prev_id(prev);
        } else {
            break;
        }
    }
    if let Some(anchor) = anchor {
        list.move_before(id, anchor);
        return;
    }

    let mut cursor = list.next_id(id);
    while let Some(next) = cursor {
        if rank(list, next).is_some_and(|c| c > count) {
            anchor = Some(next);
            cursor = list.next_id(next);
        } else {
            break;
        }
    }
    if let Some(anchor) = anchor {
        list.move_after(id, anchor);
    }
}

pub fn is_non_increasing<T: Ranked>(list: &IntrusiveList<T>) -> bool {
    let counts: Vec<u64> = list.iter().map(Ranked::access_count).collect();
    counts.windows(2).all(|w| w[0] >= w[1])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct Item {
        name: char,
        count: u64,
    }

    impl Ranked for Item {
        fn access_count(&self) -> u64 {
            self.count
        }
    }

    fn list_of(items: &[(char, u64)]) -> (IntrusiveList<Item>, Vec<SlotId>) {
        let mut list = IntrusiveList::new();
        let ids = items
            .iter()
            .map(|&(name, count)| list.push_back(Item { name, count }))
            .collect();
        (list, ids)
    }

    fn names(list: &IntrusiveList<Item>) -> String {
        list.iter().map(|i| i.name).collect()
    }

    fn bump(list: &mut IntrusiveList<Item>, id: SlotId) {
        if let Some(item) = list.get_mut(id) {
            item.count += 1;
        }
        reposition(list, id);
    }

    #[test]
    fn bumped_entry_rises_past_smaller_counts_only() {
        let (mut list, ids) = list_of(&[('a', 3), ('b', 2), ('c', 2), ('d', 1)]);
        bump(&mut list, ids[2]);
        assert_eq!(names(&list), "acbd");
        assert!(is_non_increasing(&list));

        bump(&mut list, ids[3]);
        bump(&mut list, ids[3]);
        assert_eq!(names(&list), "acdb");
        assert!(is_non_increasing(&list));
    }

    #[test]
    fn new_head_entry_sinks_past_larger_counts_only() {
        let (mut list, _) = list_of(&[('a', 4), ('b', 1)]);
        let e = list.push_front(Item { name: 'e', count: 1 });
        reposition(&mut list, e);
        assert_eq!(names(&list), "aeb");
    }

    #[test]
    fn reset_count_sinks_entry() {
        let (mut list, ids) = list_of(&[('a', 5), ('b', 3), ('c', 2)]);
        if let Some(item) = list.get_mut(ids[0]) {
            item.count = 1;
        }
        reposition(&mut list, ids[0]);
        assert_eq!(names(&list), "bca");
        list.debug_validate_invariants();
    }

    #[test]
    fn equal_counts_keep_position() {
        // Tie-break artifact: a touch that does not change relative rank
        // leaves the entry where it is.
        let (mut list, ids) = list_of(&[('a', 2), ('b', 2), ('c', 2)]);
        reposition(&mut list, ids[1]);
        assert_eq!(names(&list), "abc");
    }

    #[test]
    fn unknown_id_is_ignored() {
        let (mut list, ids) = list_of(&[('a', 1)]);
        list.remove(ids[0]);
        reposition(&mut list, ids[0]);
        assert!(list.is_empty());
    }
}
