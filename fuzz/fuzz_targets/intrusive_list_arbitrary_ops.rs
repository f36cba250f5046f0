#![no_main]

use libfuzzer_sys::fuzz_target;
use memkit::ds::IntrusiveList;
use memkit::policy::{EvictionPolicy, Ranked};

#[derive(Debug)]
struct Counted(u64);

impl Ranked for Counted {
    fn access_count(&self) -> u64 {
        self.0
    }
}

// Fuzz arbitrary operation sequences on IntrusiveList under LFU repositioning
//
// Every touch goes through the policy, so the list must stay non-increasing
// in count and structurally valid after each step.
fuzz_target!(|data: &[u8]| {
    let policy = EvictionPolicy::Lfu;
    let mut list: IntrusiveList<Counted> = IntrusiveList::new();
    let mut ids = Vec::new();

    let mut idx = 0;
    while idx + 1 < data.len() {
        let op = data[idx] % 5;
        let arg = usize::from(data[idx + 1]);

        match op {
            0 | 1 => {
                // insert at head with count 1
                let id = list.push_front(Counted(1));
                policy.reposition(&mut list, id);
                ids.push(id);
            }
            2 => {
                // touch
                if !ids.is_empty() {
                    let id = ids[arg % ids.len()];
                    if let Some(item) = list.get_mut(id) {
                        item.0 += 1;
                    }
                    policy.reposition(&mut list, id);
                }
            }
            3 => {
                // evict tail
                if let Some(tail) = list.back_id() {
                    list.remove(tail);
                    ids.retain(|&id| id != tail);
                }
            }
            4 => {
                // reset a count, as a rewrite does
                if !ids.is_empty() {
                    let id = ids[arg % ids.len()];
                    if let Some(item) = list.get_mut(id) {
                        item.0 = 1;
                    }
                    policy.reposition(&mut list, id);
                }
            }
            _ => unreachable!(),
        }

        list.check_invariants().unwrap();
        assert!(policy.is_ordered(&list));
        assert_eq!(list.len(), ids.len());
        idx += 2;
    }
});
