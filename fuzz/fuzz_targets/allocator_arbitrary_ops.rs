#![no_main]

use libfuzzer_sys::fuzz_target;
use memkit::pool::{AllocatorConfig, PoolAllocator, PoolFlags};

// Fuzz arbitrary allocate/free/write/read sequences on PoolAllocator
//
// Every operation must either succeed or fail cleanly, and the directory must
// validate after each step.
fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }

    let allocator = PoolAllocator::new(AllocatorConfig {
        guard_bytes: data[0] & 1 == 1,
        default_flags: if data[0] & 2 == 2 {
            PoolFlags::GROWABLE
        } else {
            PoolFlags::empty()
        },
    });
    allocator.init(2048).unwrap();
    let mut live = Vec::new();

    let mut idx = 1;
    while idx + 1 < data.len() {
        let op = data[idx] % 6;
        let arg = usize::from(data[idx + 1]);

        match op {
            0 | 1 => {
                // allocate
                if let Ok(handle) = allocator.allocate(arg * 4 + 1) {
                    assert!(handle.len() > arg * 4);
                    live.push(handle);
                }
            }
            2 => {
                // free
                if !live.is_empty() {
                    let handle = live.swap_remove(arg % live.len());
                    allocator.free(handle).unwrap();
                }
            }
            3 => {
                // write then read back
                if !live.is_empty() {
                    let handle = live[arg % live.len()];
                    let bytes = vec![arg as u8; handle.len()];
                    allocator.write(&handle, 0, &bytes).unwrap();
                    let mut back = vec![0u8; handle.len()];
                    allocator.read(&handle, 0, &mut back).unwrap();
                    assert_eq!(back, bytes);
                }
            }
            4 => {
                // out-of-range access is rejected
                if !live.is_empty() {
                    let handle = live[arg % live.len()];
                    let mut buf = [0u8; 1];
                    assert!(allocator.read(&handle, handle.len(), &mut buf).is_err());
                }
            }
            5 => {
                // extra pool
                let _ = allocator.create_pool(arg * 16 + 64, PoolFlags::empty());
            }
            _ => unreachable!(),
        }

        allocator.check_invariants().unwrap();
        idx += 2;
    }

    for handle in live {
        allocator.free(handle).unwrap();
    }
    assert_eq!(allocator.usage().0, 0);
});
