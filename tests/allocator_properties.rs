// ==============================================
// POOL ALLOCATOR PROPERTY TESTS (integration)
// ==============================================
//
// Random allocate/free sequences against the public allocator API. After
// every step the directory must tile each arena and accounting must agree
// with the handles still held.

use memkit::pool::block::HEADER_SIZE;
use memkit::pool::{AllocatorConfig, Handle, PoolAllocator, PoolFlags};
use proptest::prelude::*;

const POOL_SIZE: usize = 8 * 1024;

#[derive(Debug, Clone)]
enum Op {
    Alloc(usize),
    Free(usize),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (1usize..512).prop_map(Op::Alloc),
        2 => any::<usize>().prop_map(Op::Free),
    ]
}

fn allocator(guard_bytes: bool) -> PoolAllocator {
    let allocator = PoolAllocator::new(AllocatorConfig {
        guard_bytes,
        default_flags: PoolFlags::empty(),
    });
    allocator.init(POOL_SIZE).unwrap();
    allocator
}

fn ranges_overlap(a: &Handle, b: &Handle) -> bool {
    let (a0, b0) = (a.as_ptr() as usize, b.as_ptr() as usize);
    a0 < b0 + b.len() && b0 < a0 + a.len()
}

fn assert_tiled(allocator: &PoolAllocator) {
    for report in allocator.dump().unwrap() {
        let tiled: usize = report
            .blocks
            .iter()
            .map(|b| b.size + allocator.block_overhead())
            .sum();
        assert_eq!(tiled, report.size, "blocks do not tile pool {}", report.id);
        let mut expected = 0;
        for block in &report.blocks {
            assert_eq!(block.offset, expected);
            expected += block.size + allocator.block_overhead();
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    #[cfg_attr(miri, ignore)]
    fn live_allocations_never_overlap(
        guards in any::<bool>(),
        ops in prop::collection::vec(op_strategy(), 1..80),
    ) {
        let allocator = allocator(guards);
        let mut live: Vec<Handle> = Vec::new();

        for op in ops {
            match op {
                Op::Alloc(size) => {
                    if let Ok(handle) = allocator.allocate(size) {
                        prop_assert!(handle.len() >= size);
                        prop_assert_eq!(handle.as_ptr() as usize % memkit::pool::block::ALIGNMENT, 0);
                        for other in &live {
                            prop_assert!(!ranges_overlap(&handle, other));
                        }
                        live.push(handle);
                    }
                },
                Op::Free(pick) => {
                    if !live.is_empty() {
                        let handle = live.swap_remove(pick % live.len());
                        prop_assert!(allocator.free(handle).is_ok());
                    }
                },
            }
            assert_tiled(&allocator);
            prop_assert!(allocator.check_invariants().is_ok());
        }
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn used_size_returns_to_zero(
        sizes in prop::collection::vec(1usize..256, 1..24),
    ) {
        let allocator = allocator(true);
        let handles: Vec<Handle> = sizes
            .iter()
            .filter_map(|&size| allocator.allocate(size).ok())
            .collect();

        let stats = allocator.stats();
        prop_assert_eq!(stats.alloc_count, handles.len());
        prop_assert!(stats.used_size <= stats.total_size);

        for handle in handles {
            allocator.free(handle).unwrap();
        }
        let (used, total) = allocator.usage();
        prop_assert_eq!(used, 0);
        prop_assert_eq!(total, POOL_SIZE);
        prop_assert_eq!(allocator.stats().alloc_count, 0);
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn payload_bytes_survive_neighbour_churn(
        fill in any::<u8>(),
        sizes in prop::collection::vec(1usize..128, 2..16),
    ) {
        let allocator = allocator(true);
        let keep = allocator.allocate(64).unwrap();
        allocator.write(&keep, 0, &[fill; 64]).unwrap();

        let others: Vec<Handle> = sizes
            .iter()
            .filter_map(|&size| allocator.allocate(size).ok())
            .collect();
        for (i, handle) in others.iter().enumerate() {
            allocator.write(handle, 0, &vec![i as u8; handle.len()]).unwrap();
        }
        for handle in others {
            allocator.free(handle).unwrap();
        }

        let mut buf = [0u8; 64];
        allocator.read(&keep, 0, &mut buf).unwrap();
        prop_assert_eq!(buf, [fill; 64]);
    }
}

// ==============================================
// Coalescing
// ==============================================

mod coalescing {
    use super::*;

    #[test]
    fn forward_merge_sums_both_blocks_and_one_overhead() {
        for guards in [false, true] {
            let allocator = allocator(guards);
            let a = allocator.allocate(64).unwrap();
            let b = allocator.allocate(96).unwrap();
            let _fence = allocator.allocate(32).unwrap();

            allocator.free(b).unwrap();
            allocator.free(a).unwrap();

            let report = &allocator.dump().unwrap()[0];
            let first = report.blocks[0];
            assert!(first.free);
            assert_eq!(first.size, 64 + 96 + allocator.block_overhead());
            assert!(!report.blocks[1].free);
            if !guards {
                assert_eq!(allocator.block_overhead(), HEADER_SIZE);
            }
        }
    }

    #[test]
    fn single_round_trip_restores_used() {
        let allocator = allocator(true);
        let keep = allocator.allocate(100).unwrap();
        let (before, _) = allocator.usage();
        let handle = allocator.allocate(40).unwrap();
        allocator.free(handle).unwrap();
        assert_eq!(allocator.usage().0, before);
        allocator.free(keep).unwrap();
    }

    #[test]
    fn freeing_in_address_order_leaves_adjacent_free_blocks() {
        // Only the following block is merged, so freeing the lower block
        // first cannot absorb the upper one later.
        let allocator = allocator(false);
        let a = allocator.allocate(64).unwrap();
        let b = allocator.allocate(64).unwrap();
        let _fence = allocator.allocate(64).unwrap();

        allocator.free(a).unwrap();
        allocator.free(b).unwrap();

        let report = &allocator.dump().unwrap()[0];
        assert!(report.blocks[0].free && report.blocks[1].free);
        assert_eq!(report.blocks[0].size, 64);
        assert_eq!(report.blocks[1].size, 64);
        assert_tiled(&allocator);
    }

    #[test]
    fn full_release_in_reverse_order_restores_one_block() {
        let allocator = allocator(true);
        let handles: Vec<Handle> = (0..8).map(|_| allocator.allocate(48).unwrap()).collect();
        for handle in handles.into_iter().rev() {
            allocator.free(handle).unwrap();
        }
        let report = &allocator.dump().unwrap()[0];
        assert_eq!(report.blocks.len(), 1);
        assert_eq!(report.blocks[0].size, POOL_SIZE - allocator.block_overhead());
    }
}

// ==============================================
// Pools
// ==============================================

mod pools {
    use super::*;
    use memkit::error::{AllocError, Status};

    #[test]
    fn growable_default_pool_grows_on_demand() {
        let allocator = PoolAllocator::builder()
            .default_flags(PoolFlags::GROWABLE)
            .init(1024)
            .unwrap();
        let mut handles = Vec::new();
        for _ in 0..16 {
            handles.push(allocator.allocate(256).unwrap());
        }
        assert!(allocator.pool_count() > 1);
        let stats = allocator.stats();
        assert_eq!(stats.alloc_count, 16);
        assert!(stats.pools_created as usize >= allocator.pool_count());
        allocator.check_invariants().unwrap();
    }

    #[test]
    fn growth_covers_requests_larger_than_the_template() {
        let allocator = PoolAllocator::builder()
            .default_flags(PoolFlags::GROWABLE)
            .init(512)
            .unwrap();
        let big = allocator.allocate(4096).unwrap();
        assert_eq!(big.len(), 4096);
        assert_eq!(allocator.pool_count(), 2);
    }

    #[test]
    fn protected_pool_allocates_and_frees() {
        let allocator = allocator(true);
        let id = allocator.create_pool(16 * 1024, PoolFlags::PROTECTED).unwrap();

        // Exhaust the default pool so the protected one serves the rest.
        let filler = allocator.allocate(POOL_SIZE - allocator.block_overhead()).unwrap();
        let handle = allocator.allocate(1000).unwrap();
        allocator.write(&handle, 0, &[7u8; 1000]).unwrap();
        let mut buf = [0u8; 1000];
        allocator.read(&handle, 0, &mut buf).unwrap();
        assert!(buf.iter().all(|&b| b == 7));

        let reports = allocator.dump().unwrap();
        let protected = reports.iter().find(|r| r.id == id).unwrap();
        assert!(protected.flags.contains(PoolFlags::PROTECTED));
        assert_eq!(protected.live_blocks, 1);

        allocator.free(handle).unwrap();
        allocator.free(filler).unwrap();
        allocator.destroy_pool(id).unwrap();
        assert_eq!(allocator.pool_count(), 1);
    }

    #[test]
    fn handles_into_destroyed_pools_are_rejected() {
        let allocator = allocator(true);
        let id = allocator.create_pool(4096, PoolFlags::empty()).unwrap();
        let filler = allocator.allocate(POOL_SIZE - allocator.block_overhead()).unwrap();
        let stranded = allocator.allocate(64).unwrap();

        allocator.destroy_pool(id).unwrap();
        assert!(matches!(
            allocator.free(stranded),
            Err(AllocError::InvalidParam(_))
        ));
        assert_eq!(allocator.last_status(), Status::InvalidParam);
        allocator.free(filler).unwrap();
    }
}
