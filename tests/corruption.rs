// ==============================================
// CORRUPTION DETECTION TESTS (integration)
// ==============================================
//
// Deliberate out-of-bounds writes through raw payload pointers. Every case
// must come back as `AllocError::Corruption`, never as success, and the
// damaged block must be left alone.

use memkit::error::{AllocError, CorruptionKind, Status};
use memkit::pool::{AllocatorConfig, Handle, PoolAllocator, PoolFlags};

fn allocator(guard_bytes: bool) -> PoolAllocator {
    let allocator = PoolAllocator::new(AllocatorConfig {
        guard_bytes,
        default_flags: PoolFlags::empty(),
    });
    allocator.init(4096).unwrap();
    allocator
}

fn kind_of(err: AllocError) -> CorruptionKind {
    match err {
        AllocError::Corruption { kind, .. } => kind,
        other => panic!("expected corruption, got {other:?}"),
    }
}

unsafe fn poke(handle: &Handle, offset: isize, byte: u8) {
    unsafe { handle.as_ptr().offset(offset).write(byte) };
}

#[test]
fn byte_before_payload_is_caught_with_guards() {
    let allocator = allocator(true);
    let handle = allocator.allocate(64).unwrap();
    unsafe { poke(&handle, -1, 0) };

    let err = allocator.free(handle).unwrap_err();
    assert_eq!(kind_of(err), CorruptionKind::GuardDamaged);
    assert_eq!(allocator.last_status(), Status::Corruption);
}

#[test]
fn byte_before_payload_is_caught_without_guards() {
    // Without guards the preceding byte belongs to the header tag.
    let allocator = allocator(false);
    let handle = allocator.allocate(64).unwrap();
    unsafe { poke(&handle, -1, 0) };

    let err = allocator.free(handle).unwrap_err();
    assert_eq!(kind_of(err), CorruptionKind::BadTag);
    assert!(err.is_corruption());
}

#[test]
fn rear_guard_overrun_is_caught() {
    let allocator = allocator(true);
    let handle = allocator.allocate(48).unwrap();
    unsafe { poke(&handle, 48, 0x00) };

    let err = allocator.free(handle).unwrap_err();
    assert_eq!(kind_of(err), CorruptionKind::GuardDamaged);
}

#[test]
fn damaged_block_is_not_freed() {
    let allocator = allocator(true);
    let handle = allocator.allocate(64).unwrap();
    let (used, _) = allocator.usage();
    unsafe { poke(&handle, -1, 0) };

    assert!(allocator.free(handle).is_err());
    assert_eq!(allocator.usage().0, used);
    assert_eq!(allocator.stats().alloc_count, 1);
}

#[test]
fn corrupt_pool_refuses_new_allocations() {
    let allocator = allocator(true);
    let victim = allocator.allocate(32).unwrap();
    unsafe { poke(&victim, 32, 0) };

    let err = allocator.allocate(16).unwrap_err();
    assert!(err.is_corruption());
    assert!(allocator.validate().is_err());
    assert!(allocator.dump().is_err());
    assert!(allocator.stats().corruption_events >= 3);
}

#[test]
fn double_free_is_invalid_param_not_corruption() {
    let allocator = allocator(true);
    let handle = allocator.allocate(32).unwrap();
    let copy = handle;
    allocator.free(handle).unwrap();

    let err = allocator.free(copy).unwrap_err();
    assert!(matches!(err, AllocError::DoubleFree { .. }));
    assert!(!err.is_corruption());
    assert_eq!(allocator.last_status(), Status::InvalidParam);
}
