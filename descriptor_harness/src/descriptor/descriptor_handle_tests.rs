/// Unit tests for DescriptorHandle

use super::*;
use std::collections::HashSet;

#[test]
fn test_default_handle_is_invalid() {
    let handle = DescriptorHandle::default();
    assert!(!handle.is_valid());
    assert_eq!(handle.cpu(), CpuDescriptorAddress(0));
    assert_eq!(handle.gpu(), GpuDescriptorAddress(0));
    assert_eq!(handle.index(), 0);
}

#[test]
fn test_new_handle_is_valid() {
    let handle = DescriptorHandle::new(CpuDescriptorAddress(0x1010), GpuDescriptorAddress(0x2010), 1);
    assert!(handle.is_valid());
    assert_eq!(handle.cpu(), CpuDescriptorAddress(0x1010));
    assert_eq!(handle.gpu(), GpuDescriptorAddress(0x2010));
    assert_eq!(handle.index(), 1);
}

#[test]
fn test_slot_zero_differs_from_default() {
    // A real slot 0 at address 0 must still compare unequal to the invalid handle
    let slot_zero = DescriptorHandle::new(CpuDescriptorAddress(0), GpuDescriptorAddress(0), 0);
    assert_ne!(slot_zero, DescriptorHandle::default());
}

#[test]
fn test_handle_is_copy_and_hashable() {
    let a = DescriptorHandle::new(CpuDescriptorAddress(0x1000), GpuDescriptorAddress(0x2000), 0);
    let b = a;
    assert_eq!(a, b);

    let mut set = HashSet::new();
    set.insert(a);
    set.insert(b);
    set.insert(DescriptorHandle::new(CpuDescriptorAddress(0x1010), GpuDescriptorAddress(0x2010), 1));
    assert_eq!(set.len(), 2);
}

#[test]
fn test_address_offset() {
    assert_eq!(CpuDescriptorAddress(0x1000).offset(3, 16), CpuDescriptorAddress(0x1030));
    assert_eq!(GpuDescriptorAddress(0x2000).offset(0, 16), GpuDescriptorAddress(0x2000));
    // No u32 overflow in the product
    assert_eq!(
        CpuDescriptorAddress(0).offset(u32::MAX, 64),
        CpuDescriptorAddress(u64::from(u32::MAX) * 64)
    );
}

#[test]
fn test_address_checked_offset() {
    assert_eq!(
        CpuDescriptorAddress(0x1000).checked_offset(3, 16),
        Some(CpuDescriptorAddress(0x1030))
    );
    assert_eq!(CpuDescriptorAddress(u64::MAX - 8).checked_offset(1, 16), None);
    assert_eq!(GpuDescriptorAddress(u64::MAX).checked_offset(0, 16), Some(GpuDescriptorAddress(u64::MAX)));
    assert_eq!(GpuDescriptorAddress(u64::MAX - 15).checked_offset(1, 16), None);
}
