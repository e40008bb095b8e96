/// DescriptorHandle - one slot of a descriptor heap, seen from host and device

use crate::graphics_device::{CpuDescriptorAddress, GpuDescriptorAddress};

/// A single descriptor slot.
///
/// Carries both addresses of the slot (host address for writing views,
/// device address for binding) plus the slot index. Plain value: copying
/// a handle does not duplicate the slot, and dropping one does not free it.
///
/// `DescriptorHandle::default()` is the invalid handle. It is what callers
/// hold before allocating, and freeing it is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DescriptorHandle {
    cpu: CpuDescriptorAddress,
    gpu: GpuDescriptorAddress,
    index: u32,
    valid: bool,
}

impl DescriptorHandle {
    /// Build a valid handle for slot `index`
    pub fn new(cpu: CpuDescriptorAddress, gpu: GpuDescriptorAddress, index: u32) -> Self {
        Self {
            cpu,
            gpu,
            index,
            valid: true,
        }
    }

    /// Host address of the slot
    pub fn cpu(&self) -> CpuDescriptorAddress {
        self.cpu
    }

    /// Device address of the slot (0 for non-shader-visible heaps)
    pub fn gpu(&self) -> GpuDescriptorAddress {
        self.gpu
    }

    /// Slot index inside its heap
    pub fn index(&self) -> u32 {
        self.index
    }

    /// False only for the default handle
    pub fn is_valid(&self) -> bool {
        self.valid
    }
}

#[cfg(test)]
#[path = "descriptor_handle_tests.rs"]
mod tests;
