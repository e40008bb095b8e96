/// DescriptorAllocator - hands out slots of one descriptor heap
///
/// One allocator per heap. Single slots recycle freed ones oldest-first;
/// batches always take fresh contiguous slots so their indices can be bound
/// as a table.

use std::fmt;
use std::sync::Arc;

use crate::descriptor::DescriptorHandle;
use crate::error::{Error, Result};
use crate::graphics_device::{
    GraphicsDevice, DescriptorHeap, DescriptorHeapDesc, DescriptorHeapType,
    CpuDescriptorAddress, GpuDescriptorAddress,
};
use crate::utils::{FreeOutcome, SlotAllocator};
use crate::{harness_debug, harness_error, harness_trace};

const LOG_SOURCE: &str = "harness::DescriptorAllocator";

// ============================================================================
// DescriptorRange
// ============================================================================

/// Addressing of a contiguous block of descriptor slots
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DescriptorRange {
    /// Kind of descriptors in the block
    pub heap_type: DescriptorHeapType,
    /// Number of slots
    pub capacity: u32,
    /// Host address of slot 0
    pub cpu_start: CpuDescriptorAddress,
    /// Device address of slot 0 (0 if not shader-visible)
    pub gpu_start: GpuDescriptorAddress,
    /// Bytes between two consecutive slots
    pub stride: u32,
}

impl DescriptorRange {
    /// Whether the slots have device addresses (a GPU start of 0 means none)
    pub fn is_shader_visible(&self) -> bool {
        self.gpu_start != GpuDescriptorAddress(0)
    }

    /// Handle for slot `index` (pure address arithmetic, no bounds check)
    ///
    /// Slots of a range without device addresses all report a GPU address of 0.
    pub fn handle_at(&self, index: u32) -> DescriptorHandle {
        let gpu = if self.is_shader_visible() {
            self.gpu_start.offset(index, self.stride)
        } else {
            GpuDescriptorAddress(0)
        };
        DescriptorHandle::new(self.cpu_start.offset(index, self.stride), gpu, index)
    }

    /// Whether every slot address (and the end of the last slot) fits in 64 bits
    fn fits_address_space(&self) -> bool {
        let cpu_fits = self.cpu_start.checked_offset(self.capacity, self.stride).is_some();
        let gpu_fits = !self.is_shader_visible()
            || self.gpu_start.checked_offset(self.capacity, self.stride).is_some();
        cpu_fits && gpu_fits
    }
}

// ============================================================================
// DescriptorAllocator
// ============================================================================

/// Slot allocator over one descriptor heap
pub struct DescriptorAllocator {
    range: DescriptorRange,
    slots: SlotAllocator,
    /// Backing heap, kept alive as long as the allocator
    heap: Option<Arc<dyn DescriptorHeap>>,
}

impl DescriptorAllocator {
    /// Create the heap described by `desc` and an allocator over it
    ///
    /// # Errors
    ///
    /// `Error::InitializationFailed` if `desc.capacity` is 0, if the device
    /// cannot create the heap, or if the heap's slots cannot be addressed
    /// (zero increment size, address overflow).
    pub fn new(device: &mut dyn GraphicsDevice, desc: &DescriptorHeapDesc) -> Result<Self> {
        if desc.capacity == 0 {
            harness_error!(LOG_SOURCE, "Cannot create a {:?} heap with zero capacity", desc.heap_type);
            return Err(Error::InitializationFailed(format!(
                "{:?} descriptor heap needs at least one slot",
                desc.heap_type
            )));
        }

        let heap = device.create_descriptor_heap(desc).map_err(|e| {
            harness_error!(LOG_SOURCE, "Failed to create {:?} descriptor heap: {}", desc.heap_type, e);
            Error::InitializationFailed(format!("{:?} descriptor heap: {}", desc.heap_type, e))
        })?;

        let range = DescriptorRange {
            heap_type: desc.heap_type,
            capacity: desc.capacity,
            cpu_start: heap.cpu_start(),
            gpu_start: heap.gpu_start(),
            stride: device.descriptor_increment_size(desc.heap_type),
        };

        harness_debug!(
            LOG_SOURCE,
            "{:?} heap ready: {} slots, stride {}, cpu {:#x}, gpu {:#x}",
            range.heap_type,
            range.capacity,
            range.stride,
            range.cpu_start.0,
            range.gpu_start.0
        );

        let mut allocator = Self::from_range(range)?;
        allocator.heap = Some(heap);
        Ok(allocator)
    }

    /// Allocator over an already existing block of slots
    ///
    /// # Errors
    ///
    /// `Error::InitializationFailed` if `range.stride` is 0 or if the slots
    /// would run past the end of the 64-bit address space.
    pub fn from_range(range: DescriptorRange) -> Result<Self> {
        if range.stride == 0 {
            harness_error!(LOG_SOURCE, "Zero increment size for {:?}", range.heap_type);
            return Err(Error::InitializationFailed(format!(
                "{:?} descriptor increment size is 0",
                range.heap_type
            )));
        }
        if !range.fits_address_space() {
            harness_error!(
                LOG_SOURCE,
                "{:?} range of {} x {} bytes at cpu {:#x}, gpu {:#x} overflows the address space",
                range.heap_type,
                range.capacity,
                range.stride,
                range.cpu_start.0,
                range.gpu_start.0
            );
            return Err(Error::InitializationFailed(format!(
                "{:?} descriptor range overflows the address space",
                range.heap_type
            )));
        }

        Ok(Self {
            range,
            slots: SlotAllocator::with_capacity(range.capacity),
            heap: None,
        })
    }

    /// Allocate one slot, reusing the oldest freed slot first
    ///
    /// # Errors
    ///
    /// `Error::CapacityExhausted` when no freed slot is waiting and every
    /// slot of the heap has been handed out.
    pub fn alloc(&mut self) -> Result<DescriptorHandle> {
        match self.slots.alloc() {
            Some(index) => {
                harness_trace!(LOG_SOURCE, "{:?} alloc -> slot {}", self.range.heap_type, index);
                Ok(self.range.handle_at(index))
            }
            None => {
                harness_error!(
                    LOG_SOURCE,
                    "{:?} heap exhausted ({} slots)",
                    self.range.heap_type,
                    self.range.capacity
                );
                Err(self.exhausted())
            }
        }
    }

    /// Allocate `count` fresh slots with contiguous indices
    ///
    /// Freed slots are never used here, even if enough of them are waiting.
    /// `count == 0` returns an empty vector.
    ///
    /// # Errors
    ///
    /// `Error::CapacityExhausted` if the batch does not fit between the high
    /// water mark and the capacity. Nothing is allocated in that case.
    pub fn alloc_many(&mut self, count: u32) -> Result<Vec<DescriptorHandle>> {
        let indices = self.slots.alloc_contiguous(count).ok_or_else(|| {
            harness_error!(
                LOG_SOURCE,
                "{:?} heap cannot fit {} contiguous slots (mark {}, capacity {})",
                self.range.heap_type,
                count,
                self.slots.high_water_mark(),
                self.range.capacity
            );
            self.exhausted()
        })?;

        if !indices.is_empty() {
            harness_trace!(LOG_SOURCE, "{:?} alloc_many -> slots {:?}", self.range.heap_type, indices);
        }

        Ok(indices.map(|index| self.range.handle_at(index)).collect())
    }

    /// Return a slot for reuse
    ///
    /// Freeing the default (invalid) handle does nothing.
    ///
    /// # Errors
    ///
    /// * `Error::DoubleFree` if the slot is already waiting in the free list
    /// * `Error::InvalidResource` if the handle does not come from this allocator
    pub fn free(&mut self, handle: DescriptorHandle) -> Result<()> {
        if !handle.is_valid() {
            return Ok(());
        }

        if !self.owns(handle) {
            harness_error!(
                LOG_SOURCE,
                "Handle {:#x} (slot {}) does not belong to the {:?} heap",
                handle.cpu().0,
                handle.index(),
                self.range.heap_type
            );
            return Err(Error::InvalidResource(format!(
                "descriptor slot {} is not part of the {:?} heap",
                handle.index(),
                self.range.heap_type
            )));
        }

        match self.slots.free(handle.index()) {
            FreeOutcome::Released => {
                harness_trace!(LOG_SOURCE, "{:?} free slot {}", self.range.heap_type, handle.index());
                Ok(())
            }
            FreeOutcome::AlreadyFree => {
                harness_error!(
                    LOG_SOURCE,
                    "{:?} slot {} freed twice",
                    self.range.heap_type,
                    handle.index()
                );
                Err(Error::DoubleFree {
                    heap_type: self.range.heap_type,
                    index: handle.index(),
                })
            }
            FreeOutcome::NeverAllocated => {
                harness_error!(
                    LOG_SOURCE,
                    "{:?} slot {} was never allocated",
                    self.range.heap_type,
                    handle.index()
                );
                Err(Error::InvalidResource(format!(
                    "{:?} descriptor slot {} was never allocated",
                    self.range.heap_type,
                    handle.index()
                )))
            }
        }
    }

    /// Whether `handle` addresses a slot of this allocator's heap
    pub fn owns(&self, handle: DescriptorHandle) -> bool {
        handle.is_valid()
            && handle.index() < self.range.capacity
            && self.range.handle_at(handle.index()) == handle
    }

    /// Handle for slot `index` without allocating it
    pub fn handle_at(&self, index: u32) -> Option<DescriptorHandle> {
        (index < self.range.capacity).then(|| self.range.handle_at(index))
    }

    fn exhausted(&self) -> Error {
        Error::CapacityExhausted {
            heap_type: self.range.heap_type,
            capacity: self.range.capacity,
        }
    }

    // ===== QUERIES =====

    pub fn heap_type(&self) -> DescriptorHeapType {
        self.range.heap_type
    }

    pub fn capacity(&self) -> u32 {
        self.range.capacity
    }

    pub fn stride(&self) -> u32 {
        self.range.stride
    }

    pub fn range(&self) -> &DescriptorRange {
        &self.range
    }

    /// Next never-used slot index
    pub fn high_water_mark(&self) -> u32 {
        self.slots.high_water_mark()
    }

    /// Number of live (allocated, not freed) slots
    pub fn len(&self) -> u32 {
        self.slots.len()
    }

    /// Number of freed slots waiting for reuse
    pub fn free_count(&self) -> u32 {
        self.slots.free_count()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Backing heap (None for allocators built with `from_range`)
    pub fn heap(&self) -> Option<&Arc<dyn DescriptorHeap>> {
        self.heap.as_ref()
    }
}

impl fmt::Debug for DescriptorAllocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DescriptorAllocator")
            .field("range", &self.range)
            .field("high_water_mark", &self.slots.high_water_mark())
            .field("free_count", &self.slots.free_count())
            .field("has_heap", &self.heap.is_some())
            .finish()
    }
}

#[cfg(test)]
#[path = "descriptor_allocator_tests.rs"]
mod tests;
