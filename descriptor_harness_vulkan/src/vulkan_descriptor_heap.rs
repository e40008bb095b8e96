/// DescriptorHeap - Vulkan implementation of the DescriptorHeap trait
///
/// Two storage kinds:
/// - Shader-visible heaps are `VK_EXT_descriptor_buffer` buffers in host-visible
///   memory. The host address is the mapped pointer, the device address comes
///   from `vkGetBufferDeviceAddress`.
/// - Other heaps are plain host byte arrays. Vulkan has no CPU-only descriptor
///   memory, so each slot stores the raw handle of the view written into it.
///
/// Either way the heap owns the `VkImageView` of every slot and destroys it
/// when the slot is overwritten or the heap is dropped.

use std::sync::{Arc, Mutex};

use ash::vk;
use ash::vk::Handle;
use descriptor_harness::harness::device::{
    CpuDescriptorAddress, DescriptorHeap as HarnessDescriptorHeap, DescriptorHeapDesc,
    GpuDescriptorAddress,
};
use descriptor_harness::harness::Result;
use descriptor_harness::{harness_bail, harness_err};
use gpu_allocator::vulkan::Allocation;
use gpu_allocator::MemoryLocation;

use crate::vulkan_context::GpuContext;

/// Per-slot state guarded by one lock
struct HeapSlots {
    /// View currently written into each slot (null when empty)
    views: Vec<vk::ImageView>,
    /// Backing bytes of a host heap (None for descriptor buffers)
    host_bytes: Option<Box<[u8]>>,
}

/// Vulkan descriptor heap implementation
pub struct DescriptorHeap {
    ctx: Arc<GpuContext>,
    desc: DescriptorHeapDesc,
    /// Bytes between two consecutive slots
    stride: u32,
    cpu_start: CpuDescriptorAddress,
    gpu_start: GpuDescriptorAddress,
    /// Descriptor buffer (null for host heaps)
    buffer: vk::Buffer,
    allocation: Option<Allocation>,
    slots: Mutex<HeapSlots>,
}

impl DescriptorHeap {
    /// Create a shader-visible heap backed by a descriptor buffer
    pub(crate) fn new_descriptor_buffer(
        ctx: Arc<GpuContext>,
        desc: &DescriptorHeapDesc,
        stride: u32,
    ) -> Result<Self> {
        let size = u64::from(desc.capacity) * u64::from(stride);

        unsafe {
            let buffer_info = vk::BufferCreateInfo::default()
                .size(size)
                .usage(
                    vk::BufferUsageFlags::RESOURCE_DESCRIPTOR_BUFFER_EXT
                        | vk::BufferUsageFlags::SHADER_DEVICE_ADDRESS,
                )
                .sharing_mode(vk::SharingMode::EXCLUSIVE);

            let buffer = ctx
                .device
                .create_buffer(&buffer_info, None)
                .map_err(|e| harness_err!("harness::vulkan", "Failed to create descriptor buffer: {:?}", e))?;

            let allocation = match ctx.allocate_buffer_memory(buffer, "descriptor heap", MemoryLocation::CpuToGpu) {
                Ok(allocation) => allocation,
                Err(e) => {
                    ctx.device.destroy_buffer(buffer, None);
                    return Err(e);
                }
            };

            let mapped = match allocation.mapped_ptr() {
                Some(ptr) => ptr,
                None => {
                    ctx.free(allocation);
                    ctx.device.destroy_buffer(buffer, None);
                    harness_bail!("harness::vulkan", "Descriptor buffer memory is not host-visible");
                }
            };

            let address_info = vk::BufferDeviceAddressInfo::default().buffer(buffer);
            let gpu_start = ctx.device.get_buffer_device_address(&address_info);

            Ok(Self {
                desc: *desc,
                stride,
                cpu_start: CpuDescriptorAddress(mapped.as_ptr() as u64),
                gpu_start: GpuDescriptorAddress(gpu_start),
                buffer,
                allocation: Some(allocation),
                slots: Mutex::new(HeapSlots {
                    views: vec![vk::ImageView::null(); desc.capacity as usize],
                    host_bytes: None,
                }),
                ctx,
            })
        }
    }

    /// Create a host heap (device address 0)
    pub(crate) fn new_host(ctx: Arc<GpuContext>, desc: &DescriptorHeapDesc, stride: u32) -> Self {
        let size = desc.capacity as usize * stride as usize;
        let host_bytes = vec![0u8; size].into_boxed_slice();
        // Boxed slice never moves its contents, the address stays valid
        let cpu_start = CpuDescriptorAddress(host_bytes.as_ptr() as u64);

        Self {
            ctx,
            desc: *desc,
            stride,
            cpu_start,
            gpu_start: GpuDescriptorAddress(0),
            buffer: vk::Buffer::null(),
            allocation: None,
            slots: Mutex::new(HeapSlots {
                views: vec![vk::ImageView::null(); desc.capacity as usize],
                host_bytes: Some(host_bytes),
            }),
        }
    }

    /// Bytes between two consecutive slots
    pub fn stride(&self) -> u32 {
        self.stride
    }

    /// Whether the slots live in a descriptor buffer
    pub fn is_descriptor_buffer(&self) -> bool {
        self.buffer != vk::Buffer::null()
    }

    /// Slot index of `address`, if it is the start of a slot of this heap
    pub fn slot_index(&self, address: CpuDescriptorAddress) -> Option<u32> {
        let offset = address.0.checked_sub(self.cpu_start.0)?;
        let stride = u64::from(self.stride);
        if offset % stride != 0 {
            return None;
        }
        let index = offset / stride;
        (index < u64::from(self.desc.capacity)).then_some(index as u32)
    }

    /// Whether `address` falls anywhere inside this heap
    pub fn contains(&self, address: CpuDescriptorAddress) -> bool {
        let size = u64::from(self.desc.capacity) * u64::from(self.stride);
        address.0 >= self.cpu_start.0 && address.0 - self.cpu_start.0 < size
    }

    /// View currently held by slot `index`
    pub fn view(&self, index: u32) -> Option<vk::ImageView> {
        let slots = self.slots.lock().ok()?;
        slots
            .views
            .get(index as usize)
            .copied()
            .filter(|view| *view != vk::ImageView::null())
    }

    /// Bytes of slot `index` (host heaps only)
    pub fn host_slot_bytes(&self, index: u32) -> Option<Vec<u8>> {
        let slots = self.slots.lock().ok()?;
        let bytes = slots.host_bytes.as_ref()?;
        let offset = index as usize * self.stride as usize;
        bytes.get(offset..offset + self.stride as usize).map(<[u8]>::to_vec)
    }

    /// Store `view` in slot `index` and copy `payload` into the slot's memory
    ///
    /// The view previously held by the slot is destroyed. The heap takes
    /// ownership of `view` even on error.
    pub(crate) fn write_slot(&self, index: u32, view: vk::ImageView, payload: &[u8]) -> Result<()> {
        let destroy = |view: vk::ImageView| unsafe { self.ctx.device.destroy_image_view(view, None) };

        if index >= self.desc.capacity || payload.len() > self.stride as usize {
            destroy(view);
            harness_bail!(
                "harness::vulkan",
                "Descriptor write out of bounds: slot {} ({} bytes) in {:?} heap of {} x {} bytes",
                index,
                payload.len(),
                self.desc.heap_type,
                self.desc.capacity,
                self.stride
            );
        }

        let mut slots = match self.slots.lock() {
            Ok(slots) => slots,
            Err(_) => {
                destroy(view);
                harness_bail!("harness::vulkan", "Descriptor heap lock poisoned");
            }
        };

        let offset = index as usize * self.stride as usize;
        match slots.host_bytes.as_mut() {
            Some(bytes) => bytes[offset..offset + payload.len()].copy_from_slice(payload),
            None => unsafe {
                let dst = (self.cpu_start.0 as *mut u8).add(offset);
                std::ptr::copy_nonoverlapping(payload.as_ptr(), dst, payload.len());
            },
        }

        let previous = std::mem::replace(&mut slots.views[index as usize], view);
        if previous != vk::ImageView::null() {
            destroy(previous);
        }
        Ok(())
    }
}

/// Raw handle bytes stored in host heap slots
pub(crate) fn view_handle_bytes(view: vk::ImageView) -> [u8; 8] {
    view.as_raw().to_ne_bytes()
}

impl HarnessDescriptorHeap for DescriptorHeap {
    fn desc(&self) -> &DescriptorHeapDesc {
        &self.desc
    }

    fn cpu_start(&self) -> CpuDescriptorAddress {
        self.cpu_start
    }

    fn gpu_start(&self) -> GpuDescriptorAddress {
        self.gpu_start
    }
}

impl Drop for DescriptorHeap {
    fn drop(&mut self) {
        unsafe {
            if let Ok(slots) = self.slots.get_mut() {
                for view in slots.views.drain(..) {
                    if view != vk::ImageView::null() {
                        self.ctx.device.destroy_image_view(view, None);
                    }
                }
            }

            if let Some(allocation) = self.allocation.take() {
                self.ctx.free(allocation);
            }
            if self.buffer != vk::Buffer::null() {
                self.ctx.device.destroy_buffer(self.buffer, None);
            }
        }
    }
}
