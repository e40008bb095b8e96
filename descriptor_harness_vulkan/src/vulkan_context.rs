/// GpuContext - Shared GPU state for all Vulkan objects
///
/// Contains everything a heap, texture or swapchain needs after creation:
/// - Device for Vulkan API calls
/// - Allocator for memory management
/// - Graphics queue (also used for presentation)

use ash::vk;
use descriptor_harness::harness::{Error, Result};
use descriptor_harness::harness_err;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme, Allocator};
use gpu_allocator::MemoryLocation;
use std::mem::ManuallyDrop;
use std::sync::{Arc, Mutex, MutexGuard};

/// Shared GPU context for all Vulkan resources.
///
/// Shared (via `Arc`) by heaps, textures and swapchains so none of them
/// duplicates device/allocator references.
///
/// Note: device destruction is handled by VulkanGraphicsDevice::drop()
/// so the destruction order stays explicit.
pub struct GpuContext {
    /// Vulkan logical device
    pub device: ash::Device,

    /// GPU memory allocator
    /// Wrapped in ManuallyDrop to ensure it's dropped BEFORE the device is destroyed
    pub allocator: ManuallyDrop<Arc<Mutex<Allocator>>>,

    /// Graphics queue
    pub graphics_queue: vk::Queue,

    /// Graphics queue family index
    pub graphics_queue_family: u32,
}

impl GpuContext {
    pub fn new(
        device: ash::Device,
        allocator: Arc<Mutex<Allocator>>,
        graphics_queue: vk::Queue,
        graphics_queue_family: u32,
    ) -> Self {
        Self {
            device,
            allocator: ManuallyDrop::new(allocator),
            graphics_queue,
            graphics_queue_family,
        }
    }

    /// Lock the allocator, reporting a poisoned lock as a backend error
    pub fn lock_allocator(&self) -> Result<MutexGuard<'_, Allocator>> {
        self.allocator
            .lock()
            .map_err(|_| harness_err!("harness::vulkan", "GPU allocator lock poisoned"))
    }

    /// Allocate and bind memory for `image`
    pub fn allocate_image_memory(&self, image: vk::Image, name: &str, location: MemoryLocation) -> Result<Allocation> {
        unsafe {
            let requirements = self.device.get_image_memory_requirements(image);
            let allocation = self
                .lock_allocator()?
                .allocate(&AllocationCreateDesc {
                    name,
                    requirements,
                    location,
                    linear: false,
                    allocation_scheme: AllocationScheme::GpuAllocatorManaged,
                })
                .map_err(|e| {
                    descriptor_harness::harness_error!(
                        "harness::vulkan",
                        "Out of GPU memory for {} ({} bytes): {:?}",
                        name,
                        requirements.size,
                        e
                    );
                    Error::OutOfMemory
                })?;

            if let Err(e) = self.device.bind_image_memory(image, allocation.memory(), allocation.offset()) {
                self.free(allocation);
                return Err(harness_err!("harness::vulkan", "Failed to bind {} memory: {:?}", name, e));
            }
            Ok(allocation)
        }
    }

    /// Allocate and bind memory for `buffer`
    pub fn allocate_buffer_memory(&self, buffer: vk::Buffer, name: &str, location: MemoryLocation) -> Result<Allocation> {
        unsafe {
            let requirements = self.device.get_buffer_memory_requirements(buffer);
            let allocation = self
                .lock_allocator()?
                .allocate(&AllocationCreateDesc {
                    name,
                    requirements,
                    location,
                    linear: true,
                    allocation_scheme: AllocationScheme::GpuAllocatorManaged,
                })
                .map_err(|e| {
                    descriptor_harness::harness_error!(
                        "harness::vulkan",
                        "Out of GPU memory for {} ({} bytes): {:?}",
                        name,
                        requirements.size,
                        e
                    );
                    Error::OutOfMemory
                })?;

            if let Err(e) = self.device.bind_buffer_memory(buffer, allocation.memory(), allocation.offset()) {
                self.free(allocation);
                return Err(harness_err!("harness::vulkan", "Failed to bind {} memory: {:?}", name, e));
            }
            Ok(allocation)
        }
    }

    /// Return an allocation to the allocator (used from Drop impls, never fails)
    pub fn free(&self, allocation: Allocation) {
        // Don't panic if lock fails - the caller still destroys its Vulkan object
        if let Ok(mut allocator) = self.allocator.lock() {
            allocator.free(allocation).ok();
        }
    }
}
