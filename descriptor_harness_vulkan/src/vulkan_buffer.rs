/// Buffer - Vulkan implementation of the Buffer trait

use std::any::Any;
use std::sync::Arc;

use ash::vk;
use descriptor_harness::harness::device::{check_update_range, Buffer as HarnessBuffer, BufferDesc, BufferUsage};
use descriptor_harness::harness::{Error, Result};
use descriptor_harness::{harness_bail, harness_err, harness_error};
use gpu_allocator::vulkan::Allocation;
use gpu_allocator::MemoryLocation;

use crate::vulkan_context::GpuContext;

/// Vulkan buffer implementation
///
/// Always allocated in host-visible `CpuToGpu` memory, which stays mapped
/// for the lifetime of the buffer.
pub struct Buffer {
    /// Shared GPU context (device, allocator)
    ctx: Arc<GpuContext>,
    /// Vulkan buffer
    pub(crate) buffer: vk::Buffer,
    /// GPU memory allocation
    pub(crate) allocation: Option<Allocation>,
    /// Creation parameters
    desc: BufferDesc,
}

impl Buffer {
    /// Create a buffer in upload memory
    pub(crate) fn new(ctx: Arc<GpuContext>, desc: &BufferDesc) -> Result<Self> {
        if desc.size == 0 {
            return Err(Error::InvalidResource("buffer size must be non-zero".to_string()));
        }

        unsafe {
            let buffer_info = vk::BufferCreateInfo::default()
                .size(desc.size)
                .usage(buffer_usage_to_vk(desc.usage) | vk::BufferUsageFlags::TRANSFER_DST)
                .sharing_mode(vk::SharingMode::EXCLUSIVE);

            let buffer = ctx
                .device
                .create_buffer(&buffer_info, None)
                .map_err(|e| harness_err!("harness::vulkan", "Failed to create buffer: {:?}", e))?;

            let allocation = match ctx.allocate_buffer_memory(buffer, "buffer", MemoryLocation::CpuToGpu) {
                Ok(allocation) => allocation,
                Err(e) => {
                    ctx.device.destroy_buffer(buffer, None);
                    return Err(e);
                }
            };

            if allocation.mapped_ptr().is_none() {
                ctx.free(allocation);
                ctx.device.destroy_buffer(buffer, None);
                harness_bail!("harness::vulkan", "Buffer memory is not host-visible");
            }

            Ok(Self {
                ctx,
                buffer,
                allocation: Some(allocation),
                desc: *desc,
            })
        }
    }

    /// Vulkan buffer handle
    pub fn buffer(&self) -> vk::Buffer {
        self.buffer
    }
}

impl HarnessBuffer for Buffer {
    fn desc(&self) -> &BufferDesc {
        &self.desc
    }

    fn update(&self, offset: u64, data: &[u8]) -> Result<()> {
        check_update_range(self.desc.size, offset, data.len())?;

        let Some(allocation) = &self.allocation else {
            harness_error!("harness::vulkan", "Buffer update failed: no GPU allocation");
            return Err(Error::BackendError("Buffer has no allocation".to_string()));
        };
        let mapped_ptr = allocation
            .mapped_ptr()
            .ok_or_else(|| Error::BackendError("Buffer is not CPU-accessible".to_string()))?
            .as_ptr() as *mut u8;

        unsafe {
            std::ptr::copy_nonoverlapping(data.as_ptr(), mapped_ptr.add(offset as usize), data.len());
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        if let Some(allocation) = self.allocation.take() {
            self.ctx.free(allocation);
        }
        unsafe {
            self.ctx.device.destroy_buffer(self.buffer, None);
        }
    }
}

/// Vulkan usage flags for a buffer usage
pub(crate) fn buffer_usage_to_vk(usage: BufferUsage) -> vk::BufferUsageFlags {
    match usage {
        BufferUsage::Constant => vk::BufferUsageFlags::UNIFORM_BUFFER,
        BufferUsage::Vertex => vk::BufferUsageFlags::VERTEX_BUFFER,
        BufferUsage::Index => vk::BufferUsageFlags::INDEX_BUFFER,
        BufferUsage::Storage => vk::BufferUsageFlags::STORAGE_BUFFER,
    }
}

#[cfg(test)]
#[path = "vulkan_buffer_tests.rs"]
mod tests;
