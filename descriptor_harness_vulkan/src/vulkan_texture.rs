/// Texture - Vulkan implementation of the Texture trait

use std::any::Any;
use std::sync::Arc;

use ash::vk;
use descriptor_harness::harness::device::{Texture as HarnessTexture, TextureInfo};
use gpu_allocator::vulkan::Allocation;

use crate::vulkan_context::GpuContext;

/// Vulkan texture implementation
///
/// Views are not stored here: they live in the descriptor heap slot they were
/// written into, so one image can be viewed from several heaps.
pub struct Texture {
    /// Vulkan image
    pub(crate) image: vk::Image,
    /// Vulkan format of the image
    pub(crate) format: vk::Format,
    /// GPU memory allocation (None for swapchain images, owned by the swapchain)
    pub(crate) allocation: Option<Allocation>,
    /// Shared GPU context (for cleanup)
    pub(crate) ctx: Arc<GpuContext>,
    /// Read-only texture properties
    pub(crate) info: TextureInfo,
}

impl Texture {
    /// Wrap an image owned by someone else (swapchain back buffer)
    pub(crate) fn borrowed(ctx: Arc<GpuContext>, image: vk::Image, format: vk::Format, info: TextureInfo) -> Self {
        Self {
            image,
            format,
            allocation: None,
            ctx,
            info,
        }
    }

    /// Vulkan image handle
    pub fn image(&self) -> vk::Image {
        self.image
    }

    /// Vulkan format of the image
    pub fn vk_format(&self) -> vk::Format {
        self.format
    }

    /// Whether dropping this texture destroys the image
    pub fn owns_image(&self) -> bool {
        self.allocation.is_some()
    }
}

impl HarnessTexture for Texture {
    fn info(&self) -> &TextureInfo {
        &self.info
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for Texture {
    fn drop(&mut self) {
        if let Some(allocation) = self.allocation.take() {
            self.ctx.free(allocation);
            unsafe {
                self.ctx.device.destroy_image(self.image, None);
            }
        }
    }
}
