/// Swapchain - Vulkan implementation of the Swapchain trait

use std::sync::Arc;

use ash::vk;
use descriptor_harness::harness::device::{
    Swapchain as HarnessSwapchain, SwapchainDesc, Texture as HarnessTexture,
    TextureFormat, TextureInfo, TextureUsage,
};
use descriptor_harness::harness::{Error, Result};
use descriptor_harness::{harness_err, harness_error, harness_warn};

use crate::vulkan::{format_to_vk, vk_format_to_format};
use crate::vulkan_context::GpuContext;
use crate::vulkan_texture::Texture;

/// Vulkan swapchain implementation
///
/// Owns the back buffer images of the device's presentation surface. The
/// surface itself belongs to the device. Views of the back buffers are written
/// into the render-target heap by the caller.
pub struct Swapchain {
    /// Shared GPU context
    ctx: Arc<GpuContext>,
    /// Physical device for capabilities queries
    physical_device: vk::PhysicalDevice,

    /// Surface (owned by VulkanGraphicsDevice)
    surface: vk::SurfaceKHR,
    surface_loader: ash::khr::surface::Instance,

    /// Swapchain
    swapchain: vk::SwapchainKHR,
    swapchain_loader: ash::khr::swapchain::Device,
    surface_format: vk::SurfaceFormatKHR,
    extent: vk::Extent2D,

    /// Number of back buffers asked for at creation
    requested_image_count: u32,

    /// Back buffers, wrapped as non-owning textures
    images: Vec<Arc<Texture>>,
}

impl Swapchain {
    /// Create a new swapchain
    ///
    /// # Arguments
    ///
    /// * `ctx` - Shared GPU context
    /// * `physical_device` - Vulkan physical device
    /// * `instance` - Vulkan instance (for the swapchain loader)
    /// * `surface` - Window surface
    /// * `surface_loader` - Surface loader
    /// * `desc` - Requested image count, format and size
    pub(crate) fn new(
        ctx: Arc<GpuContext>,
        physical_device: vk::PhysicalDevice,
        instance: &ash::Instance,
        surface: vk::SurfaceKHR,
        surface_loader: ash::khr::surface::Instance,
        desc: &SwapchainDesc,
    ) -> Result<Self> {
        unsafe {
            let surface_formats = surface_loader
                .get_physical_device_surface_formats(physical_device, surface)
                .map_err(|e| {
                    harness_error!("harness::vulkan", "Failed to query surface formats: {:?}", e);
                    Error::InitializationFailed(format!("Failed to get surface formats: {:?}", e))
                })?;

            let requested = format_to_vk(desc.format);
            let surface_format = choose_surface_format(&surface_formats, requested).ok_or_else(|| {
                harness_error!("harness::vulkan", "Surface reports no formats");
                Error::InitializationFailed("Surface reports no formats".to_string())
            })?;

            if surface_format.format != requested {
                harness_warn!(
                    "harness::vulkan",
                    "Surface does not support {:?}, using {:?}",
                    desc.format,
                    surface_format.format
                );
            }

            let swapchain_loader = ash::khr::swapchain::Device::new(instance, &ctx.device);

            let mut swapchain = Self {
                ctx,
                physical_device,
                surface,
                surface_loader,
                swapchain: vk::SwapchainKHR::null(),
                swapchain_loader,
                surface_format,
                extent: vk::Extent2D { width: desc.width, height: desc.height },
                requested_image_count: desc.image_count,
                images: Vec::new(),
            };
            swapchain.build(desc.width, desc.height)?;
            Ok(swapchain)
        }
    }

    /// Vulkan color space of the back buffers
    pub fn color_space(&self) -> vk::ColorSpaceKHR {
        self.surface_format.color_space
    }

    /// (Re)create the VkSwapchainKHR and wrap its images, retiring the old one
    fn build(&mut self, width: u32, height: u32) -> Result<()> {
        unsafe {
            let capabilities = self
                .surface_loader
                .get_physical_device_surface_capabilities(self.physical_device, self.surface)
                .map_err(|e| {
                    harness_error!("harness::vulkan", "Failed to get surface capabilities: {:?}", e);
                    Error::InitializationFailed(format!("Failed to get surface capabilities: {:?}", e))
                })?;

            let extent = choose_extent(width, height, &capabilities);
            let image_count = choose_image_count(self.requested_image_count, &capabilities);

            let old_swapchain = self.swapchain;
            let create_info = vk::SwapchainCreateInfoKHR::default()
                .surface(self.surface)
                .min_image_count(image_count)
                .image_format(self.surface_format.format)
                .image_color_space(self.surface_format.color_space)
                .image_extent(extent)
                .image_array_layers(1)
                .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::TRANSFER_DST)
                .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
                .pre_transform(capabilities.current_transform)
                .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
                .present_mode(vk::PresentModeKHR::FIFO)
                .clipped(true)
                .old_swapchain(old_swapchain);

            let swapchain = self
                .swapchain_loader
                .create_swapchain(&create_info, None)
                .map_err(|e| {
                    harness_error!("harness::vulkan", "Failed to create swapchain: {:?}", e);
                    Error::InitializationFailed(format!("Failed to create swapchain: {:?}", e))
                })?;

            // Old images die with the old swapchain
            self.images.clear();
            if old_swapchain != vk::SwapchainKHR::null() {
                self.swapchain_loader.destroy_swapchain(old_swapchain, None);
            }
            self.swapchain = swapchain;
            self.extent = extent;

            let vk_images = self
                .swapchain_loader
                .get_swapchain_images(swapchain)
                .map_err(|e| {
                    harness_error!("harness::vulkan", "Failed to get swapchain images: {:?}", e);
                    Error::InitializationFailed(format!("Failed to get swapchain images: {:?}", e))
                })?;

            let format = self.format();
            self.images = vk_images
                .into_iter()
                .map(|image| {
                    Arc::new(Texture::borrowed(
                        Arc::clone(&self.ctx),
                        image,
                        self.surface_format.format,
                        TextureInfo {
                            width: extent.width,
                            height: extent.height,
                            format,
                            usage: TextureUsage::RenderTarget,
                            mip_levels: 1,
                        },
                    ))
                })
                .collect();

            Ok(())
        }
    }
}

impl HarnessSwapchain for Swapchain {
    fn image_count(&self) -> usize {
        self.images.len()
    }

    fn image(&self, index: usize) -> Option<Arc<dyn HarnessTexture>> {
        self.images
            .get(index)
            .map(|texture| Arc::clone(texture) as Arc<dyn HarnessTexture>)
    }

    fn recreate(&mut self, width: u32, height: u32) -> Result<()> {
        unsafe {
            self.ctx
                .device
                .device_wait_idle()
                .map_err(|e| harness_err!("harness::vulkan", "Failed to wait idle before swapchain recreate: {:?}", e))?;
        }
        self.build(width, height)
    }

    fn width(&self) -> u32 {
        self.extent.width
    }

    fn height(&self) -> u32 {
        self.extent.height
    }

    fn format(&self) -> TextureFormat {
        vk_format_to_format(self.surface_format.format).unwrap_or(TextureFormat::B8G8R8A8_UNORM)
    }
}

impl Drop for Swapchain {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.device_wait_idle().ok();
            self.images.clear();
            self.swapchain_loader.destroy_swapchain(self.swapchain, None);
        }
    }
}

// ============================================================================
// Surface negotiation (pure, no GPU required)
// ============================================================================

/// Pick the surface format for `requested`
///
/// Exact format match first, then an 8-bit UNORM format, then whatever the
/// surface lists first.
pub(crate) fn choose_surface_format(
    available: &[vk::SurfaceFormatKHR],
    requested: vk::Format,
) -> Option<vk::SurfaceFormatKHR> {
    available
        .iter()
        .find(|f| f.format == requested)
        .or_else(|| {
            available.iter().find(|f| {
                f.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR
                    && (f.format == vk::Format::B8G8R8A8_UNORM || f.format == vk::Format::R8G8B8A8_UNORM)
            })
        })
        .or_else(|| available.first())
        .copied()
}

/// Whether any surface format is presented in the HDR10 (ST.2084) color space
pub(crate) fn surface_supports_hdr(available: &[vk::SurfaceFormatKHR]) -> bool {
    available
        .iter()
        .any(|f| f.color_space == vk::ColorSpaceKHR::HDR10_ST2084_EXT)
}

/// Clamp the requested image count to what the surface allows
pub(crate) fn choose_image_count(requested: u32, capabilities: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let count = requested.max(capabilities.min_image_count);
    if capabilities.max_image_count > 0 {
        count.min(capabilities.max_image_count)
    } else {
        count
    }
}

/// Use the surface extent when fixed, else clamp the requested size
pub(crate) fn choose_extent(width: u32, height: u32, capabilities: &vk::SurfaceCapabilitiesKHR) -> vk::Extent2D {
    if capabilities.current_extent.width != u32::MAX {
        capabilities.current_extent
    } else {
        vk::Extent2D {
            width: width.clamp(
                capabilities.min_image_extent.width,
                capabilities.max_image_extent.width,
            ),
            height: height.clamp(
                capabilities.min_image_extent.height,
                capabilities.max_image_extent.height,
            ),
        }
    }
}

#[cfg(test)]
#[path = "vulkan_swapchain_tests.rs"]
mod tests;
