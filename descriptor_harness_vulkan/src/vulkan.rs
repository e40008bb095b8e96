/// VulkanGraphicsDevice - Vulkan implementation of the GraphicsDevice trait

use std::ffi::{CStr, CString};
use std::mem::ManuallyDrop;
use std::sync::{Arc, Mutex, Weak};

use ash::vk;
use descriptor_harness::harness::descriptor::DescriptorHandle;
use descriptor_harness::harness::device::{
    Buffer as HarnessBuffer, BufferDesc, Config, DescriptorHeap as HarnessDescriptorHeap,
    DescriptorHeapDesc, DescriptorHeapType, GraphicsDevice, Swapchain as HarnessSwapchain,
    SwapchainDesc, Texture as HarnessTexture, TextureFormat, TextureInfo, TextureUsage, ViewDesc,
};
use descriptor_harness::harness::{Error, Result};
use descriptor_harness::{harness_bail, harness_debug, harness_err, harness_error, harness_info, harness_warn};
use gpu_allocator::vulkan::{Allocator, AllocatorCreateDesc};
use gpu_allocator::MemoryLocation;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};

use crate::vulkan_buffer::Buffer;
use crate::vulkan_context::GpuContext;
use crate::vulkan_descriptor_heap::{view_handle_bytes, DescriptorHeap};
use crate::vulkan_swapchain::{surface_supports_hdr, Swapchain};
use crate::vulkan_texture::Texture;

const VALIDATION_LAYER: &CStr = c"VK_LAYER_KHRONOS_validation";

/// Vulkan graphics device
///
/// Owns the instance, the logical device and the presentation surface of
/// one window. Shader-visible descriptor heaps are `VK_EXT_descriptor_buffer`
/// buffers, so the device requires that extension and buffer device addresses.
pub struct VulkanGraphicsDevice {
    /// Vulkan entry (keeps the loader alive)
    _entry: ash::Entry,
    /// Vulkan instance
    instance: ash::Instance,
    /// Physical device
    physical_device: vk::PhysicalDevice,

    /// Presentation surface of the window given at creation
    surface: vk::SurfaceKHR,
    surface_loader: ash::khr::surface::Instance,

    /// VK_EXT_descriptor_buffer entry points
    descriptor_buffer_loader: ash::ext::descriptor_buffer::Device,
    /// Size of one sampled-image descriptor
    sampled_image_descriptor_size: u32,
    /// Slot stride of shader-resource heaps
    shader_resource_stride: u32,

    /// Whether the surface offers an HDR10 color space
    hdr_output: bool,

    /// Every heap created by this device, for address lookup in create_view
    heaps: Vec<Weak<DescriptorHeap>>,

    /// GPU memory allocator reference (stored in GpuContext)
    allocator: ManuallyDrop<Arc<Mutex<Allocator>>>,

    /// Shared GPU context for all resources (heaps, textures, swapchains)
    gpu_context: Arc<GpuContext>,
}

impl VulkanGraphicsDevice {
    /// Create the device for `window`
    ///
    /// Picks the first GPU (discrete preferred) that can present to the
    /// window and supports descriptor buffers.
    pub fn new<W: HasDisplayHandle + HasWindowHandle>(window: &W, config: &Config) -> Result<Self> {
        unsafe {
            let entry = ash::Entry::load().map_err(|e| {
                harness_error!("harness::vulkan", "Failed to load Vulkan library: {:?}", e);
                Error::InitializationFailed(format!("Failed to load Vulkan library: {:?}", e))
            })?;

            let app_name = CString::new(config.app_name.as_str()).map_err(|e| {
                Error::InitializationFailed(format!("Invalid application name: {}", e))
            })?;
            let (major, minor, patch) = config.app_version;
            let app_info = vk::ApplicationInfo::default()
                .application_name(&app_name)
                .application_version(vk::make_api_version(0, major, minor, patch))
                .engine_name(c"DescriptorHarness")
                .engine_version(vk::make_api_version(0, 0, 1, 0))
                .api_version(vk::API_VERSION_1_3);

            // Required instance extensions
            let display_handle = window.display_handle().map_err(|e| {
                harness_error!("harness::vulkan", "Failed to get display handle: {}", e);
                Error::InitializationFailed(format!("Failed to get display handle: {}", e))
            })?;
            let mut extension_names = ash_window::enumerate_required_extensions(display_handle.as_raw())
                .map_err(|e| {
                    harness_error!("harness::vulkan", "Failed to get required extensions: {}", e);
                    Error::InitializationFailed(format!("Failed to get required extensions: {}", e))
                })?
                .to_vec();

            // HDR color spaces are only reported with VK_EXT_swapchain_colorspace
            let available_extensions = entry
                .enumerate_instance_extension_properties(None)
                .unwrap_or_default();
            let has_colorspace_ext = available_extensions.iter().any(|ext| {
                ext.extension_name_as_c_str()
                    .is_ok_and(|name| name == ash::ext::swapchain_colorspace::NAME)
            });
            if has_colorspace_ext {
                extension_names.push(ash::ext::swapchain_colorspace::NAME.as_ptr());
            }

            // Validation layers
            let wants_validation = config.enable_validation || cfg!(feature = "vulkan-validation");
            let layer_names = if wants_validation && Self::validation_layer_available(&entry) {
                vec![VALIDATION_LAYER.as_ptr()]
            } else {
                if wants_validation {
                    harness_warn!("harness::vulkan", "Validation requested but {:?} is not installed", VALIDATION_LAYER);
                }
                vec![]
            };

            let create_info = vk::InstanceCreateInfo::default()
                .application_info(&app_info)
                .enabled_layer_names(&layer_names)
                .enabled_extension_names(&extension_names);

            let instance = entry.create_instance(&create_info, None).map_err(|e| {
                harness_error!("harness::vulkan", "Failed to create Vulkan instance: {:?}", e);
                Error::InitializationFailed(format!("Failed to create instance: {:?}", e))
            })?;

            // Surface (kept for the swapchain)
            let window_handle = window.window_handle().map_err(|e| {
                harness_error!("harness::vulkan", "Failed to get window handle: {}", e);
                Error::InitializationFailed(format!("Failed to get window handle: {}", e))
            })?;
            let surface = ash_window::create_surface(
                &entry,
                &instance,
                display_handle.as_raw(),
                window_handle.as_raw(),
                None,
            )
            .map_err(|e| {
                harness_error!("harness::vulkan", "Failed to create surface: {:?}", e);
                Error::InitializationFailed(format!("Failed to create surface: {:?}", e))
            })?;

            let surface_loader = ash::khr::surface::Instance::new(&entry, &instance);

            let (physical_device, queue_family) =
                Self::pick_physical_device(&instance, &surface_loader, surface)?;

            let device_props = instance.get_physical_device_properties(physical_device);
            harness_info!(
                "harness::vulkan",
                "Using GPU: {}",
                device_props
                    .device_name_as_c_str()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_default()
            );

            // Logical device with descriptor buffers and buffer device addresses
            let queue_priorities = [1.0];
            let queue_create_infos = [vk::DeviceQueueCreateInfo::default()
                .queue_family_index(queue_family)
                .queue_priorities(&queue_priorities)];

            let device_extension_names = [
                ash::khr::swapchain::NAME.as_ptr(),
                ash::ext::descriptor_buffer::NAME.as_ptr(),
            ];

            let mut vulkan12_features = vk::PhysicalDeviceVulkan12Features::default()
                .buffer_device_address(true);
            let mut descriptor_buffer_features = vk::PhysicalDeviceDescriptorBufferFeaturesEXT::default()
                .descriptor_buffer(true);

            let device_create_info = vk::DeviceCreateInfo::default()
                .queue_create_infos(&queue_create_infos)
                .enabled_extension_names(&device_extension_names)
                .push_next(&mut vulkan12_features)
                .push_next(&mut descriptor_buffer_features);

            let device = instance
                .create_device(physical_device, &device_create_info, None)
                .map_err(|e| {
                    harness_error!("harness::vulkan", "Failed to create logical device: {:?}", e);
                    Error::InitializationFailed(format!("Failed to create device: {:?}", e))
                })?;

            let graphics_queue = device.get_device_queue(queue_family, 0);

            let allocator = Allocator::new(&AllocatorCreateDesc {
                instance: instance.clone(),
                device: device.clone(),
                physical_device,
                debug_settings: Default::default(),
                buffer_device_address: true,
                allocation_sizes: Default::default(),
            })
            .map_err(|e| {
                harness_error!("harness::vulkan", "Failed to create GPU allocator: {:?}", e);
                Error::InitializationFailed(format!("Failed to create allocator: {:?}", e))
            })?;

            // Descriptor sizes
            let mut descriptor_buffer_props = vk::PhysicalDeviceDescriptorBufferPropertiesEXT::default();
            {
                let mut props2 = vk::PhysicalDeviceProperties2::default().push_next(&mut descriptor_buffer_props);
                instance.get_physical_device_properties2(physical_device, &mut props2);
            }
            let sampled_image_descriptor_size = descriptor_buffer_props.sampled_image_descriptor_size as u32;
            let shader_resource_stride = shader_resource_stride(&descriptor_buffer_props);

            let surface_formats = surface_loader
                .get_physical_device_surface_formats(physical_device, surface)
                .unwrap_or_default();
            let hdr_output = surface_supports_hdr(&surface_formats);

            harness_debug!(
                "harness::vulkan",
                "Shader-resource stride {} bytes (sampled image {}), HDR output: {}",
                shader_resource_stride,
                sampled_image_descriptor_size,
                hdr_output
            );

            let descriptor_buffer_loader = ash::ext::descriptor_buffer::Device::new(&instance, &device);

            let allocator_arc = Arc::new(Mutex::new(allocator));
            let gpu_context = Arc::new(GpuContext::new(
                device,
                Arc::clone(&allocator_arc),
                graphics_queue,
                queue_family,
            ));

            Ok(Self {
                _entry: entry,
                instance,
                physical_device,
                surface,
                surface_loader,
                descriptor_buffer_loader,
                sampled_image_descriptor_size,
                shader_resource_stride,
                hdr_output,
                heaps: Vec::new(),
                allocator: ManuallyDrop::new(allocator_arc),
                gpu_context,
            })
        }
    }

    fn validation_layer_available(entry: &ash::Entry) -> bool {
        unsafe {
            entry
                .enumerate_instance_layer_properties()
                .unwrap_or_default()
                .iter()
                .any(|layer| layer.layer_name_as_c_str().is_ok_and(|name| name == VALIDATION_LAYER))
        }
    }

    /// First suitable GPU, discrete preferred, with its graphics+present queue family
    fn pick_physical_device(
        instance: &ash::Instance,
        surface_loader: &ash::khr::surface::Instance,
        surface: vk::SurfaceKHR,
    ) -> Result<(vk::PhysicalDevice, u32)> {
        unsafe {
            let physical_devices = instance.enumerate_physical_devices().map_err(|e| {
                harness_error!("harness::vulkan", "Failed to enumerate physical devices: {:?}", e);
                Error::InitializationFailed(format!("Failed to enumerate physical devices: {:?}", e))
            })?;

            let mut candidates: Vec<(vk::PhysicalDevice, u32, vk::PhysicalDeviceType)> = Vec::new();

            for physical_device in physical_devices {
                let props = instance.get_physical_device_properties(physical_device);
                // Software rasterizers are skipped
                if props.device_type == vk::PhysicalDeviceType::CPU {
                    continue;
                }
                if props.api_version < vk::API_VERSION_1_2 {
                    continue;
                }

                let extensions = instance
                    .enumerate_device_extension_properties(physical_device)
                    .unwrap_or_default();
                let has_extension = |wanted: &CStr| {
                    extensions
                        .iter()
                        .any(|ext| ext.extension_name_as_c_str().is_ok_and(|name| name == wanted))
                };
                if !has_extension(ash::khr::swapchain::NAME) || !has_extension(ash::ext::descriptor_buffer::NAME) {
                    continue;
                }

                let mut vulkan12_features = vk::PhysicalDeviceVulkan12Features::default();
                let mut descriptor_buffer_features = vk::PhysicalDeviceDescriptorBufferFeaturesEXT::default();
                {
                    let mut features2 = vk::PhysicalDeviceFeatures2::default()
                        .push_next(&mut vulkan12_features)
                        .push_next(&mut descriptor_buffer_features);
                    instance.get_physical_device_features2(physical_device, &mut features2);
                }
                if vulkan12_features.buffer_device_address == vk::FALSE
                    || descriptor_buffer_features.descriptor_buffer == vk::FALSE
                {
                    continue;
                }

                let queue_families = instance.get_physical_device_queue_family_properties(physical_device);
                let queue_family = (0..queue_families.len() as u32).find(|&i| {
                    queue_families[i as usize].queue_flags.contains(vk::QueueFlags::GRAPHICS)
                        && surface_loader
                            .get_physical_device_surface_support(physical_device, i, surface)
                            .unwrap_or(false)
                });

                if let Some(queue_family) = queue_family {
                    candidates.push((physical_device, queue_family, props.device_type));
                }
            }

            candidates
                .iter()
                .find(|(_, _, device_type)| *device_type == vk::PhysicalDeviceType::DISCRETE_GPU)
                .or_else(|| candidates.first())
                .map(|&(physical_device, queue_family, _)| (physical_device, queue_family))
                .ok_or_else(|| {
                    harness_error!("harness::vulkan", "No GPU supports presentation and VK_EXT_descriptor_buffer");
                    Error::InitializationFailed(
                        "No GPU supports presentation and VK_EXT_descriptor_buffer".to_string(),
                    )
                })
        }
    }

    /// Create a 2D texture that can be sampled from shaders
    ///
    /// Contents are left undefined; uploading pixel data is up to the caller.
    pub fn create_sampled_texture(
        &mut self,
        width: u32,
        height: u32,
        format: TextureFormat,
        mip_levels: u32,
    ) -> Result<Arc<dyn HarnessTexture>> {
        if format.is_depth() {
            return Err(Error::InvalidResource(format!(
                "{:?} is a depth format, sampled textures must be color",
                format
            )));
        }
        let texture = self.create_image(
            width,
            height,
            format,
            mip_levels.max(1),
            vk::ImageUsageFlags::SAMPLED | vk::ImageUsageFlags::TRANSFER_DST,
            TextureUsage::Sampled,
            "sampled texture",
        )?;
        Ok(texture as Arc<dyn HarnessTexture>)
    }

    /// Image view currently held by the slot `handle` points at
    pub fn view_at(&self, handle: DescriptorHandle) -> Option<vk::ImageView> {
        let heap = self.find_heap(handle)?;
        let index = heap.slot_index(handle.cpu())?;
        heap.view(index)
    }

    /// Number of descriptor heaps created by this device that are still alive
    pub fn live_heap_count(&self) -> usize {
        self.heaps.iter().filter(|heap| heap.strong_count() > 0).count()
    }

    fn find_heap(&self, handle: DescriptorHandle) -> Option<Arc<DescriptorHeap>> {
        self.heaps
            .iter()
            .filter_map(Weak::upgrade)
            .find(|heap| heap.contains(handle.cpu()))
    }

    #[allow(clippy::too_many_arguments)]
    fn create_image(
        &self,
        width: u32,
        height: u32,
        format: TextureFormat,
        mip_levels: u32,
        usage: vk::ImageUsageFlags,
        texture_usage: TextureUsage,
        name: &str,
    ) -> Result<Arc<Texture>> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidResource(format!(
                "{} size must be non-zero, got {}x{}",
                name, width, height
            )));
        }

        let vk_format = format_to_vk(format);
        let device = &self.gpu_context.device;

        unsafe {
            let image_info = vk::ImageCreateInfo::default()
                .image_type(vk::ImageType::TYPE_2D)
                .format(vk_format)
                .extent(vk::Extent3D { width, height, depth: 1 })
                .mip_levels(mip_levels)
                .array_layers(1)
                .samples(vk::SampleCountFlags::TYPE_1)
                .tiling(vk::ImageTiling::OPTIMAL)
                .usage(usage)
                .sharing_mode(vk::SharingMode::EXCLUSIVE)
                .initial_layout(vk::ImageLayout::UNDEFINED);

            let image = device
                .create_image(&image_info, None)
                .map_err(|e| harness_err!("harness::vulkan", "Failed to create {}: {:?}", name, e))?;

            let allocation = match self.gpu_context.allocate_image_memory(image, name, MemoryLocation::GpuOnly) {
                Ok(allocation) => allocation,
                Err(e) => {
                    device.destroy_image(image, None);
                    return Err(e);
                }
            };

            Ok(Arc::new(Texture {
                image,
                format: vk_format,
                allocation: Some(allocation),
                ctx: Arc::clone(&self.gpu_context),
                info: TextureInfo {
                    width,
                    height,
                    format,
                    usage: texture_usage,
                    mip_levels,
                },
            }))
        }
    }

    /// Descriptor bytes of a sampled-image view
    fn sampled_image_descriptor(&self, view: vk::ImageView) -> Vec<u8> {
        let image_info = vk::DescriptorImageInfo::default()
            .image_view(view)
            .image_layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL);
        let get_info = vk::DescriptorGetInfoEXT::default()
            .ty(vk::DescriptorType::SAMPLED_IMAGE)
            .data(vk::DescriptorDataEXT { p_sampled_image: &image_info });

        let mut bytes = vec![0u8; self.sampled_image_descriptor_size as usize];
        unsafe {
            self.descriptor_buffer_loader.get_descriptor(&get_info, &mut bytes);
        }
        bytes
    }
}

impl GraphicsDevice for VulkanGraphicsDevice {
    fn create_descriptor_heap(&mut self, desc: &DescriptorHeapDesc) -> Result<Arc<dyn HarnessDescriptorHeap>> {
        if desc.capacity == 0 {
            harness_bail!("harness::vulkan", "Cannot create an empty {:?} descriptor heap", desc.heap_type);
        }
        if desc.is_shader_visible() && desc.heap_type != DescriptorHeapType::ShaderResource {
            return Err(Error::InvalidResource(format!(
                "{:?} heaps cannot be shader-visible",
                desc.heap_type
            )));
        }

        let stride = self.descriptor_increment_size(desc.heap_type);
        let heap = if desc.is_shader_visible() {
            DescriptorHeap::new_descriptor_buffer(Arc::clone(&self.gpu_context), desc, stride)?
        } else {
            DescriptorHeap::new_host(Arc::clone(&self.gpu_context), desc, stride)
        };
        let heap = Arc::new(heap);

        self.heaps.retain(|heap| heap.strong_count() > 0);
        self.heaps.push(Arc::downgrade(&heap));

        harness_debug!(
            "harness::vulkan",
            "Created {:?} descriptor heap: {} slots x {} bytes, shader-visible: {}",
            desc.heap_type,
            desc.capacity,
            stride,
            desc.is_shader_visible()
        );
        Ok(heap as Arc<dyn HarnessDescriptorHeap>)
    }

    fn descriptor_increment_size(&self, heap_type: DescriptorHeapType) -> u32 {
        match heap_type {
            DescriptorHeapType::RenderTarget | DescriptorHeapType::DepthStencil => {
                std::mem::size_of::<vk::ImageView>() as u32
            }
            DescriptorHeapType::ShaderResource => self.shader_resource_stride,
        }
    }

    fn supports_hdr_output(&self) -> bool {
        self.hdr_output
    }

    fn create_swapchain(&mut self, desc: &SwapchainDesc) -> Result<Box<dyn HarnessSwapchain>> {
        let swapchain = Swapchain::new(
            Arc::clone(&self.gpu_context),
            self.physical_device,
            &self.instance,
            self.surface,
            self.surface_loader.clone(),
            desc,
        )?;
        Ok(Box::new(swapchain))
    }

    fn create_depth_buffer(&mut self, width: u32, height: u32, format: TextureFormat) -> Result<Arc<dyn HarnessTexture>> {
        if !format.is_depth() {
            return Err(Error::InvalidResource(format!("{:?} is not a depth format", format)));
        }
        let texture = self.create_image(
            width,
            height,
            format,
            1,
            vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT,
            TextureUsage::DepthStencil,
            "depth buffer",
        )?;
        Ok(texture as Arc<dyn HarnessTexture>)
    }

    fn create_buffer(&mut self, desc: &BufferDesc) -> Result<Arc<dyn HarnessBuffer>> {
        let buffer = Buffer::new(Arc::clone(&self.gpu_context), desc)?;
        harness_debug!("harness::vulkan", "Created {:?} buffer of {} bytes", desc.usage, desc.size);
        Ok(Arc::new(buffer) as Arc<dyn HarnessBuffer>)
    }

    fn create_view(&mut self, texture: &dyn HarnessTexture, view: &ViewDesc, target: DescriptorHandle) -> Result<()> {
        if !target.is_valid() {
            return Err(Error::InvalidResource("cannot write a view into an invalid descriptor handle".to_string()));
        }

        let vk_texture = texture
            .as_any()
            .downcast_ref::<Texture>()
            .ok_or_else(|| Error::InvalidResource("texture was not created by the Vulkan device".to_string()))?;

        let heap = self.find_heap(target).ok_or_else(|| {
            Error::InvalidResource(format!("descriptor address {:#x} is not in any heap of this device", target.cpu().0))
        })?;

        let heap_type = heap.desc().heap_type;
        if heap_type != view.heap_type() {
            return Err(Error::InvalidResource(format!(
                "{:?} view cannot be written into a {:?} heap",
                view.heap_type(),
                heap_type
            )));
        }

        let index = heap.slot_index(target.cpu()).ok_or_else(|| {
            Error::InvalidResource(format!("descriptor address {:#x} is not slot-aligned", target.cpu().0))
        })?;

        let (format, aspect_mask, level_count, required_usage) = match *view {
            ViewDesc::RenderTarget { format } => {
                (format, vk::ImageAspectFlags::COLOR, 1, TextureUsage::RenderTarget)
            }
            ViewDesc::DepthStencil { format } => {
                (format, vk::ImageAspectFlags::DEPTH, 1, TextureUsage::DepthStencil)
            }
            ViewDesc::ShaderResource { format, mip_levels } => {
                (format, aspect_mask(format), mip_levels.max(1), TextureUsage::Sampled)
            }
        };

        if vk_texture.info.usage != required_usage {
            return Err(Error::InvalidResource(format!(
                "{:?} view needs a {:?} texture, got {:?}",
                view.heap_type(),
                required_usage,
                vk_texture.info.usage
            )));
        }

        let view_info = vk::ImageViewCreateInfo::default()
            .image(vk_texture.image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(format_to_vk(format))
            .components(vk::ComponentMapping {
                r: vk::ComponentSwizzle::IDENTITY,
                g: vk::ComponentSwizzle::IDENTITY,
                b: vk::ComponentSwizzle::IDENTITY,
                a: vk::ComponentSwizzle::IDENTITY,
            })
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask,
                base_mip_level: 0,
                level_count: level_count.min(vk_texture.info.mip_levels),
                base_array_layer: 0,
                layer_count: 1,
            });

        let image_view = unsafe {
            self.gpu_context
                .device
                .create_image_view(&view_info, None)
                .map_err(|e| harness_err!("harness::vulkan", "Failed to create {:?} image view: {:?}", heap_type, e))?
        };

        let payload = match heap_type {
            DescriptorHeapType::ShaderResource => self.sampled_image_descriptor(image_view),
            DescriptorHeapType::RenderTarget | DescriptorHeapType::DepthStencil => {
                view_handle_bytes(image_view).to_vec()
            }
        };

        heap.write_slot(index, image_view, &payload)
    }

    fn wait_idle(&self) -> Result<()> {
        unsafe {
            self.gpu_context
                .device
                .device_wait_idle()
                .map_err(|e| harness_err!("harness::vulkan", "Failed to wait idle: {:?}", e))
        }
    }
}

impl Drop for VulkanGraphicsDevice {
    fn drop(&mut self) {
        unsafe {
            // Wait for device to finish
            self.gpu_context.device.device_wait_idle().ok();

            self.heaps.clear();

            // Drop allocator: free VkDeviceMemory pages BEFORE destroying device.
            // First drop our Arc, then GpuContext's ManuallyDrop Arc.
            ManuallyDrop::drop(&mut self.allocator);
            if let Some(ctx) = Arc::get_mut(&mut self.gpu_context) {
                ManuallyDrop::drop(&mut ctx.allocator);
            } else {
                harness_warn!(
                    "harness::vulkan",
                    "GPU resources outlive the device, their memory is leaked"
                );
            }

            self.surface_loader.destroy_surface(self.surface, None);
            self.gpu_context.device.destroy_device(None);
            self.instance.destroy_instance(None);
        }
    }
}

// ============================================================================
// Format helpers
// ============================================================================

/// Convert TextureFormat to Vulkan format
pub(crate) fn format_to_vk(format: TextureFormat) -> vk::Format {
    match format {
        TextureFormat::R8G8B8A8_SRGB => vk::Format::R8G8B8A8_SRGB,
        TextureFormat::R8G8B8A8_UNORM => vk::Format::R8G8B8A8_UNORM,
        TextureFormat::B8G8R8A8_SRGB => vk::Format::B8G8R8A8_SRGB,
        TextureFormat::B8G8R8A8_UNORM => vk::Format::B8G8R8A8_UNORM,
        TextureFormat::R16G16B16A16_FLOAT => vk::Format::R16G16B16A16_SFLOAT,
        TextureFormat::R10G10B10A2_UNORM => vk::Format::A2B10G10R10_UNORM_PACK32,
        TextureFormat::D16_UNORM => vk::Format::D16_UNORM,
        TextureFormat::D32_FLOAT => vk::Format::D32_SFLOAT,
        TextureFormat::D24_UNORM_S8_UINT => vk::Format::D24_UNORM_S8_UINT,
    }
}

/// Convert Vulkan format to TextureFormat (None for formats the harness does not use)
pub(crate) fn vk_format_to_format(format: vk::Format) -> Option<TextureFormat> {
    match format {
        vk::Format::R8G8B8A8_SRGB => Some(TextureFormat::R8G8B8A8_SRGB),
        vk::Format::R8G8B8A8_UNORM => Some(TextureFormat::R8G8B8A8_UNORM),
        vk::Format::B8G8R8A8_SRGB => Some(TextureFormat::B8G8R8A8_SRGB),
        vk::Format::B8G8R8A8_UNORM => Some(TextureFormat::B8G8R8A8_UNORM),
        vk::Format::R16G16B16A16_SFLOAT => Some(TextureFormat::R16G16B16A16_FLOAT),
        vk::Format::A2B10G10R10_UNORM_PACK32 => Some(TextureFormat::R10G10B10A2_UNORM),
        vk::Format::D16_UNORM => Some(TextureFormat::D16_UNORM),
        vk::Format::D32_SFLOAT => Some(TextureFormat::D32_FLOAT),
        vk::Format::D24_UNORM_S8_UINT => Some(TextureFormat::D24_UNORM_S8_UINT),
        _ => None,
    }
}

/// Aspect sampled by a shader-resource view of `format`
pub(crate) fn aspect_mask(format: TextureFormat) -> vk::ImageAspectFlags {
    if format.is_depth() {
        vk::ImageAspectFlags::DEPTH
    } else {
        vk::ImageAspectFlags::COLOR
    }
}

/// Slot stride of a shader-resource heap: room for any CBV/SRV/UAV descriptor
pub(crate) fn shader_resource_stride(props: &vk::PhysicalDeviceDescriptorBufferPropertiesEXT) -> u32 {
    [
        props.sampled_image_descriptor_size,
        props.storage_image_descriptor_size,
        props.uniform_buffer_descriptor_size,
        props.storage_buffer_descriptor_size,
    ]
    .into_iter()
    .max()
    .unwrap_or(0) as u32
}

#[cfg(test)]
#[path = "vulkan_format_tests.rs"]
mod tests;
