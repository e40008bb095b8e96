/// GraphicsSession - owns the device, the swapchain and the three descriptor heaps
///
/// Creation order:
/// 1. render-target, depth-stencil and shader-resource heaps
/// 2. swapchain (HDR formats fall back to RGBA8 when the display cannot show them)
/// 3. one render-target view per back buffer, contiguous slots
/// 4. default depth buffer and its depth-stencil view
/// 5. viewport and scissor covering the surface

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::descriptor::{DescriptorAllocator, DescriptorHandle};
use crate::error::{Error, Result};
use crate::graphics_device::{
    Buffer, BufferDesc, Config, DescriptorHeapDesc, DescriptorHeapFlags, DescriptorHeapType, GraphicsDevice,
    Rect2D, Swapchain, SwapchainDesc, Texture, TextureFormat, TextureUsage, ViewDesc, Viewport,
};
use crate::{harness_debug, harness_error, harness_info, harness_warn};

const LOG_SOURCE: &str = "harness::GraphicsSession";

/// Format used when an HDR back buffer format cannot be presented
const SDR_FALLBACK_FORMAT: TextureFormat = TextureFormat::R8G8B8A8_UNORM;

/// A texture registered with the session and its shader-resource slot
#[derive(Clone)]
pub struct TextureEntry {
    pub texture: Arc<dyn Texture>,
    pub srv: DescriptorHandle,
}

/// Device session with swapchain, default depth buffer and descriptor heaps
pub struct GraphicsSession {
    rtv_allocator: DescriptorAllocator,
    dsv_allocator: DescriptorAllocator,
    srv_allocator: DescriptorAllocator,

    swapchain: Box<dyn Swapchain>,
    back_buffer_rtvs: Vec<DescriptorHandle>,
    surface_format: TextureFormat,

    depth_buffer: Arc<dyn Texture>,
    depth_dsv: DescriptorHandle,
    depth_format: TextureFormat,

    width: u32,
    height: u32,
    minimized: bool,
    viewport: Viewport,
    scissor: Rect2D,

    /// Texture database keyed by name
    textures: FxHashMap<String, TextureEntry>,

    terminated: bool,

    /// Must stay the last field: heaps and textures are released before the device
    device: Box<dyn GraphicsDevice>,
}

impl GraphicsSession {
    /// Create a session rendering to a `width` x `height` surface
    ///
    /// # Errors
    ///
    /// `Error::InitializationFailed` if any heap, the swapchain, the depth
    /// buffer or one of the initial views cannot be created, or if the
    /// configuration is unusable (zero size, zero back buffers, non-depth
    /// depth format).
    pub fn new(mut device: Box<dyn GraphicsDevice>, config: &Config, width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(init_failed(format!("surface size {}x{} is empty", width, height)));
        }
        if config.back_buffer_count == 0 {
            return Err(init_failed("back_buffer_count must be at least 1".to_string()));
        }
        if !config.depth_format.is_depth() {
            return Err(init_failed(format!("{:?} is not a depth format", config.depth_format)));
        }

        // 1. Descriptor heaps
        let capacities = config.descriptor_capacities;
        let mut rtv_allocator = DescriptorAllocator::new(
            device.as_mut(),
            &DescriptorHeapDesc {
                heap_type: DescriptorHeapType::RenderTarget,
                capacity: capacities.render_target,
                flags: DescriptorHeapFlags::empty(),
            },
        )?;
        let mut dsv_allocator = DescriptorAllocator::new(
            device.as_mut(),
            &DescriptorHeapDesc {
                heap_type: DescriptorHeapType::DepthStencil,
                capacity: capacities.depth_stencil,
                flags: DescriptorHeapFlags::empty(),
            },
        )?;
        let srv_allocator = DescriptorAllocator::new(
            device.as_mut(),
            &DescriptorHeapDesc {
                heap_type: DescriptorHeapType::ShaderResource,
                capacity: capacities.shader_resource,
                flags: DescriptorHeapFlags::SHADER_VISIBLE,
            },
        )?;

        // 2. Swapchain
        let mut format = config.back_buffer_format;
        if format.is_hdr() && !device.supports_hdr_output() {
            harness_warn!(
                LOG_SOURCE,
                "Display cannot present {:?}, falling back to {:?}",
                format,
                SDR_FALLBACK_FORMAT
            );
            format = SDR_FALLBACK_FORMAT;
        }

        let swapchain = device
            .create_swapchain(&SwapchainDesc {
                image_count: config.back_buffer_count,
                format,
                width,
                height,
            })
            .map_err(|e| init_failed(format!("swapchain: {}", e)))?;
        let surface_format = swapchain.format();

        // 3. Back buffer render-target views
        let back_buffer_rtvs = rtv_allocator.alloc_many(swapchain.image_count() as u32)?;
        write_back_buffer_views(device.as_mut(), swapchain.as_ref(), &back_buffer_rtvs)
            .map_err(|e| init_failed(format!("back buffer views: {}", e)))?;

        // 4. Default depth buffer
        let depth_buffer = device
            .create_depth_buffer(swapchain.width(), swapchain.height(), config.depth_format)
            .map_err(|e| init_failed(format!("depth buffer: {}", e)))?;
        let depth_dsv = write_depth_view(device.as_mut(), &mut dsv_allocator, depth_buffer.as_ref(), config.depth_format)
            .map_err(|e| init_failed(format!("depth buffer view: {}", e)))?;

        // 5. Viewport and scissor
        let (width, height) = (swapchain.width(), swapchain.height());

        harness_info!(
            LOG_SOURCE,
            "Session ready: {}x{}, {} back buffers ({:?}), depth {:?}",
            width,
            height,
            back_buffer_rtvs.len(),
            surface_format,
            config.depth_format
        );

        Ok(Self {
            device,
            rtv_allocator,
            dsv_allocator,
            srv_allocator,
            swapchain,
            back_buffer_rtvs,
            surface_format,
            depth_buffer,
            depth_dsv,
            depth_format: config.depth_format,
            width,
            height,
            minimized: false,
            viewport: Viewport::full(width, height),
            scissor: Rect2D::full(width, height),
            textures: FxHashMap::default(),
            terminated: false,
        })
    }

    // ===== RESIZE =====

    /// React to a window size change
    ///
    /// The new size is always recorded. Minimized windows (or a zero-sized
    /// surface) stop there; otherwise the swapchain is recreated, the back
    /// buffer views are rewritten and the depth buffer is rebuilt.
    ///
    /// The back buffer views keep their slots. If the swapchain comes back
    /// with fewer images the surplus slots are freed; with more images the
    /// block grows in place when it ends at the high water mark, otherwise a
    /// new block is taken and the old one is freed. Freed RTV slots only
    /// return through single `alloc`, so that last case leaves them to
    /// callers of `allocator_mut(RenderTarget)`.
    ///
    /// # Errors
    ///
    /// Errors from the device, the swapchain or the RTV/DSV allocators. The
    /// recorded size keeps the new value. Viewport and scissor keep the
    /// values of the last successful resize. `back_buffer_rtvs()` always
    /// lists allocated slots. If the views could not be written, those slots
    /// may still point at images of the previous swapchain. If the new depth
    /// buffer cannot be created, the previous depth buffer and its DSV stay
    /// in place; if its view cannot be written, the new depth buffer is kept
    /// without a DSV (`depth_dsv()` is the invalid handle).
    pub fn on_size_changed(&mut self, width: u32, height: u32, minimized: bool) -> Result<()> {
        self.width = width;
        self.height = height;
        self.minimized = minimized;

        if minimized || width == 0 || height == 0 {
            harness_debug!(LOG_SOURCE, "Resize to {}x{} skipped (minimized: {})", width, height, minimized);
            return Ok(());
        }

        self.device.wait_idle()?;
        self.swapchain.recreate(width, height)?;

        let image_count = self.swapchain.image_count();
        if image_count != self.back_buffer_rtvs.len() {
            self.resize_back_buffer_rtvs(image_count)?;
        }
        write_back_buffer_views(self.device.as_mut(), self.swapchain.as_ref(), &self.back_buffer_rtvs)?;

        self.rebuild_depth_target()?;

        self.width = self.swapchain.width();
        self.height = self.swapchain.height();
        self.viewport = Viewport::full(self.width, self.height);
        self.scissor = Rect2D::full(self.width, self.height);

        harness_info!(LOG_SOURCE, "Resized to {}x{}", self.width, self.height);
        Ok(())
    }

    /// Give the back buffers `image_count` contiguous RTV slots
    fn resize_back_buffer_rtvs(&mut self, image_count: usize) -> Result<()> {
        let current = self.back_buffer_rtvs.len();
        harness_debug!(LOG_SOURCE, "Back buffer count changed: {} -> {}", current, image_count);

        if image_count < current {
            let surplus = self.back_buffer_rtvs.split_off(image_count);
            for rtv in surplus {
                self.rtv_allocator.free(rtv)?;
            }
            return Ok(());
        }

        let extra = (image_count - current) as u32;
        let at_mark = match self.back_buffer_rtvs.last() {
            Some(last) => last.index() + 1 == self.rtv_allocator.high_water_mark(),
            None => true,
        };
        if at_mark {
            let tail = self.rtv_allocator.alloc_many(extra)?;
            self.back_buffer_rtvs.extend(tail);
            return Ok(());
        }

        let first_free = self.rtv_allocator.high_water_mark();
        let block = self.rtv_allocator.alloc_many(image_count as u32)?;
        let previous = std::mem::replace(&mut self.back_buffer_rtvs, block);
        harness_warn!(
            LOG_SOURCE,
            "Back buffer RTVs moved to slots {}..{}, {} old slots go back to the free list",
            first_free,
            first_free + image_count as u32,
            previous.len()
        );
        for rtv in previous {
            self.rtv_allocator.free(rtv)?;
        }
        Ok(())
    }

    /// Replace the depth buffer with one matching the swapchain
    ///
    /// The old DSV slot is freed before the new one is allocated, so FIFO
    /// reuse hands the same slot back.
    fn rebuild_depth_target(&mut self) -> Result<()> {
        let depth_buffer = self.device.create_depth_buffer(
            self.swapchain.width(),
            self.swapchain.height(),
            self.depth_format,
        )?;

        self.dsv_allocator.free(self.depth_dsv)?;
        self.depth_dsv = DescriptorHandle::default();
        self.depth_buffer = depth_buffer;

        self.depth_dsv = write_depth_view(
            self.device.as_mut(),
            &mut self.dsv_allocator,
            self.depth_buffer.as_ref(),
            self.depth_format,
        )?;
        Ok(())
    }

    // ===== BUFFERS =====

    /// Create `count` constant buffers of at least `size` bytes each
    ///
    /// Sizes are rounded up to `CONSTANT_BUFFER_ALIGNMENT`. The buffers live
    /// in upload memory and are written with `Buffer::update`, typically one
    /// per back buffer so a frame in flight keeps its own copy.
    ///
    /// # Errors
    ///
    /// `Error::InvalidResource` if `size` is 0, or the device error of the
    /// first buffer that fails (buffers created before it are released).
    pub fn create_constant_buffers(&mut self, size: u64, count: usize) -> Result<Vec<Arc<dyn Buffer>>> {
        if size == 0 {
            harness_error!(LOG_SOURCE, "create_constant_buffers: size must be non-zero");
            return Err(Error::InvalidResource("constant buffer size must be non-zero".to_string()));
        }

        let desc = BufferDesc::constant(size);
        let buffers = (0..count)
            .map(|_| self.device.create_buffer(&desc))
            .collect::<Result<Vec<_>>>()?;

        harness_debug!(LOG_SOURCE, "Created {} constant buffers of {} bytes", count, desc.size);
        Ok(buffers)
    }

    // ===== TEXTURES =====

    /// Register a sampled texture under `name` and give it a shader-resource slot
    ///
    /// Registering a name twice returns the first entry's slot; the second
    /// texture is ignored.
    pub fn register_texture(&mut self, name: &str, texture: Arc<dyn Texture>) -> Result<DescriptorHandle> {
        if let Some(entry) = self.textures.get(name) {
            harness_debug!(LOG_SOURCE, "Texture '{}' already registered (slot {})", name, entry.srv.index());
            return Ok(entry.srv);
        }

        let info = texture.info().clone();
        if info.usage != TextureUsage::Sampled {
            harness_error!(LOG_SOURCE, "Texture '{}' has usage {:?}, expected Sampled", name, info.usage);
            return Err(Error::InvalidResource(format!(
                "texture '{}' cannot be sampled (usage {:?})",
                name, info.usage
            )));
        }

        let srv = self.srv_allocator.alloc()?;
        let view = ViewDesc::ShaderResource {
            format: info.format,
            mip_levels: info.mip_levels,
        };
        if let Err(e) = self.device.create_view(texture.as_ref(), &view, srv) {
            self.srv_allocator.free(srv)?;
            return Err(e);
        }

        harness_debug!(LOG_SOURCE, "Registered texture '{}' at slot {}", name, srv.index());
        self.textures.insert(name.to_string(), TextureEntry { texture, srv });
        Ok(srv)
    }

    /// Registered texture by name
    pub fn texture(&self, name: &str) -> Option<&TextureEntry> {
        self.textures.get(name)
    }

    /// Number of registered textures
    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    /// Forget a registered texture and free its shader-resource slot
    ///
    /// # Errors
    ///
    /// `Error::InvalidResource` if no texture is registered under `name`.
    pub fn release_texture(&mut self, name: &str) -> Result<()> {
        let entry = self.textures.remove(name).ok_or_else(|| {
            harness_error!(LOG_SOURCE, "release_texture: '{}' is not registered", name);
            Error::InvalidResource(format!("texture '{}' is not registered", name))
        })?;
        self.srv_allocator.free(entry.srv)
    }

    /// Contiguous block of `count` shader-resource slots (descriptor table)
    pub fn allocate_shader_resources(&mut self, count: u32) -> Result<Vec<DescriptorHandle>> {
        self.srv_allocator.alloc_many(count)
    }

    // ===== ALLOCATORS =====

    /// Allocator of the given heap
    pub fn allocator(&self, heap_type: DescriptorHeapType) -> &DescriptorAllocator {
        match heap_type {
            DescriptorHeapType::RenderTarget => &self.rtv_allocator,
            DescriptorHeapType::DepthStencil => &self.dsv_allocator,
            DescriptorHeapType::ShaderResource => &self.srv_allocator,
        }
    }

    /// Mutable allocator of the given heap
    pub fn allocator_mut(&mut self, heap_type: DescriptorHeapType) -> &mut DescriptorAllocator {
        match heap_type {
            DescriptorHeapType::RenderTarget => &mut self.rtv_allocator,
            DescriptorHeapType::DepthStencil => &mut self.dsv_allocator,
            DescriptorHeapType::ShaderResource => &mut self.srv_allocator,
        }
    }

    // ===== ACCESSORS =====

    pub fn device(&self) -> &dyn GraphicsDevice {
        self.device.as_ref()
    }

    pub fn device_mut(&mut self) -> &mut dyn GraphicsDevice {
        self.device.as_mut()
    }

    pub fn swapchain(&self) -> &dyn Swapchain {
        self.swapchain.as_ref()
    }

    /// Render-target view of each back buffer, in swapchain image order
    pub fn back_buffer_rtvs(&self) -> &[DescriptorHandle] {
        &self.back_buffer_rtvs
    }

    pub fn depth_buffer(&self) -> &Arc<dyn Texture> {
        &self.depth_buffer
    }

    pub fn depth_dsv(&self) -> DescriptorHandle {
        self.depth_dsv
    }

    /// Format actually used by the back buffers (after HDR fallback)
    pub fn surface_format(&self) -> TextureFormat {
        self.surface_format
    }

    pub fn depth_format(&self) -> TextureFormat {
        self.depth_format
    }

    /// Last size reported through `on_size_changed` (or the creation size)
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn is_minimized(&self) -> bool {
        self.minimized
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn scissor(&self) -> Rect2D {
        self.scissor
    }

    // ===== SHUTDOWN =====

    /// Wait for the device to finish all submitted work
    ///
    /// Called automatically on drop if not called before.
    pub fn terminate(&mut self) -> Result<()> {
        if self.terminated {
            return Ok(());
        }
        self.device.wait_idle()?;
        self.terminated = true;
        harness_info!(LOG_SOURCE, "Session terminated");
        Ok(())
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }
}

impl Drop for GraphicsSession {
    fn drop(&mut self) {
        if !self.terminated {
            if let Err(e) = self.device.wait_idle() {
                harness_warn!(LOG_SOURCE, "wait_idle failed during drop: {}", e);
            }
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn init_failed(message: String) -> Error {
    harness_error!(LOG_SOURCE, "Initialization failed: {}", message);
    Error::InitializationFailed(message)
}

/// Write one render-target view per swapchain image into `rtvs`
fn write_back_buffer_views(
    device: &mut dyn GraphicsDevice,
    swapchain: &dyn Swapchain,
    rtvs: &[DescriptorHandle],
) -> Result<()> {
    let view = ViewDesc::RenderTarget { format: swapchain.format() };
    for (index, rtv) in rtvs.iter().enumerate() {
        let image = swapchain.image(index).ok_or_else(|| {
            harness_error!(LOG_SOURCE, "Swapchain has no image {}", index);
            Error::InvalidResource(format!("swapchain image {} does not exist", index))
        })?;
        device.create_view(image.as_ref(), &view, *rtv)?;
    }
    Ok(())
}

/// Allocate a DSV slot and write a depth-stencil view of `depth_buffer` into it
///
/// The slot is freed again if the view cannot be written.
fn write_depth_view(
    device: &mut dyn GraphicsDevice,
    dsv_allocator: &mut DescriptorAllocator,
    depth_buffer: &dyn Texture,
    format: TextureFormat,
) -> Result<DescriptorHandle> {
    let dsv = dsv_allocator.alloc()?;
    if let Err(e) = device.create_view(depth_buffer, &ViewDesc::DepthStencil { format }, dsv) {
        dsv_allocator.free(dsv)?;
        return Err(e);
    }
    Ok(dsv)
}

#[cfg(test)]
#[path = "graphics_session_tests.rs"]
mod tests;
