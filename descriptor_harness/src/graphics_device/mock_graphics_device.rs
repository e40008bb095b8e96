/// Mock GraphicsDevice for unit tests (no GPU required)
///
/// Hands out descriptor heaps at fake, well-separated base addresses and
/// records every call so tests can inspect what the harness asked for.

use std::any::Any;
use std::sync::{Arc, Mutex};

use crate::descriptor::DescriptorHandle;
use crate::error::{Error, Result};
use crate::graphics_device::{
    check_update_range, Buffer, BufferDesc,
    GraphicsDevice, DescriptorHeap, DescriptorHeapDesc, DescriptorHeapType,
    CpuDescriptorAddress, GpuDescriptorAddress,
    Swapchain, SwapchainDesc, Texture, TextureFormat, TextureInfo, TextureUsage, ViewDesc,
};
use crate::{harness_bail, harness_err};

/// Increment sizes reported by the mock (distinct per heap kind)
pub const MOCK_RTV_INCREMENT: u32 = 32;
pub const MOCK_DSV_INCREMENT: u32 = 8;
pub const MOCK_SRV_INCREMENT: u32 = 64;

/// Distance between the base addresses of two consecutive mock heaps
pub const MOCK_HEAP_SPACING: u64 = 0x0100_0000;

// ============================================================================
// Mock Texture
// ============================================================================

#[derive(Debug)]
pub struct MockTexture {
    pub info: TextureInfo,
    pub name: String,
}

impl MockTexture {
    pub fn new(width: u32, height: u32, format: TextureFormat, usage: TextureUsage, name: &str) -> Self {
        Self {
            info: TextureInfo {
                width,
                height,
                format,
                usage,
                mip_levels: 1,
            },
            name: name.to_string(),
        }
    }

    /// Sampled RGBA8 texture, the usual shader-resource test subject
    pub fn sampled(width: u32, height: u32, name: &str) -> Self {
        Self::new(width, height, TextureFormat::R8G8B8A8_UNORM, TextureUsage::Sampled, name)
    }
}

impl Texture for MockTexture {
    fn info(&self) -> &TextureInfo {
        &self.info
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ============================================================================
// Mock Buffer
// ============================================================================

/// Buffer backed by a host byte vector
#[derive(Debug)]
pub struct MockBuffer {
    pub desc: BufferDesc,
    pub contents: Mutex<Vec<u8>>,
}

impl MockBuffer {
    pub fn new(desc: &BufferDesc) -> Self {
        Self {
            desc: *desc,
            contents: Mutex::new(vec![0u8; desc.size as usize]),
        }
    }

    /// Copy of the current contents
    pub fn bytes(&self) -> Vec<u8> {
        self.contents.lock().unwrap().clone()
    }
}

impl Buffer for MockBuffer {
    fn desc(&self) -> &BufferDesc {
        &self.desc
    }

    fn update(&self, offset: u64, data: &[u8]) -> Result<()> {
        check_update_range(self.desc.size, offset, data.len())?;
        let start = offset as usize;
        self.contents.lock().unwrap()[start..start + data.len()].copy_from_slice(data);
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ============================================================================
// Mock DescriptorHeap
// ============================================================================

#[derive(Debug)]
pub struct MockDescriptorHeap {
    pub desc: DescriptorHeapDesc,
    pub cpu_start: CpuDescriptorAddress,
    pub gpu_start: GpuDescriptorAddress,
}

impl DescriptorHeap for MockDescriptorHeap {
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

// ============================================================================
// Mock Swapchain
// ============================================================================

#[derive(Debug)]
pub struct MockSwapchain {
    pub images: Vec<Arc<MockTexture>>,
    pub format: TextureFormat,
    pub width: u32,
    pub height: u32,
    /// Incremented on every recreate()
    pub generation: u32,
    /// Image count after recreate() (None keeps the current count)
    pub recreate_image_count: Option<usize>,
}

impl MockSwapchain {
    pub fn new(desc: &SwapchainDesc) -> Self {
        let mut swapchain = Self {
            images: Vec::new(),
            format: desc.format,
            width: desc.width,
            height: desc.height,
            generation: 0,
            recreate_image_count: None,
        };
        swapchain.build_images(desc.image_count as usize);
        swapchain
    }

    fn build_images(&mut self, count: usize) {
        self.images = (0..count)
            .map(|i| {
                Arc::new(MockTexture::new(
                    self.width,
                    self.height,
                    self.format,
                    TextureUsage::RenderTarget,
                    &format!("back_buffer_{}_gen{}", i, self.generation),
                ))
            })
            .collect();
    }
}

impl Swapchain for MockSwapchain {
    fn image_count(&self) -> usize {
        self.images.len()
    }

    fn image(&self, index: usize) -> Option<Arc<dyn Texture>> {
        self.images
            .get(index)
            .map(|image| Arc::clone(image) as Arc<dyn Texture>)
    }

    fn recreate(&mut self, width: u32, height: u32) -> Result<()> {
        self.width = width;
        self.height = height;
        self.generation += 1;
        let count = self.recreate_image_count.unwrap_or(self.images.len());
        self.build_images(count);
        Ok(())
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn format(&self) -> TextureFormat {
        self.format
    }
}

// ============================================================================
// Mock GraphicsDevice
// ============================================================================

/// A view written by `create_view`
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedView {
    pub view: ViewDesc,
    pub target: DescriptorHandle,
    pub texture: TextureInfo,
}

/// Everything the mock device has been asked to do
#[derive(Debug, Default)]
pub struct MockDeviceState {
    pub heaps: Vec<(DescriptorHeapDesc, CpuDescriptorAddress, GpuDescriptorAddress)>,
    pub swapchains: Vec<SwapchainDesc>,
    pub depth_buffers: Vec<(u32, u32, TextureFormat)>,
    pub buffers: Vec<BufferDesc>,
    pub views: Vec<RecordedView>,
    pub wait_idle_calls: u32,
    /// When set, create_depth_buffer fails
    pub fail_depth_buffers: bool,
    /// When set, create_view fails for views written into heaps of this kind
    pub fail_views: Option<DescriptorHeapType>,
}

impl MockDeviceState {
    /// Views written into the heap of the given kind, in call order
    pub fn views_of(&self, heap_type: DescriptorHeapType) -> Vec<RecordedView> {
        self.views
            .iter()
            .filter(|v| v.view.heap_type() == heap_type)
            .cloned()
            .collect()
    }
}

/// Mock GraphicsDevice that tracks calls without GPU
#[derive(Debug)]
pub struct MockGraphicsDevice {
    /// Shared call record (clone it before handing the device to a session)
    pub state: Arc<Mutex<MockDeviceState>>,
    /// Heap kind whose creation fails, if any
    pub fail_heap: Option<DescriptorHeapType>,
    /// Answer for supports_hdr_output()
    pub hdr_output: bool,
    /// Image count swapchains switch to when recreated (None keeps it)
    pub recreate_image_count: Option<usize>,
}

impl MockGraphicsDevice {
    /// Create a new mock device
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockDeviceState::default())),
            fail_heap: None,
            hdr_output: false,
            recreate_image_count: None,
        }
    }

    /// Mock device whose heap creation fails for `heap_type`
    pub fn failing_heap(heap_type: DescriptorHeapType) -> Self {
        Self {
            fail_heap: Some(heap_type),
            ..Self::new()
        }
    }

    fn increment(heap_type: DescriptorHeapType) -> u32 {
        match heap_type {
            DescriptorHeapType::RenderTarget => MOCK_RTV_INCREMENT,
            DescriptorHeapType::DepthStencil => MOCK_DSV_INCREMENT,
            DescriptorHeapType::ShaderResource => MOCK_SRV_INCREMENT,
        }
    }
}

impl GraphicsDevice for MockGraphicsDevice {
    fn create_descriptor_heap(&mut self, desc: &DescriptorHeapDesc) -> Result<Arc<dyn DescriptorHeap>> {
        if self.fail_heap == Some(desc.heap_type) {
            harness_bail!("harness::mock", "create_descriptor_heap: injected failure for {:?}", desc.heap_type);
        }

        let mut state = self.state.lock().unwrap();
        let ordinal = state.heaps.len() as u64 + 1;
        let cpu_start = CpuDescriptorAddress(ordinal * MOCK_HEAP_SPACING);
        let gpu_start = if desc.is_shader_visible() {
            GpuDescriptorAddress(0x8000_0000_0000 + ordinal * MOCK_HEAP_SPACING)
        } else {
            GpuDescriptorAddress(0)
        };
        state.heaps.push((*desc, cpu_start, gpu_start));

        Ok(Arc::new(MockDescriptorHeap {
            desc: *desc,
            cpu_start,
            gpu_start,
        }))
    }

    fn descriptor_increment_size(&self, heap_type: DescriptorHeapType) -> u32 {
        Self::increment(heap_type)
    }

    fn supports_hdr_output(&self) -> bool {
        self.hdr_output
    }

    fn create_swapchain(&mut self, desc: &SwapchainDesc) -> Result<Box<dyn Swapchain>> {
        self.state.lock().unwrap().swapchains.push(*desc);
        let mut swapchain = MockSwapchain::new(desc);
        swapchain.recreate_image_count = self.recreate_image_count;
        Ok(Box::new(swapchain))
    }

    fn create_depth_buffer(&mut self, width: u32, height: u32, format: TextureFormat) -> Result<Arc<dyn Texture>> {
        if !format.is_depth() {
            harness_bail!("harness::mock", "create_depth_buffer: {:?} is not a depth format", format);
        }
        let mut state = self.state.lock().unwrap();
        if state.fail_depth_buffers {
            harness_bail!("harness::mock", "create_depth_buffer: injected failure");
        }
        state.depth_buffers.push((width, height, format));
        Ok(Arc::new(MockTexture::new(width, height, format, TextureUsage::DepthStencil, "depth_buffer")))
    }

    fn create_buffer(&mut self, desc: &BufferDesc) -> Result<Arc<dyn Buffer>> {
        if desc.size == 0 {
            return Err(Error::InvalidResource("buffer size must be non-zero".to_string()));
        }
        self.state.lock().unwrap().buffers.push(*desc);
        Ok(Arc::new(MockBuffer::new(desc)))
    }

    fn create_view(&mut self, texture: &dyn Texture, view: &ViewDesc, target: DescriptorHandle) -> Result<()> {
        if !target.is_valid() {
            harness_bail!("harness::mock", "create_view: target handle is not a valid slot");
        }

        let mut state = self.state.lock().unwrap();

        // The target must fall inside a heap of the matching kind
        let heap = state
            .heaps
            .iter()
            .find(|(desc, cpu_start, _)| {
                let end = cpu_start.offset(desc.capacity, Self::increment(desc.heap_type));
                target.cpu() >= *cpu_start && target.cpu() < end
            })
            .map(|(desc, _, _)| *desc)
            .ok_or_else(|| harness_err!("harness::mock", "create_view: {:?} is outside every heap", target.cpu()))?;

        if state.fail_views == Some(heap.heap_type) {
            harness_bail!("harness::mock", "create_view: injected failure for {:?}", heap.heap_type);
        }

        if heap.heap_type != view.heap_type() {
            harness_bail!(
                "harness::mock",
                "create_view: {:?} view written into a {:?} heap",
                view.heap_type(),
                heap.heap_type
            );
        }

        state.views.push(RecordedView {
            view: *view,
            target,
            texture: texture.info().clone(),
        });
        Ok(())
    }

    fn wait_idle(&self) -> Result<()> {
        self.state.lock().unwrap().wait_idle_calls += 1;
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "mock_graphics_device_tests.rs"]
mod tests;
