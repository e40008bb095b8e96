/// GraphicsDevice trait - main resource-creation interface

use std::sync::Arc;

use crate::descriptor::DescriptorHandle;
use crate::error::Result;
use crate::graphics_device::{
    Buffer, BufferDesc, DescriptorHeap, DescriptorHeapDesc, DescriptorHeapType,
    Swapchain, SwapchainDesc, Texture, TextureFormat,
};

// ============================================================================
// Configuration
// ============================================================================

/// Number of slots in each of the three descriptor heaps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DescriptorCapacities {
    /// Render-target view heap
    pub render_target: u32,
    /// Depth-stencil view heap
    pub depth_stencil: u32,
    /// Shader-visible CBV/SRV/UAV heap
    pub shader_resource: u32,
}

impl Default for DescriptorCapacities {
    fn default() -> Self {
        Self {
            render_target: 100,
            depth_stencil: 100,
            shader_resource: 2048,
        }
    }
}

/// Device and session configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Enable validation/debug layers
    pub enable_validation: bool,
    /// Application name
    pub app_name: String,
    /// Application version (major, minor, patch)
    pub app_version: (u32, u32, u32),
    /// Number of swapchain back buffers
    pub back_buffer_count: u32,
    /// Requested back buffer format (HDR formats fall back when unsupported)
    pub back_buffer_format: TextureFormat,
    /// Format of the default depth buffer
    pub depth_format: TextureFormat,
    /// Slots per descriptor heap
    pub descriptor_capacities: DescriptorCapacities,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            enable_validation: cfg!(debug_assertions),
            app_name: "Descriptor Harness Application".to_string(),
            app_version: (1, 0, 0),
            back_buffer_count: 2,
            back_buffer_format: TextureFormat::R8G8B8A8_UNORM,
            depth_format: TextureFormat::D32_FLOAT,
            descriptor_capacities: DescriptorCapacities::default(),
        }
    }
}

// ============================================================================
// Views and viewport
// ============================================================================

/// View written into a descriptor slot by `GraphicsDevice::create_view`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewDesc {
    /// Color attachment view (render-target heap)
    RenderTarget { format: TextureFormat },
    /// Depth attachment view (depth-stencil heap)
    DepthStencil { format: TextureFormat },
    /// Sampled 2D texture view (shader-resource heap)
    ShaderResource { format: TextureFormat, mip_levels: u32 },
}

impl ViewDesc {
    /// Heap kind this view must be written into
    pub fn heap_type(&self) -> DescriptorHeapType {
        match self {
            ViewDesc::RenderTarget { .. } => DescriptorHeapType::RenderTarget,
            ViewDesc::DepthStencil { .. } => DescriptorHeapType::DepthStencil,
            ViewDesc::ShaderResource { .. } => DescriptorHeapType::ShaderResource,
        }
    }
}

/// Viewport dimensions and depth range
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

impl Viewport {
    /// Full-surface viewport with the [0, 1] depth range
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: width as f32,
            height: height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        }
    }
}

/// 2D rectangle (scissor)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect2D {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect2D {
    /// Rectangle covering the whole surface
    pub fn full(width: u32, height: u32) -> Self {
        Self { x: 0, y: 0, width, height }
    }
}

// ============================================================================
// GraphicsDevice trait
// ============================================================================

/// Main graphics device trait
///
/// This is the platform seam of the harness: every call that reaches the
/// native API goes through it. Implemented by backend-specific devices
/// (e.g., the Vulkan device).
pub trait GraphicsDevice: Send + Sync {
    /// Create a descriptor heap
    ///
    /// # Arguments
    ///
    /// * `desc` - Heap kind, capacity and flags
    ///
    /// # Returns
    ///
    /// A shared pointer to the created heap
    fn create_descriptor_heap(&mut self, desc: &DescriptorHeapDesc) -> Result<Arc<dyn DescriptorHeap>>;

    /// Distance in bytes between two consecutive slots of a heap of this kind
    fn descriptor_increment_size(&self, heap_type: DescriptorHeapType) -> u32;

    /// Whether the presentation surface can display HDR10 content
    fn supports_hdr_output(&self) -> bool;

    /// Create the swapchain for the device's presentation surface
    fn create_swapchain(&mut self, desc: &SwapchainDesc) -> Result<Box<dyn Swapchain>>;

    /// Create a depth buffer usable as depth-stencil attachment
    fn create_depth_buffer(&mut self, width: u32, height: u32, format: TextureFormat) -> Result<Arc<dyn Texture>>;

    /// Create a buffer in upload memory (host-writable, device-readable)
    ///
    /// # Errors
    ///
    /// `Error::InvalidResource` for a zero-sized buffer, `Error::OutOfMemory`
    /// when the memory cannot be allocated.
    fn create_buffer(&mut self, desc: &BufferDesc) -> Result<Arc<dyn Buffer>>;

    /// Write a view of `texture` into the descriptor slot `target`
    ///
    /// Writing into a slot that already holds a view replaces it.
    fn create_view(&mut self, texture: &dyn Texture, view: &ViewDesc, target: DescriptorHandle) -> Result<()>;

    /// Wait for all GPU operations to complete
    fn wait_idle(&self) -> Result<()>;
}
