/// DescriptorHeap trait - a fixed-capacity, contiguously addressed block of descriptor slots

use bitflags::bitflags;

/// Kind of descriptors stored in a heap
///
/// Each kind has its own addressing granularity, queried from the device
/// with `GraphicsDevice::descriptor_increment_size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DescriptorHeapType {
    /// Render-target views (color attachments)
    RenderTarget,
    /// Depth-stencil views
    DepthStencil,
    /// Constant-buffer, shader-resource and unordered-access views
    ShaderResource,
}

bitflags! {
    /// Descriptor heap creation flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct DescriptorHeapFlags: u32 {
        /// The heap can be bound for shader access and gets a device address
        const SHADER_VISIBLE = 1 << 0;
    }
}

/// Descriptor for creating a descriptor heap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DescriptorHeapDesc {
    /// Kind of descriptors stored in the heap
    pub heap_type: DescriptorHeapType,
    /// Number of slots
    pub capacity: u32,
    /// Creation flags
    pub flags: DescriptorHeapFlags,
}

impl DescriptorHeapDesc {
    /// Whether the heap is shader-visible (has a meaningful GPU address)
    pub fn is_shader_visible(&self) -> bool {
        self.flags.contains(DescriptorHeapFlags::SHADER_VISIBLE)
    }
}

/// Host-visible address of a descriptor slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct CpuDescriptorAddress(pub u64);

impl CpuDescriptorAddress {
    /// Address of slot `index` when slots are `stride` bytes apart
    pub fn offset(self, index: u32, stride: u32) -> Self {
        Self(self.0 + u64::from(index) * u64::from(stride))
    }

    /// Like `offset`, but None if the result does not fit in 64 bits
    pub fn checked_offset(self, index: u32, stride: u32) -> Option<Self> {
        self.0.checked_add(u64::from(index) * u64::from(stride)).map(Self)
    }
}

/// Device-visible address of a descriptor slot (0 for non-shader-visible heaps)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct GpuDescriptorAddress(pub u64);

impl GpuDescriptorAddress {
    /// Address of slot `index` when slots are `stride` bytes apart
    pub fn offset(self, index: u32, stride: u32) -> Self {
        Self(self.0 + u64::from(index) * u64::from(stride))
    }

    /// Like `offset`, but None if the result does not fit in 64 bits
    pub fn checked_offset(self, index: u32, stride: u32) -> Option<Self> {
        self.0.checked_add(u64::from(index) * u64::from(stride)).map(Self)
    }
}

/// Descriptor heap trait
///
/// Implemented by backend-specific heaps. The heap memory is released when dropped.
pub trait DescriptorHeap: Send + Sync {
    /// Creation parameters of this heap
    fn desc(&self) -> &DescriptorHeapDesc;

    /// Host address of slot 0
    fn cpu_start(&self) -> CpuDescriptorAddress;

    /// Device address of slot 0 (0 if the heap is not shader-visible)
    fn gpu_start(&self) -> GpuDescriptorAddress;
}
