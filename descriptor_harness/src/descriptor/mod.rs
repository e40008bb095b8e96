/// Descriptor module - slot handles and the per-heap slot allocator

pub mod descriptor_handle;
pub mod descriptor_allocator;

pub use descriptor_handle::DescriptorHandle;
pub use descriptor_allocator::{DescriptorAllocator, DescriptorRange};
