/// Graphics device module - platform-facing traits and types

// Module declarations
pub mod graphics_device;
pub mod texture;
pub mod swapchain;
pub mod descriptor_heap;
pub mod buffer;

// Re-export everything from graphics_device.rs
pub use graphics_device::*;

// Re-export from other modules
pub use texture::*;
pub use swapchain::*;
pub use descriptor_heap::*;
pub use buffer::*;

// Mock graphics device for tests (no GPU required)
#[cfg(test)]
pub mod mock_graphics_device;
