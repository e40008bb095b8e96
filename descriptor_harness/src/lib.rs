/*!
# Descriptor Harness

Platform-agnostic core of a small graphics harness: a graphics device, a
swapchain and three descriptor heaps, plus the slot allocator that hands
out descriptor slots.

Backend implementations (e.g. the Vulkan backend) implement the
`GraphicsDevice` trait; everything else in this crate runs on top of it.

## Architecture

- **DescriptorAllocator**: fixed-capacity slot allocator over one descriptor heap
- **DescriptorHandle**: one slot, with its host and device addresses
- **GraphicsDevice**: platform seam (heaps, swapchain, depth buffer, upload buffers, views)
- **GraphicsSession**: owns the device, the swapchain and the render-target,
  depth-stencil and shader-resource heaps
*/

// Internal modules
mod error;
mod facade;
pub mod log;
pub mod graphics_device;
pub mod descriptor;
pub mod session;
pub mod utils;

// Main harness namespace module
pub mod harness {
    // Error types
    pub use crate::error::{Error, Result};

    // Logging facade
    pub use crate::facade::Harness;

    // Session
    pub use crate::session::{GraphicsSession, TextureEntry};

    // Logging sub-module (types only, the harness_* macros live at the crate root)
    pub mod log {
        pub use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};
    }

    // Device sub-module with the platform traits and their types
    pub mod device {
        pub use crate::graphics_device::*;
    }

    // Descriptor sub-module
    pub mod descriptor {
        pub use crate::descriptor::*;
    }
}
