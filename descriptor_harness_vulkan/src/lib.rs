/*!
# Descriptor Harness - Vulkan Backend

Vulkan implementation of the descriptor harness `GraphicsDevice` trait,
using the Ash library for Vulkan bindings and gpu-allocator for memory management.

Descriptor heaps map onto Vulkan as follows:

- **Shader-resource heaps** (shader-visible): `VK_EXT_descriptor_buffer` buffers,
  so every slot has a host address and a device address
- **Render-target and depth-stencil heaps**: host arrays holding one image view per slot

Buffers are allocated in host-visible memory and written through their mapping.

## Example

```no_run
use descriptor_harness::harness::GraphicsSession;
use descriptor_harness::harness::device::Config;
use descriptor_harness_vulkan::VulkanGraphicsDevice;
# fn run(window: &winit::window::Window) -> descriptor_harness::harness::Result<()> {
let config = Config::default();
let device = VulkanGraphicsDevice::new(window, &config)?;
let session = GraphicsSession::new(Box::new(device), &config, 1280, 720)?;
# Ok(())
# }
```
*/

mod vulkan;
mod vulkan_buffer;
mod vulkan_context;
mod vulkan_descriptor_heap;
mod vulkan_swapchain;
mod vulkan_texture;

pub use vulkan::VulkanGraphicsDevice;
pub use vulkan_buffer::Buffer as VulkanBuffer;
pub use vulkan_descriptor_heap::DescriptorHeap as VulkanDescriptorHeap;
pub use vulkan_swapchain::Swapchain as VulkanSwapchain;
pub use vulkan_texture::Texture as VulkanTexture;
