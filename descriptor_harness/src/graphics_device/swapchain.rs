/// Swapchain trait - back buffers for window presentation

use std::sync::Arc;

use crate::error::Result;
use crate::graphics_device::{Texture, TextureFormat};

/// Descriptor for creating a swapchain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapchainDesc {
    /// Requested number of back buffers
    pub image_count: u32,
    /// Back buffer format
    pub format: TextureFormat,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

/// Swapchain owning the back buffers presented to a window
///
/// Image acquisition and presentation timing are left to the backend;
/// the harness only needs the back buffer textures to build render-target views.
pub trait Swapchain: Send + Sync {
    /// Number of back buffers
    fn image_count(&self) -> usize;

    /// Back buffer texture at `index`
    fn image(&self, index: usize) -> Option<Arc<dyn Texture>>;

    /// Recreate the back buffers (e.g., after window resize)
    ///
    /// Textures previously returned by `image()` are stale afterwards.
    fn recreate(&mut self, width: u32, height: u32) -> Result<()>;

    /// Width of the back buffers in pixels
    fn width(&self) -> u32;

    /// Height of the back buffers in pixels
    fn height(&self) -> u32;

    /// Pixel format of the back buffers
    fn format(&self) -> TextureFormat;
}
