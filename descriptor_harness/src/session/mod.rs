/// Session module - device, swapchain and descriptor heaps wired together

pub mod graphics_session;

pub use graphics_session::{GraphicsSession, TextureEntry};
