/// Texture trait, texture formats and texture info

use std::any::Any;

/// Texture format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(non_camel_case_types)]
pub enum TextureFormat {
    // Color formats
    R8G8B8A8_SRGB,
    R8G8B8A8_UNORM,
    B8G8R8A8_SRGB,
    B8G8R8A8_UNORM,

    // HDR color formats
    R16G16B16A16_FLOAT,
    R10G10B10A2_UNORM,

    // Depth formats
    D16_UNORM,
    D32_FLOAT,
    D24_UNORM_S8_UINT,
}

impl TextureFormat {
    /// Formats that need an HDR10-capable display to be presented as-is
    pub fn is_hdr(self) -> bool {
        matches!(self, TextureFormat::R16G16B16A16_FLOAT | TextureFormat::R10G10B10A2_UNORM)
    }

    /// Depth (and depth/stencil) formats
    pub fn is_depth(self) -> bool {
        matches!(
            self,
            TextureFormat::D16_UNORM | TextureFormat::D32_FLOAT | TextureFormat::D24_UNORM_S8_UINT
        )
    }
}

/// Texture usage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureUsage {
    /// Texture can be sampled in shaders
    Sampled,
    /// Texture can be used as render target
    RenderTarget,
    /// Texture can be used as depth/stencil attachment
    DepthStencil,
}

// ===== TEXTURE INFO =====

/// Read-only properties of a created texture.
///
/// Returned by `Texture::info()` to query texture properties
/// without exposing backend-specific details.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureInfo {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Pixel format
    pub format: TextureFormat,
    /// Usage
    pub usage: TextureUsage,
    /// Number of mip levels (1 = no mipmaps)
    pub mip_levels: u32,
}

// ===== TEXTURE TRAIT =====

/// Texture resource trait
///
/// Implemented by backend-specific texture types (e.g., the Vulkan texture).
/// The texture is automatically destroyed when dropped.
pub trait Texture: Send + Sync {
    /// Get the read-only properties of this texture
    fn info(&self) -> &TextureInfo;

    /// Concrete texture, for backends that need their own handle back
    fn as_any(&self) -> &dyn Any;
}
