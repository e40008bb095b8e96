/// Buffer trait and buffer descriptor

use std::any::Any;

use crate::error::{Error, Result};

/// Alignment of constant buffer sizes (and of constant-buffer views into them)
pub const CONSTANT_BUFFER_ALIGNMENT: u64 = 256;

/// Buffer usage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferUsage {
    /// Constant (uniform) buffer
    Constant,
    /// Vertex buffer
    Vertex,
    /// Index buffer
    Index,
    /// Storage (unordered-access) buffer
    Storage,
}

/// Descriptor for creating a buffer
///
/// Buffers live in upload memory: the host writes them through
/// `Buffer::update` and the device reads them directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferDesc {
    /// Size in bytes
    pub size: u64,
    /// Buffer usage
    pub usage: BufferUsage,
}

impl BufferDesc {
    /// Constant buffer of at least `size` bytes, rounded up to `CONSTANT_BUFFER_ALIGNMENT`
    pub fn constant(size: u64) -> Self {
        Self {
            size: size.div_ceil(CONSTANT_BUFFER_ALIGNMENT) * CONSTANT_BUFFER_ALIGNMENT,
            usage: BufferUsage::Constant,
        }
    }
}

/// Buffer resource trait
///
/// Implemented by backend-specific buffer types (e.g., the Vulkan buffer).
/// The buffer is automatically destroyed when dropped.
pub trait Buffer: Send + Sync {
    /// Creation parameters of this buffer
    fn desc(&self) -> &BufferDesc;

    /// Copy `data` into the buffer's upload memory
    ///
    /// # Arguments
    ///
    /// * `offset` - Offset into the buffer in bytes
    /// * `data` - Data to write
    ///
    /// # Errors
    ///
    /// `Error::InvalidResource` if `offset + data.len()` is past the end of
    /// the buffer; nothing is written in that case.
    fn update(&self, offset: u64, data: &[u8]) -> Result<()>;

    /// Concrete buffer, for backends that need their own handle back
    fn as_any(&self) -> &dyn Any;

    /// Size in bytes
    fn size(&self) -> u64 {
        self.desc().size
    }
}

/// Check that `len` bytes at `offset` fit in a buffer of `size` bytes
///
/// Shared by backends before they touch mapped memory.
pub fn check_update_range(size: u64, offset: u64, len: usize) -> Result<()> {
    let end = u64::try_from(len).ok().and_then(|len| offset.checked_add(len));
    match end {
        Some(end) if end <= size => Ok(()),
        _ => Err(Error::InvalidResource(format!(
            "buffer update of {} bytes at offset {} exceeds the buffer size {}",
            len, offset, size
        ))),
    }
}

#[cfg(test)]
#[path = "buffer_tests.rs"]
mod tests;
