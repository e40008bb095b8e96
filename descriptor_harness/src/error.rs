//! Error types for the descriptor harness
//!
//! This module defines the error types used throughout the harness,
//! including device initialization, descriptor allocation and backend calls.

use std::fmt;

use crate::graphics_device::DescriptorHeapType;

/// Result type for harness operations
pub type Result<T> = std::result::Result<T, Error>;

/// Descriptor harness errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Backend-specific error (Vulkan, Direct3D 12, etc.)
    BackendError(String),

    /// Out of GPU memory
    OutOfMemory,

    /// Invalid resource (foreign descriptor handle, bad arguments, etc.)
    InvalidResource(String),

    /// Initialization failed (device, descriptor heap, swapchain)
    InitializationFailed(String),

    /// Every slot of a descriptor range is in use
    CapacityExhausted {
        /// Kind of the exhausted range
        heap_type: DescriptorHeapType,
        /// Configured number of slots in the range
        capacity: u32,
    },

    /// A descriptor slot was freed while already sitting in the free list
    DoubleFree {
        /// Kind of the range the slot belongs to
        heap_type: DescriptorHeapType,
        /// Slot index inside the range
        index: u32,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::OutOfMemory => write!(f, "Out of GPU memory"),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            Error::CapacityExhausted { heap_type, capacity } => write!(
                f,
                "Descriptor capacity exhausted: {:?} heap has {} slots",
                heap_type, capacity
            ),
            Error::DoubleFree { heap_type, index } => write!(
                f,
                "Double free: {:?} descriptor slot {} is already free",
                heap_type, index
            ),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
