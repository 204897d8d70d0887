//! Error types for the Ember3D engine
//!
//! This module defines the error types used throughout the engine,
//! covering renderer setup, the per-frame loop and resource loading.

use std::fmt;

/// Result type for Ember3D engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Ember3D engine errors
#[derive(Debug, Clone)]
pub enum Error {
    /// Backend-specific failure (Vulkan call, queue submission, present)
    BackendError(String),

    /// Out of GPU memory
    OutOfMemory,

    /// Invalid resource (stale handle, mismatched configuration)
    InvalidResource(String),

    /// Initialization failed (instance, device, swap chain, render pass, pipeline)
    InitializationFailed(String),

    /// Resource loading failed (shader bytecode, texture pixels, allocation)
    ResourceLoadFailed(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::OutOfMemory => write!(f, "Out of GPU memory"),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            Error::ResourceLoadFailed(msg) => write!(f, "Resource load failed: {}", msg),
        }
    }
}

impl std::error::Error for Error {}
