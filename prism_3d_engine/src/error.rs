//! Error types for the Prism3D engine
//!
//! This module defines the error types used throughout the engine:
//! usage errors raised synchronously by resource objects and the renderer,
//! and fatal driver errors raised while uploading resources to the GPU.

use std::fmt;

/// Result type for Prism3D engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Prism3D engine errors
#[derive(Debug, Clone)]
pub enum Error {
    /// Backend-specific error (OpenGL driver error, poisoned lock, etc.)
    BackendError(String),

    /// Out of GPU memory
    OutOfMemory,

    /// Invalid resource (dangling attachment, resource owned by another renderer, etc.)
    InvalidResource(String),

    /// Initialization failed (context, driver, renderer)
    InitializationFailed(String),

    /// Caller misuse detected synchronously (occupied slot, size mismatch,
    /// no shader bound, texture unit out of range, ...)
    InvalidOperation(String),

    /// A shader module failed to compile
    ShaderCompileFailed {
        /// Name of the shader owning the module
        shader: String,
        /// Name of the module that failed
        module: String,
        /// Compiler diagnostic
        log: String,
    },

    /// A shader program failed to link
    ShaderLinkFailed {
        /// Name of the shader
        shader: String,
        /// Linker diagnostic
        log: String,
    },

    /// A frame buffer failed its completeness check
    IncompleteFrameBuffer {
        /// Name of the frame buffer
        frame_buffer: String,
        /// Driver status description
        status: String,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::OutOfMemory => write!(f, "Out of GPU memory"),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            Error::InvalidOperation(msg) => write!(f, "Invalid operation: {}", msg),
            Error::ShaderCompileFailed { shader, module, log } => write!(
                f,
                "Failed to compile GLSL module '{}' of shader '{}': {}",
                module, shader, log
            ),
            Error::ShaderLinkFailed { shader, log } => {
                write!(f, "Failed to link GLSL shaders for shader '{}': {}", shader, log)
            }
            Error::IncompleteFrameBuffer { frame_buffer, status } => {
                write!(f, "Invalid frame buffer '{}': {}", frame_buffer, status)
            }
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
