//! Unit tests for error.rs
//!
//! Tests all Error variants and their implementations (Display, Debug, Clone, std::error::Error).

use crate::error::{Error, Result};

// ============================================================================
// ERROR DISPLAY TESTS
// ============================================================================

#[test]
fn test_backend_error_display() {
    let err = Error::BackendError("GL_INVALID_ENUM".to_string());
    let display = format!("{}", err);
    assert!(display.contains("Backend error"));
    assert!(display.contains("GL_INVALID_ENUM"));
}

#[test]
fn test_out_of_memory_display() {
    let err = Error::OutOfMemory;
    assert_eq!(format!("{}", err), "Out of GPU memory");
}

#[test]
fn test_invalid_operation_display() {
    let err = Error::InvalidOperation("Slot 'Color0' is already occupied".to_string());
    let display = format!("{}", err);
    assert!(display.starts_with("Invalid operation"));
    assert!(display.contains("Color0"));
}

#[test]
fn test_shader_compile_failed_display_names_shader_and_module() {
    let err = Error::ShaderCompileFailed {
        shader: "PhysicallyBased".to_string(),
        module: "lighting.frag".to_string(),
        log: "0:12: 'vec5' : undeclared identifier".to_string(),
    };
    let display = format!("{}", err);
    assert!(display.contains("PhysicallyBased"));
    assert!(display.contains("lighting.frag"));
    assert!(display.contains("undeclared identifier"));
}

#[test]
fn test_shader_link_failed_display() {
    let err = Error::ShaderLinkFailed {
        shader: "Composite".to_string(),
        log: "varying 'uv' not written".to_string(),
    };
    let display = format!("{}", err);
    assert!(display.contains("Failed to link"));
    assert!(display.contains("Composite"));
    assert!(display.contains("varying 'uv'"));
}

#[test]
fn test_incomplete_frame_buffer_display() {
    let err = Error::IncompleteFrameBuffer {
        frame_buffer: "GBuffer".to_string(),
        status: "incomplete attachment".to_string(),
    };
    let display = format!("{}", err);
    assert!(display.contains("Invalid frame buffer"));
    assert!(display.contains("GBuffer"));
}

// ============================================================================
// ERROR TRAIT IMPLEMENTATIONS
// ============================================================================

#[test]
fn test_error_is_std_error() {
    let err = Error::OutOfMemory;
    let _: &dyn std::error::Error = &err;
}

#[test]
fn test_error_debug() {
    let err = Error::InvalidResource("dangling".to_string());
    assert!(format!("{:?}", err).contains("InvalidResource"));

    let err = Error::ShaderLinkFailed { shader: "s".to_string(), log: "l".to_string() };
    assert!(format!("{:?}", err).contains("ShaderLinkFailed"));
}

#[test]
fn test_error_clone() {
    let err1 = Error::IncompleteFrameBuffer {
        frame_buffer: "fb".to_string(),
        status: "missing attachment".to_string(),
    };
    let err2 = err1.clone();
    assert_eq!(format!("{}", err1), format!("{}", err2));
}

// ============================================================================
// ERROR PROPAGATION TESTS
// ============================================================================

#[test]
fn test_error_propagation_with_question_mark() {
    fn inner() -> Result<i32> {
        Err(Error::InvalidOperation("no shader bound".to_string()))
    }

    fn outer() -> Result<i32> {
        inner()?;
        Ok(42)
    }

    match outer() {
        Err(Error::InvalidOperation(msg)) => assert_eq!(msg, "no shader bound"),
        other => panic!("unexpected result: {:?}", other),
    }
}
