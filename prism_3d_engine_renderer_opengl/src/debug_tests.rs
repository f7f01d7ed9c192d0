//! Unit tests for OpenGL error diagnostics
//!
//! The statistics are process-wide, so these tests only assert on deltas
//! and on call names no other test uses.

use super::*;

#[test]
fn test_repeated_errors_are_grouped_per_call() {
    assert_eq!(record_gl_error(glow::INVALID_VALUE, "debug_tests::grouped"), 1);
    assert_eq!(record_gl_error(glow::INVALID_VALUE, "debug_tests::grouped"), 2);
    // Same call, different error: its own group
    assert_eq!(record_gl_error(glow::INVALID_ENUM, "debug_tests::grouped"), 1);
}

#[test]
fn test_errors_are_counted_by_code() {
    let before = gl_error_stats();

    record_gl_error(glow::OUT_OF_MEMORY, "debug_tests::counted");
    record_gl_error(0x1234, "debug_tests::counted");

    let after = gl_error_stats();
    assert!(after.out_of_memory > before.out_of_memory);
    assert!(after.other > before.other);
    assert!(after.total() >= before.total() + 2);
}

#[test]
fn test_stats_total() {
    let stats = GlErrorStats {
        invalid_enum: 1,
        invalid_value: 2,
        invalid_operation: 3,
        invalid_framebuffer_operation: 4,
        out_of_memory: 5,
        other: 6,
    };
    assert_eq!(stats.total(), 21);
    assert_eq!(GlErrorStats::default().total(), 0);
}
