//! Integration tests for Engine logging system
//!
//! These tests verify the logging system functionality, including the
//! entries the renderer reports on its own.
//!
//! Run with: cargo test --test logging_integration_tests


use prism_3d_engine::prism3d::log::{LogEntry, LogSeverity, Logger};
use prism_3d_engine::prism3d::resource::{Uniform, UniformType, UniformValue};
use prism_3d_engine::prism3d::Engine;
use serial_test::serial;
use std::sync::{Arc, Mutex};

// ============================================================================
// TEST LOGGER IMPLEMENTATION
// ============================================================================

/// Test logger that captures log entries for verification
struct TestLogger {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl TestLogger {
    fn new() -> (Self, Arc<Mutex<Vec<LogEntry>>>) {
        let entries = Arc::new(Mutex::new(Vec::new()));
        (Self { entries: entries.clone() }, entries)
    }
}

impl Logger for TestLogger {
    fn log(&self, entry: &LogEntry) {
        self.entries.lock().unwrap().push(entry.clone());
    }
}

fn entries_from(entries: &Arc<Mutex<Vec<LogEntry>>>, source: &str) -> Vec<LogEntry> {
    entries
        .lock()
        .unwrap()
        .iter()
        .filter(|entry| entry.source == source)
        .cloned()
        .collect()
}

// ============================================================================
// LOGGING TESTS
// ============================================================================

#[test]
#[serial]
fn test_integration_custom_logger() {
    let (test_logger, entries) = TestLogger::new();
    Engine::set_logger(test_logger);

    Engine::log(LogSeverity::Info, "test::module", "Test info message".to_string());
    Engine::log(LogSeverity::Warn, "test::module", "Test warning message".to_string());
    Engine::log(LogSeverity::Error, "test::module", "Test error message".to_string());

    let captured = entries_from(&entries, "test::module");
    Engine::reset_logger();

    assert_eq!(captured.len(), 3);
    assert_eq!(captured[0].severity, LogSeverity::Info);
    assert_eq!(captured[0].message, "Test info message");
    assert_eq!(captured[1].severity, LogSeverity::Warn);
    assert_eq!(captured[2].severity, LogSeverity::Error);
    assert_eq!(captured[2].file, None);
}

#[test]
#[serial]
fn test_integration_error_logging_with_location() {
    let (test_logger, entries) = TestLogger::new();
    Engine::set_logger(test_logger);

    Engine::log_detailed(
        LogSeverity::Error,
        "test::error",
        "Critical error occurred".to_string(),
        "test_file.rs",
        42,
    );

    let captured = entries_from(&entries, "test::error");
    Engine::reset_logger();

    assert_eq!(captured.len(), 1);
    assert_eq!(captured[0].message, "Critical error occurred");
    assert_eq!(captured[0].file, Some("test_file.rs"));
    assert_eq!(captured[0].line, Some(42));
}

#[test]
#[serial]
fn test_integration_logger_reset() {
    let (test_logger, entries) = TestLogger::new();
    Engine::set_logger(test_logger);

    Engine::log(LogSeverity::Info, "test", "Message 1".to_string());
    assert_eq!(entries_from(&entries, "test").len(), 1);

    Engine::reset_logger();
    Engine::log(LogSeverity::Info, "test", "Message 2".to_string());

    assert_eq!(entries_from(&entries, "test").len(), 1);
}

// ============================================================================
// RENDERER DIAGNOSTICS
// ============================================================================

#[test]
#[serial]
fn test_integration_renderer_errors_are_logged_with_location() {
    let (test_logger, entries) = TestLogger::new();
    Engine::set_logger(test_logger);
    let (renderer, _probe) = test_utils::create_renderer();

    let uniform = Uniform::new("model", UniformType::Float);
    let result = renderer.set_uniform(&uniform, &UniformValue::Float(1.0));

    let captured = entries_from(&entries, "prism3d::Renderer");
    Engine::reset_logger();

    assert!(result.is_err());
    let error = captured
        .iter()
        .find(|entry| entry.severity == LogSeverity::Error)
        .expect("renderer error entry");
    assert!(error.message.contains("model"));
    assert!(error.file.is_some());
    assert!(error.line.is_some());
}

#[test]
#[serial]
fn test_integration_unreferenced_uniform_warning() {
    let (test_logger, entries) = TestLogger::new();
    Engine::set_logger(test_logger);
    let (renderer, probe) = test_utils::create_renderer();
    probe.mark_uniform_unused("unused");

    let mut shader = test_utils::basic_shader("lit");
    shader.add_uniform(Uniform::new("unused", UniformType::Vector3)).unwrap();
    renderer.upload_shader(&mut shader).unwrap();

    let captured = entries_from(&entries, "prism3d::Renderer");
    Engine::reset_logger();

    let warnings: Vec<&LogEntry> = captured
        .iter()
        .filter(|entry| entry.severity == LogSeverity::Warn)
        .collect();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].message, "Uniform 'unused' is not referenced in shader 'lit'");
}
