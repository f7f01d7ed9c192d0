/// OpenGL error diagnostics - counts driver errors and prints a colored report
///
/// Every error the device picks up through `glGetError` is recorded here,
/// grouped by code and by the call that raised it.

use colored::*;
use rustc_hash::FxHashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, PoisonError};
use crate::opengl_format;

/// Global error statistics (thread-safe atomic counters)
static ERROR_STATS: ErrorStatsTracker = ErrorStatsTracker::new();

/// Global tracker grouping identical errors
static MESSAGE_TRACKER: Mutex<Option<MessageTracker>> = Mutex::new(None);

/// Driver errors recorded since the last reset
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GlErrorStats {
    pub invalid_enum: u32,
    pub invalid_value: u32,
    pub invalid_operation: u32,
    pub invalid_framebuffer_operation: u32,
    pub out_of_memory: u32,
    pub other: u32,
}

impl GlErrorStats {
    pub fn total(&self) -> u32 {
        self.invalid_enum
            + self.invalid_value
            + self.invalid_operation
            + self.invalid_framebuffer_operation
            + self.out_of_memory
            + self.other
    }
}

struct ErrorStatsTracker {
    invalid_enum: AtomicU32,
    invalid_value: AtomicU32,
    invalid_operation: AtomicU32,
    invalid_framebuffer_operation: AtomicU32,
    out_of_memory: AtomicU32,
    other: AtomicU32,
}

impl ErrorStatsTracker {
    const fn new() -> Self {
        Self {
            invalid_enum: AtomicU32::new(0),
            invalid_value: AtomicU32::new(0),
            invalid_operation: AtomicU32::new(0),
            invalid_framebuffer_operation: AtomicU32::new(0),
            out_of_memory: AtomicU32::new(0),
            other: AtomicU32::new(0),
        }
    }

    fn counter(&self, code: u32) -> &AtomicU32 {
        match code {
            glow::INVALID_ENUM => &self.invalid_enum,
            glow::INVALID_VALUE => &self.invalid_value,
            glow::INVALID_OPERATION => &self.invalid_operation,
            glow::INVALID_FRAMEBUFFER_OPERATION => &self.invalid_framebuffer_operation,
            glow::OUT_OF_MEMORY => &self.out_of_memory,
            _ => &self.other,
        }
    }

    fn increment(&self, code: u32) {
        self.counter(code).fetch_add(1, Ordering::Relaxed);
    }

    fn get_stats(&self) -> GlErrorStats {
        GlErrorStats {
            invalid_enum: self.invalid_enum.load(Ordering::Relaxed),
            invalid_value: self.invalid_value.load(Ordering::Relaxed),
            invalid_operation: self.invalid_operation.load(Ordering::Relaxed),
            invalid_framebuffer_operation: self.invalid_framebuffer_operation.load(Ordering::Relaxed),
            out_of_memory: self.out_of_memory.load(Ordering::Relaxed),
            other: self.other.load(Ordering::Relaxed),
        }
    }

    fn reset(&self) {
        for counter in [
            &self.invalid_enum,
            &self.invalid_value,
            &self.invalid_operation,
            &self.invalid_framebuffer_operation,
            &self.out_of_memory,
            &self.other,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

/// Counts occurrences of each distinct "call: error" message
#[derive(Default)]
struct MessageTracker {
    messages: FxHashMap<String, u32>,
}

impl MessageTracker {
    fn track_message(&mut self, message: String) -> u32 {
        let count = self.messages.entry(message).or_insert(0);
        *count += 1;
        *count
    }
}

/// Record one driver error raised by `call`
///
/// Returns how many times this exact error was raised by this call.
pub(crate) fn record_gl_error(code: u32, call: &str) -> u32 {
    ERROR_STATS.increment(code);

    let message = format!("{}: {}", call, opengl_format::error_name(code));
    let mut tracker = MESSAGE_TRACKER.lock().unwrap_or_else(PoisonError::into_inner);
    tracker.get_or_insert_with(MessageTracker::default).track_message(message)
}

/// Current driver error statistics
pub fn gl_error_stats() -> GlErrorStats {
    ERROR_STATS.get_stats()
}

/// Clear the statistics and the message groups
pub fn reset_gl_error_stats() {
    ERROR_STATS.reset();
    *MESSAGE_TRACKER.lock().unwrap_or_else(PoisonError::into_inner) = None;
}

/// Print the driver error report to stdout
pub fn print_gl_error_report() {
    let stats = gl_error_stats();

    if stats.total() == 0 {
        println!("\n{}", "✓ No OpenGL errors".green().bold());
        return;
    }

    println!("\n{}", "=== OpenGL Error Report ===".bright_blue().bold());

    let rows = [
        ("GL_INVALID_ENUM:", stats.invalid_enum),
        ("GL_INVALID_VALUE:", stats.invalid_value),
        ("GL_INVALID_OPERATION:", stats.invalid_operation),
        ("GL_INVALID_FRAMEBUFFER_OPERATION:", stats.invalid_framebuffer_operation),
        ("GL_OUT_OF_MEMORY:", stats.out_of_memory),
        ("Other:", stats.other),
    ];
    for (label, count) in rows.iter().filter(|(_, count)| *count > 0) {
        println!("  {} {}", label.red().bold(), count);
    }
    println!("  {} {}", "Total:".white().bold(), stats.total());

    let tracker = MESSAGE_TRACKER.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(tracker) = tracker.as_ref() {
        let mut repeated: Vec<(&String, &u32)> =
            tracker.messages.iter().filter(|(_, &count)| count > 1).collect();
        repeated.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));

        if !repeated.is_empty() {
            println!("\n  {} {} error(s) appeared multiple times", "ℹ".cyan(), repeated.len());
            for (message, count) in repeated {
                println!("    {} {}", format!("[×{}]", count).yellow(), message.white());
            }
        }
    }

    println!("{}\n", "===========================".bright_blue().bold());
}

#[cfg(test)]
#[path = "debug_tests.rs"]
mod tests;
