//! Unit tests for log.rs
//!
//! Tests LogSeverity, LogEntry, format_entry and the DefaultLogger filter.

use crate::log::{format_entry, DefaultLogger, LogEntry, LogSeverity, Logger};
use std::sync::Mutex;
use std::time::SystemTime;

fn entry(severity: LogSeverity, file: Option<&'static str>, line: Option<u32>) -> LogEntry {
    LogEntry {
        severity,
        timestamp: SystemTime::now(),
        source: "rhi::DeferredDeleter".to_string(),
        message: "Consumed 2 tickets".to_string(),
        file,
        line,
    }
}

// ============================================================================
// LOG SEVERITY TESTS
// ============================================================================

#[test]
fn test_log_severity_ordering() {
    assert!(LogSeverity::Trace < LogSeverity::Debug);
    assert!(LogSeverity::Debug < LogSeverity::Info);
    assert!(LogSeverity::Info < LogSeverity::Warn);
    assert!(LogSeverity::Warn < LogSeverity::Error);
}

#[test]
fn test_log_severity_labels_have_fixed_width() {
    for severity in [
        LogSeverity::Trace,
        LogSeverity::Debug,
        LogSeverity::Info,
        LogSeverity::Warn,
        LogSeverity::Error,
    ] {
        assert_eq!(severity.label().len(), 5);
    }
    assert_eq!(LogSeverity::Warn.label(), "WARN ");
}

// ============================================================================
// FORMAT TESTS
// ============================================================================

#[test]
fn test_format_entry_without_location() {
    let line = format_entry(&entry(LogSeverity::Info, None, None));
    assert!(line.contains("[INFO ]"));
    assert!(line.contains("[rhi::DeferredDeleter]"));
    assert!(line.ends_with("Consumed 2 tickets"));
}

#[test]
fn test_format_entry_with_location() {
    let line = format_entry(&entry(LogSeverity::Error, Some("deferred_deleter.rs"), Some(87)));
    assert!(line.contains("[ERROR]"));
    assert!(line.ends_with("Consumed 2 tickets (deferred_deleter.rs:87)"));
}

#[test]
fn test_format_entry_needs_both_file_and_line() {
    let line = format_entry(&entry(LogSeverity::Error, Some("deferred_deleter.rs"), None));
    assert!(!line.contains("deferred_deleter.rs"));
}

// ============================================================================
// DEFAULT LOGGER TESTS
// ============================================================================

#[test]
fn test_default_logger_accepts_everything() {
    let logger = DefaultLogger::default();
    assert_eq!(logger.min_severity(), LogSeverity::Trace);
    assert!(logger.accepts(LogSeverity::Trace));
    assert!(logger.accepts(LogSeverity::Error));
}

#[test]
fn test_default_logger_min_severity_filter() {
    let logger = DefaultLogger::with_min_severity(LogSeverity::Warn);
    assert!(!logger.accepts(LogSeverity::Trace));
    assert!(!logger.accepts(LogSeverity::Info));
    assert!(logger.accepts(LogSeverity::Warn));
    assert!(logger.accepts(LogSeverity::Error));
}

#[test]
fn test_default_logger_all_severities() {
    let logger = DefaultLogger::new();
    for severity in [
        LogSeverity::Trace,
        LogSeverity::Debug,
        LogSeverity::Info,
        LogSeverity::Warn,
        LogSeverity::Error,
    ] {
        logger.log(&entry(severity, None, None));
        logger.log(&entry(severity, Some("image_resource.rs"), Some(12)));
    }
}

// ============================================================================
// LOGGER TRAIT TESTS
// ============================================================================

struct CountingLogger {
    count: Mutex<usize>,
}

impl Logger for CountingLogger {
    fn log(&self, _entry: &LogEntry) {
        *self.count.lock().unwrap() += 1;
    }
}

#[test]
fn test_custom_logger_implementation() {
    let logger = CountingLogger { count: Mutex::new(0) };
    logger.log(&entry(LogSeverity::Info, None, None));
    logger.log(&entry(LogSeverity::Warn, None, None));
    assert_eq!(*logger.count.lock().unwrap(), 2);
}

#[test]
fn test_logger_trait_is_send_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<DefaultLogger>();
    assert_send_sync::<Box<dyn Logger>>();
}
