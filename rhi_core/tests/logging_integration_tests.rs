//! Integration tests for RenderCore logging
//!
//! A capturing logger is installed through `RenderCore::set_logger` and the
//! public `rhi_*` macros are driven from outside the crate.
//!
//! Run with: cargo test --test logging_integration_tests

use rhi_core::rhi::graphics::ShaderStage;
use rhi_core::rhi::log::{format_entry, LogEntry, LogSeverity, Logger};
use rhi_core::rhi::shader::{
    BindingType, ReflectedBinding, ShaderParamBindingTable, ShaderReflection, SpecializationConstants,
};
use rhi_core::rhi::RenderCore;
use serial_test::serial;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::SystemTime;

#[derive(Clone, Default)]
struct CaptureLogger {
    captured: Arc<Mutex<Vec<LogEntry>>>,
}

impl CaptureLogger {
    /// Install a fresh capture logger as the global one
    fn install() -> Self {
        let logger = Self::default();
        RenderCore::set_logger(logger.clone());
        logger
    }

    fn entries(&self) -> MutexGuard<'_, Vec<LogEntry>> {
        self.captured.lock().unwrap()
    }

    fn severities(&self) -> Vec<LogSeverity> {
        self.entries().iter().map(|entry| entry.severity).collect()
    }
}

impl Logger for CaptureLogger {
    fn log(&self, entry: &LogEntry) {
        self.captured.lock().unwrap().push(entry.clone());
    }
}

fn entry(severity: LogSeverity, source: &str, message: &str) -> LogEntry {
    LogEntry {
        severity,
        timestamp: SystemTime::now(),
        source: source.to_string(),
        message: message.to_string(),
        file: None,
        line: None,
    }
}

// ============================================================================
// ROUTING TESTS
// ============================================================================

#[test]
#[serial]
fn test_integration_custom_logger_receives_entries() {
    let logger = CaptureLogger::install();

    RenderCore::log(LogSeverity::Info, "rhi::GraphicsHelper", "Frame 1 ended".to_string());
    RenderCore::log(LogSeverity::Warn, "rhi::DeferredDeleter", "3 tickets pending".to_string());

    assert_eq!(logger.severities(), vec![LogSeverity::Info, LogSeverity::Warn]);
    let entries = logger.entries();
    assert_eq!(entries[1].source, "rhi::DeferredDeleter");
    assert_eq!(entries[1].message, "3 tickets pending");
    assert_eq!(entries[0].file, None);
    drop(entries);

    RenderCore::reset_logger();
}

#[test]
#[serial]
fn test_integration_detailed_entry_keeps_location() {
    let logger = CaptureLogger::install();

    RenderCore::log_detailed(
        LogSeverity::Error,
        "rhi::BufferResource",
        "Zero sized buffer 'Scratch'".to_string(),
        "buffer_resource.rs",
        118,
    );

    let entries = logger.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].file, Some("buffer_resource.rs"));
    assert_eq!(entries[0].line, Some(118));
    drop(entries);

    RenderCore::reset_logger();
}

#[test]
#[serial]
fn test_integration_reset_detaches_custom_logger() {
    let logger = CaptureLogger::install();
    RenderCore::log(LogSeverity::Debug, "rhi::RenderCore", "captured".to_string());

    RenderCore::reset_logger();
    RenderCore::log(LogSeverity::Debug, "rhi::RenderCore", "printed".to_string());

    let messages: Vec<String> = logger.entries().iter().map(|e| e.message.clone()).collect();
    assert_eq!(messages, vec!["captured".to_string()]);
}

#[test]
#[serial]
fn test_integration_every_macro_level_is_routed() {
    let logger = CaptureLogger::install();

    rhi_core::rhi_trace!("rhi::test", "trace {}", 1);
    rhi_core::rhi_debug!("rhi::test", "debug {}", 2);
    rhi_core::rhi_info!("rhi::test", "info {}", 3);
    rhi_core::rhi_warn!("rhi::test", "Frame {} took {} ms", 12, 40);
    rhi_core::rhi_error!("rhi::test", "Device lost");

    assert_eq!(
        logger.severities(),
        vec![LogSeverity::Trace, LogSeverity::Debug, LogSeverity::Info, LogSeverity::Warn, LogSeverity::Error]
    );
    let entries = logger.entries();
    assert_eq!(entries[3].message, "Frame 12 took 40 ms");
    assert!(entries[3].line.is_none());
    assert!(entries[4].file.is_some());
    assert!(entries[4].line.is_some());
    drop(entries);

    RenderCore::reset_logger();
}

// ============================================================================
// ERROR REPORTING TESTS
// ============================================================================

#[test]
#[serial]
fn test_integration_bind_failure_is_logged() {
    let logger = CaptureLogger::install();

    let mut reflection = ShaderReflection::new("sky");
    reflection.bindings.push(ReflectedBinding {
        name: "Atmosphere".to_string(),
        set: 0,
        binding: 0,
        binding_type: BindingType::UniformBuffer,
        stages: ShaderStage::FRAGMENT,
        array_count: 1,
        members: Vec::new(),
    });
    let result = ShaderParamBindingTable::default().bind(&reflection, &SpecializationConstants::new());
    assert!(result.is_err());

    assert!(logger
        .entries()
        .iter()
        .any(|e| e.severity == LogSeverity::Error && e.message.contains("Atmosphere")));

    RenderCore::reset_logger();
}

#[test]
#[serial]
fn test_integration_err_macro_logs_and_builds_error() {
    let logger = CaptureLogger::install();

    let err = rhi_core::rhi_err!("rhi::GraphicsHelper", "Backend refused image '{}'", "Shadow");

    assert_eq!(err, rhi_core::rhi::Error::BackendError("Backend refused image 'Shadow'".to_string()));
    assert_eq!(logger.severities(), vec![LogSeverity::Error]);

    RenderCore::reset_logger();
}

// ============================================================================
// FORMATTING TESTS
// ============================================================================

#[test]
fn test_integration_format_entry_contains_source_and_message() {
    let text = format_entry(&entry(LogSeverity::Warn, "rhi::GraphicsHelper", "Late frame"));

    assert!(text.contains("rhi::GraphicsHelper"));
    assert!(text.contains("Late frame"));
}
