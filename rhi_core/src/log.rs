//! Logging for the RHI core
//!
//! Entries carry a severity, a `rhi::Component` style source and, for errors,
//! the file and line they were raised at. The active `Logger` lives in
//! `RenderCore`; the `rhi_*` macros route there. Without a custom logger,
//! entries are printed in color by `DefaultLogger`.

use chrono::{DateTime, Local};
use colored::*;
use std::time::SystemTime;

/// Sink for log entries, installed with `RenderCore::set_logger`
///
/// # Example
///
/// ```no_run
/// use rhi_core::rhi::log::{Logger, LogEntry};
///
/// struct FrameLogger;
///
/// impl Logger for FrameLogger {
///     fn log(&self, entry: &LogEntry) {
///         // Forward to the frame profiler...
///     }
/// }
/// ```
pub trait Logger: Send + Sync {
    fn log(&self, entry: &LogEntry);
}

#[derive(Debug, Clone)]
pub struct LogEntry {
    pub severity: LogSeverity,
    pub timestamp: SystemTime,
    /// Emitting component, e.g. "rhi::DeferredDeleter"
    pub source: String,
    pub message: String,
    /// Set by `rhi_error!` only
    pub file: Option<&'static str>,
    /// Set by `rhi_error!` only
    pub line: Option<u32>,
}

/// Ordered from most to least verbose
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogSeverity {
    /// Per-frame chatter (ticket consumption, queued commands)
    Trace,
    Debug,
    Info,
    /// Potential issues (rounded layer counts, skipped bindings)
    Warn,
    /// Failures, reported with file:line
    Error,
}

impl LogSeverity {
    /// Fixed width label used in console output
    pub fn label(&self) -> &'static str {
        match self {
            LogSeverity::Trace => "TRACE",
            LogSeverity::Debug => "DEBUG",
            LogSeverity::Info => "INFO ",
            LogSeverity::Warn => "WARN ",
            LogSeverity::Error => "ERROR",
        }
    }

    fn colored_label(&self) -> ColoredString {
        let label = self.label();
        match self {
            LogSeverity::Trace => label.bright_black(),
            LogSeverity::Debug => label.cyan(),
            LogSeverity::Info => label.green(),
            LogSeverity::Warn => label.yellow(),
            LogSeverity::Error => label.red().bold(),
        }
    }
}

fn local_timestamp(entry: &LogEntry) -> String {
    let local: DateTime<Local> = entry.timestamp.into();
    local.format("%Y-%m-%d %H:%M:%S%.3f").to_string()
}

fn location_suffix(entry: &LogEntry) -> String {
    match (entry.file, entry.line) {
        (Some(file), Some(line)) => format!(" ({}:{})", file, line),
        _ => String::new(),
    }
}

/// Plain-text rendering of an entry
///
/// `[timestamp] [SEVERITY] [source] message`, followed by ` (file:line)`
/// when the entry has a location.
pub fn format_entry(entry: &LogEntry) -> String {
    format!(
        "[{}] [{}] [{}] {}{}",
        local_timestamp(entry),
        entry.severity.label(),
        entry.source,
        entry.message,
        location_suffix(entry)
    )
}

/// Console logger used until a custom one is installed
///
/// Prints everything at or above `min_severity`, coloring the severity label
/// and the source.
pub struct DefaultLogger {
    min_severity: LogSeverity,
}

impl DefaultLogger {
    pub fn new() -> Self {
        Self { min_severity: LogSeverity::Trace }
    }

    pub fn with_min_severity(min_severity: LogSeverity) -> Self {
        Self { min_severity }
    }

    pub fn min_severity(&self) -> LogSeverity {
        self.min_severity
    }

    pub fn accepts(&self, severity: LogSeverity) -> bool {
        severity >= self.min_severity
    }
}

impl Default for DefaultLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl Logger for DefaultLogger {
    fn log(&self, entry: &LogEntry) {
        if self.accepts(entry.severity) {
            println!(
                "[{}] [{}] [{}] {}{}",
                local_timestamp(entry),
                entry.severity.colored_label(),
                entry.source.bright_blue(),
                entry.message,
                location_suffix(entry)
            );
        }
    }
}

// ===== LOGGING MACROS =====

/// Log a TRACE message
///
/// ```no_run
/// # use rhi_core::rhi_trace;
/// rhi_trace!("rhi::DeferredDeleter", "Consumed ticket {}", "ShadowMap");
/// ```
#[macro_export]
macro_rules! rhi_trace {
    ($source:expr, $($arg:tt)*) => {
        $crate::rhi::RenderCore::log(
            $crate::rhi::log::LogSeverity::Trace,
            $source,
            format!($($arg)*)
        )
    };
}

/// Log a DEBUG message
#[macro_export]
macro_rules! rhi_debug {
    ($source:expr, $($arg:tt)*) => {
        $crate::rhi::RenderCore::log(
            $crate::rhi::log::LogSeverity::Debug,
            $source,
            format!($($arg)*)
        )
    };
}

/// Log an INFO message
#[macro_export]
macro_rules! rhi_info {
    ($source:expr, $($arg:tt)*) => {
        $crate::rhi::RenderCore::log(
            $crate::rhi::log::LogSeverity::Info,
            $source,
            format!($($arg)*)
        )
    };
}

/// Log a WARN message
#[macro_export]
macro_rules! rhi_warn {
    ($source:expr, $($arg:tt)*) => {
        $crate::rhi::RenderCore::log(
            $crate::rhi::log::LogSeverity::Warn,
            $source,
            format!($($arg)*)
        )
    };
}

/// Log an ERROR message with file:line information
///
/// ```no_run
/// # use rhi_core::rhi_error;
/// rhi_error!("rhi::ImageResource", "Failed creating image {}", "GBufferNormal");
/// ```
#[macro_export]
macro_rules! rhi_error {
    ($source:expr, $($arg:tt)*) => {
        $crate::rhi::RenderCore::log_detailed(
            $crate::rhi::log::LogSeverity::Error,
            $source,
            format!($($arg)*),
            file!(),
            line!()
        )
    };
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "log_tests.rs"]
mod tests;
