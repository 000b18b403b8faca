/// RenderCore - process-wide singleton for the graphics helper and the logger
///
/// Initialization is explicit and must happen before a helper is created;
/// shutdown tears the helper down (pending commands dropped, every pending
/// deletion flushed). Storage is thread-safe static state behind RwLocks.

use std::sync::{Arc, OnceLock, RwLock};
use std::time::SystemTime;
use crate::error::{Error, Result};
use crate::graphics::backend::GraphicsBackend;
use crate::graphics::graphics_helper::{GraphicsHelper, RenderConfig};
use crate::log::{DefaultLogger, LogEntry, LogSeverity, Logger};

// ===== INTERNAL STATE =====

/// Global core state storage
static CORE_STATE: OnceLock<CoreState> = OnceLock::new();

/// Global logger (initialized with DefaultLogger)
static LOGGER: OnceLock<RwLock<Box<dyn Logger>>> = OnceLock::new();

struct CoreState {
    graphics_helper: RwLock<Option<Arc<GraphicsHelper>>>,
}

impl CoreState {
    fn new() -> Self {
        Self {
            graphics_helper: RwLock::new(None),
        }
    }
}

fn logger() -> &'static RwLock<Box<dyn Logger>> {
    LOGGER.get_or_init(|| RwLock::new(Box::new(DefaultLogger::new())))
}

// ===== PUBLIC API =====

/// Singleton manager
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use rhi_core::rhi::RenderCore;
/// use rhi_core::rhi::graphics::{GraphicsBackend, RenderConfig};
///
/// # fn run(backend: Arc<dyn GraphicsBackend>) -> rhi_core::rhi::Result<()> {
/// RenderCore::initialize()?;
/// RenderCore::create_graphics_helper(backend, RenderConfig::default())?;
///
/// let helper = RenderCore::graphics_helper()?;
/// helper.end_frame();
///
/// RenderCore::shutdown();
/// # Ok(())
/// # }
/// ```
pub struct RenderCore;

impl RenderCore {
    /// Log errors before returning them
    fn log_and_return_error(error: Error) -> Error {
        match &error {
            Error::InitializationFailed(msg) => {
                crate::rhi_error!("rhi::RenderCore", "Initialization failed: {}", msg);
            }
            Error::BackendError(msg) => {
                crate::rhi_error!("rhi::RenderCore", "Backend error: {}", msg);
            }
            _ => {
                crate::rhi_error!("rhi::RenderCore", "Core error: {}", error);
            }
        }
        error
    }

    fn state() -> Result<&'static CoreState> {
        CORE_STATE.get().ok_or_else(|| {
            Self::log_and_return_error(Error::InitializationFailed(
                "RenderCore not initialized. Call RenderCore::initialize() first.".to_string(),
            ))
        })
    }

    /// Initialize the core, idempotent
    pub fn initialize() -> Result<()> {
        CORE_STATE.get_or_init(CoreState::new);
        Ok(())
    }

    /// Shut the graphics helper down and drop the singleton
    ///
    /// Pending render commands are dropped and every pending deletion is
    /// destroyed. References still held elsewhere keep the helper object alive
    /// but it destroys anything released later immediately.
    pub fn shutdown() {
        if let Some(state) = CORE_STATE.get() {
            let helper = match state.graphics_helper.write() {
                Ok(mut lock) => lock.take(),
                Err(_) => None,
            };
            if let Some(helper) = helper {
                helper.shutdown();
            }
        }
    }

    // ===== GRAPHICS HELPER API =====

    /// Create and register the graphics helper singleton
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The core is not initialized
    /// - A graphics helper already exists
    /// - The helper lock is poisoned
    pub fn create_graphics_helper(backend: Arc<dyn GraphicsBackend>, config: RenderConfig) -> Result<Arc<GraphicsHelper>> {
        let state = Self::state()?;

        let mut lock = state.graphics_helper.write().map_err(|_| {
            Self::log_and_return_error(Error::BackendError("GraphicsHelper lock poisoned".to_string()))
        })?;

        if lock.is_some() {
            return Err(Self::log_and_return_error(Error::InitializationFailed(
                "GraphicsHelper already exists. Call RenderCore::destroy_graphics_helper() first.".to_string(),
            )));
        }

        let helper = GraphicsHelper::new(backend, config);
        *lock = Some(Arc::clone(&helper));

        crate::rhi_info!("rhi::RenderCore", "GraphicsHelper singleton created successfully");

        Ok(helper)
    }

    /// Get the graphics helper singleton
    ///
    /// # Errors
    ///
    /// Returns an error if the core is not initialized or no helper was created
    pub fn graphics_helper() -> Result<Arc<GraphicsHelper>> {
        let state = Self::state()?;

        let lock = state.graphics_helper.read().map_err(|_| {
            Self::log_and_return_error(Error::BackendError("GraphicsHelper lock poisoned".to_string()))
        })?;

        lock.clone().ok_or_else(|| {
            Self::log_and_return_error(Error::InitializationFailed(
                "GraphicsHelper not created. Call RenderCore::create_graphics_helper() first.".to_string(),
            ))
        })
    }

    /// Shut down and unregister the graphics helper
    pub fn destroy_graphics_helper() -> Result<()> {
        let state = Self::state()?;

        let helper = {
            let mut lock = state.graphics_helper.write().map_err(|_| {
                Self::log_and_return_error(Error::BackendError("GraphicsHelper lock poisoned".to_string()))
            })?;
            lock.take()
        };

        // Outside the lock: shutting down runs deleters that may log or release
        if let Some(helper) = helper {
            helper.shutdown();
        }

        crate::rhi_info!("rhi::RenderCore", "GraphicsHelper singleton destroyed");

        Ok(())
    }

    /// Reset all singletons for testing (only available in test builds)
    #[cfg(test)]
    pub fn reset_for_testing() {
        Self::shutdown();
        Self::reset_logger();
    }

    // ===== LOGGING API =====

    /// Set a custom logger
    ///
    /// # Example
    ///
    /// ```no_run
    /// use rhi_core::rhi::{RenderCore, log::{Logger, LogEntry}};
    ///
    /// struct FileLogger;
    /// impl Logger for FileLogger {
    ///     fn log(&self, entry: &LogEntry) {
    ///         // Write to file...
    ///     }
    /// }
    ///
    /// RenderCore::set_logger(FileLogger);
    /// ```
    pub fn set_logger<L: Logger + 'static>(new_logger: L) {
        if let Ok(mut lock) = logger().write() {
            *lock = Box::new(new_logger);
        }
    }

    /// Reset logger to default (DefaultLogger)
    pub fn reset_logger() {
        if let Ok(mut lock) = logger().write() {
            *lock = Box::new(DefaultLogger::new());
        }
    }

    /// Logging entry point of the `rhi_trace!` .. `rhi_warn!` macros
    pub fn log(severity: LogSeverity, source: &str, message: String) {
        if let Ok(lock) = logger().read() {
            lock.log(&LogEntry {
                severity,
                timestamp: SystemTime::now(),
                source: source.to_string(),
                message,
                file: None,
                line: None,
            });
        }
    }

    /// Logging entry point with file:line information, used by `rhi_error!`
    pub fn log_detailed(
        severity: LogSeverity,
        source: &str,
        message: String,
        file: &'static str,
        line: u32,
    ) {
        if let Ok(lock) = logger().read() {
            lock.log(&LogEntry {
                severity,
                timestamp: SystemTime::now(),
                source: source.to_string(),
                message,
                file: Some(file),
                line: Some(line),
            });
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "render_core_tests.rs"]
mod tests;
