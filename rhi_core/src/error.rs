//! Error types for the RHI core
//!
//! Errors fall into two classes:
//! - configuration errors (a host buffer layout that disagrees with a shader),
//!   reported through `Error::is_fatal()` so callers abort before drawing
//! - runtime errors (allocation failure, zero-sized resource, missing lookups)
//!   that are logged and handed back to the caller
//!
//! Programmer errors such as a double release or a double `init()` do not
//! produce an `Error` at all: they go through `rhi_fatal!` and panic.

use std::fmt;

/// Result type for RHI core operations
pub type Result<T> = std::result::Result<T, Error>;

/// RHI core errors
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Backend-specific error (Vulkan, DirectX, etc.)
    BackendError(String),

    /// Out of GPU memory
    OutOfMemory,

    /// Invalid resource (zero sized buffer, unknown format, released handle...)
    InvalidResource(String),

    /// Initialization failed (singleton, graphics helper, subsystems)
    InitializationFailed(String),

    /// Shader reflection disagrees with the host side binding description
    ShaderBindingMismatch(String),

    /// A layout still depends on a specialization constant with no value
    UnresolvedSpecialization(String),
}

impl Error {
    /// Configuration errors that must stop the shader from ever being used
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::ShaderBindingMismatch(_))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::OutOfMemory => write!(f, "Out of GPU memory"),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            Error::ShaderBindingMismatch(msg) => write!(f, "Shader binding mismatch: {}", msg),
            Error::UnresolvedSpecialization(msg) => write!(f, "Unresolved specialization: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

// ===== ERROR MACROS =====

/// Log an error and build an `Error::BackendError` from the same message
///
/// # Example
///
/// ```no_run
/// # use rhi_core::rhi_err;
/// let err = rhi_err!("rhi::Buffer", "Buffer {} has no memory", "vertices");
/// ```
#[macro_export]
macro_rules! rhi_err {
    ($source:expr, $($arg:tt)*) => {{
        let message = format!($($arg)*);
        $crate::rhi_error!($source, "{}", message);
        $crate::rhi::Error::BackendError(message)
    }};
}

/// Log an error and return it from the current function
#[macro_export]
macro_rules! rhi_bail {
    ($source:expr, $($arg:tt)*) => {
        return Err($crate::rhi_err!($source, $($arg)*))
    };
}

/// Log an error then panic
///
/// Reserved for programmer errors that leave no sane state to continue from
/// (releasing a reference twice, initializing a resource twice).
#[macro_export]
macro_rules! rhi_fatal {
    ($source:expr, $($arg:tt)*) => {{
        let message = format!($($arg)*);
        $crate::rhi_error!($source, "{}", message);
        panic!("[{}] {}", $source, message)
    }};
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
