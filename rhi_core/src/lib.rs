/*!
# RHI Core

Backend-agnostic GPU resource lifetime management and shader binding
descriptions.

This crate sits between a renderer and a concrete graphics backend. It owns
the rules for when GPU objects may be destroyed (never while a frame in
flight can still reference them) and for how host data maps onto shader
buffers (std140/std430 packing checked against shader reflection).

## Architecture

- **RenderCore**: process singleton holding the logger and the graphics helper
- **GraphicsHelper**: resource factories, render command queue, deferred deleter,
  render pass cache, frame pacing through `end_frame()`
- **GraphicsBackend**: trait implemented by the real backend (Vulkan, ...)
- **ResourceRef**: counted handle to a buffer, image, sampler or sync object;
  dropping the last one schedules destruction per its `ReleasePolicy`
- **BufferLayout / ShaderParamBindingTable**: host buffer layouts and their
  validation against shader reflection

SPIR-V reflection lives in the `rhi_spirv` crate.
*/

// Internal modules
mod error;
mod render_core;
pub mod log;
pub mod graphics;
pub mod memory;
pub mod shader;
pub mod rendering;

// Main rhi namespace module
pub mod rhi {
    // Error types
    pub use crate::error::{Error, Result};

    // Process singleton
    pub use crate::render_core::RenderCore;

    // Logging sub-module (types only, macros are exported at the crate root)
    pub mod log {
        pub use crate::log::{format_entry, DefaultLogger, LogEntry, LogSeverity, Logger};
    }

    // Backend boundary, graphics helper and shared types
    pub mod graphics {
        pub use crate::graphics::*;
    }

    // GPU resources and deferred deletion
    pub mod memory {
        pub use crate::memory::*;
    }

    // Buffer layouts, reflection and binding tables
    pub mod shader {
        pub use crate::shader::*;
    }

    // Framebuffer formats and render pass compatibility
    pub mod rendering {
        pub use crate::rendering::*;
    }
}

// Re-export math library at crate root
pub use glam;
