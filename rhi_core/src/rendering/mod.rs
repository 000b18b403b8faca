/// Rendering module - render pass compatibility and framebuffers

pub mod framebuffer_format;
pub mod framebuffer;
pub mod render_pass_cache;

pub use framebuffer_format::*;
pub use framebuffer::*;
pub use render_pass_cache::*;
