/// Graphics module - backend boundary, frame pacing and shared graphics types

pub mod types;
pub mod backend;
pub mod command_queue;
pub mod graphics_helper;
#[cfg(test)]
pub mod mock_backend;

pub use types::*;
pub use backend::*;
pub use command_queue::*;
pub use graphics_helper::*;
