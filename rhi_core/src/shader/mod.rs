/// Shader module - host buffer layouts, reflection and parameter binding

pub mod primitive;
pub mod buffer_layout;
pub mod reflection;
pub mod specialization;
pub mod param_table;

pub use primitive::*;
pub use buffer_layout::*;
pub use reflection::*;
pub use specialization::*;
pub use param_table::*;
