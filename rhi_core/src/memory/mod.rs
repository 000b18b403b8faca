/// Memory module - GPU resource ownership and deferred destruction

pub mod ref_counter;
pub mod deferred_deleter;
pub mod memory_resource;
pub mod buffer_resource;
pub mod image_resource;
pub mod sampler_resource;
pub mod sync_resource;

pub use ref_counter::*;
pub use deferred_deleter::*;
pub use memory_resource::*;
pub use buffer_resource::*;
pub use image_resource::*;
pub use sampler_resource::*;
pub use sync_resource::*;
