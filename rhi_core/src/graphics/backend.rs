/// GraphicsBackend trait - the narrow boundary to the platform graphics API
///
/// Resources describe what they need with plain descriptors; the backend turns
/// those into opaque handles and destroys them on request. Nothing above this
/// trait knows which API sits behind it.

use glam::UVec3;
use crate::error::Result;
use crate::graphics::types::{
    BufferUsage, ImageCreateFlags, ImageTiling, ImageType, ImageUsage, ImageViewType,
    PixelFormat, SampleCount,
};
use crate::memory::buffer_resource::BufferViewInfo;
use crate::memory::image_resource::ImageViewInfo;
use crate::memory::sampler_resource::SamplerCreateInfo;
use crate::memory::sync_resource::SyncKind;
use crate::rendering::framebuffer_format::{GenericRenderPassProperties, RenderPassAdditionalProps};

/// Opaque platform handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RawHandle(pub u64);

/// Everything the backend needs to allocate a buffer
#[derive(Debug, Clone, PartialEq)]
pub struct BufferDesc {
    pub name: String,
    pub size: u64,
    pub usage: BufferUsage,
    pub cpu_accessible: bool,
}

/// Everything the backend needs to allocate an image, fully derived
#[derive(Debug, Clone, PartialEq)]
pub struct ImageDesc {
    pub name: String,
    pub format: PixelFormat,
    pub dimensions: UVec3,
    pub mip_count: u32,
    pub layer_count: u32,
    pub sample_count: SampleCount,
    pub image_type: ImageType,
    pub tiling: ImageTiling,
    pub usage: ImageUsage,
    pub create_flags: ImageCreateFlags,
    pub cpu_accessible: bool,
}

/// Backend trait
///
/// Implemented by the platform layer (and by test doubles). All methods may be
/// called from the render thread only.
pub trait GraphicsBackend: Send + Sync {
    /// Allocate a buffer
    ///
    /// # Returns
    ///
    /// The buffer handle, or `Error::OutOfMemory` when the allocation fails
    fn create_buffer(&self, desc: &BufferDesc) -> Result<RawHandle>;

    /// Create a texel view over a buffer range
    fn create_buffer_view(&self, buffer: RawHandle, format: PixelFormat, view: &BufferViewInfo) -> Result<RawHandle>;

    /// Allocate an image
    fn create_image(&self, desc: &ImageDesc) -> Result<RawHandle>;

    /// Create a view over an image subresource range
    ///
    /// # Arguments
    ///
    /// * `image` - Image handle returned by `create_image`
    /// * `view_type` - Dimensionality the view exposes
    /// * `format` - Format of the viewed image
    /// * `view` - Component mapping and subresource range
    fn create_image_view(
        &self,
        image: RawHandle,
        view_type: ImageViewType,
        format: PixelFormat,
        view: &ImageViewInfo,
    ) -> Result<RawHandle>;

    fn create_sampler(&self, info: &SamplerCreateInfo) -> Result<RawHandle>;

    fn create_sync_object(&self, kind: SyncKind) -> Result<RawHandle>;

    /// Create a render pass compatible with the given properties
    fn create_render_pass(
        &self,
        props: &GenericRenderPassProperties,
        additional: &RenderPassAdditionalProps,
    ) -> Result<RawHandle>;

    /// Destroy any handle created by this backend
    fn destroy(&self, handle: RawHandle);
}
