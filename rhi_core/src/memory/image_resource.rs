/// Image resource
///
/// One concrete image type covers plain textures, render targets, cube maps
/// and cube render targets; `ImageFlags` select the flavour. The platform
/// description (usage, tiling, mip chain, create flags, view type) is derived
/// from the logical one every time the image is (re)initialized.

use std::sync::{Arc, Mutex, MutexGuard, Weak};
use bitflags::bitflags;
use glam::UVec3;
use rustc_hash::FxHashMap;
use crate::error::{Error, Result};
use crate::graphics::backend::{GraphicsBackend, ImageDesc, RawHandle};
use crate::graphics::graphics_helper::GraphicsHelper;
use crate::graphics::types::{
    ImageCreateFlags, ImageShaderUsage, ImageTiling, ImageType, ImageUsage, ImageViewType,
    PixelFormat, SampleCount,
};
use crate::memory::memory_resource::{GraphicsResource, ResourceCore};
use crate::memory::ref_counter::ReleasePolicy;

// ============================================================================
// Creation info
// ============================================================================

bitflags! {
    /// Image flavour
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ImageFlags: u32 {
        /// Attachment of a framebuffer, single mip
        const RENDER_TARGET = 1 << 0;
        /// Six layers per cube, cube compatible
        const CUBE = 1 << 1;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageCreateInfo {
    pub name: String,
    pub format: PixelFormat,
    pub dimensions: UVec3,
    /// 0 requests the full mip chain
    pub mip_count: u32,
    pub layer_count: u32,
    pub sample_count: SampleCount,
    pub shader_usage: ImageShaderUsage,
    pub flags: ImageFlags,
    /// Linear tiling, host visible
    pub cpu_accessible: bool,
    /// `None` uses the helper's default policy
    pub release_policy: Option<ReleasePolicy>,
}

impl Default for ImageCreateInfo {
    fn default() -> Self {
        Self {
            name: "Image".to_string(),
            format: PixelFormat::R8G8B8A8_UNORM,
            dimensions: UVec3::new(256, 256, 1),
            mip_count: 0,
            layer_count: 1,
            sample_count: SampleCount::S1,
            shader_usage: ImageShaderUsage::SAMPLING,
            flags: ImageFlags::empty(),
            cpu_accessible: false,
            release_policy: None,
        }
    }
}

impl ImageCreateInfo {
    pub fn render_target(name: &str, format: PixelFormat, width: u32, height: u32) -> Self {
        Self {
            name: name.to_string(),
            format,
            dimensions: UVec3::new(width, height, 1),
            flags: ImageFlags::RENDER_TARGET,
            ..Default::default()
        }
    }

    pub fn cube(name: &str, format: PixelFormat, size: u32) -> Self {
        Self {
            name: name.to_string(),
            format,
            dimensions: UVec3::new(size, size, 1),
            layer_count: 6,
            flags: ImageFlags::CUBE,
            ..Default::default()
        }
    }

    pub fn cube_render_target(name: &str, format: PixelFormat, size: u32) -> Self {
        Self {
            flags: ImageFlags::CUBE | ImageFlags::RENDER_TARGET,
            ..Self::cube(name, format, size)
        }
    }
}

// ============================================================================
// Views
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ComponentSwizzle {
    #[default]
    Identity,
    Zero,
    One,
    R,
    G,
    B,
    A,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ComponentMapping {
    pub r: ComponentSwizzle,
    pub g: ComponentSwizzle,
    pub b: ComponentSwizzle,
    pub a: ComponentSwizzle,
}

/// Mip and layer range, `u32::MAX` counts cover the remaining levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageSubresource {
    pub base_mip: u32,
    pub mip_count: u32,
    pub base_layer: u32,
    pub layer_count: u32,
}

impl Default for ImageSubresource {
    fn default() -> Self {
        Self {
            base_mip: 0,
            mip_count: u32::MAX,
            base_layer: 0,
            layer_count: u32::MAX,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ImageViewInfo {
    pub component_mapping: ComponentMapping,
    pub subresource: ImageSubresource,
    /// View the stencil aspect of a depth/stencil image instead of depth
    pub use_stencil: bool,
}

// ============================================================================
// Derivation
// ============================================================================

/// Logical, user-editable description
#[derive(Debug, Clone, Copy, PartialEq)]
struct LogicalImage {
    dimensions: UVec3,
    mip_count: u32,
    layer_count: u32,
    sample_count: SampleCount,
    shader_usage: ImageShaderUsage,
}

/// Platform description derived from the logical one
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedImage {
    pub desc: ImageDesc,
    pub view_type: ImageViewType,
}

impl DerivedImage {
    /// Bytes covered by all layers of the top mip
    pub fn size(&self) -> u64 {
        let dims = self.desc.dimensions;
        dims.x as u64
            * dims.y as u64
            * dims.z as u64
            * self.desc.layer_count as u64
            * self.desc.format.pixel_size() as u64
    }
}

/// Length of the full mip chain for a 2D extent
pub fn full_mip_chain(width: u32, height: u32) -> u32 {
    32 - width.max(height).max(1).leading_zeros()
}

fn derive_image(name: &str, format: PixelFormat, flags: ImageFlags, cpu_accessible: bool, logical: &LogicalImage) -> DerivedImage {
    let mut dimensions = logical.dimensions;
    let mut layer_count = logical.layer_count.max(1);
    let mut sample_count = logical.sample_count;
    let mut mip_count = logical.mip_count;
    let mut create_flags = ImageCreateFlags::empty();

    let (image_type, view_type) = if flags.contains(ImageFlags::CUBE) {
        create_flags |= ImageCreateFlags::CUBE_COMPATIBLE;
        let rounded = layer_count.div_ceil(6) * 6;
        if rounded != layer_count {
            crate::rhi_warn!(
                "rhi::ImageResource",
                "Cube image '{}' has {} layers, rounded up to {}",
                name,
                layer_count,
                rounded
            );
            layer_count = rounded;
        }
        dimensions.z = 1;
        let view_type = if layer_count == 6 { ImageViewType::Cube } else { ImageViewType::CubeArray };
        (ImageType::Image2D, view_type)
    } else if dimensions.z > 1 {
        if layer_count > 1 {
            crate::rhi_warn!(
                "rhi::ImageResource",
                "3D image '{}' cannot have {} layers, using 1",
                name,
                layer_count
            );
            layer_count = 1;
        }
        create_flags |= ImageCreateFlags::ARRAY_2D_COMPATIBLE;
        (ImageType::Image3D, ImageViewType::View3D)
    } else if layer_count > 1 {
        (ImageType::Image2D, ImageViewType::View2DArray)
    } else {
        (ImageType::Image2D, ImageViewType::View2D)
    };

    let mut tiling = ImageTiling::Optimal;
    let mut usage;
    if flags.contains(ImageFlags::RENDER_TARGET) {
        usage = ImageUsage::TRANSFER_SRC | ImageUsage::INPUT_ATTACHMENT;
        usage |= if format.is_depth() {
            ImageUsage::DEPTH_STENCIL_ATTACHMENT
        } else {
            ImageUsage::COLOR_ATTACHMENT
        };
        if logical.shader_usage.contains(ImageShaderUsage::SAMPLING) {
            usage |= ImageUsage::SAMPLED;
        }
        mip_count = 1;
    } else {
        usage = ImageUsage::TRANSFER_SRC | ImageUsage::TRANSFER_DST;
        if logical.shader_usage.contains(ImageShaderUsage::SAMPLING) {
            usage |= ImageUsage::SAMPLED;
        }
        if logical.shader_usage.contains(ImageShaderUsage::WRITING) {
            usage |= ImageUsage::STORAGE;
        }

        if mip_count == 0 {
            mip_count = full_mip_chain(dimensions.x, dimensions.y);
        }
        if image_type != ImageType::Image2D {
            mip_count = 1;
            sample_count = SampleCount::S1;
        }
        if sample_count != SampleCount::S1 {
            mip_count = 1;
        }

        if cpu_accessible {
            tiling = ImageTiling::Linear;
            mip_count = 1;
            layer_count = 1;
            usage = ImageUsage::TRANSFER_SRC | ImageUsage::TRANSFER_DST;
            sample_count = SampleCount::S1;
        }
    }

    DerivedImage {
        desc: ImageDesc {
            name: name.to_string(),
            format,
            dimensions,
            mip_count,
            layer_count,
            sample_count,
            image_type,
            tiling,
            usage,
            create_flags,
            cpu_accessible,
        },
        view_type,
    }
}

// ============================================================================
// ImageResource
// ============================================================================

type ViewKey = (ImageViewType, ImageViewInfo);

struct ImageState {
    logical: LogicalImage,
    derived: Option<DerivedImage>,
    handle: Option<RawHandle>,
    views: FxHashMap<ViewKey, RawHandle>,
}

pub struct ImageResource {
    core: ResourceCore,
    backend: Arc<dyn GraphicsBackend>,
    format: PixelFormat,
    flags: ImageFlags,
    cpu_accessible: bool,
    state: Mutex<ImageState>,
}

impl ImageResource {
    pub(crate) fn new(
        info: ImageCreateInfo,
        release_policy: ReleasePolicy,
        backend: Arc<dyn GraphicsBackend>,
        helper: Weak<GraphicsHelper>,
    ) -> Self {
        Self {
            core: ResourceCore::new(info.name, release_policy, helper),
            backend,
            format: info.format,
            flags: info.flags,
            cpu_accessible: info.cpu_accessible,
            state: Mutex::new(ImageState {
                logical: LogicalImage {
                    dimensions: info.dimensions,
                    mip_count: info.mip_count,
                    layer_count: info.layer_count,
                    sample_count: info.sample_count,
                    shader_usage: info.shader_usage,
                },
                derived: None,
                handle: None,
                views: FxHashMap::default(),
            }),
        }
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn flags(&self) -> ImageFlags {
        self.flags
    }

    pub fn is_render_target(&self) -> bool {
        self.flags.contains(ImageFlags::RENDER_TARGET)
    }

    pub fn is_cube(&self) -> bool {
        self.flags.contains(ImageFlags::CUBE)
    }

    pub fn is_cpu_accessible(&self) -> bool {
        self.cpu_accessible
    }

    pub fn handle(&self) -> Option<RawHandle> {
        self.lock_state().handle
    }

    pub fn image_size(&self) -> UVec3 {
        self.lock_state().logical.dimensions
    }

    pub fn layer_count(&self) -> u32 {
        self.lock_state().logical.layer_count
    }

    pub fn mip_count(&self) -> u32 {
        self.lock_state().logical.mip_count
    }

    pub fn sample_count(&self) -> SampleCount {
        self.lock_state().logical.sample_count
    }

    pub fn shader_usage(&self) -> ImageShaderUsage {
        self.lock_state().logical.shader_usage
    }

    /// Platform description of the live image, if any
    pub fn derived(&self) -> Option<DerivedImage> {
        self.lock_state().derived.clone()
    }

    pub fn set_image_size(&self, dimensions: UVec3) {
        self.update_logical(|logical| std::mem::replace(&mut logical.dimensions, dimensions) != dimensions);
    }

    pub fn set_layer_count(&self, count: u32) {
        self.update_logical(|logical| std::mem::replace(&mut logical.layer_count, count) != count);
    }

    pub fn set_sample_count(&self, samples: SampleCount) {
        self.update_logical(|logical| std::mem::replace(&mut logical.sample_count, samples) != samples);
    }

    pub fn set_mip_count(&self, count: u32) {
        self.update_logical(|logical| std::mem::replace(&mut logical.mip_count, count) != count);
    }

    pub fn set_shader_usage(&self, usage: ImageShaderUsage) {
        self.update_logical(|logical| std::mem::replace(&mut logical.shader_usage, usage) != usage);
    }

    /// View with the image's natural view type
    pub fn view(&self, info: ImageViewInfo) -> Option<RawHandle> {
        let view_type = self.lock_state().derived.as_ref()?.view_type;
        self.view_as(view_type, info)
    }

    /// View with an explicit view type, created on first request
    pub fn view_as(&self, view_type: ImageViewType, info: ImageViewInfo) -> Option<RawHandle> {
        let mut state = self.lock_state();
        let handle = state.handle?;
        if info.use_stencil && !self.format.has_stencil() {
            crate::rhi_warn!(
                "rhi::ImageResource",
                "Stencil view requested on '{}' whose format {:?} has no stencil",
                self.core.name(),
                self.format
            );
        }

        let key = (view_type, info);
        if let Some(view) = state.views.get(&key) {
            return Some(*view);
        }

        match self.backend.create_image_view(handle, view_type, self.format, &info) {
            Ok(view) => {
                state.views.insert(key, view);
                Some(view)
            }
            Err(err) => {
                crate::rhi_error!("rhi::ImageResource", "Failed creating view for '{}': {}", self.core.name(), err);
                None
            }
        }
    }

    pub fn view_count(&self) -> usize {
        self.lock_state().views.len()
    }

    fn update_logical<F>(&self, apply: F)
    where
        F: FnOnce(&mut LogicalImage) -> bool,
    {
        let changed = apply(&mut self.lock_state().logical);
        if changed && self.core.is_initialized() {
            self.core.mark_dirty();
        }
    }

    fn destroy_handles(&self, state: &mut ImageState) {
        for (_, view) in state.views.drain() {
            self.backend.destroy(view);
        }
        if let Some(handle) = state.handle.take() {
            self.backend.destroy(handle);
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, ImageState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl GraphicsResource for ImageResource {
    fn core(&self) -> &ResourceCore {
        &self.core
    }

    fn reinit_resources(&self) -> Result<()> {
        let mut state = self.lock_state();
        let name = self.core.name();
        let derived = derive_image(&name, self.format, self.flags, self.cpu_accessible, &state.logical);

        if derived.size() == 0 {
            crate::rhi_error!("rhi::ImageResource", "Invalid image '{}' with zero size", name);
            return Err(Error::InvalidResource(format!("image '{}' has zero size", name)));
        }

        match self.backend.create_image(&derived.desc) {
            Ok(handle) => {
                self.destroy_handles(&mut state);
                crate::rhi_debug!(
                    "rhi::ImageResource",
                    "Created image '{}' {}x{}x{} ({} layers, {} mips)",
                    name,
                    derived.desc.dimensions.x,
                    derived.desc.dimensions.y,
                    derived.desc.dimensions.z,
                    derived.desc.layer_count,
                    derived.desc.mip_count
                );
                state.handle = Some(handle);
                state.derived = Some(derived);
                Ok(())
            }
            Err(err) => {
                crate::rhi_error!("rhi::ImageResource", "Failed creating image '{}': {}", name, err);
                Err(err)
            }
        }
    }

    fn release(&self) {
        let mut state = self.lock_state();
        self.destroy_handles(&mut state);
    }

    fn is_valid(&self) -> bool {
        self.lock_state().handle.is_some()
    }

    fn resource_size(&self) -> u64 {
        self.lock_state().derived.as_ref().map_or(0, DerivedImage::size)
    }

    fn into_dyn(self: Arc<Self>) -> Arc<dyn GraphicsResource> {
        self
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "image_resource_tests.rs"]
mod tests;
