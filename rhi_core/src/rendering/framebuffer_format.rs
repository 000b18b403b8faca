/// Render pass compatibility keys
///
/// `FramebufferFormat` and `GenericRenderPassProperties` are the keys render
/// passes are deduplicated by. Named formats are engine-known attachment
/// shapes and compare by kind alone; `Generic` formats compare their full
/// attachment sequence, in order.

use std::cmp::Ordering;
use std::hash::{Hash, Hasher};
use crate::graphics::types::{LoadOp, PixelFormat, SampleCount, StoreOp};

// ===== RENDER PASS FORMAT =====

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum RenderPassFormat {
    /// Arbitrary attachment list
    #[default]
    Generic,
    /// Deferred shading G-buffer
    Multibuffer,
    Depth,
    PointLightDepth,
    DirectionalLightDepth,
    ShadowDepth,
}

/// Attachment formats of an engine-known render pass shape, empty for `Generic`
pub fn gbuffer_attachment_formats(kind: RenderPassFormat) -> &'static [PixelFormat] {
    match kind {
        RenderPassFormat::Generic => &[],
        RenderPassFormat::Multibuffer => &[
            PixelFormat::B8G8R8A8_UNORM,
            PixelFormat::A2B10G10R10_UNORM,
            PixelFormat::A2B10G10R10_UNORM,
            PixelFormat::D24_UNORM_S8_UINT,
        ],
        RenderPassFormat::Depth
        | RenderPassFormat::PointLightDepth
        | RenderPassFormat::DirectionalLightDepth
        | RenderPassFormat::ShadowDepth => &[PixelFormat::D24_UNORM_S8_UINT],
    }
}

/// Properties of the render pass drawing into a named G-buffer shape
///
/// Multisampled passes resolve into separate targets, so only single sampled
/// passes share one render target per format.
pub fn framebuffer_render_pass_props(kind: RenderPassFormat, samples: SampleCount) -> GenericRenderPassProperties {
    GenericRenderPassProperties {
        attachment_format: FramebufferFormat::named(kind),
        multisample_count: samples,
        one_rt_per_format: samples == SampleCount::S1,
    }
}

// ===== FRAMEBUFFER FORMAT =====

#[derive(Debug, Clone, Default)]
pub struct FramebufferFormat {
    /// One format per render target and resolve pair
    pub attachments: Vec<PixelFormat>,
    pub rp_format: RenderPassFormat,
}

impl FramebufferFormat {
    pub fn generic(attachments: Vec<PixelFormat>) -> Self {
        Self { attachments, rp_format: RenderPassFormat::Generic }
    }

    /// Named shape, attachments filled from the G-buffer table
    pub fn named(kind: RenderPassFormat) -> Self {
        Self {
            attachments: gbuffer_attachment_formats(kind).to_vec(),
            rp_format: kind,
        }
    }

    pub fn rp_format(&self) -> RenderPassFormat {
        self.rp_format
    }

    pub fn is_generic(&self) -> bool {
        self.rp_format == RenderPassFormat::Generic
    }
}

impl PartialEq for FramebufferFormat {
    fn eq(&self, other: &Self) -> bool {
        self.rp_format == other.rp_format && (!self.is_generic() || self.attachments == other.attachments)
    }
}

impl Eq for FramebufferFormat {}

impl Hash for FramebufferFormat {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rp_format.hash(state);
        if self.is_generic() {
            self.attachments.len().hash(state);
            for format in &self.attachments {
                format.hash(state);
            }
        }
    }
}

impl Ord for FramebufferFormat {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rp_format.cmp(&other.rp_format).then_with(|| {
            if self.is_generic() {
                self.attachments.cmp(&other.attachments)
            } else {
                Ordering::Equal
            }
        })
    }
}

impl PartialOrd for FramebufferFormat {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// ===== RENDER PASS PROPERTIES =====

/// Render pass compatibility key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GenericRenderPassProperties {
    pub attachment_format: FramebufferFormat,
    pub multisample_count: SampleCount,
    /// Every distinct format gets exactly one shared render target slot
    pub one_rt_per_format: bool,
}

impl Default for GenericRenderPassProperties {
    fn default() -> Self {
        Self {
            attachment_format: FramebufferFormat::default(),
            multisample_count: SampleCount::S1,
            one_rt_per_format: true,
        }
    }
}

/// Per-use attachment operations, part of the render pass cache key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderPassAdditionalProps {
    pub color_load_op: LoadOp,
    pub color_store_op: StoreOp,
    pub depth_load_op: LoadOp,
    pub depth_store_op: StoreOp,
    pub stencil_load_op: LoadOp,
    pub stencil_store_op: StoreOp,
    /// Attachments may start in an undefined layout
    pub allow_undefined_layout: bool,
    /// Color attachments end up presented
    pub used_as_present_source: bool,
}

impl Default for RenderPassAdditionalProps {
    fn default() -> Self {
        Self {
            color_load_op: LoadOp::Clear,
            color_store_op: StoreOp::Store,
            depth_load_op: LoadOp::Clear,
            depth_store_op: StoreOp::Store,
            stencil_load_op: LoadOp::Clear,
            stencil_store_op: StoreOp::Store,
            allow_undefined_layout: true,
            used_as_present_source: false,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "framebuffer_format_tests.rs"]
mod tests;
