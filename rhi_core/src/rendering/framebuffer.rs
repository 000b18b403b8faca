/// Framebuffer - the set of image attachments a render pass draws into

use crate::graphics::types::SampleCount;
use crate::memory::image_resource::ImageResource;
use crate::memory::memory_resource::ResourceRef;
use crate::rendering::framebuffer_format::{FramebufferFormat, GenericRenderPassProperties};

pub struct Framebuffer {
    pub textures: Vec<ResourceRef<ImageResource>>,
    /// Every color attachment is directly followed by its resolve target
    pub has_resolves: bool,
}

impl Framebuffer {
    pub fn new(textures: Vec<ResourceRef<ImageResource>>, has_resolves: bool) -> Self {
        Self { textures, has_resolves }
    }

    /// Generic format with one entry per render target and resolve pair
    ///
    /// Depth attachments never have a resolve target.
    pub fn format(&self) -> FramebufferFormat {
        let mut attachments = Vec::with_capacity(self.textures.len());
        let mut index = 0;
        while index < self.textures.len() {
            let format = self.textures[index].format();
            attachments.push(format);
            index += if self.has_resolves && !format.is_depth() { 2 } else { 1 };
        }
        FramebufferFormat::generic(attachments)
    }

    /// Properties of render passes compatible with this framebuffer
    pub fn render_pass_props(&self) -> GenericRenderPassProperties {
        let Some(first) = self.textures.first() else {
            return GenericRenderPassProperties::default();
        };

        GenericRenderPassProperties {
            attachment_format: self.format(),
            multisample_count: first.sample_count(),
            one_rt_per_format: !self.has_resolves,
        }
    }

    pub fn sample_count(&self) -> SampleCount {
        self.textures.first().map_or(SampleCount::S1, |texture| texture.sample_count())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "framebuffer_tests.rs"]
mod tests;
