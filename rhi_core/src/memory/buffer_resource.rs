/// Buffer resource
///
/// Logical description (element stride, element count, texel format) plus the
/// platform buffer and its cached texel views. Changing the description of an
/// initialized buffer schedules a rebuild on the render thread.

use std::sync::{Arc, Mutex, MutexGuard, Weak};
use rustc_hash::FxHashMap;
use crate::error::{Error, Result};
use crate::graphics::backend::{BufferDesc, GraphicsBackend, RawHandle};
use crate::graphics::graphics_helper::GraphicsHelper;
use crate::graphics::types::{BufferUsage, PixelFormat};
use crate::memory::memory_resource::{GraphicsResource, ResourceCore};
use crate::memory::ref_counter::ReleasePolicy;

/// Buffer creation parameters
#[derive(Debug, Clone, PartialEq)]
pub struct BufferCreateInfo {
    pub name: String,
    /// Size of one element in bytes
    pub stride: u32,
    /// Number of elements
    pub count: u32,
    pub usage: BufferUsage,
    /// Format of texel views, `Undefined` for plain buffers
    pub texel_format: PixelFormat,
    pub cpu_accessible: bool,
    /// `None` uses the helper's default policy
    pub release_policy: Option<ReleasePolicy>,
}

impl Default for BufferCreateInfo {
    fn default() -> Self {
        Self {
            name: "Buffer".to_string(),
            stride: 0,
            count: 1,
            usage: BufferUsage::TRANSFER_DST,
            texel_format: PixelFormat::Undefined,
            cpu_accessible: false,
            release_policy: None,
        }
    }
}

/// Byte range of a texel view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferViewInfo {
    pub start_offset: u64,
    /// `u64::MAX` covers the rest of the buffer
    pub size: u64,
}

impl Default for BufferViewInfo {
    fn default() -> Self {
        Self { start_offset: 0, size: u64::MAX }
    }
}

struct BufferState {
    stride: u32,
    count: u32,
    texel_format: PixelFormat,
    handle: Option<RawHandle>,
    views: FxHashMap<BufferViewInfo, RawHandle>,
}

pub struct BufferResource {
    core: ResourceCore,
    backend: Arc<dyn GraphicsBackend>,
    usage: BufferUsage,
    cpu_accessible: bool,
    state: Mutex<BufferState>,
}

impl BufferResource {
    pub(crate) fn new(
        info: BufferCreateInfo,
        release_policy: ReleasePolicy,
        backend: Arc<dyn GraphicsBackend>,
        helper: Weak<GraphicsHelper>,
    ) -> Self {
        Self {
            core: ResourceCore::new(info.name, release_policy, helper),
            backend,
            usage: info.usage,
            cpu_accessible: info.cpu_accessible,
            state: Mutex::new(BufferState {
                stride: info.stride,
                count: info.count,
                texel_format: info.texel_format,
                handle: None,
                views: FxHashMap::default(),
            }),
        }
    }

    pub fn usage(&self) -> BufferUsage {
        self.usage
    }

    pub fn is_cpu_accessible(&self) -> bool {
        self.cpu_accessible
    }

    pub fn stride(&self) -> u32 {
        self.lock_state().stride
    }

    pub fn count(&self) -> u32 {
        self.lock_state().count
    }

    pub fn texel_format(&self) -> PixelFormat {
        self.lock_state().texel_format
    }

    pub fn handle(&self) -> Option<RawHandle> {
        self.lock_state().handle
    }

    pub fn set_buffer_stride(&self, stride: u32) {
        self.update_state(|state| std::mem::replace(&mut state.stride, stride) != stride);
    }

    pub fn set_buffer_count(&self, count: u32) {
        self.update_state(|state| std::mem::replace(&mut state.count, count) != count);
    }

    pub fn set_texel_format(&self, format: PixelFormat) {
        self.update_state(|state| std::mem::replace(&mut state.texel_format, format) != format);
    }

    /// Texel view over a byte range, created on first request
    ///
    /// Returns `None` for buffers without a texel format or without a live
    /// platform buffer.
    pub fn view(&self, info: BufferViewInfo) -> Option<RawHandle> {
        let mut state = self.lock_state();
        let handle = state.handle?;
        if state.texel_format == PixelFormat::Undefined {
            crate::rhi_error!(
                "rhi::BufferResource",
                "Buffer '{}' has no texel format, cannot create a view",
                self.core.name()
            );
            return None;
        }

        if let Some(view) = state.views.get(&info) {
            return Some(*view);
        }

        match self.backend.create_buffer_view(handle, state.texel_format, &info) {
            Ok(view) => {
                state.views.insert(info, view);
                Some(view)
            }
            Err(err) => {
                crate::rhi_error!("rhi::BufferResource", "Creating view for '{}' failed: {}", self.core.name(), err);
                None
            }
        }
    }

    pub fn view_count(&self) -> usize {
        self.lock_state().views.len()
    }

    /// Apply a setter; a changed description on an initialized buffer marks it dirty
    fn update_state<F>(&self, apply: F)
    where
        F: FnOnce(&mut BufferState) -> bool,
    {
        let changed = apply(&mut self.lock_state());
        if changed && self.core.is_initialized() {
            self.core.mark_dirty();
        }
    }

    fn destroy_handles(&self, state: &mut BufferState) {
        for (_, view) in state.views.drain() {
            self.backend.destroy(view);
        }
        if let Some(handle) = state.handle.take() {
            self.backend.destroy(handle);
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, BufferState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl GraphicsResource for BufferResource {
    fn core(&self) -> &ResourceCore {
        &self.core
    }

    /// Replaces the platform buffer; on failure the previous one stays in place
    fn reinit_resources(&self) -> Result<()> {
        let mut state = self.lock_state();

        let size = state.stride as u64 * state.count as u64;
        if size == 0 {
            crate::rhi_error!(
                "rhi::BufferResource",
                "Buffer '{}' has zero size (stride {}, count {})",
                self.core.name(),
                state.stride,
                state.count
            );
            return Err(Error::InvalidResource(format!("buffer '{}' has zero size", self.core.name())));
        }

        let desc = BufferDesc {
            name: self.core.name(),
            size,
            usage: self.usage,
            cpu_accessible: self.cpu_accessible,
        };
        match self.backend.create_buffer(&desc) {
            Ok(handle) => {
                self.destroy_handles(&mut state);
                state.handle = Some(handle);
                crate::rhi_debug!("rhi::BufferResource", "Created buffer '{}' ({} bytes)", desc.name, size);
                Ok(())
            }
            Err(err) => {
                crate::rhi_error!("rhi::BufferResource", "Failed creating buffer '{}': {}", desc.name, err);
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
        let state = self.lock_state();
        state.stride as u64 * state.count as u64
    }

    fn into_dyn(self: Arc<Self>) -> Arc<dyn GraphicsResource> {
        self
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "buffer_resource_tests.rs"]
mod tests;
