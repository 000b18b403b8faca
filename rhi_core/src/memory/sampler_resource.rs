/// Sampler resource

use std::sync::{Arc, Mutex, MutexGuard, Weak};
use glam::Vec2;
use crate::error::Result;
use crate::graphics::backend::{GraphicsBackend, RawHandle};
use crate::graphics::graphics_helper::GraphicsHelper;
use crate::graphics::types::{AddressMode, BorderColor, Filtering};
use crate::memory::memory_resource::{GraphicsResource, ResourceCore};
use crate::memory::ref_counter::ReleasePolicy;

#[derive(Debug, Clone, PartialEq)]
pub struct SamplerCreateInfo {
    pub name: String,
    pub filtering: Filtering,
    pub mip_filtering: Filtering,
    /// Applied to U, V and W
    pub address_mode: AddressMode,
    /// Min and max LOD
    pub mip_lod_range: Vec2,
    pub border_color: BorderColor,
    pub release_policy: Option<ReleasePolicy>,
}

impl Default for SamplerCreateInfo {
    fn default() -> Self {
        Self {
            name: "Sampler".to_string(),
            filtering: Filtering::Linear,
            mip_filtering: Filtering::Linear,
            address_mode: AddressMode::Repeat,
            mip_lod_range: Vec2::new(0.0, 1000.0),
            border_color: BorderColor::OpaqueBlack,
            release_policy: None,
        }
    }
}

pub struct SamplerResource {
    core: ResourceCore,
    backend: Arc<dyn GraphicsBackend>,
    info: SamplerCreateInfo,
    handle: Mutex<Option<RawHandle>>,
}

impl SamplerResource {
    pub(crate) fn new(
        info: SamplerCreateInfo,
        release_policy: ReleasePolicy,
        backend: Arc<dyn GraphicsBackend>,
        helper: Weak<GraphicsHelper>,
    ) -> Self {
        Self {
            core: ResourceCore::new(info.name.clone(), release_policy, helper),
            backend,
            info,
            handle: Mutex::new(None),
        }
    }

    pub fn info(&self) -> &SamplerCreateInfo {
        &self.info
    }

    pub fn handle(&self) -> Option<RawHandle> {
        *self.lock_handle()
    }

    fn lock_handle(&self) -> MutexGuard<'_, Option<RawHandle>> {
        self.handle.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl GraphicsResource for SamplerResource {
    fn core(&self) -> &ResourceCore {
        &self.core
    }

    fn reinit_resources(&self) -> Result<()> {
        let sampler = self.backend.create_sampler(&self.info).map_err(|err| {
            crate::rhi_error!("rhi::SamplerResource", "Failed creating sampler '{}': {}", self.core.name(), err);
            err
        })?;

        if let Some(previous) = self.lock_handle().replace(sampler) {
            self.backend.destroy(previous);
        }
        Ok(())
    }

    fn release(&self) {
        if let Some(handle) = self.lock_handle().take() {
            self.backend.destroy(handle);
        }
    }

    fn is_valid(&self) -> bool {
        self.lock_handle().is_some()
    }

    fn into_dyn(self: Arc<Self>) -> Arc<dyn GraphicsResource> {
        self
    }
}
