/// Synchronization primitives (semaphores and fences)

use std::sync::{Arc, Mutex, MutexGuard, Weak};
use crate::error::Result;
use crate::graphics::backend::{GraphicsBackend, RawHandle};
use crate::graphics::graphics_helper::GraphicsHelper;
use crate::memory::memory_resource::{GraphicsResource, ResourceCore};
use crate::memory::ref_counter::ReleasePolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncKind {
    /// GPU to GPU
    Semaphore,
    /// GPU to GPU or CPU with a monotonically increasing value
    TimelineSemaphore,
    /// GPU to CPU
    Fence,
}

pub struct SyncResource {
    core: ResourceCore,
    backend: Arc<dyn GraphicsBackend>,
    kind: SyncKind,
    handle: Mutex<Option<RawHandle>>,
}

impl SyncResource {
    pub(crate) fn new(
        name: &str,
        kind: SyncKind,
        release_policy: ReleasePolicy,
        backend: Arc<dyn GraphicsBackend>,
        helper: Weak<GraphicsHelper>,
    ) -> Self {
        Self {
            core: ResourceCore::new(name, release_policy, helper),
            backend,
            kind,
            handle: Mutex::new(None),
        }
    }

    pub fn kind(&self) -> SyncKind {
        self.kind
    }

    pub fn handle(&self) -> Option<RawHandle> {
        *self.lock_handle()
    }

    fn lock_handle(&self) -> MutexGuard<'_, Option<RawHandle>> {
        self.handle.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl GraphicsResource for SyncResource {
    fn core(&self) -> &ResourceCore {
        &self.core
    }

    fn reinit_resources(&self) -> Result<()> {
        let handle = self.backend.create_sync_object(self.kind).map_err(|err| {
            crate::rhi_error!("rhi::SyncResource", "Failed creating {:?} '{}': {}", self.kind, self.core.name(), err);
            err
        })?;

        if let Some(previous) = self.lock_handle().replace(handle) {
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
