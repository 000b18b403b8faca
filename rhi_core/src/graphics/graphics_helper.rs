/// GraphicsHelper - owner of the backend and of everything frame-paced
///
/// Creates resources, receives them back when their last reference goes away,
/// runs queued render-thread commands, and advances the deferred deleter once
/// per frame. Resources hold a `Weak` link back to the helper, so dropping
/// the helper never waits on live resources.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use crate::error::Result;
use crate::graphics::backend::GraphicsBackend;
use crate::graphics::command_queue::RenderCommandQueue;
use crate::memory::buffer_resource::{BufferCreateInfo, BufferResource};
use crate::memory::deferred_deleter::{DeferredDeleteStrategy, DeferredDeleter, DeletionTicket};
use crate::memory::image_resource::{ImageCreateInfo, ImageResource};
use crate::memory::memory_resource::{GraphicsResource, ResourceRef};
use crate::memory::ref_counter::ReleasePolicy;
use crate::memory::sampler_resource::{SamplerCreateInfo, SamplerResource};
use crate::memory::sync_resource::{SyncKind, SyncResource};
use crate::rendering::framebuffer::Framebuffer;
use crate::rendering::framebuffer_format::{GenericRenderPassProperties, RenderPassAdditionalProps};
use crate::rendering::render_pass_cache::{CompatibilityCache, RenderPass};

// ===== CONFIGURATION =====

/// Frame pacing and release defaults
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderConfig {
    /// Number of swapchain images, the delay used by `SwapchainCount` tickets
    pub swapchain_image_count: u32,
    /// Policy for resources whose creation info does not choose one
    pub default_release_policy: ReleasePolicy,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            swapchain_image_count: 3,
            default_release_policy: ReleasePolicy::default(),
        }
    }
}

type RenderPassKey = (GenericRenderPassProperties, RenderPassAdditionalProps);

// ===== HELPER =====

pub struct GraphicsHelper {
    self_ref: Weak<GraphicsHelper>,
    backend: Arc<dyn GraphicsBackend>,
    config: RenderConfig,
    deleter: DeferredDeleter,
    commands: RenderCommandQueue,
    render_passes: CompatibilityCache<RenderPassKey, RenderPass>,
    frame_index: AtomicU64,
    shut_down: AtomicBool,
}

impl GraphicsHelper {
    pub fn new(backend: Arc<dyn GraphicsBackend>, config: RenderConfig) -> Arc<Self> {
        crate::rhi_info!(
            "rhi::GraphicsHelper",
            "Creating graphics helper ({} swapchain images)",
            config.swapchain_image_count
        );
        Arc::new_cyclic(|self_ref| Self {
            self_ref: self_ref.clone(),
            backend,
            config,
            deleter: DeferredDeleter::new(config.swapchain_image_count),
            commands: RenderCommandQueue::new(),
            render_passes: CompatibilityCache::new(),
            frame_index: AtomicU64::new(0),
            shut_down: AtomicBool::new(false),
        })
    }

    pub fn backend(&self) -> &Arc<dyn GraphicsBackend> {
        &self.backend
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn deleter(&self) -> &DeferredDeleter {
        &self.deleter
    }

    pub fn command_queue(&self) -> &RenderCommandQueue {
        &self.commands
    }

    /// Number of completed `end_frame()` calls
    pub fn frame_index(&self) -> u64 {
        self.frame_index.load(Ordering::Acquire)
    }

    pub fn set_swapchain_image_count(&self, count: u32) {
        self.deleter.set_swapchain_image_count(count);
    }

    // ===== RESOURCE FACTORIES =====

    pub fn create_buffer(&self, info: BufferCreateInfo) -> Result<ResourceRef<BufferResource>> {
        let policy = info.release_policy.unwrap_or(self.config.default_release_policy);
        let buffer = BufferResource::new(info, policy, Arc::clone(&self.backend), self.self_ref.clone());
        self.adopt(buffer)
    }

    pub fn create_image(&self, info: ImageCreateInfo) -> Result<ResourceRef<ImageResource>> {
        let policy = info.release_policy.unwrap_or(self.config.default_release_policy);
        let image = ImageResource::new(info, policy, Arc::clone(&self.backend), self.self_ref.clone());
        self.adopt(image)
    }

    pub fn create_sampler(&self, info: SamplerCreateInfo) -> Result<ResourceRef<SamplerResource>> {
        let policy = info.release_policy.unwrap_or(self.config.default_release_policy);
        let sampler = SamplerResource::new(info, policy, Arc::clone(&self.backend), self.self_ref.clone());
        self.adopt(sampler)
    }

    pub fn create_sync_object(&self, name: &str, kind: SyncKind) -> Result<ResourceRef<SyncResource>> {
        let sync = SyncResource::new(
            name,
            kind,
            self.config.default_release_policy,
            Arc::clone(&self.backend),
            self.self_ref.clone(),
        );
        self.adopt(sync)
    }

    /// Link, take the first reference and initialize
    ///
    /// On failure the reference is dropped again, which releases whatever
    /// was partially created through the resource's policy.
    fn adopt<R: GraphicsResource>(&self, resource: R) -> Result<ResourceRef<R>> {
        let resource = Arc::new(resource);
        let weak: Weak<dyn GraphicsResource> = Arc::downgrade(&resource) as Weak<dyn GraphicsResource>;
        resource.core().bind_self(weak);

        let resource = ResourceRef::from_arc(resource);
        resource.init()?;
        Ok(resource)
    }

    // ===== DELETION =====

    /// Receive a resource whose last reference went away
    pub fn mark_for_deletion(&self, resource: Arc<dyn GraphicsResource>, strategy: DeferredDeleteStrategy) {
        self.deleter.defer_delete(DeletionTicket::for_resource(resource, strategy));
    }

    /// Defer an arbitrary destruction closure
    pub fn mark_deleter_for_deletion<F>(&self, name: impl Into<String>, deleter: F, strategy: DeferredDeleteStrategy)
    where
        F: FnOnce() + Send + 'static,
    {
        self.deleter.defer_delete(DeletionTicket::for_deleter(name, deleter, strategy));
    }

    // ===== COMMANDS =====

    pub fn enqueue_command<F>(&self, name: impl Into<String>, command: F)
    where
        F: FnOnce(&GraphicsHelper) + Send + 'static,
    {
        self.commands.enqueue_command(name, Box::new(command));
    }

    /// Frame boundary: run queued commands, then advance the deleter once
    pub fn end_frame(&self) {
        let commands = self.commands.flush(self);
        let consumed = self.deleter.update();
        let frame = self.frame_index.fetch_add(1, Ordering::AcqRel) + 1;
        if commands > 0 || consumed > 0 {
            crate::rhi_trace!(
                "rhi::GraphicsHelper",
                "Frame {} ended: {} commands run, {} resources destroyed",
                frame,
                commands,
                consumed
            );
        }
    }

    // ===== RENDER PASSES =====

    /// Render pass compatible with `props`, created once per distinct key
    pub fn render_pass(
        &self,
        props: &GenericRenderPassProperties,
        additional: &RenderPassAdditionalProps,
    ) -> Result<Arc<RenderPass>> {
        let key = (props.clone(), *additional);
        self.render_passes.get_or_create(&key, || {
            let handle = self.backend.create_render_pass(props, additional)?;
            crate::rhi_debug!(
                "rhi::GraphicsHelper",
                "Created render pass for {:?} ({} samples)",
                props.attachment_format.rp_format(),
                props.multisample_count.count()
            );
            Ok(RenderPass::new(handle, props.clone(), *additional))
        })
    }

    pub fn framebuffer_render_pass(
        &self,
        framebuffer: &Framebuffer,
        additional: &RenderPassAdditionalProps,
    ) -> Result<Arc<RenderPass>> {
        self.render_pass(&framebuffer.render_pass_props(), additional)
    }

    pub fn render_pass_count(&self) -> usize {
        self.render_passes.len()
    }

    // ===== SHUTDOWN =====

    /// Drop pending commands and destroy everything still owned
    ///
    /// Later releases are destroyed immediately. Safe to call twice.
    pub fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::AcqRel) {
            return;
        }

        let dropped = self.commands.clear();
        for (_, render_pass) in self.render_passes.drain() {
            let backend = Arc::clone(&self.backend);
            let handle = render_pass.handle();
            self.mark_deleter_for_deletion(
                "RenderPass",
                move || backend.destroy(handle),
                DeferredDeleteStrategy::SwapchainCount,
            );
        }
        self.deleter.clear();

        crate::rhi_info!("rhi::GraphicsHelper", "Graphics helper shut down ({} pending commands dropped)", dropped);
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::Acquire)
    }
}

impl Drop for GraphicsHelper {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "graphics_helper_tests.rs"]
mod tests;
