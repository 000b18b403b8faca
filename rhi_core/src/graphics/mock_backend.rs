/// Mock backend for unit tests (no GPU required)
///
/// Hands out increasing handles, remembers which are alive, records every
/// descriptor it was given and can be told to fail allocations.

#[cfg(test)]
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
#[cfg(test)]
use std::sync::Mutex;
#[cfg(test)]
use rustc_hash::FxHashSet;

#[cfg(test)]
use crate::error::{Error, Result};
#[cfg(test)]
use crate::graphics::backend::{BufferDesc, GraphicsBackend, ImageDesc, RawHandle};
#[cfg(test)]
use crate::graphics::types::{ImageViewType, PixelFormat};
#[cfg(test)]
use crate::memory::buffer_resource::BufferViewInfo;
#[cfg(test)]
use crate::memory::image_resource::ImageViewInfo;
#[cfg(test)]
use crate::memory::sampler_resource::SamplerCreateInfo;
#[cfg(test)]
use crate::memory::sync_resource::SyncKind;
#[cfg(test)]
use crate::rendering::framebuffer_format::{GenericRenderPassProperties, RenderPassAdditionalProps};

#[cfg(test)]
#[derive(Default)]
pub struct MockBackend {
    next_handle: AtomicU64,
    live: Mutex<FxHashSet<RawHandle>>,
    destroyed: Mutex<Vec<RawHandle>>,
    buffers: Mutex<Vec<BufferDesc>>,
    images: Mutex<Vec<ImageDesc>>,
    render_passes: Mutex<Vec<GenericRenderPassProperties>>,
    fail_allocations: AtomicBool,
}

#[cfg(test)]
impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following create call fail with `OutOfMemory`
    pub fn set_fail_allocations(&self, fail: bool) {
        self.fail_allocations.store(fail, Ordering::SeqCst);
    }

    pub fn live_count(&self) -> usize {
        self.live.lock().unwrap().len()
    }

    pub fn is_live(&self, handle: RawHandle) -> bool {
        self.live.lock().unwrap().contains(&handle)
    }

    pub fn destroyed(&self) -> Vec<RawHandle> {
        self.destroyed.lock().unwrap().clone()
    }

    pub fn buffer_descs(&self) -> Vec<BufferDesc> {
        self.buffers.lock().unwrap().clone()
    }

    pub fn image_descs(&self) -> Vec<ImageDesc> {
        self.images.lock().unwrap().clone()
    }

    pub fn render_pass_count(&self) -> usize {
        self.render_passes.lock().unwrap().len()
    }

    fn allocate(&self) -> Result<RawHandle> {
        if self.fail_allocations.load(Ordering::SeqCst) {
            return Err(Error::OutOfMemory);
        }
        let handle = RawHandle(self.next_handle.fetch_add(1, Ordering::SeqCst) + 1);
        self.live.lock().unwrap().insert(handle);
        Ok(handle)
    }
}

#[cfg(test)]
impl GraphicsBackend for MockBackend {
    fn create_buffer(&self, desc: &BufferDesc) -> Result<RawHandle> {
        let handle = self.allocate()?;
        self.buffers.lock().unwrap().push(desc.clone());
        Ok(handle)
    }

    fn create_buffer_view(&self, _buffer: RawHandle, _format: PixelFormat, _view: &BufferViewInfo) -> Result<RawHandle> {
        self.allocate()
    }

    fn create_image(&self, desc: &ImageDesc) -> Result<RawHandle> {
        let handle = self.allocate()?;
        self.images.lock().unwrap().push(desc.clone());
        Ok(handle)
    }

    fn create_image_view(
        &self,
        _image: RawHandle,
        _view_type: ImageViewType,
        _format: PixelFormat,
        _view: &ImageViewInfo,
    ) -> Result<RawHandle> {
        self.allocate()
    }

    fn create_sampler(&self, _info: &SamplerCreateInfo) -> Result<RawHandle> {
        self.allocate()
    }

    fn create_sync_object(&self, _kind: SyncKind) -> Result<RawHandle> {
        self.allocate()
    }

    fn create_render_pass(
        &self,
        props: &GenericRenderPassProperties,
        _additional: &RenderPassAdditionalProps,
    ) -> Result<RawHandle> {
        let handle = self.allocate()?;
        self.render_passes.lock().unwrap().push(props.clone());
        Ok(handle)
    }

    fn destroy(&self, handle: RawHandle) {
        let removed = self.live.lock().unwrap().remove(&handle);
        assert!(removed, "destroying unknown or already destroyed handle {:?}", handle);
        self.destroyed.lock().unwrap().push(handle);
    }
}
