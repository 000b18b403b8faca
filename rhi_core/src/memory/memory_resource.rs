/// Shared-ownership GPU resources
///
/// Every GPU-owned object (buffer, image, sampler, sync primitive) implements
/// `GraphicsResource` and embeds a `ResourceCore` carrying its name, intrusive
/// reference count, release policy and dirty state.
///
/// `ResourceRef` is the owning handle: cloning adds a reference, dropping removes
/// one, and the drop that releases the last reference applies the resource's
/// `ReleasePolicy` (destroy now, or hand the resource to the deferred deleter).

use std::fmt;
use std::ops::Deref;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock, RwLock, Weak};
use crate::error::Result;
use crate::graphics::graphics_helper::GraphicsHelper;
use crate::memory::ref_counter::{RefCounter, ReleasePolicy};

// ============================================================================
// GraphicsResource trait
// ============================================================================

/// A GPU-owned object with a platform handle that must be torn down explicitly
pub trait GraphicsResource: Send + Sync + 'static {
    /// Shared lifetime state
    fn core(&self) -> &ResourceCore;

    /// (Re)create the platform objects from the current logical description
    ///
    /// Called once by `init()` and again by the render-thread command queued
    /// from `ResourceCore::mark_dirty()`.
    fn reinit_resources(&self) -> Result<()>;

    /// Destroy the platform objects, leaving the logical description intact
    fn release(&self);

    /// Whether the platform objects currently exist
    fn is_valid(&self) -> bool;

    /// Size of the GPU allocation in bytes
    fn resource_size(&self) -> u64 {
        0
    }

    /// Upcast used when the last reference hands the resource to the deleter
    fn into_dyn(self: Arc<Self>) -> Arc<dyn GraphicsResource>;

    /// First initialization, initializing twice is a programming error
    fn init(&self) -> Result<()> {
        self.core().mark_initialized();
        self.reinit_resources()
    }

    fn resource_name(&self) -> String {
        self.core().name()
    }

    fn set_resource_name(&self, name: &str) {
        self.core().set_name(name);
    }
}

// ============================================================================
// ResourceCore
// ============================================================================

/// Lifetime state embedded in every resource
pub struct ResourceCore {
    name: RwLock<String>,
    ref_counter: RefCounter,
    release_policy: ReleasePolicy,
    initialized: AtomicBool,
    dirty: AtomicBool,
    helper: Weak<GraphicsHelper>,
    self_ref: OnceLock<Weak<dyn GraphicsResource>>,
}

impl ResourceCore {
    pub fn new(name: impl Into<String>, release_policy: ReleasePolicy, helper: Weak<GraphicsHelper>) -> Self {
        Self {
            name: RwLock::new(name.into()),
            ref_counter: RefCounter::new(),
            release_policy,
            initialized: AtomicBool::new(false),
            dirty: AtomicBool::new(false),
            helper,
            self_ref: OnceLock::new(),
        }
    }

    /// Core of a resource that lives outside any graphics helper
    ///
    /// Deferred releases degrade to immediate ones and dirty resources are
    /// re-initialized synchronously.
    pub fn detached(name: impl Into<String>, release_policy: ReleasePolicy) -> Self {
        Self::new(name, release_policy, Weak::new())
    }

    pub fn name(&self) -> String {
        match self.name.read() {
            Ok(name) => name.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn set_name(&self, name: &str) {
        let mut guard = match self.name.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = name.to_string();
    }

    pub fn ref_counter(&self) -> &RefCounter {
        &self.ref_counter
    }

    pub fn release_policy(&self) -> ReleasePolicy {
        self.release_policy
    }

    pub fn helper(&self) -> Option<Arc<GraphicsHelper>> {
        self.helper.upgrade()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    pub fn mark_initialized(&self) {
        if self.initialized.swap(true, Ordering::AcqRel) {
            crate::rhi_fatal!("rhi::GraphicsResource", "Resource '{}' initialized twice", self.name());
        }
    }

    /// Link the core back to the resource that embeds it
    ///
    /// Needed by `mark_dirty()` to keep the resource alive in the queued
    /// re-init command. Set once by the factory, later calls are ignored.
    pub fn bind_self(&self, resource: Weak<dyn GraphicsResource>) {
        let _ = self.self_ref.set(resource);
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    /// Schedule a re-initialization on the render thread
    ///
    /// Only the first call between two re-inits queues a command. The command
    /// holds a reference to the resource until it runs.
    pub fn mark_dirty(&self) {
        if self.dirty.swap(true, Ordering::AcqRel) {
            return;
        }

        let resource = match self.self_ref.get().and_then(Weak::upgrade).and_then(ResourceRef::try_from_arc) {
            Some(resource) => resource,
            None => {
                // Not owned through a ResourceRef, nothing can re-init it later
                self.dirty.store(false, Ordering::Release);
                return;
            }
        };

        match self.helper() {
            Some(helper) => {
                let command_name = format!("Reinit<{}>", self.name());
                helper.enqueue_command(command_name, move |_| {
                    resource.core().dirty.store(false, Ordering::Release);
                    if let Err(err) = resource.reinit_resources() {
                        crate::rhi_error!(
                            "rhi::GraphicsResource",
                            "Re-initializing '{}' failed: {}",
                            resource.resource_name(),
                            err
                        );
                    }
                });
            }
            None => {
                self.dirty.store(false, Ordering::Release);
                if let Err(err) = resource.reinit_resources() {
                    crate::rhi_error!("rhi::GraphicsResource", "Re-initializing '{}' failed: {}", self.name(), err);
                }
            }
        }
    }
}

impl fmt::Debug for ResourceCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceCore")
            .field("name", &self.name())
            .field("ref_count", &self.ref_counter.ref_count())
            .field("release_policy", &self.release_policy)
            .field("initialized", &self.is_initialized())
            .field("dirty", &self.is_dirty())
            .finish()
    }
}

// ============================================================================
// ResourceRef
// ============================================================================

/// Owning handle to a resource
///
/// Each live `ResourceRef` accounts for exactly one reference in the
/// resource's `RefCounter`.
pub struct ResourceRef<R: GraphicsResource + ?Sized> {
    inner: Arc<R>,
}

/// Type-erased resource handle
pub type MemoryResourceRef = ResourceRef<dyn GraphicsResource>;

impl<R: GraphicsResource + ?Sized> ResourceRef<R> {
    /// Take a new reference on a resource
    ///
    /// Panics if the resource's last reference was already released.
    pub fn from_arc(resource: Arc<R>) -> Self {
        resource.core().ref_counter().add_ref();
        Self { inner: resource }
    }

    /// Take a reference only if the resource is currently owned
    pub(crate) fn try_from_arc(resource: Arc<R>) -> Option<Self> {
        match resource.core().ref_counter().try_add_ref() {
            true => Some(Self { inner: resource }),
            false => None,
        }
    }

    /// Advisory, racy under concurrent clones and drops
    pub fn ref_count(&self) -> u32 {
        self.inner.core().ref_counter().ref_count()
    }

    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&a.inner), Arc::as_ptr(&b.inner))
    }

    /// Borrow the underlying `Arc` without taking a counted reference
    pub fn as_arc(&self) -> &Arc<R> {
        &self.inner
    }

    /// Convert into a type-erased handle, keeping the count unchanged overall
    pub fn into_dyn(self) -> MemoryResourceRef {
        let erased = ResourceRef::from_arc(Arc::clone(&self.inner).into_dyn());
        drop(self);
        erased
    }
}

impl<R: GraphicsResource + ?Sized> Clone for ResourceRef<R> {
    fn clone(&self) -> Self {
        Self::from_arc(Arc::clone(&self.inner))
    }
}

impl<R: GraphicsResource + ?Sized> Deref for ResourceRef<R> {
    type Target = R;

    fn deref(&self) -> &R {
        &self.inner
    }
}

impl<R: GraphicsResource + ?Sized> Drop for ResourceRef<R> {
    fn drop(&mut self) {
        let core = self.inner.core();
        if !core.ref_counter().remove_ref() {
            return;
        }

        match core.release_policy() {
            ReleasePolicy::Immediate => self.inner.release(),
            ReleasePolicy::Deferred(strategy) => match core.helper() {
                Some(helper) => helper.mark_for_deletion(Arc::clone(&self.inner).into_dyn(), strategy),
                None => self.inner.release(),
            },
        }
    }
}

impl<R: GraphicsResource + ?Sized> fmt::Debug for ResourceRef<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceRef")
            .field("name", &self.inner.resource_name())
            .field("ref_count", &self.ref_count())
            .field("valid", &self.inner.is_valid())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "memory_resource_tests.rs"]
mod tests;
