/// Lookup-or-create cache for compatibility-keyed GPU objects
///
/// Equal keys always resolve to the same `Arc`; the creation closure runs at
/// most once per distinct key. The lock is held across creation so two
/// threads racing on one key never create duplicates.

use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard};
use rustc_hash::FxHashMap;
use crate::error::Result;
use crate::graphics::backend::RawHandle;
use crate::rendering::framebuffer_format::{GenericRenderPassProperties, RenderPassAdditionalProps};

pub struct CompatibilityCache<K, V> {
    entries: Mutex<FxHashMap<K, Arc<V>>>,
}

impl<K: Eq + Hash + Clone, V> CompatibilityCache<K, V> {
    pub fn new() -> Self {
        Self { entries: Mutex::new(FxHashMap::default()) }
    }

    /// Cached value for `key`, or the result of `create` stored under it
    ///
    /// A failed creation stores nothing.
    pub fn get_or_create<F>(&self, key: &K, create: F) -> Result<Arc<V>>
    where
        F: FnOnce() -> Result<V>,
    {
        let mut entries = self.lock_entries();
        if let Some(value) = entries.get(key) {
            return Ok(Arc::clone(value));
        }

        let value = Arc::new(create()?);
        entries.insert(key.clone(), Arc::clone(&value));
        Ok(value)
    }

    pub fn get(&self, key: &K) -> Option<Arc<V>> {
        self.lock_entries().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock_entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock_entries().is_empty()
    }

    /// Remove every entry, handing them to the caller for destruction
    pub fn drain(&self) -> Vec<(K, Arc<V>)> {
        self.lock_entries().drain().collect()
    }

    fn lock_entries(&self) -> MutexGuard<'_, FxHashMap<K, Arc<V>>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<K: Eq + Hash + Clone, V> Default for CompatibilityCache<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

/// A backend render pass and the key it was created for
#[derive(Debug)]
pub struct RenderPass {
    handle: RawHandle,
    props: GenericRenderPassProperties,
    additional: RenderPassAdditionalProps,
}

impl RenderPass {
    pub fn new(handle: RawHandle, props: GenericRenderPassProperties, additional: RenderPassAdditionalProps) -> Self {
        Self { handle, props, additional }
    }

    pub fn handle(&self) -> RawHandle {
        self.handle
    }

    pub fn props(&self) -> &GenericRenderPassProperties {
        &self.props
    }

    pub fn additional_props(&self) -> &RenderPassAdditionalProps {
        &self.additional
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "render_pass_cache_tests.rs"]
mod tests;
