/// Intrusive atomic reference count shared by every GPU-owned object
///
/// The count starts at zero; `ResourceRef` handles increment it on creation
/// and clone and decrement it on drop. The transition to zero happens once
/// and triggers exactly one release, chosen by the resource's `ReleasePolicy`.

use std::sync::atomic::{AtomicU32, Ordering};
use crate::memory::deferred_deleter::DeferredDeleteStrategy;

/// What happens when the last reference goes away
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleasePolicy {
    /// Destroy the platform handle on the calling thread
    Immediate,
    /// Hand the resource to the deferred deleter
    Deferred(DeferredDeleteStrategy),
}

impl Default for ReleasePolicy {
    fn default() -> Self {
        ReleasePolicy::Deferred(DeferredDeleteStrategy::SwapchainCount)
    }
}

/// Count value once the last reference went away
const RELEASED: u32 = u32::MAX;

#[derive(Debug, Default)]
pub struct RefCounter {
    count: AtomicU32,
}

impl RefCounter {
    pub const fn new() -> Self {
        Self { count: AtomicU32::new(0) }
    }

    /// Increment, returning the new count
    ///
    /// A counter whose last reference was already released cannot be revived.
    pub fn add_ref(&self) -> u32 {
        let previous = self
            .count
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |count| match count {
                RELEASED => None,
                count => count.checked_add(1).filter(|next| *next != RELEASED),
            });
        match previous {
            Ok(previous) => previous + 1,
            Err(_) => crate::rhi_fatal!("rhi::RefCounter", "Reference taken on a released resource"),
        }
    }

    /// Increment only while someone else still holds a reference
    pub fn try_add_ref(&self) -> bool {
        self.count
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |count| match count {
                0 | RELEASED => None,
                count => count.checked_add(1).filter(|next| *next != RELEASED),
            })
            .is_ok()
    }

    /// Decrement, returning `true` when this call dropped the last reference
    ///
    /// Releasing a reference nobody holds is a dangling external reference:
    /// it panics instead of clamping at zero. The last release is final.
    pub fn remove_ref(&self) -> bool {
        let previous = self
            .count
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |count| match count {
                0 | RELEASED => None,
                1 => Some(RELEASED),
                count => Some(count - 1),
            });
        match previous {
            Ok(previous) => previous == 1,
            Err(_) => crate::rhi_fatal!("rhi::RefCounter", "Reference released with a count of zero"),
        }
    }

    /// Current count, only meaningful for diagnostics
    pub fn ref_count(&self) -> u32 {
        match self.count.load(Ordering::Acquire) {
            RELEASED => 0,
            count => count,
        }
    }

    pub fn is_released(&self) -> bool {
        self.count.load(Ordering::Acquire) == RELEASED
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "ref_counter_tests.rs"]
mod tests;
