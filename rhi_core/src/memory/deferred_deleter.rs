/// Frame-delayed destruction of GPU resources
///
/// When a resource's last reference goes away while the GPU may still be
/// reading it, a `DeletionTicket` is queued here instead of destroying the
/// handle. `update()` runs once per frame boundary on the render thread and
/// consumes tickets whose delay has elapsed.
///
/// Architecture:
/// - Strategies: immediate, N frames, swapchain image count frames, wall-clock period
/// - Payload: a resource (released then dropped) or a custom deleter closure
/// - Clearing mode (shutdown): everything pending and everything deferred later is
///   destroyed immediately

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use crate::memory::memory_resource::GraphicsResource;

// ===== STRATEGY =====

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeferredDeleteStrategy {
    /// Destroy as soon as the ticket is deferred
    Immediate,
    /// Destroy after this many frame advances
    FrameCount(u32),
    /// Destroy after as many frame advances as there are swapchain images
    SwapchainCount,
    /// Destroy on the first frame advance after this much time elapsed
    TimePeriod(Duration),
}

// ===== TICKET =====

/// What a ticket destroys when consumed
pub enum DeletionPayload {
    Resource(Arc<dyn GraphicsResource>),
    Deleter(Box<dyn FnOnce() + Send>),
}

/// A pending destruction, exclusively owned by the deleter until consumed
pub struct DeletionTicket {
    name: String,
    payload: DeletionPayload,
    strategy: DeferredDeleteStrategy,
    frames_remaining: u32,
    enqueued_at: Instant,
}

impl DeletionTicket {
    pub fn for_resource(resource: Arc<dyn GraphicsResource>, strategy: DeferredDeleteStrategy) -> Self {
        Self {
            name: resource.resource_name(),
            payload: DeletionPayload::Resource(resource),
            strategy,
            frames_remaining: 0,
            enqueued_at: Instant::now(),
        }
    }

    pub fn for_deleter<F>(name: impl Into<String>, deleter: F, strategy: DeferredDeleteStrategy) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            name: name.into(),
            payload: DeletionPayload::Deleter(Box::new(deleter)),
            strategy,
            frames_remaining: 0,
            enqueued_at: Instant::now(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn strategy(&self) -> DeferredDeleteStrategy {
        self.strategy
    }

    pub fn frames_remaining(&self) -> u32 {
        self.frames_remaining
    }

    /// Advance one frame, returning `true` once the ticket is due
    fn tick(&mut self) -> bool {
        match self.strategy {
            DeferredDeleteStrategy::Immediate => true,
            DeferredDeleteStrategy::FrameCount(_) | DeferredDeleteStrategy::SwapchainCount => {
                self.frames_remaining = self.frames_remaining.saturating_sub(1);
                self.frames_remaining == 0
            }
            DeferredDeleteStrategy::TimePeriod(period) => self.enqueued_at.elapsed() >= period,
        }
    }

    /// Resources still referenced through a `ResourceRef` are not released;
    /// their own last drop does that.
    fn consume(self) {
        crate::rhi_trace!("rhi::DeferredDeleter", "Destroying '{}'", self.name);
        match self.payload {
            DeletionPayload::Resource(resource) if resource.core().ref_counter().ref_count() > 0 => {
                crate::rhi_warn!(
                    "rhi::DeferredDeleter",
                    "Dropping ticket for '{}', resource is still referenced",
                    self.name
                );
            }
            DeletionPayload::Resource(resource) => resource.release(),
            DeletionPayload::Deleter(deleter) => deleter(),
        }
    }
}

impl fmt::Debug for DeletionTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeletionTicket")
            .field("name", &self.name)
            .field("strategy", &self.strategy)
            .field("frames_remaining", &self.frames_remaining)
            .finish()
    }
}

/// Snapshot of a queued ticket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingDeletion {
    pub name: String,
    pub strategy: DeferredDeleteStrategy,
    pub frames_remaining: u32,
}

// ===== DELETER =====

pub struct DeferredDeleter {
    pending: Mutex<Vec<DeletionTicket>>,
    clearing: AtomicBool,
    swapchain_image_count: AtomicU32,
}

impl DeferredDeleter {
    pub fn new(swapchain_image_count: u32) -> Self {
        Self {
            pending: Mutex::new(Vec::new()),
            clearing: AtomicBool::new(false),
            swapchain_image_count: AtomicU32::new(swapchain_image_count.max(1)),
        }
    }

    pub fn swapchain_image_count(&self) -> u32 {
        self.swapchain_image_count.load(Ordering::Acquire)
    }

    /// Applies to tickets deferred from now on
    pub fn set_swapchain_image_count(&self, count: u32) {
        self.swapchain_image_count.store(count.max(1), Ordering::Release);
    }

    /// Queue a ticket, or consume it right away for `Immediate` or while clearing
    pub fn defer_delete(&self, mut ticket: DeletionTicket) {
        if self.clearing.load(Ordering::Acquire) || ticket.strategy == DeferredDeleteStrategy::Immediate {
            ticket.consume();
            return;
        }

        ticket.frames_remaining = match ticket.strategy {
            DeferredDeleteStrategy::FrameCount(frames) => frames,
            DeferredDeleteStrategy::SwapchainCount => self.swapchain_image_count(),
            DeferredDeleteStrategy::Immediate | DeferredDeleteStrategy::TimePeriod(_) => 0,
        };
        ticket.enqueued_at = Instant::now();

        let mut pending = self.lock_pending();
        pending.push(ticket);
    }

    /// One frame advance, returns the number of tickets consumed
    ///
    /// Consumed tickets are destroyed with the queue unlocked: releasing a
    /// resource may drop the last reference of another one, which defers
    /// into this same queue.
    pub fn update(&self) -> usize {
        let tickets = std::mem::take(&mut *self.lock_pending());
        if tickets.is_empty() {
            return 0;
        }

        let mut survivors = Vec::with_capacity(tickets.len());
        let mut due = Vec::new();
        for mut ticket in tickets {
            if ticket.tick() {
                due.push(ticket);
            } else {
                survivors.push(ticket);
            }
        }

        let consumed = due.len();
        for ticket in due {
            ticket.consume();
        }

        // Tickets deferred while consuming go after the older survivors
        let mut pending = self.lock_pending();
        let newer = std::mem::replace(&mut *pending, survivors);
        pending.extend(newer);

        if consumed > 0 {
            crate::rhi_trace!("rhi::DeferredDeleter", "Consumed {} tickets, {} pending", consumed, pending.len());
        }
        consumed
    }

    /// Enter clearing mode and destroy everything still pending
    pub fn clear(&self) {
        self.clearing.store(true, Ordering::Release);
        loop {
            let tickets = std::mem::take(&mut *self.lock_pending());
            if tickets.is_empty() {
                break;
            }
            for ticket in tickets {
                ticket.consume();
            }
        }
    }

    pub fn is_clearing(&self) -> bool {
        self.clearing.load(Ordering::Acquire)
    }

    pub fn pending_count(&self) -> usize {
        self.lock_pending().len()
    }

    pub fn pending_tickets(&self) -> Vec<PendingDeletion> {
        self.lock_pending()
            .iter()
            .map(|ticket| PendingDeletion {
                name: ticket.name.clone(),
                strategy: ticket.strategy,
                frames_remaining: ticket.frames_remaining,
            })
            .collect()
    }

    fn lock_pending(&self) -> std::sync::MutexGuard<'_, Vec<DeletionTicket>> {
        // A panic inside a deleter closure must not wedge every later frame
        self.pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for DeferredDeleter {
    fn drop(&mut self) {
        self.clear();
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "deferred_deleter_tests.rs"]
mod tests;
