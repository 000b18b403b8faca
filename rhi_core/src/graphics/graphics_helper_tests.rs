use super::*;
use crate::graphics::mock_backend::MockBackend;
use crate::graphics::types::{PixelFormat, SampleCount};
use crate::rendering::framebuffer_format::{FramebufferFormat, RenderPassFormat};
use std::sync::atomic::AtomicUsize;
use std::sync::Mutex;

fn setup() -> (Arc<MockBackend>, Arc<GraphicsHelper>) {
    let backend = Arc::new(MockBackend::new());
    let helper = GraphicsHelper::new(backend.clone(), RenderConfig::default());
    (backend, helper)
}

fn small_buffer(name: &str, policy: Option<ReleasePolicy>) -> BufferCreateInfo {
    BufferCreateInfo {
        name: name.to_string(),
        stride: 16,
        count: 16,
        release_policy: policy,
        ..Default::default()
    }
}

// ============================================================================
// Configuration tests
// ============================================================================

#[test]
fn test_default_config() {
    let config = RenderConfig::default();
    assert_eq!(config.swapchain_image_count, 3);
    assert_eq!(
        config.default_release_policy,
        ReleasePolicy::Deferred(DeferredDeleteStrategy::SwapchainCount)
    );
}

// ============================================================================
// Release tests
// ============================================================================

#[test]
fn test_last_release_creates_exactly_one_ticket() {
    let (backend, helper) = setup();
    let buffer = helper.create_buffer(small_buffer("Shared", None)).unwrap();
    let second = buffer.clone();
    assert_eq!(buffer.ref_count(), 2);

    drop(second);
    assert!(buffer.is_valid());
    assert_eq!(helper.deleter().pending_count(), 0);

    drop(buffer);
    let pending = helper.deleter().pending_tickets();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].name, "Shared");
    assert_eq!(pending[0].strategy, DeferredDeleteStrategy::SwapchainCount);
    assert_eq!(backend.live_count(), 1);
}

#[test]
fn test_swapchain_delay_follows_config() {
    let backend = Arc::new(MockBackend::new());
    let helper = GraphicsHelper::new(
        backend.clone(),
        RenderConfig { swapchain_image_count: 2, ..Default::default() },
    );
    drop(helper.create_buffer(small_buffer("Uniforms", None)).unwrap());

    helper.end_frame();
    assert_eq!(backend.live_count(), 1);
    helper.end_frame();
    assert_eq!(backend.live_count(), 0);
}

#[test]
fn test_deferred_release_destroys_once() {
    let (backend, helper) = setup();
    let buffer = helper.create_buffer(small_buffer("Retired", None)).unwrap();
    let retired = Arc::clone(buffer.as_arc());

    drop(buffer);
    assert!(retired.core().ref_counter().is_released());
    for _ in 0..5 {
        helper.end_frame();
    }

    assert_eq!(backend.live_count(), 0);
    assert_eq!(backend.destroyed().len(), 1);
    assert_eq!(helper.deleter().pending_count(), 0);
}

#[test]
fn test_immediate_policy_skips_the_queue() {
    let (backend, helper) = setup();
    let buffer = helper.create_buffer(small_buffer("Staging", Some(ReleasePolicy::Immediate))).unwrap();

    drop(buffer);

    assert_eq!(helper.deleter().pending_count(), 0);
    assert_eq!(backend.live_count(), 0);
}

#[test]
fn test_custom_deleter_is_frame_delayed() {
    let (_backend, helper) = setup();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);

    helper.mark_deleter_for_deletion(
        "Pool",
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
        },
        DeferredDeleteStrategy::FrameCount(1),
    );
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    helper.end_frame();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_sampler_and_sync_objects() {
    let (backend, helper) = setup();

    let sampler = helper.create_sampler(SamplerCreateInfo::default()).unwrap();
    let fence = helper.create_sync_object("FrameFence", SyncKind::Fence).unwrap();

    assert!(sampler.is_valid());
    assert_eq!(fence.kind(), SyncKind::Fence);
    assert_eq!(backend.live_count(), 2);

    drop(sampler);
    drop(fence);
    helper.shutdown();
    assert_eq!(backend.live_count(), 0);
}

// ============================================================================
// Command tests
// ============================================================================

#[test]
fn test_commands_run_in_order_at_end_frame() {
    let (_backend, helper) = setup();
    let order = Arc::new(Mutex::new(Vec::new()));

    for name in ["first", "second"] {
        let order = Arc::clone(&order);
        helper.enqueue_command(name, move |_| order.lock().unwrap().push(name));
    }
    assert!(order.lock().unwrap().is_empty());

    helper.end_frame();

    assert_eq!(*order.lock().unwrap(), vec!["first", "second"]);
    assert_eq!(helper.frame_index(), 1);
}

#[test]
fn test_command_queued_during_flush_runs_next_frame() {
    let (_backend, helper) = setup();
    let runs = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&runs);
    helper.enqueue_command("Outer", move |helper| {
        let counter = Arc::clone(&counter);
        helper.enqueue_command("Inner", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
    });

    helper.end_frame();
    assert_eq!(runs.load(Ordering::SeqCst), 0);
    assert_eq!(helper.command_queue().pending_names(), vec!["Inner".to_string()]);

    helper.end_frame();
    assert_eq!(runs.load(Ordering::SeqCst), 1);
}

#[test]
fn test_reinit_runs_before_deleter_advance() {
    let (backend, helper) = setup();
    let buffer = helper.create_buffer(small_buffer("Resized", None)).unwrap();

    buffer.set_buffer_count(32);
    drop(buffer);
    assert_eq!(helper.deleter().pending_count(), 0);

    // The command rebuilds the buffer, then drops the last reference and the
    // resulting ticket gets its first frame advance in the same end_frame
    helper.end_frame();
    let pending = helper.deleter().pending_tickets();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].frames_remaining, 2);
    assert_eq!(backend.live_count(), 1);
}

// ============================================================================
// Render pass tests
// ============================================================================

#[test]
fn test_render_pass_cache_returns_same_object() {
    let (backend, helper) = setup();
    let props = GenericRenderPassProperties {
        attachment_format: FramebufferFormat::generic(vec![PixelFormat::R8G8B8A8_UNORM, PixelFormat::D32_FLOAT]),
        ..Default::default()
    };

    let first = helper.render_pass(&props, &RenderPassAdditionalProps::default()).unwrap();
    let second = helper.render_pass(&props.clone(), &RenderPassAdditionalProps::default()).unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(helper.render_pass_count(), 1);
    assert_eq!(backend.render_pass_count(), 1);
}

#[test]
fn test_render_pass_key_includes_every_property() {
    let (_backend, helper) = setup();
    let base = GenericRenderPassProperties {
        attachment_format: FramebufferFormat::named(RenderPassFormat::Multibuffer),
        ..Default::default()
    };
    let multisampled = GenericRenderPassProperties { multisample_count: SampleCount::S4, ..base.clone() };
    let shared_rt = GenericRenderPassProperties { one_rt_per_format: false, ..base.clone() };

    let additional = RenderPassAdditionalProps::default();
    helper.render_pass(&base, &additional).unwrap();
    helper.render_pass(&multisampled, &additional).unwrap();
    helper.render_pass(&shared_rt, &additional).unwrap();

    assert_eq!(helper.render_pass_count(), 3);
}

#[test]
fn test_shutdown_destroys_render_passes() {
    let (backend, helper) = setup();
    helper
        .render_pass(&GenericRenderPassProperties::default(), &RenderPassAdditionalProps::default())
        .unwrap();

    helper.shutdown();

    assert!(helper.is_shut_down());
    assert_eq!(helper.render_pass_count(), 0);
    assert_eq!(backend.live_count(), 0);
}

#[test]
fn test_shutdown_drops_pending_commands() {
    let (backend, helper) = setup();
    let buffer = helper.create_buffer(small_buffer("Abandoned", None)).unwrap();
    buffer.set_buffer_count(4);
    drop(buffer);

    helper.shutdown();

    assert_eq!(helper.command_queue().pending_count(), 0);
    assert_eq!(backend.live_count(), 0);
}
