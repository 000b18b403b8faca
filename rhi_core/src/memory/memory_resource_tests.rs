use super::*;
use crate::memory::deferred_deleter::DeferredDeleteStrategy;
use std::sync::atomic::AtomicUsize;

// ============================================================================
// Helpers
// ============================================================================

#[derive(Default)]
struct Counters {
    reinits: AtomicUsize,
    releases: AtomicUsize,
}

struct TestResource {
    core: ResourceCore,
    counters: Arc<Counters>,
}

fn detached_resource(name: &str, policy: ReleasePolicy) -> (ResourceRef<TestResource>, Arc<Counters>) {
    let counters = Arc::new(Counters::default());
    let resource = Arc::new(TestResource {
        core: ResourceCore::detached(name, policy),
        counters: Arc::clone(&counters),
    });
    let weak: Weak<dyn GraphicsResource> = Arc::downgrade(&resource) as Weak<dyn GraphicsResource>;
    resource.core().bind_self(weak);
    (ResourceRef::from_arc(resource), counters)
}

impl GraphicsResource for TestResource {
    fn core(&self) -> &ResourceCore {
        &self.core
    }

    fn reinit_resources(&self) -> Result<()> {
        self.counters.reinits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn release(&self) {
        self.counters.releases.fetch_add(1, Ordering::SeqCst);
    }

    fn is_valid(&self) -> bool {
        self.counters.releases.load(Ordering::SeqCst) == 0
    }

    fn into_dyn(self: Arc<Self>) -> Arc<dyn GraphicsResource> {
        self
    }
}

// ============================================================================
// Reference counting tests
// ============================================================================

#[test]
fn test_from_arc_takes_one_reference() {
    let (resource, _) = detached_resource("Vertices", ReleasePolicy::Immediate);
    assert_eq!(resource.ref_count(), 1);
}

#[test]
fn test_clone_and_drop_balance() {
    let (resource, counters) = detached_resource("Vertices", ReleasePolicy::Immediate);

    let second = resource.clone();
    assert_eq!(resource.ref_count(), 2);
    assert!(ResourceRef::ptr_eq(&resource, &second));

    drop(second);
    assert_eq!(resource.ref_count(), 1);
    assert_eq!(counters.releases.load(Ordering::SeqCst), 0);
}

#[test]
fn test_last_drop_releases_immediate_resource_once() {
    let (resource, counters) = detached_resource("Indices", ReleasePolicy::Immediate);
    let second = resource.clone();

    drop(resource);
    assert_eq!(counters.releases.load(Ordering::SeqCst), 0);
    drop(second);
    assert_eq!(counters.releases.load(Ordering::SeqCst), 1);
}

#[test]
fn test_deferred_without_helper_releases_immediately() {
    let (resource, counters) = detached_resource(
        "Orphan",
        ReleasePolicy::Deferred(DeferredDeleteStrategy::FrameCount(3)),
    );

    drop(resource);
    assert_eq!(counters.releases.load(Ordering::SeqCst), 1);
}

#[test]
fn test_last_release_is_final() {
    let (resource, counters) = detached_resource("Staging", ReleasePolicy::Immediate);
    let arc = Arc::clone(resource.as_arc());

    drop(resource);

    assert!(arc.core().ref_counter().is_released());
    assert_eq!(arc.core().ref_counter().ref_count(), 0);
    assert_eq!(counters.releases.load(Ordering::SeqCst), 1);
}

#[test]
#[should_panic(expected = "released resource")]
fn test_reference_after_last_release_is_fatal() {
    let (resource, _) = detached_resource("Staging", ReleasePolicy::Immediate);
    let arc = Arc::clone(resource.as_arc());
    drop(resource);

    let _revived = ResourceRef::from_arc(arc);
}

#[test]
fn test_into_dyn_keeps_count() {
    let (resource, counters) = detached_resource("Erased", ReleasePolicy::Immediate);
    let keep = resource.clone();

    let erased: MemoryResourceRef = resource.into_dyn();
    assert_eq!(erased.ref_count(), 2);
    assert_eq!(erased.resource_name(), "Erased");

    drop(erased);
    drop(keep);
    assert_eq!(counters.releases.load(Ordering::SeqCst), 1);
}

// ============================================================================
// Initialization tests
// ============================================================================

#[test]
fn test_init_runs_first_reinit() {
    let (resource, counters) = detached_resource("Texture", ReleasePolicy::Immediate);

    resource.init().unwrap();

    assert!(resource.core().is_initialized());
    assert_eq!(counters.reinits.load(Ordering::SeqCst), 1);
}

#[test]
#[should_panic(expected = "initialized twice")]
fn test_double_init_is_fatal() {
    let (resource, _) = detached_resource("Texture", ReleasePolicy::Immediate);
    resource.init().unwrap();
    let _ = resource.init();
}

#[test]
fn test_rename() {
    let (resource, _) = detached_resource("Before", ReleasePolicy::Immediate);
    resource.set_resource_name("After");
    assert_eq!(resource.resource_name(), "After");
}

// ============================================================================
// Dirty tracking tests
// ============================================================================

#[test]
fn test_mark_dirty_without_helper_reinits_synchronously() {
    let (resource, counters) = detached_resource("Dirty", ReleasePolicy::Immediate);
    resource.init().unwrap();

    resource.core().mark_dirty();

    assert!(!resource.core().is_dirty());
    assert_eq!(counters.reinits.load(Ordering::SeqCst), 2);
    assert_eq!(resource.ref_count(), 1);
}

#[test]
fn test_mark_dirty_without_self_link_is_ignored() {
    let core = ResourceCore::detached("Unbound", ReleasePolicy::Immediate);
    core.mark_dirty();
    assert!(!core.is_dirty());
}

#[test]
fn test_mark_dirty_on_unowned_resource_is_ignored() {
    let counters = Arc::new(Counters::default());
    let resource = Arc::new(TestResource {
        core: ResourceCore::detached("Unowned", ReleasePolicy::Immediate),
        counters: Arc::clone(&counters),
    });
    let weak: Weak<dyn GraphicsResource> = Arc::downgrade(&resource) as Weak<dyn GraphicsResource>;
    resource.core().bind_self(weak);

    resource.core().mark_dirty();

    assert!(!resource.core().is_dirty());
    assert_eq!(resource.core().ref_counter().ref_count(), 0);
    assert_eq!(counters.reinits.load(Ordering::SeqCst), 0);
}

#[test]
fn test_mark_dirty_after_release_is_ignored() {
    let (resource, counters) = detached_resource("Retired", ReleasePolicy::Immediate);
    resource.init().unwrap();
    let arc = Arc::clone(resource.as_arc());
    drop(resource);

    arc.core().mark_dirty();

    assert!(!arc.core().is_dirty());
    assert!(arc.core().ref_counter().is_released());
    assert_eq!(counters.reinits.load(Ordering::SeqCst), 1);
    assert_eq!(counters.releases.load(Ordering::SeqCst), 1);
}
