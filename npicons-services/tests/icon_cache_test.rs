use npicons_services::clock::{Clock, ManualClock};
use npicons_services::icon::{
    IconCache, IconDescriptor, IconError, IconHandle, IconResource, ReaperState, RenderedImage,
    DEFAULT_ICON_WIDTH,
};
use npicons_services::settings::CacheSettings;
use npicons_services::tasks::ManualScheduler;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

fn solid(px: u32) -> RenderedImage {
    RenderedImage::new(vec![0x80; (px * px * 4) as usize], px, px)
}

struct Harness {
    cache: IconCache,
    clock: Rc<ManualClock>,
    scheduler: Rc<ManualScheduler>,
    resolved: Rc<RefCell<Vec<(String, u32, u32)>>>,
    decoded: Rc<Cell<usize>>,
}

/// Cache whose theme knows every name except "missing" and whose decoder
/// rejects empty byte resources.
fn harness() -> Harness {
    harness_with(CacheSettings::default())
}

fn harness_with(settings: CacheSettings) -> Harness {
    let clock = Rc::new(ManualClock::new());
    let scheduler = Rc::new(ManualScheduler::new());
    let resolved = Rc::new(RefCell::new(Vec::new()));
    let decoded = Rc::new(Cell::new(0));

    let resolve_log = resolved.clone();
    let decode_count = decoded.clone();
    let cache = IconCache::builder(settings)
        .theme_resolver(
            move |name: &str, size: u32, scale: u32| -> Result<RenderedImage, IconError> {
                resolve_log.borrow_mut().push((name.to_string(), size, scale));
                match name {
                    "missing" => Err(IconError::IconNotFound(name.to_string())),
                    _ => Ok(solid(size * scale)),
                }
            },
        )
        .stream_decoder(
            move |resource: &IconResource, width: u32, height: u32| -> Result<RenderedImage, IconError> {
                decode_count.set(decode_count.get() + 1);
                match resource {
                    IconResource::Bytes(data) if data.is_empty() => {
                        Err(IconError::InvalidFormat("empty".to_string()))
                    },
                    _ => Ok(RenderedImage::new(
                        vec![0; (width * height * 4) as usize],
                        width,
                        height,
                    )),
                }
            },
        )
        .scheduler(scheduler.clone())
        .clock(clock.clone())
        .build();

    Harness {
        cache,
        clock,
        scheduler,
        resolved,
        decoded,
    }
}

fn past_eviction(h: &Harness) -> Duration {
    h.cache.eviction_age() + Duration::from_secs(1)
}

#[test]
fn test_lookup_is_memoized() {
    let h = harness();
    let folder = IconDescriptor::name("folder");

    let first = h.cache.get_icon(&folder, 16, 1);
    let second = h.cache.get_icon(&folder, 16, 1);

    assert!(IconHandle::ptr_eq(&first, &second));
    assert_eq!(h.resolved.borrow().len(), 1);
    assert_eq!(h.cache.len(), 1);
}

#[test]
fn test_scenario_a_evict_and_rerender() {
    let h = harness();
    let a = IconDescriptor::name("folder");

    let e1 = h.cache.lookup(&a, 16, 1);
    assert!(e1.is_sole_owner());

    let icon = h.cache.acquire(&e1);
    assert!(!e1.is_sole_owner());

    h.clock.advance(Duration::from_secs(3));
    drop(icon);
    assert!(e1.is_sole_owner());
    assert_eq!(e1.last_use_time(), h.clock.now());

    h.clock.advance(past_eviction(&h));
    h.scheduler.fire();
    assert!(h.cache.is_empty());

    let e2 = h.cache.lookup(&a, 16, 1);
    assert!(!Rc::ptr_eq(&e1, &e2));
    assert_eq!(h.resolved.borrow().len(), 2);
}

#[test]
fn test_scenario_b_unknown_name_gets_fallback() {
    let h = harness();

    let entry = h.cache.lookup(&IconDescriptor::name("missing"), 32, 2);
    let icon = h.cache.acquire(&entry);

    assert!(entry.is_fallback());
    assert!(entry.has_image());
    assert_eq!(icon.width(), 64);
    assert_eq!(
        h.resolved.borrow().last().map(|(name, _, _)| name.clone()),
        Some("application-x-generic".to_string())
    );
}

#[test]
fn test_unresolvable_fallback_uses_default_icon() {
    let mut settings = CacheSettings::default();
    settings.fallback_icon_name = "missing".to_string();
    let h = harness_with(settings);

    let entry = h.cache.lookup(&IconDescriptor::name("missing"), 48, 1);
    let icon = h.cache.acquire(&entry);

    assert!(!entry.has_image());
    assert!(entry.is_sole_owner());
    assert_eq!(icon.width(), DEFAULT_ICON_WIDTH);
    assert_eq!(h.resolved.borrow().len(), 2);
}

#[test]
fn test_scenario_c_clear_while_displayed() {
    let h = harness();
    let a = IconDescriptor::name("folder");

    let shown = h.cache.get_icon(&a, 16, 1);
    h.cache.clear();
    assert!(h.cache.is_empty());
    assert_eq!(shown.width(), 16);

    let fresh = h.cache.lookup(&a, 16, 1);
    assert_eq!(h.resolved.borrow().len(), 2);
    assert!(fresh.is_sole_owner());

    drop(shown);
    assert!(fresh.is_sole_owner());
    assert_eq!(h.cache.len(), 1);
}

#[test]
fn test_single_release_for_many_handles() {
    let h = harness();
    let entry = h.cache.lookup(&IconDescriptor::name("folder"), 16, 1);

    let handles: Vec<IconHandle> = (0..3).map(|_| h.cache.acquire(&entry)).collect();
    let extra = handles[0].clone();
    assert_eq!(entry.outstanding(), 4);

    drop(handles);
    assert!(!entry.is_sole_owner());
    drop(extra);
    assert!(entry.is_sole_owner());
    assert_eq!(entry.outstanding(), 0);
}

#[test]
fn test_recently_released_entry_survives() {
    let h = harness();
    let entry = h.cache.lookup(&IconDescriptor::name("folder"), 16, 1);

    h.clock.advance(Duration::from_secs(20));
    drop(h.cache.acquire(&entry));

    h.clock.advance(Duration::from_secs(15));
    h.scheduler.fire();
    assert_eq!(h.cache.len(), 1);

    h.clock.advance(Duration::from_secs(16));
    h.scheduler.fire();
    assert!(h.cache.is_empty());
}

#[test]
fn test_held_entry_is_never_reaped() {
    let h = harness();
    let held = h.cache.get_named_icon("folder", 16, 1);

    h.clock.advance(past_eviction(&h) * 10);
    h.scheduler.fire();

    assert_eq!(h.cache.len(), 1);
    assert_eq!(held.width(), 16);
}

#[test]
fn test_reaper_goes_idle_and_wakes_on_release() {
    let h = harness();
    assert_eq!(h.cache.reaper_state(), ReaperState::Idle);

    let held = h.cache.get_named_icon("folder", 16, 1);
    h.cache.lookup(&IconDescriptor::name("unused"), 16, 1);
    assert_eq!(h.cache.reaper_state(), ReaperState::Scheduled);
    assert_eq!(h.scheduler.pending(), 1);

    h.clock.advance(past_eviction(&h));
    assert_eq!(h.scheduler.fire(), 0);
    assert_eq!(h.cache.len(), 1);
    assert_eq!(h.cache.reaper_state(), ReaperState::Idle);
    assert!(h.scheduler.is_idle());

    drop(held);
    assert_eq!(h.cache.reaper_state(), ReaperState::Scheduled);
    assert_eq!(h.scheduler.pending(), 1);
}

#[test]
fn test_reap_now_does_not_duplicate_timers() {
    let h = harness();
    h.cache.lookup(&IconDescriptor::name("folder"), 16, 1);

    h.clock.advance(past_eviction(&h));
    let report = h.cache.reap_now();
    assert_eq!(report.evicted, 1);
    assert_eq!(h.cache.reaper_state(), ReaperState::Idle);

    // The orphaned timer stops itself, the new one takes over.
    h.cache.lookup(&IconDescriptor::name("folder"), 16, 1);
    assert_eq!(h.scheduler.pending(), 2);
    assert_eq!(h.scheduler.fire(), 1);
}

#[test]
fn test_stream_keys_fold_scale() {
    let h = harness();
    let resource = IconResource::file("/icons/thumbnail.png");

    let hidpi = h.cache.get_stream_icon(resource.clone(), 16, 2);
    let plain = h.cache.get_stream_icon(resource, 32, 1);

    assert!(IconHandle::ptr_eq(&hidpi, &plain));
    assert_eq!(h.cache.stream_len(), 1);
    assert_eq!(h.decoded.get(), 1);
    assert_eq!(hidpi.width(), 32);
}

#[test]
fn test_name_keys_keep_scale() {
    let h = harness();

    h.cache.get_named_icon("folder", 16, 2);
    h.cache.get_named_icon("folder", 32, 1);

    assert_eq!(h.cache.named_len(), 2);
    assert_eq!(h.cache.stream_len(), 0);
    let entry = h.cache.lookup(&IconDescriptor::name("folder"), 16, 2);
    assert_eq!(entry.origin_scale(), 2);
}

#[test]
fn test_stream_and_name_never_share() {
    let h = harness();
    h.cache.get_icon(&IconDescriptor::file("folder"), 16, 1);
    h.cache.get_icon(&IconDescriptor::name("folder"), 16, 1);
    assert_eq!(h.cache.stream_len(), 1);
    assert_eq!(h.cache.named_len(), 1);
}

#[test]
fn test_undecodable_stream_hands_out_default() {
    let h = harness();
    let entry = h.cache.lookup(&IconDescriptor::Stream(IconResource::bytes(Vec::<u8>::new())), 48, 1);

    let icon = h.cache.acquire(&entry);
    assert!(!entry.has_image());
    assert!(entry.is_sole_owner());
    assert_eq!(icon.width(), DEFAULT_ICON_WIDTH);

    // Absent renders are reaped like any other sole-owned entry.
    h.clock.advance(past_eviction(&h));
    h.scheduler.fire();
    assert!(h.cache.is_empty());
}

#[test]
fn test_entry_kept_across_clear_is_detached() {
    let h = harness();
    let entry = h.cache.lookup(&IconDescriptor::name("folder"), 16, 1);
    let shown = h.cache.acquire(&entry);

    h.cache.clear();
    assert!(entry.is_evicted());
    assert!(!entry.is_sole_owner());

    drop(shown);
    assert!(entry.is_sole_owner());

    // Still usable, but no longer tracked by the cache.
    let again = h.cache.acquire(&entry);
    assert_eq!(again.width(), 16);
    assert_eq!(entry.outstanding(), 1);
    assert!(!entry.is_sole_owner());
    drop(again);
    assert!(entry.is_sole_owner());
    assert!(h.cache.is_empty());
}

#[test]
fn test_entry_kept_across_reap_is_detached() {
    let h = harness();
    let entry = h.cache.lookup(&IconDescriptor::name("folder"), 16, 1);

    h.clock.advance(past_eviction(&h));
    h.scheduler.fire();
    assert!(h.cache.is_empty());
    assert!(entry.is_evicted());
    assert_eq!(h.cache.reaper_state(), ReaperState::Idle);

    let icon = h.cache.acquire(&entry);
    drop(icon);
    assert!(entry.is_sole_owner());
    // Releasing a detached entry does not wake the reaper.
    assert_eq!(h.cache.reaper_state(), ReaperState::Idle);
    assert!(h.scheduler.is_idle());
}

#[test]
fn test_cancelled_timer_returns_reaper_to_idle() {
    let h = harness();
    let held = h.cache.get_named_icon("folder", 16, 1);
    assert_eq!(h.cache.reaper_state(), ReaperState::Scheduled);

    h.scheduler.cancel_all();
    assert_eq!(h.cache.reaper_state(), ReaperState::Idle);

    drop(held);
    assert_eq!(h.cache.reaper_state(), ReaperState::Scheduled);
    h.clock.advance(past_eviction(&h));
    h.scheduler.fire();
    assert!(h.cache.is_empty());
}
