// SPDX-License-Identifier: LGPL-3.0-only
//! Icon render cache.
//!
//! [`IconCache`] memoizes rendered icons per (descriptor, size, scale) and
//! hands out [`IconHandle`]s to them. The cache is never told when a caller is
//! done with a handle; instead each render carries a release observation that
//! fires when its last handle is dropped. From then on the render is sole-owned
//! again and a periodic [reaper](reaper) evicts it once it has been idle for the
//! configured eviction age.
//!
//! Everything here is single-threaded: entries, handles and the reaper's timer
//! all live on the event loop thread.

mod entry;
mod error;
mod fallback;
mod handle;
mod key;
mod loader;
mod lookup;
pub mod reaper;
mod resolver;
pub mod sizes;
mod store;
mod theme;

pub use entry::CacheEntry;
pub use error::IconError;
pub use fallback::{default_icon, DEFAULT_ICON_HEIGHT, DEFAULT_ICON_WIDTH};
pub use handle::{IconHandle, RenderedImage};
pub use key::{CacheKey, IconDescriptor, IconResource, NameKey, StreamKey};
pub use loader::{load_raster, ImageDecoder};
pub use lookup::{default_search_paths, IconLookup};
pub use reaper::{ReaperState, SweepReport};
pub use resolver::{StreamDecoder, ThemeResolver, XdgThemeResolver};
pub use theme::{DirectoryType, IconDirectory, IconTheme};

use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::time::Duration;

use crate::clock::{Clock, MonotonicClock};
use crate::settings::CacheSettings;
use crate::tasks::{LocalScheduler, Scheduler, Tick, TimerDriver};
use handle::SharedImage;
use reaper::Reaper;
use store::{Renderers, Store};

struct CacheInner {
    store: RefCell<Store>,
    reaper: Reaper,
    local_scheduler: Option<Rc<LocalScheduler>>,
    clock: Rc<dyn Clock>,
    theme: Box<dyn ThemeResolver>,
    decoder: Box<dyn StreamDecoder>,
    fallback_name: String,
    default_image: SharedImage,
}

impl CacheInner {
    /// Only queues a timer; safe to call from a handle's drop.
    fn schedule_reaper(self: &Rc<Self>) {
        let inner = Rc::downgrade(self);
        self.reaper.ensure_scheduled(move |generation| -> Tick {
            let timer = ReaperTimer { inner, generation };
            Box::new(move || timer.tick())
        });
    }

    /// One reaper tick. Timer ticks pass their generation so that a timer
    /// orphaned by an earlier idle transition stops itself.
    fn tick(&self, generation: u64) -> bool {
        if !self.reaper.is_current(generation) {
            return false;
        }
        let report = self.sweep();
        self.reaper.finish_sweep(&report)
    }

    fn sweep(&self) -> SweepReport {
        let now = self.clock.now();
        let report = self.reaper.sweep(&mut self.store.borrow_mut(), now);
        if report.evicted > 0 {
            log::debug!(
                "IconCache: Evicted {} unused icon(s), {} waiting to expire",
                report.evicted,
                report.pending
            );
        }
        report
    }

    fn release_hook(self: &Rc<Self>, entry: &Rc<CacheEntry>) -> Box<dyn FnOnce()> {
        let inner: Weak<Self> = Rc::downgrade(self);
        let entry: Weak<CacheEntry> = Rc::downgrade(entry);
        Box::new(move || {
            let (Some(inner), Some(entry)) = (inner.upgrade(), entry.upgrade()) else {
                return;
            };
            entry.released(inner.clock.now());
            inner.schedule_reaper();
        })
    }
}

/// The reaper's hold on a scheduled sweep. If the scheduler drops it before
/// the sweep ends itself, the reaper goes back to Idle.
struct ReaperTimer {
    inner: Weak<CacheInner>,
    generation: u64,
}

impl ReaperTimer {
    fn tick(&self) -> bool {
        match self.inner.upgrade() {
            Some(inner) => inner.tick(self.generation),
            None => false,
        }
    }
}

impl Drop for ReaperTimer {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.reaper.timer_lost(self.generation);
        }
    }
}

/// Memoizing cache of rendered icons.
///
/// Lookups never fail: names the theme cannot resolve get the fallback icon,
/// undecodable resources get the built-in default icon.
///
/// # Example
///
/// ```no_run
/// use npicons_services::icon::{IconCache, IconDescriptor};
/// use npicons_services::settings::CacheSettings;
///
/// let cache = IconCache::new(CacheSettings::default());
/// let local = tokio::task::LocalSet::new();
/// if let Some(driver) = cache.reaper_driver() {
///     local.spawn_local(driver.run());
/// }
///
/// let rt = tokio::runtime::Builder::new_current_thread().enable_time().build().unwrap();
/// local.block_on(&rt, async {
///     let icon = cache.get_icon(&IconDescriptor::name("folder"), 48, 1);
///     println!("{}x{}", icon.width(), icon.height());
/// });
/// ```
pub struct IconCache {
    inner: Rc<CacheInner>,
}

impl IconCache {
    /// Cache resolving names in the configured XDG theme, decoding resources
    /// with the `image` crate, and reaping through a [`LocalScheduler`] whose
    /// driver is taken with [`IconCache::reaper_driver`].
    pub fn new(settings: CacheSettings) -> Self {
        Self::builder(settings).build()
    }

    /// Start configuring a cache with custom collaborators.
    pub fn builder(settings: CacheSettings) -> IconCacheBuilder {
        IconCacheBuilder {
            settings,
            theme: None,
            decoder: None,
            scheduler: None,
            clock: None,
        }
    }

    /// Find or render the entry for `descriptor` at `size` and `scale`,
    /// without handing out its pixels.
    pub fn lookup(&self, descriptor: &IconDescriptor, size: u32, scale: u32) -> Rc<CacheEntry> {
        let key = CacheKey::new(descriptor, size, scale);
        if let Some(entry) = self.inner.store.borrow().get(&key) {
            return entry;
        }

        let renderers = Renderers {
            theme: self.inner.theme.as_ref(),
            decoder: self.inner.decoder.as_ref(),
            fallback_name: &self.inner.fallback_name,
        };
        let rendered = Rc::new(renderers.render(&key, self.inner.clock.now()));
        let entry = self.inner.store.borrow_mut().insert(key, rendered);
        self.inner.schedule_reaper();
        entry
    }

    /// Hand out the pixels of `entry`. Entries without a render of their own
    /// yield the built-in default icon.
    pub fn acquire(&self, entry: &Rc<CacheEntry>) -> IconHandle {
        entry.acquire(&self.inner.default_image, || {
            self.inner.release_hook(entry)
        })
    }

    /// Look up and acquire in one step.
    pub fn get_icon(&self, descriptor: &IconDescriptor, size: u32, scale: u32) -> IconHandle {
        let entry = self.lookup(descriptor, size, scale);
        self.acquire(&entry)
    }

    /// [`IconCache::get_icon`] for a themed name.
    pub fn get_named_icon(&self, name: &str, size: u32, scale: u32) -> IconHandle {
        self.get_icon(&IconDescriptor::name(name), size, scale)
    }

    /// [`IconCache::get_icon`] for a loadable resource.
    pub fn get_stream_icon(&self, resource: IconResource, size: u32, scale: u32) -> IconHandle {
        self.get_icon(&IconDescriptor::Stream(resource), size, scale)
    }

    /// Drop every cached render, e.g. after an icon theme change. Handles
    /// already given out stay valid.
    pub fn clear(&self) {
        let removed = self.inner.store.borrow_mut().clear();
        log::debug!("IconCache: Cleared {} icon(s)", removed);
    }

    /// Resolve names in `theme` from now on and drop every cached render.
    /// If the theme cannot be loaded the cache is left untouched.
    pub fn set_theme(&self, theme: &str) -> Result<(), IconError> {
        self.inner.theme.theme_changed(theme)?;
        log::info!("IconCache: Switched icon theme to '{}'", theme);
        self.clear();
        Ok(())
    }

    /// Run one reaper sweep now, outside the timer.
    pub fn reap_now(&self) -> SweepReport {
        let report = self.inner.sweep();
        if self.inner.reaper.state() == ReaperState::Scheduled {
            self.inner.reaper.finish_sweep(&report);
        }
        report
    }

    /// The task running reaper ticks, when the cache uses the built-in
    /// [`LocalScheduler`]. Spawn it on the `LocalSet` the cache lives on.
    ///
    /// Taking the driver again after its `LocalSet` went away starts a fresh
    /// one; the reaper reschedules on it with the next insertion or release.
    pub fn reaper_driver(&self) -> Option<TimerDriver> {
        self.inner
            .local_scheduler
            .as_ref()
            .map(|scheduler| scheduler.driver())
    }

    /// Whether a periodic sweep is scheduled.
    pub fn reaper_state(&self) -> ReaperState {
        self.inner.reaper.state()
    }

    /// How long a sole-owned render survives untouched.
    pub fn eviction_age(&self) -> Duration {
        self.inner.reaper.eviction_age()
    }

    /// Number of cached renders.
    pub fn len(&self) -> usize {
        self.inner.store.borrow().len()
    }

    /// Whether nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of cached stream-decoded renders.
    pub fn stream_len(&self) -> usize {
        self.inner.store.borrow().stream_len()
    }

    /// Number of cached theme-resolved renders.
    pub fn named_len(&self) -> usize {
        self.inner.store.borrow().named_len()
    }
}

/// Builder for [`IconCache`].
pub struct IconCacheBuilder {
    settings: CacheSettings,
    theme: Option<Box<dyn ThemeResolver>>,
    decoder: Option<Box<dyn StreamDecoder>>,
    scheduler: Option<Rc<dyn Scheduler>>,
    clock: Option<Rc<dyn Clock>>,
}

impl IconCacheBuilder {
    /// Resolve themed names with `theme`.
    pub fn theme_resolver(mut self, theme: impl ThemeResolver + 'static) -> Self {
        self.theme = Some(Box::new(theme));
        self
    }

    /// Decode resources with `decoder`.
    pub fn stream_decoder(mut self, decoder: impl StreamDecoder + 'static) -> Self {
        self.decoder = Some(Box::new(decoder));
        self
    }

    /// Run reaper ticks on `scheduler`.
    pub fn scheduler(mut self, scheduler: Rc<dyn Scheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    /// Read time from `clock`.
    pub fn clock(mut self, clock: Rc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Finish the cache. Unset collaborators default to the configured XDG
    /// theme, the `image` decoder, a [`LocalScheduler`] and the monotonic clock.
    pub fn build(self) -> IconCache {
        let settings = self.settings;
        let theme = self.theme.unwrap_or_else(|| {
            let resolver = if settings.search_paths.is_empty() {
                XdgThemeResolver::new(settings.theme_name.as_str())
            } else {
                XdgThemeResolver::with_search_paths(
                    settings.theme_name.as_str(),
                    settings.search_paths.clone(),
                )
            };
            if let Err(e) = resolver.check_theme() {
                log::warn!("IconCache: {}, names resolve through hicolor only", e);
            }
            Box::new(resolver)
        });
        let (scheduler, local_scheduler) = match self.scheduler {
            Some(scheduler) => (scheduler, None),
            None => {
                let local = Rc::new(LocalScheduler::new());
                (local.clone() as Rc<dyn Scheduler>, Some(local))
            },
        };

        IconCache {
            inner: Rc::new(CacheInner {
                store: RefCell::new(Store::new()),
                reaper: Reaper::new(scheduler, settings.reap_interval, settings.eviction_age),
                local_scheduler,
                clock: self.clock.unwrap_or_else(|| Rc::new(MonotonicClock)),
                theme,
                decoder: self.decoder.unwrap_or_else(|| Box::new(ImageDecoder)),
                fallback_name: settings.fallback_icon_name,
                default_image: SharedImage::new(default_icon()),
            }),
        }
    }
}
