// SPDX-License-Identifier: LGPL-3.0-only
//! A cached render and its ownership tracking.

use std::cell::Cell;
use std::time::{Duration, Instant};

use super::handle::{IconHandle, ReleaseHook, RenderedImage, SharedImage};

/// One memoized icon render.
///
/// `sole_owner` is true exactly when no handle to the render is outstanding.
/// It flips to false on the first hand-out and back to true when the release
/// observation fires. Once evicted, the entry is no longer observed and
/// ownership is read from the handle count instead.
pub struct CacheEntry {
    image: Option<SharedImage>,
    sole_owner: Cell<bool>,
    evicted: Cell<bool>,
    last_use_time: Cell<Instant>,
    origin_scale: u32,
    is_fallback: bool,
}

impl CacheEntry {
    pub(crate) fn new(
        image: Option<RenderedImage>,
        origin_scale: u32,
        is_fallback: bool,
        now: Instant,
    ) -> Self {
        Self {
            image: image.map(SharedImage::new),
            sole_owner: Cell::new(true),
            evicted: Cell::new(false),
            last_use_time: Cell::new(now),
            origin_scale,
            is_fallback,
        }
    }

    /// Whether the cache holds the only reference to the render.
    pub fn is_sole_owner(&self) -> bool {
        if self.evicted.get() {
            return self.outstanding() == 0;
        }
        self.sole_owner.get()
    }

    /// Whether the cache has dropped this entry. Evicted entries still hand
    /// out their pixels but are never tracked or reaped again.
    pub fn is_evicted(&self) -> bool {
        self.evicted.get()
    }

    /// When the render was created or last returned by its holders.
    pub fn last_use_time(&self) -> Instant {
        self.last_use_time.get()
    }

    /// Scale the render was requested at.
    pub fn origin_scale(&self) -> u32 {
        self.origin_scale
    }

    /// False when resolving failed and acquiring yields the default icon.
    pub fn has_image(&self) -> bool {
        self.image.is_some()
    }

    /// Whether the render is a substitute for the requested icon.
    pub fn is_fallback(&self) -> bool {
        self.is_fallback || self.image.is_none()
    }

    /// The cached pixels, without handing them out.
    pub fn image(&self) -> Option<&RenderedImage> {
        self.image.as_ref().map(SharedImage::image)
    }

    /// Number of handles to this render currently held by callers.
    pub fn outstanding(&self) -> usize {
        self.image.as_ref().map_or(0, SharedImage::outstanding)
    }

    /// Hand the render out. The first hand-out after the entry was sole-owned
    /// attaches the hook built by `on_release`.
    pub(crate) fn acquire(
        &self,
        default: &SharedImage,
        on_release: impl FnOnce() -> ReleaseHook,
    ) -> IconHandle {
        let Some(image) = &self.image else {
            return default.hand_out();
        };

        let handle = image.hand_out();
        if self.sole_owner.get() && !self.evicted.get() {
            image.observe(on_release());
            self.sole_owner.set(false);
        }
        handle
    }

    /// Record that the last outstanding handle was dropped.
    ///
    /// # Panics
    ///
    /// Panics if the entry was already sole-owned.
    pub(crate) fn released(&self, now: Instant) {
        assert!(
            !self.sole_owner.get(),
            "CacheEntry: release notified for an entry that was not handed out"
        );
        self.sole_owner.set(true);
        self.last_use_time.set(now);
    }

    /// Sole-owned and untouched for longer than `max_age`.
    pub(crate) fn is_expired(&self, now: Instant, max_age: Duration) -> bool {
        self.sole_owner.get() && now.saturating_duration_since(self.last_use_time.get()) > max_age
    }

    /// Cut the entry loose from the cache. Outstanding handles stay valid,
    /// but dropping them no longer notifies anyone.
    pub(crate) fn evict(&self) {
        self.evicted.set(true);
        if let Some(image) = &self.image {
            if image.detach() {
                log::trace!(
                    "CacheEntry: evicted with {} outstanding handle(s)",
                    image.outstanding()
                );
            }
        }
    }
}

impl Drop for CacheEntry {
    fn drop(&mut self) {
        // The hook must never run against an entry that is going away.
        self.evict();
    }
}
