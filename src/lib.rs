// SPDX-License-Identifier: LGPL-3.0-only
#![warn(missing_docs)]

//! Rendered icon caching for file browsers.
//!
//! Icons are looked up by theme name or by loadable resource, rendered once per
//! size and scale, and shared between every view that shows them. Renders no
//! view holds anymore are evicted after a short idle period.

pub use npicons_services as services;

/// A "prelude" for users of the icon cache.
///
/// ```rust
/// use npicons::prelude::*;
/// ```
pub mod prelude {
    pub use crate::services::clock::{Clock, ManualClock, MonotonicClock};
    pub use crate::services::icon::sizes::{
        icon_size_for_zoom_level, larger_icon_size, smaller_icon_size, zoom_level_for_icon_size,
        ZoomLevel,
    };
    pub use crate::services::icon::{
        CacheEntry, IconCache, IconCacheBuilder, IconDescriptor, IconError, IconHandle,
        IconResource, ReaperState, RenderedImage, StreamDecoder, ThemeResolver,
    };
    pub use crate::services::settings::CacheSettings;
    pub use crate::services::tasks::{
        LocalScheduler, ManualScheduler, Scheduler, TaskError, TimerDriver,
    };
}
