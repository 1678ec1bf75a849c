// SPDX-License-Identifier: LGPL-3.0-only
pub mod clock;
pub mod icon;
pub mod settings;
pub mod tasks;

// Re-export commonly used types from the icon cache
pub use icon::{IconCache, IconCacheBuilder, IconDescriptor, IconHandle, IconResource};
pub use settings::CacheSettings;
