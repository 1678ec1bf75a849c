// SPDX-License-Identifier: LGPL-3.0-only
//! Zoom levels and icon size stepping for file views.

/// Canonical icon sizes, smallest first.
pub const ICON_SIZES: [u32; 7] = [16, 24, 32, 48, 72, 96, 192];

/// Emblems never shrink below this.
pub const EMBLEM_SIZE_MIN: u32 = 16;

/// Zoom levels of a file view.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ZoomLevel {
    Smallest,
    Smaller,
    Small,
    #[default]
    Standard,
    Large,
    Larger,
    Largest,
}

impl ZoomLevel {
    /// Every level, smallest first.
    pub const ALL: [ZoomLevel; 7] = [
        Self::Smallest,
        Self::Smaller,
        Self::Small,
        Self::Standard,
        Self::Large,
        Self::Larger,
        Self::Largest,
    ];

    /// Icon size in pixels for this level.
    pub fn icon_size(self) -> u32 {
        ICON_SIZES[self as usize]
    }

    /// One step larger, saturating.
    pub fn zoom_in(self) -> Self {
        Self::ALL[(self as usize + 1).min(Self::ALL.len() - 1)]
    }

    /// One step smaller, saturating.
    pub fn zoom_out(self) -> Self {
        Self::ALL[(self as usize).saturating_sub(1)]
    }
}

/// Icon size in pixels for `level`.
pub fn icon_size_for_zoom_level(level: ZoomLevel) -> u32 {
    level.icon_size()
}

/// The largest level whose icons are not bigger than `size`, or the smallest
/// level when `size` is below every level.
pub fn zoom_level_for_icon_size(size: u32) -> ZoomLevel {
    ZoomLevel::ALL
        .iter()
        .rev()
        .copied()
        .find(|level| level.icon_size() <= size)
        .unwrap_or(ZoomLevel::Smallest)
}

/// Next canonical size above `size`, or the largest size.
pub fn larger_icon_size(size: u32) -> u32 {
    ICON_SIZES
        .iter()
        .copied()
        .find(|&s| s > size)
        .unwrap_or(ICON_SIZES[ICON_SIZES.len() - 1])
}

/// Next canonical size below `size`, or the smallest size.
pub fn smaller_icon_size(size: u32) -> u32 {
    ICON_SIZES
        .iter()
        .rev()
        .copied()
        .find(|&s| s < size)
        .unwrap_or(ICON_SIZES[0])
}

/// Size of emblems drawn over an icon of `size`.
pub fn emblem_size_for_icon_size(size: u32) -> u32 {
    match size {
        s if s >= 96 => 48,
        s if s >= 64 => 32,
        s if s >= 48 => 24,
        s if s >= 24 => EMBLEM_SIZE_MIN,
        _ => 0,
    }
}
