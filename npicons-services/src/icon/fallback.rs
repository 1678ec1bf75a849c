// SPDX-License-Identifier: LGPL-3.0-only
//! Built-in default icon, used whenever a cached entry has no render of its own.

use super::handle::RenderedImage;

/// Width of the default icon in pixels.
pub const DEFAULT_ICON_WIDTH: u32 = 16;
/// Height of the default icon in pixels.
pub const DEFAULT_ICON_HEIGHT: u32 = 16;

const DEFAULT_ICON_LEN: usize = (DEFAULT_ICON_WIDTH * DEFAULT_ICON_HEIGHT * 4) as usize;

static DEFAULT_ICON_PIXELS: [u8; DEFAULT_ICON_LEN] = build_default_icon();

/// Grey checkered tile with a dark one pixel frame.
const fn build_default_icon() -> [u8; DEFAULT_ICON_LEN] {
    let mut pixels = [0u8; DEFAULT_ICON_LEN];
    let mut y = 0;
    while y < DEFAULT_ICON_HEIGHT {
        let mut x = 0;
        while x < DEFAULT_ICON_WIDTH {
            let i = ((y * DEFAULT_ICON_WIDTH + x) * 4) as usize;
            let frame = x == 0 || y == 0 || x == DEFAULT_ICON_WIDTH - 1 || y == DEFAULT_ICON_HEIGHT - 1;
            let (r, g, b) = if frame {
                (0x5e, 0x5c, 0x64)
            } else if (x / 4 + y / 4) % 2 == 0 {
                (0xde, 0xdd, 0xda)
            } else {
                (0xc0, 0xbf, 0xbc)
            };
            pixels[i] = r;
            pixels[i + 1] = g;
            pixels[i + 2] = b;
            pixels[i + 3] = 0xff;
            x += 1;
        }
        y += 1;
    }
    pixels
}

/// The embedded default icon.
pub fn default_icon() -> RenderedImage {
    RenderedImage::new(
        DEFAULT_ICON_PIXELS.to_vec(),
        DEFAULT_ICON_WIDTH,
        DEFAULT_ICON_HEIGHT,
    )
}
