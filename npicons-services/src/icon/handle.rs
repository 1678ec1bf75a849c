// SPDX-License-Identifier: LGPL-3.0-only
//! Rendered icon pixels and the reference-counted pointer the cache hands out.
//!
//! The cache keeps one [`SharedImage`] per entry and gives callers
//! [`IconHandle`]s pointing at the same allocation. A release observation can be
//! attached to a `SharedImage`; it fires exactly once, when the last handle
//! goes away and only the cache's own hold remains.

use std::cell::RefCell;
use std::fmt;
use std::ops::Deref;
use std::rc::Rc;

use image::imageops::FilterType;
use image::DynamicImage;

/// Decoded RGBA8 icon pixels.
#[derive(Clone, PartialEq, Eq)]
pub struct RenderedImage {
    data: Vec<u8>,
    width: u32,
    height: u32,
}

impl RenderedImage {
    /// Create an image from raw RGBA8 bytes.
    ///
    /// # Panics
    ///
    /// Panics if `data` is not exactly `width * height * 4` bytes long.
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Self {
        assert_eq!(
            data.len(),
            width as usize * height as usize * 4,
            "RenderedImage: pixel buffer does not match {}x{}",
            width,
            height
        );
        Self {
            data,
            width,
            height,
        }
    }

    /// Convert a decoded image, scaling it to exactly `width`x`height` when the
    /// source has a different size.
    pub fn from_dynamic(img: DynamicImage, width: u32, height: u32) -> Self {
        let img = if img.width() != width || img.height() != height {
            img.resize_exact(width.max(1), height.max(1), FilterType::Triangle)
        } else {
            img
        };
        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();
        Self {
            data: rgba.into_raw(),
            width,
            height,
        }
    }

    /// Raw RGBA pixel data.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Image width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Image height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }
}

impl fmt::Debug for RenderedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderedImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.data.len())
            .finish()
    }
}

/// Hook run when a handed-out image returns to the cache's sole ownership.
pub(crate) type ReleaseHook = Box<dyn FnOnce()>;

struct ImageCell {
    image: RenderedImage,
    observer: RefCell<Option<ReleaseHook>>,
}

impl Drop for ImageCell {
    fn drop(&mut self) {
        if std::thread::panicking() {
            return;
        }
        assert!(
            self.observer.get_mut().is_none(),
            "SharedImage: image destroyed with a release observation still attached"
        );
    }
}

/// The cache's own hold on a rendered image.
pub(crate) struct SharedImage {
    cell: Rc<ImageCell>,
}

impl SharedImage {
    pub(crate) fn new(image: RenderedImage) -> Self {
        Self {
            cell: Rc::new(ImageCell {
                image,
                observer: RefCell::new(None),
            }),
        }
    }

    /// Give out another reference to the pixels.
    pub(crate) fn hand_out(&self) -> IconHandle {
        IconHandle {
            cell: Rc::clone(&self.cell),
        }
    }

    /// Attach the release observation.
    ///
    /// # Panics
    ///
    /// Panics if an observation is already attached.
    pub(crate) fn observe(&self, hook: ReleaseHook) {
        let mut slot = self.cell.observer.borrow_mut();
        assert!(
            slot.is_none(),
            "SharedImage: release observation attached twice"
        );
        *slot = Some(hook);
    }

    /// Remove the release observation without running it.
    pub(crate) fn detach(&self) -> bool {
        self.cell.observer.borrow_mut().take().is_some()
    }

    pub(crate) fn is_observed(&self) -> bool {
        self.cell.observer.borrow().is_some()
    }

    /// Number of handles currently given out.
    pub(crate) fn outstanding(&self) -> usize {
        Rc::strong_count(&self.cell) - 1
    }

    pub(crate) fn image(&self) -> &RenderedImage {
        &self.cell.image
    }
}

/// A caller's reference to a cached rendered icon.
///
/// Handles are cheap to clone. Dropping the last one notifies the cache that
/// the render is unused again, which makes it eligible for eviction.
pub struct IconHandle {
    cell: Rc<ImageCell>,
}

impl IconHandle {
    /// The rendered pixels.
    pub fn image(&self) -> &RenderedImage {
        &self.cell.image
    }

    /// Whether both handles point at the same cached render.
    pub fn ptr_eq(a: &IconHandle, b: &IconHandle) -> bool {
        Rc::ptr_eq(&a.cell, &b.cell)
    }
}

impl Clone for IconHandle {
    fn clone(&self) -> Self {
        Self {
            cell: Rc::clone(&self.cell),
        }
    }
}

impl Deref for IconHandle {
    type Target = RenderedImage;

    fn deref(&self) -> &RenderedImage {
        &self.cell.image
    }
}

impl fmt::Debug for IconHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("IconHandle").field(&self.cell.image).finish()
    }
}

impl Drop for IconHandle {
    fn drop(&mut self) {
        // This handle plus the cache's hold: we are the last external holder.
        if Rc::strong_count(&self.cell) == 2 {
            let hook = self.cell.observer.borrow_mut().take();
            if let Some(hook) = hook {
                hook();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn pixel() -> RenderedImage {
        RenderedImage::new(vec![1, 2, 3, 4], 1, 1)
    }

    #[test]
    fn test_hook_fires_once_after_last_handle() {
        let shared = SharedImage::new(pixel());
        let fired = Rc::new(Cell::new(0));

        let first = shared.hand_out();
        let counter = fired.clone();
        shared.observe(Box::new(move || counter.set(counter.get() + 1)));
        let second = first.clone();

        drop(first);
        assert_eq!(fired.get(), 0);
        assert_eq!(shared.outstanding(), 1);

        drop(second);
        assert_eq!(fired.get(), 1);
        assert!(!shared.is_observed());
        assert_eq!(shared.outstanding(), 0);
    }

    #[test]
    fn test_detached_hook_never_fires() {
        let shared = SharedImage::new(pixel());
        let fired = Rc::new(Cell::new(false));

        let handle = shared.hand_out();
        let flag = fired.clone();
        shared.observe(Box::new(move || flag.set(true)));
        assert!(shared.detach());
        drop(handle);

        assert!(!fired.get());
    }

    #[test]
    fn test_handle_outlives_cache_hold() {
        let shared = SharedImage::new(pixel());
        let handle = shared.hand_out();
        drop(shared);
        assert_eq!(handle.data(), &[1, 2, 3, 4]);
    }

    #[test]
    #[should_panic(expected = "attached twice")]
    fn test_double_observation_panics() {
        let shared = SharedImage::new(pixel());
        shared.observe(Box::new(|| {}));
        shared.observe(Box::new(|| {}));
    }

    #[test]
    fn test_from_dynamic_scales_to_box() {
        let img = DynamicImage::new_rgba8(8, 4);
        let rendered = RenderedImage::from_dynamic(img, 16, 16);
        assert_eq!((rendered.width(), rendered.height()), (16, 16));
        assert_eq!(rendered.data().len(), 16 * 16 * 4);
    }
}
