// SPDX-License-Identifier: LGPL-3.0-only
//! Collaborators that produce renders on a cache miss.

use std::cell::RefCell;
use std::path::PathBuf;

use crate::icon::error::IconError;
use crate::icon::handle::RenderedImage;
use crate::icon::key::IconResource;
use crate::icon::loader::load_raster;
use crate::icon::lookup::IconLookup;

/// Renders a themed icon name.
pub trait ThemeResolver {
    /// Render `name` for a `size` icon at `scale`. The result is expected to
    /// be `size * scale` physical pixels.
    fn resolve(&self, name: &str, size: u32, scale: u32) -> Result<RenderedImage, IconError>;

    /// Switch to resolving names in `theme`. Resolvers without a notion of
    /// themes ignore this.
    fn theme_changed(&self, theme: &str) -> Result<(), IconError> {
        let _ = theme;
        Ok(())
    }
}

/// Decodes a loadable icon resource.
pub trait StreamDecoder {
    /// Decode `resource` into a `width`x`height` render.
    fn decode(
        &self,
        resource: &IconResource,
        width: u32,
        height: u32,
    ) -> Result<RenderedImage, IconError>;
}

impl<F> ThemeResolver for F
where
    F: Fn(&str, u32, u32) -> Result<RenderedImage, IconError>,
{
    fn resolve(&self, name: &str, size: u32, scale: u32) -> Result<RenderedImage, IconError> {
        self(name, size, scale)
    }
}

impl<F> StreamDecoder for F
where
    F: Fn(&IconResource, u32, u32) -> Result<RenderedImage, IconError>,
{
    fn decode(
        &self,
        resource: &IconResource,
        width: u32,
        height: u32,
    ) -> Result<RenderedImage, IconError> {
        self(resource, width, height)
    }
}

/// Resolves names through the XDG icon theme hierarchy on disk.
pub struct XdgThemeResolver {
    theme: RefCell<String>,
    lookup: IconLookup,
}

impl XdgThemeResolver {
    /// Resolver for `theme` over the default search paths.
    pub fn new(theme: impl Into<String>) -> Self {
        Self {
            theme: RefCell::new(theme.into()),
            lookup: IconLookup::new(),
        }
    }

    /// Resolver for `theme` over `search_paths` only.
    pub fn with_search_paths(theme: impl Into<String>, search_paths: Vec<PathBuf>) -> Self {
        Self {
            theme: RefCell::new(theme.into()),
            lookup: IconLookup::with_search_paths(search_paths),
        }
    }

    /// Name of the theme icons are resolved in.
    pub fn theme(&self) -> String {
        self.theme.borrow().clone()
    }

    /// Verify the configured theme can be loaded.
    pub fn check_theme(&self) -> Result<(), IconError> {
        self.lookup.load_theme(&self.theme.borrow()).map(|_| ())
    }
}

impl ThemeResolver for XdgThemeResolver {
    fn resolve(&self, name: &str, size: u32, scale: u32) -> Result<RenderedImage, IconError> {
        let path = self
            .lookup
            .lookup_icon(name, size, scale, &self.theme.borrow())
            .ok_or_else(|| IconError::IconNotFound(name.to_string()))?;
        load_raster(&path, size.saturating_mul(scale.max(1)))
    }

    /// Re-read every `index.theme` from disk, then verify `theme` loads.
    /// On error the current theme is kept.
    fn theme_changed(&self, theme: &str) -> Result<(), IconError> {
        self.lookup.reset();
        self.lookup.load_theme(theme)?;
        *self.theme.borrow_mut() = theme.to_string();
        log::debug!(
            "XdgThemeResolver: Resolving in '{}' across {} search path(s)",
            theme,
            self.lookup.search_paths().len()
        );
        Ok(())
    }
}
