// SPDX-License-Identifier: LGPL-3.0-only
//! Icon file lookup across search paths and theme inheritance.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::icon::error::IconError;
use crate::icon::theme::IconTheme;

/// Icon file formats the loader can decode.
pub const ICON_EXTENSIONS: [&str; 1] = ["png"];

/// Finds icon files by name.
pub struct IconLookup {
    /// Parsed themes, `None` for names that failed to load.
    theme_cache: RefCell<HashMap<String, Option<Rc<IconTheme>>>>,
    /// Base directories searched for themes and standalone icons.
    search_paths: Vec<PathBuf>,
}

impl IconLookup {
    /// Lookup over the default XDG locations.
    pub fn new() -> Self {
        Self::with_search_paths(default_search_paths())
    }

    /// Lookup over the given base directories only.
    pub fn with_search_paths(search_paths: Vec<PathBuf>) -> Self {
        Self {
            theme_cache: RefCell::new(HashMap::new()),
            search_paths,
        }
    }

    /// Base directories searched, in order.
    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    /// Load a theme by its directory name, caching the result.
    pub fn load_theme(&self, theme_name: &str) -> Result<Rc<IconTheme>, IconError> {
        if let Some(cached) = self.theme_cache.borrow().get(theme_name) {
            return cached
                .clone()
                .ok_or_else(|| IconError::ThemeNotFound(theme_name.to_string()));
        }

        let loaded = self
            .search_paths
            .iter()
            .map(|base| base.join(theme_name))
            .filter(|path| path.is_dir())
            .find_map(|path| match IconTheme::load(theme_name, path) {
                Ok(theme) => Some(Rc::new(theme)),
                Err(e) => {
                    log::debug!("IconLookup: Skipping theme candidate '{}': {}", theme_name, e);
                    None
                },
            });

        self.theme_cache
            .borrow_mut()
            .insert(theme_name.to_string(), loaded.clone());
        loaded.ok_or_else(|| IconError::ThemeNotFound(theme_name.to_string()))
    }

    /// Forget every parsed theme.
    pub fn reset(&self) {
        self.theme_cache.borrow_mut().clear();
    }

    /// Themes to search for `theme_name`: the theme itself, its ancestors
    /// breadth first, then `hicolor`.
    fn theme_chain(&self, theme_name: &str) -> Vec<Rc<IconTheme>> {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([theme_name.to_string()]);

        while let Some(name) = queue.pop_front() {
            // hicolor stays last no matter who inherits it.
            if name == "hicolor" || !seen.insert(name.clone()) {
                continue;
            }
            let Ok(theme) = self.load_theme(&name) else {
                continue;
            };
            queue.extend(theme.inherits.iter().cloned());
            chain.push(theme);
        }

        if let Ok(hicolor) = self.load_theme("hicolor") {
            chain.push(hicolor);
        }

        chain
    }

    /// Find the file for `icon_name` at `size` and `scale` in `theme_name`.
    pub fn lookup_icon(
        &self,
        icon_name: &str,
        size: u32,
        scale: u32,
        theme_name: &str,
    ) -> Option<PathBuf> {
        for theme in self.theme_chain(theme_name) {
            if let Some(path) = lookup_in_theme(&theme, icon_name, size, scale) {
                log::debug!(
                    "IconLookup: Found icon '{}' in theme '{}' at {:?}",
                    icon_name,
                    theme.name,
                    path
                );
                return Some(path);
            }
        }

        // Standalone icons live directly in a base directory.
        let standalone = self
            .search_paths
            .iter()
            .find_map(|base| find_with_extension(base, icon_name));
        if standalone.is_none() {
            log::debug!("IconLookup: Icon '{}' not found in any theme", icon_name);
        }
        standalone
    }
}

impl Default for IconLookup {
    fn default() -> Self {
        Self::new()
    }
}

fn lookup_in_theme(theme: &IconTheme, icon_name: &str, size: u32, scale: u32) -> Option<PathBuf> {
    theme
        .directories_for(size, scale)
        .into_iter()
        .find_map(|dir| find_with_extension(&theme.directory_path(&dir.name), icon_name))
}

fn find_with_extension(dir: &Path, icon_name: &str) -> Option<PathBuf> {
    ICON_EXTENSIONS
        .iter()
        .map(|ext| dir.join(format!("{}.{}", icon_name, ext)))
        .find(|path| path.is_file())
}

/// `~/.icons`, `~/.local/share/icons`, `/usr/share/icons`, `/usr/share/pixmaps`.
pub fn default_search_paths() -> Vec<PathBuf> {
    let mut search_paths = Vec::new();

    if let Some(home) = std::env::var_os("HOME") {
        let home = PathBuf::from(home);
        search_paths.push(home.join(".icons"));
        search_paths.push(home.join(".local/share/icons"));
    }

    search_paths.push(PathBuf::from("/usr/share/icons"));
    search_paths.push(PathBuf::from("/usr/share/pixmaps"));
    search_paths
}
