// SPDX-License-Identifier: LGPL-3.0-only
use anyhow::Result;
use serde::Deserialize;
use smol::fs;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use xdg::BaseDirectories;

/// Configuration file name looked up in the XDG directories.
pub const SETTINGS_FILE: &str = "icons.toml";

/// Default time an unused render stays cached.
pub const DEFAULT_EVICTION_AGE: Duration = Duration::from_secs(30);

/// Default time between reaper sweeps.
pub const DEFAULT_REAP_INTERVAL: Duration = Duration::from_secs(5);

/// Icon substituted for names the theme cannot resolve.
pub const DEFAULT_FALLBACK_ICON: &str = "application-x-generic";

/// On-disk layout of `icons.toml`. Every key is optional so that files can be
/// layered.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SettingsFile {
    /// Cache tuning
    #[serde(default)]
    pub cache: CacheSection,
    /// Icon theme selection
    #[serde(default)]
    pub theme: ThemeSection,
    /// Any other sections are captured here
    #[serde(flatten)]
    pub other: HashMap<String, toml::Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CacheSection {
    pub eviction_age_secs: Option<u64>,
    pub reap_interval_secs: Option<u64>,
    pub fallback_icon_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ThemeSection {
    pub name: Option<String>,
    pub search_paths: Option<Vec<PathBuf>>,
}

/// Effective settings of an [`IconCache`](crate::icon::IconCache).
#[derive(Debug, Clone, PartialEq)]
pub struct CacheSettings {
    /// How long a sole-owned render survives untouched.
    pub eviction_age: Duration,
    /// Time between reaper sweeps. Never zero.
    pub reap_interval: Duration,
    /// Theme icon used when a name cannot be resolved.
    pub fallback_icon_name: String,
    /// Icon theme to resolve names in.
    pub theme_name: String,
    /// Theme base directories. Empty means the XDG defaults.
    pub search_paths: Vec<PathBuf>,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            eviction_age: DEFAULT_EVICTION_AGE,
            reap_interval: DEFAULT_REAP_INTERVAL,
            fallback_icon_name: DEFAULT_FALLBACK_ICON.to_string(),
            theme_name: "hicolor".to_string(),
            search_paths: Vec::new(),
        }
    }
}

impl CacheSettings {
    /// Defaults overridden by the standard configuration files.
    pub async fn load() -> Result<Self> {
        let mut settings = Self::default();
        for path in Self::layer_paths()? {
            settings.load_file(&path).await;
        }
        Ok(settings)
    }

    /// Defaults overridden by one TOML document.
    pub fn from_toml(content: &str) -> Result<Self> {
        let mut settings = Self::default();
        settings.merge(toml::from_str::<SettingsFile>(content)?);
        Ok(settings)
    }

    /// Existing configuration files, in the order [`CacheSettings::load`]
    /// applies them (later overrides earlier):
    /// 1. System Data: /usr/share/npicons-0/icons.toml (and XDG_DATA_DIRS)
    /// 2. System Config: /etc/xdg/npicons-0/icons.toml (and XDG_CONFIG_DIRS)
    /// 3. User Config: ~/.config/npicons-0/icons.toml (XDG_CONFIG_HOME)
    pub fn layer_paths() -> Result<Vec<PathBuf>> {
        let xdg_dirs = BaseDirectories::with_prefix("npicons-0")?;
        // Both searches yield the user directory first.
        let data = xdg_dirs.find_data_files(SETTINGS_FILE).rev();
        let config = xdg_dirs.find_config_files(SETTINGS_FILE).rev();
        Ok(data.chain(config).collect())
    }

    /// Merge one file on top of the current settings. Unreadable or invalid
    /// files are logged and skipped.
    pub async fn load_file(&mut self, path: &Path) {
        log::info!("Loading icon cache config from: {:?}", path);
        match fs::read_to_string(path).await {
            Ok(content) => match toml::from_str::<SettingsFile>(&content) {
                Ok(file) => self.merge(file),
                Err(e) => {
                    log::error!("Failed to parse config file {:?}: {}", path, e);
                },
            },
            Err(e) => {
                log::warn!("Failed to read config file {:?}: {}", path, e);
            },
        }
    }

    /// Override every value present in `file`.
    pub fn merge(&mut self, file: SettingsFile) {
        if let Some(secs) = file.cache.eviction_age_secs {
            self.eviction_age = Duration::from_secs(secs);
        }
        if let Some(secs) = file.cache.reap_interval_secs {
            self.reap_interval = Duration::from_secs(secs.max(1));
        }
        if let Some(name) = file.cache.fallback_icon_name {
            self.fallback_icon_name = name;
        }

        if let Some(name) = file.theme.name {
            self.theme_name = name;
        }
        if let Some(paths) = file.theme.search_paths {
            self.search_paths = paths;
        }

        if !file.other.is_empty() {
            log::debug!(
                "CacheSettings: ignoring sections {:?}",
                file.other.keys().collect::<Vec<_>>()
            );
        }
    }
}
