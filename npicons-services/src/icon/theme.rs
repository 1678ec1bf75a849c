// SPDX-License-Identifier: LGPL-3.0-only
//! XDG icon theme index parsing.

use std::collections::HashMap;
use std::path::PathBuf;

use crate::icon::error::IconError;

/// Penalty added when a directory's icons would have to be upscaled.
const UPSCALE_PENALTY: u64 = 10_000;

/// Directory type for icon directories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectoryType {
    /// Fixed size directory.
    Fixed,
    /// Scalable directory.
    Scalable,
    /// Threshold directory.
    Threshold,
}

impl DirectoryType {
    fn parse(s: &str) -> Self {
        match s {
            "Scalable" => Self::Scalable,
            "Threshold" => Self::Threshold,
            _ => Self::Fixed,
        }
    }
}

/// One `[subdir]` section of an `index.theme`.
#[derive(Debug, Clone)]
pub struct IconDirectory {
    /// Directory name, relative to the theme root.
    pub name: String,
    /// Nominal icon size.
    pub size: u32,
    /// Scale factor the directory is meant for.
    pub scale: u32,
    /// Directory type.
    pub directory_type: DirectoryType,
    /// Minimum size (for scalable).
    pub min_size: Option<u32>,
    /// Maximum size (for scalable).
    pub max_size: Option<u32>,
    /// Threshold (for threshold directories).
    pub threshold: Option<u32>,
}

impl IconDirectory {
    /// How well this directory fits a `size` icon at `scale`; lower is better.
    ///
    /// Exact matches score 0. Larger icons are preferred over smaller ones
    /// because downscaling keeps more detail than upscaling.
    pub fn score(&self, size: u32, scale: u32) -> u64 {
        let wanted = u64::from(size) * u64::from(scale.max(1));
        let dir_scale = u64::from(self.scale.max(1));
        let have = u64::from(self.size) * dir_scale;

        let by_distance = |have: u64| {
            if have >= wanted {
                have - wanted
            } else {
                wanted - have + UPSCALE_PENALTY
            }
        };

        match self.directory_type {
            DirectoryType::Fixed => by_distance(have),
            DirectoryType::Scalable => {
                let min = u64::from(self.min_size.unwrap_or(self.size)) * dir_scale;
                let max = u64::from(self.max_size.unwrap_or(self.size)) * dir_scale;
                if (min..=max).contains(&wanted) {
                    0
                } else if wanted < min {
                    min - wanted
                } else {
                    wanted - max + UPSCALE_PENALTY
                }
            },
            DirectoryType::Threshold => {
                let threshold = u64::from(self.threshold.unwrap_or(2)) * dir_scale;
                if have.abs_diff(wanted) <= threshold {
                    0
                } else {
                    by_distance(have)
                }
            },
        }
    }
}

/// A parsed XDG icon theme.
#[derive(Debug, Clone)]
pub struct IconTheme {
    /// Theme name.
    pub name: String,
    /// Inherited themes, in lookup order.
    pub inherits: Vec<String>,
    /// Directories in this theme.
    pub directories: Vec<IconDirectory>,
    /// Base path to theme directory.
    pub base_path: PathBuf,
}

impl IconTheme {
    /// Load an icon theme from a directory containing `index.theme`.
    pub fn load(theme_name: &str, base_path: PathBuf) -> Result<Self, IconError> {
        let index_path = base_path.join("index.theme");
        if !index_path.is_file() {
            return Err(IconError::ThemeNotFound(theme_name.to_string()));
        }

        let content = std::fs::read_to_string(&index_path)?;
        Self::parse(theme_name, base_path, &content)
    }

    /// Parse the contents of an `index.theme`.
    pub fn parse(theme_name: &str, base_path: PathBuf, content: &str) -> Result<Self, IconError> {
        let ini = parse_ini(content);

        let theme_section = ini
            .get("Icon Theme")
            .ok_or_else(|| IconError::IndexParseError("Missing [Icon Theme] section".to_string()))?;

        let name = theme_section
            .get("Name")
            .cloned()
            .unwrap_or_else(|| theme_name.to_string());

        let inherits = theme_section
            .get("Inherits")
            .map(|s| split_list(s))
            .unwrap_or_default();

        let mut names = theme_section
            .get("Directories")
            .map(|s| split_list(s))
            .ok_or_else(|| IconError::IndexParseError("Missing Directories key".to_string()))?;
        if let Some(scaled) = theme_section.get("ScaledDirectories") {
            names.extend(split_list(scaled));
        }

        let directories = names
            .into_iter()
            .filter_map(|dir_name| {
                let section = ini.get(dir_name.as_str())?;
                let number = |key: &str| section.get(key).and_then(|v| v.parse::<u32>().ok());
                Some(IconDirectory {
                    size: number("Size").unwrap_or(48),
                    scale: number("Scale").unwrap_or(1),
                    directory_type: section
                        .get("Type")
                        .map_or(DirectoryType::Threshold, |t| DirectoryType::parse(t)),
                    min_size: number("MinSize"),
                    max_size: number("MaxSize"),
                    threshold: number("Threshold"),
                    name: dir_name,
                })
            })
            .collect();

        Ok(IconTheme {
            name,
            inherits,
            directories,
            base_path,
        })
    }

    /// Get the path to a directory by name.
    pub fn directory_path(&self, dir_name: &str) -> PathBuf {
        self.base_path.join(dir_name)
    }

    /// Directories ordered from best to worst fit for `size` at `scale`.
    pub fn directories_for(&self, size: u32, scale: u32) -> Vec<&IconDirectory> {
        let mut dirs: Vec<&IconDirectory> = self.directories.iter().collect();
        dirs.sort_by_key(|d| d.score(size, scale));
        dirs
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Minimal INI reader for `index.theme` files.
fn parse_ini(content: &str) -> HashMap<String, HashMap<String, String>> {
    let mut result: HashMap<String, HashMap<String, String>> = HashMap::new();
    let mut current: Option<String> = None;

    for line in content.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if let Some(section) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            result.entry(section.to_string()).or_default();
            current = Some(section.to_string());
            continue;
        }

        if let (Some(section), Some((key, value))) = (&current, line.split_once('=')) {
            // First definition wins, localized keys are not looked at.
            result
                .entry(section.clone())
                .or_default()
                .entry(key.trim().to_string())
                .or_insert_with(|| value.trim().to_string());
        }
    }

    result
}
