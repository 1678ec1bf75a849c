// SPDX-License-Identifier: LGPL-3.0-only
//! Error types for the icon system.
//!
//! These never reach callers of the cache lookups: a failed resolve or decode
//! is replaced by a fallback render inside the store.

use std::path::PathBuf;

/// Errors that can occur while resolving or decoding an icon.
#[derive(Debug, thiserror::Error)]
pub enum IconError {
    /// Theme not found.
    #[error("Icon theme '{0}' not found")]
    ThemeNotFound(String),

    /// Error parsing index.theme file.
    #[error("Failed to parse index.theme: {0}")]
    IndexParseError(String),

    /// Icon not found.
    #[error("Icon '{0}' not found in theme")]
    IconNotFound(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// The image crate could not decode the data.
    #[error("Failed to decode icon: {0}")]
    Decode(#[from] image::ImageError),

    /// Invalid image format.
    #[error("Invalid image format: {0}")]
    InvalidFormat(String),

    /// Invalid theme directory.
    #[error("Invalid theme directory: {0}")]
    InvalidThemeDirectory(PathBuf),
}
