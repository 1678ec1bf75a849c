// SPDX-License-Identifier: LGPL-3.0-only
//! Icon identities and the keys cached renders are stored under.

use std::path::PathBuf;
use std::rc::Rc;

/// A loadable icon resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IconResource {
    /// An image file on disk.
    File(PathBuf),
    /// Encoded image bytes held in memory.
    Bytes(Rc<[u8]>),
}

impl IconResource {
    /// Resource for an image file.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::File(path.into())
    }

    /// Resource for in-memory encoded image bytes.
    pub fn bytes(data: impl Into<Rc<[u8]>>) -> Self {
        Self::Bytes(data.into())
    }
}

/// What icon is being asked for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IconDescriptor {
    /// Decoded from a resource at final physical resolution.
    Stream(IconResource),
    /// Resolved by symbolic name through the icon theme.
    Name(String),
}

impl IconDescriptor {
    /// Descriptor for a themed icon name.
    pub fn name(name: impl Into<String>) -> Self {
        Self::Name(name.into())
    }

    /// Descriptor for an image file.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::Stream(IconResource::file(path))
    }
}

impl From<IconResource> for IconDescriptor {
    fn from(resource: IconResource) -> Self {
        Self::Stream(resource)
    }
}

/// Key for stream-decoded icons.
///
/// Size and scale are folded into one physical dimension because the decoder
/// produces pixels at `size * scale` directly.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StreamKey {
    pub resource: IconResource,
    pub physical_size: u32,
}

impl StreamKey {
    pub fn new(resource: IconResource, size: u32, scale: u32) -> Self {
        Self {
            resource,
            physical_size: size.saturating_mul(scale.max(1)),
        }
    }
}

/// Key for theme-resolved icons. The resolver is asked for an explicitly
/// scaled variant, so size and scale stay distinct.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NameKey {
    pub name: String,
    pub size: u32,
    pub scale: u32,
}

impl NameKey {
    pub fn new(name: impl Into<String>, size: u32, scale: u32) -> Self {
        Self {
            name: name.into(),
            size,
            scale: scale.max(1),
        }
    }
}

/// A classified cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Stream(StreamKey),
    Name(NameKey),
}

impl CacheKey {
    /// Classify `descriptor` and build the matching key.
    pub fn new(descriptor: &IconDescriptor, size: u32, scale: u32) -> Self {
        match descriptor {
            IconDescriptor::Stream(resource) => {
                Self::Stream(StreamKey::new(resource.clone(), size, scale))
            },
            IconDescriptor::Name(name) => Self::Name(NameKey::new(name.as_str(), size, scale)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_key_folds_scale() {
        let res = IconResource::file("/tmp/a.png");
        assert_eq!(
            StreamKey::new(res.clone(), 16, 2),
            StreamKey::new(res, 32, 1)
        );
    }

    #[test]
    fn test_name_key_keeps_scale() {
        assert_ne!(NameKey::new("folder", 16, 2), NameKey::new("folder", 32, 1));
        assert_eq!(NameKey::new("folder", 16, 2), NameKey::new("folder", 16, 2));
    }

    #[test]
    fn test_bytes_resource_compares_by_value() {
        let a = IconResource::bytes(vec![1u8, 2, 3]);
        let b = IconResource::bytes(vec![1u8, 2, 3]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_kinds_never_collide() {
        let stream = CacheKey::new(&IconDescriptor::file("folder"), 16, 1);
        let name = CacheKey::new(&IconDescriptor::name("folder"), 16, 1);
        assert_ne!(stream, name);
    }
}
