// SPDX-License-Identifier: LGPL-3.0-only
//! Raster icon loading through the `image` crate.

use std::fs;
use std::path::Path;

use crate::icon::error::IconError;
use crate::icon::handle::RenderedImage;
use crate::icon::key::IconResource;
use crate::icon::resolver::StreamDecoder;

/// Load a PNG icon file and scale it to a `px` square.
pub fn load_raster(path: &Path, px: u32) -> Result<RenderedImage, IconError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match extension.as_str() {
        "png" => {
            let bytes = fs::read(path)?;
            decode(&bytes, px, px)
        },
        _ => Err(IconError::InvalidFormat(format!(
            "Unsupported icon format: {}",
            extension
        ))),
    }
}

fn decode(bytes: &[u8], width: u32, height: u32) -> Result<RenderedImage, IconError> {
    let img = image::load_from_memory(bytes)?;
    Ok(RenderedImage::from_dynamic(img, width, height))
}

/// Decodes [`IconResource`]s with the `image` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageDecoder;

impl ImageDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl StreamDecoder for ImageDecoder {
    fn decode(
        &self,
        resource: &IconResource,
        width: u32,
        height: u32,
    ) -> Result<RenderedImage, IconError> {
        match resource {
            IconResource::File(path) => {
                let bytes = fs::read(path)?;
                decode(&bytes, width, height)
            },
            IconResource::Bytes(data) => decode(data, width, height),
        }
    }
}
