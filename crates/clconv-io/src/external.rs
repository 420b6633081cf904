//! Codec backed by the `image` crate.
//!
//! Format is chosen from the file extension on both load and save. Anything
//! the decoder returns is converted to RGBA8.

use std::path::Path;

use image::ImageReader;
use tracing::{debug, trace};

use crate::{ImageCodec, IoError, IoResult, RgbaImage};

/// Multi-format codec using the `image` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThirdPartyCodec;

impl ThirdPartyCodec {
    /// Creates the codec.
    pub fn new() -> Self {
        Self
    }
}

impl ImageCodec for ThirdPartyCodec {
    fn name(&self) -> &'static str {
        "image"
    }

    fn load(&self, path: &Path) -> IoResult<RgbaImage> {
        trace!(path = %path.display(), "image::load");
        let img = ImageReader::open(path)
            .map_err(|e| IoError::io(path, e))?
            .with_guessed_format()
            .map_err(|e| IoError::io(path, e))?
            .decode()
            .map_err(|e| IoError::DecodeError(e.to_string()))?;

        debug!(color = ?img.color(), width = img.width(), height = img.height(), "decoded image");
        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();
        Ok(RgbaImage::from_raw(width, height, rgba.into_raw())?)
    }

    fn save(&self, path: &Path, image: &RgbaImage) -> IoResult<()> {
        trace!(path = %path.display(), width = image.width(), height = image.height(), "image::save");
        let buffer = image::RgbaImage::from_raw(image.width(), image.height(), image.data().to_vec())
            .ok_or_else(|| IoError::EncodeError("pixel buffer does not match dimensions".into()))?;
        buffer.save(path).map_err(|e| match e {
            image::ImageError::IoError(io) => IoError::io(path, io),
            image::ImageError::Unsupported(u) => IoError::UnsupportedFormat(u.to_string()),
            other => IoError::EncodeError(other.to_string()),
        })
    }
}
