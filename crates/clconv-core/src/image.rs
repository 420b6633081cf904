//! Host-side RGBA8 pixel buffer.

use crate::error::{CoreError, CoreResult};
use crate::pixel;

/// Channels per pixel in the interchange layout.
pub const CHANNELS: usize = 4;

/// Interleaved RGBA, 8 bits per channel, row-major, no row padding.
///
/// This is the only layout exchanged between the codecs and the device:
/// `data.len() == width * height * 4` always holds.
#[derive(Clone, PartialEq, Eq)]
pub struct RgbaImage {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl RgbaImage {
    /// Wraps existing pixel data after validating its size.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> CoreResult<Self> {
        let expected = Self::byte_len(width, height)?;
        if data.len() != expected {
            return Err(CoreError::BufferSizeMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { width, height, data })
    }

    /// Image with every pixel set to `px`.
    pub fn filled(width: u32, height: u32, px: [u8; 4]) -> CoreResult<Self> {
        let len = Self::byte_len(width, height)?;
        let data = px.iter().copied().cycle().take(len).collect();
        Ok(Self { width, height, data })
    }

    /// Builds an image from normalized float samples.
    pub fn from_normalized(width: u32, height: u32, samples: &[f32]) -> CoreResult<Self> {
        Self::from_raw(width, height, pixel::denormalize_slice(samples))
    }

    /// Number of bytes an image of the given size occupies.
    pub fn byte_len(width: u32, height: u32) -> CoreResult<usize> {
        if width == 0 || height == 0 {
            return Err(CoreError::invalid_dimensions(width, height, "width and height must be positive"));
        }
        (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(CHANNELS))
            .ok_or_else(|| CoreError::invalid_dimensions(width, height, "byte size overflows"))
    }

    /// Width in pixels.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// `(width, height)`.
    #[inline]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Raw bytes.
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Mutable raw bytes.
    #[inline]
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Consumes the image, returning its bytes.
    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }

    /// Pixel at `(x, y)`, `None` when outside the image.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * CHANNELS;
        Some([self.data[i], self.data[i + 1], self.data[i + 2], self.data[i + 3]])
    }

    /// Normalized float copy of the samples.
    pub fn to_normalized(&self) -> Vec<f32> {
        pixel::normalize_slice(&self.data)
    }
}

impl std::fmt::Debug for RgbaImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RgbaImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("size_bytes", &self.data.len())
            .finish()
    }
}
