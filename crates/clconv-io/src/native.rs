//! Native PNG codec.
//!
//! Reads any 8- or 16-bit PNG (palette, gray, gray+alpha, RGB, RGBA) and
//! expands it to RGBA8. Always writes 8-bit RGBA.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use tracing::{debug, trace};

use crate::{ImageCodec, IoError, IoResult, RgbaImage};

/// PNG codec built on the `png` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeCodec;

impl NativeCodec {
    /// Creates the codec.
    pub fn new() -> Self {
        Self
    }
}

impl ImageCodec for NativeCodec {
    fn name(&self) -> &'static str {
        "png"
    }

    fn load(&self, path: &Path) -> IoResult<RgbaImage> {
        trace!(path = %path.display(), "png::load");
        let file = File::open(path).map_err(|e| IoError::io(path, e))?;
        let mut decoder = png::Decoder::new(BufReader::new(file));
        decoder.set_transformations(png::Transformations::EXPAND | png::Transformations::STRIP_16);

        let mut reader = decoder
            .read_info()
            .map_err(|e: png::DecodingError| IoError::DecodeError(e.to_string()))?;

        let buf_size = reader
            .output_buffer_size()
            .ok_or_else(|| IoError::DecodeError("cannot determine output buffer size".into()))?;
        let mut buf = vec![0u8; buf_size];
        let info = reader
            .next_frame(&mut buf)
            .map_err(|e: png::DecodingError| IoError::DecodeError(e.to_string()))?;
        let samples = &buf[..info.buffer_size()];

        let rgba: Vec<u8> = match info.color_type {
            png::ColorType::Rgba => samples.to_vec(),
            png::ColorType::Rgb => samples
                .chunks_exact(3)
                .flat_map(|p| [p[0], p[1], p[2], 255])
                .collect(),
            png::ColorType::GrayscaleAlpha => samples
                .chunks_exact(2)
                .flat_map(|ga| [ga[0], ga[0], ga[0], ga[1]])
                .collect(),
            png::ColorType::Grayscale => samples.iter().flat_map(|&g| [g, g, g, 255]).collect(),
            png::ColorType::Indexed => {
                return Err(IoError::DecodeError("palette was not expanded".into()));
            }
        };

        debug!(width = info.width, height = info.height, color = ?info.color_type, "decoded png");
        Ok(RgbaImage::from_raw(info.width, info.height, rgba)?)
    }

    fn save(&self, path: &Path, image: &RgbaImage) -> IoResult<()> {
        trace!(path = %path.display(), width = image.width(), height = image.height(), "png::save");
        let file = File::create(path).map_err(|e| IoError::io(path, e))?;
        let writer = BufWriter::new(file);

        let mut encoder = png::Encoder::new(writer, image.width(), image.height());
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        encoder.set_compression(png::Compression::default());

        let mut png_writer = encoder
            .write_header()
            .map_err(|e| IoError::EncodeError(e.to_string()))?;
        png_writer
            .write_image_data(image.data())
            .map_err(|e| IoError::EncodeError(e.to_string()))?;
        png_writer
            .finish()
            .map_err(|e| IoError::EncodeError(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_rgba() {
        let (width, height) = (16u32, 8u32);
        let mut data = Vec::with_capacity((width * height * 4) as usize);
        for y in 0..height {
            for x in 0..width {
                data.extend_from_slice(&[(x * 16) as u8, (y * 32) as u8, 64, 200]);
            }
        }
        let image = RgbaImage::from_raw(width, height, data).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roundtrip.png");
        let codec = NativeCodec::new();
        codec.save(&path, &image).expect("write png");
        let loaded = codec.load(&path).expect("read png");

        assert_eq!(loaded, image);
    }

    #[test]
    fn test_rgb_gets_opaque_alpha() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rgb.png");
        {
            let file = File::create(&path).unwrap();
            let mut encoder = png::Encoder::new(BufWriter::new(file), 2, 1);
            encoder.set_color(png::ColorType::Rgb);
            encoder.set_depth(png::BitDepth::Eight);
            let mut w = encoder.write_header().unwrap();
            w.write_image_data(&[10, 20, 30, 40, 50, 60]).unwrap();
        }

        let loaded = NativeCodec::new().load(&path).unwrap();
        assert_eq!(loaded.data(), &[10, 20, 30, 255, 40, 50, 60, 255]);
    }

    #[test]
    fn test_missing_file() {
        let err = NativeCodec::new().load(Path::new("/nonexistent/clconv.png")).unwrap_err();
        assert!(matches!(err, IoError::Io { .. }));
    }
}
