//! Conversion between 8-bit channel samples and normalized floats.
//!
//! The mapping is linear: `0 -> 0.0`, `255 -> 1.0`. Denormalization rounds to
//! the nearest integer and clamps, so every byte survives a round trip
//! unchanged. Out-of-range and NaN inputs never panic.

use rayon::prelude::*;

const MAX_VALUE: f32 = 255.0;

/// Maps a byte in `[0, 255]` linearly onto `[0.0, 1.0]`.
#[inline]
pub fn normalize(v: u8) -> f32 {
    v as f32 / MAX_VALUE
}

/// Inverse of [`normalize`]: rounds to the nearest integer and clamps to
/// `[0, 255]`. NaN maps to 0.
#[inline]
pub fn denormalize(v: f32) -> u8 {
    // `as` saturates and sends NaN to 0
    (v.clamp(0.0, 1.0) * MAX_VALUE).round() as u8
}

/// Normalizes a whole byte buffer.
pub fn normalize_slice(src: &[u8]) -> Vec<f32> {
    src.par_iter().map(|&v| normalize(v)).collect()
}

/// Denormalizes a whole float buffer.
pub fn denormalize_slice(src: &[f32]) -> Vec<u8> {
    src.par_iter().map(|&v| denormalize(v)).collect()
}

/// Normalizes an RGBA texel.
#[inline]
pub fn normalize_rgba(px: [u8; 4]) -> [f32; 4] {
    px.map(normalize)
}

/// Denormalizes an RGBA texel.
#[inline]
pub fn denormalize_rgba(px: [f32; 4]) -> [u8; 4] {
    px.map(denormalize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_round_trip_every_byte() {
        for v in 0..=255u8 {
            assert_eq!(denormalize(normalize(v)), v, "byte {v} did not survive");
        }
    }

    #[test]
    fn test_endpoints() {
        assert_relative_eq!(normalize(0), 0.0);
        assert_relative_eq!(normalize(255), 1.0);
        assert_relative_eq!(normalize(128), 128.0 / 255.0);
    }

    #[test]
    fn test_denormalize_clamps() {
        assert_eq!(denormalize(-0.5), 0);
        assert_eq!(denormalize(1.5), 255);
        assert_eq!(denormalize(f32::NAN), 0);
        assert_eq!(denormalize(f32::INFINITY), 255);
    }

    #[test]
    fn test_denormalize_rounds_to_nearest() {
        // 0.5 / 255 sits exactly between 0 and 1
        assert_eq!(denormalize(0.49 / 255.0), 0);
        assert_eq!(denormalize(0.51 / 255.0), 1);
        assert_eq!(denormalize(254.6 / 255.0), 255);
    }

    #[test]
    fn test_slice_round_trip() {
        let bytes: Vec<u8> = (0..=255u8).cycle().take(1000).collect();
        let floats = normalize_slice(&bytes);
        assert_eq!(floats.len(), bytes.len());
        assert_eq!(denormalize_slice(&floats), bytes);
    }

    #[test]
    fn test_rgba_helpers() {
        let px = [0, 64, 200, 255];
        assert_eq!(denormalize_rgba(normalize_rgba(px)), px);
    }
}
