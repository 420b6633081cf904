//! Benchmark fixtures for clconv. The benchmarks live in `benches/`.

use clconv_core::{CoreResult, RgbaImage};

/// Kernel sources shipped in `kernels/`.
pub const IDENTITY_SOURCE: &str = include_str!("../../../kernels/identity.cl");
/// Sobel kernel source.
pub const SOBEL_SOURCE: &str = include_str!("../../../kernels/sobel.cl");

/// Deterministic test pattern.
pub fn pattern(width: u32, height: u32) -> CoreResult<RgbaImage> {
    let mut data = Vec::with_capacity(width as usize * height as usize * 4);
    for y in 0..height {
        for x in 0..width {
            data.extend_from_slice(&[(x ^ y) as u8, (x * 3) as u8, (y * 7) as u8, 255]);
        }
    }
    RgbaImage::from_raw(width, height, data)
}
