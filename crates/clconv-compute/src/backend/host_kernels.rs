//! Host implementations of the reference kernels shipped in `kernels/`.
//!
//! Each body is evaluated once per work-item with the bound argument values
//! and returns the texel to write at its own coordinate, or `None` when the
//! kernel's bounds guard skips the write. Reads go through [`Sampled`], which
//! applies the bound sampler's addressing mode.

use clconv_core::pixel;

use super::host_compiler::{self, KernelDecl};
use super::{AddressingMode, SamplerDesc};

/// Argument kinds of the image-filter signature, by position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ParamKind {
    Image,
    Sampler,
    Int,
}

/// `(input image, output image, sampler, width, height)`
pub(crate) const FILTER_SIGNATURE: [ParamKind; 5] = [
    ParamKind::Image,
    ParamKind::Image,
    ParamKind::Sampler,
    ParamKind::Int,
    ParamKind::Int,
];

/// Read-only view of an RGBA8 image through a sampler.
pub(crate) struct Sampled<'a> {
    pub data: &'a [u8],
    pub width: u32,
    pub height: u32,
    pub sampler: SamplerDesc,
}

impl Sampled<'_> {
    /// `read_imagef(image, sampler, (int2)(x, y))` with pixel coordinates.
    pub fn read(&self, x: i32, y: i32) -> [f32; 4] {
        let (w, h) = (self.width as i32, self.height as i32);
        let (x, y) = match self.sampler.addressing {
            AddressingMode::ClampToEdge => (x.clamp(0, w - 1), y.clamp(0, h - 1)),
            AddressingMode::Clamp => {
                if x < 0 || y < 0 || x >= w || y >= h {
                    // border colour for RGBA
                    return [0.0; 4];
                }
                (x, y)
            }
            AddressingMode::Repeat => (x.rem_euclid(w), y.rem_euclid(h)),
        };
        let i = (y as usize * self.width as usize + x as usize) * 4;
        pixel::normalize_rgba([self.data[i], self.data[i + 1], self.data[i + 2], self.data[i + 3]])
    }
}

/// Integer arguments 3 and 4 of the filter signature.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Extent {
    pub width: i32,
    pub height: i32,
}

impl Extent {
    fn contains(&self, x: i32, y: i32) -> bool {
        x < self.width && y < self.height
    }
}

pub(crate) type KernelBody = fn(&Sampled<'_>, Extent, i32, i32) -> Option<[f32; 4]>;

/// A kernel the host runtime can execute.
#[derive(Debug, Clone, Copy)]
pub(crate) struct HostKernel {
    pub name: &'static str,
    pub signature: &'static [ParamKind],
    /// OpenCL C source the body implements.
    pub source: &'static str,
    pub body: KernelBody,
}

impl HostKernel {
    /// Whether `decl` is this kernel's definition, ignoring comments and
    /// layout.
    pub fn implements(&self, decl: &KernelDecl) -> bool {
        host_compiler::compile(self.source)
            .ok()
            .and_then(|kernels| kernels.into_iter().find(|k| k.name == self.name))
            .is_some_and(|reference| reference.tokens == decl.tokens)
    }
}

const REGISTRY: &[HostKernel] = &[
    HostKernel {
        name: "identity",
        signature: &FILTER_SIGNATURE,
        source: include_str!("../../../../kernels/identity.cl"),
        body: identity,
    },
    HostKernel {
        name: "sobel",
        signature: &FILTER_SIGNATURE,
        source: include_str!("../../../../kernels/sobel.cl"),
        body: sobel,
    },
];

/// Host implementation for the entry point `name`.
pub(crate) fn lookup(name: &str) -> Option<HostKernel> {
    REGISTRY.iter().find(|k| k.name == name).copied()
}

fn identity(src: &Sampled<'_>, extent: Extent, x: i32, y: i32) -> Option<[f32; 4]> {
    if !extent.contains(x, y) {
        return None;
    }
    Some(src.read(x, y))
}

/// 3x3 Sobel gradient magnitude per colour channel; alpha is forced opaque.
fn sobel(src: &Sampled<'_>, extent: Extent, x: i32, y: i32) -> Option<[f32; 4]> {
    if !extent.contains(x, y) {
        return None;
    }
    let tl = src.read(x - 1, y - 1);
    let t = src.read(x, y - 1);
    let tr = src.read(x + 1, y - 1);
    let l = src.read(x - 1, y);
    let r = src.read(x + 1, y);
    let bl = src.read(x - 1, y + 1);
    let b = src.read(x, y + 1);
    let br = src.read(x + 1, y + 1);

    let mut out = [0.0f32, 0.0, 0.0, 1.0];
    for c in 0..3 {
        let gx = -tl[c] - 2.0 * l[c] - bl[c] + tr[c] + 2.0 * r[c] + br[c];
        let gy = -tl[c] - 2.0 * t[c] - tr[c] + bl[c] + 2.0 * b[c] + br[c];
        out[c] = (gx * gx + gy * gy).sqrt().clamp(0.0, 1.0);
    }
    Some(out)
}
