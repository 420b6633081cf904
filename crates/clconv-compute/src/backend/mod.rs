//! Device API backends.
//!
//! [`ComputeApi`] is the seam between the session lifecycle and a concrete
//! device runtime. It mirrors the OpenCL host object model: every handle is an
//! owned value and dropping it releases the underlying object.
//!
//! - [`CpuBackend`] - in-process host runtime, always available
//! - `OpenClBackend` - real devices via `opencl3` (`opencl` feature)

mod cpu_backend;
mod detect;
mod host_compiler;
mod host_kernels;
mod ledger;

#[cfg(feature = "opencl")]
mod opencl_backend;

pub use cpu_backend::{CpuBackend, CpuBackendBuilder, CpuDevice, FaultPoint};
pub use detect::{describe_backends, detect_backends, select_best_backend, BackendInfo};
pub use ledger::{ObjectKind, ObjectLedger};

#[cfg(feature = "opencl")]
pub use opencl_backend::{ClDevice, OpenClBackend};

use std::fmt;

use clconv_core::{AccessMode, DeviceClass, ImageFormat, Status};
use serde::{Deserialize, Serialize};

/// Result of a raw device API call.
pub type ApiResult<T> = Result<T, Status>;

/// Runtime a run is executed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Backend {
    /// Whatever [`select_best_backend`] picks at run time.
    #[default]
    Auto,
    /// [`CpuBackend`], always compiled in.
    Cpu,
    /// Installed OpenCL platforms; needs the `opencl` feature.
    #[serde(rename = "opencl")]
    OpenCl,
}

impl Backend {
    /// `false` only for OpenCL when the feature is off or no platform
    /// reports a device.
    pub fn is_available(&self) -> bool {
        match self {
            Self::Auto | Self::Cpu => true,
            #[cfg(feature = "opencl")]
            Self::OpenCl => OpenClBackend::is_available(),
            #[cfg(not(feature = "opencl"))]
            Self::OpenCl => false,
        }
    }

    /// Resolves `Auto` to a concrete backend.
    pub fn resolve(self) -> Self {
        match self {
            Self::Auto => select_best_backend(),
            other => other,
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Cpu => write!(f, "cpu"),
            Self::OpenCl => write!(f, "opencl"),
        }
    }
}

impl std::str::FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "cpu" | "host" => Ok(Self::Cpu),
            "opencl" | "cl" => Ok(Self::OpenCl),
            other => Err(format!("unknown backend: {other}")),
        }
    }
}

/// Static description of a device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Human-readable device name.
    pub name: String,
    /// Vendor string.
    pub vendor: String,
    /// Device class.
    pub class: DeviceClass,
    /// Whether the device supports image objects at all.
    pub image_support: bool,
    /// Maximum work-group size (product of local dimensions).
    pub max_work_group_size: usize,
}

/// Sampler addressing mode for out-of-range coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressingMode {
    /// Clamp to the nearest edge pixel.
    ClampToEdge,
    /// Out-of-range reads return the border colour.
    Clamp,
    /// Wrap around (normalized coordinates only).
    Repeat,
}

/// Sampler filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterMode {
    /// Nearest texel.
    Nearest,
    /// Bilinear blend.
    Linear,
}

/// Sampler configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SamplerDesc {
    /// Coordinates in `[0, 1]` instead of pixels.
    pub normalized_coords: bool,
    /// Addressing mode.
    pub addressing: AddressingMode,
    /// Filter mode.
    pub filter: FilterMode,
}

impl SamplerDesc {
    /// Pixel coordinates, clamp-to-edge, nearest. The only sampler the
    /// pipeline creates: it resolves every read outside the canvas to the
    /// nearest edge pixel.
    pub const CLAMP_NEAREST: Self = Self {
        normalized_coords: false,
        addressing: AddressingMode::ClampToEdge,
        filter: FilterMode::Nearest,
    };
}

/// 2D device image description.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageDesc {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Channel format.
    pub format: ImageFormat,
    /// Kernel access.
    pub access: AccessMode,
}

/// A kernel argument value.
pub enum KernelArg<'a, A: ComputeApi + ?Sized> {
    /// Image object.
    Image(&'a A::Image),
    /// Sampler object.
    Sampler(&'a A::Sampler),
    /// 32-bit signed integer.
    Int(i32),
}

impl<A: ComputeApi + ?Sized> fmt::Debug for KernelArg<'_, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Image(_) => write!(f, "Image"),
            Self::Sampler(_) => write!(f, "Sampler"),
            Self::Int(v) => write!(f, "Int({v})"),
        }
    }
}

/// Host-side device API.
///
/// Every `create_*` returns an owned handle; dropping the handle releases the
/// object. Failures are reported as raw [`Status`] codes and classified into
/// stage errors by the session layer.
pub trait ComputeApi {
    /// Device identifier.
    type Device: Clone + fmt::Debug;
    /// Compute context.
    type Context;
    /// Command queue.
    type Queue;
    /// Program object.
    type Program;
    /// Kernel object.
    type Kernel;
    /// 2D image object.
    type Image;
    /// Sampler object.
    type Sampler;

    /// Backend name.
    fn name(&self) -> &'static str;

    /// Devices of the requested class, in driver order. Empty when none exist.
    fn devices(&self, class: DeviceClass) -> ApiResult<Vec<Self::Device>>;

    /// Static device description.
    fn device_info(&self, device: &Self::Device) -> DeviceInfo;

    /// Creates a context on `device`.
    fn create_context(&self, device: &Self::Device) -> ApiResult<Self::Context>;

    /// Creates an in-order command queue.
    fn create_queue(&self, context: &Self::Context, device: &Self::Device) -> ApiResult<Self::Queue>;

    /// Creates an unbuilt program from source text.
    fn create_program(&self, context: &Self::Context, source: &str) -> ApiResult<Self::Program>;

    /// Compiles and links the program for `device`.
    fn build_program(&self, program: &mut Self::Program, device: &Self::Device) -> ApiResult<()>;

    /// Build log of the last build for `device`.
    fn build_log(&self, program: &Self::Program, device: &Self::Device) -> String;

    /// Looks up a kernel entry point in a built program.
    fn create_kernel(&self, program: &Self::Program, name: &str) -> ApiResult<Self::Kernel>;

    /// 2D image formats the context supports for `access`.
    fn supported_formats(&self, context: &Self::Context, access: AccessMode) -> ApiResult<Vec<ImageFormat>>;

    /// Allocates a 2D image, copying `host` into it when given.
    fn create_image(&self, context: &Self::Context, desc: &ImageDesc, host: Option<&[u8]>) -> ApiResult<Self::Image>;

    /// Creates a sampler.
    fn create_sampler(&self, context: &Self::Context, desc: &SamplerDesc) -> ApiResult<Self::Sampler>;

    /// Binds argument `index` of `kernel`.
    fn set_arg(&self, kernel: &Self::Kernel, index: u32, arg: KernelArg<'_, Self>) -> ApiResult<()>;

    /// Enqueues a 2D range. Returns before the work has run.
    fn enqueue_kernel(
        &self,
        queue: &Self::Queue,
        kernel: &Self::Kernel,
        global: [usize; 2],
        local: [usize; 2],
    ) -> ApiResult<()>;

    /// Blocks until all work enqueued on `queue` has finished.
    fn finish(&self, queue: &Self::Queue) -> ApiResult<()>;

    /// Blocking read of region `(0, 0)-(width, height)` into `out`.
    fn read_image(
        &self,
        queue: &Self::Queue,
        image: &Self::Image,
        width: u32,
        height: u32,
        out: &mut [u8],
    ) -> ApiResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_parse() {
        assert_eq!("CPU".parse::<Backend>().unwrap(), Backend::Cpu);
        assert_eq!("opencl".parse::<Backend>().unwrap(), Backend::OpenCl);
        assert!("cuda".parse::<Backend>().is_err());
    }

    #[test]
    fn test_cpu_always_available() {
        assert!(Backend::Cpu.is_available());
        assert!(Backend::Auto.is_available());
    }
}
