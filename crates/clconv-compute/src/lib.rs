//! Compute-session lifecycle for one-shot accelerator image convolution.
//!
//! Selects a device, builds a kernel program, uploads an RGBA8 image,
//! dispatches the kernel over a tiled 2D range, waits for it and reads the
//! result back. Every device object is an owned handle, so any early return
//! tears the run down.
//!
//! # Architecture
//!
//! ```text
//! Orchestrator
//!     ├── device::select_device
//!     ├── ComputeSession (context, queue, program, kernel, sampler)
//!     ├── ImageBuffers (input / output images)
//!     └── dispatch (bind -> enqueue -> barrier -> readback)
//!             └── ComputeApi trait
//!                     ├── CpuBackend (host runtime, rayon)
//!                     └── OpenClBackend (opencl3, `opencl` feature)
//! ```
//!
//! # Example
//!
//! ```rust
//! use clconv_compute::{CpuBackend, Orchestrator, RunConfig};
//! use clconv_core::{DeviceClass, RgbaImage};
//!
//! let api = CpuBackend::new();
//! let config = RunConfig {
//!     entry: "identity".into(),
//!     device_class: DeviceClass::Accelerator,
//!     ..RunConfig::default()
//! };
//! let source = include_str!("../../../kernels/identity.cl");
//! let image = RgbaImage::filled(4, 4, [0, 0, 0, 255])?;
//!
//! let output = Orchestrator::from_config(&api, config).process(&image, source)?;
//! assert_eq!(output, image);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod backend;
pub mod buffers;
pub mod config;
pub mod device;
pub mod dispatch;
pub mod error;
pub mod orchestrator;
pub mod session;
pub mod tiling;

pub use backend::{
    describe_backends, detect_backends, select_best_backend, Backend, BackendInfo, ComputeApi, CpuBackend, DeviceInfo,
    FaultPoint, ObjectKind, ObjectLedger,
};
#[cfg(feature = "opencl")]
pub use backend::OpenClBackend;
pub use buffers::{check_format_support, create_sampler, ImageBuffers};
pub use config::RunConfig;
pub use device::{list_devices, select_device};
pub use dispatch::{bind_arguments, dispatch, CompletedDispatch, PendingDispatch};
pub use error::{ComputeError, ComputeResult, Stage};
pub use orchestrator::{host_float_pass, run_with_backend, Orchestrator, RunReport};
pub use session::ComputeSession;
pub use tiling::{compute_work_size, WorkSize};
