//! One-shot run: load, upload, dispatch, read back, save.
//!
//! [`Orchestrator::run`] performs every stage exactly once and returns at the
//! first failure. The session and image objects are locals; their drop order
//! (images first, then the session in sampler..context order) is the teardown
//! on both the success and the failure path.

use std::path::PathBuf;

use clconv_core::{RgbaImage, Status};
use clconv_io::{create_codec, ImageCodec};
use tracing::{info, trace};

use crate::backend::{Backend, ComputeApi, CpuBackend};
use crate::buffers::{create_sampler, ImageBuffers};
use crate::config::RunConfig;
use crate::device::select_device;
use crate::dispatch::{bind_arguments, dispatch};
use crate::error::{ComputeError, ComputeResult};
use crate::session::ComputeSession;
use crate::tiling::WorkSize;

/// Outcome of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Backend that executed the kernel.
    pub backend: &'static str,
    /// Name of the selected device.
    pub device: String,
    /// Image width.
    pub width: u32,
    /// Image height.
    pub height: u32,
    /// Work size of the dispatch.
    pub work: WorkSize,
    /// Where the result was written.
    pub output: PathBuf,
}

/// Composes device selection, session, buffers and dispatch for one run.
pub struct Orchestrator<'a, A: ComputeApi> {
    api: &'a A,
    codec: Box<dyn ImageCodec>,
    config: RunConfig,
}

impl<'a, A: ComputeApi> Orchestrator<'a, A> {
    /// Orchestrator with an explicit codec.
    pub fn new(api: &'a A, codec: Box<dyn ImageCodec>, config: RunConfig) -> Self {
        Self { api, codec, config }
    }

    /// Orchestrator using the codec named by `config.codec`.
    pub fn from_config(api: &'a A, config: RunConfig) -> Self {
        let codec = create_codec(config.codec);
        Self::new(api, codec, config)
    }

    /// Run configuration.
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Loads `config.input`, filters it and saves `config.output`.
    pub fn run(&self) -> ComputeResult<RunReport> {
        let config = &self.config;
        config.validate()?;
        info!(
            backend = self.api.name(),
            input = %config.input.display(),
            kernel = %config.kernel_path.display(),
            entry = %config.entry,
            "starting run"
        );

        let device = select_device(self.api, config.device_class)?;
        let mut session = ComputeSession::new(self.api, device);
        session.create_context()?;
        session.create_queue()?;
        session.load_program(&config.kernel_path)?;
        session.create_kernel(&config.entry)?;

        let image = self.codec.load(&config.input)?;
        info!(width = image.width(), height = image.height(), codec = self.codec.name(), "input loaded");

        let (output, work) = self.execute(&mut session, &image)?;
        self.codec.save(&config.output, &output)?;
        info!(output = %config.output.display(), "output written");

        let report = RunReport {
            backend: self.api.name(),
            device: session.device_info().name,
            width: output.width(),
            height: output.height(),
            work,
            output: config.output.clone(),
        };
        session.release_all();
        Ok(report)
    }

    /// Filters `image` with kernel `config.entry` compiled from `source`,
    /// without touching the file system.
    pub fn process(&self, image: &RgbaImage, source: &str) -> ComputeResult<RgbaImage> {
        self.config.validate()?;
        let device = select_device(self.api, self.config.device_class)?;
        let mut session = ComputeSession::open(self.api, device, source, &self.config.entry)?;
        let (output, _work) = self.execute(&mut session, image)?;
        Ok(output)
    }

    /// Buffers, sampler, binding, dispatch, barrier and readback on an open
    /// session. The image objects are released before returning.
    fn execute(&self, session: &mut ComputeSession<'a, A>, image: &RgbaImage) -> ComputeResult<(RgbaImage, WorkSize)> {
        let (width, height) = image.dimensions();
        let (output, work) = {
            let buffers = ImageBuffers::allocate(session, image)?;
            create_sampler(session)?;
            bind_arguments(session, &buffers)?;

            let work = WorkSize::new(width, height, self.config.local_size);
            let done = dispatch(session, work)?.await_completion()?;
            (done.readback(buffers.output(), width, height)?, work)
        };

        let output = if self.config.host_float {
            host_float_pass(&output)?
        } else {
            output
        };
        Ok((output, work))
    }
}

/// Normalizes every sample to `[0, 1]` and converts back. Lossless for
/// 8-bit data.
pub fn host_float_pass(image: &RgbaImage) -> ComputeResult<RgbaImage> {
    trace!("host float pass");
    let samples = image.to_normalized();
    RgbaImage::from_normalized(image.width(), image.height(), &samples)
        .map_err(|_| ComputeError::ReadbackFailure { status: Status::INVALID_VALUE })
}

/// Runs `config` on the backend it names, resolving `Auto`.
pub fn run_with_backend(config: RunConfig) -> ComputeResult<RunReport> {
    match config.backend.resolve() {
        Backend::OpenCl => run_opencl(config),
        Backend::Cpu | Backend::Auto => {
            let api = CpuBackend::new();
            Orchestrator::from_config(&api, config).run()
        }
    }
}

#[cfg(feature = "opencl")]
fn run_opencl(config: RunConfig) -> ComputeResult<RunReport> {
    let api = crate::backend::OpenClBackend::new();
    Orchestrator::from_config(&api, config).run()
}

#[cfg(not(feature = "opencl"))]
fn run_opencl(_config: RunConfig) -> ComputeResult<RunReport> {
    Err(ComputeError::Config("built without the `opencl` feature".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_float_pass_lossless() {
        let data: Vec<u8> = (0..=255).collect();
        let image = RgbaImage::from_raw(8, 8, data).unwrap();
        assert_eq!(host_float_pass(&image).unwrap(), image);
    }
}
