//! Compute session lifecycle.
//!
//! A [`ComputeSession`] owns the per-run device objects: context, command
//! queue, program, kernel and sampler. They are created in that order and
//! released in reverse (sampler first, context last) by
//! [`ComputeSession::release_all`], which `Drop` also runs. Release is
//! idempotent and works on partially built sessions, so any `?` in the
//! middle of setup leaves nothing behind.
//!
//! Image objects live outside the session (see [`crate::buffers`]) and must
//! be dropped before it.

use std::fs;
use std::path::Path;

use clconv_core::Status;
use tracing::{debug, error, info, trace};

use crate::backend::{ComputeApi, DeviceInfo};
use crate::error::{ComputeError, ComputeResult};

/// Device objects of one run.
pub struct ComputeSession<'a, A: ComputeApi> {
    api: &'a A,
    device: A::Device,
    context: Option<A::Context>,
    queue: Option<A::Queue>,
    program: Option<A::Program>,
    kernel: Option<A::Kernel>,
    sampler: Option<A::Sampler>,
    entry: Option<String>,
}

impl<'a, A: ComputeApi> ComputeSession<'a, A> {
    /// Empty session bound to `device`.
    pub fn new(api: &'a A, device: A::Device) -> Self {
        Self {
            api,
            device,
            context: None,
            queue: None,
            program: None,
            kernel: None,
            sampler: None,
            entry: None,
        }
    }

    /// Context, queue, program built from `source`, and kernel `entry`.
    pub fn open(api: &'a A, device: A::Device, source: &str, entry: &str) -> ComputeResult<Self> {
        let mut session = Self::new(api, device);
        session.create_context()?;
        session.create_queue()?;
        session.compile_program(source)?;
        session.create_kernel(entry)?;
        Ok(session)
    }

    /// Creates the context. No-op if it already exists.
    pub fn create_context(&mut self) -> ComputeResult<()> {
        trace!("create_context");
        if self.context.is_some() {
            return Ok(());
        }
        let context = self
            .api
            .create_context(&self.device)
            .map_err(|status| ComputeError::ContextCreationFailure { status })?;
        self.context = Some(context);
        Ok(())
    }

    /// Creates the in-order command queue. Requires a context.
    pub fn create_queue(&mut self) -> ComputeResult<()> {
        trace!("create_queue");
        if self.queue.is_some() {
            return Ok(());
        }
        let context = self.context.as_ref().ok_or(ComputeError::QueueCreationFailure {
            status: Status::INVALID_CONTEXT,
        })?;
        let queue = self
            .api
            .create_queue(context, &self.device)
            .map_err(|status| ComputeError::QueueCreationFailure { status })?;
        self.queue = Some(queue);
        Ok(())
    }

    /// Creates a program from `source` and builds it for the session device.
    ///
    /// On build failure the compiler log is logged and returned in
    /// [`ComputeError::BuildFailure`]; the failed program is released.
    pub fn compile_program(&mut self, source: &str) -> ComputeResult<()> {
        trace!(bytes = source.len(), "compile_program");
        if self.program.is_some() {
            return Ok(());
        }
        let context = self.context.as_ref().ok_or(ComputeError::BuildFailure {
            status: Status::INVALID_CONTEXT,
            log: String::new(),
        })?;
        let mut program = self
            .api
            .create_program(context, source)
            .map_err(|status| ComputeError::BuildFailure { status, log: String::new() })?;

        if let Err(status) = self.api.build_program(&mut program, &self.device) {
            let log = self.api.build_log(&program, &self.device);
            error!(%status, "program build failed:\n{log}");
            return Err(ComputeError::BuildFailure { status, log });
        }

        debug!("program built");
        self.program = Some(program);
        Ok(())
    }

    /// Reads kernel source from `path` and compiles it.
    pub fn load_program(&mut self, path: impl AsRef<Path>) -> ComputeResult<()> {
        let path = path.as_ref();
        trace!(path = %path.display(), "load_program");
        let source = fs::read_to_string(path).map_err(|source| ComputeError::ProgramLoadFailure {
            path: path.to_path_buf(),
            source,
        })?;
        self.compile_program(&source)
    }

    /// Looks up the kernel `entry` in the built program.
    pub fn create_kernel(&mut self, entry: &str) -> ComputeResult<()> {
        trace!(entry, "create_kernel");
        if self.kernel.is_some() && self.entry.as_deref() == Some(entry) {
            return Ok(());
        }
        let program = self.program.as_ref().ok_or_else(|| ComputeError::KernelCreationFailure {
            name: entry.to_owned(),
            status: Status::INVALID_PROGRAM_EXECUTABLE,
        })?;
        let kernel = self
            .api
            .create_kernel(program, entry)
            .map_err(|status| ComputeError::KernelCreationFailure {
                name: entry.to_owned(),
                status,
            })?;
        self.kernel = Some(kernel);
        self.entry = Some(entry.to_owned());
        Ok(())
    }

    /// Releases sampler, kernel, program, queue and context, in that order.
    /// Safe to call any number of times.
    pub fn release_all(&mut self) {
        let mut released = 0;
        if self.sampler.take().is_some() {
            released += 1;
        }
        if self.kernel.take().is_some() {
            released += 1;
        }
        if self.program.take().is_some() {
            released += 1;
        }
        if self.queue.take().is_some() {
            released += 1;
        }
        if self.context.take().is_some() {
            released += 1;
        }
        self.entry = None;
        if released > 0 {
            info!(released, "session released");
        }
    }

    /// Device API.
    pub fn api(&self) -> &'a A {
        self.api
    }

    /// Session device.
    pub fn device(&self) -> &A::Device {
        &self.device
    }

    /// Description of the session device.
    pub fn device_info(&self) -> DeviceInfo {
        self.api.device_info(&self.device)
    }

    /// Context, once created.
    pub fn context(&self) -> Option<&A::Context> {
        self.context.as_ref()
    }

    /// Command queue, once created.
    pub fn queue(&self) -> Option<&A::Queue> {
        self.queue.as_ref()
    }

    /// Built program.
    pub fn program(&self) -> Option<&A::Program> {
        self.program.as_ref()
    }

    /// Kernel.
    pub fn kernel(&self) -> Option<&A::Kernel> {
        self.kernel.as_ref()
    }

    /// Kernel entry name.
    pub fn entry(&self) -> Option<&str> {
        self.entry.as_deref()
    }

    /// Sampler, once created.
    pub fn sampler(&self) -> Option<&A::Sampler> {
        self.sampler.as_ref()
    }

    /// True once every object up to the kernel exists.
    pub fn is_ready(&self) -> bool {
        self.context.is_some() && self.queue.is_some() && self.program.is_some() && self.kernel.is_some()
    }

    pub(crate) fn store_sampler(&mut self, sampler: A::Sampler) {
        self.sampler = Some(sampler);
    }
}

impl<A: ComputeApi> Drop for ComputeSession<'_, A> {
    fn drop(&mut self) {
        self.release_all();
    }
}
