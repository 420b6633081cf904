//! Argument binding, dispatch, completion barrier and readback.
//!
//! Dispatch returns a [`PendingDispatch`] that borrows the session. The only
//! way to reach [`CompletedDispatch::readback`] is through
//! [`PendingDispatch::await_completion`], so output memory cannot be read
//! before the barrier.

use clconv_core::{RgbaImage, Status};
use tracing::{debug, info, trace};

use crate::backend::{ComputeApi, KernelArg};
use crate::buffers::ImageBuffers;
use crate::error::{ComputeError, ComputeResult};
use crate::session::ComputeSession;
use crate::tiling::WorkSize;

/// Number of kernel arguments in the filter signature.
pub const ARG_COUNT: u32 = 5;

fn dimension_arg(value: u32) -> Result<i32, Status> {
    i32::try_from(value).map_err(|_| Status::INVALID_ARG_VALUE)
}

/// Binds `(input, output, sampler, width, height)` at indices 0..=4.
///
/// Every index is attempted; the error names the first one that failed.
pub fn bind_arguments<A: ComputeApi>(session: &ComputeSession<'_, A>, buffers: &ImageBuffers<A>) -> ComputeResult<()> {
    trace!("bind_arguments");
    let api = session.api();
    let kernel = session.kernel().ok_or(ComputeError::ArgBindFailure {
        index: 0,
        status: Status::INVALID_KERNEL,
    })?;

    let results: [Result<(), Status>; ARG_COUNT as usize] = [
        api.set_arg(kernel, 0, KernelArg::Image(buffers.input())),
        api.set_arg(kernel, 1, KernelArg::Image(buffers.output())),
        match session.sampler() {
            Some(sampler) => api.set_arg(kernel, 2, KernelArg::Sampler(sampler)),
            None => Err(Status::INVALID_SAMPLER),
        },
        dimension_arg(buffers.width()).and_then(|w| api.set_arg(kernel, 3, KernelArg::Int(w))),
        dimension_arg(buffers.height()).and_then(|h| api.set_arg(kernel, 4, KernelArg::Int(h))),
    ];

    match results.iter().enumerate().find_map(|(i, r)| r.err().map(|s| (i, s))) {
        Some((index, status)) => Err(ComputeError::ArgBindFailure {
            index: index as u32,
            status,
        }),
        None => {
            debug!(count = ARG_COUNT, "kernel arguments bound");
            Ok(())
        }
    }
}

/// Enqueues the kernel over `work`. Returns before the work has run.
pub fn dispatch<'s, 'a, A: ComputeApi>(
    session: &'s ComputeSession<'a, A>,
    work: WorkSize,
) -> ComputeResult<PendingDispatch<'s, 'a, A>> {
    trace!(global = ?work.global, local = ?work.local, "dispatch");
    let queue = session.queue().ok_or(ComputeError::DispatchFailure {
        status: Status::INVALID_COMMAND_QUEUE,
    })?;
    let kernel = session.kernel().ok_or(ComputeError::DispatchFailure {
        status: Status::INVALID_KERNEL,
    })?;
    session
        .api()
        .enqueue_kernel(queue, kernel, work.global, work.local)
        .map_err(|status| ComputeError::DispatchFailure { status })?;
    Ok(PendingDispatch { session, work })
}

/// Enqueued work that has not been waited on.
#[must_use = "the dispatch must be awaited before its output can be read"]
pub struct PendingDispatch<'s, 'a, A: ComputeApi> {
    session: &'s ComputeSession<'a, A>,
    work: WorkSize,
}

impl<'s, 'a, A: ComputeApi> PendingDispatch<'s, 'a, A> {
    /// Work size the kernel was enqueued with.
    pub fn work(&self) -> WorkSize {
        self.work
    }

    /// Blocks until all enqueued work has finished.
    pub fn await_completion(self) -> ComputeResult<CompletedDispatch<'s, 'a, A>> {
        let queue = self.session.queue().ok_or(ComputeError::DispatchFailure {
            status: Status::INVALID_COMMAND_QUEUE,
        })?;
        self.session
            .api()
            .finish(queue)
            .map_err(|status| ComputeError::DispatchFailure { status })?;
        info!(global = ?self.work.global, "dispatch complete");
        Ok(CompletedDispatch {
            session: self.session,
            work: self.work,
        })
    }
}

/// Finished work whose output may be read.
pub struct CompletedDispatch<'s, 'a, A: ComputeApi> {
    session: &'s ComputeSession<'a, A>,
    work: WorkSize,
}

impl<A: ComputeApi> CompletedDispatch<'_, '_, A> {
    /// Work size the kernel ran with.
    pub fn work(&self) -> WorkSize {
        self.work
    }

    /// Copies region `(0, 0)-(width, height)` of `output` to the host.
    pub fn readback(&self, output: &A::Image, width: u32, height: u32) -> ComputeResult<RgbaImage> {
        trace!(width, height, "readback");
        let queue = self.session.queue().ok_or(ComputeError::ReadbackFailure {
            status: Status::INVALID_COMMAND_QUEUE,
        })?;
        let len = RgbaImage::byte_len(width, height).map_err(|_| ComputeError::ReadbackFailure {
            status: Status::INVALID_VALUE,
        })?;
        let mut data = vec![0u8; len];
        self.session
            .api()
            .read_image(queue, output, width, height, &mut data)
            .map_err(|status| ComputeError::ReadbackFailure { status })?;
        RgbaImage::from_raw(width, height, data).map_err(|_| ComputeError::ReadbackFailure {
            status: Status::INVALID_VALUE,
        })
    }
}
