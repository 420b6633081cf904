//! Device image objects and the sampler.
//!
//! Only `RGBA / UnormInt8` images are used. The format is checked against the
//! device's capability table before anything is allocated; there is no
//! fallback format.

use clconv_core::{AccessMode, ImageFormat, RgbaImage, Status};
use tracing::{debug, trace, warn};

use crate::backend::{ComputeApi, ImageDesc, SamplerDesc};
use crate::error::{ComputeError, ComputeResult};
use crate::session::ComputeSession;

/// The one format every image object uses.
pub const IMAGE_FORMAT: ImageFormat = ImageFormat::RGBA8;

fn context<'s, A: ComputeApi>(session: &'s ComputeSession<'_, A>) -> ComputeResult<&'s A::Context> {
    session
        .context()
        .ok_or(ComputeError::AllocationFailure { status: Status::INVALID_CONTEXT })
}

/// Fails with [`ComputeError::ImageFormatUnsupported`] unless the device
/// supports images and lists [`IMAGE_FORMAT`] for both read-only and
/// write-only 2D images.
pub fn check_format_support<A: ComputeApi>(session: &ComputeSession<'_, A>) -> ComputeResult<()> {
    trace!("check_format_support");
    let unsupported = ComputeError::ImageFormatUnsupported { format: IMAGE_FORMAT };

    if !session.device_info().image_support {
        warn!("device has no image support");
        return Err(unsupported);
    }
    let context = context(session)?;
    for access in [AccessMode::ReadOnly, AccessMode::WriteOnly] {
        let formats = session.api().supported_formats(context, access).map_err(|status| {
            debug!(%status, %access, "format query failed");
            ComputeError::ImageFormatUnsupported { format: IMAGE_FORMAT }
        })?;
        if !formats.contains(&IMAGE_FORMAT) {
            warn!(%access, supported = formats.len(), "{IMAGE_FORMAT} not supported");
            return Err(unsupported);
        }
    }
    Ok(())
}

/// Read-only image initialised from `image`.
pub fn upload_input<A: ComputeApi>(session: &ComputeSession<'_, A>, image: &RgbaImage) -> Result<A::Image, Status> {
    let context = session.context().ok_or(Status::INVALID_CONTEXT)?;
    let desc = ImageDesc {
        width: image.width(),
        height: image.height(),
        format: IMAGE_FORMAT,
        access: AccessMode::ReadOnly,
    };
    session.api().create_image(context, &desc, Some(image.data()))
}

/// Uninitialised write-only image.
pub fn allocate_output<A: ComputeApi>(
    session: &ComputeSession<'_, A>,
    width: u32,
    height: u32,
) -> Result<A::Image, Status> {
    let context = session.context().ok_or(Status::INVALID_CONTEXT)?;
    let desc = ImageDesc {
        width,
        height,
        format: IMAGE_FORMAT,
        access: AccessMode::WriteOnly,
    };
    session.api().create_image(context, &desc, None)
}

/// Creates the clamp-to-edge, nearest, pixel-coordinate sampler and stores
/// it in the session. No-op if the session already has one.
pub fn create_sampler<A: ComputeApi>(session: &mut ComputeSession<'_, A>) -> ComputeResult<()> {
    trace!("create_sampler");
    if session.sampler().is_some() {
        return Ok(());
    }
    let context = session
        .context()
        .ok_or(ComputeError::SamplerCreationFailure { status: Status::INVALID_CONTEXT })?;
    let sampler = session
        .api()
        .create_sampler(context, &SamplerDesc::CLAMP_NEAREST)
        .map_err(|status| ComputeError::SamplerCreationFailure { status })?;
    session.store_sampler(sampler);
    Ok(())
}

/// Input and output images of one run.
///
/// Holds no borrow of the session; declare it after the session so it drops
/// first.
pub struct ImageBuffers<A: ComputeApi> {
    input: A::Image,
    output: A::Image,
    width: u32,
    height: u32,
}

impl<A: ComputeApi> ImageBuffers<A> {
    /// Checks format support, then allocates both images.
    ///
    /// Both allocations are attempted; if either fails, whichever succeeded
    /// is released and [`ComputeError::AllocationFailure`] carries the first
    /// failing status.
    pub fn allocate(session: &ComputeSession<'_, A>, image: &RgbaImage) -> ComputeResult<Self> {
        check_format_support(session)?;

        let (width, height) = image.dimensions();
        let input = upload_input(session, image);
        let output = allocate_output(session, width, height);

        match (input, output) {
            (Ok(input), Ok(output)) => {
                debug!(width, height, "image objects allocated");
                Ok(Self {
                    input,
                    output,
                    width,
                    height,
                })
            }
            (Err(status), _) | (Ok(_), Err(status)) => {
                warn!(%status, "image allocation failed");
                Err(ComputeError::AllocationFailure { status })
            }
        }
    }

    /// Read-only input image.
    pub fn input(&self) -> &A::Image {
        &self.input
    }

    /// Write-only output image.
    pub fn output(&self) -> &A::Image {
        &self.output
    }

    /// Image width.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Image height.
    pub fn height(&self) -> u32 {
        self.height
    }
}

impl<A: ComputeApi> Drop for ImageBuffers<A> {
    fn drop(&mut self) {
        debug!(width = self.width, height = self.height, "releasing image objects");
    }
}
