//! OpenCL backend over `opencl3`.
//!
//! Thin mapping of [`ComputeApi`] onto the OpenCL 1.2 host API. Handles are
//! the `opencl3` RAII wrappers, so dropping one releases the object. Failures
//! surface as the raw `cl_int` wrapped in [`Status`].

use std::ffi::c_void;
use std::fmt;
use std::ptr;

use opencl3::command_queue::CommandQueue;
use opencl3::context::Context;
use opencl3::device::{get_all_devices, Device, CL_DEVICE_TYPE_ACCELERATOR, CL_DEVICE_TYPE_CPU, CL_DEVICE_TYPE_GPU};
use opencl3::error_codes::ClError;
use opencl3::kernel::Kernel;
use opencl3::memory::{
    cl_image_desc, cl_image_format, ClMem, Image, CL_ARGB, CL_BGRA, CL_FLOAT, CL_HALF_FLOAT, CL_MEM_COPY_HOST_PTR,
    CL_MEM_OBJECT_IMAGE2D, CL_MEM_READ_ONLY, CL_MEM_WRITE_ONLY, CL_R, CL_RG, CL_RGBA, CL_UNORM_INT16,
    CL_UNORM_INT8, CL_UNSIGNED_INT8,
};
use opencl3::program::Program;
use opencl3::sampler::{
    Sampler, CL_ADDRESS_CLAMP, CL_ADDRESS_CLAMP_TO_EDGE, CL_ADDRESS_REPEAT, CL_FILTER_LINEAR, CL_FILTER_NEAREST,
};
use opencl3::types::{cl_bool, cl_device_type, cl_mem_flags, CL_BLOCKING, CL_FALSE, CL_TRUE};
use tracing::{debug, trace};

use clconv_core::{AccessMode, ChannelOrder, ChannelType, DeviceClass, ImageFormat, Status};

use super::{AddressingMode, ApiResult, ComputeApi, DeviceInfo, FilterMode, ImageDesc, KernelArg, SamplerDesc};

fn status(err: ClError) -> Status {
    Status(err.0)
}

fn device_type(class: DeviceClass) -> cl_device_type {
    match class {
        DeviceClass::Accelerator => CL_DEVICE_TYPE_GPU | CL_DEVICE_TYPE_ACCELERATOR,
        DeviceClass::GeneralPurpose => CL_DEVICE_TYPE_CPU,
    }
}

fn access_flags(access: AccessMode) -> cl_mem_flags {
    match access {
        AccessMode::ReadOnly => CL_MEM_READ_ONLY,
        AccessMode::WriteOnly => CL_MEM_WRITE_ONLY,
    }
}

fn to_cl_format(format: ImageFormat) -> cl_image_format {
    cl_image_format {
        image_channel_order: match format.channel_order {
            ChannelOrder::R => CL_R,
            ChannelOrder::Rg => CL_RG,
            ChannelOrder::Rgba => CL_RGBA,
            ChannelOrder::Bgra => CL_BGRA,
            ChannelOrder::Argb => CL_ARGB,
        },
        image_channel_data_type: match format.channel_type {
            ChannelType::UnormInt8 => CL_UNORM_INT8,
            ChannelType::UnormInt16 => CL_UNORM_INT16,
            ChannelType::UnsignedInt8 => CL_UNSIGNED_INT8,
            ChannelType::HalfFloat => CL_HALF_FLOAT,
            ChannelType::Float => CL_FLOAT,
        },
    }
}

fn from_cl_format(format: &cl_image_format) -> Option<ImageFormat> {
    let order = match format.image_channel_order {
        CL_R => ChannelOrder::R,
        CL_RG => ChannelOrder::Rg,
        CL_RGBA => ChannelOrder::Rgba,
        CL_BGRA => ChannelOrder::Bgra,
        CL_ARGB => ChannelOrder::Argb,
        _ => return None,
    };
    let ty = match format.image_channel_data_type {
        CL_UNORM_INT8 => ChannelType::UnormInt8,
        CL_UNORM_INT16 => ChannelType::UnormInt16,
        CL_UNSIGNED_INT8 => ChannelType::UnsignedInt8,
        CL_HALF_FLOAT => ChannelType::HalfFloat,
        CL_FLOAT => ChannelType::Float,
        _ => return None,
    };
    Some(ImageFormat::new(order, ty))
}

/// An OpenCL device together with the class it was enumerated under.
#[derive(Clone)]
pub struct ClDevice {
    device: Device,
    class: DeviceClass,
}

impl fmt::Debug for ClDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClDevice")
            .field("name", &self.device.name().unwrap_or_default().trim())
            .field("class", &self.class)
            .finish_non_exhaustive()
    }
}

/// OpenCL backend.
#[derive(Debug, Default)]
pub struct OpenClBackend;

impl OpenClBackend {
    /// Creates the backend. Device discovery happens per call.
    pub fn new() -> Self {
        Self
    }

    /// True if an OpenCL runtime reports at least one accelerator.
    pub fn is_available() -> bool {
        get_all_devices(device_type(DeviceClass::Accelerator))
            .map(|ids| !ids.is_empty())
            .unwrap_or(false)
    }
}

impl ComputeApi for OpenClBackend {
    type Device = ClDevice;
    type Context = Context;
    type Queue = CommandQueue;
    type Program = Program;
    type Kernel = Kernel;
    type Image = Image;
    type Sampler = Sampler;

    fn name(&self) -> &'static str {
        "opencl"
    }

    fn devices(&self, class: DeviceClass) -> ApiResult<Vec<ClDevice>> {
        let ids = match get_all_devices(device_type(class)) {
            Ok(ids) => ids,
            // no platform has a device of this type
            Err(e) if Status(e.0) == Status::DEVICE_NOT_FOUND => Vec::new(),
            Err(e) => return Err(status(e)),
        };
        Ok(ids
            .into_iter()
            .map(|id| ClDevice {
                device: Device::new(id),
                class,
            })
            .collect())
    }

    fn device_info(&self, device: &ClDevice) -> DeviceInfo {
        let d = &device.device;
        DeviceInfo {
            name: d.name().unwrap_or_default().trim().to_string(),
            vendor: d.vendor().unwrap_or_default().trim().to_string(),
            class: device.class,
            image_support: d.image_support().unwrap_or(false),
            max_work_group_size: d.max_work_group_size().unwrap_or(1),
        }
    }

    fn create_context(&self, device: &ClDevice) -> ApiResult<Context> {
        Context::from_device(&device.device).map_err(status)
    }

    fn create_queue(&self, context: &Context, _device: &ClDevice) -> ApiResult<CommandQueue> {
        // OpenCL 1.2 entry point, still the only one on some platforms
        #[allow(deprecated)]
        let queue = CommandQueue::create_default(context, 0).map_err(status)?;
        Ok(queue)
    }

    fn create_program(&self, context: &Context, source: &str) -> ApiResult<Program> {
        Program::create_from_source(context, source).map_err(status)
    }

    fn build_program(&self, program: &mut Program, device: &ClDevice) -> ApiResult<()> {
        program.build(&[device.device.id()], "").map_err(status)
    }

    fn build_log(&self, program: &Program, device: &ClDevice) -> String {
        program.get_build_log(device.device.id()).unwrap_or_default()
    }

    fn create_kernel(&self, program: &Program, name: &str) -> ApiResult<Kernel> {
        Kernel::create(program, name).map_err(status)
    }

    fn supported_formats(&self, context: &Context, access: AccessMode) -> ApiResult<Vec<ImageFormat>> {
        let formats = context
            .get_supported_image_formats(access_flags(access), CL_MEM_OBJECT_IMAGE2D)
            .map_err(status)?;
        Ok(formats.iter().filter_map(from_cl_format).collect())
    }

    fn create_image(&self, context: &Context, desc: &ImageDesc, host: Option<&[u8]>) -> ApiResult<Image> {
        let format = to_cl_format(desc.format);
        // SAFETY: all-zero is a valid cl_image_desc; the fields that matter
        // for a 2D image are set below.
        let mut image_desc: cl_image_desc = unsafe { std::mem::zeroed() };
        image_desc.image_type = CL_MEM_OBJECT_IMAGE2D;
        image_desc.image_width = desc.width as usize;
        image_desc.image_height = desc.height as usize;

        let mut flags = access_flags(desc.access);
        let host_ptr = match host {
            Some(bytes) => {
                let expected = desc.width as usize * desc.height as usize * desc.format.bytes_per_pixel();
                if bytes.len() != expected {
                    return Err(Status::INVALID_HOST_PTR);
                }
                flags |= CL_MEM_COPY_HOST_PTR;
                bytes.as_ptr() as *mut c_void
            }
            None => ptr::null_mut(),
        };

        trace!(width = desc.width, height = desc.height, access = ?desc.access, "clCreateImage");
        // SAFETY: with CL_MEM_COPY_HOST_PTR the runtime only reads `host_ptr`
        // during the call, and its length was checked against the descriptor.
        unsafe { Image::create(context, flags, &format, &image_desc, host_ptr) }.map_err(status)
    }

    fn create_sampler(&self, context: &Context, desc: &SamplerDesc) -> ApiResult<Sampler> {
        let normalized: cl_bool = if desc.normalized_coords { CL_TRUE } else { CL_FALSE };
        let addressing = match desc.addressing {
            AddressingMode::ClampToEdge => CL_ADDRESS_CLAMP_TO_EDGE,
            AddressingMode::Clamp => CL_ADDRESS_CLAMP,
            AddressingMode::Repeat => CL_ADDRESS_REPEAT,
        };
        let filter = match desc.filter {
            FilterMode::Nearest => CL_FILTER_NEAREST,
            FilterMode::Linear => CL_FILTER_LINEAR,
        };
        #[allow(deprecated)]
        let sampler = Sampler::create(context, normalized, addressing, filter).map_err(status)?;
        Ok(sampler)
    }

    fn set_arg(&self, kernel: &Kernel, index: u32, arg: KernelArg<'_, Self>) -> ApiResult<()> {
        // SAFETY: each value matches the size of the kernel parameter kind
        // (cl_mem, cl_sampler, cl_int).
        let result = unsafe {
            match arg {
                KernelArg::Image(image) => kernel.set_arg(index, &image.get()),
                KernelArg::Sampler(sampler) => kernel.set_arg(index, &sampler.get()),
                KernelArg::Int(v) => kernel.set_arg(index, &v),
            }
        };
        result.map_err(status)
    }

    fn enqueue_kernel(
        &self,
        queue: &CommandQueue,
        kernel: &Kernel,
        global: [usize; 2],
        local: [usize; 2],
    ) -> ApiResult<()> {
        // SAFETY: both work-size arrays have `work_dim` entries and outlive the call.
        let event = unsafe {
            queue.enqueue_nd_range_kernel(kernel.get(), 2, ptr::null(), global.as_ptr(), local.as_ptr(), &[])
        }
        .map_err(status)?;
        debug!(?global, ?local, "clEnqueueNDRangeKernel");
        drop(event);
        Ok(())
    }

    fn finish(&self, queue: &CommandQueue) -> ApiResult<()> {
        queue.finish().map_err(status)
    }

    fn read_image(
        &self,
        queue: &CommandQueue,
        image: &Image,
        width: u32,
        height: u32,
        out: &mut [u8],
    ) -> ApiResult<()> {
        if out.len() != width as usize * height as usize * 4 {
            return Err(Status::INVALID_VALUE);
        }
        let origin = [0usize; 3];
        let region = [width as usize, height as usize, 1];
        // SAFETY: blocking read into `out`, whose length matches the region.
        let event = unsafe {
            queue.enqueue_read_image(
                image,
                CL_BLOCKING,
                origin.as_ptr(),
                region.as_ptr(),
                0,
                0,
                out.as_mut_ptr() as *mut c_void,
                &[],
            )
        }
        .map_err(status)?;
        drop(event);
        Ok(())
    }
}
