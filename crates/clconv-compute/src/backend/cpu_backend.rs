//! In-process host runtime.
//!
//! Emulates the device object model on the CPU: handles with owned lifetimes,
//! a per-device image format table, program builds with diagnostic logs, an
//! in-order queue whose work only runs at the completion barrier, and
//! sampler-mediated image reads. A kernel is created only when its definition
//! matches one of the host implementations in `host_kernels` token for token;
//! any other body is rejected with `CL_INVALID_KERNEL_NAME`.
//!
//! Built with [`CpuBackend::builder`], the runtime can hide device classes,
//! drop image support, or fail any individual call with a chosen status.
//! Every handle is recorded in an [`ObjectLedger`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use rayon::prelude::*;
use tracing::{debug, trace, warn};

use clconv_core::{pixel, AccessMode, ChannelOrder, ChannelType, DeviceClass, ImageFormat, Status};

use super::host_compiler::{self, KernelDecl};
use super::host_kernels::{self, Extent, HostKernel, ParamKind, Sampled};
use super::ledger::{LiveToken, ObjectKind, ObjectLedger};
use super::{ApiResult, ComputeApi, DeviceInfo, FilterMode, ImageDesc, KernelArg, SamplerDesc};

const MAX_WORK_GROUP_SIZE: usize = 256;
const MAX_IMAGE_DIM: u32 = 16384;

/// Call sites where a failure can be injected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultPoint {
    DeviceQuery,
    CreateContext,
    CreateQueue,
    CreateProgram,
    CreateKernel,
    SupportedFormats,
    CreateImage(AccessMode),
    CreateSampler,
    SetArg(u32),
    Enqueue,
    Finish,
    ReadImage,
}

/// A host runtime device.
#[derive(Debug, Clone)]
pub struct CpuDevice {
    info: DeviceInfo,
    formats: Arc<Vec<ImageFormat>>,
}

impl CpuDevice {
    /// Device description.
    pub fn info(&self) -> &DeviceInfo {
        &self.info
    }
}

/// Context handle.
pub struct CpuContext {
    device: CpuDevice,
    _live: LiveToken,
}

/// In-order queue handle. Enqueued ranges run at [`ComputeApi::finish`].
pub struct CpuQueue {
    pending: Mutex<Vec<Launch>>,
    _live: LiveToken,
}

/// Program handle.
pub struct CpuProgram {
    source: String,
    build: Option<Result<Vec<KernelDecl>, String>>,
    _live: LiveToken,
}

/// Kernel handle with its bound arguments.
pub struct CpuKernel {
    decl: KernelDecl,
    host: HostKernel,
    args: Mutex<Vec<Option<BoundArg>>>,
    _live: LiveToken,
}

/// Image handle.
pub struct CpuImage {
    store: Arc<ImageStore>,
    _live: LiveToken,
}

/// Sampler handle.
pub struct CpuSampler {
    desc: SamplerDesc,
    _live: LiveToken,
}

struct ImageStore {
    width: u32,
    height: u32,
    data: Mutex<Vec<u8>>,
}

#[derive(Clone)]
enum BoundArg {
    Image(Arc<ImageStore>),
    Sampler(SamplerDesc),
    Int(i32),
}

struct Launch {
    host: HostKernel,
    args: Vec<BoundArg>,
    global: [usize; 2],
}

/// Host runtime backend.
pub struct CpuBackend {
    devices: Vec<CpuDevice>,
    faults: HashMap<FaultPoint, Status>,
    ledger: Arc<ObjectLedger>,
}

impl CpuBackend {
    /// One accelerator and one general-purpose device, both image-capable.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Configurable runtime.
    pub fn builder() -> CpuBackendBuilder {
        CpuBackendBuilder::default()
    }

    /// Object accounting for every handle this backend created.
    pub fn ledger(&self) -> &ObjectLedger {
        &self.ledger
    }

    fn fault(&self, point: FaultPoint) -> ApiResult<()> {
        match self.faults.get(&point) {
            Some(&status) => {
                debug!(?point, %status, "injected fault");
                Err(status)
            }
            None => Ok(()),
        }
    }
}

impl Default for CpuBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for [`CpuBackend`].
#[derive(Debug, Clone)]
pub struct CpuBackendBuilder {
    classes: Vec<DeviceClass>,
    image_support: bool,
    formats: Vec<ImageFormat>,
    faults: HashMap<FaultPoint, Status>,
}

impl Default for CpuBackendBuilder {
    fn default() -> Self {
        Self {
            classes: vec![DeviceClass::Accelerator, DeviceClass::GeneralPurpose],
            image_support: true,
            formats: vec![
                ImageFormat::RGBA8,
                ImageFormat::new(ChannelOrder::Bgra, ChannelType::UnormInt8),
                ImageFormat::new(ChannelOrder::Rgba, ChannelType::Float),
                ImageFormat::new(ChannelOrder::R, ChannelType::Float),
            ],
            faults: HashMap::new(),
        }
    }
}

impl CpuBackendBuilder {
    /// Only expose devices of these classes.
    pub fn devices(mut self, classes: &[DeviceClass]) -> Self {
        self.classes = classes.to_vec();
        self
    }

    /// Report no image support at all.
    pub fn without_image_support(mut self) -> Self {
        self.image_support = false;
        self
    }

    /// Replace the supported image format table.
    pub fn formats(mut self, formats: Vec<ImageFormat>) -> Self {
        self.formats = formats;
        self
    }

    /// Fail `point` with `status`.
    pub fn fail(mut self, point: FaultPoint, status: Status) -> Self {
        self.faults.insert(point, status);
        self
    }

    /// Builds the runtime.
    pub fn build(self) -> CpuBackend {
        let formats = Arc::new(if self.image_support { self.formats } else { Vec::new() });
        let devices = self
            .classes
            .iter()
            .map(|&class| CpuDevice {
                info: DeviceInfo {
                    name: match class {
                        DeviceClass::Accelerator => "clconv host accelerator".into(),
                        DeviceClass::GeneralPurpose => "clconv host processor".into(),
                    },
                    vendor: "clconv".into(),
                    class,
                    image_support: self.image_support,
                    max_work_group_size: MAX_WORK_GROUP_SIZE,
                },
                formats: Arc::clone(&formats),
            })
            .collect();

        CpuBackend {
            devices,
            faults: self.faults,
            ledger: Arc::new(ObjectLedger::default()),
        }
    }
}

impl ComputeApi for CpuBackend {
    type Device = CpuDevice;
    type Context = CpuContext;
    type Queue = CpuQueue;
    type Program = CpuProgram;
    type Kernel = CpuKernel;
    type Image = CpuImage;
    type Sampler = CpuSampler;

    fn name(&self) -> &'static str {
        "cpu"
    }

    fn devices(&self, class: DeviceClass) -> ApiResult<Vec<CpuDevice>> {
        self.fault(FaultPoint::DeviceQuery)?;
        Ok(self.devices.iter().filter(|d| d.info.class == class).cloned().collect())
    }

    fn device_info(&self, device: &CpuDevice) -> DeviceInfo {
        device.info.clone()
    }

    fn create_context(&self, device: &CpuDevice) -> ApiResult<CpuContext> {
        self.fault(FaultPoint::CreateContext)?;
        Ok(CpuContext {
            device: device.clone(),
            _live: self.ledger.issue(ObjectKind::Context),
        })
    }

    fn create_queue(&self, context: &CpuContext, device: &CpuDevice) -> ApiResult<CpuQueue> {
        self.fault(FaultPoint::CreateQueue)?;
        if context.device.info != device.info {
            return Err(Status::INVALID_DEVICE);
        }
        Ok(CpuQueue {
            pending: Mutex::new(Vec::new()),
            _live: self.ledger.issue(ObjectKind::Queue),
        })
    }

    fn create_program(&self, _context: &CpuContext, source: &str) -> ApiResult<CpuProgram> {
        self.fault(FaultPoint::CreateProgram)?;
        if source.trim().is_empty() {
            return Err(Status::INVALID_VALUE);
        }
        Ok(CpuProgram {
            source: source.to_owned(),
            build: None,
            _live: self.ledger.issue(ObjectKind::Program),
        })
    }

    fn build_program(&self, program: &mut CpuProgram, _device: &CpuDevice) -> ApiResult<()> {
        let result = host_compiler::compile(&program.source);
        let status = match &result {
            Ok(kernels) => {
                trace!(kernels = kernels.len(), "host build succeeded");
                Ok(())
            }
            Err(_) => Err(Status::BUILD_PROGRAM_FAILURE),
        };
        program.build = Some(result);
        status
    }

    fn build_log(&self, program: &CpuProgram, _device: &CpuDevice) -> String {
        match &program.build {
            Some(Err(log)) => log.clone(),
            Some(Ok(_)) | None => String::new(),
        }
    }

    fn create_kernel(&self, program: &CpuProgram, name: &str) -> ApiResult<CpuKernel> {
        self.fault(FaultPoint::CreateKernel)?;
        let kernels = match &program.build {
            Some(Ok(kernels)) => kernels,
            _ => return Err(Status::INVALID_PROGRAM_EXECUTABLE),
        };
        let decl = kernels
            .iter()
            .find(|k| k.name == name)
            .cloned()
            .ok_or(Status::INVALID_KERNEL_NAME)?;
        let host = host_kernels::lookup(name).ok_or(Status::INVALID_KERNEL_NAME)?;
        if !host.implements(&decl) {
            warn!(kernel = name, "kernel body differs from the host implementation of '{name}'");
            return Err(Status::INVALID_KERNEL_NAME);
        }

        let args = Mutex::new(vec![None; decl.params.len()]);
        Ok(CpuKernel {
            decl,
            host,
            args,
            _live: self.ledger.issue(ObjectKind::Kernel),
        })
    }

    fn supported_formats(&self, context: &CpuContext, _access: AccessMode) -> ApiResult<Vec<ImageFormat>> {
        self.fault(FaultPoint::SupportedFormats)?;
        Ok(context.device.formats.as_ref().clone())
    }

    fn create_image(&self, context: &CpuContext, desc: &ImageDesc, host: Option<&[u8]>) -> ApiResult<CpuImage> {
        self.fault(FaultPoint::CreateImage(desc.access))?;
        if !context.device.formats.contains(&desc.format) {
            return Err(Status::IMAGE_FORMAT_NOT_SUPPORTED);
        }
        if desc.width == 0 || desc.height == 0 || desc.width > MAX_IMAGE_DIM || desc.height > MAX_IMAGE_DIM {
            return Err(Status::INVALID_IMAGE_SIZE);
        }
        if desc.format != ImageFormat::RGBA8 {
            // the host runtime stores RGBA8 texels only
            return Err(Status::IMAGE_FORMAT_NOT_SUPPORTED);
        }

        let len = desc.width as usize * desc.height as usize * desc.format.bytes_per_pixel();
        let data = match host {
            Some(bytes) if bytes.len() != len => return Err(Status::INVALID_HOST_PTR),
            Some(bytes) => bytes.to_vec(),
            None => vec![0; len],
        };

        Ok(CpuImage {
            store: Arc::new(ImageStore {
                width: desc.width,
                height: desc.height,
                data: Mutex::new(data),
            }),
            _live: self.ledger.issue(ObjectKind::Image),
        })
    }

    fn create_sampler(&self, _context: &CpuContext, desc: &SamplerDesc) -> ApiResult<CpuSampler> {
        self.fault(FaultPoint::CreateSampler)?;
        if desc.normalized_coords || desc.filter != FilterMode::Nearest {
            return Err(Status::INVALID_VALUE);
        }
        Ok(CpuSampler {
            desc: *desc,
            _live: self.ledger.issue(ObjectKind::Sampler),
        })
    }

    fn set_arg(&self, kernel: &CpuKernel, index: u32, arg: KernelArg<'_, Self>) -> ApiResult<()> {
        self.fault(FaultPoint::SetArg(index))?;
        let slot = index as usize;
        if slot >= kernel.decl.params.len() {
            return Err(Status::INVALID_ARG_INDEX);
        }

        let expected = kernel.host.signature.get(slot).copied();
        let bound = match (arg, expected) {
            (KernelArg::Image(image), Some(ParamKind::Image)) => BoundArg::Image(Arc::clone(&image.store)),
            (KernelArg::Sampler(sampler), Some(ParamKind::Sampler)) => BoundArg::Sampler(sampler.desc),
            (KernelArg::Int(v), Some(ParamKind::Int)) => BoundArg::Int(v),
            (_, Some(ParamKind::Image)) => return Err(Status::INVALID_MEM_OBJECT),
            (_, Some(ParamKind::Sampler)) => return Err(Status::INVALID_SAMPLER),
            _ => return Err(Status::INVALID_ARG_VALUE),
        };

        let mut args = kernel.args.lock().map_err(|_| Status::OUT_OF_HOST_MEMORY)?;
        args[slot] = Some(bound);
        Ok(())
    }

    fn enqueue_kernel(
        &self,
        queue: &CpuQueue,
        kernel: &CpuKernel,
        global: [usize; 2],
        local: [usize; 2],
    ) -> ApiResult<()> {
        self.fault(FaultPoint::Enqueue)?;
        if global.contains(&0) {
            return Err(Status::INVALID_GLOBAL_WORK_SIZE);
        }
        if local.contains(&0)
            || global[0] % local[0] != 0
            || global[1] % local[1] != 0
            || local[0].checked_mul(local[1]).is_none_or(|n| n > MAX_WORK_GROUP_SIZE)
        {
            return Err(Status::INVALID_WORK_GROUP_SIZE);
        }

        let args = kernel.args.lock().map_err(|_| Status::OUT_OF_HOST_MEMORY)?;
        let args: Vec<BoundArg> = args.iter().cloned().collect::<Option<_>>().ok_or(Status::INVALID_KERNEL_ARGS)?;
        if args.len() < kernel.host.signature.len() {
            return Err(Status::INVALID_KERNEL_ARGS);
        }

        let mut pending = queue.pending.lock().map_err(|_| Status::OUT_OF_HOST_MEMORY)?;
        pending.push(Launch {
            host: kernel.host,
            args,
            global,
        });
        self.ledger.record_dispatch();
        trace!(kernel = kernel.host.name, ?global, ?local, "enqueued");
        Ok(())
    }

    fn finish(&self, queue: &CpuQueue) -> ApiResult<()> {
        self.fault(FaultPoint::Finish)?;
        flush(queue)?;
        self.ledger.record_barrier();
        Ok(())
    }

    fn read_image(&self, queue: &CpuQueue, image: &CpuImage, width: u32, height: u32, out: &mut [u8]) -> ApiResult<()> {
        self.fault(FaultPoint::ReadImage)?;
        // in-order queue: earlier commands complete before the read
        flush(queue)?;

        let store = &image.store;
        if width == 0 || height == 0 || width > store.width || height > store.height {
            return Err(Status::INVALID_VALUE);
        }
        let row = width as usize * 4;
        if out.len() != row * height as usize {
            return Err(Status::INVALID_VALUE);
        }

        let data = store.data.lock().map_err(|_| Status::OUT_OF_HOST_MEMORY)?;
        let stride = store.width as usize * 4;
        for (y, dst) in out.chunks_exact_mut(row).enumerate() {
            dst.copy_from_slice(&data[y * stride..y * stride + row]);
        }
        Ok(())
    }
}

fn flush(queue: &CpuQueue) -> ApiResult<()> {
    let launches = {
        let mut pending = queue.pending.lock().map_err(|_| Status::OUT_OF_HOST_MEMORY)?;
        std::mem::take(&mut *pending)
    };
    for launch in launches {
        execute(&launch)?;
    }
    Ok(())
}

fn execute(launch: &Launch) -> ApiResult<()> {
    let (src, dst, sampler, extent) = match launch.args.as_slice() {
        [
            BoundArg::Image(src),
            BoundArg::Image(dst),
            BoundArg::Sampler(sampler),
            BoundArg::Int(width),
            BoundArg::Int(height),
            ..
        ] => (src, dst, *sampler, Extent { width: *width, height: *height }),
        _ => return Err(Status::INVALID_KERNEL_ARGS),
    };

    // snapshot first so the same image may be bound as input and output
    let input = src.data.lock().map_err(|_| Status::OUT_OF_HOST_MEMORY)?.clone();
    let view = Sampled {
        data: &input,
        width: src.width,
        height: src.height,
        sampler,
    };

    let mut output = dst.data.lock().map_err(|_| Status::OUT_OF_HOST_MEMORY)?;
    let stride = dst.width as usize * 4;
    let [gx, gy] = launch.global;
    let body = launch.host.body;

    // Work-items outside the destination have nowhere to write; evaluating
    // them would have no observable effect, so only covered rows run.
    output
        .par_chunks_exact_mut(stride)
        .take(gy)
        .enumerate()
        .for_each(|(y, row)| {
            for x in 0..gx {
                let Some(texel) = body(&view, extent, x as i32, y as i32) else { continue };
                if x < dst.width as usize {
                    row[x * 4..x * 4 + 4].copy_from_slice(&pixel::denormalize_rgba(texel));
                }
            }
        });
    Ok(())
}
