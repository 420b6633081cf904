//! Session lifecycle and failure-path tests on the host runtime.

use clconv_compute::backend::KernelArg;
use clconv_compute::{
    bind_arguments, check_format_support, compute_work_size, create_sampler, dispatch, select_device, ComputeApi,
    ComputeError, ComputeSession, CpuBackend, FaultPoint, ImageBuffers, ObjectKind, Orchestrator, RunConfig, Stage,
};
use clconv_core::{AccessMode, ChannelOrder, ChannelType, DeviceClass, ImageFormat, RgbaImage, Status};

const IDENTITY: &str = include_str!("../../../kernels/identity.cl");

fn open(api: &CpuBackend) -> ComputeSession<'_, CpuBackend> {
    let device = select_device(api, DeviceClass::Accelerator).unwrap();
    ComputeSession::open(api, device, IDENTITY, "identity").unwrap()
}

fn identity_config() -> RunConfig {
    RunConfig {
        entry: "identity".into(),
        ..RunConfig::default()
    }
}

fn gradient(width: u32, height: u32) -> RgbaImage {
    let mut data = Vec::with_capacity((width * height * 4) as usize);
    for y in 0..height {
        for x in 0..width {
            data.extend_from_slice(&[(x * 13) as u8, (y * 29) as u8, (x + y) as u8, 255]);
        }
    }
    RgbaImage::from_raw(width, height, data).unwrap()
}

#[test]
fn test_release_order_and_idempotence() {
    let api = CpuBackend::new();
    let mut session = open(&api);
    create_sampler(&mut session).unwrap();
    assert_eq!(api.ledger().live_total(), 5);

    session.release_all();
    session.release_all();

    assert_eq!(
        api.ledger().release_order(),
        vec![
            ObjectKind::Sampler,
            ObjectKind::Kernel,
            ObjectKind::Program,
            ObjectKind::Queue,
            ObjectKind::Context,
        ]
    );
    for kind in [
        ObjectKind::Sampler,
        ObjectKind::Kernel,
        ObjectKind::Program,
        ObjectKind::Queue,
        ObjectKind::Context,
    ] {
        assert_eq!(api.ledger().released(kind), 1, "{kind:?}");
    }

    drop(session);
    assert_eq!(api.ledger().release_order().len(), 5);
}

#[test]
fn test_release_partial_session() {
    let api = CpuBackend::new();
    let device = select_device(&api, DeviceClass::Accelerator).unwrap();
    let mut session = ComputeSession::new(&api, device);
    session.create_context().unwrap();
    session.create_queue().unwrap();

    session.release_all();
    session.release_all();
    assert_eq!(api.ledger().release_order(), vec![ObjectKind::Queue, ObjectKind::Context]);
    assert_eq!(api.ledger().live_total(), 0);
}

#[test]
fn test_release_empty_session() {
    let api = CpuBackend::new();
    let device = select_device(&api, DeviceClass::Accelerator).unwrap();
    let mut session = ComputeSession::new(&api, device);
    session.release_all();
    assert!(api.ledger().release_order().is_empty());
}

#[test]
fn test_context_failure() {
    let api = CpuBackend::builder()
        .fail(FaultPoint::CreateContext, Status::OUT_OF_HOST_MEMORY)
        .build();
    let device = select_device(&api, DeviceClass::Accelerator).unwrap();
    let err = ComputeSession::open(&api, device, IDENTITY, "identity").err().unwrap();
    assert_eq!(err.stage(), Stage::ContextCreation);
    assert_eq!(api.ledger().live_total(), 0);
}

#[test]
fn test_queue_failure_releases_context() {
    let api = CpuBackend::builder()
        .fail(FaultPoint::CreateQueue, Status::OUT_OF_RESOURCES)
        .build();
    let device = select_device(&api, DeviceClass::Accelerator).unwrap();
    let err = ComputeSession::open(&api, device, IDENTITY, "identity").err().unwrap();
    assert!(matches!(err, ComputeError::QueueCreationFailure { status } if status == Status::OUT_OF_RESOURCES));
    assert_eq!(api.ledger().release_order(), vec![ObjectKind::Context]);
}

#[test]
fn test_build_failure_has_log_and_leaks_nothing() {
    let api = CpuBackend::new();
    let malformed = "__kernel void identity(read_only image2d_t input {\n    int x = 0;\n}\n";
    let image = RgbaImage::filled(4, 4, [0, 0, 0, 255]).unwrap();

    let err = Orchestrator::from_config(&api, identity_config())
        .process(&image, malformed)
        .unwrap_err();

    let log = err.build_log().expect("build failure carries a log");
    assert!(!log.is_empty());
    assert!(log.contains("error:"), "{log}");
    assert_eq!(err.status(), Some(Status::BUILD_PROGRAM_FAILURE));
    assert_ne!(err.exit_code(), 0);
    assert_eq!(api.ledger().live_total(), 0);
    assert_eq!(api.ledger().created(ObjectKind::Kernel), 0);
}

#[test]
fn test_missing_entry_point() {
    let api = CpuBackend::new();
    let device = select_device(&api, DeviceClass::Accelerator).unwrap();
    let err = ComputeSession::open(&api, device, IDENTITY, "gaussian").err().unwrap();
    match err {
        ComputeError::KernelCreationFailure { name, status } => {
            assert_eq!(name, "gaussian");
            assert_eq!(status, Status::INVALID_KERNEL_NAME);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(api.ledger().live_total(), 0);
}

#[test]
fn test_missing_program_file() {
    let api = CpuBackend::new();
    let device = select_device(&api, DeviceClass::Accelerator).unwrap();
    let mut session = ComputeSession::new(&api, device);
    session.create_context().unwrap();
    let err = session.load_program("/nonexistent/kernel.cl").unwrap_err();
    assert_eq!(err.stage(), Stage::ProgramLoad);
    assert!(err.status().is_none());
}

#[test]
fn test_format_unsupported() {
    let bgra = ImageFormat::new(ChannelOrder::Bgra, ChannelType::UnormInt8);
    let api = CpuBackend::builder().formats(vec![bgra]).build();
    let session = open(&api);
    let err = check_format_support(&session).unwrap_err();
    assert!(matches!(err, ComputeError::ImageFormatUnsupported { format } if format == ImageFormat::RGBA8));
}

#[test]
fn test_no_image_support() {
    let api = CpuBackend::builder().without_image_support().build();
    let image = RgbaImage::filled(2, 2, [1, 2, 3, 4]).unwrap();
    let err = Orchestrator::from_config(&api, identity_config())
        .process(&image, IDENTITY)
        .unwrap_err();
    assert_eq!(err.stage(), Stage::ImageFormat);
    assert_eq!(api.ledger().created(ObjectKind::Image), 0);
}

#[test]
fn test_joint_allocation_output_fault() {
    let api = CpuBackend::builder()
        .fail(FaultPoint::CreateImage(AccessMode::WriteOnly), Status::MEM_OBJECT_ALLOCATION_FAILURE)
        .build();
    let image = RgbaImage::filled(8, 8, [9, 9, 9, 255]).unwrap();
    let err = Orchestrator::from_config(&api, identity_config())
        .process(&image, IDENTITY)
        .unwrap_err();

    assert!(matches!(err, ComputeError::AllocationFailure { status } if status == Status::MEM_OBJECT_ALLOCATION_FAILURE));
    let ledger = api.ledger();
    // the input was allocated and then released
    assert_eq!(ledger.created(ObjectKind::Image), 1);
    assert_eq!(ledger.live(ObjectKind::Image), 0);
    assert_eq!(ledger.created(ObjectKind::Sampler), 0);
    assert_eq!(ledger.dispatches(), 0);
    assert_eq!(ledger.live_total(), 0);
}

#[test]
fn test_joint_allocation_input_fault() {
    let api = CpuBackend::builder()
        .fail(FaultPoint::CreateImage(AccessMode::ReadOnly), Status::OUT_OF_RESOURCES)
        .build();
    let session = open(&api);
    let image = RgbaImage::filled(8, 8, [9, 9, 9, 255]).unwrap();

    let err = ImageBuffers::allocate(&session, &image).err().unwrap();
    assert!(matches!(err, ComputeError::AllocationFailure { status } if status == Status::OUT_OF_RESOURCES));
    assert_eq!(api.ledger().created(ObjectKind::Image), 1);
    assert_eq!(api.ledger().live(ObjectKind::Image), 0);
    assert!(session.sampler().is_none());
}

#[test]
fn test_sampler_failure() {
    let api = CpuBackend::builder()
        .fail(FaultPoint::CreateSampler, Status::INVALID_VALUE)
        .build();
    let image = RgbaImage::filled(3, 3, [0, 0, 0, 255]).unwrap();
    let err = Orchestrator::from_config(&api, identity_config())
        .process(&image, IDENTITY)
        .unwrap_err();
    assert_eq!(err.stage(), Stage::SamplerCreation);
    assert_eq!(api.ledger().dispatches(), 0);
    assert_eq!(api.ledger().live_total(), 0);
}

#[test]
fn test_unbound_sampler_reports_index_two() {
    let api = CpuBackend::new();
    let session = open(&api);
    let image = RgbaImage::filled(4, 4, [0, 0, 0, 255]).unwrap();
    let buffers = ImageBuffers::allocate(&session, &image).unwrap();

    let err = bind_arguments(&session, &buffers).unwrap_err();
    assert!(matches!(err, ComputeError::ArgBindFailure { index: 2, status } if status == Status::INVALID_SAMPLER));
}

#[test]
fn test_arg_bind_reports_first_failing_index() {
    let api = CpuBackend::builder()
        .fail(FaultPoint::SetArg(4), Status::INVALID_ARG_SIZE)
        .fail(FaultPoint::SetArg(3), Status::INVALID_ARG_VALUE)
        .build();
    let image = RgbaImage::filled(4, 4, [0, 0, 0, 255]).unwrap();
    let err = Orchestrator::from_config(&api, identity_config())
        .process(&image, IDENTITY)
        .unwrap_err();
    assert!(matches!(err, ComputeError::ArgBindFailure { index: 3, status } if status == Status::INVALID_ARG_VALUE));
    assert_eq!(api.ledger().dispatches(), 0);
}

#[test]
fn test_enqueue_failure() {
    let api = CpuBackend::builder()
        .fail(FaultPoint::Enqueue, Status::OUT_OF_RESOURCES)
        .build();
    let image = RgbaImage::filled(4, 4, [0, 0, 0, 255]).unwrap();
    let err = Orchestrator::from_config(&api, identity_config())
        .process(&image, IDENTITY)
        .unwrap_err();
    assert_eq!(err.stage(), Stage::Dispatch);
    assert_eq!(api.ledger().live_total(), 0);
}

#[test]
fn test_barrier_failure() {
    let api = CpuBackend::builder()
        .fail(FaultPoint::Finish, Status::OUT_OF_RESOURCES)
        .build();
    let image = RgbaImage::filled(4, 4, [0, 0, 0, 255]).unwrap();
    let err = Orchestrator::from_config(&api, identity_config())
        .process(&image, IDENTITY)
        .unwrap_err();
    assert!(matches!(err, ComputeError::DispatchFailure { status } if status == Status::OUT_OF_RESOURCES));
    assert_eq!(api.ledger().dispatches(), 1);
    assert_eq!(api.ledger().barriers(), 0);
}

#[test]
fn test_readback_failure() {
    let api = CpuBackend::builder()
        .fail(FaultPoint::ReadImage, Status::INVALID_MEM_OBJECT)
        .build();
    let image = RgbaImage::filled(4, 4, [0, 0, 0, 255]).unwrap();
    let err = Orchestrator::from_config(&api, identity_config())
        .process(&image, IDENTITY)
        .unwrap_err();
    assert_eq!(err.stage(), Stage::Readback);
    assert_eq!(err.status(), Some(Status::INVALID_MEM_OBJECT));
}

#[test]
fn test_manual_pipeline() {
    let api = CpuBackend::new();
    let mut session = open(&api);
    let image = gradient(17, 9);
    let buffers = ImageBuffers::allocate(&session, &image).unwrap();
    create_sampler(&mut session).unwrap();
    bind_arguments(&session, &buffers).unwrap();

    let work = compute_work_size(image.width(), image.height());
    let pending = dispatch(&session, work).unwrap();
    assert_eq!(pending.work().global, [32, 16]);
    let done = pending.await_completion().unwrap();
    let output = done.readback(buffers.output(), 17, 9).unwrap();

    assert_eq!(output.data().len(), 17 * 9 * 4);
    assert_eq!(output, image);
    assert_eq!(api.ledger().barriers(), 1);

    drop(buffers);
    drop(session);
    assert_eq!(api.ledger().live_total(), 0);
}

#[test]
fn test_buffers_released_at_scope_end_before_session() {
    let api = CpuBackend::new();
    let session = open(&api);
    {
        let image = RgbaImage::filled(3, 3, [0, 0, 0, 255]).unwrap();
        let _buffers = ImageBuffers::allocate(&session, &image).unwrap();
        assert_eq!(api.ledger().live(ObjectKind::Image), 2);
    }
    assert_eq!(api.ledger().live(ObjectKind::Image), 0);
    assert_eq!(api.ledger().release_order(), vec![ObjectKind::Image, ObjectKind::Image]);

    drop(session);
    assert_eq!(api.ledger().live_total(), 0);
}

#[test]
fn test_output_image_starts_uninitialised_until_dispatch() {
    let api = CpuBackend::new();
    let session = open(&api);
    let image = RgbaImage::filled(2, 2, [200, 100, 50, 255]).unwrap();
    let buffers = ImageBuffers::allocate(&session, &image).unwrap();

    let mut out = vec![0xAA; 16];
    api.read_image(session.queue().unwrap(), buffers.output(), 2, 2, &mut out).unwrap();
    assert_ne!(out, image.data());

    // a wrong argument kind is rejected by the runtime itself
    let kernel = session.kernel().unwrap();
    assert_eq!(
        api.set_arg(kernel, 0, KernelArg::Int(1)).err(),
        Some(Status::INVALID_MEM_OBJECT)
    );
}
