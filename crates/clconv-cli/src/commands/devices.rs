//! Devices command
//!
//! Lists compiled-in backends, their devices and, with `--formats`, the 2D
//! image formats each device accepts.

use anyhow::Result;
use clconv_compute::{describe_backends, list_devices, ComputeApi, CpuBackend, DeviceInfo};
use clconv_core::{AccessMode, DeviceClass};
#[allow(unused_imports)]
use tracing::{debug, trace, warn};

use crate::DevicesArgs;

pub fn run(args: DevicesArgs) -> Result<()> {
    trace!(formats = args.formats, "devices::run");
    print!("{}", describe_backends());

    print_backend(&CpuBackend::new(), args.formats);
    #[cfg(feature = "opencl")]
    print_backend(&clconv_compute::OpenClBackend::new(), args.formats);
    Ok(())
}

fn describe(info: &DeviceInfo) -> String {
    format!(
        "{} ({}), {}, images: {}, max work-group {}",
        info.name,
        info.vendor,
        info.class,
        if info.image_support { "yes" } else { "no" },
        info.max_work_group_size
    )
}

fn print_backend<A: ComputeApi>(api: &A, formats: bool) {
    println!("\n{}:", api.name());
    if !formats {
        let devices = list_devices(api);
        if devices.is_empty() {
            println!("  (no devices)");
        }
        for info in devices {
            println!("  {}", describe(&info));
        }
        return;
    }

    for class in [DeviceClass::Accelerator, DeviceClass::GeneralPurpose] {
        let devices = match api.devices(class) {
            Ok(devices) => devices,
            Err(status) => {
                warn!(%class, %status, "device query failed");
                continue;
            }
        };
        for device in devices {
            println!("  {}", describe(&api.device_info(&device)));
            let context = match api.create_context(&device) {
                Ok(context) => context,
                Err(status) => {
                    println!("    cannot create context: {status}");
                    continue;
                }
            };
            for access in [AccessMode::ReadOnly, AccessMode::WriteOnly] {
                match api.supported_formats(&context, access) {
                    Ok(list) if list.is_empty() => println!("    {access}: none"),
                    Ok(list) => {
                        println!("    {access}:");
                        for format in list {
                            println!("      {format}");
                        }
                    }
                    Err(status) => println!("    {access}: query failed: {status}"),
                }
            }
        }
    }
}
