//! Device enumeration and selection.

use clconv_core::{DeviceClass, Status};
use tracing::{debug, info, trace};

use crate::backend::{ComputeApi, DeviceInfo};
use crate::error::{ComputeError, ComputeResult};

/// Returns the first device of `class`.
///
/// Fails with [`ComputeError::DeviceUnavailable`] when the query fails or no
/// device of that class exists.
pub fn select_device<A: ComputeApi>(api: &A, class: DeviceClass) -> ComputeResult<A::Device> {
    trace!(backend = api.name(), %class, "select_device");
    let devices = api
        .devices(class)
        .map_err(|status| ComputeError::DeviceUnavailable { class, status })?;
    debug!(count = devices.len(), %class, "devices reported");

    let device = devices.into_iter().next().ok_or(ComputeError::DeviceUnavailable {
        class,
        status: Status::DEVICE_NOT_FOUND,
    })?;
    info!(device = %api.device_info(&device).name, "selected device");
    Ok(device)
}

/// Describes every device of every class. Classes whose query fails are
/// skipped.
pub fn list_devices<A: ComputeApi>(api: &A) -> Vec<DeviceInfo> {
    [DeviceClass::Accelerator, DeviceClass::GeneralPurpose]
        .into_iter()
        .filter_map(|class| api.devices(class).ok())
        .flatten()
        .map(|device| api.device_info(&device))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{CpuBackend, FaultPoint};

    #[test]
    fn test_select_first_of_class() {
        let api = CpuBackend::new();
        let device = select_device(&api, DeviceClass::GeneralPurpose).unwrap();
        assert_eq!(api.device_info(&device).class, DeviceClass::GeneralPurpose);
    }

    #[test]
    fn test_missing_class() {
        let api = CpuBackend::builder().devices(&[DeviceClass::GeneralPurpose]).build();
        let err = select_device(&api, DeviceClass::Accelerator).unwrap_err();
        assert!(matches!(
            err,
            ComputeError::DeviceUnavailable { class: DeviceClass::Accelerator, status } if status == Status::DEVICE_NOT_FOUND
        ));
    }

    #[test]
    fn test_query_failure_carries_status() {
        let api = CpuBackend::builder().fail(FaultPoint::DeviceQuery, Status::OUT_OF_HOST_MEMORY).build();
        let err = select_device(&api, DeviceClass::Accelerator).unwrap_err();
        assert_eq!(err.status(), Some(Status::OUT_OF_HOST_MEMORY));
        assert!(list_devices(&api).is_empty());
    }

    #[test]
    fn test_list_devices() {
        let names: Vec<_> = list_devices(&CpuBackend::new()).into_iter().map(|d| d.class).collect();
        assert_eq!(names, vec![DeviceClass::Accelerator, DeviceClass::GeneralPurpose]);
    }
}
