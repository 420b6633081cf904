//! Error taxonomy for the compute session.
//!
//! Each variant names the stage that failed and, where the device API was
//! involved, the [`Status`] it returned. [`ComputeError::BuildFailure`] also
//! carries the compiler's diagnostic log.

use std::fmt;
use std::path::PathBuf;

use clconv_core::{DeviceClass, ImageFormat, Status};
use clconv_io::IoError;
use thiserror::Error;

/// Result type alias for compute operations.
pub type ComputeResult<T> = Result<T, ComputeError>;

/// Pipeline stage a failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Run configuration.
    Config,
    /// Device enumeration and selection.
    DeviceSelection,
    /// Context creation.
    ContextCreation,
    /// Command queue creation.
    QueueCreation,
    /// Reading the kernel source file.
    ProgramLoad,
    /// Program creation and build.
    Build,
    /// Kernel lookup by entry name.
    KernelCreation,
    /// Image format capability check.
    ImageFormat,
    /// Input/output image allocation.
    Allocation,
    /// Sampler creation.
    SamplerCreation,
    /// Kernel argument binding.
    ArgBind,
    /// Enqueue and completion barrier.
    Dispatch,
    /// Reading the output image back to the host.
    Readback,
    /// Image load/save.
    Codec,
}

impl Stage {
    /// Process exit code for a failure in this stage. Never 0.
    pub fn exit_code(self) -> u8 {
        match self {
            Self::Config => 10,
            Self::DeviceSelection => 11,
            Self::ContextCreation => 12,
            Self::QueueCreation => 13,
            Self::ProgramLoad => 14,
            Self::Build => 15,
            Self::KernelCreation => 16,
            Self::ImageFormat => 17,
            Self::Allocation => 18,
            Self::SamplerCreation => 19,
            Self::ArgBind => 20,
            Self::Dispatch => 21,
            Self::Readback => 22,
            Self::Codec => 23,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Config => "configuration",
            Self::DeviceSelection => "device selection",
            Self::ContextCreation => "context creation",
            Self::QueueCreation => "queue creation",
            Self::ProgramLoad => "program load",
            Self::Build => "program build",
            Self::KernelCreation => "kernel creation",
            Self::ImageFormat => "image format check",
            Self::Allocation => "image allocation",
            Self::SamplerCreation => "sampler creation",
            Self::ArgBind => "argument binding",
            Self::Dispatch => "dispatch",
            Self::Readback => "readback",
            Self::Codec => "image codec",
        };
        f.write_str(name)
    }
}

/// Compute session errors.
#[derive(Error, Debug)]
pub enum ComputeError {
    #[error("no {class} device available: {status}")]
    DeviceUnavailable { class: DeviceClass, status: Status },

    #[error("failed to create a compute context: {status}")]
    ContextCreationFailure { status: Status },

    #[error("failed to create a command queue: {status}")]
    QueueCreationFailure { status: Status },

    #[error("failed to load compute program from {path}: {source}")]
    ProgramLoadFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to build program executable: {status}\n{log}")]
    BuildFailure { status: Status, log: String },

    #[error("failed to create compute kernel '{name}': {status}")]
    KernelCreationFailure { name: String, status: Status },

    #[error("device does not support image format {format}")]
    ImageFormatUnsupported { format: ImageFormat },

    #[error("failed to allocate device memory: {status}")]
    AllocationFailure { status: Status },

    #[error("failed to create sampler: {status}")]
    SamplerCreationFailure { status: Status },

    #[error("failed to set kernel argument {index}: {status}")]
    ArgBindFailure { index: u32, status: Status },

    #[error("failed to execute kernel: {status}")]
    DispatchFailure { status: Status },

    #[error("failed to read back output image: {status}")]
    ReadbackFailure { status: Status },

    #[error("image codec: {0}")]
    Codec(#[from] IoError),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ComputeError {
    /// Stage the error belongs to.
    pub fn stage(&self) -> Stage {
        match self {
            Self::DeviceUnavailable { .. } => Stage::DeviceSelection,
            Self::ContextCreationFailure { .. } => Stage::ContextCreation,
            Self::QueueCreationFailure { .. } => Stage::QueueCreation,
            Self::ProgramLoadFailure { .. } => Stage::ProgramLoad,
            Self::BuildFailure { .. } => Stage::Build,
            Self::KernelCreationFailure { .. } => Stage::KernelCreation,
            Self::ImageFormatUnsupported { .. } => Stage::ImageFormat,
            Self::AllocationFailure { .. } => Stage::Allocation,
            Self::SamplerCreationFailure { .. } => Stage::SamplerCreation,
            Self::ArgBindFailure { .. } => Stage::ArgBind,
            Self::DispatchFailure { .. } => Stage::Dispatch,
            Self::ReadbackFailure { .. } => Stage::Readback,
            Self::Codec(_) => Stage::Codec,
            Self::Config(_) => Stage::Config,
        }
    }

    /// Device API status, when the failure came from the device API.
    pub fn status(&self) -> Option<Status> {
        match self {
            Self::DeviceUnavailable { status, .. }
            | Self::ContextCreationFailure { status }
            | Self::QueueCreationFailure { status }
            | Self::BuildFailure { status, .. }
            | Self::KernelCreationFailure { status, .. }
            | Self::AllocationFailure { status }
            | Self::SamplerCreationFailure { status }
            | Self::ArgBindFailure { status, .. }
            | Self::DispatchFailure { status }
            | Self::ReadbackFailure { status } => Some(*status),
            Self::ImageFormatUnsupported { .. } => Some(Status::IMAGE_FORMAT_NOT_SUPPORTED),
            Self::ProgramLoadFailure { .. } | Self::Codec(_) | Self::Config(_) => None,
        }
    }

    /// Compiler diagnostics, only present on build failures.
    pub fn build_log(&self) -> Option<&str> {
        match self {
            Self::BuildFailure { log, .. } => Some(log),
            _ => None,
        }
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        self.stage().exit_code()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_and_status() {
        let err = ComputeError::ArgBindFailure { index: 2, status: Status::INVALID_SAMPLER };
        assert_eq!(err.stage(), Stage::ArgBind);
        assert_eq!(err.status(), Some(Status::INVALID_SAMPLER));
        assert!(err.to_string().contains("argument 2"));
        assert!(err.to_string().contains("CL_INVALID_SAMPLER"));
    }

    #[test]
    fn test_build_log_only_on_build_failure() {
        let err = ComputeError::BuildFailure {
            status: Status::BUILD_PROGRAM_FAILURE,
            log: "<source>:1:1: error: boom".into(),
        };
        assert_eq!(err.build_log(), Some("<source>:1:1: error: boom"));
        assert!(ComputeError::DispatchFailure { status: Status::OUT_OF_RESOURCES }.build_log().is_none());
    }

    #[test]
    fn test_exit_codes_distinct_and_nonzero() {
        let stages = [
            Stage::Config,
            Stage::DeviceSelection,
            Stage::ContextCreation,
            Stage::QueueCreation,
            Stage::ProgramLoad,
            Stage::Build,
            Stage::KernelCreation,
            Stage::ImageFormat,
            Stage::Allocation,
            Stage::SamplerCreation,
            Stage::ArgBind,
            Stage::Dispatch,
            Stage::Readback,
            Stage::Codec,
        ];
        let mut codes: Vec<u8> = stages.iter().map(|s| s.exit_code()).collect();
        assert!(codes.iter().all(|&c| c != 0));
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), stages.len());
    }
}
