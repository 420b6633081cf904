//! Run configuration.
//!
//! Loaded from YAML; every field is optional in the file and falls back to
//! the classic one-shot run (`rgba.png` through the Sobel kernel into
//! `outRGBA.png` on an accelerator).
//!
//! ```yaml
//! input: photo.png
//! output: edges.png
//! kernel_path: kernels/sobel.cl
//! entry: sobel
//! device_class: accelerator
//! local_size: [16, 16]
//! codec: native
//! backend: auto
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use clconv_core::DeviceClass;
use clconv_io::CodecKind;
use serde::{Deserialize, Serialize};

use crate::backend::Backend;
use crate::error::{ComputeError, ComputeResult};
use crate::tiling::DEFAULT_LOCAL;

/// Parameters of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    /// Source image.
    pub input: PathBuf,
    /// Destination image.
    pub output: PathBuf,
    /// Kernel source file.
    pub kernel_path: PathBuf,
    /// Kernel entry point.
    pub entry: String,
    /// Requested device class.
    pub device_class: DeviceClass,
    /// Local work-group size.
    pub local_size: [usize; 2],
    /// Image codec.
    pub codec: CodecKind,
    /// Round-trip the result through normalized floats on the host.
    pub host_float: bool,
    /// Device backend.
    pub backend: Backend,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from("rgba.png"),
            output: PathBuf::from("outRGBA.png"),
            kernel_path: PathBuf::from("kernels/sobel.cl"),
            entry: "sobel".into(),
            device_class: DeviceClass::Accelerator,
            local_size: DEFAULT_LOCAL,
            codec: CodecKind::Native,
            host_float: false,
            backend: Backend::Auto,
        }
    }
}

impl RunConfig {
    /// Parses YAML text and validates it.
    pub fn from_yaml_str(yaml: &str) -> ComputeResult<Self> {
        let config: Self = serde_yaml::from_str(yaml).map_err(|e| ComputeError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> ComputeResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| ComputeError::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_yaml_str(&text)
    }

    /// YAML form of this configuration.
    pub fn to_yaml(&self) -> ComputeResult<String> {
        serde_yaml::to_string(self).map_err(|e| ComputeError::Config(e.to_string()))
    }

    /// Rejects zero local sizes and empty entry names.
    pub fn validate(&self) -> ComputeResult<()> {
        if self.local_size.contains(&0) {
            return Err(ComputeError::Config(format!(
                "local_size must be non-zero, got {:?}",
                self.local_size
            )));
        }
        if self.entry.trim().is_empty() {
            return Err(ComputeError::Config("entry must not be empty".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RunConfig::default();
        assert_eq!(config.input, PathBuf::from("rgba.png"));
        assert_eq!(config.output, PathBuf::from("outRGBA.png"));
        assert_eq!(config.entry, "sobel");
        assert_eq!(config.local_size, [16, 16]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml() {
        let config = RunConfig::from_yaml_str("entry: identity\ndevice_class: general-purpose\ncodec: third-party\n").unwrap();
        assert_eq!(config.entry, "identity");
        assert_eq!(config.device_class, DeviceClass::GeneralPurpose);
        assert_eq!(config.codec, CodecKind::ThirdParty);
        assert_eq!(config.kernel_path, PathBuf::from("kernels/sobel.cl"));
    }

    #[test]
    fn test_rejects_zero_local() {
        let err = RunConfig::from_yaml_str("local_size: [0, 16]\n").unwrap_err();
        assert!(matches!(err, ComputeError::Config(_)));
        assert_eq!(err.exit_code(), 10);
    }

    #[test]
    fn test_rejects_empty_entry_and_unknown_keys() {
        assert!(RunConfig::from_yaml_str("entry: ''\n").is_err());
        assert!(RunConfig::from_yaml_str("colour: red\n").is_err());
    }

    #[test]
    fn test_yaml_round_trip() {
        let config = RunConfig {
            host_float: true,
            backend: Backend::Cpu,
            ..RunConfig::default()
        };
        let yaml = config.to_yaml().unwrap();
        assert_eq!(RunConfig::from_yaml_str(&yaml).unwrap(), config);
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.yaml");
        fs::write(&path, "input: a.png\noutput: b.png\n").unwrap();
        let config = RunConfig::from_yaml_file(&path).unwrap();
        assert_eq!(config.input, PathBuf::from("a.png"));
        assert!(RunConfig::from_yaml_file(dir.path().join("missing.yaml")).is_err());
    }
}
