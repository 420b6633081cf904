//! Device image formats, access modes and device classes.
//!
//! Only one format is ever allocated on a device: [`ImageFormat::RGBA8`]
//! (`CL_RGBA` / `CL_UNORM_INT8`). It is the one format every image-capable
//! OpenCL device is required to support for both reading and writing, so
//! the pipeline standardizes on it rather than negotiating.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Channel order of a device image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelOrder {
    /// Single channel (`CL_R`).
    R,
    /// Two channels (`CL_RG`).
    Rg,
    /// Four channels (`CL_RGBA`).
    Rgba,
    /// Four channels (`CL_BGRA`).
    Bgra,
    /// Four channels (`CL_ARGB`).
    Argb,
}

impl ChannelOrder {
    /// Number of channels.
    pub const fn channels(self) -> usize {
        match self {
            Self::R => 1,
            Self::Rg => 2,
            Self::Rgba | Self::Bgra | Self::Argb => 4,
        }
    }
}

impl fmt::Display for ChannelOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::R => write!(f, "CL_R"),
            Self::Rg => write!(f, "CL_RG"),
            Self::Rgba => write!(f, "CL_RGBA"),
            Self::Bgra => write!(f, "CL_BGRA"),
            Self::Argb => write!(f, "CL_ARGB"),
        }
    }
}

/// Channel data type of a device image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelType {
    /// Normalized unsigned 8-bit (`CL_UNORM_INT8`).
    UnormInt8,
    /// Normalized unsigned 16-bit (`CL_UNORM_INT16`).
    UnormInt16,
    /// Unnormalized unsigned 8-bit (`CL_UNSIGNED_INT8`).
    UnsignedInt8,
    /// 16-bit float (`CL_HALF_FLOAT`).
    HalfFloat,
    /// 32-bit float (`CL_FLOAT`).
    Float,
}

impl ChannelType {
    /// Bytes per channel.
    pub const fn bytes(self) -> usize {
        match self {
            Self::UnormInt8 | Self::UnsignedInt8 => 1,
            Self::UnormInt16 | Self::HalfFloat => 2,
            Self::Float => 4,
        }
    }
}

impl fmt::Display for ChannelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnormInt8 => write!(f, "CL_UNORM_INT8"),
            Self::UnormInt16 => write!(f, "CL_UNORM_INT16"),
            Self::UnsignedInt8 => write!(f, "CL_UNSIGNED_INT8"),
            Self::HalfFloat => write!(f, "CL_HALF_FLOAT"),
            Self::Float => write!(f, "CL_FLOAT"),
        }
    }
}

/// A channel order and data type pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageFormat {
    /// Channel order.
    pub channel_order: ChannelOrder,
    /// Channel data type.
    pub channel_type: ChannelType,
}

impl ImageFormat {
    /// The mandatory interchange format: RGBA, normalized unsigned 8-bit.
    pub const RGBA8: Self = Self::new(ChannelOrder::Rgba, ChannelType::UnormInt8);

    /// Create a new image format.
    pub const fn new(channel_order: ChannelOrder, channel_type: ChannelType) -> Self {
        Self {
            channel_order,
            channel_type,
        }
    }

    /// Bytes per pixel.
    pub const fn bytes_per_pixel(&self) -> usize {
        self.channel_order.channels() * self.channel_type.bytes()
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {}", self.channel_order, self.channel_type)
    }
}

/// How a kernel may access a device image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessMode {
    /// Kernel reads only (`CL_MEM_READ_ONLY`).
    ReadOnly,
    /// Kernel writes only (`CL_MEM_WRITE_ONLY`).
    WriteOnly,
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadOnly => write!(f, "read-only"),
            Self::WriteOnly => write!(f, "write-only"),
        }
    }
}

/// Class of compute device requested for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeviceClass {
    /// A device distinct from the host processor, e.g. a GPU.
    #[default]
    Accelerator,
    /// The host's general-purpose processor.
    GeneralPurpose,
}

impl fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Accelerator => write!(f, "accelerator"),
            Self::GeneralPurpose => write!(f, "general-purpose"),
        }
    }
}
