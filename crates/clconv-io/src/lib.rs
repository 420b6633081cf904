//! # clconv-io
//!
//! Image codecs for the clconv pipeline.
//!
//! Every codec speaks one layout, [`RgbaImage`]: 4 interleaved 8-bit channels,
//! row-major, no padding. Sources with fewer channels or deeper samples are
//! expanded or truncated to RGBA8 on load.
//!
//! # Architecture
//!
//! ```text
//! ImageCodec (trait)
//!     ├── NativeCodec      (png crate, PNG only)
//!     └── ThirdPartyCodec  (image crate, PNG/JPEG/BMP/TIFF by extension)
//! ```
//!
//! The variant is picked at runtime from a [`CodecKind`]; callers only ever
//! hold a `Box<dyn ImageCodec>`.
//!
//! # Example
//!
//! ```rust,ignore
//! use clconv_io::{create_codec, CodecKind};
//!
//! let codec = create_codec(CodecKind::Native);
//! let image = codec.load("rgba.png".as_ref())?;
//! codec.save("outRGBA.png".as_ref(), &image)?;
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod error;
pub mod external;
pub mod native;

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

pub use clconv_core::RgbaImage;
pub use error::{IoError, IoResult};
pub use external::ThirdPartyCodec;
pub use native::NativeCodec;

/// Loads and saves RGBA8 images.
pub trait ImageCodec: Send + Sync {
    /// Codec name for diagnostics.
    fn name(&self) -> &'static str;

    /// Decodes the file at `path` into RGBA8.
    fn load(&self, path: &Path) -> IoResult<RgbaImage>;

    /// Encodes `image` to `path`.
    fn save(&self, path: &Path, image: &RgbaImage) -> IoResult<()>;
}

/// Which codec implementation to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CodecKind {
    /// PNG via the `png` crate.
    #[default]
    Native,
    /// Any format the `image` crate handles.
    ThirdParty,
}

impl fmt::Display for CodecKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Native => write!(f, "native"),
            Self::ThirdParty => write!(f, "third-party"),
        }
    }
}

impl std::str::FromStr for CodecKind {
    type Err = IoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "native" | "png" => Ok(Self::Native),
            "third-party" | "thirdparty" | "image" => Ok(Self::ThirdParty),
            other => Err(IoError::UnsupportedFormat(format!("unknown codec: {other}"))),
        }
    }
}

/// Creates the codec for `kind`.
pub fn create_codec(kind: CodecKind) -> Box<dyn ImageCodec> {
    match kind {
        CodecKind::Native => Box::new(NativeCodec::new()),
        CodecKind::ThirdParty => Box::new(ThirdPartyCodec::new()),
    }
}
