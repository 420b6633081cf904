//! # clconv-core
//!
//! Core types shared by every clconv crate.
//!
//! - [`RgbaImage`] - host pixel buffer in the interchange layout
//!   (4 interleaved 8-bit channels, row-major, no padding)
//! - [`ImageFormat`] - channel order and channel type of a device image
//! - [`Status`] - device API status code with symbolic names
//! - [`pixel`] - conversion between 8-bit samples and normalized floats
//!
//! ## Crate Structure
//!
//! ```text
//! clconv-core (this crate)
//!    ^
//!    |
//!    +-- clconv-io (codecs)
//!    +-- clconv-compute (session, buffers, dispatch, orchestration)
//!    +-- clconv-cli
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod error;
pub mod format;
pub mod image;
pub mod pixel;
pub mod status;

pub use error::{CoreError, CoreResult};
pub use format::{AccessMode, ChannelOrder, ChannelType, DeviceClass, ImageFormat};
pub use image::{RgbaImage, CHANNELS};
pub use pixel::{denormalize, denormalize_slice, normalize, normalize_slice};
pub use status::Status;
