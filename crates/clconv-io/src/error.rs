//! Error types for clconv-io.

use std::io;
use std::path::PathBuf;

use clconv_core::CoreError;
use thiserror::Error;

/// Result type alias for codec operations.
pub type IoResult<T> = Result<T, IoError>;

/// Codec errors.
#[derive(Debug, Error)]
pub enum IoError {
    /// File I/O error.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// File being read or written.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// Unsupported format or codec.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Decoding error.
    #[error("decode error: {0}")]
    DecodeError(String),

    /// Encoding error.
    #[error("encode error: {0}")]
    EncodeError(String),

    /// Decoded data does not form a valid RGBA8 buffer.
    #[error(transparent)]
    Buffer(#[from] CoreError),
}

impl IoError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
