//! Error types for clconv-core.
//!
//! Host-side buffer validation is the only thing that can fail in this crate;
//! device failures are reported by `clconv-compute`.

use thiserror::Error;

/// Result type alias using [`CoreError`].
pub type CoreResult<T> = std::result::Result<T, CoreError>;

/// Errors raised while constructing or validating host pixel buffers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Width or height is zero, or the byte size overflows `usize`.
    #[error("invalid dimensions: {width}x{height} ({reason})")]
    InvalidDimensions {
        /// Image width
        width: u32,
        /// Image height
        height: u32,
        /// Why the dimensions were rejected
        reason: String,
    },

    /// Pixel data length does not match `width * height * 4`.
    #[error("buffer size mismatch: expected {expected} bytes, got {actual}")]
    BufferSizeMismatch {
        /// Bytes required by the dimensions
        expected: usize,
        /// Bytes supplied
        actual: usize,
    },
}

impl CoreError {
    #[inline]
    pub(crate) fn invalid_dimensions(width: u32, height: u32, reason: impl Into<String>) -> Self {
        Self::InvalidDimensions {
            width,
            height,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_carry_values() {
        let err = CoreError::BufferSizeMismatch { expected: 64, actual: 60 };
        let msg = err.to_string();
        assert!(msg.contains("64"));
        assert!(msg.contains("60"));

        let err = CoreError::invalid_dimensions(0, 4, "zero width");
        assert_eq!(err.to_string(), "invalid dimensions: 0x4 (zero width)");
    }
}
