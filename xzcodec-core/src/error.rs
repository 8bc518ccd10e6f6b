//! Error taxonomy for xzcodec operations.
//!
//! This mirrors the wire-observable error categories of the XZ/LZMA
//! reference implementation: a recognized-but-unsupported stream is a
//! different failure mode from a corrupted one, and a caller that simply
//! ran out of buffer space (`BufError`) is not a fatal condition in the
//! same sense as a checksum mismatch.

use thiserror::Error;

/// The error type for all xzcodec operations.
///
/// Successful-but-informational progress states (stream end, no check,
/// unsupported check, check-type-now-known) are not represented here — they
/// are returned via [`crate::action::Status`] alongside `Ok(..)`, not via
/// `Err`.
#[derive(Debug, Error)]
pub enum XzError {
    /// The input does not begin with a recognizable format magic.
    #[error("format not recognized: {message}")]
    FormatError {
        /// Description of what was expected.
        message: String,
    },

    /// Recognized format but unsupported or invalid parameters (unknown
    /// filter id, reserved bits set, `lc + lp > 4`, dictionary too large).
    #[error("unsupported options: {message}")]
    OptionsError {
        /// Description of the invalid option.
        message: String,
    },

    /// A block or stream header failed structural validation.
    #[error("invalid header: {message}")]
    HeaderError {
        /// Description of the header error.
        message: String,
    },

    /// Checksum mismatch, non-minimal VLI encoding, index/block size
    /// disagreement, unexpected end of payload, or an impossible
    /// range-decoder state.
    #[error("corrupted data at offset {offset}: {message}")]
    DataError {
        /// Byte offset (relative to the current block/stream) of the defect.
        offset: u64,
        /// Description of the corruption.
        message: String,
    },

    /// The allocator returned null during a legitimate allocation.
    #[error("allocation failed: {message}")]
    MemError {
        /// Description of what was being allocated.
        message: String,
    },

    /// A memory-tracked allocator refused an allocation because it would
    /// exceed the configured limit. Distinct from [`XzError::MemError`] so
    /// a caller can raise the limit and retry.
    #[error("memory limit exceeded: requested {requested}, limit {limit}")]
    MemLimitError {
        /// Bytes requested.
        requested: u64,
        /// Configured limit.
        limit: u64,
    },

    /// The caller made no progress possible: an action consumed zero input
    /// and produced zero output twice in a row. Non-fatal; the caller may
    /// refill its buffers and resume.
    #[error("no progress possible; refill input or output buffers")]
    BufError,

    /// API misuse: an action invoked in the wrong sequence, or a handle
    /// reused after a prior fatal error poisoned it.
    #[error("internal API misuse: {message}")]
    ProgError {
        /// Description of the misuse.
        message: String,
    },
}

/// Result type alias for xzcodec operations.
pub type Result<T> = std::result::Result<T, XzError>;

impl XzError {
    /// Create a format error.
    pub fn format(message: impl Into<String>) -> Self {
        Self::FormatError {
            message: message.into(),
        }
    }

    /// Create an options error.
    pub fn options(message: impl Into<String>) -> Self {
        Self::OptionsError {
            message: message.into(),
        }
    }

    /// Create a header error.
    pub fn header(message: impl Into<String>) -> Self {
        Self::HeaderError {
            message: message.into(),
        }
    }

    /// Create a data error.
    pub fn data(offset: u64, message: impl Into<String>) -> Self {
        Self::DataError {
            offset,
            message: message.into(),
        }
    }

    /// Create a memory allocation error.
    pub fn mem(message: impl Into<String>) -> Self {
        Self::MemError {
            message: message.into(),
        }
    }

    /// Create a memory limit error.
    pub fn mem_limit(requested: u64, limit: u64) -> Self {
        Self::MemLimitError { requested, limit }
    }

    /// Create a program/API-misuse error.
    pub fn prog(message: impl Into<String>) -> Self {
        Self::ProgError {
            message: message.into(),
        }
    }

    /// Whether this error poisons the handle (any error other than
    /// [`XzError::BufError`] is fatal; a caller must not reuse a handle
    /// after one of these).
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::BufError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = XzError::data(42, "CRC mismatch");
        assert!(err.to_string().contains("42"));
        assert!(err.to_string().contains("CRC mismatch"));
    }

    #[test]
    fn test_buf_error_not_fatal() {
        assert!(!XzError::BufError.is_fatal());
        assert!(XzError::format("bad magic").is_fatal());
    }
}
