//! crates/compress/src/error.rs
//!
//! Error registry shared by every compressor backend.
//!
//! Each variant maps onto a small negative integer that is stable across the
//! C ABI. Backend-specific diagnostics are registered here as extensions of the
//! shared registry so callers can surface them without reinterpretation.

use thiserror::Error;

/// Result type used throughout the compression core.
pub type CompressResult<T> = Result<T, CompressError>;

/// Status code returned by successful operations.
pub const SUCCESS: i32 = 1;

/// Numeric error codes exposed to foreign callers.
pub mod codes {
    /// A required pointer or handle was missing.
    pub const INVALID_PTR: i32 = -1;
    /// The allocator could not satisfy a request.
    pub const OUT_OF_MEMORY: i32 = -2;
    /// An argument fell outside its permitted range.
    pub const OUT_OF_BOUNDS: i32 = -3;
    /// An argument combination is not permitted in the current state.
    pub const INVALID_ARGUMENT: i32 = -4;
    /// The requested algorithm is not compiled into this build.
    pub const COMP_TYPE_NOT_SUPPORTED: i32 = -9;
    /// The requested level is not supported by the selected algorithm.
    pub const COMP_LEVEL_NOT_SUPPORTED: i32 = -10;
    /// A non-empty input span had no backing buffer.
    pub const INVALID_INPUT_DATA: i32 = -11;
    /// A non-empty output span had no backing buffer.
    pub const INVALID_OUTPUT_DATA: i32 = -12;
    /// The backend failed or reported impossible byte counts.
    pub const COMPRESSION_FAILED: i32 = -13;
    /// A size computation exceeded the signed 64-bit range.
    pub const OVERFLOW: i32 = -14;
    /// The deflate stream could not be initialised, is gone, or failed to end.
    pub const GZ_INVALID_STATE: i32 = -16;
    /// The deflate size bound exceeded the signed 64-bit range.
    pub const GZ_OVERFLOW: i32 = -17;
    /// The zstd stream could not be initialised or is gone.
    pub const ZSTD_INVALID_STATE: i32 = -18;
    /// The zstd library reported an error code.
    pub const ZSTD_COMPRESSION_FAILED: i32 = -19;
    /// The brotli encoder refused its configuration.
    pub const BR_INVALID_STATE: i32 = -24;
}

/// Errors reported by compression states and their backends.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Error)]
pub enum CompressError {
    /// A required pointer or handle was missing.
    #[error("invalid or null pointer")]
    InvalidPtr,
    /// The allocator returned no memory.
    #[error("out of memory")]
    OutOfMemory,
    /// An argument fell outside its permitted range.
    #[error("argument out of bounds")]
    OutOfBounds,
    /// The call is not permitted in the current state.
    #[error("invalid argument")]
    InvalidArgument,
    /// The algorithm is not compiled in, or is `None`.
    #[error("compressor type not supported")]
    CompTypeNotSupported,
    /// The level is outside `0..=9` or rejected by the backend.
    #[error("compression level not supported")]
    CompLevelNotSupported,
    /// Input length was non-zero but no input buffer was supplied.
    #[error("input length is non-zero but the input buffer is missing")]
    InvalidInputData,
    /// Output length was non-zero but no output buffer was supplied.
    #[error("output length is non-zero but the output buffer is missing")]
    InvalidOutputData,
    /// The backend failed, or reported more progress than the spans allow.
    #[error("compression failed")]
    CompressionFailed,
    /// A length or size bound exceeded the signed 64-bit range.
    #[error("size overflow")]
    Overflow,
    /// zlib rejected the stream parameters, the stream was already ended, or
    /// `deflateEnd` found it inconsistent.
    #[error("deflate stream is not in a usable state")]
    GzInvalidState,
    /// The deflate size bound overflowed.
    #[error("deflate size bound overflowed")]
    GzOverflow,
    /// `ZSTD_initCStream` failed, or the stream was already freed.
    #[error("zstd stream is not in a usable state")]
    ZstdInvalidState,
    /// The zstd library reported an error.
    #[error("zstd compression failed")]
    ZstdCompressionFailed,
    /// The brotli encoder refused a parameter while being set up.
    #[error("brotli encoder refused its configuration")]
    BrInvalidState,
}

impl CompressError {
    /// Returns the stable registry code for this error.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::InvalidPtr => codes::INVALID_PTR,
            Self::OutOfMemory => codes::OUT_OF_MEMORY,
            Self::OutOfBounds => codes::OUT_OF_BOUNDS,
            Self::InvalidArgument => codes::INVALID_ARGUMENT,
            Self::CompTypeNotSupported => codes::COMP_TYPE_NOT_SUPPORTED,
            Self::CompLevelNotSupported => codes::COMP_LEVEL_NOT_SUPPORTED,
            Self::InvalidInputData => codes::INVALID_INPUT_DATA,
            Self::InvalidOutputData => codes::INVALID_OUTPUT_DATA,
            Self::CompressionFailed => codes::COMPRESSION_FAILED,
            Self::Overflow => codes::OVERFLOW,
            Self::GzInvalidState => codes::GZ_INVALID_STATE,
            Self::GzOverflow => codes::GZ_OVERFLOW,
            Self::ZstdInvalidState => codes::ZSTD_INVALID_STATE,
            Self::ZstdCompressionFailed => codes::ZSTD_COMPRESSION_FAILED,
            Self::BrInvalidState => codes::BR_INVALID_STATE,
        }
    }

    /// Looks up the error registered under `code`.
    ///
    /// Returns `None` for non-negative values and for codes outside the registry.
    #[must_use]
    pub const fn from_code(code: i32) -> Option<Self> {
        Some(match code {
            codes::INVALID_PTR => Self::InvalidPtr,
            codes::OUT_OF_MEMORY => Self::OutOfMemory,
            codes::OUT_OF_BOUNDS => Self::OutOfBounds,
            codes::INVALID_ARGUMENT => Self::InvalidArgument,
            codes::COMP_TYPE_NOT_SUPPORTED => Self::CompTypeNotSupported,
            codes::COMP_LEVEL_NOT_SUPPORTED => Self::CompLevelNotSupported,
            codes::INVALID_INPUT_DATA => Self::InvalidInputData,
            codes::INVALID_OUTPUT_DATA => Self::InvalidOutputData,
            codes::COMPRESSION_FAILED => Self::CompressionFailed,
            codes::OVERFLOW => Self::Overflow,
            codes::GZ_INVALID_STATE => Self::GzInvalidState,
            codes::GZ_OVERFLOW => Self::GzOverflow,
            codes::ZSTD_INVALID_STATE => Self::ZstdInvalidState,
            codes::ZSTD_COMPRESSION_FAILED => Self::ZstdCompressionFailed,
            codes::BR_INVALID_STATE => Self::BrInvalidState,
            _ => return None,
        })
    }
}

impl From<CompressError> for i32 {
    fn from(err: CompressError) -> Self {
        err.code()
    }
}

impl From<CompressError> for i64 {
    fn from(err: CompressError) -> Self {
        i64::from(err.code())
    }
}
