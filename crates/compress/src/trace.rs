//! Diagnostic events for state transitions and backend failures.
//!
//! Every helper compiles to a no-op without the `tracing` feature.

use crate::algorithm::CompressorType;
use crate::error::CompressError;
use crate::level::CompressionLevel;

#[cfg(feature = "tracing")]
use tracing::{debug, trace, warn};

/// Trace a successful compressor allocation.
#[cfg(feature = "tracing")]
#[inline]
pub fn trace_attach(kind: CompressorType, level: CompressionLevel, block_size: usize) {
    debug!(
        target: "native_compress::state",
        operation = "attach",
        kind = kind.name(),
        level = level.raw(),
        block_size,
        "attached {} compressor (level {})",
        kind,
        level.raw()
    );
}

/// Trace a successful compressor allocation - no-op when tracing is disabled.
#[cfg(not(feature = "tracing"))]
#[inline]
pub fn trace_attach(_kind: CompressorType, _level: CompressionLevel, _block_size: usize) {}

/// Trace a compressor release.
#[cfg(feature = "tracing")]
#[inline]
pub fn trace_detach(kind: CompressorType, result: Result<(), CompressError>) {
    match result {
        Ok(()) => debug!(
            target: "native_compress::state",
            operation = "detach",
            kind = kind.name(),
            "detached {} compressor",
            kind
        ),
        Err(err) => warn!(
            target: "native_compress::state",
            operation = "detach",
            kind = kind.name(),
            code = err.code(),
            "detached {} compressor after backend error: {}",
            kind,
            err
        ),
    }
}

/// Trace a compressor release - no-op when tracing is disabled.
#[cfg(not(feature = "tracing"))]
#[inline]
pub fn trace_detach(_kind: CompressorType, _result: Result<(), CompressError>) {}

/// Trace a rejected compressor allocation.
#[cfg(feature = "tracing")]
#[inline]
pub fn trace_rejected(kind: CompressorType, level: i32, err: CompressError) {
    debug!(
        target: "native_compress::state",
        operation = "attach",
        kind = kind.name(),
        level,
        code = err.code(),
        "refused {} compressor at level {}: {}",
        kind,
        level,
        err
    );
}

/// Trace a rejected compressor allocation - no-op when tracing is disabled.
#[cfg(not(feature = "tracing"))]
#[inline]
pub fn trace_rejected(_kind: CompressorType, _level: i32, _err: CompressError) {}

/// Trace one compress step.
#[cfg(feature = "tracing")]
#[inline]
pub fn trace_block(kind: CompressorType, flush: bool, read: usize, written: usize) {
    trace!(
        target: "native_compress::state",
        operation = "compress",
        kind = kind.name(),
        flush,
        read,
        written,
        "{} block: {} in, {} out{}",
        kind,
        read,
        written,
        if flush { " (final)" } else { "" }
    );
}

/// Trace one compress step - no-op when tracing is disabled.
#[cfg(not(feature = "tracing"))]
#[inline]
pub fn trace_block(_kind: CompressorType, _flush: bool, _read: usize, _written: usize) {}

/// Trace a backend step that failed.
#[cfg(feature = "tracing")]
#[inline]
pub fn trace_block_failed(kind: CompressorType, err: CompressError) {
    warn!(
        target: "native_compress::state",
        operation = "compress",
        kind = kind.name(),
        code = err.code(),
        "{} block failed: {}",
        kind,
        err
    );
}

/// Trace a backend step that failed - no-op when tracing is disabled.
#[cfg(not(feature = "tracing"))]
#[inline]
pub fn trace_block_failed(_kind: CompressorType, _err: CompressError) {}

/// Trace a backend event under its own target.
#[cfg(feature = "tracing")]
#[inline]
pub fn trace_backend(kind: CompressorType, message: &str) {
    match kind {
        CompressorType::Gzip | CompressorType::Deflate => {
            debug!(target: "native_compress::deflate", kind = kind.name(), "{}", message);
        }
        CompressorType::Brotli => debug!(target: "native_compress::brotli", "{}", message),
        CompressorType::Zstd => debug!(target: "native_compress::zstd", "{}", message),
        CompressorType::None => {}
    }
}

/// Trace a backend event - no-op when tracing is disabled.
#[cfg(not(feature = "tracing"))]
#[inline]
pub fn trace_backend(_kind: CompressorType, _message: &str) {}
