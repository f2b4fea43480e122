//! crates/compress/src/backend/mod.rs
//!
//! Codec adapters behind a single streaming contract.
//!
//! Each adapter owns one third-party streaming encoder and implements
//! [`Backend`]. [`create`] is the only place that knows which adapters are
//! compiled in; the state never matches on algorithm tags itself.

#[cfg(feature = "brotli")]
mod brotli;
#[cfg(any(feature = "zlib-rs", feature = "zlib-ng"))]
mod deflate;
#[cfg(feature = "zstd")]
mod zstd;

use crate::algorithm::CompressorType;
use crate::alloc::Allocator;
use crate::error::{CompressError, CompressResult};
use crate::level::CompressionLevel;
use crate::operation::CompressionOperation;

/// Outcome of a successful compress step.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BlockStatus {
    /// The stream is open and accepts more input.
    Continue,
    /// A flush was requested but the output span filled up; call again with
    /// `flush` set and a fresh output span to drain the rest.
    Pending,
    /// The stream has been terminated and every trailer byte was emitted.
    Finished,
}

impl BlockStatus {
    /// Whether the stream has been completely terminated.
    #[must_use]
    pub const fn is_finished(self) -> bool {
        matches!(self, Self::Finished)
    }
}

/// Streaming compressor contract shared by every codec adapter.
pub(crate) trait Backend: Send {
    /// Feeds the operation's input to the encoder, terminating the stream when
    /// the operation requests a flush. Progress is recorded on `op`.
    fn compress_block(&mut self, op: &mut CompressionOperation<'_>) -> CompressResult<BlockStatus>;

    /// Upper bound on the output produced by compressing `length` bytes.
    ///
    /// `length` is non-zero and no larger than `i64::MAX`.
    fn compressed_size(&self, length: u64, flush: bool) -> CompressResult<u64>;

    /// Whether the last flush terminated the stream completely.
    fn is_finished(&self) -> bool;

    /// Input chunk size the encoder prefers, if it has an opinion.
    fn block_size(&self) -> Option<usize> {
        None
    }

    /// Tears the encoder down. Resources are released even when an error is
    /// reported.
    fn release(self: Box<Self>) -> CompressResult<()>;
}

/// Builds the adapter for `kind`.
///
/// `block_size` is the hint retained on the state from a previous compressor,
/// zero when none was recorded.
#[cfg_attr(
    not(all(
        feature = "brotli",
        any(feature = "zstd", feature = "zlib-rs", feature = "zlib-ng")
    )),
    allow(unused_variables)
)]
pub(crate) fn create(
    kind: CompressorType,
    level: CompressionLevel,
    block_size: usize,
    allocator: &Allocator,
) -> CompressResult<Box<dyn Backend>> {
    match kind {
        #[cfg(any(feature = "zlib-rs", feature = "zlib-ng"))]
        CompressorType::Gzip | CompressorType::Deflate => {
            Ok(Box::new(deflate::DeflateBackend::new(kind, level, allocator)?))
        }
        #[cfg(feature = "brotli")]
        CompressorType::Brotli => Ok(Box::new(brotli::BrotliBackend::new(level, block_size)?)),
        #[cfg(feature = "zstd")]
        CompressorType::Zstd => Ok(Box::new(zstd::ZstdBackend::new(level, allocator)?)),
        _ => Err(CompressError::CompTypeNotSupported),
    }
}
