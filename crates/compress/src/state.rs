//! crates/compress/src/state.rs
//!
//! The reusable compression state and the operations callers drive it with.
//!
//! A [`CompressionState`] is either idle (no compressor attached) or active
//! (exactly one backend attached). Compressors are attached and detached
//! independently of the state's lifetime, so one state can host any number of
//! consecutive streams.

use core::fmt;

use crate::algorithm::CompressorType;
use crate::alloc::Allocator;
use crate::backend::{self, Backend, BlockStatus};
use crate::error::{CompressError, CompressResult};
use crate::level::CompressionLevel;
use crate::operation::CompressionOperation;
use crate::trace::{trace_attach, trace_block, trace_block_failed, trace_detach, trace_rejected};

/// Owner of at most one active compressor plus its allocator binding.
///
/// # Examples
///
/// ```
/// use compress::{CompressionLevel, CompressionOperation, CompressionState, CompressorType};
///
/// let mut state = CompressionState::new();
/// state
///     .allocate_compressor(CompressorType::Zstd, CompressionLevel::Fastest)
///     .expect("zstd is compiled in");
///
/// let bound = state.compressed_size(5, true).expect("bound") as usize;
/// let mut out = vec![0u8; bound];
/// let mut op = CompressionOperation::new(b"hello", &mut out, true);
/// state.compress_block(&mut op).expect("compressed");
/// assert_eq!(op.bytes_read(), 5);
///
/// state.free_compressor().expect("released");
/// assert!(!state.is_active());
/// ```
pub struct CompressionState {
    allocator: Allocator,
    kind: CompressorType,
    level: CompressionLevel,
    block_size: usize,
    backend: Option<Box<dyn Backend>>,
}

impl CompressionState {
    /// Creates an idle state bound to the default allocator.
    #[must_use]
    pub fn new() -> Self {
        Self::with_allocator(Allocator::default())
    }

    /// Creates an idle state bound to `allocator`.
    #[must_use]
    pub fn with_allocator(allocator: Allocator) -> Self {
        Self {
            allocator,
            kind: CompressorType::None,
            level: CompressionLevel::default(),
            block_size: 0,
            backend: None,
        }
    }

    /// Attaches a compressor of `kind` at `level`.
    ///
    /// # Errors
    ///
    /// - [`CompressError::CompLevelNotSupported`] when the backend does not
    ///   support `level`. Raw values outside `0..=9` never get this far; they
    ///   are rejected by [`CompressionLevel::from_raw`].
    /// - [`CompressError::InvalidArgument`] when a compressor is already
    ///   attached. The attached compressor is left untouched.
    /// - [`CompressError::CompTypeNotSupported`] for [`CompressorType::None`]
    ///   or an algorithm that is not compiled in.
    ///
    /// On any error the state stays idle (or keeps its existing compressor).
    pub fn allocate_compressor(
        &mut self,
        kind: CompressorType,
        level: CompressionLevel,
    ) -> CompressResult<()> {
        let result = self.try_attach(kind, level);
        match result {
            Ok(()) => trace_attach(kind, level, self.block_size),
            Err(err) => trace_rejected(kind, level.raw(), err),
        }
        result
    }

    fn try_attach(&mut self, kind: CompressorType, level: CompressionLevel) -> CompressResult<()> {
        if self.backend.is_some() {
            return Err(CompressError::InvalidArgument);
        }
        if !kind.is_supported() {
            return Err(CompressError::CompTypeNotSupported);
        }

        let backend = backend::create(kind, level, self.block_size, &self.allocator)?;
        if let Some(block_size) = backend.block_size() {
            self.block_size = block_size;
        }
        self.kind = kind;
        self.level = level;
        self.backend = Some(backend);
        Ok(())
    }

    /// Detaches the active compressor, returning the state to idle.
    ///
    /// Calling this on an idle state succeeds without doing anything. The state
    /// is idle afterwards even when the backend reports an error while tearing
    /// down; that error is returned. The block size hint survives so the next
    /// compressor can use it.
    pub fn free_compressor(&mut self) -> CompressResult<()> {
        let Some(backend) = self.backend.take() else {
            return Ok(());
        };
        let kind = core::mem::take(&mut self.kind);
        self.level = CompressionLevel::default();

        let result = backend.release();
        trace_detach(kind, result);
        result
    }

    /// Compresses one block.
    ///
    /// Progress counters on `op` are reset first. A call with empty input and
    /// no flush succeeds without reaching the backend. Otherwise the counters
    /// reflect whatever the backend consumed and produced, and never exceed the
    /// span lengths.
    ///
    /// # Errors
    ///
    /// - [`CompressError::CompTypeNotSupported`] when no compressor is attached.
    /// - [`CompressError::CompressionFailed`] when the backend fails or reports
    ///   impossible progress.
    /// - Backend specific codes, passed through unchanged.
    pub fn compress_block(&mut self, op: &mut CompressionOperation<'_>) -> CompressResult<BlockStatus> {
        op.reset_progress();
        let backend = self
            .backend
            .as_mut()
            .ok_or(CompressError::CompTypeNotSupported)?;

        if op.input().is_empty() && !op.flush() {
            return Ok(BlockStatus::Continue);
        }

        match backend.compress_block(op) {
            Ok(status) => {
                trace_block(self.kind, op.flush(), op.bytes_read(), op.bytes_written());
                Ok(status)
            }
            Err(err) => {
                trace_block_failed(self.kind, err);
                Err(err)
            }
        }
    }

    /// Upper bound on the output of compressing `length` bytes with the
    /// attached compressor.
    ///
    /// Suitable for sizing an output buffer; the actual output is usually much
    /// smaller.
    ///
    /// # Errors
    ///
    /// - [`CompressError::Overflow`] when `length` exceeds `i64::MAX`.
    /// - [`CompressError::CompTypeNotSupported`] when no compressor is attached.
    /// - Backend specific overflow codes when the bound itself does not fit.
    pub fn compressed_size(&self, length: u64, flush: bool) -> CompressResult<u64> {
        if length > i64::MAX as u64 {
            return Err(CompressError::Overflow);
        }
        let backend = self
            .backend
            .as_ref()
            .ok_or(CompressError::CompTypeNotSupported)?;
        if length == 0 {
            return Ok(0);
        }
        backend.compressed_size(length, flush)
    }

    /// Algorithm of the attached compressor, [`CompressorType::None`] when idle.
    #[must_use]
    pub const fn kind(&self) -> CompressorType {
        self.kind
    }

    /// Level of the attached compressor.
    #[must_use]
    pub const fn level(&self) -> CompressionLevel {
        self.level
    }

    /// Preferred input chunk size, zero when no backend has suggested one.
    #[must_use]
    pub const fn block_size(&self) -> usize {
        self.block_size
    }

    /// Whether a compressor is attached.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.backend.is_some()
    }

    /// Whether the attached compressor has fully terminated its stream.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.backend.as_ref().is_some_and(|backend| backend.is_finished())
    }

    /// Allocator bound to this state.
    #[must_use]
    pub const fn allocator(&self) -> &Allocator {
        &self.allocator
    }
}

impl Default for CompressionState {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for CompressionState {
    fn drop(&mut self) {
        let _ = self.free_compressor();
    }
}

impl fmt::Debug for CompressionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompressionState")
            .field("kind", &self.kind)
            .field("level", &self.level)
            .field("block_size", &self.block_size)
            .field("active", &self.is_active())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn active(kind: CompressorType) -> CompressionState {
        let mut state = CompressionState::new();
        state
            .allocate_compressor(kind, CompressionLevel::Fastest)
            .expect("compressor attached");
        state
    }

    #[test]
    fn new_state_is_idle() {
        let state = CompressionState::new();
        assert!(!state.is_active());
        assert_eq!(state.kind(), CompressorType::None);
        assert_eq!(state.block_size(), 0);
        assert!(!state.is_finished());
    }

    #[test]
    fn none_type_is_not_supported() {
        let mut state = CompressionState::new();
        let err = state
            .allocate_compressor(CompressorType::None, CompressionLevel::Optimal)
            .expect_err("none rejected");
        assert_eq!(err, CompressError::CompTypeNotSupported);
        assert!(!state.is_active());
    }

    #[test]
    fn idle_state_rejects_blocks_and_bounds() {
        let mut state = CompressionState::new();
        let mut out = [0u8; 8];
        let mut op = CompressionOperation::new(b"data", &mut out, true);
        assert_eq!(
            state.compress_block(&mut op).expect_err("no compressor"),
            CompressError::CompTypeNotSupported
        );
        assert_eq!(
            state.compressed_size(4, true).expect_err("no compressor"),
            CompressError::CompTypeNotSupported
        );
    }

    #[test]
    fn oversized_length_is_an_overflow() {
        let state = active(CompressorType::Deflate);
        assert_eq!(
            state
                .compressed_size(i64::MAX as u64 + 1, false)
                .expect_err("overflow"),
            CompressError::Overflow
        );
        assert_eq!(state.compressed_size(0, true).expect("zero"), 0);
    }

    #[test]
    fn free_resets_kind_but_keeps_block_size() {
        let mut state = active(CompressorType::Zstd);
        let block_size = state.block_size();
        assert!(block_size > 0);
        state.free_compressor().expect("released");
        assert_eq!(state.kind(), CompressorType::None);
        assert_eq!(state.level(), CompressionLevel::Optimal);
        assert_eq!(state.block_size(), block_size);
    }

    #[test]
    fn finished_flag_follows_the_backend() {
        let mut state = active(CompressorType::Gzip);
        let mut out = vec![0u8; 64];
        let mut op = CompressionOperation::new(b"abc", &mut out, true);
        let status = state.compress_block(&mut op).expect("compressed");
        assert!(status.is_finished());
        assert!(state.is_finished());
    }

    #[test]
    fn debug_output_names_the_kind() {
        let state = active(CompressorType::Brotli);
        assert!(format!("{state:?}").contains("Brotli"));
    }
}
