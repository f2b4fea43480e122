//! Zstandard adapter over a raw `ZSTD_CStream`.
//!
//! The stream is created with the state's allocator through zstd's
//! custom-memory hook, so every internal allocation of the encoder goes
//! through the same strategy as the state itself.

use core::ffi::c_void;
use core::ptr::NonNull;

use zstd::zstd_safe::zstd_sys::{
    ZSTD_CStream, ZSTD_CStreamInSize, ZSTD_CStreamOutSize, ZSTD_EndDirective, ZSTD_compressBound,
    ZSTD_compressStream2, ZSTD_createCStream_advanced, ZSTD_customMem, ZSTD_freeCStream,
    ZSTD_inBuffer, ZSTD_initCStream, ZSTD_isError, ZSTD_outBuffer,
};

use super::{Backend, BlockStatus};
use crate::algorithm::CompressorType;
use crate::alloc::Allocator;
use crate::error::{CompressError, CompressResult};
use crate::level::CompressionLevel;
use crate::operation::CompressionOperation;
use crate::trace::trace_backend;

const LEVEL_FASTEST: i32 = 1;
const LEVEL_OPTIMAL: i32 = 6;

pub(crate) struct ZstdBackend {
    stream: Option<NonNull<ZSTD_CStream>>,
    finished: bool,
    // Handed to zstd as `opaque`; reclaimed after the stream is freed.
    allocator: NonNull<Allocator>,
}

// SAFETY: the stream and the allocator box are exclusively owned and only
// touched through `&mut self`; zstd keeps no thread-local state for a stream.
unsafe impl Send for ZstdBackend {}

impl ZstdBackend {
    pub(crate) fn new(level: CompressionLevel, allocator: &Allocator) -> CompressResult<Self> {
        let allocator = NonNull::from(Box::leak(Box::new(allocator.clone())));
        let mut backend = Self {
            stream: None,
            finished: false,
            allocator,
        };
        let custom_mem = ZSTD_customMem {
            customAlloc: Some(zstd_alloc),
            customFree: Some(zstd_free),
            opaque: allocator.as_ptr().cast(),
        };

        // SAFETY: the callbacks and `opaque` stay valid until `Drop` has freed
        // the stream.
        let stream = unsafe { ZSTD_createCStream_advanced(custom_mem) };
        let stream = NonNull::new(stream).ok_or(CompressError::OutOfMemory)?;
        backend.stream = Some(stream);

        // SAFETY: `stream` was created above and is live.
        let code = unsafe { ZSTD_initCStream(stream.as_ptr(), zstd_level(level)) };
        if is_error(code) {
            trace_backend(CompressorType::Zstd, "stream initialisation failed");
            return Err(CompressError::ZstdInvalidState);
        }
        Ok(backend)
    }

    /// Frees the stream once. Returns `false` when zstd reports an error.
    fn free_stream(&mut self) -> bool {
        self.stream.take().is_none_or(|stream| {
            // SAFETY: `stream` is live and released exactly once here.
            !is_error(unsafe { ZSTD_freeCStream(stream.as_ptr()) })
        })
    }
}

fn zstd_level(level: CompressionLevel) -> i32 {
    match level {
        CompressionLevel::NoCompression | CompressionLevel::Fastest => LEVEL_FASTEST,
        CompressionLevel::Optimal => LEVEL_OPTIMAL,
        CompressionLevel::SmallestSize => *zstd::compression_level_range().end(),
        CompressionLevel::Other(_) => zstd::DEFAULT_COMPRESSION_LEVEL,
    }
}

fn is_error(code: usize) -> bool {
    // SAFETY: `ZSTD_isError` only inspects the integer.
    unsafe { ZSTD_isError(code) != 0 }
}

unsafe extern "C" fn zstd_alloc(opaque: *mut c_void, size: usize) -> *mut c_void {
    // SAFETY: `opaque` is the boxed allocator owned by the backend.
    let allocator = unsafe { &*opaque.cast::<Allocator>() };
    allocator.allocate_raw(size)
}

unsafe extern "C" fn zstd_free(opaque: *mut c_void, address: *mut c_void) {
    // SAFETY: `opaque` is the boxed allocator owned by the backend and
    // `address` was returned by `zstd_alloc`.
    unsafe {
        let allocator = &*opaque.cast::<Allocator>();
        allocator.deallocate_raw(address);
    }
}

impl Backend for ZstdBackend {
    fn compress_block(&mut self, op: &mut CompressionOperation<'_>) -> CompressResult<BlockStatus> {
        let flush = op.flush();
        if op.input().is_empty() && !flush {
            return Ok(BlockStatus::Continue);
        }
        // Confirmation call after a completed frame.
        if flush && self.finished {
            return Ok(BlockStatus::Finished);
        }

        let stream = self.stream.ok_or(CompressError::ZstdInvalidState)?;
        let directive = if flush {
            ZSTD_EndDirective::ZSTD_e_end
        } else {
            ZSTD_EndDirective::ZSTD_e_continue
        };

        let (input, output) = op.spans();
        let mut in_buffer = ZSTD_inBuffer {
            src: input.as_ptr().cast(),
            size: input.len(),
            pos: 0,
        };
        let mut out_buffer = ZSTD_outBuffer {
            dst: output.as_mut_ptr().cast(),
            size: output.len(),
            pos: 0,
        };

        // SAFETY: the buffers describe live caller spans for the duration of
        // the call and the stream is owned by `self`.
        let remaining = unsafe {
            ZSTD_compressStream2(
                stream.as_ptr(),
                &mut out_buffer,
                &mut in_buffer,
                directive,
            )
        };

        if is_error(remaining) {
            trace_backend(CompressorType::Zstd, "ZSTD_compressStream2 reported an error");
            return Err(CompressError::ZstdCompressionFailed);
        }
        op.record_progress(in_buffer.pos, out_buffer.pos)?;

        if !flush {
            self.finished = false;
            Ok(BlockStatus::Continue)
        } else if remaining == 0 {
            self.finished = true;
            Ok(BlockStatus::Finished)
        } else {
            Ok(BlockStatus::Pending)
        }
    }

    fn compressed_size(&self, length: u64, flush: bool) -> CompressResult<u64> {
        let length = usize::try_from(length).map_err(|_| CompressError::Overflow)?;
        // SAFETY: pure size computations.
        let (bound, out_size) = unsafe { (ZSTD_compressBound(length), ZSTD_CStreamOutSize()) };
        if is_error(bound) {
            return Err(CompressError::Overflow);
        }
        let bound = if flush {
            bound.checked_add(out_size).ok_or(CompressError::Overflow)?
        } else {
            bound
        };
        u64::try_from(bound)
            .ok()
            .filter(|&bound| bound <= i64::MAX as u64)
            .ok_or(CompressError::Overflow)
    }

    fn is_finished(&self) -> bool {
        self.finished
    }

    fn block_size(&self) -> Option<usize> {
        // SAFETY: pure size query.
        Some(unsafe { ZSTD_CStreamInSize() })
    }

    fn release(mut self: Box<Self>) -> CompressResult<()> {
        if self.free_stream() {
            Ok(())
        } else {
            Err(CompressError::ZstdCompressionFailed)
        }
    }
}

impl Drop for ZstdBackend {
    fn drop(&mut self) {
        let _ = self.free_stream();
        // SAFETY: the box was leaked in `new` and nothing references it now
        // that the stream is gone.
        drop(unsafe { Box::from_raw(self.allocator.as_ptr()) });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compress(backend: &mut ZstdBackend, input: &[u8], flush: bool) -> (Vec<u8>, BlockStatus) {
        let mut out = vec![0u8; 1024];
        let mut op = CompressionOperation::new(input, &mut out, flush);
        let status = backend.compress_block(&mut op).expect("compress");
        (op.written().to_vec(), status)
    }

    #[test]
    fn finished_stream_short_circuits_repeated_flush() {
        let mut backend =
            ZstdBackend::new(CompressionLevel::Fastest, &Allocator::system()).expect("stream");
        let (frame, status) = compress(&mut backend, b"zstd payload", true);
        assert_eq!(status, BlockStatus::Finished);
        assert!(backend.is_finished());

        let (again, status) = compress(&mut backend, b"", true);
        assert_eq!(status, BlockStatus::Finished);
        assert!(again.is_empty());

        assert_eq!(zstd::decode_all(&frame[..]).expect("decode"), b"zstd payload");
    }

    #[test]
    fn continue_after_finish_starts_a_new_frame() {
        let mut backend =
            ZstdBackend::new(CompressionLevel::Optimal, &Allocator::system()).expect("stream");
        let (first, _) = compress(&mut backend, b"one", true);
        let (partial, status) = compress(&mut backend, b"two", false);
        assert_eq!(status, BlockStatus::Continue);
        assert!(!backend.is_finished());
        let (tail, _) = compress(&mut backend, b"", true);

        let stream = [first, partial, tail].concat();
        assert_eq!(zstd::decode_all(&stream[..]).expect("decode"), b"onetwo");
    }

    #[test]
    fn block_size_matches_library_recommendation() {
        let backend =
            ZstdBackend::new(CompressionLevel::SmallestSize, &Allocator::shared_heap()).expect("stream");
        assert_eq!(backend.block_size(), Some(zstd::zstd_safe::CCtx::in_size()));
    }

    #[test]
    fn flush_bound_adds_stream_output_size() {
        let backend =
            ZstdBackend::new(CompressionLevel::Fastest, &Allocator::system()).expect("stream");
        let streaming = backend.compressed_size(4096, false).expect("bound");
        let flushing = backend.compressed_size(4096, true).expect("bound");
        assert_eq!(flushing - streaming, zstd::zstd_safe::CCtx::out_size() as u64);
    }

    #[test]
    fn freed_stream_reports_invalid_state() {
        let mut backend =
            ZstdBackend::new(CompressionLevel::Fastest, &Allocator::system()).expect("stream");
        assert!(backend.free_stream());

        let mut out = [0u8; 64];
        let mut op = CompressionOperation::new(b"late", &mut out, false);
        assert_eq!(
            backend.compress_block(&mut op).expect_err("no stream"),
            CompressError::ZstdInvalidState
        );
    }

    #[test]
    fn release_frees_the_stream() {
        let backend =
            ZstdBackend::new(CompressionLevel::Fastest, &Allocator::system()).expect("stream");
        Box::new(backend).release().expect("release");
    }
}
