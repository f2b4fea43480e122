//! Raw deflate and gzip adapter over a zlib `z_stream`.
//!
//! The stream is initialised with `zalloc`/`zfree` pointing at the state's
//! allocator, so the window, hash chains and pending buffer live in the same
//! memory as the state. The zlib implementation is chosen at build time:
//! zlib-rs through `libz-rs-sys`, or zlib-ng in zlib-compatible mode through
//! `libz-sys`. When both features are enabled zlib-ng wins.

use core::ffi::{c_int, c_uint, c_void};
use core::mem;
use core::ptr::{self, NonNull};

#[cfg(feature = "zlib-ng")]
use libz_sys as zlib;
#[cfg(all(feature = "zlib-rs", not(feature = "zlib-ng")))]
use libz_rs_sys as zlib;

use super::{Backend, BlockStatus};
use crate::algorithm::CompressorType;
use crate::alloc::Allocator;
use crate::error::{CompressError, CompressResult};
use crate::level::CompressionLevel;
use crate::operation::CompressionOperation;
use crate::trace::trace_backend;

/// Largest window supported by deflate.
const WINDOW_BITS: c_int = 15;

/// Added to the window bits to request gzip framing.
const GZIP_WINDOW_OFFSET: c_int = 16;

/// zlib's default `memLevel`.
const MEM_LEVEL: c_int = 8;

/// Bytes added by gzip framing: a 10-byte header and an 8-byte trailer.
const GZIP_WRAPPER_LEN: u64 = 18;

pub(crate) struct DeflateBackend {
    // Boxed so the address zlib records in its internal state never moves.
    stream: Option<Box<zlib::z_stream>>,
    kind: CompressorType,
    finished: bool,
    // Handed to zlib as `opaque`; reclaimed after `deflateEnd`.
    allocator: NonNull<Allocator>,
}

// SAFETY: the stream and the allocator box are exclusively owned and only
// touched through `&mut self`; zlib keeps no thread-local state for a stream.
unsafe impl Send for DeflateBackend {}

impl DeflateBackend {
    pub(crate) fn new(
        kind: CompressorType,
        level: CompressionLevel,
        allocator: &Allocator,
    ) -> CompressResult<Self> {
        let allocator = NonNull::from(Box::leak(Box::new(allocator.clone())));
        let mut backend = Self {
            stream: None,
            kind,
            finished: false,
            allocator,
        };

        let window_bits = if kind == CompressorType::Gzip {
            WINDOW_BITS + GZIP_WINDOW_OFFSET
        } else {
            -WINDOW_BITS
        };
        let mut stream = Box::new(blank_stream(allocator.as_ptr().cast()));

        // SAFETY: `stream` is boxed and outlives the call; the callbacks and
        // `opaque` stay valid until `Drop` has ended the stream.
        let code = unsafe {
            zlib::deflateInit2_(
                &raw mut *stream,
                deflate_level(level),
                zlib::Z_DEFLATED,
                window_bits,
                MEM_LEVEL,
                zlib::Z_DEFAULT_STRATEGY,
                zlib::zlibVersion(),
                mem::size_of::<zlib::z_stream>() as c_int,
            )
        };
        match code {
            zlib::Z_OK => {
                backend.stream = Some(stream);
                Ok(backend)
            }
            zlib::Z_MEM_ERROR => Err(CompressError::OutOfMemory),
            _ => {
                trace_backend(kind, "deflateInit2 rejected the stream parameters");
                Err(CompressError::GzInvalidState)
            }
        }
    }

    fn wrapper_len(&self) -> u64 {
        if self.kind == CompressorType::Gzip {
            GZIP_WRAPPER_LEN
        } else {
            0
        }
    }

    /// Ends the stream once, returning zlib's status, or `None` when there
    /// was no stream left to end.
    fn end_stream(&mut self) -> Option<c_int> {
        self.stream.take().map(|mut stream| {
            // SAFETY: the stream was initialised by `deflateInit2_` and is
            // ended exactly once here.
            unsafe { zlib::deflateEnd(&raw mut *stream) }
        })
    }
}

#[cfg(feature = "zlib-ng")]
fn blank_stream(opaque: *mut c_void) -> zlib::z_stream {
    zlib::z_stream {
        next_in: ptr::null_mut::<u8>(),
        avail_in: 0,
        total_in: 0,
        next_out: ptr::null_mut(),
        avail_out: 0,
        total_out: 0,
        msg: ptr::null_mut(),
        state: ptr::null_mut(),
        zalloc: zlib_alloc,
        zfree: zlib_free,
        opaque,
        data_type: 0,
        adler: 0,
        reserved: 0,
    }
}

#[cfg(all(feature = "zlib-rs", not(feature = "zlib-ng")))]
fn blank_stream(opaque: *mut c_void) -> zlib::z_stream {
    zlib::z_stream {
        zalloc: Some(zlib_alloc),
        zfree: Some(zlib_free),
        opaque,
        ..zlib::z_stream::default()
    }
}

fn deflate_level(level: CompressionLevel) -> c_int {
    match level {
        CompressionLevel::NoCompression => zlib::Z_NO_COMPRESSION,
        CompressionLevel::Fastest => zlib::Z_BEST_SPEED,
        CompressionLevel::Optimal | CompressionLevel::SmallestSize => zlib::Z_BEST_COMPRESSION,
        CompressionLevel::Other(_) => zlib::Z_DEFAULT_COMPRESSION,
    }
}

unsafe extern "C" fn zlib_alloc(opaque: *mut c_void, items: c_uint, size: c_uint) -> *mut c_void {
    let Some(bytes) = (items as usize).checked_mul(size as usize) else {
        return ptr::null_mut();
    };
    // SAFETY: `opaque` is the boxed allocator owned by the backend.
    let allocator = unsafe { &*opaque.cast::<Allocator>() };
    allocator.allocate_raw(bytes)
}

unsafe extern "C" fn zlib_free(opaque: *mut c_void, address: *mut c_void) {
    // SAFETY: `opaque` is the boxed allocator owned by the backend and
    // `address` was returned by `zlib_alloc`.
    unsafe {
        let allocator = &*opaque.cast::<Allocator>();
        allocator.deallocate_raw(address);
    }
}

impl Backend for DeflateBackend {
    fn compress_block(&mut self, op: &mut CompressionOperation<'_>) -> CompressResult<BlockStatus> {
        let flush = op.flush();
        if op.input().is_empty() && !flush {
            return Ok(BlockStatus::Continue);
        }

        let stream = self.stream.as_deref_mut().ok_or(CompressError::GzInvalidState)?;
        let mode = if flush { zlib::Z_FINISH } else { zlib::Z_NO_FLUSH };

        let (input, output) = op.spans();
        let avail_in = c_uint::try_from(input.len()).unwrap_or(c_uint::MAX);
        let avail_out = c_uint::try_from(output.len()).unwrap_or(c_uint::MAX);
        stream.next_in = input.as_ptr().cast_mut();
        stream.avail_in = avail_in;
        stream.next_out = output.as_mut_ptr();
        stream.avail_out = avail_out;

        // SAFETY: the cursors describe live caller spans for the duration of
        // the call and the stream is owned by `self`.
        let code = unsafe { zlib::deflate(&raw mut *stream, mode) };

        let read = (avail_in - stream.avail_in) as usize;
        let written = (avail_out - stream.avail_out) as usize;
        stream.next_in = ptr::null_mut::<u8>();
        stream.avail_in = 0;
        stream.next_out = ptr::null_mut();
        stream.avail_out = 0;
        op.record_progress(read, written)?;

        match code {
            zlib::Z_STREAM_END => {
                self.finished = true;
                Ok(BlockStatus::Finished)
            }
            zlib::Z_OK | zlib::Z_BUF_ERROR if flush => Ok(BlockStatus::Pending),
            zlib::Z_OK | zlib::Z_BUF_ERROR => Ok(BlockStatus::Continue),
            _ => {
                trace_backend(self.kind, "deflate reported an error");
                Err(CompressError::CompressionFailed)
            }
        }
    }

    fn compressed_size(&self, length: u64, _flush: bool) -> CompressResult<u64> {
        let fixed = length
            .checked_add((length >> 3) + (length >> 8) + (length >> 9) + 4)
            .ok_or(CompressError::GzOverflow)?;
        let stored = length
            .checked_add((length >> 5) + (length >> 7) + (length >> 11) + 7)
            .ok_or(CompressError::GzOverflow)?;
        let bound = fixed
            .max(stored)
            .checked_add(self.wrapper_len())
            .ok_or(CompressError::GzOverflow)?;
        if bound > i64::MAX as u64 {
            return Err(CompressError::GzOverflow);
        }
        Ok(bound)
    }

    fn is_finished(&self) -> bool {
        self.finished
    }

    fn release(mut self: Box<Self>) -> CompressResult<()> {
        match self.end_stream() {
            Some(zlib::Z_OK) => Ok(()),
            // Ending a stream that was never finished reports a data error;
            // its memory is released all the same.
            Some(zlib::Z_DATA_ERROR) => {
                trace_backend(self.kind, "stream released before termination");
                Ok(())
            }
            Some(_) | None => Err(CompressError::GzInvalidState),
        }
    }
}

impl Drop for DeflateBackend {
    fn drop(&mut self) {
        let _ = self.end_stream();
        // SAFETY: the box was leaked in `new` and nothing references it now
        // that the stream is gone.
        drop(unsafe { Box::from_raw(self.allocator.as_ptr()) });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn backend(kind: CompressorType, level: CompressionLevel) -> DeflateBackend {
        DeflateBackend::new(kind, level, &Allocator::system()).expect("stream")
    }

    fn run(backend: &mut DeflateBackend, input: &[u8], flush: bool) -> (Vec<u8>, BlockStatus) {
        let mut out = vec![0u8; 256];
        let mut op = CompressionOperation::new(input, &mut out, flush);
        let status = backend.compress_block(&mut op).expect("compress");
        assert_eq!(op.bytes_read(), input.len());
        (op.written().to_vec(), status)
    }

    #[test]
    fn gzip_stream_carries_header_and_decodes() {
        let mut backend = backend(CompressorType::Gzip, CompressionLevel::Fastest);
        let (out, status) = run(&mut backend, b"payload", true);
        assert_eq!(status, BlockStatus::Finished);
        assert_eq!(&out[..2], &[0x1f, 0x8b]);

        let mut decoded = Vec::new();
        flate2::read::GzDecoder::new(&out[..])
            .read_to_end(&mut decoded)
            .expect("gzip decode");
        assert_eq!(decoded, b"payload");
    }

    #[test]
    fn raw_deflate_has_no_wrapper() {
        let mut backend = backend(CompressorType::Deflate, CompressionLevel::Optimal);
        let (first, status) = run(&mut backend, b"raw raw raw raw", false);
        assert_eq!(status, BlockStatus::Continue);
        let (rest, status) = run(&mut backend, b"", true);
        assert_eq!(status, BlockStatus::Finished);

        let stream = [first, rest].concat();
        let mut decoded = Vec::new();
        flate2::read::DeflateDecoder::new(&stream[..])
            .read_to_end(&mut decoded)
            .expect("deflate decode");
        assert_eq!(decoded, b"raw raw raw raw");
    }

    #[test]
    fn small_output_span_leaves_flush_pending() {
        let mut backend = backend(CompressorType::Gzip, CompressionLevel::NoCompression);
        let input = vec![0x5au8; 64];
        let mut out = [0u8; 8];
        let mut op = CompressionOperation::new(&input, &mut out, true);
        let status = backend.compress_block(&mut op).expect("compress");
        assert_eq!(status, BlockStatus::Pending);
        assert_eq!(op.bytes_written(), 8);
    }

    #[test]
    fn bound_includes_gzip_wrapper() {
        let gzip = backend(CompressorType::Gzip, CompressionLevel::Optimal);
        let raw = backend(CompressorType::Deflate, CompressionLevel::Optimal);
        let gz_bound = gzip.compressed_size(1024, true).expect("bound");
        let raw_bound = raw.compressed_size(1024, true).expect("bound");
        assert_eq!(gz_bound - raw_bound, GZIP_WRAPPER_LEN);
        assert_eq!(raw_bound, raw.compressed_size(1024, false).expect("bound"));
        assert!(raw_bound > 1024);
    }

    #[test]
    fn bound_rejects_values_past_signed_range() {
        let gzip = backend(CompressorType::Gzip, CompressionLevel::Optimal);
        let err = gzip
            .compressed_size(i64::MAX as u64, true)
            .expect_err("overflow");
        assert_eq!(err, CompressError::GzOverflow);
    }

    #[test]
    fn finished_stream_releases_cleanly() {
        let mut backend = backend(CompressorType::Gzip, CompressionLevel::Optimal);
        let _ = run(&mut backend, b"done", true);
        Box::new(backend).release().expect("release");
    }

    #[test]
    fn unterminated_stream_releases_cleanly() {
        let mut backend = backend(CompressorType::Deflate, CompressionLevel::Fastest);
        let _ = run(&mut backend, b"never finished", false);
        Box::new(backend).release().expect("benign termination");
    }

    #[test]
    fn missing_stream_reports_invalid_state() {
        let mut backend = backend(CompressorType::Gzip, CompressionLevel::Fastest);
        assert_eq!(backend.end_stream(), Some(zlib::Z_OK));

        let mut out = [0u8; 32];
        let mut op = CompressionOperation::new(b"late", &mut out, false);
        assert_eq!(
            backend.compress_block(&mut op).expect_err("no stream"),
            CompressError::GzInvalidState
        );
        assert_eq!(
            Box::new(backend).release().expect_err("already ended"),
            CompressError::GzInvalidState
        );
    }
}
