//! src/abi.rs
//!
//! C layout of a compress call and its conversion into the safe core type.

use core::ffi::c_void;
use core::slice;

use compress::{CompressError, CompressResult, CompressionOperation};

/// Caller-owned description of one `CompressBlock` call, laid out exactly like
/// the C `CompressionOperation` struct.
///
/// `bytes_read` and `bytes_written` are outputs. They are reset to zero at the
/// start of every call and never exceed the matching span length.
#[repr(C)]
#[derive(Debug)]
pub struct RawOperation {
    /// Input stream data. May be null when `bytes_in_length` is zero.
    pub bytes_in: *const c_void,
    /// Output buffer. May be null when `bytes_out_length` is zero.
    pub bytes_out: *mut c_void,
    /// Non-zero when this is the final chunk of the stream.
    pub flush: i32,
    /// Length of `bytes_in` in bytes.
    pub bytes_in_length: u32,
    /// Length of `bytes_out` in bytes.
    pub bytes_out_length: u32,
    /// Input bytes consumed by the call.
    pub bytes_read: u32,
    /// Output bytes produced by the call.
    pub bytes_written: u32,
}

impl RawOperation {
    /// Runs `step` against the spans described by `self`, then copies the
    /// progress counters back.
    ///
    /// Counters are written back even when `step` fails so the caller sees
    /// whatever progress is known.
    ///
    /// # Errors
    ///
    /// [`CompressError::InvalidInputData`] or
    /// [`CompressError::InvalidOutputData`] when a non-zero length comes with
    /// a null buffer, otherwise whatever `step` returns.
    ///
    /// # Safety
    ///
    /// Each non-null buffer must be valid for its stated length (reads for
    /// input, writes for output) for the duration of the call, and the two
    /// buffers must not overlap.
    pub(crate) unsafe fn run<T>(
        &mut self,
        step: impl FnOnce(&mut CompressionOperation<'_>) -> CompressResult<T>,
    ) -> CompressResult<T> {
        self.bytes_read = 0;
        self.bytes_written = 0;

        // SAFETY: forwarded caller contract.
        let input = unsafe { input_span(self.bytes_in, self.bytes_in_length) }?;
        // SAFETY: forwarded caller contract.
        let output = unsafe { output_span(self.bytes_out, self.bytes_out_length) }?;

        let mut op = CompressionOperation::new(input, output, self.flush != 0);
        let result = step(&mut op);

        // Both counts are bounded by u32 span lengths.
        self.bytes_read = op.bytes_read() as u32;
        self.bytes_written = op.bytes_written() as u32;
        result
    }
}

unsafe fn input_span<'a>(ptr: *const c_void, len: u32) -> CompressResult<&'a [u8]> {
    if len == 0 {
        return Ok(&[]);
    }
    if ptr.is_null() {
        return Err(CompressError::InvalidInputData);
    }
    // SAFETY: non-null and valid for `len` bytes per the caller contract.
    Ok(unsafe { slice::from_raw_parts(ptr.cast::<u8>(), len as usize) })
}

unsafe fn output_span<'a>(ptr: *mut c_void, len: u32) -> CompressResult<&'a mut [u8]> {
    if len == 0 {
        return Ok(&mut []);
    }
    if ptr.is_null() {
        return Err(CompressError::InvalidOutputData);
    }
    // SAFETY: non-null, valid for writes of `len` bytes and not aliased per
    // the caller contract.
    Ok(unsafe { slice::from_raw_parts_mut(ptr.cast::<u8>(), len as usize) })
}
