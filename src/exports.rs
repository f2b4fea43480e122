//! src/exports.rs
//!
//! The two-phase C ABI: a reusable state is allocated once, then hosts any
//! number of consecutive compressors.
//!
//! Every function returns a non-negative value on success and a negative
//! registry code on failure. Handles may come from either
//! [`CompressionAllocState`]/[`CompressionAllocState2`] or the legacy
//! [`AllocateCompressor`](crate::legacy::AllocateCompressor).

#![allow(non_snake_case)]

use core::ffi::c_void;

use compress::{
    AllocFn, Allocator, CompressError, CompressionLevel, CompressorType, FreeFn,
    supported_compressors,
};

use crate::abi::RawOperation;
use crate::{handle, status};

/// Bitmask of the compressor types compiled into this library.
#[unsafe(no_mangle)]
pub extern "C" fn GetSupportedCompressors() -> i32 {
    supported_compressors().bits() as i32
}

/// Allocates an idle state on the default heap and stores its handle in
/// `*state_ptr`.
///
/// # Safety
///
/// `state_ptr` must be null or valid for a pointer-sized write.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn CompressionAllocState(state_ptr: *mut *mut c_void) -> i32 {
    // SAFETY: forwarded caller contract.
    unsafe { alloc_state(state_ptr, Ok(Allocator::default())) }
}

/// Allocates an idle state whose memory, and the memory of any zstd
/// compressor it hosts, comes from the `alloc`/`free` callback pair.
///
/// Passing neither callback selects the default heap. Passing only one of
/// them fails with `InvalidArgument`.
///
/// # Safety
///
/// `state_ptr` must be null or valid for a pointer-sized write. The callbacks
/// must behave like `malloc`/`free`, be callable from any thread, and remain
/// valid together with `opaque` until the state is freed.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn CompressionAllocState2(
    state_ptr: *mut *mut c_void,
    alloc: Option<AllocFn>,
    free: Option<FreeFn>,
    opaque: *mut c_void,
) -> i32 {
    // SAFETY: forwarded caller contract.
    let allocator = unsafe { Allocator::from_callbacks(alloc, free, opaque) };
    // SAFETY: forwarded caller contract.
    unsafe { alloc_state(state_ptr, allocator) }
}

unsafe fn alloc_state(
    state_ptr: *mut *mut c_void,
    allocator: Result<Allocator, CompressError>,
) -> i32 {
    if state_ptr.is_null() {
        return CompressError::InvalidPtr.code();
    }
    let result = allocator.and_then(handle::create).map(|state| {
        // SAFETY: `state_ptr` is non-null and writable per the caller contract.
        unsafe { state_ptr.write(state.as_ptr().cast()) };
    });
    status(result)
}

/// Detaches any compressor and frees the state. The handle must not be used
/// afterwards.
///
/// # Safety
///
/// `state` must be null or a live handle that is not in use on another thread.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn CompressionFreeState(state: *mut c_void) -> i32 {
    let result = handle::resolve(state)
        // SAFETY: forwarded caller contract.
        .and_then(|state| unsafe { handle::destroy(state) });
    status(result)
}

/// Attaches a compressor of `kind` at `level` to an idle state.
///
/// Checks run in order: the level must lie in `0..=9`, the state must be idle,
/// and the type must be a single compiled-in algorithm.
///
/// # Safety
///
/// `state` must be null or a live handle that is not in use on another thread.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn CompressionAllocCompressor(state: *mut c_void, kind: i32, level: i32) -> i32 {
    // SAFETY: forwarded caller contract.
    let result = unsafe { handle::state_mut(state) }.and_then(|state| {
        let level = CompressionLevel::from_raw(level)?;
        // Combined or unknown flags fall through to the same rejection as None.
        let kind = u32::try_from(kind)
            .ok()
            .and_then(CompressorType::from_bits)
            .unwrap_or(CompressorType::None);
        state.allocate_compressor(kind, level)
    });
    status(result)
}

/// Detaches the compressor, leaving the state idle and reusable. Succeeds on
/// a state that is already idle.
///
/// # Safety
///
/// `state` must be null or a live handle that is not in use on another thread.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn CompressionFreeCompressor(state: *mut c_void) -> i32 {
    // SAFETY: forwarded caller contract.
    let result = unsafe { handle::state_mut(state) }.and_then(|state| state.free_compressor());
    status(result)
}

/// Type flag of the attached compressor, `0` when idle.
///
/// # Safety
///
/// `compressor` must be null or a live handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn GetCompressorType(compressor: *const c_void) -> i32 {
    // SAFETY: forwarded caller contract.
    unsafe { handle::state_ref(compressor) }
        .map_or_else(CompressError::code, |state| state.kind().bits() as i32)
}

/// Raw level of the attached compressor.
///
/// # Safety
///
/// `compressor` must be null or a live handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn GetCompressorLevel(compressor: *const c_void) -> i32 {
    // SAFETY: forwarded caller contract.
    unsafe { handle::state_ref(compressor) }
        .map_or_else(CompressError::code, |state| state.level().raw())
}

/// Preferred input chunk size in bytes, `0` when no backend suggested one.
///
/// # Safety
///
/// `compressor` must be null or a live handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn GetCompressorBlockSize(compressor: *const c_void) -> i64 {
    // SAFETY: forwarded caller contract.
    unsafe { handle::state_ref(compressor) }.map_or_else(
        |err| i64::from(err.code()),
        |state| i64::try_from(state.block_size()).unwrap_or(i64::MAX),
    )
}

/// Upper bound on the compressed size of `input_length` bytes.
///
/// # Safety
///
/// `compressor` must be null or a live handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn GetCompressedSize(
    compressor: *const c_void,
    input_length: u64,
    flush: i32,
) -> i64 {
    // SAFETY: forwarded caller contract.
    let result = unsafe { handle::state_ref(compressor) }
        .and_then(|state| state.compressed_size(input_length, flush != 0))
        .and_then(|bound| i64::try_from(bound).map_err(|_| CompressError::Overflow));
    result.unwrap_or_else(|err| i64::from(err.code()))
}

/// Compresses the block described by `operation`, updating its
/// `bytes_read`/`bytes_written` fields.
///
/// # Safety
///
/// `compressor` must be null or a live handle that is not in use on another
/// thread. `operation` must be null or point to a writable [`RawOperation`]
/// whose buffers satisfy the contract documented there.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn CompressBlock(compressor: *const c_void, operation: *mut RawOperation) -> i32 {
    // SAFETY: forwarded caller contract.
    let result = unsafe { handle::state_mut(compressor) }.and_then(|state| {
        // SAFETY: forwarded caller contract.
        let operation = unsafe { operation.as_mut() }.ok_or(CompressError::InvalidPtr)?;
        // SAFETY: forwarded caller contract.
        unsafe { operation.run(|op| state.compress_block(op)) }
    });
    status(result.map(drop))
}
