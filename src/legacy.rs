//! src/legacy.rs
//!
//! One-shot entry points kept for callers built against the first version of
//! the library, where allocating a compressor also allocated its state.
//!
//! `AllocateCompressor` reports failures by returning the negative error code
//! cast to a pointer. This is a compatibility shim confined to this module;
//! [`is_error_handle`] lets every other export reject such values before they
//! are dereferenced.

#![allow(non_snake_case)]

use core::ffi::c_void;
use core::ptr::{self, NonNull};

use compress::{
    Allocator, CompressError, CompressResult, CompressionLevel, CompressionState, CompressorType,
};

use crate::handle;
use crate::status;

/// Encodes a registry error as a pointer value.
fn error_handle(err: CompressError) -> *mut c_void {
    ptr::without_provenance_mut(err.code() as isize as usize)
}

/// Reports whether `handle` is a registry error code encoded by
/// [`AllocateCompressor`] rather than a state address.
pub fn is_error_handle(handle: *const c_void) -> bool {
    i32::try_from(handle.addr() as isize)
        .ok()
        .and_then(CompressError::from_code)
        .is_some()
}

fn allocate(kind: i32, level: i32) -> CompressResult<NonNull<CompressionState>> {
    let level = CompressionLevel::from_raw(level)?;
    let kind = u32::try_from(kind)
        .ok()
        .and_then(CompressorType::from_bits)
        .unwrap_or(CompressorType::None);

    let mut state = handle::create(Allocator::default())?;
    // SAFETY: `state` was just created and is not shared.
    let attached = unsafe { state.as_mut() }.allocate_compressor(kind, level);
    if let Err(err) = attached {
        // SAFETY: `state` is released once and never handed out.
        let _ = unsafe { handle::destroy(state) };
        return Err(err);
    }
    Ok(state)
}

/// Allocates a state on the default heap and attaches a compressor to it.
///
/// Returns the state handle, which every other export accepts. On failure no
/// state is left behind and the negative error code is returned as the
/// pointer value; test the result with [`is_error_handle`] or by treating the
/// address as a signed integer.
#[unsafe(no_mangle)]
pub extern "C" fn AllocateCompressor(kind: i32, level: i32) -> *mut c_void {
    match allocate(kind, level) {
        Ok(state) => state.as_ptr().cast(),
        Err(err) => error_handle(err),
    }
}

/// Detaches the compressor and frees a state returned by
/// [`AllocateCompressor`]. The handle must not be used afterwards.
///
/// # Safety
///
/// `compressor` must be null, an encoded error, or a live handle that is not in
/// use on another thread.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn FreeCompressor(compressor: *mut c_void) -> i32 {
    let result = handle::resolve(compressor)
        // SAFETY: forwarded caller contract.
        .and_then(|state| unsafe { handle::destroy(state) });
    status(result)
}
