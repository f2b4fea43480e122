//! src/handle.rs
//!
//! Opaque state handles at the C boundary.
//!
//! A handle is the address of a [`CompressionState`] placed in memory obtained
//! from the state's own allocator. It is created and destroyed only here; every
//! export borrows through [`state_ref`] or [`state_mut`] for the length of one
//! call.

use core::ffi::c_void;
use core::mem::{align_of, size_of};
use core::ptr::NonNull;

use compress::{Allocator, CompressError, CompressResult, CompressionState};

use crate::legacy::is_error_handle;

/// Places a new idle state in memory obtained from `allocator`.
///
/// # Errors
///
/// [`CompressError::OutOfMemory`] when the allocator returns nothing, or a
/// block that is not suitably aligned for the state.
pub(crate) fn create(allocator: Allocator) -> CompressResult<NonNull<CompressionState>> {
    let block = allocator.allocate(size_of::<CompressionState>())?;
    if block.as_ptr().align_offset(align_of::<CompressionState>()) != 0 {
        // SAFETY: `block` was just produced by `allocator`.
        unsafe { allocator.deallocate_raw(block.as_ptr().cast()) };
        return Err(CompressError::OutOfMemory);
    }

    let state = block.cast::<CompressionState>();
    // SAFETY: `state` is aligned, large enough and uninitialised.
    unsafe { state.as_ptr().write(CompressionState::with_allocator(allocator)) };
    trace_created(state);
    Ok(state)
}

/// Detaches any compressor, drops the state and returns its memory to the
/// allocator it came from.
///
/// The memory is released even when detaching fails; that error is returned.
///
/// # Safety
///
/// `state` must come from [`create`], must not have been destroyed already and
/// must not be borrowed elsewhere.
pub(crate) unsafe fn destroy(state: NonNull<CompressionState>) -> CompressResult<()> {
    // SAFETY: live and exclusively owned per the caller contract.
    let live = unsafe { &mut *state.as_ptr() };
    let allocator = live.allocator().clone();
    let result = live.free_compressor();

    // SAFETY: `live` is not used past this point, and the block came from
    // `allocator`, which outlives the drop through the clone above.
    unsafe {
        state.as_ptr().drop_in_place();
        allocator.deallocate_raw(state.as_ptr().cast());
    }
    trace_destroyed(state, result);
    result
}

/// Resolves a handle, rejecting null and encoded legacy error values.
pub(crate) fn resolve(handle: *const c_void) -> CompressResult<NonNull<CompressionState>> {
    if is_error_handle(handle) {
        return Err(CompressError::InvalidPtr);
    }
    NonNull::new(handle.cast_mut().cast::<CompressionState>()).ok_or(CompressError::InvalidPtr)
}

/// Borrows the state behind `handle` for reading.
///
/// # Safety
///
/// A non-null `handle` must come from [`create`], must still be live and must
/// not be mutably borrowed for `'a`.
pub(crate) unsafe fn state_ref<'a>(handle: *const c_void) -> CompressResult<&'a CompressionState> {
    let state = resolve(handle)?;
    // SAFETY: forwarded caller contract.
    Ok(unsafe { state.as_ref() })
}

/// Borrows the state behind `handle` for writing.
///
/// # Safety
///
/// A non-null `handle` must come from [`create`], must still be live and must
/// not be borrowed elsewhere for `'a`.
pub(crate) unsafe fn state_mut<'a>(handle: *const c_void) -> CompressResult<&'a mut CompressionState> {
    let mut state = resolve(handle)?;
    // SAFETY: forwarded caller contract.
    Ok(unsafe { state.as_mut() })
}

#[cfg(feature = "tracing")]
#[inline]
fn trace_created(state: NonNull<CompressionState>) {
    tracing::trace!(
        target: "native_compress::state",
        operation = "create",
        address = ?state.as_ptr(),
        "state created"
    );
}

#[cfg(not(feature = "tracing"))]
#[inline]
fn trace_created(_state: NonNull<CompressionState>) {}

#[cfg(feature = "tracing")]
#[inline]
fn trace_destroyed(state: NonNull<CompressionState>, result: CompressResult<()>) {
    tracing::trace!(
        target: "native_compress::state",
        operation = "destroy",
        address = ?state.as_ptr(),
        code = result.err().map_or(compress::SUCCESS, CompressError::code),
        "state destroyed"
    );
}

#[cfg(not(feature = "tracing"))]
#[inline]
fn trace_destroyed(_state: NonNull<CompressionState>, _result: CompressResult<()>) {}
