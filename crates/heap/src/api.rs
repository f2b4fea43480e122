//! NativeHeapApi exports.
//!
//! Only the shared heap exists. `heapCreate` hands it out for every request,
//! since mimalloc first-class heaps must be used from the thread that created
//! them, which managed callers cannot guarantee.

#![allow(non_snake_case)]

use core::ffi::c_void;
use core::ptr::{self, NonNull};

use crate::shared::{SHARED_HEAP_HANDLE, shared};

/// Opaque heap handle.
pub type HeapHandle = *mut c_void;

/// Pointer-sized status value. Non-null means success.
pub type Errno = *mut c_void;

/// Heap creation flags carried in [`UnmanagedHeapDescriptor::creation_flags`].
pub mod creation_flags {
    /// No flags.
    pub const NO_FLAGS: u32 = 0x00;
    /// Every allocation is zeroed before it is returned.
    pub const GLOBAL_ZERO: u32 = 0x01;
    /// The heap requires external serialisation.
    pub const SERIALIZE_ENABLED: u32 = 0x02;
    /// The caller requests the shared heap.
    pub const IS_SHARED: u32 = 0x04;
    /// The heap supports `heapRealloc`.
    pub const SUPPORTS_REALLOC: u32 = 0x08;
}

/// Descriptor filled in by [`heapCreate`].
#[repr(C)]
#[derive(Debug)]
pub struct UnmanagedHeapDescriptor {
    /// Receives the heap handle.
    pub heap_pointer: HeapHandle,
    /// Reserved status slot.
    pub flags: Errno,
    /// Requested creation flags, adjusted on return.
    pub creation_flags: u32,
}

fn shared_handle() -> HeapHandle {
    ptr::without_provenance_mut(SHARED_HEAP_HANDLE)
}

fn status(ok: bool) -> Errno {
    ptr::without_provenance_mut(usize::from(ok))
}

fn is_shared(heap: HeapHandle) -> bool {
    heap.addr() == SHARED_HEAP_HANDLE
}

/// Returns the handle of the process-wide shared heap.
#[unsafe(no_mangle)]
pub extern "C" fn heapGetSharedHeapHandle() -> HeapHandle {
    shared_handle()
}

/// Initialises `desc` with the shared heap.
///
/// # Safety
///
/// `desc` must be null or point to a writable descriptor.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn heapCreate(desc: *mut UnmanagedHeapDescriptor) -> Errno {
    // SAFETY: the caller guarantees `desc` is null or valid for writes.
    let Some(desc) = (unsafe { desc.as_mut() }) else {
        return status(false);
    };

    desc.creation_flags &= !creation_flags::SERIALIZE_ENABLED;
    desc.creation_flags |= creation_flags::SUPPORTS_REALLOC;
    desc.heap_pointer = shared_handle();

    #[cfg(feature = "tracing")]
    tracing::debug!(
        target: "native_compress::heap",
        flags = desc.creation_flags,
        "heap created (shared)"
    );

    desc.heap_pointer
}

/// Destroys a heap. The shared heap lives for the whole process, so this only
/// validates the handle.
#[unsafe(no_mangle)]
pub extern "C" fn heapDestroy(heap: HeapHandle) -> Errno {
    status(is_shared(heap))
}

/// Allocates `elements * size` bytes from `heap`.
#[unsafe(no_mangle)]
pub extern "C" fn heapAlloc(heap: HeapHandle, elements: u64, size: u64, zero: i32) -> *mut c_void {
    if !is_shared(heap) {
        return ptr::null_mut();
    }
    let (Ok(elements), Ok(size)) = (usize::try_from(elements), usize::try_from(size)) else {
        return ptr::null_mut();
    };
    shared()
        .alloc(elements, size, zero != 0)
        .map_or(ptr::null_mut(), |block| block.as_ptr().cast())
}

/// Resizes `block`. A null `block` behaves like [`heapAlloc`].
///
/// # Safety
///
/// `block` must be null or a live block returned by this heap.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn heapRealloc(
    heap: HeapHandle,
    block: *mut c_void,
    elements: u64,
    size: u64,
    zero: i32,
) -> *mut c_void {
    let Some(block) = NonNull::new(block.cast::<u8>()) else {
        return heapAlloc(heap, elements, size, zero);
    };
    if !is_shared(heap) {
        return ptr::null_mut();
    }
    let (Ok(elements), Ok(size)) = (usize::try_from(elements), usize::try_from(size)) else {
        return ptr::null_mut();
    };
    // SAFETY: the caller guarantees `block` is a live block of the shared heap.
    unsafe { shared().realloc(block, elements, size, zero != 0) }
        .map_or(ptr::null_mut(), |moved| moved.as_ptr().cast())
}

/// Releases `block`. A null block is accepted and ignored.
///
/// # Safety
///
/// `block` must be null or a live block returned by this heap.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn heapFree(heap: HeapHandle, block: *mut c_void) -> Errno {
    if !is_shared(heap) {
        return status(false);
    }
    if let Some(block) = NonNull::new(block.cast::<u8>()) {
        // SAFETY: the caller guarantees `block` is a live block of the shared heap.
        unsafe { shared().free(block) };
    }
    status(true)
}
