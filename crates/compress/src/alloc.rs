//! crates/compress/src/alloc.rs
//!
//! Memory allocation strategy injected into every compression state.
//!
//! A state owns one [`Allocator`] for its whole lifetime. Backends that expose
//! a custom-memory hook route their internal allocations through it; the FFI
//! layer also places the state object itself in memory obtained from it.

use core::alloc::GlobalAlloc;
use core::ffi::c_void;
use core::fmt;
use core::ptr::NonNull;
use std::sync::Arc;

use heap::RawHeap;

use crate::error::{CompressError, CompressResult};

/// Foreign allocation callback: `alloc(opaque, size) -> ptr`.
pub type AllocFn = unsafe extern "C" fn(opaque: *mut c_void, size: usize) -> *mut c_void;

/// Foreign release callback: `free(opaque, ptr)`.
pub type FreeFn = unsafe extern "C" fn(opaque: *mut c_void, address: *mut c_void);

/// An unsized `malloc`/`free` style allocator.
///
/// Implementations must be thread safe: independent states may share one
/// allocator across threads.
pub trait MemoryAllocator: Send + Sync {
    /// Allocates `size` bytes aligned for any fundamental type.
    fn allocate(&self, size: usize) -> Option<NonNull<u8>>;

    /// Releases a block returned by [`MemoryAllocator::allocate`].
    ///
    /// # Safety
    ///
    /// `ptr` must have been produced by this allocator and not yet released.
    unsafe fn deallocate(&self, ptr: NonNull<u8>);
}

impl<A: GlobalAlloc + Send + Sync> MemoryAllocator for RawHeap<A> {
    fn allocate(&self, size: usize) -> Option<NonNull<u8>> {
        self.alloc(size, 1, false)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>) {
        // SAFETY: forwarded caller contract.
        unsafe { self.free(ptr) }
    }
}

/// Cheaply cloneable handle to the allocator bound to a state.
#[derive(Clone)]
pub struct Allocator {
    inner: Arc<dyn MemoryAllocator>,
}

impl Allocator {
    /// Wraps a custom allocator strategy.
    pub fn new(allocator: impl MemoryAllocator + 'static) -> Self {
        Self {
            inner: Arc::new(allocator),
        }
    }

    /// The platform allocator.
    #[must_use]
    pub fn system() -> Self {
        Self::from_static(heap::system())
    }

    /// The process-wide mimalloc heap.
    #[must_use]
    pub fn shared_heap() -> Self {
        Self::from_static(heap::shared())
    }

    fn from_static(allocator: &'static dyn MemoryAllocator) -> Self {
        Self {
            inner: Arc::new(StaticAllocator(allocator)),
        }
    }

    /// Builds an allocator from a foreign callback pair.
    ///
    /// With neither callback supplied the default allocator is returned.
    ///
    /// # Errors
    ///
    /// Returns [`CompressError::InvalidArgument`] when exactly one of the
    /// callbacks is supplied.
    ///
    /// # Safety
    ///
    /// See [`ForeignAllocator::new`].
    pub unsafe fn from_callbacks(
        alloc: Option<AllocFn>,
        free: Option<FreeFn>,
        opaque: *mut c_void,
    ) -> CompressResult<Self> {
        match (alloc, free) {
            // SAFETY: forwarded caller contract.
            (Some(alloc), Some(free)) => Ok(Self::new(unsafe {
                ForeignAllocator::new(alloc, free, opaque)
            })),
            (None, None) => Ok(Self::default()),
            _ => Err(CompressError::InvalidArgument),
        }
    }

    /// Allocates `size` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CompressError::OutOfMemory`] when the allocator is exhausted.
    pub fn allocate(&self, size: usize) -> CompressResult<NonNull<u8>> {
        self.inner
            .allocate(size)
            .ok_or(CompressError::OutOfMemory)
    }

    /// Allocates `size` bytes, returning null on failure.
    pub fn allocate_raw(&self, size: usize) -> *mut c_void {
        self.inner
            .allocate(size)
            .map_or(core::ptr::null_mut(), |ptr| ptr.as_ptr().cast())
    }

    /// Releases `ptr`. Null pointers are ignored.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or have been produced by this allocator and not yet
    /// released.
    pub unsafe fn deallocate_raw(&self, ptr: *mut c_void) {
        if let Some(ptr) = NonNull::new(ptr.cast::<u8>()) {
            // SAFETY: forwarded caller contract.
            unsafe { self.inner.deallocate(ptr) };
        }
    }
}

impl Default for Allocator {
    /// The shared heap when the `native-heap` feature is enabled, otherwise
    /// the platform allocator.
    fn default() -> Self {
        if cfg!(feature = "native-heap") {
            Self::shared_heap()
        } else {
            Self::system()
        }
    }
}

impl fmt::Debug for Allocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Allocator")
            .field("inner", &Arc::as_ptr(&self.inner).cast::<()>())
            .finish()
    }
}

struct StaticAllocator(&'static dyn MemoryAllocator);

impl MemoryAllocator for StaticAllocator {
    fn allocate(&self, size: usize) -> Option<NonNull<u8>> {
        self.0.allocate(size)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>) {
        // SAFETY: forwarded caller contract.
        unsafe { self.0.deallocate(ptr) }
    }
}

/// Allocator backed by a foreign callback pair and its opaque context.
pub struct ForeignAllocator {
    alloc: AllocFn,
    free: FreeFn,
    opaque: *mut c_void,
}

impl ForeignAllocator {
    /// Binds a callback pair to its opaque context.
    ///
    /// # Safety
    ///
    /// `alloc` must behave like `malloc` (suitably aligned blocks or null) and
    /// `free` must accept every block `alloc` returned. Both callbacks, and
    /// `opaque`, must be usable from any thread for as long as the allocator
    /// lives.
    pub const unsafe fn new(alloc: AllocFn, free: FreeFn, opaque: *mut c_void) -> Self {
        Self {
            alloc,
            free,
            opaque,
        }
    }
}

// SAFETY: the foreign caller promises the callbacks and the opaque context are
// usable from any thread that drives a state bound to them.
unsafe impl Send for ForeignAllocator {}
// SAFETY: see the `Send` impl above.
unsafe impl Sync for ForeignAllocator {}

impl MemoryAllocator for ForeignAllocator {
    fn allocate(&self, size: usize) -> Option<NonNull<u8>> {
        if size == 0 {
            return None;
        }
        // SAFETY: the callback follows the `malloc` contract.
        NonNull::new(unsafe { (self.alloc)(self.opaque, size) }.cast::<u8>())
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>) {
        // SAFETY: `ptr` came from `self.alloc` per the caller contract.
        unsafe { (self.free)(self.opaque, ptr.as_ptr().cast()) }
    }
}
