//! Header-prefixed blocks over a sized Rust allocator.

use core::alloc::{GlobalAlloc, Layout};
use core::ptr::NonNull;

/// Alignment of every block, and the size of the hidden header in front of it.
pub const BLOCK_ALIGN: usize = 16;

/// Adapts a [`GlobalAlloc`] to the `malloc`/`free` contract.
///
/// The total layout size is stored in a [`BLOCK_ALIGN`]-byte header directly in
/// front of the returned pointer, which lets [`RawHeap::free`] and
/// [`RawHeap::realloc`] rebuild the layout without the caller supplying it.
#[derive(Debug, Default)]
pub struct RawHeap<A> {
    inner: A,
}

impl<A> RawHeap<A> {
    /// Wraps `inner`.
    pub const fn new(inner: A) -> Self {
        Self { inner }
    }
}

impl<A: GlobalAlloc> RawHeap<A> {
    /// Allocates `elements * size` bytes, optionally zeroed.
    ///
    /// Returns `None` when the multiplication overflows or the allocator is
    /// exhausted. A zero-byte request yields a unique, freeable block.
    pub fn alloc(&self, elements: usize, size: usize, zero: bool) -> Option<NonNull<u8>> {
        let layout = block_layout(elements.checked_mul(size)?)?;
        // SAFETY: `layout` always has a non-zero size because it includes the header.
        let base = unsafe {
            if zero {
                self.inner.alloc_zeroed(layout)
            } else {
                self.inner.alloc(layout)
            }
        };
        let base = NonNull::new(base)?;
        // SAFETY: `base` points at a fresh block of at least `BLOCK_ALIGN` bytes.
        Some(unsafe { write_header(base, layout.size()) })
    }

    /// Resizes `block` to `elements * size` bytes.
    ///
    /// The prefix common to the old and new sizes is preserved. When `zero` is
    /// set any bytes beyond the old size are cleared. On failure the original
    /// block is left untouched and `None` is returned.
    ///
    /// # Safety
    ///
    /// `block` must have been returned by this heap and not yet released.
    pub unsafe fn realloc(
        &self,
        block: NonNull<u8>,
        elements: usize,
        size: usize,
        zero: bool,
    ) -> Option<NonNull<u8>> {
        let new_layout = block_layout(elements.checked_mul(size)?)?;
        // SAFETY: the caller guarantees `block` came from this heap.
        let (base, old_layout) = unsafe { read_header(block) };
        // SAFETY: `base`/`old_layout` describe a live allocation of `inner`, and
        // the new size is non-zero and was validated by `block_layout`.
        let moved = unsafe { self.inner.realloc(base.as_ptr(), old_layout, new_layout.size()) };
        let moved = NonNull::new(moved)?;
        if zero && new_layout.size() > old_layout.size() {
            // SAFETY: the tail lies inside the resized allocation.
            unsafe {
                moved
                    .add(old_layout.size())
                    .write_bytes(0, new_layout.size() - old_layout.size());
            }
        }
        // SAFETY: `moved` is the base of an allocation of `new_layout.size()` bytes.
        Some(unsafe { write_header(moved, new_layout.size()) })
    }

    /// Releases `block`.
    ///
    /// # Safety
    ///
    /// `block` must have been returned by this heap and not yet released.
    pub unsafe fn free(&self, block: NonNull<u8>) {
        // SAFETY: the caller guarantees `block` came from this heap.
        let (base, layout) = unsafe { read_header(block) };
        // SAFETY: `base` and `layout` are exactly what `alloc`/`realloc` used.
        unsafe { self.inner.dealloc(base.as_ptr(), layout) };
    }

    /// Returns the number of usable bytes in `block`.
    ///
    /// # Safety
    ///
    /// `block` must have been returned by this heap and not yet released.
    pub unsafe fn usable_size(&self, block: NonNull<u8>) -> usize {
        // SAFETY: the caller guarantees `block` came from this heap.
        let (_, layout) = unsafe { read_header(block) };
        layout.size() - BLOCK_ALIGN
    }
}

fn block_layout(bytes: usize) -> Option<Layout> {
    Layout::from_size_align(bytes.checked_add(BLOCK_ALIGN)?, BLOCK_ALIGN).ok()
}

/// # Safety
///
/// `base` must point at an allocation of `total` bytes aligned to `BLOCK_ALIGN`.
unsafe fn write_header(base: NonNull<u8>, total: usize) -> NonNull<u8> {
    // SAFETY: the header slot is aligned and inside the allocation.
    unsafe {
        base.cast::<usize>().write(total);
        base.add(BLOCK_ALIGN)
    }
}

/// # Safety
///
/// `block` must have been produced by `write_header`.
unsafe fn read_header(block: NonNull<u8>) -> (NonNull<u8>, Layout) {
    // SAFETY: `write_header` placed the header `BLOCK_ALIGN` bytes before `block`.
    unsafe {
        let base = block.sub(BLOCK_ALIGN);
        let total = base.cast::<usize>().read();
        (base, Layout::from_size_align_unchecked(total, BLOCK_ALIGN))
    }
}
