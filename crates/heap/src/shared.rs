//! Process-wide heap instances.

use std::alloc::System;

use mimalloc::MiMalloc;

use crate::block::RawHeap;

/// Heap backed by mimalloc, shared by every caller in the process.
pub type SharedHeap = RawHeap<MiMalloc>;

/// Heap backed by the platform allocator.
pub type SystemHeap = RawHeap<System>;

/// Opaque handle value identifying the shared heap on the C ABI.
pub const SHARED_HEAP_HANDLE: usize = 1;

static SHARED: SharedHeap = RawHeap::new(MiMalloc);
static SYSTEM: SystemHeap = RawHeap::new(System);

/// Returns the shared mimalloc heap. Thread safety is provided by mimalloc.
#[must_use]
pub fn shared() -> &'static SharedHeap {
    &SHARED
}

/// Returns the platform allocator heap.
#[must_use]
pub fn system() -> &'static SystemHeap {
    &SYSTEM
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_heap_round_trips_blocks_across_threads() {
        let block = shared().alloc(128, 1, true).expect("allocation");
        let addr = block.as_ptr() as usize;
        std::thread::spawn(move || {
            let block = core::ptr::NonNull::new(addr as *mut u8).expect("non-null");
            // SAFETY: the block came from the shared heap and is released once.
            unsafe { shared().free(block) };
        })
        .join()
        .expect("thread joined");
    }

    #[test]
    fn system_heap_is_usable() {
        let block = system().alloc(1, 1, false).expect("allocation");
        // SAFETY: the block came from the system heap and is released once.
        unsafe { system().free(block) };
    }
}
