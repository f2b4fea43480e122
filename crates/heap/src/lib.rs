#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_op_in_unsafe_fn)]
#![deny(clippy::undocumented_unsafe_blocks)]

//! # Overview
//!
//! `heap` provides the process-wide native heap used by the compression shims
//! and exports it through the NativeHeapApi C ABI (`heapAlloc`, `heapFree`,
//! ...). Allocation is delegated to [`mimalloc`](https://docs.rs/mimalloc);
//! this crate only adapts the sized Rust allocator interface to the unsized
//! `malloc`/`free` contract foreign callers expect.
//!
//! # Design
//!
//! [`RawHeap`] wraps any [`GlobalAlloc`](core::alloc::GlobalAlloc) and prefixes
//! every block with a small header recording its layout, so blocks can be
//! released or resized from the pointer alone. [`shared`] returns the mimalloc
//! instance shared by the whole process and [`system`] the platform allocator.
//!
//! # Invariants
//!
//! - Every pointer handed out is aligned to [`BLOCK_ALIGN`] bytes.
//! - Blocks must be released through the heap that produced them.
//! - First-class heaps are not supported; `heapCreate` always yields the
//!   shared heap handle.
//!
//! # Examples
//!
//! ```
//! let heap = heap::shared();
//! let block = heap.alloc(4, 8, true).expect("allocation");
//! // SAFETY: `block` was produced by `heap` and is released exactly once.
//! unsafe { heap.free(block) };
//! ```

pub mod api;
mod block;
mod shared;

pub use block::{BLOCK_ALIGN, RawHeap};
pub use shared::{SHARED_HEAP_HANDLE, SharedHeap, SystemHeap, shared, system};
