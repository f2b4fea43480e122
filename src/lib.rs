#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_op_in_unsafe_fn)]
#![deny(clippy::undocumented_unsafe_blocks)]

//! # Overview
//!
//! `native_compress` is the C ABI over the [`compress`] core. It builds as a
//! `cdylib` for managed hosts and as an `rlib` for Rust callers and tests.
//!
//! The library exports three groups of symbols:
//!
//! - the two-phase compression API in [`exports`]: allocate a reusable state,
//!   attach and detach compressors, compress blocks, query bounds;
//! - the legacy one-shot API in [`legacy`], where allocating a compressor also
//!   allocates its state;
//! - the NativeHeapApi in [`heap_api`], re-exported from the `heap` crate so
//!   managed callers can share the library's mimalloc heap.
//!
//! [`CompressionInitLogging`](logging::CompressionInitLogging) turns on
//! diagnostics when the `tracing` feature is enabled.
//!
//! # Conventions
//!
//! Every export returns a non-negative value on success and a negative
//! registry code from [`compress::error::codes`] on failure. Handles are
//! opaque pointers to state objects placed in memory from the state's own
//! allocator. Null handles are rejected with `InvalidPtr`.
//!
//! # Examples
//!
//! ```
//! use core::ptr;
//!
//! use native_compress::RawOperation;
//! use native_compress::exports::{
//!     CompressBlock, CompressionAllocCompressor, CompressionAllocState, CompressionFreeState,
//!     GetCompressedSize,
//! };
//!
//! let mut state = ptr::null_mut();
//! let input = b"Hello World";
//! // SAFETY: every pointer handed over is valid for the whole sequence.
//! unsafe {
//!     assert_eq!(CompressionAllocState(&raw mut state), 1);
//!     assert_eq!(CompressionAllocCompressor(state, 1, 1), 1);
//!
//!     let bound = GetCompressedSize(state, input.len() as u64, 1);
//!     let mut output = vec![0u8; bound as usize];
//!     let mut op = RawOperation {
//!         bytes_in: input.as_ptr().cast(),
//!         bytes_out: output.as_mut_ptr().cast(),
//!         flush: 1,
//!         bytes_in_length: input.len() as u32,
//!         bytes_out_length: output.len() as u32,
//!         bytes_read: 0,
//!         bytes_written: 0,
//!     };
//!     assert_eq!(CompressBlock(state, &raw mut op), 1);
//!     assert_eq!(op.bytes_read, 11);
//!     assert!(op.bytes_written > 0);
//!
//!     assert_eq!(CompressionFreeState(state), 1);
//! }
//! ```

mod abi;
pub mod exports;
mod handle;
pub mod legacy;
pub mod logging;

pub use abi::RawOperation;
pub use heap::api as heap_api;

use compress::{CompressError, CompressResult, SUCCESS};

/// Collapses a unit result into an ABI status code.
pub(crate) fn status(result: CompressResult<()>) -> i32 {
    result.map_or_else(CompressError::code, |()| SUCCESS)
}
