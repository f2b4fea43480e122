#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_op_in_unsafe_fn)]

//! # Overview
//!
//! `compress` is a backend-agnostic streaming compression core. A caller
//! creates a [`CompressionState`], attaches a compressor of a chosen
//! [`CompressorType`] and [`CompressionLevel`], feeds it input blocks through
//! [`CompressionOperation`] values and receives compressed output
//! incrementally into caller-owned buffers. The same state can host any number
//! of consecutive compressors.
//!
//! # Design
//!
//! Each codec sits behind one adapter implementing a private streaming
//! contract (compress a block, bound the output size, tear down):
//!
//! - gzip and raw deflate through a zlib `z_stream` whose `zalloc`/`zfree`
//!   use the state's [`Allocator`], on either zlib-rs
//!   ([`libz-rs-sys`](https://docs.rs/libz-rs-sys)) or zlib-ng
//!   ([`libz-sys`](https://docs.rs/libz-sys));
//! - brotli through the streaming encoder of the
//!   [`brotli`](https://docs.rs/brotli) crate;
//! - zstd through a raw `ZSTD_CStream` from [`zstd`](https://docs.rs/zstd),
//!   created with the state's [`Allocator`] as its custom memory hook.
//!
//! Which adapters exist is decided by cargo features and reported by
//! [`supported_compressors`].
//!
//! # Invariants
//!
//! - A state holds a backend if and only if its [`CompressorType`] is not
//!   [`CompressorType::None`].
//! - Attaching to an active state is refused; the caller must detach first.
//! - Progress counters on an operation are reset on every call and never
//!   exceed the span lengths.
//! - Flush is binary: a flushing call terminates the stream.
//!
//! # Errors
//!
//! Every fallible operation returns [`CompressResult`]. [`CompressError`]
//! variants map one-to-one onto the stable negative codes foreign callers see,
//! including the backend specific extensions.
//!
//! # Examples
//!
//! ```
//! use std::io::Read;
//!
//! use compress::{CompressionLevel, CompressionOperation, CompressionState, CompressorType};
//!
//! let mut state = CompressionState::new();
//! state
//!     .allocate_compressor(CompressorType::Gzip, CompressionLevel::Fastest)
//!     .expect("gzip is compiled in");
//!
//! let input = b"Hello World";
//! let bound = state.compressed_size(input.len() as u64, true).expect("bound");
//! let mut output = vec![0u8; bound as usize];
//! let mut op = CompressionOperation::new(input, &mut output, true);
//! state.compress_block(&mut op).expect("compressed");
//!
//! let mut decoded = Vec::new();
//! flate2::read::GzDecoder::new(op.written())
//!     .read_to_end(&mut decoded)
//!     .expect("valid gzip");
//! assert_eq!(decoded, input);
//! ```

pub mod algorithm;
pub mod alloc;
mod backend;
pub mod error;
pub mod level;
mod operation;
mod state;
mod trace;

pub use algorithm::{CompressorSet, CompressorType, CompressorTypeParseError};
pub use alloc::{AllocFn, Allocator, ForeignAllocator, FreeFn, MemoryAllocator};
pub use backend::BlockStatus;
pub use error::{CompressError, CompressResult, SUCCESS};
pub use level::{CompressionLevel, RawLevel};
pub use operation::CompressionOperation;
pub use state::CompressionState;

/// Algorithms compiled into this build.
#[must_use]
pub const fn supported_compressors() -> CompressorSet {
    CompressorSet::supported()
}
