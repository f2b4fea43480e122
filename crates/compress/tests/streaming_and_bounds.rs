//! Streaming behaviour and output bounds across every compiled-in backend.
//!
//! This test suite focuses on:
//! 1. Chunked streaming decoding to the same payload as one-shot compression
//! 2. The documented empty-input no-op
//! 3. `compressed_size` as a true upper bound
//! 4. End-to-end scenarios against the reference decoders

use std::io::Read;

use compress::{
    BlockStatus, CompressionLevel, CompressionOperation, CompressionState, CompressorType,
    supported_compressors,
};

fn decode(kind: CompressorType, compressed: &[u8]) -> Vec<u8> {
    let mut decoded = Vec::new();
    match kind {
        CompressorType::Gzip => {
            flate2::read::GzDecoder::new(compressed)
                .read_to_end(&mut decoded)
                .unwrap();
        }
        CompressorType::Deflate => {
            flate2::read::DeflateDecoder::new(compressed)
                .read_to_end(&mut decoded)
                .unwrap();
        }
        CompressorType::Brotli => {
            brotli::Decompressor::new(compressed, 4096)
                .read_to_end(&mut decoded)
                .unwrap();
        }
        CompressorType::Zstd => decoded = zstd::decode_all(compressed).unwrap(),
        CompressorType::None => unreachable!("no decoder for None"),
    }
    decoded
}

fn sample(len: usize) -> Vec<u8> {
    b"The quick brown fox jumps over the lazy dog. "
        .iter()
        .copied()
        .cycle()
        .take(len)
        .collect()
}

fn noise(len: usize) -> Vec<u8> {
    let mut seed = 0x9e37_79b9_u32;
    (0..len)
        .map(|_| {
            seed ^= seed << 13;
            seed ^= seed >> 17;
            seed ^= seed << 5;
            (seed >> 24) as u8
        })
        .collect()
}

fn attach(kind: CompressorType, level: CompressionLevel) -> CompressionState {
    let mut state = CompressionState::new();
    state.allocate_compressor(kind, level).unwrap();
    state
}

/// Feeds `input` in `chunk` sized blocks, then terminates with an empty flush
/// call, draining pending output until the stream reports it is finished.
fn stream(state: &mut CompressionState, input: &[u8], chunk: usize) -> Vec<u8> {
    let mut compressed = Vec::new();
    let mut out = vec![0u8; 64 * 1024];

    for block in input.chunks(chunk) {
        let mut offset = 0;
        while offset < block.len() {
            let mut op = CompressionOperation::new(&block[offset..], &mut out, false);
            state.compress_block(&mut op).unwrap();
            offset += op.bytes_read();
            compressed.extend_from_slice(op.written());
        }
    }

    loop {
        let mut op = CompressionOperation::new(&[], &mut out, true);
        let status = state.compress_block(&mut op).unwrap();
        compressed.extend_from_slice(op.written());
        if status == BlockStatus::Finished {
            break;
        }
    }
    compressed
}

// =============================================================================
// SECTION 1: Streaming / One-Shot Equivalence
// =============================================================================

#[test]
fn chunked_and_one_shot_streams_decode_identically() {
    let input = sample(200_000);
    for kind in supported_compressors().iter() {
        let mut one_shot = attach(kind, CompressionLevel::Fastest);
        let whole = stream(&mut one_shot, &input, input.len());

        for chunk in [1, 7, 4096, 65_537] {
            let mut chunked = attach(kind, CompressionLevel::Fastest);
            let pieces = stream(&mut chunked, &input, chunk);
            assert_eq!(decode(kind, &pieces), input, "{kind} chunk {chunk}");
        }
        assert_eq!(decode(kind, &whole), input, "{kind} one-shot");
    }
}

#[test]
fn empty_stream_terminates_cleanly() {
    for kind in supported_compressors().iter() {
        let mut state = attach(kind, CompressionLevel::Optimal);
        let compressed = stream(&mut state, &[], 1);
        assert!(!compressed.is_empty(), "{kind} must emit a trailer");
        assert!(decode(kind, &compressed).is_empty());
        assert!(state.is_finished());
    }
}

#[test]
fn tiny_output_spans_drain_over_several_calls() {
    let input = noise(8192);
    for kind in supported_compressors().iter() {
        let mut state = attach(kind, CompressionLevel::Fastest);
        let mut compressed = Vec::new();
        let mut out = [0u8; 97];
        let mut offset = 0;

        loop {
            let mut op = CompressionOperation::new(&input[offset..], &mut out, true);
            let status = state.compress_block(&mut op).unwrap();
            offset += op.bytes_read();
            compressed.extend_from_slice(op.written());
            if status == BlockStatus::Finished {
                break;
            }
        }
        assert_eq!(offset, input.len());
        assert_eq!(decode(kind, &compressed), input, "{kind}");
    }
}

// =============================================================================
// SECTION 2: No-Op Blocks
// =============================================================================

#[test]
fn empty_non_flush_block_touches_nothing() {
    for kind in supported_compressors().iter() {
        let mut state = attach(kind, CompressionLevel::Optimal);
        let mut out = [0xa5u8; 32];
        for _ in 0..3 {
            let mut op = CompressionOperation::new(&[], &mut out, false);
            let status = state.compress_block(&mut op).unwrap();
            assert_eq!(status, BlockStatus::Continue);
            assert_eq!(op.bytes_read(), 0);
            assert_eq!(op.bytes_written(), 0);
        }
        assert!(out.iter().all(|&b| b == 0xa5), "{kind} wrote output");
    }
}

#[test]
fn zstd_flush_after_finish_is_a_confirmation() {
    let mut state = attach(CompressorType::Zstd, CompressionLevel::Optimal);
    let frame = stream(&mut state, b"confirm", 3);
    let mut out = [0u8; 16];
    let mut op = CompressionOperation::new(&[], &mut out, true);
    assert_eq!(state.compress_block(&mut op).unwrap(), BlockStatus::Finished);
    assert_eq!(op.bytes_written(), 0);
    assert_eq!(decode(CompressorType::Zstd, &frame), b"confirm");
}

// =============================================================================
// SECTION 3: Output Bounds
// =============================================================================

#[test]
fn one_shot_output_never_exceeds_the_bound() {
    let inputs = [
        vec![0u8; 1],
        sample(11),
        sample(4096),
        noise(1),
        noise(333),
        noise(70_000),
        vec![0u8; 250_000],
    ];
    for kind in supported_compressors().iter() {
        for level in [
            CompressionLevel::Fastest,
            CompressionLevel::Optimal,
            CompressionLevel::SmallestSize,
            CompressionLevel::from_raw(5).unwrap(),
        ] {
            for input in &inputs {
                let mut state = attach(kind, level);
                let bound = state.compressed_size(input.len() as u64, true).unwrap();
                let mut out = vec![0u8; bound as usize];
                let mut op = CompressionOperation::new(input, &mut out, true);
                let status = state.compress_block(&mut op).unwrap();
                assert_eq!(status, BlockStatus::Finished, "{kind} {level:?} {}", input.len());
                assert_eq!(op.bytes_read(), input.len());
                assert!(op.bytes_written() as u64 <= bound);
                assert_eq!(decode(kind, op.written()), *input);
            }
        }
    }
}

#[test]
fn stored_deflate_fits_the_bound() {
    let input = noise(100_000);
    for kind in [CompressorType::Gzip, CompressorType::Deflate] {
        let mut state = attach(kind, CompressionLevel::NoCompression);
        let bound = state.compressed_size(input.len() as u64, true).unwrap();
        let mut out = vec![0u8; bound as usize];
        let mut op = CompressionOperation::new(&input, &mut out, true);
        assert_eq!(state.compress_block(&mut op).unwrap(), BlockStatus::Finished);
        assert!(op.bytes_written() > input.len());
    }
}

#[test]
fn bounds_grow_with_input_length() {
    for kind in supported_compressors().iter() {
        let state = attach(kind, CompressionLevel::Optimal);
        let small = state.compressed_size(10, true).unwrap();
        let large = state.compressed_size(10_000, true).unwrap();
        assert!(small > 0);
        assert!(large >= 10_000, "{kind}");
        assert!(large > small);
    }
}

// =============================================================================
// SECTION 4: Scenarios
// =============================================================================

#[test]
fn hello_world_gzip_round_trip() {
    let mut state = attach(CompressorType::Gzip, CompressionLevel::Fastest);
    let input = b"Hello World";
    let bound = state.compressed_size(input.len() as u64, true).unwrap();
    let mut out = vec![0u8; bound as usize];
    let mut op = CompressionOperation::new(input, &mut out, true);
    state.compress_block(&mut op).unwrap();

    assert_eq!(op.bytes_read(), 11);
    assert!(op.bytes_written() > 0);
    assert_eq!(decode(CompressorType::Gzip, op.written()), input);
}

#[test]
fn brotli_smallest_size_beats_fastest_on_text() {
    let input = sample(100_000);
    let sizes: Vec<usize> = [CompressionLevel::Fastest, CompressionLevel::SmallestSize]
        .into_iter()
        .map(|level| {
            let mut state = attach(CompressorType::Brotli, level);
            stream(&mut state, &input, input.len()).len()
        })
        .collect();
    assert!(sizes[1] <= sizes[0]);
}
