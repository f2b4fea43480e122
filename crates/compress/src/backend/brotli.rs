//! Brotli adapter over the streaming encoder of the `brotli` crate.

use brotli::enc::StandardAlloc;
use brotli::enc::backward_references::BrotliEncoderMode;
use brotli::enc::encode::{
    BrotliEncoderCompressStream, BrotliEncoderCreateInstance, BrotliEncoderDestroyInstance,
    BrotliEncoderIsFinished, BrotliEncoderMaxCompressedSize, BrotliEncoderOperation,
    BrotliEncoderParameter, BrotliEncoderSetParameter, BrotliEncoderStateStruct,
};

use super::{Backend, BlockStatus};
use crate::algorithm::CompressorType;
use crate::error::{CompressError, CompressResult};
use crate::level::CompressionLevel;
use crate::operation::CompressionOperation;
use crate::trace::trace_backend;

/// Sliding window, as a power of two.
const DEFAULT_WINDOW: u32 = 22;

const QUALITY_FASTEST: u32 = 1;
const QUALITY_OPTIMAL: u32 = 9;
const QUALITY_SMALLEST_SIZE: u32 = 11;
const QUALITY_DEFAULT: u32 = 5;

pub(crate) struct BrotliBackend {
    encoder: BrotliEncoderStateStruct<StandardAlloc>,
}

impl BrotliBackend {
    pub(crate) fn new(level: CompressionLevel, block_size: usize) -> CompressResult<Self> {
        let quality = match level {
            CompressionLevel::NoCompression => return Err(CompressError::CompLevelNotSupported),
            CompressionLevel::Fastest => QUALITY_FASTEST,
            CompressionLevel::Optimal => QUALITY_OPTIMAL,
            CompressionLevel::SmallestSize => QUALITY_SMALLEST_SIZE,
            CompressionLevel::Other(_) => QUALITY_DEFAULT,
        };

        // Wrapped first so a refused parameter still destroys the encoder.
        let mut backend = Self {
            encoder: BrotliEncoderCreateInstance(StandardAlloc::default()),
        };
        let encoder = &mut backend.encoder;
        configure(
            encoder,
            BrotliEncoderParameter::BROTLI_PARAM_MODE,
            BrotliEncoderMode::BROTLI_MODE_GENERIC as u32,
        )?;
        configure(
            encoder,
            BrotliEncoderParameter::BROTLI_PARAM_LGWIN,
            DEFAULT_WINDOW,
        )?;
        if block_size > 0 {
            configure(
                encoder,
                BrotliEncoderParameter::BROTLI_PARAM_SIZE_HINT,
                u32::try_from(block_size).unwrap_or(u32::MAX),
            )?;
        }
        configure(
            encoder,
            BrotliEncoderParameter::BROTLI_PARAM_QUALITY,
            quality,
        )?;

        Ok(backend)
    }
}

/// Sets one encoder parameter. The encoder refuses once it has started.
fn configure(
    encoder: &mut BrotliEncoderStateStruct<StandardAlloc>,
    param: BrotliEncoderParameter,
    value: u32,
) -> CompressResult<()> {
    if BrotliEncoderSetParameter(encoder, param, value) == 0 {
        trace_backend(CompressorType::Brotli, "encoder refused a parameter");
        return Err(CompressError::BrInvalidState);
    }
    Ok(())
}

impl Backend for BrotliBackend {
    fn compress_block(&mut self, op: &mut CompressionOperation<'_>) -> CompressResult<BlockStatus> {
        let flush = op.flush();
        if op.input().is_empty() && !flush {
            return Ok(BlockStatus::Continue);
        }

        let operation = if flush {
            BrotliEncoderOperation::BROTLI_OPERATION_FINISH
        } else {
            BrotliEncoderOperation::BROTLI_OPERATION_PROCESS
        };

        let (input, output) = op.spans();
        let (in_len, out_len) = (input.len(), output.len());
        let mut available_in = in_len;
        let mut available_out = out_len;
        let mut in_offset = 0usize;
        let mut out_offset = 0usize;
        let mut total_out = None;

        let ok = BrotliEncoderCompressStream(
            &mut self.encoder,
            operation,
            &mut available_in,
            input,
            &mut in_offset,
            &mut available_out,
            output,
            &mut out_offset,
            &mut total_out,
            &mut |_, _, _, _| (),
        );

        let read = in_len
            .checked_sub(available_in)
            .ok_or(CompressError::CompressionFailed)?;
        let written = out_len
            .checked_sub(available_out)
            .ok_or(CompressError::CompressionFailed)?;
        op.record_progress(read, written)?;

        if ok == 0 {
            trace_backend(CompressorType::Brotli, "encoder rejected the block");
            return Err(CompressError::CompressionFailed);
        }

        if !flush {
            Ok(BlockStatus::Continue)
        } else if BrotliEncoderIsFinished(&self.encoder) != 0 {
            Ok(BlockStatus::Finished)
        } else {
            Ok(BlockStatus::Pending)
        }
    }

    fn compressed_size(&self, length: u64, _flush: bool) -> CompressResult<u64> {
        let length = usize::try_from(length).map_err(|_| CompressError::Overflow)?;
        let bound = BrotliEncoderMaxCompressedSize(length);
        if bound == 0 {
            return Err(CompressError::Overflow);
        }
        // Streaming output can carry one extra empty metablock header per
        // flushed chunk on top of the one-shot bound.
        let bound = bound
            .checked_add((length >> 8) + 16)
            .ok_or(CompressError::Overflow)?;
        u64::try_from(bound)
            .ok()
            .filter(|&bound| bound <= i64::MAX as u64)
            .ok_or(CompressError::Overflow)
    }

    fn is_finished(&self) -> bool {
        BrotliEncoderIsFinished(&self.encoder) != 0
    }

    fn release(self: Box<Self>) -> CompressResult<()> {
        Ok(())
    }
}

impl Drop for BrotliBackend {
    fn drop(&mut self) {
        BrotliEncoderDestroyInstance(&mut self.encoder);
    }
}
