//! crates/compress/src/operation.rs
//!
//! One compress call: an input span, an output span, a flush flag and the
//! progress a backend made against them.

use crate::error::{CompressError, CompressResult};

/// Borrowed description of a single [`CompressionState::compress_block`] call.
///
/// The spans are borrowed for the duration of the call only. `bytes_read` and
/// `bytes_written` are reset before every backend invocation and always stay
/// within the lengths of their spans.
///
/// [`CompressionState::compress_block`]: crate::CompressionState::compress_block
#[derive(Debug)]
pub struct CompressionOperation<'a> {
    input: &'a [u8],
    output: &'a mut [u8],
    flush: bool,
    bytes_read: usize,
    bytes_written: usize,
}

impl<'a> CompressionOperation<'a> {
    /// Describes a call that consumes `input` and writes into `output`.
    ///
    /// When `flush` is set this is the final chunk of the stream and the
    /// backend terminates it, emitting any trailer.
    pub fn new(input: &'a [u8], output: &'a mut [u8], flush: bool) -> Self {
        Self {
            input,
            output,
            flush,
            bytes_read: 0,
            bytes_written: 0,
        }
    }

    /// Input span.
    #[must_use]
    pub fn input(&self) -> &[u8] {
        self.input
    }

    /// Output span, including bytes already written by this call.
    #[must_use]
    pub fn output(&self) -> &[u8] {
        self.output
    }

    /// Whether this call terminates the stream.
    #[must_use]
    pub const fn flush(&self) -> bool {
        self.flush
    }

    /// Input bytes consumed by the last call.
    #[must_use]
    pub const fn bytes_read(&self) -> usize {
        self.bytes_read
    }

    /// Output bytes produced by the last call.
    #[must_use]
    pub const fn bytes_written(&self) -> usize {
        self.bytes_written
    }

    /// The compressed bytes produced by the last call.
    #[must_use]
    pub fn written(&self) -> &[u8] {
        &self.output[..self.bytes_written]
    }

    /// Splits the operation into its spans for a backend step.
    pub(crate) fn spans(&mut self) -> (&[u8], &mut [u8]) {
        (self.input, self.output)
    }

    pub(crate) fn reset_progress(&mut self) {
        self.bytes_read = 0;
        self.bytes_written = 0;
    }

    /// Records backend progress, refusing counts that exceed the spans.
    ///
    /// On refusal the counters are clamped to the span lengths so callers
    /// never observe an impossible value.
    pub(crate) fn record_progress(&mut self, read: usize, written: usize) -> CompressResult<()> {
        if read > self.input.len() || written > self.output.len() {
            self.bytes_read = read.min(self.input.len());
            self.bytes_written = written.min(self.output.len());
            return Err(CompressError::CompressionFailed);
        }
        self.bytes_read = read;
        self.bytes_written = written;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_operation_has_no_progress() {
        let mut out = [0u8; 4];
        let op = CompressionOperation::new(b"abc", &mut out, true);
        assert_eq!(op.bytes_read(), 0);
        assert_eq!(op.bytes_written(), 0);
        assert!(op.flush());
        assert!(op.written().is_empty());
    }

    #[test]
    fn progress_within_spans_is_recorded() {
        let mut out = [7u8; 4];
        let mut op = CompressionOperation::new(b"abc", &mut out, false);
        op.record_progress(3, 2).expect("within bounds");
        assert_eq!(op.bytes_read(), 3);
        assert_eq!(op.written(), &[7, 7]);
    }

    #[test]
    fn progress_past_the_spans_is_refused_and_clamped() {
        let mut out = [0u8; 4];
        let mut op = CompressionOperation::new(b"abc", &mut out, false);
        let err = op.record_progress(4, 9).expect_err("read past input");
        assert_eq!(err, CompressError::CompressionFailed);
        assert_eq!(op.bytes_read(), 3);
        assert_eq!(op.bytes_written(), 4);

        op.reset_progress();
        assert_eq!(op.bytes_read(), 0);
        assert_eq!(op.bytes_written(), 0);
    }
}
