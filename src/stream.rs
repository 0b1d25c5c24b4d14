//! The shared streaming contract implemented by every compressor and
//! decompressor in this crate.
//!
//! An engine is driven in units: the caller attaches one input unit with
//! [`StreamCodec::set_input`], then calls [`StreamCodec::run`] with successive
//! destination blocks until the returned [`RunStatus`] reports
//! `output_full == false`. At that point the unit is fully flushed, the
//! engine has silently reset itself, and the next `set_input` starts a fresh
//! unit indistinguishable from one on a newly constructed instance.
//!
//! State machine (each codec specializes the transitions):
//!
//! ```text
//! Ready ──set_input──▶ Streaming ──run (output full)──▶ Streaming
//!   ▲                      │
//!   └──run (unit flushed)──┘          any ──error──▶ Poisoned (terminal)
//! ```
//!
//! Errors finalize the instance: streaming state is dropped so no partially
//! framed output leaks, and every later call answers
//! [`Error::InstancePoisoned`].

use crate::error::Error;

// ─────────────────────────────────────────────────────────────────────────────
// RunStatus
// ─────────────────────────────────────────────────────────────────────────────

/// The two observable facts of a [`StreamCodec::run`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunStatus {
    /// Bytes written into the destination block by this call.
    pub bytes_written: usize,
    /// `true` when more output is pending for the current unit; the caller
    /// must call `run` again with a fresh destination block before providing
    /// new input.
    pub output_full: bool,
}

impl RunStatus {
    /// `true` when the current unit still has undelivered output.
    #[inline]
    pub fn is_output_full(&self) -> bool {
        self.output_full
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// StreamCodec
// ─────────────────────────────────────────────────────────────────────────────

/// One streaming (de)compression engine: a single-threaded, synchronous,
/// non-reentrant state machine.
///
/// Instances are fully independent; different instances may be driven from
/// different threads concurrently, but a single instance must be driven from
/// one logical thread of control.
pub trait StreamCodec: Send {
    /// Register `src` as the next unit of data to process.
    ///
    /// The bytes are copied into an engine-owned buffer so that an
    /// unconsumed remainder can be retained across `run` calls. For
    /// decompressors, a non-empty `src` shorter than the codec's fixed
    /// framing header is a format error that finalizes the engine with no
    /// partial output.
    ///
    /// Calling `set_input` while a previous unit still has undelivered
    /// output abandons that unit and its pending output, except for codecs
    /// documented to continue one compressed stream across input units (the
    /// bzip2-style decompressor appends to the unconsumed tail instead).
    fn set_input(&mut self, src: &[u8]) -> Result<(), Error>;

    /// Produce as much output as fits in `dst`.
    ///
    /// When the unit's output has been fully flushed, the engine resets to a
    /// clean state ready for the next `set_input` and reports
    /// `output_full == false`.
    fn run(&mut self, dst: &mut [u8]) -> Result<RunStatus, Error>;

    /// Declare that no further input follows the unit most recently
    /// flushed.
    ///
    /// Codecs whose compressed streams may span several input units (the
    /// bzip2-style decompressor) verify here that no stream was cut off
    /// mid-record and answer a format error if one was; everyone else
    /// accepts unconditionally. [`drive`] calls this after its pump loop,
    /// since it is always handed complete data.
    fn finish(&mut self) -> Result<(), Error> {
        Ok(())
    }

    /// Abandon any in-progress unit: drop pending input, spill buffers and
    /// codec scratch state, returning to the clean post-construction state.
    /// Does not clear poisoning.
    fn reset(&mut self);
}

// ─────────────────────────────────────────────────────────────────────────────
// StreamCore — input cursor + poison flag shared by all engines
// ─────────────────────────────────────────────────────────────────────────────

/// The input-side state every engine embeds: the owned copy of the current
/// unit, a consumption cursor, and the poison flag.
#[derive(Debug, Default)]
pub(crate) struct StreamCore {
    pending: Vec<u8>,
    pos: usize,
    failed: bool,
}

impl StreamCore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Fail fast when the instance was poisoned by an earlier error.
    pub(crate) fn check_live(&self) -> Result<(), Error> {
        if self.failed {
            Err(Error::InstancePoisoned)
        } else {
            Ok(())
        }
    }

    /// Replace the pending unit with a copy of `src`.
    pub(crate) fn replace_input(&mut self, src: &[u8]) -> Result<(), Error> {
        self.pending.clear();
        self.pos = 0;
        if self.pending.try_reserve(src.len()).is_err() {
            self.failed = true;
            return Err(Error::AllocationFailed);
        }
        self.pending.extend_from_slice(src);
        Ok(())
    }

    /// Append `src` after the unconsumed tail of the current unit.
    ///
    /// Used by engines whose compressed stream may span several input units
    /// (the bzip2-style decompressor): a partial block header left over from
    /// the previous unit is completed by the next one.
    pub(crate) fn append_input(&mut self, src: &[u8]) -> Result<(), Error> {
        self.pending.drain(..self.pos);
        self.pos = 0;
        if self.pending.try_reserve(src.len()).is_err() {
            self.failed = true;
            return Err(Error::AllocationFailed);
        }
        self.pending.extend_from_slice(src);
        Ok(())
    }

    /// The unconsumed remainder of the current unit.
    #[inline]
    pub(crate) fn remaining(&self) -> &[u8] {
        &self.pending[self.pos..]
    }

    /// Advance the input cursor by `n` bytes.
    #[inline]
    pub(crate) fn consume(&mut self, n: usize) {
        debug_assert!(self.pos + n <= self.pending.len());
        self.pos += n;
    }

    /// `true` when the current unit is fully consumed.
    #[inline]
    pub(crate) fn is_drained(&self) -> bool {
        self.pos == self.pending.len()
    }

    /// Drop the current unit, releasing its buffer.
    pub(crate) fn clear(&mut self) {
        self.pending = Vec::new();
        self.pos = 0;
    }

    /// Finalize after an error: drop the unit and poison the instance.
    /// Returns `err` so call sites read `return Err(self.core.fail(err))`.
    pub(crate) fn fail(&mut self, err: Error) -> Error {
        self.clear();
        self.failed = true;
        err
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// drive — pump a whole buffer through an engine
// ─────────────────────────────────────────────────────────────────────────────

/// Process all of `src` through `codec` as one unit, collecting the output.
///
/// `block_size` is the capacity of each destination block handed to `run`;
/// the engine is pumped until it reports the unit fully flushed, then
/// [`StreamCodec::finish`] is invoked so stream-spanning codecs can flag a
/// truncated source. This is the canonical caller loop from the contract
/// above, shared by the file layer, the benchmarks and the tests.
pub fn drive<C: StreamCodec + ?Sized>(
    codec: &mut C,
    src: &[u8],
    block_size: usize,
) -> Result<Vec<u8>, Error> {
    assert!(block_size > 0, "destination block size must be non-zero");
    codec.set_input(src)?;
    let mut out = Vec::new();
    let mut block = vec![0u8; block_size];
    loop {
        let status = codec.run(&mut block)?;
        out.extend_from_slice(&block[..status.bytes_written]);
        if !status.output_full {
            codec.finish()?;
            return Ok(out);
        }
    }
}
