//! Streaming BZip2-style compressor and decompressor.
//!
//! Unlike the RLE and LZO wrappers these add no framing of their own: the
//! embedded engine's native block-stream format (see [`engine`]) is
//! forwarded unmodified. The wrapper's job is the flush protocol — `Run`
//! while input remains, `Flush` when a unit exceeds the level's block
//! threshold and must split across engine calls, `Finish` once the unit's
//! tail has been handed over — plus mapping engine faults into the crate
//! error taxonomy and restarting the engine across concatenated streams on
//! the decompression side.

pub(crate) mod engine;

use crate::error::Error;
use crate::stream::{RunStatus, StreamCodec, StreamCore};
use engine::{Action, CompressEngine, DecompressEngine, EngineFault, EngineState};

/// Uncompressed block threshold for the given level digit; a unit larger
/// than this is split across multiple engine calls.
pub fn block_threshold(level: u32) -> usize {
    engine::block_capacity(level)
}

/// Block-size level. `Default` maps to the largest block (9); a requested
/// level of 0 is promoted to the smallest valid block (1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Bzip2Level {
    #[default]
    Default,
    Precise(u32),
}

impl Bzip2Level {
    /// Resolve to a concrete 1..=9 digit.
    fn resolve(self) -> Result<u32, Error> {
        match self {
            Bzip2Level::Default => Ok(9),
            Bzip2Level::Precise(0) => Ok(1),
            Bzip2Level::Precise(level) if level <= 9 => Ok(level),
            Bzip2Level::Precise(level) => Err(Error::InvalidLevel(level)),
        }
    }
}

/// Parameters snapshotted by [`Bzip2Compressor::new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Bzip2Parameters {
    pub level: Bzip2Level,
}

/// Map an engine fault onto the crate error taxonomy.
fn map_fault(fault: EngineFault) -> Error {
    match fault {
        EngineFault::Mem => Error::AllocationFailed,
        EngineFault::Data => Error::CorruptedData,
        EngineFault::DataMagic => Error::BadMagic,
        EngineFault::Param => Error::EngineFault("BZ_PARAM_ERROR"),
        EngineFault::Config => Error::EngineFault("BZ_CONFIG_ERROR"),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Compressor
// ─────────────────────────────────────────────────────────────────────────────

/// Flush protocol state, advanced as a unit moves through the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FlushState {
    /// Between units: accumulating nothing.
    Run,
    /// Unit larger than the block threshold: forcing intermediate blocks out.
    Flush,
    /// Unit tail handed to the engine; draining to stream end.
    Finish,
}

/// Streaming BZip2-style compressor.
#[derive(Debug)]
pub struct Bzip2Compressor {
    core: StreamCore,
    engine: CompressEngine,
    flush: FlushState,
}

impl Bzip2Compressor {
    /// Construct with a validated level; allocates the engine scratch state
    /// once for the lifetime of the instance.
    pub fn new(params: Bzip2Parameters) -> Result<Self, Error> {
        let level = params.level.resolve()?;
        let engine = CompressEngine::new(level).map_err(map_fault)?;
        Ok(Self { core: StreamCore::new(), engine, flush: FlushState::Run })
    }

    fn fail(&mut self, fault: EngineFault) -> Error {
        self.engine.reset();
        self.flush = FlushState::Run;
        self.core.fail(map_fault(fault))
    }
}

impl StreamCodec for Bzip2Compressor {
    fn set_input(&mut self, src: &[u8]) -> Result<(), Error> {
        self.core.check_live()?;
        // A new unit abandons any undelivered output of the previous one.
        if self.flush != FlushState::Run {
            self.engine.reset();
            self.flush = FlushState::Run;
        }
        self.core.replace_input(src)
    }

    fn run(&mut self, dst: &mut [u8]) -> Result<RunStatus, Error> {
        self.core.check_live()?;
        if dst.is_empty() {
            return Err(self.core.fail(Error::OutputTooSmall { needed: 1, available: 0 }));
        }

        let mut written = 0;
        loop {
            let remaining = self.core.remaining().len();
            self.flush = if remaining > self.engine.block_room() {
                FlushState::Flush
            } else {
                FlushState::Finish
            };
            let action = match self.flush {
                FlushState::Flush => Action::Flush,
                _ => Action::Finish,
            };

            let progress = match self.engine.compress(self.core.remaining(), &mut dst[written..], action) {
                Ok(p) => p,
                Err(fault) => return Err(self.fail(fault)),
            };
            self.core.consume(progress.consumed);
            written += progress.produced;

            if progress.state == EngineState::StreamEnd {
                // Unit complete: reset for the next one.
                self.engine.reset();
                self.core.clear();
                self.flush = FlushState::Run;
                return Ok(RunStatus { bytes_written: written, output_full: false });
            }
            if written == dst.len() {
                return Ok(RunStatus { bytes_written: written, output_full: true });
            }
            if progress.consumed == 0 && progress.produced == 0 {
                // The engine neither took input nor gave output with
                // destination capacity available; nothing can unstick this.
                return Err(self.fail(EngineFault::Param));
            }
        }
    }

    fn reset(&mut self) {
        self.core.clear();
        self.engine.reset();
        self.flush = FlushState::Run;
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Decompressor
// ─────────────────────────────────────────────────────────────────────────────

/// Streaming BZip2-style decompressor.
///
/// A compressed stream may span several input units: when a unit ends
/// mid-stream the engine state and the unconsumed tail are retained, and the
/// next `set_input` appends to that tail. Conversely, several concatenated
/// streams inside one unit are decoded back-to-back within a single `run`
/// call by re-initializing the engine at each stream end.
///
/// Because mid-stream starvation is indistinguishable from truncation at
/// the `run` level, a caller holding the complete source must follow the
/// final unit with [`StreamCodec::finish`], which turns a stream cut off
/// mid-record into a format error.
#[derive(Debug)]
pub struct Bzip2Decompressor {
    core: StreamCore,
    engine: DecompressEngine,
    mid_stream: bool,
}

impl Bzip2Decompressor {
    pub fn new() -> Self {
        Self { core: StreamCore::new(), engine: DecompressEngine::new(), mid_stream: false }
    }

    fn fail(&mut self, fault: EngineFault) -> Error {
        self.engine.reset();
        self.mid_stream = false;
        self.core.fail(map_fault(fault))
    }
}

impl Default for Bzip2Decompressor {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamCodec for Bzip2Decompressor {
    fn set_input(&mut self, src: &[u8]) -> Result<(), Error> {
        self.core.check_live()?;
        if self.mid_stream {
            // Continuation of a stream split across units: keep the
            // unconsumed tail (possibly a partial record) and extend it.
            self.core.append_input(src)
        } else {
            self.engine.reset();
            if !src.is_empty() && src.len() < engine::STREAM_HEADER_SIZE {
                return Err(self.fail(EngineFault::DataMagic));
            }
            self.core.replace_input(src)
        }
    }

    fn run(&mut self, dst: &mut [u8]) -> Result<RunStatus, Error> {
        self.core.check_live()?;

        let mut written = 0;
        loop {
            let progress = match self.engine.decompress(self.core.remaining(), &mut dst[written..]) {
                Ok(p) => p,
                Err(fault) => return Err(self.fail(fault)),
            };
            self.core.consume(progress.consumed);
            written += progress.produced;

            match progress.state {
                EngineState::StreamEnd => {
                    self.engine.reset();
                    if !self.core.is_drained() {
                        // Concatenated streams: keep decoding in this call.
                        self.mid_stream = false;
                        continue;
                    }
                    self.core.clear();
                    self.mid_stream = false;
                    return Ok(RunStatus { bytes_written: written, output_full: false });
                }
                EngineState::Running => {
                    if written == dst.len()
                        && (self.engine.has_pending_output() || !self.core.is_drained())
                    {
                        self.mid_stream = true;
                        return Ok(RunStatus { bytes_written: written, output_full: true });
                    }
                    if progress.consumed == 0 && progress.produced == 0 {
                        // The engine is starved: a partial record needs the
                        // next input unit.
                        self.mid_stream = !self.engine.is_idle() || !self.core.is_drained();
                        if !self.mid_stream {
                            self.core.clear();
                        }
                        return Ok(RunStatus { bytes_written: written, output_full: false });
                    }
                }
            }
        }
    }

    fn finish(&mut self) -> Result<(), Error> {
        self.core.check_live()?;
        if !self.mid_stream {
            return Ok(());
        }
        // Starved mid-record with no further input coming: the stream was
        // cut off. Name the partial record if its header survived.
        let rem = self.core.remaining();
        let err = if rem.len() >= engine::BLOCK_HEADER_SIZE && rem[0] == engine::BLOCK_MARK {
            let declared = u32::from_le_bytes(rem[5..9].try_into().unwrap()) as usize;
            Error::TruncatedBlock {
                declared,
                available: rem.len() - engine::BLOCK_HEADER_SIZE,
            }
        } else {
            Error::TruncatedHeader { needed: engine::BLOCK_HEADER_SIZE, available: rem.len() }
        };
        self.engine.reset();
        self.mid_stream = false;
        Err(self.core.fail(err))
    }

    fn reset(&mut self) {
        self.core.clear();
        self.engine.reset();
        self.mid_stream = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::drive;

    #[test]
    fn default_level_maps_to_nine_and_zero_to_one() {
        assert_eq!(Bzip2Level::Default.resolve().unwrap(), 9);
        assert_eq!(Bzip2Level::Precise(0).resolve().unwrap(), 1);
        assert_eq!(Bzip2Level::Precise(5).resolve().unwrap(), 5);
        assert_eq!(Bzip2Level::Precise(12).resolve().unwrap_err(), Error::InvalidLevel(12));
    }

    #[test]
    fn roundtrip_with_small_destination_blocks() {
        let src = b"bzip2-style wrapper roundtrip ".repeat(200);
        let mut comp = Bzip2Compressor::new(Bzip2Parameters::default()).unwrap();
        let encoded = drive(&mut comp, &src, 128).unwrap();
        let mut dec = Bzip2Decompressor::new();
        let decoded = drive(&mut dec, &encoded, 97).unwrap();
        assert_eq!(decoded, src);
    }

    #[test]
    fn concatenated_streams_decode_in_one_unit() {
        let mut comp = Bzip2Compressor::new(Bzip2Parameters::default()).unwrap();
        let mut joined = drive(&mut comp, b"first stream ", 256).unwrap();
        joined.extend(drive(&mut comp, b"second stream", 256).unwrap());

        let mut dec = Bzip2Decompressor::new();
        let decoded = drive(&mut dec, &joined, 256).unwrap();
        assert_eq!(decoded, b"first stream second stream");
    }
}
