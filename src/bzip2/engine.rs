//! The embedded block-compression engine behind the BZip2-style wrapper.
//!
//! Interface modelled on the classic `bz_stream` protocol: the caller loops
//! `compress` with an [`Action`] (`Run` while feeding, `Flush` to force the
//! current block out, `Finish` for the tail) or `decompress`, and the engine
//! reports consumed/produced counts plus whether the logical stream ended.
//! Faults come back as coarse [`EngineFault`] codes, which the wrapper maps
//! into the crate error taxonomy.
//!
//! Native stream framing (this engine's own wire format — the wrapper adds
//! nothing around it):
//!
//! ```text
//! stream  := b"bSQ" level-digit block* trailer
//! block   := 0x42 u32le uncompressed-size u32le compressed-size payload
//! trailer := 0x17
//! ```
//!
//! Payloads are LZ77 token streams (see [`crate::codec::lz`]). Input is
//! accumulated into one block of at most [`block_capacity`] bytes before
//! being compressed, so a `level` of 1..=9 scales memory and block
//! granularity the way bzip2's block-size digit does.

use crate::codec::lz;

/// Stream magic preceding the level digit.
const STREAM_MAGIC: [u8; 3] = *b"bSQ";

/// Byte introducing a block record.
pub(crate) const BLOCK_MARK: u8 = 0x42;

/// Byte terminating a stream.
const STREAM_END_MARK: u8 = 0x17;

/// Stream header size: magic plus ASCII level digit.
pub(crate) const STREAM_HEADER_SIZE: usize = STREAM_MAGIC.len() + 1;

/// Block record header size: marker plus two `u32` size fields.
pub(crate) const BLOCK_HEADER_SIZE: usize = 1 + 8;

/// Uncompressed capacity of one block at the given level digit.
#[inline]
pub(crate) fn block_capacity(level: u32) -> usize {
    level as usize * 1024 * 97
}

// ─────────────────────────────────────────────────────────────────────────────
// Protocol types
// ─────────────────────────────────────────────────────────────────────────────

/// Flush action for [`CompressEngine::compress`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Action {
    /// Accumulate input; emit a block only when one fills completely.
    Run,
    /// Emit the current block now, keep the stream open.
    Flush,
    /// All input for this stream has been handed over; emit the remainder
    /// and the stream trailer.
    Finish,
}

/// Whether the logical stream has ended and been fully delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EngineState {
    Running,
    StreamEnd,
}

/// Result of one engine call.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Progress {
    pub consumed: usize,
    pub produced: usize,
    pub state: EngineState,
}

/// Engine fault codes, mirroring the classic library status taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EngineFault {
    /// Caller protocol violation (bad level, use after stream end).
    Param,
    /// Engine constants are inconsistent for this build.
    Config,
    /// Scratch or queue allocation failed.
    Mem,
    /// Malformed block data.
    Data,
    /// Stream does not start with the engine magic.
    DataMagic,
}

// ─────────────────────────────────────────────────────────────────────────────
// Output queue
// ─────────────────────────────────────────────────────────────────────────────

/// Produced bytes not yet handed to the caller. Owned by the engine between
/// block encode and drain; capacity is retained across blocks.
#[derive(Debug, Default)]
struct OutQueue {
    buf: Vec<u8>,
    pos: usize,
}

impl OutQueue {
    fn push(&mut self, bytes: &[u8]) -> Result<(), EngineFault> {
        if self.buf.try_reserve(bytes.len()).is_err() {
            return Err(EngineFault::Mem);
        }
        self.buf.extend_from_slice(bytes);
        Ok(())
    }

    /// Grow by `extra` zeroed bytes and return the writable tail.
    fn grow(&mut self, extra: usize) -> Result<&mut [u8], EngineFault> {
        if self.buf.try_reserve(extra).is_err() {
            return Err(EngineFault::Mem);
        }
        let start = self.buf.len();
        self.buf.resize(start + extra, 0);
        Ok(&mut self.buf[start..])
    }

    fn truncate_to(&mut self, len: usize) {
        debug_assert!(len <= self.buf.len());
        self.buf.truncate(len);
    }

    fn len(&self) -> usize {
        self.buf.len()
    }

    fn drain_into(&mut self, dst: &mut [u8]) -> usize {
        let pending = self.buf.len() - self.pos;
        let n = pending.min(dst.len());
        dst[..n].copy_from_slice(&self.buf[self.pos..self.pos + n]);
        self.pos += n;
        if self.pos == self.buf.len() {
            self.buf.clear();
            self.pos = 0;
        }
        n
    }

    fn is_empty(&self) -> bool {
        self.pos == self.buf.len()
    }

    fn clear(&mut self) {
        self.buf.clear();
        self.pos = 0;
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// CompressEngine
// ─────────────────────────────────────────────────────────────────────────────

/// Streaming block compressor with bz_stream-style call discipline.
#[derive(Debug)]
pub(crate) struct CompressEngine {
    level: u32,
    capacity: usize,
    block: Vec<u8>,
    out: OutQueue,
    header_written: bool,
    finished: bool,
}

impl CompressEngine {
    /// Validate the level digit and derive the block capacity.
    pub(crate) fn new(level: u32) -> Result<Self, EngineFault> {
        if !(1..=9).contains(&level) {
            return Err(EngineFault::Param);
        }
        let capacity = (level as usize)
            .checked_mul(1024 * 97)
            .ok_or(EngineFault::Config)?;
        Ok(Self {
            level,
            capacity,
            block: Vec::new(),
            out: OutQueue::default(),
            header_written: false,
            finished: false,
        })
    }

    /// Uncompressed bytes the current block can still absorb.
    pub(crate) fn block_room(&self) -> usize {
        self.capacity - self.block.len()
    }

    pub(crate) fn has_pending_output(&self) -> bool {
        !self.out.is_empty()
    }

    /// Compress the accumulated block into the output queue.
    fn emit_block(&mut self) -> Result<(), EngineFault> {
        if self.block.is_empty() {
            return Ok(());
        }
        let bound = lz::compress_bound(self.block.len());
        let header_at = self.out.len();
        let payload = self.out.grow(BLOCK_HEADER_SIZE + bound)?;
        let written = lz::compress(&self.block, &mut payload[BLOCK_HEADER_SIZE..]);
        payload[0] = BLOCK_MARK;
        payload[1..5].copy_from_slice(&(self.block.len() as u32).to_le_bytes());
        payload[5..9].copy_from_slice(&(written as u32).to_le_bytes());
        self.out.truncate_to(header_at + BLOCK_HEADER_SIZE + written);
        self.block.clear();
        Ok(())
    }

    /// One engine step: absorb input, honour `action`, drain into `dst`.
    pub(crate) fn compress(
        &mut self,
        src: &[u8],
        dst: &mut [u8],
        action: Action,
    ) -> Result<Progress, EngineFault> {
        if self.finished && self.out.is_empty() {
            // Use after stream end without a reset.
            return Err(EngineFault::Param);
        }

        if !self.header_written {
            self.out.push(&STREAM_MAGIC)?;
            self.out.push(&[b'0' + self.level as u8])?;
            self.header_written = true;
        }

        let consumed = if self.finished {
            0
        } else {
            let take = self.block_room().min(src.len());
            if self.block.try_reserve(take).is_err() {
                return Err(EngineFault::Mem);
            }
            self.block.extend_from_slice(&src[..take]);
            take
        };

        if !self.finished {
            if self.block.len() == self.capacity {
                self.emit_block()?;
            }
            match action {
                Action::Run => {}
                Action::Flush => self.emit_block()?,
                Action::Finish => {
                    if consumed == src.len() {
                        self.emit_block()?;
                        self.out.push(&[STREAM_END_MARK])?;
                        self.finished = true;
                    }
                }
            }
        }

        let produced = self.out.drain_into(dst);
        let state = if self.finished && self.out.is_empty() {
            EngineState::StreamEnd
        } else {
            EngineState::Running
        };
        Ok(Progress { consumed, produced, state })
    }

    /// Return to the fresh-stream state for the next unit.
    pub(crate) fn reset(&mut self) {
        self.block.clear();
        self.out.clear();
        self.header_written = false;
        self.finished = false;
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// DecompressEngine
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecodeStage {
    /// Expecting the stream header.
    Magic,
    /// Expecting a block record or the trailer.
    Block,
    /// Trailer seen.
    Done,
}

/// Streaming block decompressor. Consumes only complete records; partial
/// records are left unconsumed so the caller can supply the rest later.
#[derive(Debug)]
pub(crate) struct DecompressEngine {
    stage: DecodeStage,
    level: u32,
    out: OutQueue,
}

impl DecompressEngine {
    pub(crate) fn new() -> Self {
        Self { stage: DecodeStage::Magic, level: 0, out: OutQueue::default() }
    }

    pub(crate) fn has_pending_output(&self) -> bool {
        !self.out.is_empty()
    }

    /// `true` when no stream is underway (safe point to swap input units).
    pub(crate) fn is_idle(&self) -> bool {
        self.stage == DecodeStage::Magic && self.out.is_empty()
    }

    /// One engine step: decode as many complete records as `src` holds,
    /// draining decoded bytes into `dst` as capacity allows.
    pub(crate) fn decompress(&mut self, src: &[u8], dst: &mut [u8]) -> Result<Progress, EngineFault> {
        let mut consumed = 0;
        let mut produced = 0;

        loop {
            produced += self.out.drain_into(&mut dst[produced..]);
            if !self.out.is_empty() {
                break; // destination full
            }
            match self.stage {
                DecodeStage::Magic => {
                    let rem = &src[consumed..];
                    if rem.len() < STREAM_HEADER_SIZE {
                        break;
                    }
                    if rem[..STREAM_MAGIC.len()] != STREAM_MAGIC {
                        return Err(EngineFault::DataMagic);
                    }
                    let level = rem[STREAM_MAGIC.len()].wrapping_sub(b'0') as u32;
                    if !(1..=9).contains(&level) {
                        return Err(EngineFault::Data);
                    }
                    self.level = level;
                    consumed += STREAM_HEADER_SIZE;
                    self.stage = DecodeStage::Block;
                }
                DecodeStage::Block => {
                    let rem = &src[consumed..];
                    let Some(&mark) = rem.first() else { break };
                    match mark {
                        STREAM_END_MARK => {
                            consumed += 1;
                            self.stage = DecodeStage::Done;
                        }
                        BLOCK_MARK => {
                            if rem.len() < BLOCK_HEADER_SIZE {
                                break;
                            }
                            let uncompressed =
                                u32::from_le_bytes(rem[1..5].try_into().unwrap()) as usize;
                            let compressed =
                                u32::from_le_bytes(rem[5..9].try_into().unwrap()) as usize;
                            if uncompressed > block_capacity(self.level) {
                                return Err(EngineFault::Data);
                            }
                            if rem.len() < BLOCK_HEADER_SIZE + compressed {
                                break;
                            }
                            let payload = &rem[BLOCK_HEADER_SIZE..BLOCK_HEADER_SIZE + compressed];
                            let scratch = self.out.grow(uncompressed)?;
                            match lz::decompress(payload, scratch) {
                                Ok(n) if n == uncompressed => {}
                                _ => return Err(EngineFault::Data),
                            }
                            consumed += BLOCK_HEADER_SIZE + compressed;
                        }
                        _ => return Err(EngineFault::Data),
                    }
                }
                DecodeStage::Done => break,
            }
        }

        let state = if self.stage == DecodeStage::Done && self.out.is_empty() {
            EngineState::StreamEnd
        } else {
            EngineState::Running
        };
        Ok(Progress { consumed, produced, state })
    }

    /// Return to the fresh-stream state (used between concatenated streams).
    pub(crate) fn reset(&mut self) {
        self.stage = DecodeStage::Magic;
        self.level = 0;
        self.out.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pump_compress(engine: &mut CompressEngine, src: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        let mut dst = [0u8; 1024];
        let mut fed = 0;
        loop {
            let p = engine
                .compress(&src[fed..], &mut dst, Action::Finish)
                .expect("compress step");
            fed += p.consumed;
            out.extend_from_slice(&dst[..p.produced]);
            if p.state == EngineState::StreamEnd {
                return out;
            }
        }
    }

    fn pump_decompress(engine: &mut DecompressEngine, src: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        let mut dst = [0u8; 1024];
        let mut fed = 0;
        loop {
            let p = engine.decompress(&src[fed..], &mut dst).expect("decompress step");
            fed += p.consumed;
            out.extend_from_slice(&dst[..p.produced]);
            if p.state == EngineState::StreamEnd {
                return out;
            }
        }
    }

    #[test]
    fn roundtrip_single_block() {
        let src = b"engine roundtrip payload ".repeat(100);
        let mut comp = CompressEngine::new(9).unwrap();
        let encoded = pump_compress(&mut comp, &src);
        assert_eq!(&encoded[..3], b"bSQ");
        assert_eq!(encoded[3], b'9');
        assert_eq!(*encoded.last().unwrap(), STREAM_END_MARK);

        let mut dec = DecompressEngine::new();
        assert_eq!(pump_decompress(&mut dec, &encoded), src);
    }

    #[test]
    fn roundtrip_spans_multiple_blocks() {
        // Level 1 capacity is 99,328 bytes; force three blocks.
        let src: Vec<u8> = (0..300_000u32).map(|i| (i % 251) as u8).collect();
        let mut comp = CompressEngine::new(1).unwrap();
        let encoded = pump_compress(&mut comp, &src);
        let mut dec = DecompressEngine::new();
        assert_eq!(pump_decompress(&mut dec, &encoded), src);
    }

    #[test]
    fn empty_stream_is_header_and_trailer() {
        let mut comp = CompressEngine::new(5).unwrap();
        let encoded = pump_compress(&mut comp, b"");
        assert_eq!(encoded, [b'b', b'S', b'Q', b'5', STREAM_END_MARK]);
        let mut dec = DecompressEngine::new();
        assert_eq!(pump_decompress(&mut dec, &encoded), b"");
    }

    #[test]
    fn level_is_validated() {
        assert_eq!(CompressEngine::new(0).unwrap_err(), EngineFault::Param);
        assert_eq!(CompressEngine::new(10).unwrap_err(), EngineFault::Param);
    }

    #[test]
    fn bad_magic_is_distinguished_from_bad_data() {
        let mut dec = DecompressEngine::new();
        let mut dst = [0u8; 64];
        assert_eq!(
            dec.decompress(b"ZZZZ....", &mut dst).unwrap_err(),
            EngineFault::DataMagic
        );

        let mut dec = DecompressEngine::new();
        // Valid header, garbage record marker.
        assert_eq!(
            dec.decompress(b"bSQ5\xFF", &mut dst).unwrap_err(),
            EngineFault::Data
        );
    }

    #[test]
    fn partial_records_are_left_unconsumed() {
        let src = b"split across calls ".repeat(50);
        let mut comp = CompressEngine::new(2).unwrap();
        let encoded = pump_compress(&mut comp, &src);

        let mut dec = DecompressEngine::new();
        let mut out = Vec::new();
        let mut dst = [0u8; 4096];
        // Feed one byte at a time; the engine must never mis-parse.
        let mut held = Vec::new();
        for &byte in &encoded {
            held.push(byte);
            let p = dec.decompress(&held, &mut dst).unwrap();
            held.drain(..p.consumed);
            out.extend_from_slice(&dst[..p.produced]);
        }
        assert_eq!(out, src);
        assert!(held.is_empty());
    }

    #[test]
    fn use_after_stream_end_is_a_param_fault() {
        let mut comp = CompressEngine::new(1).unwrap();
        let _ = pump_compress(&mut comp, b"abc");
        let mut dst = [0u8; 64];
        assert_eq!(
            comp.compress(b"more", &mut dst, Action::Run).unwrap_err(),
            EngineFault::Param
        );
        comp.reset();
        assert!(comp.compress(b"more", &mut dst, Action::Finish).is_ok());
    }
}
