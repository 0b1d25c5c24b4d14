//! Streaming RLE compressor and decompressor.
//!
//! Framing: when [`RleParameters::block_header`] is on (the default), every
//! emitted chunk is prefixed with an 8-byte header — a `u32` uncompressed
//! size followed by a `u32` compressed size, both in native byte order. The
//! header always describes payload the engine has already produced, so a
//! header is never written without its chunk.
//!
//! With headers off the stream is raw RLE code pairs with no chunk
//! delimiters; decompression then treats the whole unit as one chunk and
//! decodes it incrementally.

use crate::codec::rle;
use crate::error::Error;
use crate::stream::{RunStatus, StreamCodec, StreamCore};

/// Size of the optional per-chunk header: `u32` uncompressed size +
/// `u32` compressed size.
pub const RLE_HEADER_SIZE: usize = 8;

/// Largest chunk a single header can describe.
const MAX_CHUNK: usize = u32::MAX as usize;

/// Parameters snapshotted by [`RleCompressor::new`] / [`RleDecompressor::new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RleParameters {
    /// Prefix each emitted chunk with the 8-byte size header.
    pub block_header: bool,
}

impl Default for RleParameters {
    fn default() -> Self {
        Self { block_header: true }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Compressor
// ─────────────────────────────────────────────────────────────────────────────

/// Streaming RLE compressor.
#[derive(Debug)]
pub struct RleCompressor {
    params: RleParameters,
    core: StreamCore,
}

impl RleCompressor {
    pub fn new(params: RleParameters) -> Self {
        Self { params, core: StreamCore::new() }
    }

    #[inline]
    fn header_size(&self) -> usize {
        if self.params.block_header { RLE_HEADER_SIZE } else { 0 }
    }
}

impl StreamCodec for RleCompressor {
    fn set_input(&mut self, src: &[u8]) -> Result<(), Error> {
        self.core.check_live()?;
        self.core.replace_input(src)
    }

    fn run(&mut self, dst: &mut [u8]) -> Result<RunStatus, Error> {
        self.core.check_live()?;

        // An empty unit flushes to nothing; no chunk is framed for it.
        if self.core.is_drained() {
            self.core.clear();
            return Ok(RunStatus { bytes_written: 0, output_full: false });
        }

        let header = self.header_size();

        // The destination must fit the header plus at least one code pair,
        // otherwise no forward progress is possible.
        let needed = header + rle::PAIR_SIZE;
        if dst.len() < needed {
            return Err(self.core.fail(Error::OutputTooSmall { needed, available: dst.len() }));
        }

        // One primitive invocation per run call: encode the longest prefix
        // that fits the remaining destination. The payload is capped at
        // MAX_CHUNK so the written count also fits the header's u32 field.
        let input = self.core.remaining();
        let input = &input[..input.len().min(MAX_CHUNK)];
        let payload_cap = (dst.len() - header).min(MAX_CHUNK);
        let (consumed, written) = rle::encode(input, &mut dst[header..header + payload_cap]);

        if self.params.block_header {
            dst[..4].copy_from_slice(&(consumed as u32).to_ne_bytes());
            dst[4..8].copy_from_slice(&(written as u32).to_ne_bytes());
        }
        self.core.consume(consumed);

        let output_full = !self.core.is_drained();
        if !output_full {
            self.core.clear();
        }
        Ok(RunStatus { bytes_written: header + written, output_full })
    }

    fn reset(&mut self) {
        self.core.clear();
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Decompressor
// ─────────────────────────────────────────────────────────────────────────────

/// Streaming RLE decompressor.
///
/// When a chunk's declared decompressed size exceeds the caller's remaining
/// destination capacity, the chunk is decoded once into an internally owned
/// spill buffer and drained across subsequent `run` calls; the buffer is
/// released the moment it empties.
#[derive(Debug)]
pub struct RleDecompressor {
    params: RleParameters,
    core: StreamCore,
    spill: Vec<u8>,
    spill_pos: usize,
    /// Headerless mode only: remainder of a code pair split by a full
    /// destination block (value, bytes still to emit).
    carry: Option<(u8, usize)>,
}

impl RleDecompressor {
    pub fn new(params: RleParameters) -> Self {
        Self {
            params,
            core: StreamCore::new(),
            spill: Vec::new(),
            spill_pos: 0,
            carry: None,
        }
    }

    /// Finalize after an error: drop all streaming state, poison, return `err`.
    fn fail(&mut self, err: Error) -> Error {
        self.spill = Vec::new();
        self.spill_pos = 0;
        self.carry = None;
        self.core.fail(err)
    }

    /// Copy as much spill as fits into `dst`, releasing the buffer once it
    /// is fully drained. Returns the number of bytes copied.
    fn drain_spill(&mut self, dst: &mut [u8]) -> usize {
        if self.spill.is_empty() {
            return 0;
        }
        let pending = self.spill.len() - self.spill_pos;
        let n = pending.min(dst.len());
        dst[..n].copy_from_slice(&self.spill[self.spill_pos..self.spill_pos + n]);
        self.spill_pos += n;
        if self.spill_pos == self.spill.len() {
            self.spill = Vec::new();
            self.spill_pos = 0;
        }
        n
    }

    /// Read the next chunk header from the unconsumed input.
    fn peek_header(&self) -> Result<(usize, usize), Error> {
        let rem = self.core.remaining();
        if rem.len() < RLE_HEADER_SIZE {
            return Err(Error::TruncatedHeader { needed: RLE_HEADER_SIZE, available: rem.len() });
        }
        let uncompressed = u32::from_ne_bytes(rem[0..4].try_into().unwrap()) as usize;
        let compressed = u32::from_ne_bytes(rem[4..8].try_into().unwrap()) as usize;
        if rem.len() < RLE_HEADER_SIZE + compressed {
            return Err(Error::TruncatedBlock {
                declared: compressed,
                available: rem.len() - RLE_HEADER_SIZE,
            });
        }
        Ok((uncompressed, compressed))
    }

    /// Decode framed chunks back-to-back while input and capacity remain.
    fn run_framed(&mut self, dst: &mut [u8], mut written: usize) -> Result<RunStatus, Error> {
        loop {
            if self.core.remaining().is_empty() {
                break;
            }
            if written == dst.len() {
                // More chunks pending but no capacity left this call.
                return Ok(RunStatus { bytes_written: written, output_full: true });
            }
            let (uncompressed, compressed) = match self.peek_header() {
                Ok(sizes) => sizes,
                Err(e) => return Err(self.fail(e)),
            };

            let space = dst.len() - written;
            if space >= uncompressed {
                // Decode directly into the caller's block.
                let produced = {
                    let payload = &self.core.remaining()[RLE_HEADER_SIZE..RLE_HEADER_SIZE + compressed];
                    rle::decode(payload, &mut dst[written..written + uncompressed])
                };
                match produced {
                    Ok(n) if n == uncompressed => {}
                    _ => return Err(self.fail(Error::CorruptedData)),
                }
                written += uncompressed;
                self.core.consume(RLE_HEADER_SIZE + compressed);
            } else {
                // Decode once into a spill buffer sized exactly to the chunk,
                // hand over the prefix that fits, keep the rest for later.
                if self.spill.try_reserve_exact(uncompressed).is_err() {
                    return Err(self.fail(Error::AllocationFailed));
                }
                self.spill.resize(uncompressed, 0);
                let produced = {
                    let payload = &self.core.remaining()[RLE_HEADER_SIZE..RLE_HEADER_SIZE + compressed];
                    rle::decode(payload, &mut self.spill[..])
                };
                match produced {
                    Ok(n) if n == uncompressed => {}
                    _ => return Err(self.fail(Error::CorruptedData)),
                }
                self.core.consume(RLE_HEADER_SIZE + compressed);
                written += self.drain_spill(&mut dst[written..]);
                return Ok(RunStatus { bytes_written: written, output_full: true });
            }
        }

        // Unit fully flushed: reset to a clean state.
        self.core.clear();
        Ok(RunStatus { bytes_written: written, output_full: false })
    }

    /// Headerless mode: the whole unit is one chunk of raw pairs, decoded
    /// incrementally with a run carry so any destination size works.
    fn run_raw(&mut self, dst: &mut [u8], mut written: usize) -> Result<RunStatus, Error> {
        while written < dst.len() {
            if let Some((value, pending)) = self.carry.take() {
                let n = pending.min(dst.len() - written);
                dst[written..written + n].fill(value);
                written += n;
                if n < pending {
                    self.carry = Some((value, pending - n));
                }
                continue;
            }
            let rem = self.core.remaining();
            if rem.is_empty() {
                break;
            }
            if rem.len() < rle::PAIR_SIZE {
                return Err(self.fail(Error::CorruptedData));
            }
            let run = rem[0] as usize;
            let value = rem[1];
            if run == 0 {
                return Err(self.fail(Error::CorruptedData));
            }
            self.core.consume(rle::PAIR_SIZE);
            self.carry = Some((value, run));
        }

        let output_full = self.carry.is_some() || !self.core.is_drained();
        if !output_full {
            self.core.clear();
        }
        Ok(RunStatus { bytes_written: written, output_full })
    }
}

impl StreamCodec for RleDecompressor {
    fn set_input(&mut self, src: &[u8]) -> Result<(), Error> {
        self.core.check_live()?;
        // Abandon any in-progress unit.
        self.spill = Vec::new();
        self.spill_pos = 0;
        self.carry = None;
        // A non-empty framed source must contain at least one full header.
        if self.params.block_header && !src.is_empty() && src.len() < RLE_HEADER_SIZE {
            return Err(self.fail(Error::TruncatedHeader {
                needed: RLE_HEADER_SIZE,
                available: src.len(),
            }));
        }
        self.core.replace_input(src)
    }

    fn run(&mut self, dst: &mut [u8]) -> Result<RunStatus, Error> {
        self.core.check_live()?;

        // Continue draining a chunk held back from an earlier call first.
        let written = self.drain_spill(dst);
        if !self.spill.is_empty() {
            return Ok(RunStatus { bytes_written: written, output_full: true });
        }

        if self.params.block_header {
            self.run_framed(dst, written)
        } else {
            self.run_raw(dst, written)
        }
    }

    fn reset(&mut self) {
        self.core.clear();
        self.spill = Vec::new();
        self.spill_pos = 0;
        self.carry = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::drive;

    #[test]
    fn header_records_true_sizes() {
        let mut comp = RleCompressor::new(RleParameters::default());
        comp.set_input(&[0u8; 10]).unwrap();
        let mut dst = [0u8; 64];
        let status = comp.run(&mut dst).unwrap();
        assert!(!status.output_full);
        assert_eq!(u32::from_ne_bytes(dst[0..4].try_into().unwrap()), 10);
        assert_eq!(u32::from_ne_bytes(dst[4..8].try_into().unwrap()), 2);
        assert_eq!(status.bytes_written, RLE_HEADER_SIZE + 2);
    }

    #[test]
    fn destination_below_header_is_rejected() {
        let mut comp = RleCompressor::new(RleParameters::default());
        comp.set_input(b"data").unwrap();
        let mut dst = [0u8; 4];
        let err = comp.run(&mut dst).unwrap_err();
        assert!(matches!(err, Error::OutputTooSmall { .. }));
        // The instance is poisoned from here on.
        assert_eq!(comp.set_input(b"more").unwrap_err(), Error::InstancePoisoned);
    }

    #[test]
    fn headerless_roundtrip() {
        let params = RleParameters { block_header: false };
        let src = b"aaaabbbbccccdddd".repeat(10);
        let mut comp = RleCompressor::new(params);
        let encoded = drive(&mut comp, &src, 16).unwrap();
        let mut dec = RleDecompressor::new(params);
        let decoded = drive(&mut dec, &encoded, 7).unwrap();
        assert_eq!(decoded, src);
    }
}
