//! Streaming LZO-style compressor and decompressor.
//!
//! Framing: every chunk carries a fixed 8-byte header — `u32` uncompressed
//! size then `u32` compressed size, native byte order — optionally wrapped
//! in caller-reserved padding: [`LzoParameters::pre_head_bytes`] zero bytes
//! before the header and [`LzoParameters::post_head_bytes`] zero bytes
//! between the header and the payload. The padding exists so embedding
//! callers can stamp their own metadata inline without re-framing.
//!
//! The compressor sizes each chunk against the remaining destination using
//! the codec's worst-case expansion guarantee
//! (`len + len/16 + 67`, see [`crate::codec::lz::compress_bound`]): the
//! largest input prefix whose bound fits is compressed whole, the remainder
//! is retained for the next `run` call.

use crate::codec::lz;
use crate::error::Error;
use crate::stream::{RunStatus, StreamCodec, StreamCore};

/// Size of the mandatory chunk header (padding excluded).
pub const LZO_HEADER_SIZE: usize = 8;

/// Largest chunk whose worst-case bound still fits the header's `u32`
/// compressed-size field.
const MAX_CHUNK: usize = 4_042_322_097;

/// Parameters snapshotted by [`LzoCompressor::new`] / [`LzoDecompressor::new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LzoParameters {
    /// Padding bytes reserved before the 8-byte header.
    pub pre_head_bytes: usize,
    /// Padding bytes reserved between the header and the payload.
    pub post_head_bytes: usize,
}

impl LzoParameters {
    /// Total framing overhead per chunk: padding plus the fixed header.
    #[inline]
    pub fn overhead(&self) -> usize {
        self.pre_head_bytes + LZO_HEADER_SIZE + self.post_head_bytes
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Compressor
// ─────────────────────────────────────────────────────────────────────────────

/// Streaming LZO-style compressor.
#[derive(Debug)]
pub struct LzoCompressor {
    params: LzoParameters,
    core: StreamCore,
}

impl LzoCompressor {
    pub fn new(params: LzoParameters) -> Self {
        Self { params, core: StreamCore::new() }
    }
}

impl StreamCodec for LzoCompressor {
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

        let overhead = self.params.overhead();

        // Minimum viable destination: framing overhead plus the bound of a
        // 2-byte chunk. Anything smaller can make no forward progress.
        let needed = overhead + lz::compress_bound(2);
        if dst.len() < needed {
            return Err(self.core.fail(Error::OutputTooSmall { needed, available: dst.len() }));
        }

        // Pick the largest prefix whose worst-case bound fits the remaining
        // payload capacity.
        let payload_cap = dst.len() - overhead;
        let remaining = self.core.remaining().len();
        let mut chunk = remaining.min(MAX_CHUNK);
        if lz::compress_bound(chunk) > payload_cap {
            chunk = ((payload_cap - 67) / 17).saturating_mul(16).min(remaining);
            while lz::compress_bound(chunk) > payload_cap {
                chunk -= 1;
            }
            // payload_cap >= bound(2) by the check above, so one byte of
            // input always fits; never stall on a non-empty unit.
            if chunk == 0 && remaining > 0 {
                chunk = 1;
            }
        }

        let written = {
            let input = &self.core.remaining()[..chunk];
            lz::compress(input, &mut dst[overhead..])
        };

        // Padding first, then the header describing the payload just made.
        let pre = self.params.pre_head_bytes;
        dst[..pre].fill(0);
        dst[pre + LZO_HEADER_SIZE..overhead].fill(0);
        dst[pre..pre + 4].copy_from_slice(&(chunk as u32).to_ne_bytes());
        dst[pre + 4..pre + 8].copy_from_slice(&(written as u32).to_ne_bytes());
        self.core.consume(chunk);

        let output_full = !self.core.is_drained();
        if !output_full {
            self.core.clear();
        }
        Ok(RunStatus { bytes_written: overhead + written, output_full })
    }

    fn reset(&mut self) {
        self.core.clear();
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Decompressor
// ─────────────────────────────────────────────────────────────────────────────

/// Streaming LZO-style decompressor with spill-buffer continuation for
/// chunks larger than the caller's destination block.
#[derive(Debug)]
pub struct LzoDecompressor {
    params: LzoParameters,
    core: StreamCore,
    spill: Vec<u8>,
    spill_pos: usize,
}

impl LzoDecompressor {
    pub fn new(params: LzoParameters) -> Self {
        Self { params, core: StreamCore::new(), spill: Vec::new(), spill_pos: 0 }
    }

    fn fail(&mut self, err: Error) -> Error {
        self.spill = Vec::new();
        self.spill_pos = 0;
        self.core.fail(err)
    }

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

    /// Read the next chunk header, skipping the configured padding.
    fn peek_header(&self) -> Result<(usize, usize), Error> {
        let overhead = self.params.overhead();
        let pre = self.params.pre_head_bytes;
        let rem = self.core.remaining();
        if rem.len() < overhead {
            return Err(Error::TruncatedHeader { needed: overhead, available: rem.len() });
        }
        let uncompressed = u32::from_ne_bytes(rem[pre..pre + 4].try_into().unwrap()) as usize;
        let compressed = u32::from_ne_bytes(rem[pre + 4..pre + 8].try_into().unwrap()) as usize;
        if rem.len() < overhead + compressed {
            return Err(Error::TruncatedBlock {
                declared: compressed,
                available: rem.len() - overhead,
            });
        }
        Ok((uncompressed, compressed))
    }
}

impl StreamCodec for LzoDecompressor {
    fn set_input(&mut self, src: &[u8]) -> Result<(), Error> {
        self.core.check_live()?;
        self.spill = Vec::new();
        self.spill_pos = 0;
        let overhead = self.params.overhead();
        if !src.is_empty() && src.len() < overhead {
            return Err(self.fail(Error::TruncatedHeader { needed: overhead, available: src.len() }));
        }
        self.core.replace_input(src)
    }

    fn run(&mut self, dst: &mut [u8]) -> Result<RunStatus, Error> {
        self.core.check_live()?;
        let overhead = self.params.overhead();

        let mut written = self.drain_spill(dst);
        if !self.spill.is_empty() {
            return Ok(RunStatus { bytes_written: written, output_full: true });
        }

        // Process chunks back-to-back while input and capacity remain.
        loop {
            if self.core.remaining().is_empty() {
                break;
            }
            if written == dst.len() {
                return Ok(RunStatus { bytes_written: written, output_full: true });
            }
            let (uncompressed, compressed) = match self.peek_header() {
                Ok(sizes) => sizes,
                Err(e) => return Err(self.fail(e)),
            };

            let space = dst.len() - written;
            if space >= uncompressed {
                let produced = {
                    let payload = &self.core.remaining()[overhead..overhead + compressed];
                    lz::decompress(payload, &mut dst[written..written + uncompressed])
                };
                match produced {
                    Ok(n) if n == uncompressed => {}
                    _ => return Err(self.fail(Error::CorruptedData)),
                }
                written += uncompressed;
                self.core.consume(overhead + compressed);
            } else {
                if self.spill.try_reserve_exact(uncompressed).is_err() {
                    return Err(self.fail(Error::AllocationFailed));
                }
                self.spill.resize(uncompressed, 0);
                let produced = {
                    let payload = &self.core.remaining()[overhead..overhead + compressed];
                    lz::decompress(payload, &mut self.spill[..])
                };
                match produced {
                    Ok(n) if n == uncompressed => {}
                    _ => return Err(self.fail(Error::CorruptedData)),
                }
                self.core.consume(overhead + compressed);
                written += self.drain_spill(&mut dst[written..]);
                return Ok(RunStatus { bytes_written: written, output_full: true });
            }
        }

        self.core.clear();
        Ok(RunStatus { bytes_written: written, output_full: false })
    }

    fn reset(&mut self) {
        self.core.clear();
        self.spill = Vec::new();
        self.spill_pos = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::drive;

    #[test]
    fn padding_is_zeroed_and_header_offset() {
        let params = LzoParameters { pre_head_bytes: 3, post_head_bytes: 2 };
        let mut comp = LzoCompressor::new(params);
        comp.set_input(b"hello hello hello hello").unwrap();
        let mut dst = [0xAAu8; 256];
        let status = comp.run(&mut dst).unwrap();
        assert!(!status.output_full);
        assert_eq!(&dst[..3], &[0, 0, 0]);
        assert_eq!(u32::from_ne_bytes(dst[3..7].try_into().unwrap()), 23);
        assert_eq!(&dst[11..13], &[0, 0]);
    }

    #[test]
    fn minimum_destination_is_enforced() {
        let params = LzoParameters::default();
        let mut comp = LzoCompressor::new(params);
        comp.set_input(b"abc").unwrap();
        // overhead (8) + bound(2) = 8 + 69 = 77; one byte short must fail.
        let mut dst = vec![0u8; 76];
        let err = comp.run(&mut dst).unwrap_err();
        assert!(matches!(err, Error::OutputTooSmall { needed: 77, .. }));
    }

    #[test]
    fn chunk_cap_keeps_worst_case_in_header_range() {
        // The compressed-size header field is a u32; the largest permitted
        // chunk must keep even a worst-case payload representable.
        assert!(lz::compress_bound(MAX_CHUNK) <= u32::MAX as usize);
    }

    #[test]
    fn tight_destination_still_makes_progress() {
        let params = LzoParameters::default();
        let src: Vec<u8> = (0..=255u8).cycle().take(2048).collect();
        let mut comp = LzoCompressor::new(params);
        let encoded = drive(&mut comp, &src, 77).unwrap();
        let mut dec = LzoDecompressor::new(params);
        let decoded = drive(&mut dec, &encoded, 64).unwrap();
        assert_eq!(decoded, src);
    }
}
