//! Byte run-length codec primitive.
//!
//! Code stream: a sequence of `(count, byte)` pairs with `count` in
//! `1..=255`. A run longer than 255 bytes is split across several pairs.
//! The encoder is prefix-capable: given a destination too small for the
//! whole input it consumes the longest input prefix whose pairs fit, which
//! is what lets the streaming wrapper continue a chunk across `run` calls.

use super::CorruptStream;

/// Longest run a single pair can describe.
pub(crate) const MAX_RUN: usize = 255;

/// Size of one code pair in bytes.
pub(crate) const PAIR_SIZE: usize = 2;

/// Worst-case encoded size: every byte its own pair.
#[inline]
pub(crate) fn encode_bound(len: usize) -> usize {
    len.saturating_mul(PAIR_SIZE)
}

/// Encode a prefix of `src` into `dst`.
///
/// Returns `(consumed, written)`. Stops when either the input is exhausted
/// or fewer than [`PAIR_SIZE`] bytes of destination remain; the caller
/// decides whether a partial encode means "output block full".
pub(crate) fn encode(src: &[u8], dst: &mut [u8]) -> (usize, usize) {
    let mut ip = 0;
    let mut op = 0;
    while ip < src.len() && op + PAIR_SIZE <= dst.len() {
        let value = src[ip];
        let mut run = 1;
        while run < MAX_RUN && ip + run < src.len() && src[ip + run] == value {
            run += 1;
        }
        dst[op] = run as u8;
        dst[op + 1] = value;
        op += PAIR_SIZE;
        ip += run;
    }
    (ip, op)
}

/// Decode the complete pair stream `src` into `dst`.
///
/// Returns the number of bytes written. Fails when `src` ends on a dangling
/// count byte, contains a zero count, or the decoded bytes would overrun
/// `dst` (a declared-size mismatch in the chunk header).
pub(crate) fn decode(src: &[u8], dst: &mut [u8]) -> Result<usize, CorruptStream> {
    if src.len() % PAIR_SIZE != 0 {
        return Err(CorruptStream);
    }
    let mut op = 0;
    for pair in src.chunks_exact(PAIR_SIZE) {
        let run = pair[0] as usize;
        if run == 0 {
            return Err(CorruptStream);
        }
        if op + run > dst.len() {
            return Err(CorruptStream);
        }
        dst[op..op + run].fill(pair[1]);
        op += run;
    }
    Ok(op)
}
