//! LZ77 byte codec primitive with an LZ4-flavoured token stream.
//!
//! Sequence layout: a token byte whose high nibble is the literal count and
//! whose low nibble is the match length minus [`MIN_MATCH`] (nibble value 15
//! marks an extension: further length bytes of 255 follow until a byte
//! < 255), then the literals, then a 2-byte little-endian match offset, then
//! any match-length extension bytes. The final sequence of a stream carries
//! literals only: its match nibble is 0 and no offset follows — the decoder
//! recognizes it by input exhaustion after the literals.
//!
//! The encoder guarantees the [`compress_bound`] worst-case expansion, which
//! is what lets the streaming wrappers size a chunk against the remaining
//! destination capacity before invoking it.

use super::CorruptStream;

/// Shortest match worth encoding.
pub(crate) const MIN_MATCH: usize = 4;

/// Largest representable match offset (2-byte field).
const MAX_DISTANCE: usize = 65_535;

/// log2 of the match-finder hash table size.
const HASH_LOG: u32 = 13;

/// Worst-case compressed size of a `len`-byte input, header excluded.
#[inline]
pub(crate) fn compress_bound(len: usize) -> usize {
    len + len / 16 + 67
}

#[inline]
fn read_u32(src: &[u8], pos: usize) -> u32 {
    u32::from_le_bytes(src[pos..pos + 4].try_into().unwrap())
}

#[inline]
fn hash(sequence: u32) -> usize {
    (sequence.wrapping_mul(2_654_435_761) >> (32 - HASH_LOG)) as usize
}

/// Append a 15-excess extension length (255-run encoding).
#[inline]
fn write_ext_len(mut extra: usize, dst: &mut [u8], op: &mut usize) {
    while extra >= 255 {
        dst[*op] = 255;
        *op += 1;
        extra -= 255;
    }
    dst[*op] = extra as u8;
    *op += 1;
}

/// Emit one literals+match sequence and return the updated output cursor.
fn emit_sequence(dst: &mut [u8], mut op: usize, literals: &[u8], offset: usize, match_len: usize) -> usize {
    debug_assert!((1..=MAX_DISTANCE).contains(&offset));
    debug_assert!(match_len >= MIN_MATCH);

    let lit_len = literals.len();
    let ml = match_len - MIN_MATCH;
    let token_pos = op;
    op += 1;

    let lit_nibble = if lit_len >= 15 { 15 } else { lit_len as u8 };
    let ml_nibble = if ml >= 15 { 15 } else { ml as u8 };
    dst[token_pos] = (lit_nibble << 4) | ml_nibble;

    if lit_len >= 15 {
        write_ext_len(lit_len - 15, dst, &mut op);
    }
    dst[op..op + lit_len].copy_from_slice(literals);
    op += lit_len;

    dst[op..op + 2].copy_from_slice(&(offset as u16).to_le_bytes());
    op += 2;
    if ml >= 15 {
        write_ext_len(ml - 15, dst, &mut op);
    }
    op
}

/// Emit the final literals-only sequence.
fn emit_last_literals(dst: &mut [u8], mut op: usize, literals: &[u8]) -> usize {
    let lit_len = literals.len();
    let token_pos = op;
    op += 1;
    dst[token_pos] = if lit_len >= 15 { 15 << 4 } else { (lit_len as u8) << 4 };
    if lit_len >= 15 {
        write_ext_len(lit_len - 15, dst, &mut op);
    }
    dst[op..op + lit_len].copy_from_slice(literals);
    op + lit_len
}

/// Compress all of `src` into `dst`, returning the number of bytes written.
///
/// `dst` must be at least [`compress_bound`]`(src.len())` bytes; the
/// streaming wrappers guarantee this by construction.
pub(crate) fn compress(src: &[u8], dst: &mut [u8]) -> usize {
    debug_assert!(dst.len() >= compress_bound(src.len()));

    if src.is_empty() {
        return emit_last_literals(dst, 0, &[]);
    }

    let mut table = vec![0u32; 1 << HASH_LOG]; // position + 1; 0 = empty
    let mut op = 0;
    let mut anchor = 0;
    let mut ip = 0;

    // Leave room to always terminate with a literals-only sequence.
    while ip + MIN_MATCH <= src.len() {
        let h = hash(read_u32(src, ip));
        let candidate = table[h] as usize;
        table[h] = (ip + 1) as u32;

        if candidate != 0 {
            let cpos = candidate - 1;
            let distance = ip - cpos;
            if distance >= 1
                && distance <= MAX_DISTANCE
                && src[cpos..cpos + MIN_MATCH] == src[ip..ip + MIN_MATCH]
            {
                let mut match_len = MIN_MATCH;
                while ip + match_len < src.len() && src[cpos + match_len] == src[ip + match_len] {
                    match_len += 1;
                }
                op = emit_sequence(dst, op, &src[anchor..ip], distance, match_len);
                ip += match_len;
                anchor = ip;
                continue;
            }
        }
        ip += 1;
    }

    emit_last_literals(dst, op, &src[anchor..])
}

/// Decompress the complete token stream `src` into `dst`.
///
/// Returns the number of bytes written. The chunk framing declares the
/// decompressed size, so the caller passes a `dst` of at least that length
/// and cross-checks the returned count against the declaration.
pub(crate) fn decompress(src: &[u8], dst: &mut [u8]) -> Result<usize, CorruptStream> {
    let mut ip = 0;
    let mut op = 0;

    while ip < src.len() {
        let token = src[ip];
        ip += 1;

        // Literal run.
        let mut lit_len = (token >> 4) as usize;
        if lit_len == 15 {
            loop {
                let byte = *src.get(ip).ok_or(CorruptStream)?;
                ip += 1;
                lit_len += byte as usize;
                if byte < 255 {
                    break;
                }
            }
        }
        if ip + lit_len > src.len() || op + lit_len > dst.len() {
            return Err(CorruptStream);
        }
        dst[op..op + lit_len].copy_from_slice(&src[ip..ip + lit_len]);
        ip += lit_len;
        op += lit_len;

        // Input exhausted after literals: that was the final sequence.
        if ip == src.len() {
            return Ok(op);
        }

        // Match part.
        if ip + 2 > src.len() {
            return Err(CorruptStream);
        }
        let offset = u16::from_le_bytes(src[ip..ip + 2].try_into().unwrap()) as usize;
        ip += 2;
        if offset == 0 || offset > op {
            return Err(CorruptStream);
        }

        let mut match_len = (token & 0x0F) as usize + MIN_MATCH;
        if (token & 0x0F) == 0x0F {
            loop {
                let byte = *src.get(ip).ok_or(CorruptStream)?;
                ip += 1;
                match_len += byte as usize;
                if byte < 255 {
                    break;
                }
            }
        }
        if op + match_len > dst.len() {
            return Err(CorruptStream);
        }
        // Byte-wise copy: the match may overlap its own output.
        for i in 0..match_len {
            dst[op + i] = dst[op - offset + i];
        }
        op += match_len;
    }

    // A non-empty stream always ends in a literals-only sequence, handled
    // above; falling out of the loop is only legal for empty input.
    if src.is_empty() {
        Ok(0)
    } else {
        Err(CorruptStream)
    }
}
