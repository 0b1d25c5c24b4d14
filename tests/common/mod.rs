//! Shared helpers for the integration test suites.

/// Deterministic pseudo-random bytes (xorshift32), so failures reproduce.
pub fn pseudo_random_bytes(len: usize, seed: u32) -> Vec<u8> {
    let mut state = seed | 1;
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            state as u8
        })
        .collect()
}

/// `pattern(b"AB", 7)` → `ABABABA`.
pub fn pattern(unit: &[u8], len: usize) -> Vec<u8> {
    unit.iter().copied().cycle().take(len).collect()
}

/// Mixed corpus: compressible runs interleaved with noise.
pub fn mixed_corpus(len: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(len);
    let noise = pseudo_random_bytes(len, 0xC0FFEE);
    let mut i = 0;
    while out.len() < len {
        out.extend(std::iter::repeat(b'a' + (i % 26) as u8).take(64.min(len - out.len())));
        if out.len() < len {
            let take = 32.min(len - out.len());
            out.extend_from_slice(&noise[out.len()..out.len() + take]);
        }
        i += 1;
    }
    out
}
