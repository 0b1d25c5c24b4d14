//! Cross-codec tests of the shared streaming contract: unit framing is
//! independent of destination block sizes, instances reset silently between
//! units, and `set_input` / `reset` abandon in-progress units.

mod common;

use streampress::io::{Algorithm, CodecConfig};
use streampress::{drive, StreamCodec};

fn configs() -> Vec<CodecConfig> {
    [Algorithm::Rle, Algorithm::Lzo, Algorithm::Bzip2]
        .into_iter()
        .map(|algorithm| CodecConfig { algorithm, ..CodecConfig::default() })
        .collect()
}

#[test]
fn decompression_is_invariant_under_block_sizes() {
    // Whatever destination block sizes the two sides pick, the decompressed
    // bytes must equal the source. 77 is the smallest destination the LZO
    // compressor accepts.
    let src = common::mixed_corpus(30_000);
    for config in configs() {
        for compress_block in [77usize, 1024, 1 << 20] {
            let mut comp = config.compressor().unwrap();
            let encoded = drive(comp.as_mut(), &src, compress_block).unwrap();
            for decompress_block in [1usize, 37, 8192] {
                let mut dec = config.decompressor().unwrap();
                let decoded = drive(dec.as_mut(), &encoded, decompress_block).unwrap();
                assert_eq!(
                    decoded, src,
                    "{:?} compress_block={compress_block} decompress_block={decompress_block}",
                    config.algorithm
                );
            }
        }
    }
}

#[test]
fn reused_instance_matches_fresh_instance() {
    // After a unit completes the engine must be indistinguishable from a new
    // one: compressing B after A gives byte-identical output to a fresh
    // instance compressing B.
    let unit_a = common::pattern(b"unit A ", 9_000);
    let unit_b = common::pseudo_random_bytes(9_000, 42);
    for config in configs() {
        let mut reused = config.compressor().unwrap();
        drive(reused.as_mut(), &unit_a, 1024).unwrap();
        let from_reused = drive(reused.as_mut(), &unit_b, 1024).unwrap();

        let mut fresh = config.compressor().unwrap();
        let from_fresh = drive(fresh.as_mut(), &unit_b, 1024).unwrap();
        assert_eq!(from_reused, from_fresh, "{:?}", config.algorithm);
    }
}

#[test]
fn set_input_abandons_pending_output() {
    // Leave a unit half-flushed, then start a new one; nothing of the
    // abandoned unit may leak into the new unit's stream.
    let abandoned = common::pattern(b"left behind ", 20_000);
    let replacement = b"the one that counts".to_vec();
    for config in configs() {
        let mut comp = config.compressor().unwrap();
        comp.set_input(&abandoned).unwrap();
        let mut block = vec![0u8; 128];
        let status = comp.run(&mut block).unwrap();
        assert!(status.is_output_full(), "{:?}", config.algorithm);

        let encoded = drive(comp.as_mut(), &replacement, 4096).unwrap();
        let mut dec = config.decompressor().unwrap();
        assert_eq!(
            drive(dec.as_mut(), &encoded, 4096).unwrap(),
            replacement,
            "{:?}",
            config.algorithm
        );
    }
}

#[test]
fn reset_returns_to_the_clean_state() {
    let unit = common::mixed_corpus(20_000);
    for config in configs() {
        let mut comp = config.compressor().unwrap();
        comp.set_input(&unit).unwrap();
        let mut block = vec![0u8; 128];
        comp.run(&mut block).unwrap();
        comp.reset();

        // The instance behaves like a fresh one afterwards.
        let encoded = drive(comp.as_mut(), &unit, 1024).unwrap();
        let mut fresh = config.compressor().unwrap();
        assert_eq!(encoded, drive(fresh.as_mut(), &unit, 1024).unwrap(), "{:?}", config.algorithm);
    }
}

#[test]
fn run_status_reports_pending_output() {
    let src = common::pattern(b"status ", 10_000);
    for config in configs() {
        let mut comp = config.compressor().unwrap();
        comp.set_input(&src).unwrap();
        let mut block = vec![0u8; 128];
        let mut statuses = Vec::new();
        loop {
            let status = comp.run(&mut block).unwrap();
            statuses.push(status);
            if !status.is_output_full() {
                break;
            }
        }
        // Every status but the last reports more output pending, and only
        // the final call may come back with spare destination capacity.
        let (last, rest) = statuses.split_last().unwrap();
        assert!(!last.is_output_full());
        assert!(rest.iter().all(|s| s.is_output_full()), "{:?}", config.algorithm);
        assert!(rest.iter().all(|s| s.bytes_written > 0), "{:?}", config.algorithm);
    }
}
