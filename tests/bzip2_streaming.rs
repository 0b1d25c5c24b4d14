//! End-to-end tests for the bzip2-style codec: flush protocol across block
//! boundaries, streams split over several input units, concatenated streams,
//! and the fault mapping.

mod common;

use streampress::{
    drive, Bzip2Compressor, Bzip2Decompressor, Bzip2Level, Bzip2Parameters, Error, StreamCodec,
};

fn compressor(level: Bzip2Level) -> Bzip2Compressor {
    Bzip2Compressor::new(Bzip2Parameters { level }).unwrap()
}

#[test]
fn roundtrip_every_level() {
    let src = common::mixed_corpus(8_000);
    for level in 1..=9 {
        let mut comp = compressor(Bzip2Level::Precise(level));
        let encoded = drive(&mut comp, &src, 4096).unwrap();
        let mut dec = Bzip2Decompressor::new();
        assert_eq!(drive(&mut dec, &encoded, 4096).unwrap(), src, "level {level}");
    }
}

#[test]
fn invalid_level_is_rejected_at_construction() {
    let err = Bzip2Compressor::new(Bzip2Parameters { level: Bzip2Level::Precise(10) }).unwrap_err();
    assert_eq!(err, Error::InvalidLevel(10));
}

#[test]
fn empty_unit_roundtrips() {
    let mut comp = compressor(Bzip2Level::Default);
    let encoded = drive(&mut comp, b"", 256).unwrap();
    // Even an empty unit is a well-formed stream (magic + end mark).
    assert!(!encoded.is_empty());
    let mut dec = Bzip2Decompressor::new();
    assert!(drive(&mut dec, &encoded, 256).unwrap().is_empty());
}

#[test]
fn unit_larger_than_block_threshold_splits_into_blocks() {
    // Level 1 keeps the block threshold small, so 300 KiB needs several
    // intermediate flushes before the finishing block.
    let src = common::mixed_corpus(300 * 1024);
    let mut comp = compressor(Bzip2Level::Precise(1));
    let encoded = drive(&mut comp, &src, 4096).unwrap();
    let mut dec = Bzip2Decompressor::new();
    assert_eq!(drive(&mut dec, &encoded, 8192).unwrap(), src);
}

#[test]
fn compressed_stream_split_across_input_units() {
    // Decompress a single stream fed in arbitrary small set_input units; the
    // engine must retain partial records across unit boundaries.
    let src = common::mixed_corpus(200 * 1024);
    let mut comp = compressor(Bzip2Level::Precise(1));
    let encoded = drive(&mut comp, &src, 1 << 20).unwrap();

    let mut dec = Bzip2Decompressor::new();
    let mut decoded = Vec::new();
    let mut block = vec![0u8; 8192];
    for unit in encoded.chunks(1000) {
        dec.set_input(unit).unwrap();
        loop {
            let status = dec.run(&mut block).unwrap();
            decoded.extend_from_slice(&block[..status.bytes_written]);
            if !status.is_output_full() {
                break;
            }
        }
    }
    dec.finish().unwrap();
    assert_eq!(decoded, src);
}

#[test]
fn concatenated_streams_decode_back_to_back() {
    let first = common::pattern(b"one ", 4_000);
    let second = common::pseudo_random_bytes(4_000, 11);
    let mut comp = compressor(Bzip2Level::Default);
    let mut joined = drive(&mut comp, &first, 4096).unwrap();
    joined.extend(drive(&mut comp, &second, 4096).unwrap());

    let mut expected = first;
    expected.extend_from_slice(&second);
    let mut dec = Bzip2Decompressor::new();
    assert_eq!(drive(&mut dec, &joined, 512).unwrap(), expected);
}

#[test]
fn garbage_magic_is_bad_magic_and_poisons() {
    let mut dec = Bzip2Decompressor::new();
    dec.set_input(b"definitely not a compressed stream").unwrap();
    let mut dst = [0u8; 256];
    assert_eq!(dec.run(&mut dst).unwrap_err(), Error::BadMagic);
    assert_eq!(dec.set_input(b"more").unwrap_err(), Error::InstancePoisoned);
}

#[test]
fn corrupted_block_body_is_corrupted_data() {
    let src = common::pattern(b"stable bytes ", 2_000);
    let mut comp = compressor(Bzip2Level::Default);
    let mut encoded = drive(&mut comp, &src, 4096).unwrap();
    // The first block record follows the 4-byte stream header; inflate its
    // declared uncompressed size so the payload cannot satisfy it.
    let declared = u32::from_le_bytes(encoded[5..9].try_into().unwrap());
    encoded[5..9].copy_from_slice(&(declared + 1).to_le_bytes());

    let mut dec = Bzip2Decompressor::new();
    dec.set_input(&encoded).unwrap();
    let mut dst = vec![0u8; 64 * 1024];
    assert_eq!(dec.run(&mut dst).unwrap_err(), Error::CorruptedData);
}

#[test]
fn truncated_stream_is_a_format_error_not_a_short_read() {
    // A cut-off stream must never drive to a successful partial result:
    // `drive` holds the complete source, so the starved decompressor has to
    // answer a format error rather than flushing short.
    let src = common::mixed_corpus(12_500);
    let mut comp = compressor(Bzip2Level::Default);
    let full = drive(&mut comp, &src, 4096).unwrap();

    // Cut inside the block record.
    let mut cut = full.clone();
    cut.truncate(full.len() - 40);
    let mut dec = Bzip2Decompressor::new();
    let err = drive(&mut dec, &cut, 4096).unwrap_err();
    assert!(matches!(err, Error::TruncatedBlock { .. }));
    assert_eq!(dec.set_input(b"").unwrap_err(), Error::InstancePoisoned);

    // Cut only the trailer: every block decodes but the stream never ends.
    let mut no_trailer = full.clone();
    no_trailer.truncate(full.len() - 1);
    let mut dec = Bzip2Decompressor::new();
    let err = drive(&mut dec, &no_trailer, 4096).unwrap_err();
    assert!(matches!(err, Error::TruncatedHeader { .. }));
}

#[test]
fn one_byte_destination_blocks_still_drain() {
    let src = common::pattern(b"slow drain ", 600);
    let mut comp = compressor(Bzip2Level::Default);
    let encoded = drive(&mut comp, &src, 4096).unwrap();
    let mut dec = Bzip2Decompressor::new();
    assert_eq!(drive(&mut dec, &encoded, 1).unwrap(), src);
}
