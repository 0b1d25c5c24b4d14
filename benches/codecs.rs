//! Throughput benchmarks for the three codec families over compressible and
//! incompressible corpora.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use streampress::drive;
use streampress::io::{Algorithm, CodecConfig};

const CORPUS_SIZE: usize = 1 << 20;
const BLOCK_SIZE: usize = 256 << 10;

fn text_corpus() -> Vec<u8> {
    b"the quick brown fox jumps over the lazy dog \n"
        .iter()
        .copied()
        .cycle()
        .take(CORPUS_SIZE)
        .collect()
}

fn noise_corpus() -> Vec<u8> {
    let mut state = 0xDEAD_BEEF_u32;
    (0..CORPUS_SIZE)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            state as u8
        })
        .collect()
}

fn config(algorithm: Algorithm) -> CodecConfig {
    CodecConfig { algorithm, ..CodecConfig::default() }
}

fn bench_compress(c: &mut Criterion) {
    let mut group = c.benchmark_group("compress");
    group.throughput(Throughput::Bytes(CORPUS_SIZE as u64));
    for (name, corpus) in [("text", text_corpus()), ("noise", noise_corpus())] {
        for algorithm in [Algorithm::Rle, Algorithm::Lzo, Algorithm::Bzip2] {
            let config = config(algorithm);
            group.bench_with_input(
                BenchmarkId::new(format!("{algorithm:?}"), name),
                &corpus,
                |b, corpus| {
                    let mut codec = config.compressor().unwrap();
                    b.iter(|| drive(codec.as_mut(), corpus, BLOCK_SIZE).unwrap());
                },
            );
        }
    }
    group.finish();
}

fn bench_decompress(c: &mut Criterion) {
    let mut group = c.benchmark_group("decompress");
    group.throughput(Throughput::Bytes(CORPUS_SIZE as u64));
    for (name, corpus) in [("text", text_corpus()), ("noise", noise_corpus())] {
        for algorithm in [Algorithm::Rle, Algorithm::Lzo, Algorithm::Bzip2] {
            let config = config(algorithm);
            let mut comp = config.compressor().unwrap();
            let encoded = drive(comp.as_mut(), &corpus, BLOCK_SIZE).unwrap();
            group.bench_with_input(
                BenchmarkId::new(format!("{algorithm:?}"), name),
                &encoded,
                |b, encoded| {
                    let mut codec = config.decompressor().unwrap();
                    b.iter(|| drive(codec.as_mut(), encoded, BLOCK_SIZE).unwrap());
                },
            );
        }
    }
    group.finish();
}

criterion_group!(benches, bench_compress, bench_decompress);
criterion_main!(benches);
