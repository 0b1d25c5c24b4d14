//! File-level compress/decompress operations built on the streaming
//! contract.
//!
//! Files are processed as a sequence of independent input units, each pumped
//! through the engine with bounded destination blocks, so memory use stays
//! proportional to the unit size rather than the file size. On the
//! decompression side a whole file is one unit: every codec's framing is
//! self-delimiting (and the bzip2-style decompressor handles concatenated
//! streams), so the unit boundaries chosen at compression time do not need
//! to be recorded.

use std::fs;
use std::io::Write as _;
use std::path::Path;

use anyhow::{bail, Context, Result};
use xxhash_rust::xxh64::xxh64;

use crate::bzip2::{Bzip2Compressor, Bzip2Decompressor, Bzip2Level, Bzip2Parameters};
use crate::lzo::{LzoCompressor, LzoDecompressor, LzoParameters};
use crate::rle::{RleCompressor, RleDecompressor, RleParameters};
use crate::stream::{drive, StreamCodec};

/// Input bytes handed to the engine per unit.
pub const IO_UNIT_SIZE: usize = 4 << 20;

/// Destination block capacity used when pumping an engine.
pub const IO_BLOCK_SIZE: usize = 256 << 10;

// ─────────────────────────────────────────────────────────────────────────────
// Codec selection
// ─────────────────────────────────────────────────────────────────────────────

/// Which codec family to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Algorithm {
    Rle,
    Lzo,
    Bzip2,
}

impl Algorithm {
    /// File extension appended by compression and recognized by
    /// decompression.
    pub fn extension(self) -> &'static str {
        match self {
            Algorithm::Rle => "rle",
            Algorithm::Lzo => "lzo",
            Algorithm::Bzip2 => "bsq",
        }
    }

    /// Infer the algorithm from a compressed file's extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "rle" => Some(Algorithm::Rle),
            "lzo" => Some(Algorithm::Lzo),
            "bsq" => Some(Algorithm::Bzip2),
            _ => None,
        }
    }
}

/// Everything needed to construct a matching compressor/decompressor pair.
#[derive(Debug, Clone, Copy)]
pub struct CodecConfig {
    pub algorithm: Algorithm,
    pub level: Bzip2Level,
    pub block_header: bool,
    pub pre_head_bytes: usize,
    pub post_head_bytes: usize,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::Lzo,
            level: Bzip2Level::Default,
            block_header: true,
            pre_head_bytes: 0,
            post_head_bytes: 0,
        }
    }
}

impl CodecConfig {
    fn lzo_params(&self) -> LzoParameters {
        LzoParameters {
            pre_head_bytes: self.pre_head_bytes,
            post_head_bytes: self.post_head_bytes,
        }
    }

    /// Construct the compressor this configuration describes.
    pub fn compressor(&self) -> Result<Box<dyn StreamCodec>, crate::Error> {
        Ok(match self.algorithm {
            Algorithm::Rle => {
                Box::new(RleCompressor::new(RleParameters { block_header: self.block_header }))
            }
            Algorithm::Lzo => Box::new(LzoCompressor::new(self.lzo_params())),
            Algorithm::Bzip2 => {
                Box::new(Bzip2Compressor::new(Bzip2Parameters { level: self.level })?)
            }
        })
    }

    /// Construct the matching decompressor.
    pub fn decompressor(&self) -> Result<Box<dyn StreamCodec>, crate::Error> {
        Ok(match self.algorithm {
            Algorithm::Rle => {
                Box::new(RleDecompressor::new(RleParameters { block_header: self.block_header }))
            }
            Algorithm::Lzo => Box::new(LzoDecompressor::new(self.lzo_params())),
            Algorithm::Bzip2 => Box::new(Bzip2Decompressor::new()),
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Buffer-level helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Compress `data` unit-wise into one contiguous compressed byte stream.
pub fn compress_buffer(config: &CodecConfig, data: &[u8]) -> Result<Vec<u8>> {
    let mut codec = config.compressor()?;
    let mut out = Vec::new();
    for unit in data.chunks(IO_UNIT_SIZE) {
        out.extend(drive(codec.as_mut(), unit, IO_BLOCK_SIZE)?);
    }
    Ok(out)
}

/// Decompress one contiguous compressed byte stream.
pub fn decompress_buffer(config: &CodecConfig, data: &[u8]) -> Result<Vec<u8>> {
    let mut codec = config.decompressor()?;
    Ok(drive(codec.as_mut(), data, IO_BLOCK_SIZE)?)
}

// ─────────────────────────────────────────────────────────────────────────────
// File operations
// ─────────────────────────────────────────────────────────────────────────────

/// Byte counts of one completed file operation.
#[derive(Debug, Clone, Copy)]
pub struct FileSummary {
    pub bytes_in: u64,
    pub bytes_out: u64,
}

/// Compress `input` into `output`.
///
/// With `verify` set, the compressed bytes are decompressed in memory and
/// the xxh64 of the result is checked against the source before the output
/// file is considered good.
pub fn compress_file(
    config: &CodecConfig,
    input: &Path,
    output: &Path,
    verify: bool,
) -> Result<FileSummary> {
    let data = fs::read(input).with_context(|| format!("reading {}", input.display()))?;
    let compressed = compress_buffer(config, &data)
        .with_context(|| format!("compressing {}", input.display()))?;

    if verify {
        let roundtrip = decompress_buffer(config, &compressed)
            .with_context(|| format!("verifying {}", input.display()))?;
        if xxh64(&roundtrip, 0) != xxh64(&data, 0) {
            bail!("verification failed for {}: roundtrip checksum mismatch", input.display());
        }
    }

    let mut file = fs::File::create(output)
        .with_context(|| format!("creating {}", output.display()))?;
    file.write_all(&compressed)
        .with_context(|| format!("writing {}", output.display()))?;
    Ok(FileSummary { bytes_in: data.len() as u64, bytes_out: compressed.len() as u64 })
}

/// Decompress `input` into `output`.
pub fn decompress_file(config: &CodecConfig, input: &Path, output: &Path) -> Result<FileSummary> {
    let data = fs::read(input).with_context(|| format!("reading {}", input.display()))?;
    let decompressed = decompress_buffer(config, &data)
        .with_context(|| format!("decompressing {}", input.display()))?;
    let mut file = fs::File::create(output)
        .with_context(|| format!("creating {}", output.display()))?;
    file.write_all(&decompressed)
        .with_context(|| format!("writing {}", output.display()))?;
    Ok(FileSummary { bytes_in: data.len() as u64, bytes_out: decompressed.len() as u64 })
}
