//! streampress — streaming multi-codec compression.
//!
//! Three compressor/decompressor families share one streaming state-machine
//! contract ([`StreamCodec`]): byte run-length encoding ([`rle`]), an
//! LZO-style LZ77 codec ([`lzo`]), and a bzip2-style block engine
//! ([`bzip2`]). Each family defines its own binary framing; the contract,
//! the spill-buffer continuation rules and the error taxonomy are common.

pub mod bzip2;
pub mod cli;
pub(crate) mod codec;
pub mod error;
pub mod io;
pub mod lzo;
pub mod rle;
pub mod stream;

// ── Version constants ────────────────────────────────────────────────────────
pub const STREAMPRESS_VERSION_MAJOR: u32 = 0;
pub const STREAMPRESS_VERSION_MINOR: u32 = 1;
pub const STREAMPRESS_VERSION_RELEASE: u32 = 0;
pub const STREAMPRESS_VERSION_STRING: &str = "0.1.0";

/// Returns the runtime version string.
pub fn version_string() -> &'static str {
    STREAMPRESS_VERSION_STRING
}

// ── Top-level re-exports ─────────────────────────────────────────────────────
pub use bzip2::{Bzip2Compressor, Bzip2Decompressor, Bzip2Level, Bzip2Parameters};
pub use error::{Error, ErrorKind};
pub use lzo::{LzoCompressor, LzoDecompressor, LzoParameters, LZO_HEADER_SIZE};
pub use rle::{RleCompressor, RleDecompressor, RleParameters, RLE_HEADER_SIZE};
pub use stream::{drive, RunStatus, StreamCodec};
