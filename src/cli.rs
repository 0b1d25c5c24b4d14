//! Command-line interface for the `streampress` binary.
//!
//! `streampress compress` / `streampress decompress` operate on one or more
//! files; directories are expanded with walkdir when `--recursive` is given,
//! and independent files are processed in parallel with rayon — each worker
//! drives its own engine instance, which is safe because instances share no
//! mutable state.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use rayon::prelude::*;
use walkdir::WalkDir;

use crate::bzip2::Bzip2Level;
use crate::io::{compress_file, decompress_file, Algorithm, CodecConfig};

// ─────────────────────────────────────────────────────────────────────────────
// Argument types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Parser)]
#[command(name = "streampress", version, about = "Streaming multi-codec file compressor")]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Compress files.
    Compress(JobArgs),
    /// Decompress files previously produced by `compress`.
    Decompress(JobArgs),
}

#[derive(Debug, Args)]
struct JobArgs {
    /// Input files (or directories with --recursive).
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Codec family. On decompression, defaults to the algorithm implied by
    /// each input file's extension.
    #[arg(short, long, value_enum)]
    algorithm: Option<Algorithm>,

    /// Block-size level for the bzip2-style codec (0..=9; 0 means smallest).
    #[arg(short, long)]
    level: Option<u32>,

    /// Omit the per-chunk size header (RLE only).
    #[arg(long)]
    no_block_header: bool,

    /// Padding bytes reserved before each chunk header (LZO only).
    #[arg(long, default_value_t = 0)]
    pre_head: usize,

    /// Padding bytes reserved after each chunk header (LZO only).
    #[arg(long, default_value_t = 0)]
    post_head: usize,

    /// Output file (single input only; default derives from the input name).
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Decompress the result in memory and compare checksums before
    /// committing the output file (compression only).
    #[arg(long)]
    verify: bool,

    /// Recurse into directories named on the command line.
    #[arg(short, long)]
    recursive: bool,
}

impl JobArgs {
    fn config(&self, algorithm: Algorithm) -> CodecConfig {
        CodecConfig {
            algorithm,
            level: match self.level {
                None => Bzip2Level::Default,
                Some(level) => Bzip2Level::Precise(level),
            },
            block_header: !self.no_block_header,
            pre_head_bytes: self.pre_head,
            post_head_bytes: self.post_head,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// File-list expansion
// ─────────────────────────────────────────────────────────────────────────────

/// Expand the command-line inputs into a flat list of regular files.
fn expand_inputs(inputs: &[PathBuf], recursive: bool) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            if !recursive {
                bail!("{} is a directory (use --recursive)", input.display());
            }
            for entry in WalkDir::new(input) {
                let entry = entry.with_context(|| format!("walking {}", input.display()))?;
                if entry.file_type().is_file() {
                    files.push(entry.into_path());
                }
            }
        } else {
            files.push(input.clone());
        }
    }
    Ok(files)
}

/// `foo.txt` → `foo.txt.<ext>`.
fn compressed_name(input: &Path, algorithm: Algorithm) -> PathBuf {
    let mut name = input.as_os_str().to_os_string();
    name.push(".");
    name.push(algorithm.extension());
    PathBuf::from(name)
}

/// `foo.txt.<ext>` → `foo.txt`.
fn decompressed_name(input: &Path) -> Result<PathBuf> {
    let stem = input
        .file_stem()
        .ok_or_else(|| anyhow!("cannot derive output name for {}", input.display()))?;
    if Algorithm::from_path(input).is_none() {
        bail!(
            "{} has no recognized compressed extension; use --output",
            input.display()
        );
    }
    Ok(input.with_file_name(stem))
}

// ─────────────────────────────────────────────────────────────────────────────
// Dispatch
// ─────────────────────────────────────────────────────────────────────────────

fn run_compress(args: &JobArgs) -> Result<()> {
    let files = expand_inputs(&args.inputs, args.recursive)?;
    if args.output.is_some() && files.len() > 1 {
        bail!("--output requires exactly one input file");
    }
    let algorithm = args.algorithm.unwrap_or(Algorithm::Lzo);
    let config = args.config(algorithm);

    files.par_iter().try_for_each(|input| -> Result<()> {
        let output = match &args.output {
            Some(path) => path.clone(),
            None => compressed_name(input, algorithm),
        };
        let summary = compress_file(&config, input, &output, args.verify)?;
        eprintln!(
            "{} -> {} ({} -> {} bytes)",
            input.display(),
            output.display(),
            summary.bytes_in,
            summary.bytes_out
        );
        Ok(())
    })
}

fn run_decompress(args: &JobArgs) -> Result<()> {
    let files = expand_inputs(&args.inputs, args.recursive)?;
    if args.output.is_some() && files.len() > 1 {
        bail!("--output requires exactly one input file");
    }

    files.par_iter().try_for_each(|input| -> Result<()> {
        let algorithm = args
            .algorithm
            .or_else(|| Algorithm::from_path(input))
            .ok_or_else(|| {
                anyhow!("cannot infer algorithm for {}; pass --algorithm", input.display())
            })?;
        let config = args.config(algorithm);
        let output = match &args.output {
            Some(path) => path.clone(),
            None => decompressed_name(input)?,
        };
        let summary = decompress_file(&config, input, &output)?;
        eprintln!(
            "{} -> {} ({} -> {} bytes)",
            input.display(),
            output.display(),
            summary.bytes_in,
            summary.bytes_out
        );
        Ok(())
    })
}

/// Parse `std::env::args()` and execute the selected operation.
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    match &cli.command {
        Command::Compress(args) => run_compress(args),
        Command::Decompress(args) => run_decompress(args),
    }
}
