//! Error types shared by every streaming compression engine.
//!
//! All engines report failures through [`Error`]. Returning an error
//! finalizes the engine: its streaming state is reset so no partially framed
//! output can leak, and the instance is poisoned — every later `set_input`
//! or `run` call answers [`Error::InstancePoisoned`] until the caller
//! constructs a fresh engine.

use core::fmt;

// ─────────────────────────────────────────────────────────────────────────────
// ErrorKind
// ─────────────────────────────────────────────────────────────────────────────

/// Coarse classification of [`Error`] values.
///
/// The four classes every engine distinguishes: caller mistakes, malformed
/// compressed data, resource exhaustion, and unexpected embedded-engine
/// statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The caller violated a precondition (buffer too small, bad parameter,
    /// reuse of a poisoned instance).
    Usage,
    /// The compressed source is truncated, mis-framed, or corrupted.
    Format,
    /// An internal allocation (spill buffer, engine scratch) failed.
    Resource,
    /// The embedded codec engine reported a status the wrapper cannot
    /// classify.
    Internal,
}

// ─────────────────────────────────────────────────────────────────────────────
// Error
// ─────────────────────────────────────────────────────────────────────────────

/// Errors produced by the streaming compressors and decompressors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A single chunk is larger than the 32-bit size fields of its header
    /// can describe.
    InputTooLarge { size: usize },
    /// The destination block cannot hold even the minimal framing header
    /// plus one code unit, so no forward progress is possible.
    OutputTooSmall { needed: usize, available: usize },
    /// Compression level outside the valid set.
    InvalidLevel(u32),
    /// The instance reported an error earlier and will not produce further
    /// output; discard it and construct a new engine.
    InstancePoisoned,
    /// The source ended before the fixed chunk header.
    TruncatedHeader { needed: usize, available: usize },
    /// The source ended before the end of a declared compressed chunk.
    TruncatedBlock { declared: usize, available: usize },
    /// The stream does not begin with the expected magic bytes.
    BadMagic,
    /// A compressed payload failed to decode to its declared size.
    CorruptedData,
    /// Allocation of a spill buffer or engine scratch state failed.
    AllocationFailed,
    /// The embedded engine reported an unexpected status code.
    EngineFault(&'static str),
}

impl Error {
    /// Classify this error into one of the four [`ErrorKind`] classes.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InputTooLarge { .. }
            | Error::OutputTooSmall { .. }
            | Error::InvalidLevel(_)
            | Error::InstancePoisoned => ErrorKind::Usage,
            Error::TruncatedHeader { .. }
            | Error::TruncatedBlock { .. }
            | Error::BadMagic
            | Error::CorruptedData => ErrorKind::Format,
            Error::AllocationFailed => ErrorKind::Resource,
            Error::EngineFault(_) => ErrorKind::Internal,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InputTooLarge { size } => {
                write!(f, "input chunk of {size} bytes exceeds the 32-bit header size fields")
            }
            Error::OutputTooSmall { needed, available } => {
                write!(f, "output block too small: need at least {needed} bytes, got {available}")
            }
            Error::InvalidLevel(level) => {
                write!(f, "invalid compression level {level} (valid range is 0..=9)")
            }
            Error::InstancePoisoned => {
                f.write_str("engine instance is poisoned by an earlier error")
            }
            Error::TruncatedHeader { needed, available } => {
                write!(f, "source shorter than chunk header: need {needed} bytes, got {available}")
            }
            Error::TruncatedBlock { declared, available } => {
                write!(f, "source shorter than declared chunk: declared {declared} bytes, got {available}")
            }
            Error::BadMagic => f.write_str("stream magic bytes mismatch"),
            Error::CorruptedData => f.write_str("compressed payload is corrupted"),
            Error::AllocationFailed => f.write_str("internal buffer allocation failed"),
            Error::EngineFault(code) => write!(f, "embedded engine fault: {code}"),
        }
    }
}

impl std::error::Error for Error {}
