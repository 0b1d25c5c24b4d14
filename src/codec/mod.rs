//! Low-level one-shot codec primitives.
//!
//! These are the bit-pushing cores the streaming wrappers delegate to. They
//! know nothing about chunk headers, spill buffers or the streaming
//! state machine; they encode or decode one contiguous byte range and report
//! how much they consumed and produced.

pub(crate) mod lz;
pub(crate) mod rle;

/// Decode-side failure of a primitive: the code stream is malformed
/// (dangling pair byte, out-of-window match offset, output overrun).
/// The streaming wrappers map this onto [`crate::Error::CorruptedData`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CorruptStream;
