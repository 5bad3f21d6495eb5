//! Error types for DWG bit stream handling.

use thiserror::Error;

/// Errors raised while locating or reading DWG bit streams.
#[derive(Debug, Error)]
pub enum DwgError {
    /// The first 16 bytes of the buffer are not the expected signature.
    #[error("bad signature: expected {expected:02X?}, found {actual:02X?}")]
    BadSignature {
        expected: [u8; 16],
        actual: Vec<u8>,
    },

    /// Header sizes describe offsets that are out of order or outside the buffer.
    #[error("corrupt header: {0}")]
    CorruptHeader(String),

    /// The backward scan for the string stream produced an invalid span.
    #[error("corrupt string stream: {0}")]
    CorruptStringRegion(String),

    /// A read or seek crossed the bounds of a stream.
    #[error("read out of bounds at bit {position} (stream ends at bit {end})")]
    OutOfBounds { position: u64, end: u64 },

    /// Malformed value inside a stream.
    #[error("parse error: {0}")]
    Parse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, DwgError>;
