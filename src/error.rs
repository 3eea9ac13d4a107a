//! Error types for the AFP combine library

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the AFP combine library
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Byte at a field boundary is not the 0x5A carriage control
    #[error("not a structured field at offset {0}: missing 0x5A carriage control")]
    BadCarriageControl(u64),

    /// Stream ended in the middle of a structured field
    #[error("truncated structured field at offset {0}")]
    Truncated(u64),

    /// Structured field payload exceeds the 16-bit length field
    #[error("structured field too long: {0} bytes")]
    FieldTooLong(usize),

    /// Fewer resource body bytes could be copied than the scan recorded
    #[error("couldn't copy resource from {}", .0.display())]
    ResourceCopy(PathBuf),

    /// No free name in the hash windows or the numeric fallback range
    #[error("unable to find a free resource name for hash {0}")]
    NamingExhausted(String),

    /// File not found
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// Unrecognized content hash algorithm name
    #[error("unknown digest algorithm: {0}")]
    UnknownDigest(String),

    /// General error
    #[error("{0}")]
    General(String),
}
