//! Error types for install manifest parsing

use thiserror::Error;

/// Errors that abort parsing or building an install manifest
#[derive(Error, Debug)]
pub enum InstallError {
    /// Magic bytes are not `IN`
    #[error("invalid install magic: expected 'IN', got {0:02X?}")]
    InvalidMagic([u8; 2]),

    /// Only version 1 is published
    #[error("unsupported install version: {0}")]
    UnsupportedVersion(u8),

    /// Content key length other than 16
    #[error("unsupported content key length: {0}")]
    UnsupportedKeyLength(u8),

    /// Builder was given a tag twice
    #[error("duplicate tag: {0}")]
    DuplicateTag(String),

    /// Builder referenced a tag that was never added
    #[error("unknown tag: {0}")]
    UnknownTag(String),

    /// Builder input that cannot be represented
    #[error("cannot build install manifest: {0}")]
    InvalidInput(String),

    /// Header counts need more bytes than the buffer holds
    #[error("truncated {section}: header counts need {needed} bytes, {available} available")]
    Truncated {
        /// Section being sized
        section: &'static str,
        /// Smallest byte count the header counts allow
        needed: usize,
        /// Bytes left after the header
        available: usize,
    },

    /// Truncated or malformed binary data
    #[error("binary parsing error: {0}")]
    BinRw(#[from] binrw::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for install manifest operations
pub type Result<T> = std::result::Result<T, InstallError>;
