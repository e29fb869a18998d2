//! Error types for download manifest parsing

use thiserror::Error;

/// Errors that abort parsing or building a download manifest
#[derive(Debug, Error)]
pub enum DownloadError {
    /// Magic bytes are not `DL`
    #[error("invalid download magic: expected 'DL', got {0:02X?}")]
    InvalidMagic([u8; 2]),

    /// Versions 1 to 3 are supported
    #[error("unsupported download version: {0}")]
    UnsupportedVersion(u8),

    /// Encoding key length other than 16
    #[error("unsupported encoding key length: {0}")]
    UnsupportedKeyLength(u8),

    /// Builder referenced a tag that was never added
    #[error("unknown tag: {0}")]
    UnknownTag(String),

    /// Builder input that cannot be represented
    #[error("cannot build download manifest: {0}")]
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

/// Result type for download manifest operations
pub type Result<T> = std::result::Result<T, DownloadError>;
