//! Error types for archive index parsing

use thiserror::Error;

/// Errors raised while parsing or building an archive index
///
/// Any of these invalidates the whole index for that archive; the archive
/// set it belongs to keeps working without it.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// The buffer is too short for the declared layout
    #[error("truncated archive index: need {needed} bytes, {available} available")]
    Truncated {
        /// Bytes required
        needed: usize,
        /// Bytes present
        available: usize,
    },

    /// Footer hash does not match the footer fields
    #[error("archive index footer checksum mismatch: expected {expected:02x?}, got {actual:02x?}")]
    ChecksumMismatch {
        /// Hash computed over the footer
        expected: [u8; 8],
        /// Hash stored in the footer
        actual: [u8; 8],
    },

    /// Footer version other than 1
    #[error("unsupported archive index version: {0}")]
    UnsupportedVersion(u8),

    /// Footer field outside the supported range
    #[error("invalid archive index footer: {field} = {value}")]
    InvalidFooter {
        /// Field name
        field: &'static str,
        /// Value found
        value: u8,
    },

    /// Records are not ordered by key
    #[error("archive index records out of order at record {0}")]
    UnsortedEntries(usize),

    /// Builder input that cannot be represented
    #[error("cannot build archive index: {0}")]
    InvalidInput(String),
}

impl ArchiveError {
    /// True for checksum failures, false for structural problems
    pub fn is_integrity(&self) -> bool {
        matches!(self, Self::ChecksumMismatch { .. })
    }
}

/// Result type for archive index operations
pub type Result<T> = std::result::Result<T, ArchiveError>;
