//! Error types for encoding table parsing

use super::PageSection;
use thiserror::Error;

/// Errors that abort construction of an encoding table
///
/// Page checksum failures are not errors: they are recorded as
/// [`PageDegradation`](super::PageDegradation)s and the page is excluded.
#[derive(Debug, Error)]
pub enum EncodingError {
    /// Magic bytes are not `EN`
    #[error("invalid magic: expected 'EN', got {0:02X?}")]
    InvalidMagic([u8; 2]),

    /// Only version 1 is published
    #[error("unsupported version: {0}")]
    UnsupportedVersion(u8),

    /// The flags byte must be zero
    #[error("invalid flags: expected 0, got {0}")]
    InvalidFlags(u8),

    /// Key size other than 16 bytes
    #[error("unsupported {field}: expected 16, got {value}")]
    UnsupportedKeySize {
        /// Header field carrying the size
        field: &'static str,
        /// Value found in the header
        value: u8,
    },

    /// Page size of zero
    #[error("invalid {0} page size: 0 KiB")]
    InvalidPageSize(PageSection),

    /// The buffer ends before a section is complete
    #[error("truncated {section}: need {needed} bytes, {available} available")]
    Truncated {
        /// Section being read
        section: &'static str,
        /// Bytes required
        needed: usize,
        /// Bytes left in the buffer
        available: usize,
    },

    /// Page summaries are not ordered by first key
    #[error("{section} page index is not sorted at page {page}")]
    UnsortedPageIndex {
        /// Section holding the index
        section: PageSection,
        /// First out-of-order page
        page: usize,
    },

    /// A page with a valid checksum holds an entry that does not fit
    #[error("malformed {section} page {page}: {reason}")]
    MalformedPage {
        /// Section holding the page
        section: PageSection,
        /// Page number within the section
        page: usize,
        /// What was wrong
        reason: String,
    },

    /// Builder input that cannot be represented on the wire
    #[error("cannot build encoding table: {0}")]
    InvalidInput(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Binary parsing error
    #[error("binary parsing error: {0}")]
    BinRw(#[from] binrw::Error),
}

/// Result type for encoding table operations
pub type Result<T> = std::result::Result<T, EncodingError>;
