mod builder;
mod entry;
mod error;
mod header;
mod table;

pub use builder::EncodingTableBuilder;
pub use entry::{ContentEntry, EncodedEntry};
pub use error::{EncodingError, Result};
pub use header::{EncodingHeader, HEADER_SIZE, PAGE_SUMMARY_SIZE};
pub use table::{EncodingTable, PageDegradation};

use std::fmt;

/// The two page-indexed sections of an encoding table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageSection {
    /// Content key to encoding keys section
    ContentKeys,
    /// Encoding key to `ESpec` section
    EncodingKeys,
}

impl fmt::Display for PageSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ContentKeys => write!(f, "content key"),
            Self::EncodingKeys => write!(f, "encoding key"),
        }
    }
}
