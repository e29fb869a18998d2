//! Each archive is a blob of encoded objects stored back to back. Its
//! `.index` lists the encoding key, offset and length of every object in
//! sorted 4 KiB blocks, followed by a table of contents and a footer whose
//! MD5 guards the layout fields.
//!
//! ```text
//! [block 0][block 1]...[block N-1][toc keys][toc hashes][footer]
//! ```

mod builder;
mod error;
mod footer;
mod index;

pub use builder::ArchiveIndexBuilder;
pub use error::{ArchiveError, Result};
pub use footer::{FOOTER_SIZE, IndexFooter};
pub use index::{ArchiveIndex, IndexRecord};

use std::fmt;

/// Location of an object inside one archive blob
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArchiveSpan {
    /// Byte offset inside the archive
    pub offset: u64,
    /// Length of the encoded object
    pub length: u32,
}

/// Content-addressed name of an archive blob
///
/// Archive ids from CDN configs are lower-case hex MD5 strings. The
/// position of an id in the config's archive list is its ordinal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArchiveId(String);

impl ArchiveId {
    /// Wrap any archive name
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Parse a 32 character hex name, normalizing it to lower case
    pub fn parse_hex(id: &str) -> std::result::Result<Self, hex::FromHexError> {
        let mut bytes = [0u8; 16];
        hex::decode_to_slice(id, &mut bytes)?;
        Ok(Self(hex::encode(bytes)))
    }

    /// The name as a string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArchiveId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ArchiveId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl AsRef<str> for ArchiveId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
