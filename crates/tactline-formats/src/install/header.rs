use super::error::{InstallError, Result};
use binrw::{BinRead, BinWrite};

/// Install manifest header (10 bytes, big-endian)
#[derive(Debug, Clone, PartialEq, Eq, BinRead, BinWrite)]
#[br(big)]
#[bw(big)]
pub struct InstallHeader {
    /// Magic bytes: `IN`
    #[br(assert(magic == *b"IN", "Invalid install magic"))]
    pub magic: [u8; 2],
    /// Format version, always 1
    pub version: u8,
    /// Content key length
    pub ckey_length: u8,
    /// Number of tags
    pub tag_count: u16,
    /// Number of entries
    pub entry_count: u32,
}

impl InstallHeader {
    /// Version 1 header with 16-byte keys
    pub fn new(tag_count: u16, entry_count: u32) -> Self {
        Self {
            magic: *b"IN",
            version: 1,
            ckey_length: 16,
            tag_count,
            entry_count,
        }
    }

    /// Reject headers this implementation cannot read
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(InstallError::UnsupportedVersion(self.version));
        }
        if self.ckey_length != 16 {
            return Err(InstallError::UnsupportedKeyLength(self.ckey_length));
        }
        Ok(())
    }
}
