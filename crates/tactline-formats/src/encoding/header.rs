use super::PageSection;
use super::error::{EncodingError, Result};
use binrw::{BinRead, BinWrite};

/// Size of the fixed encoding table header
pub const HEADER_SIZE: usize = 22;

/// Size of one page summary (first key + MD5)
pub const PAGE_SUMMARY_SIZE: usize = 32;

/// Encoding table header (22 bytes, big-endian)
#[derive(Debug, Clone, PartialEq, Eq, BinRead, BinWrite)]
#[br(big)]
#[bw(big)]
pub struct EncodingHeader {
    /// Magic bytes: `EN`
    #[br(assert(magic == *b"EN", "Invalid encoding magic"))]
    pub magic: [u8; 2],
    /// Format version, always 1
    pub version: u8,
    /// Content key size in bytes
    pub ckey_size: u8,
    /// Encoding key size in bytes
    pub ekey_size: u8,
    /// Content key page size in KiB
    pub ckey_page_size_kb: u16,
    /// Encoding key page size in KiB
    pub ekey_page_size_kb: u16,
    /// Number of content key pages
    pub ckey_page_count: u32,
    /// Number of encoding key pages
    pub ekey_page_count: u32,
    /// Must be zero
    pub flags: u8,
    /// Size of the `ESpec` string block that follows the header
    pub espec_block_size: u32,
}

impl EncodingHeader {
    /// Header for an empty table with 4 KiB pages
    pub fn new() -> Self {
        Self {
            magic: *b"EN",
            version: 1,
            ckey_size: 16,
            ekey_size: 16,
            ckey_page_size_kb: 4,
            ekey_page_size_kb: 4,
            ckey_page_count: 0,
            ekey_page_count: 0,
            flags: 0,
            espec_block_size: 0,
        }
    }

    /// Reject headers this implementation cannot read
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(EncodingError::UnsupportedVersion(self.version));
        }
        if self.flags != 0 {
            return Err(EncodingError::InvalidFlags(self.flags));
        }
        if self.ckey_size != 16 {
            return Err(EncodingError::UnsupportedKeySize {
                field: "ckey_size",
                value: self.ckey_size,
            });
        }
        if self.ekey_size != 16 {
            return Err(EncodingError::UnsupportedKeySize {
                field: "ekey_size",
                value: self.ekey_size,
            });
        }
        if self.ckey_page_size_kb == 0 {
            return Err(EncodingError::InvalidPageSize(PageSection::ContentKeys));
        }
        if self.ekey_page_size_kb == 0 {
            return Err(EncodingError::InvalidPageSize(PageSection::EncodingKeys));
        }
        Ok(())
    }

    /// Page size of a section in bytes
    pub fn page_size(&self, section: PageSection) -> usize {
        let kb = match section {
            PageSection::ContentKeys => self.ckey_page_size_kb,
            PageSection::EncodingKeys => self.ekey_page_size_kb,
        };
        kb as usize * 1024
    }

    /// Page count of a section
    pub fn page_count(&self, section: PageSection) -> usize {
        match section {
            PageSection::ContentKeys => self.ckey_page_count as usize,
            PageSection::EncodingKeys => self.ekey_page_count as usize,
        }
    }
}

impl Default for EncodingHeader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_header_layout() {
        let mut header = EncodingHeader::new();
        header.ckey_page_count = 3;
        header.espec_block_size = 0x0102;

        let mut cursor = Cursor::new(Vec::new());
        header.write(&mut cursor).unwrap();
        let bytes = cursor.into_inner();

        assert_eq!(bytes.len(), HEADER_SIZE);
        assert_eq!(&bytes[0..2], b"EN");
        assert_eq!(&bytes[9..13], &[0, 0, 0, 3]);
        assert_eq!(&bytes[18..22], &[0, 0, 1, 2]);

        let parsed = EncodingHeader::read(&mut Cursor::new(&bytes)).unwrap();
        assert_eq!(parsed, header);
    }

    #[test]
    fn test_validate_rejects_unsupported_fields() {
        let mut header = EncodingHeader::new();
        header.version = 2;
        assert!(matches!(
            header.validate(),
            Err(EncodingError::UnsupportedVersion(2))
        ));

        let mut header = EncodingHeader::new();
        header.flags = 1;
        assert!(matches!(header.validate(), Err(EncodingError::InvalidFlags(1))));

        let mut header = EncodingHeader::new();
        header.ekey_size = 9;
        assert!(matches!(
            header.validate(),
            Err(EncodingError::UnsupportedKeySize { field: "ekey_size", value: 9 })
        ));

        let mut header = EncodingHeader::new();
        header.ckey_page_size_kb = 0;
        assert!(header.validate().is_err());
    }
}
