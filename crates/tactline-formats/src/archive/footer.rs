//! Archive index footer (28 bytes with 8-byte hashes)

use super::error::{ArchiveError, Result};

/// Hash length used by every published index
pub const FOOTER_HASH_BYTES: usize = 8;

/// Footer size: toc hash, 12 bytes of fields, footer hash
pub const FOOTER_SIZE: usize = FOOTER_HASH_BYTES + 12 + FOOTER_HASH_BYTES;

/// Trailing footer of a CDN `.index` file
///
/// `element_count` is the only little-endian field in the format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexFooter {
    /// Hash over the table of contents (informational)
    pub toc_hash: [u8; 8],
    /// Format version, always 1
    pub version: u8,
    /// Two reserved zero bytes
    pub reserved: [u8; 2],
    /// Block size in KiB
    pub page_size_kb: u8,
    /// Width of the offset field (4, 5 or 6)
    pub offset_bytes: u8,
    /// Width of the size field (4)
    pub size_bytes: u8,
    /// Stored key length (9..=16)
    pub ekey_length: u8,
    /// Length of the footer and block hashes
    pub footer_hash_bytes: u8,
    /// Number of records
    pub element_count: u32,
    /// First 8 bytes of the MD5 over the footer fields
    pub footer_hash: [u8; 8],
}

impl IndexFooter {
    /// Footer with the standard layout: 4 KiB blocks, 16-byte keys, 4-byte offsets
    pub fn new(element_count: u32) -> Self {
        let mut footer = Self {
            toc_hash: [0; 8],
            version: 1,
            reserved: [0; 2],
            page_size_kb: 4,
            offset_bytes: 4,
            size_bytes: 4,
            ekey_length: 16,
            footer_hash_bytes: FOOTER_HASH_BYTES as u8,
            element_count,
            footer_hash: [0; 8],
        };
        footer.seal();
        footer
    }

    /// Read the footer from the end of an index without validating it
    pub fn read(data: &[u8]) -> Result<Self> {
        if data.len() < FOOTER_SIZE {
            return Err(ArchiveError::Truncated {
                needed: FOOTER_SIZE,
                available: data.len(),
            });
        }
        let raw = &data[data.len() - FOOTER_SIZE..];

        let mut toc_hash = [0u8; 8];
        toc_hash.copy_from_slice(&raw[..8]);
        let mut footer_hash = [0u8; 8];
        footer_hash.copy_from_slice(&raw[20..28]);

        Ok(Self {
            toc_hash,
            version: raw[8],
            reserved: [raw[9], raw[10]],
            page_size_kb: raw[11],
            offset_bytes: raw[12],
            size_bytes: raw[13],
            ekey_length: raw[14],
            footer_hash_bytes: raw[15],
            element_count: u32::from_le_bytes([raw[16], raw[17], raw[18], raw[19]]),
            footer_hash,
        })
    }

    /// MD5 over the fields, zero padded to 20 bytes, truncated to 8
    pub fn compute_hash(&self) -> [u8; 8] {
        let mut fields = [0u8; 20];
        fields[..12].copy_from_slice(&self.field_bytes());
        let digest = md5::compute(fields);
        let mut hash = [0u8; 8];
        hash.copy_from_slice(&digest.0[..8]);
        hash
    }

    /// Recompute and store the footer hash
    pub fn seal(&mut self) {
        self.footer_hash = self.compute_hash();
    }

    /// Check the stored hash against the fields
    pub fn verify(&self) -> Result<()> {
        let expected = self.compute_hash();
        if expected != self.footer_hash {
            return Err(ArchiveError::ChecksumMismatch {
                expected,
                actual: self.footer_hash,
            });
        }
        Ok(())
    }

    /// Reject layouts this implementation does not read
    pub fn validate_format(&self) -> Result<()> {
        if self.version != 1 {
            return Err(ArchiveError::UnsupportedVersion(self.version));
        }
        let invalid = |field: &'static str, value: u8| ArchiveError::InvalidFooter { field, value };
        if self.page_size_kb == 0 {
            return Err(invalid("page_size_kb", self.page_size_kb));
        }
        if !(4..=6).contains(&self.offset_bytes) {
            return Err(invalid("offset_bytes", self.offset_bytes));
        }
        if self.size_bytes != 4 {
            return Err(invalid("size_bytes", self.size_bytes));
        }
        if !(9..=16).contains(&self.ekey_length) {
            return Err(invalid("ekey_length", self.ekey_length));
        }
        if usize::from(self.footer_hash_bytes) != FOOTER_HASH_BYTES {
            return Err(invalid("footer_hash_bytes", self.footer_hash_bytes));
        }
        Ok(())
    }

    /// Size of one record
    pub fn record_size(&self) -> usize {
        usize::from(self.ekey_length) + usize::from(self.size_bytes) + usize::from(self.offset_bytes)
    }

    /// Size of one block
    pub fn block_size(&self) -> usize {
        usize::from(self.page_size_kb) * 1024
    }

    /// Serialize the footer
    pub fn to_bytes(&self) -> [u8; FOOTER_SIZE] {
        let mut out = [0u8; FOOTER_SIZE];
        out[..8].copy_from_slice(&self.toc_hash);
        out[8..20].copy_from_slice(&self.field_bytes());
        out[20..].copy_from_slice(&self.footer_hash);
        out
    }

    fn field_bytes(&self) -> [u8; 12] {
        let count = self.element_count.to_le_bytes();
        [
            self.version,
            self.reserved[0],
            self.reserved[1],
            self.page_size_kb,
            self.offset_bytes,
            self.size_bytes,
            self.ekey_length,
            self.footer_hash_bytes,
            count[0],
            count[1],
            count[2],
            count[3],
        ]
    }
}
