//! Builder producing valid CDN archive indices

use super::error::{ArchiveError, Result};
use super::footer::{FOOTER_HASH_BYTES, IndexFooter};
use crate::keys::EncodingKey;
use crate::util::write_be_uint;

/// Builds a CDN `.index` file from `(key, offset, length)` records
///
/// Records are sorted on build. Adding the same key twice keeps both
/// records, in insertion order.
#[derive(Debug, Clone)]
pub struct ArchiveIndexBuilder {
    key_length: u8,
    offset_bytes: u8,
    records: Vec<(EncodingKey, u64, u32)>,
}

impl ArchiveIndexBuilder {
    /// Builder for 16-byte keys and 4-byte offsets
    pub fn new() -> Self {
        Self {
            key_length: 16,
            offset_bytes: 4,
            records: Vec::new(),
        }
    }

    /// Width of the offset field (4, 5 or 6)
    pub fn with_offset_bytes(mut self, offset_bytes: u8) -> Self {
        self.offset_bytes = offset_bytes;
        self
    }

    /// Number of key bytes stored per record (9..=16)
    pub fn with_key_length(mut self, key_length: u8) -> Self {
        self.key_length = key_length;
        self
    }

    /// Record an object stored at `offset` inside the archive
    pub fn add_entry(&mut self, ekey: EncodingKey, offset: u64, length: u32) -> &mut Self {
        self.records.push((ekey, offset, length));
        self
    }

    /// Number of records added so far
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True if no records were added
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Serialize blocks, table of contents and footer
    pub fn build(&self) -> Result<Vec<u8>> {
        let mut footer = IndexFooter::new(self.records.len() as u32);
        footer.offset_bytes = self.offset_bytes;
        footer.ekey_length = self.key_length;
        footer.validate_format()?;

        let key_len = usize::from(self.key_length);
        let offset_bytes = usize::from(self.offset_bytes);
        let offset_limit = 1u64 << (8 * offset_bytes);
        if let Some((ekey, offset, _)) = self.records.iter().find(|(_, offset, _)| *offset >= offset_limit) {
            return Err(ArchiveError::InvalidInput(format!(
                "offset {offset} of {ekey} does not fit {offset_bytes} bytes"
            )));
        }

        let mut records = self.records.clone();
        records.sort_by(|a, b| a.0.as_bytes()[..key_len].cmp(&b.0.as_bytes()[..key_len]));

        let block_size = footer.block_size();
        let per_block = block_size / footer.record_size();

        let mut blocks = Vec::new();
        let mut last_keys = Vec::new();
        let mut block_hashes = Vec::new();
        for chunk in records.chunks(per_block) {
            let mut block = Vec::with_capacity(block_size);
            for (ekey, offset, length) in chunk {
                block.extend_from_slice(&ekey.as_bytes()[..key_len]);
                write_be_uint(&mut block, u64::from(*length), 4);
                write_be_uint(&mut block, *offset, offset_bytes);
            }
            block.resize(block_size, 0);

            if let Some((ekey, _, _)) = chunk.last() {
                last_keys.extend_from_slice(&ekey.as_bytes()[..key_len]);
            }
            block_hashes.extend_from_slice(&md5::compute(&block).0[..FOOTER_HASH_BYTES]);
            blocks.extend_from_slice(&block);
        }

        let mut toc = last_keys;
        toc.extend_from_slice(&block_hashes);
        footer.toc_hash.copy_from_slice(&md5::compute(&toc).0[..FOOTER_HASH_BYTES]);
        footer.seal();

        let mut out = blocks;
        out.extend_from_slice(&toc);
        out.extend_from_slice(&footer.to_bytes());
        Ok(out)
    }
}

impl Default for ArchiveIndexBuilder {
    fn default() -> Self {
        Self::new()
    }
}
