use super::ArchiveSpan;
use super::error::{ArchiveError, Result};
use super::footer::{FOOTER_SIZE, IndexFooter};
use crate::keys::EncodingKey;
use crate::util::read_be_uint;
use tracing::{debug, warn};

/// One record of an archive index
///
/// Keys shorter than 16 bytes are stored zero padded; lookups compare the
/// same prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexRecord {
    key: [u8; 16],
    /// Offset inside the archive blob
    pub offset: u64,
    /// Length of the encoded object
    pub length: u32,
}

impl IndexRecord {
    /// Stored key, zero padded to 16 bytes
    pub fn key(&self) -> &[u8; 16] {
        &self.key
    }

    /// Location of the object
    pub fn span(&self) -> ArchiveSpan {
        ArchiveSpan {
            offset: self.offset,
            length: self.length,
        }
    }
}

/// Parsed CDN archive index
#[derive(Debug, Clone)]
pub struct ArchiveIndex {
    footer: IndexFooter,
    records: Vec<IndexRecord>,
    duplicates: usize,
}

impl ArchiveIndex {
    /// Parse an index, verifying its footer checksum first
    pub fn parse(data: &[u8]) -> Result<Self> {
        let footer = IndexFooter::read(data)?;
        footer.verify()?;
        footer.validate_format()?;

        let key_len = usize::from(footer.ekey_length);
        let offset_bytes = usize::from(footer.offset_bytes);
        let size_bytes = usize::from(footer.size_bytes);
        let record_size = footer.record_size();
        let block_size = footer.block_size();
        let records_per_block = block_size / record_size;
        let element_count = footer.element_count as usize;
        let block_count = element_count.div_ceil(records_per_block);

        let toc_size = block_count.saturating_mul(key_len + usize::from(footer.footer_hash_bytes));
        let body_len = data.len() - FOOTER_SIZE;
        if toc_size > body_len {
            return Err(ArchiveError::Truncated {
                needed: toc_size + FOOTER_SIZE,
                available: data.len(),
            });
        }
        let blocks = &data[..body_len - toc_size];
        let last_block_start = block_count.saturating_sub(1).saturating_mul(block_size);
        if block_count > 0 && last_block_start >= blocks.len() {
            return Err(ArchiveError::Truncated {
                needed: last_block_start
                    .saturating_add(record_size + toc_size + FOOTER_SIZE),
                available: data.len(),
            });
        }

        let mut records = Vec::with_capacity(element_count.min(blocks.len() / record_size));
        for block_index in 0..block_count {
            let start = block_index * block_size;
            if start >= blocks.len() {
                return Err(ArchiveError::Truncated {
                    needed: start + record_size + toc_size + FOOTER_SIZE,
                    available: data.len(),
                });
            }
            let block = &blocks[start..blocks.len().min(start + block_size)];

            for raw in block.chunks_exact(record_size) {
                if records.len() == element_count || raw[..key_len].iter().all(|&b| b == 0) {
                    break;
                }
                let mut key = [0u8; 16];
                key[..key_len].copy_from_slice(&raw[..key_len]);
                let length = read_be_uint(&raw[key_len..key_len + size_bytes]) as u32;
                let offset = read_be_uint(&raw[key_len + size_bytes..key_len + size_bytes + offset_bytes]);
                records.push(IndexRecord {
                    key,
                    offset,
                    length,
                });
            }
        }

        if records.len() != element_count {
            warn!(
                "Archive index declares {} records but holds {}",
                element_count,
                records.len()
            );
        }

        let (records, duplicates) = dedup_sorted(records)?;
        if duplicates > 0 {
            warn!(
                "Archive index holds {} duplicate keys, keeping first occurrences",
                duplicates
            );
        }

        debug!(
            "Parsed archive index: {} records in {} blocks, {}-byte keys",
            records.len(),
            block_count,
            key_len
        );

        Ok(Self {
            footer,
            records,
            duplicates,
        })
    }

    /// Location of an encoded object in this archive
    pub fn lookup(&self, ekey: &EncodingKey) -> Option<ArchiveSpan> {
        let padded = self.padded_key(ekey);
        self.records
            .binary_search_by(|record| record.key.cmp(&padded))
            .ok()
            .map(|i| self.records[i].span())
    }

    /// True if the archive holds the key
    pub fn contains(&self, ekey: &EncodingKey) -> bool {
        self.lookup(ekey).is_some()
    }

    /// Records in key order, duplicates removed
    pub fn records(&self) -> &[IndexRecord] {
        &self.records
    }

    /// Footer as read
    pub fn footer(&self) -> &IndexFooter {
        &self.footer
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True if the index holds no records
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records dropped because an earlier record had the same key
    pub fn duplicate_count(&self) -> usize {
        self.duplicates
    }

    fn padded_key(&self, ekey: &EncodingKey) -> [u8; 16] {
        let key_len = usize::from(self.footer.ekey_length);
        let mut padded = [0u8; 16];
        padded[..key_len].copy_from_slice(&ekey.as_bytes()[..key_len]);
        padded
    }
}

fn dedup_sorted(records: Vec<IndexRecord>) -> Result<(Vec<IndexRecord>, usize)> {
    let mut kept: Vec<IndexRecord> = Vec::with_capacity(records.len());
    let mut duplicates = 0;

    for (position, record) in records.into_iter().enumerate() {
        match kept.last().map(|last| last.key) {
            Some(last) if record.key < last => {
                return Err(ArchiveError::UnsortedEntries(position));
            }
            Some(last) if record.key == last => duplicates += 1,
            _ => kept.push(record),
        }
    }

    Ok((kept, duplicates))
}
