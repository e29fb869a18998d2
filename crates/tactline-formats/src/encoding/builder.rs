//! Builder producing valid encoding tables

use super::entry::{ContentEntry, EncodedEntry, PageEntry};
use super::error::{EncodingError, Result};
use super::header::EncodingHeader;
use crate::keys::{ContentKey, EncodingKey};
use crate::util::U40_MAX;
use binrw::BinWrite;
use std::collections::BTreeMap;
use std::io::{Cursor, Write};

/// Builds an encoding table from content and encoding key records
///
/// Keys are sorted and split into pages on write, so records can be added
/// in any order. Adding a key twice replaces the earlier record.
#[derive(Debug, Clone)]
pub struct EncodingTableBuilder {
    page_size_kb: u16,
    especs: Vec<String>,
    content: BTreeMap<ContentKey, ContentEntry>,
    encoded: BTreeMap<EncodingKey, EncodedEntry>,
    table_espec: Option<String>,
}

impl EncodingTableBuilder {
    /// Empty builder with 4 KiB pages
    pub fn new() -> Self {
        Self {
            page_size_kb: 4,
            especs: Vec::new(),
            content: BTreeMap::new(),
            encoded: BTreeMap::new(),
            table_espec: None,
        }
    }

    /// Use a different page size for both sections
    pub fn with_page_size_kb(mut self, page_size_kb: u16) -> Self {
        self.page_size_kb = page_size_kb;
        self
    }

    /// Map a content key to its encoding keys, first one canonical
    pub fn add_content(
        &mut self,
        content_key: ContentKey,
        decoded_size: u64,
        encoding_keys: impl IntoIterator<Item = EncodingKey>,
    ) -> &mut Self {
        self.content.insert(
            content_key,
            ContentEntry {
                content_key,
                decoded_size,
                encoding_keys: encoding_keys.into_iter().collect(),
            },
        );
        self
    }

    /// Describe an encoded stream
    pub fn add_encoded(
        &mut self,
        encoding_key: EncodingKey,
        espec: &str,
        encoded_size: u64,
    ) -> &mut Self {
        let espec_index = match self.especs.iter().position(|s| s == espec) {
            Some(i) => i,
            None => {
                self.especs.push(espec.to_string());
                self.especs.len() - 1
            }
        };
        self.encoded.insert(
            encoding_key,
            EncodedEntry {
                encoding_key,
                espec_index: espec_index as u32,
                encoded_size,
            },
        );
        self
    }

    /// `ESpec` of the table itself, written after the last page
    pub fn table_espec(&mut self, espec: impl Into<String>) -> &mut Self {
        self.table_espec = Some(espec.into());
        self
    }

    /// Serialize the table
    pub fn build(&self) -> Result<Vec<u8>> {
        for entry in self.content.values() {
            if entry.encoding_keys.is_empty() || entry.encoding_keys.len() > usize::from(u8::MAX) {
                return Err(EncodingError::InvalidInput(format!(
                    "content key {} has {} encoding keys, expected 1..=255",
                    entry.content_key,
                    entry.encoding_keys.len()
                )));
            }
            if entry.decoded_size > U40_MAX {
                return Err(EncodingError::InvalidInput(format!(
                    "content key {} size {} exceeds 40 bits",
                    entry.content_key, entry.decoded_size
                )));
            }
        }
        if let Some(entry) = self.encoded.values().find(|e| e.encoding_key.is_zero()) {
            return Err(EncodingError::InvalidInput(format!(
                "encoding key {} is reserved for padding",
                entry.encoding_key
            )));
        }

        let page_size = usize::from(self.page_size_kb) * 1024;
        let ckey_pages = paginate(self.content.values(), page_size)?;
        let ekey_pages = paginate(self.encoded.values(), page_size)?;

        let mut espec_block = Vec::new();
        for espec in &self.especs {
            espec_block.extend_from_slice(espec.as_bytes());
            espec_block.push(0);
        }

        let header = EncodingHeader {
            ckey_page_size_kb: self.page_size_kb,
            ekey_page_size_kb: self.page_size_kb,
            ckey_page_count: ckey_pages.len() as u32,
            ekey_page_count: ekey_pages.len() as u32,
            espec_block_size: espec_block.len() as u32,
            ..EncodingHeader::new()
        };

        let mut out = Cursor::new(Vec::new());
        header.write(&mut out)?;
        out.write_all(&espec_block)?;
        for pages in [&ckey_pages, &ekey_pages] {
            for (first_key, page) in pages {
                out.write_all(first_key)?;
                out.write_all(&md5::compute(page).0)?;
            }
            for (_, page) in pages {
                out.write_all(page)?;
            }
        }
        if let Some(espec) = &self.table_espec {
            out.write_all(espec.as_bytes())?;
        }

        Ok(out.into_inner())
    }
}

impl Default for EncodingTableBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn paginate<'a, T: PageEntry + 'a>(
    entries: impl Iterator<Item = &'a T>,
    page_size: usize,
) -> Result<Vec<([u8; 16], Vec<u8>)>> {
    let mut pages = Vec::new();
    let mut current = Vec::with_capacity(page_size);
    let mut first_key: Option<[u8; 16]> = None;

    for entry in entries {
        let mut encoded = Cursor::new(Vec::new());
        entry.write_be(&mut encoded)?;
        let encoded = encoded.into_inner();

        if encoded.len() > page_size {
            return Err(EncodingError::InvalidInput(format!(
                "entry of {} bytes does not fit a {} byte page",
                encoded.len(),
                page_size
            )));
        }

        if current.len() + encoded.len() > page_size {
            if let Some(key) = first_key.take() {
                current.resize(page_size, 0);
                pages.push((key, std::mem::take(&mut current)));
            }
        }

        first_key.get_or_insert(*entry.key_bytes());
        current.extend_from_slice(&encoded);
    }

    if let Some(key) = first_key {
        current.resize(page_size, 0);
        pages.push((key, current));
    }

    Ok(pages)
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::encoding::EncodingTable;

    #[test]
    fn test_rejects_unrepresentable_entries() {
        let mut builder = EncodingTableBuilder::new();
        builder.add_content(ContentKey::from_bytes([1; 16]), 10, []);
        assert!(matches!(builder.build(), Err(EncodingError::InvalidInput(_))));

        let mut builder = EncodingTableBuilder::new();
        builder.add_content(
            ContentKey::from_bytes([1; 16]),
            U40_MAX + 1,
            [EncodingKey::from_bytes([2; 16])],
        );
        assert!(builder.build().is_err());
    }

    #[test]
    fn test_pages_are_split_and_padded() {
        let mut builder = EncodingTableBuilder::new().with_page_size_kb(1);
        for n in 0..=255u8 {
            builder.add_encoded(EncodingKey::from_bytes([n.max(1); 16]), "z", u64::from(n));
        }
        let table = EncodingTable::parse(&builder.build().unwrap()).unwrap();

        // 255 distinct keys at 25 bytes each, 40 per page
        assert_eq!(table.ekey_entry_count(), 255);
        assert_eq!(table.header().ekey_page_count, 7);
        assert_eq!(table.header().ckey_page_count, 0);
    }
}
