//! Parsed encoding table with page-indexed lookups

use super::PageSection;
use super::entry::{ContentEntry, EncodedEntry, PageEntry};
use super::error::{EncodingError, Result};
use super::header::{EncodingHeader, HEADER_SIZE, PAGE_SUMMARY_SIZE};
use crate::keys::{ContentKey, EncodingKey};
use binrw::BinRead;
use std::fmt;
use std::io::Cursor;
use tracing::{debug, info, warn};

/// A page excluded from lookups because its MD5 did not match its summary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageDegradation {
    /// Section holding the page
    pub section: PageSection,
    /// Page number within the section
    pub page_index: usize,
}

impl fmt::Display for PageDegradation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "encoding table {} page {} failed its checksum",
            self.section, self.page_index
        )
    }
}

#[derive(Debug, Clone)]
struct Page<T> {
    first_key: [u8; 16],
    entries: Vec<T>,
    intact: bool,
}

/// Encoding table: content key to encoding keys, plus encoding key metadata
///
/// Built once from a decoded buffer and never mutated afterwards, so shared
/// references can be read from any number of threads.
#[derive(Debug, Clone)]
pub struct EncodingTable {
    header: EncodingHeader,
    especs: Vec<String>,
    ckey_pages: Vec<Page<ContentEntry>>,
    ekey_pages: Vec<Page<EncodedEntry>>,
    table_espec: Option<String>,
    degradations: Vec<PageDegradation>,
}

impl EncodingTable {
    /// Parse a decoded (not BLTE-wrapped) encoding table
    pub fn parse(data: &[u8]) -> Result<Self> {
        info!("Parsing encoding table ({} bytes)", data.len());

        if data.len() < HEADER_SIZE {
            return Err(EncodingError::Truncated {
                section: "header",
                needed: HEADER_SIZE,
                available: data.len(),
            });
        }

        let header = EncodingHeader::read(&mut Cursor::new(data)).map_err(|e| match e {
            binrw::Error::AssertFail { .. } => EncodingError::InvalidMagic([data[0], data[1]]),
            other => EncodingError::BinRw(other),
        })?;
        header.validate()?;

        let mut pos = HEADER_SIZE;
        let espec_block = take(data, &mut pos, header.espec_block_size as usize, "espec block")?;
        let especs = split_especs(espec_block);

        let mut degradations = Vec::new();
        let ckey_pages = read_section::<ContentEntry>(
            data,
            &mut pos,
            &header,
            PageSection::ContentKeys,
            &mut degradations,
        )?;
        let ekey_pages = read_section::<EncodedEntry>(
            data,
            &mut pos,
            &header,
            PageSection::EncodingKeys,
            &mut degradations,
        )?;

        let trailing = String::from_utf8_lossy(&data[pos..]);
        let trailing = trailing.trim_end_matches('\0');
        let table_espec = (!trailing.is_empty()).then(|| trailing.to_string());

        let table = Self {
            header,
            especs,
            ckey_pages,
            ekey_pages,
            table_espec,
            degradations,
        };

        info!(
            "Loaded encoding table: {} content keys, {} encoding keys, {} especs, {} degraded pages",
            table.ckey_entry_count(),
            table.ekey_entry_count(),
            table.especs.len(),
            table.degradations.len()
        );

        Ok(table)
    }

    /// Header as read from the buffer
    pub fn header(&self) -> &EncodingHeader {
        &self.header
    }

    /// Encoding keys for a content key, in published order
    ///
    /// Returns `None` when the key is absent or its page was excluded.
    pub fn lookup(&self, ckey: &ContentKey) -> Option<&[EncodingKey]> {
        self.content_entry(ckey)
            .map(|entry| entry.encoding_keys.as_slice())
    }

    /// The canonical encoding key for a content key
    ///
    /// When several encodings exist the first one listed is used; the others
    /// are alternatives for the same content.
    pub fn canonical_ekey(&self, ckey: &ContentKey) -> Option<EncodingKey> {
        self.lookup(ckey).and_then(|keys| keys.first().copied())
    }

    /// Size of the decoded content
    pub fn decoded_size(&self, ckey: &ContentKey) -> Option<u64> {
        self.content_entry(ckey).map(|entry| entry.decoded_size)
    }

    /// Full content key entry
    pub fn content_entry(&self, ckey: &ContentKey) -> Option<&ContentEntry> {
        let page = find_page(&self.ckey_pages, ckey.as_bytes())?;
        if !page.intact {
            debug!("Content key {} falls in an excluded page", ckey);
            return None;
        }
        page.entries
            .binary_search_by(|entry| entry.content_key.cmp(ckey))
            .ok()
            .map(|i| &page.entries[i])
    }

    /// Full encoding key entry
    pub fn encoded_entry(&self, ekey: &EncodingKey) -> Option<&EncodedEntry> {
        let page = find_page(&self.ekey_pages, ekey.as_bytes())?;
        if !page.intact {
            return None;
        }
        page.entries
            .binary_search_by(|entry| entry.encoding_key.cmp(ekey))
            .ok()
            .map(|i| &page.entries[i])
    }

    /// Size of an encoded stream
    pub fn encoded_size(&self, ekey: &EncodingKey) -> Option<u64> {
        self.encoded_entry(ekey).map(|entry| entry.encoded_size)
    }

    /// `ESpec` string describing how an encoded stream was produced
    pub fn espec(&self, ekey: &EncodingKey) -> Option<&str> {
        let entry = self.encoded_entry(ekey)?;
        self.especs
            .get(entry.espec_index as usize)
            .map(String::as_str)
    }

    /// All `ESpec` strings in table order
    pub fn especs(&self) -> &[String] {
        &self.especs
    }

    /// The table's own `ESpec`, stored after the last page
    pub fn table_espec(&self) -> Option<&str> {
        self.table_espec.as_deref()
    }

    /// Content entries of every intact page, in key order
    pub fn content_entries(&self) -> impl Iterator<Item = &ContentEntry> {
        self.ckey_pages
            .iter()
            .filter(|page| page.intact)
            .flat_map(|page| page.entries.iter())
    }

    /// Pages excluded from lookups
    pub fn degradations(&self) -> &[PageDegradation] {
        &self.degradations
    }

    /// True if any page was excluded
    pub fn is_degraded(&self) -> bool {
        !self.degradations.is_empty()
    }

    /// True if a content key would live in an excluded page
    ///
    /// Separates a key that is genuinely absent from one hidden by corruption.
    pub fn covers_degraded_page(&self, ckey: &ContentKey) -> bool {
        find_page(&self.ckey_pages, ckey.as_bytes()).is_some_and(|page| !page.intact)
    }

    /// Number of content keys in intact pages
    pub fn ckey_entry_count(&self) -> usize {
        self.ckey_pages.iter().map(|p| p.entries.len()).sum()
    }

    /// Number of encoding keys in intact pages
    pub fn ekey_entry_count(&self) -> usize {
        self.ekey_pages.iter().map(|p| p.entries.len()).sum()
    }
}

fn find_page<'a, T>(pages: &'a [Page<T>], key: &[u8; 16]) -> Option<&'a Page<T>> {
    let idx = pages.partition_point(|page| page.first_key <= *key);
    idx.checked_sub(1).map(|i| &pages[i])
}

fn take<'a>(data: &'a [u8], pos: &mut usize, len: usize, section: &'static str) -> Result<&'a [u8]> {
    let available = data.len().saturating_sub(*pos);
    if len > available {
        return Err(EncodingError::Truncated {
            section,
            needed: len,
            available,
        });
    }
    let slice = &data[*pos..*pos + len];
    *pos += len;
    Ok(slice)
}

fn split_especs(block: &[u8]) -> Vec<String> {
    block
        .split(|&b| b == 0)
        .filter(|s| !s.is_empty())
        .map(|s| String::from_utf8_lossy(s).into_owned())
        .collect()
}

fn read_section<T: PageEntry>(
    data: &[u8],
    pos: &mut usize,
    header: &EncodingHeader,
    section: PageSection,
    degradations: &mut Vec<PageDegradation>,
) -> Result<Vec<Page<T>>> {
    let (index_label, page_label) = match section {
        PageSection::ContentKeys => ("content key page index", "content key pages"),
        PageSection::EncodingKeys => ("encoding key page index", "encoding key pages"),
    };
    let count = header.page_count(section);
    let page_size = header.page_size(section);

    let index = take(data, pos, count.saturating_mul(PAGE_SUMMARY_SIZE), index_label)?;
    let summaries: Vec<([u8; 16], [u8; 16])> = index
        .chunks_exact(PAGE_SUMMARY_SIZE)
        .map(|chunk| {
            let mut first_key = [0u8; 16];
            let mut checksum = [0u8; 16];
            first_key.copy_from_slice(&chunk[..16]);
            checksum.copy_from_slice(&chunk[16..]);
            (first_key, checksum)
        })
        .collect();

    if let Some(i) = summaries.windows(2).position(|w| w[0].0 > w[1].0) {
        return Err(EncodingError::UnsortedPageIndex {
            section,
            page: i + 1,
        });
    }

    let mut pages = Vec::with_capacity(count);
    for (page_index, (first_key, checksum)) in summaries.into_iter().enumerate() {
        let body = take(data, pos, page_size, page_label)?;

        if md5::compute(body).0 != checksum {
            warn!(
                "Encoding table {} page {} failed checksum, excluding it from lookups",
                section, page_index
            );
            degradations.push(PageDegradation {
                section,
                page_index,
            });
            pages.push(Page {
                first_key,
                entries: Vec::new(),
                intact: false,
            });
            continue;
        }

        let entries = read_page::<T>(body, section, page_index)?;
        pages.push(Page {
            first_key,
            entries,
            intact: true,
        });
    }

    Ok(pages)
}

fn read_page<T: PageEntry>(body: &[u8], section: PageSection, page: usize) -> Result<Vec<T>> {
    let mut cursor = Cursor::new(body);
    let mut entries: Vec<T> = Vec::new();

    loop {
        let rest = &body[cursor.position() as usize..];
        if rest.len() < T::MIN_SIZE || T::is_padding(rest) {
            break;
        }
        let entry = T::read_options(&mut cursor, binrw::Endian::Big, ()).map_err(|e| {
            EncodingError::MalformedPage {
                section,
                page,
                reason: e.to_string(),
            }
        })?;
        entries.push(entry);
    }

    if !entries.is_sorted_by_key(|entry| *entry.key_bytes()) {
        debug!("Sorting unordered {} page {}", section, page);
        entries.sort_by_key(|entry| *entry.key_bytes());
    }

    Ok(entries)
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::encoding::EncodingTableBuilder;
    use pretty_assertions::assert_eq;

    fn ckey(n: u8) -> ContentKey {
        let mut bytes = [0u8; 16];
        bytes[0] = n;
        bytes[15] = 0xC0;
        ContentKey::from_bytes(bytes)
    }

    fn ekey(n: u8) -> EncodingKey {
        let mut bytes = [0u8; 16];
        bytes[0] = n;
        bytes[15] = 0xE0;
        EncodingKey::from_bytes(bytes)
    }

    #[test]
    fn test_lookup_and_sizes() {
        let mut builder = EncodingTableBuilder::new();
        builder
            .add_content(ckey(1), 1000, [ekey(1)])
            .add_content(ckey(2), 2000, [ekey(2), ekey(3)])
            .add_encoded(ekey(1), "z", 400)
            .add_encoded(ekey(2), "n", 2000)
            .add_encoded(ekey(3), "z", 900)
            .table_espec("b:{22=n,*=z}");
        let table = EncodingTable::parse(&builder.build().unwrap()).unwrap();

        assert_eq!(table.lookup(&ckey(1)), Some(&[ekey(1)][..]));
        assert_eq!(table.lookup(&ckey(2)), Some(&[ekey(2), ekey(3)][..]));
        assert_eq!(table.canonical_ekey(&ckey(2)), Some(ekey(2)));
        assert_eq!(table.decoded_size(&ckey(2)), Some(2000));
        assert_eq!(table.encoded_size(&ekey(3)), Some(900));
        assert_eq!(table.espec(&ekey(2)), Some("n"));
        assert_eq!(table.especs(), &["z".to_string(), "n".to_string()]);
        assert_eq!(table.table_espec(), Some("b:{22=n,*=z}"));
        assert_eq!(table.ckey_entry_count(), 2);
        assert_eq!(table.ekey_entry_count(), 3);
        assert!(!table.is_degraded());
    }

    #[test]
    fn test_missing_keys() {
        let mut builder = EncodingTableBuilder::new();
        builder.add_content(ckey(5), 10, [ekey(5)]);
        let table = EncodingTable::parse(&builder.build().unwrap()).unwrap();

        // Before the first page and inside it
        assert_eq!(table.lookup(&ckey(1)), None);
        assert_eq!(table.lookup(&ckey(6)), None);
        assert_eq!(table.decoded_size(&ckey(6)), None);
        assert_eq!(table.encoded_size(&ekey(5)), None);
        assert!(!table.covers_degraded_page(&ckey(6)));
    }

    #[test]
    fn test_corrupt_page_is_excluded() {
        let mut builder = EncodingTableBuilder::new().with_page_size_kb(1);
        for n in 0..80u8 {
            builder.add_content(ckey(n), u64::from(n), [ekey(n)]);
        }
        let mut data = builder.build().unwrap();
        let clean = EncodingTable::parse(&data).unwrap();
        assert!(clean.header().ckey_page_count >= 3);

        // Flip one byte inside the second content key page
        let header = clean.header();
        let pages_start = HEADER_SIZE
            + header.espec_block_size as usize
            + header.ckey_page_count as usize * PAGE_SUMMARY_SIZE;
        data[pages_start + 1024 + 10] ^= 0xFF;

        let table = EncodingTable::parse(&data).unwrap();
        assert_eq!(
            table.degradations(),
            &[PageDegradation {
                section: PageSection::ContentKeys,
                page_index: 1,
            }]
        );

        let entries_per_page = 1024 / (1 + 5 + 16 + 16);
        let first = ckey(0);
        let hidden = ckey(entries_per_page as u8);
        let after = ckey(79);

        assert_eq!(table.lookup(&first), Some(&[ekey(0)][..]));
        assert_eq!(table.lookup(&hidden), None);
        assert!(table.covers_degraded_page(&hidden));
        assert_eq!(table.lookup(&after), Some(&[ekey(79)][..]));
        assert!(!table.covers_degraded_page(&after));
    }

    #[test]
    fn test_bad_magic_is_fatal() {
        let mut data = EncodingTableBuilder::new().build().unwrap();
        data[0] = b'X';
        assert!(matches!(
            EncodingTable::parse(&data),
            Err(EncodingError::InvalidMagic([b'X', b'N']))
        ));
    }

    #[test]
    fn test_truncated_is_fatal() {
        let mut builder = EncodingTableBuilder::new();
        builder.add_content(ckey(1), 1, [ekey(1)]);
        let data = builder.build().unwrap();

        assert!(matches!(
            EncodingTable::parse(&data[..10]),
            Err(EncodingError::Truncated { section: "header", .. })
        ));
        assert!(matches!(
            EncodingTable::parse(&data[..data.len() - 100]),
            Err(EncodingError::Truncated { .. })
        ));
    }

    #[test]
    fn test_empty_table() {
        let data = EncodingTableBuilder::new().build().unwrap();
        let table = EncodingTable::parse(&data).unwrap();
        assert_eq!(table.ckey_entry_count(), 0);
        assert_eq!(table.lookup(&ckey(1)), None);
        assert_eq!(table.content_entries().count(), 0);
    }
}
