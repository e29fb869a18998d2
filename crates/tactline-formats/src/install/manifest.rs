use super::entry::InstallEntry;
use super::error::{InstallError, Result};
use super::header::InstallHeader;
use crate::manifest::{Tag, TaggedManifest, min_tags_size};
use binrw::{BinRead, BinWrite};
use std::io::Cursor;
use tracing::info;

/// Empty path terminator, content key and size
const MIN_ENTRY_SIZE: usize = 1 + 16 + 4;

/// Parsed install manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallManifest {
    header: InstallHeader,
    tags: Vec<Tag>,
    entries: Vec<InstallEntry>,
}

impl InstallManifest {
    /// Parse a decoded install manifest
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(data);
        let header = InstallHeader::read(&mut cursor).map_err(|e| match e {
            binrw::Error::AssertFail { .. } => InstallError::InvalidMagic([
                data.first().copied().unwrap_or(0),
                data.get(1).copied().unwrap_or(0),
            ]),
            other => InstallError::BinRw(other),
        })?;
        header.validate()?;

        let entry_count = header.entry_count as usize;
        let available = data.len().saturating_sub(cursor.position() as usize);
        let needed = min_tags_size(header.tag_count, entry_count)
            .saturating_add(entry_count.saturating_mul(MIN_ENTRY_SIZE));
        if needed > available {
            return Err(InstallError::Truncated {
                section: "install entries",
                needed,
                available,
            });
        }

        let mut tags = Vec::with_capacity(usize::from(header.tag_count));
        for _ in 0..header.tag_count {
            tags.push(Tag::read_options(
                &mut cursor,
                binrw::Endian::Big,
                entry_count,
            )?);
        }

        let mut entries = Vec::with_capacity(entry_count);
        for _ in 0..entry_count {
            entries.push(InstallEntry::read_be(&mut cursor)?);
        }

        info!(
            "Loaded install manifest: {} entries, {} tags",
            entries.len(),
            tags.len()
        );

        Ok(Self {
            header,
            tags,
            entries,
        })
    }

    pub(super) fn from_parts(tags: Vec<Tag>, entries: Vec<InstallEntry>) -> Self {
        Self {
            header: InstallHeader::new(tags.len() as u16, entries.len() as u32),
            tags,
            entries,
        }
    }

    /// Serialize the manifest
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Cursor::new(Vec::new());
        self.header.write(&mut out)?;
        for tag in &self.tags {
            tag.write_options(&mut out, binrw::Endian::Big, self.entries.len())?;
        }
        for entry in &self.entries {
            entry.write_be(&mut out)?;
        }
        Ok(out.into_inner())
    }

    /// Header as read
    pub fn header(&self) -> &InstallHeader {
        &self.header
    }

    /// Entry by install path, ignoring ASCII case and separator style
    pub fn find(&self, path: &str) -> Option<&InstallEntry> {
        let wanted = path.replace('/', "\\");
        self.entries
            .iter()
            .find(|entry| entry.path.eq_ignore_ascii_case(&wanted))
    }

    /// Sum of decoded sizes of the entries carrying every tag in `tags`
    pub fn selected_size(&self, tags: &[&Tag]) -> u64 {
        self.entries_for_tags(tags)
            .map(|entry| u64::from(entry.size))
            .sum()
    }
}

impl TaggedManifest for InstallManifest {
    type Entry = InstallEntry;

    fn tags(&self) -> &[Tag] {
        &self.tags
    }

    fn entries(&self) -> &[InstallEntry] {
        &self.entries
    }
}
