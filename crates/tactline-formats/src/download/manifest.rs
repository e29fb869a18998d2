use super::entry::DownloadEntry;
use super::error::{DownloadError, Result};
use super::header::DownloadHeader;
use crate::keys::EncodingKey;
use crate::manifest::{Tag, TaggedManifest, min_tags_size};
use binrw::{BinRead, BinWrite};
use std::io::Cursor;
use tracing::info;

/// Parsed download manifest
///
/// Entries precede tags on the wire in every version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadManifest {
    header: DownloadHeader,
    entries: Vec<DownloadEntry>,
    tags: Vec<Tag>,
}

impl DownloadManifest {
    /// Parse a decoded download manifest
    pub fn parse(data: &[u8]) -> Result<Self> {
        match data.get(..2) {
            Some(b"DL") => {}
            Some(magic) => return Err(DownloadError::InvalidMagic([magic[0], magic[1]])),
            None => {
                return Err(DownloadError::InvalidMagic([
                    data.first().copied().unwrap_or(0),
                    0,
                ]));
            }
        }

        let mut cursor = Cursor::new(data);
        let header = DownloadHeader::read_be(&mut cursor)?;
        header.validate()?;

        let entry_count = header.entry_count as usize;
        let available = data.len().saturating_sub(cursor.position() as usize);
        let needed = entry_count
            .saturating_mul(header.entry_size())
            .saturating_add(min_tags_size(header.tag_count, entry_count));
        if needed > available {
            return Err(DownloadError::Truncated {
                section: "download entries",
                needed,
                available,
            });
        }

        let mut entries = Vec::with_capacity(entry_count);
        for _ in 0..entry_count {
            entries.push(DownloadEntry::read_options(
                &mut cursor,
                binrw::Endian::Big,
                &header,
            )?);
        }

        let mut tags = Vec::with_capacity(usize::from(header.tag_count));
        for _ in 0..header.tag_count {
            tags.push(Tag::read_options(
                &mut cursor,
                binrw::Endian::Big,
                entry_count,
            )?);
        }

        info!(
            "Loaded download manifest v{}: {} entries, {} tags",
            header.version,
            entries.len(),
            tags.len()
        );

        Ok(Self {
            header,
            entries,
            tags,
        })
    }

    pub(super) fn from_parts(
        header: DownloadHeader,
        entries: Vec<DownloadEntry>,
        tags: Vec<Tag>,
    ) -> Self {
        Self {
            header,
            entries,
            tags,
        }
    }

    /// Serialize the manifest
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Cursor::new(Vec::new());
        self.header.write_be(&mut out)?;
        for entry in &self.entries {
            entry.write_options(&mut out, binrw::Endian::Big, &self.header)?;
        }
        for tag in &self.tags {
            tag.write_options(&mut out, binrw::Endian::Big, self.entries.len())?;
        }
        Ok(out.into_inner())
    }

    /// Header as read
    pub fn header(&self) -> &DownloadHeader {
        &self.header
    }

    /// Entry for an encoding key
    pub fn find(&self, ekey: &EncodingKey) -> Option<&DownloadEntry> {
        self.entries.iter().find(|entry| entry.encoding_key == *ekey)
    }

    /// Entries ordered by effective priority, manifest order within a priority
    pub fn entries_by_priority(&self) -> Vec<&DownloadEntry> {
        let mut ordered: Vec<&DownloadEntry> = self.entries.iter().collect();
        ordered.sort_by_key(|entry| entry.effective_priority(&self.header));
        ordered
    }

    /// Total encoded size of all entries
    pub fn total_size(&self) -> u64 {
        self.entries.iter().map(|entry| entry.size).sum()
    }
}

impl TaggedManifest for DownloadManifest {
    type Entry = DownloadEntry;

    fn tags(&self) -> &[Tag] {
        &self.tags
    }

    fn entries(&self) -> &[DownloadEntry] {
        &self.entries
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::download::DownloadManifestBuilder;
    use crate::manifest::TagType;
    use pretty_assertions::assert_eq;

    fn ekey(n: u8) -> EncodingKey {
        EncodingKey::from_bytes([n; 16])
    }

    #[test]
    fn test_v1_entries_then_tags() {
        let mut builder = DownloadManifestBuilder::new(1);
        builder
            .add_tag("Windows", TagType::Platform)
            .add_entry(DownloadEntry::new(ekey(1), 10, 0), &["Windows"])
            .add_entry(DownloadEntry::new(ekey(2), 20, 1), &[]);
        let bytes = builder.build().unwrap();

        // Header (11) then the first entry key
        assert_eq!(&bytes[11..27], &[1; 16]);

        let manifest = DownloadManifest::parse(&bytes).unwrap();
        assert_eq!(manifest.entries().len(), 2);
        assert_eq!(manifest.tags()[0].name, "Windows");
        let windows = manifest.tag("Windows").unwrap();
        assert_eq!(
            manifest
                .entries_for_tag(windows)
                .map(|e| e.encoding_key)
                .collect::<Vec<_>>(),
            vec![ekey(1)]
        );
    }

    #[test]
    fn test_v3_priorities_checksums_and_flags() {
        let mut builder = DownloadManifestBuilder::new(3)
            .with_checksums()
            .with_flag_size(1)
            .with_base_priority(-1);
        let mut low = DownloadEntry::new(ekey(1), 100, 4);
        low.checksum = Some(0xDEAD_BEEF);
        low.flags = vec![0x01];
        builder
            .add_entry(low.clone(), &[])
            .add_entry(DownloadEntry::new(ekey(2), 50, -1), &[]);
        let manifest = DownloadManifest::parse(&builder.build().unwrap()).unwrap();

        assert_eq!(manifest.header().base_priority, -1);
        assert_eq!(manifest.entries()[0], low);
        assert_eq!(manifest.entries()[1].flags, vec![0]);
        assert_eq!(manifest.entries()[0].effective_priority(manifest.header()), 5);

        let ordered: Vec<_> = manifest
            .entries_by_priority()
            .iter()
            .map(|e| e.encoding_key)
            .collect();
        assert_eq!(ordered, vec![ekey(2), ekey(1)]);
        assert_eq!(manifest.total_size(), 150);
        assert_eq!(manifest.find(&ekey(2)).unwrap().size, 50);
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(matches!(
            DownloadManifest::parse(b"IN\x01"),
            Err(DownloadError::InvalidMagic([b'I', b'N']))
        ));
        assert!(matches!(
            DownloadManifest::parse(b"DL\x09\x10\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00"),
            Err(DownloadError::UnsupportedVersion(9))
        ));

        let mut builder = DownloadManifestBuilder::new(2);
        builder.add_entry(DownloadEntry::new(ekey(1), 1, 0), &[]);
        let bytes = builder.build().unwrap();
        assert!(DownloadManifest::parse(&bytes[..bytes.len() - 3]).is_err());
    }

    #[test]
    fn test_entry_count_beyond_buffer() {
        assert!(matches!(
            DownloadManifest::parse(b"DL\x01\x10\x00\xff\xff\xff\xff\x00\x00"),
            Err(DownloadError::Truncated {
                available: 0,
                ..
            })
        ));

        let mut builder = DownloadManifestBuilder::new(1);
        builder.add_entry(DownloadEntry::new(ekey(1), 1, 0), &[]);
        let mut bytes = builder.build().unwrap();
        // One entry present, 65537 claimed
        bytes[6] = 1;
        assert!(matches!(
            DownloadManifest::parse(&bytes),
            Err(DownloadError::Truncated { .. })
        ));
    }
}
