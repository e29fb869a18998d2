//! Tags shared by install and download manifests
//!
//! A tag names a set of manifest entries through a bitmask with one bit per
//! entry, most significant bit first: entry 0 is `0x80` of byte 0.
//! Selecting files for an install is a bitmask test per entry.

use crate::util::{read_cstring, write_cstring};
use binrw::io::{Read, Seek, Write};
use binrw::{BinRead, BinResult, BinWrite};

/// Kind of a manifest tag
///
/// Values outside the published set are kept as [`TagType::Unknown`] so
/// newer manifests still parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagType {
    /// Operating system (`Windows`, `OSX`, ...)
    Platform,
    /// CPU architecture (`x86_64`, `arm64`, ...)
    Architecture,
    /// Text or speech locale (`enUS`, ...)
    Locale,
    /// Content category
    Category,
    /// Region (`US`, `EU`, ...)
    Region,
    /// Any other raw type value
    Unknown(u16),
}

impl TagType {
    /// Decode a raw type value
    pub fn from_u16(value: u16) -> Self {
        match value {
            1 => Self::Platform,
            2 => Self::Architecture,
            3 => Self::Locale,
            4 => Self::Region,
            5 => Self::Category,
            other => Self::Unknown(other),
        }
    }

    /// Raw type value as stored
    pub fn to_u16(self) -> u16 {
        match self {
            Self::Platform => 1,
            Self::Architecture => 2,
            Self::Locale => 3,
            Self::Region => 4,
            Self::Category => 5,
            Self::Unknown(value) => value,
        }
    }
}

/// Named tag with its entry bitmask
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    /// Tag name, unique within a manifest
    pub name: String,
    /// Tag kind
    pub tag_type: TagType,
    /// `ceil(entry_count / 8)` bytes, most significant bit first
    pub mask: Vec<u8>,
}

impl Tag {
    /// Tag with no members for a manifest of `entry_count` entries
    pub fn new(name: impl Into<String>, tag_type: TagType, entry_count: usize) -> Self {
        Self {
            name: name.into(),
            tag_type,
            mask: vec![0; entry_count.div_ceil(8)],
        }
    }

    /// True if the entry at `index` carries this tag
    pub fn contains(&self, index: usize) -> bool {
        self.mask
            .get(index / 8)
            .is_some_and(|byte| byte & (0x80 >> (index % 8)) != 0)
    }

    /// Mark the entry at `index` as carrying this tag
    pub fn insert(&mut self, index: usize) {
        let byte = index / 8;
        if byte >= self.mask.len() {
            self.mask.resize(byte + 1, 0);
        }
        self.mask[byte] |= 0x80 >> (index % 8);
    }

    /// Number of entries carrying this tag
    pub fn member_count(&self) -> usize {
        self.mask.iter().map(|b| b.count_ones() as usize).sum()
    }
}

impl BinRead for Tag {
    /// Number of manifest entries, which fixes the mask length
    type Args<'a> = usize;

    fn read_options<R: Read + Seek>(
        reader: &mut R,
        _endian: binrw::Endian,
        entry_count: Self::Args<'_>,
    ) -> BinResult<Self> {
        let name = read_cstring(reader)?;
        let tag_type = TagType::from_u16(u16::read_options(reader, binrw::Endian::Big, ())?);
        let mut mask = vec![0u8; entry_count.div_ceil(8)];
        reader.read_exact(&mut mask)?;
        Ok(Self {
            name,
            tag_type,
            mask,
        })
    }
}

impl BinWrite for Tag {
    type Args<'a> = usize;

    fn write_options<W: Write + Seek>(
        &self,
        writer: &mut W,
        _endian: binrw::Endian,
        entry_count: Self::Args<'_>,
    ) -> BinResult<()> {
        write_cstring(writer, &self.name)?;
        self.tag_type
            .to_u16()
            .write_options(writer, binrw::Endian::Big, ())?;
        let mut mask = self.mask.clone();
        mask.resize(entry_count.div_ceil(8), 0);
        writer.write_all(&mask)?;
        Ok(())
    }
}

/// Fewest bytes `tag_count` tags can occupy: empty name, type, mask
pub(crate) fn min_tags_size(tag_count: u16, entry_count: usize) -> usize {
    usize::from(tag_count).saturating_mul(3 + entry_count.div_ceil(8))
}

/// Common view over tagged manifests
///
/// Every selection method re-derives its result from the immutable entry
/// and tag tables, so calling it twice yields the same sequence.
pub trait TaggedManifest {
    /// Entry type of the manifest
    type Entry;

    /// Tags in manifest order
    fn tags(&self) -> &[Tag];

    /// Entries in manifest order
    fn entries(&self) -> &[Self::Entry];

    /// Tag by name
    fn tag(&self, name: &str) -> Option<&Tag> {
        self.tags().iter().find(|tag| tag.name == name)
    }

    /// Entries whose bit is set in `tag`
    fn entries_for_tag<'a>(&'a self, tag: &'a Tag) -> impl Iterator<Item = &'a Self::Entry> + 'a
    where
        Self::Entry: 'a,
    {
        self.entries()
            .iter()
            .enumerate()
            .filter(move |(index, _)| tag.contains(*index))
            .map(|(_, entry)| entry)
    }

    /// Entries carrying every tag in `tags`; an empty selection matches everything
    fn entries_for_tags<'a>(
        &'a self,
        tags: &'a [&'a Tag],
    ) -> impl Iterator<Item = &'a Self::Entry> + 'a
    where
        Self::Entry: 'a,
    {
        self.entries()
            .iter()
            .enumerate()
            .filter(move |(index, _)| tags.iter().all(|tag| tag.contains(*index)))
            .map(|(_, entry)| entry)
    }

    /// Tags set for the entry at `index`
    fn tags_for_entry(&self, index: usize) -> Vec<&Tag> {
        self.tags()
            .iter()
            .filter(|tag| tag.contains(index))
            .collect()
    }
}
