//! Builder producing download manifests

use super::entry::DownloadEntry;
use super::error::{DownloadError, Result};
use super::header::DownloadHeader;
use super::manifest::DownloadManifest;
use crate::manifest::{Tag, TagType};
use crate::util::U40_MAX;

/// Builds a download manifest of a given version
#[derive(Debug, Clone)]
pub struct DownloadManifestBuilder {
    version: u8,
    has_checksum: bool,
    flag_size: u8,
    base_priority: i8,
    tags: Vec<(String, TagType)>,
    entries: Vec<(DownloadEntry, Vec<String>)>,
}

impl DownloadManifestBuilder {
    /// Empty builder for `version` (1..=3)
    pub fn new(version: u8) -> Self {
        Self {
            version,
            has_checksum: false,
            flag_size: 0,
            base_priority: 0,
            tags: Vec::new(),
            entries: Vec::new(),
        }
    }

    /// Store a checksum with every entry
    pub fn with_checksums(mut self) -> Self {
        self.has_checksum = true;
        self
    }

    /// Bytes of flags per entry (version 2+)
    pub fn with_flag_size(mut self, flag_size: u8) -> Self {
        self.flag_size = flag_size;
        self
    }

    /// Base priority (version 3)
    pub fn with_base_priority(mut self, base_priority: i8) -> Self {
        self.base_priority = base_priority;
        self
    }

    /// Declare a tag
    pub fn add_tag(&mut self, name: &str, tag_type: TagType) -> &mut Self {
        self.tags.push((name.to_string(), tag_type));
        self
    }

    /// Add an entry carrying the named tags
    pub fn add_entry(&mut self, entry: DownloadEntry, tags: &[&str]) -> &mut Self {
        self.entries
            .push((entry, tags.iter().map(|t| (*t).to_string()).collect()));
        self
    }

    /// Assemble the manifest
    pub fn build_manifest(&self) -> Result<DownloadManifest> {
        if self.version < 2 && self.flag_size > 0 {
            return Err(DownloadError::InvalidInput(format!(
                "version {} has no entry flags",
                self.version
            )));
        }
        if self.version < 3 && self.base_priority != 0 {
            return Err(DownloadError::InvalidInput(format!(
                "version {} has no base priority",
                self.version
            )));
        }
        if let Some((entry, _)) = self.entries.iter().find(|(e, _)| e.size > U40_MAX) {
            return Err(DownloadError::InvalidInput(format!(
                "size of {} exceeds 40 bits",
                entry.encoding_key
            )));
        }

        let mut header = DownloadHeader::new(
            self.version,
            self.entries.len() as u32,
            self.tags.len() as u16,
        );
        header.has_checksum = self.has_checksum;
        header.flag_size = self.flag_size;
        header.base_priority = self.base_priority;
        header.validate()?;

        let mut tags: Vec<Tag> = self
            .tags
            .iter()
            .map(|(name, tag_type)| Tag::new(name.clone(), *tag_type, self.entries.len()))
            .collect();
        for (index, (_, entry_tags)) in self.entries.iter().enumerate() {
            for name in entry_tags {
                tags.iter_mut()
                    .find(|t| &t.name == name)
                    .ok_or_else(|| DownloadError::UnknownTag(name.clone()))?
                    .insert(index);
            }
        }

        let entries = self.entries.iter().map(|(e, _)| e.clone()).collect();
        Ok(DownloadManifest::from_parts(header, entries, tags))
    }

    /// Serialize the manifest
    pub fn build(&self) -> Result<Vec<u8>> {
        self.build_manifest()?.to_bytes()
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::keys::EncodingKey;

    #[test]
    fn test_version_gated_fields() {
        assert!(DownloadManifestBuilder::new(1).with_flag_size(1).build().is_err());
        assert!(DownloadManifestBuilder::new(2).with_base_priority(1).build().is_err());
        assert!(DownloadManifestBuilder::new(4).build().is_err());
    }

    #[test]
    fn test_unknown_tag() {
        let mut builder = DownloadManifestBuilder::new(1);
        builder.add_entry(
            DownloadEntry::new(EncodingKey::from_bytes([1; 16]), 1, 0),
            &["Nope"],
        );
        assert!(matches!(builder.build(), Err(DownloadError::UnknownTag(_))));
    }
}
