//! Builder producing install manifests

use super::entry::InstallEntry;
use super::error::{InstallError, Result};
use super::manifest::InstallManifest;
use crate::keys::ContentKey;
use crate::manifest::{Tag, TagType};

/// Builds an install manifest from tags and tagged entries
#[derive(Debug, Clone, Default)]
pub struct InstallManifestBuilder {
    tags: Vec<(String, TagType)>,
    entries: Vec<(InstallEntry, Vec<String>)>,
}

impl InstallManifestBuilder {
    /// Empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a tag; tags keep declaration order
    pub fn add_tag(&mut self, name: &str, tag_type: TagType) -> &mut Self {
        self.tags.push((name.to_string(), tag_type));
        self
    }

    /// Add a file carrying the named tags
    pub fn add_entry(
        &mut self,
        path: &str,
        content_key: ContentKey,
        size: u32,
        tags: &[&str],
    ) -> &mut Self {
        self.entries.push((
            InstallEntry {
                path: path.to_string(),
                content_key,
                size,
            },
            tags.iter().map(|t| (*t).to_string()).collect(),
        ));
        self
    }

    /// Assemble the manifest, checking tag references
    pub fn build_manifest(&self) -> Result<InstallManifest> {
        if self.tags.len() > usize::from(u16::MAX) {
            return Err(InstallError::InvalidInput(format!(
                "{} tags exceed the u16 tag count",
                self.tags.len()
            )));
        }

        let mut tags: Vec<Tag> = Vec::with_capacity(self.tags.len());
        for (name, tag_type) in &self.tags {
            if tags.iter().any(|t| &t.name == name) {
                return Err(InstallError::DuplicateTag(name.clone()));
            }
            tags.push(Tag::new(name.clone(), *tag_type, self.entries.len()));
        }

        for (index, (_, entry_tags)) in self.entries.iter().enumerate() {
            for name in entry_tags {
                let tag = tags
                    .iter_mut()
                    .find(|t| &t.name == name)
                    .ok_or_else(|| InstallError::UnknownTag(name.clone()))?;
                tag.insert(index);
            }
        }

        let entries = self.entries.iter().map(|(entry, _)| entry.clone()).collect();
        Ok(InstallManifest::from_parts(tags, entries))
    }

    /// Serialize the manifest
    pub fn build(&self) -> Result<Vec<u8>> {
        self.build_manifest()?.to_bytes()
    }
}
