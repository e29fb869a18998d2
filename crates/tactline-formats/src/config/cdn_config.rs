use super::error::{ConfigError, Result};
use super::table::ConfigTable;
use crate::archive::ArchiveId;

/// Typed view over a CDN configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CdnConfig {
    table: ConfigTable,
}

impl CdnConfig {
    /// Wrap a parsed table
    pub fn new(table: ConfigTable) -> Self {
        Self { table }
    }

    /// Parse CDN configuration bytes
    pub fn parse(data: &[u8]) -> Result<Self> {
        ConfigTable::parse_bytes(data).map(Self::new)
    }

    /// Underlying key/value table
    pub fn table(&self) -> &ConfigTable {
        &self.table
    }

    /// Data archives in declared order
    pub fn archives(&self) -> Result<Vec<ArchiveId>> {
        self.table
            .values("archives")
            .into_iter()
            .map(|hex| archive_id("archives", hex))
            .collect()
    }

    /// Sizes of the archive indices, when listed
    pub fn archive_index_sizes(&self) -> Vec<u64> {
        self.table
            .values("archives-index-size")
            .into_iter()
            .filter_map(|s| s.parse().ok())
            .collect()
    }

    /// Combined archive group index
    pub fn archive_group(&self) -> Result<Option<ArchiveId>> {
        self.single_archive("archive-group")
    }

    /// Index of loose files
    pub fn file_index(&self) -> Result<Option<ArchiveId>> {
        self.single_archive("file-index")
    }

    fn single_archive(&self, field: &str) -> Result<Option<ArchiveId>> {
        self.table
            .values(field)
            .first()
            .map(|hex| archive_id(field, hex))
            .transpose()
    }
}

fn archive_id(field: &str, hex: &str) -> Result<ArchiveId> {
    ArchiveId::parse_hex(hex).map_err(|_| ConfigError::InvalidKey {
        field: field.to_string(),
        value: hex.to_string(),
    })
}
