//! Requests the retrieval layer can issue
//!
//! Each variant carries exactly the fields its fetch needs. A
//! [`RetrievalPlan`] is the outcome of resolving a key and maps onto one
//! request.

use std::fmt;
use tactline_formats::{ArchiveId, ContentKey, EncodingKey};

/// One fetch against the CDN
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CdnRequest {
    /// Build or CDN configuration, by content key
    Config {
        /// Hash naming the config file
        key: ContentKey,
    },
    /// The `.index` file of an archive
    ArchiveIndex {
        /// Archive name
        archive: ArchiveId,
    },
    /// A byte range inside an archive blob
    ArchiveRange {
        /// Archive name
        archive: ArchiveId,
        /// Byte offset inside the archive
        offset: u64,
        /// Number of bytes
        length: u32,
    },
    /// A standalone encoded object
    LooseObject {
        /// Encoding key naming the object
        key: EncodingKey,
    },
}

impl CdnRequest {
    /// Path relative to the CDN product path
    ///
    /// `config/ab/cd/abcd...`, `data/ab/cd/abcd....index` or
    /// `data/ab/cd/abcd...`. Archive ranges name the whole archive.
    pub fn path(&self) -> String {
        match self {
            Self::Config { key } => sharded("config", &key.to_hex(), ""),
            Self::ArchiveIndex { archive } => sharded("data", archive.as_str(), ".index"),
            Self::ArchiveRange { archive, .. } => sharded("data", archive.as_str(), ""),
            Self::LooseObject { key } => sharded("data", &key.to_hex(), ""),
        }
    }

    /// Inclusive `(first, last)` byte range for range requests
    ///
    /// `None` for whole-object requests and for empty ranges.
    pub fn byte_range(&self) -> Option<(u64, u64)> {
        match self {
            Self::ArchiveRange { offset, length, .. } if *length > 0 => {
                Some((*offset, offset + u64::from(*length) - 1))
            }
            _ => None,
        }
    }
}

impl fmt::Display for CdnRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ArchiveRange {
                archive,
                offset,
                length,
            } => write!(f, "{} [{}+{}]", sharded("data", archive.as_str(), ""), offset, length),
            other => f.write_str(&other.path()),
        }
    }
}

fn sharded(kind: &str, name: &str, suffix: &str) -> String {
    format!(
        "{}/{}/{}/{}{}",
        kind,
        name.get(..2).unwrap_or_default(),
        name.get(2..4).unwrap_or_default(),
        name,
        suffix
    )
}

/// Where the bytes of a resolved key live
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RetrievalPlan {
    /// Packed inside an archive blob
    Archived {
        /// Archive holding the object
        archive: ArchiveId,
        /// Byte offset inside the archive
        offset: u64,
        /// Encoded length
        length: u32,
    },
    /// Standalone object named by its encoding key
    Loose {
        /// Encoding key of the object
        ekey: EncodingKey,
    },
}

impl RetrievalPlan {
    /// Request that fetches the planned bytes
    pub fn request(&self) -> CdnRequest {
        match self {
            Self::Archived {
                archive,
                offset,
                length,
            } => CdnRequest::ArchiveRange {
                archive: archive.clone(),
                offset: *offset,
                length: *length,
            },
            Self::Loose { ekey } => CdnRequest::LooseObject { key: *ekey },
        }
    }

    /// True for archived plans
    pub fn is_archived(&self) -> bool {
        matches!(self, Self::Archived { .. })
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_paths() {
        let key: ContentKey = "abcdef1234567890abcdef1234567890".parse().unwrap();
        assert_eq!(
            CdnRequest::Config { key }.path(),
            "config/ab/cd/abcdef1234567890abcdef1234567890"
        );

        let archive = ArchiveId::new("0017a402f556fbece46c38dc431a2c9b");
        assert_eq!(
            CdnRequest::ArchiveIndex {
                archive: archive.clone()
            }
            .path(),
            "data/00/17/0017a402f556fbece46c38dc431a2c9b.index"
        );

        let range = CdnRequest::ArchiveRange {
            archive,
            offset: 4096,
            length: 512,
        };
        assert_eq!(range.path(), "data/00/17/0017a402f556fbece46c38dc431a2c9b");
        assert_eq!(range.byte_range(), Some((4096, 4607)));

        let ekey = EncodingKey::from_bytes([0xAA; 16]);
        assert_eq!(
            CdnRequest::LooseObject { key: ekey }.path(),
            format!("data/aa/aa/{}", ekey)
        );
        assert_eq!(CdnRequest::LooseObject { key: ekey }.byte_range(), None);
    }

    #[test]
    fn test_short_archive_names_do_not_panic() {
        let request = CdnRequest::ArchiveIndex {
            archive: ArchiveId::new("x"),
        };
        assert_eq!(request.path(), "data///x.index");
    }

    #[test]
    fn test_plan_requests() {
        let plan = RetrievalPlan::Archived {
            archive: ArchiveId::new("archX"),
            offset: 4096,
            length: 512,
        };
        assert!(plan.is_archived());
        assert_eq!(
            plan.request(),
            CdnRequest::ArchiveRange {
                archive: ArchiveId::new("archX"),
                offset: 4096,
                length: 512,
            }
        );

        let ekey = EncodingKey::from_bytes([1; 16]);
        assert_eq!(
            RetrievalPlan::Loose { ekey }.request(),
            CdnRequest::LooseObject { key: ekey }
        );
    }
}
