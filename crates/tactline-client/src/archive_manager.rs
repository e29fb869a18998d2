//! Merged lookup across the archives of a CDN configuration
//!
//! Archives keep the ordinal of their position in the configured list.
//! Lookups search every loaded index in that order and return the first hit.
//! An archive whose index cannot be fetched or parsed is skipped and
//! recorded as degraded; the remaining archives stay usable.

use futures::stream::{self, StreamExt};
use tactline_formats::archive::ArchiveError;
use tactline_formats::{ArchiveId, ArchiveIndex, EncodingKey};
use tracing::{debug, info, warn};

use crate::dispatcher::RetrievalDispatcher;
use crate::error::TransportError;
use crate::request::CdnRequest;
use crate::transport::CdnTransport;

const DEFAULT_CONCURRENCY: usize = 16;

/// Where an encoded object sits inside the archive set
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArchiveLocation {
    /// Archive holding the object
    pub archive: ArchiveId,
    /// Position of the archive in the configured list
    pub ordinal: usize,
    /// Byte offset inside the archive
    pub offset: u64,
    /// Encoded length
    pub length: u32,
}

/// Why an archive was left out
#[derive(Debug, thiserror::Error)]
pub enum DegradationReason {
    /// The index could not be fetched
    #[error("fetch failed: {0}")]
    Fetch(#[source] TransportError),
    /// The index failed to parse or verify
    #[error("invalid index: {0}")]
    Parse(#[source] ArchiveError),
}

impl DegradationReason {
    /// True if the index was fetched but failed its checksum
    pub fn is_integrity(&self) -> bool {
        matches!(self, Self::Parse(e) if e.is_integrity())
    }
}

/// Archive that is excluded from lookups
#[derive(Debug)]
pub struct DegradedArchive {
    /// Archive name
    pub archive: ArchiveId,
    /// Position of the archive in the configured list
    pub ordinal: usize,
    /// What went wrong
    pub reason: DegradationReason,
}

/// Outcome of [`ArchiveManager::add_archives`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ArchiveLoadReport {
    /// Archives added to the lookup set
    pub loaded: usize,
    /// Archives recorded as degraded
    pub degraded: usize,
}

#[derive(Debug)]
struct LoadedArchive {
    id: ArchiveId,
    ordinal: usize,
    index: ArchiveIndex,
}

/// Ordered set of archive indices
#[derive(Debug)]
pub struct ArchiveManager {
    archives: Vec<LoadedArchive>,
    degraded: Vec<DegradedArchive>,
    next_ordinal: usize,
    max_concurrent_fetches: usize,
}

impl ArchiveManager {
    /// Empty manager
    pub fn new() -> Self {
        Self {
            archives: Vec::new(),
            degraded: Vec::new(),
            next_ordinal: 0,
            max_concurrent_fetches: DEFAULT_CONCURRENCY,
        }
    }

    /// Limit the number of index fetches in flight
    pub fn with_max_concurrent_fetches(mut self, limit: usize) -> Self {
        self.max_concurrent_fetches = limit.max(1);
        self
    }

    /// Fetch and register the indices of `ids`
    ///
    /// Ordinals continue from the archives already registered and follow
    /// the order of `ids`, whatever order the fetches complete in.
    pub async fn add_archives<T: CdnTransport>(
        &mut self,
        dispatcher: &RetrievalDispatcher<T>,
        ids: &[ArchiveId],
    ) -> ArchiveLoadReport {
        let results: Vec<(ArchiveId, Result<ArchiveIndex, DegradationReason>)> =
            stream::iter(ids.iter().cloned())
                .map(|archive| async move {
                    let request = CdnRequest::ArchiveIndex {
                        archive: archive.clone(),
                    };
                    let result = match dispatcher.dispatch(&request).await {
                        Ok(bytes) => ArchiveIndex::parse(&bytes).map_err(DegradationReason::Parse),
                        Err(e) => Err(DegradationReason::Fetch(e)),
                    };
                    (archive, result)
                })
                .buffered(self.max_concurrent_fetches)
                .collect()
                .await;

        let mut report = ArchiveLoadReport::default();
        for (archive, result) in results {
            match result {
                Ok(index) => {
                    self.add_index(archive, index);
                    report.loaded += 1;
                }
                Err(reason) => {
                    self.add_degraded(archive, reason);
                    report.degraded += 1;
                }
            }
        }

        info!(
            "Loaded {} archive indices ({} degraded), {} entries total",
            report.loaded,
            report.degraded,
            self.total_entries()
        );
        report
    }

    /// Register an already parsed index at the next ordinal
    pub fn add_index(&mut self, archive: ArchiveId, index: ArchiveIndex) -> usize {
        let ordinal = self.next_ordinal;
        self.next_ordinal += 1;
        debug!(
            "Archive {} (#{}) holds {} entries",
            archive,
            ordinal,
            index.len()
        );
        self.archives.push(LoadedArchive {
            id: archive,
            ordinal,
            index,
        });
        ordinal
    }

    /// Record an archive that could not be loaded at the next ordinal
    pub fn add_degraded(&mut self, archive: ArchiveId, reason: DegradationReason) -> usize {
        let ordinal = self.next_ordinal;
        self.next_ordinal += 1;
        warn!("Skipping archive {} (#{}): {}", archive, ordinal, reason);
        self.degraded.push(DegradedArchive {
            archive,
            ordinal,
            reason,
        });
        ordinal
    }

    /// First archive holding `ekey`, in ordinal order
    pub fn resolve(&self, ekey: &EncodingKey) -> Option<ArchiveLocation> {
        self.archives.iter().find_map(|loaded| {
            loaded.index.lookup(ekey).map(|span| ArchiveLocation {
                archive: loaded.id.clone(),
                ordinal: loaded.ordinal,
                offset: span.offset,
                length: span.length,
            })
        })
    }

    /// Archives excluded from lookups
    pub fn degraded(&self) -> &[DegradedArchive] {
        &self.degraded
    }

    /// Loaded archive names in ordinal order
    pub fn archive_ids(&self) -> impl Iterator<Item = &ArchiveId> {
        self.archives.iter().map(|loaded| &loaded.id)
    }

    /// Index of a loaded archive
    pub fn index(&self, archive: &ArchiveId) -> Option<&ArchiveIndex> {
        self.archives
            .iter()
            .find(|loaded| &loaded.id == archive)
            .map(|loaded| &loaded.index)
    }

    /// Number of loaded archives
    pub fn len(&self) -> usize {
        self.archives.len()
    }

    /// True if no archive is loaded
    pub fn is_empty(&self) -> bool {
        self.archives.is_empty()
    }

    /// Entries across all loaded archives
    pub fn total_entries(&self) -> usize {
        self.archives.iter().map(|loaded| loaded.index.len()).sum()
    }
}

impl Default for ArchiveManager {
    fn default() -> Self {
        Self::new()
    }
}
