use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tactline_formats::{ArchiveId, ContentKey, EncodingKey};

use super::CdnTransport;
use crate::error::TransportError;
use crate::request::CdnRequest;

/// In-memory CDN keyed by request path
///
/// Holds configs, archive indices, archive blobs and loose objects under
/// the same paths an HTTP CDN would serve them from. Archive ranges are
/// sliced out of the stored blob. Every request is recorded.
#[derive(Debug, Clone, Default)]
pub struct MemoryTransport {
    objects: HashMap<String, Bytes>,
    requests: Arc<Mutex<Vec<CdnRequest>>>,
}

impl MemoryTransport {
    /// Empty CDN
    pub fn new() -> Self {
        Self::default()
    }

    /// Store bytes under a CDN-relative path
    pub fn insert(&mut self, path: impl Into<String>, data: impl Into<Bytes>) -> &mut Self {
        self.objects.insert(path.into(), data.into());
        self
    }

    /// Store a config file and return the content key naming it
    pub fn insert_config(&mut self, data: impl Into<Bytes>) -> ContentKey {
        let data = data.into();
        let key = ContentKey::from_data(&data);
        self.insert(CdnRequest::Config { key }.path(), data);
        key
    }

    /// Store a standalone encoded object
    pub fn insert_loose(&mut self, key: EncodingKey, data: impl Into<Bytes>) -> &mut Self {
        self.insert(CdnRequest::LooseObject { key }.path(), data)
    }

    /// Store an archive index
    pub fn insert_archive_index(
        &mut self,
        archive: &ArchiveId,
        index: impl Into<Bytes>,
    ) -> &mut Self {
        self.insert(
            CdnRequest::ArchiveIndex {
                archive: archive.clone(),
            }
            .path(),
            index,
        )
    }

    /// Store an archive blob
    pub fn insert_archive_blob(&mut self, archive: &ArchiveId, blob: impl Into<Bytes>) -> &mut Self {
        self.insert(
            CdnRequest::ArchiveRange {
                archive: archive.clone(),
                offset: 0,
                length: 0,
            }
            .path(),
            blob,
        )
    }

    /// Requests served so far, in order
    pub fn requests(&self) -> Vec<CdnRequest> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }

    fn serve(&self, request: CdnRequest) -> Result<Bytes, TransportError> {
        let path = request.path();
        let result = match (&request, self.objects.get(&path)) {
            (_, None) => Err(TransportError::NotFound(path)),
            (
                CdnRequest::ArchiveRange {
                    offset, length, ..
                },
                Some(blob),
            ) => slice(&path, blob, *offset, *length),
            (_, Some(data)) => Ok(data.clone()),
        };

        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }
        result
    }
}

fn slice(path: &str, blob: &Bytes, offset: u64, length: u32) -> Result<Bytes, TransportError> {
    let range = usize::try_from(offset)
        .ok()
        .and_then(|start| Some(start..start.checked_add(length as usize)?))
        .filter(|range| range.end <= blob.len());

    range
        .map(|range| blob.slice(range))
        .ok_or_else(|| TransportError::RangeOutOfBounds {
            path: path.to_string(),
            offset,
            length,
            size: blob.len(),
        })
}

#[async_trait]
impl CdnTransport for MemoryTransport {
    async fn fetch_config(&self, key: &ContentKey) -> Result<Bytes, TransportError> {
        self.serve(CdnRequest::Config { key: *key })
    }

    async fn fetch_archive_index(&self, archive: &ArchiveId) -> Result<Bytes, TransportError> {
        self.serve(CdnRequest::ArchiveIndex {
            archive: archive.clone(),
        })
    }

    async fn fetch_archive_range(
        &self,
        archive: &ArchiveId,
        offset: u64,
        length: u32,
    ) -> Result<Bytes, TransportError> {
        self.serve(CdnRequest::ArchiveRange {
            archive: archive.clone(),
            offset,
            length,
        })
    }

    async fn fetch_loose_object(&self, key: &EncodingKey) -> Result<Bytes, TransportError> {
        self.serve(CdnRequest::LooseObject { key: *key })
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_serves_by_path() {
        let mut cdn = MemoryTransport::new();
        let key = cdn.insert_config(&b"archives = \n"[..]);
        let ekey = EncodingKey::from_bytes([3; 16]);
        cdn.insert_loose(ekey, vec![1, 2, 3]);

        assert_eq!(&cdn.fetch_config(&key).await.unwrap()[..], b"archives = \n");
        assert_eq!(&cdn.fetch_loose_object(&ekey).await.unwrap()[..], &[1, 2, 3]);
        assert!(
            cdn.fetch_loose_object(&EncodingKey::from_bytes([4; 16]))
                .await
                .unwrap_err()
                .is_not_found()
        );
        assert_eq!(cdn.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_archive_ranges() {
        let mut cdn = MemoryTransport::new();
        let archive = ArchiveId::new("archX");
        cdn.insert_archive_blob(&archive, (0..100u8).collect::<Vec<_>>());

        let bytes = cdn.fetch_archive_range(&archive, 10, 5).await.unwrap();
        assert_eq!(&bytes[..], &[10, 11, 12, 13, 14]);

        let err = cdn.fetch_archive_range(&archive, 98, 5).await.unwrap_err();
        assert!(matches!(err, TransportError::RangeOutOfBounds { size: 100, .. }));
        assert!(
            cdn.fetch_archive_index(&archive)
                .await
                .unwrap_err()
                .is_not_found()
        );
    }
}
