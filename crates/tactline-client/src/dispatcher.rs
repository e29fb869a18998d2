//! Routes requests to a transport

use bytes::Bytes;
use tracing::debug;

use crate::error::TransportError;
use crate::request::{CdnRequest, RetrievalPlan};
use crate::transport::CdnTransport;

/// Issues [`CdnRequest`]s through a [`CdnTransport`]
#[derive(Debug, Clone)]
pub struct RetrievalDispatcher<T> {
    transport: T,
}

impl<T: CdnTransport> RetrievalDispatcher<T> {
    /// Dispatch through `transport`
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Underlying transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Fetch the bytes named by `request`
    pub async fn dispatch(&self, request: &CdnRequest) -> Result<Bytes, TransportError> {
        debug!("Dispatching {}", request);
        let bytes = match request {
            CdnRequest::Config { key } => self.transport.fetch_config(key).await?,
            CdnRequest::ArchiveIndex { archive } => {
                self.transport.fetch_archive_index(archive).await?
            }
            CdnRequest::ArchiveRange {
                archive,
                offset,
                length,
            } => {
                self.transport
                    .fetch_archive_range(archive, *offset, *length)
                    .await?
            }
            CdnRequest::LooseObject { key } => self.transport.fetch_loose_object(key).await?,
        };
        debug!("Received {} bytes for {}", bytes.len(), request);
        Ok(bytes)
    }

    /// Fetch the bytes a retrieval plan points at
    pub async fn fetch_plan(&self, plan: &RetrievalPlan) -> Result<Bytes, TransportError> {
        self.dispatch(&plan.request()).await
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::transport::MemoryTransport;
    use pretty_assertions::assert_eq;
    use tactline_formats::{ArchiveId, EncodingKey};

    #[tokio::test]
    async fn test_plans_map_to_requests() {
        let archive = ArchiveId::new("archX");
        let ekey = EncodingKey::from_bytes([9; 16]);
        let mut cdn = MemoryTransport::new();
        cdn.insert_archive_blob(&archive, vec![0u8; 64])
            .insert_loose(ekey, b"loose".to_vec());
        let dispatcher = RetrievalDispatcher::new(cdn);

        let archived = RetrievalPlan::Archived {
            archive: archive.clone(),
            offset: 8,
            length: 16,
        };
        assert_eq!(dispatcher.fetch_plan(&archived).await.unwrap().len(), 16);
        assert_eq!(
            &dispatcher
                .fetch_plan(&RetrievalPlan::Loose { ekey })
                .await
                .unwrap()[..],
            b"loose"
        );

        assert_eq!(
            dispatcher.transport().requests(),
            vec![
                CdnRequest::ArchiveRange {
                    archive,
                    offset: 8,
                    length: 16
                },
                CdnRequest::LooseObject { key: ekey },
            ]
        );
    }

    #[tokio::test]
    async fn test_transport_errors_pass_through() {
        let dispatcher = RetrievalDispatcher::new(MemoryTransport::new());
        let err = dispatcher
            .dispatch(&CdnRequest::ArchiveIndex {
                archive: ArchiveId::new("missing"),
            })
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
