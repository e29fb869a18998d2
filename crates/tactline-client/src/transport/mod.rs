//! Transports that fetch bytes for [`CdnRequest`](crate::CdnRequest)s
//!
//! The retrieval layer never touches the network itself. It asks a
//! [`CdnTransport`] for one of four kinds of object and gets raw bytes or a
//! [`TransportError`] back. Retries and timeouts belong to the transport.

mod http;
mod memory;

pub use http::HttpTransport;
pub use memory::MemoryTransport;

use async_trait::async_trait;
use bytes::Bytes;
use tactline_formats::{ArchiveId, ContentKey, EncodingKey};

use crate::error::TransportError;

/// Source of CDN objects
#[async_trait]
pub trait CdnTransport: Send + Sync {
    /// Build or CDN configuration named by its content key
    async fn fetch_config(&self, key: &ContentKey) -> Result<Bytes, TransportError>;

    /// The complete `.index` file of an archive
    async fn fetch_archive_index(&self, archive: &ArchiveId) -> Result<Bytes, TransportError>;

    /// `length` bytes at `offset` inside an archive blob
    async fn fetch_archive_range(
        &self,
        archive: &ArchiveId,
        offset: u64,
        length: u32,
    ) -> Result<Bytes, TransportError>;

    /// A standalone encoded object
    async fn fetch_loose_object(&self, key: &EncodingKey) -> Result<Bytes, TransportError>;
}
