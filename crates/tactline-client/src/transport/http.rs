use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tactline_formats::{ArchiveId, ContentKey, EncodingKey};
use tracing::debug;

use super::CdnTransport;
use crate::config::{CdnEndpoint, ClientConfig};
use crate::error::TransportError;
use crate::request::CdnRequest;
use crate::retry::RetryPolicy;

/// CDN transport over HTTP(S)
///
/// Objects are requested from `{scheme}://{host}/{path}/{request path}`.
/// Archive ranges use a `Range` header; a server answering `200` with the
/// whole archive is sliced locally.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    endpoint: CdnEndpoint,
    retry_policy: RetryPolicy,
}

impl HttpTransport {
    /// Build a transport from client configuration
    pub fn new(config: &ClientConfig) -> Result<Self, TransportError> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .pool_idle_timeout(Duration::from_secs(30))
            .pool_max_idle_per_host(10)
            .tcp_nodelay(true)
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .redirect(reqwest::redirect::Policy::limited(3))
            .user_agent(concat!("tactline/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self::with_client(
            client,
            config.endpoint.clone(),
            config.retry_policy.clone(),
        ))
    }

    /// Use an existing `reqwest` client
    pub fn with_client(client: Client, endpoint: CdnEndpoint, retry_policy: RetryPolicy) -> Self {
        Self {
            client,
            endpoint,
            retry_policy,
        }
    }

    /// Endpoint requests are made against
    pub fn endpoint(&self) -> &CdnEndpoint {
        &self.endpoint
    }

    async fn get(&self, request: &CdnRequest) -> Result<Bytes, TransportError> {
        let path = request.path();
        let url = self.endpoint.url(&path);
        let range = request.byte_range();

        self.retry_policy
            .execute(|| async {
                debug!("GET {}", url);
                let mut builder = self.client.get(&url);
                if let Some((first, last)) = range {
                    builder = builder.header(reqwest::header::RANGE, format!("bytes={first}-{last}"));
                }
                let response = builder.send().await?;

                match response.status() {
                    StatusCode::PARTIAL_CONTENT => Ok(response.bytes().await?),
                    status if status.is_success() => {
                        let body = response.bytes().await?;
                        match range {
                            Some((first, last)) => slice_full_body(&path, body, first, last),
                            None => Ok(body),
                        }
                    }
                    StatusCode::NOT_FOUND => Err(TransportError::NotFound(path.clone())),
                    status => Err(TransportError::Status {
                        status: status.as_u16(),
                        path: path.clone(),
                    }),
                }
            })
            .await
    }
}

fn slice_full_body(path: &str, body: Bytes, first: u64, last: u64) -> Result<Bytes, TransportError> {
    let out_of_bounds = || TransportError::RangeOutOfBounds {
        path: path.to_string(),
        offset: first,
        length: (last - first + 1) as u32,
        size: body.len(),
    };
    let start = usize::try_from(first).map_err(|_| out_of_bounds())?;
    let end = usize::try_from(last + 1).map_err(|_| out_of_bounds())?;
    if end > body.len() {
        return Err(out_of_bounds());
    }
    debug!("Server ignored range for {}, slicing {} bytes locally", path, end - start);
    Ok(body.slice(start..end))
}

#[async_trait]
impl CdnTransport for HttpTransport {
    async fn fetch_config(&self, key: &ContentKey) -> Result<Bytes, TransportError> {
        self.get(&CdnRequest::Config { key: *key }).await
    }

    async fn fetch_archive_index(&self, archive: &ArchiveId) -> Result<Bytes, TransportError> {
        self.get(&CdnRequest::ArchiveIndex {
            archive: archive.clone(),
        })
        .await
    }

    async fn fetch_archive_range(
        &self,
        archive: &ArchiveId,
        offset: u64,
        length: u32,
    ) -> Result<Bytes, TransportError> {
        if length == 0 {
            return Ok(Bytes::new());
        }
        self.get(&CdnRequest::ArchiveRange {
            archive: archive.clone(),
            offset,
            length,
        })
        .await
    }

    async fn fetch_loose_object(&self, key: &EncodingKey) -> Result<Bytes, TransportError> {
        self.get(&CdnRequest::LooseObject { key: *key }).await
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn transport(server: &MockServer, retry_policy: RetryPolicy) -> HttpTransport {
        let _ = rustls::crypto::ring::default_provider().install_default();
        let endpoint = CdnEndpoint::new(server.uri().replace("http://", ""), "tpr/wow");
        let config = ClientConfig {
            retry_policy,
            ..ClientConfig::default()
        }
        .with_endpoint(endpoint);
        HttpTransport::new(&config).unwrap()
    }

    fn quick_retries() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 2,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(2),
            multiplier: 2.0,
        }
    }

    #[tokio::test]
    async fn test_config_fetch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/tpr/wow/config/ab/cd/abcdef1234567890abcdef1234567890"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"root = 00".to_vec()))
            .mount(&server)
            .await;

        let key: ContentKey = "abcdef1234567890abcdef1234567890".parse().unwrap();
        let bytes = transport(&server, RetryPolicy::none())
            .fetch_config(&key)
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"root = 00");
    }

    #[tokio::test]
    async fn test_archive_range_header() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/tpr/wow/data/00/17/0017a402f556fbece46c38dc431a2c9b"))
            .and(header("Range", "bytes=4096-4607"))
            .respond_with(ResponseTemplate::new(206).set_body_bytes(vec![7u8; 512]))
            .expect(1)
            .mount(&server)
            .await;

        let bytes = transport(&server, RetryPolicy::none())
            .fetch_archive_range(&ArchiveId::new("0017a402f556fbece46c38dc431a2c9b"), 4096, 512)
            .await
            .unwrap();
        assert_eq!(bytes.len(), 512);
    }

    #[tokio::test]
    async fn test_full_body_is_sliced() {
        let server = MockServer::start().await;
        let blob: Vec<u8> = (0..=255u8).collect();
        Mock::given(method("GET"))
            .and(path("/tpr/wow/data/aa/bb/aabb"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(blob))
            .mount(&server)
            .await;

        let transport = transport(&server, RetryPolicy::none());
        let archive = ArchiveId::new("aabb");
        let bytes = transport.fetch_archive_range(&archive, 16, 4).await.unwrap();
        assert_eq!(&bytes[..], &[16, 17, 18, 19]);

        let err = transport
            .fetch_archive_range(&archive, 250, 10)
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::RangeOutOfBounds { size: 256, .. }));
    }

    #[tokio::test]
    async fn test_not_found_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let err = transport(&server, quick_retries())
            .fetch_loose_object(&EncodingKey::from_bytes([0x11; 16]))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_server_errors_are_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .expect(3)
            .mount(&server)
            .await;

        let err = transport(&server, quick_retries())
            .fetch_archive_index(&ArchiveId::new("0017a402f556fbece46c38dc431a2c9b"))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Status { status: 503, .. }));
    }
}
