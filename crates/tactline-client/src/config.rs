//! Client configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::retry::RetryPolicy;

/// CDN host and product path every request is made against
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CdnEndpoint {
    /// URL scheme, `http` or `https`
    pub scheme: String,
    /// CDN server hostname, optionally with a port
    pub host: String,
    /// Product path (e.g. "tpr/wow")
    pub path: String,
}

impl CdnEndpoint {
    /// Endpoint over plain HTTP
    pub fn new(host: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            scheme: "http".to_string(),
            host: host.into(),
            path: path.into(),
        }
    }

    /// Full URL for a CDN-relative request path
    pub fn url(&self, request_path: &str) -> String {
        format!(
            "{}://{}/{}/{}",
            self.scheme,
            self.host.trim_end_matches('/'),
            self.path.trim_matches('/'),
            request_path
        )
    }
}

impl Default for CdnEndpoint {
    fn default() -> Self {
        Self::new("level3.blizzard.com", "tpr/wow")
    }
}

/// Settings for talking to a CDN
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// CDN endpoint
    pub endpoint: CdnEndpoint,

    /// Connection timeout
    pub connect_timeout: Duration,

    /// Request timeout
    pub request_timeout: Duration,

    /// Archive indices fetched at once while loading a version
    pub max_concurrent_fetches: usize,

    /// Retry policy for failed requests
    pub retry_policy: RetryPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: CdnEndpoint::default(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            max_concurrent_fetches: 16,
            retry_policy: RetryPolicy::default(),
        }
    }
}

impl ClientConfig {
    /// Create configuration from environment variables
    ///
    /// Reads `TACTLINE_CDN_HOST`, `TACTLINE_CDN_PATH`, `TACTLINE_CDN_SCHEME`
    /// and the retry variables of [`RetryPolicy::from_env`].
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let endpoint = CdnEndpoint {
            scheme: std::env::var("TACTLINE_CDN_SCHEME").unwrap_or(defaults.endpoint.scheme),
            host: std::env::var("TACTLINE_CDN_HOST").unwrap_or(defaults.endpoint.host),
            path: std::env::var("TACTLINE_CDN_PATH").unwrap_or(defaults.endpoint.path),
        };

        Self {
            endpoint,
            retry_policy: RetryPolicy::from_env(),
            ..defaults
        }
    }

    /// Same configuration against another endpoint
    pub fn with_endpoint(mut self, endpoint: CdnEndpoint) -> Self {
        self.endpoint = endpoint;
        self
    }
}
