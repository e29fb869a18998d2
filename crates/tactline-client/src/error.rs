//! Error types for retrieval operations

use std::fmt;
use tactline_formats::blte::BlteError;
use tactline_formats::config::ConfigError;
use tactline_formats::download::DownloadError;
use tactline_formats::encoding::EncodingError;
use tactline_formats::install::InstallError;
use thiserror::Error;

use crate::version_manager::UnresolvedKey;

/// Failure reported by a [`CdnTransport`](crate::CdnTransport)
#[derive(Debug, Error)]
pub enum TransportError {
    /// The CDN has no object at this path
    #[error("not found: {0}")]
    NotFound(String),

    /// Non-success HTTP status
    #[error("HTTP status {status} for {path}")]
    Status {
        /// Status code
        status: u16,
        /// CDN-relative path
        path: String,
    },

    /// Connection, TLS or body error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Byte range past the end of the stored object
    #[error("range {offset}+{length} is outside {path} ({size} bytes)")]
    RangeOutOfBounds {
        /// CDN-relative path
        path: String,
        /// Requested offset
        offset: u64,
        /// Requested length
        length: u32,
        /// Size of the stored object
        size: usize,
    },
}

impl TransportError {
    /// True if the object does not exist on the CDN
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound(_) => true,
            Self::Status { status, .. } => *status == 404,
            _ => false,
        }
    }

    /// True for failures worth retrying
    pub fn should_retry(&self) -> bool {
        match self {
            Self::Status { status, .. } => matches!(status, 429 | 500 | 502 | 503 | 504),
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            Self::NotFound(_) | Self::RangeOutOfBounds { .. } => false,
        }
    }
}

/// Table a version load failed on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableKind {
    /// Build configuration
    BuildConfig,
    /// CDN configuration
    CdnConfig,
    /// Encoding table
    Encoding,
    /// Install manifest
    Install,
    /// Download manifest
    Download,
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BuildConfig => write!(f, "build config"),
            Self::CdnConfig => write!(f, "CDN config"),
            Self::Encoding => write!(f, "encoding table"),
            Self::Install => write!(f, "install manifest"),
            Self::Download => write!(f, "download manifest"),
        }
    }
}

/// Parse failure of one table
#[derive(Debug, Error)]
pub enum FormatError {
    /// Encoding table
    #[error(transparent)]
    Encoding(#[from] EncodingError),
    /// Install manifest
    #[error(transparent)]
    Install(#[from] InstallError),
    /// Download manifest
    #[error(transparent)]
    Download(#[from] DownloadError),
    /// Build or CDN configuration
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// BLTE container around a table
    #[error(transparent)]
    Blte(#[from] BlteError),
}

/// Errors that stop a version from loading
#[derive(Debug, Error)]
pub enum VersionError {
    /// A table could not be fetched
    #[error("failed to fetch {table}: {source}")]
    Transport {
        /// Table being fetched
        table: TableKind,
        /// Transport failure
        #[source]
        source: TransportError,
    },

    /// A table could not be parsed
    #[error("failed to parse {table}: {source}")]
    Format {
        /// Table being parsed
        table: TableKind,
        /// Parse failure
        #[source]
        source: FormatError,
    },

    /// The build configuration lacks a required key
    #[error("build config has no '{0}' entry")]
    MissingConfig(&'static str),

    /// A configuration value cannot be used
    #[error("invalid '{field}' in config: {reason}")]
    InvalidConfig {
        /// Config key
        field: &'static str,
        /// What is wrong with it
        reason: String,
    },
}

impl VersionError {
    pub(crate) fn format(table: TableKind, source: impl Into<FormatError>) -> Self {
        Self::Format {
            table,
            source: source.into(),
        }
    }

    pub(crate) fn transport(table: TableKind, source: TransportError) -> Self {
        Self::Transport { table, source }
    }
}

/// Errors from retrieving one content key
#[derive(Debug, Error)]
pub enum RetrieveError {
    /// The key has no retrieval plan
    #[error(transparent)]
    Unresolved(#[from] UnresolvedKey),

    /// The planned request failed
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The fetched bytes are not a valid BLTE frame
    #[error("failed to decode object: {0}")]
    Decode(#[from] BlteError),
}
