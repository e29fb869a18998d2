//! # tactline-client
//!
//! Content-addressed retrieval against a TACT CDN.
//!
#![allow(clippy::uninlined_format_args)] // Matches tracing call sites
#![allow(clippy::module_name_repetitions)] // Clear naming is preferred
#![allow(clippy::missing_errors_doc)] // Error enums document their variants
#![allow(clippy::cast_possible_truncation)] // Sizes come from 32-bit wire fields
//! A [`VersionManager`] owns every table of one selected build: its build
//! and CDN configuration, the encoding table, the install and download
//! manifests and an [`ArchiveManager`] holding the archive indices. Given a
//! content key it produces a [`RetrievalPlan`] and the
//! [`RetrievalDispatcher`] turns that plan into one request against a
//! [`CdnTransport`].
//!
//! ```text
//! VersionSelection --load--> VersionManager --resolve--> RetrievalPlan
//!                                                          |
//!                             RetrievalDispatcher <--------+
//!                                      |
//!                             CdnTransport (HTTP, memory, ...)
//! ```
//!
//! Tables never mutate after [`VersionManager::load`] returns, so a loaded
//! manager can be shared behind an `Arc` and resolved from many tasks.
//!
//! ## Example
//!
//! ```rust,no_run
//! use tactline_client::{ClientConfig, HttpTransport, RetrievalDispatcher, VersionManager, VersionSelection};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ClientConfig::from_env();
//! let dispatcher = RetrievalDispatcher::new(HttpTransport::new(&config)?);
//! let selection = VersionSelection::from_hex(
//!     "0123456789abcdef0123456789abcdef",
//!     "fedcba9876543210fedcba9876543210",
//! )?;
//! let version = VersionManager::load(&dispatcher, &selection, &config).await?;
//!
//! let ckey = "00112233445566778899aabbccddeeff".parse()?;
//! let bytes = version.retrieve_decoded(&dispatcher, &ckey).await?;
//! println!("{} bytes", bytes.len());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod archive_manager;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod request;
pub mod retry;
pub mod transport;
pub mod version_manager;

pub use archive_manager::{
    ArchiveLoadReport, ArchiveLocation, ArchiveManager, DegradationReason, DegradedArchive,
};
pub use config::{CdnEndpoint, ClientConfig};
pub use dispatcher::RetrievalDispatcher;
pub use error::{FormatError, RetrieveError, TableKind, TransportError, VersionError};
pub use request::{CdnRequest, RetrievalPlan};
pub use retry::RetryPolicy;
pub use transport::{CdnTransport, HttpTransport, MemoryTransport};
pub use version_manager::{
    UnresolvedKey, UnresolvedReason, VersionDegradations, VersionManager, VersionSelection,
};

pub use tactline_formats as formats;
