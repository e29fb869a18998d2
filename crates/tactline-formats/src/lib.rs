//! Table formats behind content-addressed retrieval on TACT CDNs
//!
#![allow(clippy::cast_possible_truncation)] // Intentional for binary format parsing
#![allow(clippy::cast_lossless)] // Sometimes clearer than From
#![allow(clippy::uninlined_format_args)] // Matches tracing call sites
#![allow(clippy::module_name_repetitions)] // Clear naming is preferred
#![allow(clippy::similar_names)] // ckey/ekey pairs
#![allow(clippy::return_self_not_must_use)] // Builder patterns
//! Every table a client needs to turn a content key into bytes is parsed
//! here from a fully buffered byte slice. Parsing is a pure function: no
//! table performs I/O or mutates after construction.
//!
//! # Supported Formats
//!
//! - **Encoding**: content key to encoding key mapping, with decoded sizes
//!   and the encoding key to `ESpec` section
//! - **Archive index**: per-archive `.index` files mapping encoding keys to
//!   offsets inside the archive blob
//! - **Install** and **Download** manifests with tag bitmasks
//! - **Config**: build and CDN configuration text
//! - **BLTE**: the container every encoded object is delivered in
//!
//! # Lookup model
//!
//! ```text
//! ContentKey --encoding--> [EncodingKey, ...] --archive index--> (archive, offset, length)
//!                                   \--------------------------> loose object
//! ```

#![warn(missing_docs)]

/// Archive `.index` files with footer validation and binary-search lookup
pub mod archive;
pub mod blte;
/// Build and CDN configuration tables
pub mod config;
/// Download manifest with per-entry priorities
///
/// Download entries are addressed by encoding key and come before the tag
/// table on the wire.
pub mod download;
/// Encoding table mapping content keys to encoding keys
///
/// The table is split into fixed-size pages. A page summary index holds the
/// first key and MD5 of each page; lookups binary-search that index and
/// then the page. Pages failing their checksum are excluded and reported.
pub mod encoding;
/// Install manifest mapping file paths to content keys
pub mod install;
pub mod keys;
pub mod manifest;

mod util;

pub use archive::{ArchiveId, ArchiveIndex, ArchiveIndexBuilder, ArchiveSpan};
pub use config::{BuildConfig, CdnConfig, ConfigTable, KeyPair};
pub use download::{DownloadEntry, DownloadManifest, DownloadManifestBuilder};
pub use encoding::{EncodingTable, EncodingTableBuilder, PageDegradation};
pub use install::{InstallEntry, InstallManifest, InstallManifestBuilder};
pub use keys::{ContentKey, EncodingKey};
pub use manifest::{Tag, TagType, TaggedManifest};
