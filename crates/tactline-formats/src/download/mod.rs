mod builder;
mod entry;
mod error;
mod header;
mod manifest;

pub use builder::DownloadManifestBuilder;
pub use entry::DownloadEntry;
pub use error::{DownloadError, Result};
pub use header::DownloadHeader;
pub use manifest::DownloadManifest;
