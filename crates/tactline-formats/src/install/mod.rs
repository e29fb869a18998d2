//! Install manifests list every file of a product with its install path
//! and content key. Tags (platform, architecture, locale, ...) select the
//! subset that belongs on a given machine.
//!
//! ```text
//! header | tags (name\0, type u16, mask) | entries (path\0, ckey, size u32)
//! ```

mod builder;
mod entry;
mod error;
mod header;
mod manifest;

pub use builder::InstallManifestBuilder;
pub use entry::InstallEntry;
pub use error::{InstallError, Result};
pub use header::InstallHeader;
pub use manifest::InstallManifest;
