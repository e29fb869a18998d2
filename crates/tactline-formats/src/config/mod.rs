//! Build and CDN configuration files
//!
//! Both are plain text, one `key = value` per line. [`ConfigTable`] holds
//! the raw pairs; [`BuildConfig`] and [`CdnConfig`] are typed views over it.

mod build_config;
mod cdn_config;
mod error;
mod table;

pub use build_config::{BuildConfig, KeyPair};
pub use cdn_config::CdnConfig;
pub use error::{ConfigError, Result};
pub use table::ConfigTable;
