//! Every table of one selected build, and content key resolution over them
//!
//! Loading follows the dependency order of the tables: both configs first,
//! then the encoding table and the archive indices side by side, then the
//! install and download manifests. Nothing is mutated once
//! [`VersionManager::load`] returns.

use bytes::Bytes;
use std::fmt;
use tactline_formats::blte;
use tactline_formats::config::ConfigError;
use tactline_formats::{
    BuildConfig, CdnConfig, ContentKey, DownloadEntry, DownloadManifest, EncodingKey,
    EncodingTable, InstallEntry, InstallManifest, KeyPair, PageDegradation, Tag, TaggedManifest,
};
use tracing::{debug, info, warn};

use crate::archive_manager::{ArchiveManager, DegradedArchive};
use crate::config::ClientConfig;
use crate::dispatcher::RetrievalDispatcher;
use crate::error::{FormatError, RetrieveError, TableKind, VersionError};
use crate::request::{CdnRequest, RetrievalPlan};
use crate::transport::CdnTransport;

/// Build and CDN configuration naming one product version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VersionSelection {
    /// Content key of the build configuration
    pub build_config: ContentKey,
    /// Content key of the CDN configuration
    pub cdn_config: ContentKey,
}

impl VersionSelection {
    /// Select a version by its config keys
    pub fn new(build_config: ContentKey, cdn_config: ContentKey) -> Self {
        Self {
            build_config,
            cdn_config,
        }
    }

    /// Select a version by hex config keys, as listed in version tables
    pub fn from_hex(build_config: &str, cdn_config: &str) -> Result<Self, VersionError> {
        let parse = |field: &'static str, hex: &str| {
            hex.parse::<ContentKey>()
                .map_err(|e| VersionError::InvalidConfig {
                    field,
                    reason: format!("'{}' is not a key: {}", hex, e),
                })
        };
        Ok(Self::new(
            parse("build-config", build_config)?,
            parse("cdn-config", cdn_config)?,
        ))
    }
}

/// Why a content key has no retrieval plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnresolvedReason {
    /// The encoding table has no entry for the key
    NotInEncodingTable,
    /// The key falls into an encoding page that failed its checksum
    DegradedPage,
    /// The entry lists no encoding key
    NoEncodingKeys,
}

impl fmt::Display for UnresolvedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotInEncodingTable => write!(f, "not in encoding table"),
            Self::DegradedPage => write!(f, "encoding page failed verification"),
            Self::NoEncodingKeys => write!(f, "no encoding keys"),
        }
    }
}

/// A content key that cannot be retrieved
///
/// This is an expected outcome: encoding tables leave out optional content,
/// so callers typically skip the key and carry on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
#[error("content key {ckey} is unresolved: {reason}")]
pub struct UnresolvedKey {
    /// Key that was looked up
    pub ckey: ContentKey,
    /// Why it failed
    pub reason: UnresolvedReason,
}

/// Regions of a version excluded from lookups
#[derive(Debug, Clone, Copy)]
pub struct VersionDegradations<'a> {
    /// Encoding table pages that failed their checksum
    pub encoding_pages: &'a [PageDegradation],
    /// Archives whose index could not be loaded
    pub archives: &'a [DegradedArchive],
}

impl VersionDegradations<'_> {
    /// True if every table loaded intact
    pub fn is_empty(&self) -> bool {
        self.encoding_pages.is_empty() && self.archives.is_empty()
    }
}

/// Loaded tables of one product version
#[derive(Debug)]
pub struct VersionManager {
    selection: VersionSelection,
    build_config: BuildConfig,
    cdn_config: CdnConfig,
    encoding: EncodingTable,
    install: InstallManifest,
    download: DownloadManifest,
    archives: ArchiveManager,
}

impl VersionManager {
    /// Fetch and parse every table of `selection`
    pub async fn load<T: CdnTransport>(
        dispatcher: &RetrievalDispatcher<T>,
        selection: &VersionSelection,
        config: &ClientConfig,
    ) -> Result<Self, VersionError> {
        let build_request = CdnRequest::Config {
            key: selection.build_config,
        };
        let cdn_request = CdnRequest::Config {
            key: selection.cdn_config,
        };
        let (build_config, cdn_config) = tokio::join!(
            fetch_table(
                dispatcher,
                &build_request,
                TableKind::BuildConfig,
                BuildConfig::parse
            ),
            fetch_table(
                dispatcher,
                &cdn_request,
                TableKind::CdnConfig,
                CdnConfig::parse
            ),
        );
        let (build_config, cdn_config) = (build_config?, cdn_config?);

        let encoding_pair = required(build_config.encoding(), "encoding")?;
        let encoding_ekey =
            encoding_pair
                .encoding_key
                .ok_or_else(|| VersionError::InvalidConfig {
                    field: "encoding",
                    reason: "no encoding key for the encoding table".to_string(),
                })?;
        let archive_ids = cdn_config
            .archives()
            .map_err(|e| VersionError::format(TableKind::CdnConfig, e))?;

        let mut archives =
            ArchiveManager::new().with_max_concurrent_fetches(config.max_concurrent_fetches);
        let encoding_request = CdnRequest::LooseObject { key: encoding_ekey };
        let (encoding, _) = tokio::join!(
            fetch_table(
                dispatcher,
                &encoding_request,
                TableKind::Encoding,
                EncodingTable::parse
            ),
            archives.add_archives(dispatcher, &archive_ids),
        );
        let encoding = encoding?;

        let install_ekey = manifest_ekey(
            &encoding,
            "install",
            required(build_config.install(), "install")?,
        )?;
        let download_ekey = manifest_ekey(
            &encoding,
            "download",
            required(build_config.download(), "download")?,
        )?;
        let install_request = plan_for(&archives, &install_ekey).request();
        let download_request = plan_for(&archives, &download_ekey).request();
        let (install, download) = tokio::join!(
            fetch_table(
                dispatcher,
                &install_request,
                TableKind::Install,
                InstallManifest::parse
            ),
            fetch_table(
                dispatcher,
                &download_request,
                TableKind::Download,
                DownloadManifest::parse
            ),
        );

        let manager = Self::from_parts(
            *selection,
            build_config,
            cdn_config,
            encoding,
            install?,
            download?,
            archives,
        );

        info!(
            "Loaded version {}: {} content keys, {} archives, {} install and {} download entries",
            manager.build_config.build_name().unwrap_or("(unnamed)"),
            manager.encoding.ckey_entry_count(),
            manager.archives.len(),
            manager.install.entries().len(),
            manager.download.entries().len()
        );
        let degradations = manager.degradations();
        if !degradations.is_empty() {
            warn!(
                "Version loaded degraded: {} encoding pages and {} archives excluded",
                degradations.encoding_pages.len(),
                degradations.archives.len()
            );
        }

        Ok(manager)
    }

    /// Assemble a version from tables parsed elsewhere
    pub fn from_parts(
        selection: VersionSelection,
        build_config: BuildConfig,
        cdn_config: CdnConfig,
        encoding: EncodingTable,
        install: InstallManifest,
        download: DownloadManifest,
        archives: ArchiveManager,
    ) -> Self {
        Self {
            selection,
            build_config,
            cdn_config,
            encoding,
            install,
            download,
            archives,
        }
    }

    /// Plan the retrieval of a content key
    ///
    /// The first encoding key of the entry is used. It is fetched from the
    /// first archive holding it, or as a loose object when no archive does.
    pub fn resolve(&self, ckey: &ContentKey) -> Result<RetrievalPlan, UnresolvedKey> {
        let unresolved = |reason| UnresolvedKey { ckey: *ckey, reason };

        let ekeys = self.encoding.lookup(ckey).ok_or_else(|| {
            if self.encoding.covers_degraded_page(ckey) {
                unresolved(UnresolvedReason::DegradedPage)
            } else {
                unresolved(UnresolvedReason::NotInEncodingTable)
            }
        })?;
        let ekey = ekeys
            .first()
            .ok_or_else(|| unresolved(UnresolvedReason::NoEncodingKeys))?;

        Ok(self.resolve_encoded(ekey))
    }

    /// Plan the retrieval of an encoding key; unarchived keys are loose
    pub fn resolve_encoded(&self, ekey: &EncodingKey) -> RetrievalPlan {
        plan_for(&self.archives, ekey)
    }

    /// Fetch the encoded bytes of a content key
    pub async fn retrieve<T: CdnTransport>(
        &self,
        dispatcher: &RetrievalDispatcher<T>,
        ckey: &ContentKey,
    ) -> Result<Bytes, RetrieveError> {
        let plan = self.resolve(ckey)?;
        debug!("Retrieving {} via {:?}", ckey, plan);
        Ok(dispatcher.fetch_plan(&plan).await?)
    }

    /// Fetch a content key and unwrap its BLTE container
    pub async fn retrieve_decoded<T: CdnTransport>(
        &self,
        dispatcher: &RetrievalDispatcher<T>,
        ckey: &ContentKey,
    ) -> Result<Vec<u8>, RetrieveError> {
        let bytes = self.retrieve(dispatcher, ckey).await?;
        if blte::is_blte(&bytes) {
            Ok(blte::decode(&bytes)?)
        } else {
            Ok(bytes.to_vec())
        }
    }

    /// Retrieval plans for the install entries carrying every tag in `tags`
    ///
    /// Unresolved entries are logged and returned so the caller can skip
    /// them.
    pub fn plan_install<'a>(
        &'a self,
        tags: &'a [&'a Tag],
    ) -> Vec<(&'a InstallEntry, Result<RetrievalPlan, UnresolvedKey>)> {
        self.install
            .entries_for_tags(tags)
            .map(|entry| {
                let plan = self.resolve(&entry.content_key);
                if let Err(unresolved) = &plan {
                    warn!("Skipping {}: {}", entry.path, unresolved);
                }
                (entry, plan)
            })
            .collect()
    }

    /// Retrieval plans for every download entry, highest priority first
    pub fn plan_download(&self) -> Vec<(&DownloadEntry, RetrievalPlan)> {
        self.download
            .entries_by_priority()
            .into_iter()
            .map(|entry| (entry, self.resolve_encoded(&entry.encoding_key)))
            .collect()
    }

    /// Config keys this version was loaded from
    pub fn selection(&self) -> &VersionSelection {
        &self.selection
    }

    /// Build configuration
    pub fn build_config(&self) -> &BuildConfig {
        &self.build_config
    }

    /// CDN configuration
    pub fn cdn_config(&self) -> &CdnConfig {
        &self.cdn_config
    }

    /// Encoding table
    pub fn encoding_table(&self) -> &EncodingTable {
        &self.encoding
    }

    /// Install manifest
    pub fn install_manifest(&self) -> &InstallManifest {
        &self.install
    }

    /// Download manifest
    pub fn download_manifest(&self) -> &DownloadManifest {
        &self.download
    }

    /// Archive indices
    pub fn archive_manager(&self) -> &ArchiveManager {
        &self.archives
    }

    /// Encoding pages and archives excluded from lookups
    pub fn degradations(&self) -> VersionDegradations<'_> {
        VersionDegradations {
            encoding_pages: self.encoding.degradations(),
            archives: self.archives.degraded(),
        }
    }
}

fn plan_for(archives: &ArchiveManager, ekey: &EncodingKey) -> RetrievalPlan {
    match archives.resolve(ekey) {
        Some(location) => RetrievalPlan::Archived {
            archive: location.archive,
            offset: location.offset,
            length: location.length,
        },
        None => RetrievalPlan::Loose { ekey: *ekey },
    }
}

fn required(
    pair: Result<Option<KeyPair>, ConfigError>,
    field: &'static str,
) -> Result<KeyPair, VersionError> {
    pair.map_err(|e| VersionError::format(TableKind::BuildConfig, e))?
        .ok_or(VersionError::MissingConfig(field))
}

/// Encoding key of a manifest: from the config pair when present, else
/// the canonical key of its content key
fn manifest_ekey(
    encoding: &EncodingTable,
    field: &'static str,
    pair: KeyPair,
) -> Result<EncodingKey, VersionError> {
    pair.encoding_key
        .or_else(|| encoding.canonical_ekey(&pair.content_key))
        .ok_or_else(|| VersionError::InvalidConfig {
            field,
            reason: format!("content key {} is not in the encoding table", pair.content_key),
        })
}

async fn fetch_table<T, P, E>(
    dispatcher: &RetrievalDispatcher<T>,
    request: &CdnRequest,
    table: TableKind,
    parse: impl FnOnce(&[u8]) -> Result<P, E>,
) -> Result<P, VersionError>
where
    T: CdnTransport,
    E: Into<FormatError>,
{
    let bytes = dispatcher
        .dispatch(request)
        .await
        .map_err(|e| VersionError::transport(table, e))?;

    let decoded;
    let data: &[u8] = if blte::is_blte(&bytes) {
        decoded = blte::decode(&bytes).map_err(|e| VersionError::format(table, e))?;
        &decoded
    } else {
        &bytes
    };

    debug!("Parsing {} ({} bytes)", table, data.len());
    parse(data).map_err(|e| VersionError::format(table, e))
}
