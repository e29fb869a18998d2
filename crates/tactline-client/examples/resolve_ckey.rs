#![allow(clippy::uninlined_format_args)]

//! Resolve content keys of a published build against a CDN.
//!
//! Loads the build named by its build and CDN config keys, prints where
//! each content key lives and optionally writes the decoded file.
//!
//! Usage:
//!   cargo run --example resolve_ckey -p tactline-client -- \
//!       <build-config> <cdn-config> <ckey> [<ckey> ...] [--out <dir>]
//!
//! The CDN endpoint comes from TACTLINE_CDN_HOST, TACTLINE_CDN_PATH and
//! TACTLINE_CDN_SCHEME. Set RUST_LOG=tactline_client=debug for load details.

use anyhow::{Context, Result, bail};
use std::path::PathBuf;
use tactline_client::formats::ContentKey;
use tactline_client::{
    ClientConfig, HttpTransport, RetrievalDispatcher, RetrievalPlan, VersionManager,
    VersionSelection,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let _ = rustls::crypto::ring::default_provider().install_default();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let out_dir = match args.iter().position(|a| a == "--out") {
        Some(i) => {
            let dir = args
                .get(i + 1)
                .map(PathBuf::from)
                .context("--out needs a directory")?;
            args.drain(i..=i + 1);
            Some(dir)
        }
        None => None,
    };
    if args.len() < 3 {
        bail!("usage: resolve_ckey <build-config> <cdn-config> <ckey>... [--out <dir>]");
    }

    let config = ClientConfig::from_env();
    println!("CDN: {}", config.endpoint.url(""));
    let dispatcher = RetrievalDispatcher::new(HttpTransport::new(&config)?);
    let selection = VersionSelection::from_hex(&args[0], &args[1])?;

    let version = VersionManager::load(&dispatcher, &selection, &config)
        .await
        .context("failed to load version")?;
    println!(
        "Build {}: {} content keys in {} archives",
        version.build_config().build_name().unwrap_or("(unnamed)"),
        version.encoding_table().ckey_entry_count(),
        version.archive_manager().len()
    );
    let degradations = version.degradations();
    if !degradations.is_empty() {
        println!(
            "  degraded: {} encoding pages, {} archives",
            degradations.encoding_pages.len(),
            degradations.archives.len()
        );
    }
    println!();

    for hex in &args[2..] {
        let ckey: ContentKey = hex
            .parse()
            .with_context(|| format!("'{}' is not a content key", hex))?;

        match version.resolve(&ckey) {
            Ok(RetrievalPlan::Archived {
                archive,
                offset,
                length,
            }) => println!("{} -> archive {} @ {} ({} bytes)", ckey, archive, offset, length),
            Ok(RetrievalPlan::Loose { ekey }) => println!("{} -> loose {}", ckey, ekey),
            Err(unresolved) => {
                println!("{} -> {}", ckey, unresolved.reason);
                continue;
            }
        }

        if let Some(dir) = &out_dir {
            let data = version.retrieve_decoded(&dispatcher, &ckey).await?;
            let path = dir.join(ckey.to_hex());
            tokio::fs::write(&path, &data)
                .await
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("  wrote {} bytes to {}", data.len(), path.display());
        }
    }

    Ok(())
}
