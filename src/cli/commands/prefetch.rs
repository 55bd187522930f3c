//! Batch cache warming.

use std::path::Path;

use futures::future::join_all;
use tokio::runtime::Runtime;
use tracing::warn;

use super::build_resolver;
use crate::artwork::{ArtworkIdentity, ArtworkKind, ArtworkOutcome};
use crate::config::Config;
use crate::error::{Error, Result, ResultExt};
use crate::resolver::Priority;

/// Parse one `artist<TAB>album` line. Blank lines and `#` comments yield `None`.
fn parse_line(line: &str) -> Option<ArtworkIdentity> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() || line.trim_start().starts_with('#') {
        return None;
    }
    let (artist, album) = match line.split_once('\t') {
        Some((artist, album)) => (artist, Some(album)),
        None => (line, None),
    };
    let identity = ArtworkIdentity::new(Some(artist), album, None);
    (!identity.is_empty()).then_some(identity)
}

/// Read the identities listed in `file`.
fn read_identities(file: &Path) -> Result<Vec<ArtworkIdentity>> {
    if !file.exists() {
        return Err(Error::not_found(file));
    }
    let contents = std::fs::read_to_string(file).with_context(format!("reading {}", file.display()))?;
    Ok(contents.lines().filter_map(parse_line).collect())
}

/// Resolve every line of `file` at low priority, then print coalescing stats
pub fn cmd_prefetch(
    rt: &Runtime,
    config: &Config,
    file: &Path,
    kind: ArtworkKind,
    offline: bool,
) -> anyhow::Result<()> {
    let identities = read_identities(file)?;
    println!("Prefetching {} identities...", identities.len());

    let resolver = build_resolver(rt, config, offline)?;
    let results = rt.block_on(join_all(
        identities
            .into_iter()
            .map(|identity| resolver.resolve_async(identity, kind, Priority::Low)),
    ));

    let mut found = 0;
    let mut missing = 0;
    for result in results {
        match result {
            Ok(ArtworkOutcome::Delivered { .. }) => found += 1,
            Ok(ArtworkOutcome::NoArtwork) => missing += 1,
            Err(e) => {
                warn!("Skipping identity: {}", e);
                missing += 1;
            }
        }
    }

    let stats = resolver.registry_stats();
    println!("\nCompleted: {} found, {} without artwork", found, missing);
    println!(
        "Requests: {} total, {} created, {} coalesced",
        stats.total, stats.created, stats.coalesced
    );
    Ok(())
}
