//! Single-identity resolve command.

use std::path::Path;

use tokio::runtime::Runtime;

use super::build_resolver;
use crate::artwork::{ArtworkIdentity, ArtworkKind, ArtworkOutcome, ContentLocator};
use crate::config::Config;
use crate::error::{Result, ResultExt};
use crate::resolver::Priority;

pub struct ResolveArgs<'a> {
    pub artist: Option<&'a str>,
    pub album: Option<&'a str>,
    pub locator: Option<&'a str>,
    pub kind: ArtworkKind,
    pub priority: Priority,
    pub offline: bool,
    pub output: Option<&'a Path>,
}

impl ResolveArgs<'_> {
    fn identity(&self) -> Result<ArtworkIdentity> {
        let locator = match self.locator {
            Some(raw) => ContentLocator::parse(raw)?,
            None => None,
        };
        Ok(ArtworkIdentity::new(self.artist, self.album, locator))
    }
}

/// Resolve artwork for one identity and report where it came from
pub fn cmd_resolve(rt: &Runtime, config: &Config, args: ResolveArgs<'_>) -> anyhow::Result<()> {
    let identity = args.identity()?;

    let resolver = build_resolver(rt, config, args.offline)?;
    let outcome = rt.block_on(resolver.resolve_async(identity, args.kind, args.priority))?;

    match outcome {
        ArtworkOutcome::Delivered { image, source } => {
            println!(
                "Found {}x{} {} ({:?})",
                image.width(),
                image.height(),
                image.mime_type(),
                source
            );
            if let Some(path) = args.output {
                std::fs::write(path, image.encoded()).with_context(format!("writing {}", path.display()))?;
                println!("Saved to {:?}", path);
            }
        }
        ArtworkOutcome::NoArtwork => {
            println!("No artwork found");
        }
    }
    Ok(())
}
