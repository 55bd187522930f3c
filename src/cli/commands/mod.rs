//! CLI command definitions and dispatch.
//!
//! Each subcommand is implemented in its own submodule:
//! - `resolve`: Resolve one identity and optionally save the image
//! - `prefetch`: Warm the cache from an artist/album list
//! - `cache`: Cache statistics, clearing and config initialization

mod cache;
mod prefetch;
mod resolve;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use tokio::runtime::Runtime;

use crate::artwork::ArtworkKind;
use crate::cache::CacheStore;
use crate::config::{self, Config};
use crate::error::{Result, ResultExt};
use crate::gateway::{
    FileMediaGateway, HttpTransport, LocalMediaGateway, NoLocalMedia, RemoteMetadataGateway, http,
};
use crate::policy::{SharedSettings, StaticConnectivity};
use crate::resolver::{ArtworkResolver, Collaborators, Priority, ResolverOptions};

pub use cache::{cmd_cache_stats, cmd_clear_cache, cmd_init_config};
pub use prefetch::cmd_prefetch;
pub use resolve::cmd_resolve;

/// Cover Minder CLI
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file (default: platform config dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Last.fm API key (overrides the config file)
    #[arg(long, env = "LASTFM_API_KEY", global = true, hide_env_values = true)]
    pub lastfm_api_key: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Resolve artwork for one identity
    Resolve {
        /// Artist name
        #[arg(long)]
        artist: Option<String>,
        /// Album name (omit for an artist image)
        #[arg(long)]
        album: Option<String>,
        /// Media file, directory or URL the artwork belongs to
        #[arg(long)]
        locator: Option<String>,
        /// Which cache namespace to resolve into
        #[arg(long, value_enum, default_value = "thumbnail")]
        kind: KindArg,
        /// Scheduling priority
        #[arg(long, value_enum, default_value = "normal")]
        priority: PriorityArg,
        /// Treat the network as unavailable
        #[arg(long)]
        offline: bool,
        /// Write the encoded image here
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Warm the cache from a file of `artist<TAB>album` lines
    Prefetch {
        /// Input file
        file: PathBuf,
        /// Which cache namespace to warm
        #[arg(long, value_enum, default_value = "thumbnail")]
        kind: KindArg,
        /// Treat the network as unavailable
        #[arg(long)]
        offline: bool,
    },
    /// Show cache occupancy
    CacheStats,
    /// Empty both cache tiers
    ClearCache,
    /// Write a default config file
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// `--kind` values
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KindArg {
    Thumbnail,
    Large,
}

impl From<KindArg> for ArtworkKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Thumbnail => ArtworkKind::Thumbnail,
            KindArg::Large => ArtworkKind::Large,
        }
    }
}

/// `--priority` values
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PriorityArg {
    Background,
    Low,
    Normal,
    High,
    Immediate,
}

impl From<PriorityArg> for Priority {
    fn from(priority: PriorityArg) -> Self {
        match priority {
            PriorityArg::Background => Priority::Background,
            PriorityArg::Low => Priority::Low,
            PriorityArg::Normal => Priority::Normal,
            PriorityArg::High => Priority::High,
            PriorityArg::Immediate => Priority::Immediate,
        }
    }
}

/// Run the specified CLI command.
pub fn run_command(cli: &Cli) -> anyhow::Result<()> {
    let config = load_config(cli);

    match &cli.command {
        Commands::Resolve {
            artist,
            album,
            locator,
            kind,
            priority,
            offline,
            output,
        } => {
            let rt = Runtime::new()?;
            cmd_resolve(
                &rt,
                &config,
                resolve::ResolveArgs {
                    artist: artist.as_deref(),
                    album: album.as_deref(),
                    locator: locator.as_deref(),
                    kind: (*kind).into(),
                    priority: (*priority).into(),
                    offline: *offline,
                    output: output.as_deref(),
                },
            )
        }
        Commands::Prefetch { file, kind, offline } => {
            let rt = Runtime::new()?;
            cmd_prefetch(&rt, &config, file, (*kind).into(), *offline)
        }
        Commands::CacheStats => cmd_cache_stats(&config),
        Commands::ClearCache => cmd_clear_cache(&config),
        Commands::InitConfig { force } => cmd_init_config(cli.config.as_deref(), *force),
    }
}

fn load_config(cli: &Cli) -> Config {
    let mut config = match &cli.config {
        Some(path) => config::load_from(path),
        None => config::load(),
    };
    if let Some(key) = &cli.lastfm_api_key {
        config.network.lastfm_api_key = Some(key.clone());
    }
    config
}

/// Open both cache tiers as configured.
fn open_store(config: &Config) -> Result<CacheStore> {
    CacheStore::from_config(&config.cache).with_context("opening artwork cache")
}

/// Wire the production collaborators into a resolver running on `rt`.
fn build_resolver(rt: &Runtime, config: &Config, offline: bool) -> Result<ArtworkResolver> {
    let store = Arc::new(open_store(config)?);
    let metadata = Arc::new(
        RemoteMetadataGateway::from_config(&config.network).with_context("configuring metadata services")?,
    );
    let http_client = http::build_client(std::time::Duration::from_secs(config.network.request_timeout_secs))
        .with_context("building image download client")?;
    let local_media: Arc<dyn LocalMediaGateway> = if config.artwork.local_media {
        Arc::new(FileMediaGateway::new())
    } else {
        Arc::new(NoLocalMedia)
    };

    let resolver = ArtworkResolver::new(
        store,
        Collaborators {
            metadata,
            local_media,
            transport: Arc::new(HttpTransport::new(http_client)),
            settings: Arc::new(SharedSettings::from_config(&config.artwork)),
            connectivity: Arc::new(StaticConnectivity::new(!offline)),
        },
        ResolverOptions::from(&config.network),
        rt.handle().clone(),
    )
    .with_context("starting artwork resolver")?;
    Ok(resolver)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_resolve() {
        let cli = Cli::try_parse_from([
            "cover-minder",
            "resolve",
            "--artist",
            "Radiohead",
            "--album",
            "OK Computer",
            "--kind",
            "large",
            "--priority",
            "immediate",
        ])
        .unwrap();

        match cli.command {
            Commands::Resolve {
                artist,
                album,
                kind,
                priority,
                offline,
                ..
            } => {
                assert_eq!(artist.as_deref(), Some("Radiohead"));
                assert_eq!(album.as_deref(), Some("OK Computer"));
                assert_eq!(ArtworkKind::from(kind), ArtworkKind::Large);
                assert_eq!(Priority::from(priority), Priority::Immediate);
                assert!(!offline);
            }
            _ => panic!("Expected resolve"),
        }
    }

    #[test]
    fn test_parse_global_config_after_subcommand() {
        let cli =
            Cli::try_parse_from(["cover-minder", "cache-stats", "--config", "/tmp/c.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.toml")));
        assert!(matches!(cli.command, Commands::CacheStats));
    }

    #[test]
    fn test_subcommand_required() {
        assert!(Cli::try_parse_from(["cover-minder"]).is_err());
    }

    #[test]
    fn test_api_key_flag_overrides_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let cli = Cli::try_parse_from([
            "cover-minder",
            "--config",
            path.to_str().unwrap(),
            "--lastfm-api-key",
            "abc123",
            "cache-stats",
        ])
        .unwrap();

        let config = load_config(&cli);
        assert_eq!(config.network.lastfm_api_key.as_deref(), Some("abc123"));
    }

    #[test]
    fn test_unusable_cache_directory_names_the_step() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-directory");
        std::fs::write(&blocker, b"file in the way").unwrap();
        let mut config = Config::default();
        config.cache.directory = Some(blocker.join("artwork"));

        let err = open_store(&config).err().unwrap();
        assert!(matches!(err, crate::error::Error::WithContext { .. }));
        assert!(err.to_string().starts_with("opening artwork cache"));
    }
}
