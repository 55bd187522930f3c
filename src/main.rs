//! Cover Minder - cover art resolution and caching.
//!
//! Resolves album art and artist images from a two-tier cache, local media
//! and remote metadata services, coalescing concurrent requests for the same
//! artwork into a single fetch.

pub mod artwork;
pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod gateway;
pub mod policy;
pub mod resolver;
#[cfg(test)]
pub mod test_utils;

use clap::Parser;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();

    // Initialize logging
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy()
        .add_directive("cover_minder=info".parse()?);
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(filter)
        .init();

    cli::run_command(&args)
}
