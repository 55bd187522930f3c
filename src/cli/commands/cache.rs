//! Cache maintenance and config commands.

use std::path::{Path, PathBuf};

use super::open_store;
use crate::cache::TierStats;
use crate::config::{self, Config};
use crate::error::{Error, Result};

fn print_tier(name: &str, tier: &TierStats) {
    println!(
        "{:<7} {:>6} / {:<6} entries  {:>10} / {} bytes",
        name, tier.entries, tier.max_entries, tier.bytes, tier.max_bytes
    );
}

/// Print occupancy of both tiers
pub fn cmd_cache_stats(config: &Config) -> anyhow::Result<()> {
    let store = open_store(config)?;
    let stats = store.stats();

    println!("Cache directory: {:?}", store.disk_dir());
    print_tier("memory", &stats.memory);
    print_tier("disk", &stats.disk);
    Ok(())
}

/// Empty both tiers
pub fn cmd_clear_cache(config: &Config) -> anyhow::Result<()> {
    let store = open_store(config)?;
    let before = store.stats().disk.entries;

    if store.clear_all() {
        println!("Cleared {} cached images from {:?}", before, store.disk_dir());
    } else {
        anyhow::bail!("Failed to clear cache at {:?}", store.disk_dir());
    }
    Ok(())
}

/// Write the default configuration
pub fn cmd_init_config(path: Option<&Path>, force: bool) -> anyhow::Result<()> {
    let target = write_default_config(path, force)?;
    println!("Wrote default config to {:?}", target);
    Ok(())
}

fn write_default_config(path: Option<&Path>, force: bool) -> Result<PathBuf> {
    let target = match path {
        Some(path) => path.to_path_buf(),
        None => config::config_path().ok_or_else(|| Error::config("could not determine config directory"))?,
    };

    if target.exists() && !force {
        return Err(Error::config(format!(
            "{} already exists (use --force to overwrite)",
            target.display()
        )));
    }

    config::save_to(&Config::default(), &target)?;
    Ok(target)
}
