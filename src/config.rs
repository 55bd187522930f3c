//! Configuration system using TOML files.
//!
//! Config is stored in the OS-standard config directory:
//! - Windows: %APPDATA%\cover-minder\config.toml
//! - macOS: ~/Library/Application Support/cover-minder/config.toml
//! - Linux: ~/.config/cover-minder/config.toml
//!
//! The config file is human-readable and editable. Every section falls back
//! to defaults for missing fields, so a file containing only an API key is
//! a valid config.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::cache::DiskLimits;
use crate::gateway::coverart::CoverSize;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Cache tier budgets and location
    pub cache: CacheConfig,

    /// Remote services and worker pools
    pub network: NetworkConfig,

    /// Artwork download policy
    pub artwork: ArtworkConfig,
}

/// Cache tier budgets
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum decoded images held in memory
    pub memory_max_entries: usize,

    /// Maximum decoded bytes held in memory
    pub memory_max_bytes: usize,

    /// Maximum files in the disk cache
    pub disk_max_entries: usize,

    /// Maximum total bytes in the disk cache
    pub disk_max_bytes: u64,

    /// Disk entries older than this many days are refetched (0 = never expire)
    pub disk_max_age_days: u32,

    /// Disk cache directory (default: user cache dir)
    pub directory: Option<PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            memory_max_entries: 256,
            memory_max_bytes: 128 * 1024 * 1024,
            disk_max_entries: 4096,
            disk_max_bytes: 256 * 1024 * 1024,
            disk_max_age_days: 90,
            directory: None,
        }
    }
}

impl CacheConfig {
    /// The configured directory, or `<cache dir>/cover-minder/artwork`.
    pub fn directory(&self) -> PathBuf {
        self.directory.clone().unwrap_or_else(|| {
            dirs::cache_dir()
                .unwrap_or_else(|| PathBuf::from(".cache"))
                .join("cover-minder")
                .join("artwork")
        })
    }

    pub fn disk_limits(&self) -> DiskLimits {
        DiskLimits {
            max_entries: self.disk_max_entries,
            max_bytes: self.disk_max_bytes,
            max_age: (self.disk_max_age_days > 0)
                .then(|| chrono::Duration::days(i64::from(self.disk_max_age_days))),
        }
    }
}

/// Remote service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Last.fm API key for album/artist lookups
    pub lastfm_api_key: Option<String>,

    /// Last.fm web service root
    pub lastfm_base_url: String,

    /// Cover Art Archive root
    pub coverart_base_url: String,

    /// Thumbnail size requested from the Cover Art Archive
    pub archive_size: CoverSize,

    /// Concurrent metadata lookups
    pub api_workers: usize,

    /// Concurrent image downloads
    pub image_workers: usize,

    /// Per-request timeout for every HTTP call
    pub request_timeout_secs: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            lastfm_api_key: None,
            lastfm_base_url: "https://ws.audioscrobbler.com/2.0".to_string(),
            coverart_base_url: "https://coverartarchive.org".to_string(),
            archive_size: CoverSize::Large,
            api_workers: 2,
            image_workers: 4,
            request_timeout_secs: 20,
        }
    }
}

/// Artwork download policy (mirrors the user-facing toggles)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtworkConfig {
    /// Download album art that isn't available locally
    pub download_missing_artwork: bool,

    /// Download artist images
    pub download_missing_artist_images: bool,

    /// Try the network before local media when both are possible
    pub prefer_download_over_local: bool,

    /// Allow the largest image tier
    pub want_high_resolution_art: bool,

    /// Read embedded tags and sidecar files for local locators
    pub local_media: bool,
}

impl Default for ArtworkConfig {
    fn default() -> Self {
        Self {
            download_missing_artwork: true,
            download_missing_artist_images: true,
            prefer_download_over_local: false,
            want_high_resolution_art: false,
            local_media: true,
        }
    }
}

// ============================================================================
// Config File Operations
// ============================================================================

/// Get the config directory path
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("cover-minder"))
}

/// Get the full path to the config file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("config.toml"))
}

/// Load configuration from the default location
///
/// Returns default config if file doesn't exist or can't be parsed.
/// Logs warnings but doesn't fail - we always return a usable config.
pub fn load() -> Config {
    let Some(path) = config_path() else {
        tracing::warn!("Could not determine config directory, using defaults");
        return Config::default();
    };
    load_from(&path)
}

/// Load configuration from an explicit path, falling back to defaults
pub fn load_from(path: &Path) -> Config {
    if !path.exists() {
        tracing::info!("No config file found at {:?}, using defaults", path);
        return Config::default();
    }

    match std::fs::read_to_string(path) {
        Ok(contents) => match toml::from_str(&contents) {
            Ok(config) => {
                tracing::info!("Loaded config from {:?}", path);
                config
            }
            Err(e) => {
                tracing::error!("Failed to parse config file {:?}: {}", path, e);
                tracing::warn!("Using default configuration");
                Config::default()
            }
        },
        Err(e) => {
            tracing::error!("Failed to read config file {:?}: {}", path, e);
            Config::default()
        }
    }
}

/// Save configuration to the default location
pub fn save(config: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path().ok_or(ConfigError::NoConfigDir)?;
    save_to(config, &path)?;
    Ok(path)
}

/// Save configuration to an explicit path
///
/// Creates the parent directory if it doesn't exist.
pub fn save_to(config: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|e| ConfigError::CreateDir(dir.to_path_buf(), e))?;
    }

    let contents = toml::to_string_pretty(config).map_err(ConfigError::Serialize)?;

    // Write atomically (write to temp, then rename)
    let temp_path = path.with_extension("toml.tmp");
    std::fs::write(&temp_path, &contents).map_err(|e| ConfigError::Write(temp_path.clone(), e))?;
    std::fs::rename(&temp_path, path)
        .map_err(|e| ConfigError::Rename(temp_path, path.to_path_buf(), e))?;

    tracing::info!("Saved config to {:?}", path);
    Ok(())
}

// ============================================================================
// Error Types
// ============================================================================

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to create config directory {0}: {1}")]
    CreateDir(PathBuf, std::io::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(toml::ser::Error),

    #[error("Failed to write config to {0}: {1}")]
    Write(PathBuf, std::io::Error),

    #[error("Failed to rename temp file {0} to {1}: {2}")]
    Rename(PathBuf, PathBuf, std::io::Error),
}

// ============================================================================
// Tests
// ============================================================================
