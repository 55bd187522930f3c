//! User settings and connectivity, read by the escalation planner.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::config::ArtworkConfig;

/// Artwork download preferences.
pub trait ArtworkSettings: Send + Sync {
    fn download_missing_artwork(&self) -> bool;
    fn download_missing_artist_images(&self) -> bool;
    fn prefer_download_over_local(&self) -> bool;
    fn want_high_resolution_art(&self) -> bool;
}

/// Whether the network may be used right now.
pub trait Connectivity: Send + Sync {
    fn is_online(&self) -> bool;
}

/// Settings that can be flipped at runtime from any thread.
#[derive(Debug, Default)]
pub struct SharedSettings {
    download_missing_artwork: AtomicBool,
    download_missing_artist_images: AtomicBool,
    prefer_download_over_local: AtomicBool,
    want_high_resolution_art: AtomicBool,
}

impl SharedSettings {
    pub fn from_config(config: &ArtworkConfig) -> Self {
        Self {
            download_missing_artwork: AtomicBool::new(config.download_missing_artwork),
            download_missing_artist_images: AtomicBool::new(config.download_missing_artist_images),
            prefer_download_over_local: AtomicBool::new(config.prefer_download_over_local),
            want_high_resolution_art: AtomicBool::new(config.want_high_resolution_art),
        }
    }

    pub fn set_download_missing_artwork(&self, value: bool) {
        self.download_missing_artwork.store(value, Ordering::Relaxed);
    }

    pub fn set_download_missing_artist_images(&self, value: bool) {
        self.download_missing_artist_images.store(value, Ordering::Relaxed);
    }

    pub fn set_prefer_download_over_local(&self, value: bool) {
        self.prefer_download_over_local.store(value, Ordering::Relaxed);
    }

    pub fn set_want_high_resolution_art(&self, value: bool) {
        self.want_high_resolution_art.store(value, Ordering::Relaxed);
    }
}

impl ArtworkSettings for SharedSettings {
    fn download_missing_artwork(&self) -> bool {
        self.download_missing_artwork.load(Ordering::Relaxed)
    }

    fn download_missing_artist_images(&self) -> bool {
        self.download_missing_artist_images.load(Ordering::Relaxed)
    }

    fn prefer_download_over_local(&self) -> bool {
        self.prefer_download_over_local.load(Ordering::Relaxed)
    }

    fn want_high_resolution_art(&self) -> bool {
        self.want_high_resolution_art.load(Ordering::Relaxed)
    }
}

/// Connectivity flag set by the host (or `--offline`).
#[derive(Debug)]
pub struct StaticConnectivity {
    online: AtomicBool,
}

impl StaticConnectivity {
    pub fn new(online: bool) -> Self {
        Self {
            online: AtomicBool::new(online),
        }
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::Relaxed);
    }
}

impl Default for StaticConnectivity {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Connectivity for StaticConnectivity {
    fn is_online(&self) -> bool {
        self.online.load(Ordering::Relaxed)
    }
}
