//! Gateway-level domain models.
//!
//! These types are OUR types - they don't change when external APIs change.
//! Service responses get converted into these types by each client.

use std::collections::BTreeMap;

/// Image resolutions offered by metadata services, smallest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ImageSize {
    Small,
    Medium,
    Large,
    ExtraLarge,
    Mega,
}

impl ImageSize {
    /// Every size, largest first.
    pub const DESCENDING: [ImageSize; 5] = [
        ImageSize::Mega,
        ImageSize::ExtraLarge,
        ImageSize::Large,
        ImageSize::Medium,
        ImageSize::Small,
    ];

    /// Parse a Last.fm size label.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.to_ascii_lowercase().as_str() {
            "small" => Some(ImageSize::Small),
            "medium" => Some(ImageSize::Medium),
            "large" => Some(ImageSize::Large),
            "extralarge" => Some(ImageSize::ExtraLarge),
            "mega" => Some(ImageSize::Mega),
            _ => None,
        }
    }
}

/// Image URLs keyed by resolution. Blank URLs are never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageUrls(BTreeMap<ImageSize, String>);

impl ImageUrls {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, size: ImageSize, url: impl Into<String>) {
        let url = url.into();
        if !url.trim().is_empty() {
            self.0.insert(size, url);
        }
    }

    pub fn with(mut self, size: ImageSize, url: impl Into<String>) -> Self {
        self.insert(size, url);
        self
    }

    pub fn get(&self, size: ImageSize) -> Option<&str> {
        self.0.get(&size).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

/// Album entry returned by a metadata service
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlbumInfo {
    /// MusicBrainz release id, when the service knows it
    pub stable_id: Option<String>,
    pub images: ImageUrls,
}

/// Artist entry returned by a metadata service
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtistInfo {
    pub images: ImageUrls,
}
