//! Artwork domain types.
//!
//! - [`ArtworkIdentity`] - the `(artist, album, locator)` tuple a consumer asks for
//! - [`ArtworkKind`] - thumbnail or large; each kind is its own cache namespace
//! - [`CacheKey`] / [`derive_key`] - stable string keys for both cache tiers
//! - [`CachedImage`] - a decoded bitmap plus its encoded bytes
//! - [`ArtworkOutcome`] - what a listener eventually receives

mod identity;
mod bitmap;
mod key;

pub use bitmap::CachedImage;
pub use identity::{ArtworkIdentity, ArtworkKind, ArtworkSubject, ContentLocator};
pub use key::{CacheKey, derive_key};

use crate::gateway::GatewayError;

/// Where a delivered image came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtworkSource {
    /// Tier 1 (in-memory) cache
    MemoryCache,
    /// Tier 2 (on-disk) cache
    DiskCache,
    /// Embedded tags or sidecar files on this device
    LocalMedia,
    /// Metadata lookup followed by an image download
    Network,
    /// The identity's locator, downloaded as-is
    DirectUrl,
}

/// Terminal result handed to every listener of a request.
#[derive(Debug, Clone)]
pub enum ArtworkOutcome {
    /// An image was found
    Delivered {
        image: CachedImage,
        source: ArtworkSource,
    },
    /// Every permitted source was exhausted; show a placeholder
    NoArtwork,
}

impl ArtworkOutcome {
    pub fn image(&self) -> Option<&CachedImage> {
        match self {
            ArtworkOutcome::Delivered { image, .. } => Some(image),
            ArtworkOutcome::NoArtwork => None,
        }
    }

    pub fn source(&self) -> Option<ArtworkSource> {
        match self {
            ArtworkOutcome::Delivered { source, .. } => Some(*source),
            ArtworkOutcome::NoArtwork => None,
        }
    }

    pub fn into_image(self) -> Option<CachedImage> {
        match self {
            ArtworkOutcome::Delivered { image, .. } => Some(image),
            ArtworkOutcome::NoArtwork => None,
        }
    }
}

/// Errors produced while resolving artwork.
///
/// Only `InvalidIdentity` ever reaches a caller as an `Err`; the others drive
/// fallback inside the resolver and end up as [`ArtworkOutcome::NoArtwork`].
#[derive(Debug, Clone, thiserror::Error)]
pub enum ArtworkError {
    #[error("Invalid artwork identity: {0}")]
    InvalidIdentity(String),

    #[error("Transient failure: {0}")]
    Transient(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("No artwork source left to try")]
    Exhausted,
}

impl From<GatewayError> for ArtworkError {
    fn from(err: GatewayError) -> Self {
        if err.is_not_found() {
            ArtworkError::NotFound(err.to_string())
        } else {
            ArtworkError::Transient(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_errors_map_to_artwork_errors() {
        let not_found: ArtworkError = GatewayError::NotFound("album".to_string()).into();
        assert!(matches!(not_found, ArtworkError::NotFound(_)));

        let transient: ArtworkError = GatewayError::RateLimited.into();
        assert!(matches!(transient, ArtworkError::Transient(_)));
    }

    #[test]
    fn test_no_artwork_has_no_image() {
        let outcome = ArtworkOutcome::NoArtwork;
        assert!(outcome.image().is_none());
        assert!(outcome.source().is_none());
        assert!(outcome.into_image().is_none());
    }
}
