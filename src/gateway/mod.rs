//! Collaborators the resolver talks to.
//!
//! These traits enable dependency injection and mocking for tests.
//! Production code uses the concrete clients below, tests substitute the
//! mocks in [`mocks`].
//!
//! - [`MetadataGateway`] - album/artist image URLs ([`RemoteMetadataGateway`]:
//!   Last.fm plus the Cover Art Archive)
//! - [`LocalMediaGateway`] - artwork stored with the user's own files
//!   ([`FileMediaGateway`], [`NoLocalMedia`])
//! - [`ImageTransport`] - raw image downloads ([`HttpTransport`])

use async_trait::async_trait;

pub mod coverart;
mod domain;
pub mod http;
pub mod lastfm;
pub mod local;
mod remote;

#[cfg(test)]
pub mod mocks;

pub use domain::{AlbumInfo, ArtistInfo, ImageSize, ImageUrls};
pub use http::HttpTransport;
pub use local::{FileMediaGateway, NoLocalMedia};
pub use remote::RemoteMetadataGateway;

use crate::artwork::ContentLocator;
use crate::resolver::Priority;

/// Errors from external collaborators.
///
/// `NotFound` means the source answered and has nothing; everything else is
/// treated as transient by the resolver.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GatewayError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP {status}: {reason}")]
    Http { status: u16, reason: String },

    #[error("Rate limited - try again later")]
    RateLimited,

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("API error {code}: {message}")]
    Api { code: i64, message: String },
}

impl GatewayError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, GatewayError::NotFound(_))
    }

    /// Map a non-success HTTP status to an error.
    pub(crate) fn from_status(status: reqwest::StatusCode, what: &str) -> Self {
        match status {
            reqwest::StatusCode::NOT_FOUND => GatewayError::NotFound(what.to_string()),
            reqwest::StatusCode::TOO_MANY_REQUESTS => GatewayError::RateLimited,
            _ => GatewayError::Http {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
            },
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            GatewayError::Parse(err.to_string())
        } else {
            GatewayError::Network(err.to_string())
        }
    }
}

/// Album and artist metadata lookups.
#[async_trait]
pub trait MetadataGateway: Send + Sync {
    /// Look up an album's image URLs and its stable (MusicBrainz) id.
    async fn lookup_album(&self, artist: &str, album: &str) -> Result<AlbumInfo, GatewayError>;

    /// Look up an artist's image URLs.
    async fn lookup_artist(&self, artist: &str) -> Result<ArtistInfo, GatewayError>;

    /// Resolve a stable id to a single high-resolution image URL.
    async fn lookup_high_res_image(&self, stable_id: &str) -> Result<String, GatewayError>;
}

/// Artwork stored alongside local media.
#[async_trait]
pub trait LocalMediaGateway: Send + Sync {
    /// Return the encoded bytes of the artwork for a local locator.
    async fn read_local_art(&self, locator: &ContentLocator) -> Result<Vec<u8>, GatewayError>;
}

/// Raw image downloads.
#[async_trait]
pub trait ImageTransport: Send + Sync {
    async fn download(&self, url: &str, priority: Priority) -> Result<Vec<u8>, GatewayError>;
}
