//! Production metadata gateway: Last.fm for lookups, the Cover Art Archive for
//! high-resolution album covers.

use std::time::Duration;

use async_trait::async_trait;

use super::coverart::CoverArtClient;
use super::lastfm::LastFmClient;
use super::{AlbumInfo, ArtistInfo, GatewayError, MetadataGateway, http};
use crate::config::NetworkConfig;

pub struct RemoteMetadataGateway {
    lastfm: LastFmClient,
    coverart: CoverArtClient,
}

impl RemoteMetadataGateway {
    pub fn new(lastfm: LastFmClient, coverart: CoverArtClient) -> Self {
        Self { lastfm, coverart }
    }

    /// Build both clients over one shared HTTP client.
    pub fn from_config(config: &NetworkConfig) -> Result<Self, GatewayError> {
        let http_client = http::build_client(Duration::from_secs(config.request_timeout_secs))?;
        if config.lastfm_api_key.is_none() {
            tracing::warn!("No Last.fm API key configured; network artwork lookups will fail");
        }
        Ok(Self::new(
            LastFmClient::new(
                http_client.clone(),
                config.lastfm_base_url.clone(),
                config.lastfm_api_key.clone(),
            ),
            CoverArtClient::new(http_client, config.coverart_base_url.clone(), config.archive_size),
        ))
    }
}

#[async_trait]
impl MetadataGateway for RemoteMetadataGateway {
    async fn lookup_album(&self, artist: &str, album: &str) -> Result<AlbumInfo, GatewayError> {
        self.lastfm.album_info(artist, album).await
    }

    async fn lookup_artist(&self, artist: &str) -> Result<ArtistInfo, GatewayError> {
        self.lastfm.artist_info(artist).await
    }

    async fn lookup_high_res_image(&self, stable_id: &str) -> Result<String, GatewayError> {
        self.coverart.front_cover_url(stable_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_api_key_fails_without_network() {
        let gateway = RemoteMetadataGateway::from_config(&NetworkConfig::default()).unwrap();
        let result = gateway.lookup_album("Radiohead", "OK Computer").await;
        assert!(matches!(result, Err(GatewayError::Api { code: 10, .. })));
    }
}
