//! Cover Art Archive HTTP client
//!
//! Resolves a MusicBrainz release id to the URL of its front cover.
//! No API key required, but please respect their rate limits.
//!
//! API: https://coverartarchive.org

use serde::{Deserialize, Serialize};

use super::dto;
use crate::gateway::GatewayError;

/// Desired cover art size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoverSize {
    /// 250px thumbnail
    Small,
    /// 500px thumbnail
    Medium,
    /// 1200px thumbnail (default)
    #[default]
    Large,
    /// Original full-size image
    Original,
}

/// Cover Art Archive client
pub struct CoverArtClient {
    http_client: reqwest::Client,
    base_url: String,
    size: CoverSize,
}

impl CoverArtClient {
    /// Create a new client
    pub fn new(http_client: reqwest::Client, base_url: impl Into<String>, size: CoverSize) -> Self {
        Self {
            http_client,
            base_url: base_url.into(),
            size,
        }
    }

    fn release_url(&self, release_id: &str) -> String {
        format!(
            "{}/release/{}",
            self.base_url.trim_end_matches('/'),
            urlencoding::encode(release_id)
        )
    }

    /// Get the front cover URL for a MusicBrainz release
    pub async fn front_cover_url(&self, release_id: &str) -> Result<String, GatewayError> {
        let listing = self.list_cover_art(release_id).await?;
        listing
            .front()
            .map(|image| image.url_for(self.size).to_string())
            .ok_or_else(|| GatewayError::NotFound(format!("No cover art for release {}", release_id)))
    }

    /// List all cover art for a release
    pub async fn list_cover_art(&self, release_id: &str) -> Result<dto::CoverArtResponse, GatewayError> {
        let url = self.release_url(release_id);

        let response = self
            .http_client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::from_status(status, release_id));
        }

        response
            .json::<dto::CoverArtResponse>()
            .await
            .map_err(|e| GatewayError::Parse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_release_url() {
        let client = CoverArtClient::new(reqwest::Client::new(), "https://coverartarchive.org/", CoverSize::Large);
        assert_eq!(
            client.release_url("0b6b4ba0-d36f"),
            "https://coverartarchive.org/release/0b6b4ba0-d36f"
        );
    }

    #[test]
    fn test_cover_size_default() {
        assert_eq!(CoverSize::default(), CoverSize::Large);
    }

    #[test]
    fn test_cover_size_serde_names() {
        #[derive(Deserialize)]
        struct Wrapper {
            size: CoverSize,
        }
        let parsed: Wrapper = toml::from_str("size = \"original\"").unwrap();
        assert_eq!(parsed.size, CoverSize::Original);
    }
}
