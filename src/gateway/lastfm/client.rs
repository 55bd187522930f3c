//! Last.fm HTTP client
//!
//! Handles `album.getinfo` and `artist.getinfo`.
//! See: https://www.last.fm/api
//!
//! Requires an API key. Error 29 means the key is being rate limited.

use serde::de::DeserializeOwned;

use super::dto;
use crate::gateway::{AlbumInfo, ArtistInfo, GatewayError};

/// Last.fm API client
pub struct LastFmClient {
    http_client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl LastFmClient {
    /// Create a new client
    pub fn new(http_client: reqwest::Client, base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            http_client,
            base_url: base_url.into(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        }
    }

    /// Look up an album's images
    pub async fn album_info(&self, artist: &str, album: &str) -> Result<AlbumInfo, GatewayError> {
        let params = self.params("album.getinfo", &[("artist", artist), ("album", album)])?;
        let response: dto::AlbumResponse = self.send(&params, album).await?;
        tracing::debug!(artist, album, mbid = ?response.album.mbid, "Last.fm album found");
        Ok(response.album.into())
    }

    /// Look up an artist's images
    pub async fn artist_info(&self, artist: &str) -> Result<ArtistInfo, GatewayError> {
        let params = self.params("artist.getinfo", &[("artist", artist)])?;
        let response: dto::ArtistResponse = self.send(&params, artist).await?;
        Ok(response.artist.into())
    }

    /// Query parameters for a method call
    fn params(&self, method: &str, args: &[(&str, &str)]) -> Result<Vec<(String, String)>, GatewayError> {
        let api_key = self.api_key.as_deref().ok_or_else(|| GatewayError::Api {
            code: 10,
            message: "No Last.fm API key configured".to_string(),
        })?;

        let mut params = vec![
            ("method".to_string(), method.to_string()),
            ("api_key".to_string(), api_key.to_string()),
        ];
        params.extend(args.iter().map(|(k, v)| (k.to_string(), v.to_string())));
        params.push(("autocorrect".to_string(), "1".to_string()));
        params.push(("format".to_string(), "json".to_string()));
        Ok(params)
    }

    /// Send the HTTP request and parse the response
    async fn send<T: DeserializeOwned>(&self, params: &[(String, String)], what: &str) -> Result<T, GatewayError> {
        let url = format!("{}/", self.base_url.trim_end_matches('/'));

        let response = self.http_client.get(&url).query(params).send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(GatewayError::RateLimited);
        }

        // Error bodies come back with 200 and 4xx alike, so parse before judging the status
        let body = response.text().await?;
        match serde_json::from_str::<dto::Envelope<T>>(&body) {
            Ok(dto::Envelope::Ok(payload)) => Ok(payload),
            Ok(dto::Envelope::Error(err)) => Err(map_api_error(err, what)),
            Err(_) if !status.is_success() => Err(GatewayError::from_status(status, what)),
            Err(e) => Err(GatewayError::Parse(e.to_string())),
        }
    }
}

fn map_api_error(err: dto::ApiError, what: &str) -> GatewayError {
    match err.error {
        dto::ERROR_NOT_FOUND => GatewayError::NotFound(format!("{}: {}", what, err.message)),
        dto::ERROR_RATE_LIMITED => GatewayError::RateLimited,
        code => GatewayError::Api {
            code,
            message: err.message,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(key: Option<&str>) -> LastFmClient {
        LastFmClient::new(
            reqwest::Client::new(),
            "https://ws.audioscrobbler.com/2.0",
            key.map(str::to_string),
        )
    }

    #[test]
    fn test_params_include_method_and_key() {
        let params = client(Some("abc"))
            .params("album.getinfo", &[("artist", "Radiohead"), ("album", "OK Computer")])
            .unwrap();

        let get = |name: &str| {
            params
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.as_str())
        };
        assert_eq!(get("method"), Some("album.getinfo"));
        assert_eq!(get("api_key"), Some("abc"));
        assert_eq!(get("album"), Some("OK Computer"));
        assert_eq!(get("autocorrect"), Some("1"));
        assert_eq!(get("format"), Some("json"));
    }

    #[test]
    fn test_blank_key_is_no_key() {
        let client = client(Some("  "));
        assert!(client.api_key.is_none());
        assert!(matches!(
            client.params("artist.getinfo", &[("artist", "x")]),
            Err(GatewayError::Api { code: 10, .. })
        ));
    }

    #[test]
    fn test_api_error_mapping() {
        let not_found = map_api_error(
            dto::ApiError {
                error: 6,
                message: "Album not found".to_string(),
            },
            "Kid A",
        );
        assert!(not_found.is_not_found());

        let limited = map_api_error(
            dto::ApiError {
                error: 29,
                message: "Rate limit exceeded".to_string(),
            },
            "Kid A",
        );
        assert!(matches!(limited, GatewayError::RateLimited));

        let other = map_api_error(
            dto::ApiError {
                error: 11,
                message: "Service Offline".to_string(),
            },
            "Kid A",
        );
        assert!(matches!(other, GatewayError::Api { code: 11, .. }));
    }
}
