//! HTTP image transport.

use std::time::Duration;

use async_trait::async_trait;

use super::{GatewayError, ImageTransport};
use crate::resolver::Priority;

/// User agent string sent with every request
pub const USER_AGENT: &str = concat!(
    "CoverMinder/",
    env!("CARGO_PKG_VERSION"),
    " (https://github.com/cover-minder)"
);

/// Build the shared HTTP client used by every gateway.
pub fn build_client(timeout: Duration) -> Result<reqwest::Client, GatewayError> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .map_err(|e| GatewayError::Network(format!("Failed to build HTTP client: {}", e)))
}

/// Downloads images over HTTP(S).
#[derive(Clone)]
pub struct HttpTransport {
    http_client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(http_client: reqwest::Client) -> Self {
        Self { http_client }
    }
}

#[async_trait]
impl ImageTransport for HttpTransport {
    async fn download(&self, url: &str, priority: Priority) -> Result<Vec<u8>, GatewayError> {
        let parsed = reqwest::Url::parse(url).map_err(|e| GatewayError::NotFound(format!("{}: {}", url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(GatewayError::NotFound(format!("Unsupported scheme for download: {}", url)));
        }

        tracing::debug!(url, ?priority, "Downloading image");

        let response = self.http_client.get(parsed).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::from_status(status, url));
        }

        let data = response.bytes().await?.to_vec();
        if data.is_empty() {
            return Err(GatewayError::NotFound(format!("Empty image body: {}", url)));
        }
        Ok(data)
    }
}
