//! Artwork stored with the user's own media.
//!
//! Resolution order for a `file://` locator:
//! 1. The locator itself, if it points at an image file
//! 2. Pictures embedded in the audio file's tags
//! 3. Sidecar files (`cover.jpg`, `folder.png`, ...) in the same directory
//!
//! A locator naming a directory only checks sidecar files.

mod embedded;
mod sidecar;

pub use embedded::extract_embedded_cover;
pub use sidecar::{find_sidecar_cover, is_image_file};

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::{GatewayError, LocalMediaGateway};
use crate::artwork::ContentLocator;

/// Reads artwork from local files.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileMediaGateway;

impl FileMediaGateway {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl LocalMediaGateway for FileMediaGateway {
    async fn read_local_art(&self, locator: &ContentLocator) -> Result<Vec<u8>, GatewayError> {
        if locator.url().scheme() != "file" {
            return Err(GatewayError::NotFound(format!("No local index for {}", locator)));
        }
        let path = locator
            .url()
            .to_file_path()
            .map_err(|()| GatewayError::NotFound(format!("Not a file path: {}", locator)))?;

        tokio::task::spawn_blocking(move || read_art_blocking(&path))
            .await
            .map_err(|e| GatewayError::Network(format!("Local media task failed: {}", e)))?
    }
}

fn read_art_blocking(path: &Path) -> Result<Vec<u8>, GatewayError> {
    let not_found = || GatewayError::NotFound(format!("No local artwork for {}", path.display()));

    if path.is_dir() {
        return read_sidecar(path).ok_or_else(not_found);
    }
    if !path.exists() {
        return Err(not_found());
    }

    if is_image_file(path) {
        return std::fs::read(path).map_err(|_| not_found());
    }

    if let Some(data) = extract_embedded_cover(path) {
        tracing::debug!(path = %path.display(), "Using embedded cover");
        return Ok(data);
    }

    path.parent().and_then(read_sidecar).ok_or_else(not_found)
}

fn read_sidecar(dir: &Path) -> Option<Vec<u8>> {
    let cover: PathBuf = find_sidecar_cover(dir)?;
    tracing::debug!(path = %cover.display(), "Using sidecar cover");
    std::fs::read(cover).ok().filter(|data| !data.is_empty())
}

/// Local media disabled: every read is a miss.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLocalMedia;

#[async_trait]
impl LocalMediaGateway for NoLocalMedia {
    async fn read_local_art(&self, locator: &ContentLocator) -> Result<Vec<u8>, GatewayError> {
        Err(GatewayError::NotFound(format!("Local media disabled: {}", locator)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::png_bytes;
    use tempfile::TempDir;

    fn locator(path: &Path) -> ContentLocator {
        ContentLocator::parse(path.to_str().unwrap()).unwrap().unwrap()
    }

    #[tokio::test]
    async fn test_reads_sidecar_next_to_track() {
        let temp = TempDir::new().unwrap();
        let track = temp.path().join("01 - Airbag.flac");
        std::fs::write(&track, b"not really flac").unwrap();
        std::fs::write(temp.path().join("cover.png"), png_bytes(2, 2)).unwrap();

        let data = FileMediaGateway::new().read_local_art(&locator(&track)).await.unwrap();
        assert_eq!(data, png_bytes(2, 2));
    }

    #[tokio::test]
    async fn test_reads_image_locator_directly() {
        let temp = TempDir::new().unwrap();
        let image = temp.path().join("scan.png");
        std::fs::write(&image, png_bytes(1, 1)).unwrap();

        let data = FileMediaGateway::new().read_local_art(&locator(&image)).await.unwrap();
        assert_eq!(data, png_bytes(1, 1));
    }

    #[tokio::test]
    async fn test_directory_locator_uses_sidecar() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("folder.png"), png_bytes(1, 1)).unwrap();

        let result = FileMediaGateway::new().read_local_art(&locator(temp.path())).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_missing_art_is_not_found() {
        let temp = TempDir::new().unwrap();
        let track = temp.path().join("track.mp3");
        std::fs::write(&track, b"audio").unwrap();

        let result = FileMediaGateway::new().read_local_art(&locator(&track)).await;
        assert!(matches!(result, Err(GatewayError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_content_scheme_has_no_index() {
        let locator = ContentLocator::parse("content://media/external/audio/media/12")
            .unwrap()
            .unwrap();
        let result = FileMediaGateway::new().read_local_art(&locator).await;
        assert!(matches!(result, Err(GatewayError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_no_local_media_always_misses() {
        let locator = ContentLocator::parse("/music/track.mp3").unwrap().unwrap();
        let result = NoLocalMedia.read_local_art(&locator).await;
        assert!(result.unwrap_err().is_not_found());
    }
}
