//! Last.fm API Data Transfer Objects
//!
//! These structs mirror the JSON returned by `album.getinfo` and
//! `artist.getinfo` with `format=json`. They are converted into
//! [`AlbumInfo`]/[`ArtistInfo`] right after parsing.
//!
//! API Reference: https://www.last.fm/api/show/album.getInfo

use serde::Deserialize;

use crate::gateway::{AlbumInfo, ArtistInfo, ImageSize, ImageUrls};

/// Error code returned when the album or artist does not exist
pub const ERROR_NOT_FOUND: i64 = 6;

/// Error code returned when the API key exceeds its rate limit
pub const ERROR_RATE_LIMITED: i64 = 29;

/// Either an error body or the expected payload.
///
/// Last.fm reports errors with HTTP 200 as often as with 4xx.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Envelope<T> {
    Error(ApiError),
    Ok(T),
}

/// `{"error": 6, "message": "Album not found"}`
#[derive(Debug, Clone, Deserialize)]
pub struct ApiError {
    pub error: i64,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct AlbumResponse {
    pub album: Album,
}

#[derive(Debug, Deserialize)]
pub struct Album {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub artist: String,
    #[serde(default)]
    pub mbid: Option<String>,
    #[serde(default)]
    pub image: Vec<Image>,
}

#[derive(Debug, Deserialize)]
pub struct ArtistResponse {
    pub artist: Artist,
}

#[derive(Debug, Deserialize)]
pub struct Artist {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub mbid: Option<String>,
    #[serde(default)]
    pub image: Vec<Image>,
}

/// `{"#text": "https://…/300x300/….png", "size": "extralarge"}`
#[derive(Debug, Deserialize)]
pub struct Image {
    #[serde(rename = "#text", default)]
    pub url: String,
    #[serde(default)]
    pub size: String,
}

fn to_image_urls(images: Vec<Image>) -> ImageUrls {
    let mut urls = ImageUrls::new();
    for image in images {
        if let Some(size) = ImageSize::from_label(&image.size) {
            urls.insert(size, image.url);
        }
    }
    urls
}

impl From<Album> for AlbumInfo {
    fn from(album: Album) -> Self {
        AlbumInfo {
            stable_id: album.mbid.filter(|id| !id.trim().is_empty()),
            images: to_image_urls(album.image),
        }
    }
}

impl From<Artist> for ArtistInfo {
    fn from(artist: Artist) -> Self {
        ArtistInfo {
            images: to_image_urls(artist.image),
        }
    }
}
