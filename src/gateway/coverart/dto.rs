//! Cover Art Archive API Data Transfer Objects
//!
//! The Cover Art Archive (https://coverartarchive.org) provides album artwork
//! for MusicBrainz releases. It's a free service with no API key required.
//!
//! API Reference: https://wiki.musicbrainz.org/Cover_Art_Archive/API

use serde::Deserialize;

use super::CoverSize;

/// Cover art listing for a release
#[derive(Debug, Clone, Deserialize)]
pub struct CoverArtResponse {
    /// Array of images for this release
    pub images: Vec<Image>,
    /// URL of the release on MusicBrainz
    #[serde(default)]
    pub release: String,
}

/// A single cover art image
#[derive(Debug, Clone, Deserialize)]
pub struct Image {
    /// Whether this is the front cover
    #[serde(default)]
    pub front: bool,
    /// Image types (Front, Back, Booklet, etc.)
    #[serde(default)]
    pub types: Vec<String>,
    /// URL to full-size image
    pub image: String,
    /// Thumbnail URLs
    #[serde(default)]
    pub thumbnails: Thumbnails,
}

/// Available thumbnail sizes
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Thumbnails {
    /// 250px thumbnail
    #[serde(rename = "250")]
    pub small: Option<String>,
    /// 500px thumbnail
    #[serde(rename = "500")]
    pub large: Option<String>,
    /// 1200px thumbnail (if available)
    #[serde(rename = "1200")]
    pub xlarge: Option<String>,
}

impl CoverArtResponse {
    /// The front cover, or the first image when none is flagged as front.
    pub fn front(&self) -> Option<&Image> {
        self.images
            .iter()
            .find(|image| image.front)
            .or_else(|| self.images.first())
    }
}

impl Image {
    /// URL for the requested size, falling back to the full image.
    pub fn url_for(&self, size: CoverSize) -> &str {
        let thumbnail = match size {
            CoverSize::Small => self.thumbnails.small.as_deref(),
            CoverSize::Medium => self.thumbnails.large.as_deref(),
            CoverSize::Large => self.thumbnails.xlarge.as_deref(),
            CoverSize::Original => None,
        };
        thumbnail.filter(|url| !url.is_empty()).unwrap_or(&self.image)
    }
}

#[cfg(test)]
mod contract_tests {
    use super::*;

    #[test]
    fn test_parse_cover_art_response() {
        let json = r#"{
            "images": [{
                "front": true,
                "back": false,
                "types": ["Front"],
                "image": "http://coverartarchive.org/release/abc/123.jpg",
                "thumbnails": {
                    "250": "http://coverartarchive.org/release/abc/123-250.jpg",
                    "500": "http://coverartarchive.org/release/abc/123-500.jpg"
                },
                "approved": true,
                "id": "123",
                "comment": ""
            }],
            "release": "https://musicbrainz.org/release/abc"
        }"#;

        let response: CoverArtResponse =
            serde_json::from_str(json).expect("Should parse cover art response");

        assert_eq!(response.images.len(), 1);
        let front = response.front().unwrap();
        assert_eq!(front.types, vec!["Front"]);
        assert_eq!(
            front.url_for(CoverSize::Small),
            "http://coverartarchive.org/release/abc/123-250.jpg"
        );
        // No 1200px thumbnail, so the full image is used
        assert_eq!(
            front.url_for(CoverSize::Large),
            "http://coverartarchive.org/release/abc/123.jpg"
        );
    }

    #[test]
    fn test_parse_minimal_response() {
        let json = r#"{
            "images": [],
            "release": "https://musicbrainz.org/release/xyz"
        }"#;

        let response: CoverArtResponse =
            serde_json::from_str(json).expect("Should parse empty response");

        assert!(response.images.is_empty());
        assert!(response.front().is_none());
    }

    #[test]
    fn test_front_is_preferred_over_first() {
        let json = r#"{
            "images": [
                {
                    "front": false,
                    "types": ["Back"],
                    "image": "http://example.com/back.jpg",
                    "thumbnails": {"250": "http://example.com/back-250.jpg"}
                },
                {
                    "front": true,
                    "types": ["Front"],
                    "image": "http://example.com/front.jpg",
                    "thumbnails": {"1200": "http://example.com/front-1200.jpg"}
                }
            ],
            "release": "https://musicbrainz.org/release/multi"
        }"#;

        let response: CoverArtResponse = serde_json::from_str(json).unwrap();
        let front = response.front().unwrap();
        assert_eq!(front.url_for(CoverSize::Large), "http://example.com/front-1200.jpg");
        assert_eq!(front.url_for(CoverSize::Original), "http://example.com/front.jpg");
    }

    #[test]
    fn test_first_image_when_no_front() {
        let json = r#"{
            "images": [{"image": "http://example.com/only.jpg"}]
        }"#;
        let response: CoverArtResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.front().unwrap().url_for(CoverSize::Medium), "http://example.com/only.jpg");
    }
}
