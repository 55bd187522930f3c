//! Artwork identities: who/what a piece of cover art belongs to.
//!
//! An identity is the `(artist, album, locator)` tuple a consumer hands us.
//! Identities are normalized on construction so that `Some("")`, `Some("  ")`
//! and `None` all mean "absent" - the cache key and the escalation policy
//! never have to care about the difference.

use std::fmt;
use std::path::Path;

use reqwest::Url;

use super::ArtworkError;

/// Which cache namespace (and nominal size) an artwork request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ArtworkKind {
    /// Small grid/list artwork (default)
    #[default]
    Thumbnail,
    /// Full-screen artwork
    Large,
}

impl ArtworkKind {
    /// Upper-case tag used inside cache keys.
    pub fn as_tag(&self) -> &'static str {
        match self {
            ArtworkKind::Thumbnail => "THUMBNAIL",
            ArtworkKind::Large => "LARGE",
        }
    }
}

impl fmt::Display for ArtworkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_tag())
    }
}

/// Whether an identity asks for album art or an artist image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtworkSubject {
    Album,
    Artist,
}

/// A URI pointing at artwork or at media that carries artwork.
///
/// Local locators (`file://`, `content://`) are served by the local media
/// gateway; anything else is treated as a directly downloadable URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentLocator(Url);

impl ContentLocator {
    /// Parse a locator string.
    ///
    /// Empty input is the "no locator" sentinel and yields `Ok(None)`.
    /// Absolute filesystem paths are accepted and turned into `file://` URLs.
    pub fn parse(input: &str) -> Result<Option<Self>, ArtworkError> {
        let input = input.trim();
        if input.is_empty() {
            return Ok(None);
        }

        let path = Path::new(input);
        if path.is_absolute() {
            return Url::from_file_path(path)
                .map(|url| Some(Self(url)))
                .map_err(|_| ArtworkError::InvalidIdentity(format!("bad locator path: {}", input)));
        }

        Url::parse(input)
            .map(|url| Some(Self(url)))
            .map_err(|e| ArtworkError::InvalidIdentity(format!("bad locator {:?}: {}", input, e)))
    }

    /// Wrap an already-parsed URL.
    pub fn from_url(url: Url) -> Self {
        Self(url)
    }

    /// True when the locator points into local storage rather than the network.
    pub fn is_local(&self) -> bool {
        matches!(self.0.scheme(), "file" | "content")
    }

    pub fn url(&self) -> &Url {
        &self.0
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for ContentLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

/// The `(artist, album, locator)` tuple identifying a piece of cover art.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ArtworkIdentity {
    artist_name: Option<String>,
    album_name: Option<String>,
    content_locator: Option<ContentLocator>,
}

impl ArtworkIdentity {
    /// Build an identity from raw parts, normalizing blank names to `None`.
    pub fn new(
        artist_name: Option<&str>,
        album_name: Option<&str>,
        content_locator: Option<ContentLocator>,
    ) -> Self {
        Self {
            artist_name: normalize(artist_name),
            album_name: normalize(album_name),
            content_locator,
        }
    }

    /// Album art for an artist/album pair.
    pub fn album(artist: &str, album: &str) -> Self {
        Self::new(Some(artist), Some(album), None)
    }

    /// Artist image.
    pub fn artist(artist: &str) -> Self {
        Self::new(Some(artist), None, None)
    }

    /// Artwork known only by its locator.
    pub fn locator(locator: ContentLocator) -> Self {
        Self::new(None, None, Some(locator))
    }

    /// Attach a locator to an existing identity.
    pub fn with_locator(mut self, locator: ContentLocator) -> Self {
        self.content_locator = Some(locator);
        self
    }

    pub fn artist_name(&self) -> Option<&str> {
        self.artist_name.as_deref()
    }

    pub fn album_name(&self) -> Option<&str> {
        self.album_name.as_deref()
    }

    pub fn content_locator(&self) -> Option<&ContentLocator> {
        self.content_locator.as_ref()
    }

    /// Both artist and album are present.
    pub fn has_album_artist(&self) -> bool {
        self.artist_name.is_some() && self.album_name.is_some()
    }

    pub fn has_locator(&self) -> bool {
        self.content_locator.is_some()
    }

    /// Nothing at all to resolve from.
    pub fn is_empty(&self) -> bool {
        self.artist_name.is_none() && self.album_name.is_none() && self.content_locator.is_none()
    }

    /// An artist with no album and no locator is a request for an artist image.
    pub fn subject(&self) -> ArtworkSubject {
        if self.artist_name.is_some() && self.album_name.is_none() && self.content_locator.is_none() {
            ArtworkSubject::Artist
        } else {
            ArtworkSubject::Album
        }
    }
}

impl fmt::Display for ArtworkIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - {}",
            self.artist_name.as_deref().unwrap_or("?"),
            self.album_name.as_deref().unwrap_or("?")
        )?;
        if let Some(locator) = &self.content_locator {
            write!(f, " <{}>", locator)?;
        }
        Ok(())
    }
}

fn normalize(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
