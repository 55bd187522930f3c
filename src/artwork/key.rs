//! Cache key derivation.
//!
//! Keys look like `#THUMBNAIL#Radiohead#OK Computer` or, for identities that
//! carry no names, `#LARGE#https://example.com/cover.jpg`. The artist/album
//! form is preferred whenever either name is present: it survives changes to
//! the locator of the same logical album and matches keys written by earlier
//! versions (which rendered a missing name as `null`).
//!
//! `#` and `%` inside a name or locator are written as `%23` and `%25`, so
//! the only bare `#` in a body is the one between artist and album.

use std::borrow::Cow;
use std::fmt;

use super::{ArtworkError, ArtworkIdentity, ArtworkKind};

/// Placeholder for a missing name inside a names-based key.
const MISSING_NAME: &str = "null";

/// A derived cache key, always qualified by its [`ArtworkKind`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    kind: ArtworkKind,
    body: String,
}

impl CacheKey {
    pub fn kind(&self) -> ArtworkKind {
        self.kind
    }

    /// The same logical artwork in another namespace.
    pub fn with_kind(&self, kind: ArtworkKind) -> CacheKey {
        CacheKey {
            kind,
            body: self.body.clone(),
        }
    }

    /// Full key string (`#KIND#body`).
    pub fn as_string(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}#{}", self.kind, self.body)
    }
}

/// Derive the cache key for an identity.
///
/// Fails with [`ArtworkError::InvalidIdentity`] when the identity has no
/// artist, no album and no locator.
pub fn derive_key(identity: &ArtworkIdentity, kind: ArtworkKind) -> Result<CacheKey, ArtworkError> {
    let body = match (identity.artist_name(), identity.album_name()) {
        (None, None) => match identity.content_locator() {
            Some(locator) => escape(locator.as_str()).into_owned(),
            None => {
                return Err(ArtworkError::InvalidIdentity(
                    "artist, album and locator are all empty".to_string(),
                ));
            }
        },
        (artist, album) => format!(
            "{}#{}",
            escape(artist.unwrap_or(MISSING_NAME)),
            escape(album.unwrap_or(MISSING_NAME))
        ),
    };

    Ok(CacheKey { kind, body })
}

fn escape(part: &str) -> Cow<'_, str> {
    if part.contains(['#', '%']) {
        Cow::Owned(part.replace('%', "%25").replace('#', "%23"))
    } else {
        Cow::Borrowed(part)
    }
}
