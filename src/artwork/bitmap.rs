//! Decoded artwork images.

use std::fmt;
use std::sync::Arc;

use image::{ImageFormat, RgbaImage};

/// A decoded image plus the encoded bytes it came from.
///
/// Cloning is cheap (one `Arc`); the pixels are never mutated once decoded.
#[derive(Clone)]
pub struct CachedImage {
    inner: Arc<Inner>,
}

struct Inner {
    pixels: RgbaImage,
    encoded: Vec<u8>,
    format: Option<ImageFormat>,
}

impl CachedImage {
    /// Decode encoded image bytes (JPEG, PNG, GIF, BMP, WebP).
    pub fn decode(encoded: Vec<u8>) -> Result<Self, image::ImageError> {
        let format = image::guess_format(&encoded).ok();
        let pixels = image::load_from_memory(&encoded)?.into_rgba8();
        Ok(Self {
            inner: Arc::new(Inner {
                pixels,
                encoded,
                format,
            }),
        })
    }

    pub fn width(&self) -> u32 {
        self.inner.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.inner.pixels.height()
    }

    /// Decoded RGBA pixels.
    pub fn pixels(&self) -> &RgbaImage {
        &self.inner.pixels
    }

    /// The original encoded bytes (what the disk tier stores).
    pub fn encoded(&self) -> &[u8] {
        &self.inner.encoded
    }

    /// Size of the decoded bitmap in bytes.
    pub fn byte_size(&self) -> usize {
        self.inner.pixels.as_raw().len()
    }

    /// MIME type of the encoded bytes.
    pub fn mime_type(&self) -> &'static str {
        match self.inner.format {
            Some(ImageFormat::Png) => "image/png",
            Some(ImageFormat::Gif) => "image/gif",
            Some(ImageFormat::Bmp) => "image/bmp",
            Some(ImageFormat::WebP) => "image/webp",
            _ => "image/jpeg",
        }
    }

    /// File extension matching [`Self::mime_type`].
    pub fn extension(&self) -> &'static str {
        match self.inner.format {
            Some(ImageFormat::Png) => "png",
            Some(ImageFormat::Gif) => "gif",
            Some(ImageFormat::Bmp) => "bmp",
            Some(ImageFormat::WebP) => "webp",
            _ => "jpg",
        }
    }

    /// True if both handles share the same decoded image.
    pub fn ptr_eq(&self, other: &CachedImage) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for CachedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedImage")
            .field("width", &self.width())
            .field("height", &self.height())
            .field("mime_type", &self.mime_type())
            .field("encoded_len", &self.inner.encoded.len())
            .finish()
    }
}
