//! Extract cover art embedded in audio file tags.
//!
//! Uses lofty to read picture data from:
//! - ID3v2 tags (MP3)
//! - Vorbis comments (FLAC, OGG)
//! - MP4 atoms (M4A/AAC)

use lofty::file::TaggedFileExt;
use lofty::picture::PictureType;
use lofty::probe::Probe;
use std::path::Path;

/// Extract the front cover from embedded tags.
///
/// Only reads the tag data. Returns None if no cover art is embedded or the
/// file can't be read.
pub fn extract_embedded_cover(path: &Path) -> Option<Vec<u8>> {
    let tagged_file = Probe::open(path).ok()?.read().ok()?;

    let tag = tagged_file
        .primary_tag()
        .or_else(|| tagged_file.first_tag())?;

    // Prefer front cover, fall back to first picture
    let pictures = tag.pictures();
    let picture = pictures
        .iter()
        .find(|p| p.pic_type() == PictureType::CoverFront)
        .or_else(|| pictures.first())?;

    let data = picture.data();
    (!data.is_empty()).then(|| data.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_extract_from_nonexistent_file() {
        assert!(extract_embedded_cover(Path::new("nonexistent.mp3")).is_none());
    }

    #[test]
    fn test_extract_from_non_audio_file() {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        writeln!(file, "Not an audio file").expect("Failed to write");

        assert!(extract_embedded_cover(file.path()).is_none());
    }
}
