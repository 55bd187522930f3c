//! Detect sidecar cover art files next to audio files.
//!
//! Common sidecar filenames:
//! - cover.jpg, cover.png
//! - folder.jpg, folder.png
//! - album.jpg, front.jpg, artwork.jpg

use std::path::{Path, PathBuf};

/// Common cover art filenames (lowercase for matching), in priority order
const COVER_FILENAMES: &[&str] = &[
    "cover",
    "folder",
    "album",
    "front",
    "artwork",
    "albumart",
    "albumartsmall",
];

/// Supported image extensions
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "bmp"];

/// True if the path has an image file extension.
pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
}

/// Find a sidecar cover art file in `dir`.
///
/// Matches names case-insensitively; the earliest name in
/// [`COVER_FILENAMES`] wins when several are present.
pub fn find_sidecar_cover(dir: &Path) -> Option<PathBuf> {
    let entries = std::fs::read_dir(dir).ok()?;

    entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|path| path.is_file() && is_image_file(path))
        .filter_map(|path| {
            let stem = path.file_stem()?.to_str()?.to_lowercase();
            let rank = COVER_FILENAMES.iter().position(|name| *name == stem)?;
            Some((rank, path))
        })
        .min_by(|(a_rank, a_path), (b_rank, b_path)| a_rank.cmp(b_rank).then_with(|| a_path.cmp(b_path)))
        .map(|(_, path)| path)
}
