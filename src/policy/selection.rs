//! Picking one URL out of the sizes a metadata service offers.

use crate::gateway::{ImageSize, ImageUrls};

/// Largest available URL. `Mega` is only considered when high resolution
/// art is wanted.
pub fn best_url(images: &ImageUrls, want_high_resolution: bool) -> Option<&str> {
    ImageSize::DESCENDING
        .iter()
        .filter(|size| want_high_resolution || **size != ImageSize::Mega)
        .find_map(|size| images.get(*size))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_sizes() -> ImageUrls {
        ImageUrls::new()
            .with(ImageSize::Small, "s")
            .with(ImageSize::Medium, "m")
            .with(ImageSize::Large, "l")
            .with(ImageSize::ExtraLarge, "xl")
            .with(ImageSize::Mega, "mega")
    }

    #[test]
    fn test_skips_mega_unless_wanted() {
        assert_eq!(best_url(&all_sizes(), false), Some("xl"));
        assert_eq!(best_url(&all_sizes(), true), Some("mega"));
    }

    #[test]
    fn test_falls_through_missing_sizes() {
        let urls = ImageUrls::new().with(ImageSize::Small, "s").with(ImageSize::Medium, "m");
        assert_eq!(best_url(&urls, false), Some("m"));
    }

    #[test]
    fn test_only_mega_without_high_res_is_none() {
        let urls = ImageUrls::new().with(ImageSize::Mega, "mega");
        assert_eq!(best_url(&urls, false), None);
        assert_eq!(best_url(&ImageUrls::new(), true), None);
    }
}
