//! Cover Art Archive: high-resolution covers keyed by MusicBrainz release id.

mod client;
pub mod dto;

pub use client::{CoverArtClient, CoverSize};
