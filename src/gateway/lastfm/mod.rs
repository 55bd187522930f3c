//! Last.fm web service: album and artist image lookups.

mod client;
pub mod dto;

pub use client::LastFmClient;
