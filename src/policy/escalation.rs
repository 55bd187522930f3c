//! Which sources to try, and in what order, after both caches missed.
//!
//! The album rules are a table evaluated top to bottom; the first matching
//! row decides the plan. Flags are snapshotted once per request so a setting
//! flipped mid-request cannot change a plan halfway through.

use bitflags::bitflags;

use super::settings::{ArtworkSettings, Connectivity};
use crate::artwork::{ArtworkIdentity, ArtworkSubject};

/// One source in a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// Embedded tags or sidecar files behind the locator
    LocalMedia,
    /// Album lookup, URL selection, download
    Network,
    /// Download the locator itself
    DirectUrl,
    /// Artist lookup, URL selection, download
    ArtistNetwork,
}

impl Source {
    pub fn flag(self) -> Attempted {
        match self {
            Source::LocalMedia => Attempted::LOCAL_MEDIA,
            Source::Network => Attempted::NETWORK,
            Source::DirectUrl => Attempted::DIRECT_URL,
            Source::ArtistNetwork => Attempted::ARTIST_NETWORK,
        }
    }
}

bitflags! {
    /// Sources already tried by a request.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Attempted: u8 {
        const LOCAL_MEDIA = 1 << 0;
        const NETWORK = 1 << 1;
        const DIRECT_URL = 1 << 2;
        const ARTIST_NETWORK = 1 << 3;
    }
}

/// Settings and connectivity captured at escalation start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PolicyFlags {
    pub online: bool,
    pub download_missing_artwork: bool,
    pub download_missing_artist_images: bool,
    pub prefer_download_over_local: bool,
    pub want_high_resolution_art: bool,
}

impl PolicyFlags {
    pub fn snapshot(settings: &dyn ArtworkSettings, connectivity: &dyn Connectivity) -> Self {
        Self {
            online: connectivity.is_online(),
            download_missing_artwork: settings.download_missing_artwork(),
            download_missing_artist_images: settings.download_missing_artist_images(),
            prefer_download_over_local: settings.prefer_download_over_local(),
            want_high_resolution_art: settings.want_high_resolution_art(),
        }
    }
}

/// Facts about the identity that the album table branches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Facts {
    pub has_album_artist: bool,
    pub has_locator: bool,
    pub is_local: bool,
}

impl Facts {
    pub fn of(identity: &ArtworkIdentity) -> Self {
        Self {
            has_album_artist: identity.has_album_artist(),
            has_locator: identity.has_locator(),
            is_local: identity.content_locator().is_some_and(|l| l.is_local()),
        }
    }
}

/// Ordered sources to try; empty means exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Plan {
    pub steps: &'static [Source],
    /// 1-based table row that produced the plan, for logging
    pub rule: Option<usize>,
}

impl Plan {
    pub const EXHAUSTED: Plan = Plan { steps: &[], rule: None };

    pub fn is_exhausted(&self) -> bool {
        self.steps.is_empty()
    }
}

/// A table cell: must be true, must be false, or don't care.
#[derive(Debug, Clone, Copy)]
enum Cell {
    T,
    F,
    Any,
}

impl Cell {
    fn matches(self, value: bool) -> bool {
        match self {
            Cell::T => value,
            Cell::F => !value,
            Cell::Any => true,
        }
    }
}

struct Rule {
    has_album_artist: Cell,
    has_locator: Cell,
    online: Cell,
    want_network: Cell,
    prefer_network: Cell,
    is_local: Cell,
    steps: &'static [Source],
}

impl Rule {
    fn matches(&self, facts: Facts, flags: PolicyFlags) -> bool {
        self.has_album_artist.matches(facts.has_album_artist)
            && self.has_locator.matches(facts.has_locator)
            && self.online.matches(flags.online)
            && self.want_network.matches(flags.download_missing_artwork)
            && self.prefer_network.matches(flags.prefer_download_over_local)
            && self.is_local.matches(facts.is_local)
    }
}

use Cell::{Any, F, T};
use Source::{DirectUrl, LocalMedia, Network};

const fn rule(
    has_album_artist: Cell,
    has_locator: Cell,
    online: Cell,
    want_network: Cell,
    prefer_network: Cell,
    is_local: Cell,
    steps: &'static [Source],
) -> Rule {
    Rule {
        has_album_artist,
        has_locator,
        online,
        want_network,
        prefer_network,
        is_local,
        steps,
    }
}

#[rustfmt::skip]
const ALBUM_RULES: &[Rule] = &[
    //   album+artist  locator  online  want  prefer  local
    rule(T,            T,       T,      T,    F,      T,    &[LocalMedia, Network]),
    rule(T,            T,       T,      T,    Any,    F,    &[Network]),
    rule(T,            T,       T,      T,    T,      T,    &[Network, LocalMedia]),
    rule(T,            T,       T,      F,    Any,    F,    &[DirectUrl]),
    rule(T,            T,       F,      Any,  F,      T,    &[LocalMedia]),
    rule(T,            F,       T,      Any,  Any,    Any,  &[Network]),
    rule(F,            T,       Any,    Any,  Any,    T,    &[LocalMedia]),
    rule(F,            T,       T,      Any,  Any,    F,    &[DirectUrl]),
];

/// Choose the plan for an identity under a flag snapshot.
pub fn plan_for(identity: &ArtworkIdentity, flags: PolicyFlags) -> Plan {
    match identity.subject() {
        ArtworkSubject::Artist => artist_plan(identity, flags),
        ArtworkSubject::Album => album_plan(Facts::of(identity), flags),
    }
}

fn album_plan(facts: Facts, flags: PolicyFlags) -> Plan {
    ALBUM_RULES
        .iter()
        .position(|rule| rule.matches(facts, flags))
        .map(|index| Plan {
            steps: ALBUM_RULES[index].steps,
            rule: Some(index + 1),
        })
        .unwrap_or(Plan::EXHAUSTED)
}

fn artist_plan(identity: &ArtworkIdentity, flags: PolicyFlags) -> Plan {
    if flags.online && flags.download_missing_artist_images && identity.artist_name().is_some() {
        Plan {
            steps: &[Source::ArtistNetwork],
            rule: None,
        }
    } else {
        Plan::EXHAUSTED
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artwork::ContentLocator;

    fn flags(online: bool, want: bool, prefer: bool) -> PolicyFlags {
        PolicyFlags {
            online,
            download_missing_artwork: want,
            download_missing_artist_images: true,
            prefer_download_over_local: prefer,
            want_high_resolution_art: false,
        }
    }

    fn local() -> ContentLocator {
        ContentLocator::parse("file:///music/ok/01.flac").unwrap().unwrap()
    }

    fn remote() -> ContentLocator {
        ContentLocator::parse("https://cdn.example.com/art.jpg").unwrap().unwrap()
    }

    fn album() -> ArtworkIdentity {
        ArtworkIdentity::album("Radiohead", "OK Computer")
    }

    #[test]
    fn test_local_album_tries_local_media_first() {
        let plan = plan_for(&album().with_locator(local()), flags(true, true, false));
        assert_eq!(plan.steps, &[Source::LocalMedia, Source::Network]);
        assert_eq!(plan.rule, Some(1));
    }

    #[test]
    fn test_local_album_preferring_network() {
        let plan = plan_for(&album().with_locator(local()), flags(true, true, true));
        assert_eq!(plan.steps, &[Source::Network, Source::LocalMedia]);
    }

    #[test]
    fn test_remote_album_goes_to_network() {
        let plan = plan_for(&album().with_locator(remote()), flags(true, true, false));
        assert_eq!(plan.steps, &[Source::Network]);
        let plan = plan_for(&album().with_locator(remote()), flags(true, true, true));
        assert_eq!(plan.steps, &[Source::Network]);
    }

    #[test]
    fn test_remote_album_without_network_art_uses_locator() {
        let plan = plan_for(&album().with_locator(remote()), flags(true, false, false));
        assert_eq!(plan.steps, &[Source::DirectUrl]);
    }

    #[test]
    fn test_offline_local_album() {
        let plan = plan_for(&album().with_locator(local()), flags(false, true, false));
        assert_eq!(plan.steps, &[Source::LocalMedia]);
        // Offline and preferring network matches no row
        assert!(plan_for(&album().with_locator(local()), flags(false, true, true)).is_exhausted());
    }

    #[test]
    fn test_online_local_album_without_network_art_is_exhausted() {
        // Row 5 needs offline; no other row covers this combination
        assert!(plan_for(&album().with_locator(local()), flags(true, false, false)).is_exhausted());
    }

    #[test]
    fn test_names_only_album() {
        assert_eq!(plan_for(&album(), flags(true, false, false)).steps, &[Source::Network]);
        assert!(plan_for(&album(), flags(false, true, false)).is_exhausted());
    }

    #[test]
    fn test_locator_only() {
        let local_only = ArtworkIdentity::locator(local());
        assert_eq!(plan_for(&local_only, flags(false, false, false)).steps, &[Source::LocalMedia]);

        let remote_only = ArtworkIdentity::locator(remote());
        assert_eq!(plan_for(&remote_only, flags(true, false, false)).steps, &[Source::DirectUrl]);
        assert!(plan_for(&remote_only, flags(false, true, false)).is_exhausted());
    }

    #[test]
    fn test_album_without_artist_is_exhausted() {
        let identity = ArtworkIdentity::new(None, Some("Kid A"), None);
        assert!(plan_for(&identity, flags(true, true, false)).is_exhausted());
    }

    #[test]
    fn test_artist_plan() {
        let artist = ArtworkIdentity::artist("Björk");
        assert_eq!(plan_for(&artist, flags(true, true, false)).steps, &[Source::ArtistNetwork]);
        assert!(plan_for(&artist, flags(false, true, false)).is_exhausted());

        let no_artist_images = PolicyFlags {
            download_missing_artist_images: false,
            ..flags(true, true, false)
        };
        assert!(plan_for(&artist, no_artist_images).is_exhausted());
    }

    #[test]
    fn test_attempted_flags() {
        let mut attempted = Attempted::empty();
        attempted |= Source::LocalMedia.flag();
        assert!(attempted.contains(Attempted::LOCAL_MEDIA));
        assert!(!attempted.contains(Source::Network.flag()));
    }
}
