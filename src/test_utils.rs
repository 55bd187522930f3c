//! Test utilities and fixtures for cover-minder tests.
//!
//! This module provides image fixtures, temporary cache stores, a recording
//! listener and a resolver harness wired to the mocks in
//! [`crate::gateway::mocks`].
//!
//! # Example
//!
//! ```ignore
//! use cover_minder::test_utils::{Harness, RecordingTarget};
//!
//! #[tokio::test]
//! async fn test_something() {
//!     let harness = Harness::new(MockMetadata::not_found(), MockLocalMedia::not_found(), MockTransport::new());
//!     let target = RecordingTarget::new();
//!     harness.resolver.resolve(identity, ArtworkKind::Thumbnail, Priority::Normal, &target).unwrap();
//!     let outcomes = target.wait_for(1).await;
//! }
//! ```

use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use image::{ImageFormat, Rgba, RgbaImage};
use parking_lot::Mutex;
use tempfile::TempDir;
use tokio::runtime::Handle;
use tokio::sync::Notify;

use crate::artwork::{ArtworkOutcome, CacheKey, CachedImage};
use crate::cache::{CacheStore, DiskCache, DiskLimits, MemoryCache};
use crate::config::ArtworkConfig;
use crate::gateway::mocks::{MockLocalMedia, MockMetadata, MockTransport};
use crate::policy::{SharedSettings, StaticConnectivity};
use crate::resolver::{ArtworkResolver, ArtworkTarget, Collaborators, ResolverOptions};

/// Encode a `width` x `height` PNG.
///
/// Pixel values depend on the size so different fixtures have different bytes.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let pixels = RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x * 17) as u8, (y * 31) as u8, (width + height) as u8, 255])
    });
    let mut out = Cursor::new(Vec::new());
    pixels
        .write_to(&mut out, ImageFormat::Png)
        .expect("Failed to encode PNG fixture");
    out.into_inner()
}

/// A decoded PNG fixture.
pub fn png_image(width: u32, height: u32) -> CachedImage {
    CachedImage::decode(png_bytes(width, height)).expect("Failed to decode PNG fixture")
}

/// Creates a cache store whose disk tier lives in a temporary directory.
///
/// Keep the TempDir alive for the duration of your test.
pub fn temp_store() -> (CacheStore, TempDir) {
    let dir = tempfile::tempdir().expect("Failed to create temp directory");
    let disk = DiskCache::open(
        dir.path().join("artwork"),
        DiskLimits {
            max_entries: 64,
            max_bytes: 16 * 1024 * 1024,
            max_age: None,
        },
    )
    .expect("Failed to open disk cache");
    let memory = MemoryCache::new(64, 16 * 1024 * 1024);
    (CacheStore::new(memory, disk), dir)
}

/// Listener that records every outcome it receives.
#[derive(Default)]
pub struct RecordingTarget {
    outcomes: Mutex<Vec<(CacheKey, ArtworkOutcome)>>,
    notify: Notify,
}

impl RecordingTarget {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn count(&self) -> usize {
        self.outcomes.lock().len()
    }

    pub fn outcomes(&self) -> Vec<ArtworkOutcome> {
        self.outcomes.lock().iter().map(|(_, o)| o.clone()).collect()
    }

    pub fn keys(&self) -> Vec<String> {
        self.outcomes.lock().iter().map(|(k, _)| k.as_string()).collect()
    }

    /// Wait until at least `n` outcomes arrived. Panics after five seconds.
    pub async fn wait_for(&self, n: usize) -> Vec<ArtworkOutcome> {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        loop {
            let notified = self.notify.notified();
            if self.count() >= n {
                return self.outcomes();
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                panic!("Timed out waiting for {} outcomes, got {}", n, self.count());
            }
        }
    }
}

impl ArtworkTarget for RecordingTarget {
    fn on_artwork(&self, key: &CacheKey, outcome: ArtworkOutcome) {
        self.outcomes.lock().push((key.clone(), outcome));
        self.notify.notify_waiters();
    }
}

/// A resolver wired to mocks and a temporary cache.
pub struct Harness {
    pub resolver: ArtworkResolver,
    pub store: Arc<CacheStore>,
    pub metadata: Arc<MockMetadata>,
    pub local: Arc<MockLocalMedia>,
    pub transport: Arc<MockTransport>,
    pub settings: Arc<SharedSettings>,
    pub connectivity: Arc<StaticConnectivity>,
    _dir: TempDir,
}

impl Harness {
    /// Build on the current tokio runtime, online, with default settings.
    pub fn new(metadata: MockMetadata, local: MockLocalMedia, transport: MockTransport) -> Self {
        let (store, dir) = temp_store();
        let store = Arc::new(store);
        let metadata = Arc::new(metadata);
        let local = Arc::new(local);
        let transport = Arc::new(transport);
        let settings = Arc::new(SharedSettings::from_config(&ArtworkConfig::default()));
        let connectivity = Arc::new(StaticConnectivity::new(true));

        let resolver = ArtworkResolver::new(
            store.clone(),
            Collaborators {
                metadata: metadata.clone(),
                local_media: local.clone(),
                transport: transport.clone(),
                settings: settings.clone(),
                connectivity: connectivity.clone(),
            },
            ResolverOptions::default(),
            Handle::current(),
        )
        .expect("Failed to build resolver");

        Self {
            resolver,
            store,
            metadata,
            local,
            transport,
            settings,
            connectivity,
            _dir: dir,
        }
    }

    /// Wait until no request is in flight. Panics after five seconds.
    pub async fn settle(&self) {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while self.resolver.in_flight() > 0 {
            assert!(tokio::time::Instant::now() < deadline, "Requests never settled");
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    }
}
