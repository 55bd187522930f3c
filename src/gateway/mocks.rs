//! Mock collaborators for testing.
//!
//! Each mock counts its invocations, can share a [`CallLog`] with the others
//! to assert ordering, and can be held on a [`Gate`] so tests control when a
//! call completes.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;

use super::*;

/// Ordered record of calls across mocks.
#[derive(Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub fn record(&self, entry: impl Into<String>) {
        self.0.lock().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().clone()
    }

    /// Position of the first entry starting with `prefix`.
    pub fn position(&self, prefix: &str) -> Option<usize> {
        self.0.lock().iter().position(|e| e.starts_with(prefix))
    }
}

/// Holds calls until released.
pub struct Gate {
    open: AtomicBool,
    notify: Notify,
}

impl Gate {
    pub fn open() -> Self {
        Self {
            open: AtomicBool::new(true),
            notify: Notify::new(),
        }
    }

    pub fn closed() -> Self {
        Self {
            open: AtomicBool::new(false),
            notify: Notify::new(),
        }
    }

    pub fn release(&self) {
        self.open.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub async fn wait(&self) {
        loop {
            let notified = self.notify.notified();
            if self.open.load(Ordering::SeqCst) {
                return;
            }
            notified.await;
        }
    }
}

/// Mock metadata service with a fixed answer per call type.
pub struct MockMetadata {
    pub album: Result<AlbumInfo, GatewayError>,
    pub artist: Result<ArtistInfo, GatewayError>,
    pub high_res: Result<String, GatewayError>,
    pub album_calls: AtomicUsize,
    pub artist_calls: AtomicUsize,
    pub high_res_calls: AtomicUsize,
    pub gate: Gate,
    pub log: CallLog,
    /// Lookups for this artist panic
    pub panics_for: Option<String>,
}

impl MockMetadata {
    /// Every lookup answers `NotFound`.
    pub fn not_found() -> Self {
        let missing = || GatewayError::NotFound("mock".to_string());
        Self {
            album: Err(missing()),
            artist: Err(missing()),
            high_res: Err(missing()),
            album_calls: AtomicUsize::new(0),
            artist_calls: AtomicUsize::new(0),
            high_res_calls: AtomicUsize::new(0),
            gate: Gate::open(),
            log: CallLog::default(),
            panics_for: None,
        }
    }

    pub fn with_album(album: AlbumInfo) -> Self {
        Self {
            album: Ok(album),
            ..Self::not_found()
        }
    }

    pub fn with_artist(artist: ArtistInfo) -> Self {
        Self {
            artist: Ok(artist),
            ..Self::not_found()
        }
    }

    pub fn high_res(mut self, url: &str) -> Self {
        self.high_res = Ok(url.to_string());
        self
    }

    pub fn gated(mut self) -> Self {
        self.gate = Gate::closed();
        self
    }

    pub fn logging_to(mut self, log: &CallLog) -> Self {
        self.log = log.clone();
        self
    }

    pub fn panicking_for(mut self, artist: &str) -> Self {
        self.panics_for = Some(artist.to_string());
        self
    }

    fn check_panic(&self, artist: &str) {
        if self.panics_for.as_deref() == Some(artist) {
            panic!("mock metadata lookup for {} blew up", artist);
        }
    }

    pub fn calls(&self) -> usize {
        self.album_calls.load(Ordering::SeqCst)
            + self.artist_calls.load(Ordering::SeqCst)
            + self.high_res_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetadataGateway for MockMetadata {
    async fn lookup_album(&self, artist: &str, album: &str) -> Result<AlbumInfo, GatewayError> {
        self.album_calls.fetch_add(1, Ordering::SeqCst);
        self.log.record(format!("metadata:album:{}:{}", artist, album));
        self.gate.wait().await;
        self.check_panic(artist);
        self.album.clone()
    }

    async fn lookup_artist(&self, artist: &str) -> Result<ArtistInfo, GatewayError> {
        self.artist_calls.fetch_add(1, Ordering::SeqCst);
        self.log.record(format!("metadata:artist:{}", artist));
        self.gate.wait().await;
        self.check_panic(artist);
        self.artist.clone()
    }

    async fn lookup_high_res_image(&self, stable_id: &str) -> Result<String, GatewayError> {
        self.high_res_calls.fetch_add(1, Ordering::SeqCst);
        self.log.record(format!("metadata:high_res:{}", stable_id));
        self.high_res.clone()
    }
}

/// Mock local media returning one fixed answer.
pub struct MockLocalMedia {
    pub result: Result<Vec<u8>, GatewayError>,
    pub calls: AtomicUsize,
    pub log: CallLog,
}

impl MockLocalMedia {
    pub fn with_bytes(data: Vec<u8>) -> Self {
        Self {
            result: Ok(data),
            calls: AtomicUsize::new(0),
            log: CallLog::default(),
        }
    }

    pub fn not_found() -> Self {
        Self {
            result: Err(GatewayError::NotFound("mock".to_string())),
            calls: AtomicUsize::new(0),
            log: CallLog::default(),
        }
    }

    pub fn logging_to(mut self, log: &CallLog) -> Self {
        self.log = log.clone();
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LocalMediaGateway for MockLocalMedia {
    async fn read_local_art(&self, locator: &ContentLocator) -> Result<Vec<u8>, GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.log.record(format!("local:{}", locator));
        self.result.clone()
    }
}

/// Mock transport serving bytes per URL; unknown URLs are `NotFound`.
pub struct MockTransport {
    pub responses: HashMap<String, Result<Vec<u8>, GatewayError>>,
    pub calls: AtomicUsize,
    pub requested: Mutex<Vec<(String, Priority)>>,
    pub gate: Gate,
    pub log: CallLog,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            responses: HashMap::new(),
            calls: AtomicUsize::new(0),
            requested: Mutex::new(Vec::new()),
            gate: Gate::open(),
            log: CallLog::default(),
        }
    }

    pub fn serve(mut self, url: &str, data: Vec<u8>) -> Self {
        self.responses.insert(url.to_string(), Ok(data));
        self
    }

    pub fn fail(mut self, url: &str, error: GatewayError) -> Self {
        self.responses.insert(url.to_string(), Err(error));
        self
    }

    pub fn gated(mut self) -> Self {
        self.gate = Gate::closed();
        self
    }

    pub fn logging_to(mut self, log: &CallLog) -> Self {
        self.log = log.clone();
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn urls(&self) -> Vec<String> {
        self.requested.lock().iter().map(|(url, _)| url.clone()).collect()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ImageTransport for MockTransport {
    async fn download(&self, url: &str, priority: Priority) -> Result<Vec<u8>, GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requested.lock().push((url.to_string(), priority));
        self.log.record(format!("download:{}", url));
        self.gate.wait().await;
        self.responses
            .get(url)
            .cloned()
            .unwrap_or_else(|| Err(GatewayError::NotFound(url.to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_metadata_counts_and_logs() {
        let log = CallLog::default();
        let mock = MockMetadata::with_album(AlbumInfo::default()).logging_to(&log);

        assert!(mock.lookup_album("A", "B").await.is_ok());
        assert!(mock.lookup_artist("A").await.unwrap_err().is_not_found());

        assert_eq!(mock.calls(), 2);
        assert_eq!(log.position("metadata:album"), Some(0));
        assert_eq!(log.position("metadata:artist"), Some(1));
    }

    #[tokio::test]
    async fn test_gate_holds_until_released() {
        let mock = Arc::new(MockTransport::new().serve("u", vec![1]).gated());

        let task = {
            let mock = mock.clone();
            tokio::spawn(async move { mock.download("u", Priority::Normal).await })
        };

        tokio::task::yield_now().await;
        assert!(!task.is_finished());

        mock.gate.release();
        assert_eq!(task.await.unwrap().unwrap(), vec![1]);
        assert_eq!(mock.urls(), vec!["u".to_string()]);
    }

    #[tokio::test]
    async fn test_unknown_url_is_not_found() {
        let mock = MockTransport::new();
        assert!(mock.download("nope", Priority::Low).await.unwrap_err().is_not_found());
    }
}
