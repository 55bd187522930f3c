//! Download, decode and cache one image.

use std::sync::{Arc, Weak};

use tokio::runtime::Handle;

use super::queue::{Interest, RequestQueue};
use super::request::InFlightRequest;
use crate::artwork::{ArtworkError, ArtworkKind, CacheKey, CachedImage};
use crate::cache::{CacheError, CacheGeneration, CacheStore};
use crate::gateway::{GatewayError, ImageTransport};

#[derive(Debug, Clone, thiserror::Error)]
pub enum FetchError {
    #[error("Download failed: {0}")]
    Transport(#[from] GatewayError),

    #[error("Could not decode image: {0}")]
    Decode(String),

    #[error("Fetch was cancelled")]
    Cancelled,
}

impl From<FetchError> for ArtworkError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Transport(e) => e.into(),
            FetchError::Decode(msg) => ArtworkError::NotFound(msg),
            FetchError::Cancelled => ArtworkError::Transient("cancelled".to_string()),
        }
    }
}

pub struct ImageFetcher {
    transport: Arc<dyn ImageTransport>,
    queue: RequestQueue,
    store: Arc<CacheStore>,
}

impl ImageFetcher {
    pub fn new(transport: Arc<dyn ImageTransport>, store: Arc<CacheStore>, workers: usize, runtime: &Handle) -> Self {
        Self {
            transport,
            queue: RequestQueue::new("image", workers, runtime),
            store,
        }
    }

    /// Download `url` for `request`, then decode and write both tiers.
    ///
    /// The download runs on the image queue at the request's effective
    /// priority and stays the request's current operation until it finishes.
    /// It sinks to `Background` if the request loses its listeners while queued.
    pub async fn fetch(&self, url: &str, request: &Arc<InFlightRequest>) -> Result<CachedImage, FetchError> {
        let priority = request.effective_priority();
        let transport = self.transport.clone();
        let owned_url = url.to_string();
        let interest = Arc::downgrade(request) as Weak<dyn Interest>;

        let (ticket, done) = self.queue.enqueue_for(priority, interest, async move {
            transport.download(&owned_url, priority).await
        });
        request.set_operation(ticket);
        let downloaded = done.await;
        request.clear_operation();

        let bytes = downloaded.map_err(|_| FetchError::Cancelled)??;
        tracing::debug!(key = %request.key(), url, bytes = bytes.len(), "Downloaded artwork");

        let image = self.ingest(request.key(), bytes, request.generation()).await?;

        if request.key().kind() == ArtworkKind::Thumbnail {
            self.warm_large(request.key(), &image, request.generation()).await;
        }
        Ok(image)
    }

    /// Decode encoded bytes and write both tiers.
    ///
    /// A cache write refused because of a concurrent clear still returns the
    /// image; it just isn't cached.
    pub async fn ingest(&self, key: &CacheKey, bytes: Vec<u8>, generation: CacheGeneration) -> Result<CachedImage, FetchError> {
        let store = self.store.clone();
        let key = key.clone();

        tokio::task::spawn_blocking(move || {
            let image = CachedImage::decode(bytes).map_err(|e| FetchError::Decode(e.to_string()))?;
            match store.store(&key, &image, generation) {
                Ok(()) => {}
                Err(CacheError::StaleGeneration) => {
                    tracing::debug!(key = %key, "Cache cleared during fetch; not caching")
                }
                Err(e) => tracing::debug!(key = %key, error = %e, "Artwork not cached in memory"),
            }
            Ok(image)
        })
        .await
        .map_err(|_| FetchError::Cancelled)?
    }

    /// Store a downloaded thumbnail's bytes under the Large key too, if the
    /// disk tier has nothing there yet.
    async fn warm_large(&self, key: &CacheKey, image: &CachedImage, generation: CacheGeneration) {
        let store = self.store.clone();
        let large = key.with_kind(ArtworkKind::Large);
        let image = image.clone();

        let _ = tokio::task::spawn_blocking(move || {
            if store.disk().contains(&large) {
                return;
            }
            if let Err(e) = store.disk().put_since(&large, image.encoded(), generation.disk) {
                tracing::debug!(key = %large, error = %e, "Could not warm large artwork");
            }
        })
        .await;
    }
}
