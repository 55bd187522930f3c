//! The resolver: cache probe, escalation and delivery for each request.
//!
//! 1. **Memory** - checked inline in [`ArtworkResolver::resolve`]
//! 2. **Disk** - checked by the request's driver task
//! 3. **Escalation** - the sources chosen by [`plan_for`], in order
//!
//! One driver task runs per cache key; every other caller for that key
//! attaches to it as a listener.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use tokio::runtime::Handle;
use tokio::sync::oneshot;

use super::delivery::DeliveryContext;
use super::fetcher::ImageFetcher;
use super::queue::{Interest, RequestQueue};
use super::registry::{Joined, RegistryStats, RequestRegistry};
use super::request::{ArtworkTarget, InFlightRequest, Listener, ListenerId, Priority, RequestState};
use crate::artwork::{
    ArtworkError, ArtworkIdentity, ArtworkKind, ArtworkOutcome, ArtworkSource, CacheKey, CachedImage, derive_key,
};
use crate::cache::{CacheStats, CacheStore};
use crate::config::NetworkConfig;
use crate::gateway::{ImageTransport, LocalMediaGateway, MetadataGateway};
use crate::policy::{Attempted, ArtworkSettings, Connectivity, PolicyFlags, Source, best_url, plan_for};

/// External collaborators of the resolver.
pub struct Collaborators {
    pub metadata: Arc<dyn MetadataGateway>,
    pub local_media: Arc<dyn LocalMediaGateway>,
    pub transport: Arc<dyn ImageTransport>,
    pub settings: Arc<dyn ArtworkSettings>,
    pub connectivity: Arc<dyn Connectivity>,
}

/// Worker pool sizes.
#[derive(Debug, Clone, Copy)]
pub struct ResolverOptions {
    /// Concurrent metadata lookups
    pub api_workers: usize,
    /// Concurrent image downloads
    pub image_workers: usize,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            api_workers: 2,
            image_workers: 4,
        }
    }
}

impl From<&NetworkConfig> for ResolverOptions {
    fn from(config: &NetworkConfig) -> Self {
        Self {
            api_workers: config.api_workers,
            image_workers: config.image_workers,
        }
    }
}

/// Resolves artwork for any number of concurrent consumers.
///
/// Cheap to clone; all clones share caches, queues and the registry.
#[derive(Clone)]
pub struct ArtworkResolver {
    shared: Arc<Shared>,
}

struct Shared {
    store: Arc<CacheStore>,
    registry: RequestRegistry,
    fetcher: ImageFetcher,
    api_queue: RequestQueue,
    metadata: Arc<dyn MetadataGateway>,
    local_media: Arc<dyn LocalMediaGateway>,
    settings: Arc<dyn ArtworkSettings>,
    connectivity: Arc<dyn Connectivity>,
    delivery: DeliveryContext,
    runtime: Handle,
}

impl ArtworkResolver {
    /// Build a resolver whose tasks run on `runtime`.
    pub fn new(
        store: Arc<CacheStore>,
        collaborators: Collaborators,
        options: ResolverOptions,
        runtime: Handle,
    ) -> crate::error::Result<Self> {
        let delivery = DeliveryContext::spawn()?;
        let fetcher = ImageFetcher::new(collaborators.transport, store.clone(), options.image_workers, &runtime);
        let api_queue = RequestQueue::new("api", options.api_workers, &runtime);

        Ok(Self {
            shared: Arc::new(Shared {
                store,
                registry: RequestRegistry::new(),
                fetcher,
                api_queue,
                metadata: collaborators.metadata,
                local_media: collaborators.local_media,
                settings: collaborators.settings,
                connectivity: collaborators.connectivity,
                delivery,
                runtime,
            }),
        })
    }

    /// Request artwork for `target`. Never blocks.
    ///
    /// The outcome is delivered to `target` on the delivery thread. Fails
    /// only for an identity with nothing to resolve from.
    pub fn resolve<T: ArtworkTarget + 'static>(
        &self,
        identity: ArtworkIdentity,
        kind: ArtworkKind,
        priority: Priority,
        target: &Arc<T>,
    ) -> Result<ResolveHandle, ArtworkError> {
        let weak: Weak<dyn ArtworkTarget> = Arc::downgrade(target) as Weak<dyn ArtworkTarget>;
        self.resolve_weak(identity, kind, priority, weak)
    }

    fn resolve_weak(
        &self,
        identity: ArtworkIdentity,
        kind: ArtworkKind,
        priority: Priority,
        target: Weak<dyn ArtworkTarget>,
    ) -> Result<ResolveHandle, ArtworkError> {
        let shared = &self.shared;
        let key = derive_key(&identity, kind)?;

        if let Some(image) = shared.store.memory().get(&key) {
            tracing::trace!(key = %key, "Memory cache hit");
            shared.delivery.dispatch(target, key, delivered(image, ArtworkSource::MemoryCache));
            return Ok(ResolveHandle::finished());
        }

        let listener = Listener::new(target.clone(), priority);
        let listener_id = listener.id();
        let generation = shared.store.generation();
        let (request, joined) = shared
            .registry
            .get_or_create(key.clone(), identity, generation, listener);

        match joined {
            Joined::New => {
                tracing::debug!(key = %key, ?priority, "Starting artwork request");
                let driver = shared.clone();
                let driven = request.clone();
                shared.runtime.spawn(async move { driver.drive(driven).await });
            }
            Joined::Attached => {}
            Joined::Replay(outcome) => {
                shared.delivery.dispatch(target, key, outcome);
                return Ok(ResolveHandle::finished());
            }
        }

        Ok(ResolveHandle {
            listener: listener_id,
            request: Arc::downgrade(&request),
            cancelled: AtomicBool::new(false),
        })
    }

    /// Resolve and wait for the outcome.
    pub async fn resolve_async(
        &self,
        identity: ArtworkIdentity,
        kind: ArtworkKind,
        priority: Priority,
    ) -> Result<ArtworkOutcome, ArtworkError> {
        let (tx, rx) = oneshot::channel();
        let target = Arc::new(OneshotTarget(parking_lot::Mutex::new(Some(tx))));
        let _handle = self.resolve(identity, kind, priority, &target)?;
        Ok(rx.await.unwrap_or(ArtworkOutcome::NoArtwork))
    }

    /// Empty both cache tiers. Requests already running will not repopulate them.
    pub fn clear_all_caches(&self) -> bool {
        self.shared.store.clear_all()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.shared.store.stats()
    }

    /// Requests currently being driven.
    pub fn in_flight(&self) -> usize {
        self.shared.registry.len()
    }

    pub fn registry_stats(&self) -> RegistryStats {
        self.shared.registry.stats()
    }

    pub fn store(&self) -> &Arc<CacheStore> {
        &self.shared.store
    }

    #[cfg(test)]
    pub(crate) fn registry_for_tests(&self) -> &RequestRegistry {
        &self.shared.registry
    }
}

/// A caller's handle on a pending resolve.
pub struct ResolveHandle {
    listener: ListenerId,
    request: Weak<InFlightRequest>,
    cancelled: AtomicBool,
}

impl ResolveHandle {
    fn finished() -> Self {
        Self {
            listener: ListenerId::next(),
            request: Weak::new(),
            cancelled: AtomicBool::new(true),
        }
    }

    /// Stop listening. The underlying work keeps going so its result is cached.
    pub fn cancel(&self) {
        if self.cancelled.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(request) = self.request.upgrade() {
            request.detach(self.listener);
        }
    }

    /// True once no further callback will arrive through this handle.
    pub fn is_finished(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
            || self
                .request
                .upgrade()
                .is_none_or(|request| request.state().is_terminal())
    }
}

struct OneshotTarget(parking_lot::Mutex<Option<oneshot::Sender<ArtworkOutcome>>>);

impl ArtworkTarget for OneshotTarget {
    fn on_artwork(&self, _key: &CacheKey, outcome: ArtworkOutcome) {
        if let Some(tx) = self.0.lock().take() {
            let _ = tx.send(outcome);
        }
    }
}

fn delivered(image: CachedImage, source: ArtworkSource) -> ArtworkOutcome {
    ArtworkOutcome::Delivered { image, source }
}

impl Shared {
    /// Drive one request from cache probe to terminal state.
    async fn drive(self: Arc<Self>, request: Arc<InFlightRequest>) {
        match self.run(&request).await {
            Some(outcome) => self.finish(&request, outcome),
            None => {
                self.registry.remove(&request);
            }
        }
    }

    /// Returns `None` if the request was abandoned for lack of listeners.
    async fn run(&self, request: &Arc<InFlightRequest>) -> Option<ArtworkOutcome> {
        let key = request.key();

        request.transition(RequestState::L1Checking);
        if let Some(image) = self.store.memory().get(key) {
            return Some(delivered(image, ArtworkSource::MemoryCache));
        }

        request.transition(RequestState::L2Checking);
        if let Some(image) = self.probe_disk(request).await {
            tracing::debug!(key = %key, "Disk cache hit");
            return Some(delivered(image, ArtworkSource::DiskCache));
        }

        if request.abandon_if_unobserved() {
            tracing::debug!(key = %key, "No listeners left after cache miss");
            return None;
        }

        let flags = PolicyFlags::snapshot(self.settings.as_ref(), self.connectivity.as_ref());
        let plan = plan_for(request.identity(), flags);
        tracing::debug!(key = %key, steps = ?plan.steps, rule = ?plan.rule, "Escalating");

        let mut attempted = Attempted::empty();
        let mut skipped_local = false;
        for &step in plan.steps {
            if attempted.contains(step.flag()) {
                continue;
            }
            attempted |= step.flag();

            if step == Source::LocalMedia && !request.has_live_listeners() {
                tracing::debug!(key = %key, "Skipping local media; nobody is listening");
                skipped_local = true;
                continue;
            }

            if let Some(image) = self.try_step(step, request, flags).await {
                return Some(delivered(image, source_of(step)));
            }
        }

        if skipped_local {
            // A listener may have joined since local media was skipped
            if request.abandon_if_unobserved() {
                tracing::debug!(key = %key, "Abandoning request; local media was never read");
                return None;
            }
            if let Some(image) = self.try_step(Source::LocalMedia, request, flags).await {
                return Some(delivered(image, ArtworkSource::LocalMedia));
            }
        }

        tracing::debug!(key = %key, "Artwork sources exhausted");
        Some(ArtworkOutcome::NoArtwork)
    }

    async fn try_step(&self, step: Source, request: &Arc<InFlightRequest>, flags: PolicyFlags) -> Option<CachedImage> {
        match self.attempt(step, request, flags).await {
            Ok(image) => Some(image),
            Err(ArtworkError::NotFound(msg)) => {
                tracing::debug!(key = %request.key(), ?step, reason = %msg, "Source has no artwork");
                None
            }
            Err(e) => {
                tracing::warn!(key = %request.key(), ?step, error = %e, "Artwork source failed");
                None
            }
        }
    }

    fn finish(&self, request: &Arc<InFlightRequest>, outcome: ArtworkOutcome) {
        let targets = request.finish(outcome.clone());
        self.registry.remove(request);

        tracing::debug!(
            key = %request.key(),
            source = ?outcome.source(),
            listeners = targets.len(),
            "Artwork request finished"
        );
        for target in targets {
            self.delivery.dispatch(target, request.key().clone(), outcome.clone());
        }
    }

    /// Read tier 2; a hit is decoded and copied into tier 1.
    async fn probe_disk(&self, request: &InFlightRequest) -> Option<CachedImage> {
        let store = self.store.clone();
        let key = request.key().clone();
        let generation = request.generation();

        tokio::task::spawn_blocking(move || {
            let bytes = match store.disk().get(&key) {
                Ok(bytes) => bytes?,
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "Disk cache read failed");
                    return None;
                }
            };
            match CachedImage::decode(bytes) {
                Ok(image) => {
                    let _ = store.memory().put_since(key, image.clone(), generation.memory);
                    Some(image)
                }
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "Dropping undecodable disk cache entry");
                    store.disk().remove(&key);
                    None
                }
            }
        })
        .await
        .ok()
        .flatten()
    }

    async fn attempt(
        &self,
        step: Source,
        request: &Arc<InFlightRequest>,
        flags: PolicyFlags,
    ) -> Result<CachedImage, ArtworkError> {
        match step {
            Source::LocalMedia => self.from_local_media(request).await,
            Source::Network => self.from_album_lookup(request, flags).await,
            Source::DirectUrl => self.from_locator_url(request).await,
            Source::ArtistNetwork => self.from_artist_lookup(request, flags).await,
        }
    }

    async fn from_local_media(&self, request: &Arc<InFlightRequest>) -> Result<CachedImage, ArtworkError> {
        let locator = request
            .identity()
            .content_locator()
            .ok_or_else(|| ArtworkError::NotFound("no locator".to_string()))?;

        request.transition(RequestState::LocalMediaChecking);
        let bytes = self.local_media.read_local_art(locator).await?;
        Ok(self.fetcher.ingest(request.key(), bytes, request.generation()).await?)
    }

    async fn from_album_lookup(&self, request: &Arc<InFlightRequest>, flags: PolicyFlags) -> Result<CachedImage, ArtworkError> {
        let identity = request.identity();
        let (Some(artist), Some(album)) = (identity.artist_name(), identity.album_name()) else {
            return Err(ArtworkError::NotFound("album lookup needs artist and album".to_string()));
        };

        request.transition(RequestState::MetadataLookup);
        let metadata = self.metadata.clone();
        let (artist, album) = (artist.to_string(), album.to_string());
        let info = self
            .call_api(request, async move { metadata.lookup_album(&artist, &album).await })
            .await??;

        let high_res = match info.stable_id.as_deref() {
            Some(stable_id) => {
                let metadata = self.metadata.clone();
                let stable_id = stable_id.to_string();
                match self
                    .call_api(request, async move { metadata.lookup_high_res_image(&stable_id).await })
                    .await?
                {
                    Ok(url) => Some(url),
                    Err(e) => {
                        tracing::debug!(key = %request.key(), error = %e, "No archive image; using best listed size");
                        None
                    }
                }
            }
            None => None,
        };

        let url = high_res
            .or_else(|| best_url(&info.images, flags.want_high_resolution_art).map(str::to_string))
            .ok_or_else(|| ArtworkError::NotFound(format!("no image URL for {}", identity)))?;

        request.transition(RequestState::ImageFetching);
        Ok(self.fetcher.fetch(&url, request).await?)
    }

    async fn from_artist_lookup(&self, request: &Arc<InFlightRequest>, flags: PolicyFlags) -> Result<CachedImage, ArtworkError> {
        let Some(artist) = request.identity().artist_name() else {
            return Err(ArtworkError::NotFound("artist lookup needs an artist".to_string()));
        };

        request.transition(RequestState::MetadataLookup);
        let metadata = self.metadata.clone();
        let artist = artist.to_string();
        let info = self
            .call_api(request, async move { metadata.lookup_artist(&artist).await })
            .await??;

        let url = best_url(&info.images, flags.want_high_resolution_art)
            .ok_or_else(|| ArtworkError::NotFound(format!("no artist image URL for {}", request.identity())))?
            .to_string();

        request.transition(RequestState::ImageFetching);
        Ok(self.fetcher.fetch(&url, request).await?)
    }

    async fn from_locator_url(&self, request: &Arc<InFlightRequest>) -> Result<CachedImage, ArtworkError> {
        let locator = request
            .identity()
            .content_locator()
            .ok_or_else(|| ArtworkError::NotFound("no locator".to_string()))?;

        request.transition(RequestState::ImageFetching);
        Ok(self.fetcher.fetch(locator.as_str(), request).await?)
    }

    /// Run a metadata call on the api queue as the request's current operation.
    async fn call_api<F, T>(&self, request: &Arc<InFlightRequest>, call: F) -> Result<T, ArtworkError>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let interest = Arc::downgrade(request) as Weak<dyn Interest>;
        let (ticket, done) = self
            .api_queue
            .enqueue_for(request.effective_priority(), interest, call);
        request.set_operation(ticket);
        let result = done.await;
        request.clear_operation();
        result.map_err(|_| ArtworkError::Transient("metadata lookup cancelled".to_string()))
    }
}

fn source_of(step: Source) -> ArtworkSource {
    match step {
        Source::LocalMedia => ArtworkSource::LocalMedia,
        Source::Network | Source::ArtistNetwork => ArtworkSource::Network,
        Source::DirectUrl => ArtworkSource::DirectUrl,
    }
}
