//! Process-wide table of in-flight requests, one per cache key.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use super::request::{Attach, InFlightRequest, Listener};
use crate::artwork::{ArtworkIdentity, ArtworkOutcome, CacheKey};
use crate::cache::CacheGeneration;

/// How a caller joined a request.
pub enum Joined {
    /// A new request was created; the caller must drive it
    New,
    /// Attached to an existing request
    Attached,
    /// The existing request already finished with this outcome
    Replay(ArtworkOutcome),
}

impl Joined {
    pub fn is_new(&self) -> bool {
        matches!(self, Joined::New)
    }
}

/// Coalescing counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistryStats {
    /// Every `get_or_create` call
    pub total: u64,
    /// Calls that joined an existing request
    pub coalesced: u64,
    /// Calls that created a request
    pub created: u64,
}

#[derive(Default)]
pub struct RequestRegistry {
    requests: DashMap<CacheKey, Arc<InFlightRequest>>,
    total: AtomicU64,
    coalesced: AtomicU64,
    created: AtomicU64,
}

impl RequestRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Join the in-flight request for `key`, creating it if there is none.
    pub fn get_or_create(
        &self,
        key: CacheKey,
        identity: ArtworkIdentity,
        generation: CacheGeneration,
        listener: Listener,
    ) -> (Arc<InFlightRequest>, Joined) {
        self.total.fetch_add(1, Ordering::Relaxed);

        let mut listener = listener;
        loop {
            let existing = match self.requests.entry(key.clone()) {
                Entry::Occupied(mut entry) if entry.get().is_abandoned() => {
                    tracing::debug!(key = %key, "Replacing abandoned artwork request");
                    let request = Arc::new(InFlightRequest::new(key, identity, generation, listener));
                    entry.insert(request.clone());
                    self.created.fetch_add(1, Ordering::Relaxed);
                    return (request, Joined::New);
                }
                Entry::Occupied(entry) => entry.get().clone(),
                Entry::Vacant(entry) => {
                    let request = Arc::new(InFlightRequest::new(key, identity, generation, listener));
                    entry.insert(request.clone());
                    self.created.fetch_add(1, Ordering::Relaxed);
                    return (request, Joined::New);
                }
            };

            // Attach outside the shard lock; a request that finished meanwhile replays
            let joined = match existing.attach(listener) {
                Attach::Attached => Joined::Attached,
                Attach::Replay(outcome) => Joined::Replay(outcome),
                Attach::Abandoned(returned) => {
                    listener = returned;
                    continue;
                }
            };
            self.coalesced.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(key = %existing.key(), "Coalesced artwork request");
            return (existing, joined);
        }
    }

    #[cfg(test)]
    pub fn get(&self, key: &CacheKey) -> Option<Arc<InFlightRequest>> {
        self.requests.get(key).map(|entry| entry.value().clone())
    }

    /// Remove `request` if it is still the entry for its key.
    pub fn remove(&self, request: &Arc<InFlightRequest>) -> bool {
        self.requests
            .remove_if(request.key(), |_, current| Arc::ptr_eq(current, request))
            .is_some()
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            total: self.total.load(Ordering::Relaxed),
            coalesced: self.coalesced.load(Ordering::Relaxed),
            created: self.created.load(Ordering::Relaxed),
        }
    }
}
