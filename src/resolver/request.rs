//! Per-key in-flight request state.

use std::sync::Weak;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use smallvec::SmallVec;

use super::queue::{Interest, QueueTicket};
use crate::artwork::{ArtworkIdentity, ArtworkOutcome, CacheKey};
use crate::cache::CacheGeneration;

/// Scheduling priority, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Priority {
    /// Nobody is waiting; only the caches benefit
    Background,
    /// Prefetch
    Low,
    #[default]
    Normal,
    /// On screen
    High,
    /// Blocking the user
    Immediate,
}

/// Lifecycle of a request. `Delivered` and `Exhausted` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Pending,
    L1Checking,
    L2Checking,
    LocalMediaChecking,
    MetadataLookup,
    ImageFetching,
    Delivered,
    Exhausted,
}

impl RequestState {
    pub fn is_terminal(self) -> bool {
        matches!(self, RequestState::Delivered | RequestState::Exhausted)
    }
}

/// Receives artwork. Called on the delivery thread.
pub trait ArtworkTarget: Send + Sync {
    fn on_artwork(&self, key: &CacheKey, outcome: ArtworkOutcome);
}

/// Identifies one attached listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl ListenerId {
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        ListenerId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// A consumer waiting on a request. Holds its target weakly.
pub struct Listener {
    id: ListenerId,
    target: Weak<dyn ArtworkTarget>,
    priority: Priority,
}

impl Listener {
    pub fn new(target: Weak<dyn ArtworkTarget>, priority: Priority) -> Self {
        Self {
            id: ListenerId::next(),
            target,
            priority,
        }
    }

    pub fn id(&self) -> ListenerId {
        self.id
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    /// A listener whose target was dropped counts as cancelled.
    pub fn is_live(&self) -> bool {
        self.target.strong_count() > 0
    }
}

/// Result of attaching a listener to a request.
pub enum Attach {
    /// Listener added; it will be called when the request finishes
    Attached,
    /// The request already finished; deliver this outcome now
    Replay(ArtworkOutcome),
    /// The request was given up before anyone else joined; start a new one
    Abandoned(Listener),
}

/// The single in-flight request for a cache key.
pub struct InFlightRequest {
    key: CacheKey,
    identity: ArtworkIdentity,
    generation: CacheGeneration,
    inner: Mutex<Inner>,
}

struct Inner {
    state: RequestState,
    priority: Priority,
    listeners: SmallVec<[Listener; 4]>,
    current_operation: Option<QueueTicket>,
    outcome: Option<ArtworkOutcome>,
    abandoned: bool,
}

impl InFlightRequest {
    /// Create a request with its first listener.
    pub fn new(key: CacheKey, identity: ArtworkIdentity, generation: CacheGeneration, listener: Listener) -> Self {
        let priority = listener.priority;
        let mut listeners = SmallVec::new();
        listeners.push(listener);
        Self {
            key,
            identity,
            generation,
            inner: Mutex::new(Inner {
                state: RequestState::Pending,
                priority,
                listeners,
                current_operation: None,
                outcome: None,
                abandoned: false,
            }),
        }
    }

    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    pub fn identity(&self) -> &ArtworkIdentity {
        &self.identity
    }

    /// Cache generations captured when the request started.
    pub fn generation(&self) -> CacheGeneration {
        self.generation
    }

    pub fn state(&self) -> RequestState {
        self.inner.lock().state
    }

    /// Move to a non-terminal state. Ignored once terminal.
    pub fn transition(&self, next: RequestState) -> bool {
        let mut inner = self.inner.lock();
        if inner.state.is_terminal() {
            tracing::warn!(key = %self.key, from = ?inner.state, to = ?next, "Ignoring transition out of terminal state");
            return false;
        }
        tracing::trace!(key = %self.key, from = ?inner.state, to = ?next, "Request state");
        inner.state = next;
        true
    }

    /// Highest priority requested so far, or `Background` once nobody is listening.
    pub fn effective_priority(&self) -> Priority {
        let mut inner = self.inner.lock();
        prune(&self.key, &mut inner);
        if inner.listeners.is_empty() {
            Priority::Background
        } else {
            inner.priority
        }
    }

    /// Attach another listener, promoting the request if it asks for more.
    pub fn attach(&self, listener: Listener) -> Attach {
        let mut inner = self.inner.lock();
        if inner.abandoned {
            return Attach::Abandoned(listener);
        }
        if let Some(outcome) = &inner.outcome {
            return Attach::Replay(outcome.clone());
        }

        if listener.priority > inner.priority {
            inner.priority = listener.priority;
        }
        inner.listeners.push(listener);

        // A demoted operation is restored as soon as someone listens again
        let priority = inner.priority;
        if let Some(ticket) = &inner.current_operation {
            ticket.set_priority(priority);
        }
        Attach::Attached
    }

    /// Remove a listener. Returns true if live listeners remain.
    ///
    /// When the last one leaves, the current operation is demoted to
    /// `Background`.
    pub fn detach(&self, id: ListenerId) -> bool {
        let mut inner = self.inner.lock();
        let before = inner.listeners.len();
        inner.listeners.retain(|l| l.id != id);
        if before > 0 && inner.listeners.is_empty() {
            demote(&self.key, &inner);
        }
        prune(&self.key, &mut inner);
        !inner.listeners.is_empty()
    }

    pub fn has_live_listeners(&self) -> bool {
        let mut inner = self.inner.lock();
        prune(&self.key, &mut inner);
        !inner.listeners.is_empty()
    }

    /// Give the request up if nobody is listening any more.
    ///
    /// Checked and decided under the same lock [`attach`](Self::attach)
    /// takes, so a listener either joins before this and keeps the request
    /// alive, or sees [`Attach::Abandoned`] and starts a fresh one.
    pub fn abandon_if_unobserved(&self) -> bool {
        let mut inner = self.inner.lock();
        if inner.state.is_terminal() {
            return false;
        }
        prune(&self.key, &mut inner);
        if !inner.listeners.is_empty() {
            return false;
        }

        tracing::debug!(key = %self.key, state = ?inner.state, "Nobody listening; abandoning request");
        inner.state = RequestState::Exhausted;
        inner.abandoned = true;
        inner.current_operation = None;
        true
    }

    pub fn is_abandoned(&self) -> bool {
        self.inner.lock().abandoned
    }

    #[cfg(test)]
    pub fn listener_count(&self) -> usize {
        self.inner.lock().listeners.len()
    }

    /// Record the queued operation currently serving this request.
    pub fn set_operation(&self, ticket: QueueTicket) {
        self.inner.lock().current_operation = Some(ticket);
    }

    pub fn clear_operation(&self) {
        self.inner.lock().current_operation = None;
    }

    /// Enter the terminal state and hand back every listener's target.
    ///
    /// Returns nothing if the request had already finished.
    pub fn finish(&self, outcome: ArtworkOutcome) -> Vec<Weak<dyn ArtworkTarget>> {
        let mut inner = self.inner.lock();
        if inner.state.is_terminal() {
            tracing::warn!(key = %self.key, state = ?inner.state, "Request finished twice");
            return Vec::new();
        }

        inner.state = match outcome {
            ArtworkOutcome::Delivered { .. } => RequestState::Delivered,
            ArtworkOutcome::NoArtwork => RequestState::Exhausted,
        };
        inner.outcome = Some(outcome);
        inner.current_operation = None;
        inner.listeners.drain(..).map(|l| l.target).collect()
    }
}

impl Interest for InFlightRequest {
    fn current_priority(&self) -> Option<Priority> {
        // Called with the queue locked; attach and detach lock in the other order
        let inner = self.inner.try_lock()?;
        if inner.listeners.iter().any(Listener::is_live) {
            Some(inner.priority)
        } else {
            Some(Priority::Background)
        }
    }
}

/// Drop listeners whose targets are gone, demoting the current operation
/// when that leaves nobody.
fn prune(key: &CacheKey, inner: &mut Inner) {
    let before = inner.listeners.len();
    inner.listeners.retain(|l| l.is_live());
    if before > 0 && inner.listeners.is_empty() {
        demote(key, inner);
    }
}

/// The operation keeps running at `Background` so its result still reaches the caches.
fn demote(key: &CacheKey, inner: &Inner) {
    if let Some(ticket) = &inner.current_operation {
        tracing::debug!(key = %key, "Last listener left; demoting to background");
        ticket.set_priority(Priority::Background);
    }
}
