//! Request coalescing, scheduling and delivery.
//!
//! - [`ArtworkResolver`] - the entry point consumers call
//! - [`RequestRegistry`] - one [`InFlightRequest`] per cache key
//! - [`RequestQueue`] - priority-ordered workers for lookups and downloads
//! - [`ImageFetcher`] - download, decode, cache
//! - [`DeliveryContext`] - the thread every listener callback runs on

mod delivery;
mod fetcher;
mod orchestrator;
mod queue;
mod registry;
mod request;

pub use delivery::DeliveryContext;
pub use fetcher::{FetchError, ImageFetcher};
pub use orchestrator::{ArtworkResolver, Collaborators, ResolveHandle, ResolverOptions};
pub use queue::{QueueTicket, RequestQueue};
pub use registry::{Joined, RegistryStats, RequestRegistry};
pub use request::{ArtworkTarget, InFlightRequest, Listener, ListenerId, Priority, RequestState};
