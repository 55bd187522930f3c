//! Escalation policy.
//!
//! - [`escalation`] - the decision table mapping identity facts and user
//!   settings to an ordered [`Plan`] of sources
//! - [`selection`] - picking the URL to download from a size map
//! - [`settings`] - the settings/connectivity contracts the planner reads

pub mod escalation;
pub mod selection;
pub mod settings;

pub use escalation::{Attempted, Facts, Plan, PolicyFlags, Source, plan_for};
pub use selection::best_url;
pub use settings::{ArtworkSettings, Connectivity, SharedSettings, StaticConnectivity};
