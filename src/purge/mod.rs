//! Purge dispatch core.
//!
//! Decides what to purge for a content change, fans purge requests out to
//! every enabled host and cache backend, and aggregates the answers into a
//! single outcome:
//!
//! - **Host registry** ([`HostLoader`], [`HostRegistry`]): target servers and their backends
//! - **Resolver** ([`PurgeResolver`]): content item + class policy -> [`PurgeTarget`]
//! - **Backends** ([`BackendId`]): request construction and success codes per cache technology
//! - **Dispatcher** ([`PurgeDispatcher`]): fan-out and classification into a [`PurgeOutcome`]
//! - **Reporter** ([`report::format`]): human-readable summary of an outcome
//!
//! ## Configuration
//!
//! ```toml
//! [hosts]
//! source = "hosts.json"
//!
//! [dispatch]
//! timeout_seconds = 5
//! debug = false
//!
//! [policy.builtin]
//! changed_url = true
//! home = true
//! ```

mod backend;
mod config;
mod dispatcher;
mod events;
mod hosts;
mod outcome;
mod policy;
pub mod report;
mod schedule;
mod transport;
mod trigger;

use thiserror::Error;

pub use backend::{
    ALL_BACKENDS_ID, BACKENDS, BackendId, BackendSelection, PURGE_ALL_PATH, PurgeRequest,
    build_host_url,
};
pub use config::PurgeConfig;
pub use dispatcher::{OverrideDispatch, PurgeDispatcher};
pub use events::ContentEvent;
pub use hosts::{
    DEFAULT_HOSTS_JSON, Host, HostConfigError, HostLoader, HostRegistry, HostSource,
    OverrideHosts, RegistryOrigin, parse_hosts,
};
pub use outcome::{BackendEntry, Classification, PurgeOutcome, PurgeWarning};
pub use policy::{
    AssignedCommerceTerms, CommerceTaxonomy, HOME_PATH, NoCommerce, PolicySet, PurgePolicy,
    PurgeResolver, PurgeTarget,
};
pub use report::{PurgeReport, list_to_sentence};
pub use schedule::{DEFAULT_SCHEDULE_TIME, DailySchedule, parse_time_of_day};
pub use transport::{HttpTransport, PurgeTransport};
pub use trigger::PurgeTrigger;

/// Errors surfaced to purge callers. Remote-host failures never appear here;
/// they are part of the [`PurgeOutcome`].
#[derive(Debug, Error)]
pub enum PurgeError {
    /// A backend identifier outside `fastcgi`, `pagespeed` and `all`.
    #[error("unknown cache backend `{0}` (expected fastcgi, pagespeed or all)")]
    UnknownBackend(String),
    #[error("invalid schedule time `{0}` (expected H:MM or HH:MM)")]
    InvalidSchedule(String),
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}
