//! Dispatch-time configuration.
//!
//! Derived from the validated [`Settings`](crate::config::Settings) so the
//! dispatcher never reads ambient state while fanning out.

use std::num::NonZeroUsize;
use std::time::Duration;

const DEFAULT_SITE_HOST: &str = "localhost";
const DEFAULT_HOME_URL: &str = "http://localhost";
const DEFAULT_TIMEOUT_SECS: u64 = 5;
const DEFAULT_CONCURRENCY: usize = 8;

/// Knobs consulted by the dispatcher and the HTTP transport.
#[derive(Debug, Clone)]
pub struct PurgeConfig {
    /// Canonical site hostname sent as the `Host` header (requests are routed by address).
    pub site_host: String,
    /// Home URL used to turn permalinks into relative paths.
    pub home_url: String,
    /// Per-request timeout for purge calls and host-list downloads.
    pub timeout: Duration,
    /// Upper bound on in-flight purge calls for one batch.
    pub concurrency: NonZeroUsize,
    /// Treat 404 as success.
    pub debug: bool,
    /// Build `https://` purge URLs when the triggering request was secure.
    pub inbound_https: bool,
    /// Also list succeeding hosts for a backend that had failures in the same batch.
    pub report_partial_success: bool,
}

impl Default for PurgeConfig {
    fn default() -> Self {
        Self {
            site_host: DEFAULT_SITE_HOST.to_string(),
            home_url: DEFAULT_HOME_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            concurrency: NonZeroUsize::new(DEFAULT_CONCURRENCY).unwrap_or(NonZeroUsize::MIN),
            debug: false,
            inbound_https: false,
            report_partial_success: false,
        }
    }
}

impl From<&crate::config::Settings> for PurgeConfig {
    fn from(settings: &crate::config::Settings) -> Self {
        Self {
            site_host: settings.site.host.clone(),
            home_url: settings.site.home_url.as_str().trim_end_matches('/').to_string(),
            timeout: settings.dispatch.timeout,
            concurrency: settings.dispatch.concurrency,
            debug: settings.dispatch.debug,
            inbound_https: settings.dispatch.inbound_https,
            report_partial_success: settings.dispatch.report_partial_success,
        }
    }
}
