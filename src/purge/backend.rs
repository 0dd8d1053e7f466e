//! Cache backend adapters.
//!
//! Each backend knows how to turn `(host, relative path)` into a purge request
//! and which HTTP status codes count as a successful purge.

use std::fmt;
use std::str::FromStr;

use reqwest::Method;
use tracing::debug;

use super::PurgeError;
use super::hosts::Host;

/// Relative path used when every cached object must go.
pub const PURGE_ALL_PATH: &str = "*";

/// Path segment the proxy cache listens on for purge requests.
const PROXY_PURGE_PREFIX: &str = "purge";

const PURGE_METHOD: &str = "PURGE";

/// Identifier accepted wherever a backend selection means "every backend".
pub const ALL_BACKENDS_ID: &str = "all";

/// Registered backends in dispatch order.
pub const BACKENDS: [BackendId; 2] = [BackendId::FastCgi, BackendId::PageSpeed];

/// Stable identifiers of the supported cache technologies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BackendId {
    /// Reverse-proxy cache purged with `GET /purge/<path>`.
    FastCgi,
    /// Full-page cache purged with the `PURGE` method.
    PageSpeed,
}

impl BackendId {
    pub fn as_str(self) -> &'static str {
        match self {
            BackendId::FastCgi => "fastcgi",
            BackendId::PageSpeed => "pagespeed",
        }
    }

    /// Whether the backend is enabled on `host`.
    pub fn enabled_on(self, host: &Host) -> bool {
        match self {
            BackendId::FastCgi => host.fastcgi,
            BackendId::PageSpeed => host.pagespeed,
        }
    }

    /// Purges are applied asynchronously on the origin for both nginx modules.
    pub fn flush_may_be_delayed(self) -> bool {
        match self {
            BackendId::FastCgi | BackendId::PageSpeed => true,
        }
    }

    pub fn method(self) -> Method {
        match self {
            BackendId::FastCgi => Method::GET,
            BackendId::PageSpeed => Method::from_bytes(PURGE_METHOD.as_bytes())
                .unwrap_or(Method::GET),
        }
    }

    /// Status codes accepted as a successful purge.
    ///
    /// Debug mode also accepts 404 so already-evicted entries do not show up as failures.
    pub fn success_codes(self, debug: bool) -> &'static [u16] {
        if debug { &[200, 404] } else { &[200] }
    }

    pub fn is_success(self, status: Option<u16>, debug: bool) -> bool {
        status.is_some_and(|code| self.success_codes(debug).contains(&code))
    }

    /// Backend-specific rewrite of the relative path before the URL is built.
    fn backend_path(self, relative_path: &str) -> String {
        match self {
            BackendId::FastCgi => {
                format!("{PROXY_PURGE_PREFIX}/{}", relative_path.trim_start_matches('/'))
            }
            BackendId::PageSpeed => relative_path.to_string(),
        }
    }

    /// Absolute purge URL for `address` and `relative_path`.
    pub fn purge_url(self, address: &str, relative_path: &str, secure: bool) -> String {
        build_host_url(address, &self.backend_path(relative_path), secure)
    }

    pub fn request(self, host: &Host, relative_path: &str, secure: bool) -> PurgeRequest {
        let url = self.purge_url(&host.address, relative_path, secure);
        debug!(backend = %self, host = %host.display_name(), url = %url, "purge request prepared");
        PurgeRequest {
            backend: self,
            host: host.display_name().to_string(),
            method: self.method(),
            url,
        }
    }
}

impl fmt::Display for BackendId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendId {
    type Err = PurgeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "fastcgi" => Ok(BackendId::FastCgi),
            "pagespeed" => Ok(BackendId::PageSpeed),
            _ => Err(PurgeError::UnknownBackend(value.to_string())),
        }
    }
}

/// Backend choice made by CLI and scheduler callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendSelection {
    All,
    Only(BackendId),
}

impl BackendSelection {
    pub fn includes(self, backend: BackendId) -> bool {
        match self {
            BackendSelection::All => true,
            BackendSelection::Only(only) => only == backend,
        }
    }
}

impl FromStr for BackendSelection {
    type Err = PurgeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if value.trim().eq_ignore_ascii_case(ALL_BACKENDS_ID) {
            return Ok(BackendSelection::All);
        }
        value.parse().map(BackendSelection::Only)
    }
}

impl fmt::Display for BackendSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendSelection::All => f.write_str(ALL_BACKENDS_ID),
            BackendSelection::Only(backend) => fmt::Display::fmt(backend, f),
        }
    }
}

/// A single purge call for one `(backend, host)` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurgeRequest {
    pub backend: BackendId,
    /// Display name of the target host.
    pub host: String,
    pub method: Method,
    pub url: String,
}

/// Strip any scheme from `address`, append `/relative_path` and prefix the scheme
/// matching the inbound request.
pub fn build_host_url(address: &str, relative_path: &str, secure: bool) -> String {
    let bare = address
        .strip_prefix("http://")
        .or_else(|| address.strip_prefix("https://"))
        .unwrap_or(address);

    let mut url = String::with_capacity(bare.len() + relative_path.len() + 9);
    url.push_str(if secure { "https://" } else { "http://" });
    url.push_str(bare);
    if !relative_path.is_empty() {
        url.push('/');
        url.push_str(relative_path);
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host() -> Host {
        Host {
            address: "https://10.0.0.1".to_string(),
            name: Some("web-1".to_string()),
            fastcgi: true,
            pagespeed: false,
        }
    }

    #[test]
    fn host_url_strips_scheme_and_applies_inbound_scheme() {
        assert_eq!(build_host_url("https://10.0.0.1", "blog", false), "http://10.0.0.1/blog");
        assert_eq!(build_host_url("10.0.0.1", "blog", true), "https://10.0.0.1/blog");
        assert_eq!(build_host_url("10.0.0.1", "", false), "http://10.0.0.1");
    }

    #[test]
    fn proxy_backend_prefixes_purge_segment_and_uses_get() {
        let request = BackendId::FastCgi.request(&host(), "blog/post-1", false);
        assert_eq!(request.url, "http://10.0.0.1/purge/blog/post-1");
        assert_eq!(request.method, Method::GET);
        assert_eq!(request.host, "web-1");

        let all = BackendId::FastCgi.purge_url("10.0.0.1", PURGE_ALL_PATH, false);
        assert_eq!(all, "http://10.0.0.1/purge/*");
    }

    #[test]
    fn full_page_backend_uses_purge_method_on_plain_path() {
        let request = BackendId::PageSpeed.request(&host(), "blog/post-1", true);
        assert_eq!(request.url, "https://10.0.0.1/blog/post-1");
        assert_eq!(request.method.as_str(), "PURGE");

        let all = BackendId::PageSpeed.purge_url("10.0.0.1", PURGE_ALL_PATH, false);
        assert_eq!(all, "http://10.0.0.1/*");
    }

    #[test]
    fn home_path_purges_bare_host() {
        assert_eq!(BackendId::PageSpeed.purge_url("10.0.0.1", "", false), "http://10.0.0.1");
        assert_eq!(BackendId::FastCgi.purge_url("10.0.0.1", "", false), "http://10.0.0.1/purge/");
    }

    #[test]
    fn success_codes_depend_on_debug_mode() {
        assert!(BackendId::FastCgi.is_success(Some(200), false));
        assert!(!BackendId::FastCgi.is_success(Some(404), false));
        assert!(BackendId::FastCgi.is_success(Some(404), true));
        assert!(!BackendId::PageSpeed.is_success(Some(500), true));
        assert!(!BackendId::PageSpeed.is_success(None, true));
    }

    #[test]
    fn backend_enabled_flags_follow_host() {
        let host = host();
        assert!(BackendId::FastCgi.enabled_on(&host));
        assert!(!BackendId::PageSpeed.enabled_on(&host));
    }

    #[test]
    fn selection_parses_known_identifiers() {
        assert_eq!("all".parse::<BackendSelection>().ok(), Some(BackendSelection::All));
        assert_eq!(
            "fastcgi".parse::<BackendSelection>().ok(),
            Some(BackendSelection::Only(BackendId::FastCgi))
        );
        assert_eq!(
            " PageSpeed ".parse::<BackendSelection>().ok(),
            Some(BackendSelection::Only(BackendId::PageSpeed))
        );

        let err = "varnish".parse::<BackendSelection>().expect_err("unknown backend");
        assert!(matches!(err, PurgeError::UnknownBackend(name) if name == "varnish"));
    }

    #[test]
    fn selection_includes() {
        assert!(BackendSelection::All.includes(BackendId::PageSpeed));
        assert!(BackendSelection::Only(BackendId::FastCgi).includes(BackendId::FastCgi));
        assert!(!BackendSelection::Only(BackendId::FastCgi).includes(BackendId::PageSpeed));
    }
}
