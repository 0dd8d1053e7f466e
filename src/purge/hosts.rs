//! Host registry.
//!
//! Loads the fleet of cache-origin servers from a JSON document on disk or
//! behind a URL. Anything wrong with that document degrades to the built-in
//! localhost entry; purging never fails because host configuration is missing.

use std::fmt;
use std::path::{Path, PathBuf};

use metrics::counter;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

/// Host document written when none exists yet.
pub const DEFAULT_HOSTS_JSON: &str =
    r#"{"servers":[{"name":"localhost","ip":"127.0.0.1","pagespeed":true,"fastcgi":true}]}"#;

const DEFAULT_HOST_NAME: &str = "localhost";
const DEFAULT_HOST_ADDRESS: &str = "127.0.0.1";

const METRIC_HOST_CONFIG_FALLBACK: &str = "edgepurge_host_config_fallback_total";

/// One cache-origin server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Host {
    /// IP address or hostname, optionally with a scheme.
    #[serde(rename = "ip")]
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub fastcgi: bool,
    #[serde(default)]
    pub pagespeed: bool,
}

impl Host {
    /// The built-in host used whenever no usable configuration exists.
    pub fn localhost() -> Self {
        Self {
            address: DEFAULT_HOST_ADDRESS.to_string(),
            name: Some(DEFAULT_HOST_NAME.to_string()),
            fastcgi: true,
            pagespeed: true,
        }
    }

    /// Anonymous host with every backend enabled, as produced by address overrides.
    pub fn with_all_backends(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            name: None,
            fastcgi: true,
            pagespeed: true,
        }
    }

    /// Name used in reports; unnamed hosts are shown by address.
    pub fn display_name(&self) -> &str {
        match self.name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => &self.address,
        }
    }

    pub fn has_any_backend(&self) -> bool {
        self.fastcgi || self.pagespeed
    }
}

/// Where the host document lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostSource {
    Path(PathBuf),
    Url(Url),
}

impl HostSource {
    /// Interpret `value` as an absolute http(s) URL, otherwise as a path relative to `base_dir`.
    pub fn parse(value: &str, base_dir: &Path) -> Self {
        let value = value.trim();
        if let Ok(url) = Url::parse(value) {
            if matches!(url.scheme(), "http" | "https") && url.has_host() {
                return HostSource::Url(url);
            }
        }

        let path = PathBuf::from(value);
        if path.is_absolute() {
            HostSource::Path(path)
        } else {
            HostSource::Path(base_dir.join(path))
        }
    }
}

impl fmt::Display for HostSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostSource::Path(path) => write!(f, "{}", path.display()),
            HostSource::Url(url) => write!(f, "{url}"),
        }
    }
}

/// One-shot list of raw addresses replacing the configured source for a single dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverrideHosts(Vec<String>);

impl OverrideHosts {
    /// Split a comma-separated address list, trimming entries and dropping blanks.
    ///
    /// Returns `None` when nothing usable remains.
    pub fn parse(list: &str) -> Option<Self> {
        Self::from_addresses(list.split(','))
    }

    pub fn from_addresses<I, S>(addresses: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let addresses: Vec<String> = addresses
            .into_iter()
            .map(|address| address.as_ref().trim().to_string())
            .filter(|address| !address.is_empty())
            .collect();
        (!addresses.is_empty()).then_some(Self(addresses))
    }

    pub fn addresses(&self) -> &[String] {
        &self.0
    }

    fn into_hosts(self) -> Vec<Host> {
        self.0.into_iter().map(Host::with_all_backends).collect()
    }
}

/// Where the hosts of a registry came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryOrigin {
    Configured,
    Override,
    /// The configured source was unusable; the reason is kept for reporting.
    Fallback(String),
}

/// Immutable set of target hosts for one dispatch operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostRegistry {
    hosts: Vec<Host>,
    origin: RegistryOrigin,
}

impl HostRegistry {
    pub fn new(hosts: Vec<Host>, origin: RegistryOrigin) -> Self {
        Self { hosts, origin }
    }

    pub fn fallback(reason: impl Into<String>) -> Self {
        Self::new(vec![Host::localhost()], RegistryOrigin::Fallback(reason.into()))
    }

    pub fn hosts(&self) -> &[Host] {
        &self.hosts
    }

    pub fn origin(&self) -> &RegistryOrigin {
        &self.origin
    }

    /// True iff at least one host has at least one backend enabled.
    pub fn has_any_cache_enabled(&self) -> bool {
        self.hosts.iter().any(Host::has_any_backend)
    }
}

/// Reasons the configured host document could not be used.
#[derive(Debug, Error)]
pub enum HostConfigError {
    #[error("host file `{}` does not exist", .0.display())]
    Missing(PathBuf),
    #[error("host list `{0}` answered 404")]
    NotFound(Url),
    #[error("failed to read host file `{}`: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to fetch host list `{url}`: {source}")]
    Http {
        url: Url,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to parse host document: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("host document has no `servers` list")]
    NoServers,
}

#[derive(Debug, Deserialize)]
struct RawHostDocument {
    #[serde(default)]
    servers: Option<Vec<RawHost>>,
}

#[derive(Debug, Deserialize)]
struct RawHost {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    ip: Option<String>,
    #[serde(default)]
    fastcgi: Option<bool>,
    #[serde(default)]
    pagespeed: Option<bool>,
}

/// Parse a host document, normalizing addresses and skipping entries without one.
///
/// An empty `servers` array is a valid configuration with zero hosts; only a
/// document without a `servers` array is rejected.
pub fn parse_hosts(document: &str) -> Result<Vec<Host>, HostConfigError> {
    let raw: RawHostDocument = serde_json::from_str(document)?;
    let servers = raw.servers.ok_or(HostConfigError::NoServers)?;
    let hosts = servers
        .into_iter()
        .filter_map(|server| {
            let address = server
                .ip
                .map(|ip| ip.trim().trim_end_matches('/').to_string())
                .filter(|ip| !ip.is_empty());
            let Some(address) = address else {
                warn!(name = ?server.name, "Host entry without address skipped");
                return None;
            };
            Some(Host {
                address,
                name: server.name.filter(|name| !name.trim().is_empty()),
                fastcgi: server.fastcgi.unwrap_or(false),
                pagespeed: server.pagespeed.unwrap_or(false),
            })
        })
        .collect();
    Ok(hosts)
}

/// Reads host documents from disk or over HTTP.
#[derive(Debug, Clone)]
pub struct HostLoader {
    client: Client,
}

impl HostLoader {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build the registry for one dispatch.
    ///
    /// `override_hosts` wins over `source` and is consumed by this call.
    pub async fn load(&self, source: &HostSource, override_hosts: Option<OverrideHosts>) -> HostRegistry {
        if let Some(override_hosts) = override_hosts {
            debug!(hosts = ?override_hosts.addresses(), "Using host override");
            return HostRegistry::new(override_hosts.into_hosts(), RegistryOrigin::Override);
        }

        match self.read(source).await.and_then(|document| parse_hosts(&document)) {
            Ok(hosts) => {
                debug!(source = %source, count = hosts.len(), "Host registry loaded");
                HostRegistry::new(hosts, RegistryOrigin::Configured)
            }
            Err(err) => {
                warn!(source = %source, error = %err, "Host configuration unusable, falling back to localhost");
                counter!(METRIC_HOST_CONFIG_FALLBACK).increment(1);
                HostRegistry::fallback(err.to_string())
            }
        }
    }

    /// A path source is valid when the file exists, a URL source when it does not answer 404.
    pub async fn validate(&self, source: &HostSource) -> Result<(), HostConfigError> {
        match source {
            HostSource::Path(path) => {
                if tokio::fs::try_exists(path).await.unwrap_or(false) {
                    Ok(())
                } else {
                    Err(HostConfigError::Missing(path.clone()))
                }
            }
            HostSource::Url(url) => {
                let response = self
                    .client
                    .head(url.clone())
                    .send()
                    .await
                    .map_err(|source| HostConfigError::Http { url: url.clone(), source })?;
                if response.status() == StatusCode::NOT_FOUND {
                    Err(HostConfigError::NotFound(url.clone()))
                } else {
                    Ok(())
                }
            }
        }
    }

    async fn read(&self, source: &HostSource) -> Result<String, HostConfigError> {
        match source {
            HostSource::Path(path) => {
                self.validate(source).await?;
                tokio::fs::read_to_string(path)
                    .await
                    .map_err(|source| HostConfigError::Read { path: path.clone(), source })
            }
            HostSource::Url(url) => {
                let http_err = |source| HostConfigError::Http { url: url.clone(), source };
                let response = self.client.get(url.clone()).send().await.map_err(http_err)?;
                if response.status() == StatusCode::NOT_FOUND {
                    return Err(HostConfigError::NotFound(url.clone()));
                }
                response.text().await.map_err(http_err)
            }
        }
    }
}
