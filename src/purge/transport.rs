//! HTTP transport seam for purge requests.

use async_trait::async_trait;
use reqwest::{Client, header::HOST};
use tracing::{debug, warn};

use super::backend::PurgeRequest;
use super::config::PurgeConfig;

/// Sends one purge request and reports the raw status code.
///
/// Implementations swallow transport errors and return `None`, so one
/// unreachable host never aborts the rest of a fan-out.
#[async_trait]
pub trait PurgeTransport: Send + Sync {
    async fn send(&self, request: &PurgeRequest) -> Option<u16>;
}

/// `reqwest`-backed transport used in production.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    site_host: String,
}

impl HttpTransport {
    /// Build a client with the configured timeout and certificate checks disabled
    /// (purge targets are addressed by IP and commonly self-signed).
    pub fn new(config: &PurgeConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(config.timeout)
            .danger_accept_invalid_certs(true)
            .build()?;
        Ok(Self {
            client,
            site_host: config.site_host.clone(),
        })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl PurgeTransport for HttpTransport {
    async fn send(&self, request: &PurgeRequest) -> Option<u16> {
        let result = self
            .client
            .request(request.method.clone(), &request.url)
            .header(HOST, &self.site_host)
            .send()
            .await;

        match result {
            Ok(response) => {
                let status = response.status().as_u16();
                debug!(
                    backend = %request.backend,
                    host = %request.host,
                    url = %request.url,
                    status,
                    "Purge request answered"
                );
                Some(status)
            }
            Err(err) => {
                warn!(
                    backend = %request.backend,
                    host = %request.host,
                    url = %request.url,
                    timeout = err.is_timeout(),
                    error = %err,
                    "Purge request failed"
                );
                None
            }
        }
    }
}
