//! Purge dispatcher and aggregator.
//!
//! Loads the host registry once per call, fans purge requests out to every
//! enabled `(host, backend)` pair and folds the answers into a [`PurgeOutcome`].

use std::sync::Arc;
use std::time::Instant;

use futures::{StreamExt, stream};
use metrics::{counter, histogram};
use tracing::{error, info, instrument, warn};

use super::PurgeError;
use super::backend::{BACKENDS, BackendSelection, PURGE_ALL_PATH, PurgeRequest};
use super::config::PurgeConfig;
use super::hosts::{HostLoader, HostRegistry, HostSource, OverrideHosts, RegistryOrigin};
use super::outcome::{Classification, PurgeOutcome, PurgeWarning};
use super::policy::PurgeTarget;
use super::transport::{HttpTransport, PurgeTransport};

const METRIC_PURGE_REQUESTS: &str = "edgepurge_purge_requests_total";
const METRIC_DISPATCH_MS: &str = "edgepurge_dispatch_ms";

/// What one dispatch call purges.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Plan {
    All(BackendSelection),
    Single(String),
    Multiple(Vec<String>),
}

impl Plan {
    fn operation(&self) -> &'static str {
        match self {
            Plan::All(BackendSelection::All) => "all",
            Plan::All(BackendSelection::Only(_)) => "backend_only",
            Plan::Single(_) => "single",
            Plan::Multiple(_) => "multiple",
        }
    }
}

/// Entry point for every purge trigger.
///
/// Holds no cross-request state: concurrent calls are independent and each
/// loads its own registry.
pub struct PurgeDispatcher {
    config: PurgeConfig,
    source: HostSource,
    loader: HostLoader,
    transport: Arc<dyn PurgeTransport>,
}

impl PurgeDispatcher {
    /// Dispatcher backed by the HTTP transport.
    pub fn new(config: PurgeConfig, source: HostSource) -> Result<Self, PurgeError> {
        let transport = HttpTransport::new(&config)?;
        let loader = HostLoader::new(transport.client().clone());
        Ok(Self::with_transport(config, source, loader, Arc::new(transport)))
    }

    pub fn with_transport(
        config: PurgeConfig,
        source: HostSource,
        loader: HostLoader,
        transport: Arc<dyn PurgeTransport>,
    ) -> Self {
        Self {
            config,
            source,
            loader,
            transport,
        }
    }

    pub fn config(&self) -> &PurgeConfig {
        &self.config
    }

    pub fn source(&self) -> &HostSource {
        &self.source
    }

    pub fn loader(&self) -> &HostLoader {
        &self.loader
    }

    /// Purge everything on every enabled `(host, backend)` pair.
    pub async fn purge_all(&self) -> PurgeOutcome {
        self.run(Plan::All(BackendSelection::All), None).await
    }

    /// Purge one relative path; an empty path yields a warning and no requests.
    pub async fn purge_single(&self, relative_path: &str) -> PurgeOutcome {
        self.run(Plan::Single(relative_path.to_string()), None).await
    }

    /// Purge every path once, accumulating results; an empty set yields a warning.
    pub async fn purge_multiple<I, S>(&self, relative_paths: I) -> PurgeOutcome
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.run(Plan::Multiple(collect_paths(relative_paths)), None)
            .await
    }

    /// Purge everything on a single named backend (`all` selects every backend).
    pub async fn purge_backend_only(&self, backend_id: &str) -> Result<PurgeOutcome, PurgeError> {
        let selection = parse_selection(backend_id)?;
        Ok(self.run(Plan::All(selection), None).await)
    }

    /// Dispatch a resolved target.
    pub async fn purge_target(&self, target: PurgeTarget) -> PurgeOutcome {
        self.run(plan_for(target), None).await
    }

    /// Whether any configured host has a backend enabled.
    pub async fn has_minimal_one_cache_enabled(&self) -> bool {
        self.loader
            .load(&self.source, None)
            .await
            .has_any_cache_enabled()
    }

    /// Target `hosts` instead of the configured registry for exactly one call.
    pub fn with_override(&self, hosts: OverrideHosts) -> OverrideDispatch<'_> {
        OverrideDispatch {
            dispatcher: self,
            hosts,
        }
    }

    #[instrument(skip(self, override_hosts), fields(operation = plan.operation()))]
    async fn run(&self, plan: Plan, override_hosts: Option<OverrideHosts>) -> PurgeOutcome {
        let started_at = Instant::now();
        let operation = plan.operation();

        let (selection, paths) = match plan {
            Plan::All(selection) => (selection, vec![PURGE_ALL_PATH.to_string()]),
            Plan::Single(path) => {
                if path.trim().is_empty() {
                    warn!("Single purge requested without a path");
                    return PurgeOutcome::with_warning(PurgeWarning::MissingPath);
                }
                (BackendSelection::All, vec![path])
            }
            Plan::Multiple(paths) => {
                if paths.is_empty() {
                    warn!("Multiple purge resolved to no paths");
                    return PurgeOutcome::with_warning(PurgeWarning::NothingToPurge);
                }
                (BackendSelection::All, paths)
            }
        };

        let registry = self.loader.load(&self.source, override_hosts).await;
        let mut outcome = PurgeOutcome::new();
        if let RegistryOrigin::Fallback(reason) = registry.origin() {
            outcome.warn(PurgeWarning::HostConfigFallback {
                reason: reason.clone(),
            });
        }
        if !registry.has_any_cache_enabled() {
            warn!(source = %self.source, "No cache enabled on any host");
            outcome.warn(PurgeWarning::NoCacheEnabled);
        }

        info!(
            operation,
            selection = %selection,
            hosts = registry.hosts().len(),
            paths = paths.len(),
            "Purge dispatch starting"
        );

        for path in &paths {
            let item = normalize_path(path);
            let batch = self.dispatch_batch(&registry, selection, &item).await;
            outcome.merge(batch);
        }

        info!(
            operation,
            failures = outcome.has_failures(),
            "Purge dispatch complete"
        );

        histogram!(METRIC_DISPATCH_MS, "operation" => operation)
            .record(started_at.elapsed().as_secs_f64() * 1000.0);

        outcome
    }

    /// Send one purge per enabled `(host, backend)` pair for `item` and classify the answers.
    async fn dispatch_batch(
        &self,
        registry: &HostRegistry,
        selection: BackendSelection,
        item: &str,
    ) -> PurgeOutcome {
        let requests: Vec<PurgeRequest> = registry
            .hosts()
            .iter()
            .flat_map(|host| {
                BACKENDS
                    .into_iter()
                    .filter(move |backend| selection.includes(*backend) && backend.enabled_on(host))
                    .map(move |backend| backend.request(host, item, self.config.inbound_https))
            })
            .collect();

        let transport = Arc::clone(&self.transport);
        let mut answers: Vec<(usize, PurgeRequest, Option<u16>)> =
            stream::iter(requests.into_iter().enumerate())
                .map(|(index, request)| {
                    let transport = Arc::clone(&transport);
                    async move {
                        let status = transport.send(&request).await;
                        (index, request, status)
                    }
                })
                .buffer_unordered(self.config.concurrency.get())
                .collect()
                .await;
        answers.sort_by_key(|(index, _, _)| *index);

        let mut outcome = PurgeOutcome::new();
        for backend in BACKENDS {
            let mut succeeded = Vec::new();
            let mut failed = Vec::new();
            for (_, request, status) in answers.iter().filter(|(_, request, _)| request.backend == backend) {
                let ok = backend.is_success(*status, self.config.debug);
                let result = match (ok, status) {
                    (true, _) => "success",
                    (false, Some(_)) => "failure",
                    (false, None) => "transport_error",
                };
                counter!(METRIC_PURGE_REQUESTS, "backend" => backend.as_str(), "result" => result)
                    .increment(1);
                if ok {
                    succeeded.push(request.host.as_str());
                } else {
                    failed.push(request.host.as_str());
                }
            }

            if succeeded.is_empty() && failed.is_empty() {
                continue;
            }

            if failed.is_empty() {
                for host in &succeeded {
                    outcome.record(Classification::Success, backend, host, item);
                }
            } else {
                for host in &failed {
                    outcome.record(Classification::Failure, backend, host, item);
                }
                if self.config.report_partial_success {
                    for host in &succeeded {
                        outcome.record(Classification::Success, backend, host, item);
                    }
                }
            }

            info!(
                backend = %backend,
                item,
                succeeded = ?succeeded,
                failed = ?failed,
                "Purge batch classified"
            );
        }

        outcome
    }
}

/// A dispatch bound to a one-shot host override; every method consumes it.
pub struct OverrideDispatch<'a> {
    dispatcher: &'a PurgeDispatcher,
    hosts: OverrideHosts,
}

impl OverrideDispatch<'_> {
    pub async fn purge_all(self) -> PurgeOutcome {
        self.dispatcher
            .run(Plan::All(BackendSelection::All), Some(self.hosts))
            .await
    }

    pub async fn purge_single(self, relative_path: &str) -> PurgeOutcome {
        self.dispatcher
            .run(Plan::Single(relative_path.to_string()), Some(self.hosts))
            .await
    }

    pub async fn purge_multiple<I, S>(self, relative_paths: I) -> PurgeOutcome
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.dispatcher
            .run(Plan::Multiple(collect_paths(relative_paths)), Some(self.hosts))
            .await
    }

    pub async fn purge_backend_only(self, backend_id: &str) -> Result<PurgeOutcome, PurgeError> {
        let selection = parse_selection(backend_id)?;
        Ok(self
            .dispatcher
            .run(Plan::All(selection), Some(self.hosts))
            .await)
    }
}

fn parse_selection(backend_id: &str) -> Result<BackendSelection, PurgeError> {
    backend_id.parse::<BackendSelection>().inspect_err(|err| {
        error!(backend = backend_id, error = %err, "Unknown purge backend requested");
    })
}

fn plan_for(target: PurgeTarget) -> Plan {
    match target {
        PurgeTarget::AllContent => Plan::All(BackendSelection::All),
        PurgeTarget::SingleUrl(path) => Plan::Single(path),
        PurgeTarget::MultipleUrls(paths) => Plan::Multiple(collect_paths(paths)),
    }
}

/// Normalize every path, then drop blank entries and duplicates, keeping first-seen order.
///
/// A blank entry carries no path and is dropped; `/` is the home page and
/// normalizes to the empty item.
fn collect_paths<I, S>(paths: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut unique: Vec<String> = Vec::new();
    for path in paths {
        let path = path.as_ref();
        if path.trim().is_empty() {
            continue;
        }
        let item = normalize_path(path);
        if !unique.contains(&item) {
            unique.push(item);
        }
    }
    unique
}

/// Relative paths are sent without their leading `/`; the home path becomes empty.
fn normalize_path(path: &str) -> String {
    path.trim().trim_start_matches('/').to_string()
}
