//! Aggregated result of one dispatch call.

use std::collections::BTreeMap;
use std::fmt;

use super::backend::BackendId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Classification {
    Success,
    Failure,
}

impl Classification {
    pub fn as_str(self) -> &'static str {
        match self {
            Classification::Success => "success",
            Classification::Failure => "failure",
        }
    }
}

/// Hosts affected for one backend under one classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendEntry {
    pub backend: BackendId,
    /// Host display names in first-seen order, without duplicates.
    pub hosts: Vec<String>,
    /// Last purged item per host (a relative path or `*`).
    pub items: BTreeMap<String, String>,
    pub flush_may_be_delayed: bool,
}

impl BackendEntry {
    fn new(backend: BackendId, flush_may_be_delayed: bool) -> Self {
        Self {
            backend,
            hosts: Vec::new(),
            items: BTreeMap::new(),
            flush_may_be_delayed,
        }
    }

    fn add(&mut self, host: &str, item: &str) {
        if !self.hosts.iter().any(|known| known == host) {
            self.hosts.push(host.to_string());
        }
        self.items.insert(host.to_string(), item.to_string());
    }
}

/// Conditions reported next to (or instead of) purge results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PurgeWarning {
    /// A multi-path purge resolved to zero paths.
    NothingToPurge,
    /// A single purge was requested without a path.
    MissingPath,
    /// No host has any backend enabled.
    NoCacheEnabled,
    /// The configured host document was unusable; the default host was used.
    HostConfigFallback { reason: String },
}

impl fmt::Display for PurgeWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PurgeWarning::NothingToPurge => f.write_str(
                "Nothing is purged. If you expected a purge, please check the purge settings.",
            ),
            PurgeWarning::MissingPath => {
                f.write_str("Could not purge single file, because no valid path was given.")
            }
            PurgeWarning::NoCacheEnabled => {
                f.write_str("No cache is enabled on any configured host.")
            }
            PurgeWarning::HostConfigFallback { reason } => {
                write!(f, "Host configuration could not be used ({reason}); purged the default host instead.")
            }
        }
    }
}

/// Per-backend success and failure host lists plus warnings.
///
/// Created fresh for every dispatch call; results of several paths accumulate
/// through [`PurgeOutcome::merge`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PurgeOutcome {
    success: BTreeMap<BackendId, BackendEntry>,
    failure: BTreeMap<BackendId, BackendEntry>,
    warnings: Vec<PurgeWarning>,
}

impl PurgeOutcome {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_warning(warning: PurgeWarning) -> Self {
        let mut outcome = Self::default();
        outcome.warn(warning);
        outcome
    }

    /// Record `host` under `backend` with the backend's own flush-delay flag.
    pub fn record(&mut self, class: Classification, backend: BackendId, host: &str, item: &str) {
        self.record_with_delay(class, backend, host, item, backend.flush_may_be_delayed());
    }

    /// Record `host` with an explicit flush-delay flag. An entry stays delayed once
    /// any recording marks it so.
    pub fn record_with_delay(
        &mut self,
        class: Classification,
        backend: BackendId,
        host: &str,
        item: &str,
        flush_may_be_delayed: bool,
    ) {
        let entry = self
            .entries_mut(class)
            .entry(backend)
            .or_insert_with(|| BackendEntry::new(backend, flush_may_be_delayed));
        entry.flush_may_be_delayed |= flush_may_be_delayed;
        entry.add(host, item);
    }

    pub fn warn(&mut self, warning: PurgeWarning) {
        if !self.warnings.contains(&warning) {
            self.warnings.push(warning);
        }
    }

    /// Fold `other` into `self`; host lists accumulate instead of being replaced.
    pub fn merge(&mut self, other: PurgeOutcome) {
        let PurgeOutcome {
            success,
            failure,
            warnings,
        } = other;

        for (class, entries) in [
            (Classification::Success, success),
            (Classification::Failure, failure),
        ] {
            for (backend, entry) in entries {
                let delayed = entry.flush_may_be_delayed;
                let target = self
                    .entries_mut(class)
                    .entry(backend)
                    .or_insert_with(|| BackendEntry::new(backend, delayed));
                target.flush_may_be_delayed |= delayed;
                for host in &entry.hosts {
                    let item = entry.items.get(host).map(String::as_str).unwrap_or_default();
                    target.add(host, item);
                }
            }
        }
        for warning in warnings {
            self.warn(warning);
        }
    }

    /// Entries for `class` in backend registration order.
    pub fn entries(&self, class: Classification) -> impl Iterator<Item = &BackendEntry> {
        self.entries_ref(class).values()
    }

    pub fn entry(&self, class: Classification, backend: BackendId) -> Option<&BackendEntry> {
        self.entries_ref(class).get(&backend)
    }

    /// Host names recorded for `backend` under `class`; empty when absent.
    pub fn hosts(&self, class: Classification, backend: BackendId) -> &[String] {
        self.entry(class, backend)
            .map(|entry| entry.hosts.as_slice())
            .unwrap_or_default()
    }

    pub fn warnings(&self) -> &[PurgeWarning] {
        &self.warnings
    }

    pub fn has_failures(&self) -> bool {
        !self.failure.is_empty()
    }

    /// No success or failure entry was recorded.
    pub fn is_empty(&self) -> bool {
        self.success.is_empty() && self.failure.is_empty()
    }

    fn entries_ref(&self, class: Classification) -> &BTreeMap<BackendId, BackendEntry> {
        match class {
            Classification::Success => &self.success,
            Classification::Failure => &self.failure,
        }
    }

    fn entries_mut(&mut self, class: Classification) -> &mut BTreeMap<BackendId, BackendEntry> {
        match class {
            Classification::Success => &mut self.success,
            Classification::Failure => &mut self.failure,
        }
    }
}
