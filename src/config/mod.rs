//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{
    num::NonZeroUsize,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use chrono_tz::Tz;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

use crate::purge::{
    BACKENDS, BackendId, DEFAULT_SCHEDULE_TIME, DailySchedule, HostSource, PolicySet, PurgePolicy,
};

mod cli;
#[cfg(test)]
mod tests;

pub use cli::{
    CheckArgs, CliArgs, Command, ContentClassArg, DispatchOverrides, PurgeArgs, PurgeContentArgs,
    PurgeUrlArgs, ScheduleArgs,
};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "edgepurge";
const SITE_CONFIG_DIR: &str = "sites";
const ENV_PREFIX: &str = "EDGEPURGE";
const DEFAULT_HOME_URL: &str = "http://localhost";
const DEFAULT_HOSTS_SOURCE: &str = "hosts.json";
const DEFAULT_HOSTS_BASE_DIR: &str = ".";
const DEFAULT_TIMEOUT_SECS: u64 = 5;
const DEFAULT_CONCURRENCY: u64 = 8;
const DEFAULT_TIMEZONE: &str = "UTC";
const DEFAULT_LOG_LEVEL: &str = "info";

/// Fully-resolved settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub site: SiteSettings,
    pub hosts: HostsSettings,
    pub dispatch: DispatchSettings,
    pub policy: PolicySet,
    pub schedule: ScheduleSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone)]
pub struct SiteSettings {
    pub home_url: Url,
    /// Hostname (with port when non-default) sent as the `Host` header.
    pub host: String,
}

#[derive(Debug, Clone)]
pub struct HostsSettings {
    pub source: String,
    pub base_dir: PathBuf,
}

impl HostsSettings {
    pub fn source(&self) -> HostSource {
        HostSource::parse(&self.source, &self.base_dir)
    }
}

#[derive(Debug, Clone)]
pub struct DispatchSettings {
    pub timeout: Duration,
    pub concurrency: NonZeroUsize,
    pub debug: bool,
    pub inbound_https: bool,
    pub report_partial_success: bool,
}

#[derive(Debug, Clone)]
pub struct ScheduleSettings {
    pub enabled: bool,
    pub daily: DailySchedule,
    pub backends: Vec<BackendId>,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Settings document for a site: `edgepurge.toml`, or `sites/<site_id>.toml`.
pub fn settings_document_path(site_id: Option<&str>) -> PathBuf {
    match site_id {
        Some(site_id) => Path::new(SITE_CONFIG_DIR).join(format!("{site_id}.toml")),
        None => PathBuf::from(format!("{LOCAL_CONFIG_BASENAME}.toml")),
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(site_id) = cli.site_id.as_deref() {
        let site_basename = format!("{SITE_CONFIG_DIR}/{site_id}");
        builder = builder.add_source(File::with_name(&site_basename).required(false));
    }

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;
    raw.apply_cli(cli);

    Settings::from_raw(raw)
}

/// Persisted settings document. Every field is optional so partial files and
/// environment overlays merge cleanly.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RawSettings {
    pub site: RawSiteSettings,
    pub hosts: RawHostsSettings,
    pub dispatch: RawDispatchSettings,
    pub policy: RawPolicySettings,
    pub schedule: RawScheduleSettings,
    pub logging: RawLoggingSettings,
}

impl RawSettings {
    /// Document with every key set to its default value.
    pub fn factory_defaults() -> Self {
        let policy = RawPolicy::from(PurgePolicy::default());
        Self {
            site: RawSiteSettings {
                home_url: Some(DEFAULT_HOME_URL.to_string()),
            },
            hosts: RawHostsSettings {
                source: Some(DEFAULT_HOSTS_SOURCE.to_string()),
                base_dir: Some(PathBuf::from(DEFAULT_HOSTS_BASE_DIR)),
            },
            dispatch: RawDispatchSettings {
                timeout_seconds: Some(DEFAULT_TIMEOUT_SECS),
                concurrency: Some(DEFAULT_CONCURRENCY),
                debug: Some(false),
                inbound_https: Some(false),
                report_partial_success: Some(false),
            },
            policy: RawPolicySettings {
                builtin: policy.clone(),
                custom: policy,
            },
            schedule: RawScheduleSettings {
                enabled: Some(false),
                time: Some(DEFAULT_SCHEDULE_TIME.to_string()),
                timezone: Some(DEFAULT_TIMEZONE.to_string()),
                backends: Some(BACKENDS.iter().map(|id| id.as_str().to_string()).collect()),
            },
            logging: RawLoggingSettings {
                level: Some(DEFAULT_LOG_LEVEL.to_string()),
                json: Some(false),
            },
        }
    }

    fn apply_cli(&mut self, cli: &CliArgs) {
        if let Some(level) = cli.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = cli.log_json {
            self.logging.json = Some(json);
        }

        match &cli.command {
            Command::Purge(args) => self.apply_dispatch_overrides(&args.overrides),
            Command::PurgeUrl(args) => self.apply_dispatch_overrides(&args.overrides),
            Command::PurgeContent(args) => self.apply_dispatch_overrides(&args.overrides),
            Command::Schedule(args) => self.apply_dispatch_overrides(&args.overrides),
            Command::Check(args) => {
                if let Some(source) = args.hosts_source.as_ref() {
                    self.hosts.source = Some(source.clone());
                }
            }
            Command::FactoryReset => {}
        }
    }

    fn apply_dispatch_overrides(&mut self, overrides: &DispatchOverrides) {
        if let Some(source) = overrides.hosts_source.as_ref() {
            self.hosts.source = Some(source.clone());
        }
        if let Some(seconds) = overrides.timeout_seconds {
            self.dispatch.timeout_seconds = Some(seconds);
        }
        if let Some(count) = overrides.concurrency {
            self.dispatch.concurrency = Some(count);
        }
        if let Some(debug) = overrides.debug {
            self.dispatch.debug = Some(debug);
        }
        if let Some(https) = overrides.https {
            self.dispatch.inbound_https = Some(https);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            site,
            hosts,
            dispatch,
            policy,
            schedule,
            logging,
        } = raw;

        Ok(Self {
            site: build_site_settings(site)?,
            hosts: build_hosts_settings(hosts)?,
            dispatch: build_dispatch_settings(dispatch)?,
            policy: build_policy_settings(policy),
            schedule: build_schedule_settings(schedule)?,
            logging: build_logging_settings(logging)?,
        })
    }
}

fn build_site_settings(site: RawSiteSettings) -> Result<SiteSettings, LoadError> {
    let value = site
        .home_url
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| DEFAULT_HOME_URL.to_string());

    let home_url = Url::parse(&value)
        .map_err(|err| LoadError::invalid("site.home_url", format!("failed to parse: {err}")))?;
    let hostname = home_url
        .host_str()
        .ok_or_else(|| LoadError::invalid("site.home_url", "URL must include a host"))?;
    let host = match home_url.port() {
        Some(port) => format!("{hostname}:{port}"),
        None => hostname.to_string(),
    };

    Ok(SiteSettings { home_url, host })
}

fn build_hosts_settings(hosts: RawHostsSettings) -> Result<HostsSettings, LoadError> {
    let source = hosts
        .source
        .unwrap_or_else(|| DEFAULT_HOSTS_SOURCE.to_string());
    let source = source.trim().to_string();
    if source.is_empty() {
        return Err(LoadError::invalid("hosts.source", "must not be empty"));
    }

    let base_dir = hosts
        .base_dir
        .unwrap_or_else(|| PathBuf::from(DEFAULT_HOSTS_BASE_DIR));
    if base_dir.as_os_str().is_empty() {
        return Err(LoadError::invalid("hosts.base_dir", "path must not be empty"));
    }

    Ok(HostsSettings { source, base_dir })
}

fn build_dispatch_settings(dispatch: RawDispatchSettings) -> Result<DispatchSettings, LoadError> {
    let timeout_seconds = dispatch.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECS);
    if timeout_seconds == 0 {
        return Err(LoadError::invalid(
            "dispatch.timeout_seconds",
            "must be greater than zero",
        ));
    }

    let concurrency = dispatch.concurrency.unwrap_or(DEFAULT_CONCURRENCY);
    let concurrency = usize::try_from(concurrency)
        .ok()
        .and_then(NonZeroUsize::new)
        .ok_or_else(|| {
            LoadError::invalid("dispatch.concurrency", "must be greater than zero")
        })?;

    Ok(DispatchSettings {
        timeout: Duration::from_secs(timeout_seconds),
        concurrency,
        debug: dispatch.debug.unwrap_or(false),
        inbound_https: dispatch.inbound_https.unwrap_or(false),
        report_partial_success: dispatch.report_partial_success.unwrap_or(false),
    })
}

fn build_policy_settings(policy: RawPolicySettings) -> PolicySet {
    PolicySet {
        builtin: policy.builtin.into_policy(),
        custom: policy.custom.into_policy(),
    }
}

fn build_schedule_settings(schedule: RawScheduleSettings) -> Result<ScheduleSettings, LoadError> {
    let timezone_name = schedule
        .timezone
        .unwrap_or_else(|| DEFAULT_TIMEZONE.to_string());
    let timezone = Tz::from_str(timezone_name.trim()).map_err(|err| {
        LoadError::invalid("schedule.timezone", format!("unknown time zone: {err}"))
    })?;

    let time = schedule
        .time
        .unwrap_or_else(|| DEFAULT_SCHEDULE_TIME.to_string());
    let daily = DailySchedule::parse(time.trim(), timezone)
        .map_err(|err| LoadError::invalid("schedule.time", err.to_string()))?;

    let backends = match schedule.backends {
        Some(names) => {
            let mut backends = Vec::with_capacity(names.len());
            for name in names {
                let backend = BackendId::from_str(&name)
                    .map_err(|err| LoadError::invalid("schedule.backends", err.to_string()))?;
                if !backends.contains(&backend) {
                    backends.push(backend);
                }
            }
            backends
        }
        None => BACKENDS.to_vec(),
    };

    Ok(ScheduleSettings {
        enabled: schedule.enabled.unwrap_or(false),
        daily,
        backends,
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RawSiteSettings {
    home_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RawHostsSettings {
    source: Option<String>,
    base_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RawDispatchSettings {
    timeout_seconds: Option<u64>,
    concurrency: Option<u64>,
    debug: Option<bool>,
    inbound_https: Option<bool>,
    report_partial_success: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RawPolicySettings {
    builtin: RawPolicy,
    custom: RawPolicy,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RawPolicy {
    changed_url: Option<bool>,
    home: Option<bool>,
    site_taxonomy: Option<bool>,
    commerce_taxonomy: Option<bool>,
    everything: Option<bool>,
}

impl RawPolicy {
    fn into_policy(self) -> PurgePolicy {
        let defaults = PurgePolicy::default();
        PurgePolicy {
            changed_url: self.changed_url.unwrap_or(defaults.changed_url),
            home: self.home.unwrap_or(defaults.home),
            site_taxonomy: self.site_taxonomy.unwrap_or(defaults.site_taxonomy),
            commerce_taxonomy: self.commerce_taxonomy.unwrap_or(defaults.commerce_taxonomy),
            everything: self.everything.unwrap_or(defaults.everything),
        }
    }
}

impl From<PurgePolicy> for RawPolicy {
    fn from(policy: PurgePolicy) -> Self {
        Self {
            changed_url: Some(policy.changed_url),
            home: Some(policy.home),
            site_taxonomy: Some(policy.site_taxonomy),
            commerce_taxonomy: Some(policy.commerce_taxonomy),
            everything: Some(policy.everything),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RawScheduleSettings {
    enabled: Option<bool>,
    time: Option<String>,
    timezone: Option<String>,
    backends: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}
