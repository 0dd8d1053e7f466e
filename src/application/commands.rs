//! CLI command handlers.
//!
//! Each handler builds a dispatcher from the resolved settings, runs one
//! purge operation and returns the formatted report. Remote-host failures are
//! part of the report; only configuration and programmer errors become
//! [`AppError`]s.

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::config::{
    CheckArgs, Command, PurgeArgs, PurgeContentArgs, PurgeUrlArgs, ScheduleArgs, Settings,
};
use crate::domain::ContentItem;
use crate::infra::settings_store;
use crate::purge::{
    AssignedCommerceTerms, ContentEvent, OverrideHosts, PurgeConfig, PurgeDispatcher,
    PurgeOutcome, PurgeReport, PurgeResolver, PurgeTrigger, PurgeWarning, report,
};

use super::error::AppError;

/// Run `command` against `settings`, writing reports to stdout.
///
/// `root` is the directory settings documents are written to.
pub async fn execute(
    command: Command,
    settings: &Settings,
    site_id: Option<&str>,
    root: &Path,
) -> Result<(), AppError> {
    match command {
        Command::Purge(args) => print_report(&purge(settings, &args).await?),
        Command::PurgeUrl(args) => print_report(&purge_url(settings, &args).await?),
        Command::PurgeContent(args) => print_report(&purge_content(settings, &args).await?),
        Command::Check(args) => println!("{}", check(settings, &args).await?),
        Command::FactoryReset => println!("{}", factory_reset(root, site_id).await?),
        Command::Schedule(args) => schedule(settings, &args).await?,
    }
    Ok(())
}

fn print_report(report: &PurgeReport) {
    if !report.is_empty() {
        println!("{report}");
    }
}

fn build_dispatcher(settings: &Settings) -> Result<PurgeDispatcher, AppError> {
    PurgeDispatcher::new(PurgeConfig::from(settings), settings.hosts.source()).map_err(AppError::from)
}

fn override_hosts(ips: Option<&str>) -> Option<OverrideHosts> {
    ips.and_then(OverrideHosts::parse)
}

/// `purge --cache <id> [--ips ...]`: purge everything on the selected backends.
pub async fn purge(settings: &Settings, args: &PurgeArgs) -> Result<PurgeReport, AppError> {
    let dispatcher = build_dispatcher(settings)?;

    let outcome = match override_hosts(args.ips.as_deref()) {
        Some(hosts) => {
            info!(hosts = ?hosts.addresses(), cache = %args.cache, "Purging override hosts");
            dispatcher
                .with_override(hosts)
                .purge_backend_only(&args.cache)
                .await?
        }
        None => dispatcher.purge_backend_only(&args.cache).await?,
    };

    Ok(report::format(&outcome))
}

/// `purge-url <PATH>...`: one path is a single purge, several are a batch.
pub async fn purge_url(settings: &Settings, args: &PurgeUrlArgs) -> Result<PurgeReport, AppError> {
    let dispatcher = build_dispatcher(settings)?;
    let hosts = override_hosts(args.ips.as_deref());

    let outcome = match (args.paths.as_slice(), hosts) {
        ([path], Some(hosts)) => dispatcher.with_override(hosts).purge_single(path).await,
        ([path], None) => dispatcher.purge_single(path).await,
        (paths, Some(hosts)) => dispatcher.with_override(hosts).purge_multiple(paths).await,
        (paths, None) => dispatcher.purge_multiple(paths).await,
    };

    Ok(report::format(&outcome))
}

/// `purge-content`: treat the item as an updated published item and apply its class policy.
pub async fn purge_content(
    settings: &Settings,
    args: &PurgeContentArgs,
) -> Result<PurgeReport, AppError> {
    let dispatcher = Arc::new(build_dispatcher(settings)?);
    let resolver = PurgeResolver::with_commerce(
        dispatcher.config().home_url.clone(),
        Arc::new(AssignedCommerceTerms),
    );
    let trigger = PurgeTrigger::new(dispatcher, resolver, settings.policy);

    let item = ContentItem::new(args.kind.as_str(), args.class.into(), args.path.as_str())
        .with_term_links(&args.term_urls)
        .with_commerce_term_links(&args.commerce_term_urls);

    let outcome = trigger
        .handle(ContentEvent::Saved { item, update: true })
        .await
        .unwrap_or_else(|| PurgeOutcome::with_warning(PurgeWarning::NothingToPurge));

    Ok(report::format(&outcome))
}

/// `check`: report whether any configured host has a cache enabled.
pub async fn check(settings: &Settings, args: &CheckArgs) -> Result<String, AppError> {
    let dispatcher = build_dispatcher(settings)?;
    let source = dispatcher.source().clone();

    if let Err(err) = dispatcher.loader().validate(&source).await {
        warn!(
            source = %source,
            hosts_source_override = args.hosts_source.is_some(),
            error = %err,
            "Host document unusable, localhost is assumed"
        );
    }

    if dispatcher.has_minimal_one_cache_enabled().await {
        Ok(format!("At least one cache is enabled (hosts from {source})."))
    } else {
        Err(AppError::validation(format!(
            "no cache backend is enabled on any host listed in {source}"
        )))
    }
}

/// `factory-reset`: rewrite the site's settings document with defaults.
pub async fn factory_reset(root: &Path, site_id: Option<&str>) -> Result<String, AppError> {
    let path = settings_store::factory_reset(root, site_id).await?;
    Ok(format!(
        "Settings reset to factory defaults in {}.",
        path.display()
    ))
}

/// Purge everything once on each scheduled backend, merged into one report.
pub async fn run_scheduled_purge(
    dispatcher: &PurgeDispatcher,
    settings: &Settings,
) -> Result<PurgeReport, AppError> {
    let mut outcome = PurgeOutcome::new();
    for backend in &settings.schedule.backends {
        outcome.merge(dispatcher.purge_backend_only(backend.as_str()).await?);
    }
    if settings.schedule.backends.is_empty() {
        outcome.warn(PurgeWarning::NothingToPurge);
    }
    Ok(report::format(&outcome))
}

/// `schedule`: wait for the daily time and purge, until interrupted.
async fn schedule(settings: &Settings, args: &ScheduleArgs) -> Result<(), AppError> {
    let dispatcher = build_dispatcher(settings)?;

    if args.once {
        print_report(&run_scheduled_purge(&dispatcher, settings).await?);
        return Ok(());
    }

    if !settings.schedule.enabled {
        return Err(AppError::validation(
            "scheduled purge is disabled; set schedule.enabled = true or pass --once",
        ));
    }

    let daily = settings.schedule.daily;
    loop {
        let now = Utc::now();
        let wait = daily.duration_until_next(now);
        info!(
            schedule = %daily,
            next_run = %daily.next_run_after(now),
            "Waiting for scheduled purge"
        );

        tokio::select! {
            _ = tokio::time::sleep(wait) => {}
            signal = tokio::signal::ctrl_c() => {
                signal.map_err(|err| AppError::unexpected(format!("failed to listen for shutdown: {err}")))?;
                info!("Scheduled purge stopped");
                return Ok(());
            }
        }

        print_report(&run_scheduled_purge(&dispatcher, settings).await?);
    }
}
