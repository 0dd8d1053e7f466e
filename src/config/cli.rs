use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum, ValueHint, builder::BoolishValueParser};

use crate::domain::ContentClass;

/// Command-line arguments for the edgepurge binary.
#[derive(Debug, Parser)]
#[command(name = "edgepurge", version, about = "Purge edge and proxy caches across origin hosts")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(
        long = "config-file",
        env = "EDGEPURGE_CONFIG_FILE",
        value_name = "PATH",
        value_hint = ValueHint::FilePath,
        global = true
    )]
    pub config_file: Option<PathBuf>,

    /// Site whose settings overlay (`sites/<ID>`) is loaded.
    #[arg(long = "site-id", value_name = "ID", global = true)]
    pub site_id: Option<String>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new(),
        global = true
    )]
    pub log_json: Option<bool>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Purge all content on one backend or on every backend.
    Purge(PurgeArgs),
    /// Purge one or more relative paths.
    #[command(name = "purge-url")]
    PurgeUrl(PurgeUrlArgs),
    /// Resolve the purge policy for a content item and purge the result.
    #[command(name = "purge-content")]
    PurgeContent(PurgeContentArgs),
    /// Report whether any configured host has a cache enabled.
    Check(CheckArgs),
    /// Rewrite the settings document with factory defaults.
    #[command(name = "factory-reset")]
    FactoryReset,
    /// Run the daily scheduled purge.
    Schedule(ScheduleArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct DispatchOverrides {
    /// Override the host document location (path or URL).
    #[arg(long = "hosts-source", value_name = "PATH_OR_URL")]
    pub hosts_source: Option<String>,

    /// Override the per-request timeout.
    #[arg(long = "timeout-seconds", value_name = "SECONDS")]
    pub timeout_seconds: Option<u64>,

    /// Override the number of concurrent purge requests.
    #[arg(long = "concurrency", value_name = "COUNT")]
    pub concurrency: Option<u64>,

    /// Treat 404 answers as successful purges.
    #[arg(long = "debug", value_name = "BOOL", value_parser = BoolishValueParser::new())]
    pub debug: Option<bool>,

    /// Build https purge URLs.
    #[arg(long = "https", value_name = "BOOL", value_parser = BoolishValueParser::new())]
    pub https: Option<bool>,
}

#[derive(Debug, Args, Clone)]
pub struct PurgeArgs {
    #[command(flatten)]
    pub overrides: DispatchOverrides,

    /// Backend to purge: fastcgi, pagespeed or all.
    #[arg(long = "cache", value_name = "NAME", default_value = "all")]
    pub cache: String,

    /// Comma-separated addresses used instead of the configured hosts.
    #[arg(long = "ips", value_name = "ADDRESSES")]
    pub ips: Option<String>,
}

#[derive(Debug, Args, Clone)]
pub struct PurgeUrlArgs {
    #[command(flatten)]
    pub overrides: DispatchOverrides,

    /// Comma-separated addresses used instead of the configured hosts.
    #[arg(long = "ips", value_name = "ADDRESSES")]
    pub ips: Option<String>,

    /// Relative paths to purge.
    #[arg(value_name = "PATH", required = true)]
    pub paths: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ContentClassArg {
    Builtin,
    Custom,
}

impl From<ContentClassArg> for ContentClass {
    fn from(value: ContentClassArg) -> Self {
        match value {
            ContentClassArg::Builtin => ContentClass::Builtin,
            ContentClassArg::Custom => ContentClass::Custom,
        }
    }
}

#[derive(Debug, Args, Clone)]
pub struct PurgeContentArgs {
    #[command(flatten)]
    pub overrides: DispatchOverrides,

    /// Permalink of the changed item, absolute or relative to the home URL.
    #[arg(long = "path", value_name = "URL")]
    pub path: String,

    /// Content type name.
    #[arg(long = "kind", value_name = "KIND", default_value = "post")]
    pub kind: String,

    /// Content class whose policy applies.
    #[arg(long = "class", value_enum, default_value_t = ContentClassArg::Builtin)]
    pub class: ContentClassArg,

    /// Site taxonomy page assigned to the item; repeatable.
    #[arg(long = "term-url", value_name = "URL")]
    pub term_urls: Vec<String>,

    /// Commerce category page assigned to the item; repeatable.
    #[arg(long = "commerce-term-url", value_name = "URL")]
    pub commerce_term_urls: Vec<String>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct CheckArgs {
    /// Override the host document location (path or URL).
    #[arg(long = "hosts-source", value_name = "PATH_OR_URL")]
    pub hosts_source: Option<String>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ScheduleArgs {
    #[command(flatten)]
    pub overrides: DispatchOverrides,

    /// Run the scheduled purge once immediately and exit.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub once: bool,
}
