use super::*;
use clap::Parser;

fn settings(raw: RawSettings) -> Settings {
    Settings::from_raw(raw).expect("valid settings")
}

#[test]
fn defaults_are_applied() {
    let settings = settings(RawSettings::default());

    assert_eq!(settings.site.home_url.as_str(), "http://localhost/");
    assert_eq!(settings.site.host, "localhost");
    assert_eq!(settings.hosts.source, "hosts.json");
    assert_eq!(settings.dispatch.timeout, Duration::from_secs(5));
    assert_eq!(settings.dispatch.concurrency.get(), 8);
    assert!(!settings.dispatch.debug);
    assert!(!settings.dispatch.report_partial_success);
    assert_eq!(settings.policy, PolicySet::default());
    assert!(settings.policy.builtin.changed_url);
    assert!(!settings.policy.custom.everything);
    assert!(!settings.schedule.enabled);
    assert_eq!(settings.schedule.backends, BACKENDS.to_vec());
    assert_eq!(settings.schedule.daily.timezone(), Tz::UTC);
    assert_eq!(settings.logging.level, LevelFilter::INFO);
    assert!(matches!(settings.logging.format, LogFormat::Compact));
}

#[test]
fn factory_defaults_match_implicit_defaults() {
    let explicit = settings(RawSettings::factory_defaults());
    let implicit = settings(RawSettings::default());

    assert_eq!(explicit.site.home_url, implicit.site.home_url);
    assert_eq!(explicit.hosts.source, implicit.hosts.source);
    assert_eq!(explicit.dispatch.timeout, implicit.dispatch.timeout);
    assert_eq!(explicit.dispatch.concurrency, implicit.dispatch.concurrency);
    assert_eq!(explicit.policy, implicit.policy);
    assert_eq!(explicit.schedule.daily, implicit.schedule.daily);
    assert_eq!(explicit.schedule.backends, implicit.schedule.backends);
}

#[test]
fn site_host_keeps_non_default_port() {
    let mut raw = RawSettings::default();
    raw.site.home_url = Some("https://www.example.com:8443/blog".to_string());

    let settings = settings(raw);

    assert_eq!(settings.site.host, "www.example.com:8443");
}

#[test]
fn invalid_home_url_is_rejected() {
    let mut raw = RawSettings::default();
    raw.site.home_url = Some("not a url".to_string());

    let err = Settings::from_raw(raw).expect_err("invalid url");
    assert!(matches!(err, LoadError::Invalid { key: "site.home_url", .. }));
}

#[test]
fn zero_timeout_and_concurrency_are_rejected() {
    let mut raw = RawSettings::default();
    raw.dispatch.timeout_seconds = Some(0);
    let err = Settings::from_raw(raw).expect_err("zero timeout");
    assert!(matches!(err, LoadError::Invalid { key: "dispatch.timeout_seconds", .. }));

    let mut raw = RawSettings::default();
    raw.dispatch.concurrency = Some(0);
    let err = Settings::from_raw(raw).expect_err("zero concurrency");
    assert!(matches!(err, LoadError::Invalid { key: "dispatch.concurrency", .. }));
}

#[test]
fn schedule_time_is_validated() {
    let mut raw = RawSettings::default();
    raw.schedule.time = Some("24:00".to_string());
    let err = Settings::from_raw(raw).expect_err("invalid time");
    assert!(matches!(err, LoadError::Invalid { key: "schedule.time", .. }));

    let mut raw = RawSettings::default();
    raw.schedule.time = Some("7:05".to_string());
    raw.schedule.timezone = Some("Europe/Amsterdam".to_string());
    let settings = settings(raw);
    assert_eq!(settings.schedule.daily.to_string(), "07:05 Europe/Amsterdam");
}

#[test]
fn unknown_schedule_backend_is_rejected() {
    let mut raw = RawSettings::default();
    raw.schedule.backends = Some(vec!["fastcgi".to_string(), "varnish".to_string()]);

    let err = Settings::from_raw(raw).expect_err("unknown backend");
    assert!(matches!(err, LoadError::Invalid { key: "schedule.backends", .. }));
}

#[test]
fn partial_policy_falls_back_per_toggle() {
    let raw: RawSettings = toml::from_str(
        r#"
        [policy.custom]
        changed_url = false
        everything = true
        "#,
    )
    .expect("valid toml");

    let settings = settings(raw);

    assert!(settings.policy.builtin.changed_url);
    assert!(!settings.policy.custom.changed_url);
    assert!(settings.policy.custom.everything);
    assert!(!settings.policy.custom.home);
}

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.dispatch.timeout_seconds = Some(30);
    raw.logging.level = Some("info".to_string());

    let cli = CliArgs::parse_from([
        "edgepurge",
        "--log-level",
        "debug",
        "purge",
        "--timeout-seconds",
        "2",
        "--debug",
        "true",
        "--hosts-source",
        "https://config.example.com/hosts.json",
    ]);
    raw.apply_cli(&cli);
    let settings = settings(raw);

    assert_eq!(settings.dispatch.timeout, Duration::from_secs(2));
    assert!(settings.dispatch.debug);
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
    assert!(matches!(settings.hosts.source(), HostSource::Url(_)));
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = RawSettings::default();
    let cli = CliArgs::parse_from(["edgepurge", "--log-json", "true", "check"]);

    raw.apply_cli(&cli);
    let settings = settings(raw);

    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn parse_purge_arguments() {
    let args = CliArgs::parse_from(["edgepurge", "purge", "--cache", "fastcgi", "--ips", "10.0.0.1, 10.0.0.2"]);

    match args.command {
        Command::Purge(purge) => {
            assert_eq!(purge.cache, "fastcgi");
            assert_eq!(purge.ips.as_deref(), Some("10.0.0.1, 10.0.0.2"));
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn purge_defaults_to_all_backends() {
    let args = CliArgs::parse_from(["edgepurge", "purge"]);

    match args.command {
        Command::Purge(purge) => {
            assert_eq!(purge.cache, "all");
            assert!(purge.ips.is_none());
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn parse_purge_content_arguments() {
    let args = CliArgs::parse_from([
        "edgepurge",
        "purge-content",
        "--path",
        "https://example.com/shop/item",
        "--class",
        "custom",
        "--kind",
        "product",
        "--term-url",
        "https://example.com/category/a/",
        "--term-url",
        "https://example.com/category/b/",
    ]);

    match args.command {
        Command::PurgeContent(content) => {
            assert_eq!(content.class, ContentClassArg::Custom);
            assert_eq!(content.kind, "product");
            assert_eq!(content.term_urls.len(), 2);
            assert!(content.commerce_term_urls.is_empty());
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn global_site_id_applies_to_factory_reset() {
    let args = CliArgs::parse_from(["edgepurge", "factory-reset", "--site-id", "blog"]);

    assert!(matches!(args.command, Command::FactoryReset));
    assert_eq!(args.site_id.as_deref(), Some("blog"));
    assert_eq!(
        settings_document_path(args.site_id.as_deref()),
        Path::new("sites").join("blog.toml")
    );
    assert_eq!(settings_document_path(None), Path::new("edgepurge.toml"));
}

#[test]
fn cli_definition_is_consistent() {
    use clap::CommandFactory;

    CliArgs::command().debug_assert();
}
