use edgepurge::purge::{
    DEFAULT_HOSTS_JSON, Host, HostConfigError, HostLoader, HostSource, OverrideHosts,
    RegistryOrigin,
};
use httpmock::MockServer;
use url::Url;

fn loader() -> HostLoader {
    HostLoader::new(reqwest::Client::new())
}

fn url_source(server: &MockServer, path: &str) -> HostSource {
    HostSource::Url(Url::parse(&server.url(path)).expect("mock url"))
}

#[tokio::test]
async fn url_source_is_downloaded() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method("GET").path("/hosts.json");
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"{"servers":[{"name":"edge-1","ip":"https://10.0.0.1/","fastcgi":true}]}"#);
        })
        .await;

    let registry = loader().load(&url_source(&server, "/hosts.json"), None).await;

    assert_eq!(registry.origin(), &RegistryOrigin::Configured);
    assert_eq!(registry.hosts().len(), 1);
    let host = &registry.hosts()[0];
    assert_eq!(host.display_name(), "edge-1");
    assert_eq!(host.address, "https://10.0.0.1");
    assert!(host.fastcgi);
    assert!(!host.pagespeed);
}

#[tokio::test]
async fn missing_url_falls_back_to_localhost() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method("GET").path("/hosts.json");
            then.status(404);
        })
        .await;

    let source = url_source(&server, "/hosts.json");
    let registry = loader().load(&source, None).await;

    assert!(matches!(registry.origin(), RegistryOrigin::Fallback(_)));
    assert_eq!(registry.hosts(), [Host::localhost()]);
    assert!(registry.has_any_cache_enabled());
}

#[tokio::test]
async fn unparsable_document_falls_back_to_localhost() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method("GET").path("/hosts.json");
            then.status(200).body("not json");
        })
        .await;

    let registry = loader()
        .load(&url_source(&server, "/hosts.json"), None)
        .await;

    assert!(matches!(registry.origin(), RegistryOrigin::Fallback(_)));
    assert_eq!(registry.hosts(), [Host::localhost()]);
}

#[tokio::test]
async fn override_wins_over_an_unreachable_source() {
    let source = HostSource::Path("/definitely/not/here/hosts.json".into());
    let hosts = OverrideHosts::parse("10.0.0.1, 10.0.0.2").expect("override");

    let registry = loader().load(&source, Some(hosts)).await;

    assert_eq!(registry.origin(), &RegistryOrigin::Override);
    let addresses: Vec<&str> = registry
        .hosts()
        .iter()
        .map(|host| host.address.as_str())
        .collect();
    assert_eq!(addresses, ["10.0.0.1", "10.0.0.2"]);
    assert!(registry.hosts().iter().all(|host| host.name.is_none()));
}

#[tokio::test]
async fn validate_reports_missing_sources() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.path("/missing.json");
            then.status(404);
        })
        .await;

    let err = loader()
        .validate(&url_source(&server, "/missing.json"))
        .await
        .expect_err("404 source");
    assert!(matches!(err, HostConfigError::NotFound(_)));

    let dir = tempfile::tempdir().expect("tempdir");
    let missing = HostSource::Path(dir.path().join("hosts.json"));
    let err = loader().validate(&missing).await.expect_err("missing file");
    assert!(matches!(err, HostConfigError::Missing(_)));

    std::fs::write(dir.path().join("hosts.json"), DEFAULT_HOSTS_JSON).expect("write");
    loader().validate(&missing).await.expect("existing file");
}
