//! URL screening at the factory boundary, with a static resolver so no DNS
//! traffic is needed.

use std::collections::HashMap;
use std::io;
use std::net::IpAddr;
use std::sync::{Arc, Mutex};
use std::thread::{self, ThreadId};

use safe_web_loader::security::{HostResolver, ResolvedAddressSet, UrlValidator};
use safe_web_loader::{LoaderError, LoaderFactory, LoaderOptions, Settings};

struct StaticResolver(HashMap<&'static str, Vec<IpAddr>>);

impl HostResolver for StaticResolver {
    fn resolve(&self, host: &str) -> io::Result<ResolvedAddressSet> {
        self.0
            .get(host)
            .map(|ips| ips.iter().copied().collect())
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "unknown host"))
    }
}

fn resolver() -> Arc<StaticResolver> {
    let mut hosts = HashMap::new();
    hosts.insert("example.com", vec!["93.184.215.14".parse().unwrap()]);
    hosts.insert("intranet.corp", vec!["10.1.2.3".parse().unwrap()]);
    hosts.insert(
        "split.example",
        vec!["93.184.215.14".parse().unwrap(), "::1".parse().unwrap()],
    );
    Arc::new(StaticResolver(hosts))
}

fn factory(allow_local: bool) -> LoaderFactory {
    LoaderFactory::new(Settings {
        enable_local_web_fetch: allow_local,
        ..Default::default()
    })
    .with_validator(UrlValidator::with_resolver(allow_local, resolver()))
}

#[test]
fn test_filter_keeps_only_public_urls() {
    let loader = factory(false).get_loader(
        &["http://example.com", "not a url", "http://127.0.0.1"],
        LoaderOptions::default(),
    );
    assert_eq!(loader.urls(), ["http://example.com".to_string()]);
}

#[test]
fn test_any_private_address_rejects_the_host() {
    let validator = UrlValidator::with_resolver(false, resolver());
    assert!(validator.validate("https://example.com/a").unwrap());
    assert!(matches!(
        validator.validate("https://split.example/"),
        Err(LoaderError::InvalidUrl { .. })
    ));
    assert!(validator.validate("http://intranet.corp/").is_err());
    assert!(validator.validate("http://unknown.invalid/").is_err());
}

#[test]
fn test_local_fetch_enabled_keeps_private_urls() {
    let urls = ["http://127.0.0.1/x", "http://intranet.corp/", "not a url"];
    let loader = factory(true).get_loader(&urls, LoaderOptions::default());
    assert_eq!(
        loader.urls(),
        ["http://127.0.0.1/x".to_string(), "http://intranet.corp/".to_string()]
    );
}

#[test]
fn test_validate_all_stops_at_first_invalid() {
    let validator = UrlValidator::with_resolver(false, resolver());
    assert!(validator
        .validate_all(&["http://example.com", "https://example.com/b"])
        .unwrap());
    let err = validator
        .validate_all(&["http://example.com", "http://[::1]/", "http://10.0.0.1/"])
        .unwrap_err();
    assert!(err.to_string().contains("[::1]"));
}

/// Records the thread each lookup ran on.
struct ThreadRecordingResolver(Mutex<Vec<ThreadId>>);

impl HostResolver for ThreadRecordingResolver {
    fn resolve(&self, _host: &str) -> io::Result<ResolvedAddressSet> {
        self.0.lock().unwrap().push(thread::current().id());
        Ok(["93.184.215.14".parse::<IpAddr>().unwrap()].into_iter().collect())
    }
}

#[tokio::test]
async fn test_async_factory_resolves_off_the_runtime_thread() {
    let resolver = Arc::new(ThreadRecordingResolver(Mutex::new(Vec::new())));
    let factory = LoaderFactory::new(Settings::default())
        .with_validator(UrlValidator::with_resolver(false, resolver.clone()));

    let loader = factory
        .aget_loader(
            vec!["http://example.com".to_string(), "not a url".to_string()],
            LoaderOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(loader.urls(), ["http://example.com".to_string()]);
    let lookups = resolver.0.lock().unwrap();
    assert_eq!(lookups.len(), 1);
    assert_ne!(lookups[0], thread::current().id());
}
