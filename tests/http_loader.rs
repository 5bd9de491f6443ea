//! Direct HTTP loader against a local mock server.
//!
//! The mock server listens on loopback, so loaders are built through
//! `LoaderFactory::create_loader`, which takes URLs as given.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::StreamExt;
use safe_web_loader::{
    Document, FailureKind, LoaderConfig, LoaderError, LoaderFactory, RetryPolicy, Settings,
};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PAGE: &str = r#"<html lang="en"><head><title>T</title><meta name="description" content="D"></head><body><p>Hello</p></body></html>"#;

fn factory() -> LoaderFactory {
    LoaderFactory::new(Settings {
        enable_local_web_fetch: true,
        ..Default::default()
    })
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/html; charset=utf-8")
        .set_body_string(body)
}

async fn mount_page(server: &MockServer, route: &str, response: ResponseTemplate, hits: u64) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(response)
        .expect(hits)
        .mount(server)
        .await;
}

fn batch(server: &MockServer, routes: &[&str], continue_on_failure: bool) -> LoaderConfig {
    LoaderConfig {
        continue_on_failure,
        raise_for_status: true,
        ..LoaderConfig::new(routes.iter().map(|r| format!("{}{r}", server.uri())))
    }
}

fn sources(docs: &[Document]) -> Vec<String> {
    docs.iter().map(|d| d.source().to_string()).collect()
}

#[tokio::test]
async fn test_single_page_metadata() {
    let server = MockServer::start().await;
    mount_page(&server, "/page", html(PAGE), 1).await;

    let loader = factory().create_loader("safe_web", batch(&server, &["/page"], true));
    let docs = loader.aload().await.unwrap();

    assert_eq!(docs.len(), 1);
    let doc = &docs[0];
    assert_eq!(doc.source(), format!("{}/page", server.uri()));
    assert!(doc.content().contains("Hello"));
    assert_eq!(doc.metadata().get("title").map(String::as_str), Some("T"));
    assert_eq!(doc.metadata().get("description").map(String::as_str), Some("D"));
    assert_eq!(doc.metadata().get("language").map(String::as_str), Some("en"));
}

#[tokio::test]
async fn test_partial_failure_continues_in_order() {
    let server = MockServer::start().await;
    mount_page(&server, "/one", html("<p>one</p>"), 1).await;
    mount_page(&server, "/two", ResponseTemplate::new(500), 1).await;
    mount_page(&server, "/three", html("<p>three</p>"), 1).await;

    let loader = factory().create_loader("safe_web", batch(&server, &["/one", "/two", "/three"], true));
    let docs = loader.aload().await.unwrap();

    assert_eq!(
        sources(&docs),
        vec![format!("{}/one", server.uri()), format!("{}/three", server.uri())]
    );
    assert_eq!(docs[0].content(), "one");
    assert_eq!(loader.stats().documents(), 2);
    assert_eq!(loader.stats().failure_count(FailureKind::Http), 1);
}

#[tokio::test]
async fn test_strict_failure_terminates_at_failing_url() {
    let server = MockServer::start().await;
    mount_page(&server, "/one", html("<p>one</p>"), 1).await;
    mount_page(&server, "/two", ResponseTemplate::new(500), 1).await;
    // never reached
    mount_page(&server, "/three", html("<p>three</p>"), 0).await;

    let loader = factory().create_loader("safe_web", batch(&server, &["/one", "/two", "/three"], false));
    let results: Vec<_> = loader.alazy_load().collect().await;

    assert_eq!(results.len(), 2);
    assert!(results[0].is_ok());
    match &results[1] {
        Err(LoaderError::Http { url, .. }) => assert_eq!(url, &format!("{}/two", server.uri())),
        other => panic!("expected an HTTP error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_error_status_is_kept_without_raise_for_status() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/missing",
        ResponseTemplate::new(404).set_body_string("<title>Not Found</title>"),
        1,
    )
    .await;

    let config = LoaderConfig {
        raise_for_status: false,
        ..batch(&server, &["/missing"], false)
    };
    let docs = factory().create_loader("safe_web", config).aload().await.unwrap();
    assert_eq!(docs[0].metadata().get("title").map(String::as_str), Some("Not Found"));
}

#[tokio::test]
async fn test_xml_path_uses_xml_parser() {
    let server = MockServer::start().await;
    let feed = r#"<?xml version="1.0"?><rss><channel><title>Feed</title><item>Entry</item></channel></rss>"#;
    mount_page(
        &server,
        "/feed.xml",
        ResponseTemplate::new(200)
            .insert_header("content-type", "application/xml")
            .set_body_string(feed),
        1,
    )
    .await;

    let docs = factory()
        .create_loader("safe_web", batch(&server, &["/feed.xml"], false))
        .aload()
        .await
        .unwrap();
    assert_eq!(docs[0].content(), "FeedEntry");
    assert_eq!(docs[0].metadata().get("title").map(String::as_str), Some("Feed"));
    assert_eq!(docs[0].metadata().get("language"), None);
}

#[tokio::test]
async fn test_headers_and_cookies_are_sent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/private"))
        .and(header("x-api-key", "secret"))
        .and(header("cookie", "session=abc"))
        .respond_with(html("<p>welcome</p>"))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = batch(&server, &["/private"], false);
    config.headers.insert("X-Api-Key".to_string(), "secret".to_string());
    config.cookies.insert("session".to_string(), "abc".to_string());

    let docs = factory().create_loader("safe_web", config).aload().await.unwrap();
    assert_eq!(docs[0].content(), "welcome");
}

#[tokio::test]
async fn test_connection_failures_exhaust_retry_budget() {
    // Nothing listens on port 1.
    let config = LoaderConfig {
        continue_on_failure: false,
        retry: RetryPolicy {
            attempts: 2,
            cooldown: Duration::from_millis(10),
            backoff: 1.5,
        },
        ..LoaderConfig::new(["http://127.0.0.1:1/"])
    };

    let results: Vec<_> = factory()
        .create_loader("safe_web", config)
        .alazy_load()
        .collect()
        .await;
    assert_eq!(results.len(), 1);
    match &results[0] {
        Err(LoaderError::RetryBudgetExhausted {
            attempts, source, ..
        }) => {
            assert_eq!(*attempts, 2);
            assert!(matches!(
                source.as_deref(),
                Some(LoaderError::Connection { .. })
            ));
        }
        other => panic!("expected RetryBudgetExhausted, got {other:?}"),
    }
}

#[tokio::test]
async fn test_dropped_connections_exhaust_retry_budget() {
    // Accepts every connection and hangs up without answering.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let accepts = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&accepts);
    let server = tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            counter.fetch_add(1, Ordering::SeqCst);
            drop(socket);
        }
    });

    let config = LoaderConfig {
        continue_on_failure: false,
        retry: RetryPolicy {
            attempts: 3,
            cooldown: Duration::from_millis(10),
            backoff: 1.0,
        },
        ..LoaderConfig::new([format!("http://{addr}/")])
    };
    let results: Vec<_> = factory()
        .create_loader("safe_web", config)
        .alazy_load()
        .collect()
        .await;
    server.abort();

    assert_eq!(results.len(), 1);
    match &results[0] {
        Err(LoaderError::RetryBudgetExhausted {
            attempts, source, ..
        }) => {
            assert_eq!(*attempts, 3);
            assert!(matches!(
                source.as_deref(),
                Some(LoaderError::Connection { .. })
            ));
        }
        other => panic!("expected RetryBudgetExhausted, got {other:?}"),
    }
    assert_eq!(accepts.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_rate_limit_spaces_requests() {
    let server = MockServer::start().await;
    mount_page(&server, "/a", html("a"), 1).await;
    mount_page(&server, "/b", html("b"), 1).await;

    let config = LoaderConfig {
        requests_per_second: Some(2.0),
        ..batch(&server, &["/a", "/b"], false)
    };
    let start = Instant::now();
    let docs = factory().create_loader("safe_web", config).aload().await.unwrap();

    assert_eq!(docs.len(), 2);
    assert!(
        start.elapsed() >= Duration::from_millis(500),
        "two requests at 2 rps took {:?}",
        start.elapsed()
    );
}

#[tokio::test]
async fn test_failed_fetch_still_advances_rate_limit() {
    let server = MockServer::start().await;
    mount_page(&server, "/broken", ResponseTemplate::new(500), 1).await;
    mount_page(&server, "/ok", html("ok"), 1).await;

    let config = LoaderConfig {
        requests_per_second: Some(2.0),
        ..batch(&server, &["/broken", "/ok"], true)
    };
    let start = Instant::now();
    let docs = factory().create_loader("safe_web", config).aload().await.unwrap();

    assert_eq!(sources(&docs), vec![format!("{}/ok", server.uri())]);
    assert!(
        start.elapsed() >= Duration::from_millis(500),
        "request after a failure at 2 rps came after {:?}",
        start.elapsed()
    );
}

#[test]
fn test_blocking_and_async_iteration_agree() {
    // The mock server needs its own runtime; the blocking iterator brings one too.
    let server_runtime = tokio::runtime::Runtime::new().unwrap();
    let server = server_runtime.block_on(async {
        let server = MockServer::start().await;
        mount_page(&server, "/one", html(PAGE), 3).await;
        mount_page(&server, "/two", ResponseTemplate::new(503), 3).await;
        mount_page(&server, "/three", html("<p>three</p>"), 3).await;
        server
    });

    let loader = factory().create_loader("safe_web", batch(&server, &["/one", "/two", "/three"], true));
    let blocking: Vec<Document> = loader
        .lazy_load()
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    let suspending = server_runtime.block_on(loader.aload()).unwrap();

    assert_eq!(blocking.len(), 2);
    assert_eq!(blocking, suspending);
    assert_eq!(loader.load().unwrap().len(), 2);

    server_runtime.block_on(async move { drop(server) });
}

#[tokio::test]
async fn test_get_loader_drops_private_urls_with_guard_active() {
    let server = MockServer::start().await;
    let factory = LoaderFactory::new(Settings::default());
    let loader = factory.get_loader(&[format!("{}/page", server.uri())], Default::default());
    assert!(loader.urls().is_empty());
    assert!(loader.aload().await.unwrap().is_empty());
}
