//! TLS certificate verification.
//!
//! Opens a verified TLS connection to the target host and reports whether the
//! handshake succeeded. Trust anchors come from `webpki-roots` (the Mozilla CA
//! bundle), so the result does not depend on the machine's certificate store.
//!
//! Uses `tokio-rustls` for the async TLS connection.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use log::{debug, warn};
use rustls::pki_types::ServerName;
use tokio::net::TcpStream;
use tokio_rustls::rustls::{ClientConfig, RootCertStore};
use tokio_rustls::TlsConnector;
use url::Url;

use crate::config::{TCP_CONNECT_TIMEOUT_SECS, TLS_HANDSHAKE_TIMEOUT_SECS};

/// Returns `true` when `url` either does not use `https` or presents a
/// certificate that verifies against the trusted roots.
///
/// Never fails: connection errors, timeouts and handshake failures all yield
/// `false`, with the cause logged at `warn`.
pub async fn certificate_is_valid(url: &str) -> bool {
    let parsed = match Url::parse(url) {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!("SSL verification failed for {url}: invalid URL: {e}");
            return false;
        }
    };
    if parsed.scheme() != "https" {
        return true;
    }

    match verify_handshake(&parsed).await {
        Ok(()) => {
            debug!("SSL certificate verified for {url}");
            true
        }
        Err(e) => {
            warn!("SSL verification failed for {url}: {e:#}");
            false
        }
    }
}

async fn verify_handshake(url: &Url) -> Result<()> {
    let host = url
        .host_str()
        .context("URL has no host component")?
        .trim_start_matches('[')
        .trim_end_matches(']')
        .to_string();
    let port = url.port_or_known_default().unwrap_or(443);

    let config = client_config()?;
    let server_name =
        ServerName::try_from(host.clone()).context(format!("invalid server name '{host}'"))?;

    let sock = tokio::time::timeout(
        Duration::from_secs(TCP_CONNECT_TIMEOUT_SECS),
        TcpStream::connect((host.as_str(), port)),
    )
    .await
    .with_context(|| {
        format!("TCP connection timeout for {host}:{port} ({TCP_CONNECT_TIMEOUT_SECS}s)")
    })?
    .with_context(|| format!("failed to connect to {host}:{port}"))?;

    let connector = TlsConnector::from(Arc::new(config));
    tokio::time::timeout(
        Duration::from_secs(TLS_HANDSHAKE_TIMEOUT_SECS),
        connector.connect(server_name, sock),
    )
    .await
    .with_context(|| format!("TLS handshake timeout for {host} ({TLS_HANDSHAKE_TIMEOUT_SECS}s)"))?
    .with_context(|| format!("TLS handshake failed for {host}"))?;

    Ok(())
}

fn client_config() -> Result<ClientConfig> {
    let mut root_store = RootCertStore::empty();
    root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    let config = ClientConfig::builder_with_provider(Arc::new(
        rustls::crypto::ring::default_provider(),
    ))
    .with_safe_default_protocol_versions()
    .context("failed to configure TLS protocol versions")?
    .with_root_certificates(root_store)
    .with_no_client_auth();
    Ok(config)
}
