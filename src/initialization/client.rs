//! HTTP client initialization for the direct strategy.

use std::time::Duration;

use log::warn;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, COOKIE};
use reqwest::{ClientBuilder, NoProxy, Proxy};

use crate::config::{
    LoaderConfig, ProxySettings, DEFAULT_USER_AGENT, HTTP_REQUEST_TIMEOUT,
    TCP_CONNECT_TIMEOUT_SECS,
};

/// Builds the `reqwest::Client` used for one loader.
///
/// Configured from `config`:
/// - default `User-Agent`, overridable through `headers`
/// - custom headers and a `Cookie` header built from `cookies`
/// - certificate checks disabled when `verify_ssl` is off
/// - the explicit proxy, if any; otherwise system proxies only with `trust_env`
///
/// Invalid header names or values are logged and skipped.
///
/// # Errors
///
/// Returns a `reqwest::Error` if the proxy URL is invalid or client creation fails.
pub fn init_client(config: &LoaderConfig) -> Result<reqwest::Client, reqwest::Error> {
    let mut builder = ClientBuilder::new()
        .timeout(HTTP_REQUEST_TIMEOUT)
        .connect_timeout(Duration::from_secs(TCP_CONNECT_TIMEOUT_SECS))
        .user_agent(DEFAULT_USER_AGENT)
        .default_headers(default_headers(config))
        .danger_accept_invalid_certs(!config.verify_ssl);

    match explicit_proxy(config.proxy.as_ref()) {
        Some(proxy) => builder = builder.proxy(build_proxy(proxy)?),
        None if !config.trust_env => builder = builder.no_proxy(),
        None => {}
    }

    builder.build()
}

fn default_headers(config: &LoaderConfig) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for (name, value) in &config.headers {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                headers.insert(name, value);
            }
            _ => warn!("Skipping invalid request header '{name}'"),
        }
    }

    if !config.cookies.is_empty() {
        let cookie = config
            .cookies
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("; ");
        match HeaderValue::from_str(&cookie) {
            Ok(value) => {
                headers.insert(COOKIE, value);
            }
            Err(e) => warn!("Skipping invalid cookie header: {e}"),
        }
    }
    headers
}

fn explicit_proxy(proxy: Option<&ProxySettings>) -> Option<&ProxySettings> {
    proxy.filter(|p| p.server.as_deref().is_some_and(|s| !s.is_empty()))
}

fn build_proxy(settings: &ProxySettings) -> Result<Proxy, reqwest::Error> {
    let server = settings.server.as_deref().unwrap_or_default();
    let mut proxy = Proxy::all(server)?;
    if let Some(username) = settings.username.as_deref() {
        proxy = proxy.basic_auth(username, settings.password.as_deref().unwrap_or_default());
    }
    if let Some(bypass) = settings.bypass.as_deref() {
        proxy = proxy.no_proxy(NoProxy::from_string(bypass));
    }
    Ok(proxy)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_client_defaults() {
        let config = LoaderConfig::new(["https://example.com"]);
        assert!(init_client(&config).is_ok());
    }

    #[test]
    fn test_headers_and_cookies() {
        let mut config = LoaderConfig::default();
        config.headers.insert("X-Test".to_string(), "1".to_string());
        config.headers.insert("bad header".to_string(), "x".to_string());
        config.cookies.insert("a".to_string(), "1".to_string());
        config.cookies.insert("b".to_string(), "2".to_string());

        let headers = default_headers(&config);
        assert_eq!(headers.get("x-test").unwrap(), "1");
        assert_eq!(headers.get(COOKIE).unwrap(), "a=1; b=2");
        assert_eq!(headers.len(), 2);
    }

    #[test]
    fn test_explicit_proxy_requires_server() {
        let empty = ProxySettings::default();
        assert!(explicit_proxy(Some(&empty)).is_none());
        let proxy = ProxySettings::new("http://proxy.internal:3128");
        assert!(explicit_proxy(Some(&proxy)).is_some());
        assert!(explicit_proxy(None).is_none());
    }

    #[test]
    fn test_client_with_proxy_and_auth() {
        let mut proxy = ProxySettings::new("http://proxy.internal:3128");
        proxy.username = Some("user".to_string());
        proxy.password = Some("secret".to_string());
        proxy.bypass = Some("localhost,.internal".to_string());
        let config = LoaderConfig {
            proxy: Some(proxy),
            verify_ssl: false,
            ..Default::default()
        };
        assert!(init_client(&config).is_ok());
    }
}
