//! Configuration types.
//!
//! This module defines the global `Settings` read by the loader factory, the
//! per-batch `LoaderConfig`, and the logging enums used by the binary.

use std::collections::BTreeMap;
use std::time::Duration;

use clap::ValueEnum;

use crate::config::constants::{
    DEFAULT_REQUESTS_PER_SECOND, DEFAULT_WEB_LOADER_ENGINE, RETRY_BACKOFF_FACTOR,
    RETRY_COOLDOWN_MS, RETRY_MAX_ATTEMPTS,
};

/// Verbosity accepted by `--log-level`.
#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Log line layout.
#[derive(Clone, Debug, ValueEnum)]
pub enum LogFormat {
    /// Timestamped, coloured level
    Plain,
    /// One JSON object per line
    Json,
}

/// Process-wide settings consumed by `get_loader`.
///
/// These are the collaborator-provided inputs: whether fetching private
/// addresses is allowed, which engine to use, and where a remote browser lives.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Allow URLs that resolve to private/loopback addresses (disables the SSRF guard)
    pub enable_local_web_fetch: bool,

    /// Engine name looked up in the `EngineRegistry` (`safe_web`, `playwright`, ...)
    pub web_loader_engine: String,

    /// WebSocket endpoint of a remote browser; injected into every loader when set
    pub remote_browser_endpoint: Option<String>,

    /// Requests per second used when the caller does not pick one
    pub requests_per_second: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enable_local_web_fetch: false,
            web_loader_engine: DEFAULT_WEB_LOADER_ENGINE.to_string(),
            remote_browser_endpoint: None,
            requests_per_second: DEFAULT_REQUESTS_PER_SECOND,
        }
    }
}

impl Settings {
    /// Builds settings from environment variables, falling back to defaults.
    ///
    /// Reads `ENABLE_RAG_LOCAL_WEB_FETCH`, `RAG_WEB_LOADER_ENGINE`,
    /// `PLAYWRIGHT_WS_URI` and `RAG_WEB_LOADER_REQUESTS_PER_SECOND`. Empty
    /// values count as unset.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        Self {
            enable_local_web_fetch: get("ENABLE_RAG_LOCAL_WEB_FETCH")
                .map(|v| parse_flag(&v))
                .unwrap_or(defaults.enable_local_web_fetch),
            web_loader_engine: get("RAG_WEB_LOADER_ENGINE")
                .map(|v| v.trim().to_string())
                .unwrap_or(defaults.web_loader_engine),
            remote_browser_endpoint: get("PLAYWRIGHT_WS_URI").map(|v| v.trim().to_string()),
            requests_per_second: get("RAG_WEB_LOADER_REQUESTS_PER_SECOND")
                .and_then(|v| v.trim().parse::<f64>().ok())
                .filter(|rps| rps.is_finite() && *rps > 0.0)
                .unwrap_or(defaults.requests_per_second),
        }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Proxy settings for a fetch strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProxySettings {
    /// Proxy server URL, e.g. `http://proxy.internal:3128`
    pub server: Option<String>,
    /// Optional proxy username
    pub username: Option<String>,
    /// Optional proxy password
    pub password: Option<String>,
    /// Comma-separated hosts that bypass the proxy
    pub bypass: Option<String>,
}

impl ProxySettings {
    /// Proxy settings pointing at `server`, without credentials.
    pub fn new(server: impl Into<String>) -> Self {
        Self {
            server: Some(server.into()),
            ..Default::default()
        }
    }

    /// Reads the proxy server from `https_proxy` / `http_proxy` (either case).
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Option<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        ["https_proxy", "HTTPS_PROXY", "http_proxy", "HTTP_PROXY"]
            .iter()
            .filter_map(|name| lookup(name))
            .find(|v| !v.trim().is_empty())
            .map(|server| Self::new(server.trim()))
    }
}

/// Retry budget and exponential backoff for transient fetch failures.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts per URL, including the first one
    pub attempts: usize,
    /// Delay before the first retry
    pub cooldown: Duration,
    /// Multiplier applied to the delay for each further retry
    pub backoff: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: RETRY_MAX_ATTEMPTS,
            cooldown: Duration::from_millis(RETRY_COOLDOWN_MS),
            backoff: RETRY_BACKOFF_FACTOR,
        }
    }
}

impl RetryPolicy {
    /// Delays slept between attempts: `cooldown * backoff^i` for each retry.
    ///
    /// Yields `attempts - 1` values, so the iterator doubles as the retry
    /// strategy for `tokio_retry`.
    pub fn delays(&self) -> impl Iterator<Item = Duration> {
        let cooldown = self.cooldown.as_secs_f64();
        let backoff = if self.backoff.is_finite() && self.backoff >= 0.0 {
            self.backoff
        } else {
            1.0
        };
        (0..self.attempts.saturating_sub(1)).map(move |i| {
            let exponent = i32::try_from(i).unwrap_or(i32::MAX);
            Duration::try_from_secs_f64(cooldown * backoff.powi(exponent)).unwrap_or(Duration::MAX)
        })
    }
}

/// Per-batch loader configuration.
///
/// Built once for a batch of URLs and handed to a strategy constructor, which
/// takes ownership; nothing mutates it afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct LoaderConfig {
    /// Pre-validated URLs, fetched in this order
    pub urls: Vec<String>,
    /// Verify TLS certificates
    pub verify_ssl: bool,
    /// Honour proxy settings from the environment
    pub trust_env: bool,
    /// Minimum-interval gate between fetches; `None` disables rate limiting
    pub requests_per_second: Option<f64>,
    /// Log and skip failed URLs instead of terminating the batch
    pub continue_on_failure: bool,
    /// Run a local browser without a window
    pub headless: bool,
    /// Explicit proxy override
    pub proxy: Option<ProxySettings>,
    /// WebSocket endpoint of a remote browser
    pub remote_browser_endpoint: Option<String>,
    /// CSS selectors removed from rendered pages before text extraction
    pub remove_selectors: Vec<String>,
    /// Extra request headers for direct HTTP fetches
    pub headers: BTreeMap<String, String>,
    /// Cookies sent with direct HTTP fetches
    pub cookies: BTreeMap<String, String>,
    /// Treat 4xx/5xx responses as failures
    pub raise_for_status: bool,
    /// Retry budget for transient connection failures
    pub retry: RetryPolicy,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            urls: Vec::new(),
            verify_ssl: true,
            trust_env: false,
            requests_per_second: None,
            continue_on_failure: true,
            headless: true,
            proxy: None,
            remote_browser_endpoint: None,
            remove_selectors: Vec::new(),
            headers: BTreeMap::new(),
            cookies: BTreeMap::new(),
            raise_for_status: false,
            retry: RetryPolicy::default(),
        }
    }
}

impl LoaderConfig {
    /// Default configuration for the given URLs.
    pub fn new<I, S>(urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            urls: urls.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// The proxy a strategy should use: the explicit override, or the
    /// environment proxy when `trust_env` is set and no server was given.
    pub fn effective_proxy(&self) -> Option<ProxySettings> {
        self.resolve_proxy(ProxySettings::from_env)
    }

    pub(crate) fn resolve_proxy<F>(&self, from_env: F) -> Option<ProxySettings>
    where
        F: FnOnce() -> Option<ProxySettings>,
    {
        let has_server = self
            .proxy
            .as_ref()
            .and_then(|p| p.server.as_deref())
            .is_some_and(|s| !s.is_empty());
        if has_server || !self.trust_env {
            return self.proxy.clone();
        }
        match (self.proxy.clone(), from_env()) {
            (Some(mut proxy), Some(env_proxy)) => {
                proxy.server = env_proxy.server;
                Some(proxy)
            }
            (None, Some(env_proxy)) => Some(env_proxy),
            (proxy, None) => proxy,
        }
    }
}
