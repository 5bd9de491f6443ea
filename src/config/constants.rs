//! Configuration constants.
//!
//! Defaults for rate limiting, retries, network timeouts and metadata
//! extraction. Everything here is a default: `LoaderConfig` and `Settings`
//! carry the values actually used by a loader.

use std::time::Duration;

/// Default requests per second applied by `get_loader`.
pub const DEFAULT_REQUESTS_PER_SECOND: f64 = 2.0;

// Retry strategy
/// Total number of fetch attempts per URL (initial attempt included)
pub const RETRY_MAX_ATTEMPTS: usize = 3;
/// Delay before the first retry, in milliseconds
pub const RETRY_COOLDOWN_MS: u64 = 2000;
/// Factor by which the retry delay grows on each further attempt
pub const RETRY_BACKOFF_FACTOR: f64 = 1.5;

// Network operation timeouts
/// TCP connection timeout in seconds (SSL verification probe)
pub const TCP_CONNECT_TIMEOUT_SECS: u64 = 5;
/// TLS handshake timeout in seconds (SSL verification probe)
pub const TLS_HANDSHAKE_TIMEOUT_SECS: u64 = 5;
/// Per-request timeout for the direct HTTP strategy
pub const HTTP_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum URL length (2048 characters), matching common browser and server limits.
pub const MAX_URL_LENGTH: usize = 2048;

/// Default User-Agent string for direct HTTP requests.
///
/// Callers can override it by passing their own `User-Agent` entry in
/// `LoaderConfig::headers`.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

// Metadata defaults
/// Value stored under `description` when the meta tag has no `content` attribute
pub const DEFAULT_DESCRIPTION: &str = "No description found.";
/// Value stored under `language` when `<html>` has no `lang` attribute
pub const DEFAULT_LANGUAGE: &str = "No language found.";

/// Engine name used when none is configured.
pub const DEFAULT_WEB_LOADER_ENGINE: &str = "safe_web";

/// Default rerank endpoint for `RemoteReranker`.
pub const DEFAULT_RERANK_URL: &str = "https://api.jina.ai/v1/rerank";
/// Score returned for every document when reranking fails.
pub const NEUTRAL_RERANK_SCORE: f64 = 0.5;
