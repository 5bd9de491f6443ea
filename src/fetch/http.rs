//! Direct HTTP fetch strategy.

use std::error::Error as StdError;
use std::io;

use async_trait::async_trait;
use log::debug;

use super::retry::retry_transient;
use super::FetchStrategy;
use crate::config::LoaderConfig;
use crate::error_handling::LoaderError;
use crate::initialization::init_client;
use crate::models::{Document, ExecutionMode};
use crate::parse::document_from_markup;
use crate::rate_limiter::RateLimiter;

/// Fetches pages with a plain HTTP GET and parses the returned markup.
///
/// Connection failures, timeouts and dropped connections are retried per
/// `LoaderConfig::retry`;
/// error statuses only fail the URL when `raise_for_status` is set.
#[derive(Debug)]
pub struct DirectHttpStrategy {
    config: LoaderConfig,
    client: reqwest::Client,
    rate_limiter: RateLimiter,
}

impl DirectHttpStrategy {
    /// Builds the strategy and its HTTP client.
    ///
    /// # Errors
    ///
    /// Returns `LoaderError::Client` if the client cannot be built (e.g. an
    /// invalid proxy URL).
    pub fn new(config: LoaderConfig) -> Result<Self, LoaderError> {
        let client = init_client(&config)?;
        let rate_limiter = RateLimiter::new(config.requests_per_second);
        Ok(Self {
            config,
            client,
            rate_limiter,
        })
    }

    async fn fetch_body(&self, url: &str) -> Result<String, LoaderError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| classify(url, e))?;
        debug!("GET {url} -> {}", response.status());

        let response = if self.config.raise_for_status {
            response.error_for_status().map_err(|e| classify(url, e))?
        } else {
            response
        };
        response.text().await.map_err(|e| classify(url, e))
    }
}

/// Connection failures, timeouts and connections dropped by the peer are
/// transient; everything else is not.
fn classify(url: &str, error: reqwest::Error) -> LoaderError {
    if is_connection_failure(&error) {
        LoaderError::Connection {
            url: url.to_string(),
            source: Box::new(error),
        }
    } else {
        LoaderError::Http {
            url: url.to_string(),
            source: error,
        }
    }
}

fn is_connection_failure(error: &reqwest::Error) -> bool {
    if error.is_status() {
        return false;
    }
    if error.is_connect() || error.is_timeout() {
        return true;
    }
    let mut cause = error.source();
    while let Some(err) = cause {
        if let Some(hyper_err) = err.downcast_ref::<hyper::Error>() {
            if hyper_err.is_incomplete_message() {
                return true;
            }
        }
        if let Some(io_err) = err.downcast_ref::<io::Error>() {
            if is_dropped_connection(io_err.kind()) {
                return true;
            }
        }
        cause = err.source();
    }
    false
}

fn is_dropped_connection(kind: io::ErrorKind) -> bool {
    matches!(
        kind,
        io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::UnexpectedEof
    )
}

#[async_trait]
impl FetchStrategy for DirectHttpStrategy {
    fn name(&self) -> &'static str {
        "safe_web"
    }

    fn config(&self) -> &LoaderConfig {
        &self.config
    }

    async fn fetch(&mut self, url: &str, mode: ExecutionMode) -> Result<Document, LoaderError> {
        self.rate_limiter.wait(mode).await;

        let this = &*self;
        let body = retry_transient(url, &this.config.retry, move || this.fetch_body(url)).await?;
        document_from_markup(url, &body)
    }
}
