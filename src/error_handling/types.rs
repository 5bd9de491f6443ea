//! Error type definitions.
//!
//! This module defines the loader error taxonomy and the failure categories
//! used for per-loader statistics.

use log::SetLoggerError;
use strum_macros::EnumIter as EnumIterMacro;
use thiserror::Error;

use super::messages;

/// Boxed error used for transport failures that do not come from `reqwest`.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failures while setting up process-wide state.
#[derive(Error, Debug)]
pub enum InitializationError {
    /// A logger was already installed.
    #[error("Logger initialization error: {0}")]
    LoggerError(#[from] SetLoggerError),
}

/// Errors raised while validating URLs or loading documents.
#[derive(Error, Debug)]
pub enum LoaderError {
    /// The URL is malformed, or resolves to a private address while the SSRF guard is active.
    #[error("{}: {url} ({reason})", messages::INVALID_URL)]
    InvalidUrl {
        /// The rejected URL
        url: String,
        /// Why it was rejected
        reason: String,
    },

    /// The certificate presented for the navigation target did not verify.
    #[error("{}: {url}", messages::SSL_VERIFICATION_FAILED)]
    SslVerification {
        /// The URL whose certificate failed
        url: String,
    },

    /// A transient connection failure (refused, reset, timed out). Retried.
    #[error("Connection error fetching {url}: {source}")]
    Connection {
        /// The URL being fetched
        url: String,
        /// Underlying transport error
        #[source]
        source: BoxError,
    },

    /// A non-transient HTTP failure (error status, unreadable body).
    #[error("HTTP error fetching {url}: {source}")]
    Http {
        /// The URL being fetched
        url: String,
        /// Underlying reqwest error
        #[source]
        source: reqwest::Error,
    },

    /// Navigation completed without a usable response.
    #[error("{}: {url}", messages::EMPTY_RESPONSE)]
    EmptyResponse {
        /// The URL navigated to
        url: String,
    },

    /// Every attempt in the retry budget failed.
    #[error("{} after {attempts} attempt(s): {url}", messages::RETRY_COUNT_EXCEEDED)]
    RetryBudgetExhausted {
        /// The URL being fetched
        url: String,
        /// Attempts made before giving up
        attempts: usize,
        /// The failure of the last attempt, if any attempt was made
        #[source]
        source: Option<Box<LoaderError>>,
    },

    /// Browser launch, connection, or page operation failed.
    #[error("Browser error: {0:#}")]
    Browser(#[from] anyhow::Error),

    /// Fetched content could not be parsed.
    #[error("Failed to parse content from {url}: {message}")]
    Parse {
        /// The URL whose content failed to parse
        url: String,
        /// Parser error message
        message: String,
    },

    /// The blocking iterator could not start its runtime.
    #[error("Runtime initialization error: {0}")]
    Runtime(#[from] std::io::Error),

    /// The HTTP client could not be built.
    #[error("HTTP client initialization error: {0}")]
    Client(#[from] reqwest::Error),
}

impl LoaderError {
    /// Builds an `InvalidUrl` error.
    pub fn invalid_url(url: impl Into<String>, reason: impl Into<String>) -> Self {
        LoaderError::InvalidUrl {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Whether the failure is transient and worth retrying.
    ///
    /// Only connection-level failures qualify; HTTP status errors, SSL
    /// failures and parse errors are permanent for the attempt.
    pub fn is_transient(&self) -> bool {
        matches!(self, LoaderError::Connection { .. })
    }

    /// Category of this failure, for statistics.
    pub fn kind(&self) -> FailureKind {
        match self {
            LoaderError::InvalidUrl { .. } => FailureKind::InvalidUrl,
            LoaderError::SslVerification { .. } => FailureKind::SslVerification,
            LoaderError::Connection { .. } => FailureKind::Connection,
            LoaderError::Http { .. } => FailureKind::Http,
            LoaderError::EmptyResponse { .. } => FailureKind::EmptyResponse,
            LoaderError::RetryBudgetExhausted { .. } => FailureKind::RetryBudgetExhausted,
            LoaderError::Browser(_) => FailureKind::Browser,
            LoaderError::Parse { .. } => FailureKind::Parse,
            LoaderError::Runtime(_) | LoaderError::Client(_) => FailureKind::Setup,
        }
    }
}

/// Categories of per-URL and per-batch failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIterMacro)]
pub enum FailureKind {
    InvalidUrl,
    SslVerification,
    Connection,
    Http,
    EmptyResponse,
    RetryBudgetExhausted,
    Browser,
    Parse,
    Setup,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::InvalidUrl => "Invalid URL",
            FailureKind::SslVerification => "SSL verification failed",
            FailureKind::Connection => "Connection error",
            FailureKind::Http => "HTTP error",
            FailureKind::EmptyResponse => "Empty response",
            FailureKind::RetryBudgetExhausted => "Retry budget exhausted",
            FailureKind::Browser => "Browser error",
            FailureKind::Parse => "Parse error",
            FailureKind::Setup => "Setup error",
        }
    }
}
