//! Fetch strategies.
//!
//! A strategy turns one pre-validated URL into one `Document`. The loader
//! drives it through a batch: `open` once, `fetch` per URL in input order,
//! `close` on every exit path. Strategies never re-validate URLs.

mod http;
mod retry;

use async_trait::async_trait;

use crate::config::LoaderConfig;
use crate::error_handling::LoaderError;
use crate::models::{Document, ExecutionMode};

pub use http::DirectHttpStrategy;
pub use retry::retry_transient;

/// A way of fetching pages, selected by engine name.
///
/// `mode` tells the strategy whether the caller iterates blocking or
/// asynchronously; strategies use it only to pick how they wait.
#[async_trait]
pub trait FetchStrategy: Send {
    /// Engine name, for logging.
    fn name(&self) -> &'static str;

    /// The configuration this strategy was built with.
    fn config(&self) -> &LoaderConfig;

    fn urls(&self) -> &[String] {
        &self.config().urls
    }

    fn continue_on_failure(&self) -> bool {
        self.config().continue_on_failure
    }

    /// Acquires per-batch resources (e.g. a browser session).
    async fn open(&mut self, _mode: ExecutionMode) -> Result<(), LoaderError> {
        Ok(())
    }

    /// Fetches `url` and builds its document.
    async fn fetch(&mut self, url: &str, mode: ExecutionMode) -> Result<Document, LoaderError>;

    /// Releases per-batch resources. Safe to call when `open` failed or was never called.
    async fn close(&mut self) {}
}
