//! Browser-rendered fetch strategy.
//!
//! Pages are loaded in a real browser so client-side rendering runs before
//! text is extracted. The browser itself sits behind `BrowserEngine`,
//! `BrowserSession` and `BrowserPage`; `chromium` provides the production
//! implementation, and tests plug in fakes.

mod chromium;
mod evaluator;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use log::{debug, warn};

use crate::config::{LoaderConfig, ProxySettings};
use crate::error_handling::LoaderError;
use crate::fetch::FetchStrategy;
use crate::models::{Document, ExecutionMode};
use crate::parse::ParsedPage;
use crate::rate_limiter::RateLimiter;
use crate::tls::certificate_is_valid;

pub use chromium::ChromiumEngine;
pub use evaluator::HtmlTextEvaluator;

/// How to obtain a browser session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LaunchOptions {
    /// Run without a visible window. Always true for remote browsers.
    pub headless: bool,
    /// Proxy for a locally launched browser
    pub proxy: Option<ProxySettings>,
    /// WebSocket endpoint of a remote browser; launch locally when `None`
    pub remote_endpoint: Option<String>,
}

/// The response that completed a navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationResponse {
    /// URL of the page after redirects
    pub url: String,
}

/// Launches or connects to a browser.
#[async_trait]
pub trait BrowserEngine: Send + Sync {
    async fn launch(&self, options: &LaunchOptions) -> Result<Box<dyn BrowserSession>>;
}

/// One browser, shared by every URL of a batch.
#[async_trait]
pub trait BrowserSession: Send {
    async fn new_page(&mut self) -> Result<Box<dyn BrowserPage>>;

    /// Closes a launched browser, or disconnects from a remote one.
    async fn close(&mut self) -> Result<()>;
}

/// A single tab.
#[async_trait]
pub trait BrowserPage: Send + Sync {
    /// Navigates to `url`. `Ok(None)` means the navigation produced no response.
    async fn goto(&mut self, url: &str) -> Result<Option<NavigationResponse>>;

    /// Current document markup.
    async fn content(&self) -> Result<String>;

    async fn close(self: Box<Self>) -> Result<()>;
}

/// Extracts text and metadata from a page after navigation.
#[async_trait]
pub trait PageEvaluator: Send + Sync {
    async fn evaluate(
        &self,
        page: &dyn BrowserPage,
        response: &NavigationResponse,
    ) -> Result<ParsedPage>;
}

/// Renders each URL in a browser and extracts its text.
///
/// One session is opened per batch and closed on every exit path. Each URL
/// gets a fresh page that is closed after use, whatever the outcome.
pub struct BrowserRenderStrategy {
    config: LoaderConfig,
    engine: Arc<dyn BrowserEngine>,
    evaluator: Arc<dyn PageEvaluator>,
    session: Option<Box<dyn BrowserSession>>,
    rate_limiter: RateLimiter,
}

impl BrowserRenderStrategy {
    /// A Chromium-backed strategy using the default text evaluator.
    pub fn new(config: LoaderConfig) -> Self {
        Self::with_engine(config, Arc::new(ChromiumEngine))
    }

    pub fn with_engine(config: LoaderConfig, engine: Arc<dyn BrowserEngine>) -> Self {
        let evaluator = Arc::new(HtmlTextEvaluator::new(&config.remove_selectors));
        let rate_limiter = RateLimiter::new(config.requests_per_second);
        Self {
            config,
            engine,
            evaluator,
            session: None,
            rate_limiter,
        }
    }

    /// Replaces the page evaluator.
    pub fn with_evaluator(mut self, evaluator: Arc<dyn PageEvaluator>) -> Self {
        self.evaluator = evaluator;
        self
    }

    pub fn launch_options(&self) -> LaunchOptions {
        let remote_endpoint = self
            .config
            .remote_browser_endpoint
            .clone()
            .filter(|endpoint| !endpoint.is_empty());
        LaunchOptions {
            headless: self.config.headless || remote_endpoint.is_some(),
            proxy: self.config.effective_proxy(),
            remote_endpoint,
        }
    }

    pub fn is_open(&self) -> bool {
        self.session.is_some()
    }
}

async fn render(
    evaluator: &dyn PageEvaluator,
    page: &mut dyn BrowserPage,
    url: &str,
) -> Result<ParsedPage, LoaderError> {
    let response = page
        .goto(url)
        .await?
        .ok_or_else(|| LoaderError::EmptyResponse {
            url: url.to_string(),
        })?;
    debug!("Navigated to {url} (landed on {})", response.url);
    Ok(evaluator.evaluate(&*page, &response).await?)
}

#[async_trait]
impl FetchStrategy for BrowserRenderStrategy {
    fn name(&self) -> &'static str {
        "playwright"
    }

    fn config(&self) -> &LoaderConfig {
        &self.config
    }

    async fn open(&mut self, _mode: ExecutionMode) -> Result<(), LoaderError> {
        if self.session.is_none() {
            let options = self.launch_options();
            debug!(
                "Starting browser session (remote: {}, headless: {})",
                options.remote_endpoint.is_some(),
                options.headless
            );
            self.session = Some(self.engine.launch(&options).await?);
        }
        Ok(())
    }

    async fn fetch(&mut self, url: &str, mode: ExecutionMode) -> Result<Document, LoaderError> {
        if self.config.verify_ssl && !certificate_is_valid(url).await {
            return Err(LoaderError::SslVerification {
                url: url.to_string(),
            });
        }
        self.rate_limiter.wait(mode).await;

        let session = self
            .session
            .as_mut()
            .ok_or_else(|| anyhow::anyhow!("browser session is not open"))?;
        let mut page = session.new_page().await?;

        let result = render(self.evaluator.as_ref(), page.as_mut(), url).await;
        if let Err(e) = page.close().await {
            warn!("Failed to close page for {url}: {e:#}");
        }
        Ok(result?.into_document(url))
    }

    async fn close(&mut self) {
        if let Some(mut session) = self.session.take() {
            match session.close().await {
                Ok(()) => debug!("Browser session closed"),
                Err(e) => warn!("Failed to close browser session: {e:#}"),
            }
        }
    }
}
