//! Loaders: lazy document sequences over a batch of URLs.
//!
//! `LoaderFactory` validates and filters URLs, then builds a `WebLoader` for
//! the configured engine. A `WebLoader` can be iterated any number of times,
//! blocking (`lazy_load`, `load`) or asynchronously (`alazy_load`, `aload`);
//! each iteration builds a fresh strategy and walks the URLs in input order.
//!
//! Per-URL failures are logged and skipped when `continue_on_failure` is set.
//! Otherwise the strategy is closed, the error is yielded, and the sequence
//! ends.

use std::sync::Arc;

use async_stream::stream;
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use log::error;

use crate::config::{LoaderConfig, Settings};
use crate::error_handling::{LoaderError, LoaderStats};
use crate::fetch::FetchStrategy;
use crate::models::{Document, ExecutionMode};
use crate::registry::EngineRegistry;
use crate::security::UrlValidator;

/// Items yielded by every document sequence.
pub type DocumentResult = Result<Document, LoaderError>;

/// Drives `strategy` over its URLs, yielding one result per produced document.
fn document_stream(
    mut strategy: Box<dyn FetchStrategy>,
    mode: ExecutionMode,
    stats: Arc<LoaderStats>,
) -> BoxStream<'static, DocumentResult> {
    Box::pin(stream! {
        let urls = strategy.urls().to_vec();
        if urls.is_empty() {
            return;
        }
        let continue_on_failure = strategy.continue_on_failure();

        if let Err(e) = strategy.open(mode).await {
            strategy.close().await;
            stats.record_failure(e.kind());
            if continue_on_failure {
                error!("Failed to start {} loader: {e}", strategy.name());
            } else {
                yield Err(e);
            }
            return;
        }

        for url in urls {
            match strategy.fetch(&url, mode).await {
                Ok(document) => {
                    stats.record_document();
                    yield Ok(document);
                }
                Err(e) if continue_on_failure => {
                    stats.record_failure(e.kind());
                    error!("Error loading {url}: {e}");
                }
                Err(e) => {
                    stats.record_failure(e.kind());
                    strategy.close().await;
                    yield Err(e);
                    return;
                }
            }
        }
        strategy.close().await;
    })
}

/// Blocking iterator over a loader's documents.
///
/// Owns a single-threaded runtime that drives the underlying stream one
/// document per `next()`. Cannot be created from within an async context.
pub struct DocumentIter {
    // dropped before the runtime
    stream: BoxStream<'static, DocumentResult>,
    runtime: tokio::runtime::Runtime,
}

impl Iterator for DocumentIter {
    type Item = DocumentResult;

    fn next(&mut self) -> Option<Self::Item> {
        self.runtime.block_on(self.stream.next())
    }
}

/// A batch of validated URLs bound to one engine.
#[derive(Debug, Clone)]
pub struct WebLoader {
    engine: String,
    config: LoaderConfig,
    registry: EngineRegistry,
    stats: Arc<LoaderStats>,
}

impl WebLoader {
    /// Builds a loader; no I/O happens until iteration starts.
    ///
    /// URLs in `config` are fetched as given: validate them first (see
    /// `LoaderFactory`).
    pub fn new(engine: impl Into<String>, config: LoaderConfig, registry: EngineRegistry) -> Self {
        Self {
            engine: engine.into(),
            config,
            registry,
            stats: Arc::new(LoaderStats::new()),
        }
    }

    pub fn engine(&self) -> &str {
        &self.engine
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    pub fn urls(&self) -> &[String] {
        &self.config.urls
    }

    /// Counters accumulated over every iteration of this loader.
    pub fn stats(&self) -> &LoaderStats {
        &self.stats
    }

    fn strategy(&self) -> Result<Box<dyn FetchStrategy>, LoaderError> {
        self.registry.create(&self.engine, self.config.clone())
    }

    /// Blocking lazy iteration.
    ///
    /// # Errors
    ///
    /// Fails if called from within a tokio runtime (use `alazy_load` there),
    /// or if the iterator's runtime or the strategy cannot be created.
    pub fn lazy_load(&self) -> Result<DocumentIter, LoaderError> {
        if tokio::runtime::Handle::try_current().is_ok() {
            return Err(LoaderError::Runtime(std::io::Error::other(
                "blocking iteration started inside an async runtime; use alazy_load",
            )));
        }
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let strategy = self.strategy()?;
        Ok(DocumentIter {
            stream: document_stream(strategy, ExecutionMode::Blocking, Arc::clone(&self.stats)),
            runtime,
        })
    }

    /// Asynchronous lazy iteration. A strategy construction failure is
    /// yielded as the only item.
    pub fn alazy_load(&self) -> BoxStream<'static, DocumentResult> {
        match self.strategy() {
            Ok(strategy) => {
                document_stream(strategy, ExecutionMode::Suspend, Arc::clone(&self.stats))
            }
            Err(e) => stream::once(async { Err(e) }).boxed(),
        }
    }

    /// Collects every document, blocking.
    pub fn load(&self) -> Result<Vec<Document>, LoaderError> {
        self.lazy_load()?.collect()
    }

    /// Collects every document asynchronously, in input order.
    pub async fn aload(&self) -> Result<Vec<Document>, LoaderError> {
        self.alazy_load().try_collect().await
    }
}

/// Caller options for `LoaderFactory::get_loader`.
#[derive(Debug, Clone, PartialEq)]
pub struct LoaderOptions {
    pub verify_ssl: bool,
    /// Falls back to `Settings::requests_per_second` when `None`
    pub requests_per_second: Option<f64>,
    pub trust_env: bool,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            verify_ssl: true,
            requests_per_second: None,
            trust_env: false,
        }
    }
}

/// Builds loaders from global settings and an engine table.
#[derive(Debug, Clone)]
pub struct LoaderFactory {
    settings: Settings,
    registry: EngineRegistry,
    validator: UrlValidator,
}

impl LoaderFactory {
    /// Factory with the standard engine table and a validator honouring
    /// `settings.enable_local_web_fetch`.
    pub fn new(settings: Settings) -> Self {
        let validator = UrlValidator::from_settings(&settings);
        Self {
            settings,
            registry: EngineRegistry::standard(),
            validator,
        }
    }

    pub fn from_env() -> Self {
        Self::new(Settings::from_env())
    }

    pub fn with_registry(mut self, registry: EngineRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_validator(mut self, validator: UrlValidator) -> Self {
        self.validator = validator;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn validator(&self) -> &UrlValidator {
        &self.validator
    }

    /// Filters out invalid URLs and builds a loader for the configured engine
    /// that continues past per-URL failures.
    pub fn get_loader<S: AsRef<str>>(&self, urls: &[S], options: LoaderOptions) -> WebLoader {
        let config = LoaderConfig {
            urls: self.validator.filter_valid(urls),
            verify_ssl: options.verify_ssl,
            trust_env: options.trust_env,
            requests_per_second: Some(
                options
                    .requests_per_second
                    .unwrap_or(self.settings.requests_per_second),
            ),
            continue_on_failure: true,
            ..Default::default()
        };
        self.create_loader(&self.settings.web_loader_engine, config)
    }

    /// `get_loader` for async callers. Hostname lookups block, so validation
    /// runs on tokio's blocking pool.
    ///
    /// # Errors
    ///
    /// Returns `LoaderError::Runtime` if the validation task panics or is
    /// cancelled.
    pub async fn aget_loader(
        &self,
        urls: Vec<String>,
        options: LoaderOptions,
    ) -> Result<WebLoader, LoaderError> {
        let factory = self.clone();
        tokio::task::spawn_blocking(move || factory.get_loader(&urls, options))
            .await
            .map_err(|e| LoaderError::Runtime(std::io::Error::other(e)))
    }

    /// Builds a loader for `engine` from a full configuration, injecting the
    /// global remote browser endpoint when the configuration has none.
    ///
    /// URLs are used as given.
    pub fn create_loader(&self, engine: &str, mut config: LoaderConfig) -> WebLoader {
        if config.remote_browser_endpoint.is_none() {
            config.remote_browser_endpoint = self.settings.remote_browser_endpoint.clone();
        }
        WebLoader::new(engine, config, self.registry.clone())
    }
}

/// `LoaderFactory::from_env().get_loader(urls, options)`.
pub fn get_loader<S: AsRef<str>>(urls: &[S], options: LoaderOptions) -> WebLoader {
    LoaderFactory::from_env().get_loader(urls, options)
}
