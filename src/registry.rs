//! Engine registry: maps engine names to strategy constructors.
//!
//! The table is built once and never mutated; unknown names resolve to the
//! default constructor rather than failing.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use log::debug;

use crate::browser::BrowserRenderStrategy;
use crate::config::LoaderConfig;
use crate::error_handling::LoaderError;
use crate::fetch::{DirectHttpStrategy, FetchStrategy};

/// Builds a strategy for one batch.
pub type StrategyConstructor =
    Arc<dyn Fn(LoaderConfig) -> Result<Box<dyn FetchStrategy>, LoaderError> + Send + Sync>;

/// Engine name of the direct HTTP strategy.
pub const SAFE_WEB_ENGINE: &str = "safe_web";
/// Engine name of the browser strategy.
pub const PLAYWRIGHT_ENGINE: &str = "playwright";

#[derive(Clone)]
pub struct EngineRegistry {
    engines: BTreeMap<String, StrategyConstructor>,
    fallback: StrategyConstructor,
}

impl EngineRegistry {
    /// An empty registry resolving every name to `fallback`.
    pub fn new(fallback: StrategyConstructor) -> Self {
        Self {
            engines: BTreeMap::new(),
            fallback,
        }
    }

    /// The built-in table: `safe_web` and anything unknown map to
    /// `DirectHttpStrategy`, `playwright` to `BrowserRenderStrategy`.
    pub fn standard() -> Self {
        Self::new(direct_http())
            .with_engine(SAFE_WEB_ENGINE, direct_http())
            .with_engine(PLAYWRIGHT_ENGINE, browser_render())
    }

    /// Returns the registry with `name` mapped to `constructor`.
    pub fn with_engine(mut self, name: impl Into<String>, constructor: StrategyConstructor) -> Self {
        self.engines.insert(name.into(), constructor);
        self
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.engines.contains_key(name)
    }

    pub fn engine_names(&self) -> impl Iterator<Item = &str> {
        self.engines.keys().map(String::as_str)
    }

    /// Builds the strategy registered for `engine`, or the fallback.
    pub fn create(
        &self,
        engine: &str,
        config: LoaderConfig,
    ) -> Result<Box<dyn FetchStrategy>, LoaderError> {
        let constructor = match self.engines.get(engine) {
            Some(constructor) => constructor,
            None => {
                debug!("Unknown web loader engine '{engine}', using the default strategy");
                &self.fallback
            }
        };
        let strategy = constructor(config)?;
        debug!(
            "Engine '{engine}' -> {} strategy for {} URL(s)",
            strategy.name(),
            strategy.urls().len()
        );
        Ok(strategy)
    }
}

impl Default for EngineRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl fmt::Debug for EngineRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineRegistry")
            .field("engines", &self.engines.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

fn direct_http() -> StrategyConstructor {
    Arc::new(
        |config: LoaderConfig| -> Result<Box<dyn FetchStrategy>, LoaderError> {
            Ok(Box::new(DirectHttpStrategy::new(config)?))
        },
    )
}

fn browser_render() -> StrategyConstructor {
    Arc::new(
        |config: LoaderConfig| -> Result<Box<dyn FetchStrategy>, LoaderError> {
            Ok(Box::new(BrowserRenderStrategy::new(config)))
        },
    )
}
