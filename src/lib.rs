//! safe_web_loader: SSRF-safe, rate-limited web page loading
//!
//! Turns a batch of URLs into a lazy sequence of text documents with
//! metadata, for retrieval pipelines. URLs are screened against private
//! addresses before any fetch, requests are rate limited, and pages are
//! fetched either with a plain HTTP GET or rendered in a headless browser.
//!
//! # Example
//!
//! ```no_run
//! use safe_web_loader::{get_loader, LoaderOptions};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let loader = get_loader(&["https://example.com"], LoaderOptions::default());
//! for doc in loader.aload().await? {
//!     println!("{}: {} chars", doc.source(), doc.content().len());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Blocking use
//!
//! `WebLoader::lazy_load` and `WebLoader::load` run on a private
//! single-threaded runtime and must not be called from async code; use
//! `alazy_load` / `aload` there.

pub mod browser;
pub mod config;
pub mod error_handling;
pub mod fetch;
pub mod initialization;
mod loader;
mod models;
pub mod parse;
mod rate_limiter;
pub mod registry;
mod rerank;
pub mod security;
pub mod tls;

// Re-export public API
pub use config::{LoaderConfig, LogFormat, LogLevel, ProxySettings, RetryPolicy, Settings};
pub use error_handling::{FailureKind, LoaderError, LoaderStats};
pub use loader::{get_loader, DocumentIter, DocumentResult, LoaderFactory, LoaderOptions, WebLoader};
pub use models::{Document, ExecutionMode, Metadata, SOURCE_KEY};
pub use rate_limiter::RateLimiter;
pub use registry::{EngineRegistry, StrategyConstructor};
pub use rerank::RemoteReranker;
pub use security::UrlValidator;
