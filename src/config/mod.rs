//! Application configuration and constants.
//!
//! This module provides:
//! - Configuration constants (defaults for rate limits, retries, timeouts)
//! - Global `Settings` and per-batch `LoaderConfig`
//! - Logging enums for the binary

mod constants;
mod types;

// Re-export all constants
pub use constants::*;
pub use types::{LoaderConfig, LogFormat, LogLevel, ProxySettings, RetryPolicy, Settings};
