//! Error handling and loader statistics.
//!
//! This module provides:
//! - The `LoaderError` taxonomy and its transient/permanent classification
//! - The human-readable message catalog
//! - Per-loader statistics (documents produced, failures per kind)

pub mod messages;
mod stats;
mod types;

// Re-export public API
pub use stats::LoaderStats;
pub use types::{BoxError, FailureKind, InitializationError, LoaderError};
