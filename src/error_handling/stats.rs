//! Loader statistics tracking.
//!
//! Atomic counters for documents produced and failures per `FailureKind`,
//! shared between a loader and the document streams it hands out.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use strum::IntoEnumIterator;

use super::types::FailureKind;

/// Thread-safe loader statistics.
///
/// Every `FailureKind` is initialised to zero on creation, so lookups never
/// miss.
#[derive(Debug)]
pub struct LoaderStats {
    documents: AtomicUsize,
    failures: HashMap<FailureKind, AtomicUsize>,
}

impl Default for LoaderStats {
    fn default() -> Self {
        Self::new()
    }
}

impl LoaderStats {
    pub fn new() -> Self {
        let failures = FailureKind::iter()
            .map(|kind| (kind, AtomicUsize::new(0)))
            .collect();
        LoaderStats {
            documents: AtomicUsize::new(0),
            failures,
        }
    }

    pub fn record_document(&self) {
        self.documents.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self, kind: FailureKind) {
        if let Some(counter) = self.failures.get(&kind) {
            counter.fetch_add(1, Ordering::Relaxed);
        } else {
            log::error!(
                "Attempted to increment failure counter for {:?} which is not in the map",
                kind
            );
        }
    }

    /// Documents yielded so far.
    pub fn documents(&self) -> usize {
        self.documents.load(Ordering::SeqCst)
    }

    /// Failures recorded for `kind`.
    pub fn failure_count(&self, kind: FailureKind) -> usize {
        self.failures
            .get(&kind)
            .map(|c| c.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    /// Failures across all kinds.
    pub fn total_failures(&self) -> usize {
        FailureKind::iter().map(|k| self.failure_count(k)).sum()
    }

    /// Logs a one-line summary per non-zero failure kind.
    pub fn log_summary(&self) {
        log::info!(
            "Loaded {} document(s), {} failure(s)",
            self.documents(),
            self.total_failures()
        );
        for kind in FailureKind::iter() {
            let count = self.failure_count(kind);
            if count > 0 {
                log::info!("   {}: {}", kind, count);
            }
        }
    }
}
