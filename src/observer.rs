//! Scan observer
//!
//! A single observer instance is constructed at scan start and handed down
//! to extractors and the scheduler. It forwards to `tracing` so the debug
//! log obeys the global filter; no component reaches for ambient logging
//! state on its own.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Observer shared across one scan.
#[derive(Debug, Default)]
pub struct ScanObserver {
    files_started: AtomicU64,
    files_finished: AtomicU64,
    files_errored: AtomicU64,
}

impl ScanObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file_started(&self, path: &str) {
        self.files_started.fetch_add(1, Ordering::Relaxed);
        debug!(file = path, "processing started");
    }

    pub fn file_finished(&self, path: &str, matches: usize, elapsed: Duration) {
        self.files_finished.fetch_add(1, Ordering::Relaxed);
        debug!(
            file = path,
            matches,
            elapsed_ms = elapsed.as_millis() as u64,
            "processing finished"
        );
    }

    pub fn file_errored(&self, path: &str, kind: &str, message: &str) {
        self.files_errored.fetch_add(1, Ordering::Relaxed);
        warn!(file = path, kind, message, "file skipped");
    }

    pub fn extractor_selected(&self, path: &str, extractor: &str) {
        debug!(file = path, extractor, "extractor selected");
    }

    pub fn extractor_fallback(&self, path: &str, from: &str) {
        debug!(file = path, from, "falling back to plaintext extraction");
    }

    pub fn retry(&self, path: &str, attempt: u32, backoff: Duration) {
        debug!(
            file = path,
            attempt,
            backoff_ms = backoff.as_millis() as u64,
            "retrying after transient error"
        );
    }

    pub fn workers_resized(&self, from: usize, to: usize, reason: &str) {
        info!(from, to, reason, "worker pool resized");
    }

    pub fn counts(&self) -> (u64, u64, u64) {
        (
            self.files_started.load(Ordering::Relaxed),
            self.files_finished.load(Ordering::Relaxed),
            self.files_errored.load(Ordering::Relaxed),
        )
    }
}
