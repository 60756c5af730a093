//! Run counters and per-file failures.
//!
//! Counters are atomics so the upload and delete workers can record outcomes
//! without coordination; the totals stay exact under any concurrency level.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use crate::error::{SyncError, SyncErrorKind};

/// Classification of a PathKey after comparing the local and remote sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SyncOutcome {
    New,
    Changed,
    Deleted,
    Unchanged,
}

/// A file or object that could not be synced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncFailure {
    /// Local path or object key the failure concerns
    pub target: String,
    pub kind: SyncErrorKind,
    pub message: String,
}

impl SyncFailure {
    pub fn new(target: impl Into<String>, error: &SyncError) -> Self {
        Self {
            target: target.into(),
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

#[derive(Debug, Default)]
pub struct SyncReport {
    new: AtomicU64,
    changed: AtomicU64,
    deleted: AtomicU64,
    unchanged: AtomicU64,
    bytes_uploaded: AtomicU64,
    failures: Mutex<Vec<SyncFailure>>,
}

impl SyncReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, outcome: SyncOutcome) {
        let counter = match outcome {
            SyncOutcome::New => &self.new,
            SyncOutcome::Changed => &self.changed,
            SyncOutcome::Deleted => &self.deleted,
            SyncOutcome::Unchanged => &self.unchanged,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_bytes(&self, bytes: u64) {
        self.bytes_uploaded.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn record_failure(&self, failure: SyncFailure) {
        let mut failures = self
            .failures
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        failures.push(failure);
    }

    pub fn count(&self, outcome: SyncOutcome) -> u64 {
        match outcome {
            SyncOutcome::New => self.new.load(Ordering::Relaxed),
            SyncOutcome::Changed => self.changed.load(Ordering::Relaxed),
            SyncOutcome::Deleted => self.deleted.load(Ordering::Relaxed),
            SyncOutcome::Unchanged => self.unchanged.load(Ordering::Relaxed),
        }
    }

    pub fn snapshot(&self) -> ReportSnapshot {
        let mut failures = self
            .failures
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();
        // Workers finish in any order; keep the output stable
        failures.sort_by(|a, b| a.target.cmp(&b.target));

        ReportSnapshot {
            new: self.count(SyncOutcome::New),
            changed: self.count(SyncOutcome::Changed),
            deleted: self.count(SyncOutcome::Deleted),
            unchanged: self.count(SyncOutcome::Unchanged),
            bytes_uploaded: self.bytes_uploaded.load(Ordering::Relaxed),
            failures,
        }
    }
}

/// Immutable end-of-run view of a SyncReport.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReportSnapshot {
    pub new: u64,
    pub changed: u64,
    pub deleted: u64,
    pub unchanged: u64,
    pub bytes_uploaded: u64,
    pub failures: Vec<SyncFailure>,
}

impl ReportSnapshot {
    pub fn summary_line(&self) -> String {
        format!(
            "Total new: {}, updated: {}, deleted {}.",
            self.new, self.changed, self.deleted
        )
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}
