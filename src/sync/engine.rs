//! Reconciliation engine for one-way local -> remote sync.
//!
//! Compares the local tree against a RemoteIndex, classifies every path and
//! drives uploads and deletes through an ObjectStoreGateway on a bounded pool.

use futures::StreamExt;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};

use crate::error::{Result, SyncError};
use crate::fs::{LocalFile, LocalFs, MimeMapper, ObjectStoreGateway, RemoteObject};
use crate::sync::hash::{fingerprint_async, FINGERPRINT_METADATA_KEY};
use crate::sync::index::RemoteIndex;
use crate::sync::paths::PathKey;
use crate::sync::report::{ReportSnapshot, SyncFailure, SyncOutcome, SyncReport};
use crate::sync::throttle::{BandwidthLimit, BandwidthLimiter};

/// Lower and upper bound for the worker pool size.
const MIN_CONCURRENCY: usize = 1;
const MAX_CONCURRENCY: usize = 64;

/// Default pool size: twice the CPU count, clamped to `[1, 64]`.
pub fn default_concurrency() -> usize {
    (num_cpus::get() * 2).clamp(MIN_CONCURRENCY, MAX_CONCURRENCY)
}

/// Sync configuration.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Re-upload every file that already has a remote object, regardless of fingerprint.
    pub force_reupload: bool,
    /// Plan and count, but do not touch the remote store.
    pub dry_run: bool,
    /// Maximum number of concurrent hash/upload/delete operations.
    pub concurrency: usize,
    /// Deadline for a single remote upload or delete.
    pub op_timeout: Duration,
    /// Retries after a timed out or failed remote operation.
    pub max_retries: u32,
    /// Base delay between retries, multiplied by the attempt number.
    pub retry_backoff: Duration,
    /// Aggregate upload bandwidth limit.
    pub bandwidth_limit: BandwidthLimit,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            force_reupload: false,
            dry_run: false,
            concurrency: default_concurrency(),
            op_timeout: Duration::from_secs(300),
            max_retries: 3,
            retry_backoff: Duration::from_millis(500),
            bandwidth_limit: BandwidthLimit::unlimited(),
        }
    }
}

/// Remote mutation derived from the comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncAction {
    /// Upload a local file to `key`, storing `fingerprint` as metadata.
    Upload {
        key: String,
        local_path: PathBuf,
        fingerprint: String,
        outcome: SyncOutcome,
    },
    /// Delete the remote object `key`.
    Delete { key: String },
}

impl SyncAction {
    /// Get the object key associated with this action.
    pub fn key(&self) -> &str {
        match self {
            Self::Upload { key, .. } => key,
            Self::Delete { key } => key,
        }
    }

    pub fn outcome(&self) -> SyncOutcome {
        match self {
            Self::Upload { outcome, .. } => *outcome,
            Self::Delete { .. } => SyncOutcome::Deleted,
        }
    }

    pub fn is_upload(&self) -> bool {
        matches!(self, Self::Upload { .. })
    }
}

/// A local file together with its content fingerprint.
#[derive(Debug, Clone)]
pub struct FingerprintedFile {
    pub file: LocalFile,
    pub fingerprint: String,
}

/// The local side of a comparison.
#[derive(Debug, Clone, Default)]
pub struct LocalSet {
    /// Files that were hashed successfully
    pub files: Vec<FingerprintedFile>,
    /// Every PathKey present locally, including files that failed to hash
    pub present: HashSet<PathKey>,
    /// False when part of the tree could not be read
    pub complete: bool,
}

impl LocalSet {
    pub fn from_files(files: Vec<FingerprintedFile>) -> Self {
        let present = files.iter().map(|f| f.file.key.clone()).collect();
        Self {
            files,
            present,
            complete: true,
        }
    }
}

/// Result of the classification step.
#[derive(Debug, Clone, Default)]
pub struct SyncPlan {
    /// Uploads first (local path order), then deletes (key order)
    pub actions: Vec<SyncAction>,
    /// Object keys that already match
    pub unchanged: Vec<String>,
    /// Deletes were withheld because the local set is incomplete
    pub deletes_withheld: bool,
}

impl SyncPlan {
    pub fn uploads(&self) -> impl Iterator<Item = &SyncAction> {
        self.actions.iter().filter(|a| a.is_upload())
    }

    pub fn deletes(&self) -> impl Iterator<Item = &SyncAction> {
        self.actions.iter().filter(|a| !a.is_upload())
    }
}

/// Classify one local file against its remote counterpart.
pub fn classify(fingerprint: &str, remote: Option<&RemoteObject>, force_reupload: bool) -> SyncOutcome {
    match remote {
        None => SyncOutcome::New,
        // Forced re-uploads are counted as new
        Some(_) if force_reupload => SyncOutcome::New,
        Some(object) => match object.fingerprint() {
            Some(stored) if stored == fingerprint => SyncOutcome::Unchanged,
            _ => SyncOutcome::Changed,
        },
    }
}

/// Compare the local set with the remote index and derive the actions.
///
/// A file that matches a remote object is uploaded under that object's key, so
/// the remote spelling is kept when it differs from the local one only by case.
/// Deletes are computed from the same (pre-upload) index: every object with no
/// local counterpart, plus every shadowed duplicate spelling.
pub fn plan(local: &LocalSet, index: &RemoteIndex, force_reupload: bool) -> SyncPlan {
    let mut plan = SyncPlan::default();

    for entry in &local.files {
        let remote = index.get(&entry.file.key);
        let key = match remote {
            Some(object) => object.key.clone(),
            None => entry.file.object_key.clone(),
        };
        match classify(&entry.fingerprint, remote, force_reupload) {
            SyncOutcome::Unchanged => plan.unchanged.push(key),
            outcome => plan.actions.push(SyncAction::Upload {
                key,
                local_path: entry.file.path.clone(),
                fingerprint: entry.fingerprint.clone(),
                outcome,
            }),
        }
    }

    let mut deletes: Vec<&str> = index
        .iter()
        .filter(|(key, _)| !local.present.contains(*key))
        .map(|(_, object)| object.key.as_str())
        .chain(index.shadowed().iter().map(|object| object.key.as_str()))
        .collect();
    deletes.sort_unstable();

    if !deletes.is_empty() && !local.complete {
        plan.deletes_withheld = true;
        return plan;
    }

    plan.actions.extend(deletes.into_iter().map(|key| SyncAction::Delete {
        key: key.to_string(),
    }));

    plan
}

/// Result of a reconcile run.
#[derive(Debug)]
pub struct SyncResult {
    /// Actions that were planned/executed.
    pub actions: Vec<SyncAction>,
    pub report: ReportSnapshot,
    /// Regular files found under the sync root
    pub local_files: usize,
    pub deletes_withheld: bool,
    pub dry_run: bool,
}

/// Progress update for sync operations.
#[derive(Debug, Clone)]
pub struct SyncProgress {
    pub phase: SyncPhase,
    /// Current file being processed.
    pub current_file: String,
    pub files_done: usize,
    pub total_files: usize,
}

/// Current sync phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    Scanning,
    Hashing,
    Uploading,
    Deleting,
    Complete,
}

/// Drives a comparison and applies its actions.
pub struct Reconciler {
    gateway: Arc<dyn ObjectStoreGateway>,
    mime: Arc<dyn MimeMapper>,
    options: SyncOptions,
    limiter: BandwidthLimiter,
    progress_tx: Option<mpsc::Sender<SyncProgress>>,
}

impl Reconciler {
    pub fn new(
        gateway: Arc<dyn ObjectStoreGateway>,
        mime: Arc<dyn MimeMapper>,
        options: SyncOptions,
    ) -> Self {
        let limiter = BandwidthLimiter::new(options.bandwidth_limit);
        Self {
            gateway,
            mime,
            options,
            limiter,
            progress_tx: None,
        }
    }

    /// Create a reconciler with progress reporting.
    pub fn with_progress(
        gateway: Arc<dyn ObjectStoreGateway>,
        mime: Arc<dyn MimeMapper>,
        options: SyncOptions,
        progress_tx: mpsc::Sender<SyncProgress>,
    ) -> Self {
        let mut reconciler = Self::new(gateway, mime, options);
        reconciler.progress_tx = Some(progress_tx);
        reconciler
    }

    async fn send_progress(&self, phase: SyncPhase, current_file: &str, done: usize, total: usize) {
        send_progress(&self.progress_tx, phase, current_file, done, total).await;
    }

    /// Enumerate and fingerprint the local tree, classify against `index` and
    /// apply the resulting actions.
    ///
    /// Never fails as a whole: unreadable files and failed remote operations are
    /// recorded per target in the report.
    pub async fn reconcile(&self, local_root: &Path, index: &RemoteIndex) -> SyncResult {
        let report = Arc::new(SyncReport::new());

        self.send_progress(SyncPhase::Scanning, "", 0, 0).await;
        let local = self.collect_local(local_root, &report).await;
        let local_files = local.present.len();

        let plan = plan(&local, index, self.options.force_reupload);
        for key in &plan.unchanged {
            tracing::info!("No change, skipping: {}", key);
            report.record(SyncOutcome::Unchanged);
        }
        if plan.deletes_withheld {
            tracing::warn!(
                "part of {} could not be read; remote deletions skipped for this run",
                local_root.display()
            );
        }

        let uploads: Vec<SyncAction> = plan.uploads().cloned().collect();
        let deletes: Vec<SyncAction> = plan.deletes().cloned().collect();

        if self.options.dry_run {
            for action in &plan.actions {
                tracing::info!("[dry run] {:?} {}", action.outcome(), action.key());
                report.record(action.outcome());
            }
        } else {
            self.apply_all(SyncPhase::Uploading, uploads, &report).await;
            self.apply_all(SyncPhase::Deleting, deletes, &report).await;
        }

        self.send_progress(SyncPhase::Complete, "", plan.actions.len(), plan.actions.len())
            .await;

        SyncResult {
            actions: plan.actions,
            report: report.snapshot(),
            local_files,
            deletes_withheld: plan.deletes_withheld,
            dry_run: self.options.dry_run,
        }
    }

    /// Scan the tree and fingerprint every file on the bounded pool.
    /// Unreadable entries, collisions and hash failures go to the report.
    async fn collect_local(&self, root: &Path, report: &SyncReport) -> LocalSet {
        let scan = LocalFs::scan_async(root).await;
        let complete = scan.is_complete();

        for (path, err) in scan.unreadable.iter().chain(scan.collisions.iter()) {
            tracing::warn!("{}", err);
            report.record_failure(SyncFailure::new(path.display().to_string(), err));
        }

        let mut present: HashSet<PathKey> = scan.files.iter().map(|f| f.key.clone()).collect();
        present.extend(scan.collisions.iter().map(|(path, _)| PathKey::new(path)));

        let total = scan.files.len();
        let done = AtomicUsize::new(0);
        let hashed: Vec<(LocalFile, Result<String>)> = futures::stream::iter(scan.files)
            .map(|file| {
                let done = &done;
                async move {
                    let result = fingerprint_async(&file.path).await;
                    let finished = done.fetch_add(1, Ordering::Relaxed) + 1;
                    self.send_progress(SyncPhase::Hashing, &file.object_key, finished, total)
                        .await;
                    (file, result)
                }
            })
            .buffer_unordered(self.options.concurrency.max(MIN_CONCURRENCY))
            .collect()
            .await;

        let mut files = Vec::with_capacity(hashed.len());
        for (file, result) in hashed {
            match result {
                Ok(fingerprint) => files.push(FingerprintedFile { file, fingerprint }),
                Err(err) => {
                    tracing::warn!("Skipping {}: {}", file.path.display(), err);
                    report.record_failure(SyncFailure::new(file.path.display().to_string(), &err));
                }
            }
        }
        files.sort_by(|a, b| a.file.path.cmp(&b.file.path));

        LocalSet {
            files,
            present,
            complete,
        }
    }

    /// Run `actions` on the worker pool; at most `concurrency` run at once.
    async fn apply_all(&self, phase: SyncPhase, actions: Vec<SyncAction>, report: &Arc<SyncReport>) {
        if actions.is_empty() {
            return;
        }

        let semaphore = Arc::new(Semaphore::new(self.options.concurrency.max(MIN_CONCURRENCY)));
        let done = Arc::new(AtomicUsize::new(0));
        let total = actions.len();
        let mut handles = Vec::with_capacity(total);

        for action in actions {
            let permit = match Arc::clone(&semaphore).acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => break,
            };
            let worker = ActionWorker {
                gateway: Arc::clone(&self.gateway),
                mime: Arc::clone(&self.mime),
                limiter: self.limiter.clone(),
                op_timeout: self.options.op_timeout,
                max_retries: self.options.max_retries,
                retry_backoff: self.options.retry_backoff,
                progress_tx: self.progress_tx.clone(),
                done: Arc::clone(&done),
                total,
                phase,
            };
            let report = Arc::clone(report);
            let target = action.key().to_string();

            let handle = tokio::spawn(async move {
                let _permit = permit;
                worker.apply(action, &report).await;
            });
            handles.push((target, handle));
        }

        for (target, handle) in handles {
            if let Err(join_err) = handle.await {
                let err = SyncError::remote("apply", &target, join_err);
                report.record_failure(SyncFailure::new(target, &err));
            }
        }
    }
}

/// Everything a pool task needs to apply one action.
struct ActionWorker {
    gateway: Arc<dyn ObjectStoreGateway>,
    mime: Arc<dyn MimeMapper>,
    limiter: BandwidthLimiter,
    op_timeout: Duration,
    max_retries: u32,
    retry_backoff: Duration,
    progress_tx: Option<mpsc::Sender<SyncProgress>>,
    done: Arc<AtomicUsize>,
    total: usize,
    phase: SyncPhase,
}

impl ActionWorker {
    async fn apply(&self, action: SyncAction, report: &SyncReport) {
        match &action {
            SyncAction::Upload {
                key,
                local_path,
                fingerprint,
                outcome,
            } => {
                match outcome {
                    SyncOutcome::Changed => {
                        tracing::info!("Hashes differ, re-uploading: {}", local_path.display())
                    }
                    _ => tracing::info!("New file. Uploading: {}", local_path.display()),
                }

                let content_type = self.mime.content_type_for(local_path);
                let metadata = HashMap::from([(
                    FINGERPRINT_METADATA_KEY.to_string(),
                    fingerprint.clone(),
                )]);

                let result = self
                    .with_retries("upload", key, || {
                        self.gateway
                            .upload(key, local_path, &content_type, &metadata, &self.limiter)
                    })
                    .await;

                match result {
                    Ok(bytes) => {
                        tracing::debug!(
                            "Uploaded {} ({} bytes, {})",
                            self.gateway.display_path(key),
                            bytes,
                            content_type
                        );
                        report.record(*outcome);
                        report.add_bytes(bytes);
                    }
                    Err(err) => {
                        tracing::warn!("Upload of {} failed: {}", local_path.display(), err);
                        report.record_failure(SyncFailure::new(
                            local_path.display().to_string(),
                            &err,
                        ));
                    }
                }
            }
            SyncAction::Delete { key } => {
                tracing::info!(
                    "Blob doesn't exist in local dir, deleting blob: {}",
                    self.gateway.display_path(key)
                );

                match self.with_retries("delete", key, || self.gateway.delete(key)).await {
                    Ok(()) => report.record(SyncOutcome::Deleted),
                    Err(err) => {
                        tracing::warn!("Delete of {} failed: {}", key, err);
                        report.record_failure(SyncFailure::new(key.clone(), &err));
                    }
                }
            }
        }

        let finished = self.done.fetch_add(1, Ordering::Relaxed) + 1;
        send_progress(&self.progress_tx, self.phase, action.key(), finished, self.total).await;
    }

    /// Run a remote operation under the per-operation timeout, retrying
    /// retryable failures with linear backoff.
    async fn with_retries<T, F, Fut>(&self, operation: &str, target: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0u32;
        loop {
            let result = match tokio::time::timeout(self.op_timeout, op()).await {
                Ok(result) => result,
                Err(_) => Err(SyncError::Timeout {
                    operation: operation.to_string(),
                    target: target.to_string(),
                    after: self.op_timeout,
                }),
            };

            match result {
                Err(err) if err.is_retryable() && attempt < self.max_retries => {
                    attempt += 1;
                    tracing::warn!(
                        "{} (attempt {}/{}), retrying",
                        err,
                        attempt,
                        self.max_retries + 1
                    );
                    tokio::time::sleep(self.retry_backoff * attempt).await;
                }
                other => return other,
            }
        }
    }
}

async fn send_progress(
    tx: &Option<mpsc::Sender<SyncProgress>>,
    phase: SyncPhase,
    current_file: &str,
    files_done: usize,
    total_files: usize,
) {
    if let Some(tx) = tx {
        let _ = tx
            .send(SyncProgress {
                phase,
                current_file: current_file.to_string(),
                files_done,
                total_files,
            })
            .await;
    }
}
