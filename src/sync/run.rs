//! Top-level sync run: validate, snapshot, reconcile, re-list, summarize.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;

use crate::error::Result;
use crate::fs::{MimeMapper, ObjectStoreGateway};
use crate::sync::engine::{Reconciler, SyncAction, SyncOptions, SyncProgress};
use crate::sync::index::RemoteIndex;
use crate::sync::paths::resolve_root;
use crate::sync::report::ReportSnapshot;

/// What a caller asks `run_sync` to do.
#[derive(Debug, Clone)]
pub struct SyncRequest {
    /// Local directory, absolute or relative to the working directory
    pub local_path: String,
    pub options: SyncOptions,
    /// Grant anonymous read access on the container before syncing
    pub public_read: bool,
}

/// End-of-run summary.
#[derive(Debug, Clone, Serialize)]
pub struct SyncSummary {
    pub local_root: PathBuf,
    pub destination: String,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub local_files: usize,
    pub remote_objects_before: usize,
    pub remote_objects_after: usize,
    pub uploads_planned: usize,
    pub deletes_planned: usize,
    pub deletes_withheld: bool,
    pub dry_run: bool,
    pub report: ReportSnapshot,
}

impl SyncSummary {
    /// 0 on a clean run, otherwise the exit code of the first failure's kind
    pub fn exit_code(&self) -> u8 {
        self.report
            .failures
            .first()
            .map(|failure| failure.kind.exit_code())
            .unwrap_or(0)
    }
}

/// Perform a one-way sync of `request.local_path` into the gateway's container.
///
/// Blank or missing local paths fail before any remote call. Listing failures
/// abort the run; per-file failures are collected in the report.
pub async fn run_sync(
    gateway: Arc<dyn ObjectStoreGateway>,
    mime: Arc<dyn MimeMapper>,
    request: SyncRequest,
    progress_tx: Option<mpsc::Sender<SyncProgress>>,
) -> Result<SyncSummary> {
    let root = resolve_root(&request.local_path)?;
    let started_at = Utc::now();
    let timer = Instant::now();
    let destination = gateway.display_path("");

    tracing::info!(
        "Syncing localPath: '{}', to container: '{}'.",
        root.display(),
        destination
    );

    gateway.ensure_container().await?;
    if request.public_read && !request.options.dry_run {
        gateway.set_public_read_access().await?;
    }

    let before = gateway.list_objects().await?;
    let remote_objects_before = before.len();
    let index = RemoteIndex::build(&root, before);

    let dry_run = request.options.dry_run;
    let reconciler = match progress_tx {
        Some(tx) => Reconciler::with_progress(Arc::clone(&gateway), mime, request.options, tx),
        None => Reconciler::new(Arc::clone(&gateway), mime, request.options),
    };

    let result = reconciler.reconcile(&root, &index).await;
    tracing::info!(
        "Total local files: {}, Total remote blobs: {}.",
        result.local_files,
        remote_objects_before
    );

    // Second listing, for reporting only
    let remote_objects_after = if dry_run {
        remote_objects_before
    } else {
        gateway.list_objects().await?.len()
    };
    tracing::info!(
        "Total local files: {}, Total remote blobs: {}.",
        result.local_files,
        remote_objects_after
    );
    tracing::info!("{}", result.report.summary_line());

    let uploads_planned = result.actions.iter().filter(|a| a.is_upload()).count();
    let deletes_planned = result
        .actions
        .iter()
        .filter(|a| matches!(a, SyncAction::Delete { .. }))
        .count();

    Ok(SyncSummary {
        local_root: root,
        destination,
        started_at,
        duration_ms: timer.elapsed().as_millis() as u64,
        local_files: result.local_files,
        remote_objects_before,
        remote_objects_after,
        uploads_planned,
        deletes_planned,
        deletes_withheld: result.deletes_withheld,
        dry_run,
        report: result.report,
    })
}
