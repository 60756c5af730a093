//! One-way sync of a local tree into an object store container.
//!
//! Paths map to object keys, file content maps to an MD5 fingerprint kept in
//! object metadata, and the engine reconciles the two sets.

pub mod engine;
pub mod hash;
pub mod index;
pub mod paths;
pub mod report;
pub mod run;
pub mod throttle;

pub use engine::{
    classify, plan, FingerprintedFile, LocalSet, Reconciler, SyncAction, SyncOptions, SyncPhase,
    SyncPlan, SyncProgress, SyncResult,
};
pub use hash::{fingerprint, fingerprint_async, fingerprint_bytes, FINGERPRINT_METADATA_KEY};
pub use index::RemoteIndex;
pub use paths::{to_local_path, to_object_key, PathKey};
pub use report::{ReportSnapshot, SyncFailure, SyncOutcome, SyncReport};
pub use run::{run_sync, SyncRequest, SyncSummary};
pub use throttle::{BandwidthLimit, BandwidthLimiter};
