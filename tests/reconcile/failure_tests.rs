// Argument validation and per-file failure handling

use std::sync::atomic::Ordering;
use std::time::Duration;

use blobsync::error::SyncErrorKind;

use crate::memory_store::{sync, sync_with, test_options, write_file, MemoryStore};

#[tokio::test]
async fn test_blank_local_path_is_rejected_before_remote_calls() {
    let store = MemoryStore::new();

    for blank in ["", "   "] {
        let err = sync_with(&store, std::path::Path::new(blank), test_options())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), SyncErrorKind::InvalidArgument);
        assert_eq!(err.exit_code(), 2);
    }
    assert_eq!(store.listings.load(Ordering::SeqCst), 0);
    assert_eq!(store.public_read_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_missing_local_directory_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let store = MemoryStore::new();

    let err = sync_with(&store, &dir.path().join("missing"), test_options())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), SyncErrorKind::InvalidArgument);
    assert_eq!(store.listings.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_failed_upload_is_retried_then_reported() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "bad.txt", "bad");
    write_file(dir.path(), "good.txt", "good");
    let store = MemoryStore::new();
    store.fail_key("bad.txt");

    let mut options = test_options();
    options.max_retries = 2;
    let summary = sync_with(&store, dir.path(), options).await.unwrap();

    assert_eq!(summary.report.new, 1);
    assert_eq!(summary.report.failures.len(), 1);
    let failure = &summary.report.failures[0];
    assert_eq!(failure.kind, SyncErrorKind::RemoteOperation);
    assert!(failure.target.ends_with("bad.txt"));
    // one attempt for good.txt, three for bad.txt
    assert_eq!(store.upload_attempts.load(Ordering::SeqCst), 4);
    assert_eq!(summary.exit_code(), 4);
    assert_eq!(store.keys(), vec!["good.txt"]);
}

#[tokio::test]
async fn test_failed_delete_does_not_stop_other_deletes() {
    let dir = tempfile::tempdir().unwrap();
    let store = MemoryStore::new();
    store.put("locked.txt", b"locked", None);
    store.put("loose.txt", b"loose", None);
    store.fail_key("locked.txt");

    let mut options = test_options();
    options.max_retries = 0;
    let summary = sync_with(&store, dir.path(), options).await.unwrap();

    assert_eq!(summary.report.deleted, 1);
    assert_eq!(summary.report.failures.len(), 1);
    assert_eq!(summary.report.failures[0].target, "locked.txt");
    assert_eq!(store.keys(), vec!["locked.txt"]);
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn test_case_collision_syncs_first_path_only() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "A.txt", "upper");
    write_file(dir.path(), "a.txt", "lower");
    let store = MemoryStore::new();

    let summary = sync(&store, dir.path()).await;

    assert_eq!(summary.report.new, 1);
    assert_eq!(store.keys(), vec!["A.txt"]);
    assert_eq!(summary.report.failures.len(), 1);
    assert_eq!(
        summary.report.failures[0].kind,
        SyncErrorKind::AmbiguousPathCollision
    );
    assert_eq!(summary.exit_code(), 5);

    // the shadowed path still counts as present, so nothing is deleted
    let again = sync(&store, dir.path()).await;
    assert_eq!(again.report.deleted, 0);
    assert_eq!(again.report.unchanged, 1);
}

#[tokio::test]
async fn test_slow_upload_times_out_and_is_retried() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "slow.bin", "slow");
    write_file(dir.path(), "fast.txt", "fast");
    let store = MemoryStore::new();
    store.slow_key("slow.bin", Duration::from_secs(30));

    let mut options = test_options();
    options.op_timeout = Duration::from_millis(50);
    options.max_retries = 1;
    let summary = sync_with(&store, dir.path(), options).await.unwrap();

    assert_eq!(summary.report.new, 1);
    assert_eq!(summary.report.failures.len(), 1);
    let failure = &summary.report.failures[0];
    assert_eq!(failure.kind, SyncErrorKind::Timeout);
    assert!(failure.target.ends_with("slow.bin"));
    // one attempt for fast.txt, two for slow.bin
    assert_eq!(store.upload_attempts.load(Ordering::SeqCst), 3);
    assert_eq!(summary.exit_code(), 7);
    assert_eq!(store.keys(), vec!["fast.txt"]);
}

#[cfg(unix)]
#[tokio::test]
async fn test_unreadable_file_is_reported_and_its_object_kept() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    let locked = write_file(dir.path(), "locked.txt", "changed locally");
    write_file(dir.path(), "open.txt", "open");
    std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o000)).unwrap();
    if std::fs::File::open(&locked).is_ok() {
        // permission bits are not enforced for this user (root)
        return;
    }
    let store = MemoryStore::new();
    store.put("locked.txt", b"remote copy", None);

    let summary = sync(&store, dir.path()).await;

    assert_eq!(summary.report.new, 1);
    assert_eq!(summary.report.deleted, 0);
    assert_eq!(summary.report.failures.len(), 1);
    assert_eq!(summary.report.failures[0].kind, SyncErrorKind::FileAccess);
    assert_eq!(summary.exit_code(), 3);
    assert_eq!(store.get("locked.txt").unwrap().content, b"remote copy");
    assert_eq!(store.keys(), vec!["locked.txt", "open.txt"]);
}
