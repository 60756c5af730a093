// Key mapping and local tree edge cases seen through a full run

use std::path::Path;

use blobsync::sync::{to_local_path, to_object_key, PathKey};

use crate::memory_store::{sync, write_file, MemoryStore};

#[test]
fn test_key_round_trip_for_nested_files() {
    let base = Path::new("/srv/site");
    let local = base.join("assets").join("img").join("logo.png");

    let key = to_object_key(base, &local).unwrap();
    assert_eq!(key, "assets/img/logo.png");
    assert_eq!(to_local_path(base, &key), local);
}

#[test]
fn test_leading_slash_in_key_is_ignored() {
    let base = Path::new("/srv/site");
    assert_eq!(
        to_local_path(base, "/docs/a.txt"),
        base.join("docs").join("a.txt")
    );
}

#[test]
fn test_path_keys_fold_case() {
    let base = Path::new("/srv/site");
    assert_eq!(
        PathKey::from_object_key(base, "Docs/ÄBC.TXT"),
        PathKey::new(base.join("docs").join("äbc.txt"))
    );
}

#[tokio::test]
async fn test_unicode_and_space_names_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "my docs/résumé.txt", "cv");
    let store = MemoryStore::new();

    let first = sync(&store, dir.path()).await;
    assert_eq!(first.report.new, 1);
    assert_eq!(store.keys(), vec!["my docs/résumé.txt"]);

    let second = sync(&store, dir.path()).await;
    assert_eq!(second.report.unchanged, 1);
    assert_eq!(second.report.deleted, 0);
}

#[tokio::test]
async fn test_empty_directories_are_not_objects() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("empty/inner")).unwrap();
    write_file(dir.path(), "file.txt", "x");
    let store = MemoryStore::new();

    let summary = sync(&store, dir.path()).await;

    assert_eq!(summary.local_files, 1);
    assert_eq!(store.keys(), vec!["file.txt"]);
}

#[cfg(unix)]
#[tokio::test]
async fn test_symlinks_are_not_followed() {
    let dir = tempfile::tempdir().unwrap();
    let outside = tempfile::tempdir().unwrap();
    write_file(outside.path(), "secret.txt", "secret");
    write_file(dir.path(), "real.txt", "real");
    std::os::unix::fs::symlink(outside.path(), dir.path().join("link")).unwrap();
    let store = MemoryStore::new();

    sync(&store, dir.path()).await;

    assert_eq!(store.keys(), vec!["real.txt"]);
}
