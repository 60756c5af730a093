use jwalk::WalkDir;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::SyncError;
use crate::fs::types::LocalFile;
use crate::sync::paths::{to_object_key, PathKey};

/// Result of enumerating the local tree.
#[derive(Debug, Default)]
pub struct LocalScan {
    /// Files to sync, sorted by path, at most one per PathKey
    pub files: Vec<LocalFile>,
    /// Later files whose PathKey matched an earlier one
    pub collisions: Vec<(PathBuf, SyncError)>,
    /// Entries that could not be read
    pub unreadable: Vec<(PathBuf, SyncError)>,
}

impl LocalScan {
    /// True when every entry under the root was read. When false the local
    /// set may be incomplete and must not drive deletions.
    pub fn is_complete(&self) -> bool {
        self.unreadable.is_empty()
    }
}

fn walk_error(err: jwalk::Error, fallback: &Path) -> (PathBuf, SyncError) {
    let path = err
        .path()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| fallback.to_path_buf());
    let io_err = err.into_io_error().unwrap_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::Other, "directory loop or unreadable entry")
    });
    let sync_err = SyncError::from_io_error(io_err, "scanning", path.clone());
    (path, sync_err)
}

pub struct LocalFs;

impl LocalFs {
    /// Recursively enumerate regular files under `root`. Symlinks are not followed.
    pub fn scan(root: &Path) -> LocalScan {
        let mut scan = LocalScan::default();
        let mut found = Vec::new();

        for entry_result in WalkDir::new(root)
            .skip_hidden(false)
            .follow_links(false)
            .sort(true)
        {
            match entry_result {
                Ok(entry) => {
                    if !entry.file_type().is_file() {
                        continue;
                    }
                    let path = entry.path();
                    match entry.metadata() {
                        Ok(metadata) => found.push((path, metadata.len())),
                        Err(e) => scan.unreadable.push(walk_error(e, &path)),
                    }
                }
                Err(e) => scan.unreadable.push(walk_error(e, root)),
            }
        }

        found.sort_by(|a, b| a.0.cmp(&b.0));

        let mut seen: HashMap<PathKey, PathBuf> = HashMap::new();
        for (path, size) in found {
            let object_key = match to_object_key(root, &path) {
                Ok(key) => key,
                Err(err) => {
                    scan.unreadable.push((path, err));
                    continue;
                }
            };
            let key = PathKey::new(&path);

            if let Some(first) = seen.get(&key) {
                let err = SyncError::AmbiguousPathCollision {
                    first: first.clone(),
                    second: path.clone(),
                };
                scan.collisions.push((path, err));
                continue;
            }
            seen.insert(key.clone(), path.clone());

            scan.files.push(LocalFile {
                path,
                object_key,
                key,
                size,
            });
        }

        scan
    }

    /// Scan on the blocking thread pool.
    pub async fn scan_async(root: &Path) -> LocalScan {
        let owned = root.to_path_buf();
        match tokio::task::spawn_blocking(move || Self::scan(&owned)).await {
            Ok(scan) => scan,
            Err(join_err) => LocalScan {
                unreadable: vec![(
                    root.to_path_buf(),
                    SyncError::from_io_error(
                        std::io::Error::new(std::io::ErrorKind::Other, join_err.to_string()),
                        "scanning",
                        root,
                    ),
                )],
                ..LocalScan::default()
            },
        }
    }
}
