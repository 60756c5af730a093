//! Content fingerprints for change detection.
//!
//! A fingerprint is the base64-encoded MD5 digest of the file content. This is
//! the value stored in the `Hash` metadata of every uploaded object, so it must
//! stay byte-compatible with objects synced by earlier runs.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use md5::{Digest, Md5};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::{Result, SyncError};

/// Metadata name the fingerprint is stored under.
pub const FINGERPRINT_METADATA_KEY: &str = "Hash";

const BUFFER_SIZE: usize = 64 * 1024;

/// Fingerprint in-memory data.
pub fn fingerprint_bytes(data: &[u8]) -> String {
    BASE64.encode(Md5::digest(data))
}

/// Fingerprint a file by streaming it through MD5 in 64KB blocks.
pub fn fingerprint(path: &Path) -> Result<String> {
    let mut file =
        File::open(path).map_err(|e| SyncError::from_io_error(e, "opening", path))?;
    let mut hasher = Md5::new();
    let mut buffer = vec![0u8; BUFFER_SIZE];

    loop {
        let bytes_read = match file.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(SyncError::from_io_error(e, "reading", path)),
        };
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(BASE64.encode(hasher.finalize()))
}

/// Fingerprint a file on the blocking thread pool.
pub async fn fingerprint_async(path: &Path) -> Result<String> {
    let owned = path.to_path_buf();
    match tokio::task::spawn_blocking(move || fingerprint(&owned)).await {
        Ok(result) => result,
        Err(join_err) => Err(SyncError::from_io_error(
            std::io::Error::new(std::io::ErrorKind::Other, join_err.to_string()),
            "hashing",
            path,
        )),
    }
}
