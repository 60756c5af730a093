use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use opendal::{Entry, Operator};
use std::collections::HashMap;
use std::path::Path;
use tokio::io::AsyncReadExt;

use crate::error::{Result, SyncError};
use crate::fs::backend::{BackendType, ObjectStoreGateway};
use crate::fs::types::RemoteObject;
use crate::sync::throttle::BandwidthLimiter;

/// Size of each block read from disk and handed to the writer
const UPLOAD_BLOCK_SIZE: usize = 256 * 1024;

/// How many `stat` calls run at once while collecting listing metadata
const STAT_CONCURRENCY: usize = 16;

/// Object store gateway over an OpenDAL operator.
///
/// The provider specific constructors live in `azblob.rs` and `s3.rs`; this type
/// only speaks the operator API, so both providers share the same list, upload
/// and delete behaviour.
pub struct OpendalStore {
    operator: Operator,
    backend: BackendType,
}

impl OpendalStore {
    pub fn new(operator: Operator, backend: BackendType) -> Self {
        Self { operator, backend }
    }

    fn container_label(&self) -> String {
        match &self.backend {
            BackendType::Azure { container } => container.clone(),
            BackendType::S3 { bucket, .. } => bucket.clone(),
            BackendType::Other { name } => name.clone(),
        }
    }

    async fn describe_entry(&self, entry: Entry) -> Result<RemoteObject> {
        let key = entry.path().trim_start_matches('/').to_string();

        // Listings do not carry user metadata on every service, so stat each object
        let meta = self
            .operator
            .stat(entry.path())
            .await
            .map_err(|e| SyncError::remote("stat", &key, e))?;

        Ok(RemoteObject {
            content_type: meta.content_type().map(str::to_string),
            metadata: meta.user_metadata().cloned().unwrap_or_default(),
            size: meta.content_length(),
            key,
        })
    }
}

#[async_trait]
impl ObjectStoreGateway for OpendalStore {
    async fn ensure_container(&self) -> Result<()> {
        // OpenDAL has no container management; verify the container is reachable
        self.operator
            .check()
            .await
            .map_err(|e| SyncError::remote("open container", &self.container_label(), e))
    }

    async fn set_public_read_access(&self) -> Result<()> {
        tracing::warn!(
            container = %self.container_label(),
            backend = self.backend.short_name(),
            "public read access cannot be set through this backend; configure it on the container"
        );
        Ok(())
    }

    async fn list_objects(&self) -> Result<Vec<RemoteObject>> {
        let entries = self
            .operator
            .list_with("/")
            .recursive(true)
            .await
            .map_err(|e| SyncError::remote("list", &self.container_label(), e))?;

        let files: Vec<Entry> = entries
            .into_iter()
            .filter(|entry| entry.metadata().mode().is_file())
            .collect();

        futures::stream::iter(files)
            .map(|entry| self.describe_entry(entry))
            .buffered(STAT_CONCURRENCY)
            .try_collect()
            .await
    }

    async fn upload(
        &self,
        key: &str,
        local_path: &Path,
        content_type: &str,
        metadata: &HashMap<String, String>,
        limiter: &BandwidthLimiter,
    ) -> Result<u64> {
        let mut file = tokio::fs::File::open(local_path)
            .await
            .map_err(|e| SyncError::from_io_error(e, "opening", local_path))?;

        let mut writer = self
            .operator
            .writer_with(key)
            .content_type(content_type)
            .user_metadata(metadata.clone())
            .await
            .map_err(|e| SyncError::remote("upload", key, e))?;

        let mut buffer = vec![0u8; UPLOAD_BLOCK_SIZE];
        let mut uploaded = 0u64;

        loop {
            let bytes_read = match file.read(&mut buffer).await {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) => {
                    let _ = writer.abort().await;
                    return Err(SyncError::from_io_error(e, "reading", local_path));
                }
            };

            limiter.acquire(bytes_read).await;

            if let Err(e) = writer.write(buffer[..bytes_read].to_vec()).await {
                let _ = writer.abort().await;
                return Err(SyncError::remote("upload", key, e));
            }
            uploaded += bytes_read as u64;
        }

        writer
            .close()
            .await
            .map_err(|e| SyncError::remote("upload", key, e))?;

        Ok(uploaded)
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.operator
            .delete(key)
            .await
            .map_err(|e| SyncError::remote("delete", key, e))
    }

    fn backend_type(&self) -> BackendType {
        self.backend.clone()
    }

    fn display_path(&self, key: &str) -> String {
        match &self.backend {
            BackendType::Azure { container } => format!("azure://{}/{}", container, key),
            BackendType::S3 { bucket, .. } => format!("s3://{}/{}", bucket, key),
            BackendType::Other { name } => format!("{}://{}", name, key),
        }
    }
}
