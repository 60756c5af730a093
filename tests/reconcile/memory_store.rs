// In-memory ObjectStoreGateway used by the reconcile tests

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use blobsync::error::{Result, SyncError};
use blobsync::fs::{BackendType, ExtensionMimeMapper, ObjectStoreGateway, RemoteObject};
use blobsync::sync::{
    run_sync, BandwidthLimiter, SyncOptions, SyncRequest, SyncSummary,
};

#[derive(Debug, Clone)]
pub struct StoredObject {
    pub content: Vec<u8>,
    pub content_type: String,
    pub metadata: HashMap<String, String>,
}

#[derive(Default)]
pub struct MemoryStore {
    objects: Mutex<BTreeMap<String, StoredObject>>,
    failing_keys: Mutex<HashSet<String>>,
    slow_keys: Mutex<HashMap<String, Duration>>,
    pub uploads: AtomicUsize,
    pub upload_attempts: AtomicUsize,
    pub deletes: AtomicUsize,
    pub listings: AtomicUsize,
    pub public_read_calls: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Seed an object directly, bypassing the sync engine
    pub fn put(&self, key: &str, content: &[u8], fingerprint: Option<&str>) {
        let metadata = fingerprint
            .map(|fp| HashMap::from([("Hash".to_string(), fp.to_string())]))
            .unwrap_or_default();
        self.objects.lock().unwrap().insert(
            key.to_string(),
            StoredObject {
                content: content.to_vec(),
                content_type: "application/octet-stream".to_string(),
                metadata,
            },
        );
    }

    /// Every upload or delete of `key` fails with a remote error
    pub fn fail_key(&self, key: &str) {
        self.failing_keys.lock().unwrap().insert(key.to_string());
    }

    /// Every upload of `key` stalls for `delay` before doing anything
    pub fn slow_key(&self, key: &str, delay: Duration) {
        self.slow_keys.lock().unwrap().insert(key.to_string(), delay);
    }

    pub fn get(&self, key: &str) -> Option<StoredObject> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }

    pub fn mutation_count(&self) -> usize {
        self.uploads.load(Ordering::SeqCst) + self.deletes.load(Ordering::SeqCst)
    }

    fn check_failure(&self, operation: &str, key: &str) -> Result<()> {
        if self.failing_keys.lock().unwrap().contains(key) {
            return Err(SyncError::remote(operation, key, "injected failure"));
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStoreGateway for MemoryStore {
    async fn ensure_container(&self) -> Result<()> {
        Ok(())
    }

    async fn set_public_read_access(&self) -> Result<()> {
        self.public_read_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn list_objects(&self) -> Result<Vec<RemoteObject>> {
        self.listings.fetch_add(1, Ordering::SeqCst);
        let objects = self.objects.lock().unwrap();
        Ok(objects
            .iter()
            .map(|(key, stored)| RemoteObject {
                key: key.clone(),
                content_type: Some(stored.content_type.clone()),
                metadata: stored.metadata.clone(),
                size: stored.content.len() as u64,
            })
            .collect())
    }

    async fn upload(
        &self,
        key: &str,
        local_path: &Path,
        content_type: &str,
        metadata: &HashMap<String, String>,
        limiter: &BandwidthLimiter,
    ) -> Result<u64> {
        self.upload_attempts.fetch_add(1, Ordering::SeqCst);
        let delay = self.slow_keys.lock().unwrap().get(key).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.check_failure("upload", key)?;

        let content = tokio::fs::read(local_path)
            .await
            .map_err(|e| SyncError::from_io_error(e, "read", local_path))?;
        limiter.acquire(content.len()).await;

        let size = content.len() as u64;
        self.objects.lock().unwrap().insert(
            key.to_string(),
            StoredObject {
                content,
                content_type: content_type.to_string(),
                metadata: metadata.clone(),
            },
        );
        self.uploads.fetch_add(1, Ordering::SeqCst);
        Ok(size)
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.check_failure("delete", key)?;
        self.objects.lock().unwrap().remove(key);
        self.deletes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn backend_type(&self) -> BackendType {
        BackendType::Other {
            name: "memory".to_string(),
        }
    }
}

/// Options tuned for tests: small pool, no real waiting between retries
pub fn test_options() -> SyncOptions {
    SyncOptions {
        concurrency: 4,
        op_timeout: Duration::from_secs(5),
        retry_backoff: Duration::from_millis(1),
        ..SyncOptions::default()
    }
}

pub async fn sync_with(
    store: &Arc<MemoryStore>,
    root: &Path,
    options: SyncOptions,
) -> Result<SyncSummary> {
    let gateway: Arc<dyn ObjectStoreGateway> = store.clone();
    let request = SyncRequest {
        local_path: root.display().to_string(),
        options,
        public_read: true,
    };
    run_sync(gateway, Arc::new(ExtensionMimeMapper), request, None).await
}

pub async fn sync(store: &Arc<MemoryStore>, root: &Path) -> SyncSummary {
    sync_with(store, root, test_options()).await.unwrap()
}

/// Write `content` to `root/relative`, creating parent directories
pub fn write_file(root: &Path, relative: &str, content: &str) -> PathBuf {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
    path
}
