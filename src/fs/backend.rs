use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;

use crate::error::Result;
use crate::fs::types::RemoteObject;
use crate::sync::throttle::BandwidthLimiter;

/// Backend type information for display and identification
#[derive(Debug, Clone, PartialEq)]
pub enum BackendType {
    Azure { container: String },
    S3 { bucket: String, region: String, provider: S3Provider },
    /// Stores that are not backed by a cloud service (tests, dry tooling)
    Other { name: String },
}

impl BackendType {
    /// Get a short display name for the backend
    pub fn short_name(&self) -> &str {
        match self {
            BackendType::Azure { .. } => "Azure",
            BackendType::S3 { .. } => "S3",
            BackendType::Other { name } => name,
        }
    }
}

/// S3-compatible storage providers
#[derive(Debug, Clone, PartialEq)]
pub enum S3Provider {
    Aws,
    Custom { endpoint: String },
}

impl S3Provider {
    /// Get the endpoint URL for this provider
    pub fn endpoint(&self) -> Option<String> {
        match self {
            S3Provider::Aws => None, // Use default AWS endpoint
            S3Provider::Custom { endpoint, .. } => Some(endpoint.clone()),
        }
    }
}

/// The remote side of a sync: one container (or bucket) of objects.
#[async_trait]
pub trait ObjectStoreGateway: Send + Sync {
    /// Make sure the container exists (creating it where the backend allows)
    async fn ensure_container(&self) -> Result<()>;

    /// Allow anonymous read access to individual objects
    async fn set_public_read_access(&self) -> Result<()>;

    /// Flat listing of every object, with content type and user metadata
    async fn list_objects(&self) -> Result<Vec<RemoteObject>>;

    /// Stream a local file into `key`, replacing any existing object.
    /// Returns the number of bytes uploaded.
    async fn upload(
        &self,
        key: &str,
        local_path: &Path,
        content_type: &str,
        metadata: &HashMap<String, String>,
        limiter: &BandwidthLimiter,
    ) -> Result<u64>;

    /// Remove an object unconditionally
    async fn delete(&self, key: &str) -> Result<()>;

    fn backend_type(&self) -> BackendType;

    /// Get display path for an object key
    fn display_path(&self, key: &str) -> String {
        format!("{}:{}", self.backend_type().short_name(), key)
    }
}
