use opendal::{services::S3, Operator};

use crate::error::{Result, SyncError};
use crate::fs::backend::{BackendType, S3Provider};
use crate::fs::store::OpendalStore;

/// S3 and S3-compatible storage backend using OpenDAL
pub struct S3Fs;

impl S3Fs {
    /// Open `bucket` using the standard AWS credential chain:
    /// 1. Environment variables (AWS_ACCESS_KEY_ID, AWS_SECRET_ACCESS_KEY)
    /// 2. Shared credentials file (~/.aws/credentials)
    /// 3. EC2 Instance Profile / ECS Task Role / EKS Pod Identity
    pub fn connect(bucket: &str, region: &str, provider: S3Provider) -> Result<OpendalStore> {
        if bucket.trim().is_empty() {
            return Err(SyncError::invalid_argument("bucket name must not be blank"));
        }

        let mut builder = S3::default().bucket(bucket).region(region);

        // Set custom endpoint for S3-compatible providers
        if let Some(endpoint) = provider.endpoint() {
            builder = builder.endpoint(&endpoint);
        }

        let operator = Operator::new(builder)
            .map_err(|e| SyncError::remote("connect", bucket, e))?
            .finish();

        Ok(OpendalStore::new(
            operator,
            BackendType::S3 {
                bucket: bucket.to_string(),
                region: region.to_string(),
                provider,
            },
        ))
    }

    /// Open a bucket on an arbitrary S3-compatible endpoint
    pub fn connect_custom(bucket: &str, region: &str, endpoint: &str) -> Result<OpendalStore> {
        Self::connect(
            bucket,
            region,
            S3Provider::Custom {
                endpoint: endpoint.to_string(),
            },
        )
    }
}
