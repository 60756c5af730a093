//! Configuration file support.
//!
//! Settings are read from `--config <file>` or, when present, from
//! `<config dir>/blobsync/config.toml`. Every key is optional; command line
//! flags override whatever the file sets.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::error::{Result, SyncError};
use crate::fs::azblob::DEVELOPMENT_CONNECTION_STRING;
use crate::fs::{AzureBlobFs, ObjectStoreGateway, S3Fs, S3Provider};
use crate::sync::engine::{default_concurrency, SyncOptions};
use crate::sync::throttle::BandwidthLimit;

const DEFAULT_S3_REGION: &str = "us-east-1";

/// Object storage provider
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Azure Blob Storage (connection string)
    #[default]
    Azure,
    /// Amazon S3 or an S3-compatible endpoint (AWS credential chain)
    S3,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct S3Settings {
    pub region: Option<String>,
    pub endpoint: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub provider: Provider,
    pub connection_string: Option<String>,
    pub s3: S3Settings,
    pub concurrency: Option<usize>,
    pub timeout_secs: Option<u64>,
    pub max_retries: Option<u32>,
    /// Upload limit in bytes per second, 0 = unlimited
    pub bandwidth_limit: Option<u64>,
    pub public_read: Option<bool>,
}

impl Config {
    /// Default location of the configuration file
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("blobsync").join("config.toml"))
    }

    pub fn parse(content: &str, origin: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|e| SyncError::Config {
            path: origin.to_path_buf(),
            message: e.to_string(),
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| SyncError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::parse(&content, path)
    }

    /// Load an explicitly requested file, or the default file if it exists,
    /// or fall back to built-in defaults.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match Self::default_path() {
            Some(path) if path.is_file() => {
                tracing::debug!("Loading configuration from {}", path.display());
                Self::load(&path)
            }
            _ => Ok(Self::default()),
        }
    }

    pub fn connection_string(&self) -> &str {
        self.connection_string
            .as_deref()
            .unwrap_or(DEVELOPMENT_CONNECTION_STRING)
    }

    pub fn public_read(&self) -> bool {
        self.public_read.unwrap_or(true)
    }

    /// Engine options with file values applied over the defaults
    pub fn sync_options(&self) -> SyncOptions {
        let defaults = SyncOptions::default();
        SyncOptions {
            concurrency: self
                .concurrency
                .map(|n| n.clamp(1, 64))
                .unwrap_or_else(default_concurrency),
            op_timeout: self
                .timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.op_timeout),
            max_retries: self.max_retries.unwrap_or(defaults.max_retries),
            bandwidth_limit: self
                .bandwidth_limit
                .map(BandwidthLimit::new)
                .unwrap_or(defaults.bandwidth_limit),
            ..defaults
        }
    }

    /// Open the gateway for `container` on the configured provider
    pub fn open_gateway(&self, container: &str) -> Result<Arc<dyn ObjectStoreGateway>> {
        match self.provider {
            Provider::Azure => Ok(Arc::new(AzureBlobFs::connect(
                self.connection_string(),
                container,
            )?)),
            Provider::S3 => {
                let region = self.s3.region.as_deref().unwrap_or(DEFAULT_S3_REGION);
                let store = match &self.s3.endpoint {
                    Some(endpoint) => S3Fs::connect_custom(container, region, endpoint)?,
                    None => S3Fs::connect(container, region, S3Provider::Aws)?,
                };
                Ok(Arc::new(store))
            }
        }
    }
}
