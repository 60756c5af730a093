//! Command line surface.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use crate::config::{Config, Provider};
use crate::sync::engine::SyncOptions;
use crate::sync::throttle::BandwidthLimit;

#[derive(Debug, Parser)]
#[command(name = "blobsync", version, about = "One-way sync of a local folder into an object storage container")]
pub struct Cli {
    /// Configuration file (default: <config dir>/blobsync/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "debug")]
    pub quiet: bool,

    /// Print the run summary as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Performs a one way sync of files from a local folder to a storage container
    Sync(SyncArgs),
}

#[derive(Debug, Clone, Args)]
pub struct SyncArgs {
    /// Path of local folder to sync (relative paths resolve against the working directory)
    #[arg(long)]
    pub local_path: String,

    /// Name of the storage container (bucket for S3)
    #[arg(long)]
    pub container: String,

    /// Connection string for the storage account (default: local emulator)
    #[arg(long)]
    pub connection_string: Option<String>,

    /// Storage provider
    #[arg(long, value_enum)]
    pub provider: Option<Provider>,

    /// Re-upload every file that already exists remotely
    #[arg(long)]
    pub force_reupload: bool,

    /// Show what would change without touching the container
    #[arg(long)]
    pub dry_run: bool,

    /// Concurrent hash/upload/delete operations
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..=64))]
    pub concurrency: Option<u64>,

    /// Per-operation timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Retries for a failed or timed out remote operation
    #[arg(long)]
    pub retries: Option<u32>,

    /// Upload bandwidth limit in bytes per second
    #[arg(long)]
    pub bwlimit: Option<u64>,

    /// Do not change container access
    #[arg(long)]
    pub no_public_read: bool,

    /// Disable the progress bar
    #[arg(long)]
    pub no_progress: bool,
}

/// Process-level switches threaded from the command line to the run.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    pub debug: bool,
    pub quiet: bool,
    pub json: bool,
    pub progress: bool,
}

impl Cli {
    pub fn run_options(&self) -> RunOptions {
        let progress = match &self.command {
            Commands::Sync(args) => !args.no_progress,
        };
        RunOptions {
            debug: self.debug,
            quiet: self.quiet,
            json: self.json,
            progress: progress && !self.quiet && !self.json,
        }
    }
}

impl SyncArgs {
    /// Apply command line values over the configuration file
    pub fn merge_into(&self, mut config: Config) -> Config {
        if let Some(provider) = self.provider {
            config.provider = provider;
        }
        if let Some(connection_string) = &self.connection_string {
            config.connection_string = Some(connection_string.clone());
        }
        if self.no_public_read {
            config.public_read = Some(false);
        }
        config
    }

    pub fn sync_options(&self, config: &Config) -> SyncOptions {
        let mut options = config.sync_options();
        options.force_reupload = self.force_reupload;
        options.dry_run = self.dry_run;
        if let Some(concurrency) = self.concurrency {
            options.concurrency = concurrency as usize;
        }
        if let Some(timeout) = self.timeout {
            options.op_timeout = Duration::from_secs(timeout);
        }
        if let Some(retries) = self.retries {
            options.max_retries = retries;
        }
        if let Some(limit) = self.bwlimit {
            options.bandwidth_limit = BandwidthLimit::new(limit);
        }
        options
    }
}
