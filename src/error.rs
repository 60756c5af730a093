// Centralized error handling module
// Every failure a sync run can hit, with exit codes and recovery hints

use serde::Serialize;
use std::fmt;
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for sync operations
pub type Result<T> = std::result::Result<T, SyncError>;

/// Error category, used for exit codes and for the per-file failure list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncErrorKind {
    InvalidArgument,
    FileAccess,
    RemoteOperation,
    AmbiguousPathCollision,
    Config,
    Timeout,
}

impl SyncErrorKind {
    /// Machine-readable code string
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::FileAccess => "FILE_ACCESS",
            Self::RemoteOperation => "REMOTE_OPERATION",
            Self::AmbiguousPathCollision => "AMBIGUOUS_PATH_COLLISION",
            Self::Config => "CONFIG",
            Self::Timeout => "TIMEOUT",
        }
    }

    /// Process exit code for this category (1 is reserved for internal errors)
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::InvalidArgument => 2,
            Self::FileAccess => 3,
            Self::RemoteOperation => 4,
            Self::AmbiguousPathCollision => 5,
            Self::Config => 6,
            Self::Timeout => 7,
        }
    }
}

impl fmt::Display for SyncErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Main error type for sync runs
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("I/O error while {operation} {}: {source}", .path.display())]
    FileAccess {
        path: PathBuf,
        operation: String,
        #[source]
        source: io::Error,
    },

    #[error("Remote {operation} failed for '{target}': {message}")]
    RemoteOperation {
        operation: String,
        target: String,
        message: String,
    },

    #[error("Local paths collide when compared case-insensitively: {} and {}", .first.display(), .second.display())]
    AmbiguousPathCollision { first: PathBuf, second: PathBuf },

    #[error("Configuration error in {}: {message}", .path.display())]
    Config { path: PathBuf, message: String },

    #[error("Remote {operation} of '{target}' timed out after {}s", .after.as_secs())]
    Timeout {
        operation: String,
        target: String,
        after: Duration,
    },
}

impl SyncError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        SyncError::InvalidArgument {
            message: message.into(),
        }
    }

    /// Wrap a backend failure with the operation and object it concerned
    pub fn remote(operation: &str, target: &str, err: impl fmt::Display) -> Self {
        SyncError::RemoteOperation {
            operation: operation.to_string(),
            target: target.to_string(),
            message: err.to_string(),
        }
    }

    /// Create a FileAccess error with context about the operation and path
    pub fn from_io_error(err: io::Error, operation: &str, path: impl Into<PathBuf>) -> Self {
        SyncError::FileAccess {
            path: path.into(),
            operation: operation.to_string(),
            source: err,
        }
    }

    pub fn kind(&self) -> SyncErrorKind {
        match self {
            SyncError::InvalidArgument { .. } => SyncErrorKind::InvalidArgument,
            SyncError::FileAccess { .. } => SyncErrorKind::FileAccess,
            SyncError::RemoteOperation { .. } => SyncErrorKind::RemoteOperation,
            SyncError::AmbiguousPathCollision { .. } => SyncErrorKind::AmbiguousPathCollision,
            SyncError::Config { .. } => SyncErrorKind::Config,
            SyncError::Timeout { .. } => SyncErrorKind::Timeout,
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.kind().exit_code()
    }

    /// Whether retrying the same remote operation could succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SyncError::RemoteOperation { .. } | SyncError::Timeout { .. }
        )
    }

    /// Recovery hint for the user, if one applies
    pub fn hint(&self) -> Option<String> {
        match self {
            SyncError::InvalidArgument { .. } => {
                Some("Run with --help to see usage information".to_string())
            }
            SyncError::FileAccess { source, .. } => match source.kind() {
                io::ErrorKind::NotFound => {
                    Some("Check that the path exists and was not removed during the run".to_string())
                }
                io::ErrorKind::PermissionDenied => {
                    Some("Check file permissions or run with appropriate privileges".to_string())
                }
                _ => None,
            },
            SyncError::RemoteOperation { .. } => Some(
                "Check the connection string, container name and network access".to_string(),
            ),
            SyncError::AmbiguousPathCollision { .. } => Some(
                "Rename one of the files; object keys are matched case-insensitively".to_string(),
            ),
            SyncError::Config { .. } => {
                Some("Fix or remove the configuration file and retry".to_string())
            }
            SyncError::Timeout { .. } => {
                Some("Increase --timeout or lower --concurrency".to_string())
            }
        }
    }
}
