/// Error types, one enum per failure domain.
///
/// None of these are meant to escape to an end user as a hard failure.
/// Each is converted at its boundary into a skip, a fallback or a counted
/// failure, and logged.
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while scanning.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("a scan is already running")]
    AlreadyScanning,

    #[error("scan root does not exist: {}", .0.display())]
    RootMissing(PathBuf),

    #[error("scan root {} could not be read: {source}", .path.display())]
    RootUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("scan root is a protected system location: {}", .0.display())]
    RootExcluded(PathBuf),

    #[error("failed to spawn {0} thread: {1}")]
    Spawn(&'static str, #[source] std::io::Error),
}

/// Errors raised by the snapshot store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("snapshot failed integrity check: {0}")]
    Integrity(String),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Errors from an external classifier or query backend.
#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("no external backend is available")]
    Unavailable,

    #[error("external backend did not answer within {0:?}")]
    Timeout(Duration),

    #[error("external backend failed: {0}")]
    Backend(String),

    #[error("external classification rejected: {0}")]
    Rejected(String),
}

/// Errors raised while moving an item to the trash.
#[derive(Debug, Error)]
pub enum CleanupError {
    #[error("{} no longer exists", .0.display())]
    NotFound(PathBuf),

    #[error("could not move {} to the trash: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not move {} to the system trash: {source}", .path.display())]
    Trash {
        path: PathBuf,
        #[source]
        source: trash::Error,
    },
}

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}
