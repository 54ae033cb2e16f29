//! Error types for the integrity monitor
//!
//! Per-file failures (`HashError`, `PathError`) are absorbed by the scanner and
//! counted. Root and store failures propagate to the caller as `FimError`.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failure to fingerprint a single file
#[derive(Debug, Error)]
pub enum HashError {
    #[error("file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl HashError {
    /// Classify an I/O error raised while opening or reading `path`
    pub fn from_io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            io::ErrorKind::NotFound => Self::NotFound { path },
            io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            _ => Self::Io { path, source },
        }
    }
}

/// A path that cannot be expressed as a root-relative `FilePath`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("path is empty")]
    Empty,

    #[error("path is not relative to the monitored root: {0}")]
    NotRelative(String),

    #[error("path contains a `.` or `..` segment: {0}")]
    DotSegment(String),

    #[error("path contains an empty segment: {0}")]
    EmptySegment(String),

    #[error("path is not valid UTF-8: {0}")]
    NotUtf8(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown hash algorithm: {0}")]
pub struct UnknownAlgorithm(pub String);

/// Failure of a whole scan (never a single file)
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("directory not found: {0}")]
    DirectoryNotFound(PathBuf),

    #[error("not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("cannot access {path}: {source}")]
    Root {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to start hashing workers: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}

/// Baseline persistence failures
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no baseline at {0}; run a scan first")]
    NotFound(PathBuf),

    #[error("baseline {path} is corrupt: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    #[error("failed to read baseline {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write baseline {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to encode baseline: {0}")]
    Encode(#[from] serde_json::Error),
}

impl StoreError {
    pub(crate) fn corrupt(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Corrupt {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Top-level error returned by `Monitor` operations
#[derive(Debug, Error)]
pub enum FimError {
    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("baseline was recorded for {recorded}, not {requested}")]
    RootMismatch { recorded: PathBuf, requested: PathBuf },

    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, FimError>;
