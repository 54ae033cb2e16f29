//! Baseline persistence
//!
//! A baseline is a pretty-printed JSON document:
//!
//! ```text
//! {
//!   "metadata": {
//!     "scan_time": "2026-10-19T08:15:00.123456789Z",
//!     "monitored_directory": "/srv/www",
//!     "hash_algorithm": "blake3",
//!     "format_version": 1
//!   },
//!   "files": { "index.html": "<hex digest>", ... }
//! }
//! ```
//!
//! Saves go through a temp file in the destination directory followed by a
//! rename, so a failed save leaves the previous baseline untouched.

use crate::error::StoreError;
use crate::models::{FilePath, Fingerprint, HashAlgorithm, Snapshot};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// Current on-disk format version
pub const FORMAT_VERSION: u32 = 1;

fn default_format_version() -> u32 {
    FORMAT_VERSION
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct BaselineMetadata {
    scan_time: DateTime<Utc>,
    monitored_directory: PathBuf,
    hash_algorithm: HashAlgorithm,
    #[serde(default = "default_format_version")]
    format_version: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct BaselineDocument {
    metadata: BaselineMetadata,
    files: BTreeMap<String, String>,
}

impl BaselineDocument {
    fn from_snapshot(snapshot: &Snapshot) -> Self {
        Self {
            metadata: BaselineMetadata {
                scan_time: snapshot.created_at(),
                monitored_directory: snapshot.root().to_path_buf(),
                hash_algorithm: snapshot.algorithm(),
                format_version: FORMAT_VERSION,
            },
            files: snapshot
                .files()
                .iter()
                .map(|(p, f)| (p.as_str().to_string(), f.as_str().to_string()))
                .collect(),
        }
    }

    fn into_snapshot(self, source: &Path) -> Result<Snapshot, StoreError> {
        let meta = self.metadata;
        if meta.format_version > FORMAT_VERSION {
            return Err(StoreError::corrupt(
                source,
                format!("unsupported format version {}", meta.format_version),
            ));
        }
        if !meta.monitored_directory.is_absolute() {
            return Err(StoreError::corrupt(
                source,
                format!(
                    "monitored directory is not absolute: {}",
                    meta.monitored_directory.display()
                ),
            ));
        }

        let algorithm = meta.hash_algorithm;
        let mut files = BTreeMap::new();
        for (path, digest) in self.files {
            let file_path = FilePath::parse(&path)
                .map_err(|e| StoreError::corrupt(source, format!("bad path {path:?}: {e}")))?;
            let fingerprint = Fingerprint::from_hex(&digest, algorithm).ok_or_else(|| {
                StoreError::corrupt(source, format!("bad {algorithm} fingerprint for {path:?}"))
            })?;
            files.insert(file_path, fingerprint);
        }

        Ok(Snapshot::new(
            meta.monitored_directory,
            algorithm,
            meta.scan_time,
            files,
        ))
    }
}

/// Owner of one baseline file
#[derive(Debug, Clone)]
pub struct BaselineStore {
    path: PathBuf,
}

impl BaselineStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Replace the stored baseline with `snapshot`
    pub fn save(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        let document = BaselineDocument::from_snapshot(snapshot);
        let data = serde_json::to_vec_pretty(&document)?;

        let write_err = |source: io::Error| StoreError::Write {
            path: self.path.clone(),
            source,
        };

        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir).map_err(write_err)?;

        let mut tmp = NamedTempFile::new_in(&dir).map_err(write_err)?;
        tmp.write_all(&data).map_err(write_err)?;
        tmp.write_all(b"\n").map_err(write_err)?;
        tmp.as_file().sync_all().map_err(write_err)?;
        tmp.persist(&self.path).map_err(|e| write_err(e.error))?;

        debug!(
            path = %self.path.display(),
            files = snapshot.len(),
            "baseline saved"
        );
        Ok(())
    }

    /// Read the stored baseline back into a snapshot
    pub fn load(&self) -> Result<Snapshot, StoreError> {
        let content = fs::read(&self.path).map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => StoreError::NotFound(self.path.clone()),
            _ => StoreError::Read {
                path: self.path.clone(),
                source,
            },
        })?;

        let document: BaselineDocument = serde_json::from_slice(&content)
            .map_err(|e| StoreError::corrupt(&self.path, e.to_string()))?;
        let snapshot = document.into_snapshot(&self.path)?;

        debug!(
            path = %self.path.display(),
            files = snapshot.len(),
            "baseline loaded"
        );
        Ok(snapshot)
    }
}
