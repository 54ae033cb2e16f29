//! Data models shared by the scanner, store and diff engine

use crate::error::{PathError, UnknownAlgorithm};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;

// ============================================================================
// Hash algorithm
// ============================================================================

/// Digest used to fingerprint file contents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    #[default]
    Blake3,
    Sha256,
}

impl HashAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Blake3 => "blake3",
            Self::Sha256 => "sha256",
        }
    }

    /// Length of a fingerprint in hex characters
    pub fn hex_len(&self) -> usize {
        match self {
            // both digests are 32 bytes
            Self::Blake3 | Self::Sha256 => 64,
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HashAlgorithm {
    type Err = UnknownAlgorithm;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "blake3" => Ok(Self::Blake3),
            "sha256" | "sha-256" => Ok(Self::Sha256),
            _ => Err(UnknownAlgorithm(s.to_string())),
        }
    }
}

// ============================================================================
// FilePath
// ============================================================================

/// Root-relative path with `/` separators and no `.`/`..` segments
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct FilePath(String);

impl FilePath {
    /// Normalize a path already stripped of the monitored root
    pub fn from_relative(path: &Path) -> Result<Self, PathError> {
        let mut segments = Vec::new();
        for component in path.components() {
            match component {
                Component::Normal(name) => {
                    let name = name
                        .to_str()
                        .ok_or_else(|| PathError::NotUtf8(path.to_string_lossy().into_owned()))?;
                    segments.push(name);
                }
                Component::CurDir => {}
                Component::ParentDir => {
                    return Err(PathError::DotSegment(path.display().to_string()))
                }
                Component::RootDir | Component::Prefix(_) => {
                    return Err(PathError::NotRelative(path.display().to_string()))
                }
            }
        }
        if segments.is_empty() {
            return Err(PathError::Empty);
        }
        Ok(Self(segments.join("/")))
    }

    /// Validate a stored path string without touching the filesystem
    pub fn parse(s: &str) -> Result<Self, PathError> {
        if s.is_empty() {
            return Err(PathError::Empty);
        }
        if s.starts_with('/') {
            return Err(PathError::NotRelative(s.to_string()));
        }
        for segment in s.split('/') {
            match segment {
                "" => return Err(PathError::EmptySegment(s.to_string())),
                "." | ".." => return Err(PathError::DotSegment(s.to_string())),
                _ => {}
            }
        }
        Ok(Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FilePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Fingerprint
// ============================================================================

/// Lowercase hex digest of a file's full contents
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn from_digest(bytes: &[u8]) -> Self {
        Self(hex::encode(bytes))
    }

    /// Accept a stored fingerprint only if it has the shape `algorithm` produces
    pub fn from_hex(s: &str, algorithm: HashAlgorithm) -> Option<Self> {
        let well_formed = s.len() == algorithm.hex_len()
            && s.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        well_formed.then(|| Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Snapshot
// ============================================================================

/// Immutable path -> fingerprint mapping captured at one point in time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    root: PathBuf,
    algorithm: HashAlgorithm,
    created_at: DateTime<Utc>,
    files: BTreeMap<FilePath, Fingerprint>,
}

impl Snapshot {
    pub fn new(
        root: impl Into<PathBuf>,
        algorithm: HashAlgorithm,
        created_at: DateTime<Utc>,
        files: BTreeMap<FilePath, Fingerprint>,
    ) -> Self {
        Self {
            root: root.into(),
            algorithm,
            created_at,
            files,
        }
    }

    /// Build a snapshot stamped with the current time
    pub fn capture(
        root: impl Into<PathBuf>,
        algorithm: HashAlgorithm,
        files: impl IntoIterator<Item = (FilePath, Fingerprint)>,
    ) -> Self {
        Self::new(root, algorithm, Utc::now(), files.into_iter().collect())
    }

    /// Absolute path of the monitored root
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn files(&self) -> &BTreeMap<FilePath, Fingerprint> {
        &self.files
    }

    pub fn get(&self, path: &FilePath) -> Option<&Fingerprint> {
        self.files.get(path)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}
