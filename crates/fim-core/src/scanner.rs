//! Directory tree scanner
//!
//! Walks a monitored root and fingerprints every regular file, producing a
//! [`Snapshot`]. Per-file failures are logged and counted, never fatal.
//!
//! Traversal policy:
//! - directories are descended but never recorded
//! - symlinks are not followed by the walker; a link is canonicalized and
//!   hashed under its own name only when it resolves to a regular file inside
//!   the root. Links to directories are never descended (no cycles).
//! - FIFOs, sockets and devices are ignored without being opened

use crate::error::{HashError, ScanError};
use crate::hasher::Hasher;
use crate::models::{FilePath, Fingerprint, Snapshot};
use chrono::Utc;
use glob::Pattern;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

/// Scan statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanStats {
    pub files_hashed: u64,
    pub bytes_hashed: u64,
    pub directories: u64,
    /// Entries that could not be read or named
    pub skipped: u64,
    pub symlinks_not_followed: u64,
    pub special_files: u64,
    pub excluded: u64,
}

/// Result of a completed scan
#[derive(Debug, Clone)]
pub struct ScanOutcome {
    pub snapshot: Snapshot,
    pub stats: ScanStats,
}

impl ScanOutcome {
    pub fn skipped(&self) -> u64 {
        self.stats.skipped
    }
}

/// Where a symlink ends up
enum LinkTarget {
    File(PathBuf),
    Directory,
    Outside(PathBuf),
    Special,
    Broken(io::Error),
}

/// Validate and canonicalize a monitored root
pub fn resolve_root(dir: &Path) -> Result<PathBuf, ScanError> {
    let metadata = fs::metadata(dir).map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => ScanError::DirectoryNotFound(dir.to_path_buf()),
        _ => ScanError::Root {
            path: dir.to_path_buf(),
            source,
        },
    })?;
    if !metadata.is_dir() {
        return Err(ScanError::NotADirectory(dir.to_path_buf()));
    }
    dir.canonicalize().map_err(|source| ScanError::Root {
        path: dir.to_path_buf(),
        source,
    })
}

/// Scanner for a monitored root
#[derive(Debug, Clone)]
pub struct Scanner {
    hasher: Hasher,
    excludes: Vec<Pattern>,
    ignored: Vec<PathBuf>,
    workers: usize,
}

impl Scanner {
    pub fn new(hasher: Hasher) -> Self {
        Self {
            hasher,
            excludes: Vec::new(),
            ignored: Vec::new(),
            workers: 1,
        }
    }

    /// Glob patterns matched against the root-relative path and the file name
    pub fn with_excludes<I, S>(mut self, patterns: I) -> Result<Self, glob::PatternError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for pattern in patterns {
            self.excludes.push(Pattern::new(pattern.as_ref())?);
        }
        Ok(self)
    }

    /// Never record this absolute path (e.g. the baseline file itself)
    pub fn ignore_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.ignored.push(path.into());
        self
    }

    /// Hash with a pool of `workers` threads; 0 and 1 both mean serial
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Walk `root` and fingerprint every regular file below it
    pub fn scan(&self, root: &Path) -> Result<ScanOutcome, ScanError> {
        let root = resolve_root(root)?;
        let started_at = Utc::now();
        info!(
            root = %root.display(),
            algorithm = %self.hasher.algorithm(),
            workers = self.workers,
            "scan started"
        );

        let mut stats = ScanStats::default();
        let mut excluded = 0u64;
        let mut candidates: Vec<(FilePath, PathBuf)> = Vec::new();

        let walker = WalkDir::new(&root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                let keep = entry.depth() == 0 || !self.is_excluded(&root, entry);
                if !keep {
                    excluded += 1;
                }
                keep
            });

        for entry in walker {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    warn!(error = %e, "skipping unreadable entry");
                    stats.skipped += 1;
                    continue;
                }
            };
            if entry.depth() == 0 {
                continue;
            }

            let file_type = entry.file_type();
            if file_type.is_dir() {
                stats.directories += 1;
                continue;
            }

            if self.ignored.iter().any(|p| p == entry.path()) {
                debug!(path = %entry.path().display(), "ignoring reserved path");
                continue;
            }

            let rel = match relative_path(&root, entry.path()) {
                Ok(rel) => rel,
                Err(reason) => {
                    warn!(path = %entry.path().display(), %reason, "skipping unnameable entry");
                    stats.skipped += 1;
                    continue;
                }
            };

            if file_type.is_file() {
                candidates.push((rel, entry.into_path()));
            } else if file_type.is_symlink() {
                match resolve_link(&root, entry.path()) {
                    LinkTarget::File(target) => {
                        if self.ignored.iter().any(|p| *p == target) {
                            debug!(path = %rel, "symlink to reserved path ignored");
                        } else if self.is_excluded_target(&root, &target) {
                            debug!(path = %rel, target = %target.display(), "symlink into excluded path");
                            stats.excluded += 1;
                        } else {
                            candidates.push((rel, target));
                        }
                    }
                    LinkTarget::Directory => {
                        debug!(path = %rel, "not descending symlinked directory");
                        stats.symlinks_not_followed += 1;
                    }
                    LinkTarget::Outside(target) => {
                        debug!(path = %rel, target = %target.display(), "symlink escapes root");
                        stats.symlinks_not_followed += 1;
                    }
                    LinkTarget::Special => {
                        debug!(path = %rel, "symlink to special file ignored");
                        stats.special_files += 1;
                    }
                    LinkTarget::Broken(e) => {
                        warn!(path = %rel, error = %e, "skipping broken symlink");
                        stats.skipped += 1;
                    }
                }
            } else {
                debug!(path = %rel, "special file ignored");
                stats.special_files += 1;
            }
        }
        stats.excluded += excluded;

        let results: Vec<(FilePath, Result<(Fingerprint, u64), HashError>)> = if self.workers > 1
        {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.workers)
                .build()?;
            pool.install(|| {
                candidates
                    .par_iter()
                    .map(|(rel, path)| (rel.clone(), self.hasher.hash_file(path)))
                    .collect()
            })
        } else {
            candidates
                .iter()
                .map(|(rel, path)| (rel.clone(), self.hasher.hash_file(path)))
                .collect()
        };

        // insertion order is irrelevant: the map is keyed by path
        let mut files = BTreeMap::new();
        for (rel, result) in results {
            match result {
                Ok((fingerprint, size)) => {
                    stats.files_hashed += 1;
                    stats.bytes_hashed += size;
                    files.insert(rel, fingerprint);
                }
                Err(e) => {
                    warn!(path = %rel, error = %e, "skipping file");
                    stats.skipped += 1;
                }
            }
        }

        info!(
            files = stats.files_hashed,
            bytes = stats.bytes_hashed,
            skipped = stats.skipped,
            "scan finished"
        );

        Ok(ScanOutcome {
            snapshot: Snapshot::new(root, self.hasher.algorithm(), started_at, files),
            stats,
        })
    }

    fn is_excluded(&self, root: &Path, entry: &DirEntry) -> bool {
        if self.excludes.is_empty() {
            return false;
        }
        let Ok(rel) = relative_path(root, entry.path()) else {
            return false;
        };
        let name = entry.file_name().to_string_lossy();
        let hit = self
            .excludes
            .iter()
            .any(|p| p.matches(rel.as_str()) || p.matches(&name));
        if hit {
            debug!(path = %rel, "excluded");
        }
        hit
    }

    /// Whether a link target, or any directory above it, matches an exclude
    fn is_excluded_target(&self, root: &Path, target: &Path) -> bool {
        if self.excludes.is_empty() {
            return false;
        }
        let Ok(rel) = relative_path(root, target) else {
            return false;
        };
        let mut prefix = String::new();
        for segment in rel.as_str().split('/') {
            if !prefix.is_empty() {
                prefix.push('/');
            }
            prefix.push_str(segment);
            if self
                .excludes
                .iter()
                .any(|p| p.matches(&prefix) || p.matches(segment))
            {
                return true;
            }
        }
        false
    }
}

fn relative_path(root: &Path, path: &Path) -> Result<FilePath, String> {
    let rel = path.strip_prefix(root).map_err(|e| e.to_string())?;
    FilePath::from_relative(rel).map_err(|e| e.to_string())
}

fn resolve_link(root: &Path, link: &Path) -> LinkTarget {
    let target = match fs::canonicalize(link) {
        Ok(t) => t,
        Err(e) => return LinkTarget::Broken(e),
    };
    if !target.starts_with(root) {
        return LinkTarget::Outside(target);
    }
    match fs::metadata(&target) {
        Ok(m) if m.is_file() => LinkTarget::File(target),
        Ok(m) if m.is_dir() => LinkTarget::Directory,
        Ok(_) => LinkTarget::Special,
        Err(e) => LinkTarget::Broken(e),
    }
}
