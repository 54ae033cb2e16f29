//! Scan / verify operations over one monitored root
//!
//! A root is UNINITIALIZED until its first scan writes a baseline, and
//! BASELINED afterwards. Every later scan overwrites the baseline wholesale.

use crate::diff::{diff, DiffReport};
use crate::error::{FimError, Result, StoreError};
use crate::hasher::Hasher;
use crate::models::HashAlgorithm;
use crate::paths;
use crate::scanner::{self, ScanStats, Scanner};
use crate::settings::Settings;
use crate::store::BaselineStore;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// Metadata of an existing baseline
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BaselineInfo {
    pub scan_time: DateTime<Utc>,
    pub monitored_directory: PathBuf,
    pub hash_algorithm: HashAlgorithm,
    pub file_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum MonitorState {
    Uninitialized,
    Baselined(BaselineInfo),
}

#[derive(Debug, Clone, Serialize)]
pub struct ScanSummary {
    pub root: PathBuf,
    pub baseline_path: PathBuf,
    pub scan_time: DateTime<Utc>,
    pub hash_algorithm: HashAlgorithm,
    pub file_count: usize,
    /// Whether an earlier baseline was overwritten
    pub replaced: bool,
    pub stats: ScanStats,
}

#[derive(Debug, Clone, Serialize)]
pub struct VerifyOutcome {
    pub root: PathBuf,
    pub baseline_path: PathBuf,
    pub hash_algorithm: HashAlgorithm,
    pub report: DiffReport,
    pub stats: ScanStats,
}

pub struct Monitor {
    settings: Settings,
}

impl Monitor {
    pub fn new(settings: Settings) -> Result<Self> {
        settings.validate()?;
        Ok(Self { settings })
    }

    /// Validate `dir` and return its canonical form
    pub fn resolve_root(&self, dir: &Path) -> Result<PathBuf> {
        Ok(scanner::resolve_root(dir)?)
    }

    /// The baseline file associated with a canonical root
    pub fn default_store(&self, root: &Path) -> Result<BaselineStore> {
        let dir = self.settings.baseline_dir()?;
        Ok(BaselineStore::new(paths::baseline_path_for(&dir, root)))
    }

    fn scanner(&self, algorithm: HashAlgorithm, store: &BaselineStore) -> Result<Scanner> {
        let hasher = Hasher::with_buffer_size(algorithm, self.settings.buffer_size);
        let scanner = Scanner::new(hasher)
            .with_excludes(&self.settings.exclude_patterns)
            .map_err(|e| FimError::Config(format!("bad exclude pattern: {e}")))?
            .with_workers(self.settings.workers)
            .ignore_path(absolute_path(store.path()));
        Ok(scanner)
    }

    /// Hash the tree and replace the baseline with the result
    pub fn scan(&self, dir: &Path, store: &BaselineStore) -> Result<ScanSummary> {
        let root = self.resolve_root(dir)?;
        let replaced = store.exists();
        let outcome = self
            .scanner(self.settings.hash_algorithm, store)?
            .scan(&root)?;
        store.save(&outcome.snapshot)?;

        info!(
            root = %root.display(),
            baseline = %store.path().display(),
            files = outcome.snapshot.len(),
            replaced,
            "baseline written"
        );

        Ok(ScanSummary {
            root,
            baseline_path: store.path().to_path_buf(),
            scan_time: outcome.snapshot.created_at(),
            hash_algorithm: outcome.snapshot.algorithm(),
            file_count: outcome.snapshot.len(),
            replaced,
            stats: outcome.stats,
        })
    }

    /// Re-scan the tree and compare it with the stored baseline
    ///
    /// The directory is validated before the baseline is read, and a
    /// corrupt baseline aborts before any hashing happens.
    pub fn verify(&self, dir: &Path, store: &BaselineStore) -> Result<VerifyOutcome> {
        let root = self.resolve_root(dir)?;
        let baseline = store.load()?;
        if baseline.root() != root {
            return Err(FimError::RootMismatch {
                recorded: baseline.root().to_path_buf(),
                requested: root,
            });
        }

        let outcome = self.scanner(baseline.algorithm(), store)?.scan(&root)?;
        let report = diff(&baseline, &outcome.snapshot);

        if report.is_clean() {
            info!(
                root = %root.display(),
                unchanged = report.unchanged(),
                "integrity verified"
            );
        } else {
            error!(
                root = %root.display(),
                modified = report.modified().len(),
                added = report.added().len(),
                removed = report.removed().len(),
                "integrity changes detected"
            );
        }

        Ok(VerifyOutcome {
            root,
            baseline_path: store.path().to_path_buf(),
            hash_algorithm: baseline.algorithm(),
            report,
            stats: outcome.stats,
        })
    }

    /// Whether `dir` has a baseline yet
    pub fn status(&self, dir: &Path, store: &BaselineStore) -> Result<MonitorState> {
        self.resolve_root(dir)?;
        match store.load() {
            Ok(baseline) => Ok(MonitorState::Baselined(BaselineInfo {
                scan_time: baseline.created_at(),
                monitored_directory: baseline.root().to_path_buf(),
                hash_algorithm: baseline.algorithm(),
                file_count: baseline.len(),
            })),
            Err(StoreError::NotFound(_)) => Ok(MonitorState::Uninitialized),
            Err(e) => Err(e.into()),
        }
    }
}

/// Absolute form of `path` with its parent canonicalized when possible
fn absolute_path(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        match std::env::current_dir() {
            Ok(cwd) => cwd.join(path),
            Err(_) => path.to_path_buf(),
        }
    };
    match (absolute.parent(), absolute.file_name()) {
        (Some(parent), Some(name)) => parent
            .canonicalize()
            .map(|p| p.join(name))
            .unwrap_or_else(|_| absolute.clone()),
        _ => absolute,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FilePath;
    use std::fs;
    use tempfile::{tempdir, TempDir};

    struct Fixture {
        tree: TempDir,
        state: TempDir,
        monitor: Monitor,
    }

    impl Fixture {
        fn new() -> Self {
            Self::with_settings(Settings::default())
        }

        fn with_settings(mut settings: Settings) -> Self {
            let tree = tempdir().unwrap();
            let state = tempdir().unwrap();
            settings.baseline_dir = Some(state.path().to_path_buf());
            fs::write(tree.path().join("a.txt"), "alpha").unwrap();
            fs::create_dir(tree.path().join("sub")).unwrap();
            fs::write(tree.path().join("sub/b.txt"), "beta").unwrap();
            Self {
                tree,
                state,
                monitor: Monitor::new(settings).unwrap(),
            }
        }

        fn store(&self) -> BaselineStore {
            let root = self.monitor.resolve_root(self.tree.path()).unwrap();
            self.monitor.default_store(&root).unwrap()
        }
    }

    fn paths(set: &std::collections::BTreeSet<FilePath>) -> Vec<&str> {
        set.iter().map(|p| p.as_str()).collect()
    }

    #[test]
    fn test_state_transitions() {
        let fx = Fixture::new();
        let store = fx.store();
        assert_eq!(
            fx.monitor.status(fx.tree.path(), &store).unwrap(),
            MonitorState::Uninitialized
        );

        let first = fx.monitor.scan(fx.tree.path(), &store).unwrap();
        assert!(!first.replaced);
        assert_eq!(first.file_count, 2);
        assert!(store.path().starts_with(fx.state.path()));

        match fx.monitor.status(fx.tree.path(), &store).unwrap() {
            MonitorState::Baselined(info) => {
                assert_eq!(info.file_count, 2);
                assert_eq!(info.hash_algorithm, HashAlgorithm::Blake3);
            }
            other => panic!("unexpected state {other:?}"),
        }

        fs::write(fx.tree.path().join("c.txt"), "gamma").unwrap();
        let second = fx.monitor.scan(fx.tree.path(), &store).unwrap();
        assert!(second.replaced);
        assert_eq!(second.file_count, 3);
    }

    #[test]
    fn test_verify_detects_every_kind_of_change() {
        let fx = Fixture::new();
        let store = fx.store();
        fx.monitor.scan(fx.tree.path(), &store).unwrap();

        let clean = fx.monitor.verify(fx.tree.path(), &store).unwrap();
        assert!(clean.report.is_clean());
        assert_eq!(clean.report.unchanged(), 2);

        fs::write(fx.tree.path().join("a.txt"), "ALPHA").unwrap();
        fs::remove_file(fx.tree.path().join("sub/b.txt")).unwrap();
        fs::write(fx.tree.path().join("sub/new.txt"), "new").unwrap();

        let outcome = fx.monitor.verify(fx.tree.path(), &store).unwrap();
        assert_eq!(paths(outcome.report.modified()), vec!["a.txt"]);
        assert_eq!(paths(outcome.report.removed()), vec!["sub/b.txt"]);
        assert_eq!(paths(outcome.report.added()), vec!["sub/new.txt"]);
        assert_eq!(outcome.report.unchanged(), 0);
    }

    #[test]
    fn test_verify_without_baseline() {
        let fx = Fixture::new();
        let err = fx.monitor.verify(fx.tree.path(), &fx.store()).unwrap_err();
        assert!(matches!(err, FimError::Store(StoreError::NotFound(_))));
    }

    #[test]
    fn test_verify_with_corrupt_baseline_aborts() {
        let fx = Fixture::new();
        let store = fx.store();
        fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        fs::write(store.path(), "{ definitely not a baseline").unwrap();

        let err = fx.monitor.verify(fx.tree.path(), &store).unwrap_err();
        assert!(matches!(err, FimError::Store(StoreError::Corrupt { .. })));
        assert!(matches!(
            fx.monitor.status(fx.tree.path(), &store),
            Err(FimError::Store(StoreError::Corrupt { .. }))
        ));
    }

    #[test]
    fn test_missing_directory_is_reported_before_baseline() {
        let fx = Fixture::new();
        let gone = fx.tree.path().join("missing");
        let store = BaselineStore::new(fx.state.path().join("whatever.json"));

        for result in [
            fx.monitor.scan(&gone, &store).map(|_| ()),
            fx.monitor.verify(&gone, &store).map(|_| ()),
        ] {
            assert!(matches!(
                result,
                Err(FimError::Scan(crate::error::ScanError::DirectoryNotFound(_)))
            ));
        }
        assert!(!store.exists());
    }

    #[test]
    fn test_verify_uses_baseline_algorithm() {
        let fx = Fixture::with_settings(Settings {
            hash_algorithm: HashAlgorithm::Sha256,
            ..Default::default()
        });
        let store = fx.store();
        fx.monitor.scan(fx.tree.path(), &store).unwrap();

        // configuration changed after the baseline was taken
        let blake = Monitor::new(Settings {
            baseline_dir: Some(fx.state.path().to_path_buf()),
            ..Default::default()
        })
        .unwrap();
        let outcome = blake.verify(fx.tree.path(), &store).unwrap();
        assert_eq!(outcome.hash_algorithm, HashAlgorithm::Sha256);
        assert!(outcome.report.is_clean());
    }

    #[test]
    fn test_baseline_inside_tree_is_not_scanned() {
        let fx = Fixture::new();
        let store = BaselineStore::new(fx.tree.path().join("baseline.json"));
        fx.monitor.scan(fx.tree.path(), &store).unwrap();

        let outcome = fx.monitor.verify(fx.tree.path(), &store).unwrap();
        assert!(outcome.report.is_clean());
        assert_eq!(outcome.report.unchanged(), 2);
    }

    #[test]
    fn test_root_mismatch() {
        let fx = Fixture::new();
        let other = tempdir().unwrap();
        let store = BaselineStore::new(fx.state.path().join("shared.json"));
        fx.monitor.scan(fx.tree.path(), &store).unwrap();

        let err = fx.monitor.verify(other.path(), &store).unwrap_err();
        assert!(matches!(err, FimError::RootMismatch { .. }));
    }

    #[test]
    fn test_parallel_scan_produces_same_baseline() {
        let serial = Fixture::new();
        let store = serial.store();
        serial.monitor.scan(serial.tree.path(), &store).unwrap();

        let parallel = Monitor::new(Settings {
            workers: 4,
            baseline_dir: Some(serial.state.path().to_path_buf()),
            ..Default::default()
        })
        .unwrap();
        let outcome = parallel.verify(serial.tree.path(), &store).unwrap();
        assert!(outcome.report.is_clean());
    }
}
