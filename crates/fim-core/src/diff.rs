//! Snapshot comparison
//!
//! Pure: works on two in-memory snapshots and never touches the filesystem.
//! Both snapshots must have been hashed with the same algorithm, otherwise
//! every shared path reports as modified.

use crate::models::{FilePath, Snapshot};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeSet;

/// Type of file change detected
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    /// File content was modified
    Modified,
    /// New file added
    Added,
    /// File was removed
    Removed,
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Modified => "modified",
            Self::Added => "added",
            Self::Removed => "removed",
        }
    }
}

/// Classification of every path relative to a baseline
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffReport {
    baseline_time: DateTime<Utc>,
    current_time: DateTime<Utc>,
    modified: BTreeSet<FilePath>,
    added: BTreeSet<FilePath>,
    removed: BTreeSet<FilePath>,
    unchanged: usize,
}

impl DiffReport {
    pub fn baseline_time(&self) -> DateTime<Utc> {
        self.baseline_time
    }

    pub fn current_time(&self) -> DateTime<Utc> {
        self.current_time
    }

    pub fn modified(&self) -> &BTreeSet<FilePath> {
        &self.modified
    }

    pub fn added(&self) -> &BTreeSet<FilePath> {
        &self.added
    }

    pub fn removed(&self) -> &BTreeSet<FilePath> {
        &self.removed
    }

    pub fn unchanged(&self) -> usize {
        self.unchanged
    }

    pub fn change_count(&self) -> usize {
        self.modified.len() + self.added.len() + self.removed.len()
    }

    /// True when nothing was modified, added or removed
    pub fn is_clean(&self) -> bool {
        self.change_count() == 0
    }

    /// All changes, grouped by kind and sorted by path within each kind
    pub fn changes(&self) -> impl Iterator<Item = (ChangeKind, &FilePath)> {
        self.modified
            .iter()
            .map(|p| (ChangeKind::Modified, p))
            .chain(self.added.iter().map(|p| (ChangeKind::Added, p)))
            .chain(self.removed.iter().map(|p| (ChangeKind::Removed, p)))
    }
}

/// Compare `current` against `baseline`
///
/// Both file maps are sorted, so a single merge walk visits each path of the
/// union exactly once.
pub fn diff(baseline: &Snapshot, current: &Snapshot) -> DiffReport {
    let mut report = DiffReport {
        baseline_time: baseline.created_at(),
        current_time: current.created_at(),
        modified: BTreeSet::new(),
        added: BTreeSet::new(),
        removed: BTreeSet::new(),
        unchanged: 0,
    };

    let mut old = baseline.files().iter().peekable();
    let mut new = current.files().iter().peekable();

    loop {
        match (old.peek().copied(), new.peek().copied()) {
            (None, None) => break,
            (Some((path, _)), None) => {
                report.removed.insert(path.clone());
                old.next();
            }
            (None, Some((path, _))) => {
                report.added.insert(path.clone());
                new.next();
            }
            (Some((old_path, old_fp)), Some((new_path, new_fp))) => {
                match old_path.cmp(new_path) {
                    Ordering::Less => {
                        report.removed.insert(old_path.clone());
                        old.next();
                    }
                    Ordering::Greater => {
                        report.added.insert(new_path.clone());
                        new.next();
                    }
                    Ordering::Equal => {
                        if old_fp == new_fp {
                            report.unchanged += 1;
                        } else {
                            report.modified.insert(new_path.clone());
                        }
                        old.next();
                        new.next();
                    }
                }
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hasher::Hasher;
    use crate::models::HashAlgorithm;
    use rand::Rng;

    fn snap(entries: &[(&str, &str)]) -> Snapshot {
        let hasher = Hasher::default();
        Snapshot::capture(
            "/m",
            HashAlgorithm::Blake3,
            entries
                .iter()
                .map(|(p, c)| (FilePath::parse(p).unwrap(), hasher.hash_bytes(c.as_bytes()))),
        )
    }

    fn set(paths: &[&str]) -> BTreeSet<FilePath> {
        paths.iter().map(|p| FilePath::parse(p).unwrap()).collect()
    }

    #[test]
    fn test_modified_only() {
        let baseline = snap(&[("a.txt", "h1"), ("b.txt", "h2")]);
        let current = snap(&[("a.txt", "h1"), ("b.txt", "h3")]);
        let report = diff(&baseline, &current);

        assert_eq!(report.modified(), &set(&["b.txt"]));
        assert!(report.added().is_empty());
        assert!(report.removed().is_empty());
        assert_eq!(report.unchanged(), 1);
        assert!(!report.is_clean());
    }

    #[test]
    fn test_added_only() {
        let baseline = snap(&[("a.txt", "h1")]);
        let current = snap(&[("a.txt", "h1"), ("c.txt", "h4")]);
        let report = diff(&baseline, &current);

        assert_eq!(report.added(), &set(&["c.txt"]));
        assert!(report.modified().is_empty());
        assert!(report.removed().is_empty());
        assert_eq!(report.unchanged(), 1);
    }

    #[test]
    fn test_removed_only() {
        let baseline = snap(&[("a.txt", "h1"), ("b.txt", "h2")]);
        let current = snap(&[("a.txt", "h1")]);
        let report = diff(&baseline, &current);

        assert_eq!(report.removed(), &set(&["b.txt"]));
        assert!(report.modified().is_empty());
        assert!(report.added().is_empty());
    }

    #[test]
    fn test_identical_snapshots_are_clean() {
        let a = snap(&[("x", "1"), ("y/z", "2"), ("y/w", "3")]);
        let report = diff(&a, &a);
        assert!(report.is_clean());
        assert_eq!(report.unchanged(), 3);
        assert_eq!(report.baseline_time(), report.current_time());
    }

    #[test]
    fn test_empty_baseline_reports_all_added() {
        let report = diff(&snap(&[]), &snap(&[("a", "1"), ("b", "2")]));
        assert_eq!(report.added(), &set(&["a", "b"]));
        assert_eq!(report.unchanged(), 0);
    }

    #[test]
    fn test_empty_current_reports_all_removed() {
        let report = diff(&snap(&[("a", "1"), ("b", "2")]), &snap(&[]));
        assert_eq!(report.removed(), &set(&["a", "b"]));
        assert_eq!(report.change_count(), 2);
    }

    #[test]
    fn test_changes_iterator_groups_by_kind() {
        let baseline = snap(&[("gone", "1"), ("same", "2"), ("edit", "3")]);
        let current = snap(&[("same", "2"), ("edit", "4"), ("fresh", "5")]);
        let report = diff(&baseline, &current);

        let changes: Vec<(ChangeKind, &str)> =
            report.changes().map(|(k, p)| (k, p.as_str())).collect();
        assert_eq!(
            changes,
            vec![
                (ChangeKind::Modified, "edit"),
                (ChangeKind::Added, "fresh"),
                (ChangeKind::Removed, "gone"),
            ]
        );
    }

    #[test]
    fn test_random_snapshots_partition_the_union() {
        let mut rng = rand::thread_rng();
        for _ in 0..200 {
            let mut a = Vec::new();
            let mut b = Vec::new();
            for i in 0..rng.gen_range(0..40) {
                let path = format!("d{}/f{i}", i % 4);
                let content = rng.gen_range(0..3).to_string();
                match rng.gen_range(0..3) {
                    0 => a.push((path, content)),
                    1 => b.push((path, content)),
                    _ => {
                        let other = rng.gen_range(0..3).to_string();
                        a.push((path.clone(), content));
                        b.push((path, other));
                    }
                }
            }
            let to_refs = |v: &[(String, String)]| -> Snapshot {
                let refs: Vec<(&str, &str)> =
                    v.iter().map(|(p, c)| (p.as_str(), c.as_str())).collect();
                snap(&refs)
            };
            let (sa, sb) = (to_refs(&a), to_refs(&b));
            let r = diff(&sa, &sb);

            assert_eq!(r.unchanged() + r.modified().len() + r.added().len(), sb.len());
            assert_eq!(r.unchanged() + r.modified().len() + r.removed().len(), sa.len());
            assert!(r.modified().is_disjoint(r.added()));
            assert!(r.modified().is_disjoint(r.removed()));
            assert!(r.added().is_disjoint(r.removed()));
            for p in r.added() {
                assert!(sa.get(p).is_none() && sb.get(p).is_some());
            }
            for p in r.removed() {
                assert!(sa.get(p).is_some() && sb.get(p).is_none());
            }
            for p in r.modified() {
                assert_ne!(sa.get(p), sb.get(p));
            }
        }
    }
}
