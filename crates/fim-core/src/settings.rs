use crate::error::{FimError, Result};
use crate::hasher::{DEFAULT_BUFFER_SIZE, MAX_BUFFER_SIZE};
use crate::models::HashAlgorithm;
use crate::paths;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

fn default_workers() -> usize {
    1
}

fn default_buffer_size() -> usize {
    DEFAULT_BUFFER_SIZE
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// Digest for new baselines; verification always uses the baseline's own
    #[serde(default)]
    pub hash_algorithm: HashAlgorithm,
    /// Glob patterns matched against relative paths and file names
    #[serde(default)]
    pub exclude_patterns: Vec<String>,
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
    #[serde(default)]
    pub baseline_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            hash_algorithm: HashAlgorithm::default(),
            exclude_patterns: vec![],
            workers: default_workers(),
            buffer_size: default_buffer_size(),
            baseline_dir: None,
        }
    }
}

impl Settings {
    /// Load settings from an explicit file; the file must exist
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read(path)
            .map_err(|e| FimError::Config(format!("cannot read {}: {e}", path.display())))?;
        let settings: Self = serde_json::from_slice(&data)
            .map_err(|e| FimError::Config(format!("invalid {}: {e}", path.display())))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load from the default location, falling back to defaults when absent
    pub fn load_default() -> Result<Self> {
        let path = paths::settings_path()?;
        match fs::metadata(&path) {
            Ok(_) => Self::load(&path),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(FimError::Config(format!(
                "cannot access {}: {e}",
                path.display()
            ))),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.buffer_size == 0 {
            return Err(FimError::Config("buffer_size must be greater than 0".into()));
        }
        if self.buffer_size > MAX_BUFFER_SIZE {
            return Err(FimError::Config(format!(
                "buffer_size {} exceeds the maximum of {MAX_BUFFER_SIZE} bytes",
                self.buffer_size
            )));
        }
        for pattern in &self.exclude_patterns {
            glob::Pattern::new(pattern)
                .map_err(|e| FimError::Config(format!("bad exclude pattern {pattern:?}: {e}")))?;
        }
        Ok(())
    }

    /// Directory holding per-root baseline files
    pub fn baseline_dir(&self) -> Result<PathBuf> {
        match &self.baseline_dir {
            Some(dir) => Ok(dir.clone()),
            None => paths::default_baseline_dir(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"hash_algorithm": "sha256", "exclude_patterns": ["*.tmp"]}"#).unwrap();

        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.hash_algorithm, HashAlgorithm::Sha256);
        assert_eq!(settings.exclude_patterns, vec!["*.tmp".to_string()]);
        assert_eq!(settings.workers, 1);
        assert_eq!(settings.buffer_size, DEFAULT_BUFFER_SIZE);
        assert_eq!(settings.baseline_dir, None);
    }

    #[test]
    fn test_rejects_bad_values() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        for body in [
            r#"{"buffer_size": 0}"#,
            r#"{"exclude_patterns": ["[oops"]}"#,
            r#"{"hash_algorithm": "crc32"}"#,
            r#"{"unknown_key": true}"#,
            "not json",
        ] {
            fs::write(&path, body).unwrap();
            assert!(
                matches!(Settings::load(&path), Err(FimError::Config(_))),
                "{body}"
            );
        }
    }

    #[test]
    fn test_oversized_buffer_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        for size in [MAX_BUFFER_SIZE as u64 + 1, u64::MAX] {
            fs::write(&path, format!(r#"{{"buffer_size": {size}}}"#)).unwrap();
            assert!(
                matches!(Settings::load(&path), Err(FimError::Config(_))),
                "{size}"
            );
        }

        fs::write(&path, format!(r#"{{"buffer_size": {MAX_BUFFER_SIZE}}}"#)).unwrap();
        assert_eq!(Settings::load(&path).unwrap().buffer_size, MAX_BUFFER_SIZE);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempdir().unwrap();
        assert!(Settings::load(&dir.path().join("nope.json")).is_err());
    }

    #[test]
    fn test_baseline_dir_override() {
        let settings = Settings {
            baseline_dir: Some(PathBuf::from("/tmp/fim-baselines")),
            ..Default::default()
        };
        assert_eq!(
            settings.baseline_dir().unwrap(),
            PathBuf::from("/tmp/fim-baselines")
        );
    }
}
