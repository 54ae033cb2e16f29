use crate::error::{FimError, Result};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

pub const APP_QUALIFIER: &str = "com";
pub const APP_ORG: &str = "darklock";
pub const APP_NAME: &str = "fim";

/// Overrides the data directory (baselines live below it)
pub const DATA_DIR_ENV: &str = "FIM_DATA_DIR";
/// Overrides the directory holding `settings.json`
pub const CONFIG_DIR_ENV: &str = "FIM_CONFIG_DIR";

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from(APP_QUALIFIER, APP_ORG, APP_NAME)
        .ok_or_else(|| FimError::Config("cannot determine data directory".into()))
}

pub fn data_dir() -> Result<PathBuf> {
    if let Some(dir) = std::env::var_os(DATA_DIR_ENV) {
        return Ok(PathBuf::from(dir));
    }
    Ok(project_dirs()?.data_dir().to_path_buf())
}

pub fn config_dir() -> Result<PathBuf> {
    if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV) {
        return Ok(PathBuf::from(dir));
    }
    Ok(project_dirs()?.config_dir().to_path_buf())
}

pub fn settings_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("settings.json"))
}

/// Default baseline file for a canonical monitored root
///
/// One file per root: the name is derived from a digest of the root path.
pub fn baseline_path_for(baseline_dir: &Path, root: &Path) -> PathBuf {
    let digest = blake3::hash(root.to_string_lossy().as_bytes()).to_hex();
    baseline_dir.join(format!("{}.json", &digest.as_str()[..16]))
}

/// Directory baselines are written to when no override is configured
pub fn default_baseline_dir() -> Result<PathBuf> {
    Ok(data_dir()?.join("baselines"))
}
