//! The `.rackpack` application directory.
//!
//! Config, the catalog database, exports and logs all live under one folder
//! inside the OS config directory. `RACKPACK_CONFIG_HOME` replaces the OS
//! config directory, which is how integration tests and portable setups
//! relocate it.

use std::path::{Path, PathBuf};

use directories::BaseDirs;
use thiserror::Error;

/// Name of the application directory that lives under the config base.
pub const APP_DIR_NAME: &str = ".rackpack";

/// Environment variable that replaces the OS config directory.
pub const CONFIG_HOME_ENV: &str = "RACKPACK_CONFIG_HOME";

#[derive(Debug, Error)]
pub enum AppDirError {
    #[error("No suitable base config directory available for application files")]
    NoBaseDir,
    #[error("Failed to create application directory at {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Resolved location of the `.rackpack` folder. Subfolders are created on
/// first access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppDirs {
    root: PathBuf,
}

impl AppDirs {
    /// Locate the app directory from `RACKPACK_CONFIG_HOME` or the OS config dir.
    pub fn resolve() -> Result<Self, AppDirError> {
        let base = match std::env::var_os(CONFIG_HOME_ENV) {
            Some(path) if !path.is_empty() => PathBuf::from(path),
            _ => BaseDirs::new()
                .map(|dirs| dirs.config_dir().to_path_buf())
                .ok_or(AppDirError::NoBaseDir)?,
        };
        Ok(Self::under(&base))
    }

    /// The app directory inside an explicit base folder.
    pub fn under(base: &Path) -> Self {
        Self {
            root: base.join(APP_DIR_NAME),
        }
    }

    pub fn root(&self) -> Result<PathBuf, AppDirError> {
        ensure_dir(self.root.clone())
    }

    pub fn logs(&self) -> Result<PathBuf, AppDirError> {
        ensure_dir(self.root.join("logs"))
    }

    pub fn exports(&self) -> Result<PathBuf, AppDirError> {
        ensure_dir(self.root.join("exports"))
    }
}

fn ensure_dir(path: PathBuf) -> Result<PathBuf, AppDirError> {
    std::fs::create_dir_all(&path).map_err(|source| AppDirError::CreateDir {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn folders_are_created_under_the_base() {
        let base = tempdir().unwrap();
        let dirs = AppDirs::under(base.path());
        let root = base.path().join(APP_DIR_NAME);
        assert!(!root.exists());

        assert_eq!(dirs.root().unwrap(), root);
        assert_eq!(dirs.logs().unwrap(), root.join("logs"));
        assert_eq!(dirs.exports().unwrap(), root.join("exports"));
        assert!(root.join("logs").is_dir());
        assert!(root.join("exports").is_dir());
    }

    #[test]
    fn file_in_place_of_root_is_reported() {
        let base = tempdir().unwrap();
        std::fs::write(base.path().join(APP_DIR_NAME), b"").unwrap();
        assert!(matches!(
            AppDirs::under(base.path()).logs(),
            Err(AppDirError::CreateDir { .. })
        ));
    }
}
