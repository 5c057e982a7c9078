//! TOML settings stored next to the catalog in the app directory.
//!
//! Keys: `database_path`, `export_dir`, `[scanner]`, `[automap]`, `[logging]`. Every key is
//! optional; missing values fall back to defaults.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::app_dirs::{AppDirError, AppDirs};
use crate::catalog::DB_FILE_NAME;
use crate::scanner::OneShotCriteria;

/// Default filename used to store the settings.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Errors that may occur while loading or saving settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Unable to resolve the app directory: {0}")]
    AppDir(#[from] AppDirError),
    #[error("Unable to create config directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid config at {path}: {source}")]
    ParseToml {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Failed to serialize config to TOML at {path}: {source}")]
    SerializeToml {
        path: PathBuf,
        source: toml::ser::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Catalog database location; defaults to `rackpack.db` in the app directory.
    pub database_path: Option<PathBuf>,
    /// Where the CLI writes preset archives; defaults to `exports/` in the app directory.
    pub export_dir: Option<PathBuf>,
    pub scanner: ScannerSettings,
    pub automap: AutomapSettings,
    pub logging: LoggingSettings,
}

impl AppSettings {
    pub fn database_path(&self) -> Result<PathBuf, ConfigError> {
        self.database_path_in(&AppDirs::resolve()?)
    }

    pub fn database_path_in(&self, dirs: &AppDirs) -> Result<PathBuf, ConfigError> {
        match &self.database_path {
            Some(path) => Ok(path.clone()),
            None => Ok(dirs.root()?.join(DB_FILE_NAME)),
        }
    }

    pub fn export_dir(&self) -> Result<PathBuf, ConfigError> {
        self.export_dir_in(&AppDirs::resolve()?)
    }

    pub fn export_dir_in(&self, dirs: &AppDirs) -> Result<PathBuf, ConfigError> {
        match &self.export_dir {
            Some(path) => Ok(path.clone()),
            None => Ok(dirs.exports()?),
        }
    }
}

/// One-shot classifier thresholds, in config units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerSettings {
    pub max_file_bytes: u64,
    pub max_duration_seconds: f64,
    pub max_attack_ms: f64,
    pub window_ms: f64,
    pub window_count: usize,
    pub min_decreasing_pairs: usize,
    pub tail_ratio: f32,
}

impl Default for ScannerSettings {
    fn default() -> Self {
        Self::from(&OneShotCriteria::default())
    }
}

impl From<&OneShotCriteria> for ScannerSettings {
    fn from(criteria: &OneShotCriteria) -> Self {
        Self {
            max_file_bytes: criteria.max_file_bytes,
            max_duration_seconds: criteria.max_duration_seconds,
            max_attack_ms: criteria.max_attack_seconds * 1000.0,
            window_ms: criteria.window_seconds * 1000.0,
            window_count: criteria.window_count,
            min_decreasing_pairs: criteria.min_decreasing_pairs,
            tail_ratio: criteria.max_tail_ratio,
        }
    }
}

impl ScannerSettings {
    pub fn criteria(&self) -> OneShotCriteria {
        OneShotCriteria {
            max_file_bytes: self.max_file_bytes,
            max_duration_seconds: self.max_duration_seconds,
            max_attack_seconds: self.max_attack_ms / 1000.0,
            window_seconds: self.window_ms / 1000.0,
            window_count: self.window_count.max(2),
            min_decreasing_pairs: self.min_decreasing_pairs,
            max_tail_ratio: self.tail_ratio,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutomapSettings {
    /// Catalog samples longer than this are left out of auto-mapping.
    pub max_duration_seconds: f64,
    /// Fixed seed for reproducible mappings.
    pub seed: Option<u64>,
}

impl Default for AutomapSettings {
    fn default() -> Self {
        Self {
            max_duration_seconds: 2.0,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// `tracing` filter directive used when `RUST_LOG` is unset.
    pub filter: String,
    /// Number of per-launch log files to keep.
    pub max_files: usize,
    /// Mirror log events to stderr.
    pub console: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            max_files: 10,
            console: true,
        }
    }
}

/// Resolve the settings file path inside the app directory.
pub fn config_path() -> Result<PathBuf, ConfigError> {
    config_path_in(&AppDirs::resolve()?)
}

pub fn config_path_in(dirs: &AppDirs) -> Result<PathBuf, ConfigError> {
    Ok(dirs.root()?.join(CONFIG_FILE_NAME))
}

/// Load settings from the app directory, returning defaults if the file is missing.
pub fn load_or_default() -> Result<AppSettings, ConfigError> {
    load_from(&config_path()?)
}

pub fn load_from(path: &Path) -> Result<AppSettings, ConfigError> {
    if !path.exists() {
        return Ok(AppSettings::default());
    }
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&text).map_err(|source| ConfigError::ParseToml {
        path: path.to_path_buf(),
        source,
    })
}

pub fn save(settings: &AppSettings) -> Result<(), ConfigError> {
    save_to_path(settings, &config_path()?)
}

/// Write settings through a temporary file so a crash never leaves a partial config.
pub fn save_to_path(settings: &AppSettings, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| ConfigError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let data = toml::to_string_pretty(settings).map_err(|source| ConfigError::SerializeToml {
        path: path.to_path_buf(),
        source,
    })?;
    let tmp_path = path.with_extension("toml.tmp");
    let write_err = |source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    };
    let mut file = std::fs::File::create(&tmp_path).map_err(write_err)?;
    file.write_all(data.as_bytes()).map_err(write_err)?;
    file.sync_all().map_err(write_err)?;
    drop(file);
    std::fs::rename(&tmp_path, path).map_err(write_err)
}
