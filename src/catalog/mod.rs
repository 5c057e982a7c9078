//! Local catalog of granted directories, their one-shot samples and saved racks.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

mod access;
mod db;
mod store;

pub use access::{DirectoryAccess, FsAccess, PermissionState};
pub use db::{CatalogDatabase, CatalogWriteBatch, DB_FILE_NAME};
pub use store::{CatalogStore, SampleFile};

use crate::layout::Key;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new unique identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            /// Rehydrate an identifier from a stored string.
            pub fn from_string(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the identifier as a string.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(
    /// Identifier for a granted directory.
    DirectoryId
);
string_id!(
    /// Identifier for a catalogued sample.
    SampleId
);
string_id!(
    /// Identifier for a saved drum rack.
    RackId
);

/// A user-granted root folder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Directory {
    pub id: DirectoryId,
    pub name: String,
    pub path: PathBuf,
    pub last_accessed_at: i64,
    pub permission: PermissionState,
}

impl Directory {
    /// True when the root is readable in this session.
    pub fn has_permission(&self) -> bool {
        self.permission == PermissionState::Granted
    }
}

/// Metadata for one catalogued audio file.
///
/// Audio-derived fields stay `None` until analysis completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub id: SampleId,
    pub name: String,
    /// Path relative to the directory root, `/`-separated.
    pub path: String,
    pub directory_id: DirectoryId,
    /// Relative parent folder of `path` (empty for files at the root).
    pub parent_path: String,
    pub duration_seconds: Option<f64>,
    pub channels: Option<u16>,
    pub sample_rate: Option<u32>,
    pub rms_db: Option<f64>,
    pub peaks: Option<Vec<f32>>,
    pub created_at: i64,
}

impl Sample {
    /// Build a fresh record with no audio details.
    pub fn new(name: &str, path: &str, directory_id: DirectoryId) -> Self {
        Self {
            id: SampleId::new(),
            name: name.to_string(),
            path: path.to_string(),
            directory_id,
            parent_path: parent_path_of(path),
            duration_seconds: None,
            channels: None,
            sample_rate: None,
            rms_db: None,
            peaks: None,
            created_at: now_millis(),
        }
    }

    /// True when the analyzer has not filled in level and waveform data yet.
    pub fn is_pending_analysis(&self) -> bool {
        self.rms_db.is_none() || self.peaks.is_none()
    }

    /// Overwrite fields with every value present in `details`; `None` keeps the current value.
    pub fn merge_details(&mut self, details: &AudioDetails) {
        if let Some(value) = details.duration_seconds {
            self.duration_seconds = Some(value);
        }
        if let Some(value) = details.channels {
            self.channels = Some(value);
        }
        if let Some(value) = details.sample_rate {
            self.sample_rate = Some(value);
        }
        if let Some(value) = details.rms_db {
            self.rms_db = Some(value);
        }
        if let Some(value) = &details.peaks {
            self.peaks = Some(value.clone());
        }
    }
}

/// Optional audio facts supplied by the scanner or analyzer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AudioDetails {
    pub duration_seconds: Option<f64>,
    pub channels: Option<u16>,
    pub sample_rate: Option<u32>,
    pub rms_db: Option<f64>,
    pub peaks: Option<Vec<f32>>,
}

/// Saved 24-key assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrumRack {
    pub id: RackId,
    pub name: String,
    pub configuration: RackConfiguration,
    pub created_at: i64,
    pub updated_at: Option<i64>,
}

/// Key snapshot stored with a rack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RackConfiguration {
    pub keys: Vec<Key>,
}

/// Errors returned by the catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Directory {0} not found")]
    DirectoryNotFound(DirectoryId),
    #[error("Sample {0} not found")]
    SampleNotFound(SampleId),
    #[error("Rack {0} not found")]
    RackNotFound(RackId),
    #[error("Directory {0} is not accessible in this session; request permission first")]
    DirectoryNotCached(DirectoryId),
    #[error("File {path} not found in directory {directory}")]
    FileNotFound { path: String, directory: DirectoryId },
    #[error("Permission denied for {0}")]
    PermissionDenied(PathBuf),
    #[error("Path must stay inside the directory root: {0}")]
    InvalidPath(String),
    #[error("Rack must contain {expected} keys, found {found}")]
    InvalidRack { expected: usize, found: usize },
    #[error("Failed to prepare database location {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Database query failed: {0}")]
    Sql(#[from] rusqlite::Error),
    #[error("Stored JSON is invalid: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Database is busy, please retry")]
    Busy,
    #[error("Scan failed: {0}")]
    Scan(#[from] crate::scanner::ScanError),
}

impl CatalogError {
    /// True for errors that a refresh or a new permission grant may resolve.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            CatalogError::DirectoryNotFound(_)
                | CatalogError::SampleNotFound(_)
                | CatalogError::RackNotFound(_)
                | CatalogError::DirectoryNotCached(_)
                | CatalogError::FileNotFound { .. }
        )
    }
}

/// Current wall-clock time in Unix milliseconds.
pub fn now_millis() -> i64 {
    (time::OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

/// Convert a relative filesystem path into the stored `/`-separated form.
pub fn normalize_relative_path(path: &Path) -> Result<String, CatalogError> {
    let mut parts = Vec::new();
    for component in path.components() {
        match component {
            std::path::Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
            std::path::Component::CurDir => {}
            _ => return Err(CatalogError::InvalidPath(path.display().to_string())),
        }
    }
    if parts.is_empty() {
        return Err(CatalogError::InvalidPath(path.display().to_string()));
    }
    Ok(parts.join("/"))
}

fn parent_path_of(path: &str) -> String {
    path.rsplit_once('/')
        .map(|(parent, _)| parent.to_string())
        .unwrap_or_default()
}
