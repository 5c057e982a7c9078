//! Directory scanning and drum one-shot detection.
//!
//! A scan runs in two phases. Detection walks the tree and classifies every
//! audio file; metadata then reads stream facts for the accepted files.
//! Listeners subscribed through [`ScanEvents`] see both phases.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::audio::probe_file;
use crate::catalog::{AudioDetails, normalize_relative_path};

mod one_shot;
mod progress;
mod walk;

pub use one_shot::{OneShotCriteria, OneShotVerdict, classify_one_shot, is_likely_one_shot};
pub use progress::{ScanEvents, ScanProgress, ScanSubscription};
pub use walk::{AUDIO_EXTENSIONS, is_supported_audio};

#[cfg(test)]
pub(crate) use one_shot::tests::decaying_hit;

/// Errors that abort a scan.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Scan root is not a readable directory: {0}")]
    InvalidRoot(PathBuf),
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// A file accepted by the one-shot classifier.
#[derive(Debug, Clone, PartialEq)]
pub struct ScannedSample {
    /// `/`-separated path relative to the scan root.
    pub relative_path: String,
    pub name: String,
    pub details: AudioDetails,
}

/// Summary of a scan run.
#[derive(Debug, Default, Clone)]
pub struct ScanReport {
    pub accepted: Vec<ScannedSample>,
    /// Files rejected by the classifier.
    pub skipped: usize,
    /// Relative paths of files that could not be decoded. They are still on
    /// disk, so a rescan keeps their stored rows.
    pub failed: Vec<String>,
    pub examined: usize,
}

/// Walks directory trees and reports drum one-shots.
#[derive(Default)]
pub struct Scanner {
    criteria: OneShotCriteria,
    events: ScanEvents,
}

impl Scanner {
    pub fn new(criteria: OneShotCriteria) -> Self {
        Self {
            criteria,
            events: ScanEvents::new(),
        }
    }

    pub fn criteria(&self) -> &OneShotCriteria {
        &self.criteria
    }

    /// Progress channel shared by every scan this scanner runs.
    pub fn events(&self) -> &ScanEvents {
        &self.events
    }

    /// Scan `root`, returning the accepted one-shots with their stream facts.
    pub fn scan(&self, root: &Path) -> Result<ScanReport, ScanError> {
        let mut report = ScanReport::default();
        let mut detected = Vec::new();
        walk::visit_audio_files(root, &mut |path| {
            report.examined += 1;
            match is_likely_one_shot(path, &self.criteria) {
                Ok(OneShotVerdict::Accepted) => {
                    detected.push(path.to_path_buf());
                    self.events.emit(ScanProgress::Scanning {
                        detected_count: detected.len(),
                    });
                }
                Ok(verdict) => {
                    debug!(path = %path.display(), ?verdict, "Not a one-shot");
                    report.skipped += 1;
                }
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "Failed to classify audio file");
                    if let Some(relative) = relative_to(root, path) {
                        report.failed.push(relative);
                    }
                }
            }
        })?;

        let total = detected.len();
        for (index, path) in detected.iter().enumerate() {
            if let Some(sample) = self.describe(root, path) {
                report.accepted.push(sample);
            }
            self.events.emit(ScanProgress::Processing {
                total,
                processed: index + 1,
            });
        }
        info!(
            root = %root.display(),
            examined = report.examined,
            accepted = report.accepted.len(),
            skipped = report.skipped,
            failed = report.failed.len(),
            "Scan finished"
        );
        Ok(report)
    }

    fn describe(&self, root: &Path, path: &Path) -> Option<ScannedSample> {
        let relative_path = relative_to(root, path)?;
        let name = path.file_name()?.to_string_lossy().into_owned();
        let details = match probe_file(path) {
            Ok(info) => AudioDetails {
                duration_seconds: Some(info.duration_seconds()),
                channels: Some(info.channels),
                sample_rate: Some(info.sample_rate),
                ..AudioDetails::default()
            },
            Err(err) => {
                warn!(path = %path.display(), error = %err, "Failed to read audio metadata");
                AudioDetails::default()
            }
        };
        Some(ScannedSample {
            relative_path,
            name,
            details,
        })
    }
}

fn relative_to(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    match normalize_relative_path(relative) {
        Ok(relative_path) => Some(relative_path),
        Err(err) => {
            warn!(path = %path.display(), error = %err, "Skipping file outside scan root");
            None
        }
    }
}
