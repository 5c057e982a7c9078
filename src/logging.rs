//! Tracing setup for the rackpack binary.
//!
//! Each launch writes to its own timestamped file under the app `logs/`
//! directory and, unless disabled in settings, mirrors events to stderr.

use std::{
    fs::{self, OpenOptions},
    path::{Path, PathBuf},
    sync::OnceLock,
};

use time::{OffsetDateTime, UtcOffset, format_description::FormatItem, macros::format_description};
use tracing_appender::{non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{EnvFilter, Registry, fmt, prelude::*};

use crate::app_dirs::{AppDirError, AppDirs};
use crate::config::LoggingSettings;

const FALLBACK_FILTER: &str = "info";
const LOG_FILE_PREFIX: &str = "rackpack_";
const LOG_FILE_EXTENSION: &str = "log";

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error(transparent)]
    AppDir(#[from] AppDirError),
    #[error("Failed to read log directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to remove old log file {path}: {source}")]
    RemoveFile {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to create log file at {path}: {source}")]
    CreateLogFile {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to format log filename time: {0}")]
    FormatTime(time::error::Format),
    #[error("Failed to install global tracing subscriber: {0}")]
    SetGlobal(tracing::subscriber::SetGlobalDefaultError),
}

/// Install the global subscriber and return the path of this launch's log file.
///
/// Filter precedence: `RUST_LOG`, then `filter_override`, then the configured
/// filter. A second call returns `Ok(None)` without touching the subscriber.
pub fn init(
    settings: &LoggingSettings,
    filter_override: Option<&str>,
) -> Result<Option<PathBuf>, LoggingError> {
    if LOG_GUARD.get().is_some() {
        return Ok(None);
    }

    let log_dir = AppDirs::resolve()?.logs()?;
    let file_name = log_file_name(now_local_or_utc())?;
    let log_path = log_dir.join(&file_name);
    touch(&log_path)?;
    let removed = prune_logs(&log_dir, settings.max_files.max(1))?;

    let (file_writer, guard) = tracing_appender::non_blocking(rolling::never(&log_dir, file_name));
    let timer = local_timer();
    let console_layer = settings.console.then(|| {
        fmt::layer()
            .with_timer(timer.clone())
            .with_writer(std::io::stderr)
    });
    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_timer(timer)
        .with_writer(file_writer);
    let subscriber = Registry::default()
        .with(env_filter(filter_override.unwrap_or(&settings.filter)))
        .with(console_layer)
        .with(file_layer);
    tracing::subscriber::set_global_default(subscriber).map_err(LoggingError::SetGlobal)?;
    let _ = LOG_GUARD.set(guard);

    tracing::debug!(
        path = %log_path.display(),
        pruned = removed,
        "Logging initialized"
    );
    Ok(Some(log_path))
}

fn touch(path: &Path) -> Result<(), LoggingError> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map(|_| ())
        .map_err(|source| LoggingError::CreateLogFile {
            path: path.to_path_buf(),
            source,
        })
}

fn is_log_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|name| name.to_str());
    let extension = path.extension().and_then(|ext| ext.to_str());
    name.is_some_and(|name| name.starts_with(LOG_FILE_PREFIX)) && extension == Some(LOG_FILE_EXTENSION)
}

/// Delete the oldest rackpack logs so at most `keep` remain; returns how many went.
///
/// File names embed the launch time, so name order is age order.
fn prune_logs(dir: &Path, keep: usize) -> Result<usize, LoggingError> {
    let mut logs: Vec<PathBuf> = fs::read_dir(dir)
        .map_err(|source| LoggingError::ReadDir {
            path: dir.to_path_buf(),
            source,
        })?
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_ok_and(|kind| kind.is_file()))
        .map(|entry| entry.path())
        .filter(|path| is_log_file(path))
        .collect();
    logs.sort();
    let excess = logs.len().saturating_sub(keep);
    for path in &logs[..excess] {
        fs::remove_file(path).map_err(|source| LoggingError::RemoveFile {
            path: path.clone(),
            source,
        })?;
    }
    Ok(excess)
}

fn log_file_name(now: OffsetDateTime) -> Result<String, LoggingError> {
    const NAME_FORMAT: &[FormatItem<'_>] =
        format_description!("[year]-[month]-[day]_[hour]-[minute]-[second]");
    let stamp = now.format(NAME_FORMAT).map_err(LoggingError::FormatTime)?;
    Ok(format!("{LOG_FILE_PREFIX}{stamp}.{LOG_FILE_EXTENSION}"))
}

fn local_timer() -> fmt::time::OffsetTime<time::format_description::BorrowedFormatItem<'static>> {
    const DISPLAY_FORMAT: &[FormatItem<'static>] =
        format_description!("[hour]:[minute]:[second].[subsecond digits:3]");
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    fmt::time::OffsetTime::new(offset, DISPLAY_FORMAT.into())
}

fn now_local_or_utc() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}

fn env_filter(fallback: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(fallback))
        .unwrap_or_else(|_| EnvFilter::new(FALLBACK_FILTER))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn file_name_embeds_launch_time() {
        let fixed = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        assert_eq!(
            log_file_name(fixed).unwrap(),
            "rackpack_2023-11-14_22-13-20.log"
        );
    }

    #[test]
    fn prune_keeps_newest_by_name() {
        let dir = tempdir().unwrap();
        for day in 10..22 {
            touch(&dir.path().join(format!("rackpack_2024-01-{day}_00-00-00.log"))).unwrap();
        }
        assert_eq!(prune_logs(dir.path(), 10).unwrap(), 2);
        assert!(!dir.path().join("rackpack_2024-01-10_00-00-00.log").exists());
        assert!(!dir.path().join("rackpack_2024-01-11_00-00-00.log").exists());
        assert!(dir.path().join("rackpack_2024-01-12_00-00-00.log").exists());
    }

    #[test]
    fn prune_leaves_foreign_files_alone() {
        let dir = tempdir().unwrap();
        touch(&dir.path().join("rackpack_2024-01-01_00-00-00.log")).unwrap();
        touch(&dir.path().join("rackpack_2024-01-02_00-00-00.log")).unwrap();
        touch(&dir.path().join("other.log")).unwrap();
        touch(&dir.path().join("notes.txt")).unwrap();

        assert_eq!(prune_logs(dir.path(), 1).unwrap(), 1);
        assert!(dir.path().join("other.log").exists());
        assert!(dir.path().join("notes.txt").exists());
        assert!(dir.path().join("rackpack_2024-01-02_00-00-00.log").exists());
    }
}
