//! Local one-shot sample catalog and OP-XY drum rack preset builder.
//!
//! Granted directories are scanned for drum one-shots and catalogued in
//! SQLite. Samples are mapped onto a 24-key layout by hand or by the
//! auto-mapper, then exported as a zipped preset.

/// Per-sample waveform and level analysis.
pub mod analyzer;
/// Application directory resolution.
pub mod app_dirs;
/// Shared decode/encode helpers.
pub mod audio;
/// Exclusive sample audition.
pub mod audition;
/// Drum categorization and randomized key assignment.
pub mod automap;
/// Persistent catalog of directories, samples and racks.
pub mod catalog;
/// TOML settings.
pub mod config;
/// Preset packaging.
pub mod export;
/// Fixed 24-key layout.
pub mod layout;
/// Tracing setup.
pub mod logging;
/// Directory scanning and one-shot detection.
pub mod scanner;
/// In-progress rack editing.
pub mod session;
/// Browser tree built from the catalog.
pub mod tree;

#[cfg(test)]
mod test_support;
