use std::{
    fs, io,
    path::{Path, PathBuf},
};

use tracing::warn;

use super::ScanError;

/// Extensions considered audio, compared case-insensitively.
pub const AUDIO_EXTENSIONS: [&str; 5] = ["wav", "mp3", "aif", "aiff", "m4a"];

/// True when `path` carries one of the supported audio extensions.
pub fn is_supported_audio(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            AUDIO_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}

/// Depth-first walk under `root`, calling `visitor` for every supported audio file.
///
/// Entries within a folder are visited in name order. Symlinks are skipped and
/// unreadable subfolders are logged and treated as empty.
pub(crate) fn visit_audio_files(
    root: &Path,
    visitor: &mut impl FnMut(&Path),
) -> Result<(), ScanError> {
    walk_with(root, &mut |dir| fs::read_dir(dir), visitor)
}

fn walk_with(
    root: &Path,
    read_dir: &mut impl FnMut(&Path) -> io::Result<fs::ReadDir>,
    visitor: &mut impl FnMut(&Path),
) -> Result<(), ScanError> {
    if !root.is_dir() {
        return Err(ScanError::InvalidRoot(root.to_path_buf()));
    }
    let mut stack: Vec<PathBuf> = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        let entries = match read_dir(&dir) {
            Ok(entries) => entries,
            Err(source) if dir != root => {
                warn!(
                    dir = %dir.display(),
                    error = %source,
                    "Failed to read directory during scan"
                );
                continue;
            }
            Err(source) => {
                return Err(ScanError::Io {
                    path: dir.clone(),
                    source,
                });
            }
        };
        let mut files = Vec::new();
        let mut subdirs = Vec::new();
        for entry_result in entries {
            let entry = match entry_result {
                Ok(entry) => entry,
                Err(err) => {
                    warn!(
                        dir = %dir.display(),
                        error = %err,
                        "Failed to read directory entry during scan"
                    );
                    continue;
                }
            };
            let path = entry.path();
            let file_type = match entry.file_type() {
                Ok(file_type) => file_type,
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "Failed to read file type during scan"
                    );
                    continue;
                }
            };
            if file_type.is_symlink() {
                continue;
            }
            if file_type.is_dir() {
                subdirs.push(path);
            } else if file_type.is_file() && is_supported_audio(&path) {
                files.push(path);
            }
        }
        files.sort();
        for file in &files {
            visitor(file);
        }
        subdirs.sort();
        // Reverse so the stack pops folders in name order.
        stack.extend(subdirs.into_iter().rev());
    }
    Ok(())
}
