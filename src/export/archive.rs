use std::collections::HashSet;
use std::io::{Cursor, Write};
use std::path::Path;

use zip::CompressionMethod;
use zip::write::SimpleFileOptions;

use super::ExportError;
use super::patch::Patch;

pub const PATCH_FILE_NAME: &str = "patch.json";

/// In-memory preset folder, written out as `<folder>/<name>.preset/...`.
pub struct PresetArchive {
    preset_dir: String,
    files: Vec<(String, Vec<u8>)>,
    used: HashSet<String>,
}

impl PresetArchive {
    pub fn new(preset_name: &str) -> Self {
        let name = sanitize_name(preset_name);
        let mut used = HashSet::new();
        used.insert(PATCH_FILE_NAME.to_string());
        Self {
            preset_dir: format!("{name}/{name}.preset"),
            files: Vec::new(),
            used,
        }
    }

    /// Path prefix of every entry in the archive.
    pub fn preset_dir(&self) -> &str {
        &self.preset_dir
    }

    /// Add an audio file, returning the name it was stored under.
    pub fn add_file(&mut self, file_name: &str, bytes: Vec<u8>) -> String {
        let name = unique_name(&sanitize_name(file_name), &mut self.used);
        self.files.push((name.clone(), bytes));
        name
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Serialize `patch` and every file into zip bytes.
    pub fn finish(self, patch: &Patch) -> Result<Vec<u8>, ExportError> {
        let patch_json = serde_json::to_vec_pretty(patch)?;
        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        zip.start_file(format!("{}/{PATCH_FILE_NAME}", self.preset_dir), options)?;
        zip.write_all(&patch_json)?;
        for (name, bytes) in &self.files {
            zip.start_file(format!("{}/{name}", self.preset_dir), options)?;
            zip.write_all(bytes)?;
        }
        Ok(zip.finish()?.into_inner())
    }
}

/// Replace characters that are unsafe in archive paths.
pub fn sanitize_name(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let cleaned = cleaned.trim_matches('.').to_string();
    if cleaned.is_empty() {
        "Untitled".to_string()
    } else {
        cleaned
    }
}

/// Suffix `-2`, `-3`, ... before the extension until the name is unused.
///
/// Names are compared case-insensitively.
pub fn unique_name(name: &str, used: &mut HashSet<String>) -> String {
    if used.insert(name.to_lowercase()) {
        return name.to_string();
    }
    let path = Path::new(name);
    let stem = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or(name);
    let extension = path.extension().and_then(|ext| ext.to_str());
    let mut counter = 2;
    loop {
        let candidate = match extension {
            Some(ext) => format!("{stem}-{counter}.{ext}"),
            None => format!("{stem}-{counter}"),
        };
        if used.insert(candidate.to_lowercase()) {
            return candidate;
        }
        counter += 1;
    }
}
