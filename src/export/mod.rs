//! Packaging of the key layout into a zipped OP-XY drum preset.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{info, warn};

use crate::audio::{DecodeError, EncodeError, decode_file, encode_wav_16};
use crate::catalog::{CatalogError, CatalogStore, SampleId};
use crate::layout::Key;

mod archive;
mod edit;
mod patch;

pub use archive::{PATCH_FILE_NAME, PresetArchive, sanitize_name, unique_name};
pub use edit::{EditParams, apply_edits};
pub use patch::{Patch, Region};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Sample {0} no longer exists")]
    DanglingSample(SampleId),
    #[error("Key {0} has no MIDI note")]
    UnknownNote(String),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error("Failed to encode audio: {0}")]
    Encode(#[from] EncodeError),
    #[error("Failed to serialize patch: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Failed to write archive: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Finished preset archive.
#[derive(Debug, Clone)]
pub struct ExportedPreset {
    /// Suggested download name, `<preset>.zip`.
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub patch: Patch,
    /// Assigned keys left out because their sample could not be exported.
    pub skipped: usize,
}

impl ExportedPreset {
    /// Write the archive into `dir`, returning the full path.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf, ExportError> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(&self.file_name);
        std::fs::write(&path, &self.bytes)?;
        Ok(path)
    }
}

/// Builds preset archives from the catalog's files.
pub struct PresetExporter<'a> {
    store: &'a CatalogStore,
}

struct ExportedFile {
    name: String,
    bytes: Vec<u8>,
    frames: u64,
}

impl<'a> PresetExporter<'a> {
    pub fn new(store: &'a CatalogStore) -> Self {
        Self { store }
    }

    /// Export every assigned key. Keys whose sample fails are logged and left out.
    pub fn export(
        &self,
        preset_name: &str,
        keys: &[Key],
        edits: &HashMap<SampleId, EditParams>,
    ) -> Result<ExportedPreset, ExportError> {
        let mut archive = PresetArchive::new(preset_name);
        let mut regions = Vec::new();
        let mut skipped = 0;
        for key in keys {
            let Some(sample) = &key.assigned_sample else {
                continue;
            };
            let result = key
                .midi_note()
                .ok_or_else(|| ExportError::UnknownNote(key.note.clone()))
                .and_then(|note| Ok((note, self.export_file(&sample.id, edits)?)));
            match result {
                Ok((note, file)) => {
                    let stored_as = archive.add_file(&file.name, file.bytes);
                    regions.push(Region::one_shot(note, &stored_as, file.frames));
                }
                Err(err) => {
                    warn!(key = %key.note, sample = %sample.id, error = %err, "Skipping key in export");
                    skipped += 1;
                }
            }
        }
        let patch = Patch::drum(regions);
        let bytes = archive.finish(&patch)?;
        info!(
            preset = preset_name,
            regions = patch.regions.len(),
            skipped,
            "Preset exported"
        );
        Ok(ExportedPreset {
            file_name: format!("{}.zip", sanitize_name(preset_name)),
            bytes,
            patch,
            skipped,
        })
    }

    fn export_file(
        &self,
        id: &SampleId,
        edits: &HashMap<SampleId, EditParams>,
    ) -> Result<ExportedFile, ExportError> {
        let sample = self
            .store
            .get_sample(id)?
            .ok_or_else(|| ExportError::DanglingSample(id.clone()))?;
        let file = self.store.get_file(&sample.path, &sample.directory_id)?;
        let decoded = decode_file(&file.path)?;
        match edits.get(id) {
            Some(params) => {
                let edited = apply_edits(&decoded, params);
                let stem = Path::new(&file.name)
                    .file_stem()
                    .map(|stem| stem.to_string_lossy().into_owned())
                    .unwrap_or_else(|| file.name.clone());
                Ok(ExportedFile {
                    name: format!("{stem}.wav"),
                    frames: edited.frame_count() as u64,
                    bytes: encode_wav_16(&edited)?,
                })
            }
            None => Ok(ExportedFile {
                frames: decoded.frame_count() as u64,
                bytes: file.read()?,
                name: file.name,
            }),
        }
    }
}
