//! The rack being edited: key assignments, per-sample edits and the saved rack
//! backing it.

use std::collections::HashMap;
use std::path::PathBuf;

use rand::Rng;
use thiserror::Error;
use tracing::{info, warn};

use crate::analyzer::{AnalyzeError, SampleAnalyzer};
use crate::audio::{DecodeError, DecodedAudio, decode_file};
use crate::audition::{Audition, PlaybackError};
use crate::automap::{AutoMapper, filter_by_duration};
use crate::catalog::{CatalogError, CatalogStore, DirectoryId, DrumRack, RackId, Sample, SampleId};
use crate::export::{EditParams, ExportError, ExportedPreset, PresetExporter};
use crate::layout::{KEY_COUNT, Key, default_keys, key_index};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Unknown key {0}")]
    UnknownKey(String),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Analyze(#[from] AnalyzeError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error(transparent)]
    Playback(#[from] PlaybackError),
}

/// What was dropped onto a key.
#[derive(Debug, Clone, PartialEq)]
pub enum DragPayload {
    /// A catalog folder; its samples are auto-mapped across the layout.
    Folder {
        directory_id: DirectoryId,
        /// Relative folder path; empty for the directory root.
        path: String,
    },
    Sample(SampleId),
}

/// Outcome of an auto-map run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AutoMapReport {
    pub assigned: usize,
    /// Keys whose chosen sample failed to load.
    pub failed: usize,
}

pub struct RackSession {
    keys: Vec<Key>,
    clips: Vec<Option<DecodedAudio>>,
    edits: HashMap<SampleId, EditParams>,
    rack_id: Option<RackId>,
}

impl Default for RackSession {
    fn default() -> Self {
        Self::new()
    }
}

impl RackSession {
    pub fn new() -> Self {
        Self {
            keys: default_keys(),
            clips: vec![None; KEY_COUNT],
            edits: HashMap::new(),
            rack_id: None,
        }
    }

    pub fn keys(&self) -> &[Key] {
        &self.keys
    }

    /// Saved rack that backs this session, if any.
    pub fn rack_id(&self) -> Option<&RackId> {
        self.rack_id.as_ref()
    }

    /// Decoded audio loaded for the key at `index`.
    pub fn clip(&self, index: usize) -> Option<&DecodedAudio> {
        self.clips.get(index).and_then(Option::as_ref)
    }

    /// Assign `sample` to `note`, replacing any previous assignment.
    pub fn assign_sample(&mut self, note: &str, sample: Sample) -> Result<(), SessionError> {
        let index = key_index(note).ok_or_else(|| SessionError::UnknownKey(note.to_string()))?;
        self.keys[index].assigned_sample = Some(sample);
        self.clips[index] = None;
        Ok(())
    }

    pub fn clear_key(&mut self, note: &str) -> Result<Option<Sample>, SessionError> {
        let index = key_index(note).ok_or_else(|| SessionError::UnknownKey(note.to_string()))?;
        self.clips[index] = None;
        Ok(self.keys[index].assigned_sample.take())
    }

    /// Handle a drop on `note`: a sample is assigned to that key, a folder is
    /// auto-mapped across the whole layout.
    pub fn drop_payload<R: Rng>(
        &mut self,
        store: &CatalogStore,
        mapper: &mut AutoMapper<R>,
        note: &str,
        payload: DragPayload,
    ) -> Result<AutoMapReport, SessionError> {
        match payload {
            DragPayload::Sample(id) => {
                let sample = store
                    .get_sample(&id)?
                    .ok_or(CatalogError::SampleNotFound(id))?;
                self.assign_sample(note, sample)?;
                Ok(AutoMapReport {
                    assigned: 1,
                    failed: 0,
                })
            }
            DragPayload::Folder { directory_id, path } => {
                let samples: Vec<Sample> = store
                    .list_samples_in(&directory_id)?
                    .into_iter()
                    .filter(|sample| in_folder(sample, &path))
                    .collect();
                Ok(self.auto_map(store, mapper, &samples))
            }
        }
    }

    /// Auto-map the whole catalog, skipping samples longer than `max_duration_seconds`.
    pub fn auto_map_catalog<R: Rng>(
        &mut self,
        store: &CatalogStore,
        mapper: &mut AutoMapper<R>,
        max_duration_seconds: f64,
    ) -> Result<AutoMapReport, SessionError> {
        let samples = filter_by_duration(&store.list_samples()?, max_duration_seconds);
        Ok(self.auto_map(store, mapper, &samples))
    }

    /// Replace every key with a fresh auto-mapping of `samples`, loading the
    /// chosen files concurrently.
    pub fn auto_map<R: Rng>(
        &mut self,
        store: &CatalogStore,
        mapper: &mut AutoMapper<R>,
        samples: &[Sample],
    ) -> AutoMapReport {
        let picks = mapper.select(samples);
        self.keys = default_keys();
        self.clips = vec![None; KEY_COUNT];

        let mut paths: Vec<Option<PathBuf>> = vec![None; KEY_COUNT];
        let mut report = AutoMapReport::default();
        for (index, pick) in picks.into_iter().enumerate() {
            let Some(sample) = pick else {
                continue;
            };
            match store.get_file(&sample.path, &sample.directory_id) {
                Ok(file) => {
                    paths[index] = Some(file.path);
                    self.keys[index].assigned_sample = Some(sample);
                    self.keys[index].loading = true;
                }
                Err(err) => {
                    warn!(key = %self.keys[index].note, sample = %sample.id, error = %err, "Failed to resolve auto-mapped sample");
                    report.failed += 1;
                }
            }
        }

        let loaded: Vec<Option<Result<DecodedAudio, DecodeError>>> = std::thread::scope(|scope| {
            let handles: Vec<_> = paths
                .iter()
                .map(|path| {
                    path.as_ref()
                        .map(|path| scope.spawn(move || decode_file(path)))
                })
                .collect();
            handles
                .into_iter()
                .map(|handle| {
                    handle.map(|handle| {
                        handle.join().unwrap_or_else(|_| {
                            Err(DecodeError::Codec {
                                name: "auto-map load".to_string(),
                                message: "loader thread panicked".to_string(),
                            })
                        })
                    })
                })
                .collect()
        });

        for (index, result) in loaded.into_iter().enumerate() {
            let key = &mut self.keys[index];
            key.loading = false;
            match result {
                Some(Ok(clip)) => {
                    self.clips[index] = Some(clip);
                    report.assigned += 1;
                }
                Some(Err(err)) => {
                    warn!(key = %key.note, error = %err, "Failed to load auto-mapped sample");
                    key.assigned_sample = None;
                    report.failed += 1;
                }
                None => {}
            }
        }
        info!(assigned = report.assigned, failed = report.failed, "Auto-map finished");
        report
    }

    pub fn set_edit_params(&mut self, id: SampleId, params: EditParams) {
        self.edits.insert(id, params);
    }

    pub fn edit_params(&self, id: &SampleId) -> Option<&EditParams> {
        self.edits.get(id)
    }

    pub fn clear_edit_params(&mut self, id: &SampleId) -> Option<EditParams> {
        self.edits.remove(id)
    }

    /// Analyze a sample and audition it.
    pub fn select_sample(
        &self,
        store: &CatalogStore,
        audition: &mut Audition,
        id: &SampleId,
    ) -> Result<Sample, SessionError> {
        let sample = SampleAnalyzer::new().analyze(store, id)?;
        let file = store.get_file(&sample.path, &sample.directory_id)?;
        audition.play(id.clone(), &decode_file(&file.path)?)?;
        Ok(sample)
    }

    /// Save the keys into the backing rack, creating it on first save.
    pub fn save_rack(&mut self, store: &CatalogStore, name: &str) -> Result<DrumRack, SessionError> {
        if let Some(id) = &self.rack_id
            && let Some(mut rack) = store.get_rack(id)?
        {
            rack.name = name.to_string();
            rack.configuration.keys = self.keys.clone();
            return Ok(store.update_rack(rack)?);
        }
        let rack = store.add_rack(name, self.keys.clone())?;
        self.rack_id = Some(rack.id.clone());
        Ok(rack)
    }

    /// Replace the session with a saved rack. Edits and loaded clips are dropped.
    pub fn load_rack(&mut self, store: &CatalogStore, id: &RackId) -> Result<DrumRack, SessionError> {
        let rack = store
            .get_rack(id)?
            .ok_or_else(|| CatalogError::RackNotFound(id.clone()))?;
        self.keys = rack.configuration.keys.clone();
        self.clips = vec![None; KEY_COUNT];
        self.edits.clear();
        self.rack_id = Some(rack.id.clone());
        Ok(rack)
    }

    pub fn delete_rack(&mut self, store: &CatalogStore, id: &RackId) -> Result<bool, SessionError> {
        let removed = store.remove_rack(id)?;
        if self.rack_id.as_ref() == Some(id) {
            self.rack_id = None;
        }
        Ok(removed)
    }

    /// Delete a sample from the catalog and unassign it everywhere.
    pub fn delete_sample(&mut self, store: &CatalogStore, id: &SampleId) -> Result<bool, SessionError> {
        let removed = store.remove_sample(id)?;
        self.unassign_where(|sample| &sample.id == id);
        self.edits.remove(id);
        Ok(removed)
    }

    /// Remove a directory with its samples and unassign keys that used them.
    pub fn delete_directory(
        &mut self,
        store: &mut CatalogStore,
        id: &DirectoryId,
    ) -> Result<usize, SessionError> {
        let removed = store.remove_directory(id)?;
        self.unassign_where(|sample| &sample.directory_id == id);
        Ok(removed)
    }

    fn unassign_where(&mut self, matches: impl Fn(&Sample) -> bool) {
        for (key, clip) in self.keys.iter_mut().zip(self.clips.iter_mut()) {
            if key.assigned_sample.as_ref().is_some_and(&matches) {
                key.assigned_sample = None;
                *clip = None;
            }
        }
    }

    /// Export the keys as a preset archive.
    ///
    /// The first download of an unsaved session saves a rack named after the
    /// preset; later downloads reuse it. The rack is saved before the export
    /// runs and stays saved if the export fails.
    pub fn download_preset(
        &mut self,
        store: &CatalogStore,
        preset_name: &str,
    ) -> Result<ExportedPreset, SessionError> {
        if self.rack_id.is_none() {
            let rack = store.add_rack(preset_name, self.keys.clone())?;
            info!(rack = %rack.id, "Saved rack for download");
            self.rack_id = Some(rack.id);
        }
        PresetExporter::new(store)
            .export(preset_name, &self.keys, &self.edits)
            .map_err(|err| {
                warn!(
                    rack = ?self.rack_id,
                    error = %err,
                    "Preset export failed; the saved rack is kept"
                );
                SessionError::from(err)
            })
    }
}

fn in_folder(sample: &Sample, folder: &str) -> bool {
    let folder = folder.trim_matches('/');
    folder.is_empty()
        || sample.parent_path == folder
        || sample
            .parent_path
            .strip_prefix(folder)
            .is_some_and(|rest| rest.starts_with('/'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{store_with_root, write_hit};
    use tempfile::tempdir;

    fn kit_dir() -> tempfile::TempDir {
        let dir = tempdir().unwrap();
        for name in ["kick 1", "kick 2", "snare 1", "snare 2"] {
            write_hit(&dir.path().join("kit").join(format!("{name}.wav")), 0.2);
        }
        write_hit(&dir.path().join("other").join("clap.wav"), 0.2);
        dir
    }

    #[test]
    fn folder_drop_maps_only_that_folder() {
        let dir = kit_dir();
        let (store, directory) = store_with_root(dir.path());
        let mut session = RackSession::new();
        let mut mapper = AutoMapper::seeded(11);
        let report = session
            .drop_payload(
                &store,
                &mut mapper,
                "F2",
                DragPayload::Folder {
                    directory_id: directory.id.clone(),
                    path: "kit".to_string(),
                },
            )
            .unwrap();
        assert_eq!(report, AutoMapReport { assigned: 4, failed: 0 });
        assert!(session.keys().iter().all(|key| !key.loading));
        assert!(session.clip(0).is_some());
        let names: Vec<_> = session
            .keys()
            .iter()
            .filter_map(|key| key.assigned_sample.as_ref())
            .map(|sample| sample.name.clone())
            .collect();
        assert!(!names.contains(&"clap.wav".to_string()));
    }

    #[test]
    fn failed_loads_leave_keys_unassigned() {
        let dir = kit_dir();
        let (store, _) = store_with_root(dir.path());
        std::fs::write(dir.path().join("kit").join("kick 1.wav"), b"corrupt").unwrap();
        let mut session = RackSession::new();
        let samples = store.list_samples().unwrap();
        let report = session.auto_map(&store, &mut AutoMapper::seeded(2), &samples);
        assert_eq!(report.failed, 1);
        assert_eq!(report.assigned, 4);
        assert!(
            session
                .keys()
                .iter()
                .filter_map(|key| key.assigned_sample.as_ref())
                .all(|sample| sample.name != "kick 1.wav")
        );
    }

    #[test]
    fn sample_drop_replaces_assignment() {
        let dir = kit_dir();
        let (store, _) = store_with_root(dir.path());
        let samples = store.list_samples().unwrap();
        let mut session = RackSession::new();
        let mut mapper = AutoMapper::seeded(0);
        for sample in samples.iter().take(2) {
            session
                .drop_payload(&store, &mut mapper, "C3", DragPayload::Sample(sample.id.clone()))
                .unwrap();
        }
        let index = key_index("C3").unwrap();
        assert_eq!(
            session.keys()[index].assigned_sample.as_ref().map(|s| &s.id),
            Some(&samples[1].id)
        );
        assert!(matches!(
            session.assign_sample("Z9", samples[0].clone()),
            Err(SessionError::UnknownKey(_))
        ));
    }

    #[test]
    fn download_saves_backing_rack_once() {
        let dir = kit_dir();
        let (store, _) = store_with_root(dir.path());
        let mut session = RackSession::new();
        session.auto_map_catalog(&store, &mut AutoMapper::seeded(4), 2.0).unwrap();

        let first = session.download_preset(&store, "Demo").unwrap();
        assert_eq!(first.file_name, "Demo.zip");
        let rack_id = session.rack_id().cloned().unwrap();
        session.download_preset(&store, "Demo").unwrap();
        assert_eq!(session.rack_id(), Some(&rack_id));
        assert_eq!(store.list_racks().unwrap().len(), 1);
    }

    #[test]
    fn rack_save_load_and_delete() {
        let dir = kit_dir();
        let (store, _) = store_with_root(dir.path());
        let sample = store.list_samples().unwrap().remove(0);
        let mut session = RackSession::new();
        session.assign_sample("F2", sample.clone()).unwrap();
        session.set_edit_params(sample.id.clone(), EditParams::full(0.2));
        let saved = session.save_rack(&store, "First").unwrap();
        let resaved = session.save_rack(&store, "Renamed").unwrap();
        assert_eq!(saved.id, resaved.id);
        assert!(resaved.updated_at.is_some());

        let mut other = RackSession::new();
        let loaded = other.load_rack(&store, &saved.id).unwrap();
        assert_eq!(loaded.name, "Renamed");
        assert_eq!(other.keys()[0].assigned_sample.as_ref(), Some(&sample));
        assert!(other.edit_params(&sample.id).is_none());

        assert!(other.delete_rack(&store, &saved.id).unwrap());
        assert!(other.rack_id().is_none());
    }

    #[test]
    fn deleting_catalog_entries_unassigns_keys() {
        let dir = kit_dir();
        let (mut store, directory) = store_with_root(dir.path());
        let samples = store.list_samples().unwrap();
        let mut session = RackSession::new();
        session.assign_sample("F2", samples[0].clone()).unwrap();
        session.assign_sample("G2", samples[1].clone()).unwrap();

        assert!(session.delete_sample(&store, &samples[0].id).unwrap());
        assert!(session.keys()[0].assigned_sample.is_none());
        assert!(session.keys()[2].assigned_sample.is_some());

        session.delete_directory(&mut store, &directory.id).unwrap();
        assert!(session.keys().iter().all(|key| key.assigned_sample.is_none()));
    }

    #[test]
    fn selecting_a_sample_analyzes_and_auditions() {
        let dir = kit_dir();
        let (store, _) = store_with_root(dir.path());
        let sample = store.list_samples().unwrap().remove(0);
        let mut audition = Audition::silent();
        let analyzed = RackSession::new()
            .select_sample(&store, &mut audition, &sample.id)
            .unwrap();
        assert!(!analyzed.is_pending_analysis());
        assert_eq!(analyzed.peaks.as_ref().map(Vec::len), Some(100));
        assert_eq!(audition.current(), Some(&sample.id));
    }
}
