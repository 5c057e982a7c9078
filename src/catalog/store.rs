use std::collections::{HashMap, HashSet};
use std::path::{Component, Path, PathBuf};

use tracing::{info, warn};

use super::{
    AudioDetails, CatalogDatabase, CatalogError, Directory, DirectoryAccess, DirectoryId,
    DrumRack, PermissionState, RackConfiguration, RackId, Sample, SampleId, now_millis,
};
use crate::layout::Key;
use crate::scanner::{ScanReport, Scanner};

/// A file resolved from a cached directory root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleFile {
    pub path: PathBuf,
    pub name: String,
}

impl SampleFile {
    /// Read the whole file into memory.
    pub fn read(&self) -> std::io::Result<Vec<u8>> {
        std::fs::read(&self.path)
    }
}

/// Catalog of granted directories, their samples and saved racks.
///
/// Roots validated during this session are kept in a handle cache; file access
/// only goes through cached roots.
pub struct CatalogStore {
    db: CatalogDatabase,
    access: Box<dyn DirectoryAccess>,
    scanner: Scanner,
    handles: HashMap<DirectoryId, PathBuf>,
}

impl CatalogStore {
    /// Open (or create) the catalog database at `path`.
    pub fn open(
        path: impl AsRef<Path>,
        access: impl DirectoryAccess + 'static,
        scanner: Scanner,
    ) -> Result<Self, CatalogError> {
        let db = CatalogDatabase::open(path)?;
        Ok(Self::with_database(db, access, scanner))
    }

    pub fn open_in_memory(
        access: impl DirectoryAccess + 'static,
        scanner: Scanner,
    ) -> Result<Self, CatalogError> {
        let db = CatalogDatabase::open_in_memory()?;
        Ok(Self::with_database(db, access, scanner))
    }

    fn with_database(
        db: CatalogDatabase,
        access: impl DirectoryAccess + 'static,
        scanner: Scanner,
    ) -> Self {
        Self {
            db,
            access: Box::new(access),
            scanner,
            handles: HashMap::new(),
        }
    }

    pub fn close(self) -> Result<(), CatalogError> {
        self.db.close()
    }

    /// Scanner used for directory scans; subscribe to its events for progress.
    pub fn scanner(&self) -> &Scanner {
        &self.scanner
    }

    /// True when the root of `id` was validated in this session.
    pub fn is_cached(&self, id: &DirectoryId) -> bool {
        self.handles.contains_key(id)
    }

    /// List every stored directory after re-checking access to its root.
    pub fn list_directories(&mut self) -> Result<Vec<Directory>, CatalogError> {
        let mut directories = self.db.list_directories()?;
        for directory in &mut directories {
            let permission = self.access.query_permission(&directory.path);
            if permission == PermissionState::Granted {
                self.handles
                    .insert(directory.id.clone(), directory.path.clone());
            } else if self.handles.remove(&directory.id).is_some() {
                info!(directory = %directory.id, "Directory access revoked");
            }
            if permission != directory.permission {
                self.db.update_directory_access(
                    &directory.id,
                    permission,
                    directory.last_accessed_at,
                )?;
                directory.permission = permission;
            }
        }
        Ok(directories)
    }

    /// Ask the access layer for a new directory and catalogue it.
    ///
    /// Returns `Ok(None)` when the picker is dismissed.
    pub fn add_directory(&mut self) -> Result<Option<Directory>, CatalogError> {
        let Some(path) = self.access.pick_directory() else {
            return Ok(None);
        };
        self.add_directory_at(&path).map(Some)
    }

    /// Catalogue a known directory: persist it, scan it and store its one-shots.
    pub fn add_directory_at(&mut self, path: &Path) -> Result<Directory, CatalogError> {
        let permission = self.access.request_permission(path);
        if permission != PermissionState::Granted {
            return Err(CatalogError::PermissionDenied(path.to_path_buf()));
        }
        let report = self.scanner.scan(path)?;
        let directory = Directory {
            id: DirectoryId::new(),
            name: directory_name(path),
            path: path.to_path_buf(),
            last_accessed_at: now_millis(),
            permission,
        };
        self.db.insert_directory(&directory)?;
        self.handles
            .insert(directory.id.clone(), directory.path.clone());
        let stored = self.store_report(&directory.id, &report, false)?;
        info!(
            directory = %directory.id,
            path = %path.display(),
            samples = stored,
            "Directory added"
        );
        Ok(directory)
    }

    /// Delete a directory and all of its samples; returns the samples removed.
    pub fn remove_directory(&mut self, id: &DirectoryId) -> Result<usize, CatalogError> {
        let removed = self.db.delete_directory_cascade(id)?;
        self.handles.remove(id);
        Ok(removed)
    }

    /// Prompt again for a stored directory, then rescan and reconcile its samples.
    pub fn request_permission(&mut self, id: &DirectoryId) -> Result<Directory, CatalogError> {
        let mut directory = self
            .db
            .get_directory(id)?
            .ok_or_else(|| CatalogError::DirectoryNotFound(id.clone()))?;
        let permission = self.access.request_permission(&directory.path);
        let now = now_millis();
        self.db.update_directory_access(id, permission, now)?;
        directory.permission = permission;
        directory.last_accessed_at = now;
        if permission != PermissionState::Granted {
            self.handles.remove(id);
            return Err(CatalogError::PermissionDenied(directory.path));
        }
        self.handles.insert(id.clone(), directory.path.clone());
        let report = self.scanner.scan(&directory.path)?;
        self.store_report(id, &report, true)?;
        Ok(directory)
    }

    fn store_report(
        &self,
        id: &DirectoryId,
        report: &ScanReport,
        prune: bool,
    ) -> Result<usize, CatalogError> {
        let mut batch = self.db.write_batch()?;
        for scanned in &report.accepted {
            batch.upsert_sample(&scanned.name, &scanned.relative_path, id, &scanned.details)?;
        }
        if prune {
            let keep: HashSet<String> = report
                .accepted
                .iter()
                .map(|scanned| scanned.relative_path.clone())
                .chain(report.failed.iter().cloned())
                .collect();
            let removed = batch.prune_samples(id, &keep)?;
            if removed > 0 {
                info!(directory = %id, removed, "Pruned samples missing from rescan");
            }
        }
        batch.commit()?;
        Ok(report.accepted.len())
    }

    /// Insert a sample or merge `details` into the existing `(directory_id, path)` row.
    pub fn upsert_sample(
        &self,
        file_name: &str,
        path: &str,
        directory_id: &DirectoryId,
        details: &AudioDetails,
    ) -> Result<Sample, CatalogError> {
        if self.db.get_directory(directory_id)?.is_none() {
            return Err(CatalogError::DirectoryNotFound(directory_id.clone()));
        }
        self.db
            .upsert_sample(file_name, path, directory_id, details)
    }

    /// Merge analysis results into a stored sample.
    pub fn update_sample_analysis(
        &self,
        id: &SampleId,
        details: &AudioDetails,
    ) -> Result<Sample, CatalogError> {
        let mut sample = self
            .db
            .get_sample(id)?
            .ok_or_else(|| CatalogError::SampleNotFound(id.clone()))?;
        sample.merge_details(details);
        self.db.write_sample(&sample)?;
        Ok(sample)
    }

    pub fn list_samples(&self) -> Result<Vec<Sample>, CatalogError> {
        self.db.list_samples()
    }

    pub fn list_samples_in(&self, directory_id: &DirectoryId) -> Result<Vec<Sample>, CatalogError> {
        self.db.list_samples_in(directory_id)
    }

    pub fn get_sample(&self, id: &SampleId) -> Result<Option<Sample>, CatalogError> {
        self.db.get_sample(id)
    }

    pub fn remove_sample(&self, id: &SampleId) -> Result<bool, CatalogError> {
        self.db.delete_sample(id)
    }

    /// Resolve `path` under the cached root of `directory_id`, one component at a time.
    pub fn get_file(
        &self,
        path: &str,
        directory_id: &DirectoryId,
    ) -> Result<SampleFile, CatalogError> {
        let root = self
            .handles
            .get(directory_id)
            .ok_or_else(|| CatalogError::DirectoryNotCached(directory_id.clone()))?;
        let not_found = || CatalogError::FileNotFound {
            path: path.to_string(),
            directory: directory_id.clone(),
        };
        let parts: Vec<&std::ffi::OsStr> = Path::new(path)
            .components()
            .filter_map(|component| match component {
                Component::CurDir => None,
                Component::Normal(part) => Some(Ok(part)),
                _ => Some(Err(())),
            })
            .collect::<Result<_, _>>()
            .map_err(|_| CatalogError::InvalidPath(path.to_string()))?;
        let Some((file_part, dir_parts)) = parts.split_last() else {
            return Err(CatalogError::InvalidPath(path.to_string()));
        };
        let mut current = root.clone();
        for part in dir_parts {
            current.push(part);
            if !current.is_dir() {
                return Err(not_found());
            }
        }
        current.push(file_part);
        if !current.is_file() {
            warn!(path = %current.display(), "Catalogued file is missing on disk");
            return Err(not_found());
        }
        Ok(SampleFile {
            name: file_part.to_string_lossy().into_owned(),
            path: current,
        })
    }

    pub fn list_racks(&self) -> Result<Vec<DrumRack>, CatalogError> {
        self.db.list_racks()
    }

    /// Save a new rack holding a snapshot of `keys`.
    pub fn add_rack(&self, name: &str, keys: Vec<Key>) -> Result<DrumRack, CatalogError> {
        let rack = DrumRack {
            id: RackId::new(),
            name: name.to_string(),
            configuration: RackConfiguration { keys },
            created_at: now_millis(),
            updated_at: None,
        };
        self.db.insert_rack(&rack)?;
        Ok(rack)
    }

    /// Overwrite an existing rack, stamping `updated_at`.
    pub fn update_rack(&self, mut rack: DrumRack) -> Result<DrumRack, CatalogError> {
        rack.updated_at = Some(now_millis());
        self.db.update_rack(&rack)?;
        Ok(rack)
    }

    pub fn remove_rack(&self, id: &RackId) -> Result<bool, CatalogError> {
        self.db.delete_rack(id)
    }

    pub fn get_rack(&self, id: &RackId) -> Result<Option<DrumRack>, CatalogError> {
        self.db.get_rack(id)
    }
}

fn directory_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::default_keys;
    use crate::test_support;
    use std::cell::Cell;
    use std::fs;
    use std::rc::Rc;
    use tempfile::tempdir;

    /// Access double with a scripted picker and a switchable grant.
    struct ScriptedAccess {
        pick: Option<PathBuf>,
        granted: Rc<Cell<bool>>,
    }

    impl DirectoryAccess for ScriptedAccess {
        fn pick_directory(&mut self) -> Option<PathBuf> {
            self.pick.take()
        }

        fn query_permission(&self, _root: &Path) -> PermissionState {
            if self.granted.get() {
                PermissionState::Granted
            } else {
                PermissionState::Denied
            }
        }
    }

    fn store_with(pick: Option<PathBuf>) -> (CatalogStore, Rc<Cell<bool>>) {
        let granted = Rc::new(Cell::new(true));
        let access = ScriptedAccess {
            pick,
            granted: Rc::clone(&granted),
        };
        let store = CatalogStore::open_in_memory(access, Scanner::default()).unwrap();
        (store, granted)
    }

    fn write_hit(path: &Path) {
        test_support::write_hit(path, 0.4);
    }

    #[test]
    fn cancelled_picker_adds_nothing() {
        let (mut store, _) = store_with(None);
        assert!(store.add_directory().unwrap().is_none());
        assert!(store.list_directories().unwrap().is_empty());
    }

    #[test]
    fn added_directory_is_scanned_and_readable() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("kit")).unwrap();
        write_hit(&dir.path().join("kit").join("kick.wav"));
        write_hit(&dir.path().join("snare.wav"));

        let (mut store, _) = store_with(Some(dir.path().to_path_buf()));
        let directory = store.add_directory().unwrap().unwrap();
        assert!(directory.has_permission());
        let samples = store.list_samples_in(&directory.id).unwrap();
        assert_eq!(samples.len(), 2);

        let file = store.get_file("kit/kick.wav", &directory.id).unwrap();
        assert_eq!(file.name, "kick.wav");
        assert_eq!(
            file.read().unwrap(),
            fs::read(dir.path().join("kit").join("kick.wav")).unwrap()
        );
    }

    #[test]
    fn get_file_rejects_escapes_and_missing_files() {
        let dir = tempdir().unwrap();
        write_hit(&dir.path().join("kick.wav"));
        let (mut store, _) = store_with(None);
        let directory = store.add_directory_at(dir.path()).unwrap();

        assert!(matches!(
            store.get_file("../kick.wav", &directory.id),
            Err(CatalogError::InvalidPath(_))
        ));
        assert!(matches!(
            store.get_file("nested/kick.wav", &directory.id),
            Err(CatalogError::FileNotFound { .. })
        ));
        assert!(matches!(
            store.get_file("kick.wav", &DirectoryId::new()),
            Err(CatalogError::DirectoryNotCached(_))
        ));
    }

    #[test]
    fn revoked_permission_evicts_handle() {
        let dir = tempdir().unwrap();
        write_hit(&dir.path().join("kick.wav"));
        let (mut store, granted) = store_with(None);
        let directory = store.add_directory_at(dir.path()).unwrap();
        assert!(store.is_cached(&directory.id));

        granted.set(false);
        let listed = store.list_directories().unwrap();
        assert!(!listed[0].has_permission());
        assert!(!store.is_cached(&directory.id));
        assert!(matches!(
            store.get_file("kick.wav", &directory.id),
            Err(CatalogError::DirectoryNotCached(_))
        ));
        assert!(matches!(
            store.request_permission(&directory.id),
            Err(CatalogError::PermissionDenied(_))
        ));

        granted.set(true);
        store.request_permission(&directory.id).unwrap();
        assert!(store.get_file("kick.wav", &directory.id).is_ok());
    }

    #[test]
    fn rescan_reconciles_samples() {
        let dir = tempdir().unwrap();
        write_hit(&dir.path().join("kick.wav"));
        write_hit(&dir.path().join("snare.wav"));
        let (mut store, _) = store_with(None);
        let directory = store.add_directory_at(dir.path()).unwrap();
        let kick_before = store
            .list_samples()
            .unwrap()
            .into_iter()
            .find(|sample| sample.name == "kick.wav")
            .unwrap();

        fs::remove_file(dir.path().join("snare.wav")).unwrap();
        write_hit(&dir.path().join("clap.wav"));
        store.request_permission(&directory.id).unwrap();

        let mut names: Vec<_> = store
            .list_samples_in(&directory.id)
            .unwrap()
            .into_iter()
            .map(|sample| sample.name)
            .collect();
        names.sort();
        assert_eq!(names, vec!["clap.wav", "kick.wav"]);
        let kick_after = store.get_sample(&kick_before.id).unwrap().unwrap();
        assert_eq!(kick_after.created_at, kick_before.created_at);
    }

    #[test]
    fn rescan_keeps_undecodable_files_still_on_disk() {
        let dir = tempdir().unwrap();
        write_hit(&dir.path().join("kick.wav"));
        write_hit(&dir.path().join("snare.wav"));
        let (mut store, _) = store_with(None);
        let directory = store.add_directory_at(dir.path()).unwrap();
        let snare = store
            .list_samples_in(&directory.id)
            .unwrap()
            .into_iter()
            .find(|sample| sample.name == "snare.wav")
            .unwrap();
        store
            .update_sample_analysis(
                &snare.id,
                &AudioDetails {
                    rms_db: Some(-12.0),
                    ..AudioDetails::default()
                },
            )
            .unwrap();

        fs::write(dir.path().join("snare.wav"), b"not a wav any more").unwrap();
        store.request_permission(&directory.id).unwrap();

        assert_eq!(store.list_samples_in(&directory.id).unwrap().len(), 2);
        let kept = store.get_sample(&snare.id).unwrap().unwrap();
        assert_eq!(kept.rms_db, Some(-12.0));
        assert_eq!(kept.created_at, snare.created_at);
    }

    #[test]
    fn removing_directory_cascades() {
        let dir = tempdir().unwrap();
        write_hit(&dir.path().join("kick.wav"));
        let (mut store, _) = store_with(None);
        let directory = store.add_directory_at(dir.path()).unwrap();
        assert_eq!(store.remove_directory(&directory.id).unwrap(), 1);
        assert!(store.list_samples().unwrap().is_empty());
        assert!(!store.is_cached(&directory.id));
        assert!(matches!(
            store.remove_directory(&directory.id),
            Err(CatalogError::DirectoryNotFound(_))
        ));
    }

    #[test]
    fn analysis_updates_require_known_sample() {
        let (store, _) = store_with(None);
        let err = store
            .update_sample_analysis(&SampleId::new(), &AudioDetails::default())
            .unwrap_err();
        assert!(err.is_not_found());
        let err = store
            .upsert_sample("kick.wav", "kick.wav", &DirectoryId::new(), &AudioDetails::default())
            .unwrap_err();
        assert!(matches!(err, CatalogError::DirectoryNotFound(_)));
    }

    #[test]
    fn rack_crud_round_trips() {
        let (store, _) = store_with(None);
        let rack = store.add_rack("Kit", default_keys()).unwrap();
        assert!(rack.updated_at.is_none());

        let mut renamed = rack.clone();
        renamed.name = "Kit 2".to_string();
        let updated = store.update_rack(renamed).unwrap();
        assert!(updated.updated_at.is_some());
        assert_eq!(store.get_rack(&rack.id).unwrap().unwrap().name, "Kit 2");

        assert!(matches!(
            store.add_rack("Short", default_keys().into_iter().take(3).collect()),
            Err(CatalogError::InvalidRack {
                expected: 24,
                found: 3
            })
        ));
        assert!(store.remove_rack(&rack.id).unwrap());
        assert!(store.list_racks().unwrap().is_empty());
    }
}
