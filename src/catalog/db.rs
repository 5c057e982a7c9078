use std::collections::HashSet;
use std::path::{Path, PathBuf};

use rusqlite::{Connection, OptionalExtension, Row, Transaction, params, types::Type};

use super::{
    AudioDetails, CatalogError, Directory, DirectoryId, DrumRack, PermissionState,
    RackConfiguration, RackId, Sample, SampleId,
};
use crate::layout::KEY_COUNT;

/// Default filename for the catalog database.
pub const DB_FILE_NAME: &str = "rackpack.db";

const SAMPLE_COLUMNS: &str = "id, directory_id, name, path, parent_path, duration_seconds, channels,
     sample_rate, rms_db, peaks_json, created_at";

/// SQLite wrapper holding directories, samples and racks.
pub struct CatalogDatabase {
    connection: Connection,
}

impl CatalogDatabase {
    /// Open (or create) the database file at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        create_parent_if_needed(path)?;
        let connection = Connection::open(path).map_err(map_sql_error)?;
        Self::from_connection(connection)
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self, CatalogError> {
        let connection = Connection::open_in_memory().map_err(map_sql_error)?;
        Self::from_connection(connection)
    }

    fn from_connection(connection: Connection) -> Result<Self, CatalogError> {
        let db = Self { connection };
        db.apply_pragmas()?;
        db.apply_schema()?;
        Ok(db)
    }

    /// Close the connection, surfacing any error SQLite reports while flushing.
    pub fn close(self) -> Result<(), CatalogError> {
        self.connection
            .close()
            .map_err(|(_, err)| map_sql_error(err))
    }

    pub fn insert_directory(&self, directory: &Directory) -> Result<(), CatalogError> {
        self.connection
            .prepare_cached(
                "INSERT INTO directories (id, name, path, last_accessed_at, permission)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )
            .map_err(map_sql_error)?
            .execute(params![
                directory.id.as_str(),
                directory.name,
                directory.path.to_string_lossy(),
                directory.last_accessed_at,
                directory.permission.as_str(),
            ])
            .map_err(map_sql_error)?;
        Ok(())
    }

    /// Record the latest permission check for a directory.
    pub fn update_directory_access(
        &self,
        id: &DirectoryId,
        permission: PermissionState,
        last_accessed_at: i64,
    ) -> Result<(), CatalogError> {
        let changed = self
            .connection
            .prepare_cached(
                "UPDATE directories SET permission = ?1, last_accessed_at = ?2 WHERE id = ?3",
            )
            .map_err(map_sql_error)?
            .execute(params![permission.as_str(), last_accessed_at, id.as_str()])
            .map_err(map_sql_error)?;
        if changed == 0 {
            return Err(CatalogError::DirectoryNotFound(id.clone()));
        }
        Ok(())
    }

    pub fn list_directories(&self) -> Result<Vec<Directory>, CatalogError> {
        let mut stmt = self
            .connection
            .prepare(
                "SELECT id, name, path, last_accessed_at, permission
                 FROM directories ORDER BY name ASC, id ASC",
            )
            .map_err(map_sql_error)?;
        let rows = stmt
            .query_map([], directory_from_row)
            .map_err(map_sql_error)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(map_sql_error)?;
        Ok(rows)
    }

    pub fn get_directory(&self, id: &DirectoryId) -> Result<Option<Directory>, CatalogError> {
        self.connection
            .query_row(
                "SELECT id, name, path, last_accessed_at, permission
                 FROM directories WHERE id = ?1",
                params![id.as_str()],
                directory_from_row,
            )
            .optional()
            .map_err(map_sql_error)
    }

    /// Delete a directory and every sample it owns in one transaction.
    ///
    /// Returns the number of samples removed.
    pub fn delete_directory_cascade(&self, id: &DirectoryId) -> Result<usize, CatalogError> {
        let tx = self
            .connection
            .unchecked_transaction()
            .map_err(map_sql_error)?;
        let removed_samples = tx
            .execute(
                "DELETE FROM samples WHERE directory_id = ?1",
                params![id.as_str()],
            )
            .map_err(map_sql_error)?;
        let removed_dirs = tx
            .execute("DELETE FROM directories WHERE id = ?1", params![id.as_str()])
            .map_err(map_sql_error)?;
        if removed_dirs == 0 {
            // Dropping the transaction rolls back the sample deletes.
            return Err(CatalogError::DirectoryNotFound(id.clone()));
        }
        tx.commit().map_err(map_sql_error)?;
        Ok(removed_samples)
    }

    /// Insert or merge a sample keyed by `(directory_id, path)`.
    pub fn upsert_sample(
        &self,
        name: &str,
        path: &str,
        directory_id: &DirectoryId,
        details: &AudioDetails,
    ) -> Result<Sample, CatalogError> {
        upsert_sample_on(&self.connection, name, path, directory_id, details)
    }

    pub fn find_sample_by_path(
        &self,
        directory_id: &DirectoryId,
        path: &str,
    ) -> Result<Option<Sample>, CatalogError> {
        find_sample_by_path_on(&self.connection, directory_id, path)
    }

    pub fn get_sample(&self, id: &SampleId) -> Result<Option<Sample>, CatalogError> {
        self.connection
            .query_row(
                &format!("SELECT {SAMPLE_COLUMNS} FROM samples WHERE id = ?1"),
                params![id.as_str()],
                sample_from_row,
            )
            .optional()
            .map_err(map_sql_error)
    }

    /// Persist every field of an existing sample row.
    pub fn write_sample(&self, sample: &Sample) -> Result<(), CatalogError> {
        write_sample_on(&self.connection, sample)
    }

    pub fn list_samples(&self) -> Result<Vec<Sample>, CatalogError> {
        let mut stmt = self
            .connection
            .prepare(&format!(
                "SELECT {SAMPLE_COLUMNS} FROM samples ORDER BY directory_id ASC, path ASC"
            ))
            .map_err(map_sql_error)?;
        let rows = stmt
            .query_map([], sample_from_row)
            .map_err(map_sql_error)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(map_sql_error)?;
        Ok(rows)
    }

    pub fn list_samples_in(&self, directory_id: &DirectoryId) -> Result<Vec<Sample>, CatalogError> {
        let mut stmt = self
            .connection
            .prepare(&format!(
                "SELECT {SAMPLE_COLUMNS} FROM samples WHERE directory_id = ?1 ORDER BY path ASC"
            ))
            .map_err(map_sql_error)?;
        let rows = stmt
            .query_map(params![directory_id.as_str()], sample_from_row)
            .map_err(map_sql_error)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(map_sql_error)?;
        Ok(rows)
    }

    /// Remove a sample row; returns false when it did not exist.
    pub fn delete_sample(&self, id: &SampleId) -> Result<bool, CatalogError> {
        let removed = self
            .connection
            .execute("DELETE FROM samples WHERE id = ?1", params![id.as_str()])
            .map_err(map_sql_error)?;
        Ok(removed > 0)
    }

    pub fn insert_rack(&self, rack: &DrumRack) -> Result<(), CatalogError> {
        ensure_rack_len(&rack.configuration)?;
        let keys_json = serde_json::to_string(&rack.configuration)?;
        self.connection
            .prepare_cached(
                "INSERT INTO racks (id, name, configuration_json, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )
            .map_err(map_sql_error)?
            .execute(params![
                rack.id.as_str(),
                rack.name,
                keys_json,
                rack.created_at,
                rack.updated_at
            ])
            .map_err(map_sql_error)?;
        Ok(())
    }

    /// Overwrite an existing rack; fails with `RackNotFound` when the id is unknown.
    pub fn update_rack(&self, rack: &DrumRack) -> Result<(), CatalogError> {
        ensure_rack_len(&rack.configuration)?;
        let keys_json = serde_json::to_string(&rack.configuration)?;
        let changed = self
            .connection
            .prepare_cached(
                "UPDATE racks SET name = ?1, configuration_json = ?2, updated_at = ?3 WHERE id = ?4",
            )
            .map_err(map_sql_error)?
            .execute(params![rack.name, keys_json, rack.updated_at, rack.id.as_str()])
            .map_err(map_sql_error)?;
        if changed == 0 {
            return Err(CatalogError::RackNotFound(rack.id.clone()));
        }
        Ok(())
    }

    pub fn delete_rack(&self, id: &RackId) -> Result<bool, CatalogError> {
        let removed = self
            .connection
            .execute("DELETE FROM racks WHERE id = ?1", params![id.as_str()])
            .map_err(map_sql_error)?;
        Ok(removed > 0)
    }

    pub fn get_rack(&self, id: &RackId) -> Result<Option<DrumRack>, CatalogError> {
        let raw = self
            .connection
            .query_row(
                "SELECT id, name, configuration_json, created_at, updated_at
                 FROM racks WHERE id = ?1",
                params![id.as_str()],
                raw_rack_from_row,
            )
            .optional()
            .map_err(map_sql_error)?;
        raw.map(RawRack::into_rack).transpose()
    }

    pub fn list_racks(&self) -> Result<Vec<DrumRack>, CatalogError> {
        let mut stmt = self
            .connection
            .prepare(
                "SELECT id, name, configuration_json, created_at, updated_at
                 FROM racks ORDER BY created_at ASC, id ASC",
            )
            .map_err(map_sql_error)?;
        let raw = stmt
            .query_map([], raw_rack_from_row)
            .map_err(map_sql_error)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(map_sql_error)?;
        raw.into_iter().map(RawRack::into_rack).collect()
    }

    /// Start a write batch that wraps related mutations in a single transaction.
    pub fn write_batch(&self) -> Result<CatalogWriteBatch<'_>, CatalogError> {
        let tx = self
            .connection
            .unchecked_transaction()
            .map_err(map_sql_error)?;
        Ok(CatalogWriteBatch { tx })
    }

    fn apply_pragmas(&self) -> Result<(), CatalogError> {
        self.connection
            .execute_batch(
                "PRAGMA journal_mode=WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA foreign_keys=ON;
             PRAGMA busy_timeout=5000;
             PRAGMA temp_store=MEMORY;",
            )
            .map_err(map_sql_error)?;
        Ok(())
    }

    fn apply_schema(&self) -> Result<(), CatalogError> {
        self.connection
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS directories (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                path TEXT NOT NULL,
                last_accessed_at INTEGER NOT NULL,
                permission TEXT NOT NULL DEFAULT 'prompt'
            );
             CREATE TABLE IF NOT EXISTS samples (
                id TEXT PRIMARY KEY,
                directory_id TEXT NOT NULL,
                name TEXT NOT NULL,
                path TEXT NOT NULL,
                parent_path TEXT NOT NULL,
                duration_seconds REAL,
                channels INTEGER,
                sample_rate INTEGER,
                rms_db REAL,
                peaks_json TEXT,
                created_at INTEGER NOT NULL,
                UNIQUE(directory_id, path)
            );
             CREATE INDEX IF NOT EXISTS idx_samples_directory ON samples(directory_id);
             CREATE TABLE IF NOT EXISTS racks (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                configuration_json TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER
            );",
            )
            .map_err(map_sql_error)?;
        Ok(())
    }
}

/// Groups scan writes into one transaction using cached statements.
pub struct CatalogWriteBatch<'conn> {
    tx: Transaction<'conn>,
}

impl<'conn> CatalogWriteBatch<'conn> {
    pub fn upsert_sample(
        &mut self,
        name: &str,
        path: &str,
        directory_id: &DirectoryId,
        details: &AudioDetails,
    ) -> Result<Sample, CatalogError> {
        upsert_sample_on(&self.tx, name, path, directory_id, details)
    }

    /// Delete samples of `directory_id` whose path is not in `keep`; returns the count removed.
    pub fn prune_samples(
        &mut self,
        directory_id: &DirectoryId,
        keep: &HashSet<String>,
    ) -> Result<usize, CatalogError> {
        let stale: Vec<String> = {
            let mut stmt = self
                .tx
                .prepare_cached("SELECT path FROM samples WHERE directory_id = ?1")
                .map_err(map_sql_error)?;
            stmt.query_map(params![directory_id.as_str()], |row| row.get::<_, String>(0))
                .map_err(map_sql_error)?
                .collect::<Result<Vec<_>, _>>()
                .map_err(map_sql_error)?
                .into_iter()
                .filter(|path| !keep.contains(path))
                .collect()
        };
        let mut delete = self
            .tx
            .prepare_cached("DELETE FROM samples WHERE directory_id = ?1 AND path = ?2")
            .map_err(map_sql_error)?;
        for path in &stale {
            delete
                .execute(params![directory_id.as_str(), path])
                .map_err(map_sql_error)?;
        }
        Ok(stale.len())
    }

    /// Commit all batched operations atomically.
    pub fn commit(self) -> Result<(), CatalogError> {
        self.tx.commit().map_err(map_sql_error)?;
        Ok(())
    }
}

fn upsert_sample_on(
    conn: &Connection,
    name: &str,
    path: &str,
    directory_id: &DirectoryId,
    details: &AudioDetails,
) -> Result<Sample, CatalogError> {
    let sample = match find_sample_by_path_on(conn, directory_id, path)? {
        Some(mut existing) => {
            existing.name = name.to_string();
            existing.merge_details(details);
            existing
        }
        None => {
            let mut fresh = Sample::new(name, path, directory_id.clone());
            fresh.merge_details(details);
            fresh
        }
    };
    write_sample_on(conn, &sample)?;
    Ok(sample)
}

fn find_sample_by_path_on(
    conn: &Connection,
    directory_id: &DirectoryId,
    path: &str,
) -> Result<Option<Sample>, CatalogError> {
    conn.prepare_cached(&format!(
        "SELECT {SAMPLE_COLUMNS} FROM samples WHERE directory_id = ?1 AND path = ?2"
    ))
    .map_err(map_sql_error)?
    .query_row(params![directory_id.as_str(), path], sample_from_row)
    .optional()
    .map_err(map_sql_error)
}

fn write_sample_on(conn: &Connection, sample: &Sample) -> Result<(), CatalogError> {
    let peaks_json = sample
        .peaks
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;
    conn.prepare_cached(
        "INSERT INTO samples (id, directory_id, name, path, parent_path, duration_seconds,
                              channels, sample_rate, rms_db, peaks_json, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
         ON CONFLICT(id) DO UPDATE SET name = excluded.name,
                                       path = excluded.path,
                                       parent_path = excluded.parent_path,
                                       duration_seconds = excluded.duration_seconds,
                                       channels = excluded.channels,
                                       sample_rate = excluded.sample_rate,
                                       rms_db = excluded.rms_db,
                                       peaks_json = excluded.peaks_json",
    )
    .map_err(map_sql_error)?
    .execute(params![
        sample.id.as_str(),
        sample.directory_id.as_str(),
        sample.name,
        sample.path,
        sample.parent_path,
        sample.duration_seconds,
        sample.channels,
        sample.sample_rate,
        sample.rms_db,
        peaks_json,
        sample.created_at,
    ])
    .map_err(map_sql_error)?;
    Ok(())
}

fn directory_from_row(row: &Row<'_>) -> rusqlite::Result<Directory> {
    let id: String = row.get(0)?;
    let path: String = row.get(2)?;
    let permission: String = row.get(4)?;
    Ok(Directory {
        id: DirectoryId::from_string(id),
        name: row.get(1)?,
        path: PathBuf::from(path),
        last_accessed_at: row.get(3)?,
        permission: PermissionState::from_str_lossy(&permission),
    })
}

fn sample_from_row(row: &Row<'_>) -> rusqlite::Result<Sample> {
    let id: String = row.get(0)?;
    let directory_id: String = row.get(1)?;
    let peaks_json: Option<String> = row.get(9)?;
    let peaks = peaks_json
        .map(|json| serde_json::from_str::<Vec<f32>>(&json))
        .transpose()
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(9, Type::Text, Box::new(err)))?;
    Ok(Sample {
        id: SampleId::from_string(id),
        directory_id: DirectoryId::from_string(directory_id),
        name: row.get(2)?,
        path: row.get(3)?,
        parent_path: row.get(4)?,
        duration_seconds: row.get(5)?,
        channels: row.get(6)?,
        sample_rate: row.get(7)?,
        rms_db: row.get(8)?,
        peaks,
        created_at: row.get(10)?,
    })
}

struct RawRack {
    id: String,
    name: String,
    configuration_json: String,
    created_at: i64,
    updated_at: Option<i64>,
}

impl RawRack {
    fn into_rack(self) -> Result<DrumRack, CatalogError> {
        let configuration: RackConfiguration = serde_json::from_str(&self.configuration_json)?;
        ensure_rack_len(&configuration)?;
        Ok(DrumRack {
            id: RackId::from_string(self.id),
            name: self.name,
            configuration,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

fn raw_rack_from_row(row: &Row<'_>) -> rusqlite::Result<RawRack> {
    Ok(RawRack {
        id: row.get(0)?,
        name: row.get(1)?,
        configuration_json: row.get(2)?,
        created_at: row.get(3)?,
        updated_at: row.get(4)?,
    })
}

fn ensure_rack_len(configuration: &RackConfiguration) -> Result<(), CatalogError> {
    if configuration.keys.len() != KEY_COUNT {
        return Err(CatalogError::InvalidRack {
            expected: KEY_COUNT,
            found: configuration.keys.len(),
        });
    }
    Ok(())
}

/// Translate rusqlite errors into friendlier `CatalogError` variants.
fn map_sql_error(err: rusqlite::Error) -> CatalogError {
    match err {
        rusqlite::Error::SqliteFailure(sql_err, _)
            if sql_err.code == rusqlite::ErrorCode::DatabaseBusy =>
        {
            CatalogError::Busy
        }
        other => CatalogError::Sql(other),
    }
}

fn create_parent_if_needed(path: &Path) -> Result<(), CatalogError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        std::fs::create_dir_all(parent).map_err(|source| CatalogError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::now_millis;
    use crate::layout::default_keys;
    use tempfile::tempdir;

    fn directory(name: &str) -> Directory {
        Directory {
            id: DirectoryId::new(),
            name: name.to_string(),
            path: PathBuf::from(format!("/tmp/{name}")),
            last_accessed_at: now_millis(),
            permission: PermissionState::Granted,
        }
    }

    #[test]
    fn upsert_twice_keeps_one_row_with_stable_identity() {
        let db = CatalogDatabase::open_in_memory().unwrap();
        let dir = directory("drums");
        db.insert_directory(&dir).unwrap();

        let first = db
            .upsert_sample("kick.wav", "kick.wav", &dir.id, &AudioDetails::default())
            .unwrap();
        let second = db
            .upsert_sample("kick.wav", "kick.wav", &dir.id, &AudioDetails::default())
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first.created_at, second.created_at);
        assert_eq!(db.list_samples().unwrap().len(), 1);
    }

    #[test]
    fn upsert_merges_details_per_field() {
        let db = CatalogDatabase::open_in_memory().unwrap();
        let dir = directory("drums");
        db.insert_directory(&dir).unwrap();
        db.upsert_sample(
            "kick.wav",
            "kick.wav",
            &dir.id,
            &AudioDetails {
                duration_seconds: Some(0.4),
                channels: Some(1),
                sample_rate: Some(44_100),
                ..AudioDetails::default()
            },
        )
        .unwrap();
        let merged = db
            .upsert_sample(
                "kick.wav",
                "kick.wav",
                &dir.id,
                &AudioDetails {
                    rms_db: Some(-12.0),
                    peaks: Some(vec![0.5; 100]),
                    ..AudioDetails::default()
                },
            )
            .unwrap();
        assert_eq!(merged.duration_seconds, Some(0.4));
        assert_eq!(merged.sample_rate, Some(44_100));
        assert_eq!(merged.rms_db, Some(-12.0));

        let stored = db.get_sample(&merged.id).unwrap().unwrap();
        assert_eq!(stored, merged);
    }

    #[test]
    fn cascade_delete_only_touches_owned_samples() {
        let db = CatalogDatabase::open_in_memory().unwrap();
        let doomed = directory("doomed");
        let kept = directory("kept");
        db.insert_directory(&doomed).unwrap();
        db.insert_directory(&kept).unwrap();
        for idx in 0..5 {
            let name = format!("hit{idx}.wav");
            db.upsert_sample(&name, &name, &doomed.id, &AudioDetails::default())
                .unwrap();
        }
        db.upsert_sample("keep.wav", "keep.wav", &kept.id, &AudioDetails::default())
            .unwrap();

        let removed = db.delete_directory_cascade(&doomed.id).unwrap();
        assert_eq!(removed, 5);
        assert!(db.list_samples_in(&doomed.id).unwrap().is_empty());
        assert_eq!(db.list_samples_in(&kept.id).unwrap().len(), 1);
        assert!(db.get_directory(&doomed.id).unwrap().is_none());
    }

    #[test]
    fn cascade_delete_of_unknown_directory_rolls_back() {
        let db = CatalogDatabase::open_in_memory().unwrap();
        let ghost = DirectoryId::new();
        db.upsert_sample("orphan.wav", "orphan.wav", &ghost, &AudioDetails::default())
            .unwrap();
        let err = db.delete_directory_cascade(&ghost).unwrap_err();
        assert!(matches!(err, CatalogError::DirectoryNotFound(_)));
        assert_eq!(db.list_samples().unwrap().len(), 1);
    }

    #[test]
    fn batch_prune_removes_paths_not_kept() {
        let db = CatalogDatabase::open_in_memory().unwrap();
        let dir = directory("drums");
        db.insert_directory(&dir).unwrap();
        for name in ["a.wav", "b.wav", "c.wav"] {
            db.upsert_sample(name, name, &dir.id, &AudioDetails::default())
                .unwrap();
        }
        let keep: HashSet<String> = ["b.wav".to_string()].into_iter().collect();
        let mut batch = db.write_batch().unwrap();
        assert_eq!(batch.prune_samples(&dir.id, &keep).unwrap(), 2);
        batch.commit().unwrap();
        let paths: Vec<String> = db
            .list_samples()
            .unwrap()
            .into_iter()
            .map(|s| s.path)
            .collect();
        assert_eq!(paths, vec!["b.wav".to_string()]);
    }

    #[test]
    fn racks_round_trip_and_require_full_layout() {
        let db = CatalogDatabase::open_in_memory().unwrap();
        let rack = DrumRack {
            id: RackId::new(),
            name: "Kit".into(),
            configuration: RackConfiguration {
                keys: default_keys(),
            },
            created_at: now_millis(),
            updated_at: None,
        };
        db.insert_rack(&rack).unwrap();
        assert_eq!(db.get_rack(&rack.id).unwrap(), Some(rack.clone()));

        let mut short = rack.clone();
        short.configuration.keys.truncate(3);
        assert!(matches!(
            db.update_rack(&short),
            Err(CatalogError::InvalidRack { found: 3, .. })
        ));

        let mut unknown = rack.clone();
        unknown.id = RackId::new();
        assert!(matches!(
            db.update_rack(&unknown),
            Err(CatalogError::RackNotFound(_))
        ));

        assert!(db.delete_rack(&rack.id).unwrap());
        assert!(db.list_racks().unwrap().is_empty());
    }

    #[test]
    fn file_database_persists_across_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join(DB_FILE_NAME);
        let record = directory("drums");
        {
            let db = CatalogDatabase::open(&path).unwrap();
            db.insert_directory(&record).unwrap();
            db.close().unwrap();
        }
        let reopened = CatalogDatabase::open(&path).unwrap();
        assert_eq!(reopened.list_directories().unwrap(), vec![record]);
    }
}
