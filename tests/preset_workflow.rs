//! End-to-end flow: grant a folder, analyze, auto-map and download a preset.

mod support;

use std::collections::HashSet;
use std::io::{Cursor, Read};

use rackpack::analyzer::SampleAnalyzer;
use rackpack::automap::AutoMapper;
use rackpack::catalog::{CatalogError, CatalogStore, FsAccess};
use rackpack::config::{self, AppSettings};
use rackpack::export::Patch;
use rackpack::scanner::{ScanProgress, Scanner};
use rackpack::session::RackSession;
use support::{env::ConfigHomeGuard, wav};
use tempfile::tempdir;

fn read_entry(bytes: &[u8], name: &str) -> Vec<u8> {
    let mut zip = zip::ZipArchive::new(Cursor::new(bytes)).expect("open archive");
    let mut out = Vec::new();
    zip.by_name(name)
        .expect("archive entry")
        .read_to_end(&mut out)
        .expect("read entry");
    out
}

#[test]
fn granted_folder_becomes_a_downloadable_preset() {
    let library = tempdir().unwrap();
    for name in ["Kick A", "Kick B", "Snare A", "Snare B", "Clap", "Rim"] {
        wav::write_hit(&library.path().join("drums").join(format!("{name}.wav")), 0.4);
    }
    wav::write_hit(&library.path().join("hats").join("Closed HH.wav"), 0.2);
    wav::write_hit(&library.path().join("hats").join("Open Hat.wav"), 0.6);
    wav::write_pad(&library.path().join("pads").join("Pad.wav"), 1.5);
    std::fs::write(library.path().join("notes.txt"), "not audio").unwrap();

    let data = tempdir().unwrap();
    let db_path = data.path().join("catalog.db");
    let mut store = CatalogStore::open(&db_path, FsAccess::new(), Scanner::default()).unwrap();
    let progress = store.scanner().events().subscribe();
    let directory = store.add_directory_at(library.path()).unwrap();

    let events = progress.drain();
    assert_eq!(
        events.first(),
        Some(&ScanProgress::Scanning { detected_count: 1 })
    );
    assert_eq!(
        events.last(),
        Some(&ScanProgress::Processing {
            total: 8,
            processed: 8
        })
    );
    let samples = store.list_samples_in(&directory.id).unwrap();
    assert_eq!(samples.len(), 8);
    assert!(samples.iter().all(|sample| sample.name != "Pad.wav"));
    assert!(samples.iter().all(|sample| sample.is_pending_analysis()));

    let analyzed = SampleAnalyzer::new()
        .analyze(&store, &samples[0].id)
        .unwrap();
    assert_eq!(analyzed.peaks.as_ref().map(Vec::len), Some(100));
    assert!(analyzed.rms_db.unwrap() < 0.0);

    let mut session = RackSession::new();
    let report = session
        .auto_map_catalog(&store, &mut AutoMapper::seeded(17), 2.0)
        .unwrap();
    assert_eq!(report.assigned, 8);
    assert_eq!(report.failed, 0);

    let exported = session.download_preset(&store, "Test Kit").unwrap();
    assert_eq!(exported.patch.regions.len(), 8);
    let patch: Patch = serde_json::from_slice(&read_entry(
        &exported.bytes,
        "Test Kit/Test Kit.preset/patch.json",
    ))
    .unwrap();
    assert_eq!(patch, exported.patch);
    let notes: HashSet<u8> = patch.regions.iter().map(|region| region.lokey).collect();
    assert_eq!(notes.len(), 8);
    assert!(notes.iter().all(|note| (53..=76).contains(note)));
    assert!(notes.contains(&53));

    let kick = &session.keys()[0];
    let kick_sample = kick.assigned_sample.as_ref().unwrap();
    assert!(kick_sample.name.starts_with("Kick"));
    assert_eq!(
        read_entry(
            &exported.bytes,
            &format!("Test Kit/Test Kit.preset/{}", kick_sample.name)
        ),
        std::fs::read(library.path().join(&kick_sample.path)).unwrap()
    );
    assert_eq!(store.list_racks().unwrap().len(), 1);
    store.close().unwrap();

    // A reopened store must validate roots before files can be read.
    let mut reopened = CatalogStore::open(&db_path, FsAccess::new(), Scanner::default()).unwrap();
    assert_eq!(reopened.list_samples().unwrap().len(), 8);
    assert!(matches!(
        SampleAnalyzer::new().analyze(&reopened, &samples[1].id),
        Err(rackpack::analyzer::AnalyzeError::Catalog(
            CatalogError::DirectoryNotCached(_)
        ))
    ));
    let directories = reopened.list_directories().unwrap();
    assert!(directories[0].has_permission());
    SampleAnalyzer::new()
        .analyze(&reopened, &samples[1].id)
        .unwrap();
}

#[test]
fn settings_live_under_config_home() {
    let home = tempdir().unwrap();
    let _guard = ConfigHomeGuard::set(home.path());

    let mut settings = config::load_or_default().unwrap();
    assert_eq!(settings, AppSettings::default());
    settings.automap.seed = Some(5);
    config::save(&settings).unwrap();

    let path = config::config_path().unwrap();
    assert!(path.starts_with(home.path()));
    assert_eq!(config::load_or_default().unwrap().automap.seed, Some(5));
    assert!(
        settings
            .database_path()
            .unwrap()
            .ends_with(".rackpack/rackpack.db")
    );
}
