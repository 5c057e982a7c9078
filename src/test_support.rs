use std::fs;
use std::path::Path;

use crate::audio::{DecodedAudio, encode_wav_16};
use crate::catalog::{CatalogStore, Directory, FsAccess};
use crate::scanner::{Scanner, decaying_hit};

/// Write a mono 44.1 kHz drum hit that passes the one-shot classifier.
pub(crate) fn write_hit(path: &Path, seconds: f64) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    let clip = DecodedAudio {
        samples: decaying_hit(44_100, seconds, 0.0),
        sample_rate: 44_100,
        channels: 1,
    };
    fs::write(path, encode_wav_16(&clip).unwrap()).unwrap();
}

/// In-memory store with `root` already catalogued.
pub(crate) fn store_with_root(root: &Path) -> (CatalogStore, Directory) {
    let mut store = CatalogStore::open_in_memory(FsAccess::new(), Scanner::default()).unwrap();
    let directory = store.add_directory_at(root).unwrap();
    (store, directory)
}
