use crate::storage::{FileSystemStorage, PRESETS_KEY};
use crate::store::PresetStore;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Where the preset library lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Directory holding the library file.
    pub preset_dir: PathBuf,
    /// Storage key; the library file is `<key>.json`.
    pub key: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            preset_dir: PathBuf::from("./presets"),
            key: PRESETS_KEY.to_string(),
        }
    }
}

impl StoreConfig {
    pub fn new(preset_dir: impl Into<PathBuf>, key: impl Into<String>) -> Self {
        Self {
            preset_dir: preset_dir.into(),
            key: key.into(),
        }
    }

    /// Opens the library with filesystem storage.
    pub fn open_store(&self) -> PresetStore {
        info!(path = %self.preset_dir.display(), key = %self.key, "Using filesystem preset storage");
        let storage = Arc::new(FileSystemStorage::new(&self.preset_dir));
        PresetStore::open_with_key(storage, self.key.clone())
    }
}
