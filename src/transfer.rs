//! Import and export of preset files.
//!
//! The file format is the stored library itself: a UTF-8 JSON object mapping
//! preset names to records. Reading is the one asynchronous step; nothing
//! touches a [`PresetStore`](crate::store::PresetStore) until a whole file has
//! been read and parsed.

use crate::error::TransferError;
use crate::models::preset::{decode_presets, PresetMap};
use crate::store::{ConflictPolicy, PresetStore};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

/// Where an import comes from.
#[async_trait]
pub trait ImportSource: Send + Sync {
    /// Short description for log lines.
    fn describe(&self) -> String;

    async fn read_to_string(&self) -> Result<String, TransferError>;
}

/// A preset file on disk.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl ImportSource for FileSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    async fn read_to_string(&self) -> Result<String, TransferError> {
        Ok(fs::read_to_string(&self.path).await?)
    }
}

/// File contents already handed over by the host, e.g. from an upload.
#[derive(Debug, Clone)]
pub struct BytesSource {
    label: String,
    bytes: Vec<u8>,
}

impl BytesSource {
    pub fn new(label: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            label: label.into(),
            bytes: bytes.into(),
        }
    }
}

#[async_trait]
impl ImportSource for BytesSource {
    fn describe(&self) -> String {
        self.label.clone()
    }

    async fn read_to_string(&self) -> Result<String, TransferError> {
        String::from_utf8(self.bytes.clone())
            .map_err(|e| TransferError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))
    }
}

/// How imported presets are combined with the library.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportMode {
    Merge(ConflictPolicy),
    ReplaceAll,
}

/// Reads and parses a preset file. Entries that are not presets are skipped;
/// a file that is not a JSON object is rejected as a whole.
pub async fn read_presets(source: &dyn ImportSource) -> Result<PresetMap, TransferError> {
    let contents = source.read_to_string().await?;
    let decoded = decode_presets(&contents).map_err(|e| {
        warn!(source = %source.describe(), error = %e, "Rejected preset import");
        TransferError::InvalidFormat(e)
    })?;
    if !decoded.rejected.is_empty() {
        warn!(
            source = %source.describe(),
            skipped = decoded.rejected.len(),
            "Skipped unreadable presets in import"
        );
    }
    Ok(decoded.presets)
}

/// Reads `source` and applies it to `store`. Returns the number of presets
/// the file contained.
pub async fn import_into(
    store: &mut PresetStore,
    source: &dyn ImportSource,
    mode: ImportMode,
) -> anyhow::Result<usize> {
    let imported = read_presets(source).await?;
    let count = imported.len();
    match mode {
        ImportMode::Merge(policy) => {
            store.import_merged(imported, policy)?;
        }
        ImportMode::ReplaceAll => store.import_replace_all(imported)?,
    }
    info!(source = %source.describe(), count, ?mode, "Imported preset file");
    Ok(count)
}

/// Pretty-printed JSON for a preset map, as written to export files.
pub fn export_json(presets: &PresetMap) -> Result<String, TransferError> {
    Ok(serde_json::to_string_pretty(presets)?)
}

/// Writes a preset map to `path`.
pub async fn write_presets(path: impl AsRef<Path>, presets: &PresetMap) -> Result<(), TransferError> {
    let path = path.as_ref();
    let contents = export_json(presets)?;
    let mut file = fs::File::create(path).await?;
    file.write_all(contents.as_bytes()).await?;
    file.flush().await?;
    info!(path = %path.display(), count = presets.len(), "Exported presets");
    Ok(())
}

/// Exports the whole library to `path`.
pub async fn export_all(store: &PresetStore, path: impl AsRef<Path>) -> Result<(), TransferError> {
    write_presets(path, &store.export_all()).await
}

/// Exports a single preset to `path`, in the same shape as a full export.
pub async fn export_one(store: &PresetStore, name: &str, path: impl AsRef<Path>) -> Result<(), TransferError> {
    let presets = store
        .export_one(name)
        .ok_or_else(|| TransferError::NotFound(name.to_string()))?;
    write_presets(path, &presets).await
}

/// Default download name for an export: the preset name for a single
/// preset, `wakawave_presets.json` for the whole library.
pub fn export_file_name(name: Option<&str>) -> String {
    match name {
        Some(name) => {
            let safe: String = name
                .chars()
                .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
                .collect();
            format!("{}.json", safe)
        }
        None => "wakawave_presets.json".to_string(),
    }
}
