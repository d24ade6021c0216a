use crate::storage::PresetStorage;
use anyhow::{Context, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, error};

/// Keeps each key as a `<key>.json` file inside one directory.
#[derive(Debug, Clone)]
pub struct FileSystemStorage {
    preset_dir: PathBuf,
}

impl FileSystemStorage {
    /// Creates a new FileSystemStorage instance.
    /// Ensures the preset directory exists.
    pub fn new<P: AsRef<Path>>(preset_dir: P) -> Self {
        let path_buf = preset_dir.as_ref().to_path_buf();
        if let Err(e) = fs::create_dir_all(&path_buf) {
            // Log error but proceed; writes will report the failure
            error!(path = %path_buf.display(), error = %e, "Failed to create preset directory during initialization");
        }
        Self { preset_dir: path_buf }
    }

    pub fn preset_dir(&self) -> &Path {
        &self.preset_dir
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.preset_dir.join(format!("{}.json", key))
    }
}

impl PresetStorage for FileSystemStorage {
    fn read(&self, key: &str) -> Result<Option<String>> {
        let path = self.key_path(key);
        match fs::read_to_string(&path) {
            Ok(contents) => {
                debug!(path = %path.display(), bytes = contents.len(), "Read preset file");
                Ok(Some(contents))
            }
            Err(ref e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to read preset file: {}", path.display())),
        }
    }

    fn write(&self, key: &str, contents: &str) -> Result<()> {
        let path = self.key_path(key);

        // Ensure directory exists before writing
        if !self.preset_dir.exists() {
            fs::create_dir_all(&self.preset_dir)
                .with_context(|| format!("Failed to create preset directory '{}'", self.preset_dir.display()))?;
        }

        // Write a sibling file first so a failed write leaves the old library intact.
        let staging = path.with_extension("json.tmp");
        fs::write(&staging, contents)
            .with_context(|| format!("Failed to write preset file: {}", staging.display()))?;
        fs::rename(&staging, &path)
            .with_context(|| format!("Failed to replace preset file: {}", path.display()))?;
        debug!(path = %path.display(), bytes = contents.len(), "Wrote preset file");
        Ok(())
    }
}
