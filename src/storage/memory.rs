use crate::storage::PresetStorage;
use anyhow::{bail, Result};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// In-process storage, used for embedding and tests.
///
/// Writes can be switched to fail to simulate a full or unavailable backend.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    values: Mutex<HashMap<String, String>>,
    reject_writes: AtomicBool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage pre-filled with one value.
    pub fn with_value(key: &str, contents: &str) -> Self {
        let storage = Self::new();
        storage.values().insert(key.to_string(), contents.to_string());
        storage
    }

    /// Makes every subsequent write fail until switched back.
    pub fn set_reject_writes(&self, reject: bool) {
        self.reject_writes.store(reject, Ordering::SeqCst);
    }

    /// Current raw value under `key`.
    pub fn get(&self, key: &str) -> Option<String> {
        self.values().get(key).cloned()
    }

    fn values(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.values.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PresetStorage for MemoryStorage {
    fn read(&self, key: &str) -> Result<Option<String>> {
        Ok(self.get(key))
    }

    fn write(&self, key: &str, contents: &str) -> Result<()> {
        if self.reject_writes.load(Ordering::SeqCst) {
            bail!("storage quota exceeded while writing '{}'", key);
        }
        self.values().insert(key.to_string(), contents.to_string());
        Ok(())
    }
}
