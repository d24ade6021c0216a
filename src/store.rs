//! The preset library.
//!
//! [`PresetStore`] keeps every preset in memory and writes the whole map back
//! to its [`PresetStorage`] after each change. All calls are synchronous and
//! take `&mut self`, so only one mutation can run at a time.
//!
//! Stored entries that cannot be read as presets are kept aside and written
//! back untouched, so one damaged record never costs the rest of the library.

use crate::error::StoreError;
use crate::models::preset::{decode_presets, DecodedPresets, PresetDetails, PresetMap, PresetRecord};
use crate::storage::{PresetStorage, PRESETS_KEY};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

pub type Clock = Box<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// What to do when an imported name already exists locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictPolicy {
    Overwrite,
    SkipExisting,
}

/// Reads the presets stored under `key`. Missing data, or data that is not a
/// JSON object, yields an empty library; single bad entries are set aside.
pub fn load_presets(storage: &dyn PresetStorage, key: &str) -> DecodedPresets {
    let contents = match storage.read(key) {
        Ok(Some(contents)) => contents,
        Ok(None) => return DecodedPresets::default(),
        Err(e) => {
            warn!(key = %key, error = %e, "Failed to read presets, starting empty");
            return DecodedPresets::default();
        }
    };
    match decode_presets(&contents) {
        Ok(decoded) => {
            if !decoded.rejected.is_empty() {
                warn!(key = %key, count = decoded.rejected.len(), "Keeping unreadable presets as stored");
            }
            decoded
        }
        Err(e) => {
            warn!(key = %key, error = %e, "Failed to load presets, starting empty");
            DecodedPresets::default()
        }
    }
}

pub struct PresetStore {
    storage: Arc<dyn PresetStorage>,
    key: String,
    presets: PresetMap,
    /// Stored entries that did not read as presets; written back verbatim.
    unreadable: Map<String, Value>,
    clock: Clock,
}

impl PresetStore {
    /// Opens the library under the default key.
    pub fn open(storage: Arc<dyn PresetStorage>) -> Self {
        Self::open_with_key(storage, PRESETS_KEY)
    }

    pub fn open_with_key(storage: Arc<dyn PresetStorage>, key: impl Into<String>) -> Self {
        let key = key.into();
        let DecodedPresets { presets, rejected } = load_presets(storage.as_ref(), &key);
        debug!(key = %key, count = presets.len(), "Opened preset store");
        Self {
            storage,
            key,
            presets,
            unreadable: rejected,
            clock: Box::new(Utc::now),
        }
    }

    /// Replaces the time source used for `created`/`modified` stamps.
    pub fn with_clock(mut self, clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Discards in-memory state and re-reads the backend.
    pub fn load(&mut self) -> &PresetMap {
        let decoded = load_presets(self.storage.as_ref(), &self.key);
        self.presets = decoded.presets;
        self.unreadable = decoded.rejected;
        &self.presets
    }

    /// Writes the full map to the backend.
    pub fn save(&self) -> Result<(), StoreError> {
        let write = self
            .encode()
            .map_err(anyhow::Error::from)
            .and_then(|contents| self.storage.write(&self.key, &contents));
        if let Err(e) = write {
            error!(key = %self.key, error = %e, "Failed to save presets; changes are kept in memory only");
            return Err(StoreError::PersistenceUnavailable(e));
        }
        Ok(())
    }

    fn encode(&self) -> serde_json::Result<String> {
        if self.unreadable.is_empty() {
            return serde_json::to_string(&self.presets);
        }
        let mut entries = self.unreadable.clone();
        for (name, record) in &self.presets {
            entries.insert(name.clone(), serde_json::to_value(record)?);
        }
        serde_json::to_string(&entries)
    }

    pub fn presets(&self) -> &PresetMap {
        &self.presets
    }

    pub fn get(&self, name: &str) -> Option<&PresetRecord> {
        self.presets.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.presets.contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.presets.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.presets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.presets.is_empty()
    }

    /// Creates or updates a preset. An existing detailed record keeps its
    /// creation time, usage count and annotations.
    pub fn put(&mut self, name: &str, positive: &str, negative: &str) -> Result<(), StoreError> {
        if name.is_empty() {
            return Err(StoreError::EmptyName);
        }
        let now = (self.clock)();
        self.unreadable.remove(name);
        match self.presets.get_mut(name).and_then(PresetRecord::details_mut) {
            Some(details) => {
                details.positive = positive.to_string();
                details.negative = negative.to_string();
                details.modified = Some(now);
                info!(name = %name, "Updated preset");
            }
            None => {
                let details = PresetDetails::new(positive.to_string(), negative.to_string(), now);
                self.presets.insert(name.to_string(), PresetRecord::Detailed(details));
                info!(name = %name, "Saved preset");
            }
        }
        self.save()
    }

    /// Moves a preset to a new name. Fails without changes if the new name is
    /// taken.
    pub fn rename(&mut self, old: &str, new: &str) -> Result<(), StoreError> {
        if new.is_empty() {
            return Err(StoreError::EmptyName);
        }
        if !self.presets.contains_key(old) {
            return Err(StoreError::NotFound(old.to_string()));
        }
        if old == new {
            return Ok(());
        }
        if self.presets.contains_key(new) {
            return Err(StoreError::NameCollision(new.to_string()));
        }
        let Some(mut record) = self.presets.remove(old) else {
            return Err(StoreError::NotFound(old.to_string()));
        };
        if let Some(details) = record.details_mut() {
            details.modified = Some((self.clock)());
        }
        self.presets.insert(new.to_string(), record);
        info!(old = %old, new = %new, "Renamed preset");
        self.save()
    }

    /// Copies a preset under the first free `"<name> (Copy)"`,
    /// `"<name> (Copy 2)"`, ... name and returns that name.
    pub fn duplicate(&mut self, name: &str) -> Result<String, StoreError> {
        let source = self
            .presets
            .get(name)
            .ok_or_else(|| StoreError::NotFound(name.to_string()))?;

        let mut copy = source.clone();
        if let Some(details) = copy.details_mut() {
            let now = (self.clock)();
            details.created = Some(now);
            details.modified = Some(now);
            details.usage_count = 0;
        }

        let new_name = self.copy_name(name);
        self.presets.insert(new_name.clone(), copy);
        info!(source = %name, name = %new_name, "Duplicated preset");
        self.save()?;
        Ok(new_name)
    }

    fn copy_name(&self, name: &str) -> String {
        let mut candidate = format!("{} (Copy)", name);
        let mut counter = 1;
        while self.presets.contains_key(&candidate) {
            counter += 1;
            candidate = format!("{} (Copy {})", name, counter);
        }
        candidate
    }

    /// Removes a preset, or an unreadable stored entry of that name. Returns
    /// whether anything was removed; an unknown name is not an error.
    pub fn delete(&mut self, name: &str) -> Result<bool, StoreError> {
        let removed = self.presets.remove(name).is_some() | self.unreadable.remove(name).is_some();
        if !removed {
            debug!(name = %name, "Delete requested for unknown preset");
            return Ok(false);
        }
        info!(name = %name, "Deleted preset");
        self.save()?;
        Ok(true)
    }

    /// Counts one load of the preset into the editor.
    pub fn record_usage(&mut self, name: &str) -> Result<(), StoreError> {
        let now = (self.clock)();
        let record = self
            .presets
            .get_mut(name)
            .ok_or_else(|| StoreError::NotFound(name.to_string()))?;
        // Legacy string presets carry no counters.
        let Some(details) = record.details_mut() else {
            return Ok(());
        };
        details.usage_count += 1;
        details.modified = Some(now);
        debug!(name = %name, count = details.usage_count, "Recorded preset usage");
        self.save()
    }

    pub fn set_favorite(&mut self, name: &str, favorite: bool) -> Result<(), StoreError> {
        self.annotate(name, |details| details.favorite = favorite)
    }

    pub fn set_description(&mut self, name: &str, description: &str) -> Result<(), StoreError> {
        self.annotate(name, |details| details.description = description.to_string())
    }

    pub fn set_tags(&mut self, name: &str, tags: Vec<String>) -> Result<(), StoreError> {
        self.annotate(name, |details| details.tags = tags)
    }

    fn annotate(&mut self, name: &str, edit: impl FnOnce(&mut PresetDetails)) -> Result<(), StoreError> {
        let now = (self.clock)();
        let record = self
            .presets
            .remove(name)
            .ok_or_else(|| StoreError::NotFound(name.to_string()))?;
        let mut details = record.into_details(now);
        edit(&mut details);
        details.modified = Some(now);
        self.presets.insert(name.to_string(), PresetRecord::Detailed(details));
        info!(name = %name, "Updated preset metadata");
        self.save()
    }

    /// Adds imported presets to the library. Returns how many names the
    /// import contained, whether or not each one was written.
    pub fn import_merged(&mut self, imported: PresetMap, policy: ConflictPolicy) -> Result<usize, StoreError> {
        let processed = imported.len();
        let mut skipped = 0;
        for (name, record) in imported {
            if policy == ConflictPolicy::SkipExisting && self.presets.contains_key(&name) {
                skipped += 1;
                continue;
            }
            self.presets.insert(name, record);
        }
        info!(processed, skipped, ?policy, "Imported presets");
        self.save()?;
        Ok(processed)
    }

    /// Replaces the whole library with the imported one.
    pub fn import_replace_all(&mut self, imported: PresetMap) -> Result<(), StoreError> {
        info!(previous = self.presets.len(), count = imported.len(), "Replacing preset library");
        self.presets = imported;
        self.unreadable.clear();
        self.save()
    }

    pub fn export_all(&self) -> PresetMap {
        self.presets.clone()
    }

    /// A one-entry map holding `name`, in the same shape as a full export.
    pub fn export_one(&self, name: &str) -> Option<PresetMap> {
        let record = self.presets.get(name)?;
        Some(PresetMap::from([(name.to_string(), record.clone())]))
    }
}
