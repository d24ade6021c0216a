//! State behind the preset browser dialog.
//!
//! The host renders whatever [`PresetBrowser`] reports (filtered list, preview,
//! enabled actions) and forwards clicks and key presses to it. Decisions the
//! dialog would ask the user for, such as a new name or a delete confirmation,
//! are passed in already resolved.

use crate::editor::{EditorSurface, PromptBinding};
use crate::error::StoreError;
use crate::models::preset::PresetMap;
use crate::store::PresetStore;
use chrono::{DateTime, Utc};
use tracing::{debug, info};

const PREVIEW_CHARS: usize = 60;

/// Answer to a destructive-action confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Confirmed,
    Cancelled,
}

/// Footer buttons of the dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowserAction {
    Load,
    Rename,
    Duplicate,
    Delete,
}

/// Keys the dialog reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowserKey {
    Escape,
    Enter,
    Delete,
    Other,
}

/// What a key press asks the host to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowserCommand {
    Close,
    Load,
    /// Ask the user to confirm, then call [`PresetBrowser::delete_selected`].
    ConfirmDelete,
}

/// One row of the preset list.
#[derive(Debug, Clone, PartialEq)]
pub struct PresetListItem {
    pub name: String,
    pub favorite: bool,
    pub created: String,
    pub usage_count: u64,
    /// Start of the positive text, `None` when it is empty.
    pub preview: Option<String>,
}

/// The detail panel for the selected preset.
#[derive(Debug, Clone, PartialEq)]
pub struct PresetPreview {
    pub name: String,
    pub description: String,
    pub tags: Vec<String>,
    pub positive: String,
    pub negative: String,
    pub created: String,
    pub modified: String,
    pub usage: String,
}

#[derive(Debug, Default)]
pub struct PresetBrowser {
    search: String,
    selected: Option<String>,
    open: bool,
}

impl PresetBrowser {
    /// A browser in the open state with no search and no selection.
    pub fn open() -> Self {
        Self {
            open: true,
            ..Default::default()
        }
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn close(&mut self) {
        self.open = false;
        self.selected = None;
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn set_search(&mut self, term: &str) {
        self.search = term.to_lowercase();
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// Names matching the search, sorted case-insensitively.
    pub fn visible_names(&self, presets: &PresetMap) -> Vec<String> {
        let mut names: Vec<String> = presets
            .keys()
            .filter(|name| name.to_lowercase().contains(&self.search))
            .cloned()
            .collect();
        names.sort_by(|a, b| a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| a.cmp(b)));
        names
    }

    pub fn list_items(&self, presets: &PresetMap) -> Vec<PresetListItem> {
        self.visible_names(presets)
            .into_iter()
            .filter_map(|name| {
                let record = presets.get(&name)?;
                Some(PresetListItem {
                    favorite: record.favorite(),
                    created: date_label(record.created()),
                    usage_count: record.usage_count(),
                    preview: preview_text(record.positive()),
                    name,
                })
            })
            .collect()
    }

    /// Message shown in place of an empty list.
    pub fn empty_message(&self) -> &'static str {
        if self.search.is_empty() {
            "No presets saved yet"
        } else {
            "No presets found matching your search"
        }
    }

    /// Selects a listed preset. Names hidden by the search or unknown to the
    /// library are ignored.
    pub fn select(&mut self, presets: &PresetMap, name: &str) -> bool {
        if !presets.contains_key(name) || !name.to_lowercase().contains(&self.search) {
            return false;
        }
        self.selected = Some(name.to_string());
        true
    }

    pub fn is_enabled(&self, _action: BrowserAction) -> bool {
        self.selected.is_some()
    }

    pub fn preview(&self, presets: &PresetMap) -> Option<PresetPreview> {
        let name = self.selected.as_ref()?;
        let record = presets.get(name)?;
        let details = record.details();
        let created = date_label(record.created());
        let modified = record.modified().map_or_else(|| created.clone(), |m| date_label(Some(m)));
        Some(PresetPreview {
            name: name.clone(),
            description: details.map(|d| d.description.clone()).unwrap_or_default(),
            tags: details.map(|d| d.tags.clone()).unwrap_or_default(),
            positive: record.positive().to_string(),
            negative: record.negative().to_string(),
            created,
            modified,
            usage: usage_label(record.usage_count()),
        })
    }

    pub fn handle_key(&self, key: BrowserKey) -> Option<BrowserCommand> {
        if !self.open {
            return None;
        }
        match key {
            BrowserKey::Escape => Some(BrowserCommand::Close),
            BrowserKey::Enter if self.selected.is_some() => Some(BrowserCommand::Load),
            BrowserKey::Delete if self.selected.is_some() => Some(BrowserCommand::ConfirmDelete),
            _ => None,
        }
    }

    /// Loads the selected preset into the editor, counts the use and closes
    /// the dialog. Returns the loaded name, or `None` without a selection.
    ///
    /// A failed usage write is returned after the editor has been updated.
    pub fn load_selected<E: EditorSurface>(
        &mut self,
        store: &mut PresetStore,
        binding: &mut PromptBinding<E>,
    ) -> Result<Option<String>, StoreError> {
        let Some(name) = self.selected.clone() else {
            return Ok(None);
        };
        let record = store
            .get(&name)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(name.clone()))?;
        binding.apply_preset(&record);
        self.close();
        info!(name = %name, "Loaded preset into editor");
        store.record_usage(&name)?;
        Ok(Some(name))
    }

    /// Renames the selected preset. An empty or unchanged answer is a no-op.
    pub fn rename_selected(&mut self, store: &mut PresetStore, new_name: Option<&str>) -> Result<bool, StoreError> {
        let Some(old) = self.selected.clone() else {
            return Ok(false);
        };
        let Some(new_name) = new_name.filter(|n| !n.is_empty() && *n != old) else {
            return Ok(false);
        };
        let result = store.rename(&old, new_name);
        if result.is_ok() || result.as_ref().is_err_and(StoreError::is_unsaved_change) {
            self.selected = Some(new_name.to_string());
        }
        result.map(|()| true)
    }

    /// Duplicates the selected preset and selects the copy.
    pub fn duplicate_selected(&mut self, store: &mut PresetStore) -> Result<Option<String>, StoreError> {
        let Some(name) = self.selected.clone() else {
            return Ok(None);
        };
        let copy = store.duplicate(&name)?;
        self.selected = Some(copy.clone());
        Ok(Some(copy))
    }

    /// Deletes the selected preset once the user confirmed.
    pub fn delete_selected(&mut self, store: &mut PresetStore, answer: Confirmation) -> Result<bool, StoreError> {
        let Some(name) = self.selected.clone() else {
            return Ok(false);
        };
        if answer == Confirmation::Cancelled {
            debug!(name = %name, "Delete cancelled");
            return Ok(false);
        }
        self.selected = None;
        store.delete(&name)
    }
}

/// `"1 preset"` / `"N presets"`.
pub fn count_label(count: usize) -> String {
    format!("{} preset{}", count, if count == 1 { "" } else { "s" })
}

/// `"Used: 1 time"` / `"Used: N times"`.
pub fn usage_label(count: u64) -> String {
    format!("Used: {} time{}", count, if count == 1 { "" } else { "s" })
}

fn date_label(date: Option<DateTime<Utc>>) -> String {
    date.map_or_else(|| "Unknown".to_string(), |d| d.format("%Y-%m-%d").to_string())
}

fn preview_text(positive: &str) -> Option<String> {
    if positive.is_empty() {
        return None;
    }
    let mut preview: String = positive.chars().take(PREVIEW_CHARS).collect();
    if positive.chars().count() > PREVIEW_CHARS {
        preview.push_str("...");
    }
    Some(preview)
}

/// Resolves a typed answer to a preset name: an exact name wins, otherwise a
/// 1-based position in the sorted list.
pub fn resolve_choice(presets: &PresetMap, input: &str) -> Option<String> {
    let input = input.trim();
    if presets.contains_key(input) {
        return Some(input.to_string());
    }
    let index: usize = input.parse().ok()?;
    let names = PresetBrowser::default().visible_names(presets);
    index.checked_sub(1).and_then(|i| names.get(i).cloned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::NodeWidgets;
    use crate::models::prompt::Direction;
    use crate::storage::MemoryStorage;
    use std::sync::Arc;

    fn store_with(names: &[(&str, &str)]) -> (Arc<MemoryStorage>, PresetStore) {
        let storage = Arc::new(MemoryStorage::new());
        let mut store = PresetStore::open(storage.clone());
        for (name, positive) in names {
            store.put(name, positive, "").unwrap();
        }
        (storage, store)
    }

    #[test]
    fn test_search_filters_and_sorts() {
        let (_, store) = store_with(&[("beta", "b"), ("Alpha", "a"), ("gamma", "g")]);
        let mut browser = PresetBrowser::open();
        assert_eq!(browser.visible_names(store.presets()), vec!["Alpha", "beta", "gamma"]);

        browser.set_search("A");
        assert_eq!(browser.visible_names(store.presets()), vec!["Alpha", "beta", "gamma"]);

        browser.set_search("MM");
        assert_eq!(browser.visible_names(store.presets()), vec!["gamma"]);

        browser.set_search("zzz");
        assert!(browser.list_items(store.presets()).is_empty());
        assert_eq!(browser.empty_message(), "No presets found matching your search");
    }

    #[test]
    fn test_labels() {
        assert_eq!(count_label(0), "0 presets");
        assert_eq!(count_label(1), "1 preset");
        assert_eq!(usage_label(1), "Used: 1 time");
        assert_eq!(usage_label(3), "Used: 3 times");
        assert_eq!(PresetBrowser::open().empty_message(), "No presets saved yet");
    }

    #[test]
    fn test_list_item_preview_is_truncated() {
        let long = "x".repeat(75);
        let (_, store) = store_with(&[("long", long.as_str()), ("short", "hi"), ("empty", "")]);
        let items = PresetBrowser::open().list_items(store.presets());
        let long_item = items.iter().find(|i| i.name == "long").unwrap();
        assert_eq!(long_item.preview.as_deref(), Some(format!("{}...", "x".repeat(60)).as_str()));
        let short_item = items.iter().find(|i| i.name == "short").unwrap();
        assert_eq!(short_item.preview.as_deref(), Some("hi"));
        let empty_item = items.iter().find(|i| i.name == "empty").unwrap();
        assert!(empty_item.preview.is_none());
        assert_ne!(empty_item.created, "Unknown");
    }

    #[test]
    fn test_actions_need_selection() {
        let (_, store) = store_with(&[("p", "a")]);
        let mut browser = PresetBrowser::open();
        assert!(!browser.is_enabled(BrowserAction::Load));
        assert_eq!(browser.handle_key(BrowserKey::Enter), None);
        assert_eq!(browser.handle_key(BrowserKey::Escape), Some(BrowserCommand::Close));

        assert!(!browser.select(store.presets(), "missing"));
        assert!(browser.select(store.presets(), "p"));
        assert!(browser.is_enabled(BrowserAction::Delete));
        assert_eq!(browser.handle_key(BrowserKey::Enter), Some(BrowserCommand::Load));
        assert_eq!(browser.handle_key(BrowserKey::Delete), Some(BrowserCommand::ConfirmDelete));
        assert_eq!(browser.handle_key(BrowserKey::Other), None);
    }

    #[test]
    fn test_preview_of_legacy_record() {
        let storage = Arc::new(MemoryStorage::with_value(crate::storage::PRESETS_KEY, r#"{"old": "a cat"}"#));
        let store = PresetStore::open(storage);
        let mut browser = PresetBrowser::open();
        browser.select(store.presets(), "old");
        let preview = browser.preview(store.presets()).unwrap();
        assert_eq!(preview.positive, "a cat");
        assert_eq!(preview.negative, "");
        assert_eq!(preview.created, "Unknown");
        assert_eq!(preview.modified, "Unknown");
        assert_eq!(preview.usage, "Used: 0 times");
    }

    #[test]
    fn test_load_records_usage_once_and_closes() {
        let (_, mut store) = store_with(&[("p", "sunset, weight: 1.5")]);
        let mut binding = PromptBinding::new(NodeWidgets::default());
        let mut browser = PresetBrowser::open();
        browser.select(store.presets(), "p");

        let loaded = browser.load_selected(&mut store, &mut binding).unwrap();
        assert_eq!(loaded.as_deref(), Some("p"));
        assert!(!browser.is_open());
        assert_eq!(store.get("p").unwrap().usage_count(), 1);
        assert_eq!(binding.surface().text(Direction::Positive), "sunset, weight: 1.5");
        assert!(binding.surface().positive_bundle.contains("1.5"));

        assert_eq!(browser.load_selected(&mut store, &mut binding).unwrap(), None);
        assert_eq!(store.get("p").unwrap().usage_count(), 1);
    }

    #[test]
    fn test_rename_selected() {
        let (_, mut store) = store_with(&[("p", "a"), ("q", "b")]);
        let mut browser = PresetBrowser::open();
        browser.select(store.presets(), "p");

        assert!(!browser.rename_selected(&mut store, None).unwrap());
        assert!(!browser.rename_selected(&mut store, Some("p")).unwrap());

        let err = browser.rename_selected(&mut store, Some("q")).unwrap_err();
        assert_eq!(err.user_message(), "A preset with that name already exists!");
        assert_eq!(browser.selected(), Some("p"));

        assert!(browser.rename_selected(&mut store, Some("r")).unwrap());
        assert_eq!(browser.selected(), Some("r"));
        assert!(store.contains("r"));
    }

    #[test]
    fn test_duplicate_selects_copy() {
        let (_, mut store) = store_with(&[("p", "a")]);
        let mut browser = PresetBrowser::open();
        browser.select(store.presets(), "p");
        let copy = browser.duplicate_selected(&mut store).unwrap();
        assert_eq!(copy.as_deref(), Some("p (Copy)"));
        assert_eq!(browser.selected(), Some("p (Copy)"));
    }

    #[test]
    fn test_delete_needs_confirmation() {
        let (_, mut store) = store_with(&[("p", "a")]);
        let mut browser = PresetBrowser::open();
        browser.select(store.presets(), "p");

        assert!(!browser.delete_selected(&mut store, Confirmation::Cancelled).unwrap());
        assert!(store.contains("p"));

        assert!(browser.delete_selected(&mut store, Confirmation::Confirmed).unwrap());
        assert!(!store.contains("p"));
        assert_eq!(browser.selected(), None);
        assert!(browser.preview(store.presets()).is_none());
    }

    #[test]
    fn test_resolve_choice_by_name_or_number() {
        let (_, store) = store_with(&[("beta", "b"), ("alpha", "a"), ("2", "numeric name")]);
        let presets = store.presets();
        assert_eq!(resolve_choice(presets, "beta").as_deref(), Some("beta"));
        assert_eq!(resolve_choice(presets, "2").as_deref(), Some("2"));
        assert_eq!(resolve_choice(presets, "3").as_deref(), Some("beta"));
        assert_eq!(resolve_choice(presets, "0"), None);
        assert_eq!(resolve_choice(presets, "9"), None);
        assert_eq!(resolve_choice(presets, "nope"), None);
        assert_eq!(resolve_choice(presets, " alpha ").as_deref(), Some("alpha"));
    }
}
