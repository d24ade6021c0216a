use std::fs;
use std::sync::Arc;
use tempfile::TempDir;
use wakawave_prompts::browser::{Confirmation, PresetBrowser};
use wakawave_prompts::editor::{EditorSurface, NodeWidgets, PromptBinding};
use wakawave_prompts::storage::{FileSystemStorage, PRESETS_KEY};
use wakawave_prompts::transfer::{self, FileSource, ImportMode};
use wakawave_prompts::{parser, ConflictPolicy, Direction, PresetStore, StoreConfig};

fn open(temp: &TempDir) -> PresetStore {
    PresetStore::open(Arc::new(FileSystemStorage::new(temp.path())))
}

#[test]
fn test_save_edit_and_reload_from_disk() {
    let temp = TempDir::new().unwrap();
    let mut binding = PromptBinding::new(NodeWidgets::default());
    binding.on_text_changed(Direction::Positive, "a cat\nb dog, weight: 1.5\n\nc bird");
    binding.on_text_changed(Direction::Negative, "blurry");

    let mut store = open(&temp);
    let (positive, negative) = binding.snapshot();
    store.put("animals", &positive, &negative).unwrap();

    let stored = fs::read_to_string(temp.path().join(format!("{}.json", PRESETS_KEY))).unwrap();
    let value: serde_json::Value = serde_json::from_str(&stored).unwrap();
    assert_eq!(value["animals"]["usageCount"], 0);
    assert_eq!(value["animals"]["negative"], "blurry");

    let mut reopened = open(&temp);
    let mut fresh = PromptBinding::new(NodeWidgets::default());
    let mut browser = PresetBrowser::open();
    assert!(browser.select(reopened.presets(), "animals"));
    browser.load_selected(&mut reopened, &mut fresh).unwrap();

    let entries = parser::from_bundle(fresh.surface().bundle(Direction::Positive)).unwrap();
    let texts: Vec<&str> = entries.iter().map(|e| e.text.as_str()).collect();
    assert_eq!(texts, vec!["a cat", "b dog", "c bird"]);
    assert_eq!(entries[1].weight, 1.5);
    assert_eq!(fresh.surface().text(Direction::Negative), "blurry");
    assert_eq!(open(&temp).get("animals").unwrap().usage_count(), 1);
}

#[test]
fn test_corrupt_library_file_opens_empty() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join(format!("{}.json", PRESETS_KEY)), "{\"broken\": ").unwrap();
    let mut store = open(&temp);
    assert!(store.is_empty());

    store.put("p", "A", "").unwrap();
    assert_eq!(open(&temp).names(), vec!["p".to_string()]);
}

#[test]
fn test_browser_flow_on_disk() {
    let temp = TempDir::new().unwrap();
    let config = StoreConfig::new(temp.path(), PRESETS_KEY);
    let mut store = config.open_store();
    store.put("portrait", "face", "").unwrap();

    let mut browser = PresetBrowser::open();
    browser.select(store.presets(), "portrait");
    let copy = browser.duplicate_selected(&mut store).unwrap().unwrap();
    assert!(browser.rename_selected(&mut store, Some("portrait v2")).unwrap());
    assert_eq!(copy, "portrait (Copy)");

    browser.select(store.presets(), "portrait");
    browser.delete_selected(&mut store, Confirmation::Confirmed).unwrap();

    let reopened = config.open_store();
    assert_eq!(reopened.names(), vec!["portrait v2".to_string()]);
}

#[tokio::test]
async fn test_export_then_import_into_another_library() {
    let source_dir = TempDir::new().unwrap();
    let target_dir = TempDir::new().unwrap();
    let export_path = source_dir.path().join("export.json");

    let mut source = open(&source_dir);
    source.put("a", "alpha", "").unwrap();
    source.put("b", "beta", "bad hands").unwrap();
    source.set_favorite("b", true).unwrap();
    transfer::export_all(&source, &export_path).await.unwrap();

    let mut target = open(&target_dir);
    target.put("a", "local alpha", "").unwrap();

    let count = transfer::import_into(
        &mut target,
        &FileSource::new(&export_path),
        ImportMode::Merge(ConflictPolicy::SkipExisting),
    )
    .await
    .unwrap();
    assert_eq!(count, 2);
    assert_eq!(target.get("a").unwrap().positive(), "local alpha");
    assert!(target.get("b").unwrap().favorite());

    transfer::import_into(
        &mut target,
        &FileSource::new(&export_path),
        ImportMode::Merge(ConflictPolicy::Overwrite),
    )
    .await
    .unwrap();
    assert_eq!(open(&target_dir).get("a").unwrap().positive(), "alpha");
}

#[tokio::test]
async fn test_export_one_and_replace_all() {
    let temp = TempDir::new().unwrap();
    let single = temp.path().join("single.json");

    let mut store = open(&temp);
    store.put("keep", "k", "").unwrap();
    store.put("other", "o", "").unwrap();
    transfer::export_one(&store, "keep", &single).await.unwrap();

    let exported: serde_json::Value = serde_json::from_str(&fs::read_to_string(&single).unwrap()).unwrap();
    assert_eq!(exported.as_object().unwrap().len(), 1);
    assert_eq!(exported["keep"]["positive"], "k");

    transfer::import_into(&mut store, &FileSource::new(&single), ImportMode::ReplaceAll)
        .await
        .unwrap();
    assert_eq!(open(&temp).names(), vec!["keep".to_string()]);

    assert!(transfer::export_one(&store, "missing", temp.path().join("x.json")).await.is_err());
}

#[tokio::test]
async fn test_missing_import_file_is_an_error() {
    let temp = TempDir::new().unwrap();
    let mut store = open(&temp);
    store.put("p", "A", "").unwrap();
    let result = transfer::import_into(
        &mut store,
        &FileSource::new(temp.path().join("nope.json")),
        ImportMode::ReplaceAll,
    )
    .await;
    assert!(result.is_err());
    assert!(store.contains("p"));
}

#[test]
fn test_damaged_record_on_disk_keeps_library() {
    let temp = TempDir::new().unwrap();
    fs::write(
        temp.path().join(format!("{}.json", PRESETS_KEY)),
        r#"{"keep1":"legacy text","keep2":{"positive":"p","negative":"n","tags":null},"odd":false}"#,
    )
    .unwrap();
    let mut store = open(&temp);
    store.put("new", "x", "").unwrap();

    assert_eq!(open(&temp).names(), vec!["keep1", "keep2", "new"]);
    let stored = fs::read_to_string(temp.path().join(format!("{}.json", PRESETS_KEY))).unwrap();
    let value: serde_json::Value = serde_json::from_str(&stored).unwrap();
    assert_eq!(value["odd"], false);
    assert_eq!(value["keep2"]["negative"], "n");
}
