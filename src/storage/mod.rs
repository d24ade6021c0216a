use anyhow::Result;

pub mod filesystem;
pub mod memory;

pub use filesystem::FileSystemStorage;
pub use memory::MemoryStorage;

/// Key the preset library is stored under.
pub const PRESETS_KEY: &str = "wanvideo_wakawave_prompt_presets";

/// Trait defining the interface for preset persistence backends.
///
/// A backend is a flat key-value space of strings, the same model as browser
/// local storage. The preset store only ever uses a single key.
pub trait PresetStorage: Send + Sync + 'static { // Ensure Send + Sync for Arc<dyn T>
    /// Reads the value stored under `key`, or `None` if nothing was written yet.
    fn read(&self, key: &str) -> Result<Option<String>>;

    /// Replaces the value stored under `key`.
    fn write(&self, key: &str, contents: &str) -> Result<()>;
}
