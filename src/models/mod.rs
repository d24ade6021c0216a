pub mod preset;
pub mod prompt;

pub use preset::{PresetDetails, PresetMap, PresetRecord};
pub use prompt::{Direction, PromptEntry};
