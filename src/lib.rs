//! Prompt line parsing, bundle encoding and a preset library for the
//! Wakawave prompt builder node.
//!
//! The host editor reports text edits to [`editor::PromptBinding`], which
//! parses each line with [`parser::parse`] and writes the JSON bundle the
//! backend node reads. Presets live in a [`store::PresetStore`] over any
//! [`storage::PresetStorage`] backend and are browsed through
//! [`browser::PresetBrowser`].

pub mod browser;
pub mod config;
pub mod editor;
pub mod error;
pub mod models;
pub mod parser;
pub mod storage;
pub mod store;
pub mod transfer;

pub use config::StoreConfig;
pub use error::{StoreError, TransferError};
pub use models::{Direction, PresetDetails, PresetMap, PresetRecord, PromptEntry};
pub use store::{ConflictPolicy, PresetStore};
