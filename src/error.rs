//! Error types for the preset library and file transfer

use thiserror::Error;

/// Errors returned by [`crate::store::PresetStore`] operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Preset name must not be empty")]
    EmptyName,

    #[error("Preset \"{0}\" not found")]
    NotFound(String),

    #[error("A preset named \"{0}\" already exists")]
    NameCollision(String),

    /// The change was applied in memory but could not be written out.
    #[error("Preset storage unavailable; changes are kept in memory only: {0:#}")]
    PersistenceUnavailable(#[source] anyhow::Error),
}

impl StoreError {
    /// Check if the in-memory library changed even though this error was returned
    pub fn is_unsaved_change(&self) -> bool {
        matches!(self, StoreError::PersistenceUnavailable(_))
    }

    /// Message suitable for showing to the user in an alert
    pub fn user_message(&self) -> String {
        match self {
            StoreError::NameCollision(_) => "A preset with that name already exists!".to_string(),
            StoreError::NotFound(_) => "Preset not found!".to_string(),
            other => other.to_string(),
        }
    }
}

/// Errors from reading or writing preset import/export files
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid preset file: {0}")]
    InvalidFormat(#[from] serde_json::Error),

    #[error("Preset \"{0}\" not found")]
    NotFound(String),
}
