//! Error types for Cellar
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using CellarError
pub type Result<T> = std::result::Result<T, CellarError>;

/// Unified error type for Cellar operations
#[derive(Debug, Error)]
pub enum CellarError {
    // -------------------------------------------------------------------------
    // Validation Errors
    // -------------------------------------------------------------------------
    #[error("Validation error: {0}")]
    Validation(String),

    // -------------------------------------------------------------------------
    // Lookup Errors
    // -------------------------------------------------------------------------
    #[error("Key not found: {0}")]
    KeyNotFound(String),

    #[error("Record not found at {0}")]
    RecordNotFound(String),

    /// The catalog points at a record that no longer exists in the backend
    #[error("Catalog corruption: key {key:?} references missing record {id}")]
    Corruption { key: String, id: String },

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Decode error: {0}")]
    Decode(String),

    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Object store error: {0}")]
    ObjectStore(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl CellarError {
    /// True for every "nothing there" flavour: unknown key, missing record,
    /// or a catalog entry whose record has vanished.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            CellarError::KeyNotFound(_)
                | CellarError::RecordNotFound(_)
                | CellarError::Corruption { .. }
        )
    }
}
