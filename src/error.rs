//! Error types for cdvault
//!
//! Provides a unified error type for all operations. The repository's
//! fail-soft wrappers collapse these into empty records or `false`; the
//! `try_*` operations return them as-is.

use thiserror::Error;

/// Result type alias using VaultError
pub type Result<T> = std::result::Result<T, VaultError>;

/// Unified error type for cdvault operations
#[derive(Debug, Error)]
pub enum VaultError {
    // -------------------------------------------------------------------------
    // Lifecycle Errors
    // -------------------------------------------------------------------------
    #[error("Database is not open")]
    NotOpen,

    // -------------------------------------------------------------------------
    // Argument Errors
    // -------------------------------------------------------------------------
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Key too long: {len} bytes (max {max})")]
    KeyTooLong { len: usize, max: usize },

    #[error("Key not found")]
    KeyNotFound,

    // -------------------------------------------------------------------------
    // Storage Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Corruption detected: {0}")]
    Corruption(String),

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl VaultError {
    /// True for failures of the underlying table files rather than of the
    /// caller's input.
    pub fn is_storage_failure(&self) -> bool {
        matches!(
            self,
            VaultError::Io(_)
                | VaultError::Storage(_)
                | VaultError::Corruption(_)
                | VaultError::Serialization(_)
        )
    }
}

impl From<bincode::Error> for VaultError {
    fn from(e: bincode::Error) -> Self {
        VaultError::Serialization(e.to_string())
    }
}
