//! Error types for AssortDB
//!
//! Provides a unified error type for all operations.
//!
//! Errors fall into two families:
//! - **Domain faults** (`SizeMismatch`, `DuplicateKey`, `Config`) go straight
//!   back to the caller and never touch the backing file.
//! - **Storage faults** (`Io`, `Corruption`) come from the backing table and
//!   trigger the reset policy in [`crate::recovery`].

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using AssortError
pub type Result<T> = std::result::Result<T, AssortError>;

/// Unified error type for AssortDB operations
#[derive(Debug, Error)]
pub enum AssortError {
    // -------------------------------------------------------------------------
    // Storage Faults
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Table corruption detected: {0}")]
    Corruption(String),

    // -------------------------------------------------------------------------
    // Domain Faults
    // -------------------------------------------------------------------------
    #[error("Container size mismatch: expected {expected} references, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("Duplicate key: a record for term {0} already exists")]
    DuplicateKey(String),

    #[error("Configuration error: {0}")]
    Config(String),

    // -------------------------------------------------------------------------
    // Recovery Errors
    // -------------------------------------------------------------------------
    #[error("Cannot discard assortment file {path:?}: {source}")]
    RecoveryFatal {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Assortment table {0:?} is unavailable after a failed reset")]
    Unavailable(PathBuf),
}

impl AssortError {
    /// True for faults raised by the backing table (I/O or corruption).
    pub fn is_storage_fault(&self) -> bool {
        matches!(self, AssortError::Io(_) | AssortError::Corruption(_))
    }

    /// True only for low-level I/O faults.
    pub fn is_io(&self) -> bool {
        matches!(self, AssortError::Io(_))
    }
}

impl From<bincode::Error> for AssortError {
    fn from(err: bincode::Error) -> Self {
        match *err {
            bincode::ErrorKind::Io(e) => AssortError::Io(e),
            other => AssortError::Corruption(format!("undecodable log entry: {}", other)),
        }
    }
}
