//! Error taxonomy for the array store

use crate::object::ObjectId;
use std::path::PathBuf;

/// Result type for store operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur while operating on a repository or its backends
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Object not found: {0}")]
    NotFound(ObjectId),

    #[error("Sample not found: {0}")]
    SampleNotFound(String),

    #[error("Arrayset not found: {0}")]
    ArraysetNotFound(String),

    #[error("Arrayset already exists: {0}")]
    ArraysetExists(String),

    #[error("Invalid name: {0:?}")]
    InvalidName(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("Environments already closed")]
    Closed,

    #[error("Write lock held at {0:?}")]
    LockHeld(PathBuf),

    #[error("Schema mismatch for {key:?}: expected {expected}, got {actual}")]
    SchemaMismatch {
        key: String,
        expected: String,
        actual: String,
    },

    #[error("Shape/dtype mismatch: {0}")]
    ShapeMismatch(String),
}
