//! Storage backends for sample data
//!
//! Samples are content-addressed by the SHA-256 of their raw buffer and
//! written through one of two backends chosen per arrayset schema:
//! `packed` (zstd pack files, for larger samples) or `plain` (raw
//! collection files, for tiny samples not worth the compression framing).

pub mod packed;
pub mod plain;

pub use packed::PackedStore;
pub use plain::PlainStore;

use crate::error::Result;
use crate::object::ObjectId;
use crate::schema::ArraySchema;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Backend discriminator recorded in sample refs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BackendCode {
    Packed00,
    Plain10,
}

impl BackendCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendCode::Packed00 => "packed_00",
            BackendCode::Plain10 => "plain_10",
        }
    }
}

impl std::fmt::Display for BackendCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Generic sample store interface
///
/// All backends must implement this trait
pub trait BackendStore: Send + Sync {
    /// Which backend this store implements
    fn code(&self) -> BackendCode;

    /// Put sample data (returns its content address)
    fn put(&self, data: &[u8]) -> Result<ObjectId>;

    /// Get sample data by content address
    fn get(&self, id: ObjectId) -> Result<Bytes>;

    /// Check if a sample exists
    fn exists(&self, id: ObjectId) -> Result<bool>;

    /// Persist any buffered state to disk
    fn flush(&self) -> Result<()>;
}

/// Samples at or above this size go to the packed backend
pub const PACKED_THRESHOLD_BYTES: usize = 128;

/// Pick the backend for an arrayset schema
pub fn choose_backend(schema: &ArraySchema) -> BackendCode {
    if schema.sample_nbytes() >= PACKED_THRESHOLD_BYTES {
        BackendCode::Packed00
    } else {
        BackendCode::Plain10
    }
}
