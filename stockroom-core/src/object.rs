//! Content-addressed object model
//!
//! Samples, arrayset manifests and commits are addressed by the SHA-256 of
//! their encoded bytes. Commits form a linear chain (single parent).

use crate::backend::BackendCode;
use crate::schema::ArraySchema;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Content address of a stored object (32 raw SHA-256 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectId([u8; 32]);

impl ObjectId {
    /// Wrap an already-computed digest
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Hash `data` and return its address
    pub fn from_data(data: &[u8]) -> Self {
        Self(Sha256::digest(data).into())
    }

    /// Lowercase hex rendering, 64 characters
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Abbreviated hex rendering for log lines
    pub fn short_hex(&self) -> String {
        hex::encode(&self.0[..4])
    }

    /// Parse a 64-character hex string back into an id
    pub fn from_hex(hex_str: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(hex_str)?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| hex::FromHexError::InvalidStringLength)?;
        Ok(Self(arr))
    }

    /// The raw digest
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Location of one stored sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleRef {
    /// Content address of the raw sample buffer
    pub id: ObjectId,
    /// Backend the sample was written through
    pub backend: BackendCode,
}

/// Committed state of a single arrayset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArraysetManifest {
    pub schema: ArraySchema,
    /// Sorted key -> sample mapping for deterministic hashing
    pub samples: BTreeMap<String, SampleRef>,
}

impl ArraysetManifest {
    pub fn new(schema: ArraySchema) -> Self {
        Self {
            schema,
            samples: BTreeMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Commit object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitRecord {
    /// Parent commit id (None for the initial commit)
    pub parent: Option<ObjectId>,
    /// Author name
    pub author: String,
    /// Author email
    pub email: String,
    /// Commit message
    pub message: String,
    /// Commit timestamp (Unix seconds)
    pub timestamp: i64,
    /// Arrayset name -> manifest at this commit
    pub manifests: BTreeMap<String, ArraysetManifest>,
}

impl CommitRecord {
    /// Compute the object ID
    pub fn id(&self) -> ObjectId {
        ObjectId::from_data(&bincode::serialize(self).unwrap_or_default())
    }

    /// Serialize to binary format
    pub fn to_bytes(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    /// Deserialize from binary format
    pub fn from_bytes(data: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(data)
    }

    /// Check if this is an initial commit (no parent)
    pub fn is_initial(&self) -> bool {
        self.parent.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::DType;

    #[test]
    fn test_object_id_roundtrip() {
        let bytes = [42u8; 32];
        let id = ObjectId::new(bytes);
        let hex = id.to_hex();
        let id2 = ObjectId::from_hex(&hex).unwrap();
        assert_eq!(id, id2);
        assert_eq!(id.short_hex(), &hex[..8]);
        assert!(ObjectId::from_hex("abcd").is_err());
    }

    #[test]
    fn test_object_id_from_data() {
        let id = ObjectId::from_data(b"hello world");
        assert_eq!(id.to_hex().len(), 64);
        assert_eq!(id, ObjectId::from_data(b"hello world"));
        assert_ne!(id, ObjectId::from_data(b"hello worlds"));
    }

    #[test]
    fn test_commit_serialization() {
        let mut manifests = BTreeMap::new();
        manifests.insert(
            "aset".to_string(),
            ArraysetManifest::new(ArraySchema {
                dtype: DType::I64,
                shape: vec![4, 5],
            }),
        );
        let commit = CommitRecord {
            parent: Some(ObjectId::new([2u8; 32])),
            author: "Test Author".to_string(),
            email: "t@e.st".to_string(),
            message: "Test message".to_string(),
            timestamp: 1234567890,
            manifests,
        };
        let bytes = commit.to_bytes().unwrap();
        let commit2 = CommitRecord::from_bytes(&bytes).unwrap();
        assert_eq!(commit.id(), commit2.id());
        assert!(!commit.is_initial());
    }
}
