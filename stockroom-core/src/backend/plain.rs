//! Raw collection-file backend
//!
//! Samples are appended uncompressed to collection files of at most
//! `collection_size` samples, fanned out into directories of
//! `collection_count` files. Used for tiny samples where zstd framing
//! would cost more than it saves.

use crate::backend::{BackendCode, BackendStore};
use crate::error::{Result, StoreError};
use crate::object::ObjectId;
use crate::settings::BackendTuning;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CollectionEntry {
    collection: u64,
    offset: u64,
    len: u64,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CollectionIndex {
    current_collection: u64,
    samples_in_current: usize,
    entries: HashMap<String, CollectionEntry>,
}

/// Uncompressed collection-file store
pub struct PlainStore {
    root: PathBuf,
    tuning: BackendTuning,
    index: Mutex<CollectionIndex>,
}

impl PlainStore {
    /// Open or create a plain store rooted at `root`
    pub fn open(root: &Path, tuning: BackendTuning) -> Result<Self> {
        fs::create_dir_all(root)?;

        let index_path = root.join("index.json");
        let index = if index_path.exists() {
            let data = fs::read_to_string(&index_path)?;
            serde_json::from_str(&data).map_err(|e| StoreError::Serialization(e.to_string()))?
        } else {
            CollectionIndex::default()
        };

        Ok(Self {
            root: root.to_path_buf(),
            tuning,
            index: Mutex::new(index),
        })
    }

    fn index(&self) -> MutexGuard<'_, CollectionIndex> {
        self.index.lock().unwrap()
    }

    fn collection_path(&self, collection: u64) -> PathBuf {
        let fanout = collection / self.tuning.collection_count.max(1) as u64;
        self.root
            .join(format!("{:04}", fanout))
            .join(format!("col-{:06}.dat", collection))
    }

    fn save_index(&self, index: &CollectionIndex) -> Result<()> {
        let data = serde_json::to_string(index)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        fs::write(self.root.join("index.json"), data)?;
        Ok(())
    }
}

impl BackendStore for PlainStore {
    fn code(&self) -> BackendCode {
        BackendCode::Plain10
    }

    fn put(&self, data: &[u8]) -> Result<ObjectId> {
        let id = ObjectId::from_data(data);
        let mut index = self.index();

        if index.entries.contains_key(&id.to_hex()) {
            return Ok(id);
        }

        if index.samples_in_current >= self.tuning.collection_size.max(1) {
            index.current_collection += 1;
            index.samples_in_current = 0;
        }
        let collection = index.current_collection;

        let path = self.collection_path(collection);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        let offset = file.metadata()?.len();
        file.write_all(data)?;

        index.entries.insert(
            id.to_hex(),
            CollectionEntry {
                collection,
                offset,
                len: data.len() as u64,
            },
        );
        index.samples_in_current += 1;
        self.save_index(&index)?;

        Ok(id)
    }

    fn get(&self, id: ObjectId) -> Result<Bytes> {
        let entry = {
            let index = self.index();
            index
                .entries
                .get(&id.to_hex())
                .cloned()
                .ok_or(StoreError::NotFound(id))?
        };

        let mut file = File::open(self.collection_path(entry.collection))?;
        file.seek(SeekFrom::Start(entry.offset))?;
        let mut buf = vec![0u8; entry.len as usize];
        file.read_exact(&mut buf)?;
        Ok(Bytes::from(buf))
    }

    fn exists(&self, id: ObjectId) -> Result<bool> {
        Ok(self.index().entries.contains_key(&id.to_hex()))
    }

    fn flush(&self) -> Result<()> {
        let index = self.index();
        self.save_index(&index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_get_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = PlainStore::open(
            dir.path(),
            BackendTuning {
                collection_count: 10,
                collection_size: 50,
            },
        )
        .unwrap();
        let data = b"small sample".to_vec();
        let id = store.put(&data).unwrap();
        assert!(store.exists(id).unwrap());
        assert_eq!(store.get(id).unwrap().as_ref(), data.as_slice());
    }

    #[test]
    fn test_collection_rotation() {
        let dir = tempfile::tempdir().unwrap();
        let store = PlainStore::open(
            dir.path(),
            BackendTuning {
                collection_count: 10,
                collection_size: 2,
            },
        )
        .unwrap();
        for i in 0..5u8 {
            store.put(&[i; 16]).unwrap();
        }
        // 5 samples at 2 per collection -> collections 0, 1, 2
        assert_eq!(store.index().current_collection, 2);
    }

    #[test]
    fn test_persistence_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let tuning = BackendTuning {
            collection_count: 10,
            collection_size: 50,
        };
        let data = b"survives reopen".to_vec();
        let id = {
            let store = PlainStore::open(dir.path(), tuning).unwrap();
            store.put(&data).unwrap()
        };
        let store = PlainStore::open(dir.path(), tuning).unwrap();
        assert_eq!(store.get(id).unwrap().as_ref(), data.as_slice());
    }
}
