//! Compressed pack-file backend
//!
//! Samples are zstd-compressed and appended to pack files. A pack rotates
//! after `collection_size` samples; packs fan out into numbered directories
//! of `collection_count` packs each. The JSON index maps content addresses
//! to (pack, offset, length) and is rewritten on every put so a crashed
//! process never loses acknowledged samples.

use crate::backend::{BackendCode, BackendStore};
use crate::error::{Result, StoreError};
use crate::object::ObjectId;
use crate::settings::BackendTuning;
use bytes::Bytes;
use lru::LruCache;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

const ZSTD_LEVEL: i32 = 3;
const READ_CACHE_CAPACITY: usize = 64;

/// Index record for one stored sample
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PackEntry {
    pack: u64,
    offset: u64,
    len: u64,
    uncompressed_len: u64,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct PackIndex {
    /// Pack currently being appended to
    current_pack: u64,
    /// Samples already in the current pack
    samples_in_current: usize,
    /// Content address (hex) -> location
    entries: HashMap<String, PackEntry>,
}

/// Zstd pack-file store
pub struct PackedStore {
    root: PathBuf,
    tuning: BackendTuning,
    index: Mutex<PackIndex>,
    cache: Mutex<LruCache<ObjectId, Bytes>>,
}

impl PackedStore {
    /// Open or create a packed store rooted at `root`
    pub fn open(root: &Path, tuning: BackendTuning) -> Result<Self> {
        fs::create_dir_all(root)?;

        let index_path = root.join("index.json");
        let index = if index_path.exists() {
            let data = fs::read_to_string(&index_path)?;
            serde_json::from_str(&data).map_err(|e| StoreError::Serialization(e.to_string()))?
        } else {
            PackIndex::default()
        };

        let capacity = NonZeroUsize::new(READ_CACHE_CAPACITY)
            .ok_or_else(|| StoreError::Backend("invalid read cache capacity".to_string()))?;

        Ok(Self {
            root: root.to_path_buf(),
            tuning,
            index: Mutex::new(index),
            cache: Mutex::new(LruCache::new(capacity)),
        })
    }

    fn index(&self) -> MutexGuard<'_, PackIndex> {
        self.index.lock().unwrap()
    }

    fn pack_path(&self, pack: u64) -> PathBuf {
        let fanout = pack / self.tuning.collection_count.max(1) as u64;
        self.root
            .join(format!("{:04}", fanout))
            .join(format!("pack-{:06}.dat", pack))
    }

    fn save_index(&self, index: &PackIndex) -> Result<()> {
        let data = serde_json::to_string(index)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        fs::write(self.root.join("index.json"), data)?;
        Ok(())
    }

    /// Number of pack files written so far
    pub fn pack_count(&self) -> u64 {
        let index = self.index();
        if index.entries.is_empty() {
            0
        } else {
            index.current_pack + 1
        }
    }
}

impl BackendStore for PackedStore {
    fn code(&self) -> BackendCode {
        BackendCode::Packed00
    }

    fn put(&self, data: &[u8]) -> Result<ObjectId> {
        let id = ObjectId::from_data(data);
        let mut index = self.index();

        // Content-addressed: identical samples are stored once
        if index.entries.contains_key(&id.to_hex()) {
            return Ok(id);
        }

        let compressed = zstd::encode_all(data, ZSTD_LEVEL)
            .map_err(|e| StoreError::Backend(format!("Compression failed: {}", e)))?;

        if index.samples_in_current >= self.tuning.collection_size.max(1) {
            index.current_pack += 1;
            index.samples_in_current = 0;
        }
        let pack = index.current_pack;

        let path = self.pack_path(pack);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        let offset = file.metadata()?.len();
        file.write_all(&compressed)?;

        index.entries.insert(
            id.to_hex(),
            PackEntry {
                pack,
                offset,
                len: compressed.len() as u64,
                uncompressed_len: data.len() as u64,
            },
        );
        index.samples_in_current += 1;
        self.save_index(&index)?;

        Ok(id)
    }

    fn get(&self, id: ObjectId) -> Result<Bytes> {
        {
            let mut cache = self.cache.lock().unwrap();
            if let Some(data) = cache.get(&id) {
                return Ok(data.clone());
            }
        }

        let entry = {
            let index = self.index();
            index
                .entries
                .get(&id.to_hex())
                .cloned()
                .ok_or(StoreError::NotFound(id))?
        };

        let mut file = File::open(self.pack_path(entry.pack))?;
        file.seek(SeekFrom::Start(entry.offset))?;
        let mut buf = vec![0u8; entry.len as usize];
        file.read_exact(&mut buf)?;

        let data = zstd::decode_all(&buf[..])
            .map_err(|e| StoreError::Backend(format!("Decompression failed: {}", e)))?;
        let bytes = Bytes::from(data);

        let mut cache = self.cache.lock().unwrap();
        cache.put(id, bytes.clone());
        Ok(bytes)
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

    fn tuning(count: usize, size: usize) -> BackendTuning {
        BackendTuning {
            collection_count: count,
            collection_size: size,
        }
    }

    #[test]
    fn test_put_get_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = PackedStore::open(dir.path(), tuning(10, 50)).unwrap();
        let data = vec![7u8; 1024];
        let id = store.put(&data).unwrap();
        assert!(store.exists(id).unwrap());
        assert_eq!(store.get(id).unwrap().as_ref(), data.as_slice());
    }

    #[test]
    fn test_dedup_identical_samples() {
        let dir = tempfile::tempdir().unwrap();
        let store = PackedStore::open(dir.path(), tuning(10, 50)).unwrap();
        let data = vec![1u8; 512];
        let a = store.put(&data).unwrap();
        let b = store.put(&data).unwrap();
        assert_eq!(a, b);
        assert_eq!(store.index().entries.len(), 1);
    }

    #[test]
    fn test_pack_rotation() {
        let dir = tempfile::tempdir().unwrap();
        let store = PackedStore::open(dir.path(), tuning(10, 3)).unwrap();
        for i in 0..7u8 {
            store.put(&vec![i; 300]).unwrap();
        }
        // 7 samples at 3 per pack -> packs 0, 1, 2
        assert_eq!(store.pack_count(), 3);
    }

    #[test]
    fn test_persistence_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let data = vec![9u8; 400];
        let id = {
            let store = PackedStore::open(dir.path(), tuning(10, 50)).unwrap();
            store.put(&data).unwrap()
        };
        let store = PackedStore::open(dir.path(), tuning(10, 50)).unwrap();
        assert_eq!(store.get(id).unwrap().as_ref(), data.as_slice());
    }

    #[test]
    fn test_missing_sample() {
        let dir = tempfile::tempdir().unwrap();
        let store = PackedStore::open(dir.path(), tuning(10, 50)).unwrap();
        let missing = ObjectId::from_data(b"never stored");
        assert!(matches!(
            store.get(missing),
            Err(StoreError::NotFound(_))
        ));
    }
}
