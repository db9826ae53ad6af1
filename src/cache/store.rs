// =============================================================================
// Key-value stores backing the market cache
// =============================================================================
//
// `KvStore` is the small capability the cache needs: get / set / delete of
// string values. Two media are provided:
//   - MemoryStore: process-local map, optional entry quota.
//   - FileStore:   one JSON file per key under a directory. Writes land in a
//                  unique temp file and are renamed into place, so a reader
//                  never sees a half-written entry.
// =============================================================================

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use tracing::debug;

use crate::error::StoreError;

pub trait KvStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    /// Removing a missing key is not an error.
    fn delete(&self, key: &str) -> Result<(), StoreError>;
}

// =============================================================================
// MemoryStore
// =============================================================================

/// In-memory store. With a quota, inserting a new key beyond the limit fails
/// with [`StoreError::QuotaExceeded`]; overwriting an existing key never does.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
    quota: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(limit: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            quota: Some(limit),
        }
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.write();
        if let Some(limit) = self.quota {
            if !entries.contains_key(key) && entries.len() >= limit {
                return Err(StoreError::QuotaExceeded { limit });
            }
        }
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.entries.write().remove(key);
        Ok(())
    }
}

// =============================================================================
// FileStore
// =============================================================================

/// Directory-backed store: key `k` lives in `<dir>/k.json`.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open (and create if needed) the store directory.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        debug!(dir = %dir.display(), "file store opened");
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let safe: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
            .collect();
        self.dir.join(format!("{safe}.json"))
    }
}

impl KvStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.path_for(key);
        // Unique temp name so concurrent writers of the same key do not
        // interleave; the last rename wins.
        let tmp_path = path.with_extension(format!("{}.tmp", uuid::Uuid::new_v4().simple()));

        std::fs::write(&tmp_path, value)?;
        if let Err(e) = std::fs::rename(&tmp_path, &path) {
            let _ = std::fs::remove_file(&tmp_path);
            return Err(e.into());
        }
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
pub(crate) fn temp_store_dir() -> PathBuf {
    std::env::temp_dir().join(format!("rentscope-test-{}", uuid::Uuid::new_v4().simple()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_roundtrip() {
        let store = MemoryStore::new();
        assert_eq!(store.get("a").unwrap(), None);
        store.set("a", "1").unwrap();
        assert_eq!(store.get("a").unwrap().as_deref(), Some("1"));
        store.set("a", "2").unwrap();
        assert_eq!(store.get("a").unwrap().as_deref(), Some("2"));
        store.delete("a").unwrap();
        assert_eq!(store.get("a").unwrap(), None);
        store.delete("a").unwrap();
    }

    #[test]
    fn memory_store_quota_rejects_new_keys_only() {
        let store = MemoryStore::with_quota(1);
        store.set("a", "1").unwrap();
        assert_eq!(store.set("b", "1"), Err(StoreError::QuotaExceeded { limit: 1 }));
        store.set("a", "2").unwrap();
        assert_eq!(store.get("b").unwrap(), None);
    }

    #[test]
    fn file_store_roundtrip() {
        let dir = temp_store_dir();
        let store = FileStore::open(&dir).unwrap();

        assert_eq!(store.get("rentcast_cache_32789").unwrap(), None);
        store.set("rentcast_cache_32789", r#"{"timestamp":1}"#).unwrap();
        assert_eq!(
            store.get("rentcast_cache_32789").unwrap().as_deref(),
            Some(r#"{"timestamp":1}"#)
        );
        assert!(dir.join("rentcast_cache_32789.json").exists());

        store.set("rentcast_cache_32789", "{}").unwrap();
        assert_eq!(store.get("rentcast_cache_32789").unwrap().as_deref(), Some("{}"));

        store.delete("rentcast_cache_32789").unwrap();
        assert_eq!(store.get("rentcast_cache_32789").unwrap(), None);
        store.delete("rentcast_cache_32789").unwrap();

        let leftovers: Vec<_> = std::fs::read_dir(&dir).unwrap().collect();
        assert!(leftovers.is_empty());

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn file_store_sanitises_keys() {
        let dir = temp_store_dir();
        let store = FileStore::open(&dir).unwrap();
        store.set("../escape", "x").unwrap();
        assert!(dir.join("___escape.json").exists());
        assert_eq!(store.get("../escape").unwrap().as_deref(), Some("x"));
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
