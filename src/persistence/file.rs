//! File-based storage backend
//!
//! All keys live in one JSON object file mapping each key to its raw string.
//! The file is read once on first access and rewritten after every change.

use super::memory::check_quota;
use super::traits::KeyValueStorage;
use crate::error::{StoreError, StoreResult};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Key-value storage persisted to a JSON file
#[derive(Debug)]
pub struct FileStorage {
    store_path: PathBuf,
    items: Mutex<Option<BTreeMap<String, String>>>,
    quota_bytes: Option<usize>,
}

impl FileStorage {
    /// Create a new file-backed storage; the file is created on first write
    pub fn new(store_path: impl Into<PathBuf>) -> Self {
        Self {
            store_path: store_path.into(),
            items: Mutex::new(None),
            quota_bytes: None,
        }
    }

    /// Limit the total size of stored keys and values
    pub fn with_quota(mut self, quota_bytes: usize) -> Self {
        self.quota_bytes = Some(quota_bytes);
        self
    }

    pub fn store_path(&self) -> &Path {
        &self.store_path
    }

    /// Drop the in-memory copy so the next access re-reads the file
    pub fn reload(&self) -> StoreResult<()> {
        *self.items.lock()? = None;
        Ok(())
    }

    fn load(&self) -> StoreResult<BTreeMap<String, String>> {
        if !self.store_path.exists() {
            return Ok(BTreeMap::new());
        }

        let raw = fs::read_to_string(&self.store_path).map_err(|e| {
            StoreError::StorageReadFailed(format!("{}: {}", self.store_path.display(), e))
        })?;
        if raw.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        serde_json::from_str(&raw).map_err(|e| {
            StoreError::StorageReadFailed(format!("{}: {}", self.store_path.display(), e))
        })
    }

    fn save(&self, items: &BTreeMap<String, String>) -> StoreResult<()> {
        if let Some(parent) = self.store_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let json = serde_json::to_string_pretty(items)?;
        let tmp_path = self.store_path.with_extension("json.tmp");
        fs::write(&tmp_path, json).map_err(|e| StoreError::StorageSaveFailed(e.to_string()))?;
        fs::rename(&tmp_path, &self.store_path)
            .map_err(|e| StoreError::StorageSaveFailed(e.to_string()))?;
        Ok(())
    }

    /// Run `f` against the loaded items, loading them first if needed
    fn with_items<R>(
        &self,
        f: impl FnOnce(&mut BTreeMap<String, String>) -> StoreResult<R>,
    ) -> StoreResult<R> {
        let mut guard = self.items.lock()?;
        if guard.is_none() {
            *guard = Some(self.load()?);
        }
        match guard.as_mut() {
            Some(items) => f(items),
            None => Err(StoreError::StorageUnavailable),
        }
    }
}

impl KeyValueStorage for FileStorage {
    fn get_item(&self, key: &str) -> StoreResult<Option<String>> {
        self.with_items(|items| Ok(items.get(key).cloned()))
    }

    fn set_item(&self, key: &str, raw: &str) -> StoreResult<()> {
        self.with_items(|items| {
            check_quota(items, self.quota_bytes, key, raw)?;

            let previous = items.insert(key.to_string(), raw.to_string());
            if let Err(e) = self.save(items) {
                // Keep memory and disk in agreement
                match previous {
                    Some(old) => items.insert(key.to_string(), old),
                    None => items.remove(key),
                };
                return Err(e);
            }
            Ok(())
        })
    }

    fn remove_item(&self, key: &str) -> StoreResult<()> {
        self.with_items(|items| {
            if let Some(previous) = items.remove(key) {
                if let Err(e) = self.save(items) {
                    items.insert(key.to_string(), previous);
                    return Err(e);
                }
            }
            Ok(())
        })
    }

    fn keys(&self) -> StoreResult<Vec<String>> {
        self.with_items(|items| Ok(items.keys().cloned().collect()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_storage_creation() {
        let storage = FileStorage::new("test-store.json");
        assert_eq!(storage.store_path(), Path::new("test-store.json"));
    }

    #[test]
    fn test_values_survive_a_new_instance() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("stores.json");

        let storage = FileStorage::new(&path);
        assert_eq!(storage.get_item("store_a").unwrap(), None);
        storage.set_item("store_a", "[\"x\"]").unwrap();
        storage.set_item("store_b", "true").unwrap();
        storage.remove_item("store_b").unwrap();

        let reopened = FileStorage::new(&path);
        assert_eq!(
            reopened.get_item("store_a").unwrap(),
            Some("[\"x\"]".to_string())
        );
        assert_eq!(reopened.get_item("store_b").unwrap(), None);
        assert_eq!(reopened.keys().unwrap(), vec!["store_a".to_string()]);
    }

    #[test]
    fn test_reload_picks_up_external_writes() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("stores.json");

        let first = FileStorage::new(&path);
        let second = FileStorage::new(&path);
        assert_eq!(second.get_item("k").unwrap(), None);

        first.set_item("k", "1").unwrap();
        assert_eq!(second.get_item("k").unwrap(), None);

        second.reload().unwrap();
        assert_eq!(second.get_item("k").unwrap(), Some("1".to_string()));
    }

    #[test]
    fn test_unreadable_file_is_reported() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("stores.json");
        fs::write(&path, "not json").unwrap();

        let storage = FileStorage::new(&path);
        assert!(matches!(
            storage.get_item("k"),
            Err(StoreError::StorageReadFailed(_))
        ));
    }

    #[test]
    fn test_quota_applies_to_file_backend() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::new(temp_dir.path().join("stores.json")).with_quota(8);

        storage.set_item("k", "1234").unwrap();
        assert!(matches!(
            storage.set_item("other", "1234"),
            Err(StoreError::QuotaExceeded { .. })
        ));
        assert_eq!(storage.count_items().unwrap(), 1);
    }

    #[test]
    fn test_failed_save_keeps_removed_entry() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("stores.json");
        let storage = FileStorage::new(&path);
        storage.set_item("k", "1").unwrap();

        // A non-empty directory in place of the file makes the rename fail
        fs::remove_file(&path).unwrap();
        fs::create_dir(&path).unwrap();
        fs::write(path.join("blocker"), "x").unwrap();

        assert!(matches!(
            storage.remove_item("k"),
            Err(StoreError::StorageSaveFailed(_))
        ));
        assert_eq!(storage.get_item("k").unwrap(), Some("1".to_string()));
    }
}
