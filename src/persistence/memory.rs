//! In-memory storage backend

use super::traits::KeyValueStorage;
use crate::error::{StoreError, StoreResult};
use std::collections::BTreeMap;
use std::sync::Mutex;

/// Process-local key-value storage with an optional byte quota
///
/// The quota counts key and value lengths together, the way browser storage
/// does. A write that would exceed it fails with `QuotaExceeded` and leaves
/// the stored data untouched.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: Mutex<BTreeMap<String, String>>,
    quota_bytes: Option<usize>,
}

impl MemoryStorage {
    /// Create an unlimited in-memory storage
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an in-memory storage limited to `quota_bytes`
    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            items: Mutex::new(BTreeMap::new()),
            quota_bytes: Some(quota_bytes),
        }
    }

    /// Bytes currently used by keys and values
    pub fn used_bytes(&self) -> StoreResult<usize> {
        let items = self.items.lock()?;
        Ok(items.iter().map(|(k, v)| k.len() + v.len()).sum())
    }

    pub fn quota_bytes(&self) -> Option<usize> {
        self.quota_bytes
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.items.lock()?.get(key).cloned())
    }

    fn set_item(&self, key: &str, raw: &str) -> StoreResult<()> {
        let mut items = self.items.lock()?;

        check_quota(&items, self.quota_bytes, key, raw)?;
        items.insert(key.to_string(), raw.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> StoreResult<()> {
        self.items.lock()?.remove(key);
        Ok(())
    }

    fn keys(&self) -> StoreResult<Vec<String>> {
        Ok(self.items.lock()?.keys().cloned().collect())
    }
}

/// Fail with `QuotaExceeded` if writing `raw` under `key` would overflow `quota`
pub(crate) fn check_quota(
    items: &BTreeMap<String, String>,
    quota: Option<usize>,
    key: &str,
    raw: &str,
) -> StoreResult<()> {
    let Some(quota) = quota else {
        return Ok(());
    };

    let used: usize = items
        .iter()
        .filter(|(k, _)| k.as_str() != key)
        .map(|(k, v)| k.len() + v.len())
        .sum();
    if used + key.len() + raw.len() > quota {
        return Err(StoreError::QuotaExceeded {
            key: key.to_string(),
        });
    }
    Ok(())
}
