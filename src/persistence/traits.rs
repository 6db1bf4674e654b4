//! Persistence trait definitions
//!
//! A backend stores raw strings under string keys, synchronously. It must
//! tell "missing key" apart from a failing medium, and surface a full medium
//! as [`StoreError::QuotaExceeded`](crate::error::StoreError::QuotaExceeded).

use crate::error::StoreResult;

/// Synchronous key-value medium
///
/// Implementations can use different storage backends (memory, file, etc.)
pub trait KeyValueStorage: Send + Sync {
    /// Raw value under `key`, `None` if the key is missing
    fn get_item(&self, key: &str) -> StoreResult<Option<String>>;

    /// Store `raw` under `key`, replacing any previous value
    fn set_item(&self, key: &str, raw: &str) -> StoreResult<()>;

    /// Remove `key`; removing a missing key is not an error
    fn remove_item(&self, key: &str) -> StoreResult<()>;

    /// All keys currently stored
    fn keys(&self) -> StoreResult<Vec<String>>;

    /// Check if a key exists
    fn has_item(&self, key: &str) -> StoreResult<bool> {
        Ok(self.get_item(key)?.is_some())
    }

    /// Count stored keys
    fn count_items(&self) -> StoreResult<usize> {
        Ok(self.keys()?.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct MockStorage {
        items: Mutex<HashMap<String, String>>,
    }

    impl KeyValueStorage for MockStorage {
        fn get_item(&self, key: &str) -> StoreResult<Option<String>> {
            Ok(self.items.lock()?.get(key).cloned())
        }

        fn set_item(&self, key: &str, raw: &str) -> StoreResult<()> {
            self.items.lock()?.insert(key.to_string(), raw.to_string());
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

    #[test]
    fn test_default_methods() {
        let storage = MockStorage {
            items: Mutex::new(HashMap::new()),
        };

        assert!(!storage.has_item("store_a").unwrap());
        assert_eq!(storage.count_items().unwrap(), 0);

        storage.set_item("store_a", "[1]").unwrap();
        assert!(storage.has_item("store_a").unwrap());
        assert_eq!(storage.count_items().unwrap(), 1);

        storage.remove_item("store_a").unwrap();
        storage.remove_item("store_a").unwrap();
        assert!(!storage.has_item("store_a").unwrap());
    }
}
