//! Storage factory
//!
//! Creates the persistence backend described by a [`StoreConfig`].

use super::file::FileStorage;
use super::memory::MemoryStorage;
use super::traits::KeyValueStorage;
use crate::config::{StorageBackend, StoreConfig};
use std::sync::Arc;

/// Factory for creating storage backends
pub struct StorageFactory;

impl StorageFactory {
    /// Create the backend selected by `config`
    pub fn create(config: &StoreConfig) -> Arc<dyn KeyValueStorage> {
        match &config.backend {
            StorageBackend::Memory => match config.quota_bytes {
                Some(quota) => Arc::new(MemoryStorage::with_quota(quota)),
                None => Arc::new(MemoryStorage::new()),
            },
            StorageBackend::File(path) => {
                let storage = FileStorage::new(path.clone());
                match config.quota_bytes {
                    Some(quota) => Arc::new(storage.with_quota(quota)),
                    None => Arc::new(storage),
                }
            }
        }
    }

    /// Create an unlimited in-memory backend
    pub fn create_memory() -> Arc<dyn KeyValueStorage> {
        Arc::new(MemoryStorage::new())
    }
}
