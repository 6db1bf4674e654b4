//! Singleton store registry
//!
//! One store instance per storage key for the lifetime of the registry.
//! Repeated lookups hand back the same `Arc`, so every observer shares one
//! in-memory state.
//!
//! ```text
//! get_or_create(["selected", "r1"])
//!        │
//!        ▼
//!   "selected_r1" ──► instances ──► hit ──► Arc<S> (same object)
//!                          │
//!                          └─ miss ──► build ──► hydrate ──► register
//! ```

use super::core::Hydrate;
use crate::config::StoreConfig;
use crate::domain::navigation::{Navigator, NoopNavigator};
use crate::error::{StoreError, StoreResult};
use crate::persistence::{KeyValueStorage, StorageFactory};
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

/// Everything a store needs from its host
#[derive(Clone)]
pub struct StoreContext {
    config: StoreConfig,
    storage: Arc<dyn KeyValueStorage>,
    navigator: Arc<dyn Navigator>,
}

impl StoreContext {
    pub fn new(config: StoreConfig, storage: Arc<dyn KeyValueStorage>) -> Self {
        Self {
            config,
            storage,
            navigator: Arc::new(NoopNavigator),
        }
    }

    pub fn with_navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = navigator;
        self
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn storage(&self) -> &Arc<dyn KeyValueStorage> {
        &self.storage
    }

    pub fn navigator(&self) -> &Arc<dyn Navigator> {
        &self.navigator
    }

    /// Persisted key for a logical store key
    pub fn storage_key(&self, key: &str) -> String {
        self.config.storage_key(key)
    }
}

/// A logical store key, built by joining key parts with `_`
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct StoreKey(String);

impl StoreKey {
    pub fn from_parts<I, P>(parts: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<str>,
    {
        let parts: Vec<String> = parts.into_iter().map(|p| p.as_ref().to_string()).collect();
        StoreKey(parts.join("_"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StoreKey {
    fn from(key: &str) -> Self {
        StoreKey(key.to_string())
    }
}

impl From<String> for StoreKey {
    fn from(key: String) -> Self {
        StoreKey(key)
    }
}

impl From<&String> for StoreKey {
    fn from(key: &String) -> Self {
        StoreKey(key.clone())
    }
}

impl From<&[&str]> for StoreKey {
    fn from(parts: &[&str]) -> Self {
        StoreKey::from_parts(parts)
    }
}

impl<const N: usize> From<[&str; N]> for StoreKey {
    fn from(parts: [&str; N]) -> Self {
        StoreKey::from_parts(parts)
    }
}

impl From<Vec<String>> for StoreKey {
    fn from(parts: Vec<String>) -> Self {
        StoreKey::from_parts(parts)
    }
}

/// Key used when a store is requested without key parts: the type name,
/// lowercased, without module path or generic arguments
pub fn default_key<S>() -> String {
    let full = std::any::type_name::<S>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base).to_lowercase()
}

type Instance = Arc<dyn Any + Send + Sync>;

/// Process-scoped map from storage key to store instance
pub struct StoreRegistry {
    context: StoreContext,
    instances: Mutex<HashMap<String, Instance>>,
}

impl StoreRegistry {
    /// Registry over the backend selected by `config`
    pub fn new(config: StoreConfig) -> Self {
        let storage = StorageFactory::create(&config);
        Self::with_storage(config, storage)
    }

    /// Registry over an explicit backend
    pub fn with_storage(config: StoreConfig, storage: Arc<dyn KeyValueStorage>) -> Self {
        Self {
            context: StoreContext::new(config, storage),
            instances: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.context = self.context.with_navigator(navigator);
        self
    }

    pub fn context(&self) -> &StoreContext {
        &self.context
    }

    pub fn config(&self) -> &StoreConfig {
        self.context.config()
    }

    /// Number of registered stores
    pub fn len(&self) -> usize {
        self.instances.lock().map(|i| i.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, key: &str) -> bool {
        self.instances
            .lock()
            .map(|i| i.contains_key(key))
            .unwrap_or(false)
    }

    /// Return the store registered under `key`, building it on first use
    ///
    /// `build` runs without the registry lock held, so it may request other
    /// stores. A new store is hydrated before it is registered. If another
    /// caller registered the key meanwhile, that instance wins. A key owned by
    /// a different store type is a [`StoreError::KeyConflict`].
    pub fn get_or_create<S, F>(&self, key: impl Into<StoreKey>, build: F) -> StoreResult<Arc<S>>
    where
        S: Hydrate,
        F: FnOnce(String, &StoreRegistry) -> StoreResult<S>,
    {
        let key = key.into();
        let key = if key.is_empty() {
            default_key::<S>()
        } else {
            key.into_string()
        };
        if key.is_empty() {
            return Err(StoreError::InvalidKey);
        }

        if let Some(existing) = self.lookup::<S>(&key)? {
            return Ok(existing);
        }

        let store = Arc::new(build(key.clone(), self)?);
        store.hydrate()?;

        let mut instances = self.instances.lock()?;
        match instances.get(&key) {
            Some(existing) => downcast::<S>(&key, existing),
            None => {
                let instance: Instance = store.clone();
                instances.insert(key, instance);
                Ok(store)
            }
        }
    }

    fn lookup<S: Hydrate>(&self, key: &str) -> StoreResult<Option<Arc<S>>> {
        let instances = self.instances.lock()?;
        instances
            .get(key)
            .map(|instance| downcast::<S>(key, instance))
            .transpose()
    }
}

fn downcast<S: Send + Sync + 'static>(key: &str, instance: &Instance) -> StoreResult<Arc<S>> {
    Arc::clone(instance)
        .downcast::<S>()
        .map_err(|_| StoreError::KeyConflict {
            key: key.to_string(),
        })
}
