use super::core::{Hydrate, StoreCollection, StoreCore};
use super::merge::merge_deep_right;
use super::registry::{StoreContext, StoreKey, StoreRegistry};
use crate::app_log;
use crate::error::{StoreError, StoreResult};
use crate::events::{ChangeKind, StoreChangedEvent, SubscriptionId};
use crate::logger::LogLevel;
use crate::schema::Schema;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// Bounds shared by every value a store can hold
pub trait StoreValue: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {}

impl<T> StoreValue for T where T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {}

/// A single optional value
pub struct Scalar<T>(Option<T>);

impl<T> Default for Scalar<T> {
    fn default() -> Self {
        Scalar(None)
    }
}

impl<T: StoreValue> StoreCollection for Scalar<T> {
    type Item = T;

    fn to_list(&self) -> Vec<T> {
        self.0.iter().cloned().collect()
    }

    fn storable_data(&self) -> StoreResult<Option<Value>> {
        self.0
            .as_ref()
            .map(serde_json::to_value)
            .transpose()
            .map_err(StoreError::from)
    }

    fn from_data(data: Option<Value>) -> StoreResult<Self> {
        match data {
            None | Some(Value::Null) => Ok(Scalar(None)),
            Some(value) => Ok(Scalar(Some(serde_json::from_value(value)?))),
        }
    }

    fn clear(&mut self) {
        self.0 = None;
    }
}

/// Store holding one optional value; the schema describes the value itself
pub struct ScalarStore<T: StoreValue> {
    core: StoreCore<Scalar<T>>,
}

impl<T: StoreValue> ScalarStore<T> {
    /// Build an unhydrated store; prefer [`ScalarStore::get_instance`]
    pub fn new(
        key: impl Into<String>,
        context: &StoreContext,
        schema: Schema,
        default_value: Option<T>,
    ) -> StoreResult<Self> {
        let default_value = default_value
            .as_ref()
            .map(serde_json::to_value)
            .transpose()?;
        Ok(Self {
            core: StoreCore::new(key, context, schema, default_value),
        })
    }

    /// Shared instance for `key`
    pub fn get_instance(
        registry: &StoreRegistry,
        key: impl Into<StoreKey>,
        schema: Schema,
        default_value: Option<T>,
    ) -> StoreResult<Arc<Self>> {
        registry.get_or_create(key, |key, registry| {
            Self::new(key, registry.context(), schema, default_value)
        })
    }

    pub fn get(&self) -> Option<T> {
        self.core.read(|state| state.0.clone())
    }

    pub fn set(&self, value: T) {
        self.set_optional(Some(value));
    }

    /// Replace the value; `None` removes it from storage
    pub fn set_optional(&self, value: Option<T>) {
        self.replace(value);
    }

    /// Swap in `value`, returning what it replaced
    pub fn replace(&self, value: Option<T>) -> Option<T> {
        self.core
            .mutate(ChangeKind::Set, |state| std::mem::replace(&mut state.0, value))
    }

    /// Clear the value, returning what was stored
    pub fn take(&self) -> Option<T> {
        self.core.mutate(ChangeKind::Cleared, |state| state.0.take())
    }

    /// Read and rewrite the value under one lock, then persist it
    pub fn modify<R>(&self, f: impl FnOnce(&mut Option<T>) -> R) -> R {
        self.core.mutate(ChangeKind::Updated, |state| f(&mut state.0))
    }

    /// Like [`ScalarStore::modify`]; an `Err` leaves the store untouched and
    /// fires no event
    pub fn try_modify<R, E>(
        &self,
        f: impl FnOnce(&mut Option<T>) -> Result<R, E>,
    ) -> Result<R, E> {
        self.core
            .try_mutate(ChangeKind::Updated, |state| f(&mut state.0))
    }

    /// Deep-merge `partial` into an object value
    ///
    /// Returns `Ok(false)` without changing anything when the current value is
    /// absent or not a JSON object.
    pub fn update<P: Serialize>(&self, partial: &P) -> StoreResult<bool> {
        let partial = serde_json::to_value(partial)?;
        let key = self.key();

        let outcome = self.try_modify(|value| {
            let current = match value.as_ref().map(serde_json::to_value).transpose()? {
                Some(current @ Value::Object(_)) => current,
                _ => return Err(Skipped::NotAnObject),
            };
            let merged: T = serde_json::from_value(merge_deep_right(&current, &partial))
                .map_err(|e| StoreError::Deserialize {
                    key: key.to_string(),
                    reason: e.to_string(),
                })?;
            *value = Some(merged);
            Ok(())
        });

        match outcome {
            Ok(()) => Ok(true),
            Err(Skipped::NotAnObject) => {
                app_log!(
                    LogLevel::Warn,
                    "Cannot update \"{}\": current value is not an object, use set() instead",
                    key
                );
                Ok(false)
            }
            Err(Skipped::Failed(e)) => Err(e),
        }
    }

    /// A closure computing `selector` over the current value on each call
    pub fn derive<U, F>(self: &Arc<Self>, selector: F) -> impl Fn() -> U
    where
        F: Fn(Option<&T>) -> U,
    {
        let store = Arc::clone(self);
        move || selector(store.get().as_ref())
    }

    /// `[]` or `[value]`
    pub fn list(&self) -> Arc<Vec<T>> {
        self.core.list()
    }

    pub fn clear(&self) {
        self.core.clear();
    }

    pub fn update_from_storage(&self) {
        self.core.update_from_storage();
    }

    pub fn key(&self) -> &str {
        self.core.key()
    }

    pub fn storage_key(&self) -> &str {
        self.core.storage_key()
    }

    pub fn revision(&self) -> u64 {
        self.core.revision()
    }

    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&StoreChangedEvent) + Send + Sync + 'static,
    {
        self.core.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.core.unsubscribe(id)
    }
}

/// Why an update left the value alone
enum Skipped {
    NotAnObject,
    Failed(StoreError),
}

impl From<StoreError> for Skipped {
    fn from(e: StoreError) -> Self {
        Skipped::Failed(e)
    }
}

impl From<serde_json::Error> for Skipped {
    fn from(e: serde_json::Error) -> Self {
        Skipped::Failed(e.into())
    }
}

impl<T: StoreValue> Hydrate for ScalarStore<T> {
    fn hydrate(&self) -> StoreResult<()> {
        self.core.hydrate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use crate::persistence::{KeyValueStorage, MemoryStorage};
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Prefs {
        theme: String,
        layout: Layout,
        recent: Vec<String>,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Layout {
        sidebar: bool,
        width: i64,
    }

    fn prefs_schema() -> Schema {
        Schema::object([
            ("theme", Schema::string()),
            (
                "layout",
                Schema::object([("sidebar", Schema::boolean()), ("width", Schema::integer())]),
            ),
            ("recent", Schema::array(Schema::string())),
        ])
        .optional()
    }

    fn prefs() -> Prefs {
        Prefs {
            theme: "dark".to_string(),
            layout: Layout {
                sidebar: true,
                width: 240,
            },
            recent: vec!["a".to_string(), "b".to_string()],
        }
    }

    fn registry() -> (StoreRegistry, Arc<MemoryStorage>) {
        let storage = Arc::new(MemoryStorage::new());
        let registry = StoreRegistry::with_storage(StoreConfig::default(), storage.clone());
        (registry, storage)
    }

    #[test]
    fn test_set_get_and_round_trip() {
        let (registry, storage) = registry();
        let store: Arc<ScalarStore<Prefs>> =
            ScalarStore::get_instance(&registry, "prefs", prefs_schema(), None).unwrap();
        assert_eq!(store.get(), None);
        assert!(store.list().is_empty());

        store.set(prefs());
        assert!(storage.get_item("store_prefs").unwrap().is_some());

        store.update_from_storage();
        assert_eq!(store.get(), Some(prefs()));
        assert_eq!(*store.list(), vec![prefs()]);
    }

    #[test]
    fn test_update_merges_nested_and_replaces_arrays() {
        let (registry, _) = registry();
        let store: Arc<ScalarStore<Prefs>> =
            ScalarStore::get_instance(&registry, "prefs", prefs_schema(), Some(prefs())).unwrap();

        let changed = store
            .update(&serde_json::json!({"layout": {"width": 300}, "recent": ["c"]}))
            .unwrap();
        assert!(changed);

        let value = store.get().unwrap();
        assert!(value.layout.sidebar);
        assert_eq!(value.layout.width, 300);
        assert_eq!(value.recent, vec!["c".to_string()]);
        assert_eq!(value.theme, "dark");
    }

    #[test]
    fn test_update_on_non_object_is_noop() {
        let (registry, _) = registry();
        let store: Arc<ScalarStore<String>> = ScalarStore::get_instance(
            &registry,
            "search",
            Schema::string().optional(),
            Some("feat".to_string()),
        )
        .unwrap();
        let revision = store.revision();

        assert!(!store.update(&serde_json::json!({"x": 1})).unwrap());
        assert_eq!(store.get().as_deref(), Some("feat"));
        assert_eq!(store.revision(), revision);
    }

    #[test]
    fn test_clear_removes_persisted_value() {
        let (registry, storage) = registry();
        let store: Arc<ScalarStore<String>> =
            ScalarStore::get_instance(&registry, "search", Schema::string().optional(), None)
                .unwrap();
        store.set("main".to_string());
        store.clear();

        assert_eq!(store.get(), None);
        assert_eq!(storage.get_item("store_search").unwrap(), None);
    }

    #[test]
    fn test_hydrates_existing_data() {
        let (registry, storage) = registry();
        storage.set_item("store_search", "\"fix/\"").unwrap();
        let store: Arc<ScalarStore<String>> =
            ScalarStore::get_instance(&registry, "search", Schema::string().optional(), None)
                .unwrap();
        assert_eq!(store.get().as_deref(), Some("fix/"));
    }

    #[test]
    fn test_invalid_default_without_fallback_fails_construction() {
        let (registry, _) = registry();
        let result: StoreResult<Arc<ScalarStore<String>>> = ScalarStore::get_instance(
            &registry,
            "name",
            Schema::non_empty_string(1),
            Some(String::new()),
        );
        assert!(matches!(result, Err(StoreError::InvalidDefault { .. })));
        assert!(!registry.contains("name"));
    }

    #[test]
    fn test_derive_tracks_current_value() {
        let (registry, _) = registry();
        let store: Arc<ScalarStore<Prefs>> =
            ScalarStore::get_instance(&registry, "prefs", prefs_schema(), None).unwrap();
        let theme = store.derive(|p| p.map(|p| p.theme.clone()));

        assert_eq!(theme(), None);
        store.set(prefs());
        assert_eq!(theme().as_deref(), Some("dark"));
    }

    #[test]
    fn test_modify_is_atomic_across_threads() {
        let (registry, storage) = registry();
        let store: Arc<ScalarStore<Vec<String>>> = ScalarStore::get_instance(
            &registry,
            "recent",
            Schema::array(Schema::string()).optional(),
            None,
        )
        .unwrap();
        let barrier = Arc::new(std::sync::Barrier::new(4));

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let store = Arc::clone(&store);
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    for i in 0..25 {
                        store.modify(|value| {
                            value.get_or_insert_with(Vec::new).push(format!("{}-{}", t, i))
                        });
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.get().map(|v| v.len()), Some(100));
        store.update_from_storage();
        assert_eq!(store.get().map(|v| v.len()), Some(100));
        assert!(storage.get_item("store_recent").unwrap().is_some());
    }

    #[test]
    fn test_try_modify_error_keeps_value() {
        let (registry, _) = registry();
        let store: Arc<ScalarStore<String>> = ScalarStore::get_instance(
            &registry,
            "search",
            Schema::string().optional(),
            Some("feat".to_string()),
        )
        .unwrap();
        let revision = store.revision();

        let outcome: Result<(), &str> = store.try_modify(|_| Err("nothing to change"));
        assert!(outcome.is_err());
        assert_eq!(store.get().as_deref(), Some("feat"));
        assert_eq!(store.revision(), revision);
    }
}
