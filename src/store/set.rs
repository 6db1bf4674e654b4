use super::core::{Hydrate, StoreCollection, StoreCore};
use super::registry::{StoreContext, StoreKey, StoreRegistry};
use super::scalar::StoreValue;
use crate::error::StoreResult;
use crate::events::{ChangeKind, StoreChangedEvent, SubscriptionId};
use crate::schema::Schema;
use serde_json::Value;
use std::sync::Arc;

/// Unique items in insertion order, compared by value
pub struct SetCollection<T>(Vec<T>);

impl<T> Default for SetCollection<T> {
    fn default() -> Self {
        SetCollection(Vec::new())
    }
}

impl<T: StoreValue + PartialEq> SetCollection<T> {
    fn insert(&mut self, item: T) {
        if !self.0.contains(&item) {
            self.0.push(item);
        }
    }
}

impl<T: StoreValue + PartialEq> StoreCollection for SetCollection<T> {
    type Item = T;

    fn to_list(&self) -> Vec<T> {
        self.0.clone()
    }

    fn storable_data(&self) -> StoreResult<Option<Value>> {
        Ok(Some(serde_json::to_value(&self.0)?))
    }

    fn from_data(data: Option<Value>) -> StoreResult<Self> {
        let items: Vec<T> = match data {
            None | Some(Value::Null) => Vec::new(),
            Some(value) => serde_json::from_value(value)?,
        };
        let mut set = SetCollection::default();
        for item in items {
            set.insert(item);
        }
        Ok(set)
    }

    fn clear(&mut self) {
        self.0.clear();
    }
}

/// Store holding a set of values, persisted as a JSON array
pub struct SetStore<T: StoreValue + PartialEq> {
    core: StoreCore<SetCollection<T>>,
}

impl<T: StoreValue + PartialEq> SetStore<T> {
    /// Build an unhydrated store; `item_schema` describes one element
    pub fn new(key: impl Into<String>, context: &StoreContext, item_schema: Schema) -> Self {
        Self {
            core: StoreCore::new(
                key,
                context,
                Schema::array(item_schema),
                Some(Value::Array(Vec::new())),
            ),
        }
    }

    /// Shared instance for `key`
    pub fn get_instance(
        registry: &StoreRegistry,
        key: impl Into<StoreKey>,
        item_schema: Schema,
    ) -> StoreResult<Arc<Self>> {
        registry.get_or_create(key, |key, registry| {
            Ok(Self::new(key, registry.context(), item_schema))
        })
    }

    /// Add each item not already present
    pub fn add(&self, items: impl IntoIterator<Item = T>) {
        self.core.mutate(ChangeKind::Added, |state| {
            for item in items {
                state.insert(item);
            }
        });
    }

    pub fn delete(&self, items: impl IntoIterator<Item = T>) {
        let items: Vec<T> = items.into_iter().collect();
        self.core.mutate(ChangeKind::Deleted, |state| {
            state.0.retain(|existing| !items.contains(existing));
        });
    }

    pub fn has(&self, item: &T) -> bool {
        self.core.read(|state| state.0.contains(item))
    }

    pub fn len(&self) -> usize {
        self.core.read(|state| state.0.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Items in insertion order
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

impl<T: StoreValue + PartialEq> Hydrate for SetStore<T> {
    fn hydrate(&self) -> StoreResult<()> {
        self.core.hydrate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use crate::persistence::{KeyValueStorage, MemoryStorage};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn registry() -> (StoreRegistry, Arc<MemoryStorage>) {
        let storage = Arc::new(MemoryStorage::new());
        let registry = StoreRegistry::with_storage(StoreConfig::default(), storage.clone());
        (registry, storage)
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_add_is_idempotent() {
        let (registry, storage) = registry();
        let store: Arc<SetStore<String>> =
            SetStore::get_instance(&registry, ["selected", "r1"], Schema::string()).unwrap();

        store.add(strings(&["x"]));
        store.add(strings(&["x"]));

        assert_eq!(store.len(), 1);
        assert_eq!(
            storage.get_item("store_selected_r1").unwrap(),
            Some("[\"x\"]".to_string())
        );
    }

    #[test]
    fn test_delete_and_has() {
        let (registry, storage) = registry();
        let store: Arc<SetStore<String>> =
            SetStore::get_instance(&registry, "locked", Schema::string()).unwrap();

        store.add(strings(&["a", "b", "c"]));
        store.delete(strings(&["b", "missing"]));

        assert!(store.has(&"a".to_string()));
        assert!(!store.has(&"b".to_string()));
        assert_eq!(*store.list(), strings(&["a", "c"]));

        store.delete(strings(&["a", "c"]));
        assert!(store.is_empty());
        assert_eq!(storage.get_item("store_locked").unwrap(), None);
    }

    #[test]
    fn test_hydrates_and_dedups_stored_array() {
        let (registry, storage) = registry();
        storage
            .set_item("store_selected_r2", r#"["main","dev","main"]"#)
            .unwrap();

        let store: Arc<SetStore<String>> =
            SetStore::get_instance(&registry, ["selected", "r2"], Schema::string()).unwrap();
        assert_eq!(*store.list(), strings(&["main", "dev"]));
    }

    #[test]
    fn test_invalid_stored_data_falls_back_to_empty() {
        let (registry, storage) = registry();
        storage.set_item("store_selected_r3", "[1, 2]").unwrap();

        let store: Arc<SetStore<String>> =
            SetStore::get_instance(&registry, ["selected", "r3"], Schema::string()).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_mutations_notify_subscribers() {
        let (registry, _) = registry();
        let store: Arc<SetStore<String>> =
            SetStore::get_instance(&registry, "tags", Schema::string()).unwrap();
        let calls = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&calls);
        let id = store.subscribe(move |event| {
            assert_ne!(event.kind, ChangeKind::Hydrated);
            counter.fetch_add(1, Ordering::SeqCst);
        });

        store.add(strings(&["a"]));
        store.clear();
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        assert!(store.unsubscribe(id));
        store.add(strings(&["b"]));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
