use super::core::{Hydrate, StoreCollection, StoreCore};
use super::registry::{StoreContext, StoreKey, StoreRegistry};
use super::scalar::StoreValue;
use crate::error::StoreResult;
use crate::events::{ChangeKind, StoreChangedEvent, SubscriptionId};
use crate::schema::Schema;
use serde_json::Value;
use std::sync::Arc;

/// Key/value pairs in insertion order
pub struct MapCollection<K, V>(Vec<(K, V)>);

impl<K, V> Default for MapCollection<K, V> {
    fn default() -> Self {
        MapCollection(Vec::new())
    }
}

impl<K: PartialEq, V> MapCollection<K, V> {
    /// Overwrites in place, so an existing key keeps its position
    fn insert(&mut self, key: K, value: V) {
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.0.push((key, value)),
        }
    }

    /// Drops any existing entry for `key` so the pair lands at the end
    fn append(&mut self, key: K, value: V) {
        self.0.retain(|(k, _)| *k != key);
        self.0.push((key, value));
    }

    fn get(&self, key: &K) -> Option<&V> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }
}

impl<K, V> StoreCollection for MapCollection<K, V>
where
    K: StoreValue + PartialEq,
    V: StoreValue,
{
    type Item = V;

    fn to_list(&self) -> Vec<V> {
        self.0.iter().map(|(_, v)| v.clone()).collect()
    }

    /// `[[key, value], ...]`
    fn storable_data(&self) -> StoreResult<Option<Value>> {
        Ok(Some(serde_json::to_value(&self.0)?))
    }

    fn from_data(data: Option<Value>) -> StoreResult<Self> {
        let entries: Vec<(K, V)> = match data {
            None | Some(Value::Null) => Vec::new(),
            Some(value) => serde_json::from_value(value)?,
        };
        let mut map = MapCollection::default();
        for (key, value) in entries {
            map.insert(key, value);
        }
        Ok(map)
    }

    fn clear(&mut self) {
        self.0.clear();
    }
}

/// Store holding a key/value map
pub struct MapStore<K, V>
where
    K: StoreValue + PartialEq,
    V: StoreValue,
{
    core: StoreCore<MapCollection<K, V>>,
    key_schema: Schema,
    value_schema: Schema,
}

impl<K, V> MapStore<K, V>
where
    K: StoreValue + PartialEq,
    V: StoreValue,
{
    /// Build an unhydrated store; persisted as an array of `[key, value]` pairs
    pub fn new(
        key: impl Into<String>,
        context: &StoreContext,
        key_schema: Schema,
        value_schema: Schema,
    ) -> Self {
        let schema = Schema::array(Schema::tuple([key_schema.clone(), value_schema.clone()]));
        Self {
            core: StoreCore::new(key, context, schema, Some(Value::Array(Vec::new()))),
            key_schema,
            value_schema,
        }
    }

    /// Shared instance for `key`
    pub fn get_instance(
        registry: &StoreRegistry,
        key: impl Into<StoreKey>,
        key_schema: Schema,
        value_schema: Schema,
    ) -> StoreResult<Arc<Self>> {
        registry.get_or_create(key, |key, registry| {
            Ok(Self::new(key, registry.context(), key_schema, value_schema))
        })
    }

    /// Insert or overwrite an entry
    ///
    /// The pair is validated first; an invalid pair is rejected and the map
    /// is left untouched.
    pub fn set(&self, key: K, value: V) -> StoreResult<()> {
        self.validate(&key, &value)?;

        self.core
            .mutate(ChangeKind::Set, |state| state.insert(key, value));
        Ok(())
    }

    /// Insert an entry at the end, moving it there if the key already exists
    pub fn set_last(&self, key: K, value: V) -> StoreResult<()> {
        self.validate(&key, &value)?;
        self.core
            .mutate(ChangeKind::Set, |state| state.append(key, value));
        Ok(())
    }

    fn validate(&self, key: &K, value: &V) -> StoreResult<()> {
        self.key_schema.validate_value(&serde_json::to_value(key)?)?;
        self.value_schema
            .validate_value(&serde_json::to_value(value)?)?;
        Ok(())
    }

    pub fn delete(&self, keys: impl IntoIterator<Item = K>) {
        let keys: Vec<K> = keys.into_iter().collect();
        self.core.mutate(ChangeKind::Deleted, |state| {
            state.0.retain(|(k, _)| !keys.contains(k));
        });
    }

    pub fn has(&self, key: &K) -> bool {
        self.core.read(|state| state.get(key).is_some())
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.core.read(|state| state.get(key).cloned())
    }

    pub fn entries(&self) -> Vec<(K, V)> {
        self.core.read(|state| state.0.clone())
    }

    pub fn keys(&self) -> Vec<K> {
        self.core
            .read(|state| state.0.iter().map(|(k, _)| k.clone()).collect())
    }

    pub fn len(&self) -> usize {
        self.core.read(|state| state.0.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Values in insertion order
    pub fn list(&self) -> Arc<Vec<V>> {
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

impl<K, V> Hydrate for MapStore<K, V>
where
    K: StoreValue + PartialEq,
    V: StoreValue,
{
    fn hydrate(&self) -> StoreResult<()> {
        self.core.hydrate()
    }
}
