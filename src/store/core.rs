//! Shared store machinery
//!
//! [`StoreCore`] owns one in-memory collection and implements the protocol
//! every store follows: hydrate from storage on construction, then
//! read-modify-persist on every mutation. The in-memory state is the source of
//! truth for the session; a failed write is logged and never rolls the
//! mutation back, so memory and storage may disagree until the next
//! successful write.

use super::registry::StoreContext;
use crate::adapter::{read_validated, write_validated};
use crate::app_log;
use crate::error::{StoreError, StoreResult};
use crate::events::{ChangeKind, Listeners, StoreChangedEvent, SubscriptionId};
use crate::logger::LogLevel;
use crate::persistence::KeyValueStorage;
use crate::schema::Schema;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// The collection shape a store keeps in memory
///
/// These are the hooks a concrete store supplies: how to list its items, how
/// to project itself into plain data for storage, how to rebuild itself from
/// validated data, and how to empty itself.
pub trait StoreCollection: Default + Send + 'static {
    type Item: Clone + Send + Sync + 'static;

    /// Ordered projection of the collection
    fn to_list(&self) -> Vec<Self::Item>;

    /// Plain data to persist; `None` removes the key
    fn storable_data(&self) -> StoreResult<Option<Value>>;

    /// Build the collection from validated data (`None` when absent)
    fn from_data(data: Option<Value>) -> StoreResult<Self>;

    fn clear(&mut self);
}

pub struct StoreCore<C: StoreCollection> {
    key: String,
    storage_key: String,
    schema: Schema,
    default_value: Option<Value>,
    storage: Arc<dyn KeyValueStorage>,
    state: Mutex<C>,
    list_cache: Mutex<Option<(u64, Arc<Vec<C::Item>>)>>,
    revision: AtomicU64,
    listeners: Listeners,
}

impl<C: StoreCollection> StoreCore<C> {
    /// Create an empty core; call [`StoreCore::hydrate`] to load persisted data
    pub fn new(
        key: impl Into<String>,
        context: &StoreContext,
        schema: Schema,
        default_value: Option<Value>,
    ) -> Self {
        let key = key.into();
        Self {
            storage_key: context.storage_key(&key),
            key,
            schema,
            default_value,
            storage: Arc::clone(context.storage()),
            state: Mutex::new(C::default()),
            list_cache: Mutex::new(None),
            revision: AtomicU64::new(0),
            listeners: Listeners::new(),
        }
    }

    /// Logical key (registry key)
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Key used in the persistence medium
    pub fn storage_key(&self) -> &str {
        &self.storage_key
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn default_value(&self) -> Option<&Value> {
        self.default_value.as_ref()
    }

    /// Incremented on every state change
    pub fn revision(&self) -> u64 {
        self.revision.load(Ordering::SeqCst)
    }

    fn lock_state(&self) -> MutexGuard<'_, C> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` against the current state
    pub fn read<R>(&self, f: impl FnOnce(&C) -> R) -> R {
        let state = self.lock_state();
        f(&state)
    }

    /// Ordered projection of the state, recomputed only after a change
    pub fn list(&self) -> Arc<Vec<C::Item>> {
        let current = self.revision();
        if let Ok(cache) = self.list_cache.lock() {
            if let Some((revision, list)) = cache.as_ref() {
                if *revision == current {
                    return Arc::clone(list);
                }
            }
        }

        let (revision, list) = {
            let state = self.lock_state();
            (self.revision(), Arc::new(state.to_list()))
        };

        if let Ok(mut cache) = self.list_cache.lock() {
            *cache = Some((revision, Arc::clone(&list)));
        }
        list
    }

    /// Apply `f` to the state, persist the result and notify listeners
    pub fn mutate<R>(&self, kind: ChangeKind, f: impl FnOnce(&mut C) -> R) -> R {
        let (result, revision) = {
            let mut state = self.lock_state();
            let result = f(&mut state);
            let revision = self.revision.fetch_add(1, Ordering::SeqCst) + 1;
            self.persist(&state);
            (result, revision)
        };

        self.listeners
            .notify(&StoreChangedEvent::new(&self.key, kind, revision));
        result
    }

    /// Like [`StoreCore::mutate`], but an `Err` from `f` leaves the store as it
    /// was: nothing is persisted, the revision stays and no event fires
    ///
    /// `f` must not touch the state on the error path.
    pub fn try_mutate<R, E>(
        &self,
        kind: ChangeKind,
        f: impl FnOnce(&mut C) -> Result<R, E>,
    ) -> Result<R, E> {
        let (result, revision) = {
            let mut state = self.lock_state();
            let result = f(&mut state)?;
            let revision = self.revision.fetch_add(1, Ordering::SeqCst) + 1;
            self.persist(&state);
            (result, revision)
        };

        self.listeners
            .notify(&StoreChangedEvent::new(&self.key, kind, revision));
        Ok(result)
    }

    /// Empty the collection and persist the empty representation
    pub fn clear(&self) {
        self.mutate(ChangeKind::Cleared, |state| state.clear());
    }

    /// Overwrite the in-memory state with what storage holds
    ///
    /// Only an invalid default with no absent fallback is returned as an
    /// error; every other failure is logged and the state falls back to the
    /// default.
    pub fn hydrate(&self) -> StoreResult<()> {
        let result = read_validated(
            self.storage.as_ref(),
            &self.storage_key,
            &self.schema,
            self.default_value.as_ref(),
        );

        let (collection, outcome) = match result {
            Ok(data) => match C::from_data(data) {
                Ok(collection) => (collection, Ok(())),
                Err(e) => {
                    app_log!(
                        LogLevel::Error,
                        "Error building state for \"{}\" from stored data: {}",
                        self.key,
                        e
                    );
                    (self.default_collection(), Ok(()))
                }
            },
            Err(e) => {
                app_log!(
                    LogLevel::Error,
                    "Error validating stored data for \"{}\": {}",
                    self.key,
                    e
                );
                let fatal = matches!(e, StoreError::InvalidDefault { .. });
                (self.default_collection(), if fatal { Err(e) } else { Ok(()) })
            }
        };

        let revision = {
            let mut state = self.lock_state();
            *state = collection;
            self.revision.fetch_add(1, Ordering::SeqCst) + 1
        };
        self.listeners.notify(&StoreChangedEvent::new(
            &self.key,
            ChangeKind::Hydrated,
            revision,
        ));

        outcome
    }

    /// Re-read storage, logging instead of returning failures
    pub fn update_from_storage(&self) {
        if let Err(e) = self.hydrate() {
            app_log!(
                LogLevel::Error,
                "Failed to refresh \"{}\" from storage: {}",
                self.key,
                e
            );
        }
    }

    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&StoreChangedEvent) + Send + Sync + 'static,
    {
        self.listeners.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.listeners.unsubscribe(id)
    }

    fn default_collection(&self) -> C {
        C::from_data(self.default_value.clone()).unwrap_or_default()
    }

    fn persist(&self, state: &C) {
        let outcome = state.storable_data().and_then(|data| match data {
            None => self.storage.remove_item(&self.storage_key),
            Some(data) => write_validated(
                self.storage.as_ref(),
                &self.storage_key,
                &data,
                &self.schema,
            )
            .map(|_| ()),
        });

        if let Err(e) = outcome {
            app_log!(
                LogLevel::Error,
                "Error validating or storing data for \"{}\": {}",
                self.key,
                e
            );
        }
    }
}

/// Stores that can be (re-)loaded from storage; required by the registry
pub trait Hydrate: Send + Sync + 'static {
    fn hydrate(&self) -> StoreResult<()>;
}
