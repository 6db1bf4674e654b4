use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Event names - centralized for consistency
pub mod event_names {
    pub const STORE_HYDRATED: &str = "store:hydrated";
    pub const STORE_SET: &str = "store:set";
    pub const STORE_UPDATED: &str = "store:updated";
    pub const STORE_ADDED: &str = "store:added";
    pub const STORE_DELETED: &str = "store:deleted";
    pub const STORE_CLEARED: &str = "store:cleared";
}

/// What kind of mutation produced a change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChangeKind {
    Hydrated,
    Set,
    Updated,
    Added,
    Deleted,
    Cleared,
}

impl ChangeKind {
    pub fn event_name(&self) -> &'static str {
        match self {
            ChangeKind::Hydrated => event_names::STORE_HYDRATED,
            ChangeKind::Set => event_names::STORE_SET,
            ChangeKind::Updated => event_names::STORE_UPDATED,
            ChangeKind::Added => event_names::STORE_ADDED,
            ChangeKind::Deleted => event_names::STORE_DELETED,
            ChangeKind::Cleared => event_names::STORE_CLEARED,
        }
    }
}

/// Emitted after a store's state changed
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreChangedEvent {
    pub key: String,
    pub kind: ChangeKind,
    pub revision: u64,
    pub timestamp: String,
}

impl StoreChangedEvent {
    pub fn new(key: impl Into<String>, kind: ChangeKind, revision: u64) -> Self {
        Self {
            key: key.into(),
            kind,
            revision,
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

/// Handle returned by [`Listeners::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

pub type Listener = Arc<dyn Fn(&StoreChangedEvent) + Send + Sync>;

/// Subscribers to one store's change events
#[derive(Default)]
pub struct Listeners {
    next_id: AtomicU64,
    entries: Mutex<Vec<(SubscriptionId, Listener)>>,
}

impl Listeners {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&StoreChangedEvent) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        if let Ok(mut entries) = self.entries.lock() {
            entries.push((id, Arc::new(listener)));
        }
        id
    }

    /// Returns whether a listener was removed
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        match self.entries.lock() {
            Ok(mut entries) => {
                let before = entries.len();
                entries.retain(|(entry_id, _)| *entry_id != id);
                entries.len() != before
            }
            Err(_) => false,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Call every listener; the list lock is not held while they run
    pub fn notify(&self, event: &StoreChangedEvent) {
        let snapshot: Vec<Listener> = match self.entries.lock() {
            Ok(entries) => entries.iter().map(|(_, l)| Arc::clone(l)).collect(),
            Err(_) => return,
        };
        for listener in snapshot {
            listener(event);
        }
    }
}
