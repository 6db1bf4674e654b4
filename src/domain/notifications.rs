//! Notification feed
//!
//! Notifications are kept in push order under `store_notifications`; the most
//! recent one is at the tail.

use super::types::{notification_schema, Notification, NotificationInput};
use crate::error::StoreResult;
use crate::events::{StoreChangedEvent, SubscriptionId};
use crate::schema::Schema;
use crate::store::{Hydrate, MapStore, StoreRegistry};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

pub const NOTIFICATIONS_KEY: &str = "notifications";

/// Fill in the id, feedback and date a caller left out
pub fn create_notification_object(input: NotificationInput) -> Notification {
    Notification {
        id: input
            .id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string()),
        title: input.title,
        message: input.message,
        feedback: input.feedback.unwrap_or_default(),
        date: input.date.unwrap_or_else(|| Utc::now().timestamp_millis()),
    }
}

pub struct NotificationStore {
    inner: MapStore<String, Notification>,
}

impl NotificationStore {
    pub fn get_instance(registry: &StoreRegistry) -> StoreResult<Arc<Self>> {
        registry.get_or_create(NOTIFICATIONS_KEY, |key, registry| {
            Ok(Self {
                inner: MapStore::new(
                    key,
                    registry.context(),
                    Schema::string(),
                    notification_schema(),
                ),
            })
        })
    }

    /// Normalize and append a notification, returning what was stored
    ///
    /// Pushing an id that is already present replaces that entry and moves it
    /// to the tail.
    pub fn push(&self, input: NotificationInput) -> StoreResult<Notification> {
        let notification = create_notification_object(input);
        self.inner
            .set_last(notification.id.clone(), notification.clone())?;
        Ok(notification)
    }

    pub fn delete<I, S>(&self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inner.delete(ids.into_iter().map(Into::into));
    }

    /// Most recently pushed notification
    pub fn last(&self) -> Option<Notification> {
        self.inner.list().last().cloned()
    }

    pub fn get(&self, id: &str) -> Option<Notification> {
        self.inner.get(&id.to_string())
    }

    pub fn has(&self, id: &str) -> bool {
        self.inner.has(&id.to_string())
    }

    /// Notifications in push order
    pub fn list(&self) -> Arc<Vec<Notification>> {
        self.inner.list()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn clear(&self) {
        self.inner.clear();
    }

    pub fn update_from_storage(&self) {
        self.inner.update_from_storage();
    }

    pub fn key(&self) -> &str {
        self.inner.key()
    }

    pub fn storage_key(&self) -> &str {
        self.inner.storage_key()
    }

    pub fn revision(&self) -> u64 {
        self.inner.revision()
    }

    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&StoreChangedEvent) + Send + Sync + 'static,
    {
        self.inner.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.unsubscribe(id)
    }
}

impl Hydrate for NotificationStore {
    fn hydrate(&self) -> StoreResult<()> {
        self.inner.hydrate()
    }
}

/// The feed in the process-wide registry
pub fn get_notification_store() -> StoreResult<Arc<NotificationStore>> {
    NotificationStore::get_instance(crate::registry())
}
