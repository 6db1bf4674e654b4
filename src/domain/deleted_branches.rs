//! Per-repository log of deleted branches, newest first

use super::types::{deleted_branches_state_schema, Branch, DeletedBranchesState};
use crate::error::{StoreError, StoreResult};
use crate::events::{StoreChangedEvent, SubscriptionId};
use crate::store::{Hydrate, ScalarStore, StoreRegistry};
use chrono::{DateTime, SecondsFormat, Utc};
use std::sync::{Arc, Mutex};

pub struct DeletedBranchesStore {
    inner: ScalarStore<DeletedBranchesState>,
    branches: Mutex<Option<(u64, Arc<Vec<Branch>>)>>,
}

impl DeletedBranchesStore {
    /// Shared log for `repository_id`, keyed `deleted_branches_<id>`
    pub fn get_instance(registry: &StoreRegistry, repository_id: &str) -> StoreResult<Arc<Self>> {
        if repository_id.is_empty() {
            return Err(StoreError::InvalidKey);
        }

        registry.get_or_create(["deleted_branches", repository_id], |key, registry| {
            Ok(Self {
                inner: ScalarStore::new(
                    key,
                    registry.context(),
                    deleted_branches_state_schema(),
                    Some(DeletedBranchesState::default()),
                )?,
                branches: Mutex::new(None),
            })
        })
    }

    pub fn get(&self) -> Option<DeletedBranchesState> {
        self.inner.get()
    }

    /// Logged branches, most recently deleted first; a cleared log is empty
    ///
    /// Recomputed only after the log changes.
    pub fn list(&self) -> Arc<Vec<Branch>> {
        let revision = self.inner.revision();
        if let Ok(cache) = self.branches.lock() {
            if let Some((cached, list)) = cache.as_ref() {
                if *cached == revision {
                    return Arc::clone(list);
                }
            }
        }

        let list = Arc::new(self.inner.get().map(|s| s.branches).unwrap_or_default());
        if let Ok(mut cache) = self.branches.lock() {
            *cache = Some((revision, Arc::clone(&list)));
        }
        list
    }

    /// Log a copy of `branch` stamped with the current time and marked
    /// reachable
    ///
    /// Entries stay sorted by `deletedAt`, descending. Entries with the same
    /// timestamp keep the newest first.
    pub fn add_deleted_branch(&self, branch: &Branch) {
        let mut entry = branch.clone();
        entry.is_reachable = Some(true);

        self.inner.modify(|state| {
            entry.deleted_at = Some(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true));
            let branches = &mut state.get_or_insert_with(Default::default).branches;
            branches.insert(0, entry);
            branches.sort_by(|a, b| deleted_at_millis(b).cmp(&deleted_at_millis(a)));
        });
    }

    /// Drop every entry called `name`
    pub fn remove_deleted_branch(&self, name: &str) {
        self.inner.modify(|state| {
            state
                .get_or_insert_with(Default::default)
                .branches
                .retain(|branch| branch.name != name);
        });
    }

    /// Set the reachability of the first entry called `name`
    ///
    /// Returns `false`, leaving the log untouched, when no entry matches.
    pub fn update_branch_reachability(&self, name: &str, is_reachable: bool) -> bool {
        self.inner
            .try_modify(|state| {
                let entry = state
                    .as_mut()
                    .and_then(|s| s.branches.iter_mut().find(|branch| branch.name == name))
                    .ok_or(())?;
                entry.is_reachable = Some(is_reachable);
                Ok::<(), ()>(())
            })
            .is_ok()
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

impl Hydrate for DeletedBranchesStore {
    fn hydrate(&self) -> StoreResult<()> {
        self.inner.hydrate()
    }
}

/// Unparseable timestamps sort last
fn deleted_at_millis(branch: &Branch) -> Option<i64> {
    branch
        .deleted_at
        .as_deref()
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(|at| at.timestamp_millis())
}

/// Log for `repository_id` in the process-wide registry; `None` for an empty id
pub fn get_deleted_branches_store(
    repository_id: &str,
) -> StoreResult<Option<Arc<DeletedBranchesStore>>> {
    if repository_id.is_empty() {
        return Ok(None);
    }
    DeletedBranchesStore::get_instance(crate::registry(), repository_id).map(Some)
}
