//! Repository metadata store and the registry of known repository names
//!
//! Each repository lives in its own [`RepositoryStore`] keyed
//! `repository_<name>`. The names of all known repositories are kept in one
//! shared [`SetStore`] so the host can list them and restore their stores on
//! startup.

use super::types::{repository_schema, Repository};
use crate::app_log;
use crate::error::{StoreError, StoreResult};
use crate::events::{StoreChangedEvent, SubscriptionId};
use crate::logger::LogLevel;
use crate::schema::Schema;
use crate::store::{Hydrate, ScalarStore, SetStore, StoreContext, StoreRegistry};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Logical key of the repository-name registry
pub const REPOSITORIES_LIST_KEY: &str = "repositories_list";

pub struct RepositoryStore {
    inner: ScalarStore<Repository>,
    names: Arc<SetStore<String>>,
    context: StoreContext,
    writes: Mutex<()>,
}

impl RepositoryStore {
    /// Shared store for the repository called `name`
    pub fn get_instance(registry: &StoreRegistry, name: &str) -> StoreResult<Arc<Self>> {
        if name.is_empty() {
            return Err(StoreError::InvalidKey);
        }

        registry.get_or_create(["repository", name], |key, registry| {
            Ok(Self {
                inner: ScalarStore::new(
                    key,
                    registry.context(),
                    repository_schema().optional(),
                    None,
                )?,
                names: Self::repositories(registry)?,
                context: registry.context().clone(),
                writes: Mutex::new(()),
            })
        })
    }

    /// The registry of known repository names
    pub fn repositories(registry: &StoreRegistry) -> StoreResult<Arc<SetStore<String>>> {
        SetStore::get_instance(registry, REPOSITORIES_LIST_KEY, Schema::string())
    }

    /// Re-read the name registry and make sure every listed repository has a
    /// store
    pub fn load_repositories(registry: &StoreRegistry) -> StoreResult<Vec<Arc<Self>>> {
        let names = Self::repositories(registry)?;
        names.update_from_storage();

        names
            .list()
            .iter()
            .map(|name| Self::get_instance(registry, name))
            .collect()
    }

    pub fn get(&self) -> Option<Repository> {
        self.inner.get()
    }

    /// Name of the stored repository, if any
    pub fn name(&self) -> Option<String> {
        non_empty_name(self.inner.get())
    }

    /// Store `value` and keep the name registry in step with it
    ///
    /// A value whose name differs from the stored one (including the first
    /// value ever set) navigates to the new repository's route. The new name
    /// is always registered and a replaced name is dropped. Setting `None`
    /// only drops the old name; it never navigates.
    pub fn set(&self, value: Option<Repository>) {
        let new_name = value
            .as_ref()
            .map(|r| r.name.clone())
            .filter(|n| !n.is_empty());

        let route = {
            let _writing = self.lock_writes();
            let old_name = non_empty_name(self.inner.replace(value));

            match new_name {
                Some(new_name) => {
                    let renamed = old_name.as_deref() != Some(new_name.as_str());
                    if renamed {
                        if let Some(old_name) = old_name {
                            self.names.delete([old_name]);
                        }
                    }
                    let route = renamed.then(|| self.context.config().repository_route(&new_name));
                    self.names.add([new_name]);
                    route
                }
                None => {
                    if let Some(old_name) = old_name {
                        self.names.delete([old_name]);
                    }
                    None
                }
            }
        };

        if let Some(route) = route {
            app_log!(LogLevel::Info, "Repository changed, navigating to {}", route);
            self.context.navigator().navigate(&route);
        }
    }

    /// Drop the stored repository and unregister its name
    pub fn clear(&self) {
        let _writing = self.lock_writes();
        if let Some(name) = non_empty_name(self.inner.take()) {
            self.names.delete([name]);
        }
    }

    /// Serializes `set`/`clear` so the stored value and the name registry
    /// move together
    fn lock_writes(&self) -> MutexGuard<'_, ()> {
        self.writes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn list(&self) -> Arc<Vec<Repository>> {
        self.inner.list()
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

impl Hydrate for RepositoryStore {
    fn hydrate(&self) -> StoreResult<()> {
        self.inner.hydrate()
    }
}

fn non_empty_name(repository: Option<Repository>) -> Option<String> {
    repository.map(|r| r.name).filter(|n| !n.is_empty())
}

/// Store for `name` in the process-wide registry; `None` for an empty name
pub fn get_repository_store(name: &str) -> StoreResult<Option<Arc<RepositoryStore>>> {
    if name.is_empty() {
        return Ok(None);
    }
    RepositoryStore::get_instance(crate::registry(), name).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use crate::domain::navigation::RecordingNavigator;
    use crate::domain::types::{Branch, Commit};
    use crate::persistence::{KeyValueStorage, MemoryStorage};

    fn repository(name: &str) -> Repository {
        let commit = Commit {
            sha: "abc123".to_string(),
            short_sha: "abc".to_string(),
            date: "2024-01-01T00:00:00Z".to_string(),
            message: "init".to_string(),
            author: "dev".to_string(),
            email: "dev@example.com".to_string(),
        };
        let mut main = Branch::new("main", commit);
        main.current = true;

        Repository {
            id: format!("id-{}", name),
            name: name.to_string(),
            path: format!("/code/{}", name),
            current_branch: "main".to_string(),
            branches_count: 1.0,
            branches: vec![main],
        }
    }

    fn setup() -> (StoreRegistry, Arc<MemoryStorage>, Arc<RecordingNavigator>) {
        let storage = Arc::new(MemoryStorage::new());
        let navigator = Arc::new(RecordingNavigator::new());
        let registry = StoreRegistry::with_storage(StoreConfig::default(), storage.clone())
            .with_navigator(navigator.clone());
        (registry, storage, navigator)
    }

    #[test]
    fn test_first_set_navigates_and_registers() {
        let (registry, storage, navigator) = setup();
        let store = RepositoryStore::get_instance(&registry, "alpha").unwrap();

        store.set(Some(repository("alpha")));

        assert_eq!(navigator.routes(), vec!["/repos/alpha"]);
        let names = RepositoryStore::repositories(&registry).unwrap();
        assert!(names.has(&"alpha".to_string()));
        assert!(storage.get_item("store_repository_alpha").unwrap().is_some());
        assert_eq!(
            storage.get_item("store_repositories_list").unwrap(),
            Some("[\"alpha\"]".to_string())
        );
    }

    #[test]
    fn test_refresh_with_same_name_does_not_navigate() {
        let (registry, _, navigator) = setup();
        let store = RepositoryStore::get_instance(&registry, "alpha").unwrap();

        store.set(Some(repository("alpha")));
        let mut refreshed = repository("alpha");
        refreshed.current_branch = "dev".to_string();
        store.set(Some(refreshed));

        assert_eq!(navigator.routes().len(), 1);
        assert_eq!(store.get().unwrap().current_branch, "dev");
    }

    #[test]
    fn test_rename_navigates_once_and_swaps_names() {
        let (registry, _, navigator) = setup();
        let store = RepositoryStore::get_instance(&registry, "slot").unwrap();
        store.set(Some(repository("a")));
        let before = navigator.routes().len();

        store.set(Some(repository("b")));

        let routes = navigator.routes();
        assert_eq!(routes.len(), before + 1);
        assert_eq!(routes.last().map(String::as_str), Some("/repos/b"));

        let names = RepositoryStore::repositories(&registry).unwrap();
        assert!(names.has(&"b".to_string()));
        assert!(!names.has(&"a".to_string()));
    }

    #[test]
    fn test_set_none_unregisters_without_navigation() {
        let (registry, _, navigator) = setup();
        let store = RepositoryStore::get_instance(&registry, "alpha").unwrap();
        store.set(Some(repository("alpha")));

        store.set(None);

        assert_eq!(navigator.routes().len(), 1);
        assert!(store.get().is_none());
        assert!(RepositoryStore::repositories(&registry).unwrap().is_empty());
    }

    #[test]
    fn test_clear_unregisters_name() {
        let (registry, storage, _) = setup();
        let store = RepositoryStore::get_instance(&registry, "alpha").unwrap();
        store.set(Some(repository("alpha")));

        store.clear();

        assert!(store.get().is_none());
        assert!(!RepositoryStore::repositories(&registry)
            .unwrap()
            .has(&"alpha".to_string()));
        assert_eq!(storage.get_item("store_repository_alpha").unwrap(), None);
    }

    #[test]
    fn test_load_repositories_restores_stores() {
        let storage = Arc::new(MemoryStorage::new());
        {
            let registry =
                StoreRegistry::with_storage(StoreConfig::default(), storage.clone());
            RepositoryStore::get_instance(&registry, "alpha")
                .unwrap()
                .set(Some(repository("alpha")));
            RepositoryStore::get_instance(&registry, "beta")
                .unwrap()
                .set(Some(repository("beta")));
        }

        let registry = StoreRegistry::with_storage(StoreConfig::default(), storage);
        let stores = RepositoryStore::load_repositories(&registry).unwrap();

        let names: Vec<String> = stores.iter().filter_map(|s| s.name()).collect();
        assert_eq!(names, vec!["alpha".to_string(), "beta".to_string()]);
    }

    #[test]
    fn test_empty_name_is_rejected() {
        let (registry, _, _) = setup();
        assert!(matches!(
            RepositoryStore::get_instance(&registry, ""),
            Err(StoreError::InvalidKey)
        ));
        assert!(get_repository_store("").unwrap().is_none());
    }

    #[test]
    fn test_concurrent_renames_leave_one_registered_name() {
        let (registry, _, navigator) = setup();
        let store = RepositoryStore::get_instance(&registry, "slot").unwrap();
        let barrier = Arc::new(std::sync::Barrier::new(4));

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let store = Arc::clone(&store);
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    for i in 0..25 {
                        store.set(Some(repository(&format!("r{}-{}", t, i))));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let current = store.name().unwrap();
        let names = RepositoryStore::repositories(&registry).unwrap();
        assert_eq!(*names.list(), vec![current]);
        assert_eq!(navigator.routes().len(), 100);
    }
}
