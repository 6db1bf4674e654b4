//! Per-repository branch selection, lock and search stores
//!
//! These are plain collection stores namespaced by repository. Business rules
//! such as "select all" live in free functions, not in the stores.

use super::types::Branch;
use crate::error::{StoreError, StoreResult};
use crate::schema::Schema;
use crate::store::{ScalarStore, SetStore, StoreRegistry};
use std::sync::Arc;

pub type SelectedBranchesStore = SetStore<String>;
pub type LockedBranchesStore = SetStore<String>;
pub type SearchBranchesStore = ScalarStore<String>;

fn require_repository(repository_id: &str) -> StoreResult<()> {
    if repository_id.is_empty() {
        Err(StoreError::InvalidKey)
    } else {
        Ok(())
    }
}

/// Branch names selected in `repository_id`, keyed `selected_<id>`
pub fn selected_branches(
    registry: &StoreRegistry,
    repository_id: &str,
) -> StoreResult<Arc<SelectedBranchesStore>> {
    require_repository(repository_id)?;
    SetStore::get_instance(registry, ["selected", repository_id], Schema::string())
}

/// Branch names protected from deletion in `repository_id`, keyed `locked_<id>`
pub fn locked_branches(
    registry: &StoreRegistry,
    repository_id: &str,
) -> StoreResult<Arc<LockedBranchesStore>> {
    require_repository(repository_id)?;
    SetStore::get_instance(registry, ["locked", repository_id], Schema::string())
}

/// Branch filter text for `repository_id`, keyed `search_<id>`
pub fn search_branches(
    registry: &StoreRegistry,
    repository_id: &str,
) -> StoreResult<Arc<SearchBranchesStore>> {
    require_repository(repository_id)?;
    ScalarStore::get_instance(
        registry,
        ["search", repository_id],
        Schema::string().optional(),
        None,
    )
}

/// Names "select all" should select: every branch except the checked-out one
/// and the locked ones
pub fn select_all_branches(branches: &[Branch], locked: &[String]) -> Vec<String> {
    branches
        .iter()
        .filter(|branch| !branch.current && !locked.contains(&branch.name))
        .map(|branch| branch.name.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use crate::domain::types::Commit;
    use crate::persistence::{KeyValueStorage, MemoryStorage};

    fn branch(name: &str, current: bool) -> Branch {
        let mut branch = Branch::new(
            name,
            Commit {
                sha: "1".to_string(),
                short_sha: "1".to_string(),
                date: "2024-01-01T00:00:00Z".to_string(),
                message: "m".to_string(),
                author: "a".to_string(),
                email: "a@example.com".to_string(),
            },
        );
        branch.current = current;
        branch
    }

    fn setup() -> (StoreRegistry, Arc<MemoryStorage>) {
        let storage = Arc::new(MemoryStorage::new());
        let registry = StoreRegistry::with_storage(StoreConfig::default(), storage.clone());
        (registry, storage)
    }

    #[test]
    fn test_select_all_skips_current_and_locked() {
        let branches = vec![
            branch("main", true),
            branch("feature", false),
            branch("release", false),
            branch("spike", false),
        ];
        let locked = vec!["release".to_string()];

        assert_eq!(
            select_all_branches(&branches, &locked),
            vec!["feature".to_string(), "spike".to_string()]
        );
    }

    #[test]
    fn test_stores_are_namespaced_per_repository() {
        let (registry, storage) = setup();
        let selected_a = selected_branches(&registry, "a").unwrap();
        let selected_b = selected_branches(&registry, "b").unwrap();
        let locked_a = locked_branches(&registry, "a").unwrap();

        selected_a.add(["feature".to_string()]);
        locked_a.add(["release".to_string()]);

        assert!(selected_b.is_empty());
        assert!(Arc::ptr_eq(
            &selected_a,
            &selected_branches(&registry, "a").unwrap()
        ));
        assert!(storage.get_item("store_selected_a").unwrap().is_some());
        assert!(storage.get_item("store_locked_a").unwrap().is_some());
    }

    #[test]
    fn test_search_round_trip() {
        let (registry, storage) = setup();
        let search = search_branches(&registry, "a").unwrap();
        search.set("feat/".to_string());
        assert_eq!(
            storage.get_item("store_search_a").unwrap(),
            Some("\"feat/\"".to_string())
        );

        search.update_from_storage();
        assert_eq!(search.get().as_deref(), Some("feat/"));

        search.set(String::new());
        assert_eq!(storage.get_item("store_search_a").unwrap(), None);
    }

    #[test]
    fn test_empty_repository_id_is_rejected() {
        let (registry, _) = setup();
        assert!(matches!(
            selected_branches(&registry, ""),
            Err(StoreError::InvalidKey)
        ));
    }
}
