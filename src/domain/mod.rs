//! Branch-management domain stores

pub mod deleted_branches;
pub mod navigation;
pub mod notifications;
pub mod repository;
pub mod selection;
pub mod types;

pub use deleted_branches::{get_deleted_branches_store, DeletedBranchesStore};
pub use navigation::{Navigator, NoopNavigator, RecordingNavigator};
pub use notifications::{create_notification_object, get_notification_store, NotificationStore};
pub use repository::{get_repository_store, RepositoryStore, REPOSITORIES_LIST_KEY};
pub use selection::{
    locked_branches, search_branches, select_all_branches, selected_branches,
    LockedBranchesStore, SearchBranchesStore, SelectedBranchesStore,
};
pub use types::{
    Branch, Commit, DeletedBranchesState, Feedback, Notification, NotificationInput, Repository,
};
