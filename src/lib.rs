//! Validated persistent stores for a git branch manager
//!
//! In-memory collections kept in step with a key-value medium. Every read and
//! write is checked against a [`schema::Schema`], and one shared instance exists
//! per logical key.
//!
//! ```
//! use branchstore::domain::{NotificationInput, NotificationStore};
//! use branchstore::{StoreConfig, StoreRegistry};
//!
//! let registry = StoreRegistry::new(StoreConfig::default());
//! let notifications = NotificationStore::get_instance(&registry).unwrap();
//! let pushed = notifications.push(NotificationInput::message("Branch deleted")).unwrap();
//! assert_eq!(notifications.last(), Some(pushed));
//! ```

pub mod adapter;
pub mod config;
pub mod domain;
pub mod error;
pub mod events;
pub mod logger;
pub mod persistence;
pub mod schema;
pub mod store;

pub use config::{StorageBackend, StoreConfig, StoreConfigBuilder};
pub use error::{StoreError, StoreResult};
pub use schema::{Schema, ValidationError};
pub use store::{MapStore, ScalarStore, SetStore, StoreKey, StoreRegistry};

use once_cell::sync::OnceCell;

/// Global store registry instance
static STORE_REGISTRY: OnceCell<StoreRegistry> = OnceCell::new();

/// Initialize the process-wide registry
///
/// Must run before the first call to [`registry`]; afterwards it fails with
/// [`StoreError::AlreadyInitialized`].
pub fn init_stores(config: StoreConfig) -> StoreResult<&'static StoreRegistry> {
    init_stores_with(StoreRegistry::new(config))
}

/// Install a prepared registry (custom backend or navigator) as the
/// process-wide one
pub fn init_stores_with(registry: StoreRegistry) -> StoreResult<&'static StoreRegistry> {
    STORE_REGISTRY
        .set(registry)
        .map_err(|_| StoreError::AlreadyInitialized)?;
    app_log!(logger::LogLevel::Info, "Store registry initialized");
    Ok(self::registry())
}

/// Get the process-wide registry, creating an in-memory one on first use
pub fn registry() -> &'static StoreRegistry {
    STORE_REGISTRY.get_or_init(|| StoreRegistry::new(StoreConfig::default()))
}
